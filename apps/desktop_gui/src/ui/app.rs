use std::time::Duration;

use client_core::{
    form::parse_feature_value, ImageHandle, PredictionPhase, SlotState, ViewMode,
};
use crossbeam_channel::{Receiver, Sender};
use eframe::egui;
use shared::domain::{CorrelationKind, Feature, FeatureGroup, FEATURE_COUNT};

use crate::backend_bridge::commands::BackendCommand;
use crate::controller::{
    events::UiEvent, orchestration::dispatch_backend_command, reducer::UiModel,
};

const ERROR_COLOR: egui::Color32 = egui::Color32::from_rgb(220, 80, 80);

/// GPU-side copy of a loaded slot. Dropping it frees the texture.
enum SlotTexture {
    Empty,
    Ready {
        handle_id: u64,
        texture: egui::TextureHandle,
        size: egui::Vec2,
    },
    DecodeFailed {
        handle_id: u64,
        reason: String,
    },
}

impl SlotTexture {
    fn handle_id(&self) -> Option<u64> {
        match self {
            SlotTexture::Empty => None,
            SlotTexture::Ready { handle_id, .. } | SlotTexture::DecodeFailed { handle_id, .. } => {
                Some(*handle_id)
            }
        }
    }
}

pub struct DiagnosisApp {
    cmd_tx: Sender<BackendCommand>,
    ui_rx: Receiver<UiEvent>,
    inputs: Vec<String>,
    model: UiModel,
    textures: [SlotTexture; 4],
}

impl DiagnosisApp {
    pub fn new(cmd_tx: Sender<BackendCommand>, ui_rx: Receiver<UiEvent>) -> Self {
        Self {
            cmd_tx,
            ui_rx,
            inputs: vec![String::new(); FEATURE_COUNT],
            model: UiModel::new(),
            textures: std::array::from_fn(|_| SlotTexture::Empty),
        }
    }

    fn process_ui_events(&mut self) {
        while let Ok(event) = self.ui_rx.try_recv() {
            self.model.apply(event);
        }
    }

    fn sync_textures(&mut self, ctx: &egui::Context) {
        for kind in CorrelationKind::ALL {
            let slot = &mut self.textures[kind.index()];
            match self.model.slot(kind) {
                SlotState::Loaded(handle) => {
                    if slot.handle_id() != Some(handle.id()) {
                        *slot = decode_texture(ctx, handle);
                    }
                }
                _ => *slot = SlotTexture::Empty,
            }
        }
    }

    fn dispatch(&mut self, cmd: BackendCommand) {
        dispatch_backend_command(&self.cmd_tx, cmd, &mut self.model.status);
    }

    fn show_top_bar(&mut self, ctx: &egui::Context) {
        egui::TopBottomPanel::top("diagnosis_top_bar").show(ctx, |ui| {
            ui.horizontal(|ui| {
                ui.heading("Breast Cancer Prediction");
                ui.separator();
                let view = self.model.view;
                if ui
                    .selectable_label(view == ViewMode::Form, "Show Prediction")
                    .clicked()
                {
                    self.dispatch(BackendCommand::ShowForm);
                }
                if ui
                    .selectable_label(view == ViewMode::Correlations, "Show Correlations")
                    .clicked()
                {
                    self.dispatch(BackendCommand::ShowCorrelations);
                }
                ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                    ui.weak(&self.model.status);
                });
            });
            if let Some(error) = &self.model.error {
                ui.colored_label(ERROR_COLOR, error.message());
                if let Some(hint) = error.hint() {
                    ui.label(hint);
                }
            }
        });
    }

    fn show_form_view(&mut self, ui: &mut egui::Ui) {
        let Self {
            cmd_tx,
            inputs,
            model,
            ..
        } = self;

        egui::ScrollArea::vertical().show(ui, |ui| {
            for group in FeatureGroup::ALL {
                ui.heading(group.title());
                egui::Grid::new(group.title())
                    .num_columns(3)
                    .striped(true)
                    .show(ui, |ui| {
                        for feature in group.features() {
                            show_feature_row(ui, feature, inputs, cmd_tx, &mut model.status);
                        }
                    });
                ui.add_space(8.0);
            }

            let missing = inputs
                .iter()
                .filter(|raw| !parse_feature_value(raw).is_set())
                .count();
            ui.horizontal(|ui| {
                if ui
                    .add_enabled(missing == 0, egui::Button::new("Predict"))
                    .clicked()
                {
                    dispatch_backend_command(cmd_tx, BackendCommand::Submit, &mut model.status);
                }
                if ui.button("Clear").clicked() {
                    inputs.iter_mut().for_each(String::clear);
                    dispatch_backend_command(cmd_tx, BackendCommand::ResetForm, &mut model.status);
                }
                if missing > 0 {
                    ui.weak(format!("{missing} measurement(s) still missing"));
                }
            });

            if model.prediction.loading {
                ui.horizontal(|ui| {
                    ui.spinner();
                    ui.label("Loading...");
                });
            }
            match &model.prediction.phase {
                PredictionPhase::Failed(err) => {
                    ui.colored_label(ERROR_COLOR, format!("Error: {}", err.message));
                }
                PredictionPhase::Succeeded(result) => {
                    ui.add_space(8.0);
                    ui.heading("Prediction result");
                    ui.label(format!(
                        "Probability of Malignancy: {}",
                        result.probability_percent()
                    ));
                    ui.label(format!("Diagnosis: {}", result.diagnosis));
                }
                PredictionPhase::Idle | PredictionPhase::Pending => {}
            }
        });
    }

    fn show_correlations_view(&mut self, ui: &mut egui::Ui) {
        ui.horizontal(|ui| {
            ui.heading("Correlation Matrices of the Features");
            if ui
                .add_enabled(!self.model.correlations_loading, egui::Button::new("Reload"))
                .clicked()
            {
                self.dispatch(BackendCommand::ReloadCorrelations);
            }
        });
        if self.model.correlations_loading {
            ui.horizontal(|ui| {
                ui.spinner();
                ui.label("Loading correlation matrices...");
            });
        }

        egui::ScrollArea::vertical().show(ui, |ui| {
            for row in CorrelationKind::ALL.chunks(2) {
                ui.columns(row.len(), |columns| {
                    for (column, kind) in columns.iter_mut().zip(row) {
                        self.show_correlation_slot(column, *kind);
                    }
                });
                ui.add_space(12.0);
            }
        });
    }

    fn show_correlation_slot(&self, ui: &mut egui::Ui, kind: CorrelationKind) {
        ui.group(|ui| {
            ui.strong(kind.title());
            match (self.model.slot(kind), &self.textures[kind.index()]) {
                (SlotState::Loaded(_), SlotTexture::Ready { texture, size, .. }) => {
                    let scale = (ui.available_width() / size.x).min(1.0);
                    ui.add(egui::Image::new((texture.id(), *size * scale)));
                }
                (SlotState::Loaded(_), SlotTexture::DecodeFailed { reason, .. }) => {
                    ui.colored_label(
                        ERROR_COLOR,
                        format!("Could not display the {kind} correlation matrix: {reason}"),
                    );
                }
                (SlotState::Failed(message), _) => {
                    ui.colored_label(
                        ERROR_COLOR,
                        format!("Error while loading the {kind} correlation matrix: {message}"),
                    );
                }
                _ => {
                    ui.horizontal(|ui| {
                        ui.spinner();
                        ui.label(format!("Loading the {kind} correlation matrix..."));
                    });
                }
            }
        });
    }
}

fn show_feature_row(
    ui: &mut egui::Ui,
    feature: Feature,
    inputs: &mut [String],
    cmd_tx: &Sender<BackendCommand>,
    status: &mut String,
) {
    let buffer = &mut inputs[feature.index()];
    ui.label(feature.name());
    let response = ui.add(
        egui::TextEdit::singleline(buffer)
            .hint_text(format!("Enter a value for {feature}"))
            .desired_width(160.0),
    );
    if response.changed() {
        dispatch_backend_command(
            cmd_tx,
            BackendCommand::SetField {
                feature,
                raw: buffer.clone(),
            },
            status,
        );
    }
    if !buffer.trim().is_empty() && !parse_feature_value(buffer).is_set() {
        ui.colored_label(ERROR_COLOR, "not a number");
    } else {
        ui.label("");
    }
    ui.end_row();
}

fn decode_texture(ctx: &egui::Context, handle: &ImageHandle) -> SlotTexture {
    match image::load_from_memory(handle.bytes()) {
        Ok(decoded) => {
            let rgba = decoded.to_rgba8();
            let [w, h] = [rgba.width() as usize, rgba.height() as usize];
            let color_image = egui::ColorImage::from_rgba_unmultiplied([w, h], rgba.as_raw());
            let texture = ctx.load_texture(
                format!("correlation:{}:{}", handle.kind(), handle.id()),
                color_image,
                egui::TextureOptions::LINEAR,
            );
            SlotTexture::Ready {
                handle_id: handle.id(),
                texture,
                size: egui::vec2(w as f32, h as f32),
            }
        }
        Err(err) => {
            tracing::warn!(kind = %handle.kind(), "correlation image decode failed: {err}");
            SlotTexture::DecodeFailed {
                handle_id: handle.id(),
                reason: err.to_string(),
            }
        }
    }
}

impl eframe::App for DiagnosisApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        self.process_ui_events();
        self.sync_textures(ctx);
        self.show_top_bar(ctx);

        egui::CentralPanel::default().show(ctx, |ui| match self.model.view {
            ViewMode::Form => self.show_form_view(ui),
            ViewMode::Correlations => self.show_correlations_view(ui),
        });

        if self.model.prediction.loading || self.model.correlations_loading {
            ctx.request_repaint_after(Duration::from_millis(16));
        } else {
            ctx.request_repaint_after(Duration::from_millis(100));
        }
    }
}

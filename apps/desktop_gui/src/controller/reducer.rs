//! UI-side mirror of backend state, updated only through [`UiEvent`]s.

use client_core::{PredictionPhase, PredictionStatus, SlotState, ViewMode};
use shared::domain::CorrelationKind;

use crate::controller::events::{UiError, UiEvent};

pub struct UiModel {
    pub status: String,
    pub error: Option<UiError>,
    pub prediction: PredictionStatus,
    pub view: ViewMode,
    pub slots: [SlotState; 4],
    pub correlations_loading: bool,
}

impl UiModel {
    pub fn new() -> Self {
        Self {
            status: String::new(),
            error: None,
            prediction: PredictionPhase::Idle.into(),
            view: ViewMode::Form,
            slots: Default::default(),
            correlations_loading: false,
        }
    }

    pub fn slot(&self, kind: CorrelationKind) -> &SlotState {
        &self.slots[kind.index()]
    }

    pub fn apply(&mut self, event: UiEvent) {
        match event {
            UiEvent::Info(message) => self.status = message,
            UiEvent::Error(error) => {
                tracing::warn!(context = ?error.context(), "{}", error.message());
                self.error = Some(error);
            }
            UiEvent::PredictionChanged(status) => self.prediction = status,
            UiEvent::ViewChanged(mode) => self.view = mode,
            UiEvent::CorrelationSlotChanged { kind, state } => {
                if state == SlotState::Loading {
                    self.correlations_loading = true;
                }
                self.slots[kind.index()] = state;
            }
            UiEvent::CorrelationsSettled => self.correlations_loading = false,
            UiEvent::CorrelationsReset => {
                self.slots = Default::default();
                self.correlations_loading = false;
            }
        }
    }
}

impl Default for UiModel {
    fn default() -> Self {
        Self::new()
    }
}

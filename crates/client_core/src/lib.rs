use std::sync::Arc;

use shared::{
    domain::{CorrelationKind, Feature, UnknownFeature},
    protocol::{FeatureSnapshot, FeatureValue},
};
use tokio::sync::{broadcast, Mutex};
use tracing::info;

pub mod config;
pub mod correlation;
pub mod error;
pub mod form;
pub mod image_handle;
pub mod prediction;
pub mod transport;
pub mod view;

pub use correlation::{CorrelationImageLoader, CorrelationSnapshot, SlotState, SlotStatus};
pub use form::FormStateStore;
pub use image_handle::{HandleRegistry, ImageHandle};
pub use prediction::{PredictionPhase, PredictionRequestController, PredictionStatus, SubmitOutcome};
pub use transport::{DiagnosisBackend, HttpBackend};
pub use view::{ViewMode, ViewModeSwitch, ViewTransition};

#[derive(Debug, Clone)]
pub enum ClientEvent {
    PredictionChanged(PredictionStatus),
    ViewChanged(ViewMode),
    CorrelationSlotChanged {
        kind: CorrelationKind,
        status: SlotStatus,
    },
    CorrelationsSettled,
    CorrelationsReset,
}

/// Explicit state container for one client session: form input, the prediction
/// flow, the correlation images and the active view.
///
/// Loaded images are cached for the lifetime of the session; switching views
/// never re-fetches them. They are released when the session is dropped or
/// when [`DiagnosisSession::reload_correlations`] replaces them.
pub struct DiagnosisSession {
    form: Mutex<FormStateStore>,
    view: Mutex<ViewModeSwitch>,
    prediction: PredictionRequestController,
    correlations: CorrelationImageLoader,
    events: broadcast::Sender<ClientEvent>,
}

impl DiagnosisSession {
    pub fn new(backend: Arc<dyn DiagnosisBackend>) -> Arc<Self> {
        Self::new_with_handles(backend, HandleRegistry::new())
    }

    pub fn new_with_handles(
        backend: Arc<dyn DiagnosisBackend>,
        handles: Arc<HandleRegistry>,
    ) -> Arc<Self> {
        let (events, _) = broadcast::channel(256);
        Arc::new(Self {
            form: Mutex::new(FormStateStore::new()),
            view: Mutex::new(ViewModeSwitch::new()),
            prediction: PredictionRequestController::new(Arc::clone(&backend), events.clone()),
            correlations: CorrelationImageLoader::new(backend, handles, events.clone()),
            events,
        })
    }

    pub fn subscribe_events(&self) -> broadcast::Receiver<ClientEvent> {
        self.events.subscribe()
    }

    pub fn image_handles(&self) -> &Arc<HandleRegistry> {
        self.correlations.handles()
    }

    pub async fn set_field(&self, feature: Feature, raw: &str) -> FeatureValue {
        self.form.lock().await.set_field(feature, raw)
    }

    pub async fn set_field_by_name(
        &self,
        name: &str,
        raw: &str,
    ) -> Result<FeatureValue, UnknownFeature> {
        let feature = Feature::from_name(name)?;
        Ok(self.set_field(feature, raw).await)
    }

    pub async fn snapshot(&self) -> FeatureSnapshot {
        self.form.lock().await.snapshot()
    }

    pub async fn missing_features(&self) -> Vec<Feature> {
        self.form.lock().await.missing()
    }

    pub async fn reset_form(&self) {
        self.form.lock().await.reset();
    }

    /// Submit the current form contents.
    pub async fn submit(&self) -> SubmitOutcome {
        let snapshot = self.snapshot().await;
        self.submit_snapshot(snapshot).await
    }

    pub async fn submit_snapshot(&self, snapshot: FeatureSnapshot) -> SubmitOutcome {
        self.prediction.submit(snapshot).await
    }

    pub async fn prediction_status(&self) -> PredictionStatus {
        self.prediction.status().await
    }

    pub async fn view_mode(&self) -> ViewMode {
        self.view.lock().await.mode()
    }

    /// Switch views without touching any data flow.
    pub async fn select_view(&self, mode: ViewMode) -> ViewTransition {
        let transition = self.view.lock().await.select(mode);
        if transition != ViewTransition::Unchanged {
            info!(?mode, "view changed");
            let _ = self.events.send(ClientEvent::ViewChanged(mode));
        }
        transition
    }

    /// Start the image load if the set has never been loaded in this session.
    pub async fn ensure_correlations_loaded(&self) -> bool {
        self.correlations.load_if_untouched().await
    }

    /// Enter the correlations view, loading images on first entry.
    /// Resolves once every slot has settled.
    pub async fn show_correlations(&self) -> ViewTransition {
        let transition = self.select_view(ViewMode::Correlations).await;
        if transition == ViewTransition::EnteredCorrelations {
            self.ensure_correlations_loaded().await;
        }
        transition
    }

    pub async fn show_form(&self) -> ViewTransition {
        self.select_view(ViewMode::Form).await
    }

    /// Discard cached images and fetch all four again.
    pub async fn reload_correlations(&self) {
        self.correlations.reset().await;
        self.correlations.load_all().await;
    }

    pub async fn correlation_slot(&self, kind: CorrelationKind) -> SlotState {
        self.correlations.slot(kind).await
    }

    pub async fn correlation_snapshot(&self) -> CorrelationSnapshot {
        self.correlations.snapshot().await
    }
}

#[cfg(test)]
#[path = "tests/support.rs"]
pub(crate) mod test_support;

#[cfg(test)]
#[path = "tests/lib_tests.rs"]
mod tests;

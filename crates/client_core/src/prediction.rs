//! Prediction request/response flow with latest-request-wins semantics.

use std::sync::Arc;

use shared::protocol::{FeatureSnapshot, PredictionResult};
use tokio::sync::{broadcast, Mutex};
use tracing::{debug, info, warn};

use crate::{error::RequestError, transport::DiagnosisBackend, ClientEvent};

#[derive(Debug, Clone, PartialEq, Default)]
pub enum PredictionPhase {
    #[default]
    Idle,
    Pending,
    Succeeded(PredictionResult),
    Failed(RequestError),
}

impl PredictionPhase {
    pub fn result(&self) -> Option<&PredictionResult> {
        match self {
            PredictionPhase::Succeeded(result) => Some(result),
            _ => None,
        }
    }

    pub fn error(&self) -> Option<&RequestError> {
        match self {
            PredictionPhase::Failed(error) => Some(error),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct PredictionStatus {
    pub phase: PredictionPhase,
    /// True only while the latest request is pending.
    pub loading: bool,
}

impl From<PredictionPhase> for PredictionStatus {
    fn from(phase: PredictionPhase) -> Self {
        let loading = phase == PredictionPhase::Pending;
        Self { phase, loading }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum SubmitOutcome {
    Applied(PredictionPhase),
    /// A newer request was issued before this one settled; its reply was dropped.
    Superseded { seq: u64 },
}

#[derive(Default)]
struct PredictionState {
    latest_seq: u64,
    phase: PredictionPhase,
}

pub struct PredictionRequestController {
    backend: Arc<dyn DiagnosisBackend>,
    state: Mutex<PredictionState>,
    events: broadcast::Sender<ClientEvent>,
}

impl PredictionRequestController {
    pub fn new(backend: Arc<dyn DiagnosisBackend>, events: broadcast::Sender<ClientEvent>) -> Self {
        Self {
            backend,
            state: Mutex::new(PredictionState::default()),
            events,
        }
    }

    pub async fn status(&self) -> PredictionStatus {
        self.state.lock().await.phase.clone().into()
    }

    pub async fn submit(&self, snapshot: FeatureSnapshot) -> SubmitOutcome {
        let seq = {
            let mut state = self.state.lock().await;
            state.latest_seq += 1;
            state.phase = PredictionPhase::Pending;
            let _ = self
                .events
                .send(ClientEvent::PredictionChanged(PredictionPhase::Pending.into()));
            state.latest_seq
        };
        info!(
            seq,
            unset = snapshot.unset_count(),
            "prediction: request started"
        );

        let phase = match self.backend.predict(&snapshot).await {
            Ok(result) => PredictionPhase::Succeeded(result),
            Err(err) => {
                warn!(seq, "prediction: request failed: {err}");
                PredictionPhase::Failed(RequestError::from(&err))
            }
        };

        let mut state = self.state.lock().await;
        if state.latest_seq != seq {
            debug!(
                seq,
                latest = state.latest_seq,
                "prediction: dropping stale response"
            );
            return SubmitOutcome::Superseded { seq };
        }
        state.phase = phase.clone();
        info!(seq, succeeded = phase.result().is_some(), "prediction: settled");
        let _ = self
            .events
            .send(ClientEvent::PredictionChanged(phase.clone().into()));
        SubmitOutcome::Applied(phase)
    }
}

#[cfg(test)]
#[path = "tests/prediction_tests.rs"]
mod tests;

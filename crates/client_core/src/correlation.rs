//! Four independent correlation-matrix slots loaded concurrently.

use std::sync::Arc;

use futures::future::join_all;
use shared::domain::CorrelationKind;
use tokio::sync::{broadcast, Mutex};
use tracing::{info, warn};

use crate::{
    image_handle::{HandleRegistry, ImageHandle},
    transport::DiagnosisBackend,
    ClientEvent,
};

#[derive(Debug, Clone, PartialEq, Default)]
pub enum SlotState {
    #[default]
    NotLoaded,
    Loading,
    Loaded(ImageHandle),
    Failed(String),
}

impl SlotState {
    pub fn status(&self) -> SlotStatus {
        match self {
            SlotState::NotLoaded => SlotStatus::NotLoaded,
            SlotState::Loading => SlotStatus::Loading,
            SlotState::Loaded(handle) => SlotStatus::Loaded {
                size: handle.bytes().len(),
            },
            SlotState::Failed(message) => SlotStatus::Failed(message.clone()),
        }
    }
}

/// Handle-free view of a slot, safe to broadcast and log.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SlotStatus {
    NotLoaded,
    Loading,
    Loaded { size: usize },
    Failed(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CorrelationSnapshot {
    pub slots: [SlotStatus; 4],
    pub all_loading: bool,
}

impl CorrelationSnapshot {
    pub fn slot(&self, kind: CorrelationKind) -> &SlotStatus {
        &self.slots[kind.index()]
    }
}

#[derive(Default)]
struct CorrelationImageSet {
    slots: [SlotState; 4],
    /// Bumped on reset so fetches from an earlier load cannot land in the new set.
    generation: u64,
    all_loading: bool,
}

impl CorrelationImageSet {
    fn is_untouched(&self) -> bool {
        self.slots
            .iter()
            .all(|slot| matches!(slot, SlotState::NotLoaded))
    }
}

pub struct CorrelationImageLoader {
    backend: Arc<dyn DiagnosisBackend>,
    handles: Arc<HandleRegistry>,
    set: Mutex<CorrelationImageSet>,
    events: broadcast::Sender<ClientEvent>,
}

impl CorrelationImageLoader {
    pub fn new(
        backend: Arc<dyn DiagnosisBackend>,
        handles: Arc<HandleRegistry>,
        events: broadcast::Sender<ClientEvent>,
    ) -> Self {
        Self {
            backend,
            handles,
            set: Mutex::new(CorrelationImageSet::default()),
            events,
        }
    }

    pub fn handles(&self) -> &Arc<HandleRegistry> {
        &self.handles
    }

    pub async fn is_untouched(&self) -> bool {
        self.set.lock().await.is_untouched()
    }

    pub async fn slot(&self, kind: CorrelationKind) -> SlotState {
        self.set.lock().await.slots[kind.index()].clone()
    }

    pub async fn snapshot(&self) -> CorrelationSnapshot {
        let set = self.set.lock().await;
        CorrelationSnapshot {
            slots: std::array::from_fn(|index| set.slots[index].status()),
            all_loading: set.all_loading,
        }
    }

    /// Fetch all four images, regardless of what the slots currently hold.
    pub async fn load_all(&self) {
        if let Some(generation) = self.begin_load(false).await {
            self.run_load(generation).await;
        }
    }

    /// Fetch all four images only if nothing has been loaded or attempted yet.
    /// Returns whether a load was performed.
    pub async fn load_if_untouched(&self) -> bool {
        match self.begin_load(true).await {
            Some(generation) => {
                self.run_load(generation).await;
                true
            }
            None => false,
        }
    }

    /// Drop every slot back to `NotLoaded`, releasing held image handles.
    pub async fn reset(&self) {
        let released = {
            let mut set = self.set.lock().await;
            set.generation += 1;
            set.all_loading = false;
            std::mem::take(&mut set.slots)
        };
        drop(released);
        let _ = self.events.send(ClientEvent::CorrelationsReset);
    }

    async fn begin_load(&self, only_if_untouched: bool) -> Option<u64> {
        let mut set = self.set.lock().await;
        if only_if_untouched && !set.is_untouched() {
            return None;
        }
        for kind in CorrelationKind::ALL {
            set.slots[kind.index()] = SlotState::Loading;
            let _ = self.events.send(ClientEvent::CorrelationSlotChanged {
                kind,
                status: SlotStatus::Loading,
            });
        }
        set.all_loading = true;
        info!(generation = set.generation, "correlations: loading all matrices");
        Some(set.generation)
    }

    async fn run_load(&self, generation: u64) {
        join_all(
            CorrelationKind::ALL
                .into_iter()
                .map(|kind| self.load_slot(kind, generation)),
        )
        .await;

        let mut set = self.set.lock().await;
        if set.generation != generation {
            return;
        }
        set.all_loading = false;
        let failed = set
            .slots
            .iter()
            .filter(|slot| matches!(slot, SlotState::Failed(_)))
            .count();
        info!(generation, failed, "correlations: all matrices settled");
        let _ = self.events.send(ClientEvent::CorrelationsSettled);
    }

    async fn load_slot(&self, kind: CorrelationKind, generation: u64) {
        let state = match self.backend.fetch_correlation(kind).await {
            Ok(bytes) => SlotState::Loaded(self.handles.acquire(kind, bytes)),
            Err(err) => {
                warn!(%kind, "correlations: {err}");
                SlotState::Failed(err.to_string())
            }
        };

        let mut set = self.set.lock().await;
        if set.generation != generation {
            return;
        }
        let status = state.status();
        let previous = std::mem::replace(&mut set.slots[kind.index()], state);
        drop(set);
        drop(previous);
        let _ = self
            .events
            .send(ClientEvent::CorrelationSlotChanged { kind, status });
    }
}

#[cfg(test)]
#[path = "tests/correlation_tests.rs"]
mod tests;

//! Scoped handles over downloaded image data.
//!
//! A handle is acquired from a [`HandleRegistry`] when an image arrives and is
//! released when its last clone is dropped, so a torn-down view or a replaced
//! slot can never keep image memory alive.

use std::{
    fmt,
    sync::{
        atomic::{AtomicU64, AtomicUsize, Ordering},
        Arc,
    },
};

use shared::domain::CorrelationKind;
use tracing::debug;

#[derive(Debug, Default)]
pub struct HandleRegistry {
    next_id: AtomicU64,
    live: AtomicUsize,
}

impl HandleRegistry {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn acquire(self: &Arc<Self>, kind: CorrelationKind, bytes: Vec<u8>) -> ImageHandle {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed) + 1;
        self.live.fetch_add(1, Ordering::AcqRel);
        debug!(id, %kind, size = bytes.len(), "image handle acquired");
        ImageHandle(Arc::new(HandleInner {
            id,
            kind,
            bytes,
            registry: Arc::clone(self),
        }))
    }

    /// Number of handles acquired and not yet released.
    pub fn live_handles(&self) -> usize {
        self.live.load(Ordering::Acquire)
    }
}

struct HandleInner {
    id: u64,
    kind: CorrelationKind,
    bytes: Vec<u8>,
    registry: Arc<HandleRegistry>,
}

impl Drop for HandleInner {
    fn drop(&mut self) {
        self.registry.live.fetch_sub(1, Ordering::AcqRel);
        debug!(id = self.id, kind = %self.kind, "image handle released");
    }
}

#[derive(Clone)]
pub struct ImageHandle(Arc<HandleInner>);

impl ImageHandle {
    pub fn id(&self) -> u64 {
        self.0.id
    }

    pub fn kind(&self) -> CorrelationKind {
        self.0.kind
    }

    pub fn bytes(&self) -> &[u8] {
        &self.0.bytes
    }
}

impl PartialEq for ImageHandle {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

impl fmt::Debug for ImageHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ImageHandle")
            .field("id", &self.0.id)
            .field("kind", &self.0.kind)
            .field("size", &self.0.bytes.len())
            .finish()
    }
}

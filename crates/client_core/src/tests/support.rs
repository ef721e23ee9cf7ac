//! Test doubles shared by the client_core test modules.

use std::{
    collections::VecDeque,
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc, Mutex as StdMutex,
    },
};

use anyhow::Result;
use async_trait::async_trait;
use axum::Router;
use shared::{
    domain::CorrelationKind,
    protocol::{FeatureSnapshot, PredictionResult},
};
use tokio::{
    net::TcpListener,
    sync::{mpsc, oneshot, Barrier},
};

use crate::{
    error::{ImageLoadError, PredictionError},
    transport::DiagnosisBackend,
};

pub(crate) async fn spawn_server(app: Router) -> Result<String> {
    let listener = TcpListener::bind("127.0.0.1:0").await?;
    let addr = listener.local_addr()?;
    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });
    Ok(format!("http://{addr}"))
}

/// An address nothing listens on.
pub(crate) async fn closed_server_url() -> Result<String> {
    let listener = TcpListener::bind("127.0.0.1:0").await?;
    let addr = listener.local_addr()?;
    drop(listener);
    Ok(format!("http://{addr}"))
}

pub(crate) fn prediction(probability: f64, diagnosis: &str) -> PredictionResult {
    PredictionResult {
        probability,
        diagnosis: diagnosis.to_string(),
    }
}

pub(crate) fn image_bytes(kind: CorrelationKind) -> Vec<u8> {
    format!("png:{kind}").into_bytes()
}

pub(crate) type PredictReply = Result<PredictionResult, PredictionError>;

/// Prediction backend whose replies are released by the test, one gate per call
/// in call order. Each call reports its index on `started` before waiting.
pub(crate) struct GatedPredictions {
    gates: StdMutex<VecDeque<oneshot::Receiver<PredictReply>>>,
    started: mpsc::UnboundedSender<usize>,
    calls: AtomicUsize,
}

impl GatedPredictions {
    pub(crate) fn new(
        calls: usize,
    ) -> (
        Arc<Self>,
        Vec<oneshot::Sender<PredictReply>>,
        mpsc::UnboundedReceiver<usize>,
    ) {
        let (started, started_rx) = mpsc::unbounded_channel();
        let mut senders = Vec::with_capacity(calls);
        let mut gates = VecDeque::with_capacity(calls);
        for _ in 0..calls {
            let (tx, rx) = oneshot::channel();
            senders.push(tx);
            gates.push_back(rx);
        }
        let backend = Arc::new(Self {
            gates: StdMutex::new(gates),
            started,
            calls: AtomicUsize::new(0),
        });
        (backend, senders, started_rx)
    }
}

#[async_trait]
impl DiagnosisBackend for GatedPredictions {
    async fn predict(&self, _snapshot: &FeatureSnapshot) -> PredictReply {
        let call = self.calls.fetch_add(1, Ordering::SeqCst);
        let gate = self.gates.lock().expect("gates").pop_front();
        let _ = self.started.send(call);
        match gate {
            Some(rx) => rx.await.unwrap_or_else(|_| {
                Err(PredictionError::Rejected {
                    status: 0,
                    message: "gate dropped".to_string(),
                })
            }),
            None => Err(PredictionError::Rejected {
                status: 0,
                message: "unexpected prediction call".to_string(),
            }),
        }
    }

    async fn fetch_correlation(&self, kind: CorrelationKind) -> Result<Vec<u8>, ImageLoadError> {
        Err(ImageLoadError::Status { kind, status: 404 })
    }
}

/// Image backend with a fixed outcome per slot and a log of fetch attempts.
#[derive(Default)]
pub(crate) struct ScriptedImages {
    failing: Vec<CorrelationKind>,
    calls: StdMutex<Vec<CorrelationKind>>,
    /// When set, every fetch waits until all four are in flight.
    barrier: Option<Barrier>,
    /// When set, the fetch for this slot waits until the test releases it.
    held: StdMutex<Option<(CorrelationKind, oneshot::Receiver<()>)>>,
}

impl ScriptedImages {
    pub(crate) fn all_ok() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub(crate) fn failing(failing: &[CorrelationKind]) -> Arc<Self> {
        Arc::new(Self {
            failing: failing.to_vec(),
            ..Self::default()
        })
    }

    pub(crate) fn rendezvous() -> Arc<Self> {
        Arc::new(Self {
            barrier: Some(Barrier::new(CorrelationKind::ALL.len())),
            ..Self::default()
        })
    }

    pub(crate) fn holding(kind: CorrelationKind) -> (Arc<Self>, oneshot::Sender<()>) {
        let (release, held) = oneshot::channel();
        let backend = Arc::new(Self {
            held: StdMutex::new(Some((kind, held))),
            ..Self::default()
        });
        (backend, release)
    }

    pub(crate) fn calls(&self) -> Vec<CorrelationKind> {
        self.calls.lock().expect("calls").clone()
    }
}

#[async_trait]
impl DiagnosisBackend for ScriptedImages {
    async fn predict(&self, _snapshot: &FeatureSnapshot) -> PredictReply {
        Ok(prediction(0.1, "Benign"))
    }

    async fn fetch_correlation(&self, kind: CorrelationKind) -> Result<Vec<u8>, ImageLoadError> {
        self.calls.lock().expect("calls").push(kind);
        if let Some(barrier) = &self.barrier {
            barrier.wait().await;
        }
        let held = {
            let mut held = self.held.lock().expect("held");
            match held.take() {
                Some((held_kind, rx)) if held_kind == kind => Some(rx),
                other => {
                    *held = other;
                    None
                }
            }
        };
        if let Some(rx) = held {
            let _ = rx.await;
        }
        if self.failing.contains(&kind) {
            return Err(ImageLoadError::Status { kind, status: 503 });
        }
        Ok(image_bytes(kind))
    }
}

//! Runtime bridge between UI command queue and backend event intake.

use std::{sync::Arc, thread};

use client_core::{
    ClientEvent, DiagnosisSession, HttpBackend, ViewMode, ViewTransition,
};
use crossbeam_channel::{Receiver, Sender, TrySendError};
use shared::domain::CorrelationKind;
use tokio::sync::broadcast::{self, error::RecvError};

use crate::backend_bridge::commands::BackendCommand;
use crate::controller::events::{UiError, UiErrorContext, UiEvent};

pub fn launch(server_url: String, cmd_rx: Receiver<BackendCommand>, ui_tx: Sender<UiEvent>) {
    thread::spawn(move || {
        let _ = ui_tx.try_send(UiEvent::Info("Backend worker starting...".to_string()));
        let runtime = match tokio::runtime::Builder::new_multi_thread()
            .enable_all()
            .build()
        {
            Ok(runtime) => runtime,
            Err(err) => {
                let _ = ui_tx.try_send(UiEvent::Error(UiError::from_message(
                    UiErrorContext::BackendStartup,
                    format!("backend worker startup failure: failed to build runtime: {err}"),
                )));
                tracing::error!("failed to build backend runtime: {err}");
                return;
            }
        };

        runtime.block_on(async move {
            let backend = match HttpBackend::new(&server_url) {
                Ok(backend) => Arc::new(backend),
                Err(err) => {
                    let _ = ui_tx.try_send(UiEvent::Error(UiError::from_message(
                        UiErrorContext::BackendStartup,
                        err.to_string(),
                    )));
                    tracing::error!("backend worker not started: {err}");
                    return;
                }
            };
            let base_url = backend.base_url().to_string();
            let session = DiagnosisSession::new(backend);
            let forwarder = tokio::spawn(forward_client_events(
                session.subscribe_events(),
                Arc::clone(&session),
                ui_tx.clone(),
            ));
            let _ = ui_tx.try_send(UiEvent::Info(format!("Backend: {base_url}")));

            while let Ok(cmd) = cmd_rx.recv() {
                handle_command(&session, cmd).await;
            }

            tracing::info!("ui command queue closed; stopping backend worker");
            forwarder.abort();
        });
    });
}

/// Form and view changes apply in queue order; network work runs as spawned tasks
/// so a slow request never holds up later commands.
async fn handle_command(session: &Arc<DiagnosisSession>, cmd: BackendCommand) {
    match cmd {
        BackendCommand::SetField { feature, raw } => {
            session.set_field(feature, &raw).await;
        }
        BackendCommand::ResetForm => session.reset_form().await,
        BackendCommand::Submit => {
            let snapshot = session.snapshot().await;
            let session = Arc::clone(session);
            tokio::spawn(async move {
                session.submit_snapshot(snapshot).await;
            });
        }
        BackendCommand::ShowForm => {
            session.select_view(ViewMode::Form).await;
        }
        BackendCommand::ShowCorrelations => {
            if session.select_view(ViewMode::Correlations).await
                == ViewTransition::EnteredCorrelations
            {
                let session = Arc::clone(session);
                tokio::spawn(async move {
                    session.ensure_correlations_loaded().await;
                });
            }
        }
        BackendCommand::ReloadCorrelations => {
            let session = Arc::clone(session);
            tokio::spawn(async move {
                session.reload_correlations().await;
            });
        }
    }
}

async fn forward_client_events(
    mut rx: broadcast::Receiver<ClientEvent>,
    session: Arc<DiagnosisSession>,
    ui_tx: Sender<UiEvent>,
) {
    loop {
        let events = match rx.recv().await {
            Ok(event) => vec![to_ui_event(&session, event).await],
            Err(RecvError::Lagged(skipped)) => {
                tracing::warn!(skipped, "client events lagged; resending full state");
                full_state(&session).await
            }
            Err(RecvError::Closed) => break,
        };
        for event in events {
            match ui_tx.try_send(event) {
                Ok(()) => {}
                Err(TrySendError::Full(_)) => tracing::warn!("ui event queue full; event dropped"),
                Err(TrySendError::Disconnected(_)) => return,
            }
        }
    }
}

async fn to_ui_event(session: &DiagnosisSession, event: ClientEvent) -> UiEvent {
    match event {
        ClientEvent::PredictionChanged(status) => UiEvent::PredictionChanged(status),
        ClientEvent::ViewChanged(mode) => UiEvent::ViewChanged(mode),
        ClientEvent::CorrelationSlotChanged { kind, .. } => UiEvent::CorrelationSlotChanged {
            kind,
            state: session.correlation_slot(kind).await,
        },
        ClientEvent::CorrelationsSettled => UiEvent::CorrelationsSettled,
        ClientEvent::CorrelationsReset => UiEvent::CorrelationsReset,
    }
}

async fn full_state(session: &DiagnosisSession) -> Vec<UiEvent> {
    let mut events = vec![
        UiEvent::PredictionChanged(session.prediction_status().await),
        UiEvent::ViewChanged(session.view_mode().await),
    ];
    for kind in CorrelationKind::ALL {
        events.push(UiEvent::CorrelationSlotChanged {
            kind,
            state: session.correlation_slot(kind).await,
        });
    }
    if !session.correlation_snapshot().await.all_loading {
        events.push(UiEvent::CorrelationsSettled);
    }
    events
}

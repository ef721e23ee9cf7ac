use super::*;
use crate::{
    error::PredictionError,
    test_support::{closed_server_url, prediction, spawn_server, GatedPredictions},
    transport::HttpBackend,
};
use axum::{http::StatusCode, routing::post, Json, Router};
use serde_json::{json, Value};
use shared::{
    domain::{Feature, FEATURE_COUNT},
    error::GENERIC_PREDICTION_ERROR,
    protocol::FeatureValue,
};
use tokio::sync::oneshot;

fn controller(backend: Arc<dyn DiagnosisBackend>) -> Arc<PredictionRequestController> {
    let (events, _) = broadcast::channel(64);
    Arc::new(PredictionRequestController::new(backend, events))
}

fn full_snapshot() -> FeatureSnapshot {
    FeatureSnapshot::new([FeatureValue::Value(1.5); FEATURE_COUNT])
}

async fn http_controller(app: Router) -> Arc<PredictionRequestController> {
    let url = spawn_server(app).await.expect("spawn server");
    controller(Arc::new(HttpBackend::new(&url).expect("backend")))
}

#[tokio::test]
async fn starts_idle_without_loading() {
    let (backend, _gates, _started) = GatedPredictions::new(0);
    let status = controller(backend).status().await;
    assert_eq!(status.phase, PredictionPhase::Idle);
    assert!(!status.loading);
}

#[tokio::test]
async fn successful_response_becomes_result() {
    let controller = http_controller(Router::new().route(
        "/predict",
        post(|| async { Json(json!({"probability": 0.8732, "diagnosis": "Malignant"})) }),
    ))
    .await;

    let outcome = controller.submit(full_snapshot()).await;
    let expected = prediction(0.8732, "Malignant");
    assert_eq!(
        outcome,
        SubmitOutcome::Applied(PredictionPhase::Succeeded(expected.clone()))
    );

    let status = controller.status().await;
    assert!(!status.loading);
    assert_eq!(status.phase.error(), None);
    let result = status.phase.result().expect("result");
    assert_eq!(result.probability_percent(), "87.32%");
    assert_eq!(result.diagnosis, "Malignant");
}

#[tokio::test]
async fn rejected_request_surfaces_backend_message() {
    let controller = http_controller(Router::new().route(
        "/predict",
        post(|| async {
            (
                StatusCode::BAD_REQUEST,
                Json(json!({"error": "missing field"})),
            )
        }),
    ))
    .await;

    controller.submit(full_snapshot()).await;

    let status = controller.status().await;
    assert!(!status.loading);
    assert_eq!(status.phase.result(), None);
    assert_eq!(
        status.phase.error().map(|e| e.message.as_str()),
        Some("missing field")
    );
}

#[tokio::test]
async fn rejection_without_json_body_uses_generic_message() {
    let controller = http_controller(Router::new().route(
        "/predict",
        post(|| async { (StatusCode::INTERNAL_SERVER_ERROR, "model exploded") }),
    ))
    .await;

    controller.submit(full_snapshot()).await;

    let status = controller.status().await;
    assert_eq!(
        status.phase,
        PredictionPhase::Failed(RequestError::new(GENERIC_PREDICTION_ERROR))
    );
}

#[tokio::test]
async fn transport_failure_reports_transport_message() {
    let url = closed_server_url().await.expect("closed url");
    let controller = controller(Arc::new(HttpBackend::new(&url).expect("backend")));

    controller.submit(full_snapshot()).await;

    let status = controller.status().await;
    let error = status.phase.error().expect("transport error");
    assert!(!error.message.is_empty());
    assert!(!status.loading);
}

#[tokio::test]
async fn forwards_every_feature_including_unset_ones() {
    let (tx, rx) = oneshot::channel::<Value>();
    let tx = Arc::new(std::sync::Mutex::new(Some(tx)));
    let controller = http_controller(Router::new().route(
        "/predict",
        post(move |Json(body): Json<Value>| {
            let tx = Arc::clone(&tx);
            async move {
                if let Some(tx) = tx.lock().expect("tx").take() {
                    let _ = tx.send(body);
                }
                Json(json!({"probability": 0.02, "diagnosis": "Benign"}))
            }
        }),
    ))
    .await;

    let mut values = [FeatureValue::Unset; FEATURE_COUNT];
    values[Feature::from_name("worst area").expect("feature").index()] = FeatureValue::Value(2019.0);
    controller.submit(FeatureSnapshot::new(values)).await;

    let body = rx.await.expect("request body");
    let object = body.as_object().expect("object body");
    assert_eq!(object.len(), FEATURE_COUNT);
    assert_eq!(object["worst area"], json!(2019.0));
    assert!(object["mean radius"].is_null());
}

#[tokio::test]
async fn new_submit_clears_previous_result_while_pending() {
    let (backend, mut gates, mut started) = GatedPredictions::new(2);
    let controller = controller(backend);

    let first_gate = gates.remove(0);
    let task = tokio::spawn({
        let controller = Arc::clone(&controller);
        async move { controller.submit(full_snapshot()).await }
    });
    started.recv().await.expect("first started");
    let _ = first_gate.send(Ok(prediction(0.9, "Malignant")));
    task.await.expect("join");
    assert!(controller.status().await.phase.result().is_some());

    let second_gate = gates.remove(0);
    let task = tokio::spawn({
        let controller = Arc::clone(&controller);
        async move { controller.submit(full_snapshot()).await }
    });
    started.recv().await.expect("second started");

    let pending = controller.status().await;
    assert_eq!(pending.phase, PredictionPhase::Pending);
    assert!(pending.loading);

    let _ = second_gate.send(Err(PredictionError::Rejected {
        status: 400,
        message: "missing field".to_string(),
    }));
    task.await.expect("join");
    let status = controller.status().await;
    assert_eq!(status.phase.result(), None);
    assert_eq!(
        status.phase,
        PredictionPhase::Failed(RequestError::new("missing field"))
    );
}

#[tokio::test]
async fn late_reply_from_older_request_is_ignored() {
    let (backend, mut gates, mut started) = GatedPredictions::new(2);
    let controller = controller(backend);
    let second_gate = gates.pop().expect("second gate");
    let first_gate = gates.pop().expect("first gate");

    let first = tokio::spawn({
        let controller = Arc::clone(&controller);
        async move { controller.submit(full_snapshot()).await }
    });
    started.recv().await.expect("first started");
    let second = tokio::spawn({
        let controller = Arc::clone(&controller);
        async move { controller.submit(full_snapshot()).await }
    });
    started.recv().await.expect("second started");

    let _ = second_gate.send(Ok(prediction(0.05, "Benign")));
    assert_eq!(
        second.await.expect("join"),
        SubmitOutcome::Applied(PredictionPhase::Succeeded(prediction(0.05, "Benign")))
    );

    let _ = first_gate.send(Ok(prediction(0.97, "Malignant")));
    assert_eq!(
        first.await.expect("join"),
        SubmitOutcome::Superseded { seq: 1 }
    );

    let status = controller.status().await;
    assert_eq!(
        status.phase,
        PredictionPhase::Succeeded(prediction(0.05, "Benign"))
    );
    assert!(!status.loading);
}

#[tokio::test]
async fn older_reply_arriving_first_keeps_newer_request_pending() {
    let (backend, mut gates, mut started) = GatedPredictions::new(2);
    let controller = controller(backend);
    let second_gate = gates.pop().expect("second gate");
    let first_gate = gates.pop().expect("first gate");

    let first = tokio::spawn({
        let controller = Arc::clone(&controller);
        async move { controller.submit(full_snapshot()).await }
    });
    started.recv().await.expect("first started");
    let second = tokio::spawn({
        let controller = Arc::clone(&controller);
        async move { controller.submit(full_snapshot()).await }
    });
    started.recv().await.expect("second started");

    let _ = first_gate.send(Ok(prediction(0.97, "Malignant")));
    assert_eq!(
        first.await.expect("join"),
        SubmitOutcome::Superseded { seq: 1 }
    );
    let status = controller.status().await;
    assert_eq!(status.phase, PredictionPhase::Pending);
    assert!(status.loading);

    let _ = second_gate.send(Err(PredictionError::Rejected {
        status: 500,
        message: "model not loaded".to_string(),
    }));
    second.await.expect("join");
    assert_eq!(
        controller.status().await.phase,
        PredictionPhase::Failed(RequestError::new("model not loaded"))
    );
}

#[tokio::test]
async fn publishes_pending_then_settled_events() {
    let (backend, mut gates, mut started) = GatedPredictions::new(1);
    let (events, mut rx) = broadcast::channel(16);
    let controller = Arc::new(PredictionRequestController::new(backend, events));

    let task = tokio::spawn({
        let controller = Arc::clone(&controller);
        async move { controller.submit(full_snapshot()).await }
    });
    started.recv().await.expect("started");
    let _ = gates.remove(0).send(Ok(prediction(0.4, "Benign")));
    task.await.expect("join");

    match rx.recv().await.expect("pending event") {
        ClientEvent::PredictionChanged(status) => assert!(status.loading),
        other => panic!("unexpected event: {other:?}"),
    }
    match rx.recv().await.expect("settled event") {
        ClientEvent::PredictionChanged(status) => {
            assert!(!status.loading);
            assert_eq!(status.phase.result(), Some(&prediction(0.4, "Benign")));
        }
        other => panic!("unexpected event: {other:?}"),
    }
}

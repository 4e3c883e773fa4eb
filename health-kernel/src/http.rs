/**
 * API REST MACHINE HEALTH - Serveur HTTP du kernel
 *
 * RÔLE :
 * Expose le SyncProtocol (Fetch / Submit) sur HTTP+JSON.
 *
 * ROUTES :
 * - GET  /health                        : liveness
 * - GET  /system/health                 : uptime + volumétrie du store
 * - GET  /machine-data/{username}       : historique de l'utilisateur (`[]` si inconnu)
 * - POST /machine-health/{username}     : soumission -> 200 score | 400 | 500
 *
 * Le Submit fait des I/O disque synchrones : il tourne sur le pool bloquant
 * de tokio pour ne pas geler les autres requêtes.
 */

use crate::health::{HealthTracker, KernelHealth};
use crate::models::{ErrorBody, Record};
use crate::store::SharedStore;
use crate::sync::{self, SubmitOutcome};
use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::Value;
use tracing::error;

#[derive(Clone)]
pub struct AppState {
    pub store: SharedStore,
    pub health_tracker: HealthTracker,
}

pub fn build_router(app_state: AppState) -> Router {
    Router::new()
        .route("/health", get(|| async { "ok" }))
        .route("/system/health", get(get_system_health))
        .route("/machine-data/{username}", get(get_machine_data))
        .route("/machine-health/{username}", post(post_machine_health))
        .with_state(app_state)
}

// GET /system/health
async fn get_system_health(State(app): State<AppState>) -> Json<KernelHealth> {
    Json(app.health_tracker.get_health(&app.store))
}

// GET /machine-data/{username}
async fn get_machine_data(
    State(app): State<AppState>,
    Path(username): Path<String>,
) -> Json<Vec<Record>> {
    Json(sync::fetch(&app.store, &username))
}

// POST /machine-health/{username}
async fn post_machine_health(
    State(app): State<AppState>,
    Path(username): Path<String>,
    body: Result<Json<Value>, JsonRejection>,
) -> Response {
    let body = match body {
        Ok(Json(body)) => body,
        Err(rejection) => {
            return SubmitOutcome::Rejected(ErrorBody::new(rejection.body_text())).into_response()
        }
    };

    let store = app.store.clone();
    match tokio::task::spawn_blocking(move || sync::submit(&store, &username, body)).await {
        Ok(outcome) => outcome.into_response(),
        Err(e) => {
            error!("submission task failed: {e}");
            SubmitOutcome::Failed(ErrorBody::new("submission task failed")).into_response()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ports::MemoryPort;
    use crate::scoring::ThresholdScorer;
    use crate::store::{RecordStore, DEFAULT_CAPACITY};
    use axum::body::{to_bytes, Body};
    use axum::http::{Request, StatusCode};
    use serde_json::json;
    use std::sync::Arc;
    use tower::ServiceExt;

    fn app(port: &MemoryPort) -> Router {
        let store = RecordStore::open(
            Box::new(port.clone()),
            Box::new(ThresholdScorer::default()),
            DEFAULT_CAPACITY,
        )
        .unwrap();
        build_router(AppState {
            store: Arc::new(store),
            health_tracker: HealthTracker::new(),
        })
    }

    async fn send(app: &Router, request: Request<Body>) -> (StatusCode, Value) {
        let response = app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        (status, body)
    }

    fn post_json(uri: &str, body: Value) -> Request<Body> {
        Request::post(uri)
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    fn get(uri: &str) -> Request<Body> {
        Request::get(uri).body(Body::empty()).unwrap()
    }

    #[tokio::test]
    async fn test_unknown_user_fetch_is_empty_array() {
        let app = app(&MemoryPort::new());
        let (status, body) = send(&app, get("/machine-data/nobody")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!([]));
    }

    #[tokio::test]
    async fn test_submit_then_fetch() {
        let app = app(&MemoryPort::new());
        let submission = json!({"machines": {"weldingRobot": {"electrodeWear": "1"}}});

        let (status, score) = send(&app, post_json("/machine-health/test", submission.clone())).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(score["factory"], "87.50");

        let (_, history) = send(&app, get("/machine-data/test")).await;
        assert_eq!(
            history,
            json!([{"machines": submission["machines"], "machineHealth": score}])
        );
    }

    #[tokio::test]
    async fn test_scoring_failure_is_400_with_error() {
        let port = MemoryPort::new();
        let app = app(&port);
        let (status, body) =
            send(&app, post_json("/machine-health/test", json!({"machines": "nope"}))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["error"].is_string());
        assert_eq!(port.save_count(), 0);
    }

    #[tokio::test]
    async fn test_malformed_json_is_400() {
        let app = app(&MemoryPort::new());
        let request = Request::post("/machine-health/test")
            .header("content-type", "application/json")
            .body(Body::from("{ nope"))
            .unwrap();
        let (status, body) = send(&app, request).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["error"].is_string());
    }

    #[tokio::test]
    async fn test_persistence_failure_is_500() {
        let port = MemoryPort::new();
        let app = app(&port);
        port.fail_saves(true);

        let (status, body) = send(
            &app,
            post_json("/machine-health/test", json!({"machines": {"weldingRobot": {"electrodeWear": "1"}}})),
        )
        .await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert!(body["error"].is_string());

        let (_, history) = send(&app, get("/machine-data/test")).await;
        assert_eq!(history, json!([]));
    }

    #[tokio::test]
    async fn test_system_health_counts() {
        let app = app(&MemoryPort::new());
        send(
            &app,
            post_json("/machine-health/a", json!({"machines": {"weldingRobot": {"electrodeWear": "1"}}})),
        )
        .await;

        let (status, health) = send(&app, get("/system/health")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(health["users_tracked"], 1);
        assert_eq!(health["records_stored"], 1);
        assert_eq!(health["capacity"], 11);
        assert_eq!(health["storage"]["kind"], "memory");
    }
}

// api.rs — HTTP routes over the session lifecycle.
//
// Every response has the shape `{success, data, message}`. Denials are not
// server errors: out-of-order actions are 400, movement violations are 403
// and carry the current session as `data`, missing sessions are 404, and
// duplicates are 409. Only storage and audit failures produce 500.
//
// Request bodies go through `JsonBody`, so a malformed or mistyped body is
// still answered with the envelope (400) rather than axum's plain-text
// rejection.
//
// The lifecycle is synchronous and touches the filesystem, so each call runs
// on the blocking pool.

use std::sync::Arc;

use axum::extract::rejection::JsonRejection;
use axum::extract::{FromRequest, Path, Request, State};
use axum::http::{header, HeaderValue, Method, StatusCode};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tower_http::cors::{AllowOrigin, CorsLayer};
use wb_session::{SessionError, SessionLifecycle};

use crate::config::DaemonConfig;

/// Shared handler state.
#[derive(Clone)]
pub struct AppState {
    pub lifecycle: Arc<SessionLifecycle>,
}

/// The uniform response envelope.
#[derive(Debug, Serialize, Deserialize)]
pub struct ApiResponse {
    pub success: bool,
    pub data: Value,
    pub message: String,
}

type Reply = (StatusCode, Json<ApiResponse>);

fn reply(status: StatusCode, success: bool, data: Value, message: impl Into<String>) -> Reply {
    (
        status,
        Json(ApiResponse {
            success,
            data,
            message: message.into(),
        }),
    )
}

/// `Json<T>` whose rejection is an enveloped 400.
struct JsonBody<T>(T);

impl<S, T> FromRequest<S> for JsonBody<T>
where
    Json<T>: FromRequest<S, Rejection = JsonRejection>,
    S: Send + Sync,
{
    type Rejection = Reply;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        match Json::<T>::from_request(req, state).await {
            Ok(Json(value)) => Ok(Self(value)),
            Err(rejection) => {
                tracing::debug!(error = %rejection.body_text(), "rejected request body");
                Err(reply(
                    StatusCode::BAD_REQUEST,
                    false,
                    Value::Null,
                    format!("Invalid request body: {}", rejection.body_text()),
                ))
            }
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TruckRequest {
    #[serde(default)]
    truck_id: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TareRequest {
    #[serde(default)]
    truck_id: String,
    #[serde(default)]
    tare_weight: Option<Value>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GrossRequest {
    #[serde(default)]
    truck_id: String,
    #[serde(default)]
    gross_weight: Option<Value>,
}

/// Build the router with CORS applied.
pub fn router(state: AppState, config: &DaemonConfig) -> Router {
    let cors_config = config.clone();
    let cors = CorsLayer::new()
        .allow_origin(AllowOrigin::predicate(
            move |origin: &HeaderValue, _parts| {
                origin
                    .to_str()
                    .map(|o| cors_config.origin_allowed(o))
                    .unwrap_or(false)
            },
        ))
        .allow_methods([Method::GET, Method::POST])
        .allow_headers([header::CONTENT_TYPE])
        .allow_credentials(true);

    Router::new()
        .route("/api/session/start", post(start_session))
        .route("/api/session/tare", post(record_tare))
        .route("/api/session/dock", post(enter_dock))
        .route("/api/session/gross", post(record_gross))
        .route("/api/session/invoice", post(generate_invoice))
        .route("/api/session/exit", post(exit_session))
        .route("/api/session/{truck_id}", get(get_session))
        .route("/api/sessions", get(list_sessions))
        .route("/api/events/{truck_id}", get(list_events))
        .route("/api/health", get(health))
        .layer(cors)
        .with_state(state)
}

/// Run a lifecycle call on the blocking pool, mapping failures to a reply.
async fn blocking<T, F>(state: &AppState, op: F) -> Result<T, Reply>
where
    T: Send + 'static,
    F: FnOnce(&SessionLifecycle) -> Result<T, SessionError> + Send + 'static,
{
    let lifecycle = Arc::clone(&state.lifecycle);
    match tokio::task::spawn_blocking(move || op(&lifecycle)).await {
        Ok(result) => result.map_err(error_reply),
        Err(e) => {
            tracing::error!(error = %e, "lifecycle task panicked");
            Err(reply(
                StatusCode::INTERNAL_SERVER_ERROR,
                false,
                Value::Null,
                "Internal server error",
            ))
        }
    }
}

/// Accept a JSON number or a numeric string. Anything else becomes NaN so
/// the lifecycle rejects it after the state check.
fn parse_weight(value: Option<&Value>) -> f64 {
    match value {
        Some(Value::Number(n)) => n.as_f64().unwrap_or(f64::NAN),
        Some(Value::String(s)) => s.trim().parse().unwrap_or(f64::NAN),
        _ => f64::NAN,
    }
}

fn to_data<T: Serialize>(value: &T) -> Value {
    serde_json::to_value(value).unwrap_or(Value::Null)
}

fn error_reply(err: SessionError) -> Reply {
    match err {
        SessionError::InvalidArgument(message) => {
            reply(StatusCode::BAD_REQUEST, false, Value::Null, message)
        }
        SessionError::PolicyDenied { reason, .. } => {
            reply(StatusCode::BAD_REQUEST, false, Value::Null, reason)
        }
        SessionError::MovementViolation { reason, session } => {
            reply(StatusCode::FORBIDDEN, false, to_data(&*session), reason)
        }
        SessionError::NotFound { .. } => reply(
            StatusCode::NOT_FOUND,
            false,
            Value::Null,
            "No active session found",
        ),
        SessionError::Conflict(message) => reply(StatusCode::CONFLICT, false, Value::Null, message),
        other => {
            tracing::error!(error = %other, "request failed");
            reply(
                StatusCode::INTERNAL_SERVER_ERROR,
                false,
                Value::Null,
                other.to_string(),
            )
        }
    }
}

async fn start_session(State(state): State<AppState>, JsonBody(req): JsonBody<TruckRequest>) -> Reply {
    match blocking(&state, move |l| l.start(&req.truck_id)).await {
        Ok(session) => reply(StatusCode::CREATED, true, to_data(&session), "Session started"),
        Err(r) => r,
    }
}

async fn record_tare(State(state): State<AppState>, JsonBody(req): JsonBody<TareRequest>) -> Reply {
    let weight = parse_weight(req.tare_weight.as_ref());
    match blocking(&state, move |l| l.record_tare(&req.truck_id, weight)).await {
        Ok(session) => reply(
            StatusCode::OK,
            true,
            to_data(&session),
            format!("Tare weight recorded: {} kg", weight),
        ),
        Err(r) => r,
    }
}

async fn enter_dock(State(state): State<AppState>, JsonBody(req): JsonBody<TruckRequest>) -> Reply {
    match blocking(&state, move |l| l.enter_dock(&req.truck_id)).await {
        Ok(session) => reply(
            StatusCode::OK,
            true,
            to_data(&session),
            format!("Dock entry #{} confirmed", session.visit_count),
        ),
        Err(r) => r,
    }
}

async fn record_gross(State(state): State<AppState>, JsonBody(req): JsonBody<GrossRequest>) -> Reply {
    let weight = parse_weight(req.gross_weight.as_ref());
    match blocking(&state, move |l| l.record_gross(&req.truck_id, weight)).await {
        Ok(session) => reply(
            StatusCode::OK,
            true,
            to_data(&session),
            format!("Gross weight recorded: {} kg", weight),
        ),
        Err(r) => r,
    }
}

async fn generate_invoice(State(state): State<AppState>, JsonBody(req): JsonBody<TruckRequest>) -> Reply {
    match blocking(&state, move |l| l.generate_invoice(&req.truck_id)).await {
        Ok(session) => reply(
            StatusCode::OK,
            true,
            to_data(&session),
            "Invoice generated. Movement is now locked.",
        ),
        Err(r) => r,
    }
}

async fn exit_session(State(state): State<AppState>, JsonBody(req): JsonBody<TruckRequest>) -> Reply {
    match blocking(&state, move |l| l.exit(&req.truck_id)).await {
        Ok(session) => reply(
            StatusCode::OK,
            true,
            to_data(&session),
            "Truck exited. Session complete.",
        ),
        Err(r) => r,
    }
}

async fn get_session(State(state): State<AppState>, Path(truck_id): Path<String>) -> Reply {
    match blocking(&state, move |l| l.get_active(&truck_id)).await {
        Ok(session) => reply(StatusCode::OK, true, to_data(&session), "Session retrieved"),
        Err(r) => r,
    }
}

async fn list_sessions(State(state): State<AppState>) -> Reply {
    match blocking(&state, |l| l.list_all()).await {
        Ok(sessions) => reply(
            StatusCode::OK,
            true,
            to_data(&sessions),
            format!("{} session(s) found", sessions.len()),
        ),
        Err(r) => r,
    }
}

async fn list_events(State(state): State<AppState>, Path(truck_id): Path<String>) -> Reply {
    match blocking(&state, move |l| l.events(&truck_id)).await {
        Ok(events) => reply(
            StatusCode::OK,
            true,
            to_data(&events),
            format!("{} event(s) found", events.len()),
        ),
        Err(r) => r,
    }
}

async fn health() -> Reply {
    reply(StatusCode::OK, true, Value::Null, "Server is running")
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::Request;
    use tower::ServiceExt;
    use wb_audit::MemoryAuditLog;
    use wb_session::MemorySessionStore;

    fn app() -> Router {
        let lifecycle = SessionLifecycle::new(
            Arc::new(MemorySessionStore::new()),
            Arc::new(MemoryAuditLog::new()),
        );
        router(
            AppState {
                lifecycle: Arc::new(lifecycle),
            },
            &DaemonConfig::default(),
        )
    }

    async fn call(app: &Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, ApiResponse) {
        call_raw(app, method, uri, body.map(|json| json.to_string())).await
    }

    async fn call_raw(
        app: &Router,
        method: &str,
        uri: &str,
        body: Option<String>,
    ) -> (StatusCode, ApiResponse) {
        let builder = Request::builder().method(method).uri(uri);
        let request = match body {
            Some(text) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(text))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };
        let response = app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    fn post_json(truck: &str) -> Option<Value> {
        Some(serde_json::json!({ "truckId": truck }))
    }

    #[tokio::test]
    async fn health_reports_running() {
        let app = app();
        let (status, body) = call(&app, "GET", "/api/health", None).await;
        assert_eq!(status, StatusCode::OK);
        assert!(body.success);
        assert!(body.data.is_null());
    }

    #[tokio::test]
    async fn start_returns_created_then_conflict() {
        let app = app();
        let (status, body) = call(&app, "POST", "/api/session/start", post_json("T1")).await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(body.data["state"], "ENTRY");
        assert_eq!(body.data["truckId"], "T1");

        let (status, body) = call(&app, "POST", "/api/session/start", post_json("T1")).await;
        assert_eq!(status, StatusCode::CONFLICT);
        assert!(!body.success);
        assert!(body.data.is_null());
    }

    #[tokio::test]
    async fn missing_truck_id_is_bad_request() {
        let app = app();
        let (status, body) =
            call(&app, "POST", "/api/session/start", Some(serde_json::json!({}))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body.message, "truckId is required");
    }

    #[tokio::test]
    async fn tare_accepts_numeric_strings_and_rejects_garbage() {
        let app = app();
        call(&app, "POST", "/api/session/start", post_json("T1")).await;

        let (status, body) = call(
            &app,
            "POST",
            "/api/session/tare",
            Some(serde_json::json!({ "truckId": "T1", "tareWeight": "abc" })),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body.message, "Valid tare weight is required (positive number)");

        let (status, body) = call(
            &app,
            "POST",
            "/api/session/tare",
            Some(serde_json::json!({ "truckId": "T1", "tareWeight": "12000" })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body.data["tareWeight"], 12000.0);
        assert_eq!(body.message, "Tare weight recorded: 12000 kg");
    }

    #[tokio::test]
    async fn out_of_order_dock_is_bad_request_with_null_data() {
        let app = app();
        call(&app, "POST", "/api/session/start", post_json("T1")).await;
        let (status, body) = call(&app, "POST", "/api/session/dock", post_json("T1")).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body.data.is_null());
        assert!(body.message.contains("Required state(s): TARE_DONE, GROSS_DONE"));
    }

    #[tokio::test]
    async fn post_invoice_dock_is_forbidden_with_session_data() {
        let app = app();
        call(&app, "POST", "/api/session/start", post_json("T1")).await;
        call(
            &app,
            "POST",
            "/api/session/tare",
            Some(serde_json::json!({ "truckId": "T1", "tareWeight": 12000 })),
        )
        .await;
        let (_, body) = call(&app, "POST", "/api/session/dock", post_json("T1")).await;
        assert_eq!(body.message, "Dock entry #1 confirmed");
        call(
            &app,
            "POST",
            "/api/session/gross",
            Some(serde_json::json!({ "truckId": "T1", "grossWeight": 28000 })),
        )
        .await;
        let (status, _) = call(&app, "POST", "/api/session/invoice", post_json("T1")).await;
        assert_eq!(status, StatusCode::OK);

        let (status, body) = call(&app, "POST", "/api/session/dock", post_json("T1")).await;
        assert_eq!(status, StatusCode::FORBIDDEN);
        assert!(!body.success);
        assert_eq!(body.data["state"], "INVOICE_GENERATED");
        assert_eq!(body.data["movementLock"], true);
        assert_eq!(body.data["visitCount"], 1);

        let (_, events) = call(&app, "GET", "/api/events/T1", None).await;
        assert_eq!(events.data[0]["eventType"], "VIOLATION");
        assert_eq!(events.message, "6 event(s) found");

        let (status, _) = call(&app, "POST", "/api/session/exit", post_json("T1")).await;
        assert_eq!(status, StatusCode::OK);
        let (status, body) = call(&app, "GET", "/api/session/T1", None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body.message, "No active session found");
    }

    #[tokio::test]
    async fn list_sessions_includes_exited() {
        let app = app();
        call(&app, "POST", "/api/session/start", post_json("T1")).await;
        call(
            &app,
            "POST",
            "/api/session/tare",
            Some(serde_json::json!({ "truckId": "T1", "tareWeight": 10000 })),
        )
        .await;
        call(&app, "POST", "/api/session/dock", post_json("T1")).await;
        call(
            &app,
            "POST",
            "/api/session/gross",
            Some(serde_json::json!({ "truckId": "T1", "grossWeight": 25000 })),
        )
        .await;
        call(&app, "POST", "/api/session/invoice", post_json("T1")).await;
        let (status, _) = call(&app, "POST", "/api/session/exit", post_json("T1")).await;
        assert_eq!(status, StatusCode::OK);
        call(&app, "POST", "/api/session/start", post_json("T2")).await;

        let (status, body) = call(&app, "GET", "/api/sessions", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body.message, "2 session(s) found");
        let states: Vec<&str> = body
            .data
            .as_array()
            .unwrap()
            .iter()
            .map(|s| s["state"].as_str().unwrap())
            .collect();
        assert_eq!(states, vec!["ENTRY", "EXITED"]);
    }

    #[tokio::test]
    async fn mistyped_body_gets_the_envelope() {
        let app = app();
        let (status, body) = call(
            &app,
            "POST",
            "/api/session/start",
            Some(serde_json::json!({ "truckId": 5 })),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(!body.success);
        assert!(body.data.is_null());
        assert!(body.message.starts_with("Invalid request body"));
    }

    #[tokio::test]
    async fn unparseable_body_gets_the_envelope() {
        let app = app();
        let (status, body) = call_raw(
            &app,
            "POST",
            "/api/session/dock",
            Some("{\"truckId\": ".to_string()),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(!body.success);
        assert!(body.message.starts_with("Invalid request body"));

        let (status, body) = call_raw(&app, "POST", "/api/session/tare", None).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(!body.success);
    }

    #[test]
    fn parse_weight_accepts_numbers_and_numeric_strings() {
        assert_eq!(parse_weight(Some(&serde_json::json!(12000))), 12000.0);
        assert_eq!(parse_weight(Some(&serde_json::json!(" 28000.5 "))), 28000.5);
        assert!(parse_weight(Some(&serde_json::json!(true))).is_nan());
        assert!(parse_weight(None).is_nan());
    }
}

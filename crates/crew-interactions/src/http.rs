use std::sync::Arc;

use axum::{
    Router,
    body::{Body, Bytes},
    extract::State,
    http::{HeaderMap, Response, StatusCode},
    routing::{get, post},
};
use serde_json::{Value, json};
use tracing::{error, warn};

use crate::dispatch::{HandleOutcome, InteractionService};
use crate::registration::{CommandRegistrar, REGISTER_SECRET_HEADER, RegistrationError};

pub const INTERACTIONS_PATH: &str = "/api/discord/interactions";
pub const REGISTER_PATH: &str = "/api/discord/register";
pub const HEALTH_PATH: &str = "/healthz";

const CONTENT_TYPE_JSON: &str = "application/json";
// Served only if a reply somehow fails to serialize.
const FALLBACK_REPLY: &str = r#"{"type":4,"data":{"content":"Something went wrong while handling this interaction. Please try again later.","flags":64}}"#;

pub struct PortalState {
    pub interactions: InteractionService,
    pub registrar: CommandRegistrar,
}

pub fn router(state: Arc<PortalState>) -> Router {
    Router::new()
        .route(INTERACTIONS_PATH, post(interactions))
        .route(REGISTER_PATH, post(register))
        .route(HEALTH_PATH, get(health))
        .with_state(state)
}

fn header<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers.get(name).and_then(|value| value.to_str().ok())
}

/// Webhook entry point. The body is taken as raw bytes so the signature is
/// checked against exactly what was signed.
pub async fn interactions(
    State(state): State<Arc<PortalState>>,
    headers: HeaderMap,
    body: Bytes,
) -> Response<Body> {
    let outcome = state
        .interactions
        .handle(&headers, &body)
        .await;
    match outcome {
        HandleOutcome::Unauthorized => {
            warn!("rejected interaction with invalid signature");
            json_response(
                StatusCode::UNAUTHORIZED,
                &json!({ "error": "invalid request signature" }),
            )
        }
        HandleOutcome::Reply(reply) => {
            let bytes = serde_json::to_vec(&reply).unwrap_or_else(|err| {
                error!(error = %err, "failed to serialize interaction reply");
                FALLBACK_REPLY.as_bytes().to_vec()
            });
            bytes_response(StatusCode::OK, bytes)
        }
    }
}

pub async fn register(State(state): State<Arc<PortalState>>, headers: HeaderMap) -> Response<Body> {
    if !state
        .registrar
        .authorize(header(&headers, REGISTER_SECRET_HEADER))
    {
        return json_response(
            StatusCode::UNAUTHORIZED,
            &json!({ "error": "invalid registration secret" }),
        );
    }
    match state.registrar.register().await {
        Ok(registered) => json_response(StatusCode::OK, &registered),
        Err(err) => {
            error!(error = %err, "command registration failed");
            let (status, payload) = match &err {
                RegistrationError::NotConfigured(_) | RegistrationError::InvalidApiBase(_) => (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    json!({ "error": err.to_string() }),
                ),
                RegistrationError::Transport(_) => {
                    (StatusCode::BAD_GATEWAY, json!({ "error": err.to_string() }))
                }
                RegistrationError::Upstream { status, body } => (
                    StatusCode::BAD_GATEWAY,
                    json!({
                        "error": "platform rejected command registration",
                        "status": status,
                        "body": body,
                    }),
                ),
            };
            json_response(status, &payload)
        }
    }
}

pub async fn health() -> &'static str {
    "ok"
}

fn json_response(status: StatusCode, payload: &Value) -> Response<Body> {
    bytes_response(status, payload.to_string().into_bytes())
}

fn bytes_response(status: StatusCode, bytes: Vec<u8>) -> Response<Body> {
    Response::builder()
        .status(status)
        .header("content-type", CONTENT_TYPE_JSON)
        .body(Body::from(bytes))
        .expect("building JSON response must succeed")
}

mod support;

use std::sync::Arc;

use axum::body::{Body, to_bytes};
use axum::http::{Method, Request, StatusCode};
use chrono::NaiveDate;
use crew_interactions::pirep::FixedClock;
use crew_interactions::{Collaborators, PortalConfig, PostgrestStore, build_state_with, router};
use ed25519_dalek::{Signer, SigningKey};
use serde_json::{Value, json};
use support::FakeUpstream;
use tower::ServiceExt;

const INVOKER: &str = "80351110224678912";
const TIMESTAMP: &str = "1760000000";

fn signing_key() -> SigningKey {
    SigningKey::from_bytes(&[23u8; 32])
}

fn portal_config(store: &FakeUpstream, platform: Option<&FakeUpstream>) -> PortalConfig {
    let mut config = PortalConfig::default();
    config.discord.public_key = Some(hex::encode(signing_key().verifying_key().to_bytes()));
    config.discord.application_id = Some("1122334455".into());
    config.discord.bot_token = Some("bot-token".into());
    config.discord.register_secret = Some("hangar-door".into());
    if let Some(platform) = platform {
        config.discord.api_base = platform.base.clone();
    }
    config.store.url = Some(store.base.clone());
    config.store.service_key = Some("service-role".into());
    config.pirep.tracker_url = Some("https://crew.example/pireps".into());
    config
}

fn app(config: &PortalConfig) -> axum::Router {
    let store = Arc::new(PostgrestStore::new(&config.store));
    let today = NaiveDate::from_ymd_opt(2026, 10, 19).expect("valid date");
    router(build_state_with(
        config,
        Collaborators::shared(store),
        Arc::new(FixedClock(today)),
    ))
}

fn signed(body: &Value) -> Request<Body> {
    let bytes = serde_json::to_vec(body).expect("body json");
    let mut message = TIMESTAMP.as_bytes().to_vec();
    message.extend_from_slice(&bytes);
    Request::builder()
        .method(Method::POST)
        .uri("/api/discord/interactions")
        .header("x-signature-ed25519", hex::encode(signing_key().sign(&message).to_bytes()))
        .header("x-signature-timestamp", TIMESTAMP)
        .body(Body::from(bytes))
        .expect("request")
}

async fn body_json(response: axum::response::Response) -> Value {
    let bytes = to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("body bytes");
    serde_json::from_slice(&bytes).expect("json body")
}

/// Identities table knows nobody; the pilot is found through the staff
/// mapping instead.
fn legacy_mapped_store() -> FakeUpstream {
    FakeUpstream::start(|request| match request.path.as_str() {
        "/rest/v1/identities" => (200, "[]".to_string()),
        "/rest/v1/pilots" if request.param("discord_id") == Some(format!("eq.{INVOKER}").as_str()) => (
            200,
            json!([{ "id": "pilot-9", "name": "Capt. Amrani", "discord_id": INVOKER }])
                .to_string(),
        ),
        "/rest/v1/pilots" => (200, "[]".to_string()),
        "/rest/v1/pireps" => (201, json!([{ "id": 4021 }]).to_string()),
        _ => (404, json!({ "message": "no such table" }).to_string()),
    })
}

#[tokio::test]
async fn pirep_from_legacy_mapped_pilot_reaches_the_store() {
    let store = legacy_mapped_store();
    let response = app(&portal_config(&store, None))
        .oneshot(signed(&json!({
            "type": 2,
            "guild_locale": "en-GB",
            "data": {
                "name": "pirep",
                "options": [
                    { "name": "flight_number", "type": 3, "value": "at205" },
                    { "name": "departure", "type": 3, "value": "gmmn" },
                    { "name": "arrival", "type": 3, "value": "gmad" },
                    { "name": "operator", "type": 3, "value": "RAM" },
                    { "name": "flight_type", "type": 3, "value": "cargo" },
                    { "name": "flight_time", "type": 10, "value": -2 },
                    { "name": "remarks", "type": 3, "value": "Smooth ride" }
                ]
            },
            "member": { "user": { "id": INVOKER } }
        })))
        .await
        .expect("router response");
    assert_eq!(response.status(), StatusCode::OK);
    let reply = body_json(response).await;
    assert_eq!(reply["data"]["flags"], 64);
    let content = reply["data"]["content"].as_str().expect("content");
    assert!(content.contains("AT205"));
    assert!(content.contains("https://crew.example/pireps"));

    let inserts = store.requests_to("/rest/v1/pireps");
    assert_eq!(inserts.len(), 1);
    let row = inserts[0].json();
    assert_eq!(row["pilot_id"], "pilot-9");
    assert_eq!(row["flight_number"], "AT205");
    assert_eq!(row["arrival"], "GMAD");
    assert_eq!(row["operator"], "RAM");
    assert_eq!(row["flight_type"], "cargo");
    assert_eq!(row["flight_time"], 0.0);
    assert_eq!(row["flight_date"], "2026-10-19");
    assert_eq!(row["remarks"], "Smooth ride");
    assert_eq!(row["status"], "pending");
}

#[tokio::test]
async fn identity_store_outage_falls_through_to_staff_mapping() {
    let store = FakeUpstream::start(|request| match request.path.as_str() {
        "/rest/v1/identities" => (500, json!({ "message": "schema cache" }).to_string()),
        "/rest/v1/pilots" => (
            200,
            json!([{ "id": "pilot-9", "discord_id": INVOKER }]).to_string(),
        ),
        _ => (201, json!([{ "id": 1 }]).to_string()),
    });
    let response = app(&portal_config(&store, None))
        .oneshot(signed(&json!({
            "type": 2,
            "data": {
                "name": "pirep",
                "options": [
                    { "name": "flight_number", "type": 3, "value": "ram1" },
                    { "name": "departure", "type": 3, "value": "gmmn" },
                    { "name": "arrival", "type": 3, "value": "lfpg" }
                ]
            },
            "user": { "id": INVOKER }
        })))
        .await
        .expect("router response");
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(store.requests_to("/rest/v1/pireps").len(), 1);
}

#[tokio::test]
async fn forged_request_never_touches_the_store() {
    let store = legacy_mapped_store();
    let mut request = signed(&json!({ "type": 2, "data": { "name": "pirep" }, "user": { "id": INVOKER } }));
    request
        .headers_mut()
        .insert("x-signature-ed25519", "00".repeat(64).parse().expect("header"));
    let response = app(&portal_config(&store, None))
        .oneshot(request)
        .await
        .expect("router response");
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert!(store.requests().is_empty());
}

#[tokio::test]
async fn register_replaces_global_commands() {
    let store = legacy_mapped_store();
    let platform = FakeUpstream::start(|request| {
        let echoed = serde_json::from_str::<Value>(&request.body).unwrap_or(Value::Null);
        (200, echoed.to_string())
    });
    let response = app(&portal_config(&store, Some(&platform)))
        .oneshot(
            Request::builder()
                .method(Method::POST)
                .uri("/api/discord/register")
                .header("x-register-secret", "hangar-door")
                .body(Body::empty())
                .expect("request"),
        )
        .await
        .expect("router response");
    assert_eq!(response.status(), StatusCode::OK);
    let registered = body_json(response).await;
    assert_eq!(registered[0]["name"], "pirep");

    let calls = platform.requests_to("/applications/1122334455/commands");
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].method, "PUT");
    assert_eq!(calls[0].header("authorization"), Some("Bot bot-token"));
}

#[tokio::test]
async fn register_reports_platform_rejection_as_bad_gateway() {
    let store = legacy_mapped_store();
    let platform = FakeUpstream::start(|_| (401, json!({ "message": "401: Unauthorized" }).to_string()));
    let response = app(&portal_config(&store, Some(&platform)))
        .oneshot(
            Request::builder()
                .method(Method::POST)
                .uri("/api/discord/register")
                .header("x-register-secret", "hangar-door")
                .body(Body::empty())
                .expect("request"),
        )
        .await
        .expect("router response");
    assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
    let payload = body_json(response).await;
    assert_eq!(payload["status"], 401);
}

mod support;

use crew_interactions::config::StoreConfig;
use crew_interactions::store::{
    AircraftCatalog, IdentityStore, NewFlightReport, PostgrestStore, ReportStore, ReviewStatus,
    StoreError,
};
use serde_json::json;
use support::FakeUpstream;

fn store_for(upstream: &FakeUpstream) -> PostgrestStore {
    PostgrestStore::new(&StoreConfig {
        url: Some(upstream.base.clone()),
        service_key: Some("service-role".into()),
    })
}

fn report() -> NewFlightReport {
    NewFlightReport {
        pilot_id: "pilot-7".into(),
        flight_number: "RAM123".into(),
        departure: "GMMN".into(),
        arrival: "LFPG".into(),
        operator: Some("RAM".into()),
        aircraft: Some("B738".into()),
        flight_type: "passenger".into(),
        flight_time: 3.25,
        flight_date: "2026-10-19".into(),
        remarks: None,
        status: ReviewStatus::Pending,
    }
}

#[tokio::test]
async fn linked_account_reads_auth_identities() -> anyhow::Result<()> {
    let upstream = FakeUpstream::start(|_| (200, json!([{ "user_id": "acct-7" }]).to_string()));
    let account = store_for(&upstream)
        .linked_account("discord", "80351110224678912")
        .await?;
    assert_eq!(account.as_deref(), Some("acct-7"));

    let requests = upstream.requests_to("/rest/v1/identities");
    assert_eq!(requests.len(), 1);
    let request = &requests[0];
    assert_eq!(request.method, "GET");
    assert_eq!(request.header("accept-profile"), Some("auth"));
    assert_eq!(request.header("apikey"), Some("service-role"));
    assert_eq!(request.header("authorization"), Some("Bearer service-role"));
    assert_eq!(request.param("provider"), Some("eq.discord"));
    assert_eq!(request.param("provider_id"), Some("eq.80351110224678912"));
    Ok(())
}

#[tokio::test]
async fn pilot_lookups_filter_on_the_right_column() -> anyhow::Result<()> {
    let upstream = FakeUpstream::start(|request| {
        if request.param("discord_id") == Some("eq.42") {
            (
                200,
                json!([{ "id": "pilot-1", "name": "F/O Benali", "discord_id": "42" }]).to_string(),
            )
        } else {
            (200, "[]".to_string())
        }
    });
    let store = store_for(&upstream);

    assert_eq!(store.pilot_by_account("acct-unknown").await?, None);
    let pilot = store.pilot_by_legacy_id("42").await?.expect("legacy pilot");
    assert_eq!(pilot.id, "pilot-1");
    assert_eq!(pilot.user_id, None);

    let requests = upstream.requests_to("/rest/v1/pilots");
    assert_eq!(requests[0].param("user_id"), Some("eq.acct-unknown"));
    assert_eq!(requests[1].param("discord_id"), Some("eq.42"));
    assert!(requests.iter().all(|request| request.param("limit") == Some("1")));
    assert!(requests.iter().all(|request| request.header("accept-profile").is_none()));
    Ok(())
}

#[tokio::test]
async fn pilot_with_null_name_still_resolves() -> anyhow::Result<()> {
    let upstream = FakeUpstream::start(|_| {
        (
            200,
            json!([{ "id": "pilot-5", "name": null, "user_id": "acct-5", "discord_id": null }])
                .to_string(),
        )
    });
    let pilot = store_for(&upstream)
        .pilot_by_account("acct-5")
        .await?
        .expect("pilot row");
    assert_eq!(pilot.id, "pilot-5");
    assert_eq!(pilot.name, "");
    Ok(())
}

#[tokio::test]
async fn insert_report_posts_pending_row() -> anyhow::Result<()> {
    let upstream = FakeUpstream::start(|_| (201, json!([{ "id": 981 }]).to_string()));
    let receipt = store_for(&upstream).insert_report(&report()).await?;
    assert_eq!(receipt.id.as_deref(), Some("981"));

    let requests = upstream.requests_to("/rest/v1/pireps");
    assert_eq!(requests.len(), 1);
    let request = &requests[0];
    assert_eq!(request.method, "POST");
    assert_eq!(request.header("prefer"), Some("return=representation"));
    let row = request.json();
    assert_eq!(row["pilot_id"], "pilot-7");
    assert_eq!(row["flight_number"], "RAM123");
    assert_eq!(row["flight_time"], 3.25);
    assert_eq!(row["status"], "pending");
    assert_eq!(row["remarks"], serde_json::Value::Null);
    Ok(())
}

#[tokio::test]
async fn rejected_insert_surfaces_store_message() {
    let upstream = FakeUpstream::start(|_| {
        (
            403,
            json!({ "code": "42501", "message": "permission denied for table pireps" }).to_string(),
        )
    });
    let err = store_for(&upstream)
        .insert_report(&report())
        .await
        .unwrap_err();
    match err {
        StoreError::Status { status, message } => {
            assert_eq!(status, 403);
            assert_eq!(message, "permission denied for table pireps");
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[tokio::test]
async fn aircraft_catalog_is_ordered_and_limited() -> anyhow::Result<()> {
    let upstream = FakeUpstream::start(|_| {
        (
            200,
            json!([
                { "code": "A320", "name": "Airbus A320" },
                { "code": "B738", "name": "Boeing 737-800" }
            ])
            .to_string(),
        )
    });
    let entries = store_for(&upstream).aircraft(500).await?;
    assert_eq!(entries.len(), 2);
    assert_eq!(entries[1].code, "B738");

    let request = &upstream.requests_to("/rest/v1/aircraft")[0];
    assert_eq!(request.param("limit"), Some("500"));
    assert_eq!(request.param("order"), Some("code.asc"));
    assert_eq!(request.param("select"), Some("code,name"));
    Ok(())
}

#[tokio::test]
async fn missing_service_key_sends_nothing() {
    let upstream = FakeUpstream::start(|_| (200, "[]".to_string()));
    let store = PostgrestStore::new(&StoreConfig {
        url: Some(upstream.base.clone()),
        service_key: None,
    });
    let err = store.aircraft(10).await.unwrap_err();
    assert!(matches!(err, StoreError::NotConfigured("store.service_key")));
    assert!(upstream.requests().is_empty());
}

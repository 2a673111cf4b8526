//! Integration tests for creating and deleting subscriptions through the
//! `/start` and `/stop` routes against a mocked Asana API

mod common;

use asana_connector_core::WebhookId;
use axum::http::StatusCode;
use common::{
    body_json, signed_event_request, webhook_path, AsanaHandshake, TestConnector, ACCESS_TOKEN,
    BASE_URL, TASK_CHANGED, USER_ID,
};

const VENDOR_ID: &str = "ws-1";
use wiremock::matchers::{body_partial_json, header, method, path, path_regex};
use wiremock::{Mock, ResponseTemplate};

const EXAMPLE_RESOURCE: &str = "1199170056173519";

/// Verify the full onboarding flow: create, handshake, then a verified event
#[tokio::test]
async fn test_start_creates_subscription_and_completes_handshake() {
    // Arrange
    let connector = TestConnector::start().await;
    connector.seed_user().await;

    Mock::given(method("POST"))
        .and(path("/webhooks"))
        .and(header("authorization", format!("Bearer {}", ACCESS_TOKEN).as_str()))
        .and(body_partial_json(serde_json::json!({
            "data": {
                "resource": EXAMPLE_RESOURCE,
                "filters": [{
                    "resource_type": "task",
                    "action": "changed",
                    "fields": ["custom_fields"]
                }]
            }
        })))
        .respond_with(AsanaHandshake {
            router: connector.router.clone(),
            secret: "handshake-secret".to_string(),
            gid: "1300".to_string(),
        })
        .expect(1)
        .mount(&connector.asana)
        .await;

    // Act
    let response = connector.get(&format!("/{}/start", USER_ID)).await;

    // Assert
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    let webhook_id: WebhookId = body["webhookId"].as_str().unwrap().parse().unwrap();

    let created = connector.asana.received_requests().await.unwrap();
    let sent: serde_json::Value = serde_json::from_slice(&created[0].body).unwrap();
    assert_eq!(
        sent["data"]["target"],
        format!("{}/webhook/{}/{}", BASE_URL, USER_ID, webhook_id)
    );

    let stored = connector.stored_user().await.unwrap();
    let record = stored.webhooks.get(&webhook_id).unwrap();
    assert_eq!(record.resource_id(), Some("1300"));
    assert_eq!(record.secret(), Some("handshake-secret"));

    let event = connector
        .send(signed_event_request(
            &webhook_path(&webhook_id),
            "handshake-secret",
            TASK_CHANGED,
        ))
        .await;
    assert_eq!(event.status(), StatusCode::OK);
    assert_eq!(connector.handler.call_count(), 1);
}

/// Verify that a subscription Asana created without a handshake is removed again
#[tokio::test]
async fn test_start_without_handshake_unwinds_subscription() {
    // Arrange
    let connector = TestConnector::start().await;
    connector.seed_user().await;

    Mock::given(method("POST"))
        .and(path("/webhooks"))
        .respond_with(ResponseTemplate::new(201).set_body_json(serde_json::json!({
            "data": { "gid": "1300", "resource_type": "webhook", "active": false }
        })))
        .mount(&connector.asana)
        .await;

    Mock::given(method("DELETE"))
        .and(path("/webhooks/1300"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({ "data": {} })))
        .expect(1)
        .mount(&connector.asana)
        .await;

    // Act
    let response = connector.get(&format!("/{}/start", USER_ID)).await;

    // Assert
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let body = body_json(response).await;
    assert_eq!(body["statusCode"], 500);
    assert!(connector.stored_user().await.unwrap().webhooks.is_empty());
}

/// Verify that an Asana rejection of the create leaves nothing behind
#[tokio::test]
async fn test_start_reports_asana_rejection() {
    // Arrange
    let connector = TestConnector::start().await;
    connector.seed_user().await;

    Mock::given(method("POST"))
        .and(path("/webhooks"))
        .respond_with(ResponseTemplate::new(400).set_body_json(serde_json::json!({
            "errors": [{ "message": "resource: Not a valid resource" }]
        })))
        .mount(&connector.asana)
        .await;

    // Act
    let response = connector.get(&format!("/{}/start", USER_ID)).await;

    // Assert
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert!(connector.stored_user().await.unwrap().webhooks.is_empty());
    let deletes = connector
        .asana
        .received_requests()
        .await
        .unwrap()
        .into_iter()
        .filter(|r| r.method.as_str() == "DELETE")
        .count();
    assert_eq!(deletes, 0);
}

/// Verify that `/stop` deletes every subscription on Asana and clears the registry
#[tokio::test]
async fn test_stop_deletes_all_subscriptions() {
    // Arrange
    let connector = TestConnector::start().await;
    let webhook_id = connector.seed_verified_webhook("1300", "s3cret").await;

    Mock::given(method("DELETE"))
        .and(path("/webhooks/1300"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({ "data": {} })))
        .expect(1)
        .mount(&connector.asana)
        .await;

    // Act
    let response = connector.get(&format!("/{}/stop", USER_ID)).await;

    // Assert
    assert_eq!(response.status(), StatusCode::OK);
    assert!(connector.stored_user().await.unwrap().webhooks.is_empty());

    let event = connector
        .send(signed_event_request(
            &webhook_path(&webhook_id),
            "s3cret",
            TASK_CHANGED,
        ))
        .await;
    assert_eq!(event.status(), StatusCode::GONE);
}

/// Verify that Asana delete failures do not stop local cleanup
#[tokio::test]
async fn test_stop_clears_registry_when_asana_delete_fails() {
    // Arrange
    let connector = TestConnector::start().await;
    connector.seed_verified_webhook("1300", "s3cret").await;

    Mock::given(method("DELETE"))
        .and(path_regex(r"^/webhooks/\d+$"))
        .respond_with(ResponseTemplate::new(500))
        .expect(1)
        .mount(&connector.asana)
        .await;

    // Act
    let response = connector.get(&format!("/{}/stop", USER_ID)).await;

    // Assert
    assert_eq!(response.status(), StatusCode::OK);
    assert!(connector.stored_user().await.unwrap().webhooks.is_empty());
}

/// Verify that `/start` for an unknown user never reaches Asana
#[tokio::test]
async fn test_start_for_unknown_user_returns_404() {
    // Arrange
    let connector = TestConnector::start().await;

    // Act
    let response = connector.get("/9999/start").await;

    // Assert
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert!(connector.asana.received_requests().await.unwrap().is_empty());
}

/// Verify that a user scoped by a vendor id can be onboarded and removed
#[tokio::test]
async fn test_start_and_stop_for_vendor_scoped_user() {
    // Arrange
    let connector = TestConnector::start().await;
    connector.seed_vendor_user(VENDOR_ID).await;

    Mock::given(method("POST"))
        .and(path("/webhooks"))
        .respond_with(AsanaHandshake {
            router: connector.router.clone(),
            secret: "handshake-secret".to_string(),
            gid: "1300".to_string(),
        })
        .expect(1)
        .mount(&connector.asana)
        .await;

    Mock::given(method("DELETE"))
        .and(path("/webhooks/1300"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({ "data": {} })))
        .expect(1)
        .mount(&connector.asana)
        .await;

    // Act
    let start = connector
        .get(&format!("/{}/{}/start", VENDOR_ID, USER_ID))
        .await;

    // Assert
    assert_eq!(start.status(), StatusCode::OK);
    let body = body_json(start).await;
    let webhook_id: WebhookId = body["webhookId"].as_str().unwrap().parse().unwrap();

    let created = connector.asana.received_requests().await.unwrap();
    let sent: serde_json::Value = serde_json::from_slice(&created[0].body).unwrap();
    assert_eq!(
        sent["data"]["target"],
        format!("{}/webhook/{}/{}/{}", BASE_URL, VENDOR_ID, USER_ID, webhook_id)
    );

    let stored = connector.stored_vendor_user(VENDOR_ID).await.unwrap();
    let record = stored.webhooks.get(&webhook_id).unwrap();
    assert_eq!(record.resource_id(), Some("1300"));
    assert_eq!(record.secret(), Some("handshake-secret"));
    assert!(connector.stored_user().await.is_none());

    let stop = connector
        .get(&format!("/{}/{}/stop", VENDOR_ID, USER_ID))
        .await;
    assert_eq!(stop.status(), StatusCode::OK);
    assert!(connector
        .stored_vendor_user(VENDOR_ID)
        .await
        .unwrap()
        .webhooks
        .is_empty());
}

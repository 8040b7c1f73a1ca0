//! End-to-end tick semantics: persist → evaluate → dispatch, wired the way
//! the scheduler drives them, against a real SQLite file and a mock
//! webhook endpoint.

use tempfile::tempdir;
use vigil::alerts::AlertDispatcher;
use vigil::config::{ChannelConfig, WebhookChannel};
use vigil::storage::SqliteStore;
use vigil::thresholds::BreachDecision;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use super::helpers::{sample, thresholds_all};

fn webhook_channels(url: String) -> ChannelConfig {
    ChannelConfig {
        webhook: Some(WebhookChannel { url }),
        email: None,
    }
}

#[tokio::test]
async fn test_breaching_sample_is_persisted_and_alert_delivered() {
    let temp_dir = tempdir().unwrap();
    let store = SqliteStore::open(temp_dir.path().join("history.db"))
        .await
        .unwrap();

    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/hook"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    let dispatcher = AlertDispatcher::new(
        webhook_channels(format!("{}/hook", server.uri())),
        "test-host".to_string(),
    );

    let sample = sample(95.0, 50.0, 50.0);

    store.insert(&sample).await.unwrap();
    assert_eq!(store.count().await.unwrap(), 1);

    let decision = BreachDecision::evaluate(&sample, &thresholds_all(90), "test-host");
    assert!(decision.triggered);

    let report = dispatcher.dispatch(&decision.message).await;
    assert_eq!(report.delivered(), 1);

    // The operator-facing text made it to the channel intact.
    let requests = server.received_requests().await.unwrap();
    assert_eq!(requests.len(), 1);
    let body = String::from_utf8(requests[0].body.clone()).unwrap();
    assert!(body.contains("CPU Usage: 95.00%"));
    assert!(body.contains("test-host"));
}

#[tokio::test]
async fn test_quiet_sample_is_persisted_but_never_dispatched() {
    let temp_dir = tempdir().unwrap();
    let store = SqliteStore::open(temp_dir.path().join("history.db"))
        .await
        .unwrap();

    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let dispatcher = AlertDispatcher::new(
        webhook_channels(format!("{}/hook", server.uri())),
        "test-host".to_string(),
    );

    let sample = sample(10.0, 20.0, 30.0);

    store.insert(&sample).await.unwrap();
    assert_eq!(store.count().await.unwrap(), 1);

    let decision = BreachDecision::evaluate(&sample, &thresholds_all(90), "test-host");
    assert!(!decision.triggered);

    // The scheduler only dispatches on a triggered decision; nothing to do
    // here. The mock's expect(0) verifies no request arrived on drop.
    let _ = dispatcher;
}

use std::time::Duration;

use wiremock::matchers::{body_partial_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use shared::{CampaignId, NotificationEvent};

use crate::error::SourceError;
use crate::services::{LoggingNotificationSink, WebhookNotificationSink};
use crate::traits::NotificationSink;

fn completed() -> NotificationEvent {
    NotificationEvent::CampaignCompleted {
        campaign_id: CampaignId::new(),
        bids_received: 3,
    }
}

fn sink(server: &MockServer) -> WebhookNotificationSink {
    WebhookNotificationSink::new(format!("{}/hooks/outreach", server.uri()), Duration::from_secs(2)).unwrap()
}

#[tokio::test]
async fn test_webhook_posts_tagged_json() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/hooks/outreach"))
        .and(body_partial_json(serde_json::json!({
            "event": "campaign_completed",
            "bids_received": 3
        })))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;

    sink(&server).notify(completed()).await.unwrap();
}

#[tokio::test]
async fn test_server_error_is_transient() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    let result = sink(&server).notify(completed()).await;
    assert!(matches!(result, Err(SourceError::Transient(_))));
}

#[tokio::test]
async fn test_client_error_is_permanent() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(401))
        .mount(&server)
        .await;

    let result = sink(&server).notify(completed()).await;
    assert!(matches!(result, Err(SourceError::Permanent(_))));
}

#[tokio::test]
async fn test_logging_sink_never_fails() {
    tokio_test::assert_ok!(LoggingNotificationSink.notify(completed()).await);
}

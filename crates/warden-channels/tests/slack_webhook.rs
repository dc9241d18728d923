//! Slack webhook delivery against local mock endpoints.

#![allow(clippy::unwrap_used, clippy::expect_used)]

use warden_channels::{
    Alert, AlertKind, NotificationConfig, Notifier, Severity, SlackWebhookNotifier, WebhookConfig,
};
use warden_core::WardenError;
use wiremock::matchers::{body_partial_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn webhook(name: &str, url: String) -> WebhookConfig {
    WebhookConfig {
        name: name.to_string(),
        url,
        enabled: true,
    }
}

fn notifier(webhooks: Vec<WebhookConfig>) -> SlackWebhookNotifier {
    SlackWebhookNotifier::new(NotificationConfig {
        webhooks,
        ..NotificationConfig::default()
    })
}

#[tokio::test]
async fn posts_formatted_payload() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/hooks/soc"))
        .and(body_partial_json(serde_json::json!({
            "text": "*Automatic Alert* | *Severity:* Error\n\nPlaybook \"Contain Malware Infection\" failed",
            "username": "Security Bot",
            "icon_emoji": ":warning:",
        })))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    let slack = notifier(vec![webhook("soc", format!("{}/hooks/soc", server.uri()))]);
    let delivered = slack
        .notify(&Alert::error("Playbook \"Contain Malware Infection\" failed"))
        .await
        .unwrap();
    assert!(delivered);
}

#[tokio::test]
async fn one_accepting_webhook_is_enough() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/ok"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/broken"))
        .respond_with(ResponseTemplate::new(500))
        .expect(1)
        .mount(&server)
        .await;

    let slack = notifier(vec![
        webhook("broken", format!("{}/broken", server.uri())),
        webhook("ok", format!("{}/ok", server.uri())),
    ]);
    assert!(slack.notify(&Alert::info("step completed")).await.unwrap());
}

#[tokio::test]
async fn every_webhook_failing_is_a_notification_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let slack = notifier(vec![
        webhook("a", format!("{}/a", server.uri())),
        webhook("b", format!("{}/b", server.uri())),
    ]);
    let err = slack.notify(&Alert::info("hello")).await.unwrap_err();
    assert!(matches!(err, WardenError::Notification(_)));
    assert!(err.to_string().contains("2 attempted"));
}

#[tokio::test]
async fn disabled_webhooks_are_skipped() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let mut hook = webhook("muted", format!("{}/muted", server.uri()));
    hook.enabled = false;
    let slack = notifier(vec![hook]);
    assert!(!slack.notify(&Alert::info("hello")).await.unwrap());
}

#[tokio::test]
async fn automatic_alerts_can_be_switched_off() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    let slack = SlackWebhookNotifier::new(NotificationConfig {
        webhooks: vec![webhook("soc", format!("{}/soc", server.uri()))],
        auto_alerts_enabled: false,
        ..NotificationConfig::default()
    });

    // Engine-raised alerts are suppressed...
    assert!(!slack.notify(&Alert::info("task started")).await.unwrap());
    // ...but operator alerts still go out.
    let manual = Alert::new("Shift handover at 18:00", AlertKind::Manual, Severity::Info);
    assert!(slack.notify(&manual).await.unwrap());
}

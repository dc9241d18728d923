use crate::notifier::{Alert, AlertKind, Notifier};
use async_trait::async_trait;
use futures_util::future::join_all;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, info, warn};
use warden_core::{WardenError, WardenResult};

const WEBHOOK_TIMEOUT: Duration = Duration::from_secs(10);

/// A single Slack incoming-webhook endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WebhookConfig {
    pub name: String,
    pub url: String,
    #[serde(default = "default_true")]
    pub enabled: bool,
}

/// Notification settings, usually read from the `[notifications]` table.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotificationConfig {
    #[serde(default)]
    pub webhooks: Vec<WebhookConfig>,
    /// When false, alerts of kind [`AlertKind::Automatic`] are suppressed.
    #[serde(default = "default_true")]
    pub auto_alerts_enabled: bool,
    #[serde(default = "default_username")]
    pub username: String,
    /// Number of alerts kept in the in-memory activity feed.
    #[serde(default = "default_feed_capacity")]
    pub feed_capacity: usize,
}

impl Default for NotificationConfig {
    fn default() -> Self {
        Self {
            webhooks: Vec::new(),
            auto_alerts_enabled: true,
            username: default_username(),
            feed_capacity: default_feed_capacity(),
        }
    }
}

fn default_true() -> bool {
    true
}

fn default_username() -> String {
    "Security Bot".to_string()
}

fn default_feed_capacity() -> usize {
    200
}

#[derive(Debug, Serialize)]
struct WebhookPayload<'a> {
    text: &'a str,
    username: &'a str,
    icon_emoji: &'a str,
}

/// Slack incoming-webhook notifier.
///
/// Posts each alert to every enabled webhook concurrently. The alert counts
/// as delivered if at least one endpoint accepts it.
pub struct SlackWebhookNotifier {
    config: NotificationConfig,
    client: reqwest::Client,
}

impl SlackWebhookNotifier {
    pub fn new(config: NotificationConfig) -> Self {
        Self {
            config,
            client: reqwest::Client::new(),
        }
    }

    /// Webhooks that will receive alerts.
    pub fn enabled_webhooks(&self) -> Vec<&WebhookConfig> {
        self.config.webhooks.iter().filter(|w| w.enabled).collect()
    }

    async fn post(&self, webhook: &WebhookConfig, payload: &WebhookPayload<'_>) -> bool {
        let result = self
            .client
            .post(&webhook.url)
            .timeout(WEBHOOK_TIMEOUT)
            .json(payload)
            .send()
            .await;

        match result {
            Ok(resp) if resp.status().is_success() => true,
            Ok(resp) => {
                warn!(
                    webhook = %webhook.name,
                    status = %resp.status(),
                    "Slack webhook rejected alert"
                );
                false
            }
            Err(e) => {
                warn!(webhook = %webhook.name, error = %e, "Slack webhook send error");
                false
            }
        }
    }
}

#[async_trait]
impl Notifier for SlackWebhookNotifier {
    fn name(&self) -> &str {
        "slack"
    }

    async fn notify(&self, alert: &Alert) -> WardenResult<bool> {
        let webhooks = self.enabled_webhooks();
        if webhooks.is_empty() {
            debug!("No enabled Slack webhooks, alert suppressed");
            return Ok(false);
        }

        if alert.kind == AlertKind::Automatic && !self.config.auto_alerts_enabled {
            debug!("Automatic alerts disabled, alert suppressed");
            return Ok(false);
        }

        let text = alert.to_markdown();
        let payload = WebhookPayload {
            text: &text,
            username: &self.config.username,
            icon_emoji: alert.icon_emoji(),
        };

        let results = join_all(webhooks.iter().map(|w| self.post(w, &payload))).await;
        let accepted = results.iter().filter(|ok| **ok).count();

        if accepted == 0 {
            return Err(WardenError::Notification(format!(
                "no Slack webhook accepted the alert ({} attempted)",
                results.len()
            )));
        }

        info!(accepted, attempted = results.len(), kind = %alert.kind, "Slack alert sent");
        Ok(true)
    }
}

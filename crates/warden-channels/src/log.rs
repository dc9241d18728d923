use crate::notifier::{Alert, Notifier, Severity};
use async_trait::async_trait;
use tracing::{error, info, warn};
use warden_core::WardenResult;

/// Writes alerts to the `tracing` log at a level matching their severity.
#[derive(Debug, Default)]
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    fn name(&self) -> &str {
        "log"
    }

    async fn notify(&self, alert: &Alert) -> WardenResult<bool> {
        match alert.severity {
            Severity::Info => info!(kind = %alert.kind, "{}", alert.text),
            Severity::Warning => warn!(kind = %alert.kind, "{}", alert.text),
            Severity::Error | Severity::Critical => {
                error!(kind = %alert.kind, severity = %alert.severity, "{}", alert.text);
            }
        }
        Ok(true)
    }
}

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use warden_core::WardenResult;

/// Who or what raised an alert.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AlertKind {
    /// Raised by the engine itself as work changes state.
    Automatic,
    /// Raised on behalf of an agent.
    Agent,
    /// Raised by an operator.
    Manual,
}

impl std::fmt::Display for AlertKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AlertKind::Automatic => write!(f, "Automatic"),
            AlertKind::Agent => write!(f, "Agent"),
            AlertKind::Manual => write!(f, "Manual"),
        }
    }
}

/// Severity of an alert.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    /// Routine progress.
    Info,
    /// Something worth a look.
    Warning,
    /// A unit of work failed.
    Error,
    /// Needs immediate attention.
    Critical,
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Severity::Info => write!(f, "Info"),
            Severity::Warning => write!(f, "Warning"),
            Severity::Error => write!(f, "Error"),
            Severity::Critical => write!(f, "Critical"),
        }
    }
}

/// A human-readable status message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Alert {
    pub text: String,
    pub kind: AlertKind,
    pub severity: Severity,
}

impl Alert {
    pub fn new(text: impl Into<String>, kind: AlertKind, severity: Severity) -> Self {
        Self {
            text: text.into(),
            kind,
            severity,
        }
    }

    /// An engine-raised alert at [`Severity::Info`].
    pub fn info(text: impl Into<String>) -> Self {
        Self::new(text, AlertKind::Automatic, Severity::Info)
    }

    /// An engine-raised alert at [`Severity::Error`].
    pub fn error(text: impl Into<String>) -> Self {
        Self::new(text, AlertKind::Automatic, Severity::Error)
    }

    /// Renders the alert as Slack markdown:
    /// `*Automatic Alert* | *Severity:* Info` followed by a blank line and the text.
    pub fn to_markdown(&self) -> String {
        format!(
            "*{} Alert* | *Severity:* {}\n\n{}",
            self.kind, self.severity, self.text
        )
    }

    /// Slack emoji shortcode for this alert's kind and severity.
    pub fn icon_emoji(&self) -> &'static str {
        match self.kind {
            AlertKind::Manual => ":loudspeaker:",
            AlertKind::Agent => ":robot_face:",
            AlertKind::Automatic => match self.severity {
                Severity::Critical => ":fire:",
                Severity::Error | Severity::Warning => ":warning:",
                Severity::Info => ":information_source:",
            },
        }
    }
}

/// A best-effort sink for status messages.
///
/// Returns `Ok(true)` when the alert was delivered, `Ok(false)` when
/// configuration suppressed it, and `Err` when the transport failed.
#[async_trait]
pub trait Notifier: Send + Sync {
    fn name(&self) -> &str;
    async fn notify(&self, alert: &Alert) -> WardenResult<bool>;
}

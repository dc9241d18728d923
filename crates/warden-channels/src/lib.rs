//! Notification sinks for orchestration status messages.
//!
//! Provides a unified [`Notifier`] trait and concrete transports. Delivery is
//! best-effort: the engine logs a failed notification and carries on, so no
//! transport here can influence orchestration state.
//!
//! # Main types
//!
//! - [`Notifier`]: Trait for emitting a human-readable [`Alert`].
//! - [`SlackWebhookNotifier`]: Posts alerts to Slack incoming webhooks.
//! - [`NotifierManager`]: Fans an alert out to several notifiers.
//! - [`MemoryNotifier`]: Bounded in-memory activity feed.
//! - [`LogNotifier`]: Writes alerts to the `tracing` log.

/// Tracing-backed notifier.
pub mod log;
/// Fan-out over multiple notifiers.
pub mod manager;
/// In-memory activity feed.
pub mod memory;
/// Core notifier trait and alert types.
pub mod notifier;
/// Slack incoming-webhook transport.
pub mod slack;

pub use log::LogNotifier;
pub use manager::NotifierManager;
pub use memory::{MemoryNotifier, RecordedAlert};
pub use notifier::{Alert, AlertKind, Notifier, Severity};
pub use slack::{NotificationConfig, SlackWebhookNotifier, WebhookConfig};

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Top-level error type for the Warden engine.
///
/// Lookup and validation failures are returned to the immediate caller.
/// Execution failures are recorded on the affected entity instead, so
/// [`WardenError::StepFailure`] mostly travels between an executor and the
/// runner that records it.
#[derive(Debug, thiserror::Error)]
pub enum WardenError {
    /// A referenced agent, task, or playbook does not exist.
    #[error("Not found: {0}")]
    NotFound(String),

    /// The agent already has a task or playbook in flight.
    #[error("Agent busy: {0}")]
    AgentBusy(String),

    /// A requested transition is not legal from the entity's current state.
    #[error("Invalid state: {0}")]
    InvalidState(String),

    /// A task's execution resolved unsuccessfully.
    #[error("Step failure: {0}")]
    StepFailure(String),

    /// The notification sink could not be reached. Logged, never escalated.
    #[error("Notification error: {0}")]
    Notification(String),

    /// An error in configuration parsing or validation.
    #[error("Config error: {0}")]
    Config(String),

    /// An error from an outbound HTTP request.
    #[error("HTTP error: {0}")]
    Http(String),

    /// A JSON serialization or deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// A standard I/O error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// An internal orchestration error, such as a runner that panicked.
    #[error("Orchestrator error: {0}")]
    Orchestrator(String),
}

/// A convenience `Result` alias using [`WardenError`].
pub type WardenResult<T> = Result<T, WardenError>;

/// The kinds of records owned by the entity store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntityKind {
    /// An autonomous worker.
    Agent,
    /// A single unit of work.
    Task,
    /// An ordered sequence of tasks.
    Playbook,
}

impl std::fmt::Display for EntityKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EntityKind::Agent => write!(f, "agent"),
            EntityKind::Task => write!(f, "task"),
            EntityKind::Playbook => write!(f, "playbook"),
        }
    }
}

impl WardenError {
    /// Builds a [`WardenError::NotFound`] naming the missing record.
    pub fn not_found(kind: EntityKind, id: Uuid) -> Self {
        WardenError::NotFound(format!("{kind} {id}"))
    }

    /// Whether this error reports a missing record.
    pub fn is_not_found(&self) -> bool {
        matches!(self, WardenError::NotFound(_))
    }
}

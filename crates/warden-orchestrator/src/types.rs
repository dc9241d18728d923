use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use warden_core::{WardenError, WardenResult};

/// Life-cycle status of an agent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AgentStatus {
    Idle,
    Running,
    Error,
    /// Part of the dashboard vocabulary; the engine never sets it.
    Completed,
}

impl AgentStatus {
    pub const ALL: [AgentStatus; 4] = [
        AgentStatus::Idle,
        AgentStatus::Running,
        AgentStatus::Error,
        AgentStatus::Completed,
    ];

    pub fn label(self) -> &'static str {
        match self {
            AgentStatus::Idle => "idle",
            AgentStatus::Running => "running",
            AgentStatus::Error => "error",
            AgentStatus::Completed => "completed",
        }
    }
}

impl std::fmt::Display for AgentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// An autonomous worker that tasks and playbooks are assigned to.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Agent {
    pub id: Uuid,
    pub name: String,
    pub description: String,
    pub status: AgentStatus,
    /// Back-references in assignment order. The task owns its own status.
    pub assigned_tasks: Vec<Uuid>,
    pub assigned_playbooks: Vec<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Agent {
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            description: description.into(),
            status: AgentStatus::Idle,
            assigned_tasks: Vec::new(),
            assigned_playbooks: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }

    /// Fails unless the agent can take new work.
    ///
    /// A `running` agent is busy; an agent in `error` must be reset first.
    pub fn ensure_available(&self) -> WardenResult<()> {
        match self.status {
            AgentStatus::Running => Err(WardenError::AgentBusy(format!(
                "agent {} ({}) already has work in flight",
                self.name, self.id
            ))),
            AgentStatus::Error => Err(WardenError::InvalidState(format!(
                "agent {} ({}) is in error and must be reset before new assignments",
                self.name, self.id
            ))),
            AgentStatus::Idle | AgentStatus::Completed => Ok(()),
        }
    }

    pub(crate) fn set_status(&mut self, status: AgentStatus) {
        self.status = status;
        self.updated_at = Utc::now();
    }

    /// `error → idle`. Resetting an idle agent is a no-op; a running one is refused.
    pub fn reset(&mut self) -> WardenResult<()> {
        if self.status == AgentStatus::Running {
            return Err(WardenError::AgentBusy(format!(
                "agent {} cannot be reset while running",
                self.id
            )));
        }
        self.set_status(AgentStatus::Idle);
        Ok(())
    }
}

/// Status of a task. `done` and `failed` are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TaskStatus {
    Pending,
    InProgress,
    Done,
    Failed,
}

impl TaskStatus {
    pub const ALL: [TaskStatus; 4] = [
        TaskStatus::Pending,
        TaskStatus::InProgress,
        TaskStatus::Done,
        TaskStatus::Failed,
    ];

    pub fn is_terminal(self) -> bool {
        matches!(self, TaskStatus::Done | TaskStatus::Failed)
    }

    pub fn label(self) -> &'static str {
        match self {
            TaskStatus::Pending => "pending",
            TaskStatus::InProgress => "in-progress",
            TaskStatus::Done => "done",
            TaskStatus::Failed => "failed",
        }
    }
}

impl std::fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// A single unit of work, standalone or a playbook step.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Task {
    pub id: Uuid,
    pub name: String,
    pub description: String,
    pub status: TaskStatus,
    pub assigned_agent_id: Option<Uuid>,
    /// Set when the task is a step of a playbook.
    #[serde(default)]
    pub playbook_id: Option<Uuid>,
    pub error: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
}

impl Task {
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            description: description.into(),
            status: TaskStatus::Pending,
            assigned_agent_id: None,
            playbook_id: None,
            error: None,
            created_at: now,
            updated_at: now,
            completed_at: None,
        }
    }

    /// `pending → in-progress` on behalf of `agent_id`.
    pub fn start(&mut self, agent_id: Uuid) -> WardenResult<()> {
        self.require(TaskStatus::Pending, "start")?;
        self.status = TaskStatus::InProgress;
        self.assigned_agent_id = Some(agent_id);
        self.updated_at = Utc::now();
        Ok(())
    }

    /// `in-progress → done`.
    pub fn complete(&mut self) -> WardenResult<()> {
        self.require(TaskStatus::InProgress, "complete")?;
        self.finish(TaskStatus::Done);
        Ok(())
    }

    /// `in-progress → failed`, recording the reason.
    pub fn fail(&mut self, reason: impl Into<String>) -> WardenResult<()> {
        self.require(TaskStatus::InProgress, "fail")?;
        self.error = Some(reason.into());
        self.finish(TaskStatus::Failed);
        Ok(())
    }

    fn finish(&mut self, status: TaskStatus) {
        let now = Utc::now();
        self.status = status;
        self.completed_at = Some(now);
        self.updated_at = now;
    }

    fn require(&self, required: TaskStatus, action: &str) -> WardenResult<()> {
        if self.status == required {
            Ok(())
        } else {
            Err(WardenError::InvalidState(format!(
                "cannot {action} task \"{}\" ({}): status is {}",
                self.name, self.id, self.status
            )))
        }
    }
}

/// Execution state of a playbook.
///
/// `Pending → Running { current_step } → Completed | Failed { failed_step }`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum PlaybookStatus {
    Pending,
    Running { current_step: usize },
    Completed,
    Failed { failed_step: usize },
}

impl PlaybookStatus {
    pub const LABELS: [&'static str; 4] = ["pending", "running", "completed", "failed"];

    pub fn is_terminal(self) -> bool {
        matches!(self, PlaybookStatus::Completed | PlaybookStatus::Failed { .. })
    }

    pub fn label(self) -> &'static str {
        match self {
            PlaybookStatus::Pending => "pending",
            PlaybookStatus::Running { .. } => "running",
            PlaybookStatus::Completed => "completed",
            PlaybookStatus::Failed { .. } => "failed",
        }
    }
}

impl std::fmt::Display for PlaybookStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// An ordered, fail-fast sequence of tasks.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Playbook {
    pub id: Uuid,
    pub name: String,
    /// Step task ids; order is fixed at creation.
    pub steps: Vec<Uuid>,
    pub status: PlaybookStatus,
    pub assigned_agent_id: Option<Uuid>,
    pub error: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
}

impl Playbook {
    pub fn new(name: impl Into<String>, steps: Vec<Uuid>) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            steps,
            status: PlaybookStatus::Pending,
            assigned_agent_id: None,
            error: None,
            created_at: now,
            updated_at: now,
            completed_at: None,
        }
    }

    /// `pending → running { current_step: 0 }`.
    pub fn start(&mut self) -> WardenResult<()> {
        if self.status != PlaybookStatus::Pending {
            return Err(self.illegal("start"));
        }
        self.set_status(PlaybookStatus::Running { current_step: 0 });
        Ok(())
    }

    /// Move the cursor to `step`. Steps only ever move forward.
    pub fn advance(&mut self, step: usize) -> WardenResult<()> {
        match self.status {
            PlaybookStatus::Running { current_step }
                if step >= current_step && step < self.steps.len() =>
            {
                self.set_status(PlaybookStatus::Running { current_step: step });
                Ok(())
            }
            _ => Err(self.illegal("advance")),
        }
    }

    /// `running → completed`. Callers verify that every step is done.
    pub(crate) fn complete(&mut self) -> WardenResult<()> {
        if !matches!(self.status, PlaybookStatus::Running { .. }) {
            return Err(self.illegal("complete"));
        }
        self.set_status(PlaybookStatus::Completed);
        self.completed_at = Some(self.updated_at);
        Ok(())
    }

    /// `running → failed { failed_step }`, recording the reason.
    pub fn fail(&mut self, failed_step: usize, reason: impl Into<String>) -> WardenResult<()> {
        if !matches!(self.status, PlaybookStatus::Running { .. }) || failed_step >= self.steps.len()
        {
            return Err(self.illegal("fail"));
        }
        self.error = Some(reason.into());
        self.set_status(PlaybookStatus::Failed { failed_step });
        self.completed_at = Some(self.updated_at);
        Ok(())
    }

    /// Index of the step that is running or that failed, if any.
    pub fn cursor(&self) -> Option<usize> {
        match self.status {
            PlaybookStatus::Running { current_step } => Some(current_step),
            PlaybookStatus::Failed { failed_step } => Some(failed_step),
            _ => None,
        }
    }

    fn set_status(&mut self, status: PlaybookStatus) {
        self.status = status;
        self.updated_at = Utc::now();
    }

    fn illegal(&self, action: &str) -> WardenError {
        WardenError::InvalidState(format!(
            "cannot {action} playbook \"{}\" ({}): status is {}",
            self.name, self.id, self.status
        ))
    }
}

/// How an assignment resolved.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum Outcome {
    Succeeded,
    Failed { reason: String },
    Cancelled,
}

impl Outcome {
    pub fn is_success(&self) -> bool {
        matches!(self, Outcome::Succeeded)
    }
}

/// The unit of work bound to an agent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "id", rename_all = "lowercase")]
pub enum WorkRef {
    Task(Uuid),
    Playbook(Uuid),
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn test_task_creation() {
        let task = Task::new("Block attacking IP", "Block the IP at the firewall.");
        assert_eq!(task.status, TaskStatus::Pending);
        assert!(task.assigned_agent_id.is_none());
        assert!(task.completed_at.is_none());
        assert_eq!(task.created_at, task.updated_at);
    }

    #[test]
    fn test_task_happy_path() {
        let agent = Uuid::new_v4();
        let mut task = Task::new("Scan", "");
        task.start(agent).unwrap();
        assert_eq!(task.status, TaskStatus::InProgress);
        assert_eq!(task.assigned_agent_id, Some(agent));
        task.complete().unwrap();
        assert_eq!(task.status, TaskStatus::Done);
        assert!(task.completed_at.is_some());
    }

    #[test]
    fn test_task_terminal_states_are_final() {
        let mut task = Task::new("Scan", "");
        task.start(Uuid::new_v4()).unwrap();
        task.fail("endpoint unreachable").unwrap();
        assert_eq!(task.error.as_deref(), Some("endpoint unreachable"));

        assert!(task.complete().is_err());
        assert!(task.fail("again").is_err());
        assert!(task.start(Uuid::new_v4()).is_err());
        assert_eq!(task.status, TaskStatus::Failed);
    }

    #[test]
    fn test_task_cannot_complete_from_pending() {
        let mut task = Task::new("Scan", "");
        let err = task.complete().unwrap_err();
        assert!(matches!(err, WardenError::InvalidState(_)));
    }

    #[test]
    fn test_task_status_serialization() {
        let json = serde_json::to_string(&TaskStatus::InProgress).unwrap();
        assert_eq!(json, "\"in-progress\"");
        let parsed: TaskStatus = serde_json::from_str("\"done\"").unwrap();
        assert_eq!(parsed, TaskStatus::Done);
    }

    #[test]
    fn test_agent_availability() {
        let mut agent = Agent::new("Security Agent 1", "Primary");
        assert!(agent.ensure_available().is_ok());

        agent.set_status(AgentStatus::Running);
        assert!(matches!(
            agent.ensure_available(),
            Err(WardenError::AgentBusy(_))
        ));
        assert!(agent.reset().is_err());

        agent.set_status(AgentStatus::Error);
        assert!(matches!(
            agent.ensure_available(),
            Err(WardenError::InvalidState(_))
        ));
        agent.reset().unwrap();
        assert_eq!(agent.status, AgentStatus::Idle);
    }

    #[test]
    fn test_playbook_state_machine() {
        let mut pb = Playbook::new("Contain Malware", vec![Uuid::new_v4(), Uuid::new_v4()]);
        assert!(pb.advance(0).is_err());
        pb.start().unwrap();
        assert_eq!(pb.status, PlaybookStatus::Running { current_step: 0 });
        pb.advance(1).unwrap();
        assert!(pb.advance(0).is_err(), "cursor never moves backwards");
        assert!(pb.advance(2).is_err(), "cursor stays within the steps");
        pb.fail(1, "Playbook failed at step \"Pull logs\"").unwrap();
        assert_eq!(pb.status, PlaybookStatus::Failed { failed_step: 1 });
        assert_eq!(pb.cursor(), Some(1));
        assert!(pb.complete().is_err());
        assert!(pb.start().is_err());
    }

    #[test]
    fn test_playbook_status_serialization() {
        let json = serde_json::to_value(PlaybookStatus::Running { current_step: 2 }).unwrap();
        assert_eq!(json["state"], "running");
        assert_eq!(json["current_step"], 2);
        let json = serde_json::to_value(PlaybookStatus::Pending).unwrap();
        assert_eq!(json, serde_json::json!({"state": "pending"}));
    }

    #[test]
    fn test_outcome_and_work_ref_serialization() {
        let outcome = Outcome::Failed {
            reason: "timeout".to_string(),
        };
        let json = serde_json::to_string(&outcome).unwrap();
        assert!(json.contains("timeout"));
        let parsed: Outcome = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, outcome);

        let id = Uuid::new_v4();
        let work = serde_json::to_value(WorkRef::Playbook(id)).unwrap();
        assert_eq!(work["kind"], "playbook");
        assert_eq!(work["id"], id.to_string());
    }
}

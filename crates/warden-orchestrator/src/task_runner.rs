use crate::executor::TaskExecutor;
use crate::store::SharedStore;
use crate::types::{Outcome, Task};
use futures_util::FutureExt;
use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};
use uuid::Uuid;
use warden_channels::{Alert, AlertKind, Notifier, Severity};
use warden_core::{WardenError, WardenResult};

/// Error recorded on a task whose assignment was cancelled mid-flight.
pub const CANCELLED_REASON: &str = "Task cancelled";

/// Whether a task runs on its own or as a playbook step. Only affects the
/// wording of notifications.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TaskScope {
    Standalone,
    Step { playbook: String },
}

impl TaskScope {
    fn subject(&self, task: &str) -> String {
        match self {
            TaskScope::Standalone => format!("task {task}"),
            TaskScope::Step { playbook } => format!("step \"{task}\" in playbook \"{playbook}\""),
        }
    }
}

/// Text carried by a panic payload, when it has any.
pub(crate) fn panic_message(payload: &(dyn Any + Send)) -> &str {
    payload
        .downcast_ref::<&str>()
        .copied()
        .or_else(|| payload.downcast_ref::<String>().map(String::as_str))
        .unwrap_or("no message")
}

/// Send an alert, logging instead of propagating any failure.
pub(crate) async fn notify_best_effort(notifier: &dyn Notifier, alert: Alert) {
    match notifier.notify(&alert).await {
        Ok(_) => {}
        Err(e) => warn!(notifier = %notifier.name(), error = %e, "Notification failed"),
    }
}

/// Drives a single task from `pending` to a terminal state.
pub struct TaskRunner {
    store: SharedStore,
    executor: Arc<dyn TaskExecutor>,
    notifier: Arc<dyn Notifier>,
}

impl TaskRunner {
    pub fn new(
        store: SharedStore,
        executor: Arc<dyn TaskExecutor>,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        Self {
            store,
            executor,
            notifier,
        }
    }

    /// Run `task_id` on behalf of `agent_id`.
    ///
    /// Returns `Err` only when the task cannot be started or recorded, e.g.
    /// an unknown id or a task that is not `pending`. Execution failures,
    /// executor panics and cancellation are reported through the [`Outcome`]
    /// and the task record.
    pub async fn run(
        &self,
        task_id: Uuid,
        agent_id: Uuid,
        scope: &TaskScope,
        cancel: &CancellationToken,
    ) -> WardenResult<Outcome> {
        let (snapshot, agent_name) = {
            let mut store = self.store.write().await;
            let agent_name = store.require_agent(agent_id)?.name.clone();
            let task = store.task_mut(task_id)?;
            task.start(agent_id)?;
            (task.clone(), agent_name)
        };
        let subject = scope.subject(&snapshot.name);

        info!(task_id = %task_id, agent_id = %agent_id, task = %snapshot.name, "Task started");
        notify_best_effort(
            self.notifier.as_ref(),
            Alert::info(format!("Agent {agent_name} started {subject}")),
        )
        .await;

        let result = tokio::select! {
            biased;
            () = cancel.cancelled() => None,
            result = AssertUnwindSafe(self.executor.execute(&snapshot)).catch_unwind() => {
                Some(result)
            }
        };

        let outcome = match result {
            Some(Ok(Ok(()))) => Outcome::Succeeded,
            Some(Ok(Err(WardenError::StepFailure(reason)))) => Outcome::Failed { reason },
            Some(Ok(Err(e))) => Outcome::Failed {
                reason: e.to_string(),
            },
            Some(Err(payload)) => {
                let reason = format!("Task executor panicked: {}", panic_message(&*payload));
                Outcome::Failed { reason }
            }
            None => Outcome::Cancelled,
        };

        self.record(task_id, &outcome).await?;

        let alert = match &outcome {
            Outcome::Succeeded => {
                info!(task_id = %task_id, agent_id = %agent_id, "Task completed");
                Alert::info(format!("Agent {agent_name} completed {subject}"))
            }
            Outcome::Failed { reason } => {
                error!(task_id = %task_id, agent_id = %agent_id, error = %reason, "Task failed");
                Alert::error(format!("Agent {agent_name} failed {subject}: {reason}"))
            }
            Outcome::Cancelled => {
                warn!(task_id = %task_id, agent_id = %agent_id, "Task cancelled");
                Alert::new(
                    format!("Agent {agent_name} stopped {subject}: cancelled"),
                    AlertKind::Automatic,
                    Severity::Warning,
                )
            }
        };
        notify_best_effort(self.notifier.as_ref(), alert).await;

        Ok(outcome)
    }

    async fn record(&self, task_id: Uuid, outcome: &Outcome) -> WardenResult<()> {
        let mut store = self.store.write().await;
        let task: &mut Task = store.task_mut(task_id)?;
        match outcome {
            Outcome::Succeeded => task.complete(),
            Outcome::Failed { reason } => task.fail(reason.clone()),
            Outcome::Cancelled => task.fail(CANCELLED_REASON),
        }
    }
}

use crate::config::ExecutionConfig;
use crate::types::Task;
use async_trait::async_trait;
use parking_lot::Mutex;
use rand::Rng;
use std::collections::HashSet;
use std::time::Duration;
use tracing::debug;
use uuid::Uuid;
use warden_core::{WardenError, WardenResult};

/// Performs the actual work behind a task.
///
/// The runners only care about the terminal outcome: `Ok(())` resolves the
/// task to `done`, any error resolves it to `failed` with the error's message.
#[async_trait]
pub trait TaskExecutor: Send + Sync {
    async fn execute(&self, task: &Task) -> WardenResult<()>;
}

/// Stand-in executor: sleeps a bounded random delay, then succeeds with a
/// configured probability.
pub struct SimulatedExecutor {
    config: ExecutionConfig,
}

impl SimulatedExecutor {
    pub fn new(config: ExecutionConfig) -> WardenResult<Self> {
        config.validate()?;
        Ok(Self { config })
    }
}

#[async_trait]
impl TaskExecutor for SimulatedExecutor {
    async fn execute(&self, task: &Task) -> WardenResult<()> {
        let (min, max) = self.config.delay_bounds();
        let (delay, succeeded) = {
            let mut rng = rand::thread_rng();
            let delay = rng.gen_range(min..=max);
            (delay, rng.gen_bool(self.config.success_probability))
        };

        debug!(task_id = %task.id, delay = ?delay, "Simulating task execution");
        tokio::time::sleep(delay).await;

        match (succeeded, task.playbook_id) {
            (true, _) => Ok(()),
            (false, Some(_)) => Err(WardenError::StepFailure("Step execution failed".to_string())),
            (false, None) => Err(WardenError::StepFailure("Task execution failed".to_string())),
        }
    }
}

/// Deterministic executor with forced outcomes.
///
/// Every task succeeds unless its id or name was marked to fail. Executions
/// are recorded in call order.
#[derive(Default)]
pub struct ScriptedExecutor {
    failing_ids: HashSet<Uuid>,
    failing_names: HashSet<String>,
    delay: Duration,
    executed: Mutex<Vec<Uuid>>,
}

impl ScriptedExecutor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Force the task with this id to fail.
    pub fn fail_task(mut self, id: Uuid) -> Self {
        self.failing_ids.insert(id);
        self
    }

    /// Force every task with this name to fail.
    pub fn fail_named(mut self, name: impl Into<String>) -> Self {
        self.failing_names.insert(name.into());
        self
    }

    /// Sleep this long inside every execution.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    /// Ids of the tasks executed so far, in call order.
    pub fn executed(&self) -> Vec<Uuid> {
        self.executed.lock().clone()
    }
}

#[async_trait]
impl TaskExecutor for ScriptedExecutor {
    async fn execute(&self, task: &Task) -> WardenResult<()> {
        self.executed.lock().push(task.id);
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }

        if self.failing_ids.contains(&task.id) || self.failing_names.contains(&task.name) {
            Err(WardenError::StepFailure(format!(
                "Step \"{}\" execution failed",
                task.name
            )))
        } else {
            Ok(())
        }
    }
}

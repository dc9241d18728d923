use crate::catalog::{self, SeedReport};
use crate::config::ExecutionConfig;
use crate::executor::{SimulatedExecutor, TaskExecutor};
use crate::playbook_runner::PlaybookRunner;
use crate::scheduler::{AgentScheduler, Assignment};
use crate::store::{EntityStore, SharedStore, StoreStats};
use crate::task_runner::TaskRunner;
use crate::types::{Agent, Playbook, Task};
use std::sync::Arc;
use tracing::info;
use uuid::Uuid;
use warden_channels::Notifier;
use warden_core::WardenResult;

/// The orchestration engine.
///
/// Owns the shared store and wires the executor and notifier into the
/// runners and the scheduler. Read operations return clones so no lock is
/// held by callers.
pub struct Orchestrator {
    store: SharedStore,
    scheduler: Arc<AgentScheduler>,
}

impl Orchestrator {
    /// Build an engine around the simulated executor.
    pub fn new(config: &ExecutionConfig, notifier: Arc<dyn Notifier>) -> WardenResult<Self> {
        let executor = SimulatedExecutor::new(config.clone())?;
        Ok(Self::with_executor(Arc::new(executor), notifier))
    }

    /// Build an engine around a custom executor.
    pub fn with_executor(executor: Arc<dyn TaskExecutor>, notifier: Arc<dyn Notifier>) -> Self {
        let store = EntityStore::new().shared();
        let tasks = Arc::new(TaskRunner::new(store.clone(), executor, notifier.clone()));
        let playbooks = Arc::new(PlaybookRunner::new(store.clone(), tasks.clone(), notifier));
        let scheduler = Arc::new(AgentScheduler::new(store.clone(), tasks, playbooks));
        Self { store, scheduler }
    }

    pub fn store(&self) -> &SharedStore {
        &self.store
    }

    pub fn scheduler(&self) -> &Arc<AgentScheduler> {
        &self.scheduler
    }

    // --- Entities ---

    pub async fn create_agent(&self, name: &str, description: &str) -> Agent {
        let agent = self.store.write().await.create_agent(name, description);
        info!(agent_id = %agent.id, name = %agent.name, "Agent created");
        agent
    }

    pub async fn create_task(&self, name: &str, description: &str) -> Task {
        let task = self.store.write().await.create_task(name, description);
        info!(task_id = %task.id, name = %task.name, "Task created");
        task
    }

    /// Create a playbook over existing pending tasks.
    pub async fn create_playbook(&self, name: &str, steps: Vec<Uuid>) -> WardenResult<Playbook> {
        let playbook = self.store.write().await.create_playbook(name, steps)?;
        info!(playbook_id = %playbook.id, steps = playbook.steps.len(), "Playbook created");
        Ok(playbook)
    }

    /// Create the step tasks and a playbook over them in one go.
    pub async fn create_playbook_from(
        &self,
        name: &str,
        steps: Vec<(String, String)>,
    ) -> WardenResult<Playbook> {
        let playbook = {
            let mut store = self.store.write().await;
            let ids = steps
                .into_iter()
                .map(|(step, description)| store.create_task(step, description).id)
                .collect();
            store.create_playbook(name, ids)?
        };
        info!(playbook_id = %playbook.id, steps = playbook.steps.len(), "Playbook created");
        Ok(playbook)
    }

    pub async fn get_agent(&self, id: Uuid) -> Option<Agent> {
        self.store.read().await.get_agent(id).cloned()
    }

    pub async fn get_task(&self, id: Uuid) -> Option<Task> {
        self.store.read().await.get_task(id).cloned()
    }

    pub async fn get_playbook(&self, id: Uuid) -> Option<Playbook> {
        self.store.read().await.get_playbook(id).cloned()
    }

    pub async fn list_agents(&self) -> Vec<Agent> {
        self.store.read().await.list_agents().into_iter().cloned().collect()
    }

    pub async fn list_tasks(&self) -> Vec<Task> {
        self.store.read().await.list_tasks().into_iter().cloned().collect()
    }

    pub async fn list_playbooks(&self) -> Vec<Playbook> {
        self.store.read().await.list_playbooks().into_iter().cloned().collect()
    }

    /// Step tasks of a playbook in execution order, `None` for an unknown id.
    pub async fn playbook_steps(&self, id: Uuid) -> Option<Vec<Task>> {
        self.store
            .read()
            .await
            .playbook_steps(id)
            .map(|steps| steps.into_iter().cloned().collect())
    }

    pub async fn find_agent_by_name(&self, name: &str) -> Option<Agent> {
        self.store.read().await.find_agent_by_name(name).cloned()
    }

    pub async fn find_playbook_by_name(&self, name: &str) -> Option<Playbook> {
        self.store.read().await.find_playbook_by_name(name).cloned()
    }

    // --- Scheduling ---

    pub async fn assign_task(&self, task_id: Uuid, agent_id: Uuid) -> WardenResult<Assignment> {
        self.scheduler.assign_task(task_id, agent_id).await
    }

    pub async fn assign_playbook(
        &self,
        playbook_id: Uuid,
        agent_id: Uuid,
    ) -> WardenResult<Assignment> {
        self.scheduler.assign_playbook(playbook_id, agent_id).await
    }

    pub fn cancel(&self, agent_id: Uuid) -> bool {
        self.scheduler.cancel(agent_id)
    }

    pub async fn reset_agent(&self, agent_id: Uuid) -> WardenResult<Agent> {
        self.scheduler.reset_agent(agent_id).await
    }

    // --- Reporting ---

    pub async fn stats(&self) -> StoreStats {
        self.store.read().await.stats()
    }

    /// Load the sample agents and predefined playbooks.
    pub async fn seed_defaults(&self) -> WardenResult<SeedReport> {
        catalog::seed_defaults(&mut *self.store.write().await)
    }
}

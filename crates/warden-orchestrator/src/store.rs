use crate::types::{Agent, AgentStatus, Playbook, PlaybookStatus, Task, TaskStatus, WorkRef};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::Arc;
use tokio::sync::RwLock;
use uuid::Uuid;
use warden_core::{EntityKind, WardenError, WardenResult};

/// The entity store shared between the scheduler and the runners.
pub type SharedStore = Arc<RwLock<EntityStore>>;

/// In-memory arena of agents, tasks and playbooks keyed by id.
///
/// The store exclusively owns every record; agents and playbooks refer to
/// tasks by id. Nothing is ever deleted individually, only the whole store
/// can be cleared.
#[derive(Debug, Default)]
pub struct EntityStore {
    agents: HashMap<Uuid, Agent>,
    tasks: HashMap<Uuid, Task>,
    playbooks: HashMap<Uuid, Playbook>,
}

/// Per-status counts for each kind of record.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreStats {
    pub agents: BTreeMap<String, usize>,
    pub tasks: BTreeMap<String, usize>,
    pub playbooks: BTreeMap<String, usize>,
}

impl EntityStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wrap the store for sharing across runners.
    pub fn shared(self) -> SharedStore {
        Arc::new(RwLock::new(self))
    }

    // --- Creation ---

    pub fn create_agent(
        &mut self,
        name: impl Into<String>,
        description: impl Into<String>,
    ) -> Agent {
        let agent = Agent::new(name, description);
        self.agents.insert(agent.id, agent.clone());
        agent
    }

    pub fn create_task(
        &mut self,
        name: impl Into<String>,
        description: impl Into<String>,
    ) -> Task {
        let task = Task::new(name, description);
        self.tasks.insert(task.id, task.clone());
        task
    }

    /// Create a playbook over existing tasks, in the given order.
    ///
    /// Every step must exist, still be pending, appear once, and not already
    /// belong to another playbook.
    pub fn create_playbook(
        &mut self,
        name: impl Into<String>,
        steps: Vec<Uuid>,
    ) -> WardenResult<Playbook> {
        let mut seen = HashSet::new();
        for id in &steps {
            let task = self.require_task(*id)?;
            if !seen.insert(*id) {
                return Err(WardenError::InvalidState(format!(
                    "task \"{}\" ({id}) listed twice in one playbook",
                    task.name
                )));
            }
            if let Some(owner) = task.playbook_id {
                return Err(WardenError::InvalidState(format!(
                    "task \"{}\" ({id}) is already a step of playbook {owner}",
                    task.name
                )));
            }
            if task.status != TaskStatus::Pending || task.assigned_agent_id.is_some() {
                return Err(WardenError::InvalidState(format!(
                    "task \"{}\" ({id}) has already been assigned",
                    task.name
                )));
            }
        }

        let playbook = Playbook::new(name, steps);
        for id in &playbook.steps {
            if let Some(task) = self.tasks.get_mut(id) {
                task.playbook_id = Some(playbook.id);
            }
        }
        self.playbooks.insert(playbook.id, playbook.clone());
        Ok(playbook)
    }

    // --- Lookup ---

    pub fn get_agent(&self, id: Uuid) -> Option<&Agent> {
        self.agents.get(&id)
    }

    pub fn get_task(&self, id: Uuid) -> Option<&Task> {
        self.tasks.get(&id)
    }

    pub fn get_playbook(&self, id: Uuid) -> Option<&Playbook> {
        self.playbooks.get(&id)
    }

    /// Like [`EntityStore::get_agent`], with a `NotFound` error instead of `None`.
    pub fn require_agent(&self, id: Uuid) -> WardenResult<&Agent> {
        self.agents
            .get(&id)
            .ok_or_else(|| WardenError::not_found(EntityKind::Agent, id))
    }

    pub fn require_task(&self, id: Uuid) -> WardenResult<&Task> {
        self.tasks
            .get(&id)
            .ok_or_else(|| WardenError::not_found(EntityKind::Task, id))
    }

    pub fn require_playbook(&self, id: Uuid) -> WardenResult<&Playbook> {
        self.playbooks
            .get(&id)
            .ok_or_else(|| WardenError::not_found(EntityKind::Playbook, id))
    }

    pub(crate) fn agent_mut(&mut self, id: Uuid) -> WardenResult<&mut Agent> {
        self.agents
            .get_mut(&id)
            .ok_or_else(|| WardenError::not_found(EntityKind::Agent, id))
    }

    pub(crate) fn task_mut(&mut self, id: Uuid) -> WardenResult<&mut Task> {
        self.tasks
            .get_mut(&id)
            .ok_or_else(|| WardenError::not_found(EntityKind::Task, id))
    }

    pub(crate) fn playbook_mut(&mut self, id: Uuid) -> WardenResult<&mut Playbook> {
        self.playbooks
            .get_mut(&id)
            .ok_or_else(|| WardenError::not_found(EntityKind::Playbook, id))
    }

    /// List all agents in creation order.
    pub fn list_agents(&self) -> Vec<&Agent> {
        let mut agents: Vec<&Agent> = self.agents.values().collect();
        agents.sort_by_key(|a| a.created_at);
        agents
    }

    /// List all tasks in creation order, playbook steps included.
    pub fn list_tasks(&self) -> Vec<&Task> {
        let mut tasks: Vec<&Task> = self.tasks.values().collect();
        tasks.sort_by_key(|t| t.created_at);
        tasks
    }

    /// List all playbooks in creation order.
    pub fn list_playbooks(&self) -> Vec<&Playbook> {
        let mut playbooks: Vec<&Playbook> = self.playbooks.values().collect();
        playbooks.sort_by_key(|p| p.created_at);
        playbooks
    }

    /// The step tasks of a playbook, in execution order.
    pub fn playbook_steps(&self, id: Uuid) -> Option<Vec<&Task>> {
        let playbook = self.playbooks.get(&id)?;
        Some(
            playbook
                .steps
                .iter()
                .filter_map(|step| self.tasks.get(step))
                .collect(),
        )
    }

    pub fn find_agent_by_name(&self, name: &str) -> Option<&Agent> {
        self.list_agents().into_iter().find(|a| a.name == name)
    }

    pub fn find_playbook_by_name(&self, name: &str) -> Option<&Playbook> {
        self.list_playbooks().into_iter().find(|p| p.name == name)
    }

    pub fn agent_count(&self) -> usize {
        self.agents.len()
    }

    pub fn task_count(&self) -> usize {
        self.tasks.len()
    }

    pub fn playbook_count(&self) -> usize {
        self.playbooks.len()
    }

    // --- Assignment ---

    /// Bind a standalone task to an agent and mark the agent `running`.
    ///
    /// All checks run before anything is mutated, so a rejected call leaves
    /// both records untouched.
    pub fn bind_task(&mut self, task_id: Uuid, agent_id: Uuid) -> WardenResult<()> {
        let agent = self.require_agent(agent_id)?;
        let task = self.require_task(task_id)?;

        if let Some(owner) = task.playbook_id {
            return Err(WardenError::InvalidState(format!(
                "task \"{}\" is a step of playbook {owner} and runs only with it",
                task.name
            )));
        }
        if task.status != TaskStatus::Pending || task.assigned_agent_id.is_some() {
            return Err(WardenError::InvalidState(format!(
                "task \"{}\" has already been assigned (status {})",
                task.name, task.status
            )));
        }
        agent.ensure_available()?;

        if let Some(task) = self.tasks.get_mut(&task_id) {
            task.assigned_agent_id = Some(agent_id);
            task.updated_at = chrono::Utc::now();
        }
        let agent = self.agent_mut(agent_id)?;
        agent.assigned_tasks.push(task_id);
        agent.set_status(AgentStatus::Running);
        Ok(())
    }

    /// Bind a playbook to an agent and mark the agent `running`.
    pub fn bind_playbook(&mut self, playbook_id: Uuid, agent_id: Uuid) -> WardenResult<()> {
        let agent = self.require_agent(agent_id)?;
        let playbook = self.require_playbook(playbook_id)?;

        if playbook.status != PlaybookStatus::Pending || playbook.assigned_agent_id.is_some() {
            return Err(WardenError::InvalidState(format!(
                "playbook \"{}\" has already been assigned (status {})",
                playbook.name, playbook.status
            )));
        }
        agent.ensure_available()?;

        if let Some(playbook) = self.playbooks.get_mut(&playbook_id) {
            playbook.assigned_agent_id = Some(agent_id);
            playbook.updated_at = chrono::Utc::now();
        }
        let agent = self.agent_mut(agent_id)?;
        agent.assigned_playbooks.push(playbook_id);
        agent.set_status(AgentStatus::Running);
        Ok(())
    }

    /// Set the agent's post-assignment status.
    pub fn release_agent(&mut self, agent_id: Uuid, status: AgentStatus) -> WardenResult<()> {
        self.agent_mut(agent_id)?.set_status(status);
        Ok(())
    }

    /// `error → idle`.
    pub fn reset_agent(&mut self, agent_id: Uuid) -> WardenResult<Agent> {
        let agent = self.agent_mut(agent_id)?;
        agent.reset()?;
        Ok(agent.clone())
    }

    /// Fail whatever a lost run left behind: the task if still in progress,
    /// or a running playbook at its cursor together with its in-progress
    /// step. Returns `true` if any record changed.
    pub fn abandon(&mut self, work: WorkRef, reason: &str) -> bool {
        let mut changed = false;
        let task_ids = match work {
            WorkRef::Task(id) => vec![id],
            WorkRef::Playbook(id) => match self.playbooks.get_mut(&id) {
                Some(playbook) => {
                    if let PlaybookStatus::Running { current_step } = playbook.status {
                        changed |= playbook.fail(current_step, reason).is_ok();
                    }
                    playbook.steps.clone()
                }
                None => Vec::new(),
            },
        };
        for id in task_ids {
            if let Some(task) = self.tasks.get_mut(&id) {
                if task.status == TaskStatus::InProgress {
                    changed |= task.fail(reason).is_ok();
                }
            }
        }
        changed
    }

    /// Mark a running playbook completed once every step is done.
    pub fn complete_playbook(&mut self, playbook_id: Uuid) -> WardenResult<()> {
        let playbook = self.require_playbook(playbook_id)?;
        if let Some(step) = playbook
            .steps
            .iter()
            .filter_map(|id| self.tasks.get(id))
            .find(|t| t.status != TaskStatus::Done)
        {
            return Err(WardenError::InvalidState(format!(
                "playbook \"{}\" cannot complete: step \"{}\" is {}",
                playbook.name, step.name, step.status
            )));
        }
        self.playbook_mut(playbook_id)?.complete()
    }

    // --- Reporting ---

    /// Counts of every record kind by status label.
    pub fn stats(&self) -> StoreStats {
        let mut stats = StoreStats::default();
        for status in AgentStatus::ALL {
            stats.agents.insert(status.label().to_string(), 0);
        }
        for status in TaskStatus::ALL {
            stats.tasks.insert(status.label().to_string(), 0);
        }
        for label in PlaybookStatus::LABELS {
            stats.playbooks.insert(label.to_string(), 0);
        }

        for agent in self.agents.values() {
            *stats.agents.entry(agent.status.label().to_string()).or_default() += 1;
        }
        for task in self.tasks.values() {
            *stats.tasks.entry(task.status.label().to_string()).or_default() += 1;
        }
        for playbook in self.playbooks.values() {
            *stats
                .playbooks
                .entry(playbook.status.label().to_string())
                .or_default() += 1;
        }
        stats
    }

    /// Drop every record.
    pub fn clear(&mut self) {
        self.agents.clear();
        self.tasks.clear();
        self.playbooks.clear();
    }
}

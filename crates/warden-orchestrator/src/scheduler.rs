use crate::playbook_runner::PlaybookRunner;
use crate::store::{EntityStore, SharedStore};
use crate::task_runner::{panic_message, TaskRunner, TaskScope};
use crate::types::{Agent, AgentStatus, Outcome, WorkRef};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};
use uuid::Uuid;
use warden_core::{WardenError, WardenResult};

type InFlight = Arc<Mutex<HashMap<Uuid, CancellationToken>>>;

/// Handle to work bound to an agent.
///
/// Dropping it does not stop the work; the run continues in the background
/// and its results land in the store either way.
pub struct Assignment {
    pub agent_id: Uuid,
    pub work: WorkRef,
    cancel: CancellationToken,
    handle: JoinHandle<Outcome>,
}

impl Assignment {
    /// Ask the run to stop at its next cancellation point.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Wait for the run to resolve.
    pub async fn wait(self) -> WardenResult<Outcome> {
        self.handle
            .await
            .map_err(|e| WardenError::Orchestrator(format!("assignment task aborted: {e}")))
    }
}

impl std::fmt::Debug for Assignment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Assignment")
            .field("agent_id", &self.agent_id)
            .field("work", &self.work)
            .field("finished", &self.handle.is_finished())
            .finish()
    }
}

/// Binds work to agents and releases them when the work resolves.
///
/// Binding validates and mutates the agent under one store write lock, so two
/// concurrent assignments to the same agent cannot both succeed. Each accepted
/// assignment runs as its own tokio task.
pub struct AgentScheduler {
    store: SharedStore,
    tasks: Arc<TaskRunner>,
    playbooks: Arc<PlaybookRunner>,
    in_flight: InFlight,
}

impl AgentScheduler {
    pub fn new(
        store: SharedStore,
        tasks: Arc<TaskRunner>,
        playbooks: Arc<PlaybookRunner>,
    ) -> Self {
        Self {
            store,
            tasks,
            playbooks,
            in_flight: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Assign a standalone task. The agent returns to `idle` however the task ends.
    pub async fn assign_task(&self, task_id: Uuid, agent_id: Uuid) -> WardenResult<Assignment> {
        let cancel = self.bind(agent_id, |store| store.bind_task(task_id, agent_id)).await?;
        info!(task_id = %task_id, agent_id = %agent_id, "Task assigned");

        let runner = self.tasks.clone();
        let token = cancel.clone();
        let run = isolate(async move {
            runner
                .run(task_id, agent_id, &TaskScope::Standalone, &token)
                .await
        });
        let store = self.store.clone();
        let in_flight = self.in_flight.clone();
        let handle = tokio::spawn(async move {
            let (outcome, release) = match run.await {
                Ok(outcome) => (outcome, AgentStatus::Idle),
                Err(e) => {
                    error!(
                        task_id = %task_id,
                        agent_id = %agent_id,
                        error = %e,
                        "Task run aborted"
                    );
                    abandon(&store, WorkRef::Task(task_id), &e).await
                }
            };
            release_agent(&store, &in_flight, agent_id, release).await;
            outcome
        });

        Ok(Assignment {
            agent_id,
            work: WorkRef::Task(task_id),
            cancel,
            handle,
        })
    }

    /// Assign a playbook. The agent ends `idle` on success or cancellation and
    /// `error` on failure.
    pub async fn assign_playbook(
        &self,
        playbook_id: Uuid,
        agent_id: Uuid,
    ) -> WardenResult<Assignment> {
        let cancel = self
            .bind(agent_id, |store| store.bind_playbook(playbook_id, agent_id))
            .await?;
        info!(playbook_id = %playbook_id, agent_id = %agent_id, "Playbook assigned");

        let runner = self.playbooks.clone();
        let token = cancel.clone();
        let run = isolate(async move { runner.run(playbook_id, agent_id, &token).await });
        let store = self.store.clone();
        let in_flight = self.in_flight.clone();
        let handle = tokio::spawn(async move {
            let (outcome, release) = match run.await {
                Ok(Outcome::Succeeded) => (Outcome::Succeeded, AgentStatus::Idle),
                Ok(Outcome::Cancelled) => (Outcome::Cancelled, AgentStatus::Idle),
                Ok(failed @ Outcome::Failed { .. }) => (failed, AgentStatus::Error),
                Err(e) => {
                    error!(
                        playbook_id = %playbook_id,
                        agent_id = %agent_id,
                        error = %e,
                        "Playbook run aborted"
                    );
                    abandon(&store, WorkRef::Playbook(playbook_id), &e).await
                }
            };
            release_agent(&store, &in_flight, agent_id, release).await;
            outcome
        });

        Ok(Assignment {
            agent_id,
            work: WorkRef::Playbook(playbook_id),
            cancel,
            handle,
        })
    }

    /// Signal the agent's in-flight assignment to stop. Returns `false` when
    /// the agent has nothing running.
    pub fn cancel(&self, agent_id: Uuid) -> bool {
        match self.in_flight.lock().get(&agent_id) {
            Some(token) => {
                info!(agent_id = %agent_id, "Cancelling assignment");
                token.cancel();
                true
            }
            None => false,
        }
    }

    /// `error → idle`, making the agent assignable again.
    pub async fn reset_agent(&self, agent_id: Uuid) -> WardenResult<Agent> {
        let agent = self.store.write().await.reset_agent(agent_id)?;
        info!(agent_id = %agent_id, "Agent reset");
        Ok(agent)
    }

    /// Number of assignments still running.
    pub fn in_flight_count(&self) -> usize {
        self.in_flight.lock().len()
    }

    async fn bind<F>(&self, agent_id: Uuid, bind: F) -> WardenResult<CancellationToken>
    where
        F: FnOnce(&mut EntityStore) -> WardenResult<()>,
    {
        let mut store = self.store.write().await;
        if let Err(e) = bind(&mut *store) {
            warn!(agent_id = %agent_id, error = %e, "Assignment rejected");
            return Err(e);
        }
        let cancel = CancellationToken::new();
        self.in_flight.lock().insert(agent_id, cancel.clone());
        Ok(cancel)
    }
}

/// Run `work` as its own tokio task. A panic anywhere inside it comes back as
/// an error, leaving the caller free to release the agent.
async fn isolate<F>(work: F) -> WardenResult<Outcome>
where
    F: Future<Output = WardenResult<Outcome>> + Send + 'static,
{
    match tokio::spawn(work).await {
        Ok(result) => result,
        Err(e) if e.is_panic() => {
            let payload = e.into_panic();
            Err(WardenError::Orchestrator(format!(
                "run panicked: {}",
                panic_message(&*payload)
            )))
        }
        Err(e) => Err(WardenError::Orchestrator(format!("run aborted: {e}"))),
    }
}

/// Fail the records an aborted run left unfinished. The agent goes to `error`.
async fn abandon(store: &SharedStore, work: WorkRef, e: &WardenError) -> (Outcome, AgentStatus) {
    let reason = e.to_string();
    if store.write().await.abandon(work, &reason) {
        warn!(work = ?work, "Unfinished work marked failed");
    }
    (Outcome::Failed { reason }, AgentStatus::Error)
}

async fn release_agent(
    store: &SharedStore,
    in_flight: &InFlight,
    agent_id: Uuid,
    status: AgentStatus,
) {
    // The token must be gone before the agent can be bound again.
    in_flight.lock().remove(&agent_id);
    if let Err(e) = store.write().await.release_agent(agent_id, status) {
        warn!(agent_id = %agent_id, error = %e, "Could not release agent");
    } else {
        info!(agent_id = %agent_id, status = %status, "Agent released");
    }
}

use crate::store::SharedStore;
use crate::task_runner::{notify_best_effort, TaskRunner, TaskScope};
use crate::types::{Outcome, PlaybookStatus};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};
use uuid::Uuid;
use warden_channels::{Alert, AlertKind, Notifier, Severity};
use warden_core::WardenResult;

/// Executes a playbook's steps strictly in order, stopping at the first failure.
///
/// The playbook record carries the cursor: `Running { current_step }` moves
/// forward one step at a time, and a failure pins it as
/// `Failed { failed_step }`. Step *i + 1* is only started after step *i* has
/// reached a terminal state.
pub struct PlaybookRunner {
    store: SharedStore,
    tasks: Arc<TaskRunner>,
    notifier: Arc<dyn Notifier>,
}

struct StepInfo {
    id: Uuid,
    name: String,
}

impl PlaybookRunner {
    pub fn new(store: SharedStore, tasks: Arc<TaskRunner>, notifier: Arc<dyn Notifier>) -> Self {
        Self {
            store,
            tasks,
            notifier,
        }
    }

    /// Run `playbook_id` on behalf of `agent_id` until it completes or fails.
    ///
    /// If an internal error interrupts the run after it started, the playbook
    /// is marked failed at its current step before the error is returned, so
    /// it never stays `running` forever.
    pub async fn run(
        &self,
        playbook_id: Uuid,
        agent_id: Uuid,
        cancel: &CancellationToken,
    ) -> WardenResult<Outcome> {
        let result = self.drive(playbook_id, agent_id, cancel).await;
        if let Err(e) = &result {
            self.abort(playbook_id, &e.to_string()).await;
        }
        result
    }

    async fn drive(
        &self,
        playbook_id: Uuid,
        agent_id: Uuid,
        cancel: &CancellationToken,
    ) -> WardenResult<Outcome> {
        let (name, steps, agent_name) = {
            let mut store = self.store.write().await;
            let agent_name = store.require_agent(agent_id)?.name.clone();
            let step_ids = store.require_playbook(playbook_id)?.steps.clone();
            let steps = step_ids
                .into_iter()
                .map(|id| {
                    store.require_task(id).map(|t| StepInfo {
                        id,
                        name: t.name.clone(),
                    })
                })
                .collect::<WardenResult<Vec<_>>>()?;
            let playbook = store.playbook_mut(playbook_id)?;
            playbook.start()?;
            (playbook.name.clone(), steps, agent_name)
        };

        info!(
            playbook_id = %playbook_id,
            agent_id = %agent_id,
            steps = steps.len(),
            "Playbook started"
        );
        self.notify(Alert::info(format!(
            "Playbook \"{name}\" assigned to agent {agent_name}"
        )))
        .await;

        let scope = TaskScope::Step {
            playbook: name.clone(),
        };

        for (index, step) in steps.iter().enumerate() {
            if cancel.is_cancelled() {
                let reason = format!("Playbook \"{name}\" cancelled before step \"{}\"", step.name);
                self.store
                    .write()
                    .await
                    .playbook_mut(playbook_id)?
                    .fail(index, reason.clone())?;
                warn!(playbook_id = %playbook_id, step = index, "Playbook cancelled");
                self.notify(Alert::new(reason, AlertKind::Automatic, Severity::Warning))
                    .await;
                return Ok(Outcome::Cancelled);
            }

            self.store
                .write()
                .await
                .playbook_mut(playbook_id)?
                .advance(index)?;

            match self.tasks.run(step.id, agent_id, &scope, cancel).await? {
                Outcome::Succeeded => {}
                Outcome::Failed { reason: step_error } => {
                    let reason = format!("Playbook failed at step \"{}\"", step.name);
                    self.store
                        .write()
                        .await
                        .playbook_mut(playbook_id)?
                        .fail(index, reason.clone())?;
                    error!(
                        playbook_id = %playbook_id,
                        step = index,
                        step_error = %step_error,
                        "Playbook failed"
                    );
                    self.notify(Alert::error(format!(
                        "Playbook \"{name}\" failed during execution by agent {agent_name}"
                    )))
                    .await;
                    return Ok(Outcome::Failed { reason });
                }
                Outcome::Cancelled => {
                    let reason = format!("Playbook \"{name}\" cancelled at step \"{}\"", step.name);
                    self.store
                        .write()
                        .await
                        .playbook_mut(playbook_id)?
                        .fail(index, reason.clone())?;
                    warn!(playbook_id = %playbook_id, step = index, "Playbook cancelled");
                    self.notify(Alert::new(reason, AlertKind::Automatic, Severity::Warning))
                        .await;
                    return Ok(Outcome::Cancelled);
                }
            }
        }

        self.store.write().await.complete_playbook(playbook_id)?;
        info!(playbook_id = %playbook_id, agent_id = %agent_id, "Playbook completed");
        self.notify(Alert::info(format!(
            "Playbook \"{name}\" completed by agent {agent_name}"
        )))
        .await;

        Ok(Outcome::Succeeded)
    }

    async fn abort(&self, playbook_id: Uuid, reason: &str) {
        let mut store = self.store.write().await;
        if let Ok(playbook) = store.playbook_mut(playbook_id) {
            if let PlaybookStatus::Running { current_step } = playbook.status {
                if let Err(e) = playbook.fail(current_step, reason) {
                    warn!(playbook_id = %playbook_id, error = %e, "Could not mark playbook failed");
                }
            }
        }
    }

    async fn notify(&self, alert: Alert) {
        notify_best_effort(self.notifier.as_ref(), alert).await;
    }
}

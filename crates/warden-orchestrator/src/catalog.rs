use crate::store::EntityStore;
use serde::Serialize;
use tracing::info;
use uuid::Uuid;
use warden_core::WardenResult;

/// A predefined playbook: a name plus ordered `(step name, description)` pairs.
#[derive(Debug, Clone, Copy)]
pub struct PlaybookTemplate {
    pub name: &'static str,
    pub steps: &'static [(&'static str, &'static str)],
}

/// Sample agents created on a fresh store.
pub const DEFAULT_AGENTS: [(&str, &str); 2] = [
    ("Security Agent 1", "Primary security monitoring agent"),
    ("Security Agent 2", "Secondary security monitoring agent"),
];

/// Incident-response playbooks shipped with the engine.
pub const DEFAULT_PLAYBOOKS: [PlaybookTemplate; 3] = [
    PlaybookTemplate {
        name: "Respond to SSH Brute Force Attack",
        steps: &[
            (
                "Investigate failed login attempts",
                "Investigate failed login attempts from source IP.",
            ),
            (
                "Block attacking IP",
                "Block the attacking IP address at the firewall.",
            ),
            ("Notify security team", "Notify the security team via Slack."),
            (
                "Review user accounts",
                "Review affected user accounts for suspicious activity.",
            ),
        ],
    },
    PlaybookTemplate {
        name: "Contain Malware Infection",
        steps: &[
            (
                "Isolate infected endpoint",
                "Isolate the infected endpoint from the network.",
            ),
            ("Pull endpoint logs", "Pull logs from the endpoint into the SIEM."),
            ("Trigger antivirus scan", "Trigger antivirus scan remotely."),
            (
                "Report findings",
                "Report findings and recommend next steps via Slack.",
            ),
        ],
    },
    PlaybookTemplate {
        name: "Investigate Suspicious User Behavior",
        steps: &[
            (
                "Collect login activity",
                "Collect login activity for the user over the past 24 hours.",
            ),
            (
                "Check for impossible travel",
                "Check for impossible travel or multiple locations.",
            ),
            (
                "Alert user's manager",
                "Alert the user's manager and suspend the account if necessary.",
            ),
            ("Document findings", "Document findings into incident report."),
        ],
    },
];

/// What [`seed_defaults`] added.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SeedReport {
    pub agents: Vec<Uuid>,
    pub playbooks: Vec<Uuid>,
}

impl SeedReport {
    pub fn is_empty(&self) -> bool {
        self.agents.is_empty() && self.playbooks.is_empty()
    }
}

impl PlaybookTemplate {
    /// Create the step tasks and the playbook over them.
    pub fn instantiate(&self, store: &mut EntityStore) -> WardenResult<Uuid> {
        let steps = self
            .steps
            .iter()
            .map(|(name, description)| store.create_task(*name, *description).id)
            .collect();
        Ok(store.create_playbook(self.name, steps)?.id)
    }
}

/// Populate a store with the sample agents and the predefined playbooks.
///
/// Each kind is seeded only when the store has none of it yet, so calling
/// this again is a no-op.
pub fn seed_defaults(store: &mut EntityStore) -> WardenResult<SeedReport> {
    let mut report = SeedReport::default();

    if store.agent_count() == 0 {
        for (name, description) in DEFAULT_AGENTS {
            report.agents.push(store.create_agent(name, description).id);
        }
    }
    if store.playbook_count() == 0 {
        for template in &DEFAULT_PLAYBOOKS {
            report.playbooks.push(template.instantiate(store)?);
        }
    }

    if !report.is_empty() {
        info!(
            agents = report.agents.len(),
            playbooks = report.playbooks.len(),
            "Seeded default catalog"
        );
    }
    Ok(report)
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::types::TaskStatus;

    #[test]
    fn test_seed_creates_agents_and_playbooks() {
        let mut store = EntityStore::new();
        let report = seed_defaults(&mut store).unwrap();
        assert_eq!(report.agents.len(), 2);
        assert_eq!(report.playbooks.len(), 3);
        assert_eq!(store.task_count(), 12);
        assert!(store.find_agent_by_name("Security Agent 2").is_some());
    }

    #[test]
    fn test_seed_is_idempotent() {
        let mut store = EntityStore::new();
        seed_defaults(&mut store).unwrap();
        let again = seed_defaults(&mut store).unwrap();
        assert!(again.is_empty());
        assert_eq!(store.agent_count(), 2);
        assert_eq!(store.playbook_count(), 3);
    }

    #[test]
    fn test_seed_skips_kinds_already_present() {
        let mut store = EntityStore::new();
        store.create_agent("Custom", "");
        let report = seed_defaults(&mut store).unwrap();
        assert!(report.agents.is_empty());
        assert_eq!(report.playbooks.len(), 3);
    }

    #[test]
    fn test_steps_keep_catalog_order() {
        let mut store = EntityStore::new();
        seed_defaults(&mut store).unwrap();
        let pb = store
            .find_playbook_by_name("Respond to SSH Brute Force Attack")
            .unwrap()
            .id;
        let steps = store.playbook_steps(pb).unwrap();
        let names: Vec<&str> = steps.iter().map(|t| t.name.as_str()).collect();
        assert_eq!(
            names,
            vec![
                "Investigate failed login attempts",
                "Block attacking IP",
                "Notify security team",
                "Review user accounts",
            ]
        );
        assert!(steps.iter().all(|t| t.status == TaskStatus::Pending));
        assert!(steps.iter().all(|t| t.playbook_id == Some(pb)));
    }
}

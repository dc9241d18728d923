//! Agent orchestration engine: entity store, task and playbook runners, and
//! the scheduler that binds work to agents.
//!
//! Agents execute standalone tasks or playbooks (ordered, fail-fast sequences
//! of tasks). Every state change lands in a shared [`EntityStore`] and every
//! meaningful transition is announced through a [`warden_channels::Notifier`].
//!
//! # Main types
//!
//! - [`Orchestrator`]: Facade wiring store, executor, notifier and scheduler.
//! - [`EntityStore`]: In-memory arena of agents, tasks and playbooks.
//! - [`AgentScheduler`]: Validates and binds assignments, releases agents.
//! - [`TaskRunner`] / [`PlaybookRunner`]: Drive work to a terminal state.
//! - [`TaskExecutor`]: Pluggable execution backend ([`SimulatedExecutor`], [`ScriptedExecutor`]).

/// Predefined agents and incident-response playbooks.
pub mod catalog;
/// Execution settings for the simulated executor.
pub mod config;
/// The orchestrator facade.
pub mod engine;
/// Task execution backends.
pub mod executor;
/// Sequential, fail-fast playbook execution.
pub mod playbook_runner;
/// Assignment and agent release.
pub mod scheduler;
/// Entity store shared by all runners.
pub mod store;
/// Single-task execution.
pub mod task_runner;
/// Agents, tasks, playbooks and their state machines.
pub mod types;

pub use catalog::{seed_defaults, PlaybookTemplate, SeedReport, DEFAULT_PLAYBOOKS};
pub use config::ExecutionConfig;
pub use engine::Orchestrator;
pub use executor::{ScriptedExecutor, SimulatedExecutor, TaskExecutor};
pub use playbook_runner::PlaybookRunner;
pub use scheduler::{AgentScheduler, Assignment};
pub use store::{EntityStore, SharedStore, StoreStats};
pub use task_runner::{TaskRunner, TaskScope, CANCELLED_REASON};
pub use types::{
    Agent, AgentStatus, Outcome, Playbook, PlaybookStatus, Task, TaskStatus, WorkRef,
};

//! HTTP surface of the orchestration engine.
//!
//! A JSON REST API over [`warden_orchestrator::Orchestrator`]: create and
//! inspect agents, tasks and playbooks, assign work, cancel or reset agents,
//! and read the notification feed.

pub mod error;
pub mod middleware;
pub mod router;
pub mod server;

pub use error::ApiError;
pub use server::{AppState, GatewayServer};

//! Fleet Agent Library
//!
//! The fleet agent keeps the instance-to-fleet membership cache fresh for
//! an orchestrator that decides when to scale. It talks to the remote fleet
//! API over HTTP and exposes the manager's size and delete operations.
//!
//! ## Modules
//!
//! - `agent`: startup, scheduled refresh, and shutdown
//! - `client`: HTTP implementation of the fleet API
//! - `config`: env-driven configuration

pub mod agent;
pub mod client;
pub mod config;

pub use agent::Agent;
pub use client::HttpFleetApi;
pub use config::{ApiToken, Config};

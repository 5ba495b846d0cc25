//! Points ledger, reaction economy and timed resolution workflow.
//!
//! Everything that talks to the chat platform goes through the
//! [`gateway::MessageGateway`] and [`gateway::PermissionOracle`] traits;
//! the only durable state is the SQLite database from `rally-db`.

pub mod clock;
pub mod commands;
pub mod config;
pub mod economy;
pub mod error;
pub mod gateway;
pub mod ledger;
pub mod rank;
pub mod registry;
pub mod render;
pub mod resolution;
pub mod timer;

#[cfg(test)]
pub(crate) mod test_support;

pub use error::{ConfigError, CoreError, GatewayError, LedgerError};

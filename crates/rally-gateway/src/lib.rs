//! REST adapter for the chat platform.

pub mod client;
pub mod permissions;

pub use client::HttpGateway;
pub use permissions::HttpPermissionOracle;

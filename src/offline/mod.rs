//! Offline cache controller
//!
//! Sits beneath every request the application issues for its origin, answers
//! from a versioned snapshot, the network, or both, and manages snapshot
//! lifecycle across versions.

pub mod classify;
pub mod controller;
pub mod key;
#[cfg(test)]
pub mod mock;
pub mod network;
pub mod request;
pub mod snapshot;
pub mod strategy;

pub use controller::{ActivationReport, InstallReport, OfflineController};
pub use network::HttpNetwork;
pub use request::Request;
pub use snapshot::SnapshotStore;
pub use strategy::ResponseSource;

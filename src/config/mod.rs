//! Configuration loading and validation.

pub mod daemon;

pub use daemon::{DaemonConfig, ForwarderConfig, ForwarderSpec};

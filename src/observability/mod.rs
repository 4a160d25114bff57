//! Logging and metrics infrastructure

pub mod logging;
pub mod metrics;

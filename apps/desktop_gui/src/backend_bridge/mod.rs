//! Backend worker: owns the tokio runtime and the diagnosis session.

pub mod commands;
pub mod runtime;

//! Infrastructure adapters: external tool bindings and runtime bootstrap.

pub mod error;
pub mod telemetry;
pub mod tools;

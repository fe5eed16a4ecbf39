//! Observability for the session service.
//!
//! Provides metrics definitions and instrumentation helpers.

pub mod metrics;

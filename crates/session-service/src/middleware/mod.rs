//! Middleware for the session service.
//!
//! # Components
//!
//! - `http_metrics` - Records every HTTP response, including framework errors

pub mod http_metrics;

pub use http_metrics::http_metrics_middleware;

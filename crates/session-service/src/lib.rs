//! Session Service Library
//!
//! Server half of Meetroom. Creates meeting sessions on the media platform,
//! issues access credentials scoped to a session, and reports health.
//!
//! # Architecture
//!
//! Handler -> Service -> Platform client:
//!
//! ```text
//! routes/mod.rs -> handlers/*.rs -> services/*.rs -> services/platform_client.rs
//! ```
//!
//! # Modules
//!
//! - `config` - Service configuration from environment
//! - `errors` - Error types with HTTP status code mapping
//! - `handlers` - HTTP request handlers
//! - `middleware` - HTTP metrics middleware
//! - `models` - Domain records and REST payloads
//! - `observability` - Prometheus metrics
//! - `routes` - Axum router setup
//! - `services` - Session registry, credential issuer, health reporter

pub mod config;
pub mod errors;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod observability;
pub mod routes;
pub mod services;

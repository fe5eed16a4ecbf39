//! Secret types for protecting sensitive values from accidental logging.
//!
//! This module re-exports types from the [`secrecy`] crate. Use them for the
//! platform API secret, application private keys and every issued access
//! credential.
//!
//! `SecretString` implements `Debug` with redaction, so any struct that
//! derives `Debug` while holding a secret gets safe logging behavior for
//! free. Secrets are zeroized when dropped.
//!
//! # Example
//!
//! ```rust
//! use common::secret::{ExposeSecret, SecretString};
//!
//! #[derive(Debug)]
//! struct IssuedCredential {
//!     identity: String,
//!     token: SecretString,
//! }
//!
//! let credential = IssuedCredential {
//!     identity: "alice".to_string(),
//!     token: SecretString::from("T1==cGFydG5lcl9pZD0"),
//! };
//!
//! // The token is redacted in Debug output
//! assert!(!format!("{credential:?}").contains("T1=="));
//!
//! // Access requires an explicit call
//! let raw: &str = credential.token.expose_secret();
//! assert!(raw.starts_with("T1=="));
//! ```
//!
//! # Usage Guidelines
//!
//! Use `SecretString` for:
//! - The platform API secret
//! - Access credentials handed to clients
//! - PEM-encoded private keys read from disk
//!
//! Use `SecretBox<T>` for binary key material.

pub use secrecy::{ExposeSecret, SecretBox, SecretString};

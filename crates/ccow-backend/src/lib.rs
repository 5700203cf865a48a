//! # ccow-backend
//!
//! Client for the ComplianceCow compliance backend.
//!
//! The [`BackendClient`] trait is the seam every tool talks through; the
//! MCP layer never touches HTTP directly. [`HttpBackendClient`] is the
//! production implementation:
//!
//! - base URL from `CCOW_HOST` (default `http://cowapiservice:80`)
//! - `Authorization: Basic base64(id:secret)` when `CCOW_CLIENT_ID` and
//!   `CCOW_CLIENT_SECRET` are set, otherwise `CCOW_TOKEN` verbatim
//! - a per-request timeout (60 s by default) reported as
//!   [`BackendError::Timeout`]
//! - non-2xx responses reported as [`BackendError::Status`] with the
//!   backend's description

pub mod client;
pub mod endpoints;
pub mod error;
pub mod http;

pub use client::{BackendClient, HttpBackendClient};
pub use error::BackendError;

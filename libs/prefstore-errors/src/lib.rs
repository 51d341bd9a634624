//! Error envelope shared by every HTTP-facing prefstore crate.
//!
//! Every non-2xx response body has the same shape:
//! `{"error": "<message>", "code": <http status>}`.
#![cfg_attr(coverage_nightly, feature(coverage_attribute))]

pub mod envelope;
#[cfg(feature = "axum")]
pub mod response;

pub use envelope::{ApiError, ErrorBody};
#[cfg(feature = "axum")]
pub use response::{json_ok, no_content};

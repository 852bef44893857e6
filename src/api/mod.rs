//! HTTP API for the Proclusive workflow service
//!
//! Admin endpoints live under `/api/v1/admin` and require the admin role;
//! member endpoints under `/api/v1/member` act on the caller's own profile.

mod auth_helpers;
mod error;
pub mod handlers;
mod rest;
pub mod types;

pub use error::{ApiError, ErrorCode, ErrorDetails};
pub use rest::router;

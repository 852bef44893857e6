//! PostgreSQL implementations of the workflow repositories
//!
//! Queries are checked at runtime; enums are stored as their wire strings.

mod applications;
mod members;
mod referrals;

pub use applications::*;
pub use members::*;
pub use referrals::*;

use std::str::FromStr;

use super::{Result, WorkflowError};

/// Decode a text column into a domain enum
fn decode<T>(value: &str, column: &str) -> Result<T>
where
    T: FromStr<Err = String>,
{
    value
        .parse()
        .map_err(|e: String| WorkflowError::Storage(format!("{column}: {e}")))
}

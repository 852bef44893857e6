//! Infrastructure layer for the Proclusive workflow
//!
//! Contains trait definitions and implementations for:
//! - Member, application, badge and referral storage (PostgreSQL, in-memory)
//! - Audit logging (admin operations)
//! - Notification publishing (log-only, HTTP)
//! - Retry with backoff for outbound calls

mod audit;
mod error;
mod memory;
mod notification;
pub mod postgres;
pub mod retry;
mod traits;

pub use audit::{AuditAction, AuditLogBuilder, AuditLogEntry, PgAuditLog};
pub use error::*;
pub use memory::{InMemoryStore, RecordingPublisher};
pub use notification::{HttpNotifier, LogOnlyPublisher, Notification, NotifierConfig};
pub use postgres::{PgApplicationStore, PgMemberStore, PgReferralStore};
pub use retry::RetryConfig;
pub use traits::*;

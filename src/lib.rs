//! Proclusive Workflow Library
//!
//! Membership vetting and referral workflow for the Proclusive contractor
//! network: verification review, badge assignment, the referral pipeline,
//! and the best-effort audit/notification side effects around them.
//!
//! ## Modules
//!
//! - [`domain`] - Statuses, transition tables, badges and commission rules
//! - [`workflow`] - Engines driving applications, referrals and profiles
//! - [`infra`] - Repositories (PostgreSQL, in-memory), audit log, notifier
//! - [`auth`] - JWT authentication
//! - [`metrics`] - In-process counters and histograms
//! - [`telemetry`] - Logging setup
//! - [`api`] - REST API routes

pub mod api;
pub mod auth;
pub mod domain;
pub mod infra;
pub mod metrics;
pub mod migrations;
pub mod server;
pub mod telemetry;
pub mod workflow;

// Re-export commonly used types
pub use domain::{
    AdminId, Application, ApplicationId, ApplicationStatus, BadgeLevel, EntityType, PointKey,
    PointStatus, Profile, ProfileId, Referral, ReferralId, ReferralStatus,
};

pub use infra::{Result, WorkflowError};

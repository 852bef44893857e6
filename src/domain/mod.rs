//! Domain model for the Proclusive membership network
//!
//! The one canonical home for statuses, transition tables, badge priority
//! and commission rules. Storage and HTTP layers adapt these types.

mod badge;
pub mod commission;
mod profile;
mod referral;
mod types;
mod verification;

pub use badge::*;
pub use commission::{CommissionBreakdown, CommissionTerms};
pub use profile::*;
pub use referral::*;
pub use types::*;
pub use verification::*;

//! REST API handlers organized by domain.

pub mod applications;
pub mod audit;
pub mod health;
pub mod member;
pub mod profiles;
pub mod referrals;

pub use applications::*;
pub use audit::*;
pub use member::*;
pub use profiles::*;
pub use referrals::*;

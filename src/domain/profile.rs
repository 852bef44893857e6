//! Member profiles and portfolio items

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{BadgeLevel, ProfileId};

/// Minimum portfolio items a member needs before submitting an application
pub const MIN_PORTFOLIO_ITEMS: usize = 5;

/// A member profile
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Profile {
    pub id: ProfileId,
    pub full_name: String,
    pub email: String,
    pub phone: Option<String>,
    pub company_name: Option<String>,
    pub trade: Option<String>,
    pub address: Option<String>,
    pub is_verified: bool,
    pub badge_level: BadgeLevel,
    pub verification_completed_at: Option<DateTime<Utc>>,
    pub approved_at: Option<DateTime<Utc>>,
    pub is_paid: bool,
    pub paid_at: Option<DateTime<Utc>>,
    pub member_number: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Profile {
    /// Profile as created on first sign-up
    pub fn new(full_name: impl Into<String>, email: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: ProfileId::new(),
            full_name: full_name.into(),
            email: email.into(),
            phone: None,
            company_name: None,
            trade: None,
            address: None,
            is_verified: false,
            badge_level: BadgeLevel::None,
            verification_completed_at: None,
            approved_at: None,
            is_paid: false,
            paid_at: None,
            member_number: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Apply a partial admin edit, returning the names of fields that changed
    pub fn apply_update(&mut self, update: &ProfileUpdate) -> Vec<&'static str> {
        let mut changed = Vec::new();

        if set_required(&mut self.full_name, &update.full_name) {
            changed.push("full_name");
        }
        if set_required(&mut self.email, &update.email) {
            changed.push("email");
        }
        if set_optional(&mut self.phone, &update.phone) {
            changed.push("phone");
        }
        if set_optional(&mut self.company_name, &update.company_name) {
            changed.push("company_name");
        }
        if set_optional(&mut self.trade, &update.trade) {
            changed.push("trade");
        }
        if set_optional(&mut self.address, &update.address) {
            changed.push("address");
        }
        if set_optional(&mut self.member_number, &update.member_number) {
            changed.push("member_number");
        }

        if !changed.is_empty() {
            self.updated_at = Utc::now();
        }
        changed
    }
}

fn set_required(slot: &mut String, value: &Option<String>) -> bool {
    match value {
        Some(v) if *v != *slot => {
            *slot = v.clone();
            true
        }
        _ => false,
    }
}

fn set_optional(slot: &mut Option<String>, value: &Option<String>) -> bool {
    let Some(v) = value else {
        return false;
    };
    let next = Some(v.trim().to_string()).filter(|v| !v.is_empty());
    if *slot == next {
        return false;
    }
    *slot = next;
    true
}

/// Admin edit of profile identity fields. `None` leaves a field untouched;
/// an empty string clears an optional field.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProfileUpdate {
    pub full_name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub company_name: Option<String>,
    pub trade: Option<String>,
    pub address: Option<String>,
    pub member_number: Option<String>,
}

/// A past project shown on the member's portfolio
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PortfolioItem {
    pub id: uuid::Uuid,
    pub user_id: ProfileId,
    pub title: String,
    pub description: Option<String>,
    pub image_path: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_apply_update_reports_changed_fields() {
        let mut profile = Profile::new("Dana Ortiz", "dana@example.com");
        profile.phone = Some("555-0100".to_string());

        let changed = profile.apply_update(&ProfileUpdate {
            full_name: Some("Dana Ortiz".to_string()),
            phone: Some(String::new()),
            trade: Some("Electrical".to_string()),
            ..Default::default()
        });

        assert_eq!(changed, vec!["phone", "trade"]);
        assert_eq!(profile.phone, None);
        assert_eq!(profile.trade.as_deref(), Some("Electrical"));
    }

    #[test]
    fn test_apply_empty_update_changes_nothing() {
        let mut profile = Profile::new("Dana Ortiz", "dana@example.com");
        let before = profile.updated_at;
        assert!(profile.apply_update(&ProfileUpdate::default()).is_empty());
        assert_eq!(profile.updated_at, before);
    }
}

//! Referral lifecycle
//!
//! A referral moves strictly forward through
//! `SUBMITTED -> REVIEWED -> MATCHED -> ENGAGED -> COMPLETED`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use super::{AdminId, CommissionBreakdown, CommissionTerms, ProfileId, ReferralId};

/// Referral workflow stage
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ReferralStatus {
    Submitted,
    Reviewed,
    Matched,
    Engaged,
    Completed,
}

impl ReferralStatus {
    /// Stages in lifecycle order
    pub const FLOW: [ReferralStatus; 5] = [
        ReferralStatus::Submitted,
        ReferralStatus::Reviewed,
        ReferralStatus::Matched,
        ReferralStatus::Engaged,
        ReferralStatus::Completed,
    ];

    /// The only stage this one may advance to
    pub fn next(&self) -> Option<ReferralStatus> {
        match self {
            ReferralStatus::Submitted => Some(ReferralStatus::Reviewed),
            ReferralStatus::Reviewed => Some(ReferralStatus::Matched),
            ReferralStatus::Matched => Some(ReferralStatus::Engaged),
            ReferralStatus::Engaged => Some(ReferralStatus::Completed),
            ReferralStatus::Completed => None,
        }
    }

    pub fn can_transition_to(&self, to: ReferralStatus) -> bool {
        self.next() == Some(to)
    }

    pub fn is_terminal(&self) -> bool {
        self.next().is_none()
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ReferralStatus::Submitted => "SUBMITTED",
            ReferralStatus::Reviewed => "REVIEWED",
            ReferralStatus::Matched => "MATCHED",
            ReferralStatus::Engaged => "ENGAGED",
            ReferralStatus::Completed => "COMPLETED",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            ReferralStatus::Submitted => "Submitted",
            ReferralStatus::Reviewed => "Under Review",
            ReferralStatus::Matched => "Matched",
            ReferralStatus::Engaged => "Engaged",
            ReferralStatus::Completed => "Completed",
        }
    }

    /// Label of the admin action that moves a referral into this stage
    pub fn action_label(&self) -> &'static str {
        match self {
            ReferralStatus::Submitted => "Submit",
            ReferralStatus::Reviewed => "Mark Reviewed",
            ReferralStatus::Matched => "Match Member",
            ReferralStatus::Engaged => "Mark Engaged",
            ReferralStatus::Completed => "Mark Completed",
        }
    }
}

impl fmt::Display for ReferralStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ReferralStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ReferralStatus::FLOW
            .into_iter()
            .find(|status| status.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| format!("unknown referral status: {s}"))
    }
}

/// A B2B lead passed from one member to the network
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Referral {
    pub id: ReferralId,
    pub submitted_by: ProfileId,
    pub status: ReferralStatus,
    pub client_name: String,
    pub client_email: Option<String>,
    pub client_phone: Option<String>,
    pub project_type: Option<String>,
    pub project_description: String,
    pub location: Option<String>,
    /// Submitter's estimate, e.g. "$50,000 - $100,000"
    pub value_range: Option<String>,
    pub timeline: Option<String>,
    pub matched_to: Option<ProfileId>,
    pub reviewed_by: Option<AdminId>,
    pub reviewed_at: Option<DateTime<Utc>>,
    pub matched_at: Option<DateTime<Utc>>,
    pub engaged_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub final_value: Option<String>,
    pub commission_terms: CommissionTerms,
    pub admin_notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Referral {
    pub fn new(submitted_by: ProfileId, details: NewReferral) -> Self {
        let now = Utc::now();
        Self {
            id: ReferralId::new(),
            submitted_by,
            status: ReferralStatus::Submitted,
            client_name: details.client_name,
            client_email: details.client_email,
            client_phone: details.client_phone,
            project_type: details.project_type,
            project_description: details.project_description,
            location: details.location,
            value_range: details.value_range,
            timeline: details.timeline,
            matched_to: None,
            reviewed_by: None,
            reviewed_at: None,
            matched_at: None,
            engaged_at: None,
            completed_at: None,
            final_value: None,
            commission_terms: details.commission_terms.unwrap_or_default(),
            admin_notes: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Commission owed on this referral; only once it is completed and a
    /// project value (final, or the estimate) parses as an amount.
    pub fn commission_due(&self) -> Option<CommissionBreakdown> {
        if self.status != ReferralStatus::Completed {
            return None;
        }
        let value = self.final_value.as_deref().or(self.value_range.as_deref())?;
        let amount = super::commission::parse_currency(value).ok()?;
        Some(self.commission_terms.breakdown(amount))
    }
}

/// Member-supplied fields for a new referral
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NewReferral {
    pub client_name: String,
    #[serde(default)]
    pub client_email: Option<String>,
    #[serde(default)]
    pub client_phone: Option<String>,
    #[serde(default)]
    pub project_type: Option<String>,
    pub project_description: String,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub value_range: Option<String>,
    #[serde(default)]
    pub timeline: Option<String>,
    #[serde(default)]
    pub commission_terms: Option<CommissionTerms>,
}

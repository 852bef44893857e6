//! Membership badges and their priority order

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use super::{AdminId, ProfileId};

/// Badge tier granted to an approved member.
///
/// `Compliance`, `Capability`, `Reputation` and `Enterprise` are legacy tiers
/// still present on older profiles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BadgeLevel {
    #[default]
    None,
    Verified,
    Vetted,
    Elite,
    Compliance,
    Capability,
    Reputation,
    Enterprise,
}

impl BadgeLevel {
    pub const ALL: [BadgeLevel; 8] = [
        BadgeLevel::None,
        BadgeLevel::Verified,
        BadgeLevel::Vetted,
        BadgeLevel::Elite,
        BadgeLevel::Compliance,
        BadgeLevel::Capability,
        BadgeLevel::Reputation,
        BadgeLevel::Enterprise,
    ];

    /// Priority used to pick the displayed badge; higher wins.
    pub fn priority(&self) -> u8 {
        match self {
            BadgeLevel::Elite | BadgeLevel::Enterprise => 3,
            BadgeLevel::Vetted | BadgeLevel::Capability | BadgeLevel::Reputation => 2,
            BadgeLevel::Verified | BadgeLevel::Compliance => 1,
            BadgeLevel::None => 0,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            BadgeLevel::None => "none",
            BadgeLevel::Verified => "verified",
            BadgeLevel::Vetted => "vetted",
            BadgeLevel::Elite => "elite",
            BadgeLevel::Compliance => "compliance",
            BadgeLevel::Capability => "capability",
            BadgeLevel::Reputation => "reputation",
            BadgeLevel::Enterprise => "enterprise",
        }
    }

    /// Human readable label shown on member cards and in emails
    pub fn label(&self) -> &'static str {
        match self {
            BadgeLevel::None => "Member",
            BadgeLevel::Verified => "Verified",
            BadgeLevel::Vetted => "Vetted",
            BadgeLevel::Elite => "Elite",
            BadgeLevel::Compliance => "Compliance Verified",
            BadgeLevel::Capability => "Capability Verified",
            BadgeLevel::Reputation => "Reputation Verified",
            BadgeLevel::Enterprise => "Enterprise",
        }
    }

    pub fn is_legacy(&self) -> bool {
        matches!(
            self,
            BadgeLevel::Compliance
                | BadgeLevel::Capability
                | BadgeLevel::Reputation
                | BadgeLevel::Enterprise
        )
    }
}

impl fmt::Display for BadgeLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BadgeLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        BadgeLevel::ALL
            .into_iter()
            .find(|b| b.as_str() == s)
            .ok_or_else(|| format!("unknown badge level: {s}"))
    }
}

/// Resolve the badge shown on a profile from the badges an admin selected.
///
/// Returns the highest-priority badge; on equal priority the one selected
/// first wins. An empty selection yields [`BadgeLevel::None`].
pub fn highest_badge(selected: &[BadgeLevel]) -> BadgeLevel {
    selected
        .iter()
        .copied()
        .fold(BadgeLevel::None, |best, candidate| {
            if candidate.priority() > best.priority() {
                candidate
            } else {
                best
            }
        })
}

/// One granted badge; unique per (user_id, badge_level)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserBadge {
    pub user_id: ProfileId,
    pub badge_level: BadgeLevel,
    pub granted_by: AdminId,
    pub granted_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_highest_badge_examples() {
        assert_eq!(
            highest_badge(&[BadgeLevel::Verified, BadgeLevel::Elite]),
            BadgeLevel::Elite
        );
        assert_eq!(highest_badge(&[]), BadgeLevel::None);
        assert_eq!(
            highest_badge(&[BadgeLevel::Vetted, BadgeLevel::Enterprise]),
            BadgeLevel::Enterprise
        );
    }

    #[test]
    fn test_highest_badge_tie_keeps_first_selected() {
        assert_eq!(
            highest_badge(&[BadgeLevel::Elite, BadgeLevel::Enterprise]),
            BadgeLevel::Elite
        );
        assert_eq!(
            highest_badge(&[BadgeLevel::Enterprise, BadgeLevel::Elite]),
            BadgeLevel::Enterprise
        );
        assert_eq!(
            highest_badge(&[BadgeLevel::Reputation, BadgeLevel::Vetted, BadgeLevel::Capability]),
            BadgeLevel::Reputation
        );
    }

    #[test]
    fn test_priority_table() {
        assert_eq!(BadgeLevel::None.priority(), 0);
        assert_eq!(BadgeLevel::Compliance.priority(), BadgeLevel::Verified.priority());
        assert_eq!(BadgeLevel::Capability.priority(), BadgeLevel::Vetted.priority());
        assert_eq!(BadgeLevel::Enterprise.priority(), BadgeLevel::Elite.priority());
    }

    #[test]
    fn test_badge_level_parse() {
        for badge in BadgeLevel::ALL {
            assert_eq!(badge.as_str().parse::<BadgeLevel>().unwrap(), badge);
        }
        assert!("gold".parse::<BadgeLevel>().is_err());
        assert!(BadgeLevel::Enterprise.is_legacy());
        assert!(!BadgeLevel::Elite.is_legacy());
    }
}

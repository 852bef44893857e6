//! Identifier types shared by the verification and referral workflows

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Member profile identifier (the identity provider's user id)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProfileId(pub uuid::Uuid);

impl ProfileId {
    pub fn new() -> Self {
        Self(uuid::Uuid::new_v4())
    }

    pub fn from_uuid(id: uuid::Uuid) -> Self {
        Self(id)
    }
}

impl Default for ProfileId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ProfileId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for ProfileId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        uuid::Uuid::parse_str(s.trim()).map(Self)
    }
}

/// Membership application identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ApplicationId(pub uuid::Uuid);

impl ApplicationId {
    pub fn new() -> Self {
        Self(uuid::Uuid::new_v4())
    }

    pub fn from_uuid(id: uuid::Uuid) -> Self {
        Self(id)
    }
}

impl Default for ApplicationId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ApplicationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Referral identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ReferralId(pub uuid::Uuid);

impl ReferralId {
    pub fn new() -> Self {
        Self(uuid::Uuid::new_v4())
    }

    pub fn from_uuid(id: uuid::Uuid) -> Self {
        Self(id)
    }
}

impl Default for ReferralId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ReferralId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Identifier of the admin performing a workflow action.
///
/// Admins are profiles with an elevated role, so this wraps the same user id space.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AdminId(pub uuid::Uuid);

impl AdminId {
    pub fn from_uuid(id: uuid::Uuid) -> Self {
        Self(id)
    }

    /// Admin id used when auth is disabled for local development
    pub fn system() -> Self {
        Self(uuid::Uuid::nil())
    }
}

impl fmt::Display for AdminId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Entity kinds an audit entry can refer to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityType {
    Application,
    Profile,
    Referral,
}

impl EntityType {
    pub fn as_str(&self) -> &'static str {
        match self {
            EntityType::Application => "application",
            EntityType::Profile => "profile",
            EntityType::Referral => "referral",
        }
    }
}

impl fmt::Display for EntityType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EntityType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "application" => Ok(EntityType::Application),
            "profile" => Ok(EntityType::Profile),
            "referral" => Ok(EntityType::Referral),
            other => Err(format!("unknown entity type: {other}")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_profile_id_parse() {
        let id = ProfileId::new();
        let parsed: ProfileId = format!("  {id} ").parse().unwrap();
        assert_eq!(parsed, id);
        assert!("m1".parse::<ProfileId>().is_err());
    }

    #[test]
    fn test_entity_type_wire_names() {
        for entity in [EntityType::Application, EntityType::Profile, EntityType::Referral] {
            assert_eq!(entity.as_str().parse::<EntityType>().unwrap(), entity);
            assert_eq!(
                serde_json::to_value(entity).unwrap(),
                serde_json::json!(entity.as_str())
            );
        }
        assert!("order".parse::<EntityType>().is_err());
    }
}

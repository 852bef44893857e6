//! Verification checklist types: points, application status, documents
//!
//! Each application carries eight independently reviewed points. The six
//! Tier-1 points gate approval; point 7 covers the member's portfolio and
//! point 8 their professional certifications.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use super::{AdminId, ApplicationId, ProfileId};

/// Recognized verification point keys (column names on `applications`)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PointKey {
    #[serde(rename = "point_1_business_registration")]
    BusinessRegistration,
    #[serde(rename = "point_2_professional_license")]
    ProfessionalLicense,
    #[serde(rename = "point_3_liability_insurance")]
    LiabilityInsurance,
    #[serde(rename = "point_4_workers_comp")]
    WorkersComp,
    #[serde(rename = "point_5_contact_verification")]
    ContactVerification,
    #[serde(rename = "point_6_tax_compliance")]
    TaxCompliance,
    #[serde(rename = "point_7_references")]
    References,
    #[serde(rename = "point_8_certifications")]
    Certifications,
}

impl PointKey {
    pub const ALL: [PointKey; 8] = [
        PointKey::BusinessRegistration,
        PointKey::ProfessionalLicense,
        PointKey::LiabilityInsurance,
        PointKey::WorkersComp,
        PointKey::ContactVerification,
        PointKey::TaxCompliance,
        PointKey::References,
        PointKey::Certifications,
    ];

    pub const TIER_ONE: [PointKey; 6] = [
        PointKey::BusinessRegistration,
        PointKey::ProfessionalLicense,
        PointKey::LiabilityInsurance,
        PointKey::WorkersComp,
        PointKey::ContactVerification,
        PointKey::TaxCompliance,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            PointKey::BusinessRegistration => "point_1_business_registration",
            PointKey::ProfessionalLicense => "point_2_professional_license",
            PointKey::LiabilityInsurance => "point_3_liability_insurance",
            PointKey::WorkersComp => "point_4_workers_comp",
            PointKey::ContactVerification => "point_5_contact_verification",
            PointKey::TaxCompliance => "point_6_tax_compliance",
            PointKey::References => "point_7_references",
            PointKey::Certifications => "point_8_certifications",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            PointKey::BusinessRegistration => "Business Registration",
            PointKey::ProfessionalLicense => "Professional License",
            PointKey::LiabilityInsurance => "General Liability Insurance",
            PointKey::WorkersComp => "Workers' Compensation",
            PointKey::ContactVerification => "Contact Verification",
            PointKey::TaxCompliance => "Tax Compliance (W-9)",
            PointKey::References => "Project Portfolio & References",
            PointKey::Certifications => "Professional Certifications",
        }
    }

    pub fn is_tier_one(&self) -> bool {
        PointKey::TIER_ONE.contains(self)
    }

    /// Document type that evidences this point, if any
    pub fn document_type(&self) -> Option<DocumentType> {
        match self {
            PointKey::BusinessRegistration => Some(DocumentType::BusinessRegistration),
            PointKey::ProfessionalLicense => Some(DocumentType::ProfessionalLicense),
            PointKey::LiabilityInsurance => Some(DocumentType::LiabilityInsurance),
            PointKey::WorkersComp => Some(DocumentType::WorkersComp),
            PointKey::TaxCompliance => Some(DocumentType::W9),
            PointKey::Certifications => Some(DocumentType::Certification),
            PointKey::ContactVerification | PointKey::References => None,
        }
    }
}

impl fmt::Display for PointKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PointKey {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        PointKey::ALL
            .into_iter()
            .find(|p| p.as_str() == s)
            .ok_or_else(|| format!("unknown verification point: {s}"))
    }
}

/// Review state of a single verification point
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PointStatus {
    #[default]
    NotSubmitted,
    Pending,
    Verified,
    Rejected,
}

impl PointStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PointStatus::NotSubmitted => "not_submitted",
            PointStatus::Pending => "pending",
            PointStatus::Verified => "verified",
            PointStatus::Rejected => "rejected",
        }
    }

    /// Whether an admin may record an outcome on a point in this state
    pub fn is_reviewable(&self) -> bool {
        matches!(self, PointStatus::NotSubmitted | PointStatus::Pending)
    }
}

impl fmt::Display for PointStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PointStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "not_submitted" => Ok(PointStatus::NotSubmitted),
            "pending" => Ok(PointStatus::Pending),
            "verified" => Ok(PointStatus::Verified),
            "rejected" => Ok(PointStatus::Rejected),
            other => Err(format!("unknown point status: {other}")),
        }
    }
}

/// Admin review outcome for a point
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PointOutcome {
    Verified,
    Rejected,
}

impl From<PointOutcome> for PointStatus {
    fn from(outcome: PointOutcome) -> Self {
        match outcome {
            PointOutcome::Verified => PointStatus::Verified,
            PointOutcome::Rejected => PointStatus::Rejected,
        }
    }
}

/// Aggregate application status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ApplicationStatus {
    #[default]
    Pending,
    UnderReview,
    Approved,
    Rejected,
}

impl ApplicationStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ApplicationStatus::Pending => "pending",
            ApplicationStatus::UnderReview => "under_review",
            ApplicationStatus::Approved => "approved",
            ApplicationStatus::Rejected => "rejected",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            ApplicationStatus::Pending => "Pending",
            ApplicationStatus::UnderReview => "Under Review",
            ApplicationStatus::Approved => "Approved",
            ApplicationStatus::Rejected => "Rejected",
        }
    }

    /// Transitions an admin may perform from the review dashboard.
    ///
    /// `Rejected -> Pending` is not listed: only the applicant re-opens a
    /// rejected application by re-submitting it.
    pub fn can_admin_transition(&self, to: ApplicationStatus) -> bool {
        use ApplicationStatus::*;
        matches!(
            (self, to),
            (Pending, UnderReview)
                | (Pending, Approved)
                | (Pending, Rejected)
                | (UnderReview, Approved)
                | (UnderReview, Rejected)
        )
    }

    /// Whether the applicant may (re-)submit from this state
    pub fn can_resubmit(&self) -> bool {
        matches!(self, ApplicationStatus::Rejected)
    }
}

impl fmt::Display for ApplicationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ApplicationStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(ApplicationStatus::Pending),
            "under_review" => Ok(ApplicationStatus::UnderReview),
            "approved" => Ok(ApplicationStatus::Approved),
            "rejected" => Ok(ApplicationStatus::Rejected),
            other => Err(format!("unknown application status: {other}")),
        }
    }
}

/// The eight point statuses of one application
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct VerificationPoints {
    #[serde(rename = "point_1_business_registration")]
    pub business_registration: PointStatus,
    #[serde(rename = "point_2_professional_license")]
    pub professional_license: PointStatus,
    #[serde(rename = "point_3_liability_insurance")]
    pub liability_insurance: PointStatus,
    #[serde(rename = "point_4_workers_comp")]
    pub workers_comp: PointStatus,
    #[serde(rename = "point_5_contact_verification")]
    pub contact_verification: PointStatus,
    #[serde(rename = "point_6_tax_compliance")]
    pub tax_compliance: PointStatus,
    #[serde(rename = "point_7_references")]
    pub references: PointStatus,
    #[serde(rename = "point_8_certifications")]
    pub certifications: PointStatus,
}

impl VerificationPoints {
    pub fn get(&self, key: PointKey) -> PointStatus {
        match key {
            PointKey::BusinessRegistration => self.business_registration,
            PointKey::ProfessionalLicense => self.professional_license,
            PointKey::LiabilityInsurance => self.liability_insurance,
            PointKey::WorkersComp => self.workers_comp,
            PointKey::ContactVerification => self.contact_verification,
            PointKey::TaxCompliance => self.tax_compliance,
            PointKey::References => self.references,
            PointKey::Certifications => self.certifications,
        }
    }

    pub fn set(&mut self, key: PointKey, status: PointStatus) {
        let slot = match key {
            PointKey::BusinessRegistration => &mut self.business_registration,
            PointKey::ProfessionalLicense => &mut self.professional_license,
            PointKey::LiabilityInsurance => &mut self.liability_insurance,
            PointKey::WorkersComp => &mut self.workers_comp,
            PointKey::ContactVerification => &mut self.contact_verification,
            PointKey::TaxCompliance => &mut self.tax_compliance,
            PointKey::References => &mut self.references,
            PointKey::Certifications => &mut self.certifications,
        };
        *slot = status;
    }

    /// Status of every point keyed by its wire name, in checklist order
    pub fn summary(&self) -> BTreeMap<PointKey, PointStatus> {
        PointKey::ALL.into_iter().map(|k| (k, self.get(k))).collect()
    }
}

/// A member's application for verified membership
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Application {
    pub id: ApplicationId,
    pub user_id: ProfileId,
    pub status: ApplicationStatus,
    #[serde(flatten)]
    pub points: VerificationPoints,
    /// Sole proprietors without employees are exempt from workers' comp
    pub workers_comp_exempt_sole_prop: bool,
    pub admin_notes: Option<String>,
    pub reviewed_by: Option<AdminId>,
    pub reviewed_at: Option<DateTime<Utc>>,
    pub submitted_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Application {
    /// A fresh pending application with every point not yet submitted
    pub fn new(user_id: ProfileId, workers_comp_exempt_sole_prop: bool) -> Self {
        let now = Utc::now();
        Self {
            id: ApplicationId::new(),
            user_id,
            status: ApplicationStatus::Pending,
            points: VerificationPoints::default(),
            workers_comp_exempt_sole_prop,
            admin_notes: None,
            reviewed_by: None,
            reviewed_at: None,
            submitted_at: now,
            created_at: now,
            updated_at: now,
        }
    }

    /// Points that must not be rejected for the application to be approved
    pub fn required_points(&self) -> Vec<PointKey> {
        PointKey::TIER_ONE
            .into_iter()
            .filter(|p| !(self.workers_comp_exempt_sole_prop && *p == PointKey::WorkersComp))
            .collect()
    }

    pub fn rejected_required_points(&self) -> Vec<PointKey> {
        self.required_points()
            .into_iter()
            .filter(|p| self.points.get(*p) == PointStatus::Rejected)
            .collect()
    }

    /// Number of required points already verified
    pub fn verified_required_count(&self) -> usize {
        self.required_points()
            .into_iter()
            .filter(|p| self.points.get(*p) == PointStatus::Verified)
            .count()
    }
}

/// Kind of compliance document uploaded with an application
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DocumentType {
    BusinessRegistration,
    ProfessionalLicense,
    LiabilityInsurance,
    WorkersComp,
    W9,
    Certification,
}

impl DocumentType {
    pub fn as_str(&self) -> &'static str {
        match self {
            DocumentType::BusinessRegistration => "business_registration",
            DocumentType::ProfessionalLicense => "professional_license",
            DocumentType::LiabilityInsurance => "liability_insurance",
            DocumentType::WorkersComp => "workers_comp",
            DocumentType::W9 => "w9",
            DocumentType::Certification => "certification",
        }
    }

    /// The verification point this document evidences
    pub fn point(&self) -> PointKey {
        match self {
            DocumentType::BusinessRegistration => PointKey::BusinessRegistration,
            DocumentType::ProfessionalLicense => PointKey::ProfessionalLicense,
            DocumentType::LiabilityInsurance => PointKey::LiabilityInsurance,
            DocumentType::WorkersComp => PointKey::WorkersComp,
            DocumentType::W9 => PointKey::TaxCompliance,
            DocumentType::Certification => PointKey::Certifications,
        }
    }
}

impl fmt::Display for DocumentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DocumentType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "business_registration" => Ok(DocumentType::BusinessRegistration),
            "professional_license" => Ok(DocumentType::ProfessionalLicense),
            "liability_insurance" => Ok(DocumentType::LiabilityInsurance),
            "workers_comp" => Ok(DocumentType::WorkersComp),
            "w9" => Ok(DocumentType::W9),
            "certification" => Ok(DocumentType::Certification),
            other => Err(format!("unknown document type: {other}")),
        }
    }
}

/// Uploaded document metadata. Rows are never mutated, only superseded.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    pub id: uuid::Uuid,
    pub application_id: ApplicationId,
    pub document_type: DocumentType,
    /// Opaque object storage key
    pub file_path: String,
    pub file_name: String,
    pub file_size: i64,
    pub mime_type: Option<String>,
    pub uploaded_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_point_key_round_trip_names() {
        for key in PointKey::ALL {
            assert_eq!(key.as_str().parse::<PointKey>().unwrap(), key);
            assert_eq!(serde_json::to_value(key).unwrap(), serde_json::json!(key.as_str()));
        }
        assert_eq!(PointKey::TIER_ONE.len(), 6);
        assert!(!PointKey::References.is_tier_one());
        assert!("point_9_vibes".parse::<PointKey>().is_err());
    }

    #[test]
    fn test_document_types_map_back_to_their_point() {
        for key in PointKey::ALL {
            if let Some(doc) = key.document_type() {
                assert_eq!(doc.point(), key);
            }
        }
    }

    #[test]
    fn test_admin_transition_table() {
        use ApplicationStatus::*;
        assert!(Pending.can_admin_transition(UnderReview));
        assert!(UnderReview.can_admin_transition(Approved));
        assert!(UnderReview.can_admin_transition(Rejected));
        assert!(!Approved.can_admin_transition(Rejected));
        assert!(!Approved.can_admin_transition(Pending));
        assert!(!Rejected.can_admin_transition(Pending));
        assert!(!UnderReview.can_admin_transition(UnderReview));
        assert!(Rejected.can_resubmit());
        assert!(!Pending.can_resubmit());
    }

    #[test]
    fn test_workers_comp_exemption_drops_requirement() {
        let mut app = Application::new(ProfileId::new(), true);
        app.points.set(PointKey::WorkersComp, PointStatus::Rejected);
        assert_eq!(app.required_points().len(), 5);
        assert!(app.rejected_required_points().is_empty());

        app.workers_comp_exempt_sole_prop = false;
        assert_eq!(app.rejected_required_points(), vec![PointKey::WorkersComp]);
    }

    #[test]
    fn test_rejected_optional_point_does_not_block() {
        let mut app = Application::new(ProfileId::new(), false);
        app.points.set(PointKey::Certifications, PointStatus::Rejected);
        assert!(app.rejected_required_points().is_empty());
    }

    #[test]
    fn test_points_serialize_with_column_names() {
        let app = Application::new(ProfileId::new(), false);
        let json = serde_json::to_value(&app).unwrap();
        assert_eq!(json["point_4_workers_comp"], "not_submitted");
        assert_eq!(json["status"], "pending");
    }
}

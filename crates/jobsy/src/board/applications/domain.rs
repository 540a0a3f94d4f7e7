use std::collections::BTreeSet;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::board::accounts::{is_valid_email, IdentityId};
use crate::board::error::ValidationError;
use crate::board::listings::{JobListing, ListingId};
use crate::board::storage::StoredRef;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ApplicationId(pub u64);

impl fmt::Display for ApplicationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SavedJobId(pub u64);

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RejectionReasonId(pub u64);

impl fmt::Display for RejectionReasonId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Who submitted an application.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Applicant {
    Account { identity: IdentityId },
    Guest { name: String, email: String },
}

impl Applicant {
    pub fn identity(&self) -> Option<IdentityId> {
        match self {
            Applicant::Account { identity } => Some(*identity),
            Applicant::Guest { .. } => None,
        }
    }
}

/// Raw applicant fields as received; exactly one side must be filled in.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct ApplicantInput {
    pub identity: Option<IdentityId>,
    pub guest_name: Option<String>,
    pub guest_email: Option<String>,
}

impl ApplicantInput {
    pub fn account(identity: IdentityId) -> Self {
        Self {
            identity: Some(identity),
            ..Self::default()
        }
    }

    pub fn guest(name: impl Into<String>, email: impl Into<String>) -> Self {
        Self {
            identity: None,
            guest_name: Some(name.into()),
            guest_email: Some(email.into()),
        }
    }

    pub fn resolve(self) -> Result<Applicant, ValidationError> {
        let name = non_blank(self.guest_name);
        let email = non_blank(self.guest_email);
        let has_guest = name.is_some() || email.is_some();

        match (self.identity, has_guest) {
            (Some(_), true) => Err(ValidationError::ApplicantConflict),
            (None, false) => Err(ValidationError::MissingApplicant),
            (Some(identity), false) => Ok(Applicant::Account { identity }),
            (None, true) => {
                let (Some(name), Some(email)) = (name, email) else {
                    return Err(ValidationError::IncompleteGuest);
                };
                if !is_valid_email(&email) {
                    return Err(ValidationError::InvalidEmail(email));
                }
                Ok(Applicant::Guest { name, email })
            }
        }
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

/// Review state set by the employer.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ApplicationStatus {
    #[default]
    InReview,
    Interview,
    Reserve,
}

impl ApplicationStatus {
    pub const fn label(self) -> &'static str {
        match self {
            ApplicationStatus::InReview => "in_review",
            ApplicationStatus::Interview => "interview",
            ApplicationStatus::Reserve => "reserve",
        }
    }
}

/// Application row. Never deleted; `listing` becomes `None` when the listing
/// row is hard-deleted and the snapshot fields take over.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobApplication {
    pub id: ApplicationId,
    pub listing: Option<ListingId>,
    pub job_title: String,
    pub job_company: String,
    pub applicant: Applicant,
    pub cover_letter: String,
    pub resume: StoredRef,
    pub status: ApplicationStatus,
    pub is_read: bool,
    pub rejection_reasons: BTreeSet<RejectionReasonId>,
    pub feedback: String,
    pub applied_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl JobApplication {
    pub fn is_rejected(&self) -> bool {
        !self.rejection_reasons.is_empty()
    }

    /// Title and company for display: the listing's current values while its
    /// row exists, the creation-time snapshot otherwise.
    pub fn display_job<'a>(&'a self, listing: Option<&'a JobListing>) -> (&'a str, &'a str) {
        match listing {
            Some(listing) if Some(listing.id) == self.listing => {
                (listing.title.as_str(), listing.company.as_str())
            }
            _ => (self.job_title.as_str(), self.job_company.as_str()),
        }
    }
}

/// Input for creating an application.
#[derive(Debug, Clone)]
pub struct NewApplication {
    pub listing: Option<ListingId>,
    /// Required only when `listing` is `None`.
    pub job_title: Option<String>,
    pub job_company: Option<String>,
    pub applicant: ApplicantInput,
    pub cover_letter: String,
    pub resume: StoredRef,
}

/// Employer-side changes to an application. `None` leaves a field untouched.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ReviewUpdate {
    pub status: Option<ApplicationStatus>,
    pub is_read: Option<bool>,
    pub rejection_reasons: Option<BTreeSet<RejectionReasonId>>,
    pub feedback: Option<String>,
}

/// Application with resolved title and company for listing screens.
#[derive(Debug, Clone, Serialize)]
pub struct ApplicationView {
    pub id: ApplicationId,
    pub listing: Option<ListingId>,
    pub job_title: String,
    pub job_company: String,
    pub applicant: Applicant,
    pub status: &'static str,
    pub is_read: bool,
    pub rejected: bool,
    pub rejection_reasons: Vec<String>,
    pub feedback: String,
    pub applied_at: DateTime<Utc>,
}

/// Time-limited link to an application's resume.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResumeLink {
    pub url: String,
    pub expires_in: i64,
}

/// Bookmark of a listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SavedJob {
    pub id: SavedJobId,
    pub user: IdentityId,
    pub listing: Option<ListingId>,
    pub job_title: String,
    pub job_company: String,
    pub saved_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SavedJobView {
    pub listing: Option<ListingId>,
    pub job_title: String,
    pub job_company: String,
    pub live: bool,
    pub saved_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RejectionReason {
    pub id: RejectionReasonId,
    pub name: String,
}

/// Reasons seeded into a fresh board.
pub const STANDARD_REJECTION_REASONS: [&str; 13] = [
    "Insufficient experience",
    "Missing skills",
    "Education mismatch",
    "Irrelevant work history",
    "Location",
    "Missing certifications or licenses",
    "Achievements do not match requirements",
    "CV format or structure issues",
    "Insufficient information",
    "Excessive information",
    "Career goals mismatch",
    "Insufficient language skills",
    "Unrealistic salary expectations",
];

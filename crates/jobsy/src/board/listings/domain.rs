use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::board::accounts::EmployerId;
use crate::board::error::ValidationError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ListingId(pub u64);

impl fmt::Display for ListingId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Moderation state of a listing.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ListingStatus {
    #[default]
    PendingReview,
    Approved,
    Rejected,
}

impl ListingStatus {
    pub const fn label(self) -> &'static str {
        match self {
            ListingStatus::PendingReview => "pending_review",
            ListingStatus::Approved => "approved",
            ListingStatus::Rejected => "rejected",
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PremiumTier {
    #[default]
    Standard,
    Premium,
    PremiumPlus,
}

/// Fields an employer supplies when posting or editing a listing.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ListingDraft {
    pub title: String,
    pub description: String,
    pub salary_min: Option<u32>,
    pub salary_max: Option<u32>,
    pub salary_type: String,
    pub category: String,
    pub location: String,
    pub interests: String,
    pub fields: String,
    pub experience: String,
    pub job_preferences: String,
    pub premium_tier: PremiumTier,
}

impl ListingDraft {
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.title.trim().is_empty() {
            return Err(ValidationError::Required("title"));
        }
        if self.description.trim().is_empty() {
            return Err(ValidationError::Required("description"));
        }
        if let (Some(min), Some(max)) = (self.salary_min, self.salary_max) {
            if min > max {
                return Err(ValidationError::SalaryRange { min, max });
            }
        }
        Ok(())
    }
}

/// A job posting owned by an employer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobListing {
    pub id: ListingId,
    pub employer: EmployerId,
    pub title: String,
    pub company: String,
    pub description: String,
    pub salary_min: Option<u32>,
    pub salary_max: Option<u32>,
    pub salary_type: String,
    pub category: String,
    pub location: String,
    pub interests: String,
    pub fields: String,
    pub experience: String,
    pub job_preferences: String,
    pub status: ListingStatus,
    pub admin_feedback: String,
    pub premium_tier: PremiumTier,
    pub posted_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub expires_at: Option<DateTime<Utc>>,
    pub deleted_at: Option<DateTime<Utc>>,
}

impl JobListing {
    /// New listing awaiting moderation.
    pub fn submitted(
        id: ListingId,
        employer: EmployerId,
        company: String,
        draft: ListingDraft,
        now: DateTime<Utc>,
    ) -> Self {
        let mut listing = Self {
            id,
            employer,
            title: String::new(),
            company,
            description: String::new(),
            salary_min: None,
            salary_max: None,
            salary_type: String::new(),
            category: String::new(),
            location: String::new(),
            interests: String::new(),
            fields: String::new(),
            experience: String::new(),
            job_preferences: String::new(),
            status: ListingStatus::PendingReview,
            admin_feedback: String::new(),
            premium_tier: PremiumTier::Standard,
            posted_at: now,
            updated_at: now,
            expires_at: None,
            deleted_at: None,
        };
        listing.apply_draft(draft);
        listing
    }

    pub(crate) fn apply_draft(&mut self, draft: ListingDraft) {
        let ListingDraft {
            title,
            description,
            salary_min,
            salary_max,
            salary_type,
            category,
            location,
            interests,
            fields,
            experience,
            job_preferences,
            premium_tier,
        } = draft;

        self.title = title.trim().to_string();
        self.description = description;
        self.salary_min = salary_min;
        self.salary_max = salary_max;
        self.salary_type = salary_type;
        self.category = category.trim().to_string();
        self.location = location.trim().to_string();
        self.interests = interests;
        self.fields = fields;
        self.experience = experience.trim().to_string();
        self.job_preferences = job_preferences;
        self.premium_tier = premium_tier;
    }

    pub fn is_deleted(&self) -> bool {
        self.deleted_at.is_some()
    }

    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.is_some_and(|expires_at| expires_at <= now)
    }

    /// Visible to the public: approved, not soft-deleted, not expired.
    pub fn is_live(&self, now: DateTime<Utc>) -> bool {
        self.status == ListingStatus::Approved && !self.is_deleted() && !self.is_expired(now)
    }

    /// Preference tags, split on commas.
    pub fn preference_tags(&self) -> impl Iterator<Item = &str> {
        self.job_preferences
            .split(',')
            .map(str::trim)
            .filter(|tag| !tag.is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 3, 1, 9, 0, 0).single().expect("valid time")
    }

    fn listing() -> JobListing {
        JobListing::submitted(
            ListingId(1),
            EmployerId(1),
            "Acme".to_string(),
            ListingDraft {
                title: " Backend Engineer ".to_string(),
                description: "Build APIs".to_string(),
                job_preferences: "remote, full-time,".to_string(),
                ..ListingDraft::default()
            },
            now(),
        )
    }

    #[test]
    fn submitted_listing_is_pending_and_trimmed() {
        let listing = listing();
        assert_eq!(listing.status, ListingStatus::PendingReview);
        assert_eq!(listing.title, "Backend Engineer");
        assert!(listing.expires_at.is_none());
        assert!(!listing.is_live(now()));
    }

    #[test]
    fn liveness_requires_approval_and_future_expiry() {
        let mut listing = listing();
        listing.status = ListingStatus::Approved;
        assert!(listing.is_live(now()), "no expiry means live");

        listing.expires_at = Some(now() + Duration::days(1));
        assert!(listing.is_live(now()));

        listing.expires_at = Some(now());
        assert!(!listing.is_live(now()), "expiry instant is exclusive");

        listing.expires_at = Some(now() - Duration::seconds(1));
        assert!(!listing.is_live(now()));

        listing.expires_at = None;
        listing.deleted_at = Some(now());
        assert!(!listing.is_live(now()));
    }

    #[test]
    fn draft_validation_checks_required_fields_and_salary_range() {
        let mut draft = ListingDraft {
            title: "Designer".to_string(),
            description: "Design things".to_string(),
            ..ListingDraft::default()
        };
        assert!(draft.validate().is_ok());

        draft.salary_min = Some(3000);
        draft.salary_max = Some(2000);
        assert_eq!(
            draft.validate(),
            Err(ValidationError::SalaryRange {
                min: 3000,
                max: 2000
            })
        );

        draft.title = "   ".to_string();
        assert_eq!(draft.validate(), Err(ValidationError::Required("title")));
    }

    #[test]
    fn preference_tags_skip_blanks() {
        let listing = listing();
        let tags: Vec<_> = listing.preference_tags().collect();
        assert_eq!(tags, vec!["remote", "full-time"]);
    }
}

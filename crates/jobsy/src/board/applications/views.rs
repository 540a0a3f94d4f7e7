//! Read models resolving the denormalized title and company.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};

use super::domain::{ApplicationView, JobApplication, SavedJob, SavedJobView};
use crate::board::listings::JobListing;
use crate::board::repository::{BoardTransaction, RepositoryError, RowScope};

/// The listing row still referenced by `listing`, soft-deleted or not.
fn referenced_listing(
    tx: &dyn BoardTransaction,
    listing: Option<crate::board::listings::ListingId>,
) -> Result<Option<JobListing>, RepositoryError> {
    match listing {
        Some(id) => tx.listing(id, RowScope::IncludeDeleted),
        None => Ok(None),
    }
}

pub(crate) fn application_views(
    tx: &dyn BoardTransaction,
    applications: Vec<JobApplication>,
) -> Result<Vec<ApplicationView>, RepositoryError> {
    let reasons: BTreeMap<_, _> = tx
        .rejection_reasons()?
        .into_iter()
        .map(|reason| (reason.id, reason.name))
        .collect();

    applications
        .into_iter()
        .map(|application| {
            let listing = referenced_listing(tx, application.listing)?;
            let (title, company) = application.display_job(listing.as_ref());
            Ok(ApplicationView {
                id: application.id,
                listing: application.listing,
                job_title: title.to_string(),
                job_company: company.to_string(),
                applicant: application.applicant.clone(),
                status: application.status.label(),
                is_read: application.is_read,
                rejected: application.is_rejected(),
                rejection_reasons: application
                    .rejection_reasons
                    .iter()
                    .filter_map(|id| reasons.get(id).cloned())
                    .collect(),
                feedback: application.feedback.clone(),
                applied_at: application.applied_at,
            })
        })
        .collect()
}

pub(crate) fn saved_job_views(
    tx: &dyn BoardTransaction,
    saved: Vec<SavedJob>,
    now: DateTime<Utc>,
) -> Result<Vec<SavedJobView>, RepositoryError> {
    saved
        .into_iter()
        .map(|saved| {
            let view = match referenced_listing(tx, saved.listing)? {
                Some(listing) => SavedJobView {
                    listing: saved.listing,
                    live: listing.is_live(now),
                    job_title: listing.title,
                    job_company: listing.company,
                    saved_at: saved.saved_at,
                },
                None => SavedJobView {
                    listing: saved.listing,
                    live: false,
                    job_title: saved.job_title,
                    job_company: saved.job_company,
                    saved_at: saved.saved_at,
                },
            };
            Ok(view)
        })
        .collect()
}

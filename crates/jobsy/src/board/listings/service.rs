use std::collections::BTreeSet;
use std::sync::Arc;

use serde::Serialize;

use super::domain::{JobListing, ListingDraft, ListingId, ListingStatus};
use super::query::{ListingFacets, ListingQuery, Page};
use crate::board::accounts::access::{is_admin, require_admin, require_employer, require_identity};
use crate::board::accounts::{EmployerRecord, IdentityId};
use crate::board::applications::views::application_views;
use crate::board::applications::ApplicationView;
use crate::board::clock::Clock;
use crate::board::error::{BoardError, Denial, Entity, ValidationError};
use crate::board::repository::{
    ApplicationFilter, BoardRepository, BoardTransaction, ListingFilter, RowScope,
};
use crate::config::BoardSettings;

/// A live listing together with live listings of the same category.
#[derive(Debug, Clone, Serialize)]
pub struct ListingDetail {
    pub listing: JobListing,
    pub similar: Vec<JobListing>,
}

/// Counters shown on the employer dashboard.
#[derive(Debug, Clone, Serialize)]
pub struct EmployerDashboard {
    pub employer: EmployerRecord,
    pub total_listings: usize,
    pub active_listings: usize,
    pub pending_listings: usize,
    pub total_applications: usize,
    pub recent_applications: Vec<ApplicationView>,
}

/// Listing moderation, expiry and search.
pub struct ListingService<R> {
    repository: Arc<R>,
    clock: Arc<dyn Clock>,
    settings: BoardSettings,
}

impl<R> ListingService<R>
where
    R: BoardRepository + 'static,
{
    pub fn new(repository: Arc<R>, clock: Arc<dyn Clock>, settings: BoardSettings) -> Self {
        Self {
            repository,
            clock,
            settings,
        }
    }

    /// Posts a listing for moderation.
    pub fn submit(&self, actor: IdentityId, draft: ListingDraft) -> Result<JobListing, BoardError> {
        draft.validate()?;
        let now = self.clock.now();
        let listing = self.repository.transaction(|tx| {
            let employer = require_employer(tx, actor)?;
            let company = if employer.company_name.trim().is_empty() {
                require_identity(tx, actor)?.display_name
            } else {
                employer.company_name.clone()
            };
            let listing =
                JobListing::submitted(ListingId(tx.next_id()), employer.id, company, draft, now);
            tx.insert_listing(listing.clone())?;
            Ok::<_, BoardError>(listing)
        })?;

        tracing::info!(listing = %listing.id, employer = %listing.employer, "listing submitted for review");
        Ok(listing)
    }

    /// Approves a listing. The first approval starts the expiry window;
    /// later approvals keep it.
    pub fn approve(&self, actor: IdentityId, id: ListingId) -> Result<JobListing, BoardError> {
        let now = self.clock.now();
        let ttl = self.settings.listing_ttl();
        let listing = self.repository.transaction(|tx| {
            require_admin(tx, actor)?;
            let mut listing = active_listing(tx, id)?;
            listing.status = ListingStatus::Approved;
            if listing.expires_at.is_none() {
                listing.expires_at = Some(now + ttl);
            }
            listing.updated_at = now;
            tx.update_listing(listing.clone())?;
            Ok::<_, BoardError>(listing)
        })?;

        tracing::info!(listing = %id, expires_at = ?listing.expires_at, "listing approved");
        Ok(listing)
    }

    pub fn reject(
        &self,
        actor: IdentityId,
        id: ListingId,
        feedback: &str,
    ) -> Result<JobListing, BoardError> {
        let now = self.clock.now();
        let listing = self.repository.transaction(|tx| {
            require_admin(tx, actor)?;
            let mut listing = active_listing(tx, id)?;
            listing.status = ListingStatus::Rejected;
            listing.admin_feedback = feedback.trim().to_string();
            listing.updated_at = now;
            tx.update_listing(listing.clone())?;
            Ok::<_, BoardError>(listing)
        })?;

        tracing::info!(listing = %id, "listing rejected");
        Ok(listing)
    }

    /// Owner edit. An approved listing goes back to review; the expiry
    /// window is left as it was.
    pub fn edit(
        &self,
        actor: IdentityId,
        id: ListingId,
        draft: ListingDraft,
    ) -> Result<JobListing, BoardError> {
        draft.validate()?;
        let now = self.clock.now();
        let (listing, reverted) = self.repository.transaction(|tx| {
            let mut listing = owned_listing(tx, actor, id)?;
            listing.apply_draft(draft);
            let reverted = listing.status == ListingStatus::Approved;
            if reverted {
                listing.status = ListingStatus::PendingReview;
            }
            listing.updated_at = now;
            tx.update_listing(listing.clone())?;
            Ok::<_, BoardError>((listing, reverted))
        })?;

        if reverted {
            tracing::info!(listing = %id, "approved listing edited; back to review");
        }
        Ok(listing)
    }

    /// Sends a rejected listing back to review. Other states are left alone.
    pub fn resubmit(&self, actor: IdentityId, id: ListingId) -> Result<JobListing, BoardError> {
        let now = self.clock.now();
        self.repository.transaction(|tx| {
            let mut listing = owned_listing(tx, actor, id)?;
            if listing.status == ListingStatus::Rejected {
                listing.status = ListingStatus::PendingReview;
                listing.admin_feedback.clear();
                listing.updated_at = now;
                tx.update_listing(listing.clone())?;
                tracing::info!(listing = %id, "listing resubmitted for review");
            }
            Ok(listing)
        })
    }

    /// Soft deletion by the owner or an administrator.
    pub fn delete(&self, actor: IdentityId, id: ListingId) -> Result<JobListing, BoardError> {
        let now = self.clock.now();
        let listing = self.repository.transaction(|tx| {
            let identity = require_identity(tx, actor)?;
            let mut listing = if is_admin(tx, &identity)? {
                active_listing(tx, id)?
            } else {
                owned_listing(tx, actor, id)?
            };
            listing.deleted_at = Some(now);
            tx.update_listing(listing.clone())?;
            Ok::<_, BoardError>(listing)
        })?;

        tracing::info!(listing = %id, %actor, "listing soft-deleted");
        Ok(listing)
    }

    /// Administrator undo of a soft delete. A listing whose employer is
    /// still deleted comes back through `restore_employer` instead.
    pub fn restore(&self, actor: IdentityId, id: ListingId) -> Result<JobListing, BoardError> {
        let now = self.clock.now();
        let listing = self.repository.transaction(|tx| {
            require_admin(tx, actor)?;
            let mut listing = tx
                .listing(id, RowScope::IncludeDeleted)?
                .ok_or(BoardError::NotFound(Entity::Listing))?;
            if listing.deleted_at.is_some() {
                if tx.employer(listing.employer, RowScope::Active)?.is_none() {
                    return Err(ValidationError::EmployerDeleted.into());
                }
                listing.deleted_at = None;
                listing.updated_at = now;
                tx.update_listing(listing.clone())?;
            }
            Ok::<_, BoardError>(listing)
        })?;

        tracing::info!(listing = %id, "listing restored");
        Ok(listing)
    }

    /// Removes the row for good. Applications and saved jobs keep their
    /// snapshots and lose the reference.
    pub fn hard_delete(&self, actor: IdentityId, id: ListingId) -> Result<(), BoardError> {
        self.repository.transaction(|tx| {
            require_admin(tx, actor)?;
            if tx.listing(id, RowScope::IncludeDeleted)?.is_none() {
                return Err(BoardError::NotFound(Entity::Listing));
            }
            tx.remove_listing(id)?;
            Ok(())
        })?;

        tracing::warn!(listing = %id, %actor, "listing permanently deleted");
        Ok(())
    }

    pub fn is_live(&self, id: ListingId) -> Result<bool, BoardError> {
        let now = self.clock.now();
        let listing = self
            .repository
            .transaction(|tx| tx.listing(id, RowScope::Active))?;
        Ok(listing.is_some_and(|listing| listing.is_live(now)))
    }

    /// Live listings matching `query`, newest first.
    pub fn search(&self, query: &ListingQuery) -> Result<Page<JobListing>, BoardError> {
        let rows: Vec<_> = self
            .live_listings()?
            .into_iter()
            .filter(|listing| query.matches(listing))
            .collect();
        let size = if query.show_all {
            0
        } else {
            self.settings.page_size
        };
        Ok(Page::paginate(rows, query.page, size))
    }

    pub fn facets(&self) -> Result<ListingFacets, BoardError> {
        let mut categories = BTreeSet::new();
        let mut locations = BTreeSet::new();
        for listing in self.live_listings()? {
            if !listing.category.is_empty() {
                categories.insert(listing.category);
            }
            if !listing.location.is_empty() {
                locations.insert(listing.location);
            }
        }
        Ok(ListingFacets {
            categories: categories.into_iter().collect(),
            locations: locations.into_iter().collect(),
        })
    }

    /// Public detail page data. Anything that is not live is reported as
    /// missing.
    pub fn detail(&self, id: ListingId) -> Result<ListingDetail, BoardError> {
        let live = self.live_listings()?;
        let listing = live
            .iter()
            .find(|listing| listing.id == id)
            .cloned()
            .ok_or(BoardError::NotFound(Entity::Listing))?;
        let similar = if listing.category.is_empty() {
            Vec::new()
        } else {
            live.into_iter()
                .filter(|other| other.id != id && other.category == listing.category)
                .take(self.settings.similar_limit)
                .collect()
        };
        Ok(ListingDetail { listing, similar })
    }

    /// Non-deleted listings of the acting employer, newest first.
    pub fn employer_listings(&self, actor: IdentityId) -> Result<Vec<JobListing>, BoardError> {
        self.repository.transaction(|tx| {
            let employer = require_employer(tx, actor)?;
            Ok(tx.listings(ListingFilter {
                employer: Some(employer.id),
                scope: RowScope::Active,
            })?)
        })
    }

    pub fn employer_dashboard(&self, actor: IdentityId) -> Result<EmployerDashboard, BoardError> {
        let now = self.clock.now();
        let recent = self.settings.recent_applications;
        self.repository.transaction(|tx| {
            let employer = require_employer(tx, actor)?;
            let listings = tx.listings(ListingFilter {
                employer: Some(employer.id),
                scope: RowScope::Active,
            })?;
            let applications = tx.applications(ApplicationFilter::Employer(employer.id))?;
            let total_applications = applications.len();
            let recent_applications = application_views(
                tx,
                applications.into_iter().take(recent).collect(),
            )?;

            Ok(EmployerDashboard {
                total_listings: listings.len(),
                active_listings: listings.iter().filter(|l| l.is_live(now)).count(),
                pending_listings: listings
                    .iter()
                    .filter(|l| l.status == ListingStatus::PendingReview)
                    .count(),
                total_applications,
                recent_applications,
                employer,
            })
        })
    }

    /// Every listing for the moderation screens, optionally with deleted rows.
    pub fn admin_listings(
        &self,
        actor: IdentityId,
        scope: RowScope,
    ) -> Result<Vec<JobListing>, BoardError> {
        self.repository.transaction(|tx| {
            require_admin(tx, actor)?;
            Ok(tx.listings(ListingFilter {
                employer: None,
                scope,
            })?)
        })
    }

    fn live_listings(&self) -> Result<Vec<JobListing>, BoardError> {
        let now = self.clock.now();
        let rows = self
            .repository
            .transaction(|tx| tx.listings(ListingFilter::default()))?;
        Ok(rows.into_iter().filter(|listing| listing.is_live(now)).collect())
    }
}

fn active_listing(tx: &dyn BoardTransaction, id: ListingId) -> Result<JobListing, BoardError> {
    tx.listing(id, RowScope::Active)?
        .ok_or(BoardError::NotFound(Entity::Listing))
}

/// The acting employer's listing. Role is checked before the lookup and
/// ownership after it.
fn owned_listing(
    tx: &dyn BoardTransaction,
    actor: IdentityId,
    id: ListingId,
) -> Result<JobListing, BoardError> {
    let employer = require_employer(tx, actor)?;
    let listing = active_listing(tx, id)?;
    if listing.employer != employer.id {
        tracing::warn!(listing = %id, %actor, "listing mutation by non-owner");
        return Err(Denial::NotListingOwner.into());
    }
    Ok(listing)
}

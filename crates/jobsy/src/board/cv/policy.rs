use crate::board::accounts::access::active_employer;
use crate::board::accounts::IdentityId;
use crate::board::error::BoardError;
use crate::board::repository::{ApplicationFilter, BoardTransaction, RowScope};

/// Whether `requester` may read the CV of `candidate`.
///
/// Candidates always see their own CV. Anyone else must be an active
/// employer that received an application from the candidate on one of its
/// listings; the listing may be soft-deleted but its row must still be
/// referenced by the application. Consent flags play no part here.
pub(crate) fn can_access_cv(
    tx: &dyn BoardTransaction,
    requester: IdentityId,
    candidate: IdentityId,
) -> Result<bool, BoardError> {
    if requester == candidate {
        return Ok(true);
    }
    let Some(employer) = active_employer(tx, requester)? else {
        return Ok(false);
    };

    for application in tx.applications(ApplicationFilter::Applicant(candidate))? {
        let Some(listing) = application.listing else {
            continue;
        };
        let owned = tx
            .listing(listing, RowScope::IncludeDeleted)?
            .is_some_and(|row| row.employer == employer.id);
        if owned {
            return Ok(true);
        }
    }
    Ok(false)
}

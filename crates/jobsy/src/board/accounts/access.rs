//! Role predicates and the employer cascade, shared by every service that
//! runs inside a repository transaction.

use chrono::{DateTime, Utc};

use super::domain::{AccountProfile, EmployerId, EmployerRecord, Identity, IdentityId, Role};
use crate::board::error::{BoardError, Denial};
use crate::board::repository::{BoardTransaction, RepositoryError, RowScope};

pub(crate) fn require_identity(
    tx: &dyn BoardTransaction,
    actor: IdentityId,
) -> Result<Identity, BoardError> {
    tx.identity(actor)?.ok_or(BoardError::Unauthenticated)
}

pub(crate) fn is_admin(tx: &dyn BoardTransaction, identity: &Identity) -> Result<bool, BoardError> {
    if identity.is_superuser {
        return Ok(true);
    }
    Ok(tx
        .profile(identity.id)?
        .is_some_and(|profile| profile.role == Role::Admin))
}

pub(crate) fn require_admin(
    tx: &dyn BoardTransaction,
    actor: IdentityId,
) -> Result<Identity, BoardError> {
    let identity = require_identity(tx, actor)?;
    if is_admin(tx, &identity)? {
        Ok(identity)
    } else {
        tracing::warn!(%actor, "admin operation denied");
        Err(Denial::AdminOnly.into())
    }
}

/// Active employer record of `identity`, if its role is employer.
pub(crate) fn active_employer(
    tx: &dyn BoardTransaction,
    identity: IdentityId,
) -> Result<Option<EmployerRecord>, BoardError> {
    let is_employer = tx
        .profile(identity)?
        .is_some_and(|profile| profile.role == Role::Employer);
    if !is_employer {
        return Ok(None);
    }
    Ok(tx.employer_for_profile(identity, RowScope::Active)?)
}

pub(crate) fn require_employer(
    tx: &dyn BoardTransaction,
    actor: IdentityId,
) -> Result<EmployerRecord, BoardError> {
    require_identity(tx, actor)?;
    active_employer(tx, actor)?.ok_or_else(|| Denial::NotEmployer.into())
}

/// Insert-or-fetch of the profile for `identity`. Returns the profile and
/// whether this call created it.
pub(crate) fn ensure_profile(
    tx: &mut dyn BoardTransaction,
    identity: IdentityId,
    role: Role,
    now: DateTime<Utc>,
) -> Result<(AccountProfile, bool), BoardError> {
    let profile = AccountProfile::new(identity, role, now);
    match tx.insert_profile(profile.clone()) {
        Ok(()) => {
            if role == Role::Employer {
                ensure_employer(tx, identity, now)?;
            }
            Ok((profile, true))
        }
        Err(RepositoryError::Conflict) => {
            let existing = tx.profile(identity)?.ok_or(RepositoryError::NotFound)?;
            Ok((existing, false))
        }
        Err(other) => Err(other.into()),
    }
}

/// Insert-or-fetch of the employer record for `profile`. The unique
/// constraint on the profile reference decides; a conflicting insert falls
/// back to the stored row, which is reactivated if it was soft-deleted.
pub(crate) fn ensure_employer(
    tx: &mut dyn BoardTransaction,
    profile: IdentityId,
    now: DateTime<Utc>,
) -> Result<EmployerRecord, BoardError> {
    let record = EmployerRecord::blank(EmployerId(tx.next_id()), profile, now);
    match tx.insert_employer(record.clone()) {
        Ok(()) => {
            tracing::info!(%profile, employer = %record.id, "employer record created");
            Ok(record)
        }
        Err(RepositoryError::Conflict) => {
            let mut existing = tx
                .employer_for_profile(profile, RowScope::IncludeDeleted)?
                .ok_or(RepositoryError::NotFound)?;
            if existing.is_deleted() {
                existing.deleted_at = None;
                existing.updated_at = now;
                tx.update_employer(existing.clone())?;
                tracing::info!(%profile, employer = %existing.id, "employer record reactivated");
            }
            Ok(existing)
        }
        Err(other) => Err(other.into()),
    }
}

/// Persists the new role and runs the employer cascade in the caller's
/// transaction.
pub(crate) fn apply_role(
    tx: &mut dyn BoardTransaction,
    mut profile: AccountProfile,
    role: Role,
    now: DateTime<Utc>,
) -> Result<(AccountProfile, Option<EmployerRecord>), BoardError> {
    let previous = profile.role;
    profile.role = role;
    tx.update_profile(profile.clone())?;

    let employer = if role == Role::Employer {
        Some(ensure_employer(tx, profile.identity, now)?)
    } else {
        tx.employer_for_profile(profile.identity, RowScope::IncludeDeleted)?
    };

    if previous != role {
        tracing::info!(identity = %profile.identity, from = %previous, to = %role, "role changed");
    }
    Ok((profile, employer))
}

use std::sync::Arc;
use std::thread;

use super::common::*;
use crate::board::accounts::{
    CompanyUpdate, Identity, IdentityId, Role, MIN_PASSWORD_LEN,
};
use crate::board::error::{BoardError, Denial, Entity, ValidationError};
use crate::board::listings::ListingStatus;
use crate::board::memory::MemoryStore;
use crate::board::repository::{BoardRepository, RepositoryError, RowScope};
use crate::board::storage::Upload;
use crate::config::{AdminBootstrap, StorageSettings};

#[test]
fn registered_identity_gets_candidate_profile_then_employer_cascade() {
    let h = harness();
    let view = h
        .board
        .accounts
        .register(form("ana@x.com", None))
        .expect("registers");
    assert_eq!(view.identity.username, "ana@x.com");
    assert_eq!(view.profile.role, Role::Candidate);
    assert!(view.employer.is_none());
    assert_eq!(h.employer_records(view.identity.id), 0);

    let promoted = h
        .board
        .accounts
        .set_role(view.identity.id, "employer")
        .expect("role set");
    assert_eq!(promoted.profile.role, Role::Employer);
    let record = promoted.employer.expect("employer record created");
    assert_eq!(record.profile, view.identity.id);
    assert!(record.company_name.is_empty());
    assert!(record.company_website.is_empty());
    assert!(record.company_logo.is_none());
    assert_eq!(h.employer_records(view.identity.id), 1);
}

#[test]
fn ensure_account_profile_is_idempotent_for_bare_identities() {
    let h = harness();
    let id = h
        .store
        .transaction(|tx| {
            let id = IdentityId(tx.next_id());
            tx.insert_identity(Identity {
                id,
                username: "sso-user".to_string(),
                email: "sso@x.com".to_string(),
                display_name: "SSO".to_string(),
                credential_hash: String::new(),
                is_staff: false,
                is_superuser: false,
                created_at: start(),
            })?;
            Ok::<_, RepositoryError>(id)
        })
        .expect("identity inserted");

    let first = h.board.accounts.ensure_account_profile(id).expect("created");
    let second = h.board.accounts.ensure_account_profile(id).expect("fetched");
    assert_eq!(first, second);
    assert_eq!(first.role, Role::Candidate);

    assert!(matches!(
        h.board.accounts.ensure_account_profile(IdentityId(999)),
        Err(BoardError::NotFound(Entity::Identity))
    ));
}

#[test]
fn concurrent_promotions_leave_exactly_one_employer_record() {
    let h = harness();
    let id = h.candidate("bo@x.com");

    thread::scope(|scope| {
        for _ in 0..2 {
            let board = Arc::clone(&h.board);
            scope.spawn(move || {
                board
                    .accounts
                    .set_role(id, "employer")
                    .expect("promotion succeeds")
            });
        }
    });

    assert_eq!(h.employer_records(id), 1);
    let again = h.board.accounts.set_role(id, "employer").expect("promotes");
    let first_id = again.employer.expect("record").id;
    let third = h.board.accounts.set_role(id, "Employer").expect("promotes");
    assert_eq!(third.employer.expect("record").id, first_id);
}

#[test]
fn unknown_roles_are_rejected_without_writes() {
    let h = harness();
    let id = h.candidate("cy@x.com");
    assert!(matches!(
        h.board.accounts.set_role(id, "recruiter"),
        Err(BoardError::Validation(ValidationError::UnknownRole(role))) if role == "recruiter"
    ));
    let view = h.board.accounts.account(id).expect("account");
    assert_eq!(view.profile.role, Role::Candidate);
}

#[test]
fn failed_employer_cascade_rolls_back_the_role_change() {
    let store = MemoryStore::new();
    let h = harness_over(EmployerInsertFails::over(store.clone()), StorageSettings::default());
    let id = h.candidate("dee@x.com");

    let result = h.board.accounts.set_role(id, "employer");
    assert!(matches!(
        result,
        Err(BoardError::Repository(RepositoryError::Unavailable(_)))
    ));

    let profile = store
        .transaction(|tx| tx.profile(id))
        .expect("readable")
        .expect("profile exists");
    assert_eq!(profile.role, Role::Candidate, "role change must not persist");
}

#[test]
fn downgrade_keeps_employer_record_and_repromotion_reuses_it() {
    let h = harness();
    let id = h.employer("eve@x.com", "Acme");
    let record = h.board.accounts.account(id).expect("view").employer.expect("record");

    let demoted = h.board.accounts.set_role(id, "candidate").expect("demoted");
    assert_eq!(demoted.profile.role, Role::Candidate);
    assert_eq!(demoted.employer.as_ref().map(|e| e.id), Some(record.id));
    assert!(!h.board.accounts.is_employer(id).expect("predicate"));

    let promoted = h.board.accounts.set_role(id, "employer").expect("promoted");
    assert_eq!(promoted.employer.expect("record").company_name, "Acme");
    assert!(h.board.accounts.is_employer(id).expect("predicate"));
}

#[test]
fn registration_validates_input() {
    let h = harness();
    h.candidate("fay@x.com");

    assert!(matches!(
        h.board.accounts.register(form("FAY@x.com", None)),
        Err(BoardError::Validation(ValidationError::DuplicateEmail))
    ));
    assert!(matches!(
        h.board.accounts.register(form("not-an-email", None)),
        Err(BoardError::Validation(ValidationError::InvalidEmail(_)))
    ));

    let mut short = form("gil@x.com", None);
    short.password = "abc".to_string();
    assert!(matches!(
        h.board.accounts.register(short),
        Err(BoardError::Validation(ValidationError::PasswordTooShort { min }))
            if min == MIN_PASSWORD_LEN
    ));

    assert!(matches!(
        h.board.accounts.register(form("hal@x.com", Some("admin"))),
        Err(BoardError::Forbidden(Denial::AdminOnly))
    ));
}

#[test]
fn authentication_accepts_username_or_email() {
    let h = harness();
    let id = h.candidate("ivy@x.com");

    let identity = h
        .board
        .accounts
        .authenticate("ivy@x.com", "pass1234")
        .expect("login");
    assert_eq!(identity.id, id);

    assert!(matches!(
        h.board.accounts.authenticate("ivy@x.com", "wrong"),
        Err(BoardError::Unauthenticated)
    ));
    assert!(matches!(
        h.board.accounts.authenticate("nobody@x.com", "pass1234"),
        Err(BoardError::Unauthenticated)
    ));
}

#[test]
fn login_tokens_resolve_to_existing_identities_only() {
    let h = harness();
    let id = h.candidate("ivy@x.com");

    let session = h.board.accounts.login("ivy@x.com", "pass1234").expect("login");
    assert_eq!(session.identity, id);
    assert_eq!(
        h.board
            .accounts
            .resolve_session(&session.token)
            .expect("token resolves"),
        id
    );

    let ghost = bearer(IdentityId(9_999));
    let ghost = ghost.trim_start_matches("Bearer ");
    assert!(matches!(
        h.board.accounts.resolve_session(ghost),
        Err(BoardError::Unauthenticated)
    ));
    assert!(matches!(
        h.board.accounts.login("ivy@x.com", "wrong"),
        Err(BoardError::Unauthenticated)
    ));
}

#[test]
fn admin_bootstrap_is_idempotent_and_needs_a_password() {
    let h = harness();
    let skipped = h
        .board
        .accounts
        .bootstrap_admin(&AdminBootstrap {
            username: "admin".to_string(),
            email: "admin@example.com".to_string(),
            password: None,
        })
        .expect("skips");
    assert!(skipped.is_none());

    let first = h.admin();
    let second = h.admin();
    assert_eq!(first, second);

    let view = h.board.accounts.account(first).expect("view");
    assert!(view.identity.is_superuser && view.identity.is_staff);
    assert_eq!(view.profile.role, Role::Admin);
    h.board
        .accounts
        .authenticate("admin", "admin-pass")
        .expect("admin can log in");
}

#[test]
fn bootstrap_keeps_existing_password() {
    let h = harness();
    h.admin();
    h.board
        .accounts
        .bootstrap_admin(&AdminBootstrap {
            username: "admin".to_string(),
            email: "admin@example.com".to_string(),
            password: Some("rotated".to_string()),
        })
        .expect("bootstrap");
    assert!(h.board.accounts.authenticate("admin", "admin-pass").is_ok());
    assert!(h.board.accounts.authenticate("admin", "rotated").is_err());
}

#[test]
fn role_assignment_requires_an_administrator() {
    let h = harness();
    let admin = h.admin();
    let a = h.candidate("jo@x.com");
    let b = h.candidate("kim@x.com");

    assert!(matches!(
        h.board.accounts.assign_role(a, b, "employer"),
        Err(BoardError::Forbidden(Denial::AdminOnly))
    ));
    assert!(matches!(
        h.board.accounts.assign_role(IdentityId(404), b, "employer"),
        Err(BoardError::Unauthenticated)
    ));

    let views = h
        .board
        .accounts
        .assign_role_bulk(admin, &[a, b], "employer")
        .expect("bulk assignment");
    assert_eq!(views.len(), 2);
    assert_eq!(h.employer_records(a), 1);
    assert_eq!(h.employer_records(b), 1);
}

#[test]
fn bulk_assignment_is_all_or_nothing() {
    let h = harness();
    let admin = h.admin();
    let a = h.candidate("lea@x.com");

    let result = h
        .board
        .accounts
        .assign_role_bulk(admin, &[a, IdentityId(404)], "employer");
    assert!(matches!(result, Err(BoardError::NotFound(Entity::Identity))));
    assert_eq!(h.employer_records(a), 0);
}

#[test]
fn company_updates_validate_website_and_need_employer_role() {
    let h = harness();
    let employer = h.employer("max@x.com", "Acme");
    let candidate = h.candidate("ned@x.com");

    let record = h
        .board
        .accounts
        .update_company(
            employer,
            CompanyUpdate {
                company_website: Some("https://acme.example".to_string()),
                industry: Some(" Robotics ".to_string()),
                ..CompanyUpdate::default()
            },
        )
        .expect("updated");
    assert_eq!(record.company_website, "https://acme.example/");
    assert_eq!(record.industry, "Robotics");
    assert_eq!(record.company_name, "Acme");

    assert!(matches!(
        h.board.accounts.update_company(
            employer,
            CompanyUpdate {
                company_website: Some("acme".to_string()),
                ..CompanyUpdate::default()
            }
        ),
        Err(BoardError::Validation(ValidationError::InvalidWebsite(_)))
    ));
    assert!(matches!(
        h.board
            .accounts
            .update_company(candidate, CompanyUpdate::default()),
        Err(BoardError::Forbidden(Denial::NotEmployer))
    ));
}

#[test]
fn replacing_the_logo_removes_the_old_blob() {
    let h = harness();
    let employer = h.employer("oli@x.com", "Acme");

    let first = h
        .board
        .accounts
        .update_company_logo(employer, Upload::new("logo.png", vec![1u8; 8]))
        .expect("logo stored")
        .company_logo
        .expect("logo set");
    let second = h
        .board
        .accounts
        .update_company_logo(employer, Upload::new("logo.png", vec![2u8; 8]))
        .expect("logo replaced")
        .company_logo
        .expect("logo set");

    let keys = h.blobs.keys();
    assert!(!keys.contains(&first.key));
    assert!(keys.contains(&second.key));
    assert!(second.key.starts_with("public/company_logos/"));

    assert!(matches!(
        h.board
            .accounts
            .update_company_logo(employer, Upload::new("logo.pdf", vec![1u8; 8])),
        Err(BoardError::Validation(ValidationError::UnsupportedFile { .. }))
    ));
}

#[test]
fn profile_picture_is_public() {
    let h = harness();
    let id = h.candidate("pia@x.com");
    let profile = h
        .board
        .accounts
        .update_profile_picture(id, Upload::new("me.jpg", vec![7u8; 32]))
        .expect("stored");
    let picture = profile.profile_picture.expect("picture set");
    assert!(picture.key.starts_with("public/profile_pictures/"));
}

#[test]
fn employer_soft_delete_cascades_to_listings_and_restore_reverses_it() {
    let h = harness();
    let admin = h.admin();
    let owner = h.employer("quin@x.com", "Acme");
    let employer_id = h
        .board
        .accounts
        .account(owner)
        .expect("view")
        .employer
        .expect("record")
        .id;

    let kept = h.live_listing(owner, admin, "Backend Engineer");
    let earlier = h.live_listing(owner, admin, "Data Engineer");
    h.board.listings.delete(owner, earlier.id).expect("deleted");

    h.clock.advance(chrono::Duration::hours(1));
    let deleted = h
        .board
        .accounts
        .delete_employer(admin, employer_id)
        .expect("employer deleted");
    assert!(deleted.is_deleted());
    assert!(!h.board.accounts.is_employer(owner).expect("predicate"));
    assert!(!h.board.listings.is_live(kept.id).expect("liveness"));

    let restored = h
        .board
        .accounts
        .restore_employer(admin, employer_id)
        .expect("employer restored");
    assert!(!restored.is_deleted());
    assert!(h.board.listings.is_live(kept.id).expect("liveness"));
    assert!(
        h.listing_row(earlier.id).expect("row").is_deleted(),
        "listings deleted before the employer stay deleted"
    );
    assert_eq!(
        h.listing_row(kept.id).expect("row").status,
        ListingStatus::Approved
    );

    assert!(matches!(
        h.board.accounts.delete_employer(owner, employer_id),
        Err(BoardError::Forbidden(Denial::AdminOnly))
    ));
}

#[test]
fn repromoting_a_deleted_employer_reactivates_the_record() {
    let h = harness();
    let admin = h.admin();
    let owner = h.employer("ria@x.com", "Acme");
    let record = h.board.accounts.account(owner).expect("view").employer.expect("record");
    h.board
        .accounts
        .delete_employer(admin, record.id)
        .expect("deleted");

    let promoted = h.board.accounts.set_role(owner, "employer").expect("promoted");
    let employer = promoted.employer.expect("record");
    assert_eq!(employer.id, record.id);
    assert!(!employer.is_deleted());
    assert_eq!(h.employer_records(owner), 1);
    let active = h
        .store
        .transaction(|tx| tx.employer(record.id, RowScope::Active))
        .expect("readable");
    assert!(active.is_some());
}

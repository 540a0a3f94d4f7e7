//! Identities, account profiles and employer records.

pub(crate) mod access;
pub mod credentials;
pub mod domain;
pub mod service;

pub use credentials::{Argon2Hasher, CredentialError, CredentialHasher};
pub(crate) use domain::is_valid_email;
pub use domain::{
    AccountProfile, AccountView, CompanySize, CompanyUpdate, EmployerId, EmployerRecord, Identity,
    IdentityId, RegistrationForm, Role,
};
pub use service::{AccountService, MIN_PASSWORD_LEN};

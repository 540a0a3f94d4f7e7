use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::board::error::ValidationError;
use crate::board::storage::StoredRef;

/// Identifier of an authenticated identity (and of its 1:1 profile).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct IdentityId(pub u64);

impl fmt::Display for IdentityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EmployerId(pub u64);

impl fmt::Display for EmployerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Canonical user record owned by the identity store.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    pub id: IdentityId,
    pub username: String,
    pub email: String,
    pub display_name: String,
    #[serde(skip_serializing)]
    pub credential_hash: String,
    pub is_staff: bool,
    pub is_superuser: bool,
    pub created_at: DateTime<Utc>,
}

impl fmt::Debug for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Identity")
            .field("id", &self.id)
            .field("username", &self.username)
            .field("email", &self.email)
            .field("is_staff", &self.is_staff)
            .field("is_superuser", &self.is_superuser)
            .finish_non_exhaustive()
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    #[default]
    Candidate,
    Employer,
    Admin,
}

impl Role {
    pub const fn label(self) -> &'static str {
        match self {
            Role::Candidate => "candidate",
            Role::Employer => "employer",
            Role::Admin => "admin",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for Role {
    type Err = ValidationError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "candidate" => Ok(Role::Candidate),
            "employer" => Ok(Role::Employer),
            "admin" => Ok(Role::Admin),
            _ => Err(ValidationError::UnknownRole(value.to_string())),
        }
    }
}

/// Role and preferences extension of an identity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountProfile {
    pub identity: IdentityId,
    pub role: Role,
    pub profile_picture: Option<StoredRef>,
    pub cv: Option<StoredRef>,
    pub cv_consent: bool,
    pub cv_share_with_employers: bool,
    pub created_at: DateTime<Utc>,
}

impl AccountProfile {
    pub fn new(identity: IdentityId, role: Role, now: DateTime<Utc>) -> Self {
        Self {
            identity,
            role,
            profile_picture: None,
            cv: None,
            cv_consent: false,
            cv_share_with_employers: false,
            created_at: now,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CompanySize {
    #[serde(rename = "1-10")]
    Micro,
    #[serde(rename = "11-50")]
    Small,
    #[serde(rename = "51-200")]
    Medium,
    #[serde(rename = "201-500")]
    Large,
    #[serde(rename = "501-1000")]
    Enterprise,
    #[serde(rename = "1001+")]
    Corporation,
}

impl CompanySize {
    pub const fn label(self) -> &'static str {
        match self {
            CompanySize::Micro => "1-10 employees",
            CompanySize::Small => "11-50 employees",
            CompanySize::Medium => "51-200 employees",
            CompanySize::Large => "201-500 employees",
            CompanySize::Enterprise => "501-1000 employees",
            CompanySize::Corporation => "1001+ employees",
        }
    }
}

/// Company-facing extension of an employer profile.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmployerRecord {
    pub id: EmployerId,
    pub profile: IdentityId,
    pub company_name: String,
    pub company_website: String,
    pub company_description: String,
    pub company_logo: Option<StoredRef>,
    pub company_size: Option<CompanySize>,
    pub industry: String,
    pub location: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub deleted_at: Option<DateTime<Utc>>,
}

impl EmployerRecord {
    /// Blank company record created by the employer role cascade.
    pub fn blank(id: EmployerId, profile: IdentityId, now: DateTime<Utc>) -> Self {
        Self {
            id,
            profile,
            company_name: String::new(),
            company_website: String::new(),
            company_description: String::new(),
            company_logo: None,
            company_size: None,
            industry: String::new(),
            location: String::new(),
            created_at: now,
            updated_at: now,
            deleted_at: None,
        }
    }

    pub fn is_deleted(&self) -> bool {
        self.deleted_at.is_some()
    }
}

/// Self-service registration payload.
#[derive(Clone, Deserialize)]
pub struct RegistrationForm {
    pub email: String,
    pub display_name: String,
    pub password: String,
    #[serde(default)]
    pub account_type: Option<String>,
}

impl fmt::Debug for RegistrationForm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RegistrationForm")
            .field("email", &self.email)
            .field("display_name", &self.display_name)
            .field("account_type", &self.account_type)
            .finish_non_exhaustive()
    }
}

/// Company fields an employer may edit. `None` leaves a field untouched.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CompanyUpdate {
    pub company_name: Option<String>,
    pub company_website: Option<String>,
    pub company_description: Option<String>,
    pub company_size: Option<CompanySize>,
    pub industry: Option<String>,
    pub location: Option<String>,
}

/// Identity and profile as returned to clients.
#[derive(Debug, Clone, Serialize)]
pub struct AccountView {
    pub identity: Identity,
    pub profile: AccountProfile,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub employer: Option<EmployerRecord>,
}

/// Checks the minimal `local@domain.tld` shape.
pub(crate) fn is_valid_email(value: &str) -> bool {
    let Some((local, domain)) = value.split_once('@') else {
        return false;
    };
    !local.is_empty()
        && !domain.contains('@')
        && !value.chars().any(char::is_whitespace)
        && domain
            .split_once('.')
            .is_some_and(|(host, tld)| !host.is_empty() && !tld.is_empty())
}

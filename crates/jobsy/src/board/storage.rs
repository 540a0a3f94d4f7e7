//! Boundary to the blob store holding CVs, resumes, logos and pictures.
//!
//! The core decides *what* to store and *whether* a caller may read it; the
//! [`BlobStorage`] implementation owns the I/O, retries and URL signing.

use std::fmt::Debug;
use std::path::Path;

use chrono::Duration;
use serde::{Deserialize, Serialize};

use super::error::ValidationError;

/// Access tier of a stored blob.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Visibility {
    Public,
    Private,
}

impl Visibility {
    pub const fn prefix(self) -> &'static str {
        match self {
            Visibility::Public => "public",
            Visibility::Private => "private",
        }
    }
}

/// Reference to a stored blob as persisted on profile and application rows.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct StoredRef {
    pub key: String,
    pub visibility: Visibility,
}

/// File received from a client, prior to storage.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Upload {
    pub file_name: String,
    pub bytes: Vec<u8>,
}

impl Debug for Upload {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Upload")
            .field("file_name", &self.file_name)
            .field("len", &self.bytes.len())
            .finish()
    }
}

impl Upload {
    pub fn new(file_name: impl Into<String>, bytes: impl Into<Vec<u8>>) -> Self {
        Self {
            file_name: file_name.into(),
            bytes: bytes.into(),
        }
    }

    /// File name reduced to its final component so it can be embedded in a key.
    pub fn sanitized_name(&self) -> String {
        let name = Path::new(&self.file_name)
            .file_name()
            .and_then(|name| name.to_str())
            .unwrap_or("upload");
        name.chars()
            .map(|ch| {
                if ch.is_ascii_alphanumeric() || matches!(ch, '.' | '-' | '_') {
                    ch
                } else {
                    '_'
                }
            })
            .collect()
    }
}

const MIB: usize = 1024 * 1024;

const DOCUMENT_TYPES: [&str; 3] = [
    "application/pdf",
    "application/msword",
    "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
];

/// Categories of uploads accepted by the board.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentKind {
    Cv,
    Resume,
    ProfilePicture,
    CompanyLogo,
}

impl DocumentKind {
    pub const fn folder(self) -> &'static str {
        match self {
            DocumentKind::Cv => "cvs",
            DocumentKind::Resume => "resumes",
            DocumentKind::ProfilePicture => "profile_pictures",
            DocumentKind::CompanyLogo => "company_logos",
        }
    }

    /// Whether `stored` is a file directly inside this kind's folder of the
    /// `visibility` tier.
    pub fn holds(self, stored: &StoredRef, visibility: Visibility) -> bool {
        let prefix = format!("{}/{}/", visibility.prefix(), self.folder());
        stored.visibility == visibility
            && stored
                .key
                .strip_prefix(&prefix)
                .is_some_and(|name| !matches!(name, "" | "." | "..") && !name.contains('/'))
    }

    pub const fn max_bytes(self) -> usize {
        match self {
            DocumentKind::Cv | DocumentKind::Resume => 10 * MIB,
            DocumentKind::ProfilePicture | DocumentKind::CompanyLogo => 5 * MIB,
        }
    }

    const fn expected(self) -> &'static str {
        match self {
            DocumentKind::Cv | DocumentKind::Resume => "PDF, DOC or DOCX",
            DocumentKind::ProfilePicture | DocumentKind::CompanyLogo => "an image",
        }
    }

    /// Checks size and type, the latter guessed from the file extension.
    pub fn validate(self, upload: &Upload) -> Result<mime::Mime, ValidationError> {
        if upload.bytes.is_empty() {
            return Err(ValidationError::Required("file content"));
        }
        if upload.bytes.len() > self.max_bytes() {
            return Err(ValidationError::FileTooLarge {
                limit: self.max_bytes(),
                actual: upload.bytes.len(),
            });
        }

        let unsupported = || ValidationError::UnsupportedFile {
            file_name: upload.file_name.clone(),
            expected: self.expected(),
        };
        let guessed = mime_guess::from_path(&upload.file_name)
            .first()
            .ok_or_else(unsupported)?;

        let accepted = match self {
            DocumentKind::Cv | DocumentKind::Resume => {
                DOCUMENT_TYPES.contains(&guessed.essence_str())
            }
            DocumentKind::ProfilePicture | DocumentKind::CompanyLogo => {
                guessed.type_() == mime::IMAGE
            }
        };

        if accepted {
            Ok(guessed)
        } else {
            Err(unsupported())
        }
    }
}

/// Failure reported by the blob store.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StorageError {
    #[error("storage backend unavailable: {0}")]
    Unavailable(String),
    #[error("stored file '{0}' could not be confirmed")]
    NotConfirmed(String),
    #[error("stored file '{0}' is missing")]
    Missing(String),
    #[error("'{0}' is private and must be served through a signed URL")]
    PrivateBlob(String),
}

/// Durable blob storage with public and private tiers.
pub trait BlobStorage: Send + Sync + Debug {
    /// Stores the upload under `path` (a folder-qualified name). The returned
    /// key may differ from `path` when a blob already exists there.
    fn save(
        &self,
        path: &str,
        upload: &Upload,
        visibility: Visibility,
    ) -> Result<StoredRef, StorageError>;
    fn delete(&self, stored: &StoredRef) -> Result<(), StorageError>;
    fn exists(&self, stored: &StoredRef) -> Result<bool, StorageError>;
    /// Direct URL for public blobs.
    fn url(&self, stored: &StoredRef) -> Result<String, StorageError>;
    /// Time-limited URL for private blobs.
    fn signed_url(&self, stored: &StoredRef, ttl: Duration) -> Result<String, StorageError>;
}

/// Saves the upload and confirms the blob landed before the caller
/// references it from a row.
pub(crate) fn store_confirmed(
    storage: &dyn BlobStorage,
    path: &str,
    upload: &Upload,
    visibility: Visibility,
) -> Result<StoredRef, StorageError> {
    let stored = storage.save(path, upload, visibility)?;
    if storage.exists(&stored)? {
        Ok(stored)
    } else {
        Err(StorageError::NotConfirmed(stored.key))
    }
}

/// Deletes a blob that is no longer referenced. Failures leave an orphan
/// behind and are only logged.
pub(crate) fn discard(storage: &dyn BlobStorage, stored: &StoredRef) {
    if let Err(error) = storage.delete(stored) {
        tracing::warn!(key = %stored.key, %error, "failed to delete orphaned blob");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cv_accepts_office_documents() {
        for name in ["cv.pdf", "cv.doc", "cv.docx"] {
            let upload = Upload::new(name, b"content".to_vec());
            assert!(DocumentKind::Cv.validate(&upload).is_ok(), "{name} rejected");
        }
    }

    #[test]
    fn cv_rejects_images_and_unknown_extensions() {
        let image = Upload::new("cv.png", b"content".to_vec());
        assert!(matches!(
            DocumentKind::Cv.validate(&image),
            Err(ValidationError::UnsupportedFile { .. })
        ));

        let bare = Upload::new("cv", b"content".to_vec());
        assert!(matches!(
            DocumentKind::Resume.validate(&bare),
            Err(ValidationError::UnsupportedFile { .. })
        ));
    }

    #[test]
    fn logos_must_be_small_images() {
        let logo = Upload::new("logo.png", vec![1u8; 16]);
        assert_eq!(
            DocumentKind::CompanyLogo.validate(&logo).expect("png accepted").type_(),
            mime::IMAGE
        );

        let oversized = Upload::new("logo.png", vec![1u8; 5 * MIB + 1]);
        assert_eq!(
            DocumentKind::CompanyLogo.validate(&oversized),
            Err(ValidationError::FileTooLarge {
                limit: 5 * MIB,
                actual: 5 * MIB + 1,
            })
        );
    }

    #[test]
    fn empty_uploads_are_rejected() {
        let empty = Upload::new("cv.pdf", Vec::new());
        assert_eq!(
            DocumentKind::Cv.validate(&empty),
            Err(ValidationError::Required("file content"))
        );
    }

    #[test]
    fn holds_requires_the_folder_and_tier() {
        let private_resume = |key: &str, visibility| {
            let stored = StoredRef {
                key: key.to_string(),
                visibility,
            };
            DocumentKind::Resume.holds(&stored, Visibility::Private)
        };
        assert!(private_resume("private/resumes/cv_1.pdf", Visibility::Private));
        assert!(!private_resume("private/cvs/4/cv.pdf", Visibility::Private));
        assert!(!private_resume("public/resumes/cv.pdf", Visibility::Public));
        assert!(!private_resume("private/resumes/../cvs/cv.pdf", Visibility::Private));
        assert!(!private_resume("private/resumes/", Visibility::Private));
    }

    #[test]
    fn sanitized_name_strips_directories_and_symbols() {
        let upload = Upload::new("../../etc/my cv (final).pdf", b"x".to_vec());
        assert_eq!(upload.sanitized_name(), "my_cv__final_.pdf");
    }
}

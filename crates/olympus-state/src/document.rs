//! # Case Documents
//!
//! Documents belong to a case. Uploaded content is fingerprinted with
//! SHA-256; the bytes themselves are not kept by the case record.
//!
//! A document is signed at most once. The signature hash is the SHA-256 of
//! the canonical JSON object
//! `{"content_digest", "document_id", "signed_at", "signer"}`, so anyone
//! holding the document metadata can recompute it.

use std::str::FromStr;

use serde::{Deserialize, Serialize};

use olympus_core::identity::bounded_text;
use olympus_core::{
    sha256_bytes_hex, sha256_digest, CanonicalBytes, CanonicalizationError, CaseId, DocumentId,
    Timestamp, UserRef, ValidationError,
};

/// Maximum length of a document name.
pub const DOCUMENT_NAME_MAX_LEN: usize = 255;

/// Kind of document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DocumentKind {
    /// Application filed by the citizen.
    Request,
    /// Technical or legal report.
    Report,
    /// Administrative resolution.
    Resolution,
    #[default]
    Attachment,
    Other,
}

impl DocumentKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Request => "REQUEST",
            Self::Report => "REPORT",
            Self::Resolution => "RESOLUTION",
            Self::Attachment => "ATTACHMENT",
            Self::Other => "OTHER",
        }
    }
}

impl std::fmt::Display for DocumentKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DocumentKind {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "REQUEST" => Ok(Self::Request),
            "REPORT" => Ok(Self::Report),
            "RESOLUTION" => Ok(Self::Resolution),
            "ATTACHMENT" => Ok(Self::Attachment),
            "OTHER" => Ok(Self::Other),
            other => Err(ValidationError::UnknownVariant {
                kind: "document kind",
                value: other.to_string(),
            }),
        }
    }
}

/// A completed signature.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentSignature {
    /// Lowercase hex SHA-256.
    pub hash: String,
    pub signer: UserRef,
    pub signed_at: Timestamp,
}

/// A document attached to a case.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Document {
    pub id: DocumentId,
    pub case_id: CaseId,
    pub name: String,
    pub kind: DocumentKind,
    /// SHA-256 hex of the uploaded bytes, when content was supplied.
    pub content_digest: Option<String>,
    pub size_bytes: i64,
    pub uploaded_at: Timestamp,
    pub uploaded_by: Option<UserRef>,
    pub signature: Option<DocumentSignature>,
}

#[derive(Serialize)]
struct SignaturePayload<'a> {
    document_id: String,
    content_digest: Option<&'a str>,
    signer: &'a str,
    signed_at: String,
}

impl Document {
    /// A new unsigned document. `content` is hashed, not stored.
    pub fn new(
        case_id: CaseId,
        name: &str,
        kind: DocumentKind,
        content: Option<&[u8]>,
        uploaded_by: Option<UserRef>,
    ) -> Result<Self, ValidationError> {
        Ok(Self {
            id: DocumentId::new(),
            case_id,
            name: bounded_text(name, "document name", DOCUMENT_NAME_MAX_LEN)?,
            kind,
            content_digest: content.map(sha256_bytes_hex),
            size_bytes: content.map_or(0, |c| i64::try_from(c.len()).unwrap_or(i64::MAX)),
            uploaded_at: Timestamp::now(),
            uploaded_by,
            signature: None,
        })
    }

    pub fn is_signed(&self) -> bool {
        self.signature.is_some()
    }

    /// Hash of the signature material for `signer` at `signed_at`.
    pub fn signature_hash(
        &self,
        signer: &UserRef,
        signed_at: Timestamp,
    ) -> Result<String, CanonicalizationError> {
        let payload = SignaturePayload {
            document_id: self.id.to_string(),
            content_digest: self.content_digest.as_deref(),
            signer: signer.as_str(),
            signed_at: signed_at.to_iso8601(),
        };
        Ok(sha256_digest(&CanonicalBytes::new(&payload)?).to_hex())
    }
}

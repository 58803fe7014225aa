//! Consent records as stored in the state store.
//!
//! Records are JSON documents. Field names match the layout that existing
//! rich queries select on (`c_id`, `r_id`, `u_ids`, ...), plus a `docType`
//! discriminator so a grant record can never be mistaken for a tombstone.

use std::collections::BTreeMap;
use std::fmt;

use bytes::Bytes;
use serde::{Deserialize, Serialize};

use crate::error::{CoreError, Result};
use crate::scope::Scope;

/// Presence marker written for a member.
///
/// Any positive marker counts as membership; zero or negative markers are
/// treated as absent.
pub const PRESENT: i64 = 1;

/// Record discriminator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DocType {
    #[serde(rename = "consentGrant")]
    Grant,
    #[serde(rename = "consentRevoke")]
    Revoke,
}

impl fmt::Display for DocType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DocType::Grant => f.write_str("consentGrant"),
            DocType::Revoke => f.write_str("consentRevoke"),
        }
    }
}

/// The members granted access to one scope.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GrantRecord {
    /// Always `Grant` when written. Absent on legacy records.
    #[serde(rename = "docType", default, skip_serializing_if = "Option::is_none")]
    pub doc_type: Option<DocType>,

    /// Scope identity.
    #[serde(flatten)]
    pub scope: Scope,

    /// User id -> presence marker.
    #[serde(rename = "u_ids", default)]
    pub members: BTreeMap<String, i64>,
}

impl GrantRecord {
    /// Create an empty grant record for a scope.
    pub fn new(scope: Scope) -> Self {
        Self {
            doc_type: Some(DocType::Grant),
            scope,
            members: BTreeMap::new(),
        }
    }

    /// Create a grant record holding a single member.
    pub fn with_member(scope: Scope, user_id: &str) -> Self {
        let mut record = Self::new(scope);
        record.add_member(user_id);
        record
    }

    /// Whether `user_id` holds a positive presence marker.
    pub fn contains(&self, user_id: &str) -> bool {
        self.members.get(user_id).is_some_and(|marker| *marker > 0)
    }

    /// Add a member. Returns `false` if already present.
    pub fn add_member(&mut self, user_id: &str) -> bool {
        if self.contains(user_id) {
            return false;
        }
        self.members.insert(user_id.to_string(), PRESENT);
        true
    }

    /// Remove a member. Returns `false` if not present.
    pub fn remove_member(&mut self, user_id: &str) -> bool {
        if !self.contains(user_id) {
            return false;
        }
        self.members.remove(user_id);
        true
    }

    /// Members with a positive marker, in sorted order.
    pub fn active_members(&self) -> impl Iterator<Item = &str> {
        self.members
            .iter()
            .filter(|(_, marker)| **marker > 0)
            .map(|(user, _)| user.as_str())
    }

    /// Whether no member holds a positive marker.
    pub fn is_empty(&self) -> bool {
        self.active_members().next().is_none()
    }

    /// Serialize to JSON bytes.
    pub fn to_bytes(&self) -> Result<Bytes> {
        let mut record = self.clone();
        record.doc_type = Some(DocType::Grant);
        serde_json::to_vec(&record)
            .map(Bytes::from)
            .map_err(|e| CoreError::EncodingError(e.to_string()))
    }

    /// Deserialize from JSON bytes.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let record: Self =
            serde_json::from_slice(bytes).map_err(|e| CoreError::DecodingError(e.to_string()))?;
        expect_doc_type(DocType::Grant, record.doc_type)?;
        Ok(record)
    }
}

/// Marker that one user's access to one scope has been revoked.
///
/// Only its existence carries meaning. The scope and user are echoed so the
/// marker is self-describing to rich queries.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RevokeTombstone {
    #[serde(rename = "docType", default, skip_serializing_if = "Option::is_none")]
    pub doc_type: Option<DocType>,

    /// The user whose access is revoked.
    #[serde(rename = "p_id")]
    pub user_id: String,

    /// Scope identity.
    #[serde(flatten)]
    pub scope: Scope,
}

impl RevokeTombstone {
    /// Create a tombstone for `user_id` in `scope`.
    pub fn new(user_id: &str, scope: Scope) -> Self {
        Self {
            doc_type: Some(DocType::Revoke),
            user_id: user_id.to_lowercase(),
            scope,
        }
    }

    /// Serialize to JSON bytes.
    pub fn to_bytes(&self) -> Result<Bytes> {
        let mut record = self.clone();
        record.doc_type = Some(DocType::Revoke);
        serde_json::to_vec(&record)
            .map(Bytes::from)
            .map_err(|e| CoreError::EncodingError(e.to_string()))
    }

    /// Deserialize from JSON bytes.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let record: Self =
            serde_json::from_slice(bytes).map_err(|e| CoreError::DecodingError(e.to_string()))?;
        expect_doc_type(DocType::Revoke, record.doc_type)?;
        Ok(record)
    }
}

fn expect_doc_type(expected: DocType, found: Option<DocType>) -> Result<()> {
    match found {
        Some(found) if found != expected => Err(CoreError::UnexpectedDocType { expected, found }),
        _ => Ok(()),
    }
}

//! Scopes and versioned scope-key encoding.
//!
//! A scope is the unit of consent: one column, seen by one role, over one
//! date range, for one access type, supervised by one watchdog. Every
//! record in the store is addressed by a key derived from a scope.
//!
//! Key encoding (version 1):
//! - All fields are lowercased before combination
//! - Fields appear in one canonical order: column, role, start date,
//!   end date, access type, watchdog
//! - Fields are joined by [`FIELD_SEPARATOR`], which arguments may not contain
//! - Grant keys and tombstone keys live in separate namespaces
//!
//! ```text
//! grant/v1|cola|r1|2024-01-01|2024-12-31|read|w1
//! revoke/v1|alice|cola|r1|2024-01-01|2024-12-31|read|w1
//! ```
//!
//! The separator and the namespace prefix make the encoding injective: two
//! different scopes never share a key, and a tombstone key never equals a
//! grant key.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Current key encoding version.
pub const KEY_VERSION: u8 = 1;

/// Separator between encoded key fields. Reserved in key-forming arguments.
pub const FIELD_SEPARATOR: char = '|';

/// The six attributes identifying one access-control unit.
///
/// Fields are stored lowercased; construct through [`Scope::new`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Scope {
    #[serde(rename = "c_id")]
    pub column_id: String,

    #[serde(rename = "r_id")]
    pub role_id: String,

    #[serde(rename = "s_date")]
    pub start_date: String,

    #[serde(rename = "e_date")]
    pub end_date: String,

    #[serde(rename = "acctype_id")]
    pub access_type: String,

    #[serde(rename = "w_id")]
    pub watchdog_id: String,
}

impl Scope {
    /// Build a scope, lowercasing every field.
    pub fn new(
        column_id: &str,
        role_id: &str,
        start_date: &str,
        end_date: &str,
        access_type: &str,
        watchdog_id: &str,
    ) -> Self {
        Self {
            column_id: column_id.to_lowercase(),
            role_id: role_id.to_lowercase(),
            start_date: start_date.to_lowercase(),
            end_date: end_date.to_lowercase(),
            access_type: access_type.to_lowercase(),
            watchdog_id: watchdog_id.to_lowercase(),
        }
    }

    /// Fields in canonical key order.
    pub fn fields(&self) -> [&str; 6] {
        [
            &self.column_id,
            &self.role_id,
            &self.start_date,
            &self.end_date,
            &self.access_type,
            &self.watchdog_id,
        ]
    }

    /// Key of this scope's grant record.
    pub fn grant_key(&self) -> ScopeKey {
        ScopeKey::grant(self)
    }

    /// Key of `user_id`'s revoke tombstone for this scope.
    pub fn tombstone_key(&self, user_id: &str) -> ScopeKey {
        ScopeKey::tombstone(user_id, self)
    }
}

/// Key namespaces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum KeyNamespace {
    /// Grant records (both designs).
    Grant,
    /// Revoke tombstones (tombstone overlay only).
    Revoke,
}

impl KeyNamespace {
    /// The namespace prefix, without version.
    pub const fn prefix(self) -> &'static str {
        match self {
            KeyNamespace::Grant => "grant",
            KeyNamespace::Revoke => "revoke",
        }
    }
}

/// A storage key derived from a scope.
///
/// Opaque outside this module: the only ways to build one are
/// [`ScopeKey::grant`], [`ScopeKey::tombstone`] and [`ScopeKey::from_raw`]
/// (for keys read back from a store).
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ScopeKey(String);

impl ScopeKey {
    /// Key for the grant record of a scope.
    pub fn grant(scope: &Scope) -> Self {
        Self(encode(KeyNamespace::Grant, scope.fields()))
    }

    /// Key for a user's revoke tombstone in a scope.
    pub fn tombstone(user_id: &str, scope: &Scope) -> Self {
        let user = user_id.to_lowercase();
        let fields = std::iter::once(user.as_str()).chain(scope.fields());
        Self(encode(KeyNamespace::Revoke, fields))
    }

    /// Wrap a key read back from a store without re-encoding it.
    pub fn from_raw(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    /// The encoded key.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Consume into the encoded string.
    pub fn into_string(self) -> String {
        self.0
    }

    /// The namespace of this key, if it carries a current-version prefix.
    pub fn namespace(&self) -> Option<KeyNamespace> {
        let (head, _) = self.0.split_once(FIELD_SEPARATOR)?;
        [KeyNamespace::Grant, KeyNamespace::Revoke]
            .into_iter()
            .find(|ns| head == versioned_prefix(*ns))
    }
}

impl fmt::Debug for ScopeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ScopeKey({})", self.0)
    }
}

impl fmt::Display for ScopeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for ScopeKey {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

fn versioned_prefix(namespace: KeyNamespace) -> String {
    format!("{}/v{}", namespace.prefix(), KEY_VERSION)
}

fn encode<'a>(namespace: KeyNamespace, fields: impl IntoIterator<Item = &'a str>) -> String {
    let mut key = versioned_prefix(namespace);
    for field in fields {
        key.push(FIELD_SEPARATOR);
        key.push_str(field);
    }
    key
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn sample_scope() -> Scope {
        Scope::new("colA", "R1", "2024-01-01", "2024-12-31", "READ", "w1")
    }

    #[test]
    fn test_scope_lowercases_fields() {
        let scope = sample_scope();
        assert_eq!(scope.column_id, "cola");
        assert_eq!(scope.role_id, "r1");
        assert_eq!(scope.access_type, "read");
    }

    #[test]
    fn test_grant_key_layout() {
        let key = ScopeKey::grant(&sample_scope());
        assert_eq!(key.as_str(), "grant/v1|cola|r1|2024-01-01|2024-12-31|read|w1");
        assert_eq!(key.namespace(), Some(KeyNamespace::Grant));
    }

    #[test]
    fn test_tombstone_key_layout() {
        let key = ScopeKey::tombstone("Alice", &sample_scope());
        assert_eq!(
            key.as_str(),
            "revoke/v1|alice|cola|r1|2024-01-01|2024-12-31|read|w1"
        );
        assert_eq!(key.namespace(), Some(KeyNamespace::Revoke));
    }

    #[test]
    fn test_case_insensitive() {
        let upper = Scope::new("COLA", "R1", "2024-01-01", "2024-12-31", "READ", "W1");
        let lower = Scope::new("cola", "r1", "2024-01-01", "2024-12-31", "read", "w1");
        assert_eq!(ScopeKey::grant(&upper), ScopeKey::grant(&lower));
    }

    #[test]
    fn test_concatenation_ambiguity_resolved() {
        // Raw concatenation would map both of these to "abc...".
        let a = Scope::new("a", "bc", "s", "e", "t", "w");
        let b = Scope::new("ab", "c", "s", "e", "t", "w");
        assert_ne!(ScopeKey::grant(&a), ScopeKey::grant(&b));
    }

    #[test]
    fn test_unversioned_key_has_no_namespace() {
        assert_eq!(ScopeKey::from_raw("colar1read").namespace(), None);
        assert_eq!(ScopeKey::from_raw("grant/v0|x").namespace(), None);
    }

    fn field() -> impl Strategy<Value = String> {
        "[A-Za-z0-9_-]{1,12}"
    }

    fn scope() -> impl Strategy<Value = Scope> {
        (field(), field(), field(), field(), field(), field())
            .prop_map(|(c, r, s, e, a, w)| Scope::new(&c, &r, &s, &e, &a, &w))
    }

    proptest! {
        #[test]
        fn grant_key_is_deterministic(scope in scope()) {
            prop_assert_eq!(ScopeKey::grant(&scope), ScopeKey::grant(&scope.clone()));
        }

        #[test]
        fn grant_key_is_injective(a in scope(), b in scope()) {
            prop_assert_eq!(a == b, ScopeKey::grant(&a) == ScopeKey::grant(&b));
        }

        #[test]
        fn tombstone_never_collides_with_grant(user in field(), a in scope(), b in scope()) {
            prop_assert_ne!(ScopeKey::tombstone(&user, &a), ScopeKey::grant(&b));
        }
    }
}

//! Test fixtures and helpers.
//!
//! Common setup code for integration tests.

use consent_ledger_core::{AccessQuery, ConsentUpdate, Scope, ScopeKey};

/// The five shared scope attributes, with helpers to build arguments,
/// requests, and keys for any column list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScopeFixture {
    pub role_id: String,
    pub start_date: String,
    pub end_date: String,
    pub access_type: String,
    pub watchdog_id: String,
}

impl Default for ScopeFixture {
    fn default() -> Self {
        Self {
            role_id: "r1".into(),
            start_date: "2024-01-01".into(),
            end_date: "2024-12-31".into(),
            access_type: "read".into(),
            watchdog_id: "w1".into(),
        }
    }
}

impl ScopeFixture {
    pub fn new() -> Self {
        Self::default()
    }

    /// Use a different role.
    pub fn role(mut self, role_id: &str) -> Self {
        self.role_id = role_id.to_string();
        self
    }

    /// Use a different watchdog.
    pub fn watchdog(mut self, watchdog_id: &str) -> Self {
        self.watchdog_id = watchdog_id.to_string();
        self
    }

    /// Positional arguments for an access check.
    pub fn check_args(&self, columns: &str) -> Vec<String> {
        vec![
            self.role_id.clone(),
            self.start_date.clone(),
            self.end_date.clone(),
            columns.to_string(),
            self.access_type.clone(),
            self.watchdog_id.clone(),
        ]
    }

    /// Positional arguments for a consent update.
    pub fn update_args(&self, user_id: &str, action: &str, columns: &str) -> Vec<String> {
        let mut args = vec![user_id.to_string(), action.to_string()];
        args.extend(self.check_args(columns));
        args
    }

    /// A parsed access check.
    ///
    /// # Panics
    ///
    /// If the fixture or `columns` is not a valid argument.
    pub fn query(&self, columns: &str) -> AccessQuery {
        AccessQuery::from_args(&self.check_args(columns)).expect("fixture builds a valid query")
    }

    /// A parsed consent update. `action` takes any accepted spelling.
    ///
    /// # Panics
    ///
    /// If any argument is invalid.
    pub fn update(&self, user_id: &str, action: &str, columns: &str) -> ConsentUpdate {
        ConsentUpdate::from_args(&self.update_args(user_id, action, columns))
            .expect("fixture builds a valid update")
    }

    /// The scope for one column.
    pub fn scope(&self, column_id: &str) -> Scope {
        Scope::new(
            column_id,
            &self.role_id,
            &self.start_date,
            &self.end_date,
            &self.access_type,
            &self.watchdog_id,
        )
    }

    /// Grant record key for one column.
    pub fn grant_key(&self, column_id: &str) -> ScopeKey {
        self.scope(column_id).grant_key()
    }

    /// Tombstone key for one user and column.
    pub fn tombstone_key(&self, user_id: &str, column_id: &str) -> ScopeKey {
        self.scope(column_id).tombstone_key(user_id)
    }
}

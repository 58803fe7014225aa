//! Ledger configuration.

use consent_ledger_engine::EngineKind;
use serde::{Deserialize, Serialize};

use crate::error::{LedgerError, Result};

/// Configuration for the Ledger.
///
/// Missing fields take their defaults when loaded from JSON.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LedgerConfig {
    /// Engine behind `checkAccess` and `updateConsent`.
    pub engine: EngineKind,
    /// Maximum column ids accepted in one call.
    pub max_columns: usize,
    /// Page sizes above this are clamped.
    pub max_page_size: usize,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            engine: EngineKind::MembershipRecord,
            max_columns: 256,
            max_page_size: 1000,
        }
    }
}

impl LedgerConfig {
    /// Parse and validate a JSON configuration document.
    pub fn from_json(json: &str) -> Result<Self> {
        let config: Self =
            serde_json::from_str(json).map_err(|e| LedgerError::InvalidConfig(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Both limits must be at least 1.
    pub fn validate(&self) -> Result<()> {
        if self.max_columns == 0 {
            return Err(LedgerError::InvalidConfig("max_columns must be at least 1".into()));
        }
        if self.max_page_size == 0 {
            return Err(LedgerError::InvalidConfig("max_page_size must be at least 1".into()));
        }
        Ok(())
    }

    /// Use `engine` for the unqualified functions.
    pub fn with_engine(mut self, engine: EngineKind) -> Self {
        self.engine = engine;
        self
    }
}

//! Runtime configuration for the reconciliation core.
//!
//! Hosts embed the core, so configuration stays small: the review page
//! size, where the durable ledger slots live, and how the pending-sync
//! queue backs off. Loaded from TOML with a complete `Default` so hosts
//! without a config file get working values.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::core::errors::{ReconError, Result};

/// Default number of review records fetched per page.
pub const DEFAULT_PAGE_SIZE: usize = 5;

/// Tunable settings for the pager and ledger.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ReconConfig {
    /// Records per review page. Must be at least 1.
    pub page_size: usize,
    /// Path to the SQLite ledger database. `None` keeps slots in memory.
    pub ledger_path: Option<PathBuf>,
    /// Upper bound on pending-sync retry sweeps before the host gives up.
    pub max_sync_attempts: u32,
    /// Base of the exponential retry delay, in seconds.
    pub retry_base_secs: u64,
}

impl Default for ReconConfig {
    fn default() -> Self {
        Self {
            page_size: DEFAULT_PAGE_SIZE,
            ledger_path: None,
            max_sync_attempts: 5,
            retry_base_secs: 2,
        }
    }
}

impl ReconConfig {
    /// Load and validate a configuration file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(ReconError::MissingConfig {
                path: path.to_path_buf(),
            });
        }
        let raw = fs::read_to_string(path).map_err(|source| ReconError::io(path, source))?;
        Self::from_toml_str(&raw)
    }

    /// Parse and validate configuration from a TOML string.
    pub fn from_toml_str(raw: &str) -> Result<Self> {
        let config: Self = toml::from_str(raw)?;
        config.validate()?;
        Ok(config)
    }

    /// Reject values the pager and ledger cannot operate with.
    pub fn validate(&self) -> Result<()> {
        if self.page_size == 0 {
            return Err(ReconError::InvalidConfig {
                details: "page_size must be at least 1".to_string(),
            });
        }
        if self.max_sync_attempts == 0 {
            return Err(ReconError::InvalidConfig {
                details: "max_sync_attempts must be at least 1".to_string(),
            });
        }
        if self.retry_base_secs == 0 {
            return Err(ReconError::InvalidConfig {
                details: "retry_base_secs must be at least 1".to_string(),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::{DEFAULT_PAGE_SIZE, ReconConfig};
    use crate::core::errors::ReconError;

    #[test]
    fn defaults_are_valid() {
        let config = ReconConfig::default();
        assert_eq!(config.page_size, DEFAULT_PAGE_SIZE);
        config.validate().expect("defaults must validate");
    }

    #[test]
    fn toml_round_trip_with_overrides() {
        let config = ReconConfig::from_toml_str(
            r#"
            page_size = 10
            ledger_path = "/var/lib/spot_recon/ledger.db"
            "#,
        )
        .expect("valid overrides should parse");
        assert_eq!(config.page_size, 10);
        assert!(config.ledger_path.is_some());
        assert_eq!(config.max_sync_attempts, 5);
    }

    #[test]
    fn zero_page_size_is_rejected() {
        let err = ReconConfig::from_toml_str("page_size = 0")
            .expect_err("page_size = 0 must be rejected");
        assert!(matches!(err, ReconError::InvalidConfig { .. }));
    }

    #[test]
    fn unknown_fields_are_rejected() {
        let err = ReconConfig::from_toml_str("page_sise = 5")
            .expect_err("typoed field must be rejected");
        assert!(matches!(err, ReconError::ConfigParse { .. }));
    }

    #[test]
    fn missing_file_reports_missing_config() {
        let err = ReconConfig::load("/nonexistent/spot_recon.toml")
            .expect_err("missing file must be reported");
        assert!(matches!(err, ReconError::MissingConfig { .. }));
    }
}

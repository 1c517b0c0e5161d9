//! Application settings loaded from `config.toml`.
//!
//! Every key is optional; a missing file yields [`PaymentsConfig::default`].

use crate::errors::{Error, Result};
use serde::Deserialize;
use std::{fs, path::Path};

fn default_state_tax_withholding_tin() -> String {
    "SITAX".to_string()
}

fn default_federal_tax_withholding_tin() -> String {
    "FITAX".to_string()
}

const fn default_prenote_waiting_period_days() -> i64 {
    5
}

const fn default_audit_sampling_percentage() -> u8 {
    100
}

fn default_file_root() -> String {
    "data/files".to_string()
}

/// Tunables of the payment pipeline.
#[derive(Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct PaymentsConfig {
    /// Tax identifier the case system uses for state tax withholding payees
    #[serde(default = "default_state_tax_withholding_tin")]
    pub state_tax_withholding_tin: String,
    /// Tax identifier the case system uses for federal tax withholding payees
    #[serde(default = "default_federal_tax_withholding_tin")]
    pub federal_tax_withholding_tin: String,
    /// Days a prenote must sit with the bank before the account is trusted
    #[serde(default = "default_prenote_waiting_period_days")]
    pub prenote_waiting_period_days: i64,
    /// Share of staged payments sent to the audit report per run
    #[serde(default = "default_audit_sampling_percentage")]
    pub audit_sampling_percentage: u8,
    /// Root directory holding `received/`, `processed/` and `error/`
    #[serde(default = "default_file_root")]
    pub file_root: String,
}

impl Default for PaymentsConfig {
    fn default() -> Self {
        Self {
            state_tax_withholding_tin: default_state_tax_withholding_tin(),
            federal_tax_withholding_tin: default_federal_tax_withholding_tin(),
            prenote_waiting_period_days: default_prenote_waiting_period_days(),
            audit_sampling_percentage: default_audit_sampling_percentage(),
            file_root: default_file_root(),
        }
    }
}

impl PaymentsConfig {
    /// Parses settings from TOML text.
    pub fn from_toml(contents: &str) -> Result<Self> {
        let mut config: Self = toml::from_str(contents).map_err(|e| Error::Config {
            message: format!("Failed to parse TOML: {e}"),
        })?;
        config.audit_sampling_percentage = config.audit_sampling_percentage.min(100);
        Ok(config)
    }
}

/// Loads settings from `path`, falling back to defaults when the file is absent.
pub fn load_config<P: AsRef<Path>>(path: P) -> Result<PaymentsConfig> {
    let path_ref = path.as_ref();
    if !path_ref.exists() {
        tracing::info!("No configuration at {:?}, using defaults", path_ref);
        return Ok(PaymentsConfig::default());
    }
    tracing::debug!("Attempting to load configuration from: {:?}", path_ref);
    let contents = fs::read_to_string(path_ref).map_err(|e| Error::Config {
        message: format!("Failed to read config file {path_ref:?}: {e}"),
    })?;
    PaymentsConfig::from_toml(&contents)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults_when_empty() -> Result<()> {
        let config = PaymentsConfig::from_toml("")?;
        assert_eq!(config, PaymentsConfig::default());
        assert_eq!(config.state_tax_withholding_tin, "SITAX");
        assert_eq!(config.prenote_waiting_period_days, 5);
        Ok(())
    }

    #[test]
    fn test_partial_override_and_clamp() -> Result<()> {
        let config = PaymentsConfig::from_toml(
            "federal_tax_withholding_tin = \"FED\"\naudit_sampling_percentage = 250\n",
        )?;
        assert_eq!(config.federal_tax_withholding_tin, "FED");
        assert_eq!(config.state_tax_withholding_tin, "SITAX");
        assert_eq!(config.audit_sampling_percentage, 100);
        Ok(())
    }

    #[test]
    fn test_invalid_toml_is_config_error() {
        let result = PaymentsConfig::from_toml("prenote_waiting_period_days = \"five\"");
        assert!(matches!(result, Err(Error::Config { .. })));
    }

    #[test]
    fn test_load_config_missing_file_uses_defaults() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let config = load_config(dir.path().join("absent.toml"))?;
        assert_eq!(config, PaymentsConfig::default());
        Ok(())
    }

    #[test]
    fn test_load_config_from_file() -> Result<()> {
        let mut file = tempfile::NamedTempFile::new()?;
        writeln!(file, "prenote_waiting_period_days = 3")?;
        writeln!(file, "file_root = \"/var/payments\"")?;
        let config = load_config(file.path())?;
        assert_eq!(config.prenote_waiting_period_days, 3);
        assert_eq!(config.file_root, "/var/payments");
        Ok(())
    }
}

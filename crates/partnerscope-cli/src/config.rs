use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use partnerscope_core::{
    BillingColumnMap, ColumnMap, CoreError, Goals, ReportOptions, DEFAULT_TEAM_COMMISSION_RATE,
};
use serde::{Deserialize, Serialize};

pub const CONFIG_ENV: &str = "PARTNERSCOPE_CONFIG";

/// Settings read from `~/.partnerscope` (TOML). Every section is optional.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PartnerscopeConfig {
    pub columns: ColumnMap,
    pub billing_columns: BillingColumnMap,
    pub goals: Goals,
    pub team_commission_rate: f64,
}

impl Default for PartnerscopeConfig {
    fn default() -> Self {
        Self {
            columns: ColumnMap::default(),
            billing_columns: BillingColumnMap::default(),
            goals: Goals::default(),
            team_commission_rate: DEFAULT_TEAM_COMMISSION_RATE,
        }
    }
}

impl PartnerscopeConfig {
    fn default_path() -> Option<PathBuf> {
        dirs::home_dir().map(|h| h.join(".partnerscope"))
    }

    /// Resolve the config file: an explicit path must exist, then
    /// `$PARTNERSCOPE_CONFIG`, then `~/.partnerscope` if present.
    pub fn load(explicit: Option<&Path>) -> Result<PartnerscopeConfig> {
        if let Some(path) = explicit {
            return Self::from_file(path);
        }

        if let Some(path) = std::env::var_os(CONFIG_ENV).filter(|v| !v.is_empty()) {
            return Self::from_file(Path::new(&path));
        }

        match Self::default_path() {
            Some(path) if path.is_file() => Self::from_file(&path),
            _ => {
                tracing::debug!("no config file found, using defaults");
                Ok(PartnerscopeConfig::default())
            }
        }
    }

    pub fn from_file(path: &Path) -> Result<PartnerscopeConfig> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("failed to read config {}", path.display()))?;
        let config = Self::parse(&content)
            .with_context(|| format!("invalid config {}", path.display()))?;
        tracing::debug!(path = %path.display(), "loaded config");
        Ok(config)
    }

    pub fn parse(content: &str) -> Result<PartnerscopeConfig> {
        let config: PartnerscopeConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), CoreError> {
        if !(0.0..=1.0).contains(&self.team_commission_rate) {
            return Err(CoreError::invalid_config(format!(
                "team_commission_rate must be between 0 and 1, got {}",
                self.team_commission_rate
            )));
        }
        Ok(())
    }

    pub fn report_options(&self) -> ReportOptions {
        ReportOptions {
            goals: self.goals,
            ..ReportOptions::default()
        }
    }
}

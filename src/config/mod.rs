use serde::{Deserialize, Serialize};
use std::{
    fs,
    path::{Path, PathBuf},
};

use crate::{
    currency::{CurrencyCode, CurrencyDisplay, FormatOptions, LocaleConfig},
    errors::{LedgerError, Result},
    netting::{NettingOptions, DEFAULT_CONSOLIDATION_LIMIT},
    utils::{self, write_atomic},
};

const CONFIG_FILE: &str = "config.json";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    pub locale: String,
    pub currency: String,
    #[serde(default)]
    pub currency_display: CurrencyDisplay,
    #[serde(default = "Config::default_consolidation_limit")]
    pub consolidation_limit: usize,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub last_opened_group: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            locale: "en-US".into(),
            currency: "USD".into(),
            currency_display: CurrencyDisplay::Symbol,
            consolidation_limit: DEFAULT_CONSOLIDATION_LIMIT,
            last_opened_group: None,
        }
    }
}

impl Config {
    fn default_consolidation_limit() -> usize {
        DEFAULT_CONSOLIDATION_LIMIT
    }

    pub fn netting_options(&self) -> NettingOptions {
        NettingOptions {
            consolidation_limit: self.consolidation_limit,
        }
    }

    pub fn currency_code(&self) -> CurrencyCode {
        CurrencyCode::new(self.currency.as_str())
    }

    pub fn locale_config(&self) -> LocaleConfig {
        LocaleConfig::for_tag(&self.locale)
    }

    pub fn format_options(&self) -> FormatOptions {
        FormatOptions {
            currency_display: self.currency_display,
        }
    }

    fn validate(&self) -> Result<()> {
        if self.currency.trim().len() != 3 {
            return Err(LedgerError::Config(format!(
                "currency must be a three-letter code, got `{}`",
                self.currency
            )));
        }
        if self.locale.trim().is_empty() {
            return Err(LedgerError::Config("locale cannot be blank".into()));
        }
        Ok(())
    }
}

/// Loads and stores [`Config`] as JSON inside the application directory.
pub struct ConfigManager {
    path: PathBuf,
}

impl ConfigManager {
    pub fn new() -> Result<Self> {
        Self::with_base_dir(utils::app_data_dir())
    }

    pub fn with_base_dir(base: PathBuf) -> Result<Self> {
        utils::ensure_dir(&base)?;
        Ok(Self {
            path: base.join(CONFIG_FILE),
        })
    }

    /// Returns the stored configuration, or defaults when none was saved yet.
    pub fn load(&self) -> Result<Config> {
        if !self.path.exists() {
            return Ok(Config::default());
        }
        let data = fs::read_to_string(&self.path)?;
        let config: Config = serde_json::from_str(&data)
            .map_err(|err| LedgerError::Config(format!("{}: {err}", self.path.display())))?;
        config.validate()?;
        Ok(config)
    }

    pub fn save(&self, config: &Config) -> Result<()> {
        config.validate()?;
        let json = serde_json::to_string_pretty(config)?;
        write_atomic(&self.path, &json)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

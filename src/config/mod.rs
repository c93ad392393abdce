use serde::{Deserialize, Serialize};
use std::{
    env,
    fs::{self, File},
    io::{self, Write},
    path::{Path, PathBuf},
};
use thiserror::Error;

use crate::core::EngineSettings;
use crate::currency::{CurrencyCode, LocaleConfig};
use crate::ledger::PeriodPolicy;

/// Overrides the directory that holds `config.json`.
pub const HOME_ENV: &str = "CAMPAIGN_LEDGER_HOME";
const DEFAULT_DIR_NAME: &str = ".campaign_ledger";
const CONFIG_FILE: &str = "config.json";
const TMP_SUFFIX: &str = "tmp";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
    #[error("Serialization error: {0}")]
    Serde(#[from] serde_json::Error),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub locale: String,
    pub currency: String,
    pub contribution_period: PeriodPolicy,
    pub guard_last_admin: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub log_filter: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            locale: "en-US".into(),
            currency: "USD".into(),
            contribution_period: PeriodPolicy::Frequency,
            guard_last_admin: true,
            log_filter: None,
        }
    }
}

impl Config {
    pub fn settings(&self) -> EngineSettings {
        EngineSettings {
            period_policy: self.contribution_period,
            guard_last_admin: self.guard_last_admin,
        }
    }

    pub fn locale_config(&self) -> LocaleConfig {
        LocaleConfig::for_tag(&self.locale)
    }

    pub fn currency_code(&self) -> CurrencyCode {
        CurrencyCode::new(self.currency.trim())
    }
}

/// `$CAMPAIGN_LEDGER_HOME`, else `~/.campaign_ledger`, else a relative `.campaign_ledger`.
pub fn base_dir() -> PathBuf {
    if let Some(custom) = env::var_os(HOME_ENV).filter(|value| !value.is_empty()) {
        return PathBuf::from(custom);
    }
    dirs::home_dir()
        .map(|home| home.join(DEFAULT_DIR_NAME))
        .unwrap_or_else(|| PathBuf::from(DEFAULT_DIR_NAME))
}

pub struct ConfigManager {
    path: PathBuf,
}

impl ConfigManager {
    pub fn new() -> Result<Self, ConfigError> {
        Self::with_base_dir(base_dir())
    }

    pub fn with_base_dir(base: PathBuf) -> Result<Self, ConfigError> {
        fs::create_dir_all(&base)?;
        Ok(Self {
            path: base.join(CONFIG_FILE),
        })
    }

    /// Reads the stored config, or the defaults when none was saved yet.
    pub fn load(&self) -> Result<Config, ConfigError> {
        if self.path.exists() {
            let data = fs::read_to_string(&self.path)?;
            Ok(serde_json::from_str(&data)?)
        } else {
            tracing::debug!(path = %self.path.display(), "no config file, using defaults");
            Ok(Config::default())
        }
    }

    pub fn save(&self, config: &Config) -> Result<(), ConfigError> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(config)?;
        let tmp = tmp_path(&self.path);
        write_atomic(&tmp, &json)?;
        fs::rename(&tmp, &self.path)?;
        tracing::info!(path = %self.path.display(), "config saved");
        Ok(())
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

fn tmp_path(path: &Path) -> PathBuf {
    let mut tmp = path.to_path_buf();
    let ext = path
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| format!("{}.{}", ext, TMP_SUFFIX))
        .unwrap_or_else(|| TMP_SUFFIX.into());
    tmp.set_extension(ext);
    tmp
}

fn write_atomic(path: &Path, data: &str) -> Result<(), ConfigError> {
    let mut file = File::create(path)?;
    file.write_all(data.as_bytes())?;
    file.sync_all()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn missing_file_yields_defaults() {
        let temp = tempdir().unwrap();
        let manager = ConfigManager::with_base_dir(temp.path().to_path_buf()).unwrap();
        let config = manager.load().unwrap();
        assert_eq!(config, Config::default());
        assert_eq!(config.settings(), EngineSettings::default());
    }

    #[test]
    fn save_then_load_keeps_switches() {
        let temp = tempdir().unwrap();
        let manager = ConfigManager::with_base_dir(temp.path().join("nested")).unwrap();
        let config = Config {
            locale: "de-DE".into(),
            currency: "eur".into(),
            contribution_period: PeriodPolicy::CalendarMonth,
            guard_last_admin: false,
            log_filter: Some("campaign_ledger=debug".into()),
        };
        manager.save(&config).unwrap();
        assert!(!tmp_path(manager.path()).exists());
        let loaded = manager.load().unwrap();
        assert_eq!(loaded, config);
        assert_eq!(loaded.currency_code().as_str(), "EUR");
        assert_eq!(loaded.locale_config().decimal_separator, ',');
    }

    #[test]
    fn partial_documents_fill_in_defaults() {
        let config: Config = serde_json::from_str(r#"{ "guard_last_admin": false }"#).unwrap();
        assert_eq!(config.locale, "en-US");
        assert!(!config.guard_last_admin);
        assert_eq!(config.contribution_period, PeriodPolicy::Frequency);
    }
}

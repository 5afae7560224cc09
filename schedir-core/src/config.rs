//! Global schedir configuration.

use std::path::{Path, PathBuf};
use std::time::Duration;

use chrono_tz::Tz;
use config::{Config, File};
use serde::Deserialize;

use crate::error::{SchedirError, SchedirResult};
use crate::remote::{Provider, ProviderFetcher};

static DEFAULT_DATA_DIR: &str = "~/.schedir";
static DEFAULT_PROVIDER: &str = "snapshot";
static DEFAULT_PROVIDER_TIMEOUT: &str = "10s";
const DEFAULT_AGENDA_WEEKS: u32 = 2;

fn default_data_dir() -> PathBuf {
    PathBuf::from(DEFAULT_DATA_DIR)
}

fn default_provider() -> String {
    DEFAULT_PROVIDER.to_string()
}

fn default_provider_timeout() -> String {
    DEFAULT_PROVIDER_TIMEOUT.to_string()
}

fn default_agenda_weeks() -> u32 {
    DEFAULT_AGENDA_WEEKS
}

/// Global configuration at ~/.config/schedir/config.toml
#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct SchedirConfig {
    /// Where the local store lives
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,

    /// Provider binary suffix (`schedir-provider-<provider>`)
    #[serde(default = "default_provider")]
    pub provider: String,

    /// Humantime duration, e.g. "10s" or "1m"
    #[serde(default = "default_provider_timeout")]
    pub provider_timeout: String,

    #[serde(default = "default_agenda_weeks")]
    pub agenda_weeks: u32,

    /// IANA zone name; the system zone when unset
    #[serde(default)]
    pub timezone: Option<String>,
}

impl Default for SchedirConfig {
    fn default() -> Self {
        SchedirConfig {
            data_dir: default_data_dir(),
            provider: default_provider(),
            provider_timeout: default_provider_timeout(),
            agenda_weeks: DEFAULT_AGENDA_WEEKS,
            timezone: None,
        }
    }
}

impl SchedirConfig {
    pub fn config_path() -> SchedirResult<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| SchedirError::Config("Could not determine config directory".into()))?
            .join("schedir");

        Ok(config_dir.join("config.toml"))
    }

    /// Load ~/.config/schedir/config.toml, creating a commented default first.
    pub fn load() -> SchedirResult<Self> {
        let config_path = Self::config_path()?;

        if !config_path.exists() {
            Self::create_default_config(&config_path)?;
        }

        Self::load_from(&config_path)
    }

    pub fn load_from(path: &Path) -> SchedirResult<Self> {
        let config: SchedirConfig = Config::builder()
            .add_source(File::from(path.to_path_buf()).required(false))
            .build()
            .map_err(|e| SchedirError::Config(e.to_string()))?
            .try_deserialize()
            .map_err(|e| SchedirError::Config(e.to_string()))?;

        config.provider_timeout()?;
        config.timezone()?;
        Ok(config)
    }

    pub fn data_path(&self) -> PathBuf {
        PathBuf::from(shellexpand::tilde(&self.data_dir.to_string_lossy()).into_owned())
    }

    pub fn provider_timeout(&self) -> SchedirResult<Duration> {
        humantime::parse_duration(&self.provider_timeout).map_err(|e| {
            SchedirError::Config(format!(
                "Invalid provider_timeout '{}': {}",
                self.provider_timeout, e
            ))
        })
    }

    /// Configured viewer time zone, if any.
    pub fn timezone(&self) -> SchedirResult<Option<Tz>> {
        self.timezone
            .as_deref()
            .map(|name| {
                name.parse::<Tz>()
                    .map_err(|e| SchedirError::Config(format!("Invalid timezone '{name}': {e}")))
            })
            .transpose()
    }

    pub fn fetcher(&self) -> SchedirResult<ProviderFetcher> {
        Ok(ProviderFetcher::new(
            Provider::from_name(&self.provider),
            self.provider_timeout()?,
        ))
    }

    /// Create a default config file with all options commented out.
    pub fn create_default_config(path: &Path) -> SchedirResult<()> {
        let contents = format!(
            "\
# schedir configuration

# Where the local copy of your schedules lives:
# data_dir = \"{DEFAULT_DATA_DIR}\"

# Which provider binary fetches schedules (schedir-provider-<name>):
# provider = \"{DEFAULT_PROVIDER}\"

# How long to wait for the provider:
# provider_timeout = \"{DEFAULT_PROVIDER_TIMEOUT}\"

# How many weeks `schedir agenda` looks ahead:
# agenda_weeks = {DEFAULT_AGENDA_WEEKS}

# Time zone events are shown in (defaults to the system zone):
# timezone = \"Europe/Moscow\"
"
        );

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| {
                SchedirError::Config(format!("Could not create config directory: {e}"))
            })?;
        }

        std::fs::write(path, contents)
            .map_err(|e| SchedirError::Config(format!("Could not write config file: {e}")))?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn commented_default_file_yields_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("schedir").join("config.toml");

        SchedirConfig::create_default_config(&path).unwrap();
        let config = SchedirConfig::load_from(&path).unwrap();

        assert_eq!(config, SchedirConfig::default());
        assert_eq!(config.provider_timeout().unwrap(), Duration::from_secs(10));
        assert_eq!(config.timezone().unwrap(), None);
    }

    #[test]
    fn reads_overrides() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(
            &path,
            "provider = \"campus\"\nprovider_timeout = \"1m 30s\"\nagenda_weeks = 4\ntimezone = \"Europe/Berlin\"\n",
        )
        .unwrap();

        let config = SchedirConfig::load_from(&path).unwrap();

        assert_eq!(config.provider, "campus");
        assert_eq!(config.agenda_weeks, 4);
        assert_eq!(config.provider_timeout().unwrap(), Duration::from_secs(90));
        assert_eq!(config.timezone().unwrap(), Some(chrono_tz::Europe::Berlin));
    }

    #[test]
    fn rejects_bad_values() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");

        std::fs::write(&path, "timezone = \"Mars/Olympus\"\n").unwrap();
        assert!(matches!(SchedirConfig::load_from(&path), Err(SchedirError::Config(_))));

        std::fs::write(&path, "provider_timeout = \"soon\"\n").unwrap();
        assert!(matches!(SchedirConfig::load_from(&path), Err(SchedirError::Config(_))));
    }

    #[test]
    fn data_path_expands_tilde() {
        let config = SchedirConfig::default();
        assert!(!config.data_path().to_string_lossy().starts_with('~'));
    }
}

use std::path::Path;
use std::path::PathBuf;
use std::time::Duration;

use serde::Deserialize;
use serde::Serialize;

use super::error::ConfigError;

pub const SERVICE_URL_ENV: &str = "INTAKE_SERVICE_URL";
pub const DEFAULT_SERVICE_URL: &str = "http://127.0.0.1:5000";

#[derive(Debug, Serialize, Deserialize, Clone, Default, PartialEq)]
#[serde(default)]
pub struct IntakeConfig {
    pub service: ServiceConfig,
    pub timing: TimingConfig,
    pub storage: StorageConfig,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(default)]
pub struct ServiceConfig {
    pub base_url: String,
    pub request_timeout_secs: u64,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_SERVICE_URL.to_string(),
            request_timeout_secs: 30,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(default)]
pub struct TimingConfig {
    pub auto_advance_delay_ms: u64,
    pub autosave_interval_secs: u64,
    pub progress_stage_delay_ms: u64,
}

impl Default for TimingConfig {
    fn default() -> Self {
        Self {
            auto_advance_delay_ms: 600,
            autosave_interval_secs: 30,
            progress_stage_delay_ms: 800,
        }
    }
}

/// Unset directories are resolved by the binary.
#[derive(Debug, Serialize, Deserialize, Clone, Default, PartialEq)]
#[serde(default)]
pub struct StorageConfig {
    pub state_dir: Option<PathBuf>,
    pub session_dir: Option<PathBuf>,
}

impl IntakeConfig {
    pub fn from_toml_str(raw: &str, path: &Path) -> Result<Self, ConfigError> {
        toml::from_str(raw).map_err(|err| ConfigError::Parse {
            path: path.display().to_string(),
            message: err.to_string(),
        })
    }

    /// Reads a config file. A missing file yields the defaults.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        match std::fs::read_to_string(path) {
            Ok(raw) => Self::from_toml_str(&raw, path),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!(path = %path.display(), "no config file, using defaults");
                Ok(Self::default())
            }
            Err(source) => Err(ConfigError::Read {
                path: path.display().to_string(),
                source,
            }),
        }
    }

    pub fn apply_env(mut self) -> Self {
        self.apply_overrides(std::env::var(SERVICE_URL_ENV).ok());
        self
    }

    fn apply_overrides(&mut self, service_url: Option<String>) {
        if let Some(url) = service_url.filter(|url| !url.trim().is_empty()) {
            self.service.base_url = url.trim().to_string();
        }
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.service.request_timeout_secs.max(1))
    }

    pub fn auto_advance_delay(&self) -> Duration {
        Duration::from_millis(self.timing.auto_advance_delay_ms)
    }

    pub fn autosave_interval(&self) -> Duration {
        Duration::from_secs(self.timing.autosave_interval_secs.max(1))
    }

    pub fn progress_stage_delay(&self) -> Duration {
        Duration::from_millis(self.timing.progress_stage_delay_ms.max(1))
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn partial_file_keeps_remaining_defaults() {
        let config = IntakeConfig::from_toml_str(
            "[service]\nbase_url = \"https://compliance.example\"\n\n[timing]\nautosave_interval_secs = 5\n",
            Path::new("config.toml"),
        )
        .expect("parse");

        assert_eq!(config.service.base_url, "https://compliance.example");
        assert_eq!(config.service.request_timeout_secs, 30);
        assert_eq!(config.timing.autosave_interval_secs, 5);
        assert_eq!(config.timing.auto_advance_delay_ms, 600);
        assert_eq!(config.storage, StorageConfig::default());
    }

    #[test]
    fn malformed_file_reports_its_path() {
        let err = IntakeConfig::from_toml_str("[service\n", Path::new("/etc/intake.toml"))
            .expect_err("malformed");
        assert!(matches!(err, ConfigError::Parse { ref path, .. } if path == "/etc/intake.toml"));
    }

    #[test]
    fn missing_file_yields_defaults() {
        let dir = tempfile::tempdir().expect("tempdir");
        let config = IntakeConfig::load(&dir.path().join("absent.toml")).expect("load");
        assert_eq!(config, IntakeConfig::default());
    }

    #[test]
    fn blank_env_override_is_ignored() {
        let mut config = IntakeConfig::default();
        config.apply_overrides(Some("   ".to_string()));
        assert_eq!(config.service.base_url, DEFAULT_SERVICE_URL);

        config.apply_overrides(Some(" http://10.0.0.2:8080 ".to_string()));
        assert_eq!(config.service.base_url, "http://10.0.0.2:8080");
    }
}

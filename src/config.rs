//! Configuration loader and validator for the course administration client.
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("YAML parse error: {0}")]
    Parse(#[from] serde_yaml::Error),
    #[error("Invalid configuration: {0}")]
    Invalid(&'static str),
}

/// Root configuration struct mirroring the YAML schema exactly.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Config {
    pub api: Api,
    pub app: App,
    #[serde(default)]
    pub notifications: Notifications,
}

/// Backend REST API settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Api {
    pub base_url: String,
    pub access_token: String,
    #[serde(default)]
    pub refresh_token: Option<String>,
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
}

/// App-level settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct App {
    pub data_dir: String,
    #[serde(default = "default_page_size")]
    pub page_size: usize,
    #[serde(default = "default_debounce_ms")]
    pub filter_debounce_ms: u64,
}

/// Auto-dismiss durations per notification kind, in milliseconds.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct Notifications {
    pub default_ms: u64,
    pub error_ms: u64,
    pub warning_ms: u64,
    pub system_ms: u64,
    pub achievement_ms: u64,
}

impl Default for Notifications {
    fn default() -> Self {
        Self {
            default_ms: 5000,
            error_ms: 8000,
            warning_ms: 6000,
            system_ms: 3000,
            achievement_ms: 6000,
        }
    }
}

fn default_timeout_ms() -> u64 {
    10_000
}

fn default_page_size() -> usize {
    12
}

fn default_debounce_ms() -> u64 {
    300
}

impl Config {
    /// Ensure required directories exist (creates `app.data_dir` if missing).
    pub fn ensure_dirs(&self) -> Result<(), std::io::Error> {
        if self.app.data_dir.trim().is_empty() {
            return Ok(());
        }
        fs::create_dir_all(&self.app.data_dir)
    }

    /// Default SQLite URL for the audit journal inside `app.data_dir`.
    pub fn audit_database_url(&self) -> String {
        format!(
            "sqlite://{}/audit.db",
            self.app.data_dir.trim_end_matches('/')
        )
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.api.timeout_ms)
    }

    pub fn filter_debounce(&self) -> Duration {
        Duration::from_millis(self.app.filter_debounce_ms)
    }

    /// Apply environment overrides. `AULA_ACCESS_TOKEN` replaces the token
    /// from the file so it can be kept out of version control.
    pub fn apply_env(&mut self) {
        if let Ok(token) = std::env::var("AULA_ACCESS_TOKEN") {
            if !token.trim().is_empty() {
                self.api.access_token = token;
            }
        }
        if let Ok(token) = std::env::var("AULA_REFRESH_TOKEN") {
            if !token.trim().is_empty() {
                self.api.refresh_token = Some(token);
            }
        }
    }
}

/// Load configuration from a YAML file and validate it.
/// - If `path` is None, uses `config.yaml` in the current working directory.
pub fn load(path: Option<&Path>) -> Result<Config, ConfigError> {
    let path = path.unwrap_or_else(|| Path::new("config.yaml"));
    let content = fs::read_to_string(path)?;
    let mut cfg: Config = serde_yaml::from_str(&content)?;
    cfg.apply_env();
    validate(&cfg)?;
    Ok(cfg)
}

/// Validate a configuration instance.
fn validate(cfg: &Config) -> Result<(), ConfigError> {
    let base = cfg.api.base_url.trim();
    if base.is_empty() {
        return Err(ConfigError::Invalid("api.base_url must be non-empty"));
    }
    if !(base.starts_with("http://") || base.starts_with("https://")) {
        return Err(ConfigError::Invalid("api.base_url must be an http(s) URL"));
    }
    if cfg.api.access_token.trim().is_empty() {
        return Err(ConfigError::Invalid("api.access_token must be non-empty"));
    }
    if cfg.api.timeout_ms == 0 {
        return Err(ConfigError::Invalid("api.timeout_ms must be > 0"));
    }

    if cfg.app.data_dir.trim().is_empty() {
        return Err(ConfigError::Invalid("app.data_dir must be non-empty"));
    }
    if cfg.app.page_size == 0 {
        return Err(ConfigError::Invalid("app.page_size must be > 0"));
    }

    let n = &cfg.notifications;
    if [n.default_ms, n.error_ms, n.warning_ms, n.system_ms, n.achievement_ms].contains(&0) {
        return Err(ConfigError::Invalid(
            "notifications durations must be > 0",
        ));
    }

    Ok(())
}

/// Returns the example YAML document shipped with the client.
pub fn example() -> &'static str {
    r#"api:
  base_url: "http://localhost:8000/api/"
  access_token: "YOUR_ACCESS_TOKEN"
  refresh_token: "YOUR_REFRESH_TOKEN"
  timeout_ms: 10000

app:
  data_dir: "./data"
  page_size: 12
  filter_debounce_ms: 300

notifications:
  default_ms: 5000
  error_ms: 8000
  warning_ms: 6000
  system_ms: 3000
  achievement_ms: 6000
"#
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn parse_example_ok() {
        let cfg: Config = serde_yaml::from_str(example()).unwrap();
        validate(&cfg).unwrap();
        assert_eq!(cfg.app.page_size, 12);
        assert_eq!(cfg.filter_debounce(), Duration::from_millis(300));
    }

    #[test]
    fn defaults_fill_optional_sections() {
        let yaml = r#"api:
  base_url: "https://aula.example.org/api/"
  access_token: "t"
app:
  data_dir: "./data"
"#;
        let cfg: Config = serde_yaml::from_str(yaml).unwrap();
        validate(&cfg).unwrap();
        assert_eq!(cfg.api.timeout_ms, 10_000);
        assert_eq!(cfg.api.refresh_token, None);
        assert_eq!(cfg.notifications, Notifications::default());
    }

    #[test]
    fn partial_notifications_section_keeps_other_defaults() {
        let yaml = r#"api:
  base_url: "https://aula.example.org/api/"
  access_token: "t"
app:
  data_dir: "./data"
notifications:
  error_ms: 9000
"#;
        let cfg: Config = serde_yaml::from_str(yaml).unwrap();
        validate(&cfg).unwrap();
        assert_eq!(cfg.notifications.error_ms, 9000);
        assert_eq!(cfg.notifications.default_ms, 5000);
        assert_eq!(cfg.notifications.achievement_ms, 6000);
    }

    #[test]
    fn zero_notification_durations_rejected() {
        let base: Config = serde_yaml::from_str(example()).unwrap();
        let zeroes: [fn(&mut Notifications); 3] = [
            |n| n.system_ms = 0,
            |n| n.achievement_ms = 0,
            |n| n.default_ms = 0,
        ];
        for zero in zeroes {
            let mut cfg = base.clone();
            zero(&mut cfg.notifications);
            let err = validate(&cfg).unwrap_err();
            assert!(matches!(err, ConfigError::Invalid("notifications durations must be > 0")));
        }
    }

    #[test]
    fn invalid_base_url() {
        let mut cfg: Config = serde_yaml::from_str(example()).unwrap();
        cfg.api.base_url = "".into();
        let err = validate(&cfg).unwrap_err();
        match err {
            ConfigError::Invalid(msg) => assert!(msg.contains("api.base_url")),
            _ => panic!("wrong error"),
        }

        let mut cfg: Config = serde_yaml::from_str(example()).unwrap();
        cfg.api.base_url = "ftp://aula".into();
        assert!(matches!(validate(&cfg), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn invalid_token_and_sizes() {
        let mut cfg: Config = serde_yaml::from_str(example()).unwrap();
        cfg.api.access_token = "  ".into();
        let err = validate(&cfg).unwrap_err();
        match err {
            ConfigError::Invalid(msg) => assert!(msg.contains("access_token")),
            _ => panic!("wrong error"),
        }

        let mut cfg: Config = serde_yaml::from_str(example()).unwrap();
        cfg.app.page_size = 0;
        assert!(matches!(validate(&cfg), Err(ConfigError::Invalid(_))));

        let mut cfg: Config = serde_yaml::from_str(example()).unwrap();
        cfg.api.timeout_ms = 0;
        assert!(matches!(validate(&cfg), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn ensure_dirs_creates_data_dir() {
        let td = tempdir().unwrap();
        let data_path = td.path().join("data");
        let mut cfg: Config = serde_yaml::from_str(example()).unwrap();
        cfg.app.data_dir = data_path.to_string_lossy().to_string();
        cfg.ensure_dirs().unwrap();
        assert!(data_path.exists());
        assert!(cfg.audit_database_url().ends_with("/data/audit.db"));
    }

    #[test]
    fn load_from_file_ok() {
        let td = tempdir().unwrap();
        let p = td.path().join("config.yaml");
        fs::write(&p, example()).unwrap();
        let cfg = load(Some(&p)).unwrap();
        assert_eq!(cfg.api.base_url, "http://localhost:8000/api/");
    }
}

//! Configuration file support

use normo_api::{DEFAULT_BASE_URL, client::API_URL_ENV};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;
use std::time::Duration;

use crate::utils::expand_home;

/// Configuration for normo
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Base URL of the chat gateway
    pub api_url: Option<String>,
    /// User the conversations belong to
    pub user_id: Option<String>,
    /// Request timeout in seconds (transport default when unset)
    pub request_timeout_secs: Option<u64>,
    /// Where the active conversation id is remembered between runs
    pub state_file: Option<String>,
    /// Where cited documents are saved
    pub download_dir: Option<String>,
}

impl Config {
    /// Get the config directory
    pub fn config_dir() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("normo")
    }

    /// Get the config file path
    pub fn config_path() -> PathBuf {
        // Check for NORMO_CONFIG_PATH env var first
        if let Ok(path) = std::env::var("NORMO_CONFIG_PATH") {
            return PathBuf::from(path);
        }
        Self::config_dir().join("config.toml")
    }

    /// Load config from file
    pub fn load() -> Self {
        let path = Self::config_path();
        if !path.exists() {
            return Self::default();
        }

        match fs::read_to_string(&path) {
            Ok(content) => match Self::parse(&content) {
                Ok(config) => config,
                Err(e) => {
                    eprintln!("Warning: Failed to parse config file: {}", e);
                    Self::default()
                }
            },
            Err(e) => {
                eprintln!("Warning: Failed to read config file: {}", e);
                Self::default()
            }
        }
    }

    /// Parse config from TOML text
    pub fn parse(content: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(content)
    }

    /// Save config to file
    pub fn save(&self) -> std::io::Result<()> {
        let path = Self::config_path();
        if let Some(dir) = path.parent() {
            fs::create_dir_all(dir)?;
        }

        let content = toml::to_string_pretty(self).map_err(std::io::Error::other)?;
        fs::write(path, content)
    }

    /// Create a default config file if it doesn't exist
    pub fn init() -> std::io::Result<PathBuf> {
        let path = Self::config_path();
        if path.exists() {
            return Ok(path);
        }

        let default_config = Config {
            api_url: Some(DEFAULT_BASE_URL.to_string()),
            ..Default::default()
        };

        default_config.save()?;
        Ok(path)
    }

    /// Gateway URL: CLI flag, then `NORMO_API_URL`, then config file, then default
    pub fn api_url(&self, from_cli: Option<String>) -> String {
        resolve_api_url(
            from_cli,
            std::env::var(API_URL_ENV).ok(),
            self.api_url.clone(),
        )
    }

    pub fn request_timeout(&self) -> Option<Duration> {
        self.request_timeout_secs
            .filter(|secs| *secs > 0)
            .map(Duration::from_secs)
    }

    /// Session store location, if configured
    pub fn state_file(&self) -> Option<PathBuf> {
        self.state_file.as_deref().map(expand_home)
    }

    /// Directory cited documents are saved into
    pub fn download_dir(&self) -> PathBuf {
        self.download_dir
            .as_deref()
            .map(expand_home)
            .or_else(dirs::download_dir)
            .unwrap_or_else(std::env::temp_dir)
    }
}

fn resolve_api_url(
    from_cli: Option<String>,
    from_env: Option<String>,
    from_config: Option<String>,
) -> String {
    [from_cli, from_env, from_config]
        .into_iter()
        .flatten()
        .find(|url| !url.trim().is_empty())
        .unwrap_or_else(|| DEFAULT_BASE_URL.to_string())
}

/// Generate example config content
pub fn example_config() -> &'static str {
    r#"# normo configuration file
# Place at ~/.config/normo/config.toml (Linux), ~/Library/Application Support/normo/config.toml (macOS)
# or %APPDATA%\normo\config.toml (Windows)

# Chat gateway (the NORMO_API_URL environment variable takes precedence)
api_url = "http://localhost:8000"

# User the conversations belong to (optional)
# user_id = "alice"

# Request timeout in seconds (optional, no timeout by default)
# request_timeout_secs = 120

# Where the active conversation is remembered between runs (optional)
# state_file = "~/.local/share/normo/session.json"

# Where cited documents are saved by /pdf (optional, defaults to the download directory)
# download_dir = "~/Downloads"
"#
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_example_config_parses() {
        let config = Config::parse(example_config()).unwrap();
        assert_eq!(config.api_url.as_deref(), Some("http://localhost:8000"));
        assert_eq!(config.user_id, None);
        assert_eq!(config.request_timeout(), None);
    }

    #[test]
    fn test_parse_all_fields() {
        let config = Config::parse(
            r#"
            api_url = "https://normo.example.at"
            user_id = "alice"
            request_timeout_secs = 30
            state_file = "/tmp/normo-session.json"
            download_dir = "/tmp/normo-docs"
            "#,
        )
        .unwrap();
        assert_eq!(config.user_id.as_deref(), Some("alice"));
        assert_eq!(config.request_timeout(), Some(Duration::from_secs(30)));
        assert_eq!(config.state_file(), Some(PathBuf::from("/tmp/normo-session.json")));
        assert_eq!(config.download_dir(), PathBuf::from("/tmp/normo-docs"));
    }

    #[test]
    fn test_zero_timeout_means_none() {
        let config = Config {
            request_timeout_secs: Some(0),
            ..Default::default()
        };
        assert_eq!(config.request_timeout(), None);
    }

    #[test]
    fn test_parse_rejects_wrong_types() {
        assert!(Config::parse("request_timeout_secs = \"soon\"").is_err());
    }

    #[test]
    fn test_api_url_precedence() {
        let some = |s: &str| Some(s.to_string());
        assert_eq!(
            resolve_api_url(some("http://cli"), some("http://env"), some("http://file")),
            "http://cli"
        );
        assert_eq!(
            resolve_api_url(None, some("http://env"), some("http://file")),
            "http://env"
        );
        assert_eq!(resolve_api_url(None, some(""), some("http://file")), "http://file");
        assert_eq!(resolve_api_url(None, None, None), DEFAULT_BASE_URL);
    }

    #[test]
    fn test_save_and_load_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");
        // Only this test touches NORMO_CONFIG_PATH.
        unsafe { std::env::set_var("NORMO_CONFIG_PATH", &path) };

        assert_eq!(Config::config_path(), path);
        assert_eq!(Config::load(), Config::default());

        let config = Config {
            api_url: Some("https://normo.example.at".into()),
            user_id: Some("alice".into()),
            request_timeout_secs: Some(30),
            ..Default::default()
        };
        config.save().unwrap();
        assert!(path.exists());
        assert_eq!(Config::load(), config);

        // init leaves an existing file alone
        assert_eq!(Config::init().unwrap(), path);
        assert_eq!(Config::load(), config);

        // A malformed file falls back to defaults
        fs::write(&path, "request_timeout_secs = \"soon\"").unwrap();
        assert_eq!(Config::load(), Config::default());

        unsafe { std::env::remove_var("NORMO_CONFIG_PATH") };
    }
}

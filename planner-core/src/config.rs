//! Planner configuration.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::{PlannerError, PlannerResult};

const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 10;

pub const STORE_URL_ENV: &str = "PLANNER_STORE_URL";
pub const ANON_KEY_ENV: &str = "PLANNER_ANON_KEY";

fn default_request_timeout_secs() -> u64 {
    DEFAULT_REQUEST_TIMEOUT_SECS
}

/// Configuration at ~/.config/planner/config.toml
///
/// The session obtained at sign-in is stored next to it by the provider,
/// not here.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct PlannerConfig {
    /// Base URL of the hosted store (e.g. `https://xyz.supabase.co`)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub store_url: Option<Url>,

    /// Public key sent with every request
    #[serde(skip_serializing_if = "Option::is_none")]
    pub anon_key: Option<String>,

    /// Where the sign-up confirmation email sends the user
    #[serde(skip_serializing_if = "Option::is_none")]
    pub redirect_url: Option<Url>,

    /// Origin that invite links are built on
    #[serde(skip_serializing_if = "Option::is_none")]
    pub invite_base_url: Option<Url>,

    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

impl Default for PlannerConfig {
    fn default() -> Self {
        PlannerConfig {
            store_url: None,
            anon_key: None,
            redirect_url: None,
            invite_base_url: None,
            request_timeout_secs: DEFAULT_REQUEST_TIMEOUT_SECS,
        }
    }
}

impl PlannerConfig {
    pub fn config_dir() -> PlannerResult<PathBuf> {
        Ok(dirs::config_dir()
            .ok_or_else(|| PlannerError::Config("Could not determine config directory".into()))?
            .join("planner"))
    }

    pub fn config_path() -> PlannerResult<PathBuf> {
        Ok(Self::config_dir()?.join("config.toml"))
    }

    /// Load the config file (if any) and apply environment overrides.
    pub fn load() -> PlannerResult<Self> {
        let mut config = Self::load_from(&Self::config_path()?)?;
        config.apply_overrides(|key| std::env::var(key).ok())?;
        Ok(config)
    }

    /// A missing file yields the default config.
    pub fn load_from(path: &Path) -> PlannerResult<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path)?;
        toml::from_str(&content).map_err(|e| {
            PlannerError::Config(format!("Invalid config file {}: {}", path.display(), e))
        })
    }

    pub fn apply_overrides(
        &mut self,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> PlannerResult<()> {
        if let Some(url) = lookup(STORE_URL_ENV) {
            self.store_url = Some(Url::parse(&url).map_err(|e| {
                PlannerError::Config(format!("{} is not a valid URL: {}", STORE_URL_ENV, e))
            })?);
        }
        if let Some(key) = lookup(ANON_KEY_ENV) {
            self.anon_key = Some(key);
        }
        Ok(())
    }

    pub fn store_url(&self) -> PlannerResult<&Url> {
        self.store_url.as_ref().ok_or_else(|| {
            PlannerError::Config(format!(
                "No store_url configured. Set it in {} or via {}",
                Self::config_path()
                    .map(|p| p.display().to_string())
                    .unwrap_or_else(|_| "config.toml".into()),
                STORE_URL_ENV
            ))
        })
    }

    /// Confirmation target for sign-up: `redirect_url`, else the invite origin.
    pub fn redirect_url(&self) -> Option<&Url> {
        self.redirect_url.as_ref().or(self.invite_base_url.as_ref())
    }

    pub fn invite_base_url(&self) -> PlannerResult<&Url> {
        self.invite_base_url
            .as_ref()
            .ok_or_else(|| PlannerError::Config("No invite_base_url configured".into()))
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    /// Create a default config file with all options commented out.
    pub fn create_default_config(path: &Path) -> PlannerResult<()> {
        let contents = format!(
            "\
# planner configuration

# Hosted store and its public key (or set {STORE_URL_ENV} / {ANON_KEY_ENV}):
# store_url = \"https://your-project.supabase.co\"
# anon_key = \"...\"

# Where invite links and sign-up confirmations point:
# invite_base_url = \"https://planner.example\"
# redirect_url = \"https://planner.example/welcome\"

# Seconds before a store request is abandoned:
# request_timeout_secs = {DEFAULT_REQUEST_TIMEOUT_SECS}
"
        );

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| {
                PlannerError::Config(format!("Could not create config directory: {e}"))
            })?;
        }

        std::fs::write(path, contents)
            .map_err(|e| PlannerError::Config(format!("Could not write config file: {e}")))?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_file_is_default() {
        let dir = tempfile::tempdir().unwrap();
        let config = PlannerConfig::load_from(&dir.path().join("config.toml")).unwrap();
        assert!(config.store_url.is_none());
        assert_eq!(config.request_timeout(), Duration::from_secs(10));
        assert!(config.store_url().is_err());
    }

    #[test]
    fn test_default_config_file_parses_to_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested/config.toml");

        PlannerConfig::create_default_config(&path).unwrap();
        let config = PlannerConfig::load_from(&path).unwrap();

        assert!(config.store_url.is_none());
        assert_eq!(config.request_timeout_secs, 10);
    }

    #[test]
    fn test_file_values_and_env_overrides() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(
            &path,
            "store_url = \"https://file.example\"\nanon_key = \"file-key\"\ninvite_base_url = \"https://app.example\"\nrequest_timeout_secs = 3\n",
        )
        .unwrap();

        let mut config = PlannerConfig::load_from(&path).unwrap();
        assert_eq!(config.store_url().unwrap().as_str(), "https://file.example/");
        assert_eq!(config.request_timeout(), Duration::from_secs(3));
        assert_eq!(
            config.redirect_url().map(Url::as_str),
            Some("https://app.example/")
        );

        config
            .apply_overrides(|key| match key {
                STORE_URL_ENV => Some("https://env.example".into()),
                _ => None,
            })
            .unwrap();
        assert_eq!(config.store_url().unwrap().as_str(), "https://env.example/");
        assert_eq!(config.anon_key.as_deref(), Some("file-key"));
    }

    #[test]
    fn test_invalid_override_is_config_error() {
        let mut config = PlannerConfig::default();
        let result = config.apply_overrides(|key| {
            (key == STORE_URL_ENV).then(|| "not a url".to_string())
        });
        assert!(matches!(result, Err(PlannerError::Config(_))));
    }
}

//! Persists the signed-in session between CLI invocations.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

use planner_core::PlannerConfig;
use planner_core::auth::Session;

pub struct SessionFile {
    path: PathBuf,
}

impl SessionFile {
    /// `~/.config/planner/session.toml`
    pub fn default_location() -> Result<Self> {
        Ok(Self::at(PlannerConfig::config_dir()?.join("session.toml")))
    }

    pub fn at(path: impl Into<PathBuf>) -> Self {
        SessionFile { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn load(&self) -> Result<Option<Session>> {
        if !self.path.exists() {
            return Ok(None);
        }

        let contents = std::fs::read_to_string(&self.path)
            .with_context(|| format!("Failed to read session from {}", self.path.display()))?;

        let session: Session = toml::from_str(&contents)
            .with_context(|| format!("Failed to parse session from {}", self.path.display()))?;

        Ok(Some(session))
    }

    pub fn save(&self, session: &Session) -> Result<()> {
        let contents = toml::to_string_pretty(session).context("Failed to serialize session")?;

        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create directory {}", parent.display()))?;
        }

        std::fs::write(&self.path, contents)
            .with_context(|| format!("Failed to write session to {}", self.path.display()))?;

        // Owner-only (0600): the file holds access tokens
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            std::fs::set_permissions(&self.path, std::fs::Permissions::from_mode(0o600))
                .with_context(|| format!("Failed to set permissions on {}", self.path.display()))?;
        }

        Ok(())
    }

    pub fn clear(&self) -> Result<()> {
        if self.path.exists() {
            std::fs::remove_file(&self.path)
                .with_context(|| format!("Failed to remove {}", self.path.display()))?;
        }
        Ok(())
    }
}

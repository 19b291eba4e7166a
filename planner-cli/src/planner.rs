//! A signed-in, loaded planner for one CLI invocation.

use anyhow::{Context, Result};
use indicatif::{ProgressBar, ProgressStyle};
use owo_colors::OwoColorize;
use tracing::debug;

use planner_core::auth::IdentityProvider;
use planner_core::{AuthError, EventWithAttendees, Guest, PlannerConfig, Store, Synchronizer};
use planner_provider_postgrest::{Endpoint, RestAuth, RestStore, SessionFile};

use crate::resolve;

pub struct Planner {
    pub config: PlannerConfig,
    sync: Synchronizer,
}

/// Config plus identity, for commands that only talk to the auth service.
pub fn auth() -> Result<(PlannerConfig, RestAuth)> {
    let config = PlannerConfig::load()?;
    let endpoint = Endpoint::from_config(&config)?;
    let auth = RestAuth::new(endpoint, SessionFile::default_location()?)?;
    Ok((config, auth))
}

impl Planner {
    /// Load config and the saved session, then fetch everything.
    pub async fn open() -> Result<Self> {
        let (config, auth) = auth()?;
        let session = auth
            .session()
            .await
            .ok_or(AuthError::NoSession)
            .context("Run `planner login` first")?;
        debug!(email = %session.email, "using saved session");

        let endpoint = Endpoint::from_config(&config)?;
        let store = Store::new(RestStore::new(endpoint, Some(&session)));
        let mut sync = Synchronizer::new(store);

        let spinner = spinner("Loading");
        let report = sync.load().await;
        spinner.finish_and_clear();

        for (collection, error) in &report.failures {
            eprintln!(
                "{} could not load {}: {}",
                "warning:".yellow(),
                collection,
                error
            );
        }

        Ok(Planner { config, sync })
    }

    pub fn sync(&self) -> &Synchronizer {
        &self.sync
    }

    pub fn sync_mut(&mut self) -> &mut Synchronizer {
        &mut self.sync
    }

    pub fn guest(&self, query: &str) -> Result<&Guest> {
        resolve::guest(self.sync.guests(), query)
    }

    pub fn event(&self, query: &str) -> Result<&EventWithAttendees> {
        resolve::event(self.sync.events(), query)
    }

    /// Wait for outstanding writes; fails if any of them did.
    pub async fn finish(mut self) -> Result<()> {
        self.sync.settle().await;

        let failed = self.sync.stats().failed();
        if failed > 0 {
            anyhow::bail!(
                "{} of {} store writes failed; run `planner list` to see what was saved",
                failed,
                self.sync.stats().dispatched()
            );
        }
        Ok(())
    }
}

fn spinner(message: &str) -> ProgressBar {
    let spinner = ProgressBar::new_spinner();
    if let Ok(style) = ProgressStyle::default_spinner()
        .tick_strings(&["-", "\\", "|", "/"])
        .template("{msg} {spinner}")
    {
        spinner.set_style(style);
    }
    spinner.set_message(message.to_string());
    spinner.enable_steady_tick(std::time::Duration::from_millis(80));
    spinner
}

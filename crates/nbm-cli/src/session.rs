use std::sync::Arc;

use color_eyre::eyre::{Result, WrapErr};
use nbm_session::{
    BrowserAcquirer, ChromeLauncher, CredentialStore, FileCredentialStore, RequestPipeline,
    SessionBootstrap, SessionConfig, StartupOutcome,
};
use tracing::debug;

use crate::command::{Cli, CommandResult};

/// Settings shared by every subcommand
pub struct SessionContext {
    config: SessionConfig,
    store: FileCredentialStore,
}

impl SessionContext {
    pub fn new(cli: &Cli) -> Result<Self> {
        let mut config = match &cli.config {
            Some(path) => SessionConfig::from_file(path)
                .wrap_err_with(|| format!("Failed to load config from {}", path.display()))?,
            None => SessionConfig::default(),
        };
        if let Some(timeout) = cli.timeout {
            config.navigation_timeout_secs = timeout;
            config.validate().wrap_err("Invalid --timeout")?;
        }

        let store = match &cli.store {
            Some(path) => FileCredentialStore::new(path),
            None => FileCredentialStore::open_default()?,
        };
        debug!(store = %store.path().display(), "Resolved credential store");

        Ok(Self { config, store })
    }

    async fn startup(self, pipeline: &RequestPipeline) -> Result<StartupOutcome> {
        let acquirer = BrowserAcquirer::new(
            ChromeLauncher::new(self.config.browser_path.clone()),
            &self.config,
        );

        let outcome = SessionBootstrap::new(self.store, acquirer)
            .startup(pipeline, &self.config)
            .await?;
        Ok(outcome)
    }

    pub async fn bootstrap(self) -> CommandResult {
        let pipeline = RequestPipeline::new();

        Ok(match self.startup(&pipeline).await? {
            StartupOutcome::Installed(_) => "Session interceptor installed".to_string(),
            StartupOutcome::Unauthenticated => {
                "No session available, requests will be sent unmodified".to_string()
            }
        })
    }

    pub async fn fetch(self, url: &str) -> CommandResult {
        let pipeline = Arc::new(RequestPipeline::new());
        let client = pipeline.client(reqwest::Client::builder().build()?);

        self.startup(&pipeline).await?;

        let response = client
            .get(url)
            .send()
            .await
            .wrap_err_with(|| format!("Request to {url} failed"))?;

        Ok(format!("{:?} {}", response.version(), response.status()))
    }

    pub async fn status(self) -> CommandResult {
        let path = self.store.path().display().to_string();

        Ok(match self.store.load().await? {
            Some(credential) => format!("Credential cached at {path} ({} bytes)", credential.len()),
            None => format!("No credential cached at {path}"),
        })
    }

    pub async fn clear(self) -> CommandResult {
        Ok(if self.store.clear().await? {
            "Cleared cached credential".to_string()
        } else {
            "No cached credential to clear".to_string()
        })
    }
}

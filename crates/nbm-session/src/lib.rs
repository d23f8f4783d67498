//! Session bootstrap for the NB Music desktop client
//!
//! This crate obtains session cookies for the video platform by driving a headless browser
//! once, caches the resulting credential on disk, and rewrites outbound requests bound for the
//! platform's hosts so they carry the credential, a referer and a browser user agent.
//!
//! The startup sequence is:
//!
//! 1. [`SessionBootstrap::bootstrap`] resolves a [`Credential`] from the [`CredentialStore`], or
//!    acquires a fresh one through a [`CredentialAcquirer`] on a cache miss.
//! 2. [`RequestPipeline::install`] registers a [`RequestInterceptor`] for a non-empty credential.
//! 3. Every client built from the [`RequestPipeline`] has matching requests rewritten in flight.
//!
//! [`SessionBootstrap::startup`] runs both steps.

#![deny(missing_docs)]

mod acquirer;
mod bootstrap;
mod browser;
mod config;
mod cookie;
mod interceptor;
mod pipeline;
mod store;

pub use acquirer::{AcquireCookieError, CredentialAcquirer};
pub use bootstrap::{SessionBootstrap, StartupOutcome};
pub use browser::{BrowserAcquirer, BrowserLauncher, BrowserSession, ChromeLauncher, ChromeSession};
pub use config::{
    ConfigError, DEFAULT_ROOT_URL, DEFAULT_USER_AGENT, DomainAllowList, MAX_NAVIGATION_TIMEOUT_SECS,
    SessionConfig,
};
pub use cookie::{CookieRecord, Credential, format_credential};
pub use interceptor::RequestInterceptor;
pub use pipeline::{PipelineError, PipelineMiddleware, RequestPipeline};
pub use store::{
    CREDENTIAL_KEY, CredentialStore, CredentialStoreError, FileCredentialStore,
    InMemoryCredentialStore,
};

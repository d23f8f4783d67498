use std::{fmt::Display, time::Duration};

use thiserror::Error;

use crate::{CookieRecord, Credential, format_credential};

/// Errors that can occur during cookie acquisition
///
/// Launch, navigation and cookie read failures are collapsed into a single error carrying the
/// underlying cause, since the caller only needs to know whether a credential was obtained.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("Cookie acquisition failed: {message}")]
pub struct AcquireCookieError {
    message: String,
}

impl AcquireCookieError {
    /// Creates an error from any cause
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    /// The browser engine could not be started
    pub fn launch(cause: impl Display) -> Self {
        Self::new(format!("browser launch failed: {cause}"))
    }

    /// The page could not be opened or did not finish navigating
    pub fn navigation(cause: impl Display) -> Self {
        Self::new(format!("navigation failed: {cause}"))
    }

    /// The cookie jar could not be read from the page
    pub fn cookie_read(cause: impl Display) -> Self {
        Self::new(format!("reading cookies failed: {cause}"))
    }

    /// The acquisition attempt did not complete within `limit`
    pub fn timed_out(limit: Duration) -> Self {
        Self::new(format!("timed out after {}s", limit.as_secs_f32()))
    }

    /// Description of the underlying cause
    pub fn message(&self) -> &str {
        &self.message
    }
}

/// Source of fresh session cookies
///
/// The production implementation is [`crate::BrowserAcquirer`], which drives a headless browser.
/// Hosts and tests may provide their own.
#[async_trait::async_trait]
pub trait CredentialAcquirer: Send + Sync {
    /// Harvests the cookies set by the platform for a fresh, unauthenticated visitor
    ///
    /// Cookies are returned in the order the engine reports them.
    async fn acquire_cookies(&self) -> Result<Vec<CookieRecord>, AcquireCookieError>;

    /// Harvests cookies and formats them into a [`Credential`]
    async fn acquire(&self) -> Result<Credential, AcquireCookieError> {
        let cookies = self.acquire_cookies().await?;
        Ok(format_credential(&cookies))
    }
}

//! Cookie acquisition through a headless browser
//!
//! Some session cookies are only set by scripts running in a real browser, so a plain HTTP client
//! cannot obtain them. [`BrowserAcquirer`] launches a throwaway browser, visits the platform's
//! landing page, reads the page's cookies and shuts the browser down again.

use std::{path::PathBuf, sync::Arc, time::Duration};

use headless_chrome::{Browser, LaunchOptions};
use tracing::{debug, info};

use crate::{AcquireCookieError, CookieRecord, CredentialAcquirer, SessionConfig};

/// Extra time granted on top of the navigation timeout for starting and stopping the browser.
const LAUNCH_ALLOWANCE: Duration = Duration::from_secs(20);

/// Starts browser instances for a single acquisition
pub trait BrowserLauncher: Send + Sync + 'static {
    /// The running instance
    type Session: BrowserSession;

    /// Starts a fresh, isolated, headless instance with no persisted profile
    fn launch(&self) -> Result<Self::Session, AcquireCookieError>;
}

/// A running browser instance
///
/// Methods are blocking; [`BrowserAcquirer`] calls them from tokio's blocking pool.
pub trait BrowserSession: Send + 'static {
    /// Opens one page, navigates it to `url`, waits at most `timeout` for navigation to settle
    /// and returns every cookie visible to the page
    fn collect_cookies(
        &mut self,
        url: &str,
        timeout: Duration,
    ) -> Result<Vec<CookieRecord>, AcquireCookieError>;

    /// Shuts the instance down
    fn terminate(self);
}

/// [`CredentialAcquirer`] driving a browser through a [`BrowserLauncher`]
///
/// Each call to [`acquire_cookies`](CredentialAcquirer::acquire_cookies) launches one instance and
/// terminates it exactly once, whether or not navigation and cookie retrieval succeed.
pub struct BrowserAcquirer<L: BrowserLauncher> {
    launcher: Arc<L>,
    root_url: String,
    navigation_timeout: Duration,
    attempt_timeout: Duration,
}

impl<L: BrowserLauncher> BrowserAcquirer<L> {
    /// Creates an acquirer visiting the configured root URL
    pub fn new(launcher: L, config: &SessionConfig) -> Self {
        let navigation_timeout = config.navigation_timeout();
        Self {
            launcher: Arc::new(launcher),
            root_url: config.root_url.clone(),
            navigation_timeout,
            attempt_timeout: navigation_timeout.saturating_add(LAUNCH_ALLOWANCE),
        }
    }

    /// Overrides the bound on a whole attempt, launch and shutdown included
    pub fn with_attempt_timeout(mut self, timeout: Duration) -> Self {
        self.attempt_timeout = timeout;
        self
    }
}

#[async_trait::async_trait]
impl<L: BrowserLauncher> CredentialAcquirer for BrowserAcquirer<L> {
    async fn acquire_cookies(&self) -> Result<Vec<CookieRecord>, AcquireCookieError> {
        let launcher = Arc::clone(&self.launcher);
        let url = self.root_url.clone();
        let navigation_timeout = self.navigation_timeout;

        let attempt = tokio::task::spawn_blocking(move || {
            run_scoped(launcher.as_ref(), &url, navigation_timeout)
        });

        // On timeout the blocking task keeps running and still terminates its instance once the
        // engine calls return.
        match tokio::time::timeout(self.attempt_timeout, attempt).await {
            Ok(Ok(result)) => result,
            Ok(Err(join_error)) => Err(AcquireCookieError::new(format!(
                "browser task failed: {join_error}"
            ))),
            Err(_) => Err(AcquireCookieError::timed_out(self.attempt_timeout)),
        }
    }
}

fn run_scoped<L: BrowserLauncher>(
    launcher: &L,
    url: &str,
    navigation_timeout: Duration,
) -> Result<Vec<CookieRecord>, AcquireCookieError> {
    let mut session = ScopedSession(Some(launcher.launch()?));
    session.collect_cookies(url, navigation_timeout)
}

/// Terminates the wrapped session when dropped, including while unwinding
struct ScopedSession<S: BrowserSession>(Option<S>);

impl<S: BrowserSession> ScopedSession<S> {
    fn collect_cookies(
        &mut self,
        url: &str,
        timeout: Duration,
    ) -> Result<Vec<CookieRecord>, AcquireCookieError> {
        match self.0.as_mut() {
            Some(session) => session.collect_cookies(url, timeout),
            None => Err(AcquireCookieError::new("browser session already terminated")),
        }
    }
}

impl<S: BrowserSession> Drop for ScopedSession<S> {
    fn drop(&mut self) {
        if let Some(session) = self.0.take() {
            session.terminate();
        }
    }
}

/// [`BrowserLauncher`] for Chrome and Chromium, backed by `headless_chrome`
#[derive(Debug, Clone, Default)]
pub struct ChromeLauncher {
    executable: Option<PathBuf>,
}

impl ChromeLauncher {
    /// Creates a launcher. When `executable` is `None` the browser is auto-detected.
    pub fn new(executable: Option<PathBuf>) -> Self {
        Self { executable }
    }
}

impl BrowserLauncher for ChromeLauncher {
    type Session = ChromeSession;

    fn launch(&self) -> Result<ChromeSession, AcquireCookieError> {
        // No user_data_dir: the engine creates a temporary profile and removes it on exit.
        let options = LaunchOptions::default_builder()
            .headless(true)
            .path(self.executable.clone())
            .build()
            .map_err(AcquireCookieError::launch)?;

        let browser = Browser::new(options).map_err(AcquireCookieError::launch)?;
        debug!(pid = ?browser.get_process_id(), "Launched headless browser");

        Ok(ChromeSession { browser })
    }
}

/// A running Chrome instance
///
/// The browser process is killed when the session is terminated or dropped.
pub struct ChromeSession {
    browser: Browser,
}

impl BrowserSession for ChromeSession {
    fn collect_cookies(
        &mut self,
        url: &str,
        timeout: Duration,
    ) -> Result<Vec<CookieRecord>, AcquireCookieError> {
        let tab = self
            .browser
            .new_tab()
            .map_err(AcquireCookieError::navigation)?;
        tab.set_default_timeout(timeout);

        tab.navigate_to(url)
            .and_then(|tab| tab.wait_until_navigated())
            .map_err(AcquireCookieError::navigation)?;

        let cookies = tab.get_cookies().map_err(AcquireCookieError::cookie_read)?;
        info!(count = cookies.len(), "Harvested cookies from landing page");

        Ok(cookies
            .into_iter()
            .map(|cookie| CookieRecord::new(cookie.name, cookie.value))
            .collect())
    }

    fn terminate(self) {
        let pid = self.browser.get_process_id();
        drop(self.browser);
        debug!(?pid, "Terminated headless browser");
    }
}

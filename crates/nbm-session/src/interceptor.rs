//! Domain-scoped request rewriting

use std::sync::{Arc, RwLock};

use http::{HeaderValue, header};
use tracing::{debug, warn};

use crate::{Credential, DomainAllowList, PipelineError, SessionConfig};

/// Rewrites requests bound for the platform's hosts
///
/// Matching requests get the `cookie`, `referer` and `user-agent` headers set, replacing any
/// value already present. All other requests are left untouched.
///
/// The credential sits in a shared cell that is read on every request, so
/// [`replace_credential`](Self::replace_credential) takes effect for requests sent afterwards.
pub struct RequestInterceptor {
    credential: Arc<RwLock<Credential>>,
    allowed_domains: DomainAllowList,
    referer: HeaderValue,
    user_agent: HeaderValue,
}

impl RequestInterceptor {
    /// Creates an interceptor injecting `credential` into requests for the configured domains
    pub fn new(credential: Credential, config: &SessionConfig) -> Result<Self, PipelineError> {
        Ok(Self {
            credential: Arc::new(RwLock::new(credential)),
            allowed_domains: config.allowed_domains.clone(),
            referer: HeaderValue::from_str(&config.root_url)?,
            user_agent: HeaderValue::from_str(&config.user_agent)?,
        })
    }

    /// Returns true when requests to `host` are rewritten
    pub fn matches(&self, host: &str) -> bool {
        self.allowed_domains.matches(host)
    }

    /// Rewrites the request when its host is allowed. Returns whether it was rewritten.
    ///
    /// Never fails. A credential that is not a valid header value is skipped with a warning while
    /// the other headers are still applied.
    pub fn apply(&self, req: &mut reqwest::Request) -> bool {
        let Some(host) = req.url().host_str() else {
            debug!("No host in request URL, leaving request untouched");
            return false;
        };

        if !self.matches(host) {
            debug!(host, "Host not in allow-list, leaving request untouched");
            return false;
        }

        let cookie = {
            let credential = self
                .credential
                .read()
                .unwrap_or_else(|poisoned| poisoned.into_inner());
            HeaderValue::from_str(credential.as_str())
        };

        let headers = req.headers_mut();
        match cookie {
            Ok(mut value) => {
                value.set_sensitive(true);
                headers.insert(header::COOKIE, value);
            }
            Err(_) => warn!("Credential is not a valid header value, sending without cookie"),
        }
        headers.insert(header::REFERER, self.referer.clone());
        headers.insert(header::USER_AGENT, self.user_agent.clone());

        true
    }

    /// Replaces the injected credential for all subsequent requests
    pub fn replace_credential(&self, credential: Credential) {
        let mut current = self
            .credential
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        *current = credential;
        debug!(len = current.len(), "Replaced injected credential");
    }
}

impl std::fmt::Debug for RequestInterceptor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RequestInterceptor")
            .field("allowed_domains", &self.allowed_domains)
            .field("referer", &self.referer)
            .finish_non_exhaustive()
    }
}

//! The shared outbound request layer
//!
//! [`RequestPipeline`] plays the role of the host's network stack. Clients built from it carry a
//! [`PipelineMiddleware`] that looks up the installed [`RequestInterceptor`] at send time, so a
//! client created before [`RequestPipeline::install`] starts rewriting requests once the
//! interceptor is registered.

use std::sync::{Arc, OnceLock};

use reqwest_middleware::{ClientBuilder, ClientWithMiddleware, Middleware, Next};
use thiserror::Error;
use tracing::{debug, info};

use crate::{Credential, RequestInterceptor, SessionConfig};

/// Errors raised while registering the request interceptor
#[derive(Debug, Error)]
pub enum PipelineError {
    /// An interceptor is already registered for this pipeline
    #[error("A request interceptor is already installed")]
    AlreadyInstalled,

    /// The configured referer or user agent cannot be sent as a header
    #[error(transparent)]
    InvalidHeaderValue(#[from] http::header::InvalidHeaderValue),
}

/// Outbound request layer with at most one [`RequestInterceptor`]
#[derive(Debug, Default)]
pub struct RequestPipeline {
    interceptor: OnceLock<Arc<RequestInterceptor>>,
}

impl RequestPipeline {
    /// Creates a pipeline without an interceptor
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers an interceptor injecting `credential`
    ///
    /// An empty credential registers nothing and returns `Ok(None)`. Registration happens at most
    /// once; later calls fail with [`PipelineError::AlreadyInstalled`].
    pub fn install(
        &self,
        credential: Credential,
        config: &SessionConfig,
    ) -> Result<Option<Arc<RequestInterceptor>>, PipelineError> {
        if credential.is_empty() {
            debug!("Empty credential, not installing request interceptor");
            return Ok(None);
        }

        if self.interceptor.get().is_some() {
            return Err(PipelineError::AlreadyInstalled);
        }

        let interceptor = Arc::new(RequestInterceptor::new(credential, config)?);
        self.interceptor
            .set(Arc::clone(&interceptor))
            .map_err(|_| PipelineError::AlreadyInstalled)?;

        info!(
            domains = ?config.allowed_domains.patterns(),
            "Installed request interceptor"
        );
        Ok(Some(interceptor))
    }

    /// The registered interceptor, if any
    pub fn interceptor(&self) -> Option<&Arc<RequestInterceptor>> {
        self.interceptor.get()
    }

    /// Returns true once an interceptor is registered
    pub fn is_installed(&self) -> bool {
        self.interceptor.get().is_some()
    }

    /// Middleware consulting this pipeline, for hosts assembling their own client chain
    pub fn middleware(self: &Arc<Self>) -> PipelineMiddleware {
        PipelineMiddleware {
            pipeline: Arc::clone(self),
        }
    }

    /// Wraps `client` so that its requests pass through this pipeline
    pub fn client(self: &Arc<Self>, client: reqwest::Client) -> ClientWithMiddleware {
        ClientBuilder::new(client).with(self.middleware()).build()
    }
}

/// [`Middleware`] applying the pipeline's interceptor to each request
pub struct PipelineMiddleware {
    pipeline: Arc<RequestPipeline>,
}

#[async_trait::async_trait]
impl Middleware for PipelineMiddleware {
    async fn handle(
        &self,
        mut req: reqwest::Request,
        ext: &mut http::Extensions,
        next: Next<'_>,
    ) -> Result<reqwest::Response, reqwest_middleware::Error> {
        match self.pipeline.interceptor() {
            Some(interceptor) => {
                if interceptor.apply(&mut req) {
                    debug!(url = %req.url(), "Attached session headers");
                }
            }
            None => debug!("No request interceptor installed, passing request through"),
        }

        next.run(req, ext).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::DomainAllowList;

    fn config() -> SessionConfig {
        SessionConfig {
            allowed_domains: DomainAllowList::new(["example.com"]),
            ..Default::default()
        }
    }

    #[test]
    fn empty_credential_installs_nothing() {
        let pipeline = RequestPipeline::new();

        let installed = pipeline.install(Credential::default(), &config()).unwrap();

        assert!(installed.is_none());
        assert!(!pipeline.is_installed());
    }

    #[test]
    fn install_registers_interceptor() {
        let pipeline = RequestPipeline::new();

        let installed = pipeline
            .install(Credential::from("sid=xyz"), &config())
            .unwrap()
            .unwrap();

        assert!(pipeline.is_installed());
        assert!(Arc::ptr_eq(&installed, pipeline.interceptor().unwrap()));
        assert!(installed.matches("video.example.com"));
    }

    #[test]
    fn second_install_is_rejected() {
        let pipeline = RequestPipeline::new();
        pipeline
            .install(Credential::from("sid=xyz"), &config())
            .unwrap();

        let result = pipeline.install(Credential::from("sid=other"), &config());

        assert!(matches!(result, Err(PipelineError::AlreadyInstalled)));
    }

    #[test]
    fn empty_credential_after_install_is_not_an_error() {
        let pipeline = RequestPipeline::new();
        pipeline
            .install(Credential::from("sid=xyz"), &config())
            .unwrap();

        assert!(
            pipeline
                .install(Credential::default(), &config())
                .unwrap()
                .is_none()
        );
    }

    #[test]
    fn invalid_referer_does_not_register() {
        let pipeline = RequestPipeline::new();
        let config = SessionConfig {
            root_url: "https://example.com/\n".to_string(),
            ..config()
        };

        let result = pipeline.install(Credential::from("sid=xyz"), &config);

        assert!(matches!(result, Err(PipelineError::InvalidHeaderValue(_))));
        assert!(!pipeline.is_installed());
    }
}

use std::sync::Arc;

use tracing::{info, warn};

use crate::{
    Credential, CredentialAcquirer, CredentialStore, PipelineError, RequestInterceptor,
    RequestPipeline, SessionConfig,
};

/// Result of [`SessionBootstrap::startup`]
#[derive(Debug, Clone)]
pub enum StartupOutcome {
    /// A credential was resolved and the interceptor is registered
    Installed(Arc<RequestInterceptor>),
    /// No credential could be obtained; requests go out unmodified
    Unauthenticated,
}

impl StartupOutcome {
    /// Returns true when the interceptor was registered
    pub fn is_installed(&self) -> bool {
        matches!(self, Self::Installed(_))
    }
}

/// Resolves the session credential from cache, acquiring a fresh one when needed
pub struct SessionBootstrap<S, A>
where
    S: CredentialStore,
    A: CredentialAcquirer,
{
    store: S,
    acquirer: A,
}

impl<S, A> SessionBootstrap<S, A>
where
    S: CredentialStore,
    A: CredentialAcquirer,
{
    /// Creates a bootstrap over a store and an acquirer
    pub fn new(store: S, acquirer: A) -> Self {
        Self { store, acquirer }
    }

    /// The credential store
    pub fn store(&self) -> &S {
        &self.store
    }

    /// The credential acquirer
    pub fn acquirer(&self) -> &A {
        &self.acquirer
    }

    /// Returns the cached credential, or acquires and caches a fresh one
    ///
    /// Never fails: when neither the cache nor the acquirer yields a credential the result is
    /// empty and nothing is written. A cached credential is returned as is; expiry is not
    /// checked.
    pub async fn bootstrap(&self) -> Credential {
        match self.store.load().await {
            Ok(Some(credential)) if !credential.is_empty() => {
                info!("Using cached session credential");
                return credential;
            }
            Ok(_) => {}
            Err(e) => warn!("Failed to read cached credential, acquiring a fresh one: {e}"),
        }

        let credential = match self.acquirer.acquire().await {
            Ok(credential) if credential.is_empty() => {
                warn!("Acquisition returned no cookies, continuing without a session");
                return Credential::default();
            }
            Ok(credential) => credential,
            Err(e) => {
                warn!("{e}, continuing without a session");
                return Credential::default();
            }
        };

        info!(len = credential.len(), "Acquired session credential");

        if let Err(e) = self.store.save(credential.clone()).await {
            warn!("Failed to cache session credential: {e}");
        }

        credential
    }

    /// Runs [`bootstrap`](Self::bootstrap) and registers the interceptor for a non-empty result
    pub async fn startup(
        &self,
        pipeline: &RequestPipeline,
        config: &SessionConfig,
    ) -> Result<StartupOutcome, PipelineError> {
        let credential = self.bootstrap().await;

        Ok(match pipeline.install(credential, config)? {
            Some(interceptor) => StartupOutcome::Installed(interceptor),
            None => {
                info!("No session credential, requests will be sent unmodified");
                StartupOutcome::Unauthenticated
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;
    use crate::{
        AcquireCookieError, CookieRecord, CredentialStoreError, DomainAllowList,
        InMemoryCredentialStore,
    };

    struct FakeAcquirer {
        result: Result<Vec<CookieRecord>, AcquireCookieError>,
        calls: AtomicUsize,
    }

    impl FakeAcquirer {
        fn returning(cookies: Vec<CookieRecord>) -> Self {
            Self {
                result: Ok(cookies),
                calls: AtomicUsize::new(0),
            }
        }

        fn failing() -> Self {
            Self {
                result: Err(AcquireCookieError::navigation("net::ERR_CONNECTION_REFUSED")),
                calls: AtomicUsize::new(0),
            }
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait::async_trait]
    impl CredentialAcquirer for FakeAcquirer {
        async fn acquire_cookies(&self) -> Result<Vec<CookieRecord>, AcquireCookieError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.result.clone()
        }
    }

    /// Store whose reads and writes always fail
    struct BrokenStore;

    #[async_trait::async_trait]
    impl CredentialStore for BrokenStore {
        async fn load(&self) -> Result<Option<Credential>, CredentialStoreError> {
            Err(CredentialStoreError::ConfigDirUnavailable)
        }

        async fn save(&self, _credential: Credential) -> Result<(), CredentialStoreError> {
            Err(CredentialStoreError::ConfigDirUnavailable)
        }

        async fn clear(&self) -> Result<bool, CredentialStoreError> {
            Err(CredentialStoreError::ConfigDirUnavailable)
        }
    }

    fn config() -> SessionConfig {
        SessionConfig {
            allowed_domains: DomainAllowList::new(["example.com"]),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn cached_credential_skips_acquisition() {
        let store = InMemoryCredentialStore::with_credential(Credential::from("sid=cached"));
        let bootstrap =
            SessionBootstrap::new(store, FakeAcquirer::returning(vec![CookieRecord::new("a", "1")]));

        let first = bootstrap.bootstrap().await;
        let second = bootstrap.bootstrap().await;

        assert_eq!(first.as_str(), "sid=cached");
        assert_eq!(second.as_str(), "sid=cached");
        assert_eq!(bootstrap.acquirer().calls(), 0);
    }

    #[tokio::test]
    async fn cache_miss_acquires_and_persists() {
        let bootstrap = SessionBootstrap::new(
            InMemoryCredentialStore::new(),
            FakeAcquirer::returning(vec![CookieRecord::new("sid", "xyz")]),
        );

        let credential = bootstrap.bootstrap().await;

        assert_eq!(credential.as_str(), "sid=xyz");
        assert_eq!(
            bootstrap.store().load().await.unwrap(),
            Some(Credential::from("sid=xyz"))
        );

        bootstrap.bootstrap().await;
        assert_eq!(bootstrap.acquirer().calls(), 1);
    }

    #[tokio::test]
    async fn failed_acquisition_returns_empty_and_writes_nothing() {
        let bootstrap = SessionBootstrap::new(InMemoryCredentialStore::new(), FakeAcquirer::failing());

        let credential = bootstrap.bootstrap().await;

        assert!(credential.is_empty());
        assert_eq!(bootstrap.store().load().await.unwrap(), None);
    }

    #[tokio::test]
    async fn empty_acquisition_returns_empty_and_writes_nothing() {
        let bootstrap =
            SessionBootstrap::new(InMemoryCredentialStore::new(), FakeAcquirer::returning(vec![]));

        let credential = bootstrap.bootstrap().await;

        assert!(credential.is_empty());
        assert_eq!(bootstrap.store().load().await.unwrap(), None);
    }

    #[tokio::test]
    async fn failed_attempts_are_retried_on_next_bootstrap() {
        let bootstrap = SessionBootstrap::new(InMemoryCredentialStore::new(), FakeAcquirer::failing());

        bootstrap.bootstrap().await;
        bootstrap.bootstrap().await;

        assert_eq!(bootstrap.acquirer().calls(), 2);
    }

    #[tokio::test]
    async fn broken_store_still_yields_acquired_credential() {
        let bootstrap = SessionBootstrap::new(
            BrokenStore,
            FakeAcquirer::returning(vec![CookieRecord::new("sid", "xyz")]),
        );

        let credential = bootstrap.bootstrap().await;

        assert_eq!(credential.as_str(), "sid=xyz");
        assert_eq!(bootstrap.acquirer().calls(), 1);
    }

    #[tokio::test]
    async fn startup_installs_interceptor_for_credential() {
        let pipeline = RequestPipeline::new();
        let bootstrap = SessionBootstrap::new(
            InMemoryCredentialStore::new(),
            FakeAcquirer::returning(vec![CookieRecord::new("sid", "xyz")]),
        );

        let outcome = bootstrap.startup(&pipeline, &config()).await.unwrap();

        assert!(outcome.is_installed());
        assert!(pipeline.is_installed());
    }

    #[tokio::test]
    async fn startup_without_credential_is_unauthenticated() {
        let pipeline = RequestPipeline::new();
        let bootstrap = SessionBootstrap::new(InMemoryCredentialStore::new(), FakeAcquirer::failing());

        let outcome = bootstrap.startup(&pipeline, &config()).await.unwrap();

        assert!(matches!(outcome, StartupOutcome::Unauthenticated));
        assert!(!pipeline.is_installed());
    }
}

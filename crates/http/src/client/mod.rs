//! Autobid HTTP client
//!
//! [`ApiClient`] is the gateway every backend call goes through. Each call is
//! described by a [`PendingRequest`] and runs through four stages:
//!
//! 1. attach the session's access token as a bearer token, if there is one;
//! 2. dispatch;
//! 3. on the first 401 only, refresh the session and dispatch once more with
//!    the new token, or, if the refresh fails, log out, send the user to the
//!    login entry point and fail with the refresh error;
//! 4. return the result; every other failure is passed through unchanged.

pub mod auth;
pub mod bids;
pub mod config;
pub mod error;
pub mod listings;
pub mod navigation;
pub mod public;
pub mod request;
pub mod session;

use autobid_core::{KeyValueStore, MemoryStore};
use serde::de::DeserializeOwned;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

use config::ClientConfig;
use error::ClientError;
use navigation::{Navigator, NoopNavigator};
use public::{PublicClient, decode_json};
use request::PendingRequest;
use session::{RefreshRole, SessionStore};

/// Progress of one logical call through the pipeline
///
/// `PendingAfterRefresh` is only reachable from `Pending`, and only once.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallState {
    Pending,
    PendingAfterRefresh,
    Success,
    Failed,
}

impl CallState {
    fn advance(self, next: Self) -> Self {
        debug!(from = ?self, to = ?next, "call state");
        next
    }

    /// Log the terminal transition for `result`
    fn settle<T>(self, result: &Result<T, ClientError>) {
        let next = if result.is_ok() {
            Self::Success
        } else {
            Self::Failed
        };
        debug!(from = ?self, to = ?next, "call settled");
    }
}

/// Authenticated API client with retry-after-refresh
#[derive(Clone)]
pub struct ApiClient {
    transport: PublicClient,
    session: SessionStore,
    navigator: Arc<dyn Navigator>,
}

impl ApiClient {
    /// Create a new client builder
    pub fn builder() -> ApiClientBuilder {
        ApiClientBuilder::default()
    }

    /// Assemble a client from parts that are already built
    pub fn from_parts(
        transport: PublicClient,
        session: SessionStore,
        navigator: Arc<dyn Navigator>,
    ) -> Self {
        Self {
            transport,
            session,
            navigator,
        }
    }

    /// Get the base URL
    pub fn base_url(&self) -> &str {
        self.transport.base_url()
    }

    /// The session this client authenticates with
    pub const fn session(&self) -> &SessionStore {
        &self.session
    }

    /// The unauthenticated transport underneath
    pub const fn public(&self) -> &PublicClient {
        &self.transport
    }

    /// Run `request` through the pipeline and return the raw success response
    pub async fn send(&self, request: &PendingRequest) -> Result<reqwest::Response, ClientError> {
        let mut state = CallState::Pending;
        loop {
            let token = self.session.current_access_token().await;
            let result = self.transport.dispatch(request, token.as_deref()).await;
            match (state, result) {
                (CallState::Pending, Err(ClientError::Unauthorized(reason))) => {
                    state = state.advance(CallState::PendingAfterRefresh);
                    info!(
                        method = %request.method,
                        target = %request.target(),
                        %reason,
                        "request unauthorized; refreshing session before retrying once"
                    );
                    if let Err(err) = self.refresh_or_logout().await {
                        let failed = Err(err);
                        state.settle(&failed);
                        return failed;
                    }
                    debug!(method = %request.method, target = %request.target(), attempt = 2, "retrying with refreshed token");
                }
                (_, result) => {
                    state.settle(&result);
                    return result;
                }
            }
        }
    }

    /// Refresh the session; on failure log out and navigate to login
    ///
    /// Callers that joined a refresh already in flight leave the logout and
    /// the navigation to the caller that started it, so one failed refresh
    /// redirects once.
    async fn refresh_or_logout(&self) -> Result<(), ClientError> {
        let (role, result) = self.session.coalesced_refresh().await;
        if let Err(err) = &result {
            if role == RefreshRole::Started {
                warn!(error = %err, "session refresh failed; logging out");
                self.session.logout().await;
                self.navigator.to_login();
            } else {
                debug!(error = %err, "joined refresh failed");
            }
        }
        result
    }

    /// Run `request` and decode the JSON response
    pub async fn execute<T: DeserializeOwned>(
        &self,
        request: &PendingRequest,
    ) -> Result<T, ClientError> {
        decode_json(self.send(request).await?).await
    }

    /// Run `request` and discard the response body
    pub async fn execute_empty(&self, request: &PendingRequest) -> Result<(), ClientError> {
        self.send(request).await?;
        Ok(())
    }
}

/// Builder for [`ApiClient`]
#[derive(Default)]
pub struct ApiClientBuilder {
    config: Option<ClientConfig>,
    base_url: Option<String>,
    timeout: Option<Duration>,
    user_agent: Option<String>,
    storage: Option<Arc<dyn KeyValueStore>>,
    navigator: Option<Arc<dyn Navigator>>,
}

impl ApiClientBuilder {
    /// Start from a loaded configuration; individual setters override it
    #[must_use]
    pub fn config(mut self, config: ClientConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// Set the base URL
    #[must_use]
    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = Some(url.into());
        self
    }

    /// Set the request timeout
    #[must_use]
    pub const fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Set the user agent
    #[must_use]
    pub fn user_agent(mut self, agent: impl Into<String>) -> Self {
        self.user_agent = Some(agent.into());
        self
    }

    /// Where session tokens are persisted (in memory if unset)
    #[must_use]
    pub fn storage(mut self, storage: Arc<dyn KeyValueStore>) -> Self {
        self.storage = Some(storage);
        self
    }

    /// Hook invoked when a failed refresh forces a logout
    #[must_use]
    pub fn navigator(mut self, navigator: impl Navigator + 'static) -> Self {
        self.navigator = Some(Arc::new(navigator));
        self
    }

    /// Build the client, restoring any persisted session from storage
    pub async fn build(self) -> Result<ApiClient, ClientError> {
        let config = match (self.config, self.base_url) {
            (Some(mut config), Some(url)) => {
                config.base_url = url;
                config
            }
            (Some(config), None) => config,
            (None, Some(url)) => ClientConfig::new(url),
            (None, None) => {
                return Err(ClientError::Configuration("base_url is required".into()));
            }
        };
        let config = match self.user_agent {
            Some(user_agent) => ClientConfig { user_agent, ..config },
            None => config,
        };
        let timeout = self.timeout.or_else(|| config.timeout());

        let transport = PublicClient::with_timeout(&config, timeout)?;
        let storage = self
            .storage
            .unwrap_or_else(|| Arc::new(MemoryStore::new()));
        let session = SessionStore::restore(Arc::new(transport.clone()), storage).await?;
        let navigator = self
            .navigator
            .unwrap_or_else(|| Arc::new(NoopNavigator));

        Ok(ApiClient::from_parts(transport, session, navigator))
    }
}

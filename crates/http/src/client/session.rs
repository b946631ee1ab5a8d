//! Session store: the single source of truth for authentication state
//!
//! A [`SessionStore`] is a cheap handle that is cloned into the gateway and
//! any caller that needs to log in or out. It mirrors three persisted entries
//! (access token, refresh token, user id) in memory; all three are written
//! together on a successful login, registration or refresh, and removed
//! together on logout or a failed refresh.
//!
//! Concurrent [`SessionStore::refresh`] calls share one in-flight refresh, so
//! a burst of 401s hits the refresh endpoint once.

use async_trait::async_trait;
use autobid_core::{AuthResponse, KeyValueStore, LoginForm, RegisterForm, StorageKey};
use futures::FutureExt;
use futures::future::{BoxFuture, Shared};
use std::fmt;
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, info, warn};

use super::error::ClientError;

/// Backend operations the session store depends on
#[async_trait]
pub trait AuthApi: Send + Sync {
    async fn login(&self, form: &LoginForm) -> Result<AuthResponse, ClientError>;
    async fn register(&self, form: &RegisterForm) -> Result<AuthResponse, ClientError>;
    async fn refresh_token(&self, refresh_token: &str) -> Result<AuthResponse, ClientError>;
}

/// Snapshot of the authentication state
#[derive(Clone, Default, PartialEq, Eq)]
pub struct Session {
    pub access_token: Option<String>,
    pub refresh_token: Option<String>,
    pub user_id: Option<String>,
    /// Message describing the last failed login, registration or refresh
    pub last_error: Option<String>,
}

impl Session {
    /// Authenticated iff an access token is held
    pub const fn is_authenticated(&self) -> bool {
        self.access_token.is_some()
    }
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("authenticated", &self.is_authenticated())
            .field("has_refresh_token", &self.refresh_token.is_some())
            .field("user_id", &self.user_id)
            .field("last_error", &self.last_error)
            .finish()
    }
}

/// How a caller took part in a coalesced refresh
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshRole {
    Started,
    Joined,
}

type RefreshFuture = Shared<BoxFuture<'static, Result<(), ClientError>>>;

struct Inner {
    auth: Arc<dyn AuthApi>,
    storage: Arc<dyn KeyValueStore>,
    state: RwLock<Session>,
    refresh_in_flight: Mutex<Option<RefreshFuture>>,
}

/// Shared handle to the authentication state
#[derive(Clone)]
pub struct SessionStore {
    inner: Arc<Inner>,
}

impl fmt::Debug for SessionStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionStore").finish_non_exhaustive()
    }
}

impl SessionStore {
    /// Rebuild the session from persisted entries
    ///
    /// The session is authenticated if an access token was persisted; no
    /// backend call is made.
    pub async fn restore(
        auth: Arc<dyn AuthApi>,
        storage: Arc<dyn KeyValueStore>,
    ) -> Result<Self, ClientError> {
        let access_token = storage.get(StorageKey::AccessToken.as_str()).await?;
        let refresh_token = storage.get(StorageKey::RefreshToken.as_str()).await?;
        let user_id = storage.get(StorageKey::UserId.as_str()).await?;

        let session = Session {
            access_token,
            refresh_token,
            user_id,
            last_error: None,
        };
        debug!(?session, "session restored");

        Ok(Self {
            inner: Arc::new(Inner {
                auth,
                storage,
                state: RwLock::new(session),
                refresh_in_flight: Mutex::new(None),
            }),
        })
    }

    /// Copy of the current state
    pub async fn snapshot(&self) -> Session {
        self.inner.state.read().await.clone()
    }

    /// The access token to attach to outbound requests
    pub async fn current_access_token(&self) -> Option<String> {
        self.inner.state.read().await.access_token.clone()
    }

    pub async fn is_authenticated(&self) -> bool {
        self.inner.state.read().await.is_authenticated()
    }

    pub async fn user_id(&self) -> Option<String> {
        self.inner.state.read().await.user_id.clone()
    }

    pub async fn last_error(&self) -> Option<String> {
        self.inner.state.read().await.last_error.clone()
    }

    /// User id of the logged-in user, for operations that need an owner
    pub async fn require_user_id(&self) -> Result<String, ClientError> {
        let state = self.inner.state.read().await;
        match (&state.access_token, &state.user_id) {
            (Some(_), Some(user_id)) => Ok(user_id.clone()),
            _ => Err(ClientError::NotAuthenticated),
        }
    }

    /// Log in with email and password
    pub async fn login(&self, form: &LoginForm) -> Result<(), ClientError> {
        let result = match self.inner.auth.login(form).await {
            Ok(response) => self.establish(response, "authentication").await,
            Err(err) => Err(err),
        };
        match result {
            Ok(()) => {
                info!("logged in");
                Ok(())
            }
            Err(err) => Err(self.reject_credentials(err, "Invalid credentials").await),
        }
    }

    /// Create an account and log in as it
    pub async fn register(&self, form: &RegisterForm) -> Result<(), ClientError> {
        let result = match self.inner.auth.register(form).await {
            Ok(response) => self.establish(response, "registration").await,
            Err(err) => Err(err),
        };
        match result {
            Ok(()) => {
                info!("registered and logged in");
                Ok(())
            }
            Err(err) => Err(self.reject_credentials(err, "Registration failed").await),
        }
    }

    /// Forget the session, in memory and in storage
    pub async fn logout(&self) {
        self.clear(None).await;
        info!("logged out");
    }

    /// Exchange the persisted refresh token for a new token pair
    ///
    /// Joins the refresh already in flight if there is one. On any failure the
    /// session is cleared before the error is returned.
    pub async fn refresh(&self) -> Result<(), ClientError> {
        self.coalesced_refresh().await.1
    }

    /// Like [`refresh`](Self::refresh), also reporting whether this call
    /// started the shared refresh or joined one already in flight
    ///
    /// Exactly one caller per refresh operation sees [`RefreshRole::Started`],
    /// so follow-up work on the outcome can be done once.
    pub async fn coalesced_refresh(&self) -> (RefreshRole, Result<(), ClientError>) {
        let (role, operation) = {
            let mut slot = self.inner.refresh_in_flight.lock().await;
            if let Some(operation) = slot.as_ref() {
                debug!("joining in-flight token refresh");
                (RefreshRole::Joined, operation.clone())
            } else {
                let store = self.clone();
                let operation = async move {
                    let result = store.refresh_once().await;
                    store.inner.refresh_in_flight.lock().await.take();
                    result
                }
                .boxed()
                .shared();
                *slot = Some(operation.clone());
                (RefreshRole::Started, operation)
            }
        };
        (role, operation.await)
    }

    async fn refresh_once(&self) -> Result<(), ClientError> {
        let stored = self
            .inner
            .storage
            .get(StorageKey::RefreshToken.as_str())
            .await;
        let refresh_token = match stored {
            Ok(Some(token)) if !token.is_empty() => token,
            Ok(_) => {
                let err = ClientError::NoRefreshToken;
                warn!("no refresh token persisted; clearing session");
                self.clear(Some(err.to_string())).await;
                return Err(err);
            }
            Err(err) => {
                let err = ClientError::from(err);
                warn!(error = %err, "could not read refresh token; clearing session");
                self.clear(Some(err.to_string())).await;
                return Err(err);
            }
        };

        let result = match self.inner.auth.refresh_token(&refresh_token).await {
            Ok(response) => self.establish(response, "refresh token").await,
            Err(err) => Err(err),
        };
        match result {
            Ok(()) => {
                info!("access token refreshed");
                Ok(())
            }
            Err(err) => {
                warn!(error = %err, "token refresh failed; clearing session");
                self.clear(Some(err.to_string())).await;
                Err(err)
            }
        }
    }

    /// Persist a successful authentication response and mark the session live
    async fn establish(&self, response: AuthResponse, context: &str) -> Result<(), ClientError> {
        let user_id = response
            .user_id
            .filter(|id| !id.trim().is_empty())
            .ok_or_else(|| {
                ClientError::IdentityMissing(format!("User ID not provided in {context} response"))
            })?;

        let entries = [
            (StorageKey::AccessToken, response.access_token.as_str()),
            (StorageKey::RefreshToken, response.refresh_token.as_str()),
            (StorageKey::UserId, user_id.as_str()),
        ];
        for (key, value) in entries {
            if let Err(err) = self.inner.storage.set(key.as_str(), value).await {
                let err = ClientError::from(err);
                warn!(%key, error = %err, "failed to persist session; clearing partial entries");
                self.clear(Some(err.to_string())).await;
                return Err(err);
            }
        }

        *self.inner.state.write().await = Session {
            access_token: Some(response.access_token),
            refresh_token: Some(response.refresh_token),
            user_id: Some(user_id),
            last_error: None,
        };
        Ok(())
    }

    /// Record a failed login or registration and shape the returned error
    async fn reject_credentials(&self, err: ClientError, fallback: &str) -> ClientError {
        let err = match err {
            ClientError::Unauthorized(message)
            | ClientError::Forbidden(message)
            | ClientError::NotFound(message)
            | ClientError::Validation(message) => {
                let message = if message.trim().is_empty() {
                    fallback.to_string()
                } else {
                    message
                };
                ClientError::AuthFailure(message)
            }
            other => other,
        };

        let message = match &err {
            ClientError::AuthFailure(message) => message.clone(),
            other => other.to_string(),
        };
        warn!(error = %message, "credentials rejected");
        self.inner.state.write().await.last_error = Some(message);
        err
    }

    async fn clear(&self, last_error: Option<String>) {
        for key in StorageKey::ALL {
            if let Err(err) = self.inner.storage.remove(key.as_str()).await {
                warn!(%key, error = %err, "failed to remove persisted session entry");
            }
        }
        *self.inner.state.write().await = Session {
            last_error,
            ..Session::default()
        };
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use autobid_core::MemoryStore;
    use mockall::mock;

    mock! {
        pub Auth {}

        #[async_trait]
        impl AuthApi for Auth {
            async fn login(&self, form: &LoginForm) -> Result<AuthResponse, ClientError>;
            async fn register(&self, form: &RegisterForm) -> Result<AuthResponse, ClientError>;
            async fn refresh_token(&self, refresh_token: &str) -> Result<AuthResponse, ClientError>;
        }
    }

    fn tokens(access: &str, refresh: &str, user_id: Option<&str>) -> AuthResponse {
        AuthResponse {
            access_token: access.to_string(),
            refresh_token: refresh.to_string(),
            user_id: user_id.map(str::to_string),
        }
    }

    fn credentials() -> LoginForm {
        LoginForm {
            email: "a@b.com".to_string(),
            password: "x".to_string(),
        }
    }

    fn persisted_session() -> Arc<MemoryStore> {
        Arc::new(MemoryStore::with_entries([
            ("accessToken", "T0"),
            ("refreshToken", "R0"),
            ("userId", "U0"),
        ]))
    }

    async fn stored(storage: &MemoryStore, key: StorageKey) -> Option<String> {
        storage.get(key.as_str()).await.unwrap()
    }

    async fn store_with(auth: MockAuth, storage: Arc<MemoryStore>) -> SessionStore {
        SessionStore::restore(Arc::new(auth), storage).await.unwrap()
    }

    #[tokio::test]
    async fn test_login_persists_tokens() {
        let mut auth = MockAuth::new();
        auth.expect_login()
            .withf(|form| form.email == "a@b.com" && form.password == "x")
            .times(1)
            .returning(|_| Ok(tokens("T1", "R1", Some("U1"))));
        let storage = Arc::new(MemoryStore::new());
        let session = store_with(auth, storage.clone()).await;

        session.login(&credentials()).await.unwrap();

        assert!(session.is_authenticated().await);
        assert_eq!(session.user_id().await.as_deref(), Some("U1"));
        assert_eq!(stored(&storage, StorageKey::AccessToken).await.as_deref(), Some("T1"));
        assert_eq!(stored(&storage, StorageKey::RefreshToken).await.as_deref(), Some("R1"));
        assert_eq!(stored(&storage, StorageKey::UserId).await.as_deref(), Some("U1"));
        assert_eq!(session.last_error().await, None);
    }

    #[tokio::test]
    async fn test_login_without_identity_is_rejected() {
        let mut auth = MockAuth::new();
        auth.expect_login()
            .returning(|_| Ok(tokens("T1", "R1", None)));
        let storage = Arc::new(MemoryStore::new());
        let session = store_with(auth, storage.clone()).await;

        let err = session.login(&credentials()).await.unwrap_err();

        assert!(matches!(err, ClientError::IdentityMissing(_)));
        assert!(!session.is_authenticated().await);
        assert!(storage.is_empty().await);
        assert_eq!(
            session.last_error().await.as_deref(),
            Some("User ID not provided in authentication response")
        );
    }

    #[tokio::test]
    async fn test_register_with_blank_identity_is_rejected() {
        let mut auth = MockAuth::new();
        auth.expect_register()
            .returning(|_| Ok(tokens("T1", "R1", Some(""))));
        let session = store_with(auth, Arc::new(MemoryStore::new())).await;

        let form = RegisterForm {
            first_name: "Anna".into(),
            last_name: "Berg".into(),
            email: "anna@example.se".into(),
            password: "secret1".into(),
        };
        let err = session.register(&form).await.unwrap_err();
        assert!(matches!(err, ClientError::IdentityMissing(_)));
        assert!(!session.is_authenticated().await);
    }

    #[tokio::test]
    async fn test_login_rejection_uses_backend_message() {
        let mut auth = MockAuth::new();
        auth.expect_login()
            .times(2)
            .returning(|form| {
                if form.password == "x" {
                    Err(ClientError::Unauthorized("Wrong email or password".into()))
                } else {
                    Err(ClientError::Validation(String::new()))
                }
            });
        let session = store_with(auth, Arc::new(MemoryStore::new())).await;

        let err = session.login(&credentials()).await.unwrap_err();
        assert!(matches!(&err, ClientError::AuthFailure(m) if m == "Wrong email or password"));
        assert_eq!(
            session.last_error().await.as_deref(),
            Some("Wrong email or password")
        );

        let mut blank = credentials();
        blank.password = "y".into();
        let err = session.login(&blank).await.unwrap_err();
        assert!(matches!(&err, ClientError::AuthFailure(m) if m == "Invalid credentials"));
    }

    #[tokio::test]
    async fn test_login_server_failure_propagates_unchanged() {
        let mut auth = MockAuth::new();
        auth.expect_login().returning(|_| {
            Err(ClientError::ServerError {
                status: 502,
                message: "Bad Gateway".into(),
            })
        });
        let session = store_with(auth, persisted_session()).await;

        let err = session.login(&credentials()).await.unwrap_err();
        assert!(matches!(err, ClientError::ServerError { status: 502, .. }));
        // A failed login leaves an existing session alone
        assert!(session.is_authenticated().await);
    }

    /// Store that refuses writes to one key
    struct RefusingStore {
        inner: MemoryStore,
        refused: &'static str,
    }

    #[async_trait]
    impl KeyValueStore for RefusingStore {
        async fn get(&self, key: &str) -> autobid_core::CoreResult<Option<String>> {
            self.inner.get(key).await
        }

        async fn set(&self, key: &str, value: &str) -> autobid_core::CoreResult<()> {
            if key == self.refused {
                return Err(autobid_core::CoreError::storage_error("disk full"));
            }
            self.inner.set(key, value).await
        }

        async fn remove(&self, key: &str) -> autobid_core::CoreResult<()> {
            self.inner.remove(key).await
        }
    }

    #[tokio::test]
    async fn test_failed_write_leaves_no_mixed_entries() {
        let mut auth = MockAuth::new();
        auth.expect_login()
            .returning(|_| Ok(tokens("T1", "R1", Some("U1"))));
        let storage = Arc::new(RefusingStore {
            inner: MemoryStore::with_entries([
                ("accessToken", "T0"),
                ("refreshToken", "R0"),
                ("userId", "U0"),
            ]),
            refused: "userId",
        });
        let session = SessionStore::restore(Arc::new(auth), storage.clone())
            .await
            .unwrap();

        let err = session.login(&credentials()).await.unwrap_err();

        assert!(matches!(err, ClientError::Storage(_)));
        assert!(!session.is_authenticated().await);
        assert!(session.last_error().await.is_some());
        assert!(storage.inner.is_empty().await);

        let restored = SessionStore::restore(Arc::new(MockAuth::new()), storage)
            .await
            .unwrap();
        assert!(!restored.is_authenticated().await);
    }

    #[tokio::test]
    async fn test_restore_and_logout() {
        let storage = persisted_session();
        let session = store_with(MockAuth::new(), storage.clone()).await;
        assert!(session.is_authenticated().await);
        assert_eq!(session.current_access_token().await.as_deref(), Some("T0"));

        session.logout().await;

        assert!(!session.is_authenticated().await);
        assert_eq!(session.snapshot().await, Session::default());
        assert!(storage.is_empty().await);

        // Logging out twice is harmless
        session.logout().await;
        assert!(!session.is_authenticated().await);
    }

    #[tokio::test]
    async fn test_refresh_updates_all_entries() {
        let mut auth = MockAuth::new();
        auth.expect_refresh_token()
            .withf(|token| token == "R0")
            .times(1)
            .returning(|_| Ok(tokens("T2", "R2", Some("U0"))));
        let storage = persisted_session();
        let session = store_with(auth, storage.clone()).await;

        session.refresh().await.unwrap();

        assert!(session.is_authenticated().await);
        assert_eq!(stored(&storage, StorageKey::AccessToken).await.as_deref(), Some("T2"));
        assert_eq!(stored(&storage, StorageKey::RefreshToken).await.as_deref(), Some("R2"));
        assert_eq!(stored(&storage, StorageKey::UserId).await.as_deref(), Some("U0"));
        assert_eq!(session.current_access_token().await.as_deref(), Some("T2"));
    }

    #[tokio::test]
    async fn test_refresh_without_token_logs_out() {
        let mut auth = MockAuth::new();
        auth.expect_refresh_token().never();
        let storage = Arc::new(MemoryStore::with_entries([("accessToken", "T0")]));
        let session = store_with(auth, storage.clone()).await;
        assert!(session.is_authenticated().await);

        let err = session.refresh().await.unwrap_err();

        assert!(matches!(err, ClientError::NoRefreshToken));
        assert!(!session.is_authenticated().await);
        assert!(storage.is_empty().await);
        assert_eq!(
            session.last_error().await.as_deref(),
            Some("No refresh token available")
        );
    }

    #[tokio::test]
    async fn test_refresh_failure_clears_session() {
        let mut auth = MockAuth::new();
        auth.expect_refresh_token()
            .returning(|_| Err(ClientError::Unauthorized("refresh token expired".into())));
        let storage = persisted_session();
        let session = store_with(auth, storage.clone()).await;

        let err = session.refresh().await.unwrap_err();

        assert!(matches!(err, ClientError::Unauthorized(_)));
        assert!(!session.is_authenticated().await);
        assert!(storage.is_empty().await);
        assert!(session.last_error().await.is_some());
    }

    #[tokio::test]
    async fn test_refresh_without_identity_clears_session() {
        let mut auth = MockAuth::new();
        auth.expect_refresh_token()
            .returning(|_| Ok(tokens("T2", "R2", None)));
        let storage = persisted_session();
        let session = store_with(auth, storage.clone()).await;

        let err = session.refresh().await.unwrap_err();

        assert!(matches!(err, ClientError::IdentityMissing(_)));
        assert!(!session.is_authenticated().await);
        assert!(storage.is_empty().await);
    }

    #[tokio::test]
    async fn test_sequential_refreshes_each_hit_backend() {
        let mut auth = MockAuth::new();
        auth.expect_refresh_token()
            .times(2)
            .returning(|token| {
                let next = if token == "R0" { "R1" } else { "R2" };
                Ok(tokens("T", next, Some("U0")))
            });
        let session = store_with(auth, persisted_session()).await;

        session.refresh().await.unwrap();
        session.refresh().await.unwrap();
        assert_eq!(session.snapshot().await.refresh_token.as_deref(), Some("R2"));
    }

    #[tokio::test]
    async fn test_require_user_id() {
        let session = store_with(MockAuth::new(), persisted_session()).await;
        assert_eq!(session.require_user_id().await.unwrap(), "U0");

        session.logout().await;
        assert!(matches!(
            session.require_user_id().await,
            Err(ClientError::NotAuthenticated)
        ));
    }

    #[test]
    fn test_session_debug_hides_tokens() {
        let session = Session {
            access_token: Some("secret-access".into()),
            refresh_token: Some("secret-refresh".into()),
            user_id: Some("U1".into()),
            last_error: None,
        };
        let rendered = format!("{session:?}");
        assert!(!rendered.contains("secret"));
        assert!(rendered.contains("U1"));
    }
}

//! Autobid HTTP client
//!
//! An authenticated REST client for the autobid marketplace backend. The
//! [`ApiClient`] attaches the session's bearer token to every call and, on a
//! 401, refreshes the session once and retries; the [`SessionStore`] owns the
//! tokens and persists them through an injected key/value store.

pub mod client;

pub use client::config::ClientConfig;
pub use client::error::ClientError;
pub use client::navigation::{Navigator, NoopNavigator, RecordingNavigator};
pub use client::public::PublicClient;
pub use client::request::{MultipartPayload, PendingRequest, RequestBody};
pub use client::session::{AuthApi, RefreshRole, Session, SessionStore};
pub use client::{ApiClient, ApiClientBuilder, CallState};

/// Result alias for client operations
pub type Result<T> = std::result::Result<T, ClientError>;

//! Unauthenticated transport and authentication endpoints
//!
//! [`PublicClient`] sends a [`PendingRequest`] once and maps the status. It
//! knows nothing about sessions or retries; the gateway builds its pipeline
//! on top of it, and the session store calls the auth endpoints through it so
//! a 401 from the refresh endpoint can never trigger another refresh.

use async_trait::async_trait;
use autobid_core::{AuthResponse, LoginForm, RegisterForm};
use reqwest::{Client, ClientBuilder, header};
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::time::Duration;
use tracing::debug;

use super::config::ClientConfig;
use super::error::{ClientError, error_message};
use super::request::PendingRequest;
use super::session::AuthApi;

/// Client for endpoints that don't require authentication
#[derive(Clone, Debug)]
pub struct PublicClient {
    client: Client,
    base_url: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct RefreshTokenRequest<'a> {
    refresh_token: &'a str,
}

impl PublicClient {
    /// Create a new public client with default settings
    pub fn new(base_url: impl Into<String>) -> Result<Self, ClientError> {
        Self::from_config(&ClientConfig::new(base_url))
    }

    /// Create a public client from configuration
    pub fn from_config(config: &ClientConfig) -> Result<Self, ClientError> {
        Self::with_timeout(config, config.timeout())
    }

    /// Create a public client whose timeout replaces the configured one
    ///
    /// `None` and a zero duration both mean no timeout.
    pub fn with_timeout(
        config: &ClientConfig,
        timeout: Option<Duration>,
    ) -> Result<Self, ClientError> {
        let base_url = config.normalized_base_url().to_string();
        if base_url.is_empty() {
            return Err(ClientError::Configuration("base_url is required".into()));
        }

        let mut builder = ClientBuilder::new().user_agent(config.user_agent.clone());
        if let Some(timeout) = timeout.filter(|t| !t.is_zero()) {
            builder = builder.timeout(timeout);
        }
        let client = builder.build()?;

        Ok(Self { client, base_url })
    }

    /// Get the base URL
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Send one attempt of `request`, optionally with a bearer token
    ///
    /// Non-success statuses are turned into errors carrying the backend's
    /// message; the response body is left unread on success.
    pub async fn dispatch(
        &self,
        request: &PendingRequest,
        bearer: Option<&str>,
    ) -> Result<reqwest::Response, ClientError> {
        let url = request.url(&self.base_url)?;
        let mut builder = self.client.request(request.method.clone(), url);
        if let Some(token) = bearer {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
        }
        let builder = request.apply_body(builder)?;

        debug!(
            method = %request.method,
            target = %request.target(),
            authenticated = bearer.is_some(),
            "dispatching request"
        );
        let response = builder.send().await?;
        let status = response.status();

        if status.is_success() {
            Ok(response)
        } else {
            let body = response.text().await.unwrap_or_default();
            debug!(method = %request.method, target = %request.target(), %status, "request rejected");
            Err(ClientError::from_status(status, error_message(status, &body)))
        }
    }

    /// Send `request` without credentials and decode the JSON response
    pub async fn execute<T: DeserializeOwned>(
        &self,
        request: &PendingRequest,
    ) -> Result<T, ClientError> {
        decode_json(self.dispatch(request, None).await?).await
    }

    /// Authenticate with email and password
    pub async fn login(&self, form: &LoginForm) -> Result<AuthResponse, ClientError> {
        self.execute(&PendingRequest::post("/auth/login").json(form)?)
            .await
    }

    /// Create an account
    pub async fn register(&self, form: &RegisterForm) -> Result<AuthResponse, ClientError> {
        self.execute(&PendingRequest::post("/auth/register").json(form)?)
            .await
    }

    /// Exchange a refresh token for a new token pair
    pub async fn refresh_token(&self, refresh_token: &str) -> Result<AuthResponse, ClientError> {
        let body = RefreshTokenRequest { refresh_token };
        self.execute(&PendingRequest::post("/auth/refresh-token").json(&body)?)
            .await
    }
}

#[async_trait]
impl AuthApi for PublicClient {
    async fn login(&self, form: &LoginForm) -> Result<AuthResponse, ClientError> {
        Self::login(self, form).await
    }

    async fn register(&self, form: &RegisterForm) -> Result<AuthResponse, ClientError> {
        Self::register(self, form).await
    }

    async fn refresh_token(&self, refresh_token: &str) -> Result<AuthResponse, ClientError> {
        Self::refresh_token(self, refresh_token).await
    }
}

/// Read a JSON response body
pub(crate) async fn decode_json<T: DeserializeOwned>(
    response: reqwest::Response,
) -> Result<T, ClientError> {
    let bytes = response.bytes().await?;
    Ok(serde_json::from_slice(&bytes)?)
}

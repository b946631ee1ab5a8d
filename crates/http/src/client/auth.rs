//! Authentication API client methods

use autobid_core::{LoginForm, RegisterForm, Validate};

use super::{ApiClient, ClientError};

impl ApiClient {
    /// Log in with email and password and persist the new session
    pub async fn login(&self, form: &LoginForm) -> Result<(), ClientError> {
        form.validate()?;
        self.session.login(form).await
    }

    /// Create an account; the backend logs the new user in
    pub async fn register(&self, form: &RegisterForm) -> Result<(), ClientError> {
        form.validate()?;
        self.session.register(form).await
    }

    /// Drop the current session
    pub async fn logout(&self) {
        self.session.logout().await;
    }

    /// Exchange the persisted refresh token for a new token pair
    pub async fn refresh(&self) -> Result<(), ClientError> {
        self.session.refresh().await
    }
}

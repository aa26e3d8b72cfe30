//! API client for the banking REST service.
//!
//! Every call is built here and executed through the session pipeline:
//! credential attached on the way out, session revoked on a 401.

use std::sync::Arc;

use anyhow::{bail, Context, Result};
use reqwest::header::{HeaderValue, ACCEPT, CONTENT_TYPE};
use reqwest::{Method, Request, Url};
use serde::{de::DeserializeOwned, Serialize};
use tracing::{debug, info, warn};

use crate::auth::store::{EMAIL_KEY, USER_ID_KEY};
use crate::auth::{Credential, SessionStore};
use crate::config::Config;
use crate::models::{Envelope, LoginResponse, NewUser, ProfileUpdate, User, UserType};
use crate::pipeline::{
    AttachCredential, AuthFailureHook, HttpTransport, Pipeline, RevokeOnUnauthorized, Transport,
};

use super::ApiError;

pub struct BankClient {
    base_url: String,
    session: Arc<SessionStore>,
    pipeline: Pipeline,
}

impl BankClient {
    /// Client talking to the configured service over HTTP
    pub fn new(
        config: &Config,
        session: Arc<SessionStore>,
        on_auth_failure: Arc<dyn AuthFailureHook>,
    ) -> Result<Self> {
        let transport = HttpTransport::new().context("Failed to build HTTP client")?;
        Self::with_transport(&config.api_base_url(), session, on_auth_failure, transport)
    }

    /// Client over any transport. The pipeline is always
    /// attach-credential, send, then revoke-on-unauthorized.
    pub fn with_transport(
        base_url: &str,
        session: Arc<SessionStore>,
        on_auth_failure: Arc<dyn AuthFailureHook>,
        transport: impl Transport + 'static,
    ) -> Result<Self> {
        Url::parse(base_url).with_context(|| format!("Invalid API base URL: {}", base_url))?;

        let pipeline = Pipeline::builder(transport)
            .stage(AttachCredential::new(session.clone()))
            .stage(RevokeOnUnauthorized::new(session.clone(), on_auth_failure))
            .build();

        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            session,
            pipeline,
        })
    }

    pub fn session(&self) -> &Arc<SessionStore> {
        &self.session
    }

    pub fn pipeline(&self) -> &Pipeline {
        &self.pipeline
    }

    fn request<B: Serialize>(&self, method: Method, path: &str, body: Option<&B>) -> Result<Request> {
        let url = Url::parse(&format!("{}{}", self.base_url, path))
            .with_context(|| format!("Invalid request path: {}", path))?;

        let mut request = Request::new(method, url);
        request
            .headers_mut()
            .insert(ACCEPT, HeaderValue::from_static("application/json"));
        if let Some(body) = body {
            let bytes = serde_json::to_vec(body).context("Failed to encode request body")?;
            request
                .headers_mut()
                .insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
            *request.body_mut() = Some(bytes.into());
        }
        Ok(request)
    }

    /// Run a request through the pipeline and unwrap the response envelope
    async fn call<T: DeserializeOwned>(&self, request: Request) -> Result<Envelope<T>> {
        let target = format!("{} {}", request.method(), request.url().path());
        let response = self
            .pipeline
            .execute(request)
            .await
            .with_context(|| format!("Request failed: {}", target))?;

        let text = response
            .text()
            .await
            .with_context(|| format!("Failed to read response body from {}", target))?;
        let envelope = serde_json::from_str(&text)
            .map_err(|e| ApiError::InvalidResponse(e.to_string()))
            .with_context(|| format!("Failed to parse JSON response from {}", target))?;
        debug!(target = %target, "Response parsed");
        Ok(envelope)
    }

    // ===== Session =====

    /// Sign in and store the issued credential
    pub async fn login(&self, email: &str, password: &str) -> Result<()> {
        let email = email.trim();
        if email.is_empty() {
            bail!("Missing email id, please enter email id");
        }
        if password.is_empty() {
            bail!("Missing password, please enter password");
        }

        let body = serde_json::json!({ "email_id": email, "password": password });
        let request = self.request(Method::POST, "/login", Some(&body))?;
        let envelope: Envelope<LoginResponse> = self.call(request).await.context("Login failed")?;

        if let Err(e) = self.session.set(Credential::new(envelope.data.access_token)) {
            warn!(error = %e, "Failed to persist session credential");
        }
        if let Err(e) = self.session.set_value(EMAIL_KEY, email) {
            warn!(error = %e, "Failed to persist session email");
        }
        info!("Logged in");
        Ok(())
    }

    /// Sign out on the server. The local session is cleared even if the
    /// server call fails; that failure is still returned.
    pub async fn logout(&self) -> Result<()> {
        let result = match self.request::<()>(Method::DELETE, "/logout", None) {
            Ok(request) => self.call::<serde_json::Value>(request).await.map(|_| ()),
            Err(e) => Err(e),
        };

        if let Err(e) = self.session.clear() {
            warn!(error = %e, "Failed to wipe persisted session");
        }
        info!("Logged out");
        result.context("Logout request failed")
    }

    /// Create an account; does not sign in
    pub async fn signup(&self, user: &NewUser) -> Result<User> {
        let request = self.request(Method::POST, "/user", Some(user))?;
        let envelope: Envelope<User> = self.call(request).await.context("Signup failed")?;
        Ok(envelope.data)
    }

    // ===== Users =====

    pub async fn fetch_user(&self, user_id: i64) -> Result<User> {
        let request = self.request::<()>(Method::GET, &format!("/user/{}", user_id), None)?;
        Ok(self.call::<User>(request).await?.data)
    }

    pub async fn fetch_users(&self) -> Result<Vec<User>> {
        let request = self.request::<()>(Method::GET, "/user", None)?;
        Ok(self.call::<Vec<User>>(request).await?.data)
    }

    pub async fn fetch_user_types(&self) -> Result<Vec<UserType>> {
        let request = self.request::<()>(Method::GET, "/usertype", None)?;
        Ok(self.call::<Vec<UserType>>(request).await?.data)
    }

    pub async fn update_profile(&self, user_id: i64, update: &ProfileUpdate) -> Result<User> {
        if update.is_empty() {
            bail!("Nothing to update");
        }
        let request = self.request(Method::PUT, &format!("/user/{}", user_id), Some(update))?;
        let envelope: Envelope<User> = self.call(request).await.context("Profile update failed")?;
        Ok(envelope.data)
    }

    /// The signed-in user. The id is looked up by email once and then
    /// remembered in the session.
    pub async fn current_user(&self) -> Result<User> {
        if let Some(user_id) = self.session.user_id() {
            return self.fetch_user(user_id).await;
        }

        let email = self
            .session
            .email()
            .ok_or_else(|| anyhow::anyhow!("Not logged in"))?;
        let user = self
            .fetch_users()
            .await?
            .into_iter()
            .find(|u| u.email_id.eq_ignore_ascii_case(&email))
            .ok_or_else(|| anyhow::anyhow!("No user registered with email {}", email))?;

        if let Err(e) = self.session.set_value(USER_ID_KEY, user.id.to_string()) {
            warn!(error = %e, "Failed to persist session user id");
        }
        Ok(user)
    }
}

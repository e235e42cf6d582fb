//! HTTP transport shared by every resource client.
//!
//! One `reqwest::Client` with a request timeout, a bearer token read from the
//! credential store before each call, and uniform status handling: 401 clears
//! the stored token and notifies the session observer, every other failure is
//! surfaced as an `ApiError` unchanged.

use crate::api::credentials::CredentialStore;
use crate::config::ApiConfig;
use crate::error::ApiError;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT};
use reqwest::{Method, StatusCode};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, warn};

/// Reacts to the backend rejecting the session.
pub trait SessionObserver: Send + Sync {
    fn session_expired(&self);
}

/// Points the user at the login command. The CLI's "login route".
#[derive(Debug, Default)]
pub struct LoginPrompt;

impl SessionObserver for LoginPrompt {
    fn session_expired(&self) {
        warn!("Session expired or missing. Run `devpulse login` to sign in again.");
    }
}

/// Configured HTTP client for the DevPulse backend.
pub struct ApiClient {
    http: reqwest::Client,
    base_url: String,
    timeout_seconds: u64,
    credentials: Arc<dyn CredentialStore>,
    session: Arc<dyn SessionObserver>,
}

impl ApiClient {
    /// Create a client for the backend described by `config`.
    pub fn new(
        config: &ApiConfig,
        credentials: Arc<dyn CredentialStore>,
        session: Arc<dyn SessionObserver>,
    ) -> Result<Self, ApiError> {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));

        let http = reqwest::Client::builder()
            .timeout(config.timeout())
            .default_headers(headers)
            .build()
            .map_err(|e| ApiError::Network {
                message: format!("Failed to create HTTP client: {}", e),
            })?;

        debug!(
            "API client for {} (timeout {}s)",
            config.base_url, config.timeout_seconds
        );

        Ok(Self {
            http,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            timeout_seconds: config.timeout_seconds,
            credentials,
            session,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn credentials(&self) -> &Arc<dyn CredentialStore> {
        &self.credentials
    }

    /// Absolute URL for an endpoint path.
    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    /// Send one request and return the decoded JSON body.
    ///
    /// An empty success body yields `Value::Null`.
    pub async fn request<B>(
        &self,
        method: Method,
        path: &str,
        body: Option<&B>,
    ) -> Result<Value, ApiError>
    where
        B: Serialize + ?Sized,
    {
        let url = self.url(path);
        let token = self.credentials.get();

        let mut builder = self.http.request(method.clone(), &url);
        if let Some(ref token) = token {
            builder = builder.bearer_auth(token);
        }
        if let Some(body) = body {
            builder = builder.json(body);
        }

        debug!("{} {}", method, url);

        let response = builder.send().await.map_err(|e| self.send_error(e))?;
        let status = response.status();
        let text = response.text().await.map_err(|e| self.send_error(e))?;

        debug!("{} {} -> {}", method, url, status);

        self.interpret(status, text, token.is_some())
    }

    /// `GET` and decode into `T`.
    pub async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T, ApiError> {
        let value = self.request::<()>(Method::GET, path, None).await?;
        Ok(serde_json::from_value(value)?)
    }

    /// `POST` a JSON body and decode the response into `T`.
    pub async fn post<B, T>(&self, path: &str, body: &B) -> Result<T, ApiError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let value = self.request(Method::POST, path, Some(body)).await?;
        Ok(serde_json::from_value(value)?)
    }

    fn interpret(
        &self,
        status: StatusCode,
        body: String,
        sent_token: bool,
    ) -> Result<Value, ApiError> {
        if status == StatusCode::UNAUTHORIZED {
            self.handle_unauthorized(sent_token);
            return Err(ApiError::Unauthorized);
        }

        if status == StatusCode::NOT_FOUND {
            return Err(ApiError::NotFound { body });
        }

        if !status.is_success() {
            return Err(ApiError::Http {
                status: status.as_u16(),
                body,
            });
        }

        if body.trim().is_empty() {
            return Ok(Value::Null);
        }

        Ok(serde_json::from_str(&body)?)
    }

    /// Only the request that actually removes the token notifies the
    /// observer, so concurrent 401s for the same stale token sign out once.
    /// Requests sent without any token always notify.
    fn handle_unauthorized(&self, sent_token: bool) {
        let cleared = self.credentials.clear();
        if cleared.is_some() {
            warn!("Backend rejected the stored credential; it has been cleared");
            self.session.session_expired();
        } else if !sent_token {
            self.session.session_expired();
        } else {
            debug!("Credential already cleared by a concurrent request");
        }
    }

    fn send_error(&self, e: reqwest::Error) -> ApiError {
        if e.is_timeout() {
            ApiError::Timeout {
                seconds: self.timeout_seconds,
            }
        } else if e.is_connect() {
            ApiError::Network {
                message: format!("Cannot connect to DevPulse backend at {}", self.base_url),
            }
        } else {
            ApiError::from(e)
        }
    }
}

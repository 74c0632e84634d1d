//! Telemetry API Client
//!
//! Every call to the backend goes through [`ApiClient::request`], which
//! attaches the JSON content type and the bearer token and ends the session
//! when the backend answers 401.

mod error;
mod navigator;

pub use error::ClientError;
pub use navigator::{ConsoleNavigator, LoginRedirect, Navigator};

use crate::session::{SessionError, SessionStore};
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use reqwest::{Client, Method, Response, StatusCode};
use serde::de::DeserializeOwned;
use std::sync::Arc;

/// Authenticated client for the telemetry backend
pub struct ApiClient {
    http: Client,
    config: ClientConfig,
    session: Arc<dyn SessionStore>,
    redirect: LoginRedirect,
}

/// Configuration for the API client
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Base URL every endpoint is appended to (e.g., "http://localhost:5000/api")
    pub api_base: String,
    /// Where the user is sent when the session ends
    pub login_url: String,
    /// Request timeout in milliseconds (None = transport default)
    pub request_timeout_ms: Option<u64>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            api_base: "http://localhost:5000/api".to_string(),
            login_url: "http://localhost:5000/login".to_string(),
            request_timeout_ms: None,
        }
    }
}

/// Per-call overrides
#[derive(Debug, Clone)]
pub struct RequestOptions {
    pub method: Method,
    pub body: Option<serde_json::Value>,
    /// Extra headers; these win over the defaults
    pub headers: HeaderMap,
}

impl Default for RequestOptions {
    fn default() -> Self {
        Self {
            method: Method::GET,
            body: None,
            headers: HeaderMap::new(),
        }
    }
}

impl RequestOptions {
    pub fn get() -> Self {
        Self::default()
    }

    pub fn post(body: serde_json::Value) -> Self {
        Self {
            method: Method::POST,
            body: Some(body),
            ..Self::default()
        }
    }

    pub fn put(body: serde_json::Value) -> Self {
        Self {
            method: Method::PUT,
            body: Some(body),
            ..Self::default()
        }
    }

    pub fn header(mut self, name: HeaderName, value: HeaderValue) -> Self {
        self.headers.insert(name, value);
        self
    }
}

impl ApiClient {
    /// Create a new API client
    pub fn new(
        config: ClientConfig,
        session: Arc<dyn SessionStore>,
        navigator: Arc<dyn Navigator>,
    ) -> Result<Self, ClientError> {
        let mut builder = Client::builder();
        if let Some(timeout_ms) = config.request_timeout_ms {
            builder = builder.timeout(std::time::Duration::from_millis(timeout_ms));
        }
        let http = builder.build().map_err(ClientError::Build)?;

        Ok(Self {
            http,
            config: ClientConfig {
                api_base: config.api_base.trim_end_matches('/').to_string(),
                ..config
            },
            session,
            redirect: LoginRedirect::new(navigator),
        })
    }

    /// Get the current configuration
    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Session store shared with the rest of the app
    pub fn session(&self) -> &Arc<dyn SessionStore> {
        &self.session
    }

    fn url(&self, endpoint: &str) -> String {
        format!("{}{}", self.config.api_base, endpoint)
    }

    /// Default headers merged with the caller's; caller wins on conflict
    fn headers(&self, overrides: HeaderMap) -> Result<HeaderMap, ClientError> {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        if let Some(token) = self.session.token()? {
            let value = HeaderValue::from_str(&format!("Bearer {}", token))
                .map_err(|_| SessionError::InvalidToken)?;
            headers.insert(AUTHORIZATION, value);
        }

        // Extend replaces existing values for keys present in `overrides`
        headers.extend(overrides);
        Ok(headers)
    }

    /// Send a request to `<api base><endpoint>`
    ///
    /// A 401 clears the stored token and navigates to the login view before
    /// the response is handed back; the response is not meant to be used
    /// after that. Transport errors are returned as-is. Nothing is retried.
    pub async fn request(
        &self,
        endpoint: &str,
        options: RequestOptions,
    ) -> Result<Response, ClientError> {
        let url = self.url(endpoint);
        let headers = self.headers(options.headers)?;

        let mut builder = self.http.request(options.method.clone(), &url).headers(headers);
        if let Some(body) = &options.body {
            builder = builder.body(body.to_string());
        }

        tracing::debug!(method = %options.method, url = %url, "Sending request");

        let response = builder.send().await.map_err(|e| {
            let err = ClientError::Transport(e);
            if err.is_timeout() {
                tracing::debug!("Request to {} timed out", url);
            } else if err.is_connect() {
                tracing::debug!("Backend unreachable at {}", url);
            }
            err
        })?;

        if response.status() == StatusCode::UNAUTHORIZED {
            self.end_session();
        } else {
            self.redirect.rearm();
        }

        Ok(response)
    }

    /// Send a request and decode a JSON body
    pub async fn send_json<T: DeserializeOwned>(
        &self,
        endpoint: &str,
        options: RequestOptions,
    ) -> Result<T, ClientError> {
        let response = self.request(endpoint, options).await?;
        decode_json(response).await
    }

    /// GET an endpoint and decode a JSON body
    pub async fn get_json<T: DeserializeOwned>(&self, endpoint: &str) -> Result<T, ClientError> {
        self.send_json(endpoint, RequestOptions::get()).await
    }

    fn end_session(&self) {
        if let Err(e) = self.session.clear_token() {
            tracing::error!("Failed to clear session token: {}", e);
        }

        if self.redirect.redirect(&self.config.login_url) {
            tracing::warn!("Backend rejected the session (401), redirected to login");
        } else {
            tracing::debug!("Login redirect already pending");
        }
    }
}

/// Decode a response body, mapping non-success statuses to errors
pub async fn decode_json<T: DeserializeOwned>(response: Response) -> Result<T, ClientError> {
    let status = response.status();

    if status == StatusCode::UNAUTHORIZED {
        return Err(ClientError::Unauthorized);
    }

    if !status.is_success() {
        let text = response.text().await.unwrap_or_default();
        return Err(ClientError::Status {
            status: status.as_u16(),
            message: error_message(&text),
        });
    }

    let bytes = response.bytes().await?;
    Ok(serde_json::from_slice(&bytes)?)
}

/// Pull `{"error": "..."}` out of a backend error body
fn error_message(body: &str) -> String {
    serde_json::from_str::<serde_json::Value>(body)
        .ok()
        .and_then(|v| v.get("error").and_then(|e| e.as_str()).map(str::to_string))
        .unwrap_or_else(|| body.to_string())
}

//! Remote API client
//!
//! Wraps `reqwest::Client` with base URL handling, bearer authentication,
//! the `POST /login` token exchange and uniform status-to-error mapping.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use std::time::Duration;
//! use vaultx_remote::ApiClient;
//!
//! # fn example() -> Result<(), vaultx_remote::RemoteError> {
//! let client = ApiClient::new("https://vault.example.com/api", Duration::from_secs(30))?;
//! # Ok(())
//! # }
//! ```

use std::time::Duration;

use reqwest::{Client, Method, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use vaultx_core::{config::RemoteConfig, domain::Credential};

use crate::RemoteError;

#[derive(Debug, Serialize)]
struct LoginRequest<'a> {
    username: &'a str,
    password: &'a str,
}

#[derive(Debug, Deserialize)]
struct LoginResponse {
    token: String,
}

/// HTTP client bound to one API base URL
#[derive(Debug, Clone)]
pub struct ApiClient {
    client: Client,
    base_url: String,
}

impl ApiClient {
    /// Creates a client for `base_url` with a per-request timeout
    ///
    /// # Errors
    /// `RemoteError::Network` if the underlying client cannot be built.
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self, RemoteError> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self::with_client(client, base_url))
    }

    /// Creates a client from the `remote` config section
    pub fn from_config(config: &RemoteConfig) -> Result<Self, RemoteError> {
        Self::new(
            config.api_base.clone(),
            Duration::from_secs(config.request_timeout_secs),
        )
    }

    /// Uses an existing `reqwest::Client`
    pub fn with_client(client: Client, base_url: impl Into<String>) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self { client, base_url }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Authenticated request to an API path such as `/files`
    pub fn request(&self, method: Method, path: &str, credential: &Credential) -> RequestBuilder {
        let url = format!("{}{}", self.base_url, path);
        debug!(%method, %url, "API request");
        self.client
            .request(method, &url)
            .bearer_auth(credential.expose())
    }

    /// Exchanges a username and password for a session credential
    ///
    /// # Errors
    /// `RemoteError::Unauthorized` when the API rejects the login,
    /// `RemoteError::InvalidResponse` when it answers without a usable token.
    #[tracing::instrument(skip(self, password))]
    pub async fn login(&self, username: &str, password: &str) -> Result<Credential, RemoteError> {
        let url = format!("{}/login", self.base_url);
        let request = self
            .client
            .post(&url)
            .json(&LoginRequest { username, password });
        let response: LoginResponse = self.send_json(request).await?;
        let credential = Credential::new(response.token)
            .map_err(|e| RemoteError::InvalidResponse(e.to_string()))?;
        info!("Remote login succeeded");
        Ok(credential)
    }

    /// Unauthenticated request to an absolute URL (pre-signed locators)
    pub fn absolute(&self, method: Method, url: &str) -> RequestBuilder {
        self.client.request(method, url)
    }

    /// Sends a request, mapping any non-2xx status to a [`RemoteError`]
    pub async fn send(&self, request: RequestBuilder) -> Result<Response, RemoteError> {
        let response = request.send().await?;
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_default();
        Err(RemoteError::from_status(status, body))
    }

    /// Sends a request and decodes a JSON body
    pub async fn send_json<T: DeserializeOwned>(
        &self,
        request: RequestBuilder,
    ) -> Result<T, RemoteError> {
        let bytes = self.send(request).await?.bytes().await?;
        serde_json::from_slice(&bytes).map_err(|e| RemoteError::InvalidResponse(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_trailing_slash_trimmed() {
        let client = ApiClient::with_client(Client::new(), "http://localhost:8080/api/");
        assert_eq!(client.base_url(), "http://localhost:8080/api");
    }

    #[test]
    fn test_request_carries_bearer() {
        let client = ApiClient::with_client(Client::new(), "http://localhost:8080");
        let credential = Credential::new("tok-123").unwrap();
        let request = client
            .request(Method::GET, "/files", &credential)
            .build()
            .unwrap();
        assert_eq!(request.url().as_str(), "http://localhost:8080/files");
        assert_eq!(
            request.headers().get("authorization").unwrap(),
            "Bearer tok-123"
        );
    }

    #[test]
    fn test_absolute_has_no_bearer() {
        let client = ApiClient::with_client(Client::new(), "http://localhost:8080");
        let request = client
            .absolute(Method::PUT, "http://storage.local/blob?sig=abc")
            .build()
            .unwrap();
        assert!(request.headers().get("authorization").is_none());
    }

    #[test]
    fn test_from_config() {
        let config = RemoteConfig {
            api_base: "http://example.test".to_string(),
            request_timeout_secs: 5,
        };
        let client = ApiClient::from_config(&config).unwrap();
        assert_eq!(client.base_url(), "http://example.test");
    }
}

//! API client for communicating with the library REST API.
//!
//! This module provides the `ApiClient` struct for making authenticated
//! API requests for catalog, circulation and profile data.

use std::time::Duration;

use chrono::NaiveDate;
use reqwest::{header, Client, Method};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use tracing::{debug, warn};

use crate::auth::Credential;
use crate::models::{
    Book, BookPatch, BorrowRequest, Envelope, NewBook, UserIdentity, UserProfile, UserRecord,
};

use super::ApiError;

// ============================================================================
// Constants
// ============================================================================

/// Base URL used when nothing is configured (local development server)
pub const DEFAULT_BASE_URL: &str = "http://localhost:5000/api/v1";

/// HTTP request timeout in seconds.
/// 30s allows for slow API responses while failing fast enough for good UX.
const REQUEST_TIMEOUT_SECS: u64 = 30;

/// Maximum number of retries for rate-limited (429) requests.
const MAX_RATE_LIMIT_RETRIES: u32 = 3;

/// Initial backoff delay in milliseconds for rate limiting.
const INITIAL_BACKOFF_MS: u64 = 1000;

#[derive(Serialize)]
struct LoginBody<'a> {
    email: &'a str,
    password: &'a str,
}

#[derive(Serialize)]
struct RegisterBody<'a> {
    name: &'a str,
    email: &'a str,
    password: &'a str,
}

#[derive(Serialize)]
struct ProfileUpdateBody<'a> {
    name: &'a str,
    email: &'a str,
}

/// `data` of a successful login response.
#[derive(Debug, Clone, Deserialize)]
pub struct LoginData {
    pub token: Option<String>,
    #[serde(default)]
    pub user: Option<UserRecord>,
}

/// Raw login response, handed back to the caller for UI messaging.
#[derive(Debug, Clone)]
pub struct LoginResponse {
    pub success: bool,
    pub message: Option<String>,
    pub token: String,
    pub user: Option<UserIdentity>,
}

/// API client for the library service.
/// Clone is cheap - reqwest::Client uses Arc internally for connection pooling.
#[derive(Clone)]
pub struct ApiClient {
    client: Client,
    base_url: String,
    token: Option<Credential>,
}

impl std::fmt::Debug for ApiClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiClient")
            .field("base_url", &self.base_url)
            .field("token", &self.token)
            .finish()
    }
}

impl ApiClient {
    /// Create a new API client for the given base URL
    pub fn new(base_url: &str) -> Result<Self, ApiError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            token: None,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Create a new ApiClient with the given token, sharing the connection pool.
    pub fn with_token(&self, token: Credential) -> Self {
        Self {
            client: self.client.clone(), // Cheap clone, shares connection pool
            base_url: self.base_url.clone(),
            token: Some(token),
        }
    }

    /// Same client with no credential attached
    pub fn anonymous(&self) -> Self {
        Self {
            client: self.client.clone(),
            base_url: self.base_url.clone(),
            token: None,
        }
    }

    pub fn has_token(&self) -> bool {
        self.token.is_some()
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn auth_headers(&self) -> Result<header::HeaderMap, ApiError> {
        let mut headers = header::HeaderMap::new();
        if let Some(ref token) = self.token {
            let value = header::HeaderValue::from_str(&format!("Bearer {}", token.expose()))
                .map_err(|_| ApiError::InvalidResponse("Bearer token is not a valid header".to_string()))?;
            headers.insert(header::AUTHORIZATION, value);
        }
        Ok(headers)
    }

    /// Check if response is successful, returning an error with body if not.
    /// Returns Ok(Some(response)) for success, Ok(None) for rate limit (should retry),
    /// or Err for other errors.
    async fn check_response_for_retry(
        response: reqwest::Response,
    ) -> Result<Option<reqwest::Response>, ApiError> {
        if response.status().is_success() {
            Ok(Some(response))
        } else if response.status().as_u16() == 429 {
            // Rate limited - signal to retry
            Ok(None)
        } else {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            Err(ApiError::from_status(status, &body))
        }
    }

    /// Send a request, retrying with backoff while rate limited.
    async fn send<B: Serialize + ?Sized>(
        &self,
        method: Method,
        path: &str,
        body: Option<&B>,
    ) -> Result<reqwest::Response, ApiError> {
        let url = self.url(path);
        let mut retries = 0;
        let mut backoff_ms = INITIAL_BACKOFF_MS;

        loop {
            let mut request = self
                .client
                .request(method.clone(), &url)
                .headers(self.auth_headers()?);
            if let Some(body) = body {
                request = request.json(body);
            }
            let response = request.send().await?;

            match Self::check_response_for_retry(response).await? {
                Some(response) => return Ok(response),
                None => {
                    // Rate limited
                    retries += 1;
                    if retries > MAX_RATE_LIMIT_RETRIES {
                        return Err(ApiError::RateLimited);
                    }
                    warn!(url = %url, retry = retries, backoff_ms = backoff_ms, "Rate limited, backing off");
                    tokio::time::sleep(Duration::from_millis(backoff_ms)).await;
                    backoff_ms *= 2; // Exponential backoff
                }
            }
        }
    }

    async fn send_empty(&self, method: Method, path: &str) -> Result<reqwest::Response, ApiError> {
        self.send::<()>(method, path, None).await
    }

    /// Decode the `{ success, message, data }` envelope
    async fn envelope<T: DeserializeOwned>(
        response: reqwest::Response,
        path: &str,
    ) -> Result<Envelope<T>, ApiError> {
        let text = response.text().await?;
        serde_json::from_str(&text).map_err(|e| {
            ApiError::InvalidResponse(format!("Failed to parse JSON response from {}: {}", path, e))
        })
    }

    /// Decode an envelope and require `data` to be present
    async fn data<T: DeserializeOwned>(
        response: reqwest::Response,
        path: &str,
    ) -> Result<T, ApiError> {
        Self::envelope::<T>(response, path)
            .await?
            .data
            .ok_or_else(|| ApiError::InvalidResponse(format!("Missing data in response from {}", path)))
    }

    async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T, ApiError> {
        let response = self.send_empty(Method::GET, path).await?;
        Self::data(response, path).await
    }

    async fn with_body<T, B>(&self, method: Method, path: &str, body: &B) -> Result<Envelope<T>, ApiError>
    where
        T: DeserializeOwned,
        B: Serialize,
    {
        let response = self.send(method, path, Some(body)).await?;
        Self::envelope(response, path).await
    }

    // ========================================================================
    // Session endpoints
    // ========================================================================

    /// `GET /users/getUser`: who am I, for the attached credential.
    ///
    /// Returns `Ok(None)` when the server answered 2xx without a user payload
    /// or without `success: true`.
    pub async fn get_user(&self) -> Result<Option<UserRecord>, ApiError> {
        let path = "/users/getUser";
        let response = self.send_empty(Method::GET, path).await?;
        // A 2xx with an unparsable body is still "no usable identity"
        let text = response.text().await?;
        let envelope: Option<Envelope<UserRecord>> = serde_json::from_str(&text).ok();
        Ok(envelope.filter(|e| e.success).and_then(|e| e.data))
    }

    /// `POST /users/login`
    pub async fn login(&self, email: &str, password: &str) -> Result<LoginResponse, ApiError> {
        let path = "/users/login";
        debug!(email = email, "Sending login request");
        let envelope: Envelope<LoginData> = self
            .anonymous()
            .with_body(Method::POST, path, &LoginBody { email, password })
            .await?;

        if !envelope.success {
            return Err(ApiError::Rejected {
                status: 200,
                message: envelope
                    .message
                    .unwrap_or_else(|| "Login was not accepted".to_string()),
            });
        }

        let data = envelope
            .data
            .ok_or_else(|| ApiError::InvalidResponse("Login response has no data".to_string()))?;
        let token = data
            .token
            .filter(|t| !t.trim().is_empty())
            .ok_or_else(|| ApiError::InvalidResponse("Login response has no token".to_string()))?;

        Ok(LoginResponse {
            success: true,
            message: envelope.message,
            token,
            user: data.user.and_then(UserRecord::into_identity),
        })
    }

    /// `GET /users/logout`; the body is ignored.
    pub async fn logout(&self) -> Result<(), ApiError> {
        self.send_empty(Method::GET, "/users/logout").await?;
        Ok(())
    }

    /// `POST /users/register`, returning the server's message
    pub async fn register(&self, name: &str, email: &str, password: &str) -> Result<Option<String>, ApiError> {
        let envelope: Envelope<serde_json::Value> = self
            .anonymous()
            .with_body(Method::POST, "/users/register", &RegisterBody { name, email, password })
            .await?;
        Ok(envelope.message)
    }

    // ========================================================================
    // Catalog
    // ========================================================================

    pub async fn list_books(&self) -> Result<Vec<Book>, ApiError> {
        self.get("/books").await
    }

    pub async fn get_book(&self, id: &str) -> Result<Book, ApiError> {
        self.get(&format!("/books/{}", id)).await
    }

    pub async fn create_book(&self, book: &NewBook) -> Result<Option<Book>, ApiError> {
        let envelope: Envelope<Book> = self.with_body(Method::POST, "/books", book).await?;
        Ok(envelope.data)
    }

    pub async fn update_book(&self, id: &str, patch: &BookPatch) -> Result<Option<Book>, ApiError> {
        let path = format!("/books/{}", id);
        let envelope: Envelope<Book> = self.with_body(Method::PATCH, &path, patch).await?;
        Ok(envelope.data)
    }

    pub async fn delete_book(&self, id: &str) -> Result<(), ApiError> {
        self.send_empty(Method::DELETE, &format!("/books/{}", id))
            .await?;
        Ok(())
    }

    // ========================================================================
    // Circulation
    // ========================================================================

    pub async fn borrow_book(&self, id: &str, return_date: NaiveDate) -> Result<Option<String>, ApiError> {
        let path = format!("/books/{}/borrow", id);
        let envelope: Envelope<serde_json::Value> = self
            .with_body(Method::POST, &path, &BorrowRequest { return_date })
            .await?;
        Ok(envelope.message)
    }

    pub async fn return_book(&self, id: &str) -> Result<Option<String>, ApiError> {
        let path = format!("/books/{}/return", id);
        let envelope: Envelope<serde_json::Value> = self
            .with_body(Method::POST, &path, &serde_json::Map::new())
            .await?;
        Ok(envelope.message)
    }

    // ========================================================================
    // Profile
    // ========================================================================

    pub async fn get_profile(&self) -> Result<UserProfile, ApiError> {
        let record: UserRecord = self.get("/users/getUser").await?;
        record
            .into_profile()
            .ok_or_else(|| ApiError::InvalidResponse("Profile is missing required fields".to_string()))
    }

    pub async fn update_profile(&self, id: &str, name: &str, email: &str) -> Result<Option<String>, ApiError> {
        let path = format!("/users/update/{}", id);
        let envelope: Envelope<serde_json::Value> = self
            .with_body(Method::PATCH, &path, &ProfileUpdateBody { name, email })
            .await?;
        Ok(envelope.message)
    }

    pub async fn delete_account(&self, id: &str) -> Result<(), ApiError> {
        let path = format!("/users/delete/{}", id);
        self.send_empty(Method::DELETE, &path).await?;
        Ok(())
    }
}

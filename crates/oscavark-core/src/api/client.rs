//! HTTP client for the hosted Supabase project.
//!
//! `SupabaseClient` speaks to two services behind the same base URL:
//! GoTrue (`/auth/v1`) for accounts and sessions, and PostgREST
//! (`/rest/v1`) for table rows.

use std::time::Duration;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use reqwest::{header, Client, RequestBuilder, Response};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use tracing::{debug, warn};

use crate::auth::SessionData;
use crate::config::SupabaseSettings;

use super::query::{parse_content_range_total, Query};
use super::ApiError;

// ============================================================================
// Constants
// ============================================================================

/// HTTP request timeout in seconds.
const REQUEST_TIMEOUT_SECS: u64 = 30;

/// Maximum number of retries for rate-limited (429) requests.
const MAX_RATE_LIMIT_RETRIES: u32 = 3;

/// Initial backoff delay in milliseconds for rate limiting.
const INITIAL_BACKOFF_MS: u64 = 1000;

const AUTH_PATH: &str = "/auth/v1";
const REST_PATH: &str = "/rest/v1";

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    refresh_token: String,
    #[serde(default)]
    expires_in: i64,
    expires_at: Option<i64>,
    user: AuthUser,
}

impl TokenResponse {
    fn into_session(self) -> SessionData {
        let expires_at = self
            .expires_at
            .and_then(|ts| DateTime::<Utc>::from_timestamp(ts, 0))
            .unwrap_or_else(|| Utc::now() + chrono::Duration::seconds(self.expires_in));
        SessionData {
            access_token: self.access_token,
            refresh_token: self.refresh_token,
            user_id: self.user.id,
            email: self.user.email.unwrap_or_default(),
            expires_at,
            role: None,
        }
    }
}

/// The account record GoTrue returns; profile data lives in `profiles`.
#[derive(Debug, Clone, Deserialize)]
pub struct AuthUser {
    pub id: String,
    pub email: Option<String>,
    #[serde(default)]
    pub user_metadata: serde_json::Value,
}

/// Signup returns a session when email confirmation is off, and the bare
/// user otherwise.
#[derive(Debug, Clone)]
pub enum SignUpOutcome {
    SignedIn(SessionData),
    ConfirmationRequired { user_id: String },
}

/// Supabase client.
/// Clone is cheap - reqwest::Client uses Arc internally for connection pooling.
#[derive(Clone)]
pub struct SupabaseClient {
    client: Client,
    base_url: String,
    anon_key: String,
    token: Option<String>,
}

impl SupabaseClient {
    pub fn new(settings: &SupabaseSettings) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()?;

        Ok(Self {
            client,
            base_url: settings.url.trim_end_matches('/').to_string(),
            anon_key: settings.anon_key.clone(),
            token: None,
        })
    }

    /// Set the bearer token for authenticated requests
    pub fn set_token(&mut self, token: String) {
        self.token = Some(token);
    }

    pub fn clear_token(&mut self) {
        self.token = None;
    }

    pub fn has_token(&self) -> bool {
        self.token.is_some()
    }

    /// Create a new client with the given token, sharing the connection pool.
    pub fn with_token(&self, token: String) -> Self {
        Self {
            client: self.client.clone(),
            base_url: self.base_url.clone(),
            anon_key: self.anon_key.clone(),
            token: Some(token),
        }
    }

    fn auth_url(&self, path: &str) -> String {
        format!("{}{}{}", self.base_url, AUTH_PATH, path)
    }

    fn rest_url(&self, table: &str) -> String {
        format!("{}{}/{}", self.base_url, REST_PATH, table)
    }

    fn headers(&self) -> Result<header::HeaderMap> {
        let mut headers = header::HeaderMap::new();
        headers.insert("apikey", header::HeaderValue::from_str(&self.anon_key)?);
        // Without a user token PostgREST runs as the anon role
        let bearer = self.token.as_deref().unwrap_or(&self.anon_key);
        headers.insert(
            header::AUTHORIZATION,
            header::HeaderValue::from_str(&format!("Bearer {}", bearer))?,
        );
        Ok(headers)
    }

    /// Check if response is successful, returning an error with body if not.
    /// Returns Ok(Some(response)) for success, Ok(None) for rate limit (should retry),
    /// or Err for other errors.
    async fn check_response_for_retry(response: Response) -> Result<Option<Response>> {
        if response.status().is_success() {
            Ok(Some(response))
        } else if response.status().as_u16() == 429 {
            Ok(None)
        } else {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            Err(ApiError::from_status(status, &body).into())
        }
    }

    /// Send a request, backing off and resending while rate limited.
    async fn send<F>(&self, label: &str, build: F) -> Result<Response>
    where
        F: Fn() -> Result<RequestBuilder>,
    {
        let mut retries = 0;
        let mut backoff_ms = INITIAL_BACKOFF_MS;

        loop {
            let response = build()?
                .send()
                .await
                .map_err(ApiError::from)
                .with_context(|| format!("Failed to send request: {}", label))?;

            match Self::check_response_for_retry(response).await? {
                Some(response) => return Ok(response),
                None => {
                    retries += 1;
                    if retries > MAX_RATE_LIMIT_RETRIES {
                        return Err(ApiError::RateLimited.into());
                    }
                    warn!(request = label, retry = retries, backoff_ms, "Rate limited, backing off");
                    tokio::time::sleep(Duration::from_millis(backoff_ms)).await;
                    backoff_ms *= 2;
                }
            }
        }
    }

    async fn parse_json<T: DeserializeOwned>(label: &str, response: Response) -> Result<T> {
        let text = response
            .text()
            .await
            .with_context(|| format!("Failed to read response body: {}", label))?;
        serde_json::from_str(&text).map_err(|e| {
            let preview: String = text.chars().take(500).collect();
            debug!(request = label, body = %preview, "Unparseable response");
            ApiError::InvalidResponse(format!("{}: {}", label, e)).into()
        })
    }

    // ===== Auth (GoTrue) =====

    /// Exchange email and password for a session.
    pub async fn sign_in_with_password(&self, email: &str, password: &str) -> Result<SessionData> {
        let url = self.auth_url("/token?grant_type=password");
        let body = serde_json::json!({ "email": email, "password": password });

        let response = self
            .send("sign in", || Ok(self.client.post(&url).headers(self.headers()?).json(&body)))
            .await?;
        let token: TokenResponse = Self::parse_json("sign in", response).await?;
        Ok(token.into_session())
    }

    /// Trade a refresh token for a new session.
    pub async fn refresh_session(&self, refresh_token: &str) -> Result<SessionData> {
        let url = self.auth_url("/token?grant_type=refresh_token");
        let body = serde_json::json!({ "refresh_token": refresh_token });

        let response = self
            .send("refresh session", || {
                Ok(self.client.post(&url).headers(self.headers()?).json(&body))
            })
            .await?;
        let token: TokenResponse = Self::parse_json("refresh session", response).await?;
        Ok(token.into_session())
    }

    /// Create an account. `metadata` is stored as the user's `user_metadata`.
    pub async fn sign_up(
        &self,
        email: &str,
        password: &str,
        metadata: &serde_json::Value,
    ) -> Result<SignUpOutcome> {
        let url = self.auth_url("/signup");
        let body = serde_json::json!({
            "email": email,
            "password": password,
            "data": metadata,
        });

        let response = self
            .send("sign up", || Ok(self.client.post(&url).headers(self.headers()?).json(&body)))
            .await?;
        let value: serde_json::Value = Self::parse_json("sign up", response).await?;
        Self::parse_sign_up(value)
    }

    fn parse_sign_up(value: serde_json::Value) -> Result<SignUpOutcome> {
        if value.get("access_token").is_some() {
            let token: TokenResponse = serde_json::from_value(value)
                .map_err(|e| ApiError::InvalidResponse(format!("sign up: {}", e)))?;
            return Ok(SignUpOutcome::SignedIn(token.into_session()));
        }
        // Confirmation flow: the body is the user itself (or wraps it)
        let user = value.get("user").cloned().unwrap_or(value);
        let user: AuthUser = serde_json::from_value(user)
            .map_err(|e| ApiError::InvalidResponse(format!("sign up: {}", e)))?;
        Ok(SignUpOutcome::ConfirmationRequired { user_id: user.id })
    }

    /// Revoke the current session server-side.
    pub async fn sign_out(&self) -> Result<()> {
        if self.token.is_none() {
            return Ok(());
        }
        let url = self.auth_url("/logout");
        self.send("sign out", || Ok(self.client.post(&url).headers(self.headers()?)))
            .await?;
        Ok(())
    }

    /// Fetch the account behind the current token.
    pub async fn get_user(&self) -> Result<AuthUser> {
        let url = self.auth_url("/user");
        let response = self
            .send("get user", || Ok(self.client.get(&url).headers(self.headers()?)))
            .await?;
        Self::parse_json("get user", response).await
    }

    // ===== Rows (PostgREST) =====

    /// Fetch all rows matching the query.
    pub async fn select<T: DeserializeOwned>(&self, query: &Query) -> Result<Vec<T>> {
        let url = self.rest_url(query.table_name());
        let params = query.params();
        let label = format!("select {}", query.table_name());

        let response = self
            .send(&label, || {
                Ok(self.client.get(&url).headers(self.headers()?).query(&params))
            })
            .await?;
        Self::parse_json(&label, response).await
    }

    /// Fetch the first matching row, if any.
    pub async fn select_one<T: DeserializeOwned>(&self, query: &Query) -> Result<Option<T>> {
        let rows: Vec<T> = self.select(&query.clone().limit(1)).await?;
        Ok(rows.into_iter().next())
    }

    /// Count matching rows without transferring them.
    pub async fn count(&self, query: &Query) -> Result<u64> {
        let url = self.rest_url(query.table_name());
        let params = query.params();
        let label = format!("count {}", query.table_name());

        let response = self
            .send(&label, || {
                Ok(self
                    .client
                    .head(&url)
                    .headers(self.headers()?)
                    .header("Prefer", "count=exact")
                    .query(&params))
            })
            .await?;

        let range = response
            .headers()
            .get(header::CONTENT_RANGE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default();
        parse_content_range_total(range)
            .ok_or_else(|| ApiError::InvalidResponse(format!("{}: no Content-Range total", label)).into())
    }

    /// Insert one row and return it as stored.
    pub async fn insert<T, B>(&self, table: &str, row: &B) -> Result<T>
    where
        T: DeserializeOwned,
        B: Serialize + ?Sized,
    {
        let url = self.rest_url(table);
        let label = format!("insert {}", table);

        let response = self
            .send(&label, || {
                Ok(self
                    .client
                    .post(&url)
                    .headers(self.headers()?)
                    .header("Prefer", "return=representation")
                    .json(row))
            })
            .await?;
        let rows: Vec<T> = Self::parse_json(&label, response).await?;
        rows.into_iter()
            .next()
            .ok_or_else(|| ApiError::InvalidResponse(format!("{}: empty representation", label)).into())
    }

    /// Insert or merge one row on the query's `on_conflict` target.
    pub async fn upsert<T, B>(&self, query: &Query, row: &B) -> Result<T>
    where
        T: DeserializeOwned,
        B: Serialize + ?Sized,
    {
        let url = self.rest_url(query.table_name());
        let params = query.params();
        let label = format!("upsert {}", query.table_name());

        let response = self
            .send(&label, || {
                Ok(self
                    .client
                    .post(&url)
                    .headers(self.headers()?)
                    .header("Prefer", "resolution=merge-duplicates,return=representation")
                    .query(&params)
                    .json(row))
            })
            .await?;
        let rows: Vec<T> = Self::parse_json(&label, response).await?;
        rows.into_iter()
            .next()
            .ok_or_else(|| ApiError::InvalidResponse(format!("{}: empty representation", label)).into())
    }

    /// Patch every row the query matches and return the updated rows.
    pub async fn update<T, B>(&self, query: &Query, patch: &B) -> Result<Vec<T>>
    where
        T: DeserializeOwned,
        B: Serialize + ?Sized,
    {
        Self::require_filters(query, "update")?;
        let url = self.rest_url(query.table_name());
        let params = query.params();
        let label = format!("update {}", query.table_name());

        let response = self
            .send(&label, || {
                Ok(self
                    .client
                    .patch(&url)
                    .headers(self.headers()?)
                    .header("Prefer", "return=representation")
                    .query(&params)
                    .json(patch))
            })
            .await?;
        Self::parse_json(&label, response).await
    }

    /// Delete every row the query matches.
    pub async fn delete(&self, query: &Query) -> Result<()> {
        Self::require_filters(query, "delete")?;
        let url = self.rest_url(query.table_name());
        let params = query.params();
        let label = format!("delete {}", query.table_name());

        self.send(&label, || {
            Ok(self.client.delete(&url).headers(self.headers()?).query(&params))
        })
        .await?;
        Ok(())
    }

    /// Unfiltered writes would touch the whole table.
    fn require_filters(query: &Query, verb: &str) -> Result<()> {
        if query.has_filters() {
            Ok(())
        } else {
            Err(anyhow::anyhow!(
                "Refusing to {} {} without a filter",
                verb,
                query.table_name()
            ))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn settings() -> SupabaseSettings {
        SupabaseSettings {
            url: "https://demo.supabase.co/".to_string(),
            anon_key: "anon-key".to_string(),
        }
    }

    #[test]
    fn test_urls_strip_trailing_slash() {
        let client = SupabaseClient::new(&settings()).expect("client");
        assert_eq!(
            client.auth_url("/token?grant_type=password"),
            "https://demo.supabase.co/auth/v1/token?grant_type=password"
        );
        assert_eq!(
            client.rest_url("profiles"),
            "https://demo.supabase.co/rest/v1/profiles"
        );
    }

    #[test]
    fn test_headers_fall_back_to_anon_key() {
        let client = SupabaseClient::new(&settings()).expect("client");
        let headers = client.headers().expect("headers");
        assert_eq!(headers.get("apikey").unwrap(), "anon-key");
        assert_eq!(headers.get(header::AUTHORIZATION).unwrap(), "Bearer anon-key");

        let authed = client.with_token("user-jwt".to_string());
        let headers = authed.headers().expect("headers");
        assert_eq!(headers.get(header::AUTHORIZATION).unwrap(), "Bearer user-jwt");
        assert!(!client.has_token());
        assert!(authed.has_token());
    }

    #[test]
    fn test_token_response_into_session() {
        let json = r#"{
            "access_token": "jwt",
            "token_type": "bearer",
            "expires_in": 3600,
            "expires_at": 1893456000,
            "refresh_token": "refresh",
            "user": {"id": "8d0c0a2e-0000-4000-8000-000000000001", "email": "lola@example.ph", "user_metadata": {"role": "senior"}}
        }"#;
        let token: TokenResponse = serde_json::from_str(json).expect("parse");
        let session = token.into_session();
        assert_eq!(session.access_token, "jwt");
        assert_eq!(session.refresh_token, "refresh");
        assert_eq!(session.email, "lola@example.ph");
        assert_eq!(session.expires_at.timestamp(), 1893456000);
        assert!(session.role.is_none());
    }

    #[test]
    fn test_parse_sign_up_variants() {
        let confirm = serde_json::json!({"id": "user-1", "email": "t@example.ph"});
        match SupabaseClient::parse_sign_up(confirm).expect("parse") {
            SignUpOutcome::ConfirmationRequired { user_id } => assert_eq!(user_id, "user-1"),
            other => panic!("unexpected {:?}", other),
        }

        let signed_in = serde_json::json!({
            "access_token": "jwt",
            "refresh_token": "r",
            "expires_in": 3600,
            "user": {"id": "user-2", "email": "s@example.ph"}
        });
        match SupabaseClient::parse_sign_up(signed_in).expect("parse") {
            SignUpOutcome::SignedIn(session) => assert_eq!(session.user_id, "user-2"),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_writes_require_filters() {
        let unfiltered = Query::table("senior_citizens");
        assert!(SupabaseClient::require_filters(&unfiltered, "delete").is_err());
        let filtered = unfiltered.eq("id", "abc");
        assert!(SupabaseClient::require_filters(&filtered, "delete").is_ok());
    }
}

//! OAuth client-credentials token exchange with an owned cache.
//!
//! Every [`crate::convert::Converter`] owns exactly one [`TokenManager`], so
//! concurrent batch jobs never share (or race on) a token. The cached token
//! expires 30 seconds before the lifetime the service granted, which keeps a
//! long upload from starting with a token that dies mid-request.

use crate::config::ConversionConfig;
use crate::credentials::Credentials;
use crate::error::Pdf2DocxError;
use crate::pipeline::describe_failure;
use serde::Deserialize;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info};

/// Seconds shaved off the granted lifetime.
pub const EXPIRY_MARGIN_SECS: u64 = 30;

/// A bearer token and the instant after which it must not be reused.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenCache {
    pub access_token: String,
    pub expires_at: Instant,
}

impl TokenCache {
    pub fn new(access_token: impl Into<String>, expires_at: Instant) -> Self {
        Self {
            access_token: access_token.into(),
            expires_at,
        }
    }

    /// Cache entry for a token that lives `expires_in_secs` from now,
    /// minus [`EXPIRY_MARGIN_SECS`] (saturating at now).
    pub fn from_lifetime(access_token: impl Into<String>, expires_in_secs: u64) -> Self {
        let lifetime = Duration::from_secs(expires_in_secs.saturating_sub(EXPIRY_MARGIN_SECS));
        Self::new(access_token, Instant::now() + lifetime)
    }

    /// `true` while `expires_at > now`.
    pub fn is_valid(&self) -> bool {
        self.expires_at > Instant::now()
    }
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    expires_in: u64,
}

/// Exchanges credentials for bearer tokens and caches the result.
pub struct TokenManager {
    http: reqwest::Client,
    token_url: String,
    scope: String,
    timeout: Duration,
    credentials: Arc<Credentials>,
    cache: Option<TokenCache>,
}

impl TokenManager {
    pub fn new(http: reqwest::Client, config: &ConversionConfig, credentials: Arc<Credentials>) -> Self {
        Self {
            http,
            token_url: config.token_url.clone(),
            scope: config.scope.clone(),
            timeout: Duration::from_secs(config.request_timeout_secs),
            credentials,
            cache: None,
        }
    }

    /// Seed the cache, e.g. with a token obtained elsewhere.
    pub fn with_cache(mut self, cache: TokenCache) -> Self {
        self.cache = Some(cache);
        self
    }

    pub fn cached(&self) -> Option<&TokenCache> {
        self.cache.as_ref()
    }

    /// Return the cached token while it is valid, otherwise exchange the
    /// credentials for a new one.
    ///
    /// # Errors
    /// [`Pdf2DocxError::AuthError`] on transport failure, a non-success
    /// status, or a body missing `access_token` / `expires_in`. Never retried
    /// here; the caller decides.
    pub async fn access_token(&mut self) -> Result<String, Pdf2DocxError> {
        if let Some(cache) = self.cache.as_ref().filter(|c| c.is_valid()) {
            debug!("Reusing cached access token");
            return Ok(cache.access_token.clone());
        }

        let fresh = self.exchange().await?;
        let token = fresh.access_token.clone();
        self.cache = Some(fresh);
        Ok(token)
    }

    async fn exchange(&self) -> Result<TokenCache, Pdf2DocxError> {
        let params = [
            ("grant_type", "client_credentials"),
            ("client_id", self.credentials.client_id.as_str()),
            ("client_secret", self.credentials.client_secret.as_str()),
            ("scope", self.scope.as_str()),
        ];

        let response = self
            .http
            .post(&self.token_url)
            .form(&params)
            .timeout(self.timeout)
            .send()
            .await
            .map_err(|e| Pdf2DocxError::AuthError {
                detail: format!("token request failed: {e}"),
            })?;

        if !response.status().is_success() {
            return Err(Pdf2DocxError::AuthError {
                detail: describe_failure(response).await,
            });
        }

        let body: TokenResponse = response.json().await.map_err(|e| Pdf2DocxError::AuthError {
            detail: format!("malformed token response: {e}"),
        })?;

        if body.access_token.is_empty() {
            return Err(Pdf2DocxError::AuthError {
                detail: "token response has an empty access_token".into(),
            });
        }

        info!("Access token acquired (expires in {}s)", body.expires_in);
        Ok(TokenCache::from_lifetime(body.access_token, body.expires_in))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lifetime_applies_margin() {
        let before = Instant::now();
        let c = TokenCache::from_lifetime("t", 3600);
        assert!(c.expires_at >= before + Duration::from_secs(3600 - EXPIRY_MARGIN_SECS));
        assert!(c.expires_at <= Instant::now() + Duration::from_secs(3600 - EXPIRY_MARGIN_SECS));
        assert!(c.is_valid());
    }

    #[test]
    fn short_lifetime_is_immediately_stale() {
        let c = TokenCache::from_lifetime("t", 10);
        assert!(!c.is_valid());
    }

    #[test]
    fn token_at_expiry_instant_is_not_valid() {
        let c = TokenCache::new("t", Instant::now());
        assert!(!c.is_valid());
    }

    #[tokio::test]
    async fn valid_cache_needs_no_network() {
        // Unroutable token URL: any network attempt would fail the test.
        let config = ConversionConfig::builder()
            .token_url("http://127.0.0.1:9/token")
            .build()
            .unwrap();
        let creds = Arc::new(Credentials::new("id", "secret"));
        let mut tm = TokenManager::new(reqwest::Client::new(), &config, creds)
            .with_cache(TokenCache::from_lifetime("cached-token", 3600));

        let t1 = tm.access_token().await.unwrap();
        let t2 = tm.access_token().await.unwrap();
        assert_eq!(t1, "cached-token");
        assert_eq!(t2, "cached-token");
    }
}

//! Cached client-credentials access token for the provider API

use crate::FareError;
use chrono::{DateTime, Duration, Utc};
use reqwest::Client;
use serde::Deserialize;
use tokio::sync::Mutex;
use tracing::{debug, info, instrument, warn};

/// Tokens are renewed this long before they actually expire
pub const REFRESH_MARGIN_SECS: i64 = 5 * 60;

/// A provider access token and its expiry
#[derive(Debug, Clone, PartialEq)]
pub struct AccessToken {
    pub value: String,
    pub expires_at: DateTime<Utc>,
}

impl AccessToken {
    /// True while `now` is outside the refresh margin
    pub fn is_fresh(&self, now: DateTime<Utc>) -> bool {
        now < self.expires_at - Duration::seconds(REFRESH_MARGIN_SECS)
    }
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    expires_in: i64,
}

/// Process-wide token cache.
///
/// The lock is held across a refresh, so concurrent callers that find a
/// stale token wait for one exchange instead of each issuing their own.
pub struct TokenCache {
    http_client: Client,
    auth_url: String,
    client_id: String,
    client_secret: String,
    current: Mutex<Option<AccessToken>>,
}

impl TokenCache {
    pub fn new(http_client: Client, auth_url: &str, client_id: &str, client_secret: &str) -> Self {
        Self {
            http_client,
            auth_url: auth_url.to_string(),
            client_id: client_id.to_string(),
            client_secret: client_secret.to_string(),
            current: Mutex::new(None),
        }
    }

    /// Return a valid token, exchanging credentials when the cached one is
    /// missing or inside the refresh margin.
    pub async fn get_token(&self) -> Result<String, FareError> {
        let mut current = self.current.lock().await;

        if let Some(token) = current.as_ref() {
            if token.is_fresh(Utc::now()) {
                return Ok(token.value.clone());
            }
            debug!(expires_at = %token.expires_at, "Cached access token is about to expire");
        }

        let token = self.exchange_credentials().await?;
        let value = token.value.clone();
        *current = Some(token);
        Ok(value)
    }

    /// Snapshot of the cached token, if any
    pub async fn cached(&self) -> Option<AccessToken> {
        self.current.lock().await.clone()
    }

    #[instrument(level = "debug", skip(self), fields(auth_url = %self.auth_url))]
    async fn exchange_credentials(&self) -> Result<AccessToken, FareError> {
        let form = [
            ("grant_type", "client_credentials"),
            ("client_id", self.client_id.as_str()),
            ("client_secret", self.client_secret.as_str()),
        ];

        let response = self.http_client.post(&self.auth_url).form(&form).send().await?;
        let status = response.status();
        let body = response.text().await?;

        if status != reqwest::StatusCode::OK {
            warn!(status = %status, "Access token exchange rejected");
            return Err(FareError::Token {
                status: status.as_u16(),
                body,
            });
        }

        let parsed: TokenResponse = serde_json::from_str(&body)?;
        let expires_at = Some(parsed.expires_in)
            .filter(|secs| *secs > 0)
            .and_then(Duration::try_seconds)
            .and_then(|lifetime| Utc::now().checked_add_signed(lifetime));
        let Some(expires_at) = expires_at else {
            warn!(expires_in = parsed.expires_in, "Access token lifetime out of range");
            return Err(FareError::Token {
                status: status.as_u16(),
                body,
            });
        };

        info!(expires_in = parsed.expires_in, "Access token obtained");
        Ok(AccessToken {
            value: parsed.access_token,
            expires_at,
        })
    }
}

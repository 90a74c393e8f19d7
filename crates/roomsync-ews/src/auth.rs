//! OAuth2 client-credentials authentication for Exchange Online.

use chrono::{DateTime, Duration, Utc};
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use tokio::sync::RwLock;
use tracing::debug;

use crate::error::{EwsError, EwsResult};

/// EWS endpoint of Exchange Online.
pub const EXCHANGE_ONLINE_URL: &str = "https://outlook.office365.com/EWS/Exchange.asmx";

/// OAuth2 scope requested for EWS access.
const SCOPE: &str = "https://outlook.office365.com/.default";

/// OAuth2 token response from Azure AD.
#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    expires_in: i64,
    #[allow(dead_code)]
    token_type: String,
}

/// Cached OAuth2 access token.
#[derive(Debug, Clone)]
struct CachedToken {
    access_token: String,
    expires_at: DateTime<Utc>,
}

impl CachedToken {
    /// True if the token is expired or will expire within the grace
    /// period.
    fn is_expired(&self, grace_period: Duration) -> bool {
        Utc::now() + grace_period >= self.expires_at
    }
}

/// Token cache for managing OAuth2 access tokens.
pub struct TokenCache {
    client_id: String,
    client_secret: SecretString,
    tenant_id: String,
    login_endpoint: String,
    http_client: reqwest::Client,
    cached_token: RwLock<Option<CachedToken>>,
    /// Grace period before expiry to trigger refresh.
    grace_period: Duration,
}

impl TokenCache {
    /// Creates a new token cache against the public Azure AD login
    /// endpoint.
    pub fn new(client_id: String, client_secret: SecretString, tenant_id: String) -> Self {
        Self::with_login_endpoint(
            client_id,
            client_secret,
            tenant_id,
            "https://login.microsoftonline.com".to_string(),
        )
    }

    /// Creates a token cache against a custom login endpoint.
    pub fn with_login_endpoint(
        client_id: String,
        client_secret: SecretString,
        tenant_id: String,
        login_endpoint: String,
    ) -> Self {
        Self {
            client_id,
            client_secret,
            tenant_id,
            login_endpoint,
            http_client: reqwest::Client::new(),
            cached_token: RwLock::new(None),
            grace_period: Duration::minutes(5),
        }
    }

    /// Gets a valid access token, refreshing if necessary.
    pub async fn get_token(&self) -> EwsResult<String> {
        {
            let cache = self.cached_token.read().await;
            if let Some(ref token) = *cache {
                if !token.is_expired(self.grace_period) {
                    debug!("Using cached token");
                    return Ok(token.access_token.clone());
                }
            }
        }

        debug!("Refreshing access token");
        let new_token = self.acquire_token().await?;

        {
            let mut cache = self.cached_token.write().await;
            *cache = Some(new_token.clone());
        }

        Ok(new_token.access_token)
    }

    /// Acquires a new access token using the client-credentials flow.
    async fn acquire_token(&self) -> EwsResult<CachedToken> {
        let token_url = format!(
            "{}/{}/oauth2/v2.0/token",
            self.login_endpoint, self.tenant_id
        );

        let params = [
            ("grant_type", "client_credentials"),
            ("client_id", &self.client_id),
            ("client_secret", self.client_secret.expose_secret()),
            ("scope", SCOPE),
        ];

        let response = self
            .http_client
            .post(&token_url)
            .form(&params)
            .send()
            .await
            .map_err(|e| EwsError::Auth(format!("token request failed: {e}")))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(EwsError::Auth(format!(
                "token endpoint returned {status}: {body}"
            )));
        }

        let token: TokenResponse = response
            .json()
            .await
            .map_err(|e| EwsError::Auth(format!("invalid token response: {e}")))?;

        Ok(CachedToken {
            access_token: token.access_token,
            expires_at: Utc::now() + Duration::seconds(token.expires_in),
        })
    }

}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cached_token_expiry_respects_grace_period() {
        let token = CachedToken {
            access_token: "t".into(),
            expires_at: Utc::now() + Duration::minutes(3),
        };
        assert!(token.is_expired(Duration::minutes(5)));
        assert!(!token.is_expired(Duration::minutes(1)));
    }
}

//! Per-tenant configuration record and its typed credentials.

use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::filter::FilterRule;

/// Configuration validation errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Neither a complete OAuth triple nor a complete NTLM triple was
    /// provided. Such a configuration is rejected at load and its
    /// tasks never start.
    #[error("either OAuth (clientId/clientSecret/tenantId) or NTLM (username/password/ewsURL) credentials must be provided")]
    MissingCredentials,
}

/// A per-tenant sync configuration.
///
/// Field names mirror the JSON surface of the configuration API.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Configuration {
    /// Internal identifier, assigned on insert.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,

    // Exchange Online (OAuth client credentials).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub client_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub client_secret: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tenant_id: Option<String>,

    // On-premises Exchange (NTLM).
    #[serde(rename = "ewsURL", skip_serializing_if = "Option::is_none")]
    pub ews_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,

    /// Principal impersonated for ambient operations and used as the
    /// fallback organizer.
    #[serde(rename = "serviceUserUPN")]
    pub service_user_upn: String,

    /// Room list to discover rooms from. Empty or absent disables
    /// discovery.
    #[serde(rename = "roomListUPN", skip_serializing_if = "Option::is_none")]
    pub room_list_upn: Option<String>,

    /// Base URL of the downstream Booking service.
    #[serde(rename = "bookingAppURL")]
    pub booking_url: String,

    #[serde(default = "default_true")]
    pub enable: bool,
    /// Interval between collector passes, in seconds.
    pub refresh_interval: i32,
    /// Outbound request timeout, in seconds.
    pub request_timeout: i32,
    /// OR-of-AND rule matrix applied to discovered rooms.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub asset_filter: Option<Vec<Vec<FilterRule>>>,
    /// Set by the engine while the configuration's tasks are running.
    #[serde(default)]
    pub active: bool,
    /// Downstream projects the discovered rooms are registered in.
    #[serde(rename = "projectIDs", default)]
    pub project_ids: Vec<String>,
    /// Last user who edited the configuration, for notifications.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
}

fn default_true() -> bool {
    true
}

/// Validated Exchange credentials.
#[derive(Clone)]
pub enum Credentials {
    /// Exchange Online, OAuth2 client-credentials flow.
    OAuth {
        client_id: String,
        client_secret: SecretString,
        tenant_id: String,
    },
    /// On-premises Exchange behind NTLM; the EWS endpoint is explicit.
    Ntlm {
        username: String,
        password: SecretString,
        ews_url: String,
    },
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Credentials::OAuth { client_id, .. } => f
                .debug_struct("OAuth")
                .field("client_id", client_id)
                .finish_non_exhaustive(),
            Credentials::Ntlm {
                username, ews_url, ..
            } => f
                .debug_struct("Ntlm")
                .field("username", username)
                .field("ews_url", ews_url)
                .finish_non_exhaustive(),
        }
    }
}

fn filled(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|s| !s.is_empty())
}

impl Configuration {
    /// Resolves the configured credentials, preferring OAuth when both
    /// forms are complete.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::MissingCredentials`] when neither form
    /// is complete.
    pub fn credentials(&self) -> Result<Credentials, ConfigError> {
        if let (Some(client_id), Some(client_secret), Some(tenant_id)) = (
            filled(&self.client_id),
            filled(&self.client_secret),
            filled(&self.tenant_id),
        ) {
            return Ok(Credentials::OAuth {
                client_id: client_id.to_string(),
                client_secret: SecretString::from(client_secret.to_string()),
                tenant_id: tenant_id.to_string(),
            });
        }
        if let (Some(username), Some(password), Some(ews_url)) = (
            filled(&self.username),
            filled(&self.password),
            filled(&self.ews_url),
        ) {
            return Ok(Credentials::Ntlm {
                username: username.to_string(),
                password: SecretString::from(password.to_string()),
                ews_url: ews_url.to_string(),
            });
        }
        Err(ConfigError::MissingCredentials)
    }

    /// Whether room discovery is configured.
    #[must_use]
    pub fn room_list(&self) -> Option<&str> {
        filled(&self.room_list_upn)
    }
}

//! Token-file backed credentials.
//!
//! Reads an OAuth token in the format written by Google's client libraries
//! (`token.json`), refreshes it through the token endpoint when it has
//! expired, and writes the refreshed token back. There is no interactive
//! consent flow: a missing or unusable token yields no credential.

use std::path::{Path, PathBuf};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tracing::{error, info, warn};

use super::error::UploaderError;
use super::traits::CredentialProvider;
use super::types::Credential;

/// Tokens this close to expiry are refreshed ahead of time.
const EXPIRY_SKEW_SECS: i64 = 60;

/// On-disk token representation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredToken {
    #[serde(alias = "access_token")]
    pub token: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token_uri: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client_secret: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expiry: Option<DateTime<Utc>>,
    /// Fields we do not interpret (scopes, account) are preserved on rewrite.
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl StoredToken {
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expiry
            .map(|expiry| expiry - chrono::Duration::seconds(EXPIRY_SKEW_SECS) <= now)
            .unwrap_or(false)
    }

    fn can_refresh(&self) -> bool {
        self.refresh_token.is_some() && self.client_id.is_some() && self.client_secret.is_some()
    }
}

#[derive(Debug, Deserialize)]
struct RefreshResponse {
    access_token: String,
    #[serde(default)]
    expires_in: Option<i64>,
    #[serde(default)]
    refresh_token: Option<String>,
}

/// Credential provider backed by a token file.
pub struct TokenFileCredentialProvider {
    client: Client,
    path: PathBuf,
    default_token_endpoint: String,
    /// Serializes refreshes so concurrent tasks do not race on the file.
    refresh_lock: Mutex<()>,
}

impl TokenFileCredentialProvider {
    pub fn new(
        path: impl Into<PathBuf>,
        default_token_endpoint: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, UploaderError> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            path: path.into(),
            default_token_endpoint: default_token_endpoint.into(),
            refresh_lock: Mutex::new(()),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Reads the token file. A corrupt file is removed.
    async fn load(&self) -> Result<Option<StoredToken>, UploaderError> {
        let contents = match tokio::fs::read_to_string(&self.path).await {
            Ok(contents) => contents,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                warn!(path = %self.path.display(), "Token file not found");
                return Ok(None);
            }
            Err(e) => return Err(e.into()),
        };

        match serde_json::from_str::<StoredToken>(&contents) {
            Ok(token) => Ok(Some(token)),
            Err(e) => {
                warn!(
                    path = %self.path.display(),
                    error = %e,
                    "Token file is corrupt, removing it"
                );
                if let Err(e) = tokio::fs::remove_file(&self.path).await {
                    warn!(error = %e, "Failed to remove corrupt token file");
                }
                Ok(None)
            }
        }
    }

    async fn persist(&self, token: &StoredToken) -> Result<(), UploaderError> {
        let json = serde_json::to_string_pretty(token)
            .map_err(|e| UploaderError::Credential(e.to_string()))?;
        let tmp = self.path.with_extension("json.tmp");
        tokio::fs::write(&tmp, json).await?;
        tokio::fs::rename(&tmp, &self.path).await?;
        Ok(())
    }

    async fn refresh(&self, token: &StoredToken) -> Result<StoredToken, UploaderError> {
        let (Some(refresh_token), Some(client_id), Some(client_secret)) = (
            token.refresh_token.as_deref(),
            token.client_id.as_deref(),
            token.client_secret.as_deref(),
        ) else {
            return Err(UploaderError::Credential(
                "token cannot be refreshed".to_string(),
            ));
        };

        let endpoint = token
            .token_uri
            .as_deref()
            .unwrap_or(&self.default_token_endpoint);
        let params = [
            ("grant_type", "refresh_token"),
            ("refresh_token", refresh_token),
            ("client_id", client_id),
            ("client_secret", client_secret),
        ];

        let response = self.client.post(endpoint).form(&params).send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(UploaderError::Credential(format!(
                "refresh rejected (HTTP {}): {}",
                status.as_u16(),
                body.chars().take(200).collect::<String>()
            )));
        }

        let refreshed: RefreshResponse = response.json().await?;
        let mut updated = token.clone();
        updated.token = refreshed.access_token;
        updated.expiry = refreshed
            .expires_in
            .map(|secs| Utc::now() + chrono::Duration::seconds(secs));
        if let Some(rotated) = refreshed.refresh_token {
            updated.refresh_token = Some(rotated);
        }
        Ok(updated)
    }
}

#[async_trait]
impl CredentialProvider for TokenFileCredentialProvider {
    async fn get_credential(&self) -> Result<Option<Credential>, UploaderError> {
        let Some(token) = self.load().await? else {
            return Ok(None);
        };

        if !token.is_expired(Utc::now()) {
            return Ok(Some(Credential::new(token.token)));
        }

        let _guard = self.refresh_lock.lock().await;

        // Another task may have refreshed while we waited
        let Some(token) = self.load().await? else {
            return Ok(None);
        };
        if !token.is_expired(Utc::now()) {
            return Ok(Some(Credential::new(token.token)));
        }

        if !token.can_refresh() {
            warn!("Access token expired and no refresh token is available");
            return Ok(None);
        }

        info!("Refreshing access token");
        match self.refresh(&token).await {
            Ok(updated) => {
                if let Err(e) = self.persist(&updated).await {
                    warn!(error = %e, "Failed to save refreshed token");
                }
                Ok(Some(Credential::new(updated.token)))
            }
            Err(e) => {
                error!(error = %e, "Failed to refresh access token");
                Ok(None)
            }
        }
    }
}

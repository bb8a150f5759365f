//! Access tokens for a Google service account using the OAuth 2.0 JWT bearer grant.
//!
//! The sheet must be shared with the service account's `client_email` for this to work.

use crate::api::files::ServiceAccountKey;
use crate::api::OAUTH_SCOPES;
use crate::Result;
use anyhow::{bail, Context};
use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::debug;

const JWT_BEARER_GRANT: &str = "urn:ietf:params:oauth:grant-type:jwt-bearer";
const ASSERTION_LIFETIME_SECS: i64 = 3600;

/// Provides access tokens for a service account, requesting a new one when the last is about to
/// expire.
#[derive(Debug, Clone)]
pub(crate) struct ServiceAccount {
    key: ServiceAccountKey,
    token: Option<AccessToken>,
}

#[derive(Debug, Clone)]
struct AccessToken {
    value: String,
    expires_at: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
struct Claims<'a> {
    iss: &'a str,
    scope: String,
    aud: &'a str,
    iat: i64,
    exp: i64,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    expires_in: Option<i64>,
}

impl ServiceAccount {
    pub(crate) async fn load(key_path: &Path) -> Result<Self> {
        let key = ServiceAccountKey::load(key_path).await?;
        Ok(Self { key, token: None })
    }

    pub(crate) fn client_email(&self) -> &str {
        self.key.client_email()
    }

    /// The signed assertion sent to the token endpoint.
    fn assertion(&self, now: DateTime<Utc>) -> Result<String> {
        let claims = Claims {
            iss: self.client_email(),
            scope: OAUTH_SCOPES.join(" "),
            aud: self.key.token_uri(),
            iat: now.timestamp(),
            exp: now.timestamp() + ASSERTION_LIFETIME_SECS,
        };
        let key = EncodingKey::from_rsa_pem(self.key.private_key().as_bytes())
            .context("The service account private key is not a valid RSA PEM key")?;
        encode(&Header::new(Algorithm::RS256), &claims, &key)
            .context("Unable to sign the service account assertion")
    }

    /// Exchanges a fresh assertion for an access token.
    pub(crate) async fn refresh(&mut self) -> Result<()> {
        debug!("Requesting an access token for {}", self.client_email());
        let now = Utc::now();
        let assertion = self.assertion(now)?;
        let response = reqwest::Client::new()
            .post(self.key.token_uri())
            .form(&[("grant_type", JWT_BEARER_GRANT), ("assertion", &assertion)])
            .send()
            .await
            .context("Failed to send the service account token request")?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "Unable to read response body".to_string());
            bail!("The token endpoint refused the service account with status {status}: {body}");
        }

        let token: TokenResponse = response
            .json()
            .await
            .context("Failed to parse the service account token response")?;
        let lifetime = token.expires_in.unwrap_or(ASSERTION_LIFETIME_SECS);
        self.token = Some(AccessToken {
            value: token.access_token,
            expires_at: now + Duration::seconds(lifetime),
        });
        Ok(())
    }

    /// A valid access token, requesting a new one if there is none or it expires within 5 minutes.
    pub(crate) async fn token_with_refresh(&mut self) -> Result<String> {
        let fresh = self
            .token
            .as_ref()
            .is_some_and(|t| t.expires_at > Utc::now() + Duration::minutes(5));
        if !fresh {
            self.refresh().await?;
        }
        self.token
            .as_ref()
            .map(|t| t.value.clone())
            .context("No service account token is available")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_bad_private_key_is_reported() {
        let dir = TempDir::new().unwrap();
        let p = dir.path().join("sa.json");
        utils::write(
            &p,
            r#"{"type": "service_account", "client_email": "a@b.iam.gserviceaccount.com",
                "private_key": "not a key"}"#,
        )
        .await
        .unwrap();
        let account = ServiceAccount::load(&p).await.unwrap();
        assert_eq!(account.client_email(), "a@b.iam.gserviceaccount.com");
        let e = account.assertion(Utc::now()).unwrap_err();
        assert!(e.to_string().contains("not a valid RSA PEM key"));
    }
}

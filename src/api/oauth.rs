//! OAuth 2.0 installed-application flow for the Google Sheets API.
//!
//! `TokenProvider::initialize` runs the consent flow: it prints the Google consent URL, waits for
//! the browser to be redirected to a one-shot callback server on localhost, exchanges the code
//! for tokens and saves them to `token.json`. Afterwards `TokenProvider::load` reads the saved
//! tokens and refreshes the access token when it is about to expire, without a browser.

use crate::api::files::{File, SecretFile, TokenFile, REDIRECT};
use crate::api::OAUTH_SCOPES;
use crate::Result;
use anyhow::{anyhow, bail, Context};
use chrono::{DateTime, Utc};
use hyper::body::Incoming;
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper::{Request, Response, StatusCode};
use hyper_util::rt::TokioIo;
use oauth2::basic::{BasicClient, BasicTokenResponse};
use oauth2::{
    AuthUrl, AuthorizationCode, ClientId, ClientSecret, CsrfToken, PkceCodeChallenge,
    RedirectUrl, RefreshToken, Scope, TokenResponse, TokenUrl,
};
use std::convert::Infallible;
use std::path::Path;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::sync::oneshot;
use tracing::{debug, info, warn};

const OAUTH_CALLBACK_PORT: u16 = 3030;
const CALLBACK_TIMEOUT: Duration = Duration::from_secs(300);

/// Provides a valid access token from the saved OAuth tokens, refreshing it when needed.
#[derive(Debug, Clone)]
pub(crate) struct TokenProvider {
    secret: SecretFile,
    token: File<TokenFile>,
}

impl TokenProvider {
    /// Runs the consent flow and saves the resulting tokens to `token_path`.
    pub(crate) async fn initialize(secret_path: &Path, token_path: &Path) -> Result<Self> {
        info!("Starting OAuth consent flow");
        let secret = SecretFile::load(secret_path).await?;
        let redirect = format!("{REDIRECT}:{OAUTH_CALLBACK_PORT}");

        let client = BasicClient::new(ClientId::new(secret.client_id().to_string()))
            .set_client_secret(ClientSecret::new(secret.client_secret().to_string()))
            .set_auth_uri(AuthUrl::new(secret.auth_uri().to_string()).context("Bad auth_uri")?)
            .set_token_uri(
                TokenUrl::new(secret.token_uri().to_string()).context("Bad token_uri")?,
            )
            .set_redirect_uri(RedirectUrl::new(redirect.clone()).context("Bad redirect URI")?);

        let (pkce_challenge, pkce_verifier) = PkceCodeChallenge::new_random_sha256();
        let (auth_url, csrf_token) = client
            .authorize_url(CsrfToken::new_random)
            .add_scopes(OAUTH_SCOPES.iter().map(|s| Scope::new(s.to_string())))
            .add_extra_param("access_type", "offline")
            .add_extra_param("prompt", "consent")
            .set_pkce_challenge(pkce_challenge)
            .url();

        let listener = TcpListener::bind(("127.0.0.1", OAUTH_CALLBACK_PORT))
            .await
            .with_context(|| format!("Unable to listen on {redirect} for the OAuth callback"))?;
        info!("Open this URL in your browser to authorize access to your sheet:\n\n{auth_url}\n");
        info!("Waiting for the OAuth callback on {redirect}");

        let callback = wait_for_callback(listener).await?;
        if callback.state != *csrf_token.secret() {
            bail!("The OAuth callback state did not match, the authorization was not completed");
        }

        let response = client
            .exchange_code(AuthorizationCode::new(callback.code))
            .set_pkce_verifier(pkce_verifier)
            .request_async(&http_client()?)
            .await
            .context("Failed to exchange the authorization code for tokens")?;

        let refresh_token = response
            .refresh_token()
            .map(|t| t.secret().to_string())
            .context("Google did not return a refresh token")?;
        let token = TokenFile::new(
            granted_scopes(&response),
            response.access_token().secret().to_string(),
            refresh_token,
            expiry(&response),
        );
        let token = File::new(token_path, token);
        token.save().await?;
        info!("Authorization successful, tokens saved to {}", token_path.display());

        Ok(Self { secret, token })
    }

    /// Loads previously saved tokens. No network call is made.
    pub(crate) async fn load(secret_path: &Path, token_path: &Path) -> Result<Self> {
        let secret = SecretFile::load(secret_path).await?;
        let token = TokenFile::load(token_path).await?;
        Ok(Self { secret, token })
    }

    /// Uses the refresh token to get a new access token and saves it.
    pub(crate) async fn refresh(&mut self) -> Result<()> {
        debug!("Refreshing the OAuth access token");
        let client = BasicClient::new(ClientId::new(self.secret.client_id().to_string()))
            .set_client_secret(ClientSecret::new(self.secret.client_secret().to_string()))
            .set_token_uri(
                TokenUrl::new(self.secret.token_uri().to_string()).context("Bad token_uri")?,
            );

        let refresh_token = RefreshToken::new(self.token.data().refresh_token().to_string());
        let response = client
            .exchange_refresh_token(&refresh_token)
            .request_async(&http_client()?)
            .await
            .context("Failed to refresh the OAuth access token")?;

        self.token.data_mut().update(
            response.access_token().secret().to_string(),
            expiry(&response),
            response.refresh_token().map(|t| t.secret().to_string()),
        );
        self.token.save().await?;
        debug!(
            "Token saved to {}, valid until {}",
            self.token.path().display(),
            self.token.data().expires_at()
        );
        Ok(())
    }

    /// The current access token, whether or not it has expired.
    pub(crate) fn token(&self) -> &str {
        self.token.data().access_token()
    }

    /// The current access token, refreshed first if it is expired or about to expire.
    pub(crate) async fn token_with_refresh(&mut self) -> Result<String> {
        if self.token.data().is_expired() {
            self.refresh().await?;
        }
        Ok(self.token().to_string())
    }
}

/// An HTTP client for the token endpoint. It must not follow redirects.
fn http_client() -> Result<oauth2::reqwest::Client> {
    oauth2::reqwest::ClientBuilder::new()
        .redirect(oauth2::reqwest::redirect::Policy::none())
        .build()
        .context("Unable to build the HTTP client for OAuth")
}

fn granted_scopes(response: &BasicTokenResponse) -> Vec<String> {
    match response.scopes() {
        Some(scopes) => scopes.iter().map(|s| s.as_str().to_string()).collect(),
        None => OAUTH_SCOPES.iter().map(|s| s.to_string()).collect(),
    }
}

fn expiry(response: &BasicTokenResponse) -> DateTime<Utc> {
    let seconds = response
        .expires_in()
        .map(|d| d.as_secs() as i64)
        .unwrap_or(3600);
    Utc::now() + chrono::Duration::seconds(seconds)
}

#[derive(Debug)]
struct Callback {
    code: String,
    state: String,
}

type Outcome = std::result::Result<Callback, String>;

/// Serves requests on `listener` until one carries an authorization code (or an error) and
/// returns it. Other requests, such as the browser asking for a favicon, get a 404.
async fn wait_for_callback(listener: TcpListener) -> Result<Callback> {
    let (tx, rx) = oneshot::channel::<Outcome>();
    let tx = Arc::new(Mutex::new(Some(tx)));

    let server = tokio::spawn(async move {
        loop {
            let stream = match listener.accept().await {
                Ok((stream, _)) => stream,
                Err(e) => {
                    warn!("Failed to accept a connection on the OAuth callback port: {e}");
                    continue;
                }
            };
            let tx = tx.clone();
            let service = service_fn(move |req: Request<Incoming>| {
                let tx = tx.clone();
                async move { Ok::<_, Infallible>(handle_callback(req, &tx)) }
            });
            tokio::spawn(async move {
                if let Err(e) = http1::Builder::new()
                    .serve_connection(TokioIo::new(stream), service)
                    .await
                {
                    debug!("OAuth callback connection ended with an error: {e}");
                }
            });
        }
    });

    let outcome = tokio::time::timeout(CALLBACK_TIMEOUT, rx).await;
    server.abort();
    let outcome = outcome
        .context("Timed out waiting for the OAuth callback")?
        .context("The OAuth callback server stopped unexpectedly")?;
    outcome.map_err(|e| anyhow!("Authorization was denied: {e}"))
}

fn handle_callback(
    req: Request<Incoming>,
    tx: &Mutex<Option<oneshot::Sender<Outcome>>>,
) -> Response<String> {
    let outcome = match parse_callback(req.uri().query().unwrap_or_default()) {
        Some(outcome) => outcome,
        None => {
            let mut response = Response::new(String::from("Not found"));
            *response.status_mut() = StatusCode::NOT_FOUND;
            return response;
        }
    };
    let body = match &outcome {
        Ok(_) => "Authorization complete. You can close this window.",
        Err(_) => "Authorization failed. You can close this window.",
    };
    if let Some(sender) = tx.lock().ok().and_then(|mut guard| guard.take()) {
        let _ = sender.send(outcome);
    }
    Response::new(body.to_string())
}

/// Reads `code` and `state` (or `error`) from the callback query string. Returns `None` when the
/// request is not an OAuth callback at all.
fn parse_callback(query: &str) -> Option<Outcome> {
    let mut code = None;
    let mut state = None;
    for (key, value) in url::form_urlencoded::parse(query.as_bytes()) {
        match key.as_ref() {
            "code" => code = Some(value.into_owned()),
            "state" => state = Some(value.into_owned()),
            "error" => return Some(Err(value.into_owned())),
            _ => {}
        }
    }
    code.map(|code| {
        Ok(Callback {
            code,
            state: state.unwrap_or_default(),
        })
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_callback() {
        let outcome = parse_callback("state=abc&code=4%2F0Ab&scope=x").unwrap().unwrap();
        assert_eq!(outcome.code, "4/0Ab");
        assert_eq!(outcome.state, "abc");

        let denied = parse_callback("error=access_denied&state=abc").unwrap();
        assert_eq!(denied.unwrap_err(), "access_denied");

        assert!(parse_callback("").is_none());
        assert!(parse_callback("foo=bar").is_none());
    }
}

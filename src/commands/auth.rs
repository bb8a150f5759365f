//! Authentication command handlers.
//!
//! This module implements the CLI commands for:
//! - `stewardship auth` - Initial OAuth consent flow
//! - `stewardship auth --verify` - Verify and refresh the saved credentials

use crate::api::{Authorizer, TokenProvider};
use crate::commands::Out;
use crate::config::{AuthMethod, Backend};
use crate::error::{ErrorType, IntoResult};
use crate::{Config, Result};
use anyhow::{bail, Context};

fn require_google(config: &Config) -> Result<()> {
    if config.backend() == Backend::Sqlite {
        bail!("The sqlite backend does not use Google credentials")
    }
    Ok(())
}

/// Handles the `stewardship auth` command - runs the OAuth consent flow
///
/// This is the ONLY command that should open a browser for OAuth authentication.
///
/// This guides the user through setting up Google Sheets authentication:
/// 1. Checks for client_secret.json
/// 2. Opens browser for OAuth consent
/// 3. Saves tokens to token.json with required scopes
///
/// A service account needs no consent, so for one this only verifies the key.
pub async fn auth(config: &Config) -> Result<Out<()>> {
    require_google(config).pub_result(ErrorType::Config)?;
    if config.auth() == AuthMethod::ServiceAccount {
        return auth_verify(config).await;
    }
    let _ = TokenProvider::initialize(&config.client_secret_path(), &config.token_path())
        .await
        .pub_result(ErrorType::Connection)?;
    Ok(format!("Saved the OAuth token to {}", config.token_path().display()).into())
}

/// Handles the `stewardship auth --verify` command - verifies authentication
///
/// This command NEVER opens a browser or triggers an interactive OAuth flow. It loads the saved
/// credentials and obtains a fresh access token with them. If the token is missing, invalid, or
/// has the wrong scopes, this command fails with an error message telling the user to run
/// `stewardship auth`.
pub async fn auth_verify(config: &Config) -> Result<Out<()>> {
    require_google(config).pub_result(ErrorType::Config)?;
    let mut authorizer = Authorizer::load(config)
        .await
        .context(
            "Unable to use the saved credentials. \n\n\
            You should run 'stewardship auth' (without the --verify flag).",
        )
        .pub_result(ErrorType::Connection)?;
    authorizer
        .verify()
        .await
        .context("Unable to obtain a new access token")
        .pub_result(ErrorType::Connection)?;
    Ok(match config.auth() {
        AuthMethod::Oauth => "Your OAuth token is valid!",
        AuthMethod::ServiceAccount => "Your service account key is valid!",
    }
    .into())
}

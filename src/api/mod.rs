//! The store that holds the workbook tables, and the credentials used to reach it.
//!
//! Everything above this module talks to a `Workbook`, which reads and writes whole tables through
//! the narrow `Sheet` trait. `Sheet` is implemented for a Google sheet, for a local SQLite file
//! (see `crate::db`) and for an in-memory test store.

mod cache;
mod files;
mod google;
mod oauth;
mod service_account;
mod test_sheet;
mod workbook;

use crate::config::{AuthMethod, Backend};
use crate::db::Db;
use crate::{Config, Result};
use anyhow::Context;
use cache::CachedSheet;
use google::GoogleSheet;
use tracing::{debug, info};

pub(crate) use oauth::TokenProvider;
pub(crate) use service_account::ServiceAccount;
pub(crate) use test_sheet::TestSheet;
pub use workbook::Workbook;

/// The name of the table that holds per-category check amounts.
pub const BUDGETS: &str = "Budgets";
/// The name of the append-only spending ledger.
pub const DAILY_SPENDING: &str = "Daily_Spending";
/// The name of the key/value settings table.
pub const DASHBOARD_DATA: &str = "Dashboard_Data";

// The spreadsheets scope is what reads and writes need. drive.readonly lets the token list the
// sheet's tabs through the same credentials.
const OAUTH_SCOPES: &[&str] = &[
    "https://www.googleapis.com/auth/spreadsheets",
    "https://www.googleapis.com/auth/drive.readonly",
];

/// The narrow interface to a tabular store. Tables are addressed by name and rows are lists of
/// text cells. Row numbers are 1-based and row 1 is the header.
#[async_trait::async_trait]
pub(crate) trait Sheet {
    /// Makes sure `table` exists. A table that is created, or that exists but has no rows at all,
    /// receives `header` as its first row and `true` is returned. Otherwise nothing is written.
    async fn ensure_table(&mut self, table: &str, header: &[String]) -> Result<bool>;

    /// Every row of `table`, header first. Trailing empty cells may be missing.
    async fn get_rows(&mut self, table: &str) -> Result<Vec<Vec<String>>>;

    /// Adds `row` after the last row of `table`.
    async fn append_row(&mut self, table: &str, row: &[String]) -> Result<()>;

    /// Overwrites consecutive rows of `table` starting at `start_row`.
    async fn update_range(
        &mut self,
        table: &str,
        start_row: usize,
        rows: &[Vec<String>],
    ) -> Result<()>;
}

/// Whether the Google backend should really talk to Google.
#[derive(Debug, Default, Clone, Copy, Eq, PartialEq)]
pub enum Mode {
    #[default]
    Google,
    /// In-memory tables, seeded with sample data. No network calls are made.
    Testing,
}

const TEST_MODE_ENV: &str = "STEWARDSHIP_IN_TEST_MODE";

impl Mode {
    /// `Mode::Testing` when `STEWARDSHIP_IN_TEST_MODE` is set to a non-empty value.
    pub fn from_env() -> Self {
        match std::env::var(TEST_MODE_ENV) {
            Ok(value) if !value.is_empty() => Mode::Testing,
            _ => Mode::Google,
        }
    }
}

/// Supplies access tokens from whichever credential source the configuration names.
#[derive(Debug, Clone)]
pub(crate) enum Authorizer {
    OAuth(TokenProvider),
    ServiceAccount(ServiceAccount),
}

impl Authorizer {
    /// Reads the credentials named by `config`. No network call is made.
    pub(crate) async fn load(config: &Config) -> Result<Self> {
        match config.auth() {
            AuthMethod::Oauth => {
                let provider =
                    TokenProvider::load(&config.client_secret_path(), &config.token_path())
                        .await
                        .context("No usable OAuth token was found, run 'stewardship auth'")?;
                Ok(Authorizer::OAuth(provider))
            }
            AuthMethod::ServiceAccount => Ok(Authorizer::ServiceAccount(
                ServiceAccount::load(&config.service_account_path()).await?,
            )),
        }
    }

    /// A valid access token, refreshed if needed.
    pub(crate) async fn access_token(&mut self) -> Result<String> {
        match self {
            Authorizer::OAuth(provider) => provider.token_with_refresh().await,
            Authorizer::ServiceAccount(account) => account.token_with_refresh().await,
        }
    }

    /// Forces a new access token to be obtained, proving that the credentials work.
    pub(crate) async fn verify(&mut self) -> Result<()> {
        match self {
            Authorizer::OAuth(provider) => provider.refresh().await,
            Authorizer::ServiceAccount(account) => account.refresh().await,
        }
    }
}

/// Connects to the store named by `config`. Table reads are cached for the configured TTL.
pub(crate) async fn sheet(config: &Config, mode: Mode) -> Result<Box<dyn Sheet + Send>> {
    let store: Box<dyn Sheet + Send> = match (config.backend(), mode) {
        (Backend::Sqlite, _) => {
            debug!("Using the SQLite store at {}", config.sqlite_path().display());
            Box::new(Db::load(config.sqlite_path()).await?)
        }
        (Backend::GoogleSheets, Mode::Testing) => {
            info!("Test mode is on, using in-memory tables instead of Google Sheets");
            Box::new(TestSheet::new(config.spreadsheet_id()))
        }
        (Backend::GoogleSheets, Mode::Google) => {
            let authorizer = Authorizer::load(config).await?;
            Box::new(GoogleSheet::new(config.spreadsheet_id(), authorizer))
        }
    };
    Ok(Box::new(CachedSheet::new(store, config.cache_ttl())))
}

/// Connects to the store and makes sure the three tables exist, seeding them on first use.
pub(crate) async fn workbook(config: &Config, mode: Mode) -> Result<Workbook> {
    Workbook::open(sheet(config, mode).await?).await
}

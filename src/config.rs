//! Configuration file handling.
//!
//! The configuration file is stored at `$STEWARDSHIP_HOME/config.json` and says where the budget
//! tables live (a Google sheet or a local SQLite file), how to authorize against Google, and how
//! long connections and table reads may be cached.

use crate::{utils, Result};
use anyhow::{bail, ensure, Context};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use url::Url;

const APP_NAME: &str = "stewardship";
const CONFIG_VERSION: u8 = 1;
const SECRETS: &str = ".secrets";
const CLIENT_SECRET_JSON: &str = "client_secret.json";
const TOKEN_JSON: &str = "token.json";
const SERVICE_ACCOUNT_JSON: &str = "service_account.json";
const CONFIG_JSON: &str = "config.json";
const STEWARDSHIP_SQLITE: &str = "stewardship.sqlite";
const CONNECTION_TTL_SECS: u64 = 600;
const CACHE_TTL_SECS: u64 = 60;

/// Where the Budgets, Daily_Spending and Dashboard_Data tables are kept.
#[derive(
    Debug, Default, Clone, Copy, Eq, PartialEq, Hash, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "snake_case")]
pub enum Backend {
    /// Tabs of a Google sheet.
    #[default]
    GoogleSheets,
    /// A SQLite file in the home directory.
    Sqlite,
}

serde_plain::derive_display_from_serialize!(Backend);

/// How to obtain access tokens for the Google Sheets API.
#[derive(
    Debug, Default, Clone, Copy, Eq, PartialEq, Hash, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "snake_case")]
pub enum AuthMethod {
    /// Interactive consent in a browser, with a saved refresh token.
    #[default]
    Oauth,
    /// A service-account key file and the JWT bearer grant.
    ServiceAccount,
}

serde_plain::derive_display_from_serialize!(AuthMethod);

/// The `Config` object represents the configuration of the app. You instantiate it by providing
/// the path to `$STEWARDSHIP_HOME` and from there it loads `config.json`. It provides paths to
/// other items that are either configurable or are expected in a certain location within the home
/// directory.
#[derive(Debug, Clone)]
pub struct Config {
    root: PathBuf,
    secrets: PathBuf,
    config_path: PathBuf,
    config_file: ConfigFile,
    spreadsheet_id: String,
    sqlite_path: PathBuf,
}

impl Config {
    /// Creates the home directory, its subdirectories and an initial `config.json`.
    ///
    /// # Arguments
    /// - `dir` - The directory that will be the root of the home directory, e.g.
    ///   `$HOME/stewardship`
    /// - `backend` - Where the tables are kept.
    /// - `auth` - How to authorize against Google. Ignored for the SQLite backend.
    /// - `sheet_url` - The URL of the Google sheet, required for the Google backend.
    /// - `credentials` - The downloaded OAuth client secret or service-account key, required for
    ///   the Google backend. It is moved into `.secrets/` and made readable only by its owner.
    pub async fn create(
        dir: impl Into<PathBuf>,
        backend: Backend,
        auth: AuthMethod,
        sheet_url: Option<&str>,
        credentials: Option<&Path>,
    ) -> Result<Self> {
        let sheet_url = sheet_url.unwrap_or_default();
        if backend == Backend::GoogleSheets {
            ensure!(
                !sheet_url.is_empty(),
                "A sheet URL is required for the google_sheets backend"
            );
            ensure!(
                credentials.is_some(),
                "A credentials file is required for the google_sheets backend"
            );
        }
        // Validate before touching the file system
        let spreadsheet_id = extract_spreadsheet_id(sheet_url)
            .context("Failed to extract spreadsheet ID from sheet URL")?;

        let maybe_relative = dir.into();
        utils::make_dir(&maybe_relative)
            .await
            .context("Unable to create the stewardship home directory")?;
        let root = utils::canonicalize(&maybe_relative).await?;
        let secrets_dir = root.join(SECRETS);
        utils::make_dir(&secrets_dir).await?;

        let config_file = ConfigFile {
            backend,
            auth,
            sheet_url: sheet_url.to_string(),
            ..ConfigFile::default()
        };

        if let Some(credentials) = credentials {
            let destination = root.join(match auth {
                AuthMethod::Oauth => config_file.client_secret_path(),
                AuthMethod::ServiceAccount => config_file.service_account_path(),
            });
            utils::move_secret(credentials, destination).await?;
        }

        let config_path = root.join(CONFIG_JSON);
        config_file.save(&config_path).await?;

        Ok(Self {
            sqlite_path: root.join(STEWARDSHIP_SQLITE),
            root,
            secrets: secrets_dir,
            config_path,
            config_file,
            spreadsheet_id,
        })
    }

    /// This will
    /// - validate that the home directory exists and that the config file exists
    /// - load the config file
    /// - validate that the secrets directory exists
    /// - return the loaded configuration object
    pub async fn load(home: impl Into<PathBuf>) -> Result<Self> {
        let maybe_relative = home.into();
        let root = utils::canonicalize(&maybe_relative)
            .await
            .context("The stewardship home directory is missing, run 'stewardship init'")?;

        let config_path = root.join(CONFIG_JSON);
        if !config_path.is_file() {
            bail!("The config file is missing '{}'", config_path.display())
        }
        let config_file = ConfigFile::load(&config_path).await?;

        let spreadsheet_id = extract_spreadsheet_id(&config_file.sheet_url)
            .context("Failed to extract spreadsheet ID from sheet URL")?;
        if config_file.backend == Backend::GoogleSheets && spreadsheet_id.is_empty() {
            bail!("The google_sheets backend requires a sheet_url in config.json")
        }

        let config = Self {
            sqlite_path: root.join(STEWARDSHIP_SQLITE),
            secrets: root.join(SECRETS),
            root,
            config_path,
            config_file,
            spreadsheet_id,
        };
        if !config.secrets.is_dir() {
            bail!(
                "The secrets directory is missing '{}'",
                config.secrets.display()
            )
        }
        Ok(config)
    }

    pub fn config_path(&self) -> &Path {
        &self.config_path
    }

    pub fn secrets(&self) -> &Path {
        &self.secrets
    }

    pub fn backend(&self) -> Backend {
        self.config_file.backend
    }

    pub fn auth(&self) -> AuthMethod {
        self.config_file.auth
    }

    pub fn sheet_url(&self) -> &str {
        &self.config_file.sheet_url
    }

    pub fn spreadsheet_id(&self) -> &str {
        &self.spreadsheet_id
    }

    pub fn sqlite_path(&self) -> &Path {
        &self.sqlite_path
    }

    /// How long an open store connection may be reused.
    pub fn connection_ttl(&self) -> Duration {
        Duration::from_secs(self.config_file.connection_ttl_secs)
    }

    /// How long table reads may be served from memory.
    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.config_file.cache_ttl_secs)
    }

    /// Returns the stored `client_secret_path` if it is absolute, otherwise resolves the relative
    /// path.
    pub fn client_secret_path(&self) -> PathBuf {
        self.resolve(self.config_file.client_secret_path())
    }

    /// Returns the stored `token_path` if it is absolute, otherwise resolves the relative path.
    pub fn token_path(&self) -> PathBuf {
        self.resolve(self.config_file.token_path())
    }

    /// Returns the stored `service_account_path` if it is absolute, otherwise resolves the
    /// relative path.
    pub fn service_account_path(&self) -> PathBuf {
        self.resolve(self.config_file.service_account_path())
    }

    /// Checks if `p` is relative, and if so, resolves it. Returns it unchanged if it is absolute.
    fn resolve(&self, p: PathBuf) -> PathBuf {
        if p.is_absolute() {
            return p;
        }
        self.root.join(p)
    }
}

/// Represents the serialization and deserialization format of the configuration file.
///
/// Example configuration:
/// ```json
/// {
///   "app_name": "stewardship",
///   "config_version": 1,
///   "backend": "google_sheets",
///   "sheet_url": "https://docs.google.com/spreadsheets/d/7KpXm2RfZwNJgs84QhVY",
///   "auth": "service_account",
///   "service_account_path": ".secrets/service_account.json",
///   "connection_ttl_secs": 600,
///   "cache_ttl_secs": 60
/// }
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, Eq, PartialEq)]
struct ConfigFile {
    /// Application name, should always be "stewardship"
    app_name: String,

    /// Configuration file version
    config_version: u8,

    #[serde(default)]
    backend: Backend,

    /// URL of the Google sheet, empty for the SQLite backend
    #[serde(default)]
    sheet_url: String,

    #[serde(default)]
    auth: AuthMethod,

    /// Path to the OAuth 2.0 client credentials file (optional, relative to the home directory or
    /// absolute). Defaults to `.secrets/client_secret.json`.
    #[serde(skip_serializing_if = "Option::is_none", default)]
    client_secret_path: Option<PathBuf>,

    /// Path to the OAuth token file. Defaults to `.secrets/token.json`.
    #[serde(skip_serializing_if = "Option::is_none", default)]
    token_path: Option<PathBuf>,

    /// Path to the service-account key. Defaults to `.secrets/service_account.json`.
    #[serde(skip_serializing_if = "Option::is_none", default)]
    service_account_path: Option<PathBuf>,

    #[serde(default = "default_connection_ttl")]
    connection_ttl_secs: u64,

    #[serde(default = "default_cache_ttl")]
    cache_ttl_secs: u64,
}

fn default_connection_ttl() -> u64 {
    CONNECTION_TTL_SECS
}

fn default_cache_ttl() -> u64 {
    CACHE_TTL_SECS
}

impl Default for ConfigFile {
    fn default() -> Self {
        Self {
            app_name: APP_NAME.to_string(),
            config_version: CONFIG_VERSION,
            backend: Backend::default(),
            sheet_url: String::new(),
            auth: AuthMethod::default(),
            client_secret_path: None,
            token_path: None,
            service_account_path: None,
            connection_ttl_secs: CONNECTION_TTL_SECS,
            cache_ttl_secs: CACHE_TTL_SECS,
        }
    }
}

impl ConfigFile {
    /// Loads a ConfigFile from `path` and checks that it belongs to this program.
    pub async fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let config: ConfigFile = utils::deserialize(path).await?;
        ensure!(
            config.app_name == APP_NAME,
            "Invalid app_name in config file: expected '{}', got '{}'",
            APP_NAME,
            config.app_name
        );
        Ok(config)
    }

    pub async fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let p = path.as_ref();
        let data = serde_json::to_string_pretty(self).context("Unable to serialize config")?;
        utils::write(p, data)
            .await
            .context("Unable to write config file")
    }

    pub fn client_secret_path(&self) -> PathBuf {
        self.client_secret_path
            .clone()
            .unwrap_or_else(|| PathBuf::from(SECRETS).join(CLIENT_SECRET_JSON))
    }

    pub fn token_path(&self) -> PathBuf {
        self.token_path
            .clone()
            .unwrap_or_else(|| PathBuf::from(SECRETS).join(TOKEN_JSON))
    }

    pub fn service_account_path(&self) -> PathBuf {
        self.service_account_path
            .clone()
            .unwrap_or_else(|| PathBuf::from(SECRETS).join(SERVICE_ACCOUNT_JSON))
    }
}

/// The spreadsheet ID is the path segment after `/d/` in a sheet URL such as
/// `https://docs.google.com/spreadsheets/d/SPREADSHEET_ID/edit#gid=0`. An empty URL has an empty
/// ID.
fn extract_spreadsheet_id(sheet_url: &str) -> Result<String> {
    if sheet_url.is_empty() {
        return Ok(String::new());
    }
    let url = Url::parse(sheet_url).with_context(|| format!("'{sheet_url}' is not a URL"))?;
    let mut segments = url.path_segments().into_iter().flatten();
    while let Some(segment) = segments.next() {
        if segment == "d" {
            if let Some(id) = segments.next().filter(|id| !id.is_empty()) {
                return Ok(id.to_string());
            }
            break;
        }
    }
    bail!(
        "Invalid Google Sheets URL '{sheet_url}', expected \
        https://docs.google.com/spreadsheets/d/SPREADSHEET_ID"
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const URL: &str =
        "https://docs.google.com/spreadsheets/d/7KpXm2RfZwNJgs84QhVYno5DU6iM9Wlr3bCzAv1txRpL/edit";

    #[tokio::test]
    async fn test_config_create_oauth() {
        let dir = TempDir::new().unwrap();
        let home_dir = dir.path().join("stewardship_home");
        let secret_source_file = dir.path().join("x.txt");
        utils::write(&secret_source_file, "12345").await.unwrap();

        let config = Config::create(
            &home_dir,
            Backend::GoogleSheets,
            AuthMethod::Oauth,
            Some(URL),
            Some(&secret_source_file),
        )
        .await
        .unwrap();

        assert_eq!(URL, config.sheet_url());
        assert_eq!(
            "7KpXm2RfZwNJgs84QhVYno5DU6iM9Wlr3bCzAv1txRpL",
            config.spreadsheet_id()
        );
        let found = utils::read(&config.client_secret_path()).await.unwrap();
        assert_eq!("12345", found);
        assert!(!secret_source_file.exists());
        assert!(config.secrets().is_dir());
        assert_eq!(config.connection_ttl(), Duration::from_secs(600));
        assert_eq!(config.cache_ttl(), Duration::from_secs(60));

        let loaded = Config::load(&home_dir).await.unwrap();
        assert_eq!(loaded.backend(), Backend::GoogleSheets);
        assert_eq!(loaded.auth(), AuthMethod::Oauth);
        assert_eq!(loaded.spreadsheet_id(), config.spreadsheet_id());
    }

    #[tokio::test]
    async fn test_config_create_service_account() {
        let dir = TempDir::new().unwrap();
        let key = dir.path().join("key.json");
        utils::write(&key, "{}").await.unwrap();
        let config = Config::create(
            dir.path().join("home"),
            Backend::GoogleSheets,
            AuthMethod::ServiceAccount,
            Some("https://example.com/spreadsheets/d/MySheetIDX"),
            Some(&key),
        )
        .await
        .unwrap();
        assert!(config.service_account_path().is_file());
        assert!(config
            .service_account_path()
            .ends_with(".secrets/service_account.json"));
        assert_eq!("MySheetIDX", config.spreadsheet_id());
    }

    #[tokio::test]
    async fn test_config_create_sqlite_needs_nothing() {
        let dir = TempDir::new().unwrap();
        let config = Config::create(
            dir.path(),
            Backend::Sqlite,
            AuthMethod::Oauth,
            None,
            None,
        )
        .await
        .unwrap();
        assert_eq!(config.backend(), Backend::Sqlite);
        assert!(config.sqlite_path().ends_with(STEWARDSHIP_SQLITE));
        assert!(Config::load(dir.path()).await.is_ok());
    }

    #[tokio::test]
    async fn test_config_create_google_requires_url() {
        let dir = TempDir::new().unwrap();
        let result = Config::create(
            dir.path().join("home"),
            Backend::GoogleSheets,
            AuthMethod::Oauth,
            None,
            None,
        )
        .await;
        assert!(result.unwrap_err().to_string().contains("sheet URL"));
        assert!(!dir.path().join("home").exists());
    }

    #[tokio::test]
    async fn test_config_load_missing_home() {
        let dir = TempDir::new().unwrap();
        let e = Config::load(dir.path().join("nope")).await.unwrap_err();
        assert!(e.to_string().contains("stewardship init"));
    }

    #[tokio::test]
    async fn test_config_file_load_with_minimal_config() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("config.json");
        let json = r#"{
            "app_name": "stewardship",
            "config_version": 1,
            "sheet_url": "https://docs.google.com/spreadsheets/d/minimal"
        }"#;
        utils::write(&config_path, json).await.unwrap();

        let config = ConfigFile::load(&config_path).await.unwrap();
        assert_eq!(config.backend, Backend::GoogleSheets);
        assert_eq!(config.auth, AuthMethod::Oauth);
        assert_eq!(config.connection_ttl_secs, 600);
        assert_eq!(config.cache_ttl_secs, 60);
        assert_eq!(
            config.client_secret_path(),
            PathBuf::from(SECRETS).join(CLIENT_SECRET_JSON)
        );
        assert_eq!(config.token_path(), PathBuf::from(SECRETS).join(TOKEN_JSON));
    }

    #[tokio::test]
    async fn test_config_file_load_invalid_app_name() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("config.json");
        let json = r#"{ "app_name": "ledgerly", "config_version": 1 }"#;
        utils::write(&config_path, json).await.unwrap();

        let result = ConfigFile::load(&config_path).await;
        assert!(result.unwrap_err().to_string().contains("Invalid app_name"));
    }

    #[tokio::test]
    async fn test_config_file_save_and_load() {
        let t = TempDir::new().unwrap();
        let path = t.path().join("config.json");
        let original = ConfigFile {
            backend: Backend::Sqlite,
            auth: AuthMethod::ServiceAccount,
            service_account_path: Some(PathBuf::from("/etc/keys/sa.json")),
            cache_ttl_secs: 5,
            ..ConfigFile::default()
        };
        original.save(&path).await.unwrap();
        let json = utils::read(&path).await.unwrap();
        assert!(json.contains("\"backend\": \"sqlite\""));
        assert!(!json.contains("client_secret_path"));
        assert_eq!(original, ConfigFile::load(&path).await.unwrap());
    }

    #[test]
    fn test_extract_spreadsheet_id() {
        assert_eq!(
            extract_spreadsheet_id(URL).unwrap(),
            "7KpXm2RfZwNJgs84QhVYno5DU6iM9Wlr3bCzAv1txRpL"
        );
        let query = "https://docs.google.com/spreadsheets/d/ABC123?foo=bar";
        assert_eq!(extract_spreadsheet_id(query).unwrap(), "ABC123");
        assert_eq!(
            extract_spreadsheet_id("https://docs.google.com/spreadsheets/d/ABC123#gid=0").unwrap(),
            "ABC123"
        );
        assert!(extract_spreadsheet_id("https://example.com/invalid").is_err());
        assert!(extract_spreadsheet_id("not a url").is_err());
        assert_eq!(extract_spreadsheet_id("").unwrap(), "");
    }
}

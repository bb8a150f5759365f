use crate::args::InitArgs;
use crate::commands::{open, Out};
use crate::config::Backend;
use crate::db::Db;
use crate::error::{ErrorType, IntoResult};
use crate::{Config, Mode, Result};
use anyhow::Context;
use std::path::Path;

/// Creates the home directory, its subdirectories and:
/// - Creates an initial `config.json` file from `args` along with default settings
/// - Moves the credentials file named in `args`, if any, into its default location in `.secrets/`
/// - For the SQLite backend, creates the database and seeds its tables
///
/// # Arguments
/// - `home` - The directory that will be the root of the home directory, e.g.
///   `$HOME/stewardship`
/// - `args` - The backend, the authorization method, the sheet URL and the credentials file.
///
/// # Errors
/// - Returns an error if the arguments do not fit the backend or if any file operation fails.
pub async fn init(home: &Path, args: &InitArgs, mode: Mode) -> Result<Out<()>> {
    let config = Config::create(
        home,
        args.backend(),
        args.auth(),
        args.sheet_url(),
        args.credentials(),
    )
    .await
    .context("Unable to create the home directory and config")
    .pub_result(ErrorType::Config)?;

    match config.backend() {
        Backend::Sqlite => {
            Db::init(config.sqlite_path())
                .await
                .pub_result(ErrorType::Config)?;
            let _ = open(&config, mode).await?;
            Ok(format!(
                "Created {} and its tables at {}",
                config.config_path().display(),
                config.sqlite_path().display()
            )
            .into())
        }
        Backend::GoogleSheets => Ok(format!(
            "Created {}, next run 'stewardship auth' (or 'stewardship auth --verify' for a \
            service account)",
            config.config_path().display()
        )
        .into()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AuthMethod;
    use crate::model::BudgetCategory;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_init_sqlite_seeds_tables() {
        let dir = TempDir::new().unwrap();
        let home = dir.path().join("stewardship");
        let args = InitArgs::new(Backend::Sqlite, AuthMethod::Oauth, None, None);
        init(&home, &args, Mode::Google).await.unwrap();

        let config = Config::load(&home).await.unwrap();
        let mut workbook = open(&config, Mode::Google).await.unwrap();
        let budgets = workbook.budgets().await.unwrap();
        assert_eq!(budgets.data().len(), BudgetCategory::ALL.len());
    }

    #[tokio::test]
    async fn test_init_google_requires_url() {
        let dir = TempDir::new().unwrap();
        let args = InitArgs::new(Backend::GoogleSheets, AuthMethod::Oauth, None, None);
        let e = init(dir.path(), &args, Mode::Testing).await.unwrap_err();
        assert!(e.to_string().starts_with("The stewardship configuration"));
    }
}

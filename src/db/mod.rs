//! A local SQLite file that stores the workbook tables the way a spreadsheet would: numbered rows
//! of text cells. This lets the dashboard run without a Google account.

mod migrations;

use crate::api::Sheet;
use crate::Result;
use anyhow::{bail, Context};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::SqlitePool;
use std::path::Path;
use tracing::{debug, trace};

#[derive(Debug, Clone)]
pub(crate) struct Db {
    pool: SqlitePool,
}

impl Db {
    /// Creates the SQLite file at `path` if it does not exist and brings its schema up to date.
    pub(crate) async fn init(path: impl AsRef<Path>) -> Result<Self> {
        Self::connect(path.as_ref(), true).await
    }

    /// Opens an existing SQLite file and brings its schema up to date.
    pub(crate) async fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if !path.is_file() {
            bail!(
                "The SQLite file is missing '{}', run 'stewardship init --backend sqlite'",
                path.display()
            );
        }
        Self::connect(path, false).await
    }

    async fn connect(path: &Path, create: bool) -> Result<Self> {
        let options = SqliteConnectOptions::new()
            .filename(path)
            .create_if_missing(create)
            .foreign_keys(true);
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect_with(options)
            .await
            .with_context(|| format!("Unable to open the SQLite file {}", path.display()))?;

        let version = migrations::current_version(&pool).await?;
        if version > migrations::LATEST_VERSION {
            bail!(
                "The SQLite file {} has schema version {version}, which is newer than this \
                program understands ({})",
                path.display(),
                migrations::LATEST_VERSION
            );
        }
        migrations::run(&pool, version, migrations::LATEST_VERSION).await?;
        debug!("Opened SQLite store at {}", path.display());
        Ok(Self { pool })
    }

    async fn table_exists(&self, table: &str) -> Result<bool> {
        let row: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM sheet_tables WHERE name = ?")
            .bind(table)
            .fetch_one(&self.pool)
            .await
            .with_context(|| format!("Failed to look up table {table}"))?;
        Ok(row.0 > 0)
    }

    async fn row_count(&self, table: &str) -> Result<i64> {
        let row: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM sheet_rows WHERE table_name = ?")
            .bind(table)
            .fetch_one(&self.pool)
            .await
            .with_context(|| format!("Failed to count the rows of {table}"))?;
        Ok(row.0)
    }

    async fn require_table(&self, table: &str) -> Result<()> {
        if !self.table_exists(table).await? {
            bail!("Table '{table}' not found in the SQLite store");
        }
        Ok(())
    }
}

fn encode(row: &[String]) -> Result<String> {
    serde_json::to_string(row).context("Unable to serialize a row")
}

fn decode(cells: &str) -> Result<Vec<String>> {
    serde_json::from_str(cells).context("Unable to deserialize a row stored in SQLite")
}

#[async_trait::async_trait]
impl Sheet for Db {
    async fn ensure_table(&mut self, table: &str, header: &[String]) -> Result<bool> {
        sqlx::query("INSERT OR IGNORE INTO sheet_tables (name) VALUES (?)")
            .bind(table)
            .execute(&self.pool)
            .await
            .with_context(|| format!("Failed to create table {table}"))?;
        if self.row_count(table).await? > 0 {
            return Ok(false);
        }
        self.update_range(table, 1, &[header.to_vec()]).await?;
        Ok(true)
    }

    async fn get_rows(&mut self, table: &str) -> Result<Vec<Vec<String>>> {
        trace!("get_rows for {table}");
        self.require_table(table).await?;
        let stored: Vec<(i64, String)> = sqlx::query_as(
            "SELECT row_number, cells FROM sheet_rows WHERE table_name = ? ORDER BY row_number",
        )
        .bind(table)
        .fetch_all(&self.pool)
        .await
        .with_context(|| format!("Failed to read table {table}"))?;

        // Gaps in the row numbers read back as empty rows, as they would in a spreadsheet
        let mut rows = Vec::with_capacity(stored.len());
        for (row_number, cells) in stored {
            while (rows.len() as i64) < row_number - 1 {
                rows.push(Vec::new());
            }
            rows.push(decode(&cells)?);
        }
        Ok(rows)
    }

    async fn append_row(&mut self, table: &str, row: &[String]) -> Result<()> {
        trace!("append_row for {table}");
        self.require_table(table).await?;
        sqlx::query(
            "INSERT INTO sheet_rows (table_name, row_number, cells) \
            SELECT ?1, COALESCE(MAX(row_number), 0) + 1, ?2 FROM sheet_rows WHERE table_name = ?1",
        )
        .bind(table)
        .bind(encode(row)?)
        .execute(&self.pool)
        .await
        .with_context(|| format!("Failed to append a row to {table}"))?;
        Ok(())
    }

    async fn update_range(
        &mut self,
        table: &str,
        start_row: usize,
        rows: &[Vec<String>],
    ) -> Result<()> {
        trace!("update_range for {table} starting at row {start_row}");
        if start_row == 0 {
            bail!("Row numbers start at 1");
        }
        self.require_table(table).await?;
        let mut tx = self
            .pool
            .begin()
            .await
            .context("Failed to begin a transaction")?;
        for (offset, row) in rows.iter().enumerate() {
            sqlx::query(
                "INSERT INTO sheet_rows (table_name, row_number, cells) VALUES (?, ?, ?) \
                ON CONFLICT (table_name, row_number) DO UPDATE SET cells = excluded.cells",
            )
            .bind(table)
            .bind((start_row + offset) as i64)
            .bind(encode(row)?)
            .execute(&mut *tx)
            .await
            .with_context(|| format!("Failed to write row {} of {table}", start_row + offset))?;
        }
        tx.commit()
            .await
            .with_context(|| format!("Failed to commit the update to {table}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn row(cells: &[&str]) -> Vec<String> {
        cells.iter().map(|s| s.to_string()).collect()
    }

    #[tokio::test]
    async fn test_load_requires_file() {
        let dir = TempDir::new().unwrap();
        let e = Db::load(dir.path().join("missing.sqlite")).await.unwrap_err();
        assert!(e.to_string().contains("SQLite file is missing"));
    }

    #[tokio::test]
    async fn test_ensure_table_writes_header_once() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("s.sqlite");
        let mut db = Db::init(&path).await.unwrap();
        let header = row(&["Key", "Value"]);

        assert!(db.ensure_table("Dashboard_Data", &header).await.unwrap());
        assert!(!db.ensure_table("Dashboard_Data", &header).await.unwrap());
        assert_eq!(db.get_rows("Dashboard_Data").await.unwrap(), vec![header.clone()]);

        // Data survives reopening the file
        db.append_row("Dashboard_Data", &row(&["Mode", "Temporary"]))
            .await
            .unwrap();
        let mut reopened = Db::load(&path).await.unwrap();
        assert_eq!(
            reopened.get_rows("Dashboard_Data").await.unwrap(),
            vec![header, row(&["Mode", "Temporary"])]
        );
    }

    #[tokio::test]
    async fn test_update_range_overwrites_and_pads() {
        let dir = TempDir::new().unwrap();
        let mut db = Db::init(dir.path().join("s.sqlite")).await.unwrap();
        db.ensure_table("Budgets", &row(&["Category"])).await.unwrap();
        db.update_range("Budgets", 2, &[row(&["Food"]), row(&["Debt"])])
            .await
            .unwrap();
        db.update_range("Budgets", 3, &[row(&["Child"])]).await.unwrap();
        db.update_range("Budgets", 5, &[row(&["Tithe"])]).await.unwrap();
        db.append_row("Budgets", &row(&["Savings (Emergency)"]))
            .await
            .unwrap();

        let rows = db.get_rows("Budgets").await.unwrap();
        assert_eq!(
            rows,
            vec![
                row(&["Category"]),
                row(&["Food"]),
                row(&["Child"]),
                Vec::<String>::new(),
                row(&["Tithe"]),
                row(&["Savings (Emergency)"]),
            ]
        );
    }

    #[tokio::test]
    async fn test_missing_table() {
        let dir = TempDir::new().unwrap();
        let mut db = Db::init(dir.path().join("s.sqlite")).await.unwrap();
        assert!(db.get_rows("Nope").await.is_err());
        assert!(db.append_row("Nope", &row(&["x"])).await.is_err());
    }
}

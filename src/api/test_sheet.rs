//! Implements the `Sheet` trait using in-memory data for testing purposes.
//!
//! Note: this is compiled even in the "production" version of this app so that we can run the whole
//! app, top-to-bottom, without using Google Sheets.
//!
//! Tables are kept in a process-wide map keyed by spreadsheet ID, so reconnecting to the same ID
//! (as the MCP server does when its connection expires) sees earlier writes.

use crate::api::{Sheet, BUDGETS, DAILY_SPENDING, DASHBOARD_DATA};
use crate::Result;
use anyhow::{anyhow, bail, Context};
use std::collections::HashMap;
use std::io::Cursor;
use std::sync::{LazyLock, Mutex};

type Tables = HashMap<String, Vec<Vec<String>>>;

static SHEETS: LazyLock<Mutex<HashMap<String, Tables>>> =
    LazyLock::new(|| Mutex::new(HashMap::new()));

/// An in-memory spreadsheet identified by its spreadsheet ID.
pub(crate) struct TestSheet {
    id: String,
}

impl TestSheet {
    /// Connects to the in-memory sheet `id`, seeding it with sample data the first time it is used.
    pub(crate) fn new(id: impl Into<String>) -> Self {
        Self::connect(id.into(), default_data)
    }

    /// Connects to the in-memory sheet `id`, which starts with no tables the first time it is
    /// used.
    #[cfg(test)]
    pub(crate) fn blank(id: impl Into<String>) -> Self {
        Self::connect(id.into(), HashMap::new)
    }

    fn connect(id: String, seed: fn() -> Tables) -> Self {
        if let Ok(mut sheets) = SHEETS.lock() {
            sheets.entry(id.clone()).or_insert_with(seed);
        }
        Self { id }
    }

    fn with_tables<T>(&self, f: impl FnOnce(&mut Tables) -> Result<T>) -> Result<T> {
        let mut sheets = SHEETS
            .lock()
            .map_err(|_| anyhow!("The in-memory sheet store is poisoned"))?;
        let tables = sheets
            .get_mut(&self.id)
            .with_context(|| format!("In-memory sheet '{}' not found", self.id))?;
        f(tables)
    }
}

#[async_trait::async_trait]
impl Sheet for TestSheet {
    async fn ensure_table(&mut self, table: &str, header: &[String]) -> Result<bool> {
        self.with_tables(|tables| {
            let rows = tables.entry(table.to_string()).or_default();
            if rows.is_empty() {
                rows.push(header.to_vec());
                Ok(true)
            } else {
                Ok(false)
            }
        })
    }

    async fn get_rows(&mut self, table: &str) -> Result<Vec<Vec<String>>> {
        self.with_tables(|tables| {
            tables
                .get(table)
                .cloned()
                .with_context(|| format!("Sheet '{table}' not found"))
        })
    }

    async fn append_row(&mut self, table: &str, row: &[String]) -> Result<()> {
        self.with_tables(|tables| {
            tables
                .get_mut(table)
                .with_context(|| format!("Sheet '{table}' not found"))?
                .push(row.to_vec());
            Ok(())
        })
    }

    async fn update_range(
        &mut self,
        table: &str,
        start_row: usize,
        rows: &[Vec<String>],
    ) -> Result<()> {
        if start_row == 0 {
            bail!("Row numbers start at 1");
        }
        self.with_tables(|tables| {
            let existing = tables
                .get_mut(table)
                .with_context(|| format!("Sheet '{table}' not found"))?;
            for (offset, row) in rows.iter().enumerate() {
                let ix = start_row - 1 + offset;
                if existing.len() <= ix {
                    existing.resize(ix + 1, Vec::new());
                }
                existing[ix] = row.clone();
            }
            Ok(())
        })
    }
}

/// Provides the seed data from this module.
fn default_data() -> Tables {
    let mut map = HashMap::new();
    for (table, csv_data) in [
        (BUDGETS, BUDGET_DATA),
        (DAILY_SPENDING, SPENDING_DATA),
        (DASHBOARD_DATA, SETTINGS_DATA),
    ] {
        match load_csv(csv_data) {
            Ok(rows) => {
                map.insert(table.to_string(), rows);
            }
            // The seed data is constant, a parse failure leaves that table to be created empty
            Err(e) => tracing::error!("Unable to parse the seed data for {table}: {e:#}"),
        }
    }
    map
}

/// Loads data from a CSV-formatted string.
fn load_csv(csv_data: &str) -> Result<Vec<Vec<String>>> {
    let mut rdr = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_reader(Cursor::new(csv_data.as_bytes()));
    let mut rows: Vec<Vec<String>> = Vec::new();
    for result in rdr.records() {
        let record = result?;
        rows.push(record.iter().map(|field| field.to_string()).collect());
    }
    Ok(rows)
}

/// Seed budget data. Amounts are formatted the way Google Sheets shows currency cells.
const BUDGET_DATA: &str = r##"Category,Check1_Temp,Check2_Temp,Check3_Temp,Check4_Temp,Check1_Post,Check2_Post,Check3_Post,Check4_Post,Monthly_Target
Tithe,$150.00,$150.00,$150.00,$150.00,$250.00,$250.00,$250.00,$250.00,$600.00
Rental Reserve,$0.00,$0.00,$0.00,$0.00,$125.00,$125.00,$125.00,$125.00,
Savings (Emergency),$100.00,$100.00,$100.00,$100.00,$200.00,$200.00,$200.00,$200.00,$500.00
Food,$175.00,$175.00,$175.00,$175.00,$200.00,$200.00,$200.00,$200.00,$700.00
Transportation,$60.00,$60.00,$60.00,$60.00,$75.00,$75.00,$75.00,$75.00,
Insurance/Health,"$1,200.00",$0.00,$0.00,$0.00,"$1,200.00",$0.00,$0.00,$0.00,
Child,$50.00,$50.00,$50.00,$50.00,$75.00,$75.00,$75.00,$75.00,
Debt,$250.00,$0.00,$250.00,$0.00,$400.00,$0.00,$400.00,$0.00,
Clothing/Personal,$25.00,$25.00,$25.00,$25.00,$50.00,$50.00,$50.00,$50.00,
Subscriptions/Misc,$30.00,$0.00,$0.00,$0.00,$30.00,$0.00,$0.00,$0.00,
"##;

/// Seed spending data. One date is not a date, as happens when people type into a sheet.
const SPENDING_DATA: &str = r##"Date,Category,Amount,Memo
2025-10-01,Tithe,$150.00,first check
2025-10-02,Food,$87.43,groceries
10/5/2025,Transportation,$52.30,gas
2025-10-09,Child,$24.99,school supplies
2025-10-12,Food,$14.85,lunch out
2025-10-15,Insurance/Health,"$1,200.00",premium
2025-10-18,Coffee,$6.75,
last week,Food,$20.00,farmers market
2025-11-01,Debt,$250.00,car
"##;

/// Seed settings.
const SETTINGS_DATA: &str = r##"Key,Value
Monthly_Income,"$6,000.00"
Rental_Monthly,2500
Tithe_Pct,10
Savings_Pct,10
Emergency_Target_Months,3
Emergency_Current,"$4,250.00"
Mode,Temporary
Verse_Index,0
"##;

#[cfg(test)]
mod tests {
    use super::*;

    fn row(cells: &[&str]) -> Vec<String> {
        cells.iter().map(|s| s.to_string()).collect()
    }

    #[tokio::test]
    async fn test_seeded_tables() {
        let mut sheet = TestSheet::new(uuid::Uuid::new_v4().to_string());
        let budgets = sheet.get_rows(BUDGETS).await.unwrap();
        assert_eq!(budgets.len(), 11);
        assert_eq!(budgets[6][1], "$1,200.00");
        let settings = sheet.get_rows(DASHBOARD_DATA).await.unwrap();
        assert_eq!(settings[1], row(&["Monthly_Income", "$6,000.00"]));
        assert_eq!(sheet.get_rows(DAILY_SPENDING).await.unwrap().len(), 10);
    }

    #[tokio::test]
    async fn test_state_is_shared_by_id() {
        let id = uuid::Uuid::new_v4().to_string();
        let mut first = TestSheet::blank(&id);
        assert!(first.get_rows(BUDGETS).await.is_err());
        assert!(first.ensure_table(BUDGETS, &row(&["Category"])).await.unwrap());
        first.append_row(BUDGETS, &row(&["Food"])).await.unwrap();

        // A second connection, even one that asks for seed data, sees the same tables
        let mut second = TestSheet::new(&id);
        assert!(!second.ensure_table(BUDGETS, &row(&["Category"])).await.unwrap());
        assert_eq!(
            second.get_rows(BUDGETS).await.unwrap(),
            vec![row(&["Category"]), row(&["Food"])]
        );
        assert!(second.get_rows(DAILY_SPENDING).await.is_err());
    }

    #[tokio::test]
    async fn test_update_range_extends_table() {
        let mut sheet = TestSheet::blank(uuid::Uuid::new_v4().to_string());
        sheet.ensure_table(BUDGETS, &row(&["Category"])).await.unwrap();
        sheet
            .update_range(BUDGETS, 3, &[row(&["Debt"])])
            .await
            .unwrap();
        sheet.update_range(BUDGETS, 1, &[row(&["Cat"])]).await.unwrap();
        assert_eq!(
            sheet.get_rows(BUDGETS).await.unwrap(),
            vec![row(&["Cat"]), Vec::new(), row(&["Debt"])]
        );
        assert!(sheet.update_range(BUDGETS, 0, &[]).await.is_err());
    }
}

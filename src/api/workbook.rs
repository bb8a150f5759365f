//! Reads and writes the three workbook tables as typed data.

use crate::api::{Sheet, BUDGETS, DAILY_SPENDING, DASHBOARD_DATA};
use crate::model::{
    budget_headers, settings_headers, transaction_headers, BudgetCategory, Budgets, Settings,
    StewardshipData, Transaction, Transactions,
};
use crate::Result;
use tracing::{debug, info};

/// The Budgets, Daily_Spending and Dashboard_Data tables of one store.
pub struct Workbook {
    sheet: Box<dyn Sheet + Send>,
}

impl Workbook {
    /// Makes sure the three tables exist and seeds the ones that have no data rows. Tables that
    /// already hold data are left alone.
    pub(crate) async fn open(sheet: Box<dyn Sheet + Send>) -> Result<Self> {
        let mut workbook = Self { sheet };
        workbook.init().await?;
        Ok(workbook)
    }

    async fn init(&mut self) -> Result<()> {
        for (table, header) in [
            (BUDGETS, budget_headers()),
            (DAILY_SPENDING, transaction_headers()),
            (DASHBOARD_DATA, settings_headers()),
        ] {
            if self.sheet.ensure_table(table, &header).await? {
                info!("Created the header of {table}");
            }
        }

        let rows = self.sheet.get_rows(BUDGETS).await?;
        if rows.len() <= 1 {
            info!("Seeding {BUDGETS} with a zeroed row per category");
            let mut budgets = Budgets::parse(rows);
            for category in BudgetCategory::ALL {
                budgets.row_mut(category);
            }
            self.sheet.update_range(BUDGETS, 1, &budgets.to_sheet()).await?;
        }

        let rows = self.sheet.get_rows(DASHBOARD_DATA).await?;
        if rows.len() <= 1 {
            info!("Seeding {DASHBOARD_DATA} with default settings");
            self.sheet
                .update_range(DASHBOARD_DATA, 1, &Settings::default().to_sheet())
                .await?;
        }
        Ok(())
    }

    pub async fn budgets(&mut self) -> Result<Budgets> {
        Ok(Budgets::parse(self.sheet.get_rows(BUDGETS).await?))
    }

    pub async fn transactions(&mut self) -> Result<Transactions> {
        Ok(Transactions::parse(self.sheet.get_rows(DAILY_SPENDING).await?))
    }

    pub async fn settings(&mut self) -> Result<Settings> {
        Ok(Settings::parse(self.sheet.get_rows(DASHBOARD_DATA).await?))
    }

    /// Reads all three tables.
    pub async fn data(&mut self) -> Result<StewardshipData> {
        Ok(StewardshipData {
            budgets: self.budgets().await?,
            transactions: self.transactions().await?,
            settings: self.settings().await?,
        })
    }

    /// Rewrites the whole Budgets table.
    pub async fn save_budgets(&mut self, budgets: &Budgets) -> Result<()> {
        debug!("Saving {BUDGETS}");
        let existing = self.sheet.get_rows(BUDGETS).await?.len();
        let rows = pad(budgets.to_sheet(), existing);
        self.sheet.update_range(BUDGETS, 1, &rows).await
    }

    /// Rewrites the whole Dashboard_Data table.
    pub async fn save_settings(&mut self, settings: &Settings) -> Result<()> {
        debug!("Saving {DASHBOARD_DATA}");
        let existing = self.sheet.get_rows(DASHBOARD_DATA).await?.len();
        let rows = pad(settings.to_sheet(), existing);
        self.sheet.update_range(DASHBOARD_DATA, 1, &rows).await
    }

    /// Appends `transaction` to Daily_Spending in the column order of that table's header.
    pub async fn append_transaction(&mut self, transaction: &Transaction) -> Result<()> {
        debug!("Appending to {DAILY_SPENDING}");
        let row = self.transactions().await?.row_for(transaction);
        self.sheet.append_row(DAILY_SPENDING, &row).await
    }
}

/// Adds blank rows so a rewrite that got shorter also clears the rows it no longer covers.
fn pad(mut rows: Vec<Vec<String>>, len: usize) -> Vec<Vec<String>> {
    let width = rows.iter().map(|r| r.len()).max().unwrap_or_default();
    while rows.len() < len {
        rows.push(vec![String::new(); width]);
    }
    rows
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::TestSheet;
    use crate::model::{Amount, BudgetMode, Rollup};
    use chrono::NaiveDate;
    use rust_decimal::Decimal;

    fn blank() -> (String, TestSheet) {
        let id = uuid::Uuid::new_v4().to_string();
        let sheet = TestSheet::blank(&id);
        (id, sheet)
    }

    fn row(cells: &[&str]) -> Vec<String> {
        cells.iter().map(|s| s.to_string()).collect()
    }

    #[tokio::test]
    async fn test_open_seeds_empty_store() {
        let (id, sheet) = blank();
        let mut workbook = Workbook::open(Box::new(sheet)).await.unwrap();

        let budgets = workbook.budgets().await.unwrap();
        assert_eq!(budgets.headers(), budget_headers().as_slice());
        let categories: Vec<&str> = budgets.data().iter().map(|r| r.category()).collect();
        let expected: Vec<&str> = BudgetCategory::ALL.iter().map(|c| c.label()).collect();
        assert_eq!(categories, expected);
        for r in budgets.data() {
            assert_eq!(r.total(BudgetMode::Temporary), Decimal::ZERO);
            assert_eq!(r.total(BudgetMode::PostRental), Decimal::ZERO);
        }

        assert_eq!(workbook.settings().await.unwrap(), Settings::default());
        assert!(workbook.transactions().await.unwrap().data().is_empty());

        // Opening again does not reseed or duplicate anything
        let before = TestSheet::blank(&id).get_rows(BUDGETS).await.unwrap();
        let _ = Workbook::open(Box::new(TestSheet::blank(&id))).await.unwrap();
        let after = TestSheet::blank(&id).get_rows(BUDGETS).await.unwrap();
        assert_eq!(before, after);
        assert_eq!(after.len(), 11);
    }

    #[tokio::test]
    async fn test_open_leaves_existing_data_alone() {
        let (id, mut sheet) = blank();
        sheet.ensure_table(BUDGETS, &budget_headers()).await.unwrap();
        sheet.append_row(BUDGETS, &row(&["Food", "$10.00"])).await.unwrap();

        let mut workbook = Workbook::open(Box::new(TestSheet::blank(&id))).await.unwrap();
        let budgets = workbook.budgets().await.unwrap();
        assert_eq!(budgets.data().len(), 1);
        let rollup = Rollup::new(&budgets, BudgetMode::Temporary);
        assert_eq!(rollup.get(BudgetCategory::Food), Decimal::TEN);
        assert_eq!(rollup.get(BudgetCategory::Tithe), Decimal::ZERO);
    }

    #[tokio::test]
    async fn test_append_transaction_and_save() {
        let (id, sheet) = blank();
        let mut workbook = Workbook::open(Box::new(sheet)).await.unwrap();
        let t = Transaction::new(
            NaiveDate::from_ymd_opt(2024, 1, 5).unwrap(),
            BudgetCategory::Food,
            Amount::lenient("$12.50"),
            Some(String::from("lunch")),
        );
        workbook.append_transaction(&t).await.unwrap();
        let rows = TestSheet::blank(&id).get_rows(DAILY_SPENDING).await.unwrap();
        assert_eq!(rows[1], row(&["2024-01-05", "Food", "12.5", "lunch"]));

        let mut settings = workbook.settings().await.unwrap();
        settings.verse_index = 3;
        workbook.save_settings(&settings).await.unwrap();
        assert_eq!(workbook.settings().await.unwrap().verse_index, 3);
    }

    #[tokio::test]
    async fn test_save_settings_clears_stale_rows() {
        let (id, mut sheet) = blank();
        sheet
            .ensure_table(DASHBOARD_DATA, &settings_headers())
            .await
            .unwrap();
        for (k, v) in [("Rental_Monthly", "1800"), ("Notes", "x"), ("Rental_Monthly", "1900")] {
            sheet.append_row(DASHBOARD_DATA, &row(&[k, v])).await.unwrap();
        }
        let mut workbook = Workbook::open(Box::new(TestSheet::blank(&id))).await.unwrap();
        let mut settings = workbook.settings().await.unwrap();
        assert_eq!(settings.rental_monthly, Decimal::from(1900));
        settings.rental_monthly = Decimal::from(2000);
        workbook.save_settings(&settings).await.unwrap();
        assert_eq!(
            workbook.settings().await.unwrap().rental_monthly,
            Decimal::from(2000)
        );
    }
}

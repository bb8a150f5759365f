//! Types that represent the core data model, such as `Budgets`, `Transaction` and `Settings`.
mod amount;
mod budget;
mod category;
mod rollup;
pub mod scripture;
mod settings;
mod transaction;

pub use amount::{to_decimal, total, Amount, AmountError, AmountFormat};
pub use budget::{budget_headers, BudgetColumn, BudgetMode, BudgetRow, Budgets, CHECKS};
pub use category::{BudgetCategory, UnknownCategory};
pub use rollup::{compare_to_budget, goal_vs_actual, rental_impact, Comparison, GoalLine, Rollup};
use serde::{Deserialize, Serialize};
pub use settings::{settings_headers, SettingKey, Settings};
pub use transaction::{
    largest_first, parse_date, totals_by_category, transaction_headers, Transaction,
    TransactionFilter, Transactions, DATE_FORMAT,
};

/// Represents all the tables of interest from the store.
#[derive(Default, Debug, Clone, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct StewardshipData {
    /// Rows of data from the Budgets table.
    pub(crate) budgets: Budgets,
    /// Rows of data from the Daily_Spending table.
    pub(crate) transactions: Transactions,
    /// Key/value pairs from the Dashboard_Data table.
    pub(crate) settings: Settings,
}

impl StewardshipData {
    pub fn budgets(&self) -> &Budgets {
        &self.budgets
    }

    pub fn transactions(&self) -> &Transactions {
        &self.transactions
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// The budget totals for the mode currently selected in settings.
    pub fn rollup(&self) -> Rollup {
        Rollup::new(&self.budgets, self.settings.mode)
    }
}

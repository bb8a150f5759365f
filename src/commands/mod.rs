//! Command handlers for the stewardship CLI.
//!
//! This module contains implementations for all CLI subcommands. The MCP server calls the same
//! functions, so each one returns an `Out` rather than printing.

mod auth;
mod budget;
mod dashboard;
mod init;
mod ledger;
mod mcp;
mod settings;
mod verse;

use crate::api::{self, Workbook};
use crate::app::{handle, Action, AppState};
use crate::error::{ErrorType, IntoResult};
use crate::{Config, Mode, Result};
use chrono::NaiveDate;
use serde::Serialize;
use std::fmt::{Debug, Display};
use std::path::Path;
use tracing::{debug, info};

pub use auth::{auth, auth_verify};
pub use budget::{budget_set, budget_show, budget_target};
pub use dashboard::dashboard;
pub use init::init;
pub use ledger::{ledger_add, ledger_list};
pub use mcp::mcp;
pub use settings::settings;
pub use verse::verse;

/// The output type for a command. This allows the command to return a consistent message and,
/// optionally, structured data to both the command line and MCP server interfaces.
#[derive(Debug, Clone, Serialize)]
pub struct Out<T>
where
    T: Serialize + Clone + Debug,
{
    /// A message that can be printed to the user regarding the outcome of the command execution.
    message: String,

    /// Any structured data that needs to be output from the call.
    structure: Option<T>,

    /// The structured data rendered for a person to read, e.g. a markdown table.
    view: Option<String>,
}

impl<T, S> From<S> for Out<T>
where
    T: Debug + Clone + Serialize,
    S: Into<String>,
{
    fn from(value: S) -> Self {
        Out::new_message(value)
    }
}

impl<T> Out<T>
where
    T: Serialize + Clone + Debug,
{
    /// Create a new `Out` object that has `Some(structure)`.
    pub fn new<S>(message: S, structure: T) -> Self
    where
        S: Into<String>,
    {
        Self {
            message: message.into(),
            structure: Some(structure),
            view: None,
        }
    }

    /// Create a new `Out` object whose `structure` is also rendered as its `view`.
    pub fn new_view<S>(message: S, structure: T) -> Self
    where
        S: Into<String>,
        T: Display,
    {
        Self {
            message: message.into(),
            view: Some(structure.to_string()),
            structure: Some(structure),
        }
    }

    /// Create a new `Out` object that has `None` for `structure`.
    pub fn new_message<S>(message: S) -> Self
    where
        S: Into<String>,
    {
        Self {
            message: message.into(),
            structure: None,
            view: None,
        }
    }

    /// Get the `message`.
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Get the structured data stored in `structure`.
    pub fn structure(&self) -> Option<&T> {
        self.structure.as_ref()
    }

    /// Get the rendered `view`, if any.
    pub fn view(&self) -> Option<&str> {
        self.view.as_deref()
    }

    /// Print the message to `info!`, the view (if it exists) to stdout and the structured data (if
    /// it exists) as JSON to `debug!`.
    pub fn print(&self) {
        info!("{}", self.message);
        if let Some(view) = self.view() {
            println!("{view}");
        }
        if let Some(structure) = self.structure() {
            if let Ok(json) = serde_json::to_string_pretty(structure) {
                debug!("Command output:\n\n{json}\n\n");
            }
        }
    }
}

/// The local date, used wherever a command is not given one.
pub fn today() -> NaiveDate {
    chrono::Local::now().date_naive()
}

/// Loads the configuration from the home directory `home`.
pub async fn config(home: &Path) -> Result<Config> {
    Config::load(home).await.pub_result(ErrorType::Config)
}

/// Connects to the store named by `config`, seeding its tables on first use.
pub async fn open(config: &Config, mode: Mode) -> Result<Workbook> {
    api::workbook(config, mode)
        .await
        .pub_result(ErrorType::Connection)
}

async fn load(workbook: &mut Workbook, today: NaiveDate) -> Result<AppState> {
    AppState::load(workbook, today)
        .await
        .pub_result(ErrorType::Connection)
}

/// Reads the store, applies `action` and writes its effect. An invalid action fails before
/// anything is written.
async fn run(workbook: &mut Workbook, today: NaiveDate, action: Action) -> Result<AppState> {
    let state = load(workbook, today).await?;
    let (state, effect) = handle(state, action).pub_result(ErrorType::Request)?;
    effect
        .apply(workbook)
        .await
        .pub_result(ErrorType::Connection)?;
    Ok(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::args::{BudgetSetArgs, BudgetShowArgs, LedgerAddArgs, LedgerListArgs};
    use crate::model::{Amount, BudgetCategory, BudgetMode};
    use crate::test::TestEnv;
    use rust_decimal::Decimal;
    use std::str::FromStr;

    fn date(s: &str) -> NaiveDate {
        NaiveDate::from_str(s).unwrap()
    }

    #[tokio::test]
    async fn test_out_view() {
        let out: Out<String> = Out::new_view("shown", String::from("| a |"));
        assert_eq!(out.view(), Some("| a |"));
        let out: Out<()> = "done".into();
        assert_eq!(out.message(), "done");
        assert!(out.view().is_none());
    }

    #[tokio::test]
    async fn test_commands_against_seeded_test_sheet() {
        let env = TestEnv::new().await;
        let mut workbook = open(&env.config(), Mode::Testing).await.unwrap();
        let today = date("2025-10-31");

        let out = dashboard(&mut workbook, today).await.unwrap();
        let view = out.structure().unwrap();
        assert_eq!(view.settings.monthly_income, Decimal::from(6000));
        assert_eq!(view.tithe, Decimal::from(600));

        let args = BudgetSetArgs {
            category: BudgetCategory::Food,
            mode: BudgetMode::Temporary,
            check: 1,
            amount: Amount::from_str("$200.00").unwrap(),
        };
        budget_set(&mut workbook, today, args).await.unwrap();
        let out = budget_show(&mut workbook, today, BudgetShowArgs::default())
            .await
            .unwrap();
        let food = out
            .structure()
            .unwrap()
            .lines
            .iter()
            .find(|l| l.category == "Food")
            .unwrap()
            .total;
        assert_eq!(food, Decimal::from(725));

        let add = LedgerAddArgs {
            date: Some(date("2025-10-30")),
            category: BudgetCategory::Food,
            amount: Amount::from_str("10").unwrap(),
            memo: Some(String::from("bread")),
        };
        ledger_add(&mut workbook, today, add).await.unwrap();
        let list = ledger_list(&mut workbook, today, LedgerListArgs::default())
            .await
            .unwrap();
        let ledger = list.structure().unwrap();
        assert_eq!(ledger.transactions[0].memo(), "bread");
        // October only: the November row and the undated row are left out
        assert_eq!(ledger.transactions.len(), 8);
    }

    #[tokio::test]
    async fn test_invalid_action_writes_nothing() {
        let env = TestEnv::new().await;
        let mut workbook = open(&env.config(), Mode::Testing).await.unwrap();
        let today = date("2025-10-31");
        let before = load(&mut workbook, today).await.unwrap();
        let args = BudgetSetArgs {
            category: BudgetCategory::Debt,
            mode: BudgetMode::Temporary,
            check: 9,
            amount: Amount::from_str("1").unwrap(),
        };
        let e = budget_set(&mut workbook, today, args).await.unwrap_err();
        assert!(e.to_string().starts_with("The request could not be completed"));
        let after = load(&mut workbook, today).await.unwrap();
        assert_eq!(before, after);
    }
}

//! The program's state and the actions a user can take against it.
//!
//! `handle` is pure: it takes the current `AppState` and an `Action` and returns the new state
//! together with the single `Effect` that must be written to the store. Only `Effect::apply`
//! touches the store.

mod views;

use crate::api::Workbook;
use crate::model::{
    scripture, Amount, BudgetCategory, BudgetMode, Budgets, Settings, StewardshipData,
    Transaction,
};
use crate::Result;
use anyhow::ensure;
use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::debug;

pub use views::{BudgetView, DashboardView, LedgerView, SettingsView, VerseView};

/// Everything read from the store, plus the date that "this month" is relative to.
#[derive(Debug, Clone, Eq, PartialEq, Serialize, Deserialize)]
pub struct AppState {
    pub data: StewardshipData,
    pub today: NaiveDate,
}

impl AppState {
    pub fn new(data: StewardshipData, today: NaiveDate) -> Self {
        Self { data, today }
    }

    /// Reads the store.
    pub async fn load(workbook: &mut Workbook, today: NaiveDate) -> Result<Self> {
        Ok(Self::new(workbook.data().await?, today))
    }
}

/// The settings a save can change. `None` leaves the stored value alone.
#[derive(Debug, Default, Clone, Eq, PartialEq, Serialize, Deserialize)]
pub struct SettingsUpdate {
    pub monthly_income: Option<Decimal>,
    pub rental_monthly: Option<Decimal>,
    pub mode: Option<BudgetMode>,
    pub tithe_pct: Option<Decimal>,
    pub savings_pct: Option<Decimal>,
    pub emergency_target_months: Option<Decimal>,
    pub emergency_current: Option<Decimal>,
}

impl SettingsUpdate {
    fn apply(&self, settings: &mut Settings) {
        fn set<T: Copy>(target: &mut T, value: Option<T>) {
            if let Some(value) = value {
                *target = value;
            }
        }
        set(&mut settings.monthly_income, self.monthly_income);
        set(&mut settings.rental_monthly, self.rental_monthly);
        set(&mut settings.mode, self.mode);
        set(&mut settings.tithe_pct, self.tithe_pct);
        set(&mut settings.savings_pct, self.savings_pct);
        set(
            &mut settings.emergency_target_months,
            self.emergency_target_months,
        );
        set(&mut settings.emergency_current, self.emergency_current);
    }
}

/// A user edit.
#[derive(Debug, Clone, Eq, PartialEq)]
pub enum Action {
    SubmitTransaction {
        date: NaiveDate,
        category: BudgetCategory,
        amount: Amount,
        memo: Option<String>,
    },
    SaveSettings(SettingsUpdate),
    SetBudgetAmount {
        category: BudgetCategory,
        mode: BudgetMode,
        /// One-based.
        check: usize,
        amount: Amount,
    },
    SetMonthlyTarget {
        category: BudgetCategory,
        amount: Option<Amount>,
    },
    NextVerse,
}

/// The write that persists an action.
#[derive(Debug, Clone, Eq, PartialEq)]
pub enum Effect {
    /// Rewrite the whole Budgets table.
    WriteBudgets(Budgets),
    /// Append one row to Daily_Spending.
    AppendTransaction(Transaction),
    /// Rewrite the whole Dashboard_Data table.
    WriteSettings(Settings),
}

impl Effect {
    pub async fn apply(&self, workbook: &mut Workbook) -> Result<()> {
        match self {
            Effect::WriteBudgets(budgets) => workbook.save_budgets(budgets).await,
            Effect::AppendTransaction(t) => workbook.append_transaction(t).await,
            Effect::WriteSettings(settings) => workbook.save_settings(settings).await,
        }
    }
}

/// Applies `action` to `state`. Fails, without producing an effect, when the action is invalid.
pub fn handle(state: AppState, action: Action) -> Result<(AppState, Effect)> {
    debug!("Handling {action:?}");
    let AppState { mut data, today } = state;
    let effect = match action {
        Action::SubmitTransaction {
            date,
            category,
            amount,
            memo,
        } => {
            ensure!(
                !amount.is_negative(),
                "The amount of a transaction cannot be negative, got {amount}"
            );
            let memo = memo.map(|m| m.trim().to_string()).filter(|m| !m.is_empty());
            let transaction = Transaction::new(date, category, amount, memo);
            data.transactions.push(transaction.clone());
            Effect::AppendTransaction(transaction)
        }
        Action::SaveSettings(update) => {
            update.apply(&mut data.settings);
            Effect::WriteSettings(data.settings.clone())
        }
        Action::SetBudgetAmount {
            category,
            mode,
            check,
            amount,
        } => {
            data.budgets.row_mut(category).set_check(mode, check, amount)?;
            Effect::WriteBudgets(data.budgets.clone())
        }
        Action::SetMonthlyTarget { category, amount } => {
            data.budgets.row_mut(category).set_monthly_target(amount);
            Effect::WriteBudgets(data.budgets.clone())
        }
        Action::NextVerse => {
            data.settings.verse_index = scripture::next_index(data.settings.verse_index);
            Effect::WriteSettings(data.settings.clone())
        }
    };
    Ok((AppState { data, today }, effect))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::TestSheet;
    use crate::model::{Rollup, Transactions};
    use std::str::FromStr;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, 31).unwrap()
    }

    fn empty_state() -> AppState {
        let data = StewardshipData {
            budgets: Budgets::seeded(),
            transactions: Transactions::default(),
            settings: Settings::default(),
        };
        AppState::new(data, today())
    }

    fn amount(s: &str) -> Amount {
        Amount::from_str(s).unwrap()
    }

    #[test]
    fn test_submit_transaction() {
        let action = Action::SubmitTransaction {
            date: NaiveDate::from_ymd_opt(2024, 1, 5).unwrap(),
            category: BudgetCategory::Food,
            amount: amount("$12.50"),
            memo: Some(String::from("  ")),
        };
        let (state, effect) = handle(empty_state(), action).unwrap();
        let Effect::AppendTransaction(t) = effect else {
            panic!("expected an append, got {effect:?}");
        };
        assert_eq!(t.raw_date(), "2024-01-05");
        assert_eq!(t.category(), "Food");
        assert_eq!(t.memo(), "");
        assert_eq!(state.data.transactions().data(), &[t]);
    }

    #[test]
    fn test_negative_transaction_is_rejected() {
        let action = Action::SubmitTransaction {
            date: today(),
            category: BudgetCategory::Food,
            amount: amount("-1"),
            memo: None,
        };
        assert!(handle(empty_state(), action).is_err());
    }

    #[test]
    fn test_save_settings_changes_only_given_fields() {
        let update = SettingsUpdate {
            monthly_income: Some(Decimal::from(5000)),
            mode: Some(BudgetMode::PostRental),
            ..Default::default()
        };
        let (state, effect) = handle(empty_state(), Action::SaveSettings(update)).unwrap();
        let settings = state.data.settings();
        assert_eq!(settings.monthly_income, Decimal::from(5000));
        assert_eq!(settings.mode, BudgetMode::PostRental);
        assert_eq!(settings.rental_monthly, Decimal::from(2500));
        assert_eq!(effect, Effect::WriteSettings(settings.clone()));
    }

    #[test]
    fn test_set_budget_amount() {
        let action = Action::SetBudgetAmount {
            category: BudgetCategory::Debt,
            mode: BudgetMode::PostRental,
            check: 2,
            amount: amount("$1,000"),
        };
        let (state, effect) = handle(empty_state(), action).unwrap();
        let rollup = Rollup::new(state.data.budgets(), BudgetMode::PostRental);
        assert_eq!(rollup.get(BudgetCategory::Debt), Decimal::from(1000));
        assert_eq!(
            Rollup::new(state.data.budgets(), BudgetMode::Temporary).sum(),
            Decimal::ZERO
        );
        assert_eq!(effect, Effect::WriteBudgets(state.data.budgets().clone()));

        let bad = Action::SetBudgetAmount {
            category: BudgetCategory::Debt,
            mode: BudgetMode::Temporary,
            check: 5,
            amount: amount("1"),
        };
        assert!(handle(empty_state(), bad).is_err());
    }

    #[test]
    fn test_set_monthly_target() {
        let action = Action::SetMonthlyTarget {
            category: BudgetCategory::Child,
            amount: Some(amount("250")),
        };
        let (state, _) = handle(empty_state(), action).unwrap();
        let row = state.data.budgets().find(BudgetCategory::Child).unwrap();
        assert_eq!(row.monthly_target().unwrap().value(), Decimal::from(250));

        let clear = Action::SetMonthlyTarget {
            category: BudgetCategory::Child,
            amount: None,
        };
        let (state, _) = handle(state, clear).unwrap();
        let row = state.data.budgets().find(BudgetCategory::Child).unwrap();
        assert!(row.monthly_target().is_none());
    }

    #[test]
    fn test_next_verse_from_last_index() {
        let mut state = empty_state();
        state.data.settings.verse_index = 4;
        let (state, effect) = handle(state, Action::NextVerse).unwrap();
        let index = state.data.settings().verse_index;
        assert!((0..=4).contains(&index));
        assert_ne!(index, 4);
        assert!(matches!(effect, Effect::WriteSettings(_)));
    }

    #[tokio::test]
    async fn test_effect_is_persisted() {
        let id = uuid::Uuid::new_v4().to_string();
        let mut workbook = Workbook::open(Box::new(TestSheet::blank(&id))).await.unwrap();
        let action = Action::SetBudgetAmount {
            category: BudgetCategory::Tithe,
            mode: BudgetMode::Temporary,
            check: 1,
            amount: amount("600"),
        };
        let state = AppState::load(&mut workbook, today()).await.unwrap();
        let (_, effect) = handle(state, action).unwrap();
        effect.apply(&mut workbook).await.unwrap();

        let mut reopened = Workbook::open(Box::new(TestSheet::blank(&id))).await.unwrap();
        let state = AppState::load(&mut reopened, today()).await.unwrap();
        assert_eq!(state.data.rollup().tithe(), Decimal::from(600));
    }
}

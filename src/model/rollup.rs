//! Arithmetic over the Budgets table: per-category sums for a mode and the aggregates derived from
//! them.

use crate::model::{total, BudgetCategory, BudgetMode, Budgets, Settings};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// The per-category budget totals of one mode.
#[derive(Debug, Clone, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct Rollup {
    mode: BudgetMode,
    totals: BTreeMap<BudgetCategory, Decimal>,
}

impl Rollup {
    /// Sums each category's four check columns of `mode`. Categories without a row are zero.
    pub fn new(budgets: &Budgets, mode: BudgetMode) -> Self {
        let totals = BudgetCategory::ALL
            .into_iter()
            .map(|c| (c, budgets.find(c).map(|r| r.total(mode)).unwrap_or_default()))
            .collect();
        Self { mode, totals }
    }

    pub fn mode(&self) -> BudgetMode {
        self.mode
    }

    pub fn get(&self, category: BudgetCategory) -> Decimal {
        self.totals.get(&category).copied().unwrap_or_default()
    }

    /// Every category with its total, in canonical order.
    pub fn totals(&self) -> impl Iterator<Item = (BudgetCategory, Decimal)> + '_ {
        self.totals.iter().map(|(c, v)| (*c, *v))
    }

    pub fn tithe(&self) -> Decimal {
        self.get(BudgetCategory::Tithe)
    }

    pub fn rental(&self) -> Decimal {
        self.get(BudgetCategory::RentalReserve)
    }

    pub fn savings(&self) -> Decimal {
        self.get(BudgetCategory::SavingsEmergency)
    }

    pub fn sum(&self) -> Decimal {
        total(self.totals.values().copied())
    }

    /// Everything that is not tithe, rental reserve or savings.
    pub fn living(&self) -> Decimal {
        total(self.totals().filter(|(c, _)| c.is_living()).map(|(_, v)| v))
    }
}

/// One bar pair of the goal-vs-actual chart.
#[derive(Debug, Clone, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct GoalLine {
    pub name: String,
    pub goal: Decimal,
    pub actual: Decimal,
}

const OFFERINGS_PCT: Decimal = Decimal::TEN;

/// Compares the budget to the percentage goals in `settings`. Offerings are only budgeted once the
/// rental property is rented.
pub fn goal_vs_actual(rollup: &Rollup, settings: &Settings) -> Vec<GoalLine> {
    let income = settings.monthly_income;
    let pct = |p: Decimal| percent_of(income, p);
    let living_pct = Decimal::ONE_HUNDRED
        .saturating_sub(settings.tithe_pct)
        .saturating_sub(settings.savings_pct)
        .saturating_sub(OFFERINGS_PCT);
    let offerings = match rollup.mode() {
        BudgetMode::Temporary => Decimal::ZERO,
        BudgetMode::PostRental => pct(OFFERINGS_PCT),
    };
    vec![
        line("Tithe", pct(settings.tithe_pct), rollup.tithe()),
        line("Offerings", pct(OFFERINGS_PCT), offerings),
        line("Savings", pct(settings.savings_pct), rollup.savings()),
        line("Living", pct(living_pct), rollup.living()),
    ]
}

/// `pct` percent of `amount`, stopping at the largest `Decimal` of the right sign when the result
/// does not fit.
fn percent_of(amount: Decimal, pct: Decimal) -> Decimal {
    match amount.checked_mul(pct) {
        Some(product) => product / Decimal::ONE_HUNDRED,
        None => (amount / Decimal::ONE_HUNDRED).saturating_mul(pct),
    }
}

fn line(name: &str, goal: Decimal, actual: Decimal) -> GoalLine {
    GoalLine {
        name: name.to_string(),
        goal,
        actual,
    }
}

/// The rental amount as a percentage of monthly income, or zero when there is no income.
pub fn rental_impact(settings: &Settings) -> Decimal {
    if settings.monthly_income.is_zero() {
        Decimal::ZERO
    } else {
        let (rental, income) = (settings.rental_monthly, settings.monthly_income);
        rental
            .checked_div(income)
            .and_then(|ratio| ratio.checked_mul(Decimal::ONE_HUNDRED))
            .unwrap_or(if rental.is_sign_negative() == income.is_sign_negative() {
                Decimal::MAX
            } else {
                Decimal::MIN
            })
    }
}

/// One category of the actual-vs-budget comparison.
#[derive(Debug, Clone, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct Comparison {
    pub category: String,
    pub actual: Decimal,
    pub budget: Decimal,
}

/// Pairs each spending category with its budget total. Categories outside the fixed list have no
/// budget and compare against zero.
pub fn compare_to_budget(actuals: &BTreeMap<String, Decimal>, rollup: &Rollup) -> Vec<Comparison> {
    actuals
        .iter()
        .map(|(category, actual)| Comparison {
            category: category.clone(),
            actual: *actual,
            budget: BudgetCategory::from_label(category)
                .map(|c| rollup.get(c))
                .unwrap_or_default(),
        })
        .collect()
}

//! What the user sees: the dashboard, the budget editor, the ledger and the verse.
//!
//! Each view is built from an `AppState`, serializes to JSON for the MCP surface and displays as
//! markdown with text bar charts for the command line.

use crate::app::AppState;
use crate::model::{
    compare_to_budget, goal_vs_actual, largest_first, rental_impact, scripture,
    totals_by_category, Amount, BudgetCategory, BudgetMode, Comparison, GoalLine, Rollup,
    Settings, Transaction, TransactionFilter, CHECKS,
};
use chrono::NaiveDate;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::Serialize;
use std::fmt::{self, Display, Formatter};

const BAR_WIDTH: usize = 30;

fn money(value: Decimal) -> String {
    Amount::new(value).to_string()
}

/// A bar of `value` relative to `max`. Values beyond `max` draw a full bar.
fn bar(value: Decimal, max: Decimal) -> String {
    if max <= Decimal::ZERO || value <= Decimal::ZERO {
        return String::new();
    }
    let ratio = value.checked_div(max).map_or(Decimal::ONE, |r| r.min(Decimal::ONE));
    let filled = (ratio * Decimal::from(BAR_WIDTH))
        .round()
        .to_usize()
        .unwrap_or_default();
    "#".repeat(filled.min(BAR_WIDTH))
}

/// A verse and the stored index that selected it.
#[derive(Debug, Clone, Serialize)]
pub struct VerseView {
    pub index: i64,
    pub reference: String,
    pub text: String,
}

impl VerseView {
    pub fn new(index: i64) -> Self {
        let verse = scripture::verse(index);
        Self {
            index,
            reference: verse.reference.to_string(),
            text: verse.text.to_string(),
        }
    }
}

impl Display for VerseView {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        writeln!(f, "> \"{}\"", self.text)?;
        writeln!(f, ">")?;
        writeln!(f, "> {}", self.reference)
    }
}

fn write_settings(f: &mut Formatter<'_>, s: &Settings) -> fmt::Result {
    writeln!(f, "## Settings\n")?;
    writeln!(f, "| Setting | Value |")?;
    writeln!(f, "|---|---|")?;
    writeln!(f, "| Monthly income | {} |", money(s.monthly_income))?;
    writeln!(f, "| Rental (vacancy) monthly | {} |", money(s.rental_monthly))?;
    writeln!(f, "| Mode | {} |", s.mode)?;
    writeln!(f, "| Tithe % | {} |", s.tithe_pct.normalize())?;
    writeln!(f, "| Savings % | {} |", s.savings_pct.normalize())?;
    writeln!(
        f,
        "| Emergency fund | {} of {} months |",
        money(s.emergency_current),
        s.emergency_target_months.normalize()
    )?;
    for (key, value) in s.other() {
        writeln!(f, "| {key} | {value} |")?;
    }
    Ok(())
}

/// The settings on their own.
#[derive(Debug, Clone, Serialize)]
pub struct SettingsView {
    pub settings: Settings,
}

impl SettingsView {
    pub fn new(state: &AppState) -> Self {
        Self {
            settings: state.data.settings().clone(),
        }
    }
}

impl Display for SettingsView {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write_settings(f, &self.settings)
    }
}

/// One category total of the current mode.
#[derive(Debug, Clone, Serialize)]
pub struct CategoryTotal {
    pub category: String,
    pub total: Decimal,
}

/// The overview: settings, rollups, goal vs actual, rental impact and this month's spending.
#[derive(Debug, Clone, Serialize)]
pub struct DashboardView {
    pub verse: VerseView,
    pub settings: Settings,
    pub totals: Vec<CategoryTotal>,
    pub tithe: Decimal,
    pub rental_reserve: Decimal,
    pub savings: Decimal,
    pub living: Decimal,
    pub goals: Vec<GoalLine>,
    /// Rental as a percentage of income. Not clamped; only the bar is.
    pub rental_impact_pct: Decimal,
    pub month: TransactionFilter,
    pub actuals: Vec<CategoryTotal>,
}

impl DashboardView {
    pub fn new(state: &AppState) -> Self {
        let settings = state.data.settings().clone();
        let rollup = state.data.rollup();
        let month = TransactionFilter::month_to_date(state.today);
        let spent = totals_by_category(state.data.transactions().filter(&month));
        Self {
            verse: VerseView::new(settings.verse_index),
            totals: rollup
                .totals()
                .map(|(category, total)| CategoryTotal {
                    category: category.label().to_string(),
                    total,
                })
                .collect(),
            tithe: rollup.tithe(),
            rental_reserve: rollup.rental(),
            savings: rollup.savings(),
            living: rollup.living(),
            goals: goal_vs_actual(&rollup, &settings),
            rental_impact_pct: rental_impact(&settings),
            month,
            actuals: largest_first(&spent)
                .into_iter()
                .map(|(category, total)| CategoryTotal { category, total })
                .collect(),
            settings,
        }
    }
}

impl Display for DashboardView {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        let s = &self.settings;
        write!(f, "{}", self.verse)?;

        writeln!(f)?;
        write_settings(f, s)?;
        writeln!(f, "\n## Monthly Overview ({})\n", s.mode)?;
        writeln!(f, "| | Amount |")?;
        writeln!(f, "|---|---:|")?;
        writeln!(f, "| Income | {} |", money(s.monthly_income))?;
        writeln!(f, "| Tithe | {} |", money(self.tithe))?;
        writeln!(f, "| Rental Reserve | {} |", money(self.rental_reserve))?;
        writeln!(f, "| Savings (Emergency) | {} |", money(self.savings))?;
        writeln!(f, "| Living / Expenses | {} |", money(self.living))?;

        writeln!(f, "\n## Category Totals\n")?;
        writeln!(f, "| Category | Total |")?;
        writeln!(f, "|---|---:|")?;
        for t in &self.totals {
            writeln!(f, "| {} | {} |", t.category, money(t.total))?;
        }

        writeln!(f, "\n## Goal vs Actual\n")?;
        let max = self
            .goals
            .iter()
            .flat_map(|g| [g.goal, g.actual])
            .max()
            .unwrap_or_default();
        writeln!(f, "```")?;
        for g in &self.goals {
            writeln!(f, "{:<10} goal   {:<30} {}", g.name, bar(g.goal, max), money(g.goal))?;
            writeln!(f, "{:<10} actual {:<30} {}", "", bar(g.actual, max), money(g.actual))?;
        }
        writeln!(f, "```")?;

        writeln!(f, "\n## Rental Impact\n")?;
        writeln!(
            f,
            "[{:<30}] Rental absorbs {}% of income",
            bar(self.rental_impact_pct, Decimal::ONE_HUNDRED),
            self.rental_impact_pct.round_dp(1)
        )?;

        writeln!(f, "\n## Actuals This Month\n")?;
        if self.actuals.is_empty() {
            writeln!(f, "No transactions logged this month.")?;
            return Ok(());
        }
        let max = self.actuals.first().map(|a| a.total).unwrap_or_default();
        writeln!(f, "```")?;
        for a in &self.actuals {
            writeln!(f, "{:<20} {:<30} {}", a.category, bar(a.total, max), money(a.total))?;
        }
        writeln!(f, "```")
    }
}

/// One row of the budget editor.
#[derive(Debug, Clone, Serialize)]
pub struct BudgetLine {
    pub category: String,
    pub checks: [Decimal; CHECKS],
    pub total: Decimal,
    pub monthly_target: Option<Decimal>,
}

/// One mode's four check columns and monthly target for every row of the Budgets table.
#[derive(Debug, Clone, Serialize)]
pub struct BudgetView {
    pub mode: BudgetMode,
    pub lines: Vec<BudgetLine>,
    pub total: Decimal,
}

impl BudgetView {
    pub fn new(state: &AppState, mode: BudgetMode) -> Self {
        let lines: Vec<BudgetLine> = state
            .data
            .budgets()
            .data()
            .iter()
            .map(|row| BudgetLine {
                category: row.category().to_string(),
                checks: row.check_amounts(mode).map(|a| a.value()),
                total: row.total(mode),
                monthly_target: row.monthly_target().map(|a| a.value()),
            })
            .collect();
        Self {
            mode,
            total: Rollup::new(state.data.budgets(), mode).sum(),
            lines,
        }
    }
}

impl Display for BudgetView {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        writeln!(f, "## Budgets ({})\n", self.mode)?;
        write!(f, "| Category |")?;
        for column in self.mode.columns() {
            write!(f, " {column} |")?;
        }
        writeln!(f, " Total | Monthly_Target |")?;
        writeln!(f, "|---|{}---:|---:|", "---:|".repeat(CHECKS))?;
        for line in &self.lines {
            write!(f, "| {} |", line.category)?;
            for check in line.checks {
                write!(f, " {} |", money(check))?;
            }
            let target = line.monthly_target.map(money).unwrap_or_default();
            writeln!(f, " {} | {} |", money(line.total), target)?;
        }
        writeln!(f, "\nTotal: {}", money(self.total))
    }
}

/// The filtered transaction list and its comparison against the budget of the current mode.
#[derive(Debug, Clone, Serialize)]
pub struct LedgerView {
    pub filter: TransactionFilter,
    pub mode: BudgetMode,
    pub transactions: Vec<Transaction>,
    pub comparison: Vec<Comparison>,
}

impl LedgerView {
    pub fn new(state: &AppState, filter: TransactionFilter) -> Self {
        let found = state.data.transactions().filter(&filter);
        let rollup = state.data.rollup();
        Self {
            filter,
            mode: rollup.mode(),
            comparison: compare_to_budget(&totals_by_category(found.iter().copied()), &rollup),
            transactions: found.into_iter().cloned().collect(),
        }
    }
}

fn bound(date: Option<NaiveDate>) -> String {
    date.map(|d| d.to_string()).unwrap_or_else(|| String::from("*"))
}

impl Display for LedgerView {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        let category = self
            .filter
            .category
            .map(|c: BudgetCategory| c.label())
            .unwrap_or("All");
        writeln!(
            f,
            "## Transactions {} to {} ({category})\n",
            bound(self.filter.start),
            bound(self.filter.end)
        )?;
        if self.transactions.is_empty() {
            writeln!(f, "No transactions found.")?;
            return Ok(());
        }
        writeln!(f, "| Date | Category | Amount | Memo |")?;
        writeln!(f, "|---|---|---:|---|")?;
        for t in &self.transactions {
            writeln!(
                f,
                "| {} | {} | {} | {} |",
                t.raw_date(),
                t.category(),
                t.amount(),
                t.memo()
            )?;
        }

        writeln!(f, "\n## Category Totals vs Budget ({})\n", self.mode)?;
        writeln!(f, "| Category | Actual | Budget |")?;
        writeln!(f, "|---|---:|---:|")?;
        for c in &self.comparison {
            writeln!(f, "| {} | {} | {} |", c.category, money(c.actual), money(c.budget))?;
        }
        let max = self
            .comparison
            .iter()
            .flat_map(|c| [c.actual, c.budget])
            .max()
            .unwrap_or_default();
        writeln!(f, "\n```")?;
        for c in &self.comparison {
            writeln!(
                f,
                "{:<20} actual {:<30} {}",
                c.category,
                bar(c.actual, max),
                money(c.actual)
            )?;
            writeln!(
                f,
                "{:<20} budget {:<30} {}",
                "",
                bar(c.budget, max),
                money(c.budget)
            )?;
        }
        writeln!(f, "```")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Budgets, StewardshipData, Transactions};

    fn state() -> AppState {
        let budgets = Budgets::parse(vec![
            vec!["Category", "Check1_Temp", "Check2_Temp", "Check3_Temp", "Check4_Temp"],
            vec!["Tithe", "$100.00", "100", "100", "100"],
            vec!["Rental Reserve", "50", "", "", ""],
            vec!["Savings (Emergency)", "25", "25", "25", "25"],
            vec!["Food", "$1,000.00", "abc", "0", "0"],
        ]);
        let transactions = Transactions::parse(vec![
            vec!["Date", "Category", "Amount", "Memo"],
            vec!["2024-01-05", "Food", "$12.50", "lunch"],
            vec!["2024-01-20", "Coffee", "4", ""],
            vec!["2024-02-01", "Food", "7.25", "next month"],
            vec!["sometime", "Food", "3", ""],
        ]);
        let settings = Settings::parse(vec![
            vec!["Key", "Value"],
            vec!["Monthly_Income", "$4,000.00"],
            vec!["Rental_Monthly", "5000"],
        ]);
        AppState::new(
            StewardshipData {
                budgets,
                transactions,
                settings,
            },
            NaiveDate::from_ymd_opt(2024, 1, 31).unwrap(),
        )
    }

    #[test]
    fn test_bar() {
        assert_eq!(bar(Decimal::from(50), Decimal::ONE_HUNDRED).len(), 15);
        assert_eq!(bar(Decimal::from(250), Decimal::ONE_HUNDRED).len(), BAR_WIDTH);
        assert_eq!(bar(Decimal::ONE, Decimal::ZERO), "");
        assert_eq!(bar(Decimal::NEGATIVE_ONE, Decimal::TEN), "");
        let tiny = Decimal::new(1, 28);
        assert_eq!(bar(Decimal::MAX, tiny).len(), BAR_WIDTH);
    }

    #[test]
    fn test_dashboard() {
        let view = DashboardView::new(&state());
        assert_eq!(view.tithe, Decimal::from(400));
        assert_eq!(view.rental_reserve, Decimal::from(50));
        assert_eq!(view.savings, Decimal::from(100));
        assert_eq!(view.living, Decimal::from(1000));
        assert_eq!(view.totals.len(), 10);
        assert_eq!(view.rental_impact_pct, Decimal::from(125));
        // Only January counts, largest first, and the undated row is left out
        let actuals: Vec<(&str, Decimal)> = view
            .actuals
            .iter()
            .map(|a| (a.category.as_str(), a.total))
            .collect();
        assert_eq!(
            actuals,
            vec![("Food", Decimal::new(1250, 2)), ("Coffee", Decimal::from(4))]
        );
        let text = view.to_string();
        assert!(text.contains("Malachi 3:10"));
        assert!(text.contains("Rental absorbs 125"));
        assert!(text.contains(&format!("[{}]", "#".repeat(BAR_WIDTH))));
    }

    #[test]
    fn test_budget_view() {
        let view = BudgetView::new(&state(), BudgetMode::Temporary);
        assert_eq!(view.lines.len(), 4);
        assert_eq!(view.lines[3].checks[0], Decimal::from(1000));
        assert_eq!(view.lines[3].checks[1], Decimal::ZERO);
        assert_eq!(view.total, Decimal::from(1550));
        assert!(view.to_string().contains("| Check1_Temp |"));

        let post = BudgetView::new(&state(), BudgetMode::PostRental);
        assert_eq!(post.total, Decimal::ZERO);
    }

    #[test]
    fn test_ledger_view() {
        let filter = TransactionFilter::month_to_date(state().today);
        let view = LedgerView::new(&state(), filter);
        let dates: Vec<&str> = view.transactions.iter().map(|t| t.raw_date()).collect();
        assert_eq!(dates, vec!["2024-01-20", "2024-01-05"]);
        let food = view
            .comparison
            .iter()
            .find(|c| c.category == "Food")
            .unwrap();
        assert_eq!(food.budget, Decimal::from(1000));
        let coffee = view
            .comparison
            .iter()
            .find(|c| c.category == "Coffee")
            .unwrap();
        assert_eq!(coffee.budget, Decimal::ZERO);

        let all = LedgerView::new(&state(), TransactionFilter::default());
        assert_eq!(all.transactions.len(), 4);
        assert_eq!(all.transactions[3].raw_date(), "sometime");
    }
}

//! The budget editor.

use crate::api::Workbook;
use crate::app::{Action, BudgetView};
use crate::args::{BudgetSetArgs, BudgetShowArgs, BudgetTargetArgs};
use crate::commands::{load, run, Out};
use crate::Result;
use chrono::NaiveDate;

/// Shows one mode's check columns, by default the mode selected in settings.
pub async fn budget_show(
    workbook: &mut Workbook,
    today: NaiveDate,
    args: BudgetShowArgs,
) -> Result<Out<BudgetView>> {
    let state = load(workbook, today).await?;
    let mode = args.mode.unwrap_or(state.data.settings().mode);
    let view = BudgetView::new(&state, mode);
    Ok(Out::new_view(format!("Budgets for {mode} mode"), view))
}

/// Sets one check amount and rewrites the Budgets table. A category without a row gets one.
pub async fn budget_set(
    workbook: &mut Workbook,
    today: NaiveDate,
    args: BudgetSetArgs,
) -> Result<Out<BudgetView>> {
    let action = Action::SetBudgetAmount {
        category: args.category,
        mode: args.mode,
        check: args.check,
        amount: args.amount,
    };
    let state = run(workbook, today, action).await?;
    let message = format!(
        "Set check {} of {} in {} mode to {}",
        args.check, args.category, args.mode, args.amount
    );
    Ok(Out::new_view(message, BudgetView::new(&state, args.mode)))
}

/// Sets or clears one monthly target and rewrites the Budgets table.
pub async fn budget_target(
    workbook: &mut Workbook,
    today: NaiveDate,
    args: BudgetTargetArgs,
) -> Result<Out<BudgetView>> {
    let action = Action::SetMonthlyTarget {
        category: args.category,
        amount: args.amount,
    };
    let state = run(workbook, today, action).await?;
    let message = match args.amount {
        Some(amount) => format!("Set the monthly target of {} to {amount}", args.category),
        None => format!("Cleared the monthly target of {}", args.category),
    };
    let mode = state.data.settings().mode;
    Ok(Out::new_view(message, BudgetView::new(&state, mode)))
}

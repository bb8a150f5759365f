//! The daily spending ledger.

use crate::api::Workbook;
use crate::app::{Action, LedgerView};
use crate::args::{LedgerAddArgs, LedgerListArgs};
use crate::commands::{load, run, Out};
use crate::model::{Transaction, TransactionFilter};
use crate::Result;
use chrono::NaiveDate;

/// Appends a transaction. Its date defaults to `today`.
pub async fn ledger_add(
    workbook: &mut Workbook,
    today: NaiveDate,
    args: LedgerAddArgs,
) -> Result<Out<Transaction>> {
    let date = args.date.unwrap_or(today);
    let action = Action::SubmitTransaction {
        date,
        category: args.category,
        amount: args.amount,
        memo: args.memo,
    };
    let state = run(workbook, today, action).await?;
    // The handler appends the new transaction last
    let added = state
        .data
        .transactions()
        .data()
        .last()
        .cloned()
        .unwrap_or_default();
    let message = format!(
        "Added {} for {} on {}",
        added.amount(),
        added.category(),
        added.raw_date()
    );
    Ok(Out::new(message, added))
}

/// Lists transactions newest first. With no dates and without `all`, the list covers the month of
/// `today` through `today`.
pub async fn ledger_list(
    workbook: &mut Workbook,
    today: NaiveDate,
    args: LedgerListArgs,
) -> Result<Out<LedgerView>> {
    let today = args.today.unwrap_or(today);
    let filter = if args.all {
        TransactionFilter::default()
    } else if args.start.is_none() && args.end.is_none() {
        TransactionFilter::month_to_date(today)
    } else {
        TransactionFilter {
            start: args.start,
            end: args.end,
            category: None,
        }
    }
    .with_category(args.category);

    let state = load(workbook, today).await?;
    let view = LedgerView::new(&state, filter);
    let count = view.transactions.len();
    let message = format!(
        "Found {} transaction{}",
        count,
        if count == 1 { "" } else { "s" }
    );
    Ok(Out::new_view(message, view))
}

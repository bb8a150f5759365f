use crate::api::Workbook;
use crate::app::{Action, SettingsUpdate, SettingsView};
use crate::args::SettingsArgs;
use crate::commands::{load, run, Out};
use crate::Result;
use chrono::NaiveDate;

/// Shows the settings, or saves the ones given in `args` and shows the result. Settings that
/// `args` leaves out, and keys this program does not know, are written back unchanged.
pub async fn settings(
    workbook: &mut Workbook,
    today: NaiveDate,
    args: SettingsArgs,
) -> Result<Out<SettingsView>> {
    if args.is_empty() {
        let state = load(workbook, today).await?;
        return Ok(Out::new_view("Current settings", SettingsView::new(&state)));
    }
    let update = SettingsUpdate {
        monthly_income: args.income.map(|a| a.value()),
        rental_monthly: args.rental.map(|a| a.value()),
        mode: args.mode,
        tithe_pct: args.tithe_pct,
        savings_pct: args.savings_pct,
        emergency_target_months: args.emergency_target_months,
        emergency_current: args.emergency_current.map(|a| a.value()),
    };
    let state = run(workbook, today, Action::SaveSettings(update)).await?;
    Ok(Out::new_view("Saved settings", SettingsView::new(&state)))
}

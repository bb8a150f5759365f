use crate::api::Workbook;
use crate::app::DashboardView;
use crate::commands::{load, Out};
use crate::Result;
use chrono::NaiveDate;

/// Builds the dashboard: settings, the rollups of the current mode, goal vs actual, rental impact
/// and the spending of `today`'s month so far.
pub async fn dashboard(workbook: &mut Workbook, today: NaiveDate) -> Result<Out<DashboardView>> {
    let state = load(workbook, today).await?;
    let view = DashboardView::new(&state);
    let message = format!("Dashboard for {} in {} mode", today, view.settings.mode);
    Ok(Out::new_view(message, view))
}

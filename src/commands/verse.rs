use crate::api::Workbook;
use crate::app::{Action, VerseView};
use crate::commands::{load, run, today, Out};
use crate::Result;

/// Shows the stored verse, or with `next` picks a different one and saves its index.
pub async fn verse(workbook: &mut Workbook, next: bool) -> Result<Out<VerseView>> {
    let state = if next {
        run(workbook, today(), Action::NextVerse).await?
    } else {
        load(workbook, today()).await?
    };
    let view = VerseView::new(state.data.settings().verse_index);
    Ok(Out::new_view(view.reference.clone(), view))
}

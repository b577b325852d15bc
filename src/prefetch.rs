use anyhow::Context as _;

use crate::chapter_store::ChapterStore;
use crate::formats::Volume;

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct PrefetchSummary {
    pub chapters: usize,
    pub empty: usize,
}

/// Walk every chapter of every volume in order, one fetch at a time.
///
/// A chapter page without content is logged by the store and counted here;
/// any other error stops the walk.
pub async fn prefetch_all(
    store: &ChapterStore,
    volumes: &[Volume],
    refetch_all: bool,
) -> anyhow::Result<PrefetchSummary> {
    let jobs = volumes
        .iter()
        .flat_map(|volume| volume.chapters.iter().map(move |chapter| (volume, chapter)));

    let mut summary = PrefetchSummary::default();
    for (volume, chapter) in jobs {
        let fragment = store
            .get_chapter(volume, chapter, !refetch_all)
            .await
            .with_context(|| format!("prefetch {:?} / {:?}", volume.title, chapter.title))?;
        summary.chapters += 1;
        if fragment.is_empty() {
            summary.empty += 1;
        }
    }

    tracing::info!(
        chapters = summary.chapters,
        empty = summary.empty,
        "prefetch finished"
    );
    Ok(summary)
}

use std::io::Write as _;

use anyhow::Context as _;

use crate::chapter_store::ChapterStore;
use crate::cli::{AssembleArgs, PrefetchArgs, RunArgs, TocArgs};
use crate::config::Config;
use crate::formats::Volume;

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct RunSummary {
    pub volumes: usize,
    pub chapters: usize,
    pub empty_chapters: usize,
}

/// Full pipeline: table of contents, sequential prefetch, then one document per volume.
pub async fn run(config: &Config, args: RunArgs) -> anyhow::Result<RunSummary> {
    let client = crate::fetch::build_client(config)?;
    let store = ChapterStore::new(client.clone(), config);

    tracing::info!(base_url = %config.base_url, "run: table of contents");
    let volumes = load_volumes(&client, config, args.live_index).await?;

    tracing::info!(volumes = volumes.len(), "run: prefetch");
    let prefetch = crate::prefetch::prefetch_all(&store, &volumes, args.refetch_all)
        .await
        .context("prefetch")?;

    tracing::info!("run: assemble");
    assemble_and_write(&store, config, &volumes)
        .await
        .context("assemble")?;

    let summary = RunSummary {
        volumes: volumes.len(),
        chapters: prefetch.chapters,
        empty_chapters: prefetch.empty,
    };
    tracing::info!(
        volumes = summary.volumes,
        chapters = summary.chapters,
        empty_chapters = summary.empty_chapters,
        "run finished"
    );
    Ok(summary)
}

pub async fn toc(config: &Config, args: TocArgs) -> anyhow::Result<()> {
    let client = crate::fetch::build_client(config)?;
    let volumes = load_volumes(&client, config, args.live_index).await?;

    let mut stdout = std::io::stdout().lock();
    serde_json::to_writer_pretty(&mut stdout, &volumes).context("write toc json")?;
    stdout.write_all(b"\n").context("write toc newline")?;
    stdout.flush().context("flush stdout")?;
    Ok(())
}

pub async fn prefetch(config: &Config, args: PrefetchArgs) -> anyhow::Result<()> {
    let client = crate::fetch::build_client(config)?;
    let store = ChapterStore::new(client.clone(), config);

    let volumes = load_volumes(&client, config, args.live_index).await?;
    crate::prefetch::prefetch_all(&store, &volumes, args.refetch_all)
        .await
        .context("prefetch")?;
    Ok(())
}

pub async fn assemble(config: &Config, args: AssembleArgs) -> anyhow::Result<()> {
    let client = crate::fetch::build_client(config)?;
    let store = ChapterStore::new(client.clone(), config);

    let volumes = load_volumes(&client, config, args.live_index).await?;
    let selected = select_volumes(volumes, &args.volumes)?;
    assemble_and_write(&store, config, &selected).await
}

async fn load_volumes(
    client: &reqwest::Client,
    config: &Config,
    live_index: bool,
) -> anyhow::Result<Vec<Volume>> {
    let html = crate::fetch::fetch_index_page(client, config, live_index)
        .await
        .context("load index page")?;
    let volumes = crate::toc::extract_volumes(&html).context("extract table of contents")?;
    Ok(volumes)
}

async fn assemble_and_write(
    store: &ChapterStore,
    config: &Config,
    volumes: &[Volume],
) -> anyhow::Result<()> {
    for volume in volumes {
        let html = crate::assemble::assemble_volume(store, &config.book_title, volume).await?;
        crate::assemble::write_volume(config, volume, &html)?;
    }
    Ok(())
}

fn select_volumes(volumes: Vec<Volume>, titles: &[String]) -> anyhow::Result<Vec<Volume>> {
    if titles.is_empty() {
        return Ok(volumes);
    }

    if let Some(missing) = titles
        .iter()
        .find(|title| !volumes.iter().any(|v| &v.title == *title))
    {
        anyhow::bail!("unknown volume: {missing:?}");
    }

    Ok(volumes
        .into_iter()
        .filter(|v| titles.contains(&v.title))
        .collect())
}

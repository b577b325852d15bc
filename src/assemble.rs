use std::path::PathBuf;

use anyhow::Context as _;

use crate::chapter_store::{ChapterStore, path_segment};
use crate::config::Config;
use crate::formats::Volume;

/// Load every chapter of `volume` (fetching whatever is not cached yet, all at
/// once) and concatenate the fragments into one document.
pub async fn assemble_volume(
    store: &ChapterStore,
    book_title: &str,
    volume: &Volume,
) -> anyhow::Result<String> {
    let fragments = futures::future::try_join_all(
        volume
            .chapters
            .iter()
            .map(|chapter| store.get_chapter(volume, chapter, true)),
    )
    .await
    .with_context(|| format!("load chapters of {:?}", volume.title))?;

    Ok(render_volume(book_title, &volume.title, &fragments))
}

pub fn render_volume(book_title: &str, volume_title: &str, fragments: &[String]) -> String {
    let title = escape_text(&format!("{book_title} - {volume_title}"));
    let body = fragments.join("\n");
    format!("<html>\n<title>{title}</title>\n<body>\n{body}\n</body>\n</html>")
}

/// Write `volumes/<volume>.html`, replacing any earlier output.
pub fn write_volume(config: &Config, volume: &Volume, html: &str) -> anyhow::Result<PathBuf> {
    let out_dir = &config.volume_output_dir;
    std::fs::create_dir_all(out_dir)
        .with_context(|| format!("create volume output dir: {}", out_dir.display()))?;

    let path = out_dir.join(format!("{}.html", path_segment(&volume.title)?));
    tracing::info!(volume = %volume.title, path = %path.display(), "Saving");
    std::fs::write(&path, html).with_context(|| format!("write volume: {}", path.display()))?;
    Ok(path)
}

fn escape_text(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn render_volume_keeps_fragment_order() {
        let fragments = ["<a/>", "<b/>", "<c/>"].map(str::to_owned);
        let html = render_volume("The Wandering Inn", "Volume 1", &fragments);

        assert_eq!(
            html,
            "<html>\n<title>The Wandering Inn - Volume 1</title>\n<body>\n<a/>\n<b/>\n<c/>\n</body>\n</html>"
        );
    }

    #[test]
    fn render_volume_escapes_title_text() {
        let html = render_volume("Book", "Side <Stories> & More", &[]);
        assert!(html.contains("<title>Book - Side &lt;Stories&gt; &amp; More</title>"));
        assert!(html.contains("<body>\n\n</body>"));
    }
}

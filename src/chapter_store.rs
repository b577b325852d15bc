use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, LazyLock};
use std::time::Duration;

use anyhow::Context as _;
use rand::Rng as _;
use scraper::{ElementRef, Html, Selector};
use tokio::sync::Mutex;

use crate::config::Config;
use crate::formats::{Chapter, Volume};

static CONTENT_ARTICLE: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("#content article").unwrap());

const CHAPTER_CLASS: &str = "chapter";

/// Fetch-or-load access to `chapters/<volume>/<chapter>.html`.
///
/// Only a successful extraction writes a cache file, so a chapter page without
/// an article is fetched again on every later call.
pub struct ChapterStore {
    client: reqwest::Client,
    cache_dir: PathBuf,
    max_delay_ms: u64,
    locks: Mutex<HashMap<PathBuf, Arc<Mutex<()>>>>,
}

impl ChapterStore {
    pub fn new(client: reqwest::Client, config: &Config) -> Self {
        Self {
            client,
            cache_dir: config.chapter_cache_dir.clone(),
            max_delay_ms: config.max_delay_ms,
            locks: Mutex::new(HashMap::new()),
        }
    }

    pub fn chapter_path(&self, volume: &Volume, chapter: &Chapter) -> anyhow::Result<PathBuf> {
        Ok(self
            .volume_dir(volume)?
            .join(format!("{}.html", path_segment(&chapter.title)?)))
    }

    fn volume_dir(&self, volume: &Volume) -> anyhow::Result<PathBuf> {
        Ok(self.cache_dir.join(path_segment(&volume.title)?))
    }

    /// Return the chapter's fragment, from the cache when `use_cache` is set and
    /// a cached copy exists. Returns an empty string when the fetched page has no
    /// content article.
    pub async fn get_chapter(
        &self,
        volume: &Volume,
        chapter: &Chapter,
        use_cache: bool,
    ) -> anyhow::Result<String> {
        let volume_dir = self.volume_dir(volume)?;
        std::fs::create_dir_all(&volume_dir)
            .with_context(|| format!("create chapter cache dir: {}", volume_dir.display()))?;
        let path = self.chapter_path(volume, chapter)?;

        let key_lock = self.key_lock(&path).await;
        let _guard = key_lock.lock().await;

        if use_cache && path.exists() {
            return std::fs::read_to_string(&path)
                .with_context(|| format!("read cached chapter: {}", path.display()));
        }

        self.pace().await;
        tracing::info!(path = %path.display(), url = %chapter.url, "fetching");
        let body = crate::fetch::get_text(&self.client, &chapter.url)
            .await
            .with_context(|| format!("fetch chapter {:?}", chapter.title))?;

        let Some(fragment) = extract_fragment(&body) else {
            tracing::warn!(
                volume = %volume.title,
                chapter = %chapter.title,
                url = %chapter.url,
                "Could not fetch: no content article found"
            );
            return Ok(String::new());
        };

        write_fragment(&path, &fragment)?;
        tracing::info!(chapter = %chapter.title, "Saved content for Chapter");
        Ok(fragment)
    }

    async fn key_lock(&self, path: &Path) -> Arc<Mutex<()>> {
        let mut locks = self.locks.lock().await;
        locks.entry(path.to_path_buf()).or_default().clone()
    }

    async fn pace(&self) {
        if self.max_delay_ms == 0 {
            return;
        }
        let delay_ms = rand::thread_rng().gen_range(0..self.max_delay_ms);
        tokio::time::sleep(Duration::from_millis(delay_ms)).await;
    }
}

fn write_fragment(path: &Path, fragment: &str) -> anyhow::Result<()> {
    std::fs::write(path, fragment)
        .with_context(|| format!("write chapter cache: {}", path.display()))
}

/// Serialize the first `#content article` with the chapter class added.
pub fn extract_fragment(html: &str) -> Option<String> {
    let document = Html::parse_document(html);
    let article = document.select(&CONTENT_ARTICLE).next()?;
    Some(outer_html_with_class(article, CHAPTER_CLASS))
}

fn outer_html_with_class(element: ElementRef<'_>, class: &str) -> String {
    let value = element.value();
    let name = value.name();
    let already_tagged = value.classes().any(|c| c == class);

    let mut out = String::new();
    out.push('<');
    out.push_str(name);

    let mut saw_class_attr = false;
    for (attr, attr_value) in value.attrs() {
        let attr_value = if attr == "class" {
            saw_class_attr = true;
            if already_tagged {
                attr_value.to_owned()
            } else if attr_value.trim().is_empty() {
                class.to_owned()
            } else {
                format!("{attr_value} {class}")
            }
        } else {
            attr_value.to_owned()
        };
        out.push_str(&format!(" {attr}=\"{}\"", escape_attr(&attr_value)));
    }
    if !saw_class_attr {
        out.push_str(&format!(" class=\"{class}\""));
    }

    out.push('>');
    out.push_str(&element.inner_html());
    out.push_str(&format!("</{name}>"));
    out
}

fn escape_attr(value: &str) -> String {
    value.replace('&', "&amp;").replace('"', "&quot;")
}

/// Map a title to a single path component that stays inside its parent dir.
///
/// Separators, control characters and characters Windows reserves become `_`;
/// trailing dots and spaces are dropped. Titles that would name the directory
/// itself or its parent are rejected. The mapping is not injective:
/// `"Interlude."` and `"Interlude"`, or `"a?"` and `"a_"`, share one segment.
pub fn path_segment(title: &str) -> anyhow::Result<String> {
    let replaced = title
        .chars()
        .map(|c| match c {
            '/' | '\\' | '<' | '>' | ':' | '"' | '|' | '?' | '*' => '_',
            c if c.is_control() => '_',
            c => c,
        })
        .collect::<String>();
    let segment = replaced.trim_end_matches(['.', ' ']).to_owned();

    if segment.trim().is_empty() {
        anyhow::bail!("title cannot be used as a file name: {title:?}");
    }
    Ok(segment)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fragment_is_first_article_with_chapter_class() {
        let html = r#"<html><body>
<article class="teaser">outside</article>
<div id="content">
  <article id="post-1" class="post hentry"><h1>1.00</h1><p>Erin &amp; the inn.</p></article>
  <article class="post">second</article>
</div>
</body></html>"#;

        let fragment = extract_fragment(html).expect("article should be found");
        assert!(fragment.starts_with("<article"));
        assert!(fragment.contains(r#"id="post-1""#));
        assert!(fragment.contains(r#"class="post hentry chapter""#));
        assert!(fragment.contains("<h1>1.00</h1><p>Erin &amp; the inn.</p>"));
        assert!(fragment.ends_with("</article>"));
        assert!(!fragment.contains("outside"));
        assert!(!fragment.contains("second"));
    }

    #[test]
    fn fragment_gets_class_attribute_when_missing() {
        let html = r#"<div id="content"><article><p>text</p></article></div>"#;
        let fragment = extract_fragment(html).expect("article should be found");
        assert_eq!(fragment, r#"<article class="chapter"><p>text</p></article>"#);
    }

    #[test]
    fn chapter_class_is_not_duplicated() {
        let html = r#"<div id="content"><article class="chapter">x</article></div>"#;
        let fragment = extract_fragment(html).expect("article should be found");
        assert_eq!(fragment, r#"<article class="chapter">x</article>"#);
    }

    #[test]
    fn page_without_content_article_has_no_fragment() {
        let html = r#"<html><body><div id="content"><p>Not found</p></div><article>x</article></body></html>"#;
        assert!(extract_fragment(html).is_none());
    }

    #[test]
    fn path_segment_keeps_ordinary_titles() -> anyhow::Result<()> {
        assert_eq!(path_segment("1.00")?, "1.00");
        assert_eq!(path_segment("Volume 1")?, "Volume 1");
        assert_eq!(path_segment("Interlude – Ryoka")?, "Interlude – Ryoka");
        Ok(())
    }

    #[test]
    fn path_segment_replaces_separators_and_reserved_characters() -> anyhow::Result<()> {
        assert_eq!(path_segment("../../etc/passwd")?, ".._.._etc_passwd");
        assert_eq!(path_segment(r"a\b:c*d?")?, "a_b_c_d_");
        assert_eq!(path_segment("Tab\there")?, "Tab_here");
        assert_eq!(path_segment("Ends with dot.")?, "Ends with dot");
        Ok(())
    }

    #[test]
    fn path_segment_is_not_injective() -> anyhow::Result<()> {
        assert_eq!(path_segment("Interlude.")?, path_segment("Interlude")?);
        assert_eq!(path_segment("a?")?, path_segment("a_")?);
        Ok(())
    }

    #[test]
    fn path_segment_rejects_titles_naming_a_directory() {
        for title in ["", "   ", ".", "..", "..."] {
            assert!(path_segment(title).is_err(), "title={title:?}");
        }
    }
}

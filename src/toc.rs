use std::sync::LazyLock;

use scraper::{ElementRef, Html, Selector};

use crate::formats::{Chapter, Volume};

static SIDEBAR_SECTIONS: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("#secondary aside").unwrap());
static WIDGET_TITLE: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse(".widget-title").unwrap());
static TEXT_WIDGET: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse(".textwidget").unwrap());

const TOC_TITLE_PREFIX: &str = "table of contents";

#[derive(Debug, thiserror::Error)]
pub enum TocError {
    #[error("Could not find table of contents ({matches} matching sidebar sections, expected 1)")]
    NotFound { matches: usize },

    #[error("volume title without a chapter list: {title:?}")]
    UnpairedVolumeTitle { title: String },
}

/// One `<p>` child of the table of contents widget, reduced to what either
/// half of a volume needs.
#[derive(Debug, Clone, Default)]
pub struct TocParagraph {
    pub text: String,
    pub links: Vec<TocLink>,
}

#[derive(Debug, Clone)]
pub struct TocLink {
    pub text: String,
    pub href: String,
}

#[derive(Debug, Default)]
enum TocState {
    #[default]
    ExpectingTitle,
    ExpectingChapters {
        title: String,
    },
}

/// Consumes paragraphs that strictly alternate volume title, chapter list.
#[derive(Debug, Default)]
pub struct TocBuilder {
    state: TocState,
    volumes: Vec<Volume>,
}

impl TocBuilder {
    pub fn push(&mut self, paragraph: TocParagraph) {
        match std::mem::take(&mut self.state) {
            TocState::ExpectingTitle => {
                self.state = TocState::ExpectingChapters {
                    title: paragraph.text.trim().to_owned(),
                };
            }
            TocState::ExpectingChapters { title } => {
                let chapters = paragraph
                    .links
                    .into_iter()
                    .enumerate()
                    .map(|(id, link)| Chapter {
                        id,
                        title: link.text.trim().to_owned(),
                        url: fix_protocol_relative_url(&link.href),
                    })
                    .collect();
                self.volumes.push(Volume { title, chapters });
            }
        }
    }

    pub fn finish(self) -> Result<Vec<Volume>, TocError> {
        match self.state {
            TocState::ExpectingTitle => Ok(self.volumes),
            TocState::ExpectingChapters { title } => Err(TocError::UnpairedVolumeTitle { title }),
        }
    }
}

/// Parse the site root and return its volumes in document order.
pub fn extract_volumes(html: &str) -> Result<Vec<Volume>, TocError> {
    let document = Html::parse_document(html);

    let sections = document
        .select(&SIDEBAR_SECTIONS)
        .filter(is_toc_section)
        .collect::<Vec<_>>();
    let [section] = sections.as_slice() else {
        return Err(TocError::NotFound {
            matches: sections.len(),
        });
    };

    let mut builder = TocBuilder::default();
    for widget in section.select(&TEXT_WIDGET) {
        for paragraph in child_elements(widget, "p") {
            builder.push(TocParagraph {
                text: paragraph.text().collect(),
                links: child_elements(paragraph, "a")
                    .map(|link| TocLink {
                        text: link.text().collect(),
                        href: link.value().attr("href").unwrap_or_default().to_owned(),
                    })
                    .collect(),
            });
        }
    }

    let volumes = builder.finish()?;
    tracing::debug!(volumes = volumes.len(), "extracted table of contents");
    Ok(volumes)
}

/// `//host/path` becomes `https://host/path`; everything else is returned as is.
pub fn fix_protocol_relative_url(url: &str) -> String {
    if url.starts_with("//") {
        format!("https:{url}")
    } else {
        url.to_owned()
    }
}

fn is_toc_section(section: &ElementRef<'_>) -> bool {
    let title = section
        .select(&WIDGET_TITLE)
        .flat_map(|el| el.text())
        .collect::<String>();
    title
        .trim_start()
        .to_lowercase()
        .starts_with(TOC_TITLE_PREFIX)
}

fn child_elements<'a>(
    parent: ElementRef<'a>,
    name: &'static str,
) -> impl Iterator<Item = ElementRef<'a>> {
    parent
        .children()
        .filter_map(ElementRef::wrap)
        .filter(move |child| child.value().name() == name)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn index_page(sidebar: &str) -> String {
        format!(
            r#"<!doctype html>
<html>
  <body>
    <div id="content"><p>Latest chapter</p></div>
    <div id="secondary">
      <aside><h3 class="widget-title">Archives</h3><div class="textwidget"><p>Nope</p></div></aside>
      {sidebar}
    </div>
  </body>
</html>
"#
        )
    }

    const TOC_ASIDE: &str = r#"<aside>
  <h3 class="widget-title">Table of Contents</h3>
  <div class="textwidget">
    <p> Volume 1 </p>
    <p><a href="//example.com/1-00">1.00</a> <a href="https://example.com/1-01"> 1.01 </a> <a href="/1-02">1.02</a></p>
    <p>Volume 2</p>
    <p><a href="//example.com/2-00">2.00</a></p>
  </div>
</aside>"#;

    #[test]
    fn extracts_volumes_in_document_order() -> anyhow::Result<()> {
        let volumes = extract_volumes(&index_page(TOC_ASIDE))?;

        assert_eq!(volumes.len(), 2);
        assert_eq!(volumes[0].title, "Volume 1");
        assert_eq!(volumes[1].title, "Volume 2");
        assert_eq!(volumes[0].chapters.len(), 3);
        assert_eq!(volumes[1].chapters.len(), 1);

        let first = &volumes[0].chapters;
        assert_eq!(
            first[0],
            Chapter {
                id: 0,
                title: "1.00".to_owned(),
                url: "https://example.com/1-00".to_owned(),
            }
        );
        assert_eq!(first[1].id, 1);
        assert_eq!(first[1].title, "1.01");
        assert_eq!(first[1].url, "https://example.com/1-01");
        assert_eq!(first[2].url, "/1-02");
        assert_eq!(volumes[1].chapters[0].id, 0);
        Ok(())
    }

    #[test]
    fn toc_title_match_is_case_insensitive_prefix() -> anyhow::Result<()> {
        let aside = TOC_ASIDE.replace("Table of Contents", "TABLE OF CONTENTS (Web)");
        let volumes = extract_volumes(&index_page(&aside))?;
        assert_eq!(volumes.len(), 2);
        Ok(())
    }

    #[test]
    fn missing_toc_is_rejected() {
        let err = extract_volumes(&index_page("")).unwrap_err();
        assert!(matches!(err, TocError::NotFound { matches: 0 }));
        assert!(err.to_string().contains("Could not find table of contents"));
    }

    #[test]
    fn duplicate_toc_is_rejected() {
        let sidebar = format!("{TOC_ASIDE}\n{TOC_ASIDE}");
        let err = extract_volumes(&index_page(&sidebar)).unwrap_err();
        assert!(matches!(err, TocError::NotFound { matches: 2 }));
    }

    #[test]
    fn trailing_volume_title_is_rejected() {
        let aside = TOC_ASIDE.replace("</div>\n</aside>", "<p>Volume 3</p></div>\n</aside>");
        let err = extract_volumes(&index_page(&aside)).unwrap_err();
        match err {
            TocError::UnpairedVolumeTitle { title } => assert_eq!(title, "Volume 3"),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn builder_pairs_titles_with_link_lists() -> anyhow::Result<()> {
        let link = |text: &str| TocLink {
            text: text.to_owned(),
            href: format!("https://example.com/{text}"),
        };

        let mut builder = TocBuilder::default();
        for k in 0..4 {
            builder.push(TocParagraph {
                text: format!("Volume {k}"),
                links: Vec::new(),
            });
            builder.push(TocParagraph {
                text: "ignored".to_owned(),
                links: (0..k).map(|i| link(&format!("{k}.{i}"))).collect(),
            });
        }

        let volumes = builder.finish()?;
        assert_eq!(volumes.len(), 4);
        for (k, volume) in volumes.iter().enumerate() {
            assert_eq!(volume.title, format!("Volume {k}"));
            assert_eq!(volume.chapters.len(), k);
            for (i, chapter) in volume.chapters.iter().enumerate() {
                assert_eq!(chapter.id, i);
            }
        }
        Ok(())
    }

    #[test]
    fn builder_with_no_paragraphs_yields_no_volumes() -> anyhow::Result<()> {
        assert!(TocBuilder::default().finish()?.is_empty());
        Ok(())
    }

    #[test]
    fn protocol_relative_urls_get_https() {
        assert_eq!(
            fix_protocol_relative_url("//example.com/x"),
            "https://example.com/x"
        );
        assert_eq!(
            fix_protocol_relative_url("https://example.com/y"),
            "https://example.com/y"
        );
        assert_eq!(
            fix_protocol_relative_url("http://example.com/z"),
            "http://example.com/z"
        );
        assert_eq!(fix_protocol_relative_url("/relative"), "/relative");
    }
}

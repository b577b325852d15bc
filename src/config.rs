use std::path::PathBuf;
use std::time::Duration;

use anyhow::Context as _;
use url::Url;

use crate::cli::SiteArgs;

pub const DEFAULT_BASE_URL: &str = "https://wanderinginn.com/";
pub const DEFAULT_INDEX_CACHE: &str = "index.cached.html";
pub const DEFAULT_CHAPTERS_DIR: &str = "chapters";
pub const DEFAULT_VOLUMES_DIR: &str = "volumes";
pub const DEFAULT_MAX_DELAY_MS: u64 = 1250;
pub const DEFAULT_BOOK_TITLE: &str = "The Wandering Inn";

/// Everything the pipeline needs to know about where to read and write.
/// Nothing mutates it once a run starts.
#[derive(Debug, Clone)]
pub struct Config {
    pub base_url: Url,
    pub index_cache_path: PathBuf,
    pub chapter_cache_dir: PathBuf,
    pub volume_output_dir: PathBuf,
    pub max_delay_ms: u64,
    pub book_title: String,
    pub request_timeout: Option<Duration>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            base_url: Url::parse(DEFAULT_BASE_URL).expect("default base url is valid"),
            index_cache_path: PathBuf::from(DEFAULT_INDEX_CACHE),
            chapter_cache_dir: PathBuf::from(DEFAULT_CHAPTERS_DIR),
            volume_output_dir: PathBuf::from(DEFAULT_VOLUMES_DIR),
            max_delay_ms: DEFAULT_MAX_DELAY_MS,
            book_title: DEFAULT_BOOK_TITLE.to_owned(),
            request_timeout: None,
        }
    }
}

impl Config {
    pub fn from_args(args: &SiteArgs) -> anyhow::Result<Self> {
        let base_url = Url::parse(&args.base_url).context("parse --base-url")?;
        if base_url.scheme() != "http" && base_url.scheme() != "https" {
            anyhow::bail!("--base-url must be http/https: {base_url}");
        }

        Ok(Self {
            base_url,
            index_cache_path: PathBuf::from(&args.index_cache),
            chapter_cache_dir: PathBuf::from(&args.chapters_dir),
            volume_output_dir: PathBuf::from(&args.volumes_dir),
            max_delay_ms: args.delay_ms,
            book_title: args.title.clone(),
            request_timeout: args.timeout_secs.map(Duration::from_secs),
        })
    }
}

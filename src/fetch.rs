use anyhow::Context as _;
use reqwest::header::{ACCEPT, USER_AGENT};

use crate::config::Config;

#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    #[error("GET {url}")]
    Request {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("GET {url}: unexpected status {status}")]
    Status {
        url: String,
        status: reqwest::StatusCode,
    },
}

pub fn build_client(config: &Config) -> anyhow::Result<reqwest::Client> {
    let mut builder = reqwest::Client::builder()
        .user_agent(concat!("inn-archive/", env!("CARGO_PKG_VERSION")))
        .redirect(reqwest::redirect::Policy::limited(10));
    if let Some(timeout) = config.request_timeout {
        builder = builder.timeout(timeout);
    }
    builder.build().context("build http client")
}

/// GET `url` and return the body as text. Any non-2xx status is an error.
pub async fn get_text(client: &reqwest::Client, url: &str) -> Result<String, FetchError> {
    let request_error = |source| FetchError::Request {
        url: url.to_owned(),
        source,
    };

    let response = client
        .get(url)
        .header(ACCEPT, "text/html,application/xhtml+xml;q=0.9,*/*;q=0.8")
        .send()
        .await
        .map_err(request_error)?;

    let status = response.status();
    if !status.is_success() {
        return Err(FetchError::Status {
            url: url.to_owned(),
            status,
        });
    }

    response.text().await.map_err(request_error)
}

/// Return the site root HTML, from the index cache unless `force_live` is set
/// or nothing is cached yet. A live fetch overwrites the cache.
pub async fn fetch_index_page(
    client: &reqwest::Client,
    config: &Config,
    force_live: bool,
) -> anyhow::Result<String> {
    let cache_path = &config.index_cache_path;

    if !force_live && cache_path.exists() {
        tracing::debug!(path = %cache_path.display(), "using cached index page");
        return std::fs::read_to_string(cache_path)
            .with_context(|| format!("read index cache: {}", cache_path.display()));
    }

    tracing::info!(url = %config.base_url, "fetching index page");
    let html = get_text(client, config.base_url.as_str())
        .await
        .context("fetch index page")?;

    if let Some(parent) = cache_path.parent()
        && !parent.as_os_str().is_empty()
    {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("create index cache dir: {}", parent.display()))?;
    }
    std::fs::write(cache_path, &html)
        .with_context(|| format!("write index cache: {}", cache_path.display()))?;

    Ok(html)
}

use clap::{Args, Parser, Subcommand};

#[derive(Debug, Parser)]
#[command(author, version, about)]
pub struct Cli {
    #[command(flatten)]
    pub site: SiteArgs,

    /// Defaults to `run` when omitted.
    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Load the table of contents, prefetch every chapter, then write every volume.
    Run(RunArgs),
    /// Print the table of contents as JSON.
    Toc(TocArgs),
    /// Populate the chapter cache without assembling volumes.
    Prefetch(PrefetchArgs),
    /// Assemble volumes from the chapter cache (fetching anything missing).
    Assemble(AssembleArgs),
}

#[derive(Debug, Clone, Args)]
pub struct SiteArgs {
    /// Site root that serves the table of contents (must be http/https).
    #[arg(long, global = true, default_value = crate::config::DEFAULT_BASE_URL)]
    pub base_url: String,

    /// Cached copy of the site root HTML.
    #[arg(long, global = true, default_value = crate::config::DEFAULT_INDEX_CACHE)]
    pub index_cache: String,

    /// Directory holding one fragment per chapter, grouped by volume.
    #[arg(long, global = true, default_value = crate::config::DEFAULT_CHAPTERS_DIR)]
    pub chapters_dir: String,

    /// Directory receiving one assembled document per volume.
    #[arg(long, global = true, default_value = crate::config::DEFAULT_VOLUMES_DIR)]
    pub volumes_dir: String,

    /// Upper bound of the random delay before each live chapter fetch.
    #[arg(long, global = true, default_value_t = crate::config::DEFAULT_MAX_DELAY_MS)]
    pub delay_ms: u64,

    /// Title prefix used in assembled volume documents.
    #[arg(long, global = true, default_value = crate::config::DEFAULT_BOOK_TITLE)]
    pub title: String,

    /// Per-request timeout. No timeout when omitted.
    #[arg(long, global = true)]
    pub timeout_secs: Option<u64>,
}

#[derive(Debug, Clone, Default, Args)]
pub struct RunArgs {
    /// Fetch the site root even if a cached copy exists.
    #[arg(long)]
    pub live_index: bool,

    /// Ignore cached chapters and fetch every chapter again.
    #[arg(long)]
    pub refetch_all: bool,
}

#[derive(Debug, Clone, Args)]
pub struct TocArgs {
    /// Fetch the site root even if a cached copy exists.
    #[arg(long)]
    pub live_index: bool,
}

#[derive(Debug, Clone, Args)]
pub struct PrefetchArgs {
    /// Fetch the site root even if a cached copy exists.
    #[arg(long)]
    pub live_index: bool,

    /// Ignore cached chapters and fetch every chapter again.
    #[arg(long)]
    pub refetch_all: bool,
}

#[derive(Debug, Clone, Args)]
pub struct AssembleArgs {
    /// Fetch the site root even if a cached copy exists.
    #[arg(long)]
    pub live_index: bool,

    /// Only assemble the named volume (repeatable). All volumes when omitted.
    #[arg(long = "volume")]
    pub volumes: Vec<String>,
}

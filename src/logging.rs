use anyhow::Context as _;

// Connection-level chatter from the HTTP stack stays quiet unless asked for.
const DEFAULT_DIRECTIVES: &str = "info,hyper_util=warn,reqwest=warn";

/// Install the stderr subscriber. `RUST_LOG` replaces the default directives.
pub fn init() -> anyhow::Result<()> {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .or_else(|_| tracing_subscriber::EnvFilter::try_new(DEFAULT_DIRECTIVES))
        .context("build log filter")?;

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init()
        .map_err(|err| anyhow::anyhow!("initialize tracing subscriber: {err}"))?;

    Ok(())
}

use std::process::ExitCode;

use anyhow::Context as _;
use clap::Parser as _;
use inn_archive::cli::{Command, RunArgs};

#[tokio::main]
async fn main() -> ExitCode {
    if let Err(err) = try_main().await {
        eprintln!("{err:#}");
        return ExitCode::FAILURE;
    }

    ExitCode::SUCCESS
}

async fn try_main() -> anyhow::Result<()> {
    inn_archive::logging::init().context("init logging")?;

    let cli = inn_archive::cli::Cli::parse();
    tracing::debug!(?cli, "parsed cli");

    let config = inn_archive::config::Config::from_args(&cli.site).context("build config")?;

    let command = cli
        .command
        .unwrap_or_else(|| Command::Run(RunArgs::default()));

    match command {
        Command::Run(args) => {
            inn_archive::build::run(&config, args)
                .await
                .context("run")?;
        }
        Command::Toc(args) => {
            inn_archive::build::toc(&config, args)
                .await
                .context("toc")?;
        }
        Command::Prefetch(args) => {
            inn_archive::build::prefetch(&config, args)
                .await
                .context("prefetch")?;
        }
        Command::Assemble(args) => {
            inn_archive::build::assemble(&config, args)
                .await
                .context("assemble")?;
        }
    }

    Ok(())
}

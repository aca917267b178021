use anyhow::Result;
use clap::Parser;
use tracing_subscriber::EnvFilter;

mod bitbucket;
mod cli;
mod config;
mod error;
mod mcp;

#[tokio::main]
async fn main() -> Result<()> {
    let mut cli = cli::Cli::parse();
    let command = cli.command.take().unwrap_or(cli::Command::Mcp);

    // stdout carries the MCP stream, so logs always go to stderr.
    let default_filter = if cli.verbose {
        "bitbucket_mcp=debug"
    } else {
        "bitbucket_mcp=info"
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter)),
        )
        .with_writer(std::io::stderr)
        .with_ansi(false)
        .init();

    match command {
        cli::Command::Mcp => cli::mcp::run(&cli).await,
        cli::Command::Tools => cli::tools::run(&cli),
        cli::Command::Prompts => cli::prompts::run(&cli),
        cli::Command::Call { name, args } => cli::call::run(&cli, &name, args.as_deref()).await,
        cli::Command::Config(cmd) => cli::config::run(cli.config.as_deref(), cmd),
        cli::Command::InstallMcp { name, path } => {
            cli::install_mcp::run(name, path, cli.base_url.as_deref())
        }
    }
}

use anyhow::Result;

use crate::cli::Cli;

pub async fn run(cli: &Cli) -> Result<()> {
    let dispatcher = cli.dispatcher()?;
    crate::mcp::serve(dispatcher).await
}

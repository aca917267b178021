use anyhow::{Context, Result};

use crate::cli::Cli;

pub fn run(cli: &Cli) -> Result<()> {
    let tools = cli.dispatcher()?.list_operations();
    let out = serde_json::to_string_pretty(&tools).context("failed to serialize tools")?;
    println!("{out}");
    Ok(())
}

use anyhow::{Context, Result};

use crate::cli::Cli;

pub fn run(cli: &Cli) -> Result<()> {
    let prompts = cli.dispatcher()?.list_prompts();
    let out = serde_json::to_string_pretty(&prompts).context("failed to serialize prompts")?;
    println!("{out}");
    Ok(())
}

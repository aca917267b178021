use anyhow::{Context, Result};
use rmcp::model::JsonObject;

use crate::cli::Cli;

pub async fn run(cli: &Cli, name: &str, args: Option<&str>) -> Result<()> {
    let args = args.map(parse_args).transpose()?;
    let dispatcher = cli.dispatcher()?;

    let result = dispatcher.invoke(name, args).await?;
    let out = serde_json::to_string_pretty(&result).context("failed to serialize result")?;
    println!("{out}");
    Ok(())
}

fn parse_args(raw: &str) -> Result<JsonObject> {
    match serde_json::from_str(raw).context("arguments are not valid JSON")? {
        serde_json::Value::Object(map) => Ok(map),
        other => anyhow::bail!("arguments must be a JSON object, got {other}"),
    }
}

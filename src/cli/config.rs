use std::path::Path;

use anyhow::{Context, Result};

use crate::cli::ConfigSubcommand;
use crate::config::{ConfigFile, DEFAULT_BASE_URL, KEYS, mask};

pub fn run(config: Option<&Path>, cmd: ConfigSubcommand) -> Result<()> {
    match cmd {
        ConfigSubcommand::Show => run_show(config),
        ConfigSubcommand::Set { key, value } => run_set(config, key, value),
        ConfigSubcommand::Get { key } => run_get(config, key),
    }
}

fn run_show(config: Option<&Path>) -> Result<()> {
    let file = ConfigFile::open(config).context("failed to open config file")?;
    let values = file.config();

    println!("Config file: {}", file.path().display());
    match values.base_url.as_deref() {
        Some(url) => println!("Base URL:    {url}"),
        None => println!("Base URL:    {DEFAULT_BASE_URL} (default)"),
    }
    match values.token.as_deref() {
        Some(token) => println!("Token:       {}", mask(token)),
        None => println!("Token:       (not set)"),
    }
    Ok(())
}

fn run_set(config: Option<&Path>, key: String, value: String) -> Result<()> {
    let mut file = ConfigFile::open(config).context("failed to open config file")?;
    if !file.set(&key, &value) {
        anyhow::bail!("unknown config key: {key}\nValid keys: {}", KEYS.join(", "));
    }
    file.save().context("failed to save config")?;

    let shown = if key == "token" { mask(&value) } else { value };
    println!("Set {key} = {shown}");
    Ok(())
}

fn run_get(config: Option<&Path>, key: String) -> Result<()> {
    let file = ConfigFile::open(config).context("failed to open config file")?;
    match file.get(&key) {
        Some(value) => println!("{}", value.unwrap_or("(not set)")),
        None => anyhow::bail!("unknown config key: {key}"),
    }
    Ok(())
}

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde_json::{Map, Value, json};

/// Register the binary as a stdio server in `<dir>/.mcp.json`.
///
/// A base URL given on the command line is written into the entry's `env`;
/// the token never is.
pub fn run(name: String, path: Option<PathBuf>, base_url: Option<&str>) -> Result<()> {
    let dir = match path {
        Some(dir) => dir,
        None => std::env::current_dir().context("failed to determine current directory")?,
    };
    let mcp_path = dir.join(".mcp.json");
    let mut root = read_manifest(&mcp_path)?;

    let bin = std::env::current_exe()
        .and_then(|p| p.canonicalize())
        .context("failed to locate the bitbucket-mcp binary")?;

    if !add_server(&mut root, &name, &bin.to_string_lossy(), base_url)? {
        println!("MCP server '{name}' already configured in {}", mcp_path.display());
        return Ok(());
    }

    let content = serde_json::to_string_pretty(&root).context("failed to serialize .mcp.json")?;
    fs::write(&mcp_path, content + "\n")
        .with_context(|| format!("failed to write {}", mcp_path.display()))?;

    println!("Added '{name}' to {}", mcp_path.display());
    Ok(())
}

fn read_manifest(path: &Path) -> Result<Value> {
    if !path.exists() {
        return Ok(json!({ "mcpServers": {} }));
    }
    let content =
        fs::read_to_string(path).with_context(|| format!("failed to read {}", path.display()))?;
    serde_json::from_str(&content).with_context(|| format!("failed to parse {}", path.display()))
}

/// Returns false when an entry with this name already exists.
fn add_server(root: &mut Value, name: &str, command: &str, base_url: Option<&str>) -> Result<bool> {
    let servers = root
        .as_object_mut()
        .context("invalid .mcp.json: expected an object")?
        .entry("mcpServers")
        .or_insert_with(|| Value::Object(Map::new()))
        .as_object_mut()
        .context("invalid .mcp.json: mcpServers is not an object")?;

    if servers.contains_key(name) {
        return Ok(false);
    }

    let mut entry = json!({ "command": command, "args": ["mcp"] });
    if let Some(url) = base_url {
        entry["env"] = json!({ "BITBUCKET_URL": url });
    }
    servers.insert(name.to_string(), entry);
    Ok(true)
}

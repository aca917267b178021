pub mod call;
pub mod config;
pub mod install_mcp;
pub mod mcp;
pub mod prompts;
pub mod tools;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};

use crate::bitbucket::{Backend, BitbucketClient};
use crate::config::{ConfigFile, Settings};
use crate::mcp::dispatch::Dispatcher;

#[derive(Debug, Parser)]
#[command(
    name = "bitbucket-mcp",
    about = "Bitbucket Server tools and prompts for LLM coding agents",
    version,
    propagate_version = true
)]
pub struct Cli {
    /// Bitbucket Server base URL
    #[arg(long, env = "BITBUCKET_URL", global = true)]
    pub base_url: Option<String>,

    /// Personal access token used as a bearer token
    #[arg(long, env = "BITBUCKET_TOKEN", hide_env_values = true, global = true)]
    pub token: Option<String>,

    /// Config file (default: <config dir>/bitbucket-mcp/config.toml)
    #[arg(long, env = "BITBUCKET_MCP_CONFIG", global = true)]
    pub config: Option<PathBuf>,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Defaults to `mcp`
    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Start the MCP server (stdio transport)
    Mcp,

    /// Print every tool with its input schema as JSON
    Tools,

    /// Print every prompt with its arguments as JSON
    Prompts,

    /// Invoke one tool and print its result
    Call {
        /// Tool name (see `bitbucket-mcp tools`)
        name: String,

        /// Arguments as a JSON object
        args: Option<String>,
    },

    /// View or modify the config file
    #[command(subcommand)]
    Config(ConfigSubcommand),

    /// Add this server to a project's .mcp.json
    InstallMcp {
        /// Server name in .mcp.json
        #[arg(long, default_value = "bitbucket")]
        name: String,

        /// Project directory (default: current directory)
        #[arg(short, long)]
        path: Option<PathBuf>,
    },
}

#[derive(Debug, Subcommand)]
pub enum ConfigSubcommand {
    /// Show the current configuration
    Show,

    /// Set a configuration value
    Set {
        /// Configuration key (base_url, token)
        key: String,
        /// Value to set (empty or "none" clears it)
        value: String,
    },

    /// Get a configuration value
    Get {
        /// Configuration key
        key: String,
    },
}

impl Cli {
    /// Resolve settings and build the dispatcher over a live client.
    pub fn dispatcher(&self) -> Result<Arc<Dispatcher>> {
        let file = ConfigFile::open(self.config.as_deref())?;
        let settings = Settings::resolve(self.base_url.clone(), self.token.clone(), &file)?;
        let client = BitbucketClient::new(&settings.base_url, &settings.token)
            .context("failed to build HTTP client")?;
        tracing::debug!(base_url = client.base_url(), "connecting");

        let backend: Arc<dyn Backend> = Arc::new(client);
        let dispatcher = Dispatcher::for_backend(backend).context("failed to register tools")?;
        Ok(Arc::new(dispatcher))
    }
}

mod cli_call;
mod cli_config;
mod cli_install_mcp;
mod cli_tools;
mod common;

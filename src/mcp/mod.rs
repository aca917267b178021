pub mod dispatch;
pub mod format;
pub mod prompts;
pub mod registry;
pub mod server;
pub mod tools;

#[cfg(test)]
pub(crate) mod testing;

use std::sync::Arc;

use anyhow::Result;
use rmcp::ServiceExt;
use rmcp::transport::stdio;
use tracing::info;

use dispatch::Dispatcher;
use server::BitbucketMcpServer;

pub async fn serve(dispatcher: Arc<Dispatcher>) -> Result<()> {
    let server = BitbucketMcpServer::new(dispatcher);
    info!("serving MCP over stdio");
    let service = server.serve(stdio()).await?;
    service.waiting().await?;
    Ok(())
}

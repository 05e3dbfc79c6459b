use anyhow::{anyhow, Result};
use tokio::io::{stdin, stdout, BufReader};

use sec_gemini::{AnalysisClient, Settings};

use super::tool;
use crate::mcp::McpServer;

/// Without a credential the server still starts and lists its tools; calls
/// then report the missing key to the agent.
pub async fn execute(settings: Settings) -> Result<()> {
    let system = match settings.client_config() {
        Ok(config) => {
            let client = AnalysisClient::new(config)
                .map_err(|e| anyhow!("Failed to initialize HTTP client: {}", e))?;
            Some(tool::system(client))
        }
        Err(err) => {
            tracing::warn!("{}, tool calls will fail", err);
            None
        }
    };

    tracing::info!("serving security tools on stdio");
    McpServer::new(system)
        .run(BufReader::new(stdin()), stdout())
        .await?;
    Ok(())
}

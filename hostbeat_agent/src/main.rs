use anyhow::Result;
use tracing_subscriber::EnvFilter;

use hostbeat_agent::agent::Agent;
use hostbeat_agent::config::AgentConfig;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = AgentConfig::from_env();
    let agent = Agent::bootstrap(config).await?;
    agent.run().await;
    Ok(())
}

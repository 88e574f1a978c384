//! Health command handler.

use super::{open_service, print_json};
use clap::Args;
use grounded_core::{config::AppConfig, AppResult};
use grounded_knowledge::ServiceStatus;

/// Report index and backend health
#[derive(Args, Debug)]
pub struct HealthCommand {
    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

impl HealthCommand {
    pub async fn execute(&self, config: &AppConfig) -> AppResult<()> {
        tracing::info!("Executing health command");

        let service = open_service(config)?;
        let health = service.health().await;

        if self.json {
            return print_json(&health);
        }

        let status = match health.status {
            ServiceStatus::Ok => "ok",
            ServiceStatus::Degraded => "degraded",
        };
        println!("Status:     {}", status);
        println!(
            "Index:      {} chunks from {} sources ({} dimensions)",
            health.chunks, health.sources, health.dimensions
        );
        println!(
            "Embeddings: {} / {}",
            health.embedding_provider, health.embedding_model
        );
        println!(
            "LLM:        {} ({})",
            health.llm_provider,
            if health.llm_reachable { "reachable" } else { "unreachable" }
        );
        if let Some(detail) = &health.detail {
            println!("Detail:     {}", detail);
        }

        Ok(())
    }
}

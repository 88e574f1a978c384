//! Source listing and deletion.

use super::{open_service, print_json};
use clap::Args;
use grounded_core::{config::AppConfig, AppResult};

/// List indexed sources
#[derive(Args, Debug)]
pub struct SourcesCommand {
    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

impl SourcesCommand {
    pub async fn execute(&self, config: &AppConfig) -> AppResult<()> {
        tracing::info!("Executing sources command");

        let service = open_service(config)?;
        let sources = service.sources();

        if self.json {
            return print_json(&sources);
        }

        if sources.is_empty() {
            println!("No sources indexed");
            return Ok(());
        }

        for source in &sources {
            println!(
                "{}  {} chunks  (indexed {})",
                source.source_id,
                source.chunk_count,
                source.indexed_at.format("%Y-%m-%d %H:%M:%S UTC")
            );
        }

        Ok(())
    }
}

/// Remove a source and all of its chunks
#[derive(Args, Debug)]
pub struct DeleteCommand {
    /// Source id as shown by `grounded sources`
    pub source_id: String,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

impl DeleteCommand {
    pub async fn execute(&self, config: &AppConfig) -> AppResult<()> {
        tracing::info!("Executing delete command for '{}'", self.source_id);

        let service = open_service(config)?;
        let removed = service.delete(&self.source_id);
        if removed > 0 {
            service.persist()?;
        }

        if self.json {
            return print_json(&serde_json::json!({
                "sourceId": self.source_id,
                "removed": removed,
            }));
        }

        if removed == 0 {
            println!("No source named '{}' in the index", self.source_id);
        } else {
            println!("Removed {} chunks of '{}'", removed, self.source_id);
        }

        Ok(())
    }
}

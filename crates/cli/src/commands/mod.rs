//! Command handlers for the grounded CLI.
//!
//! Every command opens the service over the persisted index; commands that
//! change the index write it back before returning.

pub mod health;
pub mod ingest;
pub mod query;
pub mod sources;

pub use health::HealthCommand;
pub use ingest::IngestCommand;
pub use query::QueryCommand;
pub use sources::{DeleteCommand, SourcesCommand};

use grounded_core::{config::AppConfig, AppResult};
use grounded_knowledge::QaService;
use serde::Serialize;

/// Build the service from `config` and restore the saved index, if any.
pub(crate) fn open_service(config: &AppConfig) -> AppResult<QaService> {
    let service = QaService::from_app_config(config)?;
    if service.load()? {
        tracing::debug!(
            "Restored {} chunks from {:?}",
            service.index().stats().chunks,
            service.config().index_path
        );
    }
    Ok(service)
}

pub(crate) fn print_json<T: Serialize>(value: &T) -> AppResult<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

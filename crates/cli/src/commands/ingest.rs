//! Ingest command handler.
//!
//! Parses files, feeds them through the service and persists the index.
//! A file that fails to parse is reported and skipped; the rest still go in.

use super::{open_service, print_json};
use clap::Args;
use grounded_core::{config::AppConfig, AppError, AppResult};
use grounded_knowledge::{collect_files, load_document, IngestionReport};
use serde::Serialize;
use std::path::{Path, PathBuf};

/// Ingest files or directories into the index
#[derive(Args, Debug)]
pub struct IngestCommand {
    /// Files or directories to ingest
    #[arg(required = true)]
    pub paths: Vec<PathBuf>,

    /// Source id to store the document under (single file only)
    #[arg(long)]
    pub source_id: Option<String>,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

#[derive(Debug, Serialize)]
struct SkippedFile {
    path: String,
    reason: String,
}

#[derive(Debug, Serialize)]
struct IngestSummary {
    reports: Vec<IngestionReport>,
    skipped: Vec<SkippedFile>,
}

impl IngestCommand {
    pub async fn execute(&self, config: &AppConfig) -> AppResult<()> {
        tracing::info!("Executing ingest command for {} paths", self.paths.len());

        let files = collect_files(&self.paths);
        if files.is_empty() {
            return Err(AppError::InvalidInput(format!(
                "no files found under {:?}",
                self.paths
            )));
        }
        if self.source_id.is_some() && files.len() > 1 {
            return Err(AppError::InvalidInput(
                "--source-id can only be used with a single file".to_string(),
            ));
        }

        let service = open_service(config)?;
        let mut summary = IngestSummary {
            reports: Vec::new(),
            skipped: Vec::new(),
        };

        for file in &files {
            let source_id = match &self.source_id {
                Some(id) => id.clone(),
                None => source_id_for(file, &config.workspace),
            };

            let document = match load_document(file, Some(&source_id)) {
                Ok(document) => document,
                Err(e) => {
                    tracing::warn!("Skipping {:?}: {}", file, e);
                    summary.skipped.push(SkippedFile {
                        path: file.to_string_lossy().into_owned(),
                        reason: e.to_string(),
                    });
                    continue;
                }
            };

            let report = service.ingest(document).await?;
            summary.reports.push(report);
        }

        if summary.reports.iter().any(|r| r.committed > 0) {
            service.persist()?;
        }

        if self.json {
            return print_json(&summary);
        }

        for report in &summary.reports {
            println!("{}", describe(report));
            for failure in &report.failures {
                println!("  chunk {} failed: {}", failure.position, failure.reason);
            }
        }
        for skipped in &summary.skipped {
            println!("Skipped {}: {}", skipped.path, skipped.reason);
        }

        let stats = service.index().stats();
        println!(
            "Index now holds {} chunks from {} sources",
            stats.chunks, stats.sources
        );

        Ok(())
    }
}

/// Path relative to the workspace when it lives inside it, otherwise as given.
fn source_id_for(file: &Path, workspace: &Path) -> String {
    let relative = workspace
        .canonicalize()
        .ok()
        .zip(file.canonicalize().ok())
        .and_then(|(root, path)| path.strip_prefix(&root).ok().map(Path::to_path_buf));

    relative
        .unwrap_or_else(|| file.to_path_buf())
        .to_string_lossy()
        .into_owned()
}

fn describe(report: &IngestionReport) -> String {
    let mut line = format!(
        "Ingested {}: {} of {} chunks indexed",
        report.source_id, report.committed, report.chunks_created
    );
    if report.dropped_short > 0 {
        line.push_str(&format!(", {} too short", report.dropped_short));
    }
    if report.replaced > 0 {
        line.push_str(&format!(", replaced {} previous", report.replaced));
    }
    if !report.failures.is_empty() {
        line.push_str(&format!(", {} failed", report.failures.len()));
    }
    line
}

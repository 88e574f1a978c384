//! Query command handler.

use super::{open_service, print_json};
use clap::Args;
use grounded_core::{config::AppConfig, AppResult};
use grounded_knowledge::FormattedResponse;

/// Ask a question against the indexed documents
#[derive(Args, Debug)]
pub struct QueryCommand {
    /// Question text
    pub query: String,

    /// Number of chunks to retrieve (default from config)
    #[arg(short = 'k', long)]
    pub top_k: Option<usize>,

    /// Minimum similarity score for this query only (0.0-1.0)
    #[arg(long)]
    pub score_threshold: Option<f32>,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

impl QueryCommand {
    pub async fn execute(&self, config: &AppConfig) -> AppResult<()> {
        tracing::info!("Executing query command");
        tracing::debug!("Query options: {:?}", self);

        let service = open_service(config)?;
        let response = service
            .query(&self.query, self.top_k, self.score_threshold)
            .await?;

        if self.json {
            print_json(&response)
        } else {
            println!("{}", render(&response));
            Ok(())
        }
    }
}

fn render(response: &FormattedResponse) -> String {
    let mut out = format!("Answer:\n{}\n", response.answer);

    if response.sources.is_empty() {
        return out;
    }

    out.push_str("\nSources:\n");
    for source in &response.sources {
        out.push_str(&format!(
            "- {} ({}, {})\n  \"{}\"\n",
            source.title, source.source, source.locator, source.excerpt
        ));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use grounded_knowledge::{SourceRef, Strategy, VerdictKind};

    fn response(sources: Vec<SourceRef>) -> FormattedResponse {
        FormattedResponse {
            answer: "Refunds are processed within 30 days.".to_string(),
            grounded: !sources.is_empty(),
            sources,
            strategy: Strategy::RagOnly,
            verdict: VerdictKind::Grounded,
            max_score: 0.82,
        }
    }

    #[test]
    fn test_render_with_sources() {
        let text = render(&response(vec![SourceRef {
            excerpt: "Refunds are processed within 30 days...".to_string(),
            source: "docs/refund_policy.md".to_string(),
            title: "Refund Policy".to_string(),
            locator: "lines 1-3".to_string(),
        }]));

        assert!(text.starts_with("Answer:\nRefunds are processed within 30 days.\n"));
        assert!(text.contains("- Refund Policy (docs/refund_policy.md, lines 1-3)"));
    }

    #[test]
    fn test_render_without_sources() {
        let text = render(&response(Vec::new()));
        assert!(!text.contains("Sources:"));
    }
}

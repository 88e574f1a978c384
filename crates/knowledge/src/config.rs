//! Service configuration derived from the application config.

use crate::chunk::ChunkConfig;
use crate::rag::RelevanceConfig;
use grounded_core::{AppConfig, AppResult, EmbeddingSettings, RagSettings};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Everything `QaService` needs, resolved once at start.
#[derive(Debug, Clone)]
pub struct ServiceConfig {
    /// Workspace root; prompt overrides are looked up under it
    pub workspace: PathBuf,

    /// Snapshot file used by `persist` and `load`
    pub index_path: PathBuf,

    pub chunk: ChunkConfig,
    pub relevance: RelevanceConfig,
    pub embedding: EmbeddingSettings,

    /// Formatter and fallback knobs
    pub rag: RagSettings,

    pub top_k: usize,
    pub embed_timeout: Duration,
    pub generate_timeout: Duration,

    /// Generation model passed to the LLM client
    pub llm_model: String,
}

impl ServiceConfig {
    /// Validate `config` and derive the service settings from it.
    pub fn from_app_config(config: &AppConfig) -> AppResult<Self> {
        config.validate()?;
        Ok(Self::build(
            &config.workspace,
            config.index_path(),
            &config.rag,
            config.embedding.clone(),
            &config.model,
        ))
    }

    /// Defaults rooted at `workspace`.
    pub fn for_workspace(workspace: &Path) -> Self {
        let rag = RagSettings::default();
        Self::build(
            workspace,
            index_path(workspace),
            &rag,
            EmbeddingSettings::default(),
            "local-model",
        )
    }

    fn build(
        workspace: &Path,
        index_path: PathBuf,
        rag: &RagSettings,
        embedding: EmbeddingSettings,
        llm_model: &str,
    ) -> Self {
        Self {
            workspace: workspace.to_path_buf(),
            index_path,
            chunk: ChunkConfig::from_settings(rag),
            relevance: RelevanceConfig::from_settings(rag),
            embedding,
            rag: rag.clone(),
            top_k: rag.top_k,
            embed_timeout: Duration::from_secs(rag.embed_timeout_secs),
            generate_timeout: Duration::from_secs(rag.generate_timeout_secs),
            llm_model: llm_model.to_string(),
        }
    }
}

/// Snapshot location for a workspace.
pub fn index_path(workspace: &Path) -> PathBuf {
    workspace.join(".grounded").join("index").join("snapshot.json")
}

#[cfg(test)]
mod tests {
    use super::*;
    use grounded_core::AppError;
    use tempfile::TempDir;

    #[test]
    fn test_from_app_config() {
        let temp = TempDir::new().unwrap();
        let mut app = AppConfig {
            workspace: temp.path().to_path_buf(),
            ..AppConfig::default()
        };
        app.rag.top_k = 5;
        app.rag.score_threshold = 0.5;
        app.rag.generate_timeout_secs = 7;

        let config = ServiceConfig::from_app_config(&app).unwrap();
        assert_eq!(config.top_k, 5);
        assert_eq!(config.relevance.score_threshold, 0.5);
        assert_eq!(config.generate_timeout, Duration::from_secs(7));
        assert_eq!(config.index_path, index_path(temp.path()));
    }

    #[test]
    fn test_invalid_settings_rejected() {
        let mut app = AppConfig::default();
        app.rag.confident_score_cutoff = 0.3;

        let err = ServiceConfig::from_app_config(&app).unwrap_err();
        assert!(matches!(err, AppError::Config(_)));
    }

    #[test]
    fn test_index_path() {
        let root = Path::new("/srv/docs");
        assert_eq!(
            index_path(root),
            PathBuf::from("/srv/docs/.grounded/index/snapshot.json")
        );
    }
}

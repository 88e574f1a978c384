//! Configuration management for the grounded QA service.
//!
//! Configuration is loaded once at process start and layered:
//! - Built-in defaults
//! - Config file (`.grounded/config.yaml`, or `GROUNDED_CONFIG`)
//! - Environment variables
//! - Command-line flags
//!
//! The resulting value is immutable; components receive the pieces they need
//! at construction time.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};
use std::str::FromStr;

use crate::error::{AppError, AppResult};

/// Main application configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Path to the workspace root (contains .grounded/)
    pub workspace: PathBuf,

    /// Optional config file path
    pub config_file: Option<PathBuf>,

    /// Generation provider ("ollama" or "openai-compatible")
    pub provider: String,

    /// Generation model identifier
    pub model: String,

    /// Generation endpoint override
    pub endpoint: Option<String>,

    /// API key for the generation provider
    pub api_key: Option<String>,

    /// Log level override
    pub log_level: Option<String>,

    /// Verbose mode (enables debug logging)
    pub verbose: bool,

    /// Disable colored output
    pub no_color: bool,

    /// Provider table from config.yaml
    pub llm: Option<LlmConfig>,

    /// Embedding backend used for both ingestion and queries
    pub embedding: EmbeddingSettings,

    /// Chunking, relevance and formatting knobs
    pub rag: RagSettings,
}

/// LLM configuration from config.yaml.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    #[serde(rename = "activeProvider")]
    pub active_provider: String,

    #[serde(default)]
    pub providers: HashMap<String, ProviderConfig>,
}

/// Provider-specific configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderConfig {
    pub model: String,

    pub endpoint: Option<String>,

    #[serde(rename = "apiKeyEnv")]
    pub api_key_env: Option<String>,

    /// Request timeout in seconds
    pub timeout: Option<u64>,
}

/// Embedding backend settings.
///
/// The provider/model/dimension triple is recorded in every index snapshot
/// and must match at query time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmbeddingSettings {
    #[serde(default = "default_embedding_provider")]
    pub provider: String,

    #[serde(default = "default_embedding_model")]
    pub model: String,

    #[serde(default = "default_embedding_dimensions")]
    pub dimensions: usize,

    #[serde(default)]
    pub endpoint: Option<String>,
}

fn default_embedding_provider() -> String {
    "trigram".to_string()
}

fn default_embedding_model() -> String {
    "trigram-v1".to_string()
}

fn default_embedding_dimensions() -> usize {
    384
}

impl Default for EmbeddingSettings {
    fn default() -> Self {
        Self {
            provider: default_embedding_provider(),
            model: default_embedding_model(),
            dimensions: default_embedding_dimensions(),
            endpoint: None,
        }
    }
}

/// Unit used to measure chunk sizes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChunkUnit {
    #[default]
    Characters,
    Words,
}

impl FromStr for ChunkUnit {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "characters" | "chars" => Ok(ChunkUnit::Characters),
            "words" => Ok(ChunkUnit::Words),
            other => Err(AppError::Config(format!("Unknown chunk unit: {}", other))),
        }
    }
}

/// How a fallback template is picked when several are configured.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FallbackSelection {
    /// Uniformly random per response
    #[default]
    Random,
    /// Cycle through templates in id order
    RoundRobin,
    /// Derived from the query text; same query, same template
    Hashed,
}

impl FromStr for FallbackSelection {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().replace('-', "_").as_str() {
            "random" => Ok(FallbackSelection::Random),
            "round_robin" => Ok(FallbackSelection::RoundRobin),
            "hashed" | "deterministic" => Ok(FallbackSelection::Hashed),
            other => Err(AppError::Config(format!(
                "Unknown fallback selection policy: {}",
                other
            ))),
        }
    }
}

/// Retrieval, relevance and formatting knobs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RagSettings {
    /// Target chunk length in `chunk_unit`s
    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,

    /// Overlap between consecutive chunks
    #[serde(default = "default_chunk_overlap")]
    pub chunk_overlap: usize,

    /// Chunks shorter than this are dropped at ingestion
    #[serde(default = "default_minimum_chunk_length")]
    pub minimum_chunk_length: usize,

    #[serde(default)]
    pub chunk_unit: ChunkUnit,

    /// Minimum cosine similarity for a candidate to pass
    #[serde(default = "default_score_threshold")]
    pub score_threshold: f32,

    /// Minimum fraction of query terms a candidate must contain
    #[serde(default = "default_term_ratio_threshold")]
    pub term_ratio_threshold: f32,

    /// Best passing score must exceed this for a grounded verdict
    #[serde(default = "default_confident_score_cutoff")]
    pub confident_score_cutoff: f32,

    #[serde(default = "default_top_k")]
    pub top_k: usize,

    /// Maximum excerpt length shown per source
    #[serde(default = "default_snippet_length")]
    pub snippet_length: usize,

    #[serde(default = "default_max_sources")]
    pub max_sources: usize,

    #[serde(default = "default_embed_timeout_secs")]
    pub embed_timeout_secs: u64,

    #[serde(default = "default_generate_timeout_secs")]
    pub generate_timeout_secs: u64,

    #[serde(default)]
    pub fallback_selection: FallbackSelection,

    /// Wrap document answers in a topic-aware lead-in and closing line
    #[serde(default)]
    pub frame_answers: bool,

    /// Opening sentences of the reply used when nothing relevant was found;
    /// `{{topic}}` is replaced with a short topic taken from the query. An
    /// apology, a suggestion and a closing line are appended.
    #[serde(default = "default_fallback_templates")]
    pub fallback_templates: BTreeMap<String, String>,
}

fn default_chunk_size() -> usize {
    1000
}

fn default_chunk_overlap() -> usize {
    200
}

fn default_minimum_chunk_length() -> usize {
    50
}

fn default_score_threshold() -> f32 {
    0.45
}

fn default_term_ratio_threshold() -> f32 {
    0.35
}

fn default_confident_score_cutoff() -> f32 {
    0.65
}

fn default_top_k() -> usize {
    3
}

fn default_snippet_length() -> usize {
    150
}

fn default_max_sources() -> usize {
    3
}

fn default_embed_timeout_secs() -> u64 {
    30
}

fn default_generate_timeout_secs() -> u64 {
    120
}

fn default_fallback_templates() -> BTreeMap<String, String> {
    [
        (
            "not_found",
            "I'm sorry, but I couldn't find specific information about {{topic}} in the \
             documents I have.",
        ),
        (
            "no_details",
            "I apologize, but I don't have detailed information about {{topic}} at the moment.",
        ),
        (
            "not_located",
            "I regret to inform you that I couldn't locate specific details about {{topic}} \
             in the indexed documents.",
        ),
        (
            "not_available",
            "I'm afraid I don't have specific information about {{topic}} available right now.",
        ),
    ]
    .into_iter()
    .map(|(id, text)| (id.to_string(), text.to_string()))
    .collect()
}

impl Default for RagSettings {
    fn default() -> Self {
        Self {
            chunk_size: default_chunk_size(),
            chunk_overlap: default_chunk_overlap(),
            minimum_chunk_length: default_minimum_chunk_length(),
            chunk_unit: ChunkUnit::default(),
            score_threshold: default_score_threshold(),
            term_ratio_threshold: default_term_ratio_threshold(),
            confident_score_cutoff: default_confident_score_cutoff(),
            top_k: default_top_k(),
            snippet_length: default_snippet_length(),
            max_sources: default_max_sources(),
            embed_timeout_secs: default_embed_timeout_secs(),
            generate_timeout_secs: default_generate_timeout_secs(),
            fallback_selection: FallbackSelection::default(),
            frame_answers: false,
            fallback_templates: default_fallback_templates(),
        }
    }
}

impl RagSettings {
    /// Check cross-field constraints.
    pub fn validate(&self) -> AppResult<()> {
        if self.chunk_size == 0 {
            return Err(AppError::Config("chunk_size must be positive".to_string()));
        }
        if self.chunk_overlap >= self.chunk_size {
            return Err(AppError::Config(format!(
                "chunk_overlap ({}) must be smaller than chunk_size ({})",
                self.chunk_overlap, self.chunk_size
            )));
        }
        if self.minimum_chunk_length > self.chunk_size {
            return Err(AppError::Config(format!(
                "minimum_chunk_length ({}) cannot exceed chunk_size ({})",
                self.minimum_chunk_length, self.chunk_size
            )));
        }
        for (name, value) in [
            ("score_threshold", self.score_threshold),
            ("term_ratio_threshold", self.term_ratio_threshold),
            ("confident_score_cutoff", self.confident_score_cutoff),
        ] {
            if !(0.0..=1.0).contains(&value) {
                return Err(AppError::Config(format!(
                    "{} must be within [0, 1], got {}",
                    name, value
                )));
            }
        }
        if self.confident_score_cutoff <= self.score_threshold {
            return Err(AppError::Config(format!(
                "confident_score_cutoff ({}) must be greater than score_threshold ({})",
                self.confident_score_cutoff, self.score_threshold
            )));
        }
        if self.top_k == 0 {
            return Err(AppError::Config("top_k must be at least 1".to_string()));
        }
        if self.embed_timeout_secs == 0 || self.generate_timeout_secs == 0 {
            return Err(AppError::Config("timeouts must be positive".to_string()));
        }
        if self.fallback_templates.is_empty() {
            return Err(AppError::Config(
                "at least one fallback template is required".to_string(),
            ));
        }
        Ok(())
    }
}

/// Full configuration file structure.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct ConfigFile {
    llm: Option<LlmConfig>,
    embedding: Option<EmbeddingSettings>,
    rag: Option<RagSettings>,
    workspace: Option<WorkspaceConfig>,
    logging: Option<LoggingConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct WorkspaceConfig {
    path: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct LoggingConfig {
    level: Option<String>,
    color: Option<bool>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            workspace: std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")),
            config_file: None,
            provider: "openai-compatible".to_string(),
            model: "local-model".to_string(),
            endpoint: None,
            api_key: None,
            log_level: None,
            verbose: false,
            no_color: false,
            llm: None,
            embedding: EmbeddingSettings::default(),
            rag: RagSettings::default(),
        }
    }
}

/// Parse an environment variable, failing loudly on malformed values.
fn env_parse<T: FromStr>(name: &str) -> AppResult<Option<T>>
where
    T::Err: std::fmt::Display,
{
    match std::env::var(name) {
        Ok(raw) => raw
            .trim()
            .parse::<T>()
            .map(Some)
            .map_err(|e| AppError::Config(format!("Invalid value for {}: {}", name, e))),
        Err(_) => Ok(None),
    }
}

impl AppConfig {
    /// Load configuration from the config file and environment variables.
    ///
    /// Environment variables:
    /// - `GROUNDED_WORKSPACE`, `GROUNDED_CONFIG`
    /// - `GROUNDED_PROVIDER`, `GROUNDED_MODEL`, `GROUNDED_ENDPOINT`, `GROUNDED_API_KEY`
    /// - `GROUNDED_EMBEDDING_PROVIDER`, `GROUNDED_EMBEDDING_MODEL`, `GROUNDED_EMBEDDING_DIMENSIONS`
    /// - `GROUNDED_CHUNK_SIZE`, `GROUNDED_CHUNK_OVERLAP`, `GROUNDED_MIN_CHUNK_LENGTH`
    /// - `GROUNDED_SCORE_THRESHOLD`, `GROUNDED_TERM_RATIO_THRESHOLD`,
    ///   `GROUNDED_CONFIDENT_CUTOFF`, `GROUNDED_TOP_K`, `GROUNDED_FRAME_ANSWERS`
    /// - `RUST_LOG`, `NO_COLOR`
    ///
    /// # Example
    /// ```no_run
    /// use grounded_core::config::AppConfig;
    ///
    /// let config = AppConfig::load().expect("Failed to load config");
    /// println!("Threshold: {}", config.rag.score_threshold);
    /// ```
    pub fn load() -> AppResult<Self> {
        Self::load_from(None, None)
    }

    /// Like [`AppConfig::load`], but an explicit workspace or config file
    /// wins over `GROUNDED_WORKSPACE` / `GROUNDED_CONFIG`.
    pub fn load_from(workspace: Option<PathBuf>, config_file: Option<PathBuf>) -> AppResult<Self> {
        let mut config = Self::default();

        if let Some(workspace) =
            workspace.or_else(|| std::env::var("GROUNDED_WORKSPACE").ok().map(PathBuf::from))
        {
            config.workspace = workspace;
        }

        config.config_file =
            config_file.or_else(|| std::env::var("GROUNDED_CONFIG").ok().map(PathBuf::from));

        if !config.workspace.exists() {
            return Err(AppError::Config(format!(
                "Workspace directory does not exist: {:?}",
                config.workspace
            )));
        }

        let config_path = config
            .config_file
            .clone()
            .unwrap_or_else(|| config.workspace.join(".grounded/config.yaml"));

        if config_path.exists() {
            config = config.merge_yaml(&config_path)?;
        }

        config.apply_env()?;

        Ok(config)
    }

    /// Merge a YAML configuration file into this config.
    pub fn merge_yaml(&self, path: &Path) -> AppResult<Self> {
        let contents = std::fs::read_to_string(path).map_err(|e| {
            AppError::Config(format!("Failed to read config file {:?}: {}", path, e))
        })?;

        self.merge_yaml_str(&contents)
            .map_err(|e| AppError::Config(format!("Failed to parse config file {:?}: {}", path, e)))
    }

    fn merge_yaml_str(&self, contents: &str) -> AppResult<Self> {
        let config_file: ConfigFile = serde_yaml::from_str(contents)?;

        let mut result = self.clone();

        if let Some(ws) = config_file.workspace {
            if let Some(path) = ws.path {
                result.workspace = PathBuf::from(path);
            }
        }

        if let Some(logging) = config_file.logging {
            if let Some(level) = logging.level {
                result.log_level = Some(level);
            }
            if let Some(color) = logging.color {
                result.no_color = !color;
            }
        }

        if let Some(llm) = config_file.llm {
            result.provider = llm.active_provider.clone();

            if let Some(provider_config) = llm.providers.get(&llm.active_provider) {
                result.model = provider_config.model.clone();
                if provider_config.endpoint.is_some() {
                    result.endpoint = provider_config.endpoint.clone();
                }
            }

            result.llm = Some(llm);
        }

        if let Some(embedding) = config_file.embedding {
            result.embedding = embedding;
        }

        if let Some(rag) = config_file.rag {
            result.rag = rag;
        }

        Ok(result)
    }

    /// Environment variables override YAML config.
    fn apply_env(&mut self) -> AppResult<()> {
        if let Ok(provider) = std::env::var("GROUNDED_PROVIDER") {
            self.provider = provider;
        }
        if let Ok(model) = std::env::var("GROUNDED_MODEL") {
            self.model = model;
        }
        if let Ok(endpoint) = std::env::var("GROUNDED_ENDPOINT") {
            self.endpoint = Some(endpoint);
        }
        if let Ok(key) = std::env::var("GROUNDED_API_KEY") {
            self.api_key = Some(key);
        }
        if let Ok(level) = std::env::var("RUST_LOG") {
            self.log_level = Some(level);
        }
        if std::env::var("NO_COLOR").is_ok() {
            self.no_color = true;
        }

        if let Ok(provider) = std::env::var("GROUNDED_EMBEDDING_PROVIDER") {
            self.embedding.provider = provider;
        }
        if let Ok(model) = std::env::var("GROUNDED_EMBEDDING_MODEL") {
            self.embedding.model = model;
        }
        if let Some(dims) = env_parse("GROUNDED_EMBEDDING_DIMENSIONS")? {
            self.embedding.dimensions = dims;
        }

        let rag = &mut self.rag;
        if let Some(v) = env_parse("GROUNDED_CHUNK_SIZE")? {
            rag.chunk_size = v;
        }
        if let Some(v) = env_parse("GROUNDED_CHUNK_OVERLAP")? {
            rag.chunk_overlap = v;
        }
        if let Some(v) = env_parse("GROUNDED_MIN_CHUNK_LENGTH")? {
            rag.minimum_chunk_length = v;
        }
        if let Some(v) = env_parse("GROUNDED_SCORE_THRESHOLD")? {
            rag.score_threshold = v;
        }
        if let Some(v) = env_parse("GROUNDED_TERM_RATIO_THRESHOLD")? {
            rag.term_ratio_threshold = v;
        }
        if let Some(v) = env_parse("GROUNDED_CONFIDENT_CUTOFF")? {
            rag.confident_score_cutoff = v;
        }
        if let Some(v) = env_parse("GROUNDED_TOP_K")? {
            rag.top_k = v;
        }
        if let Some(v) = env_parse("GROUNDED_FRAME_ANSWERS")? {
            rag.frame_answers = v;
        }

        Ok(())
    }

    /// Apply CLI overrides to the configuration.
    ///
    /// CLI flags take precedence over environment variables and the config file.
    #[allow(clippy::too_many_arguments)]
    pub fn with_overrides(
        mut self,
        workspace: Option<PathBuf>,
        config_file: Option<PathBuf>,
        provider: Option<String>,
        model: Option<String>,
        log_level: Option<String>,
        verbose: bool,
        no_color: bool,
    ) -> Self {
        if let Some(workspace) = workspace {
            self.workspace = workspace;
        }

        if let Some(config_file) = config_file {
            self.config_file = Some(config_file);
        }

        if let Some(provider) = provider {
            self.provider = provider;
        }

        if let Some(model) = model {
            self.model = model;
        }

        if let Some(log_level) = log_level {
            self.log_level = Some(log_level);
        }

        if verbose {
            self.verbose = true;
            if self.log_level.is_none() {
                self.log_level = Some("debug".to_string());
            }
        }

        if no_color {
            self.no_color = true;
        }

        self
    }

    /// Get the path to the .grounded directory.
    pub fn grounded_dir(&self) -> PathBuf {
        self.workspace.join(".grounded")
    }

    /// Location of the persisted index snapshot.
    pub fn index_path(&self) -> PathBuf {
        self.grounded_dir().join("index").join("snapshot.json")
    }

    /// Ensure the .grounded directory exists.
    pub fn ensure_grounded_dir(&self) -> AppResult<()> {
        let dir = self.grounded_dir();
        if !dir.exists() {
            std::fs::create_dir_all(&dir).map_err(|e| {
                AppError::Config(format!("Failed to create .grounded directory: {}", e))
            })?;
        }
        Ok(())
    }

    /// Get the configuration for a provider from the provider table.
    pub fn get_provider_config(&self, provider: &str) -> Option<&ProviderConfig> {
        self.llm.as_ref().and_then(|llm| llm.providers.get(provider))
    }

    /// Resolve the API key: `GROUNDED_API_KEY` first, then the provider's `apiKeyEnv`.
    pub fn resolve_api_key(&self, provider: &str) -> Option<String> {
        if let Some(ref key) = self.api_key {
            return Some(key.clone());
        }

        self.get_provider_config(provider)
            .and_then(|p| p.api_key_env.as_deref())
            .and_then(|env_var| std::env::var(env_var).ok())
    }

    /// Validate provider names and RAG settings.
    pub fn validate(&self) -> AppResult<()> {
        let known_providers = ["ollama", "openai-compatible"];

        if !known_providers.contains(&self.provider.as_str()) {
            return Err(AppError::Config(format!(
                "Unknown provider: {}. Supported: {}",
                self.provider,
                known_providers.join(", ")
            )));
        }

        let known_embedders = ["trigram", "ollama"];
        if !known_embedders.contains(&self.embedding.provider.as_str()) {
            return Err(AppError::Config(format!(
                "Unknown embedding provider: {}. Supported: {}",
                self.embedding.provider,
                known_embedders.join(", ")
            )));
        }

        if self.embedding.dimensions == 0 {
            return Err(AppError::Config(
                "embedding dimensions must be positive".to_string(),
            ));
        }

        self.rag.validate()
    }
}

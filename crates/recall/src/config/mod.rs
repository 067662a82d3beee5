use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{RecallError, Result};

/// Main configuration structure for Recall
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
pub struct Config {
    /// Tier sizes and orchestration policy
    #[serde(default)]
    pub memory: MemoryConfig,
    /// Embedding service configuration
    #[serde(default)]
    pub embedding: EmbeddingConfig,
    /// Snapshot location
    #[serde(default)]
    pub storage: StorageConfig,
}

impl Config {
    /// Load configuration from an explicit path, or from the first default
    /// location that exists, falling back to built-in defaults.
    pub fn load(config_path: Option<&Path>) -> Result<Self> {
        Self::load_with_source(config_path).map(|(config, _)| config)
    }

    /// Like [`Config::load`], also returning the file that was read, if any
    pub fn load_with_source(config_path: Option<&Path>) -> Result<(Self, Option<PathBuf>)> {
        match Self::locate(config_path) {
            Some(path) => {
                tracing::info!("Loading config from: {}", path.display());
                let config = Self::from_file(&path)?;
                Ok((config, Some(path)))
            }
            None => {
                tracing::info!("No config file found, using defaults");
                Ok((Config::default(), None))
            }
        }
    }

    /// The config file `load` would read
    pub fn locate(config_path: Option<&Path>) -> Option<PathBuf> {
        if let Some(path) = config_path {
            return Some(path.to_path_buf());
        }

        [
            dirs::home_dir().map(|h| h.join(".recall").join("config.toml")),
            dirs::config_dir().map(|c| c.join("recall").join("config.toml")),
            Some(PathBuf::from("config.toml")),
        ]
        .into_iter()
        .flatten()
        .find(|path| path.exists())
    }

    /// Parse a TOML config file
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            RecallError::Config(format!(
                "Failed to read config file {}: {}",
                path.display(),
                e
            ))
        })?;
        toml::from_str(&content)
            .map_err(|e| RecallError::Config(format!("Failed to parse config: {e}")))
    }
}

/// Tier capacities plus consolidation and context-assembly policy
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct MemoryConfig {
    /// Conversation buffer capacity
    #[serde(default = "default_short_term_max")]
    pub short_term_max: usize,
    /// Desired working-set size
    #[serde(default = "default_working_max")]
    pub working_max: usize,
    /// Minimum cosine similarity for a long-term match to enter context
    #[serde(default = "default_similarity_cut")]
    pub similarity_cut: f64,
    /// Short-term entries older than this many seconds are consolidated
    #[serde(default = "default_consolidation_age_secs")]
    pub consolidation_age_secs: u64,
    /// Promote aged entries without a vector when no embedder is available
    #[serde(default = "default_promote_without_embedder")]
    pub promote_without_embedder: bool,
    /// Evict the lowest-priority working item once `working_max` is exceeded
    #[serde(default)]
    pub enforce_working_max: bool,
    /// Long-term candidates considered during context assembly
    #[serde(default = "default_context_candidates")]
    pub context_candidates: usize,
    /// Recent short-term entries appended during context assembly
    #[serde(default = "default_context_recent")]
    pub context_recent: usize,
}

impl Default for MemoryConfig {
    fn default() -> Self {
        Self {
            short_term_max: default_short_term_max(),
            working_max: default_working_max(),
            similarity_cut: default_similarity_cut(),
            consolidation_age_secs: default_consolidation_age_secs(),
            promote_without_embedder: default_promote_without_embedder(),
            enforce_working_max: false,
            context_candidates: default_context_candidates(),
            context_recent: default_context_recent(),
        }
    }
}

impl MemoryConfig {
    /// Age past which a short-term entry becomes a consolidation candidate
    pub fn consolidation_age(&self) -> chrono::Duration {
        i64::try_from(self.consolidation_age_secs)
            .ok()
            .and_then(chrono::Duration::try_seconds)
            .unwrap_or(chrono::Duration::MAX)
    }
}

fn default_short_term_max() -> usize {
    50
}

fn default_working_max() -> usize {
    10
}

fn default_similarity_cut() -> f64 {
    0.7
}

fn default_consolidation_age_secs() -> u64 {
    3600
}

fn default_promote_without_embedder() -> bool {
    true
}

fn default_context_candidates() -> usize {
    5
}

fn default_context_recent() -> usize {
    10
}

/// Embedding service configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct EmbeddingConfig {
    /// Provider: "ollama", "local" or "none"
    #[serde(default = "default_embedding_provider")]
    pub provider: String,
    /// Base URL of the embedding service
    #[serde(default = "default_embedding_endpoint")]
    pub endpoint: String,
    /// Model name passed to the service
    #[serde(default = "default_embedding_model")]
    pub model: String,
    /// Request timeout in seconds
    #[serde(default = "default_embedding_timeout_secs")]
    pub timeout_secs: u64,
    /// Input longer than this many characters is truncated before embedding
    #[serde(default = "default_max_input_chars")]
    pub max_input_chars: usize,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            provider: default_embedding_provider(),
            endpoint: default_embedding_endpoint(),
            model: default_embedding_model(),
            timeout_secs: default_embedding_timeout_secs(),
            max_input_chars: default_max_input_chars(),
        }
    }
}

fn default_embedding_provider() -> String {
    "ollama".to_string()
}

fn default_embedding_endpoint() -> String {
    "http://localhost:11434".to_string()
}

fn default_embedding_model() -> String {
    "nomic-embed-text".to_string()
}

fn default_embedding_timeout_secs() -> u64 {
    30
}

fn default_max_input_chars() -> usize {
    8192 * 4
}

/// Long-term snapshot location
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StorageConfig {
    /// Base directory for persisted data
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,
    /// Snapshot file name inside `data_dir`
    #[serde(default = "default_snapshot_file")]
    pub snapshot_file: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            snapshot_file: default_snapshot_file(),
        }
    }
}

impl StorageConfig {
    /// Full path of the long-term snapshot
    pub fn snapshot_path(&self) -> PathBuf {
        self.data_dir.join(&self.snapshot_file)
    }
}

fn default_data_dir() -> PathBuf {
    dirs::home_dir()
        .map(|h| h.join(".recall"))
        .unwrap_or_else(|| PathBuf::from(".recall"))
}

fn default_snapshot_file() -> String {
    "long_term.json".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_default() {
        let config = Config::default();
        assert_eq!(config.memory.short_term_max, 50);
        assert_eq!(config.memory.working_max, 10);
        assert!((config.memory.similarity_cut - 0.7).abs() < f64::EPSILON);
        assert_eq!(config.memory.consolidation_age_secs, 3600);
        assert!(config.memory.promote_without_embedder);
        assert!(!config.memory.enforce_working_max);
        assert_eq!(config.memory.context_candidates, 5);
        assert_eq!(config.memory.context_recent, 10);
        assert_eq!(config.embedding.provider, "ollama");
        assert_eq!(config.embedding.endpoint, "http://localhost:11434");
        assert_eq!(config.embedding.model, "nomic-embed-text");
        assert_eq!(config.embedding.timeout_secs, 30);
        assert_eq!(config.embedding.max_input_chars, 32768);
        assert_eq!(config.storage.snapshot_file, "long_term.json");
    }

    #[test]
    fn test_toml_deserialization() {
        let toml_str = r#"
[memory]
short_term_max = 100
working_max = 4
similarity_cut = 0.5
consolidation_age_secs = 600
promote_without_embedder = false
enforce_working_max = true
context_candidates = 8
context_recent = 3

[embedding]
provider = "none"
endpoint = "http://embed.internal:8080"
model = "mxbai-embed-large"
timeout_secs = 5
max_input_chars = 1000

[storage]
data_dir = "/tmp/recall"
snapshot_file = "memories.json"
"#;

        let config: Config = toml::from_str(toml_str).expect("Failed to parse TOML");

        assert_eq!(config.memory.short_term_max, 100);
        assert_eq!(config.memory.working_max, 4);
        assert!((config.memory.similarity_cut - 0.5).abs() < f64::EPSILON);
        assert_eq!(config.memory.consolidation_age_secs, 600);
        assert!(!config.memory.promote_without_embedder);
        assert!(config.memory.enforce_working_max);
        assert_eq!(config.memory.context_candidates, 8);
        assert_eq!(config.memory.context_recent, 3);

        assert_eq!(config.embedding.provider, "none");
        assert_eq!(config.embedding.endpoint, "http://embed.internal:8080");
        assert_eq!(config.embedding.model, "mxbai-embed-large");
        assert_eq!(config.embedding.timeout_secs, 5);
        assert_eq!(config.embedding.max_input_chars, 1000);

        assert_eq!(config.storage.data_dir, PathBuf::from("/tmp/recall"));
        assert_eq!(
            config.storage.snapshot_path(),
            PathBuf::from("/tmp/recall/memories.json")
        );
    }

    #[test]
    fn test_toml_partial_deserialization() {
        let toml_str = r#"
[memory]
similarity_cut = 0.9
"#;

        let config: Config = toml::from_str(toml_str).expect("Failed to parse partial TOML");

        assert!((config.memory.similarity_cut - 0.9).abs() < f64::EPSILON);
        // Everything else falls back to defaults
        assert_eq!(config.memory.short_term_max, 50);
        assert_eq!(config.memory.context_recent, 10);
        assert_eq!(config.embedding.provider, "ollama");
        assert_eq!(config.storage.snapshot_file, "long_term.json");
    }

    #[test]
    fn test_consolidation_age_duration() {
        let config = MemoryConfig {
            consolidation_age_secs: 90,
            ..MemoryConfig::default()
        };
        assert_eq!(config.consolidation_age(), chrono::Duration::seconds(90));
    }

    #[test]
    fn test_load_with_source_reports_explicit_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("custom.toml");
        std::fs::write(&path, "[memory]\nworking_max = 3\n").unwrap();

        let (config, source) = Config::load_with_source(Some(&path)).unwrap();
        assert_eq!(config.memory.working_max, 3);
        assert_eq!(source.as_deref(), Some(path.as_path()));
    }

    #[test]
    fn test_locate_prefers_explicit_path() {
        let path = Path::new("/nonexistent/recall.toml");
        assert_eq!(Config::locate(Some(path)), Some(path.to_path_buf()));
    }

    #[test]
    fn test_consolidation_age_saturates() {
        for secs in [1u64 << 62, u64::MAX] {
            let config = MemoryConfig {
                consolidation_age_secs: secs,
                ..MemoryConfig::default()
            };
            assert_eq!(config.consolidation_age(), chrono::Duration::MAX);
        }
    }

    #[test]
    fn test_load_from_explicit_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[memory]\nshort_term_max = 7\n").unwrap();

        let config = Config::load(Some(&path)).unwrap();
        assert_eq!(config.memory.short_term_max, 7);
    }

    #[test]
    fn test_load_missing_explicit_path_is_config_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("absent.toml");

        let err = Config::load(Some(&path)).unwrap_err();
        assert!(matches!(err, RecallError::Config(_)));
    }

    #[test]
    fn test_load_malformed_file_is_config_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[memory\nshort_term_max = ").unwrap();

        let err = Config::from_file(&path).unwrap_err();
        assert!(err.to_string().contains("Failed to parse config"));
    }
}

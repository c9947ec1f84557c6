//! Lightweight configuration loader and path helpers.
//!
//! Uses Figment to merge compiled defaults + `config.toml` +
//! `config.<env>.toml` + `APP_*` env vars (`__` separates nested keys, e.g.
//! `APP_RETRIEVAL__TOP_K=3`). Path settings expand `~` and `${VAR}`.

use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use std::env;
use std::path::PathBuf;

use crate::chunker::ChunkingConfig;
use crate::error::{Error, Result};

pub const DEFAULT_SYSTEM_INSTRUCTION: &str =
    "You are an AI Assistant. Only answer from the given context.";

pub struct Config {
    figment: Figment,
    env_name: String,
}

impl Config {
    pub fn load() -> anyhow::Result<Self> {
        let env_name = env::var("RUST_ENV").unwrap_or_else(|_| "dev".to_string());

        let mut figment = Figment::from(Serialized::defaults(Settings::default()))
            .merge(Toml::file("config.toml"));
        match env_name.as_str() {
            "dev" | "development" => figment = figment.merge(Toml::file("config.dev.toml")),
            "prod" | "production" => figment = figment.merge(Toml::file("config.prod.toml")),
            "test" | "testing" => figment = figment.merge(Toml::file("config.test.toml")),
            _ => {}
        }
        figment = figment.merge(Env::prefixed("APP_").split("__"));

        let config = Self { figment, env_name };
        config.validate_for_env()?;
        Ok(config)
    }

    /// Wrap an explicit figment (tests, embedding into other tools).
    pub fn from_figment(figment: Figment) -> Self {
        Self { figment, env_name: "custom".to_string() }
    }

    pub fn env_name(&self) -> &str {
        &self.env_name
    }

    /// Extract and validate the typed settings tree.
    pub fn settings(&self) -> anyhow::Result<Settings> {
        let settings: Settings = self
            .figment
            .extract()
            .map_err(|e| anyhow::anyhow!("Failed to parse settings: {}", e))?;
        settings.validate()?;
        Ok(settings)
    }

    fn validate_for_env(&self) -> anyhow::Result<()> {
        let settings = self.settings()?;
        match self.env_name.as_str() {
            "prod" | "production" if settings.embedding.use_fake => Err(anyhow::anyhow!(
                "embedding.use_fake must be false in production"
            )),
            _ => Ok(()),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub data: DataSettings,
    pub store: StoreSettings,
    pub chunking: ChunkingConfig,
    pub embedding: EmbeddingSettings,
    pub retrieval: RetrievalSettings,
    pub chat: ChatSettings,
    pub generation: GenerationSettings,
    pub ingest: IngestSettings,
}

impl Settings {
    pub fn validate(&self) -> Result<()> {
        self.chunking.validate()?;
        if self.retrieval.top_k == 0 {
            return Err(Error::InvalidConfig("retrieval.top_k must be at least 1".into()));
        }
        if self.embedding.batch_size == 0 {
            return Err(Error::InvalidConfig("embedding.batch_size must be at least 1".into()));
        }
        if self.chat.exit_commands.iter().all(|w| w.trim().is_empty()) {
            return Err(Error::InvalidConfig("chat.exit_commands must name at least one word".into()));
        }
        if self.generation.timeout_secs == 0 {
            return Err(Error::InvalidConfig("generation.timeout_secs must be positive".into()));
        }
        if self.data.extensions.is_empty() {
            return Err(Error::InvalidConfig("data.extensions must not be empty".into()));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DataSettings {
    pub source_dir: String,
    pub extensions: Vec<String>,
}

impl Default for DataSettings {
    fn default() -> Self {
        Self {
            source_dir: "./data_source".to_string(),
            extensions: ["txt", "md", "markdown", "rst", "text", "csv", "json", "html"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
        }
    }
}

impl DataSettings {
    pub fn source_path(&self) -> PathBuf {
        expand_path(&self.source_dir)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreSettings {
    pub uri: String,
    pub table: String,
    pub in_memory: bool,
}

impl Default for StoreSettings {
    fn default() -> Self {
        Self { uri: "./embeddings".to_string(), table: "rag_test".to_string(), in_memory: false }
    }
}

impl StoreSettings {
    pub fn store_path(&self) -> PathBuf {
        expand_path(&self.uri)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EmbeddingSettings {
    pub use_fake: bool,
    pub model_dir: Option<String>,
    pub max_len: usize,
    pub batch_size: usize,
    pub fake_dim: usize,
}

impl Default for EmbeddingSettings {
    fn default() -> Self {
        Self { use_fake: false, model_dir: None, max_len: 256, batch_size: 32, fake_dim: 384 }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RetrievalSettings {
    pub top_k: usize,
    pub delimiter: String,
}

impl Default for RetrievalSettings {
    fn default() -> Self {
        Self { top_k: 2, delimiter: ",".to_string() }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ChatSettings {
    pub exit_commands: Vec<String>,
    pub prompt: String,
}

impl Default for ChatSettings {
    fn default() -> Self {
        Self { exit_commands: vec!["stop".to_string(), "exit".to_string()], prompt: ": ".to_string() }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GenerationSettings {
    /// `gemini` or `openai`.
    pub provider: String,
    pub model: String,
    pub base_url: Option<String>,
    pub api_key: Option<String>,
    pub system_instruction: String,
    pub timeout_secs: u64,
    pub temperature: Option<f32>,
}

impl Default for GenerationSettings {
    fn default() -> Self {
        Self {
            provider: "gemini".to_string(),
            model: "gemini-2.5-flash".to_string(),
            base_url: None,
            api_key: None,
            system_instruction: DEFAULT_SYSTEM_INSTRUCTION.to_string(),
            timeout_secs: 60,
            temperature: None,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct IngestSettings {
    /// Reuse the existing store when the corpus fingerprint is unchanged.
    pub skip_unchanged: bool,
}

/// Expand a user-provided path string:
/// - Expands leading '~' to the user's home directory
/// - Expands ${VAR} and $VAR environment variables
/// - Returns a PathBuf without attempting to canonicalize
pub fn expand_path<S: AsRef<str>>(input: S) -> PathBuf {
    let s = input.as_ref();
    let expanded_env = shellexpand::env(s).unwrap_or(std::borrow::Cow::Borrowed(s));
    let expanded = shellexpand::tilde(&expanded_env);
    PathBuf::from(expanded.as_ref())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_documented_values() {
        let s = Settings::default();
        assert_eq!(s.retrieval.top_k, 2);
        assert_eq!(s.retrieval.delimiter, ",");
        assert_eq!(s.chat.exit_commands, vec!["stop", "exit"]);
        assert_eq!(s.store.table, "rag_test");
        assert_eq!(s.generation.model, "gemini-2.5-flash");
        assert!(s.validate().is_ok());
    }

    #[test]
    fn toml_overrides_merge_over_defaults() {
        let figment = Figment::from(Serialized::defaults(Settings::default())).merge(Toml::string(
            "[retrieval]\ntop_k = 5\n[chunking]\nchunk_size = 200\n",
        ));
        let s = Config::from_figment(figment).settings().unwrap();
        assert_eq!(s.retrieval.top_k, 5);
        assert_eq!(s.retrieval.delimiter, ",");
        assert_eq!(s.chunking.chunk_size, 200);
        assert_eq!(s.chunking.chunk_overlap, ChunkingConfig::default().chunk_overlap);
    }

    #[test]
    fn invalid_overlap_rejected() {
        let figment = Figment::from(Serialized::defaults(Settings::default())).merge(Toml::string(
            "[chunking]\nchunk_size = 10\nchunk_overlap = 10\n",
        ));
        assert!(Config::from_figment(figment).settings().is_err());
    }

    #[test]
    fn paths_expand_environment_variables() {
        std::env::set_var("DOCRAG_TEST_ROOT", "/srv/rag");
        let store = StoreSettings { uri: "${DOCRAG_TEST_ROOT}/embeddings".into(), ..StoreSettings::default() };
        assert_eq!(store.store_path(), PathBuf::from("/srv/rag/embeddings"));
        assert_eq!(expand_path("plain/dir"), PathBuf::from("plain/dir"));
    }
}

//! Configuration loader and path helpers.
//!
//! Uses Figment to merge `config.toml` + `config.<env>.toml` + `APP_*`
//! env vars, then extracts the typed [`AppConfig`]. Helpers expand `~`
//! and `${VAR}` and resolve relative paths against a base directory.

use figment::{
    providers::{Env, Format, Toml},
    Figment,
};
use serde::Deserialize;
use std::env;
use std::path::{Path, PathBuf};

pub struct Config {
    figment: Figment,
}

impl Config {
    pub fn load() -> anyhow::Result<Self> {
        let env_name = env::var("RUST_ENV").unwrap_or_else(|_| "dev".to_string());

        let mut figment = Figment::new().merge(Toml::file("config.toml"));
        match env_name.as_str() {
            "dev" | "development" => figment = figment.merge(Toml::file("config.dev.toml")),
            "prod" | "production" => figment = figment.merge(Toml::file("config.prod.toml")),
            "test" | "testing" => figment = figment.merge(Toml::file("config.test.toml")),
            _ => {}
        }
        figment = figment.merge(Env::prefixed("APP_").split("__"));

        Ok(Self { figment })
    }

    pub fn get<T>(&self, key: &str) -> anyhow::Result<T>
    where
        T: serde::de::DeserializeOwned,
    {
        self.figment
            .extract_inner(key)
            .map_err(|e| anyhow::anyhow!("Failed to get '{}': {}", key, e))
    }

    /// Extract the full typed configuration; unset sections and keys
    /// fall back to their defaults.
    pub fn app(&self) -> anyhow::Result<AppConfig> {
        self.figment
            .extract()
            .map_err(|e| anyhow::anyhow!("Invalid configuration: {}", e))
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub index: IndexConfig,
    #[serde(default)]
    pub search: SearchConfig,
    #[serde(default)]
    pub federation: FederationConfig,
    #[serde(default)]
    pub api: ApiConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct IndexConfig {
    /// Directory scanned for partition files.
    #[serde(default = "default_index_dir")]
    pub dir: String,
    /// Embedding dimensionality of the deployed model.
    #[serde(default = "default_dim")]
    pub dim: usize,
}

impl Default for IndexConfig {
    fn default() -> Self {
        Self {
            dir: default_index_dir(),
            dim: default_dim(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct SearchConfig {
    /// Hits at or below this similarity are dropped after fan-out.
    #[serde(default = "default_min_similarity")]
    pub min_similarity: f32,
    /// Hard ceiling on the result window; the candidate pool may grow
    /// to twice this during the expanding-retrieval loop.
    #[serde(default = "default_max_result_limit")]
    pub max_result_limit: usize,
    /// Bounded worker pool size for the per-partition fan-out.
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,
    /// Classifier-based partition routing; when off, all partitions
    /// matching the requested type are searched.
    #[serde(default = "default_true")]
    pub smart_selection: bool,
    /// How many predicted categories to expand into partitions.
    #[serde(default = "default_max_categories")]
    pub max_categories: usize,
    /// Ceiling on the partitions a routed search may fan out to, even
    /// when a broad category prefix matches more.
    #[serde(default = "default_max_partitions")]
    pub max_partitions: usize,
    /// Reranking runs only when the requested window is smaller.
    #[serde(default = "default_rerank_window")]
    pub rerank_window: usize,
    /// Whole-request deadline; a request that overruns it aborts with
    /// a server error instead of hanging.
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
    #[serde(default = "default_weight")]
    pub feedback_alpha: f32,
    #[serde(default = "default_weight")]
    pub feedback_beta: f32,
    #[serde(default = "default_weight")]
    pub feedback_gamma: f32,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            min_similarity: default_min_similarity(),
            max_result_limit: default_max_result_limit(),
            concurrency: default_concurrency(),
            smart_selection: true,
            max_categories: default_max_categories(),
            max_partitions: default_max_partitions(),
            rerank_window: default_rerank_window(),
            request_timeout_secs: default_request_timeout_secs(),
            feedback_alpha: default_weight(),
            feedback_beta: default_weight(),
            feedback_gamma: default_weight(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct FederationConfig {
    #[serde(default)]
    pub allow_incoming: bool,
    #[serde(default)]
    pub allow_outgoing: bool,
    /// Remote extension hosts queried alongside local search.
    #[serde(default)]
    pub extensions: Vec<String>,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for FederationConfig {
    fn default() -> Self {
        Self {
            allow_incoming: false,
            allow_outgoing: false,
            extensions: Vec::new(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ApiConfig {
    /// Base URL for patent drawing thumbnails, e.g.
    /// `https://api.example.org/patents`. Unset disables image links.
    #[serde(default)]
    pub image_base_url: Option<String>,
}

fn default_index_dir() -> String {
    "./indexes".to_string()
}
fn default_dim() -> usize {
    64
}
fn default_min_similarity() -> f32 {
    0.5
}
fn default_max_result_limit() -> usize {
    500
}
fn default_concurrency() -> usize {
    4
}
fn default_max_categories() -> usize {
    3
}
fn default_max_partitions() -> usize {
    16
}
fn default_rerank_window() -> usize {
    100
}
fn default_weight() -> f32 {
    1.0
}
fn default_timeout_secs() -> u64 {
    10
}
fn default_request_timeout_secs() -> u64 {
    30
}
fn default_true() -> bool {
    true
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

/// Resolve a possibly relative path against a given base directory after expansion.
/// If `p` is absolute, it's returned as-is; otherwise `base.join(p)` is returned.
pub fn resolve_with_base<S: AsRef<str>>(base: &Path, p: S) -> PathBuf {
    let p = expand_path(p);
    if p.is_absolute() {
        p
    } else {
        base.join(p)
    }
}

//! Configuration management for Lineage.
//!
//! Configuration is loaded from multiple sources with the following priority:
//! 1. Environment variables (highest priority)
//! 2. An explicit `--config` file, or the project-local `lineage.toml`
//! 3. User config `~/.config/lineage/config.toml`
//! 4. Built-in defaults (lowest priority)

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{CoreError, CoreResult};
use crate::inference::ReferenceNaming;

pub const DEFAULT_SAMPLE_SIZE: usize = 100;
pub const DEFAULT_MAX_RETRIES: u32 = 100;
pub const DEFAULT_RETRY_DELAY_MS: u64 = 5000;
pub const DEFAULT_PROJECT: &str = "UnknownRoot";
pub const DEFAULT_BASE_URL: &str = "http://localhost";
pub const DEFAULT_SYSTEM: &str = "mongo";

/// Main configuration structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct LineageConfig {
    pub graph: GraphConfig,
    pub retry: RetryConfig,
    pub documents: DocumentsConfig,
    pub code: CodeConfig,
}

/// Configuration for connecting to Neo4j.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GraphConfig {
    pub uri: String,
    pub user: String,
    pub password: String,
    pub database: String,
}

impl Default for GraphConfig {
    fn default() -> Self {
        Self {
            uri: "bolt://localhost:7687".to_string(),
            user: "neo4j".to_string(),
            password: "neo4j".to_string(),
            database: "neo4j".to_string(),
        }
    }
}

/// Connection bootstrap retry settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    pub max_retries: u32,
    pub initial_delay_ms: u64,
    /// Backoff multiplier; each pipeline has its own default when unset.
    pub multiplier: Option<f64>,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: DEFAULT_MAX_RETRIES,
            initial_delay_ms: DEFAULT_RETRY_DELAY_MS,
            multiplier: None,
        }
    }
}

/// Document schema pipeline settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DocumentsConfig {
    /// Directory holding one `mongoexport` file per collection.
    pub dump_dir: Option<PathBuf>,
    /// Database name; defaults to the dump directory's name.
    pub database: Option<String>,
    /// Source system prefix used in node ids.
    pub system: String,
    pub sample_size: usize,
    /// How `<X>Id` field names are matched against collection names.
    pub reference_naming: ReferenceNaming,
}

impl Default for DocumentsConfig {
    fn default() -> Self {
        Self {
            dump_dir: None,
            database: None,
            system: DEFAULT_SYSTEM.to_string(),
            sample_size: DEFAULT_SAMPLE_SIZE,
            reference_naming: ReferenceNaming::default(),
        }
    }
}

/// Code structure pipeline settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CodeConfig {
    pub source_dir: Option<PathBuf>,
    /// Project tag; scopes cleanup and prefixes every declaration id.
    pub project: String,
    /// Base URL (or `{path}`/`{line}` template) for source links.
    pub base_url: String,
}

impl Default for CodeConfig {
    fn default() -> Self {
        Self {
            source_dir: None,
            project: DEFAULT_PROJECT.to_string(),
            base_url: DEFAULT_BASE_URL.to_string(),
        }
    }
}

impl LineageConfig {
    /// Load configuration from an explicit file or the default locations.
    pub fn load(explicit: Option<&Path>) -> CoreResult<Self> {
        let mut config = match explicit {
            Some(path) => Self::from_file(path)?,
            None => Self::from_default_locations()?,
        };
        config.apply_env_overrides();
        Ok(config)
    }

    fn from_default_locations() -> CoreResult<Self> {
        if Path::new("lineage.toml").exists() {
            return Self::from_file("lineage.toml");
        }

        if let Some(config_dir) = dirs::config_dir() {
            let user_config = config_dir.join("lineage").join("config.toml");
            if user_config.exists() {
                return Self::from_file(&user_config);
            }
        }

        Ok(Self::default())
    }

    /// Load configuration from a specific file, without env overrides.
    pub fn from_file(path: impl AsRef<Path>) -> CoreResult<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)?;
        toml::from_str(&content)
            .map_err(|e| CoreError::Config(format!("{}: {}", path.display(), e)))
    }

    /// Apply environment variable overrides.
    pub fn apply_env_overrides(&mut self) {
        self.apply_overrides(|key| std::env::var(key).ok());
    }

    fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(uri) = lookup("NEO4J_URI") {
            self.graph.uri = uri;
        }
        if let Some(user) = lookup("NEO4J_USER") {
            self.graph.user = user;
        }
        if let Some(password) = lookup("NEO4J_PASSWORD") {
            self.graph.password = password;
        }
        if let Some(db) = lookup("NEO4J_DATABASE") {
            self.graph.database = db;
        }

        if let Some(n) = lookup("LINEAGE_MAX_RETRIES").and_then(|v| v.parse().ok()) {
            self.retry.max_retries = n;
        }
        if let Some(ms) = lookup("LINEAGE_RETRY_DELAY_MS").and_then(|v| v.parse().ok()) {
            self.retry.initial_delay_ms = ms;
        }
        if let Some(m) = lookup("LINEAGE_RETRY_MULTIPLIER")
            .and_then(|v| v.parse::<f64>().ok())
            .filter(|m| m.is_finite())
        {
            self.retry.multiplier = Some(m);
        }

        if let Some(dir) = lookup("MONGO_DUMP_DIR") {
            self.documents.dump_dir = Some(PathBuf::from(dir));
        }
        if let Some(db) = lookup("MONGO_DATABASE") {
            self.documents.database = Some(db);
        }
        if let Some(n) = lookup("SAMPLE_SIZE").and_then(|v| v.parse().ok()) {
            self.documents.sample_size = n;
        }
        match lookup("LINEAGE_REFERENCE_NAMING").as_deref() {
            Some("exact") => self.documents.reference_naming = ReferenceNaming::Exact,
            Some("conventional") => self.documents.reference_naming = ReferenceNaming::Conventional,
            _ => {}
        }

        if let Some(root) = lookup("ROOT_NAME").filter(|v| !v.is_empty()) {
            self.code.project = root;
        }
        if let Some(url) = lookup("BASE_URL").filter(|v| !v.is_empty()) {
            self.code.base_url = url;
        }
    }
}

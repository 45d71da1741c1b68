use anyhow::Result;
use jsonschema::{validator_for, Validator};
use once_cell::sync::Lazy;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

pub const DEFAULT_BASE_URL: &str = "http://127.0.0.1:4400";
pub const DEFAULT_TIMEOUT_SECS: u64 = 20;

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize, JsonSchema)]
pub struct GatewayConfig {
    /// Backend API root, e.g. <http://127.0.0.1:4400>
    #[serde(default = "default_base_url")]
    pub base_url: String,
    /// Per-request timeout in seconds.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_base_url() -> String {
    DEFAULT_BASE_URL.to_string()
}

fn default_timeout_secs() -> u64 {
    DEFAULT_TIMEOUT_SECS
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize, JsonSchema)]
pub struct SearchConfig {
    /// A query is dispatched only when it is longer than this many characters.
    #[serde(default = "default_min_query_len")]
    pub min_query_len: usize,
    /// Suggestions shown beneath the search bar.
    #[serde(default = "default_max_suggestions")]
    pub max_suggestions: usize,
}

fn default_min_query_len() -> usize {
    4
}

fn default_max_suggestions() -> usize {
    5
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            min_query_len: default_min_query_len(),
            max_suggestions: default_max_suggestions(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize, JsonSchema)]
pub struct SelectionConfig {
    /// Only relationships on this layer become the active element when clicked.
    #[serde(default = "default_layer")]
    pub selectable_edge_layer: i64,
}

fn default_layer() -> i64 {
    2
}

impl Default for SelectionConfig {
    fn default() -> Self {
        Self {
            selectable_edge_layer: default_layer(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize, JsonSchema)]
pub struct ProjectionConfig {
    /// Prefix prepended to icon file names.
    #[serde(default = "default_icon_dir")]
    pub icon_dir: String,
    #[serde(default = "default_layer")]
    pub emphasized_edge_layer: i64,
    #[serde(default = "default_emphasized_weight")]
    pub emphasized_edge_weight: u32,
    #[serde(default = "default_edge_weight")]
    pub default_edge_weight: u32,
    /// Fill for statements whose effect is Allow.
    #[serde(default = "default_allow_fill")]
    pub allow_fill: String,
    /// Fill for every other statement.
    #[serde(default = "default_deny_fill")]
    pub deny_fill: String,
}

fn default_icon_dir() -> String {
    "./".to_string()
}

fn default_emphasized_weight() -> u32 {
    7
}

fn default_edge_weight() -> u32 {
    3
}

fn default_allow_fill() -> String {
    "#76d654".to_string()
}

fn default_deny_fill() -> String {
    "#de6e68".to_string()
}

impl Default for ProjectionConfig {
    fn default() -> Self {
        Self {
            icon_dir: default_icon_dir(),
            emphasized_edge_layer: default_layer(),
            emphasized_edge_weight: default_emphasized_weight(),
            default_edge_weight: default_edge_weight(),
            allow_fill: default_allow_fill(),
            deny_fill: default_deny_fill(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize, JsonSchema)]
pub struct EngineConfig {
    #[serde(default)]
    pub gateway: GatewayConfig,
    #[serde(default)]
    pub search: SearchConfig,
    #[serde(default)]
    pub selection: SelectionConfig,
    #[serde(default)]
    pub projection: ProjectionConfig,
}

impl EngineConfig {
    /// Apply `PATHSCOPE_BASE_URL` and `PATHSCOPE_HTTP_TIMEOUT_SECS` on top of
    /// the loaded values.
    pub fn with_env_overrides(mut self) -> Self {
        if let Ok(url) = std::env::var("PATHSCOPE_BASE_URL") {
            let url = url.trim();
            if !url.is_empty() {
                self.gateway.base_url = url.to_string();
            }
        }
        if let Some(secs) = std::env::var("PATHSCOPE_HTTP_TIMEOUT_SECS")
            .ok()
            .and_then(|s| s.trim().parse::<u64>().ok())
        {
            self.gateway.timeout_secs = secs;
        }
        self
    }
}

static CONFIG_SCHEMA: Lazy<Validator> = Lazy::new(|| {
    let schema = schemars::schema_for!(EngineConfig);
    let schema_value = serde_json::to_value(&schema).expect("schema value");
    validator_for(&schema_value).expect("valid schema")
});

/// Returns the JSON schema describing the configuration structure.
///
/// # Panics
///
/// Panics if schema generation fails; this indicates a programming error.
pub fn config_schema_json() -> serde_json::Value {
    let schema = schemars::schema_for!(EngineConfig);
    serde_json::to_value(&schema).expect("schema json")
}

pub fn write_schema_file(path: &str) -> std::io::Result<()> {
    let schema_json = config_schema_json();
    std::fs::write(path, serde_json::to_string_pretty(&schema_json)?)
}

pub fn parse_config(content: &str) -> Result<EngineConfig> {
    let raw: toml::Value = toml::from_str(content)?;
    let json_value = serde_json::to_value(&raw)?;
    let validation_errors: Vec<_> = CONFIG_SCHEMA
        .iter_errors(&json_value)
        .map(|e| e.to_string())
        .collect();
    if !validation_errors.is_empty() {
        return Err(anyhow::anyhow!(validation_errors.join(", ")));
    }
    let cfg: EngineConfig = toml::from_str(content)?;
    Ok(cfg)
}

pub fn load_config(path: &str) -> Result<EngineConfig> {
    let content = std::fs::read_to_string(path)?;
    parse_config(&content)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use std::io::Write;

    #[test]
    fn empty_document_yields_defaults() {
        let cfg = parse_config("").expect("parse");
        assert_eq!(cfg, EngineConfig::default());
        assert_eq!(cfg.search.min_query_len, 4);
        assert_eq!(cfg.selection.selectable_edge_layer, 2);
        assert_eq!(cfg.projection.emphasized_edge_weight, 7);
    }

    #[test]
    fn partial_sections_keep_remaining_defaults() {
        let cfg = parse_config(
            r#"
            [gateway]
            base_url = "http://backend:9000"

            [search]
            max_suggestions = 10
            "#,
        )
        .expect("parse");
        assert_eq!(cfg.gateway.base_url, "http://backend:9000");
        assert_eq!(cfg.gateway.timeout_secs, DEFAULT_TIMEOUT_SECS);
        assert_eq!(cfg.search.max_suggestions, 10);
        assert_eq!(cfg.search.min_query_len, 4);
    }

    #[test]
    fn schema_rejects_wrong_types() {
        let err = parse_config(
            r#"
            [search]
            min_query_len = "four"
            "#,
        )
        .expect_err("type mismatch");
        assert!(err.to_string().contains("four"));
    }

    #[test]
    fn load_reads_from_disk() {
        let mut file = tempfile::NamedTempFile::new().expect("tmp");
        writeln!(file, "[selection]\nselectable_edge_layer = 3").expect("write");
        let cfg = load_config(file.path().to_str().expect("utf8 path")).expect("load");
        assert_eq!(cfg.selection.selectable_edge_layer, 3);
    }

    #[test]
    fn schema_file_is_pretty_json() {
        let dir = tempfile::tempdir().expect("tmpdir");
        let path = dir.path().join("schema.json");
        write_schema_file(path.to_str().expect("utf8 path")).expect("write schema");
        let text = std::fs::read_to_string(&path).expect("read schema");
        let value: serde_json::Value = serde_json::from_str(&text).expect("json");
        assert_eq!(value["title"], "EngineConfig");
    }

    #[test]
    #[serial]
    fn env_overrides_replace_gateway_settings() {
        std::env::set_var("PATHSCOPE_BASE_URL", "http://override:1");
        std::env::set_var("PATHSCOPE_HTTP_TIMEOUT_SECS", "3");
        let cfg = EngineConfig::default().with_env_overrides();
        std::env::remove_var("PATHSCOPE_BASE_URL");
        std::env::remove_var("PATHSCOPE_HTTP_TIMEOUT_SECS");
        assert_eq!(cfg.gateway.base_url, "http://override:1");
        assert_eq!(cfg.gateway.timeout_secs, 3);
    }
}

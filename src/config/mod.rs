use anyhow::{Context, Result};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use crate::session::ServerMemory;
use crate::units::{coerce_count, parse_size, round_bytes, DisplayUnit};
use crate::variables::{ConfigurationSet, Variable};

pub const CONFIG_FILE_NAMES: [&str; 2] = ["memcalc.toml", "Memcalc.toml"];

#[derive(Debug, Clone, Deserialize, Default)]
pub struct RawConfig {
    #[serde(default)]
    pub variables: BTreeMap<String, SettingValue>,
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub output: OutputConfig,
}

/// A variable in the config file: plain integers are bytes (or the count for
/// `max_connections`), strings may carry a unit such as `"128MB"`.
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum SettingValue {
    Integer(i64),
    Float(f64),
    Text(String),
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct ServerConfig {
    /// e.g. `"16GB"`; bare numbers are gigabytes.
    #[serde(default)]
    pub total_memory: Option<SettingValue>,
    #[serde(default)]
    pub detect_memory: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_clean_log")]
    pub clean_log_on_start: bool,
    #[serde(default)]
    pub file: bool,
}
fn default_clean_log() -> bool {
    true
}
impl Default for LoggingConfig {
    fn default() -> Self {
        Self { clean_log_on_start: default_clean_log(), file: false }
    }
}

#[derive(Debug, Clone, Copy, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct OutputConfig {
    #[serde(default)]
    pub format: OutputFormat,
}

#[derive(Debug, Clone)]
pub struct EffectiveConfig {
    pub variables: ConfigurationSet,
    pub server_memory: Option<ServerMemory>,
    pub detect_memory: bool,
    pub clean_log_on_start: bool,
    pub log_to_file: bool,
    pub log_dir: PathBuf,
    pub output: OutputFormat,
    pub source: Option<PathBuf>,
}

impl Default for EffectiveConfig {
    fn default() -> Self {
        resolve(RawConfig::default(), None)
    }
}

pub const DEFAULT_CONFIG_TEMPLATE: &str = r#"# MySQL memory calculator configuration

[variables]
# Starting values for the calculator. Integers are bytes; strings may carry a
# unit (B, KB, MB, GB), e.g. "128MB". Omitted variables keep their defaults.
innodb_buffer_pool_size = "128MB"
innodb_log_buffer_size = "16MB"
key_buffer_size = "16MB"
query_cache_size = 0
max_connections = 151
sort_buffer_size = "256KB"
read_buffer_size = "128KB"
read_rnd_buffer_size = "256KB"
join_buffer_size = "256KB"
thread_stack = "256KB"
tmp_table_size = "16MB"

[server]
# Total RAM of the database host, used for the 80% warning. Bare numbers are GB.
# total_memory = "16GB"
# Read the RAM size of the machine running the calculator instead. Default: false
detect_memory = false

[logging]
# Truncate $MEMCALC_LOG_DIR/latest.log on startup. Default: true
clean_log_on_start = true
# Also write logs to $MEMCALC_LOG_DIR/latest.log (default .logs). Default: false
file = false

[output]
# "text" or "json". Default: "text"
format = "text""#;

/// Finds the config file: explicit path, then `MEMCALC_CONFIG`, then the
/// well-known names in the working directory.
pub fn locate_config(explicit: Option<&Path>) -> Option<PathBuf> {
    if let Some(p) = explicit {
        return Some(p.to_path_buf());
    }
    if let Ok(p) = std::env::var("MEMCALC_CONFIG") {
        return Some(PathBuf::from(p));
    }
    CONFIG_FILE_NAMES.iter().map(PathBuf::from).find(|p| p.exists())
}

pub fn parse_config(contents: &str) -> Result<RawConfig> {
    toml::from_str::<RawConfig>(contents).context("parse memcalc config")
}

pub fn load_config(explicit: Option<&Path>) -> EffectiveConfig {
    let _ = dotenvy::dotenv();

    let mut raw = RawConfig::default();
    let path = locate_config(explicit);
    if let Some(p) = &path {
        match std::fs::read_to_string(p).with_context(|| format!("read config: {}", p.display())) {
            Ok(contents) => match parse_config(&contents) {
                Ok(parsed) => raw = parsed,
                Err(e) => tracing::warn!(?e, path = %p.display(), "Failed to parse config; using defaults"),
            },
            Err(e) => tracing::warn!(?e, "Config file unreadable; using defaults"),
        }
    }

    let mut cfg = resolve(raw, path);

    if let Some(mem) = std::env::var("MEMCALC_SERVER_MEMORY").ok().and_then(|s| server_memory_from_text(&s)) {
        cfg.server_memory = Some(mem);
    }
    if let Ok(v) = std::env::var("MEMCALC_DETECT_MEMORY") {
        cfg.detect_memory = v == "1" || v.eq_ignore_ascii_case("true");
    }
    if let Ok(dir) = std::env::var("MEMCALC_LOG_DIR") {
        cfg.log_dir = PathBuf::from(dir);
    }
    cfg
}

pub fn resolve(raw: RawConfig, source: Option<PathBuf>) -> EffectiveConfig {
    let mut variables = ConfigurationSet::default();
    for (name, value) in &raw.variables {
        match name.parse::<Variable>() {
            Ok(var) => variables.set(var, setting_value(var, value)),
            Err(e) => tracing::warn!(%e, "Ignoring unknown variable in config"),
        }
    }

    let server_memory = raw.server.total_memory.as_ref().and_then(|v| match v {
        SettingValue::Integer(n) => Some(ServerMemory { value: (*n).max(0) as f64, unit: DisplayUnit::Gigabyte }),
        SettingValue::Float(f) => Some(ServerMemory { value: f.max(0.0), unit: DisplayUnit::Gigabyte }),
        SettingValue::Text(s) => server_memory_from_text(s),
    });

    EffectiveConfig {
        variables,
        server_memory,
        detect_memory: raw.server.detect_memory,
        clean_log_on_start: raw.logging.clean_log_on_start,
        log_to_file: raw.logging.file,
        log_dir: PathBuf::from(".logs"),
        output: raw.output.format,
        source,
    }
}

pub fn server_memory_from_text(text: &str) -> Option<ServerMemory> {
    match parse_size(text) {
        Ok(size) => Some(ServerMemory { value: size.value, unit: size.unit.unwrap_or(DisplayUnit::Gigabyte) }),
        Err(e) => {
            tracing::warn!(%e, "Ignoring unparsable server memory");
            None
        }
    }
}

fn setting_value(var: Variable, value: &SettingValue) -> u64 {
    match value {
        SettingValue::Integer(n) => (*n).max(0) as u64,
        SettingValue::Float(f) if var.is_count() => {
            if f.is_finite() && *f > 0.0 {
                f.trunc() as u64
            } else {
                0
            }
        }
        SettingValue::Float(f) => round_bytes(*f),
        SettingValue::Text(s) if var.is_count() => coerce_count(s),
        SettingValue::Text(s) => match parse_size(s) {
            Ok(size) => round_bytes(size.to_bytes(DisplayUnit::Byte)),
            Err(e) => {
                tracing::warn!(%e, variable = %var, "Unparsable size in config; using 0");
                0
            }
        },
    }
}

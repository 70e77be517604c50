use anyhow::Context;
use serde::Deserialize;
use std::path::{Path, PathBuf};

pub const DEFAULT_API_BASE_URL: &str = "http://localhost:8080";

#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub api_base_url: String,
    /// Draft store directory opened at startup.
    pub workspace: Option<PathBuf>,
    pub log_json: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_base_url: DEFAULT_API_BASE_URL.to_string(),
            workspace: None,
            log_json: false,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct FileConfig {
    api_base_url: Option<String>,
    workspace: Option<PathBuf>,
    log_json: Option<bool>,
}

/// Defaults, then the TOML file named by `GRADESHEETD_CONFIG`, then the
/// `GRADESHEETD_*` environment variables.
pub fn load() -> anyhow::Result<Config> {
    let mut cfg = Config::default();
    if let Some(path) = env_nonempty("GRADESHEETD_CONFIG") {
        apply_file(&mut cfg, Path::new(&path))?;
    }
    apply_env(&mut cfg, env_nonempty)?;
    Ok(cfg)
}

fn env_nonempty(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

fn apply_file(cfg: &mut Config, path: &Path) -> anyhow::Result<()> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("read config file {}", path.display()))?;
    let file: FileConfig =
        toml::from_str(&text).with_context(|| format!("parse config file {}", path.display()))?;
    if let Some(v) = file.api_base_url {
        cfg.api_base_url = v;
    }
    if let Some(v) = file.workspace {
        cfg.workspace = Some(v);
    }
    if let Some(v) = file.log_json {
        cfg.log_json = v;
    }
    Ok(())
}

fn apply_env(cfg: &mut Config, get: impl Fn(&str) -> Option<String>) -> anyhow::Result<()> {
    if let Some(v) = get("GRADESHEETD_API_URL") {
        cfg.api_base_url = v;
    }
    if let Some(v) = get("GRADESHEETD_WORKSPACE") {
        cfg.workspace = Some(PathBuf::from(v));
    }
    if let Some(v) = get("GRADESHEETD_LOG_JSON") {
        cfg.log_json = parse_bool(&v)
            .with_context(|| format!("GRADESHEETD_LOG_JSON must be a boolean, got {v:?}"))?;
    }
    Ok(())
}

fn parse_bool(v: &str) -> Option<bool> {
    match v.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::errors::{ScaleWobError, ScaleWobResult};

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct AppConfig {
    #[serde(default)]
    pub bridge: BridgeConfig,
    #[serde(default)]
    pub launcher: LauncherConfig,
}

/// Configuration for the in-environment bridge agent.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BridgeConfig {
    /// Verbose per-message logging.
    #[serde(default)]
    pub debug: bool,
    /// Attach the DOM interaction observers on startup.
    #[serde(default = "default_true")]
    pub auto_track: bool,
    /// Origin the bridge addresses its messages to. Hosts that enforce
    /// origin checks read this; the in-memory channel does not.
    #[serde(default = "default_target_origin")]
    pub target_origin: String,
    /// Idle window after which accumulated scroll activity is flushed as a
    /// single event.
    #[serde(default = "default_scroll_debounce_ms")]
    pub scroll_debounce_ms: u64,
    /// Console capacity advertised to embedding hosts.
    #[serde(default = "default_max_console_entries")]
    pub max_console_entries: usize,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            debug: false,
            auto_track: true,
            target_origin: default_target_origin(),
            scroll_debounce_ms: default_scroll_debounce_ms(),
            max_console_entries: default_max_console_entries(),
        }
    }
}

/// Configuration for the host-side launcher controller.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LauncherConfig {
    /// Logical resolution the environment renders at before scaling.
    #[serde(default = "default_logical_width")]
    pub logical_width: f64,
    #[serde(default = "default_logical_height")]
    pub logical_height: f64,
    /// Fallback deadline for an evaluate response before evaluation state
    /// is force-reset.
    #[serde(default = "default_evaluate_timeout_ms")]
    pub evaluate_timeout_ms: u64,
    #[serde(default = "default_max_console_entries")]
    pub max_console_entries: usize,
    /// Base URL environments are served from; the launcher loads
    /// `<cdn_base>/<environment-id>/index.html`.
    #[serde(default = "default_cdn_base")]
    pub cdn_base: String,
}

impl Default for LauncherConfig {
    fn default() -> Self {
        Self {
            logical_width: default_logical_width(),
            logical_height: default_logical_height(),
            evaluate_timeout_ms: default_evaluate_timeout_ms(),
            max_console_entries: default_max_console_entries(),
            cdn_base: default_cdn_base(),
        }
    }
}

fn default_true() -> bool {
    true
}

fn default_target_origin() -> String {
    "*".to_string()
}

fn default_scroll_debounce_ms() -> u64 {
    300
}

fn default_max_console_entries() -> usize {
    100
}

fn default_logical_width() -> f64 {
    390.0
}

fn default_logical_height() -> f64 {
    844.0
}

fn default_evaluate_timeout_ms() -> u64 {
    10_000
}

fn default_cdn_base() -> String {
    "https://niumascript.com/scalewob-env".to_string()
}

fn resolve_config_path() -> ScaleWobResult<PathBuf> {
    if let Ok(exe) = std::env::current_exe() {
        if let Some(parent) = exe.parent() {
            let candidate = parent.join("scalewob.toml");
            if candidate.exists() {
                tracing::debug!(path = %candidate.display(), "config found next to executable");
                return Ok(candidate);
            }
        }
    }

    let cwd = std::env::current_dir()?;
    let candidate = cwd.join("scalewob.toml");
    if candidate.exists() {
        tracing::debug!(path = %candidate.display(), "config found in working directory");
        return Ok(candidate);
    }

    Err(ScaleWobError::Config(
        "scalewob.toml not found next to executable or in working directory".into(),
    ))
}

pub fn load_config() -> ScaleWobResult<AppConfig> {
    let path = resolve_config_path()?;
    load_config_from(&path)
}

pub fn load_config_from(path: &std::path::Path) -> ScaleWobResult<AppConfig> {
    let content = std::fs::read_to_string(path)?;
    let config: AppConfig = toml::from_str(&content)?;
    tracing::info!(path = %path.display(), "config loaded");
    Ok(config)
}

pub fn save_config(config: &AppConfig, path: &std::path::Path) -> ScaleWobResult<()> {
    let content = toml::to_string_pretty(config)?;
    std::fs::write(path, content)?;
    tracing::info!(path = %path.display(), "config saved");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn defaults_match_wire_contract() {
        let cfg = BridgeConfig::default();
        assert!(!cfg.debug);
        assert!(cfg.auto_track);
        assert_eq!(cfg.target_origin, "*");
        assert_eq!(cfg.scroll_debounce_ms, 300);
        assert_eq!(cfg.max_console_entries, 100);

        let cfg = LauncherConfig::default();
        assert_eq!(cfg.logical_width, 390.0);
        assert_eq!(cfg.logical_height, 844.0);
        assert_eq!(cfg.evaluate_timeout_ms, 10_000);
    }

    #[test]
    fn partial_toml_fills_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            "[bridge]\ndebug = true\n\n[launcher]\nevaluate_timeout_ms = 5000\n"
        )
        .unwrap();

        let cfg = load_config_from(file.path()).unwrap();
        assert!(cfg.bridge.debug);
        assert!(cfg.bridge.auto_track);
        assert_eq!(cfg.launcher.evaluate_timeout_ms, 5000);
        assert_eq!(cfg.launcher.logical_width, 390.0);
    }
}

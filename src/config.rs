/// External configuration loader.
///
/// Reads `config.toml` from the executable's directory (or CWD).
/// Falls back to sensible defaults if the file is missing or incomplete.

use std::path::PathBuf;
use std::time::Duration;

use serde::Deserialize;
use tracing::warn;

use crate::sim::resolve::ResolveRules;

// ── Public Config Struct ──

#[derive(Clone, Debug)]
pub struct GameConfig {
    pub timing: TimingConfig,
    pub beam: BeamConfig,
    pub resolve: ResolveRules,
    pub level: Option<PathBuf>,
    pub log_file: Option<PathBuf>,
    pub log_filter: String,
}

#[derive(Clone, Debug)]
pub struct TimingConfig {
    pub tick_rate_ms: u64,
    pub flash_ms: u64, // telegraph flash before the delayed clear
}

impl TimingConfig {
    pub fn tick(&self) -> Duration {
        Duration::from_millis(self.tick_rate_ms)
    }

    pub fn flash(&self) -> Duration {
        Duration::from_millis(self.flash_ms)
    }
}

#[derive(Clone, Debug)]
pub struct BeamConfig {
    pub max_steps: u32,
}

// ── TOML Schema (with serde defaults) ──

#[derive(Deserialize, Debug, Default)]
struct TomlConfig {
    #[serde(default)]
    timing: TomlTiming,
    #[serde(default)]
    beam: TomlBeam,
    #[serde(default)]
    resolve: TomlResolve,
    #[serde(default)]
    general: TomlGeneral,
}

#[derive(Deserialize, Debug)]
struct TomlTiming {
    #[serde(default = "default_tick_rate")]
    tick_rate_ms: u64,
    #[serde(default = "default_flash")]
    flash_ms: u64,
}

#[derive(Deserialize, Debug)]
struct TomlBeam {
    #[serde(default = "default_max_steps")]
    max_steps: u32,
}

#[derive(Deserialize, Debug)]
struct TomlResolve {
    #[serde(default = "default_search_radius")]
    search_radius: u32,
    #[serde(default)]
    player_allow_void: bool,
}

#[derive(Deserialize, Debug)]
struct TomlGeneral {
    #[serde(default)]
    level: String,
    #[serde(default)]
    log_file: String,
    #[serde(default = "default_log_filter")]
    log_filter: String,
}

// ── Defaults ──

fn default_tick_rate() -> u64 { 50 }
fn default_flash() -> u64 { 300 }
fn default_max_steps() -> u32 { 256 } // longer than any authored diagonal
fn default_search_radius() -> u32 { 4 }
fn default_log_filter() -> String { "info".into() }

impl Default for TomlTiming {
    fn default() -> Self {
        TomlTiming { tick_rate_ms: default_tick_rate(), flash_ms: default_flash() }
    }
}

impl Default for TomlBeam {
    fn default() -> Self {
        TomlBeam { max_steps: default_max_steps() }
    }
}

impl Default for TomlResolve {
    fn default() -> Self {
        TomlResolve { search_radius: default_search_radius(), player_allow_void: false }
    }
}

impl Default for TomlGeneral {
    fn default() -> Self {
        TomlGeneral { level: String::new(), log_file: String::new(), log_filter: default_log_filter() }
    }
}

impl From<TomlConfig> for GameConfig {
    fn from(t: TomlConfig) -> Self {
        let non_empty = |s: String| if s.trim().is_empty() { None } else { Some(PathBuf::from(s)) };
        GameConfig {
            timing: TimingConfig {
                tick_rate_ms: t.timing.tick_rate_ms.max(1),
                flash_ms: t.timing.flash_ms,
            },
            beam: BeamConfig { max_steps: t.beam.max_steps },
            resolve: ResolveRules {
                search_radius: t.resolve.search_radius,
                player_allow_void: t.resolve.player_allow_void,
            },
            level: non_empty(t.general.level),
            log_file: non_empty(t.general.log_file),
            log_filter: t.general.log_filter,
        }
    }
}

impl Default for GameConfig {
    fn default() -> Self {
        TomlConfig::default().into()
    }
}

// ── Loading ──

impl GameConfig {
    /// Load config from `config.toml`.
    /// Search order: (1) exe directory, (2) current working directory.
    /// Missing file or missing keys gracefully fall back to defaults.
    pub fn load() -> Self {
        let mut cfg: GameConfig = load_toml(&candidate_dirs()).into();
        if let Some(level) = cfg.level.take() {
            cfg.level = Some(resolve_relative(level));
        }
        cfg
    }

    /// Parse a TOML document. Errors fall back to defaults, like `load`.
    pub fn from_toml_str(text: &str) -> Self {
        match toml::from_str::<TomlConfig>(text) {
            Ok(cfg) => cfg.into(),
            Err(e) => {
                warn!("config.toml parse error, using defaults: {e}");
                GameConfig::default()
            }
        }
    }
}

/// Candidate directories to search: exe dir + CWD (deduplicated).
fn candidate_dirs() -> Vec<PathBuf> {
    let mut dirs = vec![];

    if let Ok(exe) = std::env::current_exe() {
        let resolved = exe.canonicalize().unwrap_or(exe);
        if let Some(parent) = resolved.parent() {
            dirs.push(parent.to_path_buf());
        }
    }

    if let Ok(cwd) = std::env::current_dir() {
        if !dirs.iter().any(|d| d == &cwd) {
            dirs.push(cwd);
        }
    }

    if dirs.is_empty() {
        dirs.push(PathBuf::from("."));
    }

    dirs
}

/// Relative level paths: first candidate dir that has the file, else CWD-relative.
fn resolve_relative(path: PathBuf) -> PathBuf {
    if path.is_absolute() {
        return path;
    }
    candidate_dirs()
        .iter()
        .map(|d| d.join(&path))
        .find(|p| p.is_file())
        .unwrap_or(path)
}

/// Search for config.toml in candidate directories.
fn load_toml(search_dirs: &[PathBuf]) -> TomlConfig {
    for dir in search_dirs {
        let path = dir.join("config.toml");
        if !path.exists() { continue; }
        match std::fs::read_to_string(&path) {
            Ok(text) => match toml::from_str::<TomlConfig>(&text) {
                Ok(cfg) => return cfg,
                Err(e) => {
                    warn!("config.toml parse error: {e}; using default settings");
                    return TomlConfig::default();
                }
            },
            Err(e) => warn!("could not read {}: {e}", path.display()),
        }
    }
    TomlConfig::default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_document_gives_defaults() {
        let cfg = GameConfig::from_toml_str("");
        assert_eq!(cfg.timing.tick_rate_ms, 50);
        assert_eq!(cfg.timing.flash(), Duration::from_millis(300));
        assert_eq!(cfg.beam.max_steps, 256);
        assert_eq!(cfg.resolve, ResolveRules::default());
        assert!(cfg.level.is_none());
        assert!(cfg.log_file.is_none());
        assert_eq!(cfg.log_filter, "info");
    }

    #[test]
    fn partial_sections_keep_other_defaults() {
        let cfg = GameConfig::from_toml_str(
            "[beam]\nmax_steps = 12\n\n[resolve]\nplayer_allow_void = true\n\n[general]\nlevel = \"levels/a.txt\"\n",
        );
        assert_eq!(cfg.beam.max_steps, 12);
        assert!(cfg.resolve.player_allow_void);
        assert_eq!(cfg.resolve.search_radius, 4);
        assert_eq!(cfg.level, Some(PathBuf::from("levels/a.txt")));
        assert_eq!(cfg.timing.flash_ms, 300);
    }

    #[test]
    fn malformed_document_falls_back() {
        let cfg = GameConfig::from_toml_str("[beam\nmax_steps = ");
        assert_eq!(cfg.beam.max_steps, 256);
    }

    #[test]
    fn zero_tick_rate_is_clamped() {
        let cfg = GameConfig::from_toml_str("[timing]\ntick_rate_ms = 0\n");
        assert_eq!(cfg.timing.tick(), Duration::from_millis(1));
    }
}

/// External configuration loader.
///
/// Reads `config.toml` from the executable's directory (or CWD).
/// Falls back to defaults if the file is missing or incomplete.
/// Only pacing and host concerns are configurable; levels, mutations and
/// scoring are compiled in.

use serde::Deserialize;
use std::path::PathBuf;

// ── Public Config Struct ──

#[derive(Clone, Debug)]
pub struct GameConfig {
    pub timing: TimingConfig,
    pub general: GeneralConfig,
    pub gamepad: GamepadConfig,
}

#[derive(Clone, Debug, PartialEq)]
pub struct TimingConfig {
    /// Movement interval on the first level, before any boost.
    pub base_tick_ms: u64,
    /// Applied once per level above the first.
    pub level_speedup: f64,
    /// Applied while the permanent speed effect is latched.
    pub speed_boost: f64,
    pub min_tick_ms: u64,
    /// Host frame pacing.
    pub frame_ms: u64,
}

impl Default for TimingConfig {
    fn default() -> Self {
        TimingConfig {
            base_tick_ms: default_base_tick(),
            level_speedup: default_level_speedup(),
            speed_boost: default_speed_boost(),
            min_tick_ms: default_min_tick(),
            frame_ms: default_frame_ms(),
        }
    }
}

impl TimingConfig {
    /// Movement interval for a level number (1-based).
    pub fn tick_interval(&self, level: u8, boosted: bool) -> u64 {
        let steps = level.saturating_sub(1) as i32;
        let mut ms = self.base_tick_ms as f64 * self.level_speedup.powi(steps);
        if boosted {
            ms *= self.speed_boost;
        }
        (ms.round() as u64).max(self.min_tick_ms)
    }
}

#[derive(Clone, Debug)]
pub struct GeneralConfig {
    /// `None` = seed from the clock.
    pub seed: Option<u64>,
    pub log_level: String,
    pub log_file: Option<PathBuf>,
}

#[derive(Clone, Debug)]
pub struct GamepadConfig {
    pub ability: Vec<String>,
    pub choice_1: Vec<String>,
    pub choice_2: Vec<String>,
    pub choice_3: Vec<String>,
    pub restart: Vec<String>,
    pub quit: Vec<String>,
}

// ── TOML Schema (with serde defaults) ──

#[derive(Deserialize, Debug, Default)]
struct TomlConfig {
    #[serde(default)]
    timing: TomlTiming,
    #[serde(default)]
    gamepad: TomlGamepad,
    #[serde(default)]
    general: TomlGeneral,
}

#[derive(Deserialize, Debug)]
struct TomlTiming {
    #[serde(default = "default_base_tick")]
    base_tick_ms: u64,
    #[serde(default = "default_level_speedup")]
    level_speedup: f64,
    #[serde(default = "default_speed_boost")]
    speed_boost: f64,
    #[serde(default = "default_min_tick")]
    min_tick_ms: u64,
    #[serde(default = "default_frame_ms")]
    frame_ms: u64,
}

#[derive(Deserialize, Debug)]
struct TomlGamepad {
    #[serde(default = "default_ability")]
    ability: Vec<String>,
    #[serde(default = "default_choice_1")]
    choice_1: Vec<String>,
    #[serde(default = "default_choice_2")]
    choice_2: Vec<String>,
    #[serde(default = "default_choice_3")]
    choice_3: Vec<String>,
    #[serde(default = "default_restart")]
    restart: Vec<String>,
    #[serde(default = "default_quit")]
    quit: Vec<String>,
}

#[derive(Deserialize, Debug)]
struct TomlGeneral {
    #[serde(default)]
    seed: u64,
    #[serde(default = "default_log_level")]
    log_level: String,
    #[serde(default)]
    log_file: String,
}

// ── Defaults ──

fn default_base_tick() -> u64 { 200 }
fn default_level_speedup() -> f64 { 0.9 }
fn default_speed_boost() -> f64 { 0.7 }   // caffeine: 30% faster
fn default_min_tick() -> u64 { 100 }
fn default_frame_ms() -> u64 { 16 }

fn default_ability() -> Vec<String> { vec!["A".into()] }
fn default_choice_1() -> Vec<String> { vec!["X".into()] }
fn default_choice_2() -> Vec<String> { vec!["Y".into()] }
fn default_choice_3() -> Vec<String> { vec!["B".into()] }
fn default_restart() -> Vec<String> { vec!["Start".into()] }
fn default_quit() -> Vec<String> { vec!["Select".into()] }
fn default_log_level() -> String { "warn".into() }

impl Default for TomlTiming {
    fn default() -> Self {
        TomlTiming {
            base_tick_ms: default_base_tick(),
            level_speedup: default_level_speedup(),
            speed_boost: default_speed_boost(),
            min_tick_ms: default_min_tick(),
            frame_ms: default_frame_ms(),
        }
    }
}

impl Default for TomlGamepad {
    fn default() -> Self {
        TomlGamepad {
            ability: default_ability(),
            choice_1: default_choice_1(),
            choice_2: default_choice_2(),
            choice_3: default_choice_3(),
            restart: default_restart(),
            quit: default_quit(),
        }
    }
}

impl Default for TomlGeneral {
    fn default() -> Self {
        TomlGeneral {
            seed: 0,
            log_level: default_log_level(),
            log_file: String::new(),
        }
    }
}

// ── Loading ──

impl GameConfig {
    /// Load config from `config.toml`.
    /// Search order: (1) exe directory, (2) current working directory.
    /// Missing file or missing keys fall back to defaults.
    pub fn load() -> Self {
        match read_config_text(&candidate_dirs()) {
            Some(text) => Self::parse(&text),
            None => Self::from_toml(TomlConfig::default()),
        }
    }

    /// Parse a config document. Errors degrade to defaults with a warning.
    pub fn parse(text: &str) -> Self {
        match toml::from_str::<TomlConfig>(text) {
            Ok(cfg) => Self::from_toml(cfg),
            Err(e) => {
                eprintln!("Warning: config.toml parse error: {e}");
                eprintln!("Using default settings.");
                Self::from_toml(TomlConfig::default())
            }
        }
    }

    fn from_toml(cfg: TomlConfig) -> Self {
        let mut timing = TimingConfig {
            base_tick_ms: cfg.timing.base_tick_ms,
            level_speedup: cfg.timing.level_speedup,
            speed_boost: cfg.timing.speed_boost,
            min_tick_ms: cfg.timing.min_tick_ms,
            frame_ms: cfg.timing.frame_ms,
        };
        if timing.frame_ms == 0 {
            eprintln!("Warning: timing.frame_ms must be positive, using {}", default_frame_ms());
            timing.frame_ms = default_frame_ms();
        }
        if timing.min_tick_ms == 0 {
            timing.min_tick_ms = 1;
        }

        GameConfig {
            timing,
            general: GeneralConfig {
                seed: (cfg.general.seed != 0).then_some(cfg.general.seed),
                log_level: cfg.general.log_level,
                log_file: (!cfg.general.log_file.is_empty()).then(|| PathBuf::from(cfg.general.log_file)),
            },
            gamepad: GamepadConfig {
                ability: cfg.gamepad.ability,
                choice_1: cfg.gamepad.choice_1,
                choice_2: cfg.gamepad.choice_2,
                choice_3: cfg.gamepad.choice_3,
                restart: cfg.gamepad.restart,
                quit: cfg.gamepad.quit,
            },
        }
    }
}

impl Default for GameConfig {
    fn default() -> Self {
        Self::from_toml(TomlConfig::default())
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

/// Search for config.toml in candidate directories.
fn read_config_text(search_dirs: &[PathBuf]) -> Option<String> {
    for dir in search_dirs {
        let path = dir.join("config.toml");
        if path.exists() {
            match std::fs::read_to_string(&path) {
                Ok(text) => return Some(text),
                Err(e) => {
                    eprintln!("Warning: could not read {}: {e}", path.display());
                }
            }
        }
    }
    None
}

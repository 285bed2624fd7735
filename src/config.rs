/// Game settings from `config.toml`.
///
/// The file is looked up next to the executable, then in the working
/// directory. Every key is optional.
/// Out-of-range values are clamped with a warning, never fatal.

use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

use crate::domain::ladder::{
    validate_rung_probability, DEFAULT_ROWS, DEFAULT_RUNG_PROBABILITY, MAX_COLUMNS, MIN_COLUMNS,
};

/// Upper bound for `max_participants`; wider ladders no longer fit a terminal.
const MAX_PARTICIPANTS_CAP: usize = 26;
/// Upper bound for `rows`.
const MAX_ROWS: usize = 60;

// ── Public Config Struct ──

#[derive(Clone, Debug, PartialEq)]
pub struct GameConfig {
    pub ladder: LadderConfig,
    pub speed: SpeedConfig,
    pub sound: SoundConfig,
    pub gamepad: GamepadConfig,
}

#[derive(Clone, Debug, PartialEq)]
pub struct LadderConfig {
    pub rows: usize,
    pub rung_probability: f64,
    pub max_participants: usize,
    pub seed: Option<u64>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct SpeedConfig {
    pub tick_rate_ms: u64,
    pub segment_ms: u64,       // one path segment's draw time
    pub result_delay_ms: u64,  // pause between arrival and result modal
}

#[derive(Clone, Debug, PartialEq)]
pub struct SoundConfig {
    pub bgm: bool,
    pub sfx: bool,
}

#[derive(Clone, Debug, PartialEq)]
pub struct GamepadConfig {
    pub confirm: Vec<String>,
    pub cancel: Vec<String>,
    pub reset: Vec<String>,
    pub bgm_toggle: Vec<String>,
}

impl SpeedConfig {
    /// Ticks spent drawing one segment (at least 1).
    pub fn segment_ticks(&self) -> u32 {
        ticks_for(self.segment_ms, self.tick_rate_ms).max(1)
    }

    pub fn result_delay_ticks(&self) -> u32 {
        ticks_for(self.result_delay_ms, self.tick_rate_ms)
    }
}

fn ticks_for(ms: u64, tick_rate_ms: u64) -> u32 {
    let rate = tick_rate_ms.max(1);
    ((ms + rate - 1) / rate).min(u32::MAX as u64) as u32
}

// ── TOML Schema (with serde defaults) ──

#[derive(Deserialize, Debug, Default)]
struct TomlConfig {
    #[serde(default)]
    ladder: TomlLadder,
    #[serde(default)]
    speed: TomlSpeed,
    #[serde(default)]
    sound: TomlSound,
    #[serde(default)]
    gamepad: TomlGamepad,
}

#[derive(Deserialize, Debug)]
struct TomlLadder {
    #[serde(default = "default_rows")]
    rows: usize,
    #[serde(default = "default_rung_probability")]
    rung_probability: f64,
    #[serde(default = "default_max_participants")]
    max_participants: usize,
    #[serde(default)]
    seed: Option<u64>,
}

#[derive(Deserialize, Debug)]
struct TomlSpeed {
    #[serde(default = "default_tick_rate")]
    tick_rate_ms: u64,
    #[serde(default = "default_segment_ms")]
    segment_ms: u64,
    #[serde(default = "default_result_delay")]
    result_delay_ms: u64,
}

#[derive(Deserialize, Debug)]
struct TomlSound {
    #[serde(default = "default_true")]
    bgm: bool,
    #[serde(default = "default_true")]
    sfx: bool,
}

#[derive(Deserialize, Debug)]
struct TomlGamepad {
    #[serde(default = "default_confirm")]
    confirm: Vec<String>,
    #[serde(default = "default_cancel")]
    cancel: Vec<String>,
    #[serde(default = "default_reset")]
    reset: Vec<String>,
    #[serde(default = "default_bgm_toggle")]
    bgm_toggle: Vec<String>,
}

// ── Defaults ──

fn default_rows() -> usize { DEFAULT_ROWS }
fn default_rung_probability() -> f64 { DEFAULT_RUNG_PROBABILITY }
fn default_max_participants() -> usize { MAX_COLUMNS }
fn default_tick_rate() -> u64 { 20 }
fn default_segment_ms() -> u64 { 100 }
fn default_result_delay() -> u64 { 500 }
fn default_true() -> bool { true }

fn default_confirm() -> Vec<String> { vec!["A".into(), "Start".into()] }
fn default_cancel() -> Vec<String> { vec!["B".into()] }
fn default_reset() -> Vec<String> { vec!["Select".into()] }
fn default_bgm_toggle() -> Vec<String> { vec!["Y".into()] }

impl Default for TomlLadder {
    fn default() -> Self {
        TomlLadder {
            rows: default_rows(),
            rung_probability: default_rung_probability(),
            max_participants: default_max_participants(),
            seed: None,
        }
    }
}

impl Default for TomlSpeed {
    fn default() -> Self {
        TomlSpeed {
            tick_rate_ms: default_tick_rate(),
            segment_ms: default_segment_ms(),
            result_delay_ms: default_result_delay(),
        }
    }
}

impl Default for TomlSound {
    fn default() -> Self {
        TomlSound { bgm: true, sfx: true }
    }
}

impl Default for TomlGamepad {
    fn default() -> Self {
        TomlGamepad {
            confirm: default_confirm(),
            cancel: default_cancel(),
            reset: default_reset(),
            bgm_toggle: default_bgm_toggle(),
        }
    }
}

impl Default for GameConfig {
    fn default() -> Self {
        GameConfig::from_toml(TomlConfig::default())
    }
}

// ── Loading ──

impl GameConfig {
    /// First readable `config.toml` wins; defaults otherwise.
    pub fn load() -> Self {
        GameConfig::from_toml(load_toml(&candidate_dirs()))
    }

    /// Parse a config document. Missing keys take defaults.
    pub fn from_toml_str(text: &str) -> Result<Self, toml::de::Error> {
        toml::from_str::<TomlConfig>(text).map(GameConfig::from_toml)
    }

    fn from_toml(cfg: TomlConfig) -> Self {
        let rows = if cfg.ladder.rows > MAX_ROWS {
            warn!(rows = cfg.ladder.rows, max = MAX_ROWS, "ladder.rows too large, clamping");
            MAX_ROWS
        } else {
            cfg.ladder.rows
        };

        let rung_probability = match validate_rung_probability(cfg.ladder.rung_probability) {
            Ok(p) => p,
            Err(e) => {
                warn!("{e}; using {DEFAULT_RUNG_PROBABILITY}");
                DEFAULT_RUNG_PROBABILITY
            }
        };

        let max_participants = cfg.ladder.max_participants.clamp(MIN_COLUMNS, MAX_PARTICIPANTS_CAP);
        if max_participants != cfg.ladder.max_participants {
            warn!(
                requested = cfg.ladder.max_participants,
                used = max_participants,
                "ladder.max_participants out of range"
            );
        }

        let tick_rate_ms = cfg.speed.tick_rate_ms.max(1);

        GameConfig {
            ladder: LadderConfig {
                rows,
                rung_probability,
                max_participants,
                seed: cfg.ladder.seed,
            },
            speed: SpeedConfig {
                tick_rate_ms,
                segment_ms: cfg.speed.segment_ms,
                result_delay_ms: cfg.speed.result_delay_ms,
            },
            sound: SoundConfig {
                bgm: cfg.sound.bgm,
                sfx: cfg.sound.sfx,
            },
            gamepad: GamepadConfig {
                confirm: cfg.gamepad.confirm,
                cancel: cfg.gamepad.cancel,
                reset: cfg.gamepad.reset,
                bgm_toggle: cfg.gamepad.bgm_toggle,
            },
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

/// Search for config.toml in candidate directories.
fn load_toml(search_dirs: &[PathBuf]) -> TomlConfig {
    for dir in search_dirs {
        let path = dir.join("config.toml");
        if path.exists() {
            return read_toml(&path);
        }
    }
    info!("no config.toml found, using defaults");
    TomlConfig::default()
}

fn read_toml(path: &Path) -> TomlConfig {
    match std::fs::read_to_string(path) {
        Ok(text) => match toml::from_str::<TomlConfig>(&text) {
            Ok(cfg) => {
                info!(path = %path.display(), "loaded config");
                cfg
            }
            Err(e) => {
                warn!(path = %path.display(), "config.toml parse error, using defaults: {e}");
                TomlConfig::default()
            }
        },
        Err(e) => {
            warn!(path = %path.display(), "could not read config: {e}");
            TomlConfig::default()
        }
    }
}

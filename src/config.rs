/// External configuration loader.
///
/// Reads `config.toml` from the executable's directory (or CWD).
/// Falls back to the built-in tuning if the file is missing or incomplete.

use serde::Deserialize;
use std::path::PathBuf;
use tracing::{info, warn};

// ── Public Config Struct ──

#[derive(Clone, Debug)]
pub struct GameConfig {
    pub physics: PhysicsConfig,
    pub timing: TimingConfig,
    pub camera: CameraConfig,
    pub levels_dir: PathBuf,
    pub assets_dir: PathBuf,
    pub start_hearts: i32,
}

#[derive(Clone, Debug)]
pub struct PhysicsConfig {
    pub gravity: f32,
    pub player_speed: f32,
    pub jump_strength: f32,
    pub animation_speed: u32,  // frame-timer threshold, in ticks
    pub fall_limit_y: f32,     // player top below this = fall damage
}

#[derive(Clone, Debug)]
pub struct TimingConfig {
    pub frame_ms: u64,
    pub spawn_invincibility_frames: u32,
    pub respawn_delay_ms: u64,
    pub player_attack_cooldown_ms: u64,
}

#[derive(Clone, Debug)]
pub struct CameraConfig {
    pub viewport_width: f32,
    pub viewport_height: f32,
    pub manual_offset_x: f32,
    pub manual_offset_y: f32,
}

impl Default for GameConfig {
    fn default() -> Self {
        GameConfig::from_toml(TomlConfig::default(), &[])
    }
}

// ── TOML Schema (with serde defaults) ──

#[derive(Deserialize, Debug, Default)]
struct TomlConfig {
    #[serde(default)]
    physics: TomlPhysics,
    #[serde(default)]
    timing: TomlTiming,
    #[serde(default)]
    camera: TomlCamera,
    #[serde(default)]
    general: TomlGeneral,
}

#[derive(Deserialize, Debug)]
struct TomlPhysics {
    #[serde(default = "default_gravity")]
    gravity: f32,
    #[serde(default = "default_player_speed")]
    player_speed: f32,
    #[serde(default = "default_jump_strength")]
    jump_strength: f32,
    #[serde(default = "default_animation_speed")]
    animation_speed: u32,
    #[serde(default = "default_fall_limit")]
    fall_limit_y: f32,
}

#[derive(Deserialize, Debug)]
struct TomlTiming {
    #[serde(default = "default_frame_ms")]
    frame_ms: u64,
    #[serde(default = "default_invincibility")]
    spawn_invincibility_frames: u32,
    #[serde(default = "default_respawn_delay")]
    respawn_delay_ms: u64,
    #[serde(default = "default_attack_cooldown")]
    player_attack_cooldown_ms: u64,
}

#[derive(Deserialize, Debug)]
struct TomlCamera {
    #[serde(default = "default_viewport_w")]
    viewport_width: f32,
    #[serde(default = "default_viewport_h")]
    viewport_height: f32,
    #[serde(default = "default_offset_x")]
    manual_offset_x: f32,
    #[serde(default = "default_offset_y")]
    manual_offset_y: f32,
}

#[derive(Deserialize, Debug)]
struct TomlGeneral {
    #[serde(default = "default_levels_dir")]
    levels_dir: String,
    #[serde(default = "default_assets_dir")]
    assets_dir: String,
    #[serde(default = "default_start_hearts")]
    start_hearts: i32,
}

// ── Defaults ──

fn default_gravity() -> f32 { 0.8 }
fn default_player_speed() -> f32 { 5.0 }
fn default_jump_strength() -> f32 { 18.0 }
fn default_animation_speed() -> u32 { 7 }
fn default_fall_limit() -> f32 { 768.0 }  // window height

fn default_frame_ms() -> u64 { 16 }       // ~60 FPS
fn default_invincibility() -> u32 { 10 }
fn default_respawn_delay() -> u64 { 500 }
fn default_attack_cooldown() -> u64 { 350 }

fn default_viewport_w() -> f32 { 512.0 }  // 1024x768 window at zoom 2
fn default_viewport_h() -> f32 { 384.0 }
fn default_offset_x() -> f32 { 180.0 }
fn default_offset_y() -> f32 { 390.0 }

fn default_levels_dir() -> String { "levels".into() }
fn default_assets_dir() -> String { "assets".into() }
fn default_start_hearts() -> i32 { 8 }

impl Default for TomlPhysics {
    fn default() -> Self {
        TomlPhysics {
            gravity: default_gravity(),
            player_speed: default_player_speed(),
            jump_strength: default_jump_strength(),
            animation_speed: default_animation_speed(),
            fall_limit_y: default_fall_limit(),
        }
    }
}

impl Default for TomlTiming {
    fn default() -> Self {
        TomlTiming {
            frame_ms: default_frame_ms(),
            spawn_invincibility_frames: default_invincibility(),
            respawn_delay_ms: default_respawn_delay(),
            player_attack_cooldown_ms: default_attack_cooldown(),
        }
    }
}

impl Default for TomlCamera {
    fn default() -> Self {
        TomlCamera {
            viewport_width: default_viewport_w(),
            viewport_height: default_viewport_h(),
            manual_offset_x: default_offset_x(),
            manual_offset_y: default_offset_y(),
        }
    }
}

impl Default for TomlGeneral {
    fn default() -> Self {
        TomlGeneral {
            levels_dir: default_levels_dir(),
            assets_dir: default_assets_dir(),
            start_hearts: default_start_hearts(),
        }
    }
}

// ── Loading ──

impl GameConfig {
    /// Load config from `config.toml`.
    /// Search order: exe directory, current working directory, XDG data, system data.
    /// Missing file or missing keys fall back to defaults.
    pub fn load() -> Self {
        let search_dirs = candidate_dirs();
        let toml_cfg = load_toml(&search_dirs);
        GameConfig::from_toml(toml_cfg, &search_dirs)
    }

    /// Parse a config document directly. Unknown or missing keys use defaults.
    pub fn parse(text: &str) -> Result<Self, toml::de::Error> {
        let cfg = toml::from_str::<TomlConfig>(text)?;
        Ok(GameConfig::from_toml(cfg, &[]))
    }

    fn from_toml(cfg: TomlConfig, search_dirs: &[PathBuf]) -> Self {
        GameConfig {
            physics: PhysicsConfig {
                gravity: cfg.physics.gravity,
                player_speed: cfg.physics.player_speed,
                jump_strength: cfg.physics.jump_strength,
                animation_speed: cfg.physics.animation_speed,
                fall_limit_y: cfg.physics.fall_limit_y,
            },
            timing: TimingConfig {
                frame_ms: cfg.timing.frame_ms.max(1),
                spawn_invincibility_frames: cfg.timing.spawn_invincibility_frames,
                respawn_delay_ms: cfg.timing.respawn_delay_ms,
                player_attack_cooldown_ms: cfg.timing.player_attack_cooldown_ms,
            },
            camera: CameraConfig {
                viewport_width: cfg.camera.viewport_width,
                viewport_height: cfg.camera.viewport_height,
                manual_offset_x: cfg.camera.manual_offset_x,
                manual_offset_y: cfg.camera.manual_offset_y,
            },
            levels_dir: resolve_dir(&cfg.general.levels_dir, search_dirs),
            assets_dir: resolve_dir(&cfg.general.assets_dir, search_dirs),
            start_hearts: cfg.general.start_hearts.max(1),
        }
    }
}

/// Absolute paths are used as-is; relative ones are looked up in the
/// candidate dirs, defaulting to CWD-relative.
fn resolve_dir(dir: &str, search_dirs: &[PathBuf]) -> PathBuf {
    let path = PathBuf::from(dir);
    if path.is_absolute() { return path; }
    search_dirs.iter()
        .map(|d| d.join(dir))
        .find(|p| p.is_dir())
        .unwrap_or(path)
}

/// Candidate directories to search: exe dir + CWD + data paths (deduplicated).
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

    if let Ok(home) = std::env::var("HOME") {
        let xdg = PathBuf::from(&home).join(".local/share/dualdimension");
        if xdg.is_dir() && !dirs.iter().any(|d| d == &xdg) {
            dirs.push(xdg);
        }
    }

    let sys = PathBuf::from("/usr/share/dualdimension");
    if sys.is_dir() && !dirs.iter().any(|d| d == &sys) {
        dirs.push(sys);
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
        if !path.exists() { continue; }
        match std::fs::read_to_string(&path) {
            Ok(text) => match toml::from_str::<TomlConfig>(&text) {
                Ok(cfg) => {
                    info!(path = %path.display(), "loaded config");
                    return cfg;
                }
                Err(e) => {
                    warn!("config.toml parse error: {e}; using default settings");
                    return TomlConfig::default();
                }
            },
            Err(e) => {
                warn!("could not read {}: {e}", path.display());
            }
        }
    }
    TomlConfig::default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_tuning() {
        let cfg = GameConfig::default();
        assert_eq!(cfg.physics.gravity, 0.8);
        assert_eq!(cfg.physics.jump_strength, 18.0);
        assert_eq!(cfg.physics.animation_speed, 7);
        assert_eq!(cfg.timing.spawn_invincibility_frames, 10);
        assert_eq!(cfg.camera.viewport_width, 512.0);
        assert_eq!(cfg.start_hearts, 8);
    }

    #[test]
    fn partial_file_keeps_other_defaults() {
        let cfg = GameConfig::parse("[physics]\ngravity = 1.2\n\n[general]\nstart_hearts = 3\n")
            .unwrap();
        assert_eq!(cfg.physics.gravity, 1.2);
        assert_eq!(cfg.physics.player_speed, 5.0);
        assert_eq!(cfg.start_hearts, 3);
        assert_eq!(cfg.timing.respawn_delay_ms, 500);
    }

    #[test]
    fn malformed_file_is_an_error() {
        assert!(GameConfig::parse("[physics\ngravity = ").is_err());
    }
}

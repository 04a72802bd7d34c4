/// Frame provider: per sprite kind, the frame strips each animation
/// state plays.
///
/// Each kind has a folder under the assets directory with a `frames.toml`
/// manifest:
///
/// ```toml
/// [idle]
/// count = 10
/// width = 48
/// height = 48
/// ```
///
/// A kind whose manifest is missing or broken gets a deterministic
/// placeholder set instead, so loading never stops the game.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use thiserror::Error;
use tracing::{debug, warn};

use crate::domain::animation::{AnimState, Frame, FrameSet};
use crate::domain::entity::SpriteKind;

const MANIFEST: &str = "frames.toml";

#[derive(Debug, Error)]
pub enum AssetError {
    #[error("no frame manifest at {path}")]
    NotFound { path: PathBuf },
    #[error("could not read {path}: {source}")]
    Io { path: PathBuf, #[source] source: std::io::Error },
    #[error("bad frame manifest {path}: {reason}")]
    Manifest { path: PathBuf, reason: String },
}

#[derive(Deserialize, Debug)]
struct StripManifest {
    count: usize,
    #[serde(default = "default_frame_size")]
    width: f32,
    #[serde(default = "default_frame_size")]
    height: f32,
}

fn default_frame_size() -> f32 { 32.0 }

/// Parse one kind's manifest text. Frame ids start at `first_id`.
pub fn parse_manifest(text: &str, path: &Path, first_id: u32) -> Result<FrameSet, AssetError> {
    let strips: HashMap<String, StripManifest> = toml::from_str(text)
        .map_err(|e| AssetError::Manifest { path: path.to_path_buf(), reason: e.to_string() })?;

    // Sorted so frame ids do not depend on hash order.
    let mut names: Vec<&String> = strips.keys().collect();
    names.sort();

    let mut set = FrameSet::new();
    let mut id = first_id;
    for name in names {
        let state = AnimState::from_name(name).ok_or_else(|| AssetError::Manifest {
            path: path.to_path_buf(),
            reason: format!("unknown animation state `{name}`"),
        })?;
        let strip = &strips[name];
        let frames = (0..strip.count).map(|_| {
            id += 1;
            Frame { id, width: strip.width, height: strip.height }
        }).collect();
        set.insert(state, frames);
    }
    Ok(set)
}

pub fn load_frame_set(assets_dir: &Path, kind: SpriteKind, first_id: u32) -> Result<FrameSet, AssetError> {
    let path = assets_dir.join(kind.folder()).join(MANIFEST);
    if !path.is_file() {
        return Err(AssetError::NotFound { path });
    }
    let text = std::fs::read_to_string(&path)
        .map_err(|source| AssetError::Io { path: path.clone(), source })?;
    parse_manifest(&text, &path, first_id)
}

/// Stand-in frames for a kind with no usable assets.
pub fn placeholder_frames(kind: SpriteKind, first_id: u32) -> FrameSet {
    use AnimState::*;
    let (w, h) = match kind {
        SpriteKind::Player => (48.0, 48.0),
        SpriteKind::Patrol => (30.0, 30.0),
        SpriteKind::Chaser | SpriteKind::HeavyChaser => (50.0, 50.0),
        SpriteKind::Boss => (140.0, 93.0),
        SpriteKind::BossSpell => (80.0, 100.0),
        SpriteKind::Spike | SpriteKind::Campfire => (40.0, 40.0),
        SpriteKind::Npc => (48.0, 64.0),
    };
    let strips: &[(AnimState, usize)] = match kind {
        SpriteKind::Player => &[(Idle, 10), (Run, 10), (Jump, 3), (Fall, 3), (Death, 5)],
        SpriteKind::Patrol => &[(Run, 6), (Idle, 4), (Death, 4)],
        SpriteKind::Chaser | SpriteKind::HeavyChaser =>
            &[(Idle, 4), (Run, 8), (Attack, 8), (CombatIdle, 4), (Hurt, 2), (Death, 6)],
        SpriteKind::Boss =>
            &[(Idle, 6), (Walk, 8), (Attack, 10), (Cast, 9), (Hurt, 3), (Death, 10)],
        SpriteKind::BossSpell => &[(Idle, 16)],
        SpriteKind::Spike => &[(Idle, 4)],
        SpriteKind::Campfire => &[(Idle, 6)],
        SpriteKind::Npc => &[(Idle, 4), (Walk, 4)],
    };

    let mut set = FrameSet::new();
    let mut id = first_id;
    for &(state, count) in strips {
        let frames = (0..count).map(|_| {
            id += 1;
            Frame { id, width: w, height: h }
        }).collect();
        set.insert(state, frames);
    }
    set
}

/// Frame sets for every sprite kind.
#[derive(Clone, Debug, Default)]
pub struct FrameLibrary {
    sets: HashMap<SpriteKind, FrameSet>,
    empty: FrameSet,
}

/// Id block reserved per kind, so ids stay unique across the library.
const IDS_PER_KIND: u32 = 1000;

impl FrameLibrary {
    pub fn load(assets_dir: &Path) -> Self {
        let mut lib = FrameLibrary::default();
        for (i, kind) in SpriteKind::ALL.into_iter().enumerate() {
            let first_id = i as u32 * IDS_PER_KIND;
            let set = match load_frame_set(assets_dir, kind, first_id) {
                Ok(set) => {
                    debug!(kind = kind.folder(), "loaded frames");
                    set
                }
                Err(e) => {
                    warn!(kind = kind.folder(), "{e}; using placeholder frames");
                    placeholder_frames(kind, first_id)
                }
            };
            lib.sets.insert(kind, set);
        }
        lib
    }

    /// Placeholder frames for every kind; no filesystem access.
    pub fn placeholder() -> Self {
        let sets = SpriteKind::ALL.into_iter().enumerate()
            .map(|(i, kind)| (kind, placeholder_frames(kind, i as u32 * IDS_PER_KIND)))
            .collect();
        FrameLibrary { sets, empty: FrameSet::new() }
    }

    pub fn get(&self, kind: SpriteKind) -> &FrameSet {
        self.sets.get(&kind).unwrap_or(&self.empty)
    }
}

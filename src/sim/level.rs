/// Level loader.
///
/// A level is a pair of text maps, one per dimension:
///   `level_N_normal.txt` and `level_N_gema.txt`, N = 1, 2, ...
/// Every character is one 40 px tile. Terrain, traps, end markers,
/// campfires and NPCs belong to the dimension of the file they come from.
/// Enemies from either file roam both dimensions.
///
/// ## Tile legend:
///   'G' 'g' = Ground (40x40)          'P' 'p' = Platform (40x20)
///   'H' 'h' = Patrol                  'F' 'f' = Chaser
///   'N' 'n' = Heavy chaser            'B' 'b' = Boss
///             (uppercase faces right, lowercase faces left)
///   'T' 't' = Trap trigger            'j' 'J' 'y' 'Y' = Spike zone
///             (the k-th trigger arms the k-th spike zone)
///   'S' 's' = Player start            'C' 'c' = Campfire
///   'D'     = End (walk with a jump)  'd'     = End (walk)
///   'l' 'L' = Patrol left marker      'r' 'R' = Patrol right marker
///   'A' 'Q' 'W' (and lowercase) = NPCs (uppercase faces left)
///   'K'     = Camera right limit
///
/// If no level files exist, a built-in demo level is used instead.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::{debug, info};

use crate::domain::enemy::EnemySpawn;
use crate::domain::entity::{Dimension, Facing};
use crate::domain::geom::Rect;
use crate::domain::npc::{Npc, NpcVariant};
use crate::domain::trap::{Campfire, TriggerTrap};

pub const TILE: f32 = 40.0;
const PLATFORM_H: f32 = 20.0;
const DEFAULT_START: (f32, f32) = (100.0, 100.0);
const DEFAULT_PATROL_HALF_RANGE: f32 = 80.0;
const NPC_SNAP_RANGE: f32 = 200.0;

#[derive(Debug, Error)]
pub enum LevelError {
    #[error("level file not found: {path}")]
    NotFound { path: PathBuf },
    #[error("could not read level file {path}: {source}")]
    Io { path: PathBuf, #[source] source: std::io::Error },
    #[error("no levels in {dir}")]
    NoLevels { dir: PathBuf },
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum EndMode {
    Walk,
    JumpWalk,
}

#[derive(Clone, Copy, PartialEq, Debug)]
pub struct Platform {
    pub rect: Rect,
    pub dimension: Dimension,
}

#[derive(Clone, Copy, PartialEq, Debug)]
pub struct EndTrigger {
    pub rect: Rect,
    pub dimension: Dimension,
    pub mode: EndMode,
}

// ══════════════════════════════════════════════════════════════
// Single map file
// ══════════════════════════════════════════════════════════════

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
enum SpawnKind {
    Patrol,
    Chaser,
    HeavyChaser,
    Boss,
}

#[derive(Clone, Copy, Debug)]
struct RawSpawn {
    kind: SpawnKind,
    tile: Rect,
    row: usize,
    facing: Facing,
}

/// Everything one map file declares, before the two files are merged.
#[derive(Clone, Debug, Default)]
struct MapData {
    platforms: Vec<Rect>,
    triggers: Vec<Rect>,
    trap_zones: Vec<Rect>,
    spawns: Vec<RawSpawn>,
    npcs: Vec<(char, Rect, Facing)>,
    campfires: Vec<Rect>,
    end_triggers: Vec<(Rect, EndMode)>,
    start: Option<(f32, f32)>,
    left_markers: HashMap<usize, Vec<f32>>,
    right_markers: HashMap<usize, Vec<f32>>,
    camera_right_limit: Option<f32>,
    max_x: f32,
}

fn facing_of(c: char, upper_is_right: bool) -> Facing {
    if c.is_ascii_uppercase() == upper_is_right { Facing::Right } else { Facing::Left }
}

fn parse_map(text: &str) -> MapData {
    let mut map = MapData::default();

    for (row, line) in text.lines().enumerate() {
        for (col, ch) in line.chars().enumerate() {
            let x = col as f32 * TILE;
            let y = row as f32 * TILE;
            let tile = Rect::new(x, y, TILE, TILE);
            map.max_x = map.max_x.max(x);

            let spawn = |kind| RawSpawn { kind, tile, row, facing: facing_of(ch, true) };
            match ch {
                'G' | 'g' => map.platforms.push(tile),
                'P' | 'p' => map.platforms.push(Rect::new(x, y, TILE, PLATFORM_H)),
                'H' | 'h' => map.spawns.push(spawn(SpawnKind::Patrol)),
                'N' | 'n' => map.spawns.push(spawn(SpawnKind::HeavyChaser)),
                'F' | 'f' => map.spawns.push(spawn(SpawnKind::Chaser)),
                'B' | 'b' => map.spawns.push(spawn(SpawnKind::Boss)),
                'T' | 't' => map.triggers.push(tile),
                'j' | 'J' | 'y' | 'Y' => map.trap_zones.push(tile),
                'S' | 's' => map.start = Some((x, y + TILE)),
                'D' => map.end_triggers.push((tile, EndMode::JumpWalk)),
                'd' => map.end_triggers.push((tile, EndMode::Walk)),
                'C' | 'c' => map.campfires.push(tile),
                'l' | 'L' => map.left_markers.entry(row).or_default().push(x + TILE / 2.0),
                'r' | 'R' => map.right_markers.entry(row).or_default().push(x + TILE / 2.0),
                'A' | 'a' | 'Q' | 'q' | 'W' | 'w' => map.npcs.push((ch, tile, facing_of(ch, false))),
                'K' => map.camera_right_limit = Some(x + TILE / 2.0),
                _ => {}
            }
        }
    }
    map
}

impl MapData {
    /// Nearest left marker at or before `sx` and nearest right marker at or
    /// after it, on the spawn's row; `sx ∓ 80` when a side has none.
    fn patrol_bounds(&self, row: usize, sx: f32) -> (f32, f32) {
        let left = self.left_markers.get(&row)
            .and_then(|xs| xs.iter().copied().filter(|&lx| lx <= sx).reduce(f32::max))
            .unwrap_or(sx - DEFAULT_PATROL_HALF_RANGE);
        let right = self.right_markers.get(&row)
            .and_then(|xs| xs.iter().copied().filter(|&rx| rx >= sx).reduce(f32::min))
            .unwrap_or(sx + DEFAULT_PATROL_HALF_RANGE);
        (left, right)
    }

    fn enemy_spawns(&self) -> impl Iterator<Item = EnemySpawn> + '_ {
        self.spawns.iter().map(move |s| {
            let (x, bottom, facing) = (s.tile.x, s.tile.bottom(), s.facing);
            match s.kind {
                SpawnKind::Patrol => EnemySpawn::Patrol {
                    x, bottom, facing,
                    bounds: Some(self.patrol_bounds(s.row, s.tile.centerx())),
                },
                SpawnKind::Chaser => EnemySpawn::Chaser { x, bottom, facing, heavy: false },
                SpawnKind::HeavyChaser => EnemySpawn::Chaser { x, bottom, facing, heavy: true },
                SpawnKind::Boss => EnemySpawn::Boss { x, bottom, facing },
            }
        })
    }
}

// ══════════════════════════════════════════════════════════════
// Merged level
// ══════════════════════════════════════════════════════════════

/// Both dimension files of one level, ready to populate a world.
#[derive(Clone, Debug)]
pub struct LevelLayout {
    pub platforms: Vec<Platform>,
    pub traps: Vec<TriggerTrap>,
    pub end_triggers: Vec<EndTrigger>,
    pub enemy_spawns: Vec<EnemySpawn>,
    pub npcs: Vec<Npc>,
    pub campfires: Vec<Campfire>,
    /// Player bottom-left.
    pub start: (f32, f32),
    pub camera_right_limit: Option<f32>,
    pub width: f32,
}

impl LevelLayout {
    pub fn parse(normal_text: &str, gema_text: &str) -> Self {
        let maps = [(parse_map(normal_text), Dimension::Normal), (parse_map(gema_text), Dimension::Gema)];

        let mut layout = LevelLayout {
            platforms: vec![],
            traps: vec![],
            end_triggers: vec![],
            enemy_spawns: vec![],
            npcs: vec![],
            campfires: vec![],
            start: maps[0].0.start.unwrap_or(DEFAULT_START),
            camera_right_limit: maps[0].0.camera_right_limit.or(maps[1].0.camera_right_limit),
            width: maps[0].0.max_x.max(maps[1].0.max_x) + TILE,
        };

        for (map, dim) in &maps {
            let dimension = *dim;
            layout.platforms.extend(map.platforms.iter().map(|&rect| Platform { rect, dimension }));
            layout.traps.extend(map.triggers.iter().zip(&map.trap_zones)
                .map(|(&trigger, &zone)| TriggerTrap::new(trigger, zone, dimension)));
            layout.end_triggers.extend(map.end_triggers.iter()
                .map(|&(rect, mode)| EndTrigger { rect, dimension, mode }));
            layout.enemy_spawns.extend(map.enemy_spawns());
            layout.campfires.extend(map.campfires.iter().map(|&rect| Campfire::new(rect, dimension)));
        }

        // NPCs snap to ground, so all platforms must be in first.
        for (map, dim) in &maps {
            for &(ch, tile, facing) in &map.npcs {
                let Some(variant) = NpcVariant::from_glyph(ch, *dim) else { continue };
                let mut npc = Npc::new(tile.x, tile.top(), variant, *dim, facing);
                snap_to_ground(&layout.platforms, &mut npc.rect, *dim, NPC_SNAP_RANGE);
                layout.npcs.push(npc);
            }
        }

        layout
    }
}

/// The platform under `x` (topmost), else the nearest one within `max_dx`
/// by centre distance.
pub fn ground_at_or_near(platforms: &[Platform], x: f32, dim: Dimension, max_dx: f32) -> Option<Rect> {
    let candidates = || platforms.iter().filter(|p| p.dimension.matches(dim)).map(|p| p.rect);

    let under = candidates()
        .filter(|r| r.left() <= x && x <= r.right())
        .min_by(|a, b| a.top().total_cmp(&b.top()));
    if under.is_some() { return under; }

    candidates()
        .map(|r| ((x - r.centerx()).abs(), r))
        .filter(|(dx, _)| *dx <= max_dx)
        .min_by(|(da, a), (db, b)| da.total_cmp(db).then(a.top().total_cmp(&b.top())))
        .map(|(_, r)| r)
}

/// Stand `rect` on the nearest ground, kept within the ground's width where
/// it fits. Returns false when there is no ground in range.
pub fn snap_to_ground(platforms: &[Platform], rect: &mut Rect, dim: Dimension, max_dx: f32) -> bool {
    let Some(ground) = ground_at_or_near(platforms, rect.centerx(), dim, max_dx) else { return false };
    rect.set_bottom(ground.top());
    let half = rect.w / 2.0;
    rect.set_centerx(rect.centerx().min(ground.right() - half).max(ground.left() + half));
    true
}

// ══════════════════════════════════════════════════════════════
// Level sources
// ══════════════════════════════════════════════════════════════

#[derive(Clone, Debug)]
enum Source {
    Files(Vec<(PathBuf, PathBuf)>),
    Memory(Vec<(String, String)>),
}

/// The ordered list of levels to play.
#[derive(Clone, Debug)]
pub struct LevelSet {
    source: Source,
}

impl LevelSet {
    /// Collect `level_N_normal.txt` files in `dir` (sorted by N). Each
    /// level's gema file is only checked when the level loads.
    pub fn scan(dir: &Path) -> Result<Self, LevelError> {
        let entries = std::fs::read_dir(dir)
            .map_err(|_| LevelError::NoLevels { dir: dir.to_path_buf() })?;

        let mut numbered: Vec<(u32, PathBuf, PathBuf)> = entries.flatten()
            .filter_map(|entry| {
                let name = entry.file_name().to_string_lossy().to_string();
                let n = name.strip_prefix("level_")?.strip_suffix("_normal.txt")?.parse().ok()?;
                Some((n, entry.path(), dir.join(format!("level_{n}_gema.txt"))))
            })
            .collect();
        if numbered.is_empty() {
            return Err(LevelError::NoLevels { dir: dir.to_path_buf() });
        }
        numbered.sort_by_key(|(n, _, _)| *n);
        info!(dir = %dir.display(), count = numbered.len(), "found levels");
        Ok(LevelSet { source: Source::Files(numbered.into_iter().map(|(_, a, b)| (a, b)).collect()) })
    }

    /// The built-in demo levels.
    pub fn embedded() -> Self {
        LevelSet::in_memory(EMBEDDED.iter().map(|(n, g)| (n.join("\n"), g.join("\n"))).collect())
    }

    /// Levels given as (normal, gema) map text.
    pub fn in_memory(maps: Vec<(String, String)>) -> Self {
        LevelSet { source: Source::Memory(maps) }
    }

    pub fn len(&self) -> usize {
        match &self.source {
            Source::Files(files) => files.len(),
            Source::Memory(maps) => maps.len(),
        }
    }

    /// Parse level `index` (0-based).
    pub fn load(&self, index: usize) -> Result<LevelLayout, LevelError> {
        match &self.source {
            Source::Files(files) => {
                let (normal, gema) = files.get(index)
                    .ok_or_else(|| LevelError::NotFound { path: PathBuf::from(format!("level_{}", index + 1)) })?;
                let normal_text = read_map(normal)?;
                let gema_text = read_map(gema)?;
                debug!(level = index + 1, "parsed level files");
                Ok(LevelLayout::parse(&normal_text, &gema_text))
            }
            Source::Memory(maps) => {
                let (normal, gema) = maps.get(index)
                    .ok_or_else(|| LevelError::NotFound { path: PathBuf::from(format!("<level {}>", index + 1)) })?;
                Ok(LevelLayout::parse(normal, gema))
            }
        }
    }
}

fn read_map(path: &Path) -> Result<String, LevelError> {
    std::fs::read_to_string(path).map_err(|source| match source.kind() {
        std::io::ErrorKind::NotFound => LevelError::NotFound { path: path.to_path_buf() },
        _ => LevelError::Io { path: path.to_path_buf(), source },
    })
}

// ══════════════════════════════════════════════════════════════
// Embedded fallback level
// ══════════════════════════════════════════════════════════════

type MapRows = &'static [&'static str];

const EMBEDDED: &[(MapRows, MapRows)] = &[(
    &[
        "                                                  ",
        "                                                  ",
        "                                                  ",
        "                                                  ",
        "                                                  ",
        "                                                  ",
        "                                                  ",
        "                                 PPP              ",
        "                                          B       ",
        "  S    A       T   F        l  H   r      D       ",
        "GGGGGGGGGGGGGGGGGGGGJGGGG  GGGGGGGGGGGGGGGGGGGGGGG",
    ],
    &[
        "                                                  ",
        "                                                  ",
        "                                                  ",
        "                                                  ",
        "                                                  ",
        "                                                  ",
        "                                                  ",
        "                                                  ",
        "                                                  ",
        "        Q      C                                  ",
        "GGGGGGGGGGGGGGGGGGGGGGGGGGGGGGGGGGGGGGGGGGGGGGGGGG",
    ],
)];

/// Level loader.
///
/// ## Sources (priority order):
///   1. File named by `general.level` in config
///   2. Built-in embedded demo level
///
/// ## Format (`.txt`):
///   ```text
///   # Level Name
///   @gate 4,2 key=gold consume
///   @lever 1,1 -> 5,3 5,4
///   @keys gold=1
///   <map rows>
///   ```
///
/// Line 1 may be `# Level Name`. It only counts as the name if it holds a
/// character outside the tile legend; `# ._` and the like stay map rows.
/// Lines starting with `@` are metadata,
/// lines starting with `;` are comments, everything else is a map row.
/// Rows are listed top first: row r of h maps to world y = h-1-r, so
/// metadata coordinates are world coordinates (+y up).
///
/// ## Metadata:
///   `@gate x,y [key=ID] [consume]`  gate key / consumption
///   `@lever x,y -> x,y ...`          cells a lever toggles
///   `@keys ID=N ...`                 starting inventory
///   `@reset x,y`                     ground tile resets the entering entity
///   `@walkable x,y`                  void tile that can be walked on
///   `@off x,y`                       emitter mirror starts switched off
///
/// ## Tile legend:
///   '.' = Floor        '_' = Void          'S' = Start (player spawn)
///   '#' = Wall         'G' = Gate          ' ' = unpainted
///   'x' = Enemy        'L' = Lever
///   'e' 'q' 'c' 'z' = relay mirror facing ↗ ↖ ↘ ↙
///   'E' 'Q' 'C' 'Z' = emitter mirror facing ↗ ↖ ↘ ↙
///
/// Objects (enemy, lever, mirrors) stand on Floor.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::info;

use crate::domain::geometry::{Cell, Diagonal};
use crate::domain::obstacle::{Lever, Mirror, Obstacle};
use crate::domain::tile::{EnterEffect, TileKind, TileMeta};

#[derive(Debug, Error)]
pub enum LevelError {
    #[error("could not read level {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("line {line}: {message}")]
    Parse { line: usize, message: String },
    #[error("level has no ground tiles")]
    NoGround,
}

/// Parsed level, kept by the session for restarts.
#[derive(Clone, Debug, Default)]
pub struct LevelDef {
    pub name: String,
    pub ground: HashMap<Cell, TileMeta>,
    pub blocking: HashMap<Cell, Option<TileMeta>>,
    pub obstacles: Vec<Obstacle>,
    pub enemies: Vec<Cell>,
    pub keys: Vec<(String, u32)>,
}

const DEMO_LEVEL: &str = "\
# Hall of Mirrors
@gate 10,4 key=brass consume
@lever 3,7 -> 4,2 5,2 6,2
@keys brass=1
@reset 12,7
##############
#C.........q.#
#..L......._.#
#....x.......#
#.S......___.#
#........_G__#
#..e...Z..c..#
#...___......#
#............#
##############
";

// ══════════════════════════════════════════════════════════════
// Public API
// ══════════════════════════════════════════════════════════════

/// Load the configured level file, or the built-in demo.
pub fn load_level(path: Option<&Path>) -> Result<LevelDef, LevelError> {
    match path {
        Some(p) => {
            let text = std::fs::read_to_string(p)
                .map_err(|source| LevelError::Io { path: p.to_path_buf(), source })?;
            let def = parse_level(&text)?;
            info!(name = %def.name, path = %p.display(), "level loaded");
            Ok(def)
        }
        None => builtin_level(),
    }
}

pub fn builtin_level() -> Result<LevelDef, LevelError> {
    parse_level(DEMO_LEVEL)
}

/// Parse level text. See module docs for the format.
pub fn parse_level(text: &str) -> Result<LevelDef, LevelError> {
    let mut def = LevelDef::default();
    let mut rows: Vec<(usize, &str)> = Vec::new();
    let mut meta: Vec<(usize, &str)> = Vec::new();

    for (i, line) in text.lines().enumerate() {
        let line_no = i + 1;
        if i == 0 && is_name_line(line) {
            def.name = line[2..].trim().to_string();
            continue;
        }
        if line.starts_with('@') {
            meta.push((line_no, line));
        } else if !line.starts_with(';') {
            rows.push((line_no, line));
        }
    }
    while rows.last().is_some_and(|(_, r)| r.trim().is_empty()) {
        rows.pop();
    }

    let height = rows.len() as i32;
    for (r, &(line, row)) in rows.iter().enumerate() {
        let y = height - 1 - r as i32;
        for (x, ch) in row.chars().enumerate() {
            place_char(&mut def, Cell::new(x as i32, y), ch)
                .map_err(|message| LevelError::Parse { line, message })?;
        }
    }
    if def.ground.is_empty() {
        return Err(LevelError::NoGround);
    }

    for (line, text) in meta {
        apply_meta(&mut def, text).map_err(|message| LevelError::Parse { line, message })?;
    }
    if def.name.is_empty() {
        def.name = "Untitled".to_string();
    }
    Ok(def)
}

// ══════════════════════════════════════════════════════════════
// Map rows
// ══════════════════════════════════════════════════════════════

fn is_name_line(line: &str) -> bool {
    line.starts_with("# ") && !line.chars().all(is_tile_char)
}

fn is_tile_char(ch: char) -> bool {
    matches!(ch, ' ' | '.' | '_' | 'S' | '#' | 'G' | 'x' | 'L') || mirror_char(ch).is_some()
}

fn place_char(def: &mut LevelDef, c: Cell, ch: char) -> Result<(), String> {
    match ch {
        ' ' => {}
        '.' => floor(def, c),
        '_' => put_tile(def, c, TileMeta::void()),
        'S' => put_tile(def, c, TileMeta::of(TileKind::Start)),
        '#' => put_tile(def, c, TileMeta::of(TileKind::Wall)),
        'G' => put_tile(def, c, TileMeta::gate("", false)),
        'x' => {
            floor(def, c);
            def.enemies.push(c);
        }
        'L' => {
            floor(def, c);
            def.obstacles.push(Obstacle::Lever(Lever::new(c, vec![])));
        }
        _ => {
            let (facing, emitter) = mirror_char(ch).ok_or_else(|| format!("unknown tile '{ch}'"))?;
            floor(def, c);
            let mirror = if emitter { Mirror::emitter(c, facing) } else { Mirror::new(c, facing) };
            def.obstacles.push(Obstacle::Mirror(mirror));
        }
    }
    Ok(())
}

fn floor(def: &mut LevelDef, c: Cell) {
    put_tile(def, c, TileMeta::floor());
}

/// Blocking tiles sit on floor so the cell stays in bounds once opened.
fn put_tile(def: &mut LevelDef, c: Cell, meta: TileMeta) {
    if meta.kind.is_blocking() {
        def.ground.insert(c, TileMeta::floor());
        def.blocking.insert(c, Some(meta));
    } else if meta.kind.is_ground() {
        def.ground.insert(c, meta);
    }
}

fn mirror_char(ch: char) -> Option<(Diagonal, bool)> {
    let facing = match ch.to_ascii_lowercase() {
        'e' => Diagonal::UpRight,
        'q' => Diagonal::UpLeft,
        'c' => Diagonal::DownRight,
        'z' => Diagonal::DownLeft,
        _ => return None,
    };
    Some((facing, ch.is_ascii_uppercase()))
}

// ══════════════════════════════════════════════════════════════
// Metadata lines
// ══════════════════════════════════════════════════════════════

fn apply_meta(def: &mut LevelDef, line: &str) -> Result<(), String> {
    let mut words = line[1..].split_whitespace();
    let tag = words.next().unwrap_or_default();
    let rest: Vec<&str> = words.collect();

    match tag {
        "gate" => {
            let cell = parse_cell(rest.first().copied())?;
            let gate = match def.blocking.get_mut(&cell) {
                Some(Some(m)) if m.kind == TileKind::Gate => m,
                _ => return Err(format!("@gate: no gate at {},{}", cell.x, cell.y)),
            };
            for word in &rest[1..] {
                if let Some(key) = word.strip_prefix("key=") {
                    gate.gate_key_id = key.to_string();
                } else if *word == "consume" {
                    gate.consumes_key = true;
                } else {
                    return Err(format!("@gate: unexpected '{word}'"));
                }
            }
        }
        "lever" => {
            let cell = parse_cell(rest.first().copied())?;
            let targets_at = match rest.get(1) {
                Some(&"->") => 2,
                None => rest.len(),
                Some(other) => return Err(format!("@lever: expected '->', found '{other}'")),
            };
            let targets = rest[targets_at..]
                .iter()
                .map(|w| parse_cell(Some(w)))
                .collect::<Result<Vec<_>, _>>()?;
            let lever = def.obstacles.iter_mut().find_map(|o| match o {
                Obstacle::Lever(l) if l.cell == cell => Some(l),
                _ => None,
            });
            match lever {
                Some(l) => l.targets = targets,
                None => return Err(format!("@lever: no lever at {},{}", cell.x, cell.y)),
            }
        }
        "keys" => {
            for word in &rest {
                let (id, n) = word
                    .split_once('=')
                    .ok_or_else(|| format!("@keys: expected ID=N, found '{word}'"))?;
                let n: u32 = n.parse().map_err(|_| format!("@keys: bad count '{n}'"))?;
                def.keys.push((id.to_string(), n));
            }
        }
        "reset" | "walkable" => {
            let cell = parse_cell(rest.first().copied())?;
            let meta = def
                .ground
                .get_mut(&cell)
                .ok_or_else(|| format!("@{tag}: no ground at {},{}", cell.x, cell.y))?;
            if tag == "reset" {
                meta.enter_effect = EnterEffect::ResetToStart;
            } else {
                meta.walkable_by_default = true;
            }
        }
        "off" => {
            let cell = parse_cell(rest.first().copied())?;
            let mirror = def.obstacles.iter_mut().find_map(|o| match o {
                Obstacle::Mirror(m) if m.cell == cell => Some(m),
                _ => None,
            });
            match mirror {
                Some(m) => m.beam_active = false,
                None => return Err(format!("@off: no mirror at {},{}", cell.x, cell.y)),
            }
        }
        other => return Err(format!("unknown metadata '@{other}'")),
    }
    Ok(())
}

fn parse_cell(word: Option<&str>) -> Result<Cell, String> {
    let word = word.ok_or("missing cell coordinate")?;
    let (x, y) = word.split_once(',').ok_or_else(|| format!("bad cell '{word}'"))?;
    let x: i32 = x.trim().parse().map_err(|_| format!("bad x in '{word}'"))?;
    let y: i32 = y.trim().parse().map_err(|_| format!("bad y in '{word}'"))?;
    Ok(Cell::new(x, y))
}

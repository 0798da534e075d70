//! End-to-end scenarios: levels parsed from text, driven through `Session`.

use std::time::Duration;

use mirrorgrid::config::GameConfig;
use mirrorgrid::domain::geometry::{Cell, MoveDir, WorldPoint};
use mirrorgrid::domain::inventory::KeyInventory;
use mirrorgrid::domain::occupant::OccupantKind;
use mirrorgrid::domain::tile::TileKind;
use mirrorgrid::sim::event::GameEvent;
use mirrorgrid::sim::grid::GridState;
use mirrorgrid::sim::level::{builtin_level, parse_level};
use mirrorgrid::sim::session::{Session, SessionRules, Tint};

fn c(x: i32, y: i32) -> Cell {
    Cell::new(x, y)
}

fn started(text: &str) -> Session {
    let def = parse_level(text).expect("scenario level parses");
    let mut s = Session::from_level(def, SessionRules::default());
    s.start();
    s.advance(Duration::ZERO);
    s
}

fn beam_snapshot(s: &Session) -> Vec<(u32, Vec<Cell>)> {
    s.grid()
        .beams()
        .entries()
        .into_iter()
        .map(|(owner, cells, _)| (owner.0, cells.to_vec()))
        .collect()
}

#[test]
fn outside_bounds_is_never_enterable_or_placeable() {
    let def = parse_level("S__\n").expect("parses");
    let grid = GridState::new(def.ground, def.blocking);
    for cell in [c(-1, 0), c(3, 0), c(1, 1), c(1, -1)] {
        assert!(!grid.can_enter_cell(cell, true));
        assert!(!grid.can_enemy_enter_cell(cell));
        assert!(!grid.can_place_shape_on_void(cell, &[(0, 0)], c(0, 0)));
    }
    // A footprint that pokes out of bounds fails as a whole.
    assert!(!grid.can_place_shape_on_void(c(2, 0), &[(0, 0), (1, 0)], c(0, 0)));
    assert!(grid.can_place_shape_on_void(c(1, 0), &[(0, 0), (1, 0)], c(0, 0)));
}

#[test]
fn clearing_one_owner_leaves_the_other() {
    let mut s = started("S....\n");
    let a = s.allocate_beam_owner();
    let b = s.allocate_beam_owner();
    s.set_beam_cells_for_owner(a, vec![c(2, 0), c(3, 0)]);
    s.set_beam_cells_for_owner(b, vec![c(3, 0), c(4, 0)]);

    s.clear_beam_cells_for_owner(a);
    assert!(!s.grid().is_beam_blocked(c(2, 0)));
    assert!(s.grid().is_beam_blocked(c(3, 0)));
    assert!(s.grid().is_beam_blocked(c(4, 0)));
}

#[test]
fn rebuild_twice_is_identical() {
    let mut s = started("#....e\n...S..\n......\nE.....\n");
    let first = beam_snapshot(&s);
    s.rebuild_all_beams();
    assert_eq!(beam_snapshot(&s), first);
    assert!(!first.iter().all(|(_, cells)| cells.is_empty()));
}

#[test]
fn facing_mirrors_cast_once_each() {
    let mut s = started("..z.\n...S\nE...\n");
    assert_eq!(s.segments().len(), 2);

    let events = s.rebuild_all_beams();
    let drawn = events.iter().filter(|e| matches!(e, GameEvent::BeamDrawn { .. })).count();
    assert_eq!(drawn, 2);
    assert!(s.grid().is_beam_blocked(c(1, 1)));
}

#[test]
fn emitter_stops_at_wall_entry_edge() {
    let s = started("...#\n....\n....\nE..S\n");
    assert!(s.grid().is_beam_blocked(c(1, 1)));
    assert!(s.grid().is_beam_blocked(c(2, 2)));
    assert!(!s.grid().is_beam_blocked(c(3, 3)));
    assert_eq!(s.segments()[0].end, WorldPoint { x: 3.0, y: 3.0 });
}

#[test]
fn consuming_gate_spends_exactly_one_key() {
    let mut s = started("@gate 1,0 key=gold consume\n@keys gold=2\nSG.\n");
    s.try_move_player(MoveDir::Right);
    assert_eq!(s.inventory.key_count("gold"), 1);
    assert_eq!(s.grid().tile_kind(c(1, 0)), TileKind::Floor);
}

#[test]
fn keyless_unlock_changes_nothing() {
    let mut s = started("@gate 1,0 key=gold consume\n@keys iron=1\nSG.\n");
    let events = s.try_move_player(MoveDir::Right);
    assert!(matches!(events[0], GameEvent::GateRefused { .. }));
    assert_eq!(s.inventory.key_count("iron"), 1);
    assert_eq!(s.grid().tile_kind(c(1, 0)), TileKind::Gate);
}

#[test]
fn shape_application_only_touches_void_in_footprint() {
    let def = parse_level("S_._\n").expect("parses");
    let mut grid = GridState::new(def.ground, def.blocking);
    let bar = [(0, 0), (1, 0)];

    assert_eq!(grid.apply_shape_to_void(c(1, 0), &bar), vec![c(1, 0)]);
    assert_eq!(grid.tile_kind(c(3, 0)), TileKind::Void);
    assert!(grid.apply_shape_to_void(c(1, 0), &bar).is_empty());
    assert_eq!(grid.tile_kind(c(1, 0)), TileKind::Floor);
    assert_eq!(grid.tile_kind(c(0, 0)), TileKind::Start);
}

#[test]
fn hazard_moves_occupant_to_first_orthogonal() {
    let mut s = started(".......\n.......\n.......\n...S...\n.......\n.......\n.......\n");
    assert_eq!(s.player.cell, c(3, 3));

    let owner = s.allocate_beam_owner();
    let events = s.set_beam_cells_for_owner(owner, vec![c(3, 3)]);
    assert_eq!(
        events,
        vec![GameEvent::OccupantRelocated { kind: OccupantKind::Player, from: c(3, 3), to: c(4, 3) }]
    );
}

#[test]
fn reflash_before_expiry_extends_visibility() {
    let cfg = GameConfig::from_toml_str("[timing]\nflash_ms = 300\n");
    let def = parse_level("S....\n").expect("parses");
    let mut s = Session::from_level(def, SessionRules::from_config(&cfg));
    let owner = s.allocate_preview_owner();
    let flash = s.rules().flash;

    s.flash_preview_cells_for_owner(owner, vec![c(1, 0)], Tint::HINT, flash);
    s.advance(Duration::from_millis(200));
    s.flash_preview_cells_for_owner(owner, vec![c(1, 0), c(2, 0)], Tint::HINT, flash);

    s.advance(Duration::from_millis(200));
    assert!(s.previews().contains(c(2, 0)), "stale clear must not erase the newer flash");

    let events = s.advance(Duration::from_millis(100));
    assert_eq!(events, vec![GameEvent::PreviewCleared { owner }]);
    assert!(!s.previews().contains(c(1, 0)));
}

#[test]
fn demo_level_starts_cleanly() {
    let def = builtin_level().expect("demo parses");
    let mut s = Session::from_level(def, SessionRules::default());
    s.start();
    let events = s.advance(Duration::from_millis(50));
    assert!(events.iter().any(|e| matches!(e, GameEvent::BeamDrawn { .. })));
    assert!(!events.iter().any(|e| matches!(e, GameEvent::BeamCapped { .. })));
    assert!(!s.grid().is_beam_blocked(s.player.cell));
}

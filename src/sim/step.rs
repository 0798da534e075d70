/// The step function: advances the session by one frame.
///
/// Processing order:
///   1. Timeline (deferred rebuild, flash clears)
///   2. Fall sequence (player lands back at start, off any beam)
///   3. Player movement / gate bump
///   4. Interaction with the obstacle in front of the player
///   5. Shape placement
///
/// Every mutation goes through `Session`; this module only sequences.

use std::time::Duration;

use crate::domain::geometry::{Cell, MoveDir};
use crate::domain::shape::Shape;
use super::event::GameEvent;
use super::session::Session;

/// A placement request from the cursor.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Placement {
    pub origin: Cell,
    pub shape: Shape,
}

/// What the player asked for this frame.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct FrameInput {
    pub movement: Option<MoveDir>,
    pub interact: bool,
    pub place: Option<Placement>,
}

// ══════════════════════════════════════════════════════════════
// Main entry point
// ══════════════════════════════════════════════════════════════

pub fn step(session: &mut Session, input: &FrameInput, dt: Duration) -> Vec<GameEvent> {
    let mut events = session.advance(dt);

    events.extend(session.tick_fall());

    if let Some(dir) = input.movement {
        events.extend(session.try_move_player(dir));
    }

    // Falling players can't reach anything.
    if input.interact && !session.player.is_falling() {
        let target = session.cell_in_front();
        events.extend(session.interact_at(target));
    }

    if let Some(p) = &input.place {
        events.extend(session.try_place_shape(p.origin, &p.shape));
    }

    events
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::geometry::Diagonal;
    use crate::domain::obstacle::ObstacleId;
    use crate::domain::occupant::{OccupantKind, FALL_TICKS};
    use crate::sim::level::parse_level;
    use crate::sim::session::SessionRules;

    const TICK: Duration = Duration::from_millis(50);

    fn session(text: &str) -> Session {
        let def = parse_level(text).expect("test level parses");
        let mut s = Session::from_level(def, SessionRules::default());
        s.start();
        s
    }

    #[test]
    fn first_frame_casts_beams() {
        let mut s = session("...S\n....\nE...\n");
        let events = step(&mut s, &FrameInput::default(), TICK);
        assert!(events.iter().any(|e| matches!(e, GameEvent::BeamDrawn { .. })));
    }

    #[test]
    fn interact_targets_cell_in_front() {
        // Player at (0,1) facing down onto the relay mirror at (0,0).
        let mut s = session("S..\nc..\n");
        step(&mut s, &FrameInput::default(), TICK);

        let face_down = FrameInput { movement: Some(MoveDir::Down), ..Default::default() };
        assert!(step(&mut s, &face_down, TICK).is_empty());
        assert_eq!(s.facing, MoveDir::Down);

        let poke = FrameInput { interact: true, ..Default::default() };
        let events = step(&mut s, &poke, TICK);
        assert_eq!(events[0], GameEvent::MirrorRotated { mirror: ObstacleId(0), facing: Diagonal::DownLeft });
    }

    #[test]
    fn fall_ends_with_landing_event() {
        let mut s = session("@lever 1,0 -> 2,0\nSL..\n");
        // Stand on the lever's target first.
        s.player.cell = Cell::new(2, 0);
        step(&mut s, &FrameInput::default(), TICK);

        s.interact_at(Cell::new(1, 0));
        assert!(s.player.is_falling());

        let mut landed = Vec::new();
        for _ in 0..FALL_TICKS {
            landed.extend(
                step(&mut s, &FrameInput::default(), TICK)
                    .into_iter()
                    .filter(|e| matches!(e, GameEvent::PlayerLanded { .. })),
            );
        }
        assert_eq!(landed, vec![GameEvent::PlayerLanded { at: Cell::new(0, 0) }]);
    }

    #[test]
    fn landing_on_a_beam_is_resolved() {
        // The emitter's ray runs through the start cell (1,1).
        let mut s = session("@lever 3,0 -> 2,1\n....\n.S..\nE..L\n");
        step(&mut s, &FrameInput::default(), TICK);
        assert_eq!(s.player.cell, Cell::new(2, 1));

        s.interact_at(Cell::new(3, 0));
        assert!(s.player.is_falling());

        let mut events = Vec::new();
        for _ in 0..FALL_TICKS {
            events.extend(step(&mut s, &FrameInput::default(), TICK));
        }
        assert_eq!(
            events,
            vec![
                GameEvent::PlayerLanded { at: Cell::new(1, 1) },
                GameEvent::OccupantRelocated {
                    kind: OccupantKind::Player,
                    from: Cell::new(1, 1),
                    to: Cell::new(0, 1),
                },
            ]
        );
        assert!(!s.grid().is_beam_blocked(s.player.cell));
    }

    #[test]
    fn placement_request_is_applied() {
        let mut s = session("S_.\n");
        let input = FrameInput {
            place: Some(Placement { origin: Cell::new(1, 0), shape: Shape::new("single", &[(0, 0)]) }),
            ..Default::default()
        };
        let events = step(&mut s, &input, TICK);
        assert!(events.contains(&GameEvent::ShapePlaced { cells: vec![Cell::new(1, 0)] }));
    }
}

/// Beam propagation: diagonal hazard rays cast from mirrors.
///
/// ## Rebuild
///
///   1. Clear every mirror's beam cells (registered or not).
///   2. Fresh `visited` set for this rebuild.
///   3. Each unvisited emitter casts. A ray that hits another mirror
///      energizes it: that mirror casts from its own facing, whether or not
///      it is an emitter. A mirror casts at most once per rebuild, which is
///      what ends mutual reflection.
///   4. Each cast commits its cells to the beam registry and yields a
///      `BeamSegment` for the renderer.
///
/// Chaining runs on an explicit work stack, so depth does not grow with
/// the mirror count. Each ray is capped at `max_steps` cells.
///
/// ## Ray termination
///
/// ┌───────────────────────┬─────────────────────────────────────┐
/// │ Next cell              │ Segment end                         │
/// ├───────────────────────┼─────────────────────────────────────┤
/// │ out of bounds          │ outer corner of the last valid cell │
/// │ blocking layer         │ entry corner of that cell           │
/// │ another mirror         │ that mirror's centre, then it casts │
/// │ step cap reached       │ outer corner of the last cell       │
/// └───────────────────────┴─────────────────────────────────────┘

use std::collections::HashSet;

use tracing::debug;

use crate::domain::geometry::{Cell, WorldPoint};
use crate::domain::obstacle::{Mirror, ObstacleId};
use super::grid::GridState;
use super::ownership::OwnerId;

/// Why a ray stopped.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum RayStop {
    OutOfBounds,
    Blocked,
    Mirror(ObstacleId),
    Capped,
}

/// One drawn ray, handed to the renderer.
#[derive(Clone, Copy, PartialEq, Debug)]
pub struct BeamSegment {
    pub mirror: ObstacleId,
    pub owner: OwnerId,
    pub start: WorldPoint,
    pub end: WorldPoint,
    pub stop: RayStop,
}

/// Everything a rebuild did, in cast order.
#[derive(Clone, Debug, Default)]
pub struct BeamReport {
    pub cleared: Vec<OwnerId>,
    pub segments: Vec<BeamSegment>,
    /// Mirrors in the order they were visited (switched-off ones included).
    pub visited: Vec<ObstacleId>,
}

impl BeamReport {
    pub fn capped(&self) -> impl Iterator<Item = &BeamSegment> {
        self.segments.iter().filter(|s| s.stop == RayStop::Capped)
    }
}

struct Ray {
    cells: Vec<Cell>,
    end: WorldPoint,
    stop: RayStop,
}

/// Recompute every beam from scratch.
pub fn rebuild_all_beams(grid: &mut GridState, max_steps: u32) -> BeamReport {
    let mut report = BeamReport::default();

    for id in grid.all_mirror_ids() {
        if let Some(owner) = grid.beam_owner(id) {
            grid.clear_beam_cells_for_owner(owner);
            report.cleared.push(owner);
        }
    }

    let emitters: Vec<ObstacleId> = grid
        .active_mirrors()
        .into_iter()
        .filter(|(_, m)| m.is_emitter)
        .map(|(id, _)| id)
        .collect();

    let mut visited: HashSet<ObstacleId> = HashSet::new();
    for emitter in emitters {
        if visited.contains(&emitter) { continue; }
        cast_chain(grid, emitter, max_steps, &mut visited, &mut report);
    }

    report
}

fn cast_chain(
    grid: &mut GridState,
    first: ObstacleId,
    max_steps: u32,
    visited: &mut HashSet<ObstacleId>,
    report: &mut BeamReport,
) {
    let mut stack = vec![first];
    while let Some(id) = stack.pop() {
        if !visited.insert(id) { continue; }
        report.visited.push(id);

        let mirror = match grid.obstacle(id).and_then(|o| o.as_mirror()) {
            Some(m) => m.clone(),
            None => continue,
        };
        if !mirror.beam_active {
            debug!(mirror = id.0, "beam inactive, no cast");
            continue;
        }
        let owner = match grid.beam_owner(id) {
            Some(o) => o,
            None => continue,
        };

        let ray = trace(grid, id, &mirror, max_steps);
        debug!(mirror = id.0, cells = ray.cells.len(), stop = ?ray.stop, "beam cast");
        if ray.stop == RayStop::Capped {
            debug!(mirror = id.0, max_steps, "beam hit step cap; level has no containing wall");
        }

        grid.set_beam_cells_for_owner(owner, ray.cells);
        report.segments.push(BeamSegment {
            mirror: id,
            owner,
            start: mirror.cell.center(),
            end: ray.end,
            stop: ray.stop,
        });

        if let RayStop::Mirror(next) = ray.stop {
            stack.push(next);
        }
    }
}

/// Walk diagonally from the mirror until something stops the ray.
fn trace(grid: &GridState, id: ObstacleId, mirror: &Mirror, max_steps: u32) -> Ray {
    let (dx, dy) = mirror.facing.step();
    let (hx, hy) = (dx as f32 * 0.5, dy as f32 * 0.5);
    let mut cells = Vec::new();
    let mut cur = mirror.cell;

    for _ in 0..max_steps {
        let next = cur.offset(dx, dy);
        if !grid.is_in_bounds(next) {
            return Ray { cells, end: cur.center().offset(hx, hy), stop: RayStop::OutOfBounds };
        }
        if grid.has_blocking(next) {
            return Ray { cells, end: next.center().offset(-hx, -hy), stop: RayStop::Blocked };
        }
        if let Some((other, o)) = grid.try_get_obstacle(next) {
            if other != id && o.as_mirror().is_some() {
                return Ray { cells, end: next.center(), stop: RayStop::Mirror(other) };
            }
        }
        cells.push(next);
        cur = next;
    }

    Ray { cells, end: cur.center().offset(hx, hy), stop: RayStop::Capped }
}

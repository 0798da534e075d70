/// Mirror Grid: the authoritative spatial model of a beam-and-mirror puzzle.
///
/// Layers:
///   - `domain` : cells, tiles, obstacles, occupants. Pure data + rules.
///   - `sim`    : grid state, ownership registries, beam propagation,
///                occupant resolution, and the `Session` context object.
///   - `config` : TOML configuration with defaults.
///
/// Rendering and input live in the binary and only consume
/// `sim::event::GameEvent`s and read-only session state.

pub mod config;
pub mod domain;
pub mod sim;

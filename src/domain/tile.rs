/// Tile kinds and their metadata.
/// Layer membership is queried via methods, not stored as flags,
/// so tile semantics are centralized here.

#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub enum TileKind {
    Floor,
    Void,
    Start,
    Wall, // blocking layer
    Gate, // blocking layer, unlockable
}

impl TileKind {
    /// Does this kind live on the ground layer?
    pub fn is_ground(self) -> bool {
        matches!(self, TileKind::Floor | TileKind::Void | TileKind::Start)
    }

    /// Does this kind live on the blocking layer?
    pub fn is_blocking(self) -> bool {
        matches!(self, TileKind::Wall | TileKind::Gate)
    }
}

/// What happens to an entity that steps onto a ground tile.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Default)]
pub enum EnterEffect {
    #[default]
    None,
    ResetToStart,
}

/// Per-tile metadata, as authored on the tile asset.
#[derive(Clone, PartialEq, Eq, Debug)]
pub struct TileMeta {
    pub kind: TileKind,
    pub walkable_by_default: bool,
    pub enter_effect: EnterEffect,
    /// Gate only. Empty = locked until removed by other means.
    pub gate_key_id: String,
    /// Gate only. Unlocking spends one key.
    pub consumes_key: bool,
}

impl TileMeta {
    /// Stock metadata for a kind.
    pub fn of(kind: TileKind) -> Self {
        TileMeta {
            kind,
            walkable_by_default: matches!(kind, TileKind::Floor | TileKind::Start),
            enter_effect: EnterEffect::None,
            gate_key_id: String::new(),
            consumes_key: false,
        }
    }

    pub fn floor() -> Self {
        Self::of(TileKind::Floor)
    }

    pub fn void() -> Self {
        Self::of(TileKind::Void)
    }

    pub fn gate(key_id: &str, consumes_key: bool) -> Self {
        TileMeta {
            gate_key_id: key_id.to_string(),
            consumes_key,
            ..Self::of(TileKind::Gate)
        }
    }

    pub fn with_enter_effect(mut self, effect: EnterEffect) -> Self {
        self.enter_effect = effect;
        self
    }

    pub fn with_walkable(mut self, walkable: bool) -> Self {
        self.walkable_by_default = walkable;
        self
    }
}

/// Owner-keyed cell sets.
///
/// One registry type serves beam occupancy, transient telegraph previews and
/// persistent overlays. Each producer holds an `OwnerId` and only ever
/// replaces or clears its own list, so independent producers never clobber
/// each other.
///
/// ## Union (incremental)
///
/// `union` counts, per cell, how many owner entries cover it. Replacing an
/// owner's list decrements its old cells and increments its new ones, so the
/// cost is proportional to the changed lists, not the map size. A cell is
/// "covered" iff its count is > 0.
///
/// ## Tokens
///
/// Every `set_for_owner` bumps the owner's token. A delayed clear captures
/// the token at scheduling time and goes through `clear_if_current`, which
/// is inert once a newer set has happened.

use std::collections::HashMap;

use crate::domain::geometry::Cell;

/// Explicitly allocated owner handle.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, PartialOrd, Ord)]
pub struct OwnerId(pub u32);

#[derive(Clone, Debug)]
struct Owned<S> {
    cells: Vec<Cell>,
    style: S,
}

#[derive(Clone, Debug)]
pub struct OwnershipRegistry<S> {
    next_owner: u32,
    owners: HashMap<OwnerId, Owned<S>>,
    tokens: HashMap<OwnerId, u64>,
    union: HashMap<Cell, u32>,
}

impl<S: Clone> Default for OwnershipRegistry<S> {
    fn default() -> Self {
        Self::new()
    }
}

impl<S: Clone> OwnershipRegistry<S> {
    pub fn new() -> Self {
        OwnershipRegistry {
            next_owner: 0,
            owners: HashMap::new(),
            tokens: HashMap::new(),
            union: HashMap::new(),
        }
    }

    /// Hand out a fresh owner handle.
    pub fn allocate(&mut self) -> OwnerId {
        let id = OwnerId(self.next_owner);
        self.next_owner += 1;
        id
    }

    /// Replace the owner's cells. Returns the owner's new token.
    pub fn set_for_owner(&mut self, owner: OwnerId, cells: Vec<Cell>, style: S) -> u64 {
        self.remove_entry(owner);
        for &c in &cells {
            *self.union.entry(c).or_insert(0) += 1;
        }
        self.owners.insert(owner, Owned { cells, style });
        let token = self.tokens.entry(owner).or_insert(0);
        *token += 1;
        *token
    }

    /// Remove the owner's cells. Returns true if it had any entry.
    pub fn clear_for_owner(&mut self, owner: OwnerId) -> bool {
        self.remove_entry(owner)
    }

    /// Set now; the caller schedules `clear_if_current(owner, token)`
    /// for when the flash should end.
    pub fn flash_for_owner(&mut self, owner: OwnerId, cells: Vec<Cell>, style: S) -> u64 {
        self.set_for_owner(owner, cells, style)
    }

    /// Delayed-clear continuation. No-op if the token is stale.
    pub fn clear_if_current(&mut self, owner: OwnerId, token: u64) -> bool {
        if self.token(owner) != token {
            return false;
        }
        self.remove_entry(owner)
    }

    pub fn token(&self, owner: OwnerId) -> u64 {
        self.tokens.get(&owner).copied().unwrap_or(0)
    }

    /// Is the cell covered by any owner?
    #[inline]
    pub fn contains(&self, cell: Cell) -> bool {
        self.union.get(&cell).is_some_and(|&n| n > 0)
    }

    pub fn cells_of(&self, owner: OwnerId) -> &[Cell] {
        self.owners.get(&owner).map(|o| o.cells.as_slice()).unwrap_or(&[])
    }

    pub fn style_of(&self, owner: OwnerId) -> Option<&S> {
        self.owners.get(&owner).map(|o| &o.style)
    }

    /// All entries, ordered by owner id (stable for rendering and tests).
    pub fn entries(&self) -> Vec<(OwnerId, &[Cell], &S)> {
        let mut out: Vec<_> = self
            .owners
            .iter()
            .map(|(&id, o)| (id, o.cells.as_slice(), &o.style))
            .collect();
        out.sort_by_key(|(id, _, _)| *id);
        out
    }

    /// Number of distinct covered cells.
    pub fn covered_len(&self) -> usize {
        self.union.len()
    }

    /// Drop every entry. Tokens survive so pending clears stay stale.
    pub fn clear_all(&mut self) {
        self.owners.clear();
        self.union.clear();
    }

    fn remove_entry(&mut self, owner: OwnerId) -> bool {
        let old = match self.owners.remove(&owner) {
            Some(o) => o,
            None => return false,
        };
        for c in old.cells {
            if let Some(n) = self.union.get_mut(&c) {
                *n -= 1;
                if *n == 0 {
                    self.union.remove(&c);
                }
            }
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cells(list: &[(i32, i32)]) -> Vec<Cell> {
        list.iter().map(|&(x, y)| Cell::new(x, y)).collect()
    }

    #[test]
    fn union_of_owners() {
        let mut r: OwnershipRegistry<()> = OwnershipRegistry::new();
        let a = r.allocate();
        let b = r.allocate();
        r.set_for_owner(a, cells(&[(1, 1), (2, 2)]), ());
        r.set_for_owner(b, cells(&[(2, 2), (3, 3)]), ());
        assert!(r.contains(Cell::new(1, 1)));
        assert!(r.contains(Cell::new(2, 2)));
        assert!(r.contains(Cell::new(3, 3)));
        assert_eq!(r.covered_len(), 3);
    }

    #[test]
    fn clearing_one_owner_keeps_shared_cells() {
        let mut r: OwnershipRegistry<()> = OwnershipRegistry::new();
        let a = r.allocate();
        let b = r.allocate();
        r.set_for_owner(a, cells(&[(1, 1), (2, 2)]), ());
        r.set_for_owner(b, cells(&[(2, 2)]), ());
        assert!(r.clear_for_owner(a));
        assert!(!r.contains(Cell::new(1, 1)));
        assert!(r.contains(Cell::new(2, 2)));
        assert_eq!(r.cells_of(b), &[Cell::new(2, 2)]);
        assert!(!r.clear_for_owner(a));
    }

    #[test]
    fn replacing_removes_old_cells() {
        let mut r: OwnershipRegistry<u8> = OwnershipRegistry::new();
        let a = r.allocate();
        r.set_for_owner(a, cells(&[(0, 0), (0, 1)]), 1);
        r.set_for_owner(a, cells(&[(5, 5)]), 2);
        assert!(!r.contains(Cell::new(0, 0)));
        assert!(r.contains(Cell::new(5, 5)));
        assert_eq!(r.style_of(a), Some(&2));
        assert_eq!(r.covered_len(), 1);
    }

    #[test]
    fn stale_token_clear_is_inert() {
        let mut r: OwnershipRegistry<()> = OwnershipRegistry::new();
        let a = r.allocate();
        let first = r.flash_for_owner(a, cells(&[(1, 0)]), ());
        let second = r.flash_for_owner(a, cells(&[(2, 0)]), ());
        assert!(second > first);
        assert!(!r.clear_if_current(a, first));
        assert!(r.contains(Cell::new(2, 0)));
        assert!(r.clear_if_current(a, second));
        assert!(!r.contains(Cell::new(2, 0)));
    }

    #[test]
    fn clear_all_keeps_tokens() {
        let mut r: OwnershipRegistry<()> = OwnershipRegistry::new();
        let a = r.allocate();
        let t = r.set_for_owner(a, cells(&[(0, 0)]), ());
        r.clear_all();
        assert_eq!(r.covered_len(), 0);
        assert_eq!(r.token(a), t);
        assert!(r.entries().is_empty());
    }
}

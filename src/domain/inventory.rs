/// Key inventory consulted by gate unlocking.

use std::collections::HashMap;

/// The two operations a gate unlock needs from whoever holds the keys.
pub trait KeyInventory {
    fn key_count(&self, key_id: &str) -> u32;
    /// Spend one key. Returns false (and changes nothing) if none are held.
    fn consume_key(&mut self, key_id: &str) -> bool;
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Inventory {
    keys: HashMap<String, u32>,
}

impl Inventory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_keys(&mut self, key_id: &str, count: u32) {
        if count == 0 {
            return;
        }
        *self.keys.entry(key_id.to_string()).or_insert(0) += count;
    }

    /// Held keys sorted by id (for HUD display).
    pub fn summary(&self) -> Vec<(String, u32)> {
        let mut out: Vec<_> = self
            .keys
            .iter()
            .filter(|(_, &n)| n > 0)
            .map(|(k, &n)| (k.clone(), n))
            .collect();
        out.sort();
        out
    }
}

impl KeyInventory for Inventory {
    fn key_count(&self, key_id: &str) -> u32 {
        self.keys.get(key_id).copied().unwrap_or(0)
    }

    fn consume_key(&mut self, key_id: &str) -> bool {
        match self.keys.get_mut(key_id) {
            Some(n) if *n > 0 => {
                *n -= 1;
                true
            }
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn consume_decrements_once() {
        let mut inv = Inventory::new();
        inv.add_keys("gold", 2);
        assert!(inv.consume_key("gold"));
        assert_eq!(inv.key_count("gold"), 1);
    }

    #[test]
    fn consume_without_keys_is_noop() {
        let mut inv = Inventory::new();
        assert!(!inv.consume_key("gold"));
        assert_eq!(inv.key_count("gold"), 0);
        assert!(inv.summary().is_empty());
    }
}

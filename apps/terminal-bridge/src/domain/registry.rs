//! Circular log of recently seen command ids.
//!
//! The transport delivers commands at least once: a command file that
//! could not be deleted will be read again on a later cycle. This
//! registry makes execution idempotent by remembering the most recent
//! `capacity` ids. A reset command clears every slot and is the only
//! way to re-execute a previously seen id.

/// Fixed-capacity circular log of command ids.
#[derive(Debug, Clone)]
pub struct CommandIdRegistry {
    slots: Vec<Option<u64>>,
    write_index: usize,
}

impl CommandIdRegistry {
    /// Default number of remembered ids.
    pub const DEFAULT_CAPACITY: usize = 1000;

    /// Create a registry with the given capacity.
    ///
    /// A zero capacity is clamped to one slot so `record` always has
    /// somewhere to write.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        Self {
            slots: vec![None; capacity.max(1)],
            write_index: 0,
        }
    }

    /// Whether this id was recorded since the last reset.
    #[must_use]
    pub fn contains(&self, id: u64) -> bool {
        self.slots.iter().flatten().any(|&seen| seen == id)
    }

    /// Record an id, overwriting the oldest slot once full.
    pub fn record(&mut self, id: u64) {
        self.slots[self.write_index] = Some(id);
        self.write_index = (self.write_index + 1) % self.slots.len();
    }

    /// Clear every slot and rewind the write index.
    pub fn reset(&mut self) {
        self.slots.fill(None);
        self.write_index = 0;
    }

    /// Number of slots.
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.slots.len()
    }
}

impl Default for CommandIdRegistry {
    fn default() -> Self {
        Self::new(Self::DEFAULT_CAPACITY)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn records_and_detects_duplicates() {
        let mut registry = CommandIdRegistry::new(10);
        assert!(!registry.contains(7));
        registry.record(7);
        assert!(registry.contains(7));
        assert!(!registry.contains(8));
    }

    #[test]
    fn oldest_id_evicted_after_capacity_plus_one() {
        let mut registry = CommandIdRegistry::new(3);
        registry.record(1);
        registry.record(2);
        registry.record(3);
        assert!(registry.contains(1));

        registry.record(4);
        assert!(!registry.contains(1));
        assert!(registry.contains(2));
        assert!(registry.contains(3));
        assert!(registry.contains(4));
    }

    #[test]
    fn reset_clears_all_slots() {
        let mut registry = CommandIdRegistry::new(5);
        for id in 0..5 {
            registry.record(id);
        }
        registry.reset();
        for id in 0..5 {
            assert!(!registry.contains(id));
        }
        // Write index rewound: the next record lands in slot 0 again.
        registry.record(42);
        assert!(registry.contains(42));
    }

    #[test]
    fn zero_capacity_clamped() {
        let mut registry = CommandIdRegistry::new(0);
        assert_eq!(registry.capacity(), 1);
        registry.record(1);
        assert!(registry.contains(1));
        registry.record(2);
        assert!(!registry.contains(1));
    }
}

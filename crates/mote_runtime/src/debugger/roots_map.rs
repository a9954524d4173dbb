//! Objects the debugger has asked the collector to keep alive.

use ahash::RandomState;
use hashbrown::HashSet;
use mote_core::ObjectId;

#[derive(Debug, Default)]
pub struct RootsMap {
    pins: HashSet<ObjectId, RandomState>,
}

impl RootsMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pins `addr`. Returns `false` if it was already pinned.
    #[inline]
    pub fn put(&mut self, addr: ObjectId) -> bool {
        self.pins.insert(addr)
    }

    #[inline]
    pub fn remove(&mut self, addr: ObjectId) -> bool {
        self.pins.remove(&addr)
    }

    pub fn contains(&self, addr: ObjectId) -> bool {
        self.pins.contains(&addr)
    }

    pub fn iter(&self) -> impl Iterator<Item = ObjectId> + '_ {
        self.pins.iter().copied()
    }

    pub fn len(&self) -> usize {
        self.pins.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pins.is_empty()
    }

    pub fn clear(&mut self) {
        self.pins.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn put_is_idempotent() {
        let mut pins = RootsMap::new();
        assert!(pins.put(ObjectId(4)));
        assert!(!pins.put(ObjectId(4)));
        assert_eq!(pins.len(), 1);
        assert!(pins.remove(ObjectId(4)));
        assert!(!pins.remove(ObjectId(4)));
        assert!(pins.is_empty());
    }
}

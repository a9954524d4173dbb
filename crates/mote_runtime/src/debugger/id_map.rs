//! Two-way map between debugger object ids and heap objects.
//!
//! Each `(id, object)` pair is one record that sits on two bucket chains
//! at once: one keyed by id, one keyed by object. Records live in a slab
//! and chains link slab indices.

use mote_core::ObjectId;

pub const ID_BUCKETS: usize = 256;

/// Multiplicative (Fibonacci) hash into `buckets`.
#[inline]
fn spread(key: u64, buckets: usize) -> usize {
    (key.wrapping_mul(0x9E37_79B9_7F4A_7C15) >> 32) as usize % buckets
}

#[derive(Debug, Clone)]
struct IdRecord {
    id: u32,
    addr: ObjectId,
    next_by_id: Option<usize>,
    next_by_addr: Option<usize>,
}

#[derive(Debug)]
pub struct IdMap {
    records: Vec<Option<IdRecord>>,
    free: Vec<usize>,
    by_id: Vec<Option<usize>>,
    by_addr: Vec<Option<usize>>,
    next_id: u32,
    len: usize,
}

impl IdMap {
    pub fn new(first_id: u32) -> Self {
        Self::with_buckets(ID_BUCKETS, first_id)
    }

    pub fn with_buckets(buckets: usize, first_id: u32) -> Self {
        let buckets = buckets.max(1);
        Self {
            records: Vec::new(),
            free: Vec::new(),
            by_id: vec![None; buckets],
            by_addr: vec![None; buckets],
            next_id: first_id.max(1),
            len: 0,
        }
    }

    fn id_bucket(&self, id: u32) -> usize {
        spread(id as u64, self.by_id.len())
    }

    fn addr_bucket(&self, addr: ObjectId) -> usize {
        spread(addr.0 as u64, self.by_addr.len())
    }

    fn record(&self, idx: usize) -> Option<&IdRecord> {
        self.records.get(idx).and_then(Option::as_ref)
    }

    fn find_by_id(&self, id: u32) -> Option<usize> {
        let mut cursor = self.by_id[self.id_bucket(id)];
        while let Some(idx) = cursor {
            let record = self.record(idx)?;
            if record.id == id {
                return Some(idx);
            }
            cursor = record.next_by_id;
        }
        None
    }

    fn find_by_addr(&self, addr: ObjectId) -> Option<usize> {
        let mut cursor = self.by_addr[self.addr_bucket(addr)];
        while let Some(idx) = cursor {
            let record = self.record(idx)?;
            if record.addr == addr {
                return Some(idx);
            }
            cursor = record.next_by_addr;
        }
        None
    }

    /// The id for `addr`, issuing a fresh one on first sight.
    pub fn put(&mut self, addr: ObjectId) -> u32 {
        if let Some(record) = self.find_by_addr(addr).and_then(|idx| self.record(idx)) {
            return record.id;
        }
        let id = self.next_id;
        self.next_id += 1;

        let id_bucket = self.id_bucket(id);
        let addr_bucket = self.addr_bucket(addr);
        let record = IdRecord {
            id,
            addr,
            next_by_id: self.by_id[id_bucket],
            next_by_addr: self.by_addr[addr_bucket],
        };
        let idx = match self.free.pop() {
            Some(idx) => {
                self.records[idx] = Some(record);
                idx
            }
            None => {
                self.records.push(Some(record));
                self.records.len() - 1
            }
        };
        self.by_id[id_bucket] = Some(idx);
        self.by_addr[addr_bucket] = Some(idx);
        self.len += 1;
        id
    }

    pub fn get_by_id(&self, id: u32) -> Option<ObjectId> {
        self.find_by_id(id).and_then(|idx| self.record(idx)).map(|r| r.addr)
    }

    /// The id issued for `addr`; 0 when unknown.
    pub fn get_by_address(&self, addr: ObjectId) -> u32 {
        self.find_by_addr(addr).and_then(|idx| self.record(idx)).map_or(0, |r| r.id)
    }

    pub fn remove_id(&mut self, id: u32) -> Option<ObjectId> {
        let idx = self.find_by_id(id)?;
        self.unlink(idx).map(|r| r.addr)
    }

    pub fn remove_addr(&mut self, addr: ObjectId) -> Option<u32> {
        let idx = self.find_by_addr(addr)?;
        self.unlink(idx).map(|r| r.id)
    }

    /// Takes record `idx` off both chains and frees its slot.
    fn unlink(&mut self, idx: usize) -> Option<IdRecord> {
        let (id, addr, next_by_id, next_by_addr) = {
            let r = self.record(idx)?;
            (r.id, r.addr, r.next_by_id, r.next_by_addr)
        };

        let bucket = self.id_bucket(id);
        if self.by_id[bucket] == Some(idx) {
            self.by_id[bucket] = next_by_id;
        } else {
            let mut cursor = self.by_id[bucket];
            while let Some(c) = cursor {
                let prev = self.records[c].as_mut()?;
                if prev.next_by_id == Some(idx) {
                    prev.next_by_id = next_by_id;
                    break;
                }
                cursor = prev.next_by_id;
            }
        }

        let bucket = self.addr_bucket(addr);
        if self.by_addr[bucket] == Some(idx) {
            self.by_addr[bucket] = next_by_addr;
        } else {
            let mut cursor = self.by_addr[bucket];
            while let Some(c) = cursor {
                let prev = self.records[c].as_mut()?;
                if prev.next_by_addr == Some(idx) {
                    prev.next_by_addr = next_by_addr;
                    break;
                }
                cursor = prev.next_by_addr;
            }
        }

        self.free.push(idx);
        self.len -= 1;
        self.records[idx].take()
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn iter(&self) -> impl Iterator<Item = (u32, ObjectId)> + '_ {
        self.records.iter().flatten().map(|r| (r.id, r.addr))
    }

    /// Drops every record. Ids keep counting up from where they were.
    pub fn clear(&mut self) {
        self.records.clear();
        self.free.clear();
        self.by_id.iter_mut().for_each(|b| *b = None);
        self.by_addr.iter_mut().for_each(|b| *b = None);
        self.len = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_are_monotonic_and_stable() {
        let mut map = IdMap::new(3);
        let a = map.put(ObjectId(10));
        let b = map.put(ObjectId(11));
        assert_eq!((a, b), (3, 4));
        assert_eq!(map.put(ObjectId(10)), 3);
        assert_eq!(map.len(), 2);
    }

    #[test]
    fn removal_from_middle_of_shared_chain() {
        // One bucket forces every record onto the same two chains.
        let mut map = IdMap::with_buckets(1, 1);
        let ids: Vec<u32> = (0..5).map(|i| map.put(ObjectId(i))).collect();
        assert_eq!(map.remove_id(ids[2]), Some(ObjectId(2)));
        assert_eq!(map.remove_addr(ObjectId(0)), Some(ids[0]));
        assert_eq!(map.get_by_id(ids[2]), None);
        assert_eq!(map.get_by_address(ObjectId(0)), 0);
        for i in [1usize, 3, 4] {
            assert_eq!(map.get_by_id(ids[i]), Some(ObjectId(i)));
            assert_eq!(map.get_by_address(ObjectId(i)), ids[i]);
        }
        assert_eq!(map.len(), 3);
    }

    #[test]
    fn freed_slots_are_reused() {
        let mut map = IdMap::with_buckets(4, 1);
        let first = map.put(ObjectId(1));
        map.remove_id(first);
        let second = map.put(ObjectId(2));
        assert_ne!(first, second);
        assert_eq!(map.records.len(), 1);
        assert_eq!(map.get_by_id(second), Some(ObjectId(2)));
    }
}

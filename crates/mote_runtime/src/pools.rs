//! UTF and interned-string pools.
//!
//! Both pools are fixed bucket arrays keyed by a hash over every byte of
//! the content. Entries are allocated `Static` and live as long as the VM.

use std::hash::Hasher;

use ahash::AHasher;
use mote_core::{ExitCode, ObjectId};

use crate::exception::{DomainError, VmResult};
use crate::heap::{AllocType, BlockBody, Heap};
use crate::object::{JavaString, StringChars};
use crate::system::SystemClass;
use crate::vm::Vm;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PoolKind {
    /// Canonical byte sequences.
    Utf,
    /// Canonical string objects.
    Interned,
}

#[derive(Debug, Clone, Copy)]
struct PoolNode {
    hash: u64,
    id: ObjectId,
}

#[derive(Debug)]
pub struct Pool {
    kind: PoolKind,
    buckets: Vec<Vec<PoolNode>>,
    len: usize,
}

impl Pool {
    pub fn new(kind: PoolKind, buckets: usize) -> Self {
        Self { kind, buckets: vec![Vec::new(); buckets.max(1)], len: 0 }
    }

    pub fn hash(bytes: &[u8]) -> u64 {
        let mut hasher = AHasher::default();
        hasher.write(bytes);
        hasher.finish()
    }

    fn bucket(&self, hash: u64) -> usize {
        (hash % self.buckets.len() as u64) as usize
    }

    fn content<'h>(&self, heap: &'h Heap, id: ObjectId) -> Option<&'h [u8]> {
        match self.kind {
            PoolKind::Utf => heap.utf_bytes(id),
            PoolKind::Interned => heap.string_bytes(id),
        }
    }

    pub fn lookup(&self, heap: &Heap, bytes: &[u8]) -> Option<ObjectId> {
        let hash = Self::hash(bytes);
        self.buckets[self.bucket(hash)]
            .iter()
            .find(|node| node.hash == hash && self.content(heap, node.id) == Some(bytes))
            .map(|node| node.id)
    }

    /// Links `id` at the head of its bucket without checking for presence.
    pub fn link(&mut self, bytes: &[u8], id: ObjectId) {
        let hash = Self::hash(bytes);
        let bucket = self.bucket(hash);
        self.buckets[bucket].insert(0, PoolNode { hash, id });
        self.len += 1;
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn kind(&self) -> PoolKind {
        self.kind
    }
}

impl Vm {
    /// Looks `bytes` up in the UTF pool, adding a canonical copy if asked to.
    pub fn utf(&mut self, bytes: &[u8], add_if_missing: bool) -> VmResult<Option<ObjectId>> {
        if let Some(id) = self.utf_pool.lookup(&self.heap, bytes) {
            return Ok(Some(id));
        }
        if !add_if_missing {
            return Ok(None);
        }
        self.add_utf(bytes).map(Some)
    }

    /// Adds a copy of `bytes` to the UTF pool. Does not look for an
    /// existing entry first.
    pub fn add_utf(&mut self, bytes: &[u8]) -> VmResult<ObjectId> {
        let id = self.alloc(AllocType::Static, BlockBody::Utf(bytes.into()))?;
        self.utf_pool.link(bytes, id);
        Ok(id)
    }

    pub fn utf_str(&mut self, s: &str) -> VmResult<ObjectId> {
        match self.utf_pool.lookup(&self.heap, s.as_bytes()) {
            Some(id) => Ok(id),
            None => self.add_utf(s.as_bytes()),
        }
    }

    pub fn utf_bytes(&self, id: ObjectId) -> Option<&[u8]> {
        self.heap.utf_bytes(id)
    }

    /// Looks `bytes` up in the interned-string pool, creating the canonical
    /// string object over a pooled UTF copy if asked to.
    pub fn intern(&mut self, bytes: &[u8], add_if_missing: bool) -> VmResult<Option<ObjectId>> {
        if let Some(id) = self.intern_pool.lookup(&self.heap, bytes) {
            return Ok(Some(id));
        }
        if !add_if_missing {
            return Ok(None);
        }
        let clazz = self.system_class(SystemClass::String)?;
        let utf = match self.utf_pool.lookup(&self.heap, bytes) {
            Some(id) => id,
            None => self.add_utf(bytes)?,
        };
        let chars = StringChars::Pooled { utf, offset: 0, length: bytes.len() as u32 };
        let id = self.alloc(AllocType::Static, BlockBody::String(JavaString { clazz, chars }))?;
        self.intern_pool.link(bytes, id);
        Ok(Some(id))
    }

    pub fn intern_str(&mut self, s: &str) -> VmResult<ObjectId> {
        self.intern_str_bytes(s.as_bytes())
    }

    /// `String.intern()`: the canonical object for the contents of `string`.
    pub fn intern_object(&mut self, string: ObjectId) -> VmResult<ObjectId> {
        let Some(bytes) = self.heap.string_bytes(string).map(<[u8]>::to_vec) else {
            return Err(self.throw_new(DomainError::ClassCast, Some("not a string")));
        };
        self.intern_str_bytes(&bytes)
    }

    fn intern_str_bytes(&mut self, bytes: &[u8]) -> VmResult<ObjectId> {
        match self.intern(bytes, true)? {
            Some(id) => Ok(id),
            None => Err(self.exit(ExitCode::InvariantViolated, "intern pool refused an entry")),
        }
    }

    pub fn utf_pool(&self) -> &Pool {
        &self.utf_pool
    }

    pub fn intern_pool(&self) -> &Pool {
        &self.intern_pool
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mote_core::BudgetAllocator;

    #[test]
    fn link_puts_newest_first() {
        let mut heap = Heap::new(Box::new(BudgetAllocator::new(4096)));
        let mut pool = Pool::new(PoolKind::Utf, 1);
        let first = heap.alloc(AllocType::Static, BlockBody::Utf(b"dup".to_vec().into())).unwrap();
        let second = heap.alloc(AllocType::Static, BlockBody::Utf(b"dup".to_vec().into())).unwrap();
        pool.link(b"dup", first);
        pool.link(b"dup", second);
        assert_eq!(pool.len(), 2);
        assert_eq!(pool.lookup(&heap, b"dup"), Some(second));
        assert_eq!(pool.lookup(&heap, b"other"), None);
    }
}

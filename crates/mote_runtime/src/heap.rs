//! Typed heap blocks and the mark/sweep heap.

use mote_core::{Cell, ExitCode, ObjectId, RawAllocator, VmExit};

use crate::backtrace::Backtrace;
use crate::class::Clazz;
use crate::object::{ClassMirror, Instance, JavaString, ObjectArray, PrimitiveArray, StringChars, Throwable, WeakRef};

/// Bytes charged per block on top of its payload.
pub const HEADER_SIZE: usize = 8;

const CELL: usize = 8;
pub(crate) const REF: usize = 8;

/// Block size of an array of `length` elements of `element_size` bytes, or
/// `None` when it does not fit a `usize`.
pub fn array_block_size(length: usize, element_size: usize) -> Option<usize> {
    length.checked_mul(element_size)?.checked_add(HEADER_SIZE + REF + 4)
}

/// Block type tag. Tags up to `WeakReference` are object-like and carry a
/// class reference.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(u8)]
pub enum AllocType {
    Object = 0,
    ArrayOfPrimitive = 1,
    ArrayOfObject = 2,
    String = 3,
    WeakReference = 4,
    Data = 5,
    ArrayClazz = 6,
    PrimitiveClazz = 7,
    InstanceClazz = 8,
    /// Never reclaimed by the collector.
    Static = 9,
}

impl AllocType {
    pub fn from_u8(tag: u8) -> Option<Self> {
        Some(match tag {
            0 => AllocType::Object,
            1 => AllocType::ArrayOfPrimitive,
            2 => AllocType::ArrayOfObject,
            3 => AllocType::String,
            4 => AllocType::WeakReference,
            5 => AllocType::Data,
            6 => AllocType::ArrayClazz,
            7 => AllocType::PrimitiveClazz,
            8 => AllocType::InstanceClazz,
            9 => AllocType::Static,
            _ => return None,
        })
    }

    pub fn is_object_like(self) -> bool {
        self <= AllocType::WeakReference
    }

    pub fn is_clazz(self) -> bool {
        matches!(self, AllocType::ArrayClazz | AllocType::PrimitiveClazz | AllocType::InstanceClazz)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlockHeader {
    tag: u8,
    size: u32,
}

impl BlockHeader {
    pub fn tag(&self) -> Option<AllocType> {
        AllocType::from_u8(self.tag)
    }

    /// Total charged size, header included.
    pub fn size(&self) -> usize {
        self.size as usize
    }

    #[cfg(test)]
    pub(crate) fn corrupt(&mut self, tag: u8) {
        self.tag = tag;
    }
}

#[derive(Debug, Clone)]
pub enum BlockBody {
    Instance(Instance),
    Throwable(Throwable),
    Mirror(ClassMirror),
    String(JavaString),
    WeakRef(WeakRef),
    ObjectArray(ObjectArray),
    PrimitiveArray(PrimitiveArray),
    Utf(Box<[u8]>),
    Backtrace(Backtrace),
    Data(Box<[u8]>),
    Clazz(Box<Clazz>),
}

impl BlockBody {
    pub fn payload_size(&self) -> usize {
        match self {
            BlockBody::Instance(o) => REF + o.fields.len() * CELL,
            BlockBody::Throwable(t) => 3 * REF + 4 + t.fields.len() * CELL,
            BlockBody::Mirror(_) => 2 * REF,
            BlockBody::String(s) => match &s.chars {
                StringChars::Pooled { .. } => 2 * REF + 8,
                StringChars::Owned(bytes) => REF + 4 + bytes.len(),
            },
            BlockBody::WeakRef(w) => 2 * REF + w.fields.len() * CELL,
            BlockBody::ObjectArray(a) => REF + 4 + a.elements.len() * REF,
            BlockBody::PrimitiveArray(a) => REF + 4 + a.byte_len(),
            BlockBody::Utf(bytes) | BlockBody::Data(bytes) => bytes.len(),
            BlockBody::Backtrace(b) => 4 + b.frames.len() * (3 * REF + 4),
            BlockBody::Clazz(c) => 6 * REF + c.layout.slots() + c.statics().len() * CELL + c.dispatch.len() * 4,
        }
    }

    /// Class of an object-like body.
    pub fn class(&self) -> Option<ObjectId> {
        match self {
            BlockBody::Instance(o) => Some(o.clazz),
            BlockBody::Throwable(t) => Some(t.clazz),
            BlockBody::Mirror(m) => Some(m.clazz),
            BlockBody::String(s) => Some(s.clazz),
            BlockBody::WeakRef(w) => Some(w.clazz),
            BlockBody::ObjectArray(a) => Some(a.clazz),
            BlockBody::PrimitiveArray(a) => Some(a.clazz),
            _ => None,
        }
    }

    /// Every reference the body holds, weak referents included. Used to
    /// keep a block under construction alive across a collection.
    pub fn references(&self) -> Vec<ObjectId> {
        let mut refs: Vec<ObjectId> = self.class().into_iter().collect();
        match self {
            BlockBody::Instance(o) => refs.extend(o.fields.iter().filter_map(|c| c.as_object())),
            BlockBody::Throwable(t) => {
                refs.extend(t.fields.iter().filter_map(|c| c.as_object()));
                refs.extend(t.message);
                refs.extend(t.backtrace);
            }
            BlockBody::Mirror(m) => refs.push(m.referent),
            BlockBody::WeakRef(w) => {
                refs.extend(w.fields.iter().filter_map(|c| c.as_object()));
                refs.extend(w.referent);
            }
            BlockBody::ObjectArray(a) => refs.extend(a.elements.iter().flatten()),
            BlockBody::Clazz(c) => c.for_each_reference(|id| refs.push(id)),
            _ => {}
        }
        refs
    }
}

#[derive(Debug, Clone)]
pub struct Block {
    header: BlockHeader,
    pub body: BlockBody,
}

impl Block {
    pub fn header(&self) -> &BlockHeader {
        &self.header
    }

    pub fn alloc_type(&self) -> Option<AllocType> {
        self.header.tag()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HeapStats {
    pub live_blocks: usize,
    pub bytes_in_use: usize,
    pub limit: usize,
    pub collections: usize,
    pub reclaimed_total: usize,
}

pub struct Heap {
    pub(crate) blocks: Vec<Option<Block>>,
    free_list: Vec<usize>,
    marks: Vec<u64>,
    allocator: Box<dyn RawAllocator>,
    live_blocks: usize,
    collections: usize,
    reclaimed_total: usize,
}

impl Heap {
    pub fn new(allocator: Box<dyn RawAllocator>) -> Self {
        Self {
            blocks: Vec::with_capacity(1024),
            free_list: Vec::new(),
            marks: Vec::new(),
            allocator,
            live_blocks: 0,
            collections: 0,
            reclaimed_total: 0,
        }
    }

    /// Places `body` in a new block. On exhaustion the body is handed back
    /// so the caller can collect and retry.
    pub fn alloc(&mut self, tag: AllocType, body: BlockBody) -> Result<ObjectId, BlockBody> {
        let size = HEADER_SIZE + body.payload_size();
        let Ok(size32) = u32::try_from(size) else {
            return Err(body);
        };
        if self.free_list.is_empty() && self.blocks.len() > ObjectId::MAX_INDEX {
            return Err(body);
        }
        if !self.allocator.reserve(size) {
            return Err(body);
        }
        let block = Block { header: BlockHeader { tag: tag as u8, size: size32 }, body };
        self.live_blocks += 1;
        if let Some(idx) = self.free_list.pop() {
            self.blocks[idx] = Some(block);
            Ok(ObjectId(idx))
        } else {
            self.blocks.push(Some(block));
            Ok(ObjectId(self.blocks.len() - 1))
        }
    }

    /// Zero-filled opaque block.
    pub fn calloc(&mut self, size: usize, tag: AllocType) -> Result<ObjectId, BlockBody> {
        self.alloc(tag, BlockBody::Data(vec![0; size].into_boxed_slice()))
    }

    /// Returns a block to the allocator. A header that fails the validity
    /// check means the heap is corrupt.
    pub fn free(&mut self, id: ObjectId) -> Result<(), VmExit> {
        let Some(block) = self.blocks.get(id.0).and_then(Option::as_ref) else {
            return Err(VmExit::new(ExitCode::InvalidMemoryChunk, format!("free of unallocated block {}", id.0)));
        };
        if !self.is_valid(&block.header) {
            return Err(invalid_chunk(id, &block.header));
        }
        self.release(id.0);
        Ok(())
    }

    fn release(&mut self, idx: usize) {
        if let Some(block) = self.blocks[idx].take() {
            self.allocator.release(block.header.size());
            self.free_list.push(idx);
            self.live_blocks -= 1;
        }
    }

    fn is_valid(&self, header: &BlockHeader) -> bool {
        header.tag().is_some() && header.size() >= HEADER_SIZE && header.size() <= self.allocator.limit()
    }

    pub fn contains(&self, id: ObjectId) -> bool {
        self.get(id).is_some()
    }

    pub fn get(&self, id: ObjectId) -> Option<&Block> {
        self.blocks.get(id.0).and_then(Option::as_ref)
    }

    pub fn get_mut(&mut self, id: ObjectId) -> Option<&mut Block> {
        self.blocks.get_mut(id.0).and_then(Option::as_mut)
    }

    pub fn body(&self, id: ObjectId) -> Option<&BlockBody> {
        self.get(id).map(|b| &b.body)
    }

    pub fn body_mut(&mut self, id: ObjectId) -> Option<&mut BlockBody> {
        self.get_mut(id).map(|b| &mut b.body)
    }

    pub fn tag(&self, id: ObjectId) -> Option<AllocType> {
        self.get(id).and_then(Block::alloc_type)
    }

    pub fn clazz(&self, id: ObjectId) -> Option<&Clazz> {
        clazz_in(&self.blocks, id)
    }

    pub fn clazz_mut(&mut self, id: ObjectId) -> Option<&mut Clazz> {
        match self.body_mut(id)? {
            BlockBody::Clazz(c) => Some(c),
            _ => None,
        }
    }

    pub fn utf_bytes(&self, id: ObjectId) -> Option<&[u8]> {
        match self.body(id)? {
            BlockBody::Utf(bytes) => Some(bytes),
            _ => None,
        }
    }

    pub fn string_bytes(&self, id: ObjectId) -> Option<&[u8]> {
        let BlockBody::String(s) = self.body(id)? else {
            return None;
        };
        match &s.chars {
            StringChars::Pooled { utf, offset, length } => {
                let start = *offset as usize;
                self.utf_bytes(*utf)?.get(start..start + *length as usize)
            }
            StringChars::Owned(bytes) => Some(bytes),
        }
    }

    pub fn is_marked(&self, id: ObjectId) -> bool {
        is_marked(&self.marks, id.0)
    }

    pub fn limit(&self) -> usize {
        self.allocator.limit()
    }

    pub fn stats(&self) -> HeapStats {
        HeapStats {
            live_blocks: self.live_blocks,
            bytes_in_use: self.allocator.in_use(),
            limit: self.allocator.limit(),
            collections: self.collections,
            reclaimed_total: self.reclaimed_total,
        }
    }

    /// Marks everything reachable from `roots`. Weak referents are not
    /// traced here.
    pub(crate) fn mark_from(&mut self, roots: Vec<ObjectId>) {
        self.marks.clear();
        let blocks = &self.blocks;
        let marks = &mut self.marks;
        let mut pending = roots;

        while let Some(id) = pending.pop() {
            let Some(block) = blocks.get(id.0).and_then(Option::as_ref) else {
                continue;
            };
            if !set_mark(marks, id.0) {
                continue;
            }
            match block.alloc_type() {
                Some(
                    AllocType::Object
                    | AllocType::WeakReference
                    | AllocType::ArrayOfObject
                    | AllocType::InstanceClazz
                    | AllocType::ArrayClazz,
                ) => trace_body(blocks, &block.body, &mut pending),
                // Static blocks, primitive storage and primitive classes
                // hold no collectable references.
                _ => {}
            }
        }
    }

    /// Clears referents of live weak references whose target did not get
    /// marked. Returns how many were cleared.
    pub(crate) fn clear_dead_referents(&mut self) -> usize {
        let dead: Vec<usize> = self
            .blocks
            .iter()
            .enumerate()
            .filter_map(|(idx, slot)| {
                let block = slot.as_ref()?;
                if block.alloc_type() != Some(AllocType::WeakReference) || !is_marked(&self.marks, idx) {
                    return None;
                }
                let BlockBody::WeakRef(w) = &block.body else {
                    return None;
                };
                let referent = w.referent?;
                let live = is_marked(&self.marks, referent.0)
                    || self.tag(referent) == Some(AllocType::Static);
                (!live).then_some(idx)
            })
            .collect();

        for &idx in &dead {
            if let Some(Block { body: BlockBody::WeakRef(w), .. }) = self.blocks[idx].as_mut() {
                w.referent = None;
            }
        }
        dead.len()
    }

    /// Reclaims every unmarked, non-static block and returns their ids.
    pub(crate) fn sweep(&mut self) -> Result<Vec<ObjectId>, VmExit> {
        let mut reclaimed = Vec::new();
        for idx in 0..self.blocks.len() {
            let Some(block) = &self.blocks[idx] else {
                continue;
            };
            if block.alloc_type() == Some(AllocType::Static) || is_marked(&self.marks, idx) {
                continue;
            }
            if !self.is_valid(&block.header) {
                return Err(invalid_chunk(ObjectId(idx), &block.header));
            }
            self.release(idx);
            reclaimed.push(ObjectId(idx));
        }

        self.marks.clear();
        self.collections += 1;
        self.reclaimed_total += reclaimed.len();
        Ok(reclaimed)
    }

    #[cfg(test)]
    pub(crate) fn header_mut(&mut self, id: ObjectId) -> Option<&mut BlockHeader> {
        self.get_mut(id).map(|b| &mut b.header)
    }
}

fn invalid_chunk(id: ObjectId, header: &BlockHeader) -> VmExit {
    VmExit::new(
        ExitCode::InvalidMemoryChunk,
        format!("block {} has tag {} size {}", id.0, header.tag, header.size),
    )
}

fn clazz_in(blocks: &[Option<Block>], id: ObjectId) -> Option<&Clazz> {
    match &blocks.get(id.0)?.as_ref()?.body {
        BlockBody::Clazz(c) => Some(c),
        _ => None,
    }
}

fn trace_body(blocks: &[Option<Block>], body: &BlockBody, pending: &mut Vec<ObjectId>) {
    let trace_fields = |clazz: ObjectId, fields: &[Cell], pending: &mut Vec<ObjectId>| {
        pending.push(clazz);
        if let Some(layout) = clazz_in(blocks, clazz).map(|c| &c.layout) {
            for slot in layout.reference_slots() {
                if let Some(id) = fields.get(slot).and_then(|c| c.as_object()) {
                    pending.push(id);
                }
            }
        }
    };
    match body {
        BlockBody::Instance(o) => trace_fields(o.clazz, &o.fields, pending),
        BlockBody::Throwable(t) => {
            trace_fields(t.clazz, &t.fields, pending);
            pending.extend(t.message);
            pending.extend(t.backtrace);
        }
        BlockBody::Mirror(m) => {
            pending.push(m.clazz);
            pending.push(m.referent);
        }
        BlockBody::WeakRef(w) => trace_fields(w.clazz, &w.fields, pending),
        BlockBody::ObjectArray(a) => {
            pending.push(a.clazz);
            pending.extend(a.elements.iter().flatten());
        }
        BlockBody::Clazz(c) => c.for_each_reference(|id| pending.push(id)),
        _ => {}
    }
}

fn is_marked(marks: &[u64], idx: usize) -> bool {
    marks.get(idx >> 6).is_some_and(|w| (*w & (1u64 << (idx & 63))) != 0)
}

fn set_mark(marks: &mut Vec<u64>, idx: usize) -> bool {
    let word = idx >> 6;
    if word >= marks.len() {
        marks.resize(word + 1, 0);
    }
    let mask = 1u64 << (idx & 63);
    if marks[word] & mask != 0 {
        return false;
    }
    marks[word] |= mask;
    true
}

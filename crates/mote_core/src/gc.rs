//! Garbage collection infrastructure - base types.

/// Handle to a heap block.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObjectId(pub usize);

impl ObjectId {
    /// Largest index a cell payload can carry.
    pub const MAX_INDEX: usize = crate::value::PAYLOAD_MASK as usize - 1;
}

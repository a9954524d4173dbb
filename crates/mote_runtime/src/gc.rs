//! Collection cycles for the VM.
//!
//! This module contains:
//! - collect_gc_roots: every root the mark phase starts from
//! - gc: full mark, weak clearing and sweep
//! - gc_with_roots: the same with extra roots, used by the allocator retry

use mote_core::{ObjectId, VmExit};

use crate::vm::Vm;

impl Vm {
    /// Collect all GC roots from the VM state
    fn collect_gc_roots(&self, extra_roots: &[ObjectId]) -> Vec<ObjectId> {
        let estimated_roots = extra_roots.len()
            + self.roots.permanent.top()
            + self.roots.transient.top()
            + self.threads.len()
            + self.exception_frames.len()
            + 64;

        let mut roots: Vec<ObjectId> = Vec::with_capacity(estimated_roots);
        roots.extend_from_slice(extra_roots);
        roots.extend(self.roots.objects());
        self.stack.visit_roots(&mut |cell| {
            if let Some(id) = cell.as_object() {
                roots.push(id);
            }
        });
        roots.extend_from_slice(&self.threads);
        // Thrown but not yet caught.
        roots.extend(self.exception_frames.iter().filter_map(|f| f.pending));

        #[cfg(feature = "debugger")]
        if let Some(session) = &self.debug {
            roots.extend(session.pins.iter());
        }

        roots
    }

    /// Run a full collection. Returns the number of blocks reclaimed.
    pub fn gc(&mut self) -> Result<usize, VmExit> {
        self.gc_with_roots(&[])
    }

    pub(crate) fn gc_with_roots(&mut self, extra_roots: &[ObjectId]) -> Result<usize, VmExit> {
        let roots = self.collect_gc_roots(extra_roots);
        let root_count = roots.len();

        self.heap.mark_from(roots);
        let cleared = self.heap.clear_dead_referents();
        let reclaimed = self.heap.sweep()?;

        #[cfg(feature = "debugger")]
        self.forget_reclaimed(&reclaimed);

        let stats = self.heap.stats();
        log::debug!(
            "gc #{}: {} roots, {} reclaimed, {} weak referents cleared, {} live blocks, {} bytes in use",
            stats.collections,
            root_count,
            reclaimed.len(),
            cleared,
            stats.live_blocks,
            stats.bytes_in_use
        );
        Ok(reclaimed.len())
    }
}

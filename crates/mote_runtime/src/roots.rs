//! Permanent and transient root stacks.
//!
//! Both stacks have a fixed capacity and overflow is fatal. Transient roots
//! are never popped one by one: a scope records the top on entry and
//! rewinds to it on exit.

use std::ops::{Deref, DerefMut};

use mote_core::{Cell, ExitCode, ObjectId, VmExit};

use crate::exception::VmResult;
use crate::vm::Vm;

#[derive(Debug)]
pub struct RootStack {
    cells: Vec<Cell>,
    capacity: usize,
    overflow: ExitCode,
}

impl RootStack {
    pub fn new(capacity: usize, overflow: ExitCode) -> Self {
        Self { cells: Vec::with_capacity(capacity), capacity, overflow }
    }

    #[inline]
    pub fn push(&mut self, cell: Cell) -> Result<(), VmExit> {
        if self.cells.len() >= self.capacity {
            return Err(VmExit::new(self.overflow, format!("{} roots in use", self.capacity)));
        }
        self.cells.push(cell);
        Ok(())
    }

    #[inline]
    pub fn top(&self) -> usize {
        self.cells.len()
    }

    /// Drops every root above `mark`.
    #[inline]
    pub fn rewind(&mut self, mark: usize) {
        self.cells.truncate(mark);
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn iter(&self) -> impl Iterator<Item = Cell> + '_ {
        self.cells.iter().copied()
    }
}

#[derive(Debug)]
pub struct Roots {
    pub permanent: RootStack,
    pub transient: RootStack,
}

impl Roots {
    pub fn new(permanent: usize, transient: usize) -> Self {
        Self {
            permanent: RootStack::new(permanent, ExitCode::PermanentRootsExhausted),
            transient: RootStack::new(transient, ExitCode::TransientRootsExhausted),
        }
    }

    pub(crate) fn objects(&self) -> impl Iterator<Item = ObjectId> + '_ {
        self.permanent
            .iter()
            .chain(self.transient.iter())
            .filter_map(|c| c.as_object())
    }
}

/// Scope over the transient root stack. Derefs to the VM; dropping the
/// guard rewinds the transient top to where it was on creation.
pub struct TransientBlock<'vm> {
    vm: &'vm mut Vm,
    mark: usize,
}

impl<'vm> TransientBlock<'vm> {
    pub(crate) fn new(vm: &'vm mut Vm) -> Self {
        let mark = vm.roots.transient.top();
        Self { vm, mark }
    }

    pub fn mark(&self) -> usize {
        self.mark
    }
}

impl Deref for TransientBlock<'_> {
    type Target = Vm;

    fn deref(&self) -> &Vm {
        self.vm
    }
}

impl DerefMut for TransientBlock<'_> {
    fn deref_mut(&mut self) -> &mut Vm {
        self.vm
    }
}

impl Drop for TransientBlock<'_> {
    fn drop(&mut self) {
        self.vm.roots.transient.rewind(self.mark);
    }
}

impl Vm {
    /// Pins `id` for the lifetime of the VM.
    pub fn pin(&mut self, id: ObjectId) -> Result<(), VmExit> {
        self.roots.permanent.push(Cell::from_ref(id))
    }

    pub fn make_transient_root(&mut self, id: ObjectId) -> Result<ObjectId, VmExit> {
        self.roots.transient.push(Cell::from_ref(id))?;
        Ok(id)
    }

    /// Roots a cell if it holds a reference; integers are ignored.
    pub fn root_cell(&mut self, cell: Cell) -> Result<(), VmExit> {
        if cell.is_ref() && !cell.is_null() {
            self.roots.transient.push(cell)?;
        }
        Ok(())
    }

    pub fn transient_block(&mut self) -> TransientBlock<'_> {
        TransientBlock::new(self)
    }

    /// Runs `body` with a transient scope that is rewound on every exit path.
    pub fn with_transient<T>(&mut self, body: impl FnOnce(&mut Vm) -> VmResult<T>) -> VmResult<T> {
        let mut block = self.transient_block();
        body(&mut block)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn overflow_is_fatal_with_stack_specific_code() {
        let mut roots = Roots::new(1, 2);
        roots.permanent.push(Cell::ZERO).unwrap();
        let err = roots.permanent.push(Cell::ZERO).unwrap_err();
        assert_eq!(err.kind(), Some(ExitCode::PermanentRootsExhausted));

        roots.transient.push(Cell::ZERO).unwrap();
        roots.transient.push(Cell::ZERO).unwrap();
        let err = roots.transient.push(Cell::ZERO).unwrap_err();
        assert_eq!(err.kind(), Some(ExitCode::TransientRootsExhausted));
    }

    #[test]
    fn rewind_is_the_pop() {
        let mut stack = RootStack::new(8, ExitCode::TransientRootsExhausted);
        stack.push(Cell::from_int(1)).unwrap();
        let mark = stack.top();
        stack.push(Cell::from_int(2)).unwrap();
        stack.push(Cell::from_int(3)).unwrap();
        stack.rewind(mark);
        assert_eq!(stack.top(), 1);
        assert_eq!(stack.iter().map(|c| c.as_int()).collect::<Vec<_>>(), vec![1]);
    }
}

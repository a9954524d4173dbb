//! Platform capability traits for dependency injection.
//!
//! The VM core never touches the outside world directly: time, raw memory,
//! console output and files all go through these traits so embedders and
//! tests can substitute their own.

use std::cell::RefCell;
use std::rc::Rc;
use std::time::{SystemTime, UNIX_EPOCH};

use crate::fs::{FileSystem, StdFileSystem};

pub const DEFAULT_HEAP_MAX: usize = 16 * 1024 * 1024;

pub trait Clock {
    /// Milliseconds since 1970-01-01 UTC.
    fn now_millis(&self) -> i64;
}

pub struct SystemClock;

impl Clock for SystemClock {
    fn now_millis(&self) -> i64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis() as i64)
            .unwrap_or(0)
    }
}

/// Source of raw heap bytes. The heap charges every block against it and
/// returns the bytes when the block is freed.
pub trait RawAllocator {
    /// Claims `bytes`; `false` when the request cannot be satisfied.
    fn reserve(&mut self, bytes: usize) -> bool;
    fn release(&mut self, bytes: usize);
    fn in_use(&self) -> usize;
    fn limit(&self) -> usize;
}

/// Allocator bounded by a fixed byte budget.
#[derive(Debug)]
pub struct BudgetAllocator {
    limit: usize,
    used: usize,
}

impl BudgetAllocator {
    pub fn new(limit: usize) -> Self {
        Self { limit, used: 0 }
    }
}

impl RawAllocator for BudgetAllocator {
    fn reserve(&mut self, bytes: usize) -> bool {
        match self.used.checked_add(bytes) {
            Some(total) if total <= self.limit => {
                self.used = total;
                true
            }
            _ => false,
        }
    }

    fn release(&mut self, bytes: usize) {
        self.used = self.used.saturating_sub(bytes);
    }

    fn in_use(&self) -> usize {
        self.used
    }

    fn limit(&self) -> usize {
        self.limit
    }
}

pub trait Console {
    fn write_line(&mut self, line: &str);
}

pub struct StdConsole;

impl Console for StdConsole {
    fn write_line(&mut self, line: &str) {
        println!("{line}");
    }
}

/// Console that records lines in memory. Clones share the same buffer.
#[derive(Clone, Default)]
pub struct MemoryConsole {
    lines: Rc<RefCell<Vec<String>>>,
}

impl MemoryConsole {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn lines(&self) -> Vec<String> {
        self.lines.borrow().clone()
    }

    pub fn contents(&self) -> String {
        self.lines.borrow().join("\n")
    }
}

impl Console for MemoryConsole {
    fn write_line(&mut self, line: &str) {
        self.lines.borrow_mut().push(line.to_string());
    }
}

pub struct Capabilities {
    pub clock: Box<dyn Clock>,
    pub allocator: Box<dyn RawAllocator>,
    pub console: Box<dyn Console>,
    pub fs: Box<dyn FileSystem>,
}

impl Capabilities {
    /// Std-backed capabilities with a heap budget of `heap_max` bytes.
    pub fn for_heap(heap_max: usize) -> Self {
        Self {
            clock: Box::new(SystemClock),
            allocator: Box::new(BudgetAllocator::new(heap_max)),
            console: Box::new(StdConsole),
            fs: Box::new(StdFileSystem::new()),
        }
    }
}

impl Default for Capabilities {
    fn default() -> Self {
        Self::for_heap(DEFAULT_HEAP_MAX)
    }
}

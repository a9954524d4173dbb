//! Runtime configuration.

use mote_core::capabilities::DEFAULT_HEAP_MAX;
use mote_core::{ExitCode, VmExit};

pub const DEFAULT_HEAP_MIN: usize = 256 * 1024;
/// Smallest heap the VM will boot with.
pub const MIN_HEAP: usize = 64 * 1024;
pub const DEFAULT_PERMANENT_ROOTS: usize = 1024;
pub const DEFAULT_TRANSIENT_ROOTS: usize = 4096;
pub const DEFAULT_UTF_BUCKETS: usize = 512;
pub const DEFAULT_INTERN_BUCKETS: usize = 256;
pub const DEFAULT_BACKTRACE_DEPTH: usize = 16;

pub const CLASS_PATH_SEPARATOR: char = if cfg!(windows) { ';' } else { ':' };
pub const FILE_SEPARATOR: char = std::path::MAIN_SEPARATOR;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VmConfig {
    pub heap_min: usize,
    pub heap_max: usize,
    pub permanent_roots: usize,
    pub transient_roots: usize,
    pub utf_buckets: usize,
    pub intern_buckets: usize,
    pub backtrace_depth: usize,
    pub exit_on_uncaught_exception: bool,
    pub assertions: bool,
    pub boot_class_path: Vec<String>,
    pub class_path: Vec<String>,
    pub home: Option<String>,
}

impl Default for VmConfig {
    fn default() -> Self {
        Self {
            heap_min: DEFAULT_HEAP_MIN,
            heap_max: DEFAULT_HEAP_MAX,
            permanent_roots: DEFAULT_PERMANENT_ROOTS,
            transient_roots: DEFAULT_TRANSIENT_ROOTS,
            utf_buckets: DEFAULT_UTF_BUCKETS,
            intern_buckets: DEFAULT_INTERN_BUCKETS,
            backtrace_depth: DEFAULT_BACKTRACE_DEPTH,
            exit_on_uncaught_exception: false,
            assertions: false,
            boot_class_path: Vec::new(),
            class_path: Vec::new(),
            home: None,
        }
    }
}

impl VmConfig {
    pub fn validate(&self) -> Result<(), VmExit> {
        if self.heap_max < MIN_HEAP {
            return Err(VmExit::new(
                ExitCode::InvalidHeapBounds,
                format!("maximum heap {} is below {}", self.heap_max, MIN_HEAP),
            ));
        }
        if self.heap_min > self.heap_max {
            return Err(VmExit::new(
                ExitCode::InvalidHeapBounds,
                format!("minimum heap {} exceeds maximum {}", self.heap_min, self.heap_max),
            ));
        }
        Ok(())
    }

    /// Splits a class path on the platform separator, dropping empty entries.
    pub fn split_class_path(path: &str) -> Vec<String> {
        path.split(CLASS_PATH_SEPARATOR)
            .filter(|entry| !entry.is_empty())
            .map(str::to_owned)
            .collect()
    }
}

//! Core types for the Mote virtual machine.
//!
//! This crate contains the types every other layer builds on:
//! - `Cell` - tagged word holding an int or an object reference
//! - `ObjectId` - handle to a heap block
//! - `BuildFlags` - the compiled-in feature set
//! - `Capabilities` - platform capability traits (clock, allocator, console, files)
//! - `Transport` - the debugger socket
//! - `VmExit` / `ExitCode` - fatal exits

pub mod capabilities;
pub mod exit;
pub mod flags;
pub mod fs;
pub mod gc;
pub mod transport;
pub mod value;

pub use capabilities::{
    BudgetAllocator, Capabilities, Clock, Console, MemoryConsole, RawAllocator, StdConsole,
    SystemClock, DEFAULT_HEAP_MAX,
};
pub use exit::{ExitCode, VmExit};
pub use flags::BuildFlags;
pub use fs::{FileHandle, FileSystem, FsError, MemoryFileSystem, OpenMode, SeekOrigin, StdFileSystem};
pub use gc::ObjectId;
pub use transport::{LoopbackTransport, TcpTransport, Transport, TransportError};
pub use value::{Cell, Halves};

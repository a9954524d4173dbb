//! Mote VM runtime core.
//!
//! The execution substrate shared by the (external) interpreter, class
//! loader and native methods:
//! - `heap` - typed blocks, allocation and the mark/sweep machinery
//! - `roots` - permanent and transient root stacks
//! - `gc` - root collection and collection cycles
//! - `pools` - UTF and interned-string pools
//! - `exception` - protected blocks, throwables and the fatal escape
//! - `backtrace` - frame capture at throwable construction
//! - `debugger` - object id map and debugger pins (feature `debugger`)

#![allow(clippy::new_without_default)]
#![allow(clippy::too_many_arguments)]

pub mod backtrace;
pub mod class;
pub mod config;
pub mod exception;
pub mod heap;
pub mod object;
pub mod pools;
pub mod roots;
pub mod system;
mod classes;
mod gc;
mod objects;
mod vm;

#[cfg(feature = "debugger")]
pub mod debugger;

pub use backtrace::{Backtrace, EmptyStack, ExecutionStack, Frame, FrameRecord, FrameStack, LineEntry, MethodInfo};
pub use class::{ArrayComponent, ClassDef, Clazz, ClazzKind, FieldKind, FieldLayout, PrimitiveType, RefTypeTag};
pub use config::VmConfig;
pub use exception::{DomainError, Outcome, Throw, VmResult};
pub use heap::{AllocType, Block, BlockBody, Heap, HeapStats};
pub use pools::{Pool, PoolKind};
pub use object::{ClassMirror, Instance, JavaString, ObjectArray, PrimitiveArray, StringChars, Throwable, WeakRef};
pub use roots::{RootStack, Roots, TransientBlock};
pub use system::SystemClass;
pub use vm::Vm;

pub use mote_core::{Cell, ExitCode, ObjectId, VmExit};

//! The VM context threaded through every core operation.

use ahash::RandomState;
use hashbrown::HashMap;
use mote_core::value::PAYLOAD_MASK;
use mote_core::{BuildFlags, Capabilities, Cell, Clock, Console, ExitCode, FileSystem, ObjectId, VmExit};

use crate::backtrace::{EmptyStack, ExecutionStack};
use crate::class::{ArrayComponent, PrimitiveType};
use crate::config::VmConfig;
use crate::exception::{ExceptionFrame, Throw, VmResult};
use crate::heap::{AllocType, BlockBody, Heap};
use crate::pools::{Pool, PoolKind};
use crate::roots::Roots;
use crate::system::{SystemClass, SystemClasses};

#[cfg(feature = "debugger")]
use crate::debugger::DebugSession;

pub struct Vm {
    pub heap: Heap,
    pub roots: Roots,
    pub config: VmConfig,
    pub(crate) utf_pool: Pool,
    pub(crate) intern_pool: Pool,
    pub(crate) exception_frames: Vec<ExceptionFrame>,
    pub(crate) system: SystemClasses,
    pub(crate) primitive_classes: [Option<ObjectId>; 8],
    pub(crate) array_classes: HashMap<ArrayComponent, ObjectId, RandomState>,
    pub(crate) threads: Vec<ObjectId>,
    pub(crate) stack: Box<dyn ExecutionStack>,
    pub(crate) oom: Option<ObjectId>,
    clock: Box<dyn Clock>,
    console: Box<dyn Console>,
    fs: Box<dyn FileSystem>,
    #[cfg(feature = "debugger")]
    pub(crate) debug: Option<DebugSession>,
}

/// Checks the representation assumptions the heap and the debugger wire
/// rely on.
fn verify_type_sizes() -> Result<(), VmExit> {
    let cell = std::mem::size_of::<Cell>();
    if cell != 8 {
        return Err(VmExit::new(ExitCode::IncorrectTypeSizes, format!("cell is {cell} bytes")));
    }
    if std::mem::size_of::<usize>() < 4 || ObjectId::MAX_INDEX as u64 >= PAYLOAD_MASK {
        return Err(VmExit::new(ExitCode::IncorrectTypeSizes, "object index does not fit a cell payload"));
    }
    Ok(())
}

impl Vm {
    /// Creates a VM and loads its system classes. A fatal exit on the way is
    /// also written to the console before it is returned.
    pub fn new(config: VmConfig, caps: Capabilities) -> Result<Self, VmExit> {
        let Capabilities { clock, allocator, mut console, fs } = caps;
        if let Err(exit) = verify_type_sizes().and_then(|()| config.validate()) {
            if BuildFlags::CURRENT.console {
                console.write_line(&exit.to_string());
            }
            return Err(exit);
        }

        let mut vm = Self {
            heap: Heap::new(allocator),
            roots: Roots::new(config.permanent_roots, config.transient_roots),
            utf_pool: Pool::new(PoolKind::Utf, config.utf_buckets),
            intern_pool: Pool::new(PoolKind::Interned, config.intern_buckets),
            exception_frames: Vec::new(),
            system: SystemClasses::default(),
            primitive_classes: [None; 8],
            array_classes: HashMap::default(),
            threads: Vec::new(),
            stack: Box::new(EmptyStack),
            oom: None,
            config,
            clock,
            console,
            fs,
            #[cfg(feature = "debugger")]
            debug: None,
        };

        let boot_failure = match vm.bootstrap_system_classes() {
            Ok(()) => None,
            Err(Throw::Exit(exit)) => Some(exit),
            Err(Throw::Exception(t)) => {
                let what = vm.describe_throwable(t);
                Some(VmExit::new(ExitCode::SystemClassNotLoadable, what))
            }
        };
        if let Some(exit) = boot_failure {
            vm.console_line(&exit.to_string());
            return Err(exit);
        }
        log::info!(
            "vm ready: heap {}..{} bytes, {} blocks after boot",
            vm.config.heap_min,
            vm.config.heap_max,
            vm.heap.stats().live_blocks
        );
        Ok(vm)
    }

    pub fn now_millis(&self) -> i64 {
        self.clock.now_millis()
    }

    /// Writes a line on the console when console output is compiled in.
    pub fn console_line(&mut self, line: &str) {
        if BuildFlags::CURRENT.console {
            self.console.write_line(line);
        }
    }

    pub fn fs(&mut self) -> &mut dyn FileSystem {
        self.fs.as_mut()
    }

    pub fn set_execution_stack(&mut self, stack: Box<dyn ExecutionStack>) {
        self.stack = stack;
    }

    pub fn execution_stack(&self) -> &dyn ExecutionStack {
        self.stack.as_ref()
    }

    pub fn system_class(&self, class: SystemClass) -> Result<ObjectId, VmExit> {
        self.system
            .get(class)
            .ok_or_else(|| VmExit::new(ExitCode::SystemClassNotLoadable, class.name()))
    }

    pub fn primitive_class(&self, ty: PrimitiveType) -> Option<ObjectId> {
        self.primitive_classes[ty.index()]
    }

    /// Allocates a block, collecting once and retrying when the heap is
    /// exhausted. A second failure throws `OutOfMemoryError`, or exits when
    /// the error instance does not exist yet.
    pub fn alloc(&mut self, tag: AllocType, body: BlockBody) -> VmResult<ObjectId> {
        let body = match self.heap.alloc(tag, body) {
            Ok(id) => return Ok(id),
            Err(body) => body,
        };
        let requested = body.payload_size();
        log::debug!("allocation of {requested} bytes failed, collecting");
        self.gc_with_roots(&body.references())?;
        match self.heap.alloc(tag, body) {
            Ok(id) => Ok(id),
            Err(_) => Err(self.out_of_memory(requested)),
        }
    }

    pub fn calloc(&mut self, size: usize, tag: AllocType) -> VmResult<ObjectId> {
        self.alloc(tag, BlockBody::Data(vec![0; size].into_boxed_slice()))
    }

    pub fn free(&mut self, id: ObjectId) -> Result<(), VmExit> {
        self.heap.free(id)?;
        #[cfg(feature = "debugger")]
        self.forget_reclaimed(&[id]);
        Ok(())
    }

    pub(crate) fn out_of_memory(&mut self, requested: usize) -> Throw {
        let stats = self.heap.stats();
        log::warn!("heap exhausted: {requested} bytes requested, {} of {} in use", stats.bytes_in_use, stats.limit);
        match self.oom {
            Some(oom) => self.throw(oom),
            None => self.exit(ExitCode::HeapExhausted, format!("{requested} bytes requested")),
        }
    }

    /// Float constants need the `float` feature.
    pub fn require_float_support(&self) -> Result<(), VmExit> {
        if BuildFlags::CURRENT.float {
            Ok(())
        } else {
            Err(VmExit::new(ExitCode::FloatsNotSupported, "class file uses floating point"))
        }
    }

    /// `long` and `double` values need the `native-int64` feature.
    pub fn require_int64_support(&self) -> Result<(), VmExit> {
        if BuildFlags::CURRENT.native_int64 {
            Ok(())
        } else {
            Err(VmExit::new(ExitCode::Int64NotSupported, "class file uses 64-bit values"))
        }
    }

    pub fn register_thread(&mut self, thread: ObjectId) {
        if !self.threads.contains(&thread) {
            self.threads.push(thread);
        }
    }

    pub fn unregister_thread(&mut self, thread: ObjectId) {
        self.threads.retain(|t| *t != thread);
    }

    pub fn threads(&self) -> &[ObjectId] {
        &self.threads
    }
}

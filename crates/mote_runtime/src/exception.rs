//! Protected blocks, throwables and the fatal escape.
//!
//! A domain exception travels up the native call chain as
//! `Err(Throw::Exception(..))` until it reaches the nearest
//! [`Vm::protect`], which rewinds the transient roots to the mark taken on
//! entry and hands the throwable back as [`Outcome::Caught`]. A fatal exit
//! is `Err(Throw::Exit(..))` and passes through every protected block up to
//! [`Vm::enter`], the single outermost boundary.

use mote_core::{ExitCode, ObjectId, VmExit};

use crate::heap::{AllocType, BlockBody};
use crate::object::Throwable;
use crate::system::SystemClass;
use crate::vm::Vm;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Throw {
    #[error("uncaught exception {0:?}")]
    Exception(ObjectId),
    #[error(transparent)]
    Exit(#[from] VmExit),
}

pub type VmResult<T> = Result<T, Throw>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome<T> {
    Completed(T),
    Caught(ObjectId),
}

impl<T> Outcome<T> {
    pub fn caught(&self) -> Option<ObjectId> {
        match self {
            Outcome::Caught(t) => Some(*t),
            Outcome::Completed(_) => None,
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub(crate) struct ExceptionFrame {
    pub(crate) transient_mark: usize,
    pub(crate) pending: Option<ObjectId>,
}

/// Errors that surface to programs as `java.lang` throwables.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DomainError {
    Arithmetic,
    NullPointer,
    ClassCast,
    ArrayIndexOutOfBounds,
    NegativeArraySize,
    OutOfMemory,
    StackOverflow,
    Verify,
    ClassNotFound,
    ClassFormat,
    Linkage,
    Io,
}

impl DomainError {
    pub fn system_class(self) -> SystemClass {
        match self {
            DomainError::Arithmetic => SystemClass::ArithmeticException,
            DomainError::NullPointer => SystemClass::NullPointerException,
            DomainError::ClassCast => SystemClass::ClassCastException,
            DomainError::ArrayIndexOutOfBounds => SystemClass::ArrayIndexOutOfBoundsException,
            DomainError::NegativeArraySize => SystemClass::NegativeArraySizeException,
            DomainError::OutOfMemory => SystemClass::OutOfMemoryError,
            DomainError::StackOverflow => SystemClass::StackOverflowError,
            DomainError::Verify => SystemClass::VerifyError,
            DomainError::ClassNotFound => SystemClass::ClassNotFoundException,
            DomainError::ClassFormat => SystemClass::ClassFormatError,
            DomainError::Linkage => SystemClass::LinkageError,
            DomainError::Io => SystemClass::IOException,
        }
    }
}

impl Vm {
    /// Runs `body` inside a protected block.
    ///
    /// Whether `body` completes or throws, the transient root stack is back
    /// at its entry mark and the exception frame is gone by the time this
    /// returns. A caught throwable is not rooted; re-root it before
    /// allocating if it must survive.
    pub fn protect<T>(&mut self, body: impl FnOnce(&mut Vm) -> VmResult<T>) -> Result<Outcome<T>, VmExit> {
        let mark = self.roots.transient.top();
        let depth = self.exception_frames.len();
        self.exception_frames.push(ExceptionFrame { transient_mark: mark, pending: None });

        let result = body(self);
        if let Err(Throw::Exit(exit)) = result {
            return Err(exit);
        }
        if self.exception_frames.len() != depth + 1 {
            return Err(VmExit::new(
                ExitCode::ExceptionFrameCorrupt,
                format!("expected {} frames, found {}", depth + 1, self.exception_frames.len()),
            ));
        }
        if let Some(frame) = self.exception_frames.pop() {
            self.roots.transient.rewind(frame.transient_mark);
        }

        match result {
            Ok(value) => Ok(Outcome::Completed(value)),
            Err(Throw::Exception(t)) => Ok(Outcome::Caught(t)),
            Err(Throw::Exit(exit)) => Err(exit),
        }
    }

    /// Records `throwable` in the innermost frame and returns the transfer
    /// to propagate with `?`.
    pub fn throw(&mut self, throwable: ObjectId) -> Throw {
        if let Some(frame) = self.exception_frames.last_mut() {
            frame.pending = Some(throwable);
        }
        Throw::Exception(throwable)
    }

    /// The fatal escape.
    pub fn exit(&mut self, code: ExitCode, message: impl Into<String>) -> Throw {
        let exit = VmExit::new(code, message);
        log::error!("{exit}");
        Throw::Exit(exit)
    }

    pub fn exception_depth(&self) -> usize {
        self.exception_frames.len()
    }

    /// Builds a runtime-raised throwable of class `clazz` with a captured
    /// backtrace and an optional message.
    pub fn create_exception(&mut self, clazz: ObjectId, message: Option<&str>) -> VmResult<ObjectId> {
        let Some(fields) = self.heap.clazz(clazz).map(|c| c.layout.initial_cells()) else {
            return Err(self.exit(ExitCode::InvariantViolated, format!("{clazz:?} is not a class")));
        };
        self.with_transient(|vm| {
            let throwable = Throwable { clazz, fields, message: None, backtrace: None, native_thrown: true };
            let t = vm.alloc(AllocType::Object, BlockBody::Throwable(throwable))?;
            vm.make_transient_root(t)?;

            let backtrace = vm.capture_backtrace()?;
            if let Some(BlockBody::Throwable(body)) = vm.heap.body_mut(t) {
                body.backtrace = backtrace;
            }
            if let Some(text) = message {
                let message = vm.new_string(text)?;
                if let Some(BlockBody::Throwable(body)) = vm.heap.body_mut(t) {
                    body.message = Some(message);
                }
            }
            Ok(t)
        })
    }

    /// Creates and throws the throwable matching `kind`. Failures while
    /// building it are returned in its place.
    pub fn throw_new(&mut self, kind: DomainError, message: Option<&str>) -> Throw {
        let clazz = match self.system_class(kind.system_class()) {
            Ok(clazz) => clazz,
            Err(exit) => return exit.into(),
        };
        match self.create_exception(clazz, message) {
            Ok(t) => self.throw(t),
            Err(err) => err,
        }
    }

    /// `java.lang.Foo: message` header of a throwable.
    pub fn describe_throwable(&self, throwable: ObjectId) -> String {
        let name = self
            .class_of(throwable)
            .and_then(|c| self.class_name(c))
            .map(|n| n.replace('/', "."))
            .unwrap_or_else(|| "<unknown>".to_string());
        match self.throwable_message(throwable) {
            Some(msg) => format!("{name}: {msg}"),
            None => name,
        }
    }

    /// Prints an uncaught throwable and its backtrace. Returns the process
    /// status, or the fatal exit when uncaught exceptions are fatal.
    pub fn report_uncaught(&mut self, throwable: ObjectId) -> Result<i32, VmExit> {
        let header = self.describe_throwable(throwable);
        log::warn!("uncaught exception: {header}");
        let mut lines = vec![format!("Exception in thread \"main\" {header}")];
        if let Some(backtrace) = self.throwable_backtrace(throwable) {
            lines.extend(backtrace.frames.iter().map(|f| format!("\tat {}", self.format_frame(f))));
        }
        for line in &lines {
            self.console_line(line);
        }
        if self.config.exit_on_uncaught_exception {
            return Err(VmExit::new(ExitCode::UncaughtException, header));
        }
        Ok(1)
    }

    /// Outermost boundary: runs `body` and turns its outcome into a
    /// process status. Fatal exits are printed to the console.
    pub fn enter(&mut self, body: impl FnOnce(&mut Vm) -> VmResult<()>) -> i32 {
        let mark = self.roots.transient.top();
        let result = body(self);
        self.exception_frames.clear();
        self.roots.transient.rewind(mark);

        let exit = match result {
            Ok(()) => return 0,
            Err(Throw::Exception(t)) => match self.report_uncaught(t) {
                Ok(status) => return status,
                Err(exit) => exit,
            },
            Err(Throw::Exit(exit)) => exit,
        };
        self.console_line(&exit.to_string());
        exit.code
    }
}

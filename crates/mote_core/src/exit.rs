//! Fatal exit codes.
//!
//! A fatal exit bypasses every protected block and ends the process. Codes
//! live in the 100..=133 range so they never collide with a program's own
//! `System.exit` status.

use std::fmt;

macro_rules! exit_codes {
    ($($name:ident = $code:literal => $text:literal,)*) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        #[repr(i32)]
        pub enum ExitCode {
            $($name = $code,)*
        }

        impl ExitCode {
            pub const ALL: &'static [ExitCode] = &[$(ExitCode::$name,)*];

            pub fn describe(self) -> &'static str {
                match self {
                    $(ExitCode::$name => $text,)*
                }
            }

            pub fn from_code(code: i32) -> Option<Self> {
                match code {
                    $($code => Some(ExitCode::$name),)*
                    _ => None,
                }
            }
        }
    };
}

exit_codes! {
    Unknown = 100 => "unknown error",
    NoMainClass = 101 => "no main class given",
    NoClasspath = 102 => "no class path given",
    SystemClassNotLoadable = 103 => "system class could not be loaded",
    MainMethodNotFound = 104 => "main method not found",
    HeapExhausted = 105 => "heap exhausted",
    TransientRootsExhausted = 106 => "transient roots exhausted",
    PermanentRootsExhausted = 107 => "permanent roots exhausted",
    FileHandlesExhausted = 108 => "file handles exhausted",
    InvalidMemoryChunk = 109 => "invalid memory chunk",
    IncorrectTypeSizes = 110 => "incorrect type sizes",
    FloatsNotSupported = 111 => "floating point not supported by this build",
    Int64NotSupported = 112 => "64-bit integers not supported by this build",
    UncaughtException = 113 => "uncaught exception",
    InvalidArgument = 114 => "invalid command line argument",
    InvalidHeapBounds = 115 => "invalid heap bounds",
    ClassFileUnreadable = 116 => "class file unreadable",
    ClassFormatUnsupported = 117 => "unsupported class file format",
    NativeMethodMissing = 118 => "native method missing",
    UnsupportedOpcode = 119 => "unsupported opcode",
    StackExhausted = 120 => "interpreter stack exhausted",
    ExceptionFrameCorrupt = 121 => "exception frame chain corrupt",
    ClassInitializationFailed = 122 => "class initialization failed",
    ThreadLimitReached = 123 => "thread limit reached",
    MonitorStateInvalid = 124 => "monitor state invalid",
    DebuggerConnectFailed = 125 => "debugger connection failed",
    DebuggerHandshakeFailed = 126 => "debugger handshake failed",
    DebuggerProtocolError = 127 => "debugger protocol error",
    ConsoleUnavailable = 128 => "console unavailable",
    InterpreterUnavailable = 129 => "no bytecode interpreter linked",
    InvariantViolated = 130 => "internal invariant violated",
    IoFailure = 131 => "i/o failure",
    HomeNotFound = 132 => "home directory not found",
    DebuggerTerminated = 133 => "terminated by debugger",
}

impl ExitCode {
    pub fn code(self) -> i32 {
        self as i32
    }
}

impl fmt::Display for ExitCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.code(), self.describe())
    }
}

/// A fatal VM exit: the process status plus an optional message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VmExit {
    pub code: i32,
    pub message: Option<String>,
}

impl VmExit {
    pub fn new(code: ExitCode, message: impl Into<String>) -> Self {
        Self {
            code: code.code(),
            message: Some(message.into()),
        }
    }

    pub fn bare(code: ExitCode) -> Self {
        Self {
            code: code.code(),
            message: None,
        }
    }

    pub fn kind(&self) -> Option<ExitCode> {
        ExitCode::from_code(self.code)
    }
}

impl fmt::Display for VmExit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "VM exit {}", self.code)?;
        if let Some(kind) = self.kind() {
            write!(f, " ({})", kind.describe())?;
        }
        if let Some(msg) = &self.message {
            write!(f, ": {msg}")?;
        }
        Ok(())
    }
}

impl std::error::Error for VmExit {}

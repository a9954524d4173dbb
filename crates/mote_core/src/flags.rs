//! Compiled-in feature set.
//!
//! Each flag mirrors a cargo feature of this crate. Some of them are visible
//! on the debugger wire (address width) or in behavior (float support,
//! backtraces, console output).

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BuildFlags {
    pub debugger: bool,
    pub float: bool,
    pub native_int64: bool,
    pub bit32: bool,
    pub big_endian: bool,
    pub stacktrace: bool,
    pub line_numbers: bool,
    pub console: bool,
}

impl BuildFlags {
    pub const CURRENT: BuildFlags = BuildFlags {
        debugger: cfg!(feature = "debugger"),
        float: cfg!(feature = "float"),
        native_int64: cfg!(feature = "native-int64"),
        bit32: cfg!(feature = "bit32"),
        big_endian: cfg!(feature = "big-endian"),
        stacktrace: cfg!(feature = "stacktrace"),
        line_numbers: cfg!(feature = "line-numbers"),
        console: cfg!(feature = "console"),
    };

    /// Width in bytes of addresses and method ids on the debugger wire.
    pub const fn address_size(&self) -> usize {
        if self.bit32 { 4 } else { 8 }
    }
}

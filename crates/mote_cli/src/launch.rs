//! The seam between the VM core and the code that runs a main class.

use mote_core::{ExitCode, FileSystem, OpenMode};
use mote_runtime::config::FILE_SEPARATOR;
use mote_runtime::{DomainError, Vm, VmResult};

pub const CLASS_MAGIC: u32 = 0xCAFE_BABE;

pub trait Launcher {
    /// Runs `main_class` (internal form) with `args`.
    fn launch(&mut self, vm: &mut Vm, main_class: &str, args: &[String]) -> VmResult<()>;
}

/// Finds the main class on the user class path and checks it is a class
/// file. Executing it needs a bytecode interpreter, which this build does
/// not link, so a well-formed main class ends in a fatal exit.
#[derive(Debug, Default)]
pub struct ClassPathLauncher;

impl ClassPathLauncher {
    pub fn locate(&self, vm: &mut Vm, main_class: &str) -> Option<String> {
        let relative = format!("{}.class", main_class.replace('/', &FILE_SEPARATOR.to_string()));
        let entries = vm.config.class_path.clone();
        entries
            .iter()
            .map(|entry| format!("{entry}{FILE_SEPARATOR}{relative}"))
            .find(|path| vm.fs().exists(path))
    }

    fn read_magic(fs: &mut dyn FileSystem, path: &str) -> Option<u32> {
        let handle = fs.open(path, OpenMode::Read).ok()?;
        let mut magic = [0u8; 4];
        let mut filled = 0;
        while filled < magic.len() {
            match fs.read(handle, &mut magic[filled..]) {
                Ok(0) | Err(_) => break,
                Ok(n) => filled += n,
            }
        }
        if let Err(err) = fs.close(handle) {
            log::warn!("closing {path}: {err}");
        }
        (filled == magic.len()).then(|| u32::from_be_bytes(magic))
    }
}

impl Launcher for ClassPathLauncher {
    fn launch(&mut self, vm: &mut Vm, main_class: &str, args: &[String]) -> VmResult<()> {
        let Some(path) = self.locate(vm, main_class) else {
            return Err(vm.throw_new(DomainError::ClassNotFound, Some(&main_class.replace('/', "."))));
        };
        log::debug!("main class {main_class} found at {path}");
        if Self::read_magic(vm.fs(), &path) != Some(CLASS_MAGIC) {
            return Err(vm.throw_new(DomainError::ClassFormat, Some(&format!("{path}: bad magic number"))));
        }
        Err(vm.exit(
            ExitCode::InterpreterUnavailable,
            format!("cannot run {main_class} with {} arguments", args.len()),
        ))
    }
}

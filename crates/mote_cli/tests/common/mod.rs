#![allow(dead_code)]

use mote_cli::{Launcher, run};
use mote_core::{BudgetAllocator, Capabilities, MemoryConsole, MemoryFileSystem, SystemClock};
use mote_runtime::{Vm, VmResult};

/// Launcher that records what it was asked to run.
#[derive(Default)]
pub struct RecordingLauncher {
    pub launched: Vec<(String, Vec<String>)>,
}

impl Launcher for RecordingLauncher {
    fn launch(&mut self, _vm: &mut Vm, main_class: &str, args: &[String]) -> VmResult<()> {
        self.launched.push((main_class.to_string(), args.to_vec()));
        Ok(())
    }
}

pub fn args(list: &[&str]) -> Vec<String> {
    list.iter().map(|s| s.to_string()).collect()
}

/// Runs the front end in-process over an in-memory file system.
pub fn run_with(
    argv: &[&str],
    env_classpath: Option<&str>,
    fs: MemoryFileSystem,
    launcher: &mut dyn Launcher,
) -> (i32, MemoryConsole) {
    let console = MemoryConsole::new();
    let sink = console.clone();
    let status = run(
        args(argv),
        env_classpath,
        move |config| Capabilities {
            clock: Box::new(SystemClock),
            allocator: Box::new(BudgetAllocator::new(config.heap_max)),
            console: Box::new(sink),
            fs: Box::new(fs),
        },
        launcher,
    );
    (status, console)
}

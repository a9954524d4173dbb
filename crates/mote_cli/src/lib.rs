//! Command-line front end for the Mote VM.
//!
//! `vm_main` parses the command line, boots a VM with std-backed
//! capabilities, optionally attaches a debugger and hands the main class to
//! a [`Launcher`]. The returned status is what the process exits with.

pub mod args;
pub mod launch;

use clap::Parser;
use clap::error::ErrorKind;
use mote_core::{BuildFlags, Capabilities, ExitCode, TcpTransport, VmExit};
use mote_jdwp::Agent;
use mote_runtime::{Vm, VmConfig};

pub use args::{Cli, parse_size};
pub use launch::{CLASS_MAGIC, ClassPathLauncher, Launcher};

/// Environment variable consulted when `--classpath` is absent.
pub const CLASSPATH_ENV: &str = "MOTE_CLASSPATH";
/// Environment variable holding the log filter.
pub const LOG_ENV: &str = "MOTE_LOG";

/// Process entry: `args` excludes the executable name.
pub fn vm_main(args: Vec<String>) -> i32 {
    let env_classpath = std::env::var(CLASSPATH_ENV).ok();
    run(args, env_classpath.as_deref(), |config| Capabilities::for_heap(config.heap_max), &mut ClassPathLauncher)
}

/// [`vm_main`] with its environment made explicit. `capabilities` is called
/// once the configuration is known.
pub fn run(
    args: Vec<String>,
    env_classpath: Option<&str>,
    capabilities: impl FnOnce(&VmConfig) -> Capabilities,
    launcher: &mut dyn Launcher,
) -> i32 {
    let cli = match Cli::try_parse_from(std::iter::once("mote".to_string()).chain(args)) {
        Ok(cli) => cli,
        Err(err) => {
            let status = match err.kind() {
                ErrorKind::DisplayHelp | ErrorKind::DisplayVersion => 0,
                _ => ExitCode::InvalidArgument.code(),
            };
            if let Err(io) = err.print() {
                log::warn!("cannot print usage: {io}");
            }
            return status;
        }
    };

    let config = cli.to_config(env_classpath);
    let mut caps = capabilities(&config);
    let preflight = config.validate().and_then(|()| {
        if config.class_path.is_empty() {
            Err(VmExit::new(ExitCode::NoClasspath, format!("use --classpath or set {CLASSPATH_ENV}")))
        } else {
            Ok(())
        }
    });
    if let Err(exit) = preflight {
        log::error!("{exit}");
        if BuildFlags::CURRENT.console {
            caps.console.write_line(&exit.to_string());
        }
        return exit.code;
    }

    let mut vm = match Vm::new(config, caps) {
        Ok(vm) => vm,
        Err(exit) => return exit.code,
    };

    let main_class = cli.main_class_name();
    vm.enter(|vm| {
        if let Some(addr) = &cli.jdwp {
            attach_debugger(vm, addr)?;
        }
        launcher.launch(vm, &main_class, &cli.args)
    })
}

/// Connects to the debugger and services it until it disposes the session
/// or disconnects. The main class runs afterwards.
fn attach_debugger(vm: &mut Vm, addr: &str) -> Result<(), VmExit> {
    let transport = TcpTransport::connect(addr)
        .map_err(|err| VmExit::new(ExitCode::DebuggerConnectFailed, err.to_string()))?;
    let mut agent = Agent::attach(vm, transport).map_err(|err| err.into_exit())?;
    agent.service(vm).map_err(|err| err.into_exit())?;
    log::info!("debugger released the VM after {} packets", agent.packets_handled());
    Ok(())
}

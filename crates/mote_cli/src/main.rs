use mote_cli::{LOG_ENV, vm_main};

fn main() {
    env_logger::Builder::from_env(env_logger::Env::new().filter_or(LOG_ENV, "warn")).init();
    let args: Vec<String> = std::env::args().skip(1).collect();
    std::process::exit(vm_main(args));
}

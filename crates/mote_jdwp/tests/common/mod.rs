#![allow(dead_code)]

use mote_core::Capabilities;
use mote_jdwp::packet::Reply;
use mote_jdwp::{InputStream, OutputStream, dispatch};
use mote_runtime::{Vm, VmConfig};

pub fn vm() -> Vm {
    Vm::new(VmConfig::default(), Capabilities::default()).unwrap()
}

/// A VM with an open debugger session.
pub fn session_vm() -> Vm {
    let mut vm = vm();
    vm.open_debug_session();
    vm
}

/// Runs one command through dispatch and framing, returning the parsed reply.
pub fn request(vm: &mut Vm, command_set: u8, command: u8, data: &[u8]) -> Reply {
    let mut input = InputStream::from_slice(data);
    let mut out = OutputStream::new();
    dispatch(vm, command_set, command, &mut input, &mut out).unwrap();
    Reply::parse(&Reply::encode(1, &out)).unwrap()
}

pub fn id_bytes(id: u32) -> [u8; 4] {
    id.to_be_bytes()
}

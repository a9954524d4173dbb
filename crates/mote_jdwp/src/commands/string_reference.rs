//! StringReference.

use mote_core::VmExit;
use mote_runtime::Vm;

use super::read_object;
use crate::constants::ErrorCode;
use crate::stream::{InputStream, OutputStream};

pub(super) fn value(vm: &mut Vm, input: &mut InputStream<'_>, out: &mut OutputStream) -> Result<(), VmExit> {
    let Some(obj) = read_object(vm, input, out) else {
        return Ok(());
    };
    match vm.string_bytes(obj) {
        Some(bytes) => out.write_utf(bytes),
        None => out.set_error(ErrorCode::InvalidString),
    }
    Ok(())
}

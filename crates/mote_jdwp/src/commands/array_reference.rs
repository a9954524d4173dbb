//! ArrayReference.

use mote_core::VmExit;
use mote_runtime::Vm;

use super::read_object;
use crate::constants::ErrorCode;
use crate::stream::{InputStream, OutputStream};

pub(super) fn length(vm: &mut Vm, input: &mut InputStream<'_>, out: &mut OutputStream) -> Result<(), VmExit> {
    let Some(obj) = read_object(vm, input, out) else {
        return Ok(());
    };
    match vm.array_length(obj) {
        Some(len) => out.write_i32(len as i32),
        None => out.set_error(ErrorCode::InvalidArray),
    }
    Ok(())
}

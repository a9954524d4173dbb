//! ClassObjectReference.

use mote_core::VmExit;
use mote_runtime::Vm;

use super::{read_object, write_reference_type};
use crate::constants::ErrorCode;
use crate::stream::{InputStream, OutputStream};

/// The class a `java.lang.Class` object stands for.
pub(super) fn reflected_type(vm: &mut Vm, input: &mut InputStream<'_>, out: &mut OutputStream) -> Result<(), VmExit> {
    let Some(mirror) = read_object(vm, input, out) else {
        return Ok(());
    };
    match vm.mirror_referent(mirror) {
        Some(clazz) => write_reference_type(vm, clazz, out),
        None => out.set_error(ErrorCode::InvalidObject),
    }
    Ok(())
}

//! VirtualMachine.

use mote_core::{BuildFlags, VmExit};
use mote_runtime::Vm;
use mote_runtime::debugger::SYSTEM_GROUP_ID;

use crate::stream::{InputStream, OutputStream};

const OBJECT_ID_SIZE: i32 = 4;

/// Field, method, object, reference type and frame id widths.
pub(super) fn id_sizes(_vm: &mut Vm, _input: &mut InputStream<'_>, out: &mut OutputStream) -> Result<(), VmExit> {
    let address = BuildFlags::CURRENT.address_size() as i32;
    out.write_i32(OBJECT_ID_SIZE);
    out.write_i32(address);
    out.write_i32(OBJECT_ID_SIZE);
    out.write_i32(OBJECT_ID_SIZE);
    out.write_i32(address);
    Ok(())
}

pub(super) fn top_level_thread_groups(
    _vm: &mut Vm,
    _input: &mut InputStream<'_>,
    out: &mut OutputStream,
) -> Result<(), VmExit> {
    out.write_u32(1);
    out.write_object_id(SYSTEM_GROUP_ID);
    Ok(())
}

/// Ends the session. Every id and pin is released.
pub(super) fn dispose(vm: &mut Vm, _input: &mut InputStream<'_>, _out: &mut OutputStream) -> Result<(), VmExit> {
    vm.close_debug_session();
    Ok(())
}

//! ThreadGroupReference. The VM has exactly two groups, "system" and its
//! child "main"; neither is a heap object.

use mote_core::VmExit;
use mote_runtime::Vm;
use mote_runtime::debugger::{MAIN_GROUP_ID, SYSTEM_GROUP_ID};

use crate::constants::ErrorCode;
use crate::stream::{InputStream, OutputStream};

fn read_group(input: &mut InputStream<'_>, out: &mut OutputStream) -> Option<u32> {
    let id = input.read_object_id();
    match id {
        SYSTEM_GROUP_ID | MAIN_GROUP_ID => Some(id),
        _ => {
            if input.is_ok() {
                out.set_error(ErrorCode::InvalidThreadGroup);
            }
            None
        }
    }
}

pub(super) fn name(_vm: &mut Vm, input: &mut InputStream<'_>, out: &mut OutputStream) -> Result<(), VmExit> {
    match read_group(input, out) {
        Some(SYSTEM_GROUP_ID) => out.write_string("system"),
        Some(_) => out.write_string("main"),
        None => {}
    }
    Ok(())
}

pub(super) fn parent(_vm: &mut Vm, input: &mut InputStream<'_>, out: &mut OutputStream) -> Result<(), VmExit> {
    match read_group(input, out) {
        Some(SYSTEM_GROUP_ID) => out.write_object_id(0),
        Some(_) => out.write_object_id(SYSTEM_GROUP_ID),
        None => {}
    }
    Ok(())
}

/// Child threads then child groups, each as `count(4) | ids`.
pub(super) fn children(vm: &mut Vm, input: &mut InputStream<'_>, out: &mut OutputStream) -> Result<(), VmExit> {
    match read_group(input, out) {
        Some(SYSTEM_GROUP_ID) => {
            out.write_u32(0);
            out.write_u32(1);
            out.write_object_id(MAIN_GROUP_ID);
        }
        Some(_) => {
            let threads = vm.threads().to_vec();
            out.write_u32(threads.len() as u32);
            for thread in threads {
                let id = vm.object_id(thread);
                out.write_object_id(id);
            }
            out.write_u32(0);
        }
        None => {}
    }
    Ok(())
}

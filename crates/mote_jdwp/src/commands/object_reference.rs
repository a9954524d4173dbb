//! ObjectReference.

use mote_core::VmExit;
use mote_runtime::Vm;

use super::{read_object, write_reference_type};
use crate::constants::ErrorCode;
use crate::stream::{InputStream, OutputStream};

pub(super) fn reference_type(vm: &mut Vm, input: &mut InputStream<'_>, out: &mut OutputStream) -> Result<(), VmExit> {
    let Some(obj) = read_object(vm, input, out) else {
        return Ok(());
    };
    match vm.class_of(obj) {
        Some(clazz) => write_reference_type(vm, clazz, out),
        None => out.set_error(ErrorCode::InvalidObject),
    }
    Ok(())
}

/// Pins the object until collection is enabled again or the session ends.
pub(super) fn disable_collection(
    vm: &mut Vm,
    input: &mut InputStream<'_>,
    out: &mut OutputStream,
) -> Result<(), VmExit> {
    let Some(obj) = read_object(vm, input, out) else {
        return Ok(());
    };
    if let Some(session) = vm.debug_session_mut() {
        session.pins.put(obj);
    }
    Ok(())
}

pub(super) fn enable_collection(
    vm: &mut Vm,
    input: &mut InputStream<'_>,
    out: &mut OutputStream,
) -> Result<(), VmExit> {
    let id = input.read_object_id();
    if !input.is_ok() {
        return Ok(());
    }
    let Some(session) = vm.debug_session_mut() else {
        return Ok(());
    };
    match session.ids.get_by_id(id) {
        Some(obj) => {
            session.pins.remove(obj);
        }
        None => out.set_error(ErrorCode::InvalidObject),
    }
    Ok(())
}

/// True for reclaimed objects and for ids never issued.
pub(super) fn is_collected(vm: &mut Vm, input: &mut InputStream<'_>, out: &mut OutputStream) -> Result<(), VmExit> {
    let id = input.read_object_id();
    if input.is_ok() {
        out.write_bool(vm.object_for_id(id).is_none());
    }
    Ok(())
}

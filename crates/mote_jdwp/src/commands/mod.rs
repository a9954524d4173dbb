//! Command handlers.
//!
//! Every handler reads its request from the input stream and writes its
//! reply data to the output stream. A protocol error is set on the output
//! stream instead of data; only a fatal VM exit is returned as `Err`.

mod array_reference;
mod array_type;
mod class_object;
mod object_reference;
mod string_reference;
mod thread_group;
mod virtual_machine;

use mote_core::{ObjectId, VmExit};
use mote_runtime::Vm;

use crate::constants::{ErrorCode, command_set as cs};
use crate::stream::{InputStream, OutputStream};

pub type CommandFn = fn(&mut Vm, &mut InputStream<'_>, &mut OutputStream) -> Result<(), VmExit>;

pub fn handler_for(command_set: u8, command: u8) -> Option<CommandFn> {
    let handler: CommandFn = match (command_set, command) {
        (cs::VIRTUAL_MACHINE, cs::vm::TOP_LEVEL_THREAD_GROUPS) => virtual_machine::top_level_thread_groups,
        (cs::VIRTUAL_MACHINE, cs::vm::DISPOSE) => virtual_machine::dispose,
        (cs::VIRTUAL_MACHINE, cs::vm::ID_SIZES) => virtual_machine::id_sizes,
        (cs::ARRAY_TYPE, cs::array_type::NEW_INSTANCE) => array_type::new_instance,
        (cs::OBJECT_REFERENCE, cs::object_reference::REFERENCE_TYPE) => object_reference::reference_type,
        (cs::OBJECT_REFERENCE, cs::object_reference::DISABLE_COLLECTION) => object_reference::disable_collection,
        (cs::OBJECT_REFERENCE, cs::object_reference::ENABLE_COLLECTION) => object_reference::enable_collection,
        (cs::OBJECT_REFERENCE, cs::object_reference::IS_COLLECTED) => object_reference::is_collected,
        (cs::STRING_REFERENCE, cs::string_reference::VALUE) => string_reference::value,
        (cs::THREAD_GROUP_REFERENCE, cs::thread_group::NAME) => thread_group::name,
        (cs::THREAD_GROUP_REFERENCE, cs::thread_group::PARENT) => thread_group::parent,
        (cs::THREAD_GROUP_REFERENCE, cs::thread_group::CHILDREN) => thread_group::children,
        (cs::ARRAY_REFERENCE, cs::array_reference::LENGTH) => array_reference::length,
        (cs::CLASS_OBJECT_REFERENCE, cs::class_object::REFLECTED_TYPE) => class_object::reflected_type,
        _ => return None,
    };
    Some(handler)
}

/// Runs the handler for `command_set`/`command`. Without a debugger
/// session every command fails with `VM_DEAD`.
pub fn dispatch(
    vm: &mut Vm,
    command_set: u8,
    command: u8,
    input: &mut InputStream<'_>,
    out: &mut OutputStream,
) -> Result<(), VmExit> {
    if vm.debug_session().is_none() {
        out.set_error(ErrorCode::VmDead);
        return Ok(());
    }
    let Some(handler) = handler_for(command_set, command) else {
        log::debug!("no handler for command {command_set}/{command}");
        out.set_error(ErrorCode::NotImplemented);
        return Ok(());
    };
    handler(vm, input, out)?;
    if !input.is_ok() {
        out.set_error(input.error());
    }
    Ok(())
}

/// Reads an object id and resolves it to a live object. Unknown or
/// reclaimed ids set `INVALID_OBJECT`.
fn read_object(vm: &Vm, input: &mut InputStream<'_>, out: &mut OutputStream) -> Option<ObjectId> {
    let id = input.read_object_id();
    if !input.is_ok() {
        return None;
    }
    let obj = vm.object_for_id(id);
    if obj.is_none() {
        out.set_error(ErrorCode::InvalidObject);
    }
    obj
}

/// `(reftag, ref_type_id)` for a class.
fn write_reference_type(vm: &mut Vm, clazz: ObjectId, out: &mut OutputStream) {
    let Some(ref_type) = vm.heap.clazz(clazz).map(|c| c.ref_type) else {
        out.set_error(ErrorCode::InvalidClass);
        return;
    };
    let id = vm.object_id(clazz);
    out.write_u8(ref_type as u8);
    out.write_ref_type_id(id);
}

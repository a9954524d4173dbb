//! ArrayType.

use mote_core::VmExit;
use mote_runtime::{Outcome, SystemClass, Vm};

use crate::constants::{ErrorCode, tag};
use crate::stream::{InputStream, OutputStream};

/// Allocates an array of the given array class. The new array is not pinned;
/// it stays alive only while something else reaches it or the debugger
/// disables its collection.
pub(super) fn new_instance(vm: &mut Vm, input: &mut InputStream<'_>, out: &mut OutputStream) -> Result<(), VmExit> {
    let type_id = input.read_ref_type_id();
    let length = input.read_i32();
    if !input.is_ok() {
        return Ok(());
    }
    let Some(array_class) = vm.object_for_id(type_id) else {
        out.set_error(ErrorCode::InvalidObject);
        return Ok(());
    };
    if !vm.heap.clazz(array_class).is_some_and(|c| c.is_array()) {
        out.set_error(ErrorCode::InvalidClass);
        return Ok(());
    }
    if length < 0 {
        out.set_error(ErrorCode::InvalidArray);
        return Ok(());
    }

    match vm.protect(|vm| vm.new_array(array_class, length))? {
        Outcome::Completed(array) => {
            let id = vm.object_id(array);
            out.write_u8(tag::ARRAY);
            out.write_object_id(id);
        }
        Outcome::Caught(throwable) => {
            let oom = vm.system_class(SystemClass::OutOfMemoryError)?;
            let out_of_memory = vm.class_of(throwable).is_some_and(|c| vm.is_subclass_of(c, oom));
            log::debug!("array allocation for debugger failed: {}", vm.describe_throwable(throwable));
            out.set_error(if out_of_memory { ErrorCode::OutOfMemory } else { ErrorCode::Internal });
        }
    }
    Ok(())
}

#![allow(dead_code)]

use mote_core::{BudgetAllocator, Capabilities, MemoryConsole, MemoryFileSystem, SystemClock};
use mote_runtime::{ClassDef, FieldKind, ObjectId, Vm, VmConfig};

pub const SMALL_HEAP: usize = 64 * 1024;

pub fn caps(heap: usize, console: &MemoryConsole) -> Capabilities {
    Capabilities {
        clock: Box::new(SystemClock),
        allocator: Box::new(BudgetAllocator::new(heap)),
        console: Box::new(console.clone()),
        fs: Box::new(MemoryFileSystem::new()),
    }
}

pub fn vm_with(config: VmConfig) -> (Vm, MemoryConsole) {
    let console = MemoryConsole::new();
    let heap = config.heap_max;
    let vm = Vm::new(config, caps(heap, &console)).unwrap();
    (vm, console)
}

pub fn vm() -> (Vm, MemoryConsole) {
    vm_with(VmConfig::default())
}

pub fn small_vm() -> (Vm, MemoryConsole) {
    vm_with(VmConfig { heap_min: SMALL_HEAP, heap_max: SMALL_HEAP, ..VmConfig::default() })
}

/// `Node { Node next; int value; }`
pub fn node_class(vm: &mut Vm) -> ObjectId {
    let object = vm.system_class(mote_runtime::SystemClass::Object).unwrap();
    let def = ClassDef {
        name: "Node",
        superclass: Some(object),
        fields: &[FieldKind::Reference, FieldKind::Int],
        source_file: Some("Node.java"),
        ..ClassDef::default()
    };
    vm.define_instance_class(&def).unwrap()
}

mod common;

use common::vm;
use mote_runtime::{AllocType, SystemClass};

#[test]
fn interned_strings_are_canonical() {
    let (mut vm, _) = vm();
    let a = vm.intern_str("hello").unwrap();
    let b = vm.intern_str("hello").unwrap();
    let c = vm.intern_str("world").unwrap();
    assert_eq!(a, b);
    assert_ne!(a, c);
    assert_eq!(vm.string_value(a).as_deref(), Some("hello"));
    assert_eq!(vm.heap.tag(a), Some(AllocType::Static));
}

#[test]
fn intern_without_add_only_finds() {
    let (mut vm, _) = vm();
    assert_eq!(vm.intern(b"missing", false).unwrap(), None);
    let before = vm.intern_pool().len();
    let id = vm.intern(b"present", true).unwrap();
    assert_eq!(vm.intern(b"present", false).unwrap(), id);
    assert_eq!(vm.intern_pool().len(), before + 1);
}

#[test]
fn utf_get_returns_the_first_inserted_copy() {
    let (mut vm, _) = vm();
    let first = vm.utf(b"java/util/List", true).unwrap().unwrap();
    let again = vm.utf(b"java/util/List", true).unwrap().unwrap();
    assert_eq!(first, again);
    assert_eq!(vm.utf_bytes(first), Some(&b"java/util/List"[..]));
    assert_eq!(vm.utf(b"java/util/Map", false).unwrap(), None);
}

#[test]
fn add_utf_does_not_deduplicate() {
    let (mut vm, _) = vm();
    let a = vm.add_utf(b"twice").unwrap();
    let b = vm.add_utf(b"twice").unwrap();
    assert_ne!(a, b);
}

#[test]
fn intern_object_maps_equal_contents_to_one_object() {
    let (mut vm, _) = vm();
    let canonical = vm.intern_str("shared").unwrap();
    let fresh = vm.new_string("shared").unwrap();
    assert_ne!(fresh, canonical);
    assert_eq!(vm.intern_object(fresh).unwrap(), canonical);
}

#[test]
fn pool_entries_survive_collection() {
    let (mut vm, _) = vm();
    let s = vm.intern_str("kept").unwrap();
    let utf = vm.utf(b"also kept", true).unwrap().unwrap();
    vm.gc().unwrap();
    assert_eq!(vm.string_value(s).as_deref(), Some("kept"));
    assert_eq!(vm.utf_bytes(utf), Some(&b"also kept"[..]));
}

#[test]
fn class_names_live_in_the_utf_pool() {
    let (mut vm, _) = vm();
    let string_class = vm.system_class(SystemClass::String).unwrap();
    assert_eq!(vm.class_name(string_class).as_deref(), Some("java/lang/String"));
    let name = vm.heap.clazz(string_class).unwrap().name;
    assert_eq!(vm.utf(b"java/lang/String", false).unwrap(), Some(name));
}

#![cfg(feature = "debugger")]

mod common;

use std::collections::HashMap;

use common::{node_class, vm};
use mote_runtime::debugger::{FIRST_OBJECT_ID, IdMap};
use mote_runtime::ObjectId;
use proptest::prelude::*;
use proptest::test_runner::Config as ProptestConfig;

#[test]
fn no_session_means_no_ids() {
    let (mut vm, _) = vm();
    let node = node_class(&mut vm);
    assert_eq!(vm.object_id(node), 0);
    assert_eq!(vm.object_for_id(FIRST_OBJECT_ID), None);
}

#[test]
fn reclaimed_objects_leave_the_id_map() {
    let (mut vm, _) = vm();
    let node = node_class(&mut vm);
    vm.open_debug_session();

    let kept = vm.new_instance(node).unwrap();
    let dropped = vm.new_instance(node).unwrap();
    let kept_id = vm.object_id(kept);
    let dropped_id = vm.object_id(dropped);
    assert_eq!(kept_id, FIRST_OBJECT_ID);
    assert_eq!(dropped_id, FIRST_OBJECT_ID + 1);

    vm.debug_session_mut().unwrap().pins.put(kept);
    vm.gc().unwrap();

    assert_eq!(vm.object_for_id(kept_id), Some(kept));
    assert_eq!(vm.object_for_id(dropped_id), None);
    let session = vm.debug_session().unwrap();
    assert_eq!(session.ids.get_by_address(dropped), 0);
    assert_eq!(session.ids.len(), 1);
}

#[test]
fn unpinning_lets_the_collector_reclaim() {
    let (mut vm, _) = vm();
    let node = node_class(&mut vm);
    vm.open_debug_session();
    let obj = vm.new_instance(node).unwrap();
    let id = vm.object_id(obj);
    vm.debug_session_mut().unwrap().pins.put(obj);
    vm.gc().unwrap();
    assert_eq!(vm.object_for_id(id), Some(obj));

    vm.debug_session_mut().unwrap().pins.remove(obj);
    vm.gc().unwrap();
    assert_eq!(vm.object_for_id(id), None);
}

#[test]
fn closing_the_session_drops_ids_and_pins() {
    let (mut vm, _) = vm();
    let node = node_class(&mut vm);
    vm.open_debug_session();
    let obj = vm.new_instance(node).unwrap();
    vm.object_id(obj);
    vm.debug_session_mut().unwrap().pins.put(obj);

    vm.close_debug_session();
    assert!(vm.debug_session().is_none());
    vm.gc().unwrap();
    assert!(!vm.heap.contains(obj));
}

#[derive(Debug, Clone)]
enum Op {
    Put(usize),
    RemoveId(usize),
    RemoveAddr(usize),
}

fn op() -> impl Strategy<Value = Op> {
    prop_oneof![
        (0usize..64).prop_map(Op::Put),
        (0usize..64).prop_map(Op::RemoveId),
        (0usize..64).prop_map(Op::RemoveAddr),
    ]
}

proptest! {
    #![proptest_config(ProptestConfig {
        cases: 64, max_shrink_iters: 200, .. ProptestConfig::default()
    })]
    #[test]
    fn id_map_stays_a_bijection(ops in proptest::collection::vec(op(), 0..200), buckets in 1usize..16) {
        let mut map = IdMap::with_buckets(buckets, FIRST_OBJECT_ID);
        let mut model: HashMap<usize, u32> = HashMap::new();
        let mut issued: Vec<u32> = Vec::new();

        for op in ops {
            match op {
                Op::Put(addr) => {
                    let id = map.put(ObjectId(addr));
                    match model.get(&addr) {
                        Some(&known) => prop_assert_eq!(id, known),
                        None => {
                            prop_assert!(issued.iter().all(|&prev| id > prev));
                            issued.push(id);
                            model.insert(addr, id);
                        }
                    }
                }
                Op::RemoveId(addr) => {
                    let expected = model.remove(&addr);
                    let removed = expected.and_then(|id| map.remove_id(id));
                    prop_assert_eq!(removed, expected.map(|_| ObjectId(addr)));
                }
                Op::RemoveAddr(addr) => {
                    prop_assert_eq!(map.remove_addr(ObjectId(addr)), model.remove(&addr));
                }
            }
        }

        prop_assert_eq!(map.len(), model.len());
        for (&addr, &id) in &model {
            prop_assert_eq!(map.get_by_id(id), Some(ObjectId(addr)));
            prop_assert_eq!(map.get_by_address(ObjectId(addr)), id);
        }
        for id in issued {
            if !model.values().any(|&live| live == id) {
                prop_assert_eq!(map.get_by_id(id), None);
            }
        }
    }
}

use mote_core::value::{pack_f64, pack_i64, unpack_f64, unpack_i64};
use mote_core::{Cell, Halves, ObjectId};
use proptest::prelude::*;

proptest! {
    #[test]
    fn longs_survive_two_cells(v in any::<i64>()) {
        prop_assert_eq!(unpack_i64(pack_i64(v)), v);
        prop_assert_eq!(Halves::from_i64(v).to_i64(), v);
    }

    #[test]
    fn doubles_keep_their_bits(bits in any::<u64>()) {
        let v = f64::from_bits(bits);
        prop_assert_eq!(unpack_f64(pack_f64(v)).to_bits(), bits);
    }

    #[test]
    fn ints_and_refs_never_alias(i in any::<i32>(), idx in 0usize..1_000_000) {
        let int = Cell::from_int(i);
        let reference = Cell::from_ref(ObjectId(idx));
        prop_assert!(int.as_object().is_none());
        prop_assert_eq!(reference.as_object(), Some(ObjectId(idx)));
        prop_assert_ne!(int, reference);
    }
}

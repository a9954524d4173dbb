use mote_core::value::{pack_i64, unpack_i64};
use mote_core::{BuildFlags, Cell, ObjectId};
use mote_jdwp::{InputStream, Location, OutputStream, tag};
use proptest::prelude::*;
use proptest::test_runner::Config as ProptestConfig;

/// Splits `bytes` at the given cut points into a segment chain.
fn segments<'a>(bytes: &'a [u8], cuts: &[usize]) -> Vec<&'a [u8]> {
    let mut points: Vec<usize> = cuts.iter().map(|c| c % (bytes.len() + 1)).collect();
    points.sort_unstable();
    let mut out = Vec::new();
    let mut start = 0;
    for p in points {
        out.push(&bytes[start..p]);
        start = p;
    }
    out.push(&bytes[start..]);
    out
}

#[derive(Debug, Clone)]
enum Wire {
    I16(i16),
    U16(u16),
    I32(i32),
    I64(i64),
    Bool(bool),
    Address(u64),
    Utf(Vec<u8>),
    Str(String),
    Location(u8, u32, u64, u64),
}

fn wire() -> impl Strategy<Value = Wire> {
    prop_oneof![
        any::<i16>().prop_map(Wire::I16),
        any::<u16>().prop_map(Wire::U16),
        any::<i32>().prop_map(Wire::I32),
        any::<i64>().prop_map(Wire::I64),
        any::<bool>().prop_map(Wire::Bool),
        any::<u64>().prop_map(Wire::Address),
        proptest::collection::vec(any::<u8>(), 0..40).prop_map(Wire::Utf),
        "[a-zA-Z0-9 /.$é]{0,24}".prop_map(Wire::Str),
        (any::<u8>(), any::<u32>(), any::<u64>(), any::<u64>()).prop_map(|(t, c, m, p)| Wire::Location(t, c, m, p)),
    ]
}

fn address_mask() -> u64 {
    if BuildFlags::CURRENT.address_size() == 4 { u32::MAX as u64 } else { u64::MAX }
}

fn write(out: &mut OutputStream, v: &Wire) {
    match v {
        Wire::I16(x) => out.write_i16(*x),
        Wire::U16(x) => out.write_u16(*x),
        Wire::I32(x) => out.write_i32(*x),
        Wire::I64(x) => out.write_i64(*x),
        Wire::Bool(x) => out.write_bool(*x),
        Wire::Address(x) => out.write_address(*x),
        Wire::Utf(x) => out.write_utf(x),
        Wire::Str(x) => out.write_string(x),
        Wire::Location(t, c, m, p) => {
            out.write_location(&Location { type_tag: *t, class_id: *c, method: *m, pc: *p })
        }
    }
}

fn read_and_check(input: &mut InputStream<'_>, v: &Wire) -> Result<(), TestCaseError> {
    match v {
        Wire::I16(x) => {
            prop_assert_eq!(input.read_i16(), *x);
        }
        Wire::U16(x) => {
            prop_assert_eq!(input.read_u16(), *x);
        }
        Wire::I32(x) => {
            prop_assert_eq!(input.read_i32(), *x);
        }
        Wire::I64(x) => {
            prop_assert_eq!(input.read_i64(), *x);
        }
        Wire::Bool(x) => {
            prop_assert_eq!(input.read_bool(), *x);
        }
        Wire::Address(x) => {
            prop_assert_eq!(input.read_address(), *x & address_mask());
        }
        Wire::Utf(x) => {
            prop_assert_eq!(&input.read_utf(), x);
        }
        Wire::Str(x) => {
            prop_assert_eq!(&input.read_string(), x);
        }
        Wire::Location(t, c, m, p) => {
            let expected = Location { type_tag: *t, class_id: *c, method: *m & address_mask(), pc: *p };
            prop_assert_eq!(input.read_location(), expected);
        }
    }
    Ok(())
}

proptest! {
    #![proptest_config(ProptestConfig {
        cases: 256, max_shrink_iters: 500, .. ProptestConfig::default()
    })]
    #[test]
    fn values_survive_write_then_segmented_read(
        values in proptest::collection::vec(wire(), 0..16),
        cuts in proptest::collection::vec(any::<usize>(), 0..6),
    ) {
        let mut out = OutputStream::new();
        for v in &values {
            write(&mut out, v);
        }
        let bytes = out.into_bytes();
        let mut input = InputStream::new(segments(&bytes, &cuts));
        for v in &values {
            read_and_check(&mut input, v)?;
        }
        prop_assert!(input.is_ok());
        prop_assert_eq!(input.remaining(), 0);
    }

    #[test]
    fn cells_survive_write_then_read(int in any::<i32>(), wide in any::<i64>(), obj in 0usize..1_000_000) {
        let mut out = OutputStream::new();
        out.write_cells(tag::INT, &[Cell::from_int(int)], |_| 0);
        out.write_cells(tag::LONG, &pack_i64(wide), |_| 0);
        out.write_cells(tag::OBJECT, &[Cell::from_ref(ObjectId(obj))], |o| o.0 as u32 + 3);
        out.write_cells(tag::OBJECT, &[Cell::NULL], |_| 1);
        let bytes = out.into_bytes();

        let mut input = InputStream::from_slice(&bytes);
        let mut cells = [Cell::ZERO; 2];
        prop_assert_eq!(input.read_cells(tag::INT, &mut cells, |_| None), 1);
        prop_assert_eq!(cells[0].as_int(), int);
        prop_assert_eq!(input.read_cells(tag::LONG, &mut cells, |_| None), 2);
        prop_assert_eq!(unpack_i64(cells), wide);
        input.read_cells(tag::OBJECT, &mut cells, |id| Some(ObjectId(id as usize - 3)));
        prop_assert_eq!(cells[0].as_object(), Some(ObjectId(obj)));
        input.read_cells(tag::OBJECT, &mut cells, |_| None);
        prop_assert!(cells[0].is_null());
        prop_assert!(input.is_ok());
    }

    #[test]
    fn short_cells_keep_their_width(b in any::<i8>(), c in any::<u16>(), s in any::<i16>(), z in any::<bool>()) {
        let mut out = OutputStream::new();
        out.write_cells(tag::BYTE, &[Cell::from_int(b as i32)], |_| 0);
        out.write_cells(tag::CHAR, &[Cell::from_int(c as i32)], |_| 0);
        out.write_cells(tag::SHORT, &[Cell::from_int(s as i32)], |_| 0);
        out.write_cells(tag::BOOLEAN, &[Cell::from_bool(z)], |_| 0);
        let bytes = out.into_bytes();
        prop_assert_eq!(bytes.len(), 1 + 2 + 2 + 1);

        let mut input = InputStream::from_slice(&bytes);
        let mut cell = [Cell::ZERO];
        input.read_cells(tag::BYTE, &mut cell, |_| None);
        prop_assert_eq!(cell[0].as_int(), b as i32);
        input.read_cells(tag::CHAR, &mut cell, |_| None);
        prop_assert_eq!(cell[0].as_int(), c as i32);
        input.read_cells(tag::SHORT, &mut cell, |_| None);
        prop_assert_eq!(cell[0].as_int(), s as i32);
        input.read_cells(tag::BOOLEAN, &mut cell, |_| None);
        prop_assert_eq!(cell[0].as_bool(), z);
    }
}

#[test]
fn float_cells_keep_bit_patterns() {
    let mut out = OutputStream::new();
    out.write_cells(tag::FLOAT, &[Cell::from_f32(-0.0)], |_| 0);
    out.write_cells(tag::DOUBLE, &mote_core::value::pack_f64(f64::NAN), |_| 0);
    let bytes = out.into_bytes();
    assert_eq!(&bytes[..4], &0x8000_0000u32.to_be_bytes());

    let mut input = InputStream::from_slice(&bytes);
    let mut cells = [Cell::ZERO; 2];
    input.read_cells(tag::FLOAT, &mut cells, |_| None);
    assert_eq!(cells[0].as_f32().to_bits(), (-0.0f32).to_bits());
    input.read_cells(tag::DOUBLE, &mut cells, |_| None);
    assert_eq!(mote_core::value::unpack_f64(cells).to_bits(), f64::NAN.to_bits());
}

#[test]
fn unknown_value_tag_is_rejected() {
    let bytes = [0u8; 4];
    let mut input = InputStream::from_slice(&bytes);
    let mut cells = [Cell::ZERO];
    assert_eq!(input.read_cells(b'?', &mut cells, |_| None), 0);
    assert_eq!(input.error(), mote_jdwp::ErrorCode::IllegalArgument);
}

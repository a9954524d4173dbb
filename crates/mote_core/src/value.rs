//! Value cell representation.
//!
//! A `Cell` is one tagged 64-bit word holding either a 32-bit int or an
//! object reference. 64-bit values occupy two adjacent cells whose order
//! follows the target byte order.

use std::fmt;

use crate::flags::BuildFlags;
use crate::gc::ObjectId;

pub const TAG_MASK: u64 = 0xffff_0000_0000_0000;
pub const PAYLOAD_MASK: u64 = 0x0000_ffff_ffff_ffff;

pub const TAG_INT: u64 = 0x0001;
pub const TAG_REF: u64 = 0x0002;

const NULL_PAYLOAD: u64 = PAYLOAD_MASK;

#[derive(Copy, Clone, PartialEq, Eq, Hash)]
pub struct Cell(u64);

impl Default for Cell {
    fn default() -> Self {
        Self::ZERO
    }
}

impl Cell {
    pub const ZERO: Cell = Cell(TAG_INT << 48);
    pub const NULL: Cell = Cell((TAG_REF << 48) | NULL_PAYLOAD);

    #[inline(always)]
    pub fn from_int(i: i32) -> Self {
        Self((TAG_INT << 48) | (i as u32 as u64))
    }

    #[inline(always)]
    pub fn from_bool(b: bool) -> Self {
        Self::from_int(b as i32)
    }

    /// Stores the IEEE-754 bit pattern, not a numeric conversion.
    #[inline(always)]
    pub fn from_f32(f: f32) -> Self {
        Self::from_int(f.to_bits() as i32)
    }

    #[inline(always)]
    pub fn from_ref(id: ObjectId) -> Self {
        Self((TAG_REF << 48) | (id.0 as u64 & PAYLOAD_MASK))
    }

    #[inline(always)]
    pub fn from_opt(id: Option<ObjectId>) -> Self {
        id.map_or(Self::NULL, Self::from_ref)
    }

    #[inline(always)]
    pub fn tag(&self) -> u64 {
        (self.0 & TAG_MASK) >> 48
    }

    #[inline(always)]
    pub fn is_int(&self) -> bool {
        self.tag() == TAG_INT
    }

    #[inline(always)]
    pub fn is_ref(&self) -> bool {
        self.tag() == TAG_REF
    }

    #[inline(always)]
    pub fn is_null(&self) -> bool {
        self.0 == Self::NULL.0
    }

    #[inline(always)]
    pub fn as_int(&self) -> i32 {
        self.0 as u32 as i32
    }

    #[inline(always)]
    pub fn as_bool(&self) -> bool {
        self.as_int() != 0
    }

    #[inline(always)]
    pub fn as_f32(&self) -> f32 {
        f32::from_bits(self.as_int() as u32)
    }

    /// The referenced object, `None` for null and for int cells.
    #[inline(always)]
    pub fn as_object(&self) -> Option<ObjectId> {
        if self.is_ref() && !self.is_null() {
            Some(ObjectId((self.0 & PAYLOAD_MASK) as usize))
        } else {
            None
        }
    }

    pub fn to_bits(self) -> u64 {
        self.0
    }
}

impl fmt::Debug for Cell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_int() {
            write!(f, "Int({})", self.as_int())
        } else if self.is_null() {
            write!(f, "Null")
        } else if let Some(id) = self.as_object() {
            write!(f, "Ref({})", id.0)
        } else {
            write!(f, "Raw({:#x})", self.0)
        }
    }
}

/// A 64-bit value split into 32-bit halves, as used on targets without a
/// native 64-bit type and on the debugger wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Halves {
    pub high: u32,
    pub low: u32,
}

impl Halves {
    pub fn from_i64(v: i64) -> Self {
        Self {
            high: (v as u64 >> 32) as u32,
            low: v as u64 as u32,
        }
    }

    pub fn to_i64(self) -> i64 {
        (((self.high as u64) << 32) | self.low as u64) as i64
    }

    pub fn from_f64(v: f64) -> Self {
        Self::from_i64(v.to_bits() as i64)
    }

    pub fn to_f64(self) -> f64 {
        f64::from_bits(self.to_i64() as u64)
    }
}

/// Packs a 64-bit value into two cells: `{low, high}` on little-endian
/// builds, `{high, low}` on big-endian builds.
pub fn pack_i64(v: i64) -> [Cell; 2] {
    let h = Halves::from_i64(v);
    let high = Cell::from_int(h.high as i32);
    let low = Cell::from_int(h.low as i32);
    if BuildFlags::CURRENT.big_endian {
        [high, low]
    } else {
        [low, high]
    }
}

pub fn unpack_i64(cells: [Cell; 2]) -> i64 {
    let (high, low) = if BuildFlags::CURRENT.big_endian {
        (cells[0], cells[1])
    } else {
        (cells[1], cells[0])
    };
    Halves {
        high: high.as_int() as u32,
        low: low.as_int() as u32,
    }
    .to_i64()
}

pub fn pack_f64(v: f64) -> [Cell; 2] {
    pack_i64(v.to_bits() as i64)
}

pub fn unpack_f64(cells: [Cell; 2]) -> f64 {
    f64::from_bits(unpack_i64(cells) as u64)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn int_cells_keep_sign() {
        assert_eq!(Cell::from_int(-7).as_int(), -7);
        assert_eq!(Cell::from_int(i32::MIN).as_int(), i32::MIN);
        assert!(Cell::from_int(0).is_int());
        assert_eq!(Cell::from_int(-1).as_object(), None);
    }

    #[test]
    fn null_is_distinct_from_first_object() {
        let first = Cell::from_ref(ObjectId(0));
        assert!(first.is_ref());
        assert!(!first.is_null());
        assert_eq!(first.as_object(), Some(ObjectId(0)));
        assert!(Cell::NULL.is_ref());
        assert!(Cell::NULL.is_null());
        assert_eq!(Cell::NULL.as_object(), None);
        assert_eq!(Cell::from_opt(None), Cell::NULL);
    }

    #[test]
    fn float_cells_reinterpret_bits() {
        let c = Cell::from_f32(-0.0);
        assert_eq!(c.as_int() as u32, 0x8000_0000);
        assert_eq!(c.as_f32().to_bits(), (-0.0f32).to_bits());
    }

    #[test]
    fn pair_order_follows_byte_order() {
        let cells = pack_i64(0x1122_3344_5566_7788);
        let (first, second) = (cells[0].as_int() as u32, cells[1].as_int() as u32);
        if BuildFlags::CURRENT.big_endian {
            assert_eq!((first, second), (0x1122_3344, 0x5566_7788));
        } else {
            assert_eq!((first, second), (0x5566_7788, 0x1122_3344));
        }
        assert_eq!(unpack_i64(cells), 0x1122_3344_5566_7788);
    }

    #[test]
    fn doubles_travel_as_bit_patterns() {
        let nan = f64::from_bits(0x7ff0_0000_0000_0123);
        assert_eq!(unpack_f64(pack_f64(nan)).to_bits(), nan.to_bits());
        assert_eq!(unpack_f64(pack_f64(-2.5)), -2.5);
        assert_eq!(Halves::from_f64(1.0).high, 0x3ff0_0000);
    }
}

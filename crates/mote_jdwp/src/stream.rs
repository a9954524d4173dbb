//! Big-endian packet streams.
//!
//! An [`InputStream`] reads across a chain of byte segments as if they were
//! one buffer. Running past the end poisons the stream with
//! [`ErrorCode::Internal`]; from then on every read yields zero and the
//! first error is kept. An [`OutputStream`] appends to one growable buffer
//! and supports patching a `u32` at an earlier position.

use mote_core::value::{pack_i64, unpack_i64};
use mote_core::{BuildFlags, Cell, Halves, ObjectId};
use smallvec::SmallVec;

use crate::constants::{ErrorCode, tag};

/// A code location: `tag(1) | class_id(4) | method(4|8) | pc(8)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Location {
    pub type_tag: u8,
    pub class_id: u32,
    pub method: u64,
    pub pc: u64,
}

#[derive(Debug, Clone)]
pub struct InputStream<'a> {
    segments: SmallVec<[&'a [u8]; 4]>,
    segment: usize,
    index: usize,
    left: usize,
    error: ErrorCode,
}

impl<'a> InputStream<'a> {
    pub fn new(segments: impl IntoIterator<Item = &'a [u8]>) -> Self {
        let segments: SmallVec<[&'a [u8]; 4]> = segments.into_iter().filter(|s| !s.is_empty()).collect();
        let left = segments.iter().map(|s| s.len()).sum();
        Self { segments, segment: 0, index: 0, left, error: ErrorCode::None }
    }

    pub fn from_slice(bytes: &'a [u8]) -> Self {
        Self::new([bytes])
    }

    /// Bytes not yet consumed.
    pub fn remaining(&self) -> usize {
        self.left
    }

    pub fn error(&self) -> ErrorCode {
        self.error
    }

    pub fn is_ok(&self) -> bool {
        !self.error.is_error()
    }

    /// Records `error` unless an earlier one is already set.
    pub fn set_error(&mut self, error: ErrorCode) {
        if !self.error.is_error() {
            self.error = error;
        }
    }

    /// Fills `buf` from the stream. On underflow (or a poisoned stream)
    /// `buf` is zeroed and nothing is consumed.
    pub fn read_into(&mut self, buf: &mut [u8]) -> bool {
        if self.error.is_error() || buf.len() > self.left {
            buf.fill(0);
            self.set_error(ErrorCode::Internal);
            return false;
        }
        let mut filled = 0;
        while filled < buf.len() {
            let Some(segment) = self.segments.get(self.segment).copied() else {
                buf.fill(0);
                self.set_error(ErrorCode::Internal);
                return false;
            };
            let n = (segment.len() - self.index).min(buf.len() - filled);
            buf[filled..filled + n].copy_from_slice(&segment[self.index..self.index + n]);
            filled += n;
            self.index += n;
            if self.index == segment.len() {
                self.segment += 1;
                self.index = 0;
            }
        }
        self.left -= buf.len();
        true
    }

    fn read_array<const N: usize>(&mut self) -> [u8; N] {
        let mut bytes = [0u8; N];
        self.read_into(&mut bytes);
        bytes
    }

    pub fn read_u8(&mut self) -> u8 {
        self.read_array::<1>()[0]
    }

    pub fn read_i8(&mut self) -> i8 {
        self.read_u8() as i8
    }

    pub fn read_bool(&mut self) -> bool {
        self.read_u8() != 0
    }

    pub fn read_u16(&mut self) -> u16 {
        u16::from_be_bytes(self.read_array())
    }

    pub fn read_i16(&mut self) -> i16 {
        i16::from_be_bytes(self.read_array())
    }

    pub fn read_u32(&mut self) -> u32 {
        u32::from_be_bytes(self.read_array())
    }

    pub fn read_i32(&mut self) -> i32 {
        i32::from_be_bytes(self.read_array())
    }

    /// A 64-bit value as its two halves, high word first on the wire.
    pub fn read_halves(&mut self) -> Halves {
        let high = self.read_u32();
        let low = self.read_u32();
        Halves { high, low }
    }

    pub fn read_i64(&mut self) -> i64 {
        self.read_halves().to_i64()
    }

    pub fn read_f32(&mut self) -> f32 {
        f32::from_bits(self.read_u32())
    }

    pub fn read_f64(&mut self) -> f64 {
        self.read_halves().to_f64()
    }

    pub fn read_object_id(&mut self) -> u32 {
        self.read_u32()
    }

    pub fn read_ref_type_id(&mut self) -> u32 {
        self.read_u32()
    }

    /// A method id or other address, 4 or 8 bytes wide per the build.
    pub fn read_address(&mut self) -> u64 {
        if BuildFlags::CURRENT.address_size() == 4 {
            self.read_u32() as u64
        } else {
            self.read_i64() as u64
        }
    }

    pub fn read_location(&mut self) -> Location {
        let type_tag = self.read_u8();
        let class_id = self.read_u32();
        let method = self.read_address();
        let pc = self.read_i64() as u64;
        Location { type_tag, class_id, method, pc }
    }

    /// A length-prefixed byte string.
    pub fn read_utf(&mut self) -> Vec<u8> {
        let len = self.read_u32() as usize;
        if len > self.left {
            self.set_error(ErrorCode::Internal);
            return Vec::new();
        }
        let mut bytes = vec![0u8; len];
        self.read_into(&mut bytes);
        bytes
    }

    pub fn read_string(&mut self) -> String {
        match String::from_utf8(self.read_utf()) {
            Ok(s) => s,
            Err(_) => {
                self.set_error(ErrorCode::InvalidString);
                String::new()
            }
        }
    }

    /// Reads one untagged value of type `value_tag` into `out`, returning the
    /// number of cells written. Ints land in the int half of the cell,
    /// objects in the reference half, and 64-bit values fill two cells in
    /// build byte order. `resolve` maps a non-zero object id to its object.
    pub fn read_cells(
        &mut self,
        value_tag: u8,
        out: &mut [Cell],
        resolve: impl FnOnce(u32) -> Option<ObjectId>,
    ) -> usize {
        let needed = tag::cell_count(value_tag);
        if out.len() < needed {
            self.set_error(ErrorCode::Internal);
            return 0;
        }
        match value_tag {
            tag::BYTE => out[0] = Cell::from_int(self.read_i8() as i32),
            tag::BOOLEAN => out[0] = Cell::from_bool(self.read_bool()),
            tag::CHAR => out[0] = Cell::from_int(self.read_u16() as i32),
            tag::SHORT => out[0] = Cell::from_int(self.read_i16() as i32),
            // Floats keep their bit pattern in the int half.
            tag::INT | tag::FLOAT => out[0] = Cell::from_int(self.read_i32()),
            tag::LONG | tag::DOUBLE => {
                let cells = pack_i64(self.read_i64());
                out[..2].copy_from_slice(&cells);
            }
            tag::VOID => {}
            t if tag::is_object(t) => {
                let id = self.read_object_id();
                out[0] = if id == 0 {
                    Cell::NULL
                } else {
                    match resolve(id) {
                        Some(obj) => Cell::from_ref(obj),
                        None => {
                            self.set_error(ErrorCode::InvalidObject);
                            Cell::NULL
                        }
                    }
                };
            }
            _ => {
                self.set_error(ErrorCode::IllegalArgument);
                return 0;
            }
        }
        needed
    }
}

#[derive(Debug, Default, Clone)]
pub struct OutputStream {
    buf: Vec<u8>,
    error: ErrorCode,
}

impl OutputStream {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn position(&self) -> usize {
        self.buf.len()
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.buf
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.buf
    }

    /// Drops the contents and any error so the buffer can be reused.
    pub fn clear(&mut self) {
        self.buf.clear();
        self.error = ErrorCode::None;
    }

    pub fn error(&self) -> ErrorCode {
        self.error
    }

    pub fn is_ok(&self) -> bool {
        !self.error.is_error()
    }

    /// Records `error` unless an earlier one is already set.
    pub fn set_error(&mut self, error: ErrorCode) {
        if !self.error.is_error() {
            self.error = error;
        }
    }

    pub fn write_bytes(&mut self, bytes: &[u8]) {
        self.buf.extend_from_slice(bytes);
    }

    pub fn write_u8(&mut self, v: u8) {
        self.buf.push(v);
    }

    pub fn write_i8(&mut self, v: i8) {
        self.write_u8(v as u8);
    }

    pub fn write_bool(&mut self, v: bool) {
        self.write_u8(v as u8);
    }

    pub fn write_u16(&mut self, v: u16) {
        self.write_bytes(&v.to_be_bytes());
    }

    pub fn write_i16(&mut self, v: i16) {
        self.write_bytes(&v.to_be_bytes());
    }

    pub fn write_u32(&mut self, v: u32) {
        self.write_bytes(&v.to_be_bytes());
    }

    pub fn write_i32(&mut self, v: i32) {
        self.write_bytes(&v.to_be_bytes());
    }

    pub fn write_halves(&mut self, v: Halves) {
        self.write_u32(v.high);
        self.write_u32(v.low);
    }

    pub fn write_i64(&mut self, v: i64) {
        self.write_halves(Halves::from_i64(v));
    }

    pub fn write_f32(&mut self, v: f32) {
        self.write_u32(v.to_bits());
    }

    pub fn write_f64(&mut self, v: f64) {
        self.write_halves(Halves::from_f64(v));
    }

    pub fn write_object_id(&mut self, id: u32) {
        self.write_u32(id);
    }

    pub fn write_ref_type_id(&mut self, id: u32) {
        self.write_u32(id);
    }

    /// Writes 4 or 8 bytes per the build; 4-byte builds keep the low word.
    pub fn write_address(&mut self, addr: u64) {
        if BuildFlags::CURRENT.address_size() == 4 {
            self.write_u32(addr as u32);
        } else {
            self.write_i64(addr as i64);
        }
    }

    pub fn write_location(&mut self, loc: &Location) {
        self.write_u8(loc.type_tag);
        self.write_u32(loc.class_id);
        self.write_address(loc.method);
        self.write_i64(loc.pc as i64);
    }

    pub fn write_utf(&mut self, bytes: &[u8]) {
        self.write_u32(bytes.len() as u32);
        self.write_bytes(bytes);
    }

    pub fn write_string(&mut self, s: &str) {
        self.write_utf(s.as_bytes());
    }

    /// Writes the untagged value held in `cells`. `id_of` maps a
    /// referenced object to its debugger id.
    pub fn write_cells(&mut self, value_tag: u8, cells: &[Cell], id_of: impl FnOnce(ObjectId) -> u32) {
        if cells.len() < tag::cell_count(value_tag) {
            self.set_error(ErrorCode::Internal);
            return;
        }
        match value_tag {
            tag::BYTE => self.write_i8(cells[0].as_int() as i8),
            tag::BOOLEAN => self.write_bool(cells[0].as_bool()),
            tag::CHAR => self.write_u16(cells[0].as_int() as u16),
            tag::SHORT => self.write_i16(cells[0].as_int() as i16),
            tag::INT | tag::FLOAT => self.write_i32(cells[0].as_int()),
            tag::LONG | tag::DOUBLE => self.write_i64(unpack_i64([cells[0], cells[1]])),
            tag::VOID => {}
            t if tag::is_object(t) => self.write_object_id(cells[0].as_object().map_or(0, id_of)),
            _ => self.set_error(ErrorCode::IllegalArgument),
        }
    }

    /// Overwrites four bytes at `pos` with `v`, big-endian.
    pub fn rewrite_u32(&mut self, pos: usize, v: u32) -> bool {
        match self.buf.get_mut(pos..pos + 4) {
            Some(slot) => {
                slot.copy_from_slice(&v.to_be_bytes());
                true
            }
            None => {
                self.set_error(ErrorCode::Internal);
                false
            }
        }
    }
}

//! Bodies of object-like heap blocks.

use mote_core::{Cell, ObjectId};

use crate::class::PrimitiveType;

#[derive(Debug, Clone)]
pub struct Instance {
    pub clazz: ObjectId,
    pub fields: Vec<Cell>,
}

#[derive(Debug, Clone)]
pub struct Throwable {
    pub clazz: ObjectId,
    pub fields: Vec<Cell>,
    pub message: Option<ObjectId>,
    pub backtrace: Option<ObjectId>,
    /// Set when the runtime itself raised the throwable.
    pub native_thrown: bool,
}

/// `java.lang.Class` instance standing for a loaded class.
#[derive(Debug, Clone)]
pub struct ClassMirror {
    pub clazz: ObjectId,
    pub referent: ObjectId,
}

#[derive(Debug, Clone)]
pub enum StringChars {
    /// Slice of a pooled UTF block.
    Pooled { utf: ObjectId, offset: u32, length: u32 },
    Owned(Box<[u8]>),
}

#[derive(Debug, Clone)]
pub struct JavaString {
    pub clazz: ObjectId,
    pub chars: StringChars,
}

#[derive(Debug, Clone)]
pub struct WeakRef {
    pub clazz: ObjectId,
    pub fields: Vec<Cell>,
    pub referent: Option<ObjectId>,
}

#[derive(Debug, Clone)]
pub struct ObjectArray {
    pub clazz: ObjectId,
    pub elements: Vec<Option<ObjectId>>,
}

/// Primitive elements stored little-endian, `ty.size()` bytes each.
#[derive(Debug, Clone)]
pub struct PrimitiveArray {
    pub clazz: ObjectId,
    pub ty: PrimitiveType,
    data: Vec<u8>,
}

impl PrimitiveArray {
    pub fn new(clazz: ObjectId, ty: PrimitiveType, length: usize) -> Self {
        Self { clazz, ty, data: vec![0; length * ty.size()] }
    }

    pub fn len(&self) -> usize {
        self.data.len() / self.ty.size()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn byte_len(&self) -> usize {
        self.data.len()
    }

    /// Raw element bits, zero-extended.
    pub fn get_raw(&self, index: usize) -> Option<u64> {
        let size = self.ty.size();
        let bytes = self.data.get(index * size..(index + 1) * size)?;
        let mut buf = [0u8; 8];
        buf[..size].copy_from_slice(bytes);
        Some(u64::from_le_bytes(buf))
    }

    pub fn set_raw(&mut self, index: usize, bits: u64) -> bool {
        let size = self.ty.size();
        match self.data.get_mut(index * size..(index + 1) * size) {
            Some(slot) => {
                slot.copy_from_slice(&bits.to_le_bytes()[..size]);
                true
            }
            None => false,
        }
    }

    /// Element widened the way the interpreter loads it onto the stack.
    pub fn get_int(&self, index: usize) -> Option<i32> {
        let raw = self.get_raw(index)?;
        Some(match self.ty {
            PrimitiveType::Boolean | PrimitiveType::Byte => raw as u8 as i8 as i32,
            PrimitiveType::Short => raw as u16 as i16 as i32,
            PrimitiveType::Char => raw as u16 as i32,
            _ => raw as u32 as i32,
        })
    }

    pub fn get_long(&self, index: usize) -> Option<i64> {
        self.get_raw(index).map(|raw| raw as i64)
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn narrow_elements_are_sign_or_zero_extended() {
        let mut bytes = PrimitiveArray::new(ObjectId(0), PrimitiveType::Byte, 2);
        assert!(bytes.set_raw(0, 0xff));
        assert_eq!(bytes.get_int(0), Some(-1));

        let mut chars = PrimitiveArray::new(ObjectId(0), PrimitiveType::Char, 1);
        assert!(chars.set_raw(0, 0xffff));
        assert_eq!(chars.get_int(0), Some(0xffff));
        assert!(!chars.set_raw(1, 0));
    }

    #[test]
    fn long_elements_use_eight_bytes() {
        let mut longs = PrimitiveArray::new(ObjectId(0), PrimitiveType::Long, 3);
        assert_eq!(longs.len(), 3);
        assert_eq!(longs.byte_len(), 24);
        longs.set_raw(2, (-5i64) as u64);
        assert_eq!(longs.get_long(2), Some(-5));
    }
}

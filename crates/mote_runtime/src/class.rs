//! Class descriptors.
//!
//! A class descriptor lives in the heap like every other block. Instance
//! classes carry their statics and a reference map for instance fields;
//! array classes are told apart (reference vs. primitive) solely by whether
//! a component class is present.

use mote_core::{Cell, ObjectId};

use crate::heap::AllocType;

/// Primitive types, numbered with their `newarray` codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum PrimitiveType {
    Boolean = 4,
    Char = 5,
    Float = 6,
    Double = 7,
    Byte = 8,
    Short = 9,
    Int = 10,
    Long = 11,
}

impl PrimitiveType {
    pub const ALL: [PrimitiveType; 8] = [
        PrimitiveType::Boolean,
        PrimitiveType::Char,
        PrimitiveType::Float,
        PrimitiveType::Double,
        PrimitiveType::Byte,
        PrimitiveType::Short,
        PrimitiveType::Int,
        PrimitiveType::Long,
    ];

    pub fn code(self) -> u8 {
        self as u8
    }

    pub fn from_code(code: u8) -> Option<Self> {
        Self::ALL.into_iter().find(|t| t.code() == code)
    }

    /// Element size in bytes.
    pub fn size(self) -> usize {
        match self {
            PrimitiveType::Boolean | PrimitiveType::Byte => 1,
            PrimitiveType::Char | PrimitiveType::Short => 2,
            PrimitiveType::Float | PrimitiveType::Int => 4,
            PrimitiveType::Double | PrimitiveType::Long => 8,
        }
    }

    pub fn descriptor(self) -> u8 {
        match self {
            PrimitiveType::Boolean => b'Z',
            PrimitiveType::Char => b'C',
            PrimitiveType::Float => b'F',
            PrimitiveType::Double => b'D',
            PrimitiveType::Byte => b'B',
            PrimitiveType::Short => b'S',
            PrimitiveType::Int => b'I',
            PrimitiveType::Long => b'J',
        }
    }

    pub fn from_descriptor(c: u8) -> Option<Self> {
        Self::ALL.into_iter().find(|t| t.descriptor() == c)
    }

    pub fn name(self) -> &'static str {
        match self {
            PrimitiveType::Boolean => "boolean",
            PrimitiveType::Char => "char",
            PrimitiveType::Float => "float",
            PrimitiveType::Double => "double",
            PrimitiveType::Byte => "byte",
            PrimitiveType::Short => "short",
            PrimitiveType::Int => "int",
            PrimitiveType::Long => "long",
        }
    }

    /// Long and double occupy two cells.
    pub fn is_wide(self) -> bool {
        matches!(self, PrimitiveType::Long | PrimitiveType::Double)
    }

    pub fn index(self) -> usize {
        (self.code() - 4) as usize
    }
}

/// Reference type kind as reported to a debugger.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum RefTypeTag {
    Class = 1,
    Interface = 2,
    Array = 3,
}

/// Storage kind of a declared field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    Int,
    Float,
    Long,
    Double,
    Reference,
}

impl FieldKind {
    pub fn slots(self) -> usize {
        match self {
            FieldKind::Long | FieldKind::Double => 2,
            _ => 1,
        }
    }
}

/// Cell layout of a field block, with one reference bit per slot.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FieldLayout {
    ref_map: Vec<bool>,
}

impl FieldLayout {
    pub fn new(kinds: &[FieldKind]) -> Self {
        Self::default().extend(kinds)
    }

    /// Layout of a subclass: the parent's slots followed by `kinds`.
    pub fn extend(&self, kinds: &[FieldKind]) -> Self {
        let mut ref_map = self.ref_map.clone();
        for kind in kinds {
            for _ in 0..kind.slots() {
                ref_map.push(*kind == FieldKind::Reference);
            }
        }
        Self { ref_map }
    }

    pub fn slots(&self) -> usize {
        self.ref_map.len()
    }

    pub fn is_reference(&self, slot: usize) -> bool {
        self.ref_map.get(slot).copied().unwrap_or(false)
    }

    pub fn reference_slots(&self) -> impl Iterator<Item = usize> + '_ {
        self.ref_map
            .iter()
            .enumerate()
            .filter_map(|(slot, is_ref)| is_ref.then_some(slot))
    }

    /// Zeroed field block: null references, zero primitives.
    pub fn initial_cells(&self) -> Vec<Cell> {
        self.ref_map
            .iter()
            .map(|&is_ref| if is_ref { Cell::NULL } else { Cell::ZERO })
            .collect()
    }
}

/// Key of the array class cache.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ArrayComponent {
    Primitive(PrimitiveType),
    Class(ObjectId),
}

#[derive(Debug, Clone)]
pub enum ClazzKind {
    Instance {
        statics: Vec<Cell>,
        static_layout: FieldLayout,
        source_file: Option<ObjectId>,
    },
    Array {
        component: Option<ObjectId>,
        primitive: Option<PrimitiveType>,
    },
    Primitive {
        ty: PrimitiveType,
    },
}

#[derive(Debug, Clone)]
pub struct Clazz {
    /// Pooled UTF name in internal form (`java/lang/String`, `[I`).
    pub name: ObjectId,
    pub superclass: Option<ObjectId>,
    pub ref_type: RefTypeTag,
    pub dispatch: Vec<u32>,
    pub layout: FieldLayout,
    pub mirror: Option<ObjectId>,
    pub kind: ClazzKind,
}

impl Clazz {
    pub fn alloc_type(&self) -> AllocType {
        match self.kind {
            ClazzKind::Instance { .. } => AllocType::InstanceClazz,
            ClazzKind::Array { .. } => AllocType::ArrayClazz,
            ClazzKind::Primitive { .. } => AllocType::PrimitiveClazz,
        }
    }

    pub fn is_array(&self) -> bool {
        matches!(self.kind, ClazzKind::Array { .. })
    }

    pub fn is_instance_class(&self) -> bool {
        matches!(self.kind, ClazzKind::Instance { .. })
    }

    pub fn is_reference_array(&self) -> bool {
        matches!(self.kind, ClazzKind::Array { component: Some(_), .. })
    }

    pub fn component(&self) -> Option<ObjectId> {
        match self.kind {
            ClazzKind::Array { component, .. } => component,
            _ => None,
        }
    }

    pub fn source_file(&self) -> Option<ObjectId> {
        match self.kind {
            ClazzKind::Instance { source_file, .. } => source_file,
            _ => None,
        }
    }

    pub fn statics(&self) -> &[Cell] {
        match &self.kind {
            ClazzKind::Instance { statics, .. } => statics,
            _ => &[],
        }
    }

    pub fn statics_mut(&mut self) -> Option<&mut Vec<Cell>> {
        match &mut self.kind {
            ClazzKind::Instance { statics, .. } => Some(statics),
            _ => None,
        }
    }

    /// Visits every heap reference held by the descriptor. The name and
    /// source file are pooled and never collected.
    pub(crate) fn for_each_reference(&self, mut visit: impl FnMut(ObjectId)) {
        if let Some(sup) = self.superclass {
            visit(sup);
        }
        if let Some(mirror) = self.mirror {
            visit(mirror);
        }
        match &self.kind {
            ClazzKind::Instance { statics, static_layout, .. } => {
                for slot in static_layout.reference_slots() {
                    if let Some(id) = statics.get(slot).and_then(Cell::as_object) {
                        visit(id);
                    }
                }
            }
            ClazzKind::Array { component: Some(c), .. } => visit(*c),
            _ => {}
        }
    }
}

/// Description of an instance class handed over by the class loader.
#[derive(Debug, Clone, Copy, Default)]
pub struct ClassDef<'a> {
    pub name: &'a str,
    pub superclass: Option<ObjectId>,
    pub fields: &'a [FieldKind],
    pub static_fields: &'a [FieldKind],
    pub interface: bool,
    pub source_file: Option<&'a str>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn primitive_codes_round_trip() {
        for ty in PrimitiveType::ALL {
            assert_eq!(PrimitiveType::from_code(ty.code()), Some(ty));
            assert_eq!(PrimitiveType::from_descriptor(ty.descriptor()), Some(ty));
        }
        assert_eq!(PrimitiveType::Int.code(), 10);
        assert_eq!(PrimitiveType::from_code(3), None);
    }

    #[test]
    fn layout_extends_parent_slots() {
        let parent = FieldLayout::new(&[FieldKind::Reference, FieldKind::Int]);
        let child = parent.extend(&[FieldKind::Long, FieldKind::Reference]);
        assert_eq!(child.slots(), 5);
        assert_eq!(child.reference_slots().collect::<Vec<_>>(), vec![0, 4]);
        let cells = child.initial_cells();
        assert!(cells[0].is_null());
        assert_eq!(cells[1].as_int(), 0);
    }
}

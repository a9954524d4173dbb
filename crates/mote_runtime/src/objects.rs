//! Object allocation and access.

use mote_core::{Cell, ExitCode, ObjectId};

use crate::backtrace::Backtrace;
use crate::class::{ArrayComponent, ClazzKind, PrimitiveType};
use crate::exception::{DomainError, Throw, VmResult};
use crate::heap::{AllocType, BlockBody, REF, array_block_size};
use crate::object::{Instance, JavaString, ObjectArray, PrimitiveArray, StringChars, Throwable, WeakRef};
use crate::system::SystemClass;
use crate::vm::Vm;

impl Vm {
    pub fn new_instance(&mut self, clazz: ObjectId) -> VmResult<ObjectId> {
        let fields = match self.heap.clazz(clazz) {
            Some(c) if c.is_instance_class() => c.layout.initial_cells(),
            _ => return Err(self.throw_new(DomainError::Linkage, Some("not an instance class"))),
        };
        let weak_class = self.system.get(SystemClass::WeakReference);
        let body = if weak_class.is_some_and(|w| self.is_subclass_of(clazz, w)) {
            BlockBody::WeakRef(WeakRef { clazz, fields, referent: None })
        } else if self.is_throwable_class(clazz) {
            BlockBody::Throwable(Throwable { clazz, fields, message: None, backtrace: None, native_thrown: false })
        } else {
            BlockBody::Instance(Instance { clazz, fields })
        };
        let tag = match body {
            BlockBody::WeakRef(_) => AllocType::WeakReference,
            _ => AllocType::Object,
        };
        self.alloc(tag, body)
    }

    /// Allocates an array of `array_class`. Reference and primitive arrays
    /// are told apart by whether the class has a component class.
    pub fn new_array(&mut self, array_class: ObjectId, length: i32) -> VmResult<ObjectId> {
        let (component, primitive) = match self.heap.clazz(array_class).map(|c| &c.kind) {
            Some(ClazzKind::Array { component, primitive }) => (*component, *primitive),
            _ => return Err(self.throw_new(DomainError::Linkage, Some("not an array class"))),
        };
        if length < 0 {
            return Err(self.throw_new(DomainError::NegativeArraySize, Some(&length.to_string())));
        }
        let length = length as usize;
        let element_size = match (component, primitive) {
            (Some(_), _) => REF,
            (None, Some(ty)) => ty.size(),
            (None, None) => return Err(self.exit(ExitCode::InvariantViolated, "array class without element type")),
        };
        // Storage is only built once the request can fit the heap at all.
        match array_block_size(length, element_size) {
            Some(size) if size <= self.heap.limit() => {}
            size => return Err(self.out_of_memory(size.unwrap_or(usize::MAX))),
        }
        match primitive.filter(|_| component.is_none()) {
            None => self.alloc(
                AllocType::ArrayOfObject,
                BlockBody::ObjectArray(ObjectArray { clazz: array_class, elements: vec![None; length] }),
            ),
            Some(ty) => self.alloc(
                AllocType::ArrayOfPrimitive,
                BlockBody::PrimitiveArray(PrimitiveArray::new(array_class, ty, length)),
            ),
        }
    }

    pub fn new_object_array(&mut self, component: ObjectId, length: i32) -> VmResult<ObjectId> {
        let array_class = self.array_class_of(ArrayComponent::Class(component))?;
        self.new_array(array_class, length)
    }

    pub fn new_primitive_array(&mut self, ty: PrimitiveType, length: i32) -> VmResult<ObjectId> {
        let array_class = self.array_class_of(ArrayComponent::Primitive(ty))?;
        self.new_array(array_class, length)
    }

    /// A fresh, non-interned string owning its bytes.
    pub fn new_string(&mut self, s: &str) -> VmResult<ObjectId> {
        let clazz = self.system_class(SystemClass::String)?;
        let chars = StringChars::Owned(s.as_bytes().into());
        self.alloc(AllocType::String, BlockBody::String(JavaString { clazz, chars }))
    }

    pub fn new_weak_reference(&mut self, referent: Option<ObjectId>) -> VmResult<ObjectId> {
        let clazz = self.system_class(SystemClass::WeakReference)?;
        let fields = self.heap.clazz(clazz).map(|c| c.layout.initial_cells()).unwrap_or_default();
        self.alloc(AllocType::WeakReference, BlockBody::WeakRef(WeakRef { clazz, fields, referent }))
    }

    /// Creates a `java.lang.Thread` with the given name and registers it.
    pub fn new_thread(&mut self, name: &str) -> VmResult<ObjectId> {
        let clazz = self.system_class(SystemClass::Thread)?;
        self.with_transient(|vm| {
            let thread = vm.new_instance(clazz)?;
            vm.make_transient_root(thread)?;
            let name = vm.new_string(name)?;
            vm.set_field(thread, 0, Cell::from_ref(name))?;
            vm.register_thread(thread);
            Ok(thread)
        })
    }

    pub fn class_of(&self, obj: ObjectId) -> Option<ObjectId> {
        self.heap.body(obj)?.class()
    }

    pub fn is_string(&self, obj: ObjectId) -> bool {
        matches!(self.heap.body(obj), Some(BlockBody::String(_)))
    }

    fn fields(&self, obj: ObjectId) -> Option<&[Cell]> {
        match self.heap.body(obj)? {
            BlockBody::Instance(o) => Some(o.fields.as_slice()),
            BlockBody::Throwable(t) => Some(t.fields.as_slice()),
            BlockBody::WeakRef(w) => Some(w.fields.as_slice()),
            _ => None,
        }
    }

    fn fields_mut(&mut self, obj: ObjectId) -> Option<&mut Vec<Cell>> {
        match self.heap.body_mut(obj)? {
            BlockBody::Instance(o) => Some(&mut o.fields),
            BlockBody::Throwable(t) => Some(&mut t.fields),
            BlockBody::WeakRef(w) => Some(&mut w.fields),
            _ => None,
        }
    }

    pub fn field(&self, obj: ObjectId, slot: usize) -> Option<Cell> {
        self.fields(obj)?.get(slot).copied()
    }

    pub fn set_field(&mut self, obj: ObjectId, slot: usize, value: Cell) -> VmResult<()> {
        match self.fields_mut(obj).and_then(|f| f.get_mut(slot)) {
            Some(cell) => {
                *cell = value;
                Ok(())
            }
            None => Err(self.exit(ExitCode::InvariantViolated, format!("no field slot {slot} on {obj:?}"))),
        }
    }

    pub fn static_field(&self, clazz: ObjectId, slot: usize) -> Option<Cell> {
        self.heap.clazz(clazz)?.statics().get(slot).copied()
    }

    pub fn set_static_field(&mut self, clazz: ObjectId, slot: usize, value: Cell) -> VmResult<()> {
        match self.heap.clazz_mut(clazz).and_then(|c| c.statics_mut()).and_then(|s| s.get_mut(slot)) {
            Some(cell) => {
                *cell = value;
                Ok(())
            }
            None => Err(self.exit(ExitCode::InvariantViolated, format!("no static slot {slot} on {clazz:?}"))),
        }
    }

    pub fn array_length(&self, array: ObjectId) -> Option<usize> {
        match self.heap.body(array)? {
            BlockBody::ObjectArray(a) => Some(a.elements.len()),
            BlockBody::PrimitiveArray(a) => Some(a.len()),
            _ => None,
        }
    }

    fn index_error(&mut self, index: i32) -> Throw {
        self.throw_new(DomainError::ArrayIndexOutOfBounds, Some(&index.to_string()))
    }

    pub fn array_element(&mut self, array: ObjectId, index: i32) -> VmResult<Option<ObjectId>> {
        let element = match self.heap.body(array) {
            Some(BlockBody::ObjectArray(a)) => usize::try_from(index).ok().and_then(|i| a.elements.get(i).copied()),
            _ => return Err(self.throw_new(DomainError::ClassCast, Some("not a reference array"))),
        };
        match element {
            Some(element) => Ok(element),
            None => Err(self.index_error(index)),
        }
    }

    pub fn set_array_element(&mut self, array: ObjectId, index: i32, value: Option<ObjectId>) -> VmResult<()> {
        let slot = match self.heap.body_mut(array) {
            Some(BlockBody::ObjectArray(a)) => usize::try_from(index).ok().and_then(|i| a.elements.get_mut(i)),
            _ => return Err(self.throw_new(DomainError::ClassCast, Some("not a reference array"))),
        };
        match slot {
            Some(slot) => {
                *slot = value;
                Ok(())
            }
            None => Err(self.index_error(index)),
        }
    }

    /// Raw bits of a primitive element, zero-extended.
    pub fn primitive_element(&mut self, array: ObjectId, index: i32) -> VmResult<u64> {
        let bits = match self.heap.body(array) {
            Some(BlockBody::PrimitiveArray(a)) => usize::try_from(index).ok().and_then(|i| a.get_raw(i)),
            _ => return Err(self.throw_new(DomainError::ClassCast, Some("not a primitive array"))),
        };
        match bits {
            Some(bits) => Ok(bits),
            None => Err(self.index_error(index)),
        }
    }

    pub fn set_primitive_element(&mut self, array: ObjectId, index: i32, bits: u64) -> VmResult<()> {
        let stored = match self.heap.body_mut(array) {
            Some(BlockBody::PrimitiveArray(a)) => usize::try_from(index).is_ok_and(|i| a.set_raw(i, bits)),
            _ => return Err(self.throw_new(DomainError::ClassCast, Some("not a primitive array"))),
        };
        if stored { Ok(()) } else { Err(self.index_error(index)) }
    }

    pub fn string_bytes(&self, string: ObjectId) -> Option<&[u8]> {
        self.heap.string_bytes(string)
    }

    pub fn string_value(&self, string: ObjectId) -> Option<String> {
        self.string_bytes(string).map(|b| String::from_utf8_lossy(b).into_owned())
    }

    pub fn weak_referent(&self, weak: ObjectId) -> Option<ObjectId> {
        match self.heap.body(weak)? {
            BlockBody::WeakRef(w) => w.referent,
            _ => None,
        }
    }

    pub fn set_weak_referent(&mut self, weak: ObjectId, referent: Option<ObjectId>) -> bool {
        match self.heap.body_mut(weak) {
            Some(BlockBody::WeakRef(w)) => {
                w.referent = referent;
                true
            }
            _ => false,
        }
    }

    pub fn throwable_message(&self, throwable: ObjectId) -> Option<String> {
        match self.heap.body(throwable)? {
            BlockBody::Throwable(t) => self.string_value(t.message?),
            _ => None,
        }
    }

    pub fn throwable_backtrace(&self, throwable: ObjectId) -> Option<&Backtrace> {
        match self.heap.body(throwable)? {
            BlockBody::Throwable(t) => self.backtrace(t.backtrace?),
            _ => None,
        }
    }

    pub fn is_native_thrown(&self, throwable: ObjectId) -> bool {
        matches!(self.heap.body(throwable), Some(BlockBody::Throwable(t)) if t.native_thrown)
    }
}

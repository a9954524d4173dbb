//! Class definition and system class bootstrap.

use mote_core::{ExitCode, ObjectId};

use crate::class::{ArrayComponent, ClassDef, Clazz, ClazzKind, FieldKind, FieldLayout, PrimitiveType, RefTypeTag};
use crate::exception::{DomainError, VmResult};
use crate::heap::{AllocType, BlockBody};
use crate::object::ClassMirror;
use crate::system::SystemClass;
use crate::vm::Vm;

impl Vm {
    /// Defines the `java/lang` classes the runtime relies on, the primitive
    /// classes with their array classes, and the preallocated
    /// `OutOfMemoryError`. Calling it again is a no-op.
    pub fn bootstrap_system_classes(&mut self) -> VmResult<()> {
        if self.system.get(SystemClass::Object).is_some() {
            return Ok(());
        }
        for &class in SystemClass::ALL {
            let superclass = class.parent().map(|p| self.system_class(p)).transpose()?;
            let def = ClassDef { name: class.name(), superclass, fields: class.fields(), ..ClassDef::default() };
            let id = self.define_instance_class(&def)?;
            self.system.set(class, id);
        }
        for ty in PrimitiveType::ALL {
            self.define_primitive_class(ty)?;
            self.array_class_of(ArrayComponent::Primitive(ty))?;
        }

        let oom_class = self.system_class(SystemClass::OutOfMemoryError)?;
        let oom = self.create_exception(oom_class, None)?;
        self.pin(oom)?;
        self.oom = Some(oom);
        log::debug!("bootstrapped {} system classes", SystemClass::ALL.len());
        Ok(())
    }

    /// Defines an instance class and pins it for the VM lifetime.
    pub fn define_instance_class(&mut self, def: &ClassDef<'_>) -> VmResult<ObjectId> {
        for &kind in def.fields.iter().chain(def.static_fields) {
            match kind {
                FieldKind::Float => self.require_float_support()?,
                FieldKind::Long => self.require_int64_support()?,
                FieldKind::Double => {
                    self.require_float_support()?;
                    self.require_int64_support()?;
                }
                FieldKind::Int | FieldKind::Reference => {}
            }
        }
        let parent_layout = match def.superclass {
            Some(sup) => match self.heap.clazz(sup) {
                Some(c) if c.is_instance_class() => c.layout.clone(),
                _ => return Err(self.throw_new(DomainError::Linkage, Some(def.name))),
            },
            None => FieldLayout::default(),
        };
        let name = self.utf_str(def.name)?;
        let source_file = def.source_file.map(|s| self.utf_str(s)).transpose()?;
        let static_layout = FieldLayout::new(def.static_fields);
        let clazz = Clazz {
            name,
            superclass: def.superclass,
            ref_type: if def.interface { RefTypeTag::Interface } else { RefTypeTag::Class },
            dispatch: Vec::new(),
            layout: parent_layout.extend(def.fields),
            mirror: None,
            kind: ClazzKind::Instance { statics: static_layout.initial_cells(), static_layout, source_file },
        };
        let id = self.alloc(AllocType::InstanceClazz, BlockBody::Clazz(Box::new(clazz)))?;
        self.pin(id)?;
        log::trace!("defined class {}", def.name);
        Ok(id)
    }

    pub fn define_primitive_class(&mut self, ty: PrimitiveType) -> VmResult<ObjectId> {
        if let Some(id) = self.primitive_class(ty) {
            return Ok(id);
        }
        let name = self.utf_str(ty.name())?;
        let clazz = Clazz {
            name,
            superclass: None,
            ref_type: RefTypeTag::Class,
            dispatch: Vec::new(),
            layout: FieldLayout::default(),
            mirror: None,
            kind: ClazzKind::Primitive { ty },
        };
        let id = self.alloc(AllocType::PrimitiveClazz, BlockBody::Clazz(Box::new(clazz)))?;
        self.pin(id)?;
        self.primitive_classes[ty.index()] = Some(id);
        Ok(id)
    }

    /// The array class for `component`, created and cached on first use.
    pub fn array_class_of(&mut self, component: ArrayComponent) -> VmResult<ObjectId> {
        if let Some(&id) = self.array_classes.get(&component) {
            return Ok(id);
        }
        let (name, kind) = match component {
            ArrayComponent::Primitive(ty) => (
                format!("[{}", ty.descriptor() as char),
                ClazzKind::Array { component: None, primitive: Some(ty) },
            ),
            ArrayComponent::Class(c) => {
                let Some(component_name) = self.class_name(c) else {
                    return Err(self.exit(ExitCode::InvariantViolated, format!("{c:?} is not a class")));
                };
                let name = if component_name.starts_with('[') {
                    format!("[{component_name}")
                } else {
                    format!("[L{component_name};")
                };
                (name, ClazzKind::Array { component: Some(c), primitive: None })
            }
        };
        let name = self.utf_str(&name)?;
        let clazz = Clazz {
            name,
            superclass: self.system.get(SystemClass::Object),
            ref_type: RefTypeTag::Array,
            dispatch: Vec::new(),
            layout: FieldLayout::default(),
            mirror: None,
            kind,
        };
        let id = self.alloc(AllocType::ArrayClazz, BlockBody::Clazz(Box::new(clazz)))?;
        self.pin(id)?;
        self.array_classes.insert(component, id);
        Ok(id)
    }

    /// The `java.lang.Class` object for `clazz`, created on first use and
    /// pinned like the class itself.
    pub fn class_mirror(&mut self, clazz: ObjectId) -> VmResult<ObjectId> {
        match self.heap.clazz(clazz) {
            Some(c) => {
                if let Some(mirror) = c.mirror {
                    return Ok(mirror);
                }
            }
            None => return Err(self.throw_new(DomainError::ClassCast, Some("not a class"))),
        }
        let class_class = self.system_class(SystemClass::Class)?;
        let mirror = ClassMirror { clazz: class_class, referent: clazz };
        let id = self.alloc(AllocType::Object, BlockBody::Mirror(mirror))?;
        self.pin(id)?;
        if let Some(c) = self.heap.clazz_mut(clazz) {
            c.mirror = Some(id);
        }
        Ok(id)
    }

    /// Class named by a mirror object.
    pub fn mirror_referent(&self, mirror: ObjectId) -> Option<ObjectId> {
        match self.heap.body(mirror)? {
            BlockBody::Mirror(m) => Some(m.referent),
            _ => None,
        }
    }

    pub fn class_name(&self, clazz: ObjectId) -> Option<String> {
        let name = self.heap.clazz(clazz)?.name;
        self.utf_bytes(name).map(|b| String::from_utf8_lossy(b).into_owned())
    }

    /// Walks the superclass chain of `sub` looking for `sup`.
    pub fn is_subclass_of(&self, sub: ObjectId, sup: ObjectId) -> bool {
        let mut current = Some(sub);
        while let Some(c) = current {
            if c == sup {
                return true;
            }
            current = self.heap.clazz(c).and_then(|c| c.superclass);
        }
        false
    }

    pub fn is_throwable_class(&self, clazz: ObjectId) -> bool {
        self.system
            .get(SystemClass::Throwable)
            .is_some_and(|t| self.is_subclass_of(clazz, t))
    }
}

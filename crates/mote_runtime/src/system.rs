//! Classes the runtime itself depends on.

use mote_core::ObjectId;

use crate::class::FieldKind;

macro_rules! system_classes {
    ($($variant:ident => $name:literal $(extends $parent:ident)?,)*) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        pub enum SystemClass {
            $($variant,)*
        }

        impl SystemClass {
            /// Definition order; parents come before their subclasses.
            pub const ALL: &'static [SystemClass] = &[$(SystemClass::$variant,)*];

            pub fn name(self) -> &'static str {
                match self {
                    $(SystemClass::$variant => $name,)*
                }
            }

            pub fn parent(self) -> Option<SystemClass> {
                match self {
                    $(SystemClass::$variant => system_classes!(@parent $($parent)?),)*
                }
            }
        }
    };
    (@parent $parent:ident) => { Some(SystemClass::$parent) };
    (@parent) => { None };
}

system_classes! {
    Object => "java/lang/Object",
    Class => "java/lang/Class" extends Object,
    String => "java/lang/String" extends Object,
    Thread => "java/lang/Thread" extends Object,
    WeakReference => "java/lang/ref/WeakReference" extends Object,
    Throwable => "java/lang/Throwable" extends Object,
    Exception => "java/lang/Exception" extends Throwable,
    RuntimeException => "java/lang/RuntimeException" extends Exception,
    Error => "java/lang/Error" extends Throwable,
    ArithmeticException => "java/lang/ArithmeticException" extends RuntimeException,
    NullPointerException => "java/lang/NullPointerException" extends RuntimeException,
    ClassCastException => "java/lang/ClassCastException" extends RuntimeException,
    ArrayIndexOutOfBoundsException => "java/lang/ArrayIndexOutOfBoundsException" extends RuntimeException,
    NegativeArraySizeException => "java/lang/NegativeArraySizeException" extends RuntimeException,
    ClassNotFoundException => "java/lang/ClassNotFoundException" extends Exception,
    IOException => "java/io/IOException" extends Exception,
    OutOfMemoryError => "java/lang/OutOfMemoryError" extends Error,
    StackOverflowError => "java/lang/StackOverflowError" extends Error,
    LinkageError => "java/lang/LinkageError" extends Error,
    VerifyError => "java/lang/VerifyError" extends LinkageError,
    ClassFormatError => "java/lang/ClassFormatError" extends LinkageError,
}

impl SystemClass {
    pub fn index(self) -> usize {
        self as usize
    }

    /// Declared instance fields beyond the parent's.
    pub fn fields(self) -> &'static [FieldKind] {
        match self {
            // name, priority
            SystemClass::Thread => &[FieldKind::Reference, FieldKind::Int],
            _ => &[],
        }
    }
}

/// Loaded system classes, indexed by `SystemClass`.
#[derive(Debug, Clone, Default)]
pub(crate) struct SystemClasses {
    table: Vec<Option<ObjectId>>,
}

impl SystemClasses {
    pub(crate) fn get(&self, class: SystemClass) -> Option<ObjectId> {
        self.table.get(class.index()).copied().flatten()
    }

    pub(crate) fn set(&mut self, class: SystemClass, id: ObjectId) {
        if self.table.len() < SystemClass::ALL.len() {
            self.table.resize(SystemClass::ALL.len(), None);
        }
        self.table[class.index()] = Some(id);
    }
}

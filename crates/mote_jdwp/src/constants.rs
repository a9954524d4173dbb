//! Numeric constants of the debugger wire protocol.

/// Error codes carried in reply headers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[repr(u16)]
pub enum ErrorCode {
    #[default]
    None = 0,
    InvalidThread = 10,
    InvalidThreadGroup = 11,
    InvalidObject = 20,
    InvalidClass = 21,
    NotImplemented = 99,
    AbsentInformation = 101,
    IllegalArgument = 103,
    OutOfMemory = 110,
    VmDead = 112,
    Internal = 113,
    InvalidLength = 504,
    InvalidString = 506,
    InvalidArray = 508,
}

impl ErrorCode {
    pub fn code(self) -> u16 {
        self as u16
    }

    pub fn from_code(code: u16) -> Option<Self> {
        let e = match code {
            0 => ErrorCode::None,
            10 => ErrorCode::InvalidThread,
            11 => ErrorCode::InvalidThreadGroup,
            20 => ErrorCode::InvalidObject,
            21 => ErrorCode::InvalidClass,
            99 => ErrorCode::NotImplemented,
            101 => ErrorCode::AbsentInformation,
            103 => ErrorCode::IllegalArgument,
            110 => ErrorCode::OutOfMemory,
            112 => ErrorCode::VmDead,
            113 => ErrorCode::Internal,
            504 => ErrorCode::InvalidLength,
            506 => ErrorCode::InvalidString,
            508 => ErrorCode::InvalidArray,
            _ => return None,
        };
        Some(e)
    }

    pub fn is_error(self) -> bool {
        self != ErrorCode::None
    }
}

/// Value and object tags.
pub mod tag {
    pub const ARRAY: u8 = b'[';
    pub const BYTE: u8 = b'B';
    pub const CHAR: u8 = b'C';
    pub const OBJECT: u8 = b'L';
    pub const FLOAT: u8 = b'F';
    pub const DOUBLE: u8 = b'D';
    pub const INT: u8 = b'I';
    pub const LONG: u8 = b'J';
    pub const SHORT: u8 = b'S';
    pub const VOID: u8 = b'V';
    pub const BOOLEAN: u8 = b'Z';
    pub const STRING: u8 = b's';
    pub const THREAD: u8 = b't';
    pub const THREAD_GROUP: u8 = b'g';
    pub const CLASS_LOADER: u8 = b'l';
    pub const CLASS_OBJECT: u8 = b'c';

    /// Tags whose value is an object id.
    pub fn is_object(tag: u8) -> bool {
        matches!(tag, ARRAY | OBJECT | STRING | THREAD | THREAD_GROUP | CLASS_LOADER | CLASS_OBJECT)
    }

    /// Number of cells a value with this tag occupies.
    pub fn cell_count(tag: u8) -> usize {
        match tag {
            VOID => 0,
            LONG | DOUBLE => 2,
            _ => 1,
        }
    }
}

/// Command set numbers and the commands handled in each.
pub mod command_set {
    pub const VIRTUAL_MACHINE: u8 = 1;
    pub const REFERENCE_TYPE: u8 = 2;
    pub const ARRAY_TYPE: u8 = 4;
    pub const OBJECT_REFERENCE: u8 = 9;
    pub const STRING_REFERENCE: u8 = 10;
    pub const THREAD_GROUP_REFERENCE: u8 = 12;
    pub const ARRAY_REFERENCE: u8 = 13;
    pub const CLASS_OBJECT_REFERENCE: u8 = 17;

    pub mod vm {
        pub const TOP_LEVEL_THREAD_GROUPS: u8 = 5;
        pub const DISPOSE: u8 = 6;
        pub const ID_SIZES: u8 = 7;
    }

    pub mod array_type {
        pub const NEW_INSTANCE: u8 = 1;
    }

    pub mod object_reference {
        pub const REFERENCE_TYPE: u8 = 1;
        pub const DISABLE_COLLECTION: u8 = 7;
        pub const ENABLE_COLLECTION: u8 = 8;
        pub const IS_COLLECTED: u8 = 9;
    }

    pub mod string_reference {
        pub const VALUE: u8 = 1;
    }

    pub mod thread_group {
        pub const NAME: u8 = 1;
        pub const PARENT: u8 = 2;
        pub const CHILDREN: u8 = 3;
    }

    pub mod array_reference {
        pub const LENGTH: u8 = 1;
    }

    pub mod class_object {
        pub const REFLECTED_TYPE: u8 = 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_codes_round_trip_through_u16() {
        for code in [ErrorCode::InvalidObject, ErrorCode::InvalidArray, ErrorCode::VmDead] {
            assert_eq!(ErrorCode::from_code(code.code()), Some(code));
        }
        assert_eq!(ErrorCode::from_code(7), None);
    }

    #[test]
    fn wide_tags_take_two_cells() {
        assert_eq!(tag::cell_count(tag::LONG), 2);
        assert_eq!(tag::cell_count(tag::DOUBLE), 2);
        assert_eq!(tag::cell_count(tag::VOID), 0);
        assert_eq!(tag::cell_count(tag::INT), 1);
        assert!(tag::is_object(tag::STRING));
        assert!(!tag::is_object(tag::BOOLEAN));
    }
}

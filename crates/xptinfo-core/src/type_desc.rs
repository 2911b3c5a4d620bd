//! Type descriptors for parameters, results and array elements.
//!
//! A [`TypeDescriptor`] is the decoded form of a typelib type entry. Compound
//! types refer elsewhere by index:
//!
//! - [`TypeDescriptor::Interface`] names another interface by its 1-based
//!   ordinal in the owning typelib.
//! - [`TypeDescriptor::Array`] names its element type by a 0-based index into
//!   the owning interface's additional type table.

use num_enum::{IntoPrimitive, TryFromPrimitive};

use crate::TypeFlags;

/// Wire tag of a type descriptor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, IntoPrimitive, TryFromPrimitive)]
#[repr(u8)]
pub enum TypeTag {
    Int8 = 0,
    Int16 = 1,
    Int32 = 2,
    Int64 = 3,
    Uint8 = 4,
    Uint16 = 5,
    Uint32 = 6,
    Uint64 = 7,
    Float = 8,
    Double = 9,
    Bool = 10,
    Char = 11,
    WChar = 12,
    Void = 13,
    Iid = 14,
    DomString = 15,
    CharStr = 16,
    WCharStr = 17,
    Interface = 18,
    InterfaceIs = 19,
    Array = 20,
    PStringSizeIs = 21,
    PWStringSizeIs = 22,
    Utf8String = 23,
    CString = 24,
    AString = 25,
    JsVal = 26,
}

impl TypeTag {
    /// Tags that carry a payload and therefore have a dedicated
    /// [`TypeDescriptor`] variant.
    pub fn is_compound(self) -> bool {
        matches!(
            self,
            TypeTag::Interface
                | TypeTag::InterfaceIs
                | TypeTag::Array
                | TypeTag::PStringSizeIs
                | TypeTag::PWStringSizeIs
        )
    }

    /// Integer, floating point, boolean and character tags.
    pub fn is_arithmetic(self) -> bool {
        (self as u8) <= TypeTag::WChar as u8
    }
}

/// The tag and qualifiers of a type, without its payload.
///
/// This is what parameter type queries report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ParamType {
    pub tag: TypeTag,
    pub flags: TypeFlags,
}

impl ParamType {
    pub fn is_pointer(&self) -> bool {
        self.flags.contains(TypeFlags::POINTER)
    }

    pub fn is_reference(&self) -> bool {
        self.flags.contains(TypeFlags::REFERENCE)
    }

    /// Interface pointers, either statically typed or `iid_is`.
    pub fn is_interface_pointer(&self) -> bool {
        matches!(self.tag, TypeTag::Interface | TypeTag::InterfaceIs)
    }
}

/// A decoded type descriptor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TypeDescriptor {
    /// Any type without a payload. `tag` must not be compound.
    Simple { tag: TypeTag, flags: TypeFlags },
    /// Interface pointer of a statically known interface.
    Interface { ordinal: u16, flags: TypeFlags },
    /// Interface pointer whose iid is given by argument `arg`.
    InterfaceIs { arg: u8, flags: TypeFlags },
    /// Sized array whose element type is `additional_types[element]`.
    Array {
        element: u16,
        size_is: u8,
        length_is: u8,
        flags: TypeFlags,
    },
    /// Narrow or wide string with explicit size argument.
    SizedString {
        wide: bool,
        size_is: u8,
        length_is: u8,
        flags: TypeFlags,
    },
}

impl TypeDescriptor {
    /// A payload-free type with no qualifiers.
    pub fn simple(tag: TypeTag) -> Self {
        TypeDescriptor::Simple {
            tag,
            flags: TypeFlags::empty(),
        }
    }

    /// An interface pointer to the interface at `ordinal` (1-based).
    pub fn interface(ordinal: u16) -> Self {
        TypeDescriptor::Interface {
            ordinal,
            flags: TypeFlags::POINTER,
        }
    }

    /// An `iid_is(arg)` interface pointer.
    pub fn interface_is(arg: u8) -> Self {
        TypeDescriptor::InterfaceIs {
            arg,
            flags: TypeFlags::POINTER,
        }
    }

    /// An array of `additional_types[element]` sized by argument `size_is`.
    pub fn array(element: u16, size_is: u8) -> Self {
        TypeDescriptor::Array {
            element,
            size_is,
            length_is: size_is,
            flags: TypeFlags::POINTER,
        }
    }

    /// A sized string, wide or narrow.
    pub fn sized_string(wide: bool, size_is: u8) -> Self {
        TypeDescriptor::SizedString {
            wide,
            size_is,
            length_is: size_is,
            flags: TypeFlags::POINTER,
        }
    }

    /// Replace the qualifiers.
    pub fn with_flags(mut self, new_flags: TypeFlags) -> Self {
        match &mut self {
            TypeDescriptor::Simple { flags, .. }
            | TypeDescriptor::Interface { flags, .. }
            | TypeDescriptor::InterfaceIs { flags, .. }
            | TypeDescriptor::Array { flags, .. }
            | TypeDescriptor::SizedString { flags, .. } => *flags = new_flags,
        }
        self
    }

    pub fn tag(&self) -> TypeTag {
        match self {
            TypeDescriptor::Simple { tag, .. } => *tag,
            TypeDescriptor::Interface { .. } => TypeTag::Interface,
            TypeDescriptor::InterfaceIs { .. } => TypeTag::InterfaceIs,
            TypeDescriptor::Array { .. } => TypeTag::Array,
            TypeDescriptor::SizedString { wide: false, .. } => TypeTag::PStringSizeIs,
            TypeDescriptor::SizedString { wide: true, .. } => TypeTag::PWStringSizeIs,
        }
    }

    pub fn flags(&self) -> TypeFlags {
        match self {
            TypeDescriptor::Simple { flags, .. }
            | TypeDescriptor::Interface { flags, .. }
            | TypeDescriptor::InterfaceIs { flags, .. }
            | TypeDescriptor::Array { flags, .. }
            | TypeDescriptor::SizedString { flags, .. } => *flags,
        }
    }

    pub fn param_type(&self) -> ParamType {
        ParamType {
            tag: self.tag(),
            flags: self.flags(),
        }
    }

    /// Additional type index of the element, for arrays.
    pub fn array_element(&self) -> Option<u16> {
        match self {
            TypeDescriptor::Array { element, .. } => Some(*element),
            _ => None,
        }
    }

    /// Interface ordinal, for statically typed interface pointers.
    pub fn interface_ordinal(&self) -> Option<u16> {
        match self {
            TypeDescriptor::Interface { ordinal, .. } => Some(*ordinal),
            _ => None,
        }
    }

    /// The `size_is` argument number, for arrays and sized strings.
    pub fn size_is_arg(&self) -> Option<u8> {
        match self {
            TypeDescriptor::Array { size_is, .. } | TypeDescriptor::SizedString { size_is, .. } => {
                Some(*size_is)
            }
            _ => None,
        }
    }

    /// The `iid_is` argument number, for `iid_is` interface pointers.
    pub fn interface_is_arg(&self) -> Option<u8> {
        match self {
            TypeDescriptor::InterfaceIs { arg, .. } => Some(*arg),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tag_round_trips_through_u8() {
        let raw: u8 = TypeTag::Array.into();
        assert_eq!(raw, 20);
        assert_eq!(TypeTag::try_from(18u8).unwrap(), TypeTag::Interface);
        assert!(TypeTag::try_from(200u8).is_err());
    }

    #[test]
    fn compound_tags() {
        assert!(TypeTag::Array.is_compound());
        assert!(TypeTag::PWStringSizeIs.is_compound());
        assert!(!TypeTag::Int32.is_compound());
        assert!(!TypeTag::AString.is_compound());
    }

    #[test]
    fn arithmetic_tags() {
        assert!(TypeTag::Int8.is_arithmetic());
        assert!(TypeTag::WChar.is_arithmetic());
        assert!(!TypeTag::Void.is_arithmetic());
        assert!(!TypeTag::Interface.is_arithmetic());
    }

    #[test]
    fn descriptor_tags_follow_variant() {
        assert_eq!(TypeDescriptor::interface(3).tag(), TypeTag::Interface);
        assert_eq!(TypeDescriptor::interface_is(1).tag(), TypeTag::InterfaceIs);
        assert_eq!(TypeDescriptor::array(0, 1).tag(), TypeTag::Array);
        assert_eq!(TypeDescriptor::sized_string(false, 0).tag(), TypeTag::PStringSizeIs);
        assert_eq!(TypeDescriptor::sized_string(true, 0).tag(), TypeTag::PWStringSizeIs);
    }

    #[test]
    fn payload_accessors() {
        let array = TypeDescriptor::array(4, 2);
        assert_eq!(array.array_element(), Some(4));
        assert_eq!(array.size_is_arg(), Some(2));
        assert_eq!(array.interface_ordinal(), None);

        let iface = TypeDescriptor::interface(7);
        assert_eq!(iface.interface_ordinal(), Some(7));
        assert_eq!(iface.size_is_arg(), None);
        assert!(iface.param_type().is_interface_pointer());
        assert!(iface.param_type().is_pointer());
    }

    #[test]
    fn with_flags_replaces_qualifiers() {
        let ty = TypeDescriptor::simple(TypeTag::AString).with_flags(TypeFlags::REFERENCE);
        assert!(ty.param_type().is_reference());
        assert!(!ty.param_type().is_pointer());
    }
}

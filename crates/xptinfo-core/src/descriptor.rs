//! Decoded typelib tables.
//!
//! These types are what an external loader hands to the registry. They are
//! immutable once registered.
//!
//! - [`TypelibDescriptor`] - one loaded library: an ordered interface directory
//! - [`DirectoryEntry`] - name and iid of an interface, with its descriptor when
//!   the library defines it
//! - [`InterfaceDescriptor`] - parent ordinal, methods, constants, additional types
//! - [`MethodDescriptor`], [`ParamDescriptor`] - method shapes

use crate::{
    ConstDescriptor, InterfaceFlags, InterfaceId, MethodFlags, ParamFlags, RegistrationError,
    TypeDescriptor, TypeTag,
};

/// A method parameter or result.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ParamDescriptor {
    pub flags: ParamFlags,
    pub ty: TypeDescriptor,
}

impl ParamDescriptor {
    /// An `in` parameter.
    pub fn input(ty: TypeDescriptor) -> Self {
        Self {
            flags: ParamFlags::IN,
            ty,
        }
    }

    /// An `out` parameter.
    pub fn output(ty: TypeDescriptor) -> Self {
        Self {
            flags: ParamFlags::OUT,
            ty,
        }
    }

    /// An `out retval` parameter.
    pub fn retval(ty: TypeDescriptor) -> Self {
        Self {
            flags: ParamFlags::OUT | ParamFlags::RETVAL,
            ty,
        }
    }

    pub fn is_in(&self) -> bool {
        self.flags.contains(ParamFlags::IN)
    }

    pub fn is_out(&self) -> bool {
        self.flags.contains(ParamFlags::OUT)
    }

    pub fn is_retval(&self) -> bool {
        self.flags.contains(ParamFlags::RETVAL)
    }
}

/// A method declared on an interface.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MethodDescriptor {
    pub name: String,
    pub flags: MethodFlags,
    pub params: Vec<ParamDescriptor>,
    /// Native return value.
    pub result: ParamDescriptor,
}

impl MethodDescriptor {
    /// A method with no parameters returning a status code.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            flags: MethodFlags::empty(),
            params: Vec::new(),
            result: ParamDescriptor::output(TypeDescriptor::simple(TypeTag::Uint32)),
        }
    }

    pub fn with_param(mut self, param: ParamDescriptor) -> Self {
        self.params.push(param);
        self
    }

    pub fn with_flags(mut self, flags: MethodFlags) -> Self {
        self.flags = flags;
        self
    }

    pub fn is_getter(&self) -> bool {
        self.flags.contains(MethodFlags::GETTER)
    }

    pub fn is_setter(&self) -> bool {
        self.flags.contains(MethodFlags::SETTER)
    }

    pub fn is_hidden(&self) -> bool {
        self.flags.contains(MethodFlags::HIDDEN)
    }

    /// Parameters followed by the result.
    pub fn all_params(&self) -> impl Iterator<Item = &ParamDescriptor> {
        self.params.iter().chain(std::iter::once(&self.result))
    }
}

/// The full shape of one interface.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct InterfaceDescriptor {
    /// 1-based ordinal of the parent in the same typelib, 0 for none.
    pub parent_interface: u16,
    pub flags: InterfaceFlags,
    pub methods: Vec<MethodDescriptor>,
    pub constants: Vec<ConstDescriptor>,
    /// Element types referenced by [`TypeDescriptor::Array`].
    pub additional_types: Vec<TypeDescriptor>,
}

impl InterfaceDescriptor {
    /// A root interface with no members.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_parent(mut self, ordinal: u16) -> Self {
        self.parent_interface = ordinal;
        self
    }

    pub fn with_flags(mut self, flags: InterfaceFlags) -> Self {
        self.flags = flags;
        self
    }

    pub fn with_method(mut self, method: MethodDescriptor) -> Self {
        self.methods.push(method);
        self
    }

    pub fn with_constant(mut self, constant: ConstDescriptor) -> Self {
        self.constants.push(constant);
        self
    }

    /// Append an additional type; its index is the current table length.
    pub fn with_additional_type(mut self, ty: TypeDescriptor) -> Self {
        self.additional_types.push(ty);
        self
    }

    /// Number of methods declared directly on this interface.
    pub fn num_methods(&self) -> u16 {
        self.methods.len() as u16
    }

    /// Number of constants declared directly on this interface.
    pub fn num_constants(&self) -> u16 {
        self.constants.len() as u16
    }

    pub fn is_scriptable(&self) -> bool {
        self.flags.contains(InterfaceFlags::SCRIPTABLE)
    }
}

/// One slot of a typelib's interface directory.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DirectoryEntry {
    pub name: String,
    pub iid: InterfaceId,
    /// `None` for interfaces this library only declares.
    pub descriptor: Option<InterfaceDescriptor>,
}

impl DirectoryEntry {
    /// An interface defined by this library.
    pub fn defined(name: impl Into<String>, iid: InterfaceId, descriptor: InterfaceDescriptor) -> Self {
        Self {
            name: name.into(),
            iid,
            descriptor: Some(descriptor),
        }
    }

    /// An interface referenced but defined elsewhere.
    pub fn declared(name: impl Into<String>, iid: InterfaceId) -> Self {
        Self {
            name: name.into(),
            iid,
            descriptor: None,
        }
    }
}

/// A decoded typelib: its interface directory in ordinal order.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct TypelibDescriptor {
    pub name: String,
    pub interfaces: Vec<DirectoryEntry>,
}

impl TypelibDescriptor {
    /// An empty directory named `name`.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            interfaces: Vec::new(),
        }
    }

    /// Append a directory entry. Its ordinal is the new table length.
    pub fn with_interface(mut self, entry: DirectoryEntry) -> Self {
        self.interfaces.push(entry);
        self
    }

    /// Check every cross-reference before the table is published.
    ///
    /// Ordinals must stay inside the directory, array elements inside the
    /// owning interface's additional types, and member counts inside `u16`.
    /// Whether a referenced interface is actually available is a runtime
    /// question and is not checked here.
    pub fn validate(&self) -> Result<(), RegistrationError> {
        let count = self.interfaces.len();
        if count > usize::from(u16::MAX) {
            return Err(RegistrationError::TooManyInterfaces {
                typelib: self.name.clone(),
                count,
            });
        }

        for entry in &self.interfaces {
            let Some(desc) = &entry.descriptor else {
                continue;
            };
            let name = &entry.name;

            if usize::from(desc.parent_interface) > count {
                return Err(RegistrationError::ParentOrdinalOutOfRange {
                    interface: name.clone(),
                    ordinal: desc.parent_interface,
                });
            }
            if desc.methods.len() > usize::from(u16::MAX) {
                return Err(RegistrationError::TooManyMethods {
                    interface: name.clone(),
                    count: desc.methods.len(),
                });
            }
            if desc.constants.len() > usize::from(u16::MAX) {
                return Err(RegistrationError::TooManyConstants {
                    interface: name.clone(),
                    count: desc.constants.len(),
                });
            }

            let types = desc
                .methods
                .iter()
                .flat_map(|m| m.all_params().map(|p| &p.ty))
                .chain(desc.additional_types.iter());
            for ty in types {
                validate_type(name, ty, count, desc.additional_types.len())?;
            }
        }
        Ok(())
    }
}

fn validate_type(
    interface: &str,
    ty: &TypeDescriptor,
    directory_len: usize,
    additional_len: usize,
) -> Result<(), RegistrationError> {
    match *ty {
        TypeDescriptor::Simple { tag, .. } if tag.is_compound() => {
            Err(RegistrationError::CompoundTagInSimpleType {
                interface: interface.to_string(),
                tag,
            })
        }
        TypeDescriptor::Interface { ordinal, .. }
            if ordinal == 0 || usize::from(ordinal) > directory_len =>
        {
            Err(RegistrationError::InterfaceOrdinalOutOfRange {
                interface: interface.to_string(),
                ordinal,
            })
        }
        TypeDescriptor::Array { element, .. } if usize::from(element) >= additional_len => {
            Err(RegistrationError::AdditionalTypeOutOfRange {
                interface: interface.to_string(),
                index: element,
            })
        }
        _ => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ConstantValue;

    fn lib_with(desc: InterfaceDescriptor) -> TypelibDescriptor {
        TypelibDescriptor::new("test.xpt").with_interface(DirectoryEntry::defined(
            "IFoo",
            InterfaceId::from_name("IFoo"),
            desc,
        ))
    }

    #[test]
    fn builder_counts() {
        let desc = InterfaceDescriptor::new()
            .with_method(MethodDescriptor::new("a"))
            .with_method(MethodDescriptor::new("b"))
            .with_constant(ConstDescriptor::new("C", crate::ConstantValue::Int32(1)));
        assert_eq!(desc.num_methods(), 2);
        assert_eq!(desc.num_constants(), 1);
        assert_eq!(desc.parent_interface, 0);
        assert!(!desc.is_scriptable());
    }

    #[test]
    fn all_params_ends_with_result() {
        let method = MethodDescriptor::new("get")
            .with_param(ParamDescriptor::input(TypeDescriptor::simple(TypeTag::Int32)));
        let params: Vec<_> = method.all_params().collect();
        assert_eq!(params.len(), 2);
        assert_eq!(params[1], &method.result);
    }

    #[test]
    fn validate_accepts_well_formed() {
        let desc = InterfaceDescriptor::new()
            .with_additional_type(TypeDescriptor::interface(1))
            .with_method(
                MethodDescriptor::new("m").with_param(ParamDescriptor::input(TypeDescriptor::array(0, 1))),
            );
        assert_eq!(lib_with(desc).validate(), Ok(()));
    }

    #[test]
    fn validate_rejects_parent_out_of_range() {
        let desc = InterfaceDescriptor::new().with_parent(2);
        assert!(matches!(
            lib_with(desc).validate(),
            Err(RegistrationError::ParentOrdinalOutOfRange { ordinal: 2, .. })
        ));
    }

    #[test]
    fn validate_rejects_bad_array_element() {
        let desc = InterfaceDescriptor::new().with_method(
            MethodDescriptor::new("m").with_param(ParamDescriptor::input(TypeDescriptor::array(0, 1))),
        );
        assert!(matches!(
            lib_with(desc).validate(),
            Err(RegistrationError::AdditionalTypeOutOfRange { index: 0, .. })
        ));
    }

    #[test]
    fn validate_rejects_zero_interface_ordinal() {
        let desc = InterfaceDescriptor::new().with_method(
            MethodDescriptor::new("m").with_param(ParamDescriptor::input(TypeDescriptor::interface(0))),
        );
        assert!(matches!(
            lib_with(desc).validate(),
            Err(RegistrationError::InterfaceOrdinalOutOfRange { ordinal: 0, .. })
        ));
    }

    #[test]
    fn validate_rejects_compound_simple() {
        let desc = InterfaceDescriptor::new().with_method(MethodDescriptor::new("m").with_param(
            ParamDescriptor::input(TypeDescriptor::simple(TypeTag::Array)),
        ));
        assert!(matches!(
            lib_with(desc).validate(),
            Err(RegistrationError::CompoundTagInSimpleType { tag: TypeTag::Array, .. })
        ));
    }

    #[test]
    fn validate_rejects_too_many_methods() {
        let desc = InterfaceDescriptor {
            methods: vec![MethodDescriptor::new("m"); usize::from(u16::MAX) + 1],
            ..InterfaceDescriptor::new()
        };
        assert_eq!(
            lib_with(desc).validate(),
            Err(RegistrationError::TooManyMethods {
                interface: "IFoo".into(),
                count: 65_536,
            })
        );
    }

    #[test]
    fn validate_accepts_max_methods() {
        let desc = InterfaceDescriptor {
            methods: vec![MethodDescriptor::new("m"); usize::from(u16::MAX)],
            ..InterfaceDescriptor::new()
        };
        assert_eq!(lib_with(desc).validate(), Ok(()));
    }

    #[test]
    fn validate_rejects_too_many_constants() {
        let desc = InterfaceDescriptor {
            constants: vec![
                ConstDescriptor::new("C", ConstantValue::Bool(true));
                usize::from(u16::MAX) + 1
            ],
            ..InterfaceDescriptor::new()
        };
        assert!(matches!(
            lib_with(desc).validate(),
            Err(RegistrationError::TooManyConstants { count: 65_536, .. })
        ));
    }

    #[test]
    fn validate_rejects_too_many_interfaces() {
        let lib = TypelibDescriptor {
            interfaces: vec![
                DirectoryEntry::declared("IDecl", InterfaceId::ZERO);
                usize::from(u16::MAX) + 1
            ],
            ..TypelibDescriptor::new("huge.xpt")
        };
        assert_eq!(
            lib.validate(),
            Err(RegistrationError::TooManyInterfaces {
                typelib: "huge.xpt".into(),
                count: 65_536,
            })
        );
    }

    #[test]
    fn declared_entries_are_not_validated() {
        let lib = TypelibDescriptor::new("decl.xpt")
            .with_interface(DirectoryEntry::declared("IElsewhere", InterfaceId::from_name("IElsewhere")));
        assert_eq!(lib.validate(), Ok(()));
    }
}

//! Lazily resolved interface metadata.
//!
//! Typelib loaders hand decoded descriptor tables to an
//! [`InterfaceRegistry`]. Interfaces resolve their inheritance chains on
//! first use, and callers query the flattened shape (methods, constants,
//! parameter types, array dimensions, ancestry) through
//! [`ResolvedInterface`] views or cached [`InterfaceInfo`] handles.
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use xptinfo::prelude::*;
//!
//! let foo = InterfaceDescriptor::new()
//!     .with_method(MethodDescriptor::new("open"))
//!     .with_method(MethodDescriptor::new("close"));
//! let bar = InterfaceDescriptor::new()
//!     .with_parent(1)
//!     .with_method(MethodDescriptor::new("read"));
//! let lib = TypelibDescriptor::new("io.xpt")
//!     .with_interface(DirectoryEntry::defined("IFoo", InterfaceId::from_name("IFoo"), foo))
//!     .with_interface(DirectoryEntry::defined("IBar", InterfaceId::from_name("IBar"), bar));
//!
//! let mut registry = InterfaceRegistry::new();
//! registry.register_typelib(lib).unwrap();
//! let registry = Arc::new(registry);
//!
//! let info = registry.info_for_name("IBar").unwrap();
//! assert_eq!(info.method_count(), Ok(3));
//! assert_eq!(info.method(0).unwrap().name, "open");
//! assert_eq!(info.has_ancestor(&InterfaceId::from_name("IFoo")), Ok(true));
//! ```

pub use xptinfo_core as core;
pub use xptinfo_registry as registry;

pub use xptinfo_core::{InfoError, InfoResult, InterfaceId, RegistrationError};
pub use xptinfo_registry::{InterfaceInfo, InterfaceRegistry, ResolvedInterface};

pub mod prelude {
    pub use xptinfo_core::{
        ConstDescriptor, ConstantValue, DirectoryEntry, DynamicValue, EntryId, InfoError,
        InfoResult, InterfaceDescriptor, InterfaceFlags, InterfaceId, MethodDescriptor,
        MethodFlags, ParamDescriptor, ParamFlags, ParamType, RegistrationError, ResolveFailure,
        TypeDescriptor, TypeFlags, TypeTag, TypelibDescriptor, TypelibId,
    };
    pub use xptinfo_registry::{
        InfoStats, InterfaceEntry, InterfaceInfo, InterfaceRegistry, RegistryOptions,
        Resolution, ResolveState, ResolvedInterface, Typelib,
    };
}

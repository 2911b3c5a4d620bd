//! Descriptor data model for the interface info registry.
//!
//! This crate holds the immutable, externally supplied side of the system:
//! decoded typelib tables, interface identities, flag sets and the error
//! taxonomy. Resolution, handles and queries live in `xptinfo-registry`.

mod constant;
mod descriptor;
mod error;
mod flags;
mod ids;
mod iid;
mod type_desc;

pub use constant::{ConstDescriptor, ConstantValue, DynamicValue};
pub use descriptor::{
    DirectoryEntry, InterfaceDescriptor, MethodDescriptor, ParamDescriptor, TypelibDescriptor,
};
pub use error::{InfoError, InfoResult, RegistrationError, ResolveFailure};
pub use flags::{InterfaceFlags, MethodFlags, ParamFlags, TypeFlags};
pub use ids::{EntryId, TypelibId};
pub use iid::{InterfaceId, ParseIdError};
pub use type_desc::{ParamType, TypeDescriptor, TypeTag};

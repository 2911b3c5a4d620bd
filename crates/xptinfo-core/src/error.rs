//! Error types for interface registration and queries.
//!
//! ## Error Hierarchy
//!
//! ```text
//! RegistrationError - a typelib table is malformed (load time)
//! InfoError         - a query or resolution failed (run time)
//! └── ResolveFailure  - why an entry's resolution failed permanently
//! ```
//!
//! Registration errors describe malformed input. Runtime absence of a
//! well-formed reference is reported separately as
//! [`InfoError::DeclaredInterfaceUnavailable`].

use thiserror::Error;

use crate::{EntryId, InterfaceId, TypeTag};

/// Result alias for the query surface.
pub type InfoResult<T> = Result<T, InfoError>;

// ============================================================================
// Registration Errors
// ============================================================================

/// Errors found while validating a typelib before it is registered.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistrationError {
    /// A parent ordinal points past the end of the directory.
    #[error("interface '{interface}': parent ordinal {ordinal} is out of range")]
    ParentOrdinalOutOfRange { interface: String, ordinal: u16 },

    /// An interface type refers to ordinal 0 or past the end of the directory.
    #[error("interface '{interface}': interface ordinal {ordinal} is out of range")]
    InterfaceOrdinalOutOfRange { interface: String, ordinal: u16 },

    /// An array element index points past the additional type table.
    #[error("interface '{interface}': additional type {index} is out of range")]
    AdditionalTypeOutOfRange { interface: String, index: u16 },

    /// A simple type descriptor carries a tag that needs a payload.
    #[error("interface '{interface}': tag {tag:?} cannot be used as a simple type")]
    CompoundTagInSimpleType { interface: String, tag: TypeTag },

    /// A different interface is already registered under this name.
    #[error("duplicate interface name '{name}': registered as {existing}, redeclared as {new}")]
    DuplicateName {
        name: String,
        existing: InterfaceId,
        new: InterfaceId,
    },

    #[error("typelib '{typelib}' has {count} interfaces, more than an ordinal can address")]
    TooManyInterfaces { typelib: String, count: usize },

    #[error("interface '{interface}' declares {count} methods")]
    TooManyMethods { interface: String, count: usize },

    #[error("interface '{interface}' declares {count} constants")]
    TooManyConstants { interface: String, count: usize },
}

// ============================================================================
// Resolution and Query Errors
// ============================================================================

/// Why an entry failed to resolve. Failure is permanent.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ResolveFailure {
    /// The parent ordinal does not correspond to any loaded interface.
    #[error("parent interface at ordinal {ordinal} is not available")]
    MissingParent { ordinal: u16 },

    /// The parent exists but could not be resolved itself.
    #[error("parent interface '{parent}' failed to resolve")]
    ParentFailed { parent: String },

    /// Inherited member counts no longer fit the flattened numbering.
    #[error("member count overflows after parent '{parent}'")]
    IndexOverflow { parent: String },

    /// The parent chain loops back on itself.
    #[error("inheritance chain is cyclic")]
    InheritanceCycle,
}

/// Errors reported by the query surface and by resolution.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InfoError {
    /// The operation needs a resolved interface and resolution has not
    /// succeeded yet.
    #[error("interface '{name}' is not resolved")]
    Unresolved { name: String },

    /// Resolution failed permanently.
    #[error("interface '{name}' failed to resolve: {reason}")]
    ResolutionFailed { name: String, reason: ResolveFailure },

    /// A method, constant or parameter index is outside the resolved chain.
    #[error("index {index} is out of range for '{name}' (count {count})")]
    IndexOutOfRange { name: String, index: u16, count: u16 },

    #[error("parameter is not an interface type")]
    NotAnInterfaceType,

    /// A dimension walk met a non-array type before reaching `dimension`.
    #[error("parameter type is not an array at dimension {dimension}")]
    NotAnArrayType { dimension: u16 },

    #[error("parameter type has no size_is argument")]
    NotASizeIsType,

    #[error("parameter type has no iid_is argument")]
    NotAnIidIsType,

    /// The schema names an interface that is not loaded at runtime.
    #[error("declared interface '{name}' {iid} at ordinal {ordinal} is not available")]
    DeclaredInterfaceUnavailable {
        ordinal: u16,
        name: String,
        iid: InterfaceId,
    },

    /// Name lookup exhausted the whole ancestor chain.
    #[error("'{name}' not found")]
    NotFound { name: String },

    /// The handle was detached from its entry by invalidation.
    #[error("interface info for '{name}' has been invalidated")]
    Invalidated { name: String },

    #[error("no entry {0} in this registry")]
    UnknownEntry(EntryId),
}

impl InfoError {
    /// Whether this error means the interface as a whole is unusable, as
    /// opposed to a single member or related type being unavailable.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            InfoError::ResolutionFailed { .. } | InfoError::Invalidated { .. }
        )
    }
}

//! Identifier types for registry-owned objects.
//!
//! Entries and typelibs live in flat tables owned by the registry; relations
//! between them (parent links, interface references) are stored as these
//! indices rather than as references.

use std::fmt;

/// Identifies an interface entry in the registry's entry table.
///
/// # Example
///
/// ```
/// use xptinfo_core::EntryId;
///
/// let entry = EntryId::new(3);
/// assert_eq!(entry.index(), 3);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EntryId(u32);

impl EntryId {
    /// Create an entry id from a raw table index.
    #[inline]
    pub const fn new(index: u32) -> Self {
        Self(index)
    }

    /// Position in the registry's entry table.
    #[inline]
    pub const fn index(self) -> u32 {
        self.0
    }
}

impl fmt::Display for EntryId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "entry_{}", self.0)
    }
}

/// Identifies a registered typelib.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TypelibId(u32);

impl TypelibId {
    /// Create a typelib id from a raw table index.
    #[inline]
    pub const fn new(index: u32) -> Self {
        Self(index)
    }

    /// Position in the registry's typelib table.
    #[inline]
    pub const fn index(self) -> u32 {
        self.0
    }
}

impl fmt::Display for TypelibId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "typelib_{}", self.0)
    }
}

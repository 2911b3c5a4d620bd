//! Interface entries.
//!
//! An [`InterfaceEntry`] is the registry-owned node for one interface. It
//! holds the raw descriptor and, once resolution has run, the outcome:
//! either a [`Resolution`] (parent link and base indices) or a
//! [`ResolveFailure`]. The outcome is written exactly once, under the
//! working-set lock, and read without locking afterwards.

use std::sync::OnceLock;

use xptinfo_core::{
    EntryId, InterfaceDescriptor, InterfaceFlags, InterfaceId, ResolveFailure, TypelibId,
};

/// Where an entry is in its resolution lifecycle.
///
/// Transitions only from `PartiallyResolved` to one of the other two.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResolveState {
    PartiallyResolved,
    FullyResolved,
    ResolveFailed,
}

/// Chain position of a fully resolved entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Resolution {
    pub(crate) parent: Option<EntryId>,
    pub(crate) method_base_index: u16,
    pub(crate) constant_base_index: u16,
}

impl Resolution {
    pub(crate) const ROOT: Resolution = Resolution {
        parent: None,
        method_base_index: 0,
        constant_base_index: 0,
    };

    /// The parent entry, `None` for a root interface.
    pub fn parent(&self) -> Option<EntryId> {
        self.parent
    }

    /// Index of this interface's first own method in the flattened numbering.
    pub fn method_base_index(&self) -> u16 {
        self.method_base_index
    }

    /// Index of this interface's first own constant in the flattened numbering.
    pub fn constant_base_index(&self) -> u16 {
        self.constant_base_index
    }
}

pub(crate) type Outcome = Result<Resolution, ResolveFailure>;

/// Registry entry for one interface.
#[derive(Debug)]
pub struct InterfaceEntry {
    id: EntryId,
    name: String,
    iid: InterfaceId,
    descriptor: InterfaceDescriptor,
    /// Typelib whose directory the parent and interface ordinals index.
    typelib: TypelibId,
    pub(crate) outcome: OnceLock<Outcome>,
}

impl InterfaceEntry {
    pub(crate) fn new(
        id: EntryId,
        name: String,
        iid: InterfaceId,
        descriptor: InterfaceDescriptor,
        typelib: TypelibId,
    ) -> Self {
        Self {
            id,
            name,
            iid,
            descriptor,
            typelib,
            outcome: OnceLock::new(),
        }
    }

    /// This entry's position in the registry.
    pub fn id(&self) -> EntryId {
        self.id
    }

    // Name, iid and the scriptable flag come straight from the directory and
    // never need resolution.

    /// Interface name as declared in the typelib.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Interface identity.
    pub fn iid(&self) -> InterfaceId {
        self.iid
    }

    /// Whether this entry has identity `iid`.
    pub fn is_iid(&self, iid: &InterfaceId) -> bool {
        self.iid == *iid
    }

    /// Whether the descriptor carries the scriptable flag.
    pub fn is_scriptable(&self) -> bool {
        self.descriptor.flags.contains(InterfaceFlags::SCRIPTABLE)
    }

    /// The raw descriptor. Indices in it are local to this interface.
    pub fn descriptor(&self) -> &InterfaceDescriptor {
        &self.descriptor
    }

    /// The typelib that defined this entry.
    pub fn typelib(&self) -> TypelibId {
        self.typelib
    }

    /// Current position in the resolution lifecycle.
    pub fn resolve_state(&self) -> ResolveState {
        match self.outcome.get() {
            None => ResolveState::PartiallyResolved,
            Some(Ok(_)) => ResolveState::FullyResolved,
            Some(Err(_)) => ResolveState::ResolveFailed,
        }
    }

    pub fn is_fully_resolved(&self) -> bool {
        matches!(self.outcome.get(), Some(Ok(_)))
    }

    /// The resolution, if this entry is fully resolved.
    pub fn resolution(&self) -> Option<&Resolution> {
        self.outcome.get().and_then(|o| o.as_ref().ok())
    }

    /// The failure reason, if resolution failed.
    pub fn failure(&self) -> Option<&ResolveFailure> {
        self.outcome.get().and_then(|o| o.as_ref().err())
    }
}

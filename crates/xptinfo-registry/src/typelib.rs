//! Registered typelib directories.
//!
//! A [`Typelib`] maps the 1-based ordinals used inside descriptors to
//! registry entries. Slots for interfaces the library defines are filled at
//! registration; slots for interfaces it only declares are filled the first
//! time they are looked up, if the interface is loaded by then.

use std::sync::OnceLock;

use xptinfo_core::{EntryId, InterfaceId, TypelibId};

#[derive(Debug)]
pub(crate) struct TypelibSlot {
    pub(crate) name: String,
    pub(crate) iid: InterfaceId,
    pub(crate) entry: OnceLock<EntryId>,
}

impl TypelibSlot {
    pub(crate) fn new(name: String, iid: InterfaceId, entry: Option<EntryId>) -> Self {
        let slot = OnceLock::new();
        if let Some(id) = entry {
            let _ = slot.set(id);
        }
        Self {
            name,
            iid,
            entry: slot,
        }
    }
}

/// A typelib as registered: its name and interface directory.
#[derive(Debug)]
pub struct Typelib {
    id: TypelibId,
    name: String,
    pub(crate) slots: Vec<TypelibSlot>,
}

impl Typelib {
    pub(crate) fn new(id: TypelibId, name: String, slots: Vec<TypelibSlot>) -> Self {
        Self { id, name, slots }
    }

    pub fn id(&self) -> TypelibId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Number of directory slots.
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Name and iid declared at a 0-based directory index.
    pub fn declared(&self, index: u16) -> Option<(&str, InterfaceId)> {
        self.slots
            .get(usize::from(index))
            .map(|slot| (slot.name.as_str(), slot.iid))
    }

    /// The entry bound to a 0-based directory index, if already known.
    pub fn cached_entry(&self, index: u16) -> Option<EntryId> {
        self.slots
            .get(usize::from(index))
            .and_then(|slot| slot.entry.get().copied())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defined_slots_are_prebound() {
        let lib = Typelib::new(
            TypelibId::new(0),
            "a.xpt".into(),
            vec![
                TypelibSlot::new("IFoo".into(), InterfaceId::from_name("IFoo"), Some(EntryId::new(4))),
                TypelibSlot::new("IBar".into(), InterfaceId::from_name("IBar"), None),
            ],
        );
        assert_eq!(lib.len(), 2);
        assert_eq!(lib.cached_entry(0), Some(EntryId::new(4)));
        assert_eq!(lib.cached_entry(1), None);
        assert_eq!(lib.cached_entry(2), None);
        assert_eq!(lib.declared(1), Some(("IBar", InterfaceId::from_name("IBar"))));
    }
}

//! InterfaceRegistry - the entry arena and its lookup indices.
//!
//! This module provides [`InterfaceRegistry`], the owner of every
//! [`InterfaceEntry`] and every registered [`Typelib`] directory.
//!
//! # Storage Model
//!
//! - **Entries**: a flat table indexed by [`EntryId`]. Entries refer to each
//!   other (parent links) by `EntryId`, never by reference.
//! - **Typelibs**: a flat table indexed by [`TypelibId`]; each maps the 1-based
//!   ordinals used inside descriptors to entries.
//! - **Indices**: iid and name maps for lookups from outside.
//!
//! # Thread Safety
//!
//! Registration takes `&mut self` and happens before the registry is shared.
//! After that the registry is shared as `Arc<InterfaceRegistry>` and every
//! operation takes `&self`: resolution and handle bookkeeping go through the
//! working-set lock, already-resolved reads go through `OnceLock`s.
//!
//! # Example
//!
//! ```
//! use xptinfo_core::{DirectoryEntry, InterfaceDescriptor, InterfaceId, MethodDescriptor, TypelibDescriptor};
//! use xptinfo_registry::InterfaceRegistry;
//!
//! let lib = TypelibDescriptor::new("base.xpt")
//!     .with_interface(DirectoryEntry::defined(
//!         "IFoo",
//!         InterfaceId::from_name("IFoo"),
//!         InterfaceDescriptor::new().with_method(MethodDescriptor::new("run")),
//!     ));
//!
//! let mut registry = InterfaceRegistry::new();
//! registry.register_typelib(lib).unwrap();
//!
//! let foo = registry.entry_by_name("IFoo").unwrap();
//! assert_eq!(registry.resolve(foo).unwrap().method_count(), 1);
//! ```

use parking_lot::{Mutex, MutexGuard};
use rustc_hash::FxHashMap;

use xptinfo_core::{
    EntryId, InfoError, InfoResult, InterfaceId, RegistrationError, TypelibDescriptor, TypelibId,
};

use crate::entry::InterfaceEntry;
use crate::typelib::{Typelib, TypelibSlot};
use crate::working_set::{InfoStats, RegistryOptions, StatCounters, WorkingSet};

/// Owner of all interface entries and typelib directories.
pub struct InterfaceRegistry {
    pub(crate) entries: Vec<InterfaceEntry>,
    typelibs: Vec<Typelib>,
    by_iid: FxHashMap<InterfaceId, EntryId>,
    by_name: FxHashMap<String, EntryId>,
    pub(crate) working_set: Mutex<WorkingSet>,
    pub(crate) stats: StatCounters,
}

impl Default for InterfaceRegistry {
    fn default() -> Self {
        Self::with_options(RegistryOptions::default())
    }
}

impl InterfaceRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_options(options: RegistryOptions) -> Self {
        Self {
            entries: Vec::new(),
            typelibs: Vec::new(),
            by_iid: FxHashMap::default(),
            by_name: FxHashMap::default(),
            working_set: Mutex::new(WorkingSet::default()),
            stats: StatCounters::new(options.track_stats),
        }
    }

    // ==========================================================================
    // Registration
    // ==========================================================================

    /// Register a decoded typelib.
    ///
    /// The table is validated as a whole first; on error nothing is published.
    /// An interface whose iid is already registered keeps its first definition
    /// and the new directory slot aliases it.
    pub fn register_typelib(
        &mut self,
        typelib: TypelibDescriptor,
    ) -> Result<TypelibId, RegistrationError> {
        typelib.validate()?;
        self.check_names(&typelib)?;

        let typelib_id = TypelibId::new(self.typelibs.len() as u32);
        let mut slots = Vec::with_capacity(typelib.interfaces.len());
        let mut defined = 0usize;

        for dir in typelib.interfaces {
            let bound = match dir.descriptor {
                Some(descriptor) => match self.by_iid.get(&dir.iid) {
                    Some(&existing) => {
                        tracing::warn!(
                            interface = %dir.name,
                            iid = %dir.iid,
                            typelib = %typelib.name,
                            "interface already registered, keeping first definition"
                        );
                        Some(existing)
                    }
                    None => {
                        let id = EntryId::new(self.entries.len() as u32);
                        self.entries.push(InterfaceEntry::new(
                            id,
                            dir.name.clone(),
                            dir.iid,
                            descriptor,
                            typelib_id,
                        ));
                        self.by_iid.insert(dir.iid, id);
                        self.by_name.insert(dir.name.clone(), id);
                        defined += 1;
                        Some(id)
                    }
                },
                None => None,
            };
            slots.push(TypelibSlot::new(dir.name, dir.iid, bound));
        }

        let entry_count = self.entries.len();
        self.working_set
            .get_mut()
            .infos
            .resize_with(entry_count, Default::default);

        tracing::debug!(
            typelib = %typelib.name,
            slots = slots.len(),
            defined,
            "registered typelib"
        );
        self.typelibs.push(Typelib::new(typelib_id, typelib.name, slots));
        Ok(typelib_id)
    }

    /// Reject definitions that reuse a registered name under a different iid.
    fn check_names(&self, typelib: &TypelibDescriptor) -> Result<(), RegistrationError> {
        let mut local: FxHashMap<&str, InterfaceId> = FxHashMap::default();
        for dir in typelib.interfaces.iter().filter(|d| d.descriptor.is_some()) {
            if self.by_iid.contains_key(&dir.iid) {
                continue;
            }
            let existing = self
                .by_name
                .get(&dir.name)
                .map(|&id| self.entries[id.index() as usize].iid())
                .or_else(|| local.get(dir.name.as_str()).copied());
            match existing {
                Some(existing) if existing != dir.iid => {
                    return Err(RegistrationError::DuplicateName {
                        name: dir.name.clone(),
                        existing,
                        new: dir.iid,
                    });
                }
                _ => {
                    local.insert(&dir.name, dir.iid);
                }
            }
        }
        Ok(())
    }

    // ==========================================================================
    // Entry Lookup
    // ==========================================================================

    /// Get an entry by id.
    pub fn entry(&self, id: EntryId) -> InfoResult<&InterfaceEntry> {
        self.entries
            .get(id.index() as usize)
            .ok_or(InfoError::UnknownEntry(id))
    }

    /// Find the entry defining `iid`.
    pub fn entry_by_iid(&self, iid: &InterfaceId) -> Option<EntryId> {
        self.by_iid.get(iid).copied()
    }

    /// Find the entry registered under `name`.
    pub fn entry_by_name(&self, name: &str) -> Option<EntryId> {
        self.by_name.get(name).copied()
    }

    /// The iid of the interface registered under `name`.
    pub fn iid_for_name(&self, name: &str) -> Option<InterfaceId> {
        self.entry_by_name(name)
            .map(|id| self.entries[id.index() as usize].iid())
    }

    /// The name of the interface defining `iid`.
    pub fn name_for_iid(&self, iid: &InterfaceId) -> Option<&str> {
        self.entry_by_iid(iid)
            .map(|id| self.entries[id.index() as usize].name())
    }

    /// Iterate over all entries in registration order.
    pub fn entries(&self) -> impl Iterator<Item = &InterfaceEntry> {
        self.entries.iter()
    }

    /// Ids of scriptable interfaces, sorted by name.
    pub fn scriptable_interfaces(&self) -> Vec<EntryId> {
        let mut ids: Vec<_> = self
            .entries
            .iter()
            .filter(|e| e.is_scriptable())
            .map(|e| e.id())
            .collect();
        ids.sort_by(|a, b| {
            self.entries[a.index() as usize]
                .name()
                .cmp(self.entries[b.index() as usize].name())
        });
        ids
    }

    /// Number of distinct interface entries.
    pub fn interface_count(&self) -> usize {
        self.entries.len()
    }

    /// Get a registered typelib by id.
    pub fn typelib(&self, id: TypelibId) -> Option<&Typelib> {
        self.typelibs.get(id.index() as usize)
    }

    /// Number of registered typelibs.
    pub fn typelib_count(&self) -> usize {
        self.typelibs.len()
    }

    /// Look up the entry at a 0-based directory index of a typelib.
    ///
    /// Interfaces the typelib only declares are looked up across the whole
    /// registry, by iid, or by name when the declared iid is zero. A hit is
    /// cached in the directory slot. `None` means the interface is not loaded.
    pub fn entry_at(&self, typelib: TypelibId, index: u16) -> Option<EntryId> {
        let slot = self
            .typelibs
            .get(typelib.index() as usize)?
            .slots
            .get(usize::from(index))?;
        if let Some(&id) = slot.entry.get() {
            return Some(id);
        }

        let found = if slot.iid.is_zero() {
            self.by_name.get(&slot.name)
        } else {
            self.by_iid.get(&slot.iid)
        }
        .copied()?;
        // Racing lookups compute the same id; losing the race is harmless.
        let _ = slot.entry.set(found);
        Some(found)
    }

    // ==========================================================================
    // Working Set
    // ==========================================================================

    pub(crate) fn lock_working_set(&self) -> MutexGuard<'_, WorkingSet> {
        let guard = self.working_set.lock();
        self.stats.record_lock();
        guard
    }

    /// Current handle lifecycle counters.
    pub fn stats(&self) -> InfoStats {
        self.stats.snapshot()
    }

    /// Entries currently holding a live cached handle.
    pub fn live_infos(&self) -> Vec<EntryId> {
        let ws = self.lock_working_set();
        ws.infos
            .iter()
            .enumerate()
            .filter(|(_, slot)| slot.strong_count() > 0)
            .map(|(i, _)| EntryId::new(i as u32))
            .collect()
    }
}

impl std::fmt::Debug for InterfaceRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InterfaceRegistry")
            .field("interface_count", &self.entries.len())
            .field("typelib_count", &self.typelibs.len())
            .finish()
    }
}

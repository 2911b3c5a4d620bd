//! The resolution engine.
//!
//! Resolution turns a partially resolved entry into a fully resolved one by
//! resolving its parent chain and computing its base indices:
//!
//! ```text
//! method_base_index(child)   = method_base_index(parent)   + parent.num_methods
//! constant_base_index(child) = constant_base_index(parent) + parent.num_constants
//! ```
//!
//! The walk is iterative. Under the working-set lock, the engine climbs from
//! the requested entry through every still-pending ancestor until it reaches
//! a root, an already resolved ancestor, or a failure, and then settles the
//! collected entries from the top down. No lock is re-entered, and no stack
//! grows with inheritance depth.

use xptinfo_core::{EntryId, InfoError, InfoResult, InterfaceId, ResolveFailure};

use crate::entry::{InterfaceEntry, Outcome, Resolution};
use crate::query::ResolvedInterface;
use crate::registry::InterfaceRegistry;
use crate::working_set::WorkingSet;

/// Where the upward walk stopped.
enum ChainEnd {
    /// The last pending entry is a root.
    Root,
    /// The last pending entry's parent was already resolved.
    Resolved(EntryId),
    Failed(ResolveFailure),
    /// The walk came back to `pending[start]`; entries from there up form
    /// the loop.
    Cycle { start: usize },
}

impl InterfaceRegistry {
    /// Resolve an entry and its ancestors, if not done already.
    ///
    /// Idempotent and safe to call from many threads. A failure is permanent:
    /// every later call reports the same [`InfoError::ResolutionFailed`].
    #[cfg_attr(feature = "profiling", profiling::function)]
    pub fn resolve(&self, id: EntryId) -> InfoResult<ResolvedInterface<'_>> {
        let entry = self.entry(id)?;
        if entry.outcome.get().is_none() {
            let ws = self.lock_working_set();
            self.resolve_locked(&ws, id);
        }
        self.resolved(id)
    }

    /// The resolved view of an entry, without triggering resolution.
    ///
    /// Reports [`InfoError::Unresolved`] while the entry is still pending.
    pub fn resolved(&self, id: EntryId) -> InfoResult<ResolvedInterface<'_>> {
        let entry = self.entry(id)?;
        match entry.outcome.get() {
            Some(Ok(resolution)) => Ok(ResolvedInterface::new(self, entry, resolution)),
            Some(Err(reason)) => Err(InfoError::ResolutionFailed {
                name: entry.name().to_string(),
                reason: reason.clone(),
            }),
            None => Err(InfoError::Unresolved {
                name: entry.name().to_string(),
            }),
        }
    }

    /// Whether the interface `id`, or any ancestor, has identity `iid`.
    ///
    /// The entry's own identity is checked before resolving. Beyond that, a
    /// chain that cannot be resolved fails the query; it never reads as
    /// "no such ancestor".
    pub fn has_ancestor(&self, id: EntryId, iid: &InterfaceId) -> InfoResult<bool> {
        if self.entry(id)?.is_iid(iid) {
            return Ok(true);
        }
        self.resolve(id)?.has_ancestor(iid)
    }

    /// Settle `id` and all pending ancestors. Caller holds the working-set lock.
    pub(crate) fn resolve_locked(&self, _ws: &WorkingSet, id: EntryId) {
        let mut pending: Vec<EntryId> = Vec::new();
        let mut current = id;

        let end = loop {
            let entry = self.entry_unchecked(current);
            match entry.outcome.get() {
                Some(Ok(_)) if pending.is_empty() => return,
                Some(Err(_)) if pending.is_empty() => return,
                Some(Ok(_)) => break ChainEnd::Resolved(current),
                Some(Err(_)) => {
                    break ChainEnd::Failed(ResolveFailure::ParentFailed {
                        parent: entry.name().to_string(),
                    });
                }
                None => {}
            }
            if let Some(start) = pending.iter().position(|&p| p == current) {
                break ChainEnd::Cycle { start };
            }
            pending.push(current);

            let ordinal = entry.descriptor().parent_interface;
            if ordinal == 0 {
                break ChainEnd::Root;
            }
            match self.entry_at(entry.typelib(), ordinal - 1) {
                Some(parent) => current = parent,
                None => break ChainEnd::Failed(ResolveFailure::MissingParent { ordinal }),
            }
        };

        match end {
            ChainEnd::Root => self.settle_chain(&pending, None),
            ChainEnd::Resolved(ancestor) => self.settle_chain(&pending, Some(ancestor)),
            ChainEnd::Failed(reason) => self.fail_chain(&pending, reason),
            ChainEnd::Cycle { start } => {
                let (below, cycle) = pending.split_at(start);
                for &id in cycle {
                    self.set_outcome(id, Err(ResolveFailure::InheritanceCycle));
                }
                // Descendants only inherit from the loop.
                self.fail_chain(below, self.failed_parent(cycle[0]));
            }
        }
    }

    /// Resolve `pending` from its top (last element) down to `pending[0]`.
    fn settle_chain(&self, pending: &[EntryId], mut parent: Option<EntryId>) {
        for (pos, &id) in pending.iter().enumerate().rev() {
            let resolution = match parent {
                None => Resolution::ROOT,
                Some(parent_id) => match self.child_resolution(parent_id, id) {
                    Some(resolution) => resolution,
                    None => {
                        // Member counts overflowed the flattened numbering.
                        let parent_name = self.entry_unchecked(parent_id).name().to_string();
                        self.set_outcome(
                            id,
                            Err(ResolveFailure::IndexOverflow {
                                parent: parent_name,
                            }),
                        );
                        self.fail_chain(&pending[..pos], self.failed_parent(id));
                        return;
                    }
                },
            };
            self.set_outcome(id, Ok(resolution));
            tracing::trace!(
                interface = self.entry_unchecked(id).name(),
                method_base = resolution.method_base_index,
                constant_base = resolution.constant_base_index,
                "complete resolve"
            );
            parent = Some(id);
        }
    }

    /// Base indices for `child` under the resolved entry `parent_id`.
    ///
    /// `None` if the child's own members would not fit after the bases.
    fn child_resolution(&self, parent_id: EntryId, child: EntryId) -> Option<Resolution> {
        let parent = self.entry_unchecked(parent_id);
        let base = parent.resolution()?;
        let method_base_index = base
            .method_base_index
            .checked_add(parent.descriptor().num_methods())?;
        let constant_base_index = base
            .constant_base_index
            .checked_add(parent.descriptor().num_constants())?;

        let own = self.entry_unchecked(child).descriptor();
        method_base_index.checked_add(own.num_methods())?;
        constant_base_index.checked_add(own.num_constants())?;

        Some(Resolution {
            parent: Some(parent_id),
            method_base_index,
            constant_base_index,
        })
    }

    /// Fail every entry in `pending`: the top one with `reason`, each lower one
    /// because its parent failed.
    fn fail_chain(&self, pending: &[EntryId], reason: ResolveFailure) {
        let Some((&top, rest)) = pending.split_last() else {
            return;
        };
        self.set_outcome(top, Err(reason));
        let mut failed = top;
        for &id in rest.iter().rev() {
            self.set_outcome(id, Err(self.failed_parent(failed)));
            failed = id;
        }
    }

    fn failed_parent(&self, parent: EntryId) -> ResolveFailure {
        ResolveFailure::ParentFailed {
            parent: self.entry_unchecked(parent).name().to_string(),
        }
    }

    fn set_outcome(&self, id: EntryId, outcome: Outcome) {
        let entry = self.entry_unchecked(id);
        if let Err(reason) = &outcome {
            tracing::warn!(interface = entry.name(), %reason, "interface failed to resolve");
        }
        // Only ever called under the working-set lock on a pending entry.
        let _ = entry.outcome.set(outcome);
    }

    /// Ids reached by the engine come from this registry's own tables.
    fn entry_unchecked(&self, id: EntryId) -> &InterfaceEntry {
        &self.entries[id.index() as usize]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entry::ResolveState;
    use xptinfo_core::{DirectoryEntry, InterfaceDescriptor, MethodDescriptor, TypelibDescriptor};

    fn iface(name: &str, parent: u16, methods: usize) -> DirectoryEntry {
        let mut desc = InterfaceDescriptor::new().with_parent(parent);
        for i in 0..methods {
            desc = desc.with_method(MethodDescriptor::new(format!("{name}_m{i}")));
        }
        DirectoryEntry::defined(name, InterfaceId::from_name(name), desc)
    }

    fn registry_with(entries: Vec<DirectoryEntry>) -> InterfaceRegistry {
        let mut lib = TypelibDescriptor::new("test.xpt");
        for e in entries {
            lib = lib.with_interface(e);
        }
        let mut registry = InterfaceRegistry::new();
        registry.register_typelib(lib).unwrap();
        registry
    }

    fn id(registry: &InterfaceRegistry, name: &str) -> EntryId {
        registry.entry_by_name(name).unwrap()
    }

    #[test]
    fn root_resolves_with_zero_bases() {
        let registry = registry_with(vec![iface("IRoot", 0, 3)]);
        let root = registry.resolve(id(&registry, "IRoot")).unwrap();
        assert_eq!(root.method_base_index(), 0);
        assert_eq!(root.constant_base_index(), 0);
        assert!(root.parent().is_none());
    }

    #[test]
    fn resolving_leaf_resolves_whole_chain() {
        let registry = registry_with(vec![
            iface("IA", 0, 2),
            iface("IB", 1, 3),
            iface("IC", 2, 1),
        ]);
        let c = registry.resolve(id(&registry, "IC")).unwrap();
        assert_eq!(c.method_base_index(), 5);
        assert_eq!(c.method_count(), 6);

        for name in ["IA", "IB"] {
            let entry = registry.entry(id(&registry, name)).unwrap();
            assert_eq!(entry.resolve_state(), ResolveState::FullyResolved);
        }
        let b = registry.resolved(id(&registry, "IB")).unwrap();
        assert_eq!(b.method_base_index(), 2);
    }

    #[test]
    fn resolved_does_not_trigger_resolution() {
        let registry = registry_with(vec![iface("IA", 0, 1)]);
        let a = id(&registry, "IA");
        assert!(matches!(registry.resolved(a), Err(InfoError::Unresolved { .. })));
        registry.resolve(a).unwrap();
        assert!(registry.resolved(a).is_ok());
    }

    #[test]
    fn resolve_is_idempotent() {
        let registry = registry_with(vec![iface("IA", 0, 2), iface("IB", 1, 1)]);
        let b = id(&registry, "IB");
        let first = *registry.resolve(b).unwrap().resolution();
        let second = *registry.resolve(b).unwrap().resolution();
        assert_eq!(first, second);
    }

    #[test]
    fn missing_parent_fails_chain() {
        let registry = registry_with(vec![
            DirectoryEntry::declared("IGone", InterfaceId::from_name("IGone")),
            iface("IMid", 1, 1),
            iface("ILeaf", 2, 1),
        ]);
        let leaf = id(&registry, "ILeaf");
        let err = registry.resolve(leaf).unwrap_err();
        assert_eq!(
            err,
            InfoError::ResolutionFailed {
                name: "ILeaf".into(),
                reason: ResolveFailure::ParentFailed {
                    parent: "IMid".into()
                },
            }
        );
        let mid = registry.entry(id(&registry, "IMid")).unwrap();
        assert_eq!(mid.failure(), Some(&ResolveFailure::MissingParent { ordinal: 1 }));
    }

    #[test]
    fn failure_is_sticky() {
        let registry = registry_with(vec![
            DirectoryEntry::declared("IGone", InterfaceId::from_name("IGone")),
            iface("IChild", 1, 0),
        ]);
        let child = id(&registry, "IChild");
        let first = registry.resolve(child).unwrap_err();
        let second = registry.resolve(child).unwrap_err();
        assert_eq!(first, second);
        assert_eq!(
            registry.entry(child).unwrap().resolve_state(),
            ResolveState::ResolveFailed
        );
    }

    #[test]
    fn child_of_failed_parent_fails() {
        let registry = registry_with(vec![
            DirectoryEntry::declared("IGone", InterfaceId::from_name("IGone")),
            iface("IMid", 1, 0),
            iface("ILeaf", 2, 0),
        ]);
        registry.resolve(id(&registry, "IMid")).unwrap_err();
        let err = registry.resolve(id(&registry, "ILeaf")).unwrap_err();
        assert!(matches!(
            err,
            InfoError::ResolutionFailed {
                reason: ResolveFailure::ParentFailed { .. },
                ..
            }
        ));
    }

    #[test]
    fn cycle_fails_instead_of_spinning() {
        let registry = registry_with(vec![iface("IA", 2, 0), iface("IB", 1, 0)]);
        let err = registry.resolve(id(&registry, "IA")).unwrap_err();
        assert!(matches!(
            err,
            InfoError::ResolutionFailed {
                reason: ResolveFailure::InheritanceCycle,
                ..
            }
        ));
        assert_eq!(
            registry.entry(id(&registry, "IB")).unwrap().failure(),
            Some(&ResolveFailure::InheritanceCycle)
        );
    }

    #[test]
    fn descendant_of_cycle_fails_on_parent() {
        let registry = registry_with(vec![
            iface("IA", 2, 0),
            iface("IB", 1, 0),
            iface("ID", 1, 0),
        ]);
        let err = registry.resolve(id(&registry, "ID")).unwrap_err();
        assert_eq!(
            err,
            InfoError::ResolutionFailed {
                name: "ID".into(),
                reason: ResolveFailure::ParentFailed {
                    parent: "IA".into()
                },
            }
        );
        for name in ["IA", "IB"] {
            assert_eq!(
                registry.entry(id(&registry, name)).unwrap().failure(),
                Some(&ResolveFailure::InheritanceCycle)
            );
        }
    }

    #[test]
    fn member_count_overflow_fails_chain_below() {
        let registry = registry_with(vec![
            iface("IA", 0, 60_000),
            iface("IB", 1, 6_000),
            iface("IC", 2, 0),
            iface("ID", 3, 0),
        ]);
        let err = registry.resolve(id(&registry, "ID")).unwrap_err();
        assert_eq!(
            err,
            InfoError::ResolutionFailed {
                name: "ID".into(),
                reason: ResolveFailure::ParentFailed {
                    parent: "IC".into()
                },
            }
        );

        let failure = |name| registry.entry(id(&registry, name)).unwrap().failure().cloned();
        assert_eq!(
            failure("IB"),
            Some(ResolveFailure::IndexOverflow {
                parent: "IA".into()
            })
        );
        assert_eq!(
            failure("IC"),
            Some(ResolveFailure::ParentFailed {
                parent: "IB".into()
            })
        );

        let root = registry.resolved(id(&registry, "IA")).unwrap();
        assert_eq!(root.method_count(), 60_000);
        assert_eq!(
            registry.entry(id(&registry, "IA")).unwrap().resolve_state(),
            ResolveState::FullyResolved
        );
    }

    #[test]
    fn self_parent_is_a_cycle() {
        let registry = registry_with(vec![iface("ISelf", 1, 0)]);
        assert!(registry.resolve(id(&registry, "ISelf")).is_err());
    }

    #[test]
    fn parent_defined_in_other_typelib() {
        let mut registry = InterfaceRegistry::new();
        registry
            .register_typelib(TypelibDescriptor::new("base.xpt").with_interface(iface("IBase", 0, 4)))
            .unwrap();
        registry
            .register_typelib(
                TypelibDescriptor::new("derived.xpt")
                    .with_interface(DirectoryEntry::declared("IBase", InterfaceId::from_name("IBase")))
                    .with_interface(iface("IDerived", 1, 2)),
            )
            .unwrap();

        let derived = registry.resolve(id(&registry, "IDerived")).unwrap();
        assert_eq!(derived.method_base_index(), 4);
        assert_eq!(derived.method_count(), 6);
    }

    #[test]
    fn has_ancestor_self_without_resolution() {
        let registry = registry_with(vec![
            DirectoryEntry::declared("IGone", InterfaceId::from_name("IGone")),
            iface("IOrphan", 1, 0),
        ]);
        let orphan = id(&registry, "IOrphan");
        assert_eq!(
            registry.has_ancestor(orphan, &InterfaceId::from_name("IOrphan")),
            Ok(true)
        );
        assert!(registry
            .has_ancestor(orphan, &InterfaceId::from_name("IGone"))
            .is_err());
    }

    #[test]
    fn concurrent_resolution_agrees() {
        let registry = registry_with(vec![
            iface("IA", 0, 1),
            iface("IB", 1, 2),
            iface("IC", 2, 3),
            iface("ID", 3, 4),
        ]);
        let d = id(&registry, "ID");
        let bases: Vec<u16> = std::thread::scope(|s| {
            let handles: Vec<_> = (0..8)
                .map(|_| s.spawn(|| registry.resolve(d).unwrap().method_base_index()))
                .collect();
            handles.into_iter().map(|h| h.join().unwrap()).collect()
        });
        assert!(bases.iter().all(|&b| b == 6));
    }
}

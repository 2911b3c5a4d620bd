//! InterfaceInfo - the caller-facing, reference-counted handle.
//!
//! # Lifecycle
//!
//! At most one live handle exists per entry. The entry's slot in the
//! working set holds a `Weak` to it, so the slot never keeps a handle alive:
//!
//! ```text
//! info(id)         lock, upgrade slot       -> hit: new reference
//!                                           -> miss: new handle, slot = Weak
//! last drop        strong count reaches 0, then lock and clear the slot only
//!                  if it still points at the dying handle
//! ```
//!
//! Once the strong count is zero a handle can never be upgraded again, so
//! the only race left on destruction is a fresh handle replacing the slot
//! between the final release and the lock. The pointer check covers it.
//!
//! # Thread Safety
//!
//! [`InterfaceInfo`] is `Send + Sync`. Queries on a handle read resolved
//! state without the lock. Creating handles, building the parent link, and
//! destruction take the working-set lock.

use std::ptr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, OnceLock, Weak};

use xptinfo_core::{
    ConstDescriptor, EntryId, InfoError, InfoResult, InterfaceId, MethodDescriptor,
    ParamDescriptor, ParamType,
};

use crate::entry::InterfaceEntry;
use crate::query::ResolvedInterface;
use crate::registry::InterfaceRegistry;
use crate::working_set::WorkingSet;

pub(crate) struct InfoInner {
    registry: Arc<InterfaceRegistry>,
    entry: EntryId,
    /// Set when the registry detached this handle from its entry.
    detached: AtomicBool,
    /// Owned reference to the parent's handle, built on first request.
    parent: OnceLock<InterfaceInfo>,
}

impl InfoInner {
    fn entry(&self) -> &InterfaceEntry {
        &self.registry.entries[self.entry.index() as usize]
    }
}

impl Drop for InfoInner {
    fn drop(&mut self) {
        {
            let mut ws = self.registry.lock_working_set();
            if let Some(slot) = ws.infos.get_mut(self.entry.index() as usize)
                && ptr::eq(slot.as_ptr(), self)
            {
                *slot = Weak::new();
            }
        }
        self.registry.stats.record_destroyed();
        tracing::debug!(interface = self.entry().name(), "destroyed interface info");
    }
}

impl std::fmt::Debug for InfoInner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InfoInner")
            .field("entry", &self.entry)
            .field("detached", &self.detached.load(Ordering::Relaxed))
            .finish()
    }
}

// ============================================================================
// Handle Creation
// ============================================================================

impl InterfaceRegistry {
    /// Get the handle for an entry, resolving it first.
    ///
    /// Returns the cached handle if one is alive, otherwise creates one.
    #[cfg_attr(feature = "profiling", profiling::function)]
    pub fn info(self: &Arc<Self>, id: EntryId) -> InfoResult<InterfaceInfo> {
        self.entry(id)?;
        let mut ws = self.lock_working_set();
        self.resolve_locked(&ws, id);
        self.resolved(id)?;
        Ok(self.info_locked(&mut ws, id))
    }

    /// Get the handle for the interface defining `iid`.
    pub fn info_for_iid(self: &Arc<Self>, iid: &InterfaceId) -> InfoResult<InterfaceInfo> {
        let id = self.entry_by_iid(iid).ok_or_else(|| InfoError::NotFound {
            name: iid.to_string(),
        })?;
        self.info(id)
    }

    /// Get the handle for the interface registered under `name`.
    pub fn info_for_name(self: &Arc<Self>, name: &str) -> InfoResult<InterfaceInfo> {
        let id = self.entry_by_name(name).ok_or_else(|| InfoError::NotFound {
            name: name.to_string(),
        })?;
        self.info(id)
    }

    /// Return the cached handle or create one. `id` must be resolved.
    pub(crate) fn info_locked(self: &Arc<Self>, ws: &mut WorkingSet, id: EntryId) -> InterfaceInfo {
        let index = id.index() as usize;
        if ws.infos.len() <= index {
            ws.infos.resize_with(index + 1, Weak::new);
        }
        if let Some(inner) = ws.infos[index].upgrade() {
            return InterfaceInfo { inner };
        }

        let inner = Arc::new(InfoInner {
            registry: Arc::clone(self),
            entry: id,
            detached: AtomicBool::new(false),
            parent: OnceLock::new(),
        });
        ws.infos[index] = Arc::downgrade(&inner);
        self.stats.record_created();
        tracing::debug!(interface = inner.entry().name(), "created interface info");
        InterfaceInfo { inner }
    }

    /// Detach every live handle from its entry.
    ///
    /// Detached handles stay valid objects but answer [`InfoError::Invalidated`]
    /// to queries; the next [`info`](Self::info) call creates a fresh handle.
    /// Returns how many handles were detached.
    pub fn invalidate_infos(&self) -> usize {
        let detached: Vec<Arc<InfoInner>> = {
            let mut ws = self.lock_working_set();
            ws.infos
                .iter_mut()
                .filter_map(|slot| {
                    let inner = slot.upgrade();
                    *slot = Weak::new();
                    inner
                })
                .inspect(|inner| inner.detached.store(true, Ordering::Release))
                .collect()
        };
        // Dropping these may release the last reference, which re-takes the
        // lock, so it happens here and not above.
        let count = detached.len();
        tracing::debug!(count, "invalidated interface infos");
        drop(detached);
        count
    }
}

// ============================================================================
// InterfaceInfo
// ============================================================================

/// A reference-counted handle onto one resolved interface.
///
/// Cloning (or [`acquire`](Self::acquire)) adds a reference; dropping (or
/// [`release`](Self::release)) removes one. Two handles compare equal when
/// they are the same handle object.
#[derive(Clone)]
pub struct InterfaceInfo {
    inner: Arc<InfoInner>,
}

impl InterfaceInfo {
    /// The entry this handle was created for.
    pub fn entry_id(&self) -> EntryId {
        self.inner.entry
    }

    pub fn registry(&self) -> &Arc<InterfaceRegistry> {
        &self.inner.registry
    }

    pub fn entry(&self) -> &InterfaceEntry {
        self.inner.entry()
    }

    // Identity reads come straight from the descriptor and work on detached
    // handles too.

    pub fn name(&self) -> &str {
        self.entry().name()
    }

    pub fn iid(&self) -> InterfaceId {
        self.entry().iid()
    }

    pub fn is_iid(&self, iid: &InterfaceId) -> bool {
        self.entry().is_iid(iid)
    }

    pub fn is_scriptable(&self) -> bool {
        self.entry().is_scriptable()
    }

    /// Whether [`InterfaceRegistry::invalidate_infos`] detached this handle.
    pub fn is_detached(&self) -> bool {
        self.inner.detached.load(Ordering::Acquire)
    }

    /// The resolved view this handle queries through.
    pub fn resolved(&self) -> InfoResult<ResolvedInterface<'_>> {
        if self.is_detached() {
            return Err(InfoError::Invalidated {
                name: self.name().to_string(),
            });
        }
        self.inner.registry.resolved(self.inner.entry)
    }

    // ==========================================================================
    // Queries
    // ==========================================================================

    pub fn method_count(&self) -> InfoResult<u16> {
        Ok(self.resolved()?.method_count())
    }

    pub fn constant_count(&self) -> InfoResult<u16> {
        Ok(self.resolved()?.constant_count())
    }

    pub fn is_function(&self) -> InfoResult<bool> {
        Ok(self.resolved()?.is_function())
    }

    pub fn is_builtin_class(&self) -> InfoResult<bool> {
        Ok(self.resolved()?.is_builtin_class())
    }

    pub fn is_main_process_scriptable_only(&self) -> InfoResult<bool> {
        Ok(self.resolved()?.is_main_process_scriptable_only())
    }

    pub fn method(&self, index: u16) -> InfoResult<&MethodDescriptor> {
        self.resolved()?.method(index)
    }

    pub fn method_by_name(&self, name: &str) -> InfoResult<(u16, &MethodDescriptor)> {
        self.resolved()?.method_by_name(name)
    }

    pub fn constant(&self, index: u16) -> InfoResult<&ConstDescriptor> {
        self.resolved()?.constant(index)
    }

    pub fn param_entry(&self, method_index: u16, param: &ParamDescriptor) -> InfoResult<EntryId> {
        self.resolved()?.param_entry(method_index, param)
    }

    pub fn param_iid(&self, method_index: u16, param: &ParamDescriptor) -> InfoResult<InterfaceId> {
        self.resolved()?.param_iid(method_index, param)
    }

    /// The handle of an interface-typed parameter's interface.
    pub fn param_info(
        &self,
        method_index: u16,
        param: &ParamDescriptor,
    ) -> InfoResult<InterfaceInfo> {
        let id = self.param_entry(method_index, param)?;
        self.inner.registry.info(id)
    }

    pub fn param_type(
        &self,
        method_index: u16,
        param: &ParamDescriptor,
        dimension: u16,
    ) -> InfoResult<ParamType> {
        self.resolved()?.param_type(method_index, param, dimension)
    }

    pub fn size_is_arg_number(
        &self,
        method_index: u16,
        param: &ParamDescriptor,
        dimension: u16,
    ) -> InfoResult<u8> {
        self.resolved()?
            .size_is_arg_number(method_index, param, dimension)
    }

    pub fn interface_is_arg_number(
        &self,
        method_index: u16,
        param: &ParamDescriptor,
    ) -> InfoResult<u8> {
        self.resolved()?.interface_is_arg_number(method_index, param)
    }

    pub fn has_ancestor(&self, iid: &InterfaceId) -> InfoResult<bool> {
        self.resolved()?.has_ancestor(iid)
    }

    // ==========================================================================
    // Parent and Reference Counting
    // ==========================================================================

    /// The parent interface's handle, or `None` for a root interface.
    ///
    /// Built on first request and kept alive by this handle from then on.
    #[cfg_attr(feature = "profiling", profiling::function)]
    pub fn parent(&self) -> InfoResult<Option<InterfaceInfo>> {
        let Some(parent_id) = self.resolved()?.resolution().parent() else {
            return Ok(None);
        };
        if let Some(parent) = self.inner.parent.get() {
            return Ok(Some(parent.clone()));
        }

        let registry = &self.inner.registry;
        let rejected = {
            let mut ws = registry.lock_working_set();
            match self.inner.parent.get() {
                Some(_) => None,
                None => {
                    let parent = registry.info_locked(&mut ws, parent_id);
                    self.inner.parent.set(parent).err()
                }
            }
        };
        drop(rejected);
        Ok(self.inner.parent.get().cloned())
    }

    /// Add a reference.
    pub fn acquire(&self) -> InterfaceInfo {
        self.clone()
    }

    /// Drop this reference, returning how many other references remained
    /// just before it went away.
    pub fn release(self) -> usize {
        let remaining = Arc::strong_count(&self.inner) - 1;
        drop(self);
        remaining
    }

    /// Current number of references to this handle.
    pub fn ref_count(&self) -> usize {
        Arc::strong_count(&self.inner)
    }
}

impl PartialEq for InterfaceInfo {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

impl Eq for InterfaceInfo {}

impl std::fmt::Debug for InterfaceInfo {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InterfaceInfo")
            .field("name", &self.name())
            .field("entry", &self.inner.entry)
            .field("refs", &self.ref_count())
            .field("detached", &self.is_detached())
            .finish()
    }
}

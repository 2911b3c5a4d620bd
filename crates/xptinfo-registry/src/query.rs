//! The resolved query surface.
//!
//! [`ResolvedInterface`] is a borrowed view of a fully resolved entry. It can
//! only be obtained from resolution, so every query on it works against
//! valid base indices.
//!
//! Chain-relative queries take a global index. Ancestors occupy the low
//! indices and the most derived interface the high ones, so a query walks up
//! the parent chain until the index falls at or above the current base:
//!
//! ```text
//! IBar (base 2): [ IFoo.m0 | IFoo.m1 | IBar.m0 | IBar.m1 | IBar.m2 ]
//!                  0         1         2         3         4
//! ```

use xptinfo_core::{
    ConstDescriptor, EntryId, InfoError, InfoResult, InterfaceDescriptor, InterfaceFlags,
    InterfaceId, MethodDescriptor, ParamDescriptor, ParamType, TypeDescriptor,
};

use crate::entry::{InterfaceEntry, Resolution};
use crate::registry::InterfaceRegistry;

/// A fully resolved interface.
#[derive(Clone, Copy)]
pub struct ResolvedInterface<'r> {
    registry: &'r InterfaceRegistry,
    entry: &'r InterfaceEntry,
    resolution: &'r Resolution,
}

impl<'r> ResolvedInterface<'r> {
    pub(crate) fn new(
        registry: &'r InterfaceRegistry,
        entry: &'r InterfaceEntry,
        resolution: &'r Resolution,
    ) -> Self {
        Self {
            registry,
            entry,
            resolution,
        }
    }

    pub fn id(&self) -> EntryId {
        self.entry.id()
    }

    pub fn entry(&self) -> &'r InterfaceEntry {
        self.entry
    }

    pub fn name(&self) -> &'r str {
        self.entry.name()
    }

    pub fn iid(&self) -> InterfaceId {
        self.entry.iid()
    }

    pub fn descriptor(&self) -> &'r InterfaceDescriptor {
        self.entry.descriptor()
    }

    pub fn resolution(&self) -> &'r Resolution {
        self.resolution
    }

    pub fn method_base_index(&self) -> u16 {
        self.resolution.method_base_index
    }

    pub fn constant_base_index(&self) -> u16 {
        self.resolution.constant_base_index
    }

    /// The resolved parent, if any.
    pub fn parent(&self) -> Option<ResolvedInterface<'r>> {
        let parent = self.registry.entry(self.resolution.parent?).ok()?;
        // A resolved entry's ancestors are all resolved.
        Some(ResolvedInterface::new(self.registry, parent, parent.resolution()?))
    }

    /// This interface followed by its ancestors, nearest first.
    pub fn ancestors(&self) -> impl Iterator<Item = ResolvedInterface<'r>> + use<'r> {
        std::iter::successors(Some(*self), |current| current.parent())
    }

    // ==========================================================================
    // Counts and Flags
    // ==========================================================================

    /// Methods including all inherited ones.
    pub fn method_count(&self) -> u16 {
        self.resolution.method_base_index + self.descriptor().num_methods()
    }

    /// Constants including all inherited ones.
    pub fn constant_count(&self) -> u16 {
        self.resolution.constant_base_index + self.descriptor().num_constants()
    }

    pub fn is_function(&self) -> bool {
        self.descriptor().flags.contains(InterfaceFlags::FUNCTION)
    }

    pub fn is_builtin_class(&self) -> bool {
        self.descriptor().flags.contains(InterfaceFlags::BUILTINCLASS)
    }

    pub fn is_main_process_scriptable_only(&self) -> bool {
        self.descriptor()
            .flags
            .contains(InterfaceFlags::MAIN_PROCESS_SCRIPTABLE_ONLY)
    }

    // ==========================================================================
    // Methods and Constants
    // ==========================================================================

    /// The method at a global index.
    pub fn method(&self, index: u16) -> InfoResult<&'r MethodDescriptor> {
        let owner = self.method_owner(index)?;
        owner
            .descriptor()
            .methods
            .get(usize::from(index - owner.method_base_index()))
            .ok_or_else(|| self.out_of_range(index, self.method_count()))
    }

    /// Find a method by name, searching this interface before its ancestors.
    ///
    /// Returns the global index with the method. This is a linear scan.
    pub fn method_by_name(&self, name: &str) -> InfoResult<(u16, &'r MethodDescriptor)> {
        self.ancestors()
            .find_map(|iface| {
                let methods = &iface.descriptor().methods;
                methods
                    .iter()
                    .position(|m| m.name == name)
                    .map(|i| (iface.method_base_index() + i as u16, &methods[i]))
            })
            .ok_or_else(|| InfoError::NotFound {
                name: name.to_string(),
            })
    }

    /// The constant at a global index.
    pub fn constant(&self, index: u16) -> InfoResult<&'r ConstDescriptor> {
        if index >= self.constant_count() {
            return Err(self.out_of_range(index, self.constant_count()));
        }
        let owner = self
            .ancestors()
            .find(|iface| index >= iface.constant_base_index())
            .ok_or_else(|| self.out_of_range(index, self.constant_count()))?;
        owner
            .descriptor()
            .constants
            .get(usize::from(index - owner.constant_base_index()))
            .ok_or_else(|| self.out_of_range(index, self.constant_count()))
    }

    // ==========================================================================
    // Parameters
    // ==========================================================================
    //
    // `param` must belong to the method at `method_index`: its array element
    // indices refer to the additional types of the interface declaring that
    // method.

    /// The entry of an interface-typed parameter, looking through arrays.
    pub fn param_entry(&self, method_index: u16, param: &ParamDescriptor) -> InfoResult<EntryId> {
        let owner = self.method_owner(method_index)?;
        let ty = owner.innermost_type(&param.ty)?;
        let ordinal = ty.interface_ordinal().ok_or(InfoError::NotAnInterfaceType)?;

        let typelib = owner.entry.typelib();
        // Ordinals outside the directory are malformed, not merely unloaded.
        let (index, (name, iid)) = ordinal
            .checked_sub(1)
            .and_then(|index| {
                let lib = self.registry.typelib(typelib)?;
                Some((index, lib.declared(index)?))
            })
            .ok_or(InfoError::NotAnInterfaceType)?;

        self.registry.entry_at(typelib, index).ok_or_else(|| {
            tracing::warn!(interface = name, %iid, ordinal, "declared interface info not found");
            InfoError::DeclaredInterfaceUnavailable {
                ordinal,
                name: name.to_string(),
                iid,
            }
        })
    }

    /// The iid of an interface-typed parameter.
    pub fn param_iid(&self, method_index: u16, param: &ParamDescriptor) -> InfoResult<InterfaceId> {
        let id = self.param_entry(method_index, param)?;
        Ok(self.registry.entry(id)?.iid())
    }

    /// The type of a parameter, or of its element at array `dimension`.
    pub fn param_type(
        &self,
        method_index: u16,
        param: &ParamDescriptor,
        dimension: u16,
    ) -> InfoResult<ParamType> {
        let owner = self.method_owner(method_index)?;
        Ok(owner.type_in_array(&param.ty, dimension)?.param_type())
    }

    /// The `size_is` argument number of a parameter at array `dimension`.
    pub fn size_is_arg_number(
        &self,
        method_index: u16,
        param: &ParamDescriptor,
        dimension: u16,
    ) -> InfoResult<u8> {
        let owner = self.method_owner(method_index)?;
        owner
            .type_in_array(&param.ty, dimension)?
            .size_is_arg()
            .ok_or(InfoError::NotASizeIsType)
    }

    /// The `iid_is` argument number of a parameter, looking through arrays.
    pub fn interface_is_arg_number(
        &self,
        method_index: u16,
        param: &ParamDescriptor,
    ) -> InfoResult<u8> {
        let owner = self.method_owner(method_index)?;
        owner
            .innermost_type(&param.ty)?
            .interface_is_arg()
            .ok_or(InfoError::NotAnIidIsType)
    }

    // ==========================================================================
    // Ancestry
    // ==========================================================================

    /// Whether this interface or any ancestor has identity `iid`.
    pub fn has_ancestor(&self, iid: &InterfaceId) -> InfoResult<bool> {
        Ok(self.ancestors().any(|iface| iface.entry.is_iid(iid)))
    }

    // ==========================================================================
    // Dispatch Helpers
    // ==========================================================================

    /// The interface in the chain that declares the method at `index`.
    fn method_owner(&self, index: u16) -> InfoResult<ResolvedInterface<'r>> {
        if index >= self.method_count() {
            return Err(self.out_of_range(index, self.method_count()));
        }
        self.ancestors()
            .find(|iface| index >= iface.method_base_index())
            .ok_or_else(|| self.out_of_range(index, self.method_count()))
    }

    fn additional_type(&self, index: u16) -> Option<&'r TypeDescriptor> {
        self.descriptor().additional_types.get(usize::from(index))
    }

    /// Walk `dimension` array levels down from `ty`.
    fn type_in_array(
        &self,
        ty: &'r TypeDescriptor,
        dimension: u16,
    ) -> InfoResult<&'r TypeDescriptor> {
        let mut current = ty;
        for _ in 0..dimension {
            current = current
                .array_element()
                .and_then(|element| self.additional_type(element))
                .ok_or(InfoError::NotAnArrayType { dimension })?;
        }
        Ok(current)
    }

    /// Strip every array level from `ty`.
    fn innermost_type(&self, ty: &'r TypeDescriptor) -> InfoResult<&'r TypeDescriptor> {
        let mut current = ty;
        // Each level consumes one additional type; more levels than that means
        // the element chain loops.
        for _ in 0..=self.descriptor().additional_types.len() {
            match current.array_element() {
                None => return Ok(current),
                Some(element) => {
                    current = self
                        .additional_type(element)
                        .ok_or(InfoError::NotAnInterfaceType)?;
                }
            }
        }
        Err(InfoError::NotAnInterfaceType)
    }

    fn out_of_range(&self, index: u16, count: u16) -> InfoError {
        InfoError::IndexOutOfRange {
            name: self.name().to_string(),
            index,
            count,
        }
    }
}

impl std::fmt::Debug for ResolvedInterface<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResolvedInterface")
            .field("name", &self.name())
            .field("method_base_index", &self.method_base_index())
            .field("constant_base_index", &self.constant_base_index())
            .finish()
    }
}

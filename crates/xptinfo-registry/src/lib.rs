//! The interface info registry.
//!
//! [`InterfaceRegistry`] owns one [`InterfaceEntry`] per interface loaded from
//! typelibs. Entries resolve lazily: the first query that needs an
//! inheritance chain resolves it, once, under the registry's working-set lock.
//! Callers then query through a borrowed [`ResolvedInterface`] or a
//! reference-counted [`InterfaceInfo`] handle.

mod entry;
mod info;
mod query;
mod registry;
mod resolve;
mod typelib;
mod working_set;

pub use entry::{InterfaceEntry, Resolution, ResolveState};
pub use info::InterfaceInfo;
pub use query::ResolvedInterface;
pub use registry::InterfaceRegistry;
pub use typelib::Typelib;
pub use working_set::{InfoStats, RegistryOptions};

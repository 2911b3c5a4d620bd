//! Handle lifecycle under concurrent acquire and release.
//!
//! Worker threads follow seeded random schedules of handle requests, clones,
//! parent lookups and drops. Whatever the interleaving, every handle must be
//! destroyed exactly once and the cache must never hand out a second live
//! handle for an entry.

use std::sync::Arc;
use std::thread;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use xptinfo::prelude::*;

const THREADS: u64 = 8;
const STEPS: usize = 2_000;

/// A six-level chain plus two roots.
fn registry() -> Arc<InterfaceRegistry> {
    let mut lib = TypelibDescriptor::new("chain.xpt");
    for level in 0..6u16 {
        let name = format!("ILevel{level}");
        let desc = InterfaceDescriptor::new()
            .with_parent(level)
            .with_method(MethodDescriptor::new(format!("m{level}")));
        lib = lib.with_interface(DirectoryEntry::defined(&name, InterfaceId::from_name(&name), desc));
    }
    for root in ["IRootA", "IRootB"] {
        lib = lib.with_interface(DirectoryEntry::defined(
            root,
            InterfaceId::from_name(root),
            InterfaceDescriptor::new(),
        ));
    }

    let mut registry = InterfaceRegistry::new();
    registry.register_typelib(lib).unwrap();
    Arc::new(registry)
}

fn run_schedule(registry: &Arc<InterfaceRegistry>, seed: u64) {
    let mut rng = StdRng::seed_from_u64(seed);
    let count = registry.interface_count() as u32;
    let mut held: Vec<InterfaceInfo> = Vec::new();

    for _ in 0..STEPS {
        match rng.gen_range(0..4) {
            0 => {
                let id = EntryId::new(rng.gen_range(0..count));
                let info = registry.info(id).unwrap();
                // While any handle for `id` is held, the cache must return it.
                if let Some(existing) = held.iter().find(|h| h.entry_id() == id) {
                    assert_eq!(existing, &info);
                }
                held.push(info);
            }
            1 if !held.is_empty() => {
                let i = rng.gen_range(0..held.len());
                let extra = held[i].acquire();
                held.push(extra);
            }
            2 if !held.is_empty() => {
                let i = rng.gen_range(0..held.len());
                if let Some(parent) = held[i].parent().unwrap() {
                    assert_eq!(
                        parent.method_count().unwrap() + 1,
                        held[i].method_count().unwrap()
                    );
                    held.push(parent);
                }
            }
            _ if !held.is_empty() => {
                let i = rng.gen_range(0..held.len());
                held.swap_remove(i).release();
            }
            _ => {}
        }
    }
}

#[test]
fn test_randomized_acquire_release_never_leaks() {
    let registry = registry();

    thread::scope(|s| {
        for seed in 0..THREADS {
            let registry = &registry;
            s.spawn(move || run_schedule(registry, seed));
        }
    });

    let stats = registry.stats();
    assert!(stats.created > 0);
    assert_eq!(stats.created, stats.destroyed);
    assert_eq!(stats.live, 0);
    assert!(registry.live_infos().is_empty());
}

#[test]
fn test_concurrent_first_request_yields_one_handle() {
    let registry = registry();
    let deepest = registry.entry_by_name("ILevel5").unwrap();

    let handles: Vec<InterfaceInfo> = thread::scope(|s| {
        let workers: Vec<_> = (0..THREADS)
            .map(|_| s.spawn(|| registry.info(deepest).unwrap()))
            .collect();
        workers.into_iter().map(|w| w.join().unwrap()).collect()
    });

    assert!(handles.windows(2).all(|pair| pair[0] == pair[1]));
    assert_eq!(handles[0].ref_count(), THREADS as usize);
    assert_eq!(handles[0].method_count(), Ok(6));
    assert_eq!(registry.stats().created, 1);

    drop(handles);
    assert_eq!(registry.stats().destroyed, 1);
}

#[test]
fn test_invalidation_races_with_requests() {
    let registry = registry();

    thread::scope(|s| {
        for seed in 0..THREADS {
            let registry = &registry;
            s.spawn(move || {
                let mut rng = StdRng::seed_from_u64(seed + 100);
                let count = registry.interface_count() as u32;
                for _ in 0..STEPS / 4 {
                    if rng.gen_bool(0.05) {
                        registry.invalidate_infos();
                        continue;
                    }
                    let id = EntryId::new(rng.gen_range(0..count));
                    let info = registry.info(id).unwrap();
                    match info.method_count() {
                        Ok(_) | Err(InfoError::Invalidated { .. }) => {}
                        Err(other) => panic!("unexpected error: {other}"),
                    }
                    if let Ok(Some(parent)) = info.parent() {
                        drop(parent);
                    }
                }
            });
        }
    });

    let stats = registry.stats();
    assert_eq!(stats.created, stats.destroyed);
    assert_eq!(stats.live, 0);
    assert!(registry.live_infos().is_empty());
}

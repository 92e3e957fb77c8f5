//! The structural-hash key. The table itself lives on `AigManager`
//! (it needs mutable access to the arena to walk collision chains), so
//! this module only defines the canonical key -- mirroring the way the
//! teacher crate's `HiLoCache` keys a `DashMap` on a plain `HiLo` value
//! (see `vhl.rs`) rather than hand-rolling a hash function.
use crate::edge::{Edge, NodeId};

/// Canonical key for an `And` node: its two fanins, ordered so the
/// smaller-ID fanin comes first (invariant 1). Two `And` nodes collide
/// in the table iff they compute the same function up to this
/// canonicalization -- i.e. iff structural hashing would merge them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct HashKey {
    pub f0: NodeId,
    pub c0: bool,
    pub f1: NodeId,
    pub c1: bool,
}

impl HashKey {
    /// Build the canonical key for a (not yet necessarily ordered)
    /// fanin pair. Returns the key plus the fanins in the order they
    /// should be stored on the node.
    pub fn new(p: Edge, q: Edge) -> (HashKey, Edge, Edge) {
        let (a, b) = if p.id() <= q.id() { (p, q) } else { (q, p) };
        (
            HashKey { f0: a.id(), c0: a.is_compl(), f1: b.id(), c1: b.is_compl() },
            a,
            b,
        )
    }
}

pub type FxHashMap<K, V> = std::collections::HashMap<K, V, fxhash::FxBuildHasher>;
pub type FxHashSet<T> = std::collections::HashSet<T, fxhash::FxBuildHasher>;

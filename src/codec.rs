//! Vertex-to-index codec.
//!
//! The core algorithms operate on dense `0..n` indices; callers supply
//! arbitrary hashable, orderable vertex identities. [`IndexMap`] is the
//! two-way map built once per public entry-point call; everything internal
//! to the crate stays index-based, and only the public wrappers in
//! [`crate`] touch this module.

use std::collections::BTreeSet;
use std::hash::Hash;

use hashbrown::HashMap;

use crate::common::Nodes;

/// Bidirectional map between caller vertex identities and dense indices.
///
/// Indices are assigned in sorted order of `V`. This is a stricter
/// guarantee than "first-seen order for non-orderable identities" — Rust
/// has no stable specialization to pick a fallback automatically, and
/// requiring `Ord` keeps this collaborator exactly as thin as the spec
/// expects it to be (see `DESIGN.md`).
pub struct IndexMap<V> {
    i2v: Vec<V>,
    v2i: HashMap<V, usize>,
}

impl<V: Eq + Hash + Clone + Ord> IndexMap<V> {
    /// Builds the codec from the full vertex set.
    pub fn new(vertices: impl IntoIterator<Item = V>) -> Self {
        let sorted: BTreeSet<V> = vertices.into_iter().collect();
        let i2v: Vec<V> = sorted.into_iter().collect();
        let v2i = i2v
            .iter()
            .cloned()
            .enumerate()
            .map(|(i, v)| (v, i))
            .collect();
        Self { i2v, v2i }
    }

    pub fn len(&self) -> usize {
        self.i2v.len()
    }

    pub fn is_empty(&self) -> bool {
        self.i2v.is_empty()
    }

    /// Encodes a single vertex. Returns `None` if `v` was not part of the
    /// vertex set the codec was built from.
    pub fn encode(&self, v: &V) -> Option<usize> {
        self.v2i.get(v).copied()
    }

    /// Decodes a dense index back to the caller's vertex identity.
    ///
    /// # Panics
    ///
    /// Panics if `i` is out of range; internal callers only ever decode
    /// indices in `0..self.len()`.
    pub fn decode(&self, i: usize) -> V {
        self.i2v[i].clone()
    }

    /// Encodes a set of vertices, dropping any not in the codec's domain.
    pub fn encode_set(&self, vset: &hashbrown::HashSet<V>) -> Nodes {
        vset.iter().filter_map(|v| self.encode(v)).collect()
    }
}

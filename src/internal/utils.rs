//! Utilities.

use std::{collections::BTreeSet, hash::Hash, ops::Deref};

use fixedbitset::FixedBitSet;

use crate::common::{Graph, Nodes};

/// Computes the odd neighbors of the nodes in `kset`.
///
/// # Note
///
/// - Naive implementation only for post-verification.
pub fn odd_neighbors(g: &Graph, kset: &Nodes) -> Nodes {
    assert!(kset.iter().all(|&ki| ki < g.len()), "kset out of range");
    let mut work = kset.clone();
    work.extend(kset.iter().flat_map(|&ki| g[ki].iter().copied()));
    work.retain(|&u| kset.intersection(&g[u]).count() % 2 == 1);
    work
}

/// Resizes `mat` to `mat.len()` x `ncols` and fills with zeros.
pub fn zerofill(mat: &mut [FixedBitSet], ncols: usize) {
    let src = FixedBitSet::with_capacity(ncols);
    for x in mat.iter_mut() {
        x.clone_from(&src);
    }
}

/// Helper trait for in-place set operations.
pub trait InPlaceSetOp<T> {
    /// Drops the elements from `other` from self.
    fn difference_with<U>(&mut self, other: impl IntoIterator<Item = U>)
    where
        U: Deref<Target = T>;

    /// Extends self with the elements from `other`.
    fn union_with<U>(&mut self, other: impl IntoIterator<Item = U>)
    where
        T: Clone,
        U: Deref<Target = T>;
}

impl<T> InPlaceSetOp<T> for hashbrown::HashSet<T>
where
    T: Eq + Hash,
{
    fn difference_with<U>(&mut self, other: impl IntoIterator<Item = U>)
    where
        U: Deref<Target = T>,
    {
        other.into_iter().for_each(|x| {
            self.remove(&*x);
        });
    }

    fn union_with<U>(&mut self, other: impl IntoIterator<Item = U>)
    where
        T: Clone,
        U: Deref<Target = T>,
    {
        self.extend(other.into_iter().map(|x| x.deref().clone()));
    }
}

impl<T> InPlaceSetOp<T> for BTreeSet<T>
where
    T: Eq + Ord,
{
    fn difference_with<U>(&mut self, other: impl IntoIterator<Item = U>)
    where
        U: Deref<Target = T>,
    {
        other.into_iter().for_each(|x| {
            self.remove(&*x);
        });
    }

    fn union_with<U>(&mut self, other: impl IntoIterator<Item = U>)
    where
        T: Clone,
        U: Deref<Target = T>,
    {
        self.extend(other.into_iter().map(|x| x.deref().clone()));
    }
}

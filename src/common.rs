//! Common types shared by the flow/gflow/pflow algorithms.

use hashbrown;
use std::collections::BTreeSet;

/// Set of vertex indices.
pub type Nodes = hashbrown::HashSet<usize>;
/// Ordered set of vertex indices. Used wherever iteration order must be
/// deterministic (e.g. rows/columns of the GF(2) working matrix).
pub type OrderedNodes = BTreeSet<usize>;
/// Undirected graph represented as an adjacency list over dense indices
/// `0..g.len()`.
pub type Graph = Vec<Nodes>;
/// Layer (partial-order depth) of every vertex, indexed densely.
pub type Layer = Vec<usize>;

/// Measurement plane for generalized flow.
///
/// A closed enumeration, not a string tag: finders dispatch on the variant
/// when building the right-hand side of the GF(2) system.
#[derive(PartialEq, Eq, Clone, Copy, Debug, Hash)]
pub enum Plane {
    XY,
    YZ,
    XZ,
}

/// Measurement specification for Pauli flow: the three planes plus the
/// three Pauli bases, which relax order constraints on some outgoing
/// edges (see [`crate::internal::layer`]).
#[derive(PartialEq, Eq, Clone, Copy, Debug, Hash)]
pub enum PPlane {
    XY,
    YZ,
    XZ,
    X,
    Y,
    Z,
}

impl From<Plane> for PPlane {
    fn from(p: Plane) -> Self {
        match p {
            Plane::XY => PPlane::XY,
            Plane::YZ => PPlane::YZ,
            Plane::XZ => PPlane::XZ,
        }
    }
}

impl PPlane {
    /// `true` for the three genuine Pauli (point) measurements, as opposed
    /// to the three plane measurements.
    pub fn is_pauli(self) -> bool {
        matches!(self, PPlane::X | PPlane::Y | PPlane::Z)
    }
}

//! Core-side input/output validations, operating on dense vertex indices.
//!
//! # Note
//!
//! - Internal module for testing.

use std::collections::BTreeMap;

use crate::common::{Graph, Layer, Nodes, PPlane};
use crate::error::FlowValidationError::{
    self, ExcessiveNonZeroLayer, ExcessiveZeroLayer, InconsistentFlowOrder, InvalidFlowCodomain,
    InvalidFlowDomain, InvalidInput, InvalidMeasurementSpec,
};

/// Checks that `(g, iset, oset)` is a well-formed open graph: non-empty,
/// simple (no self-loops, no multi-edges — guaranteed by `Nodes` being a
/// set — and symmetric), and `iset`/`oset` within range.
pub fn check_graph(g: &Graph, iset: &Nodes, oset: &Nodes) -> Result<(), FlowValidationError> {
    let n = g.len();
    if n == 0 {
        return Err(InvalidInput {
            reason: "graph is empty".to_string(),
        });
    }
    for (u, gu) in g.iter().enumerate() {
        if gu.contains(&u) {
            return Err(InvalidInput {
                reason: format!("self-loop detected at node {u}"),
            });
        }
        for &v in gu {
            if v >= n {
                return Err(InvalidInput {
                    reason: format!("node index out of range: {v}"),
                });
            }
            if !g[v].contains(&u) {
                return Err(InvalidInput {
                    reason: format!("graph is not undirected: missing edge {v} -> {u}"),
                });
            }
        }
    }
    for &u in iset {
        if u >= n {
            return Err(InvalidInput {
                reason: format!("iset contains out-of-range node {u}"),
            });
        }
    }
    for &u in oset {
        if u >= n {
            return Err(InvalidInput {
                reason: format!("oset contains out-of-range node {u}"),
            });
        }
    }
    Ok(())
}

/// Checks that a measurement map (`Plane` or `PPlane`, erased to `()` keys
/// here) has domain exactly `V \ O`: present for every such vertex, and
/// present for no other.
pub fn check_planelike<P>(
    n: usize,
    oset: &Nodes,
    planelike: &BTreeMap<usize, P>,
) -> Result<(), FlowValidationError> {
    for &u in planelike.keys() {
        if u >= n {
            return Err(InvalidInput {
                reason: format!("measurement map refers to unknown node {u}"),
            });
        }
    }
    for u in 0..n {
        let needs_plane = !oset.contains(&u);
        let has_plane = planelike.contains_key(&u);
        match (needs_plane, has_plane) {
            (true, false) => {
                return Err(InvalidMeasurementSpec { node: u });
            }
            (false, true) => {
                return Err(InvalidInput {
                    reason: format!("excessive measurement plane specified for output node {u}"),
                });
            }
            _ => {}
        }
    }
    Ok(())
}

/// `true` if `pplanes` contains no genuine Pauli (`X`/`Y`/`Z`) measurement —
/// a pflow call under these conditions is better served by `gflow_find`.
pub fn all_non_pauli(pplanes: &BTreeMap<usize, PPlane>) -> bool {
    pplanes.values().all(|p| !p.is_pauli())
}

/// Checks if the layer-zero nodes are correctly chosen.
///
/// # Arguments
///
/// - `layer`: The layer.
/// - `oset`: The set of output nodes.
/// - `iff`: If `true`, `layer[u] == 0` "iff" `u` is in `oset`. Otherwise "if".
///   `ensure_optimal` callers pass `true`; plain validity checks pass `false`.
pub fn check_initial(layer: &Layer, oset: &Nodes, iff: bool) -> Result<(), FlowValidationError> {
    for (u, &lu) in layer.iter().enumerate() {
        match (oset.contains(&u), lu == 0) {
            (true, false) => {
                Err(ExcessiveNonZeroLayer { node: u, layer: lu })?;
            }
            (false, true) if iff => {
                Err(ExcessiveZeroLayer { node: u })?;
            }
            _ => {}
        }
    }
    Ok(())
}

/// Checks if the domain of `f` is in `vset - oset` and the codomain is in `vset - iset`.
///
/// # Arguments
///
/// - `f_flatiter`: Flow, gflow, or pflow as `impl Iterator<Item = (&usize, &usize)>`.
/// - `vset`: All nodes.
/// - `iset`: Input nodes.
/// - `oset`: Output nodes.
///
/// # Note
///
/// It is allowed for `f[i]` to contain `i`, even if `i` is in `iset`.
pub fn check_domain<'a, 'b>(
    f_flatiter: impl Iterator<Item = (&'a usize, &'b usize)>,
    vset: &Nodes,
    iset: &Nodes,
    oset: &Nodes,
) -> Result<(), FlowValidationError> {
    let icset = vset - iset;
    let ocset = vset - oset;
    let mut dom = Nodes::new();
    for (&i, &fi) in f_flatiter {
        dom.insert(i);
        if i != fi && !icset.contains(&fi) {
            Err(InvalidFlowCodomain { node: i })?;
        }
    }
    if let Some(&i) = dom.symmetric_difference(&ocset).next() {
        Err(InvalidFlowDomain { node: i })?;
    }
    Ok(())
}

/// Checks the order axiom: for every `(u, v)` pair where `v` must strictly
/// precede `u` (`v` is in the correction set or its odd neighborhood and the
/// edge is not special), `layer[u] > layer[v]`.
pub fn check_order(layer: &Layer, u: usize, v: usize) -> Result<(), FlowValidationError> {
    if layer[u] <= layer[v] {
        Err(InconsistentFlowOrder { edge: (u, v) })?;
    }
    Ok(())
}

//! Layer inference (C6): reconstructs a valid layering from a flow/gflow/
//! pflow that was supplied without one.
//!
//! Grounded on the Python reference's `swiflow._common.infer_layers` /
//! `_special_edges`: build the "must precede" DAG from
//! `(f(u) ∪ Odd(f(u))) \ {u}`, skipping special edges, then peel
//! output-first with a Kahn-style topological sort.

use std::collections::BTreeMap;

use hashbrown::HashSet;

use crate::common::{Graph, Layer, Nodes, PPlane};
use crate::error::FlowValidationError;
use crate::internal::utils::odd_neighbors;

/// Uniform shape for causal flow, gflow, and pflow: `f(u)` as a set (a
/// causal flow's singleton is represented as a one-element set).
pub type AnyFlow = hashbrown::HashMap<usize, Nodes>;

/// `true` iff the edge `u -> v` (i.e. `v` would otherwise need to strictly
/// precede `u`) is special under Pauli flow rules, and thus exempt from the
/// order constraint.
fn is_special(pp: Option<PPlane>, in_fu: bool, in_fu_odd: bool) -> bool {
    match pp {
        Some(PPlane::X) => in_fu,
        Some(PPlane::Y) => in_fu && in_fu_odd,
        Some(PPlane::Z) => in_fu_odd,
        _ => false,
    }
}

/// Computes the set of special edges `(u, v)` for the given flow. Returns
/// the empty set when `pplanes` is `None` (causal flow / gflow have no
/// special edges).
pub fn special_edges(
    g: &Graph,
    anyflow: &AnyFlow,
    pplanes: Option<&BTreeMap<usize, PPlane>>,
) -> HashSet<(usize, usize)> {
    let mut ret = HashSet::new();
    let Some(pplanes) = pplanes else {
        return ret;
    };
    for (&u, fu) in anyflow {
        let fu_odd = odd_neighbors(g, fu);
        for &v in fu.iter().chain(fu_odd.iter()) {
            if u == v {
                continue;
            }
            let pp = pplanes.get(&v).copied();
            if is_special(pp, fu.contains(&v), fu_odd.contains(&v)) {
                ret.insert((u, v));
            }
        }
    }
    ret
}

/// Reconstructs a valid (not necessarily maximally-delayed) layering from
/// `anyflow`.
///
/// # Errors
///
/// `FlowValidationError::InvalidInput` with the message `"cannot determine
/// layer"` if some vertex's dependencies never fully resolve (e.g. the
/// must-precede graph has a cycle).
pub fn infer(
    g: &Graph,
    anyflow: &AnyFlow,
    pplanes: Option<&BTreeMap<usize, PPlane>>,
) -> Result<Layer, FlowValidationError> {
    let n = g.len();
    let special = special_edges(g, anyflow, pplanes);
    let mut pred: Vec<Nodes> = vec![Nodes::new(); n];
    let mut succ: Vec<Nodes> = vec![Nodes::new(); n];
    for (&u, fu) in anyflow {
        let fu_odd = odd_neighbors(g, fu);
        for &v in fu.iter().chain(fu_odd.iter()) {
            if u == v || special.contains(&(u, v)) {
                continue;
            }
            // v must be layered (strictly) before u.
            pred[u].insert(v);
            succ[v].insert(u);
        }
    }
    let mut layer = vec![usize::MAX; n];
    let mut work: Vec<usize> = (0..n).filter(|&u| pred[u].is_empty()).collect();
    let mut nresolved = 0;
    let mut l = 0_usize;
    while !work.is_empty() {
        let mut next = Vec::new();
        for &u in &work {
            layer[u] = l;
            nresolved += 1;
            for &v in &succ[u] {
                pred[v].remove(&u);
                if pred[v].is_empty() {
                    next.push(v);
                }
            }
        }
        work = next;
        l += 1;
    }
    if nresolved != n {
        return Err(FlowValidationError::InvalidInput {
            reason: "cannot determine layer".to_string(),
        });
    }
    Ok(layer)
}

//! Maximally-delayed Pauli flow algorithm (C5).
//!
//! Grounded on the teacher's `pflow.rs`: extends gflow's per-layer GF(2)
//! solve by enlarging the corrector pool with not-yet-solved Pauli-measured
//! vertices (`rowset_lower`) and by trying, for each vertex, whichever of
//! the three plane-style right-hand sides (`XY`/`YZ`/`XZ`-shaped) is
//! compatible with its Pauli spec.

use std::collections::BTreeMap;

use fixedbitset::FixedBitSet;
use hashbrown::HashMap;

use crate::common::{Graph, Layer, Nodes, OrderedNodes, PPlane};
use crate::error::FlowValidationError::{self, InconsistentFlowPPlane};
use crate::internal::gf2_linalg::GF2Solver;
use crate::internal::layer::{self, AnyFlow};
use crate::internal::utils::{odd_neighbors, zerofill, InPlaceSetOp};
use crate::internal::validate;

/// Pauli flow: same subset-valued shape as gflow.
pub type PFlow = HashMap<usize, Nodes>;

/// `true` iff `(in_fu, in_fu_odd)` satisfies the correction axiom for `pp`.
fn axiom_ok(pp: PPlane, in_fu: bool, in_fu_odd: bool) -> bool {
    match pp {
        PPlane::XY => (in_fu, in_fu_odd) == (false, true),
        PPlane::YZ => (in_fu, in_fu_odd) == (true, false),
        PPlane::XZ => (in_fu, in_fu_odd) == (true, true),
        PPlane::X => in_fu_odd,
        PPlane::Y => in_fu != in_fu_odd,
        PPlane::Z => in_fu,
    }
}

/// Checks the definition of Pauli flow: order compatibility on non-special
/// edges (axiom 3) plus the correction axiom (axiom 2) per `pplanes`.
fn check_definition(
    f: &PFlow,
    layer: &Layer,
    g: &Graph,
    pplanes: &BTreeMap<usize, PPlane>,
) -> Result<(), FlowValidationError> {
    let anyflow: AnyFlow = f.clone();
    let special = layer::special_edges(g, &anyflow, Some(pplanes));
    for (&u, fu) in f {
        let fu_odd = odd_neighbors(g, fu);
        for &v in fu.iter().chain(fu_odd.iter()) {
            if u == v || special.contains(&(u, v)) {
                continue;
            }
            validate::check_order(layer, u, v)?;
        }
        let pu = pplanes[&u];
        if !axiom_ok(pu, fu.contains(&u), fu_odd.contains(&u)) {
            return Err(InconsistentFlowPPlane { node: u, pplane: pu });
        }
    }
    Ok(())
}

fn init_work_upper_co(work: &mut [FixedBitSet], g: &Graph, rowset: &OrderedNodes, colset: &OrderedNodes) {
    let colset2i: HashMap<_, _> = colset.iter().enumerate().map(|(i, &v)| (v, i)).collect();
    for (r, &v) in rowset.iter().enumerate() {
        for &w in &g[v] {
            if let Some(&c) = colset2i.get(&w) {
                work[r].insert(c);
            }
        }
    }
}

fn init_work_lower_co(work: &mut [FixedBitSet], g: &Graph, rowset: &OrderedNodes, colset: &OrderedNodes) {
    let colset2i: HashMap<_, _> = colset.iter().enumerate().map(|(i, &v)| (v, i)).collect();
    for (r, &v) in rowset.iter().enumerate() {
        // A Pauli-measured vertex can always correct itself.
        work[r].insert(r);
        for &w in &g[v] {
            if let Some(&c) = colset2i.get(&w) {
                work[r].insert(c);
            }
        }
    }
}

fn clear_work_rhs(work: &mut [FixedBitSet]) {
    for row in work {
        let width = row.len();
        row.remove_range(width - 1..width);
    }
}

type BranchKind = u8;
const BRANCH_XY: BranchKind = 0;
const BRANCH_YZ: BranchKind = 1;
const BRANCH_XZ: BranchKind = 2;

/// Right-hand side for the `rowset_upper` block, under branch `K`.
fn init_work_upper_rhs<const K: BranchKind>(
    work: &mut [FixedBitSet],
    u: usize,
    g: &Graph,
    rowset: &OrderedNodes,
    colset: &OrderedNodes,
) {
    debug_assert!(rowset.contains(&u));
    let rowset2i: HashMap<_, _> = rowset.iter().enumerate().map(|(i, &v)| (v, i)).collect();
    let c = colset.len();
    if K != BRANCH_YZ {
        work[rowset2i[&u]].insert(c);
    }
    if K == BRANCH_XY {
        return;
    }
    for &v in &g[u] {
        if let Some(&r) = rowset2i.get(&v) {
            work[r].toggle(c);
        }
    }
}

/// Right-hand side for the `rowset_lower` block, under branch `K`.
fn init_work_lower_rhs<const K: BranchKind>(
    work: &mut [FixedBitSet],
    u: usize,
    g: &Graph,
    rowset: &OrderedNodes,
    colset: &OrderedNodes,
) {
    let rowset2i: HashMap<_, _> = rowset.iter().enumerate().map(|(i, &v)| (v, i)).collect();
    let c = colset.len();
    if K == BRANCH_XY {
        return;
    }
    for &v in &g[u] {
        if let Some(&r) = rowset2i.get(&v) {
            work[r].toggle(c);
        }
    }
}

fn decode_solution<const K: BranchKind>(u: usize, x: &FixedBitSet, tab: &[usize]) -> Nodes {
    let mut fu: Nodes = x.ones().map(|c| tab[c]).collect();
    if K != BRANCH_XY {
        fu.insert(u);
    }
    fu
}

/// Finds the maximally-delayed Pauli flow, if one exists.
///
/// # Note
///
/// - Vertex indices are assumed dense, `0..g.len()`.
/// - `pplanes` must be defined exactly on `V \ O`; callers run
///   [`validate::check_planelike`] first.
#[tracing::instrument(skip_all)]
#[allow(clippy::too_many_lines)]
pub fn find(
    g: &Graph,
    iset: &Nodes,
    oset: &Nodes,
    pplanes: &BTreeMap<usize, PPlane>,
) -> Option<(PFlow, Layer)> {
    let n = g.len();
    let vset: Nodes = (0..n).collect();
    let yset: Nodes = pplanes
        .iter()
        .filter_map(|(&u, &p)| (p == PPlane::Y).then_some(u))
        .collect();
    let xyset: Nodes = pplanes
        .iter()
        .filter_map(|(&u, &p)| matches!(p, PPlane::X | PPlane::Y).then_some(u))
        .collect();
    let yzset: Nodes = pplanes
        .iter()
        .filter_map(|(&u, &p)| matches!(p, PPlane::Y | PPlane::Z).then_some(u))
        .collect();
    let mut cset = Nodes::new();
    let mut ocset: Nodes = &vset - oset;
    let mut rowset_upper: OrderedNodes = (&vset - &yzset).into_iter().collect();
    let mut rowset_lower: OrderedNodes = yset.into_iter().collect();
    let mut colset: OrderedNodes = (&xyset - iset).into_iter().collect();
    let mut f = PFlow::with_capacity(ocset.len());
    let mut layer = vec![0_usize; n];
    let mut work = vec![FixedBitSet::new(); rowset_upper.len() + rowset_lower.len()];
    let mut tab = Vec::new();
    for l in 0_usize.. {
        cset.clear();
        let mut cleanup = None;
        for &u in &ocset {
            if let Some((uprev, p0, p1, p2)) = cleanup {
                if p0 {
                    rowset_upper.remove(&uprev);
                }
                if p1 {
                    rowset_lower.insert(uprev);
                }
                if p2 {
                    colset.insert(uprev);
                }
            }
            cleanup = Some((
                u,
                rowset_upper.insert(u),
                rowset_lower.remove(&u),
                colset.remove(&u),
            ));
            let nrows_upper = rowset_upper.len();
            let nrows_lower = rowset_lower.len();
            let ncols = colset.len();
            if nrows_upper + nrows_lower == 0 || ncols == 0 {
                continue;
            }
            work.resize_with(nrows_upper + nrows_lower, FixedBitSet::new);
            zerofill(&mut work, ncols + 1);
            init_work_upper_co(&mut work[..nrows_upper], g, &rowset_upper, &colset);
            init_work_lower_co(&mut work[nrows_upper..], g, &rowset_lower, &colset);
            tab.clear();
            tab.extend(colset.iter().copied());
            let mut x = FixedBitSet::with_capacity(ncols);
            let ppu = pplanes[&u];
            let mut done = false;
            if !done && matches!(ppu, PPlane::XY | PPlane::X | PPlane::Y) {
                clear_work_rhs(&mut work);
                init_work_upper_rhs::<BRANCH_XY>(&mut work[..nrows_upper], u, g, &rowset_upper, &colset);
                init_work_lower_rhs::<BRANCH_XY>(&mut work[nrows_upper..], u, g, &rowset_lower, &colset);
                let mut solver = GF2Solver::attach(work, 1);
                if solver.solve_in_place(&mut x, 0) {
                    f.insert(u, decode_solution::<BRANCH_XY>(u, &x, &tab));
                    done = true;
                }
                work = solver.detach();
            }
            if !done && matches!(ppu, PPlane::YZ | PPlane::Y | PPlane::Z) {
                x.clear();
                clear_work_rhs(&mut work);
                init_work_upper_rhs::<BRANCH_YZ>(&mut work[..nrows_upper], u, g, &rowset_upper, &colset);
                init_work_lower_rhs::<BRANCH_YZ>(&mut work[nrows_upper..], u, g, &rowset_lower, &colset);
                let mut solver = GF2Solver::attach(work, 1);
                if solver.solve_in_place(&mut x, 0) {
                    f.insert(u, decode_solution::<BRANCH_YZ>(u, &x, &tab));
                    done = true;
                }
                work = solver.detach();
            }
            if !done && matches!(ppu, PPlane::XZ | PPlane::Z | PPlane::X) {
                x.clear();
                clear_work_rhs(&mut work);
                init_work_upper_rhs::<BRANCH_XZ>(&mut work[..nrows_upper], u, g, &rowset_upper, &colset);
                init_work_lower_rhs::<BRANCH_XZ>(&mut work[nrows_upper..], u, g, &rowset_lower, &colset);
                let mut solver = GF2Solver::attach(work, 1);
                if solver.solve_in_place(&mut x, 0) {
                    f.insert(u, decode_solution::<BRANCH_XZ>(u, &x, &tab));
                    done = true;
                }
                work = solver.detach();
            }
            if done {
                layer[u] = l;
                cset.insert(u);
            }
        }
        if l == 0 {
            rowset_upper.difference_with(oset);
            rowset_lower.difference_with(oset);
            colset.union_with(oset.difference(iset));
        } else if cset.is_empty() {
            break;
        }
        ocset.difference_with(&cset);
        rowset_upper.difference_with(&cset);
        rowset_lower.difference_with(&cset);
        colset.union_with(cset.difference(iset));
    }
    if !ocset.is_empty() {
        tracing::debug!("no pflow");
        return None;
    }
    debug_assert!({
        let f_flatiter = f.iter().flat_map(|(i, fi)| std::iter::zip(std::iter::repeat(i), fi));
        validate::check_domain(f_flatiter, &vset, iset, oset).is_ok()
    });
    debug_assert!(validate::check_initial(&layer, oset, true).is_ok());
    debug_assert!(check_definition(&f, &layer, g, pplanes).is_ok());
    Some((f, layer))
}

/// Verifies a candidate Pauli flow against the definition.
///
/// If `layer` is `None`, it is reconstructed with [`layer::infer`],
/// accounting for special edges.
pub fn verify(
    f: &PFlow,
    layer: Option<&Layer>,
    g: &Graph,
    iset: &Nodes,
    oset: &Nodes,
    pplanes: &BTreeMap<usize, PPlane>,
    ensure_optimal: bool,
) -> Result<(), FlowValidationError> {
    let n = g.len();
    let vset: Nodes = (0..n).collect();
    let f_flatiter = f.iter().flat_map(|(i, fi)| std::iter::zip(std::iter::repeat(i), fi));
    validate::check_domain(f_flatiter, &vset, iset, oset)?;
    validate::check_planelike(n, oset, pplanes)?;

    let anyflow: AnyFlow = f.clone();
    let owned_layer;
    let layer = match layer {
        Some(l) => l,
        None => {
            owned_layer = layer::infer(g, &anyflow, Some(pplanes))?;
            &owned_layer
        }
    };

    validate::check_initial(layer, oset, ensure_optimal)?;
    check_definition(f, layer, g, pplanes)?;
    if ensure_optimal {
        let canonical = layer::infer(g, &anyflow, Some(pplanes))?;
        if &canonical != layer {
            let node = (0..n).find(|&u| canonical[u] != layer[u]).expect("differs");
            return Err(FlowValidationError::InvalidInput {
                reason: format!(
                    "layer at node {node} is not maximally delayed (expected {}, got {})",
                    canonical[node], layer[node]
                ),
            });
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::internal::test_utils::{self, TestCase};

    macro_rules! pplanes {
        ($($u:literal: $v:expr),* $(,)?) => {
            BTreeMap::from_iter([$(($u, $v)),*])
        };
    }

    #[test]
    fn test_find_case0() {
        let TestCase { g, iset, oset } = test_utils::CASE0.clone();
        let pplanes = pplanes! {};
        let (f, layer) = find(&g, &iset, &oset, &pplanes).unwrap();
        assert!(f.is_empty());
        assert_eq!(layer, vec![0, 0]);
        verify(&f, Some(&layer), &g, &iset, &oset, &pplanes, true).unwrap();
    }

    #[test_log::test]
    fn test_find_case1_all_xy() {
        let TestCase { g, iset, oset } = test_utils::CASE1.clone();
        let pplanes = pplanes! {0: PPlane::XY, 1: PPlane::XY, 2: PPlane::XY, 3: PPlane::XY};
        let (f, layer) = find(&g, &iset, &oset, &pplanes).unwrap();
        assert_eq!(f[&0], Nodes::from([1]));
        assert_eq!(layer, vec![4, 3, 2, 1, 0]);
        verify(&f, Some(&layer), &g, &iset, &oset, &pplanes, true).unwrap();
    }

    #[test]
    fn test_find_case3_with_pauli() {
        let TestCase { g, iset, oset } = test_utils::CASE3.clone();
        // All non-Pauli: mirrors the gflow result for this graph.
        let pplanes = pplanes! {0: PPlane::XY, 1: PPlane::XY, 2: PPlane::XY};
        let (f, layer) = find(&g, &iset, &oset, &pplanes).unwrap();
        verify(&f, Some(&layer), &g, &iset, &oset, &pplanes, true).unwrap();
        verify(&f, None, &g, &iset, &oset, &pplanes, true).unwrap();
    }

    #[test]
    fn test_find_case5_no_gflow_but_pflow_relaxes() {
        // CASE5 has no causal/gflow under all-XY, but a Z-measured vertex
        // can self-correct regardless of order, so pflow may still exist
        // once a vertex is given a genuine Pauli spec.
        let TestCase { g, iset, oset } = test_utils::CASE5.clone();
        let pplanes = pplanes! {0: PPlane::Z, 1: PPlane::XY};
        // Either found or not — the key property under test is that the
        // call completes and any flow found verifies cleanly.
        if let Some((f, layer)) = find(&g, &iset, &oset, &pplanes) {
            verify(&f, Some(&layer), &g, &iset, &oset, &pplanes, true).unwrap();
        }
    }

    #[test]
    fn test_all_non_pauli() {
        let pplanes = pplanes! {0: PPlane::XY, 1: PPlane::YZ};
        assert!(validate::all_non_pauli(&pplanes));
        let pplanes = pplanes! {0: PPlane::XY, 1: PPlane::Z};
        assert!(!validate::all_non_pauli(&pplanes));
    }
}

//! Maximally-delayed generalized flow algorithm (C4).
//!
//! Grounded on the teacher's `gflow.rs`: at each layer, the correction set
//! `f(u)` for every not-yet-solved `u` is read off as a particular solution
//! of a GF(2) linear system built from the adjacency matrix restricted to
//! the still-open vertices, with the right-hand side determined by `u`'s
//! measurement plane.

use std::collections::BTreeMap;

use fixedbitset::FixedBitSet;
use hashbrown::HashMap;

use crate::common::{Graph, Layer, Nodes, OrderedNodes, Plane};
use crate::error::FlowValidationError::{self, InconsistentFlowPlane};
use crate::internal::gf2_linalg::GF2Solver;
use crate::internal::layer::{self, AnyFlow};
use crate::internal::utils::{odd_neighbors, zerofill, InPlaceSetOp};
use crate::internal::validate;

/// Generalized flow: `f(u)` is a (possibly non-singleton) correction set.
pub type GFlow = HashMap<usize, Nodes>;

/// Checks the definition of gflow:
///
/// 1. `u -> v` for `v` in `f(u)`, `v != u`.
/// 2. `u -> v` for `v` in `Odd(f(u))`, `v != u`.
/// 3. `(u in f(u), u in Odd(f(u)))` matches the plane table:
///    - `XY`: `(false, true)`.
///    - `YZ`: `(true, false)`.
///    - `XZ`: `(true, true)`.
fn check_definition(
    f: &GFlow,
    layer: &Layer,
    g: &Graph,
    planes: &BTreeMap<usize, Plane>,
) -> Result<(), FlowValidationError> {
    for (&u, fu) in f {
        for &v in fu {
            if u != v {
                validate::check_order(layer, u, v)?;
            }
        }
        let odd_fu = odd_neighbors(g, fu);
        for &v in &odd_fu {
            if u != v {
                validate::check_order(layer, u, v)?;
            }
        }
        let in_info = (fu.contains(&u), odd_fu.contains(&u));
        let pu = planes[&u];
        let ok = match pu {
            Plane::XY => in_info == (false, true),
            Plane::YZ => in_info == (true, false),
            Plane::XZ => in_info == (true, true),
        };
        if !ok {
            return Err(InconsistentFlowPlane { node: u, plane: pu });
        }
    }
    Ok(())
}

/// Initializes the working matrix: the adjacency-restricted coefficient
/// matrix in `ocset x omiset`, plus one right-hand-side column per row of
/// `ocset`, keyed by that row's own plane.
fn init_work(
    work: &mut [FixedBitSet],
    g: &Graph,
    planes: &BTreeMap<usize, Plane>,
    ocset: &OrderedNodes,
    omiset: &OrderedNodes,
) {
    let ncols = omiset.len();
    let oc2i: HashMap<_, _> = ocset.iter().enumerate().map(|(i, &v)| (v, i)).collect();
    let omi2i: HashMap<_, _> = omiset.iter().enumerate().map(|(i, &v)| (v, i)).collect();
    for (i, &u) in ocset.iter().enumerate() {
        let gu = &g[u];
        let r = i;
        for &v in gu {
            if let Some(&c) = omi2i.get(&v) {
                work[r].insert(c);
            }
        }
        let ieq = i;
        let c = ncols + ieq;
        if let Plane::XY | Plane::XZ = planes[&u] {
            work[ieq].insert(c);
        }
        if let Plane::XY = planes[&u] {
            continue;
        }
        for &v in gu {
            if let Some(&r) = oc2i.get(&v) {
                work[r].toggle(c);
            }
        }
    }
}

/// Finds the maximally-delayed generalized flow, if one exists.
///
/// # Note
///
/// - Vertex indices are assumed dense, `0..g.len()`.
/// - `planes` must be defined exactly on `V \ O`; callers run
///   [`validate::check_planelike`] first.
#[tracing::instrument(skip_all)]
pub fn find(
    g: &Graph,
    iset: &Nodes,
    oset: &Nodes,
    planes: &BTreeMap<usize, Plane>,
) -> Option<(GFlow, Layer)> {
    let n = g.len();
    let vset: Nodes = (0..n).collect();
    let mut cset = Nodes::new();
    let mut ocset: OrderedNodes = (&vset - oset).into_iter().collect();
    let mut omiset: OrderedNodes = (oset - iset).into_iter().collect();
    let mut f = GFlow::with_capacity(ocset.len());
    let mut layer = vec![0_usize; n];
    let mut work = vec![FixedBitSet::new(); ocset.len().max(1)];
    let mut i2v = Vec::new();
    for l in 1_usize.. {
        cset.clear();
        if ocset.is_empty() || omiset.is_empty() {
            break;
        }
        tracing::debug!(layer = l, rows = ocset.len(), cols = omiset.len(), "gflow layer");
        let nrows = ocset.len();
        let ncols = omiset.len();
        let neqs = ocset.len();
        work.resize_with(nrows, FixedBitSet::new);
        zerofill(&mut work, ncols + neqs);
        init_work(&mut work, g, planes, &ocset, &omiset);
        let mut solver = GF2Solver::attach(work, neqs);
        let mut x = FixedBitSet::with_capacity(ncols);
        i2v.clear();
        i2v.extend(omiset.iter().copied());
        for (ieq, &u) in ocset.iter().enumerate() {
            if !solver.solve_in_place(&mut x, ieq) {
                continue;
            }
            cset.insert(u);
            let mut fu: Nodes = x.ones().map(|c| i2v[c]).collect();
            if let Plane::YZ | Plane::XZ = planes[&u] {
                fu.insert(u);
            }
            f.insert(u, fu);
            layer[u] = l;
        }
        work = solver.detach();
        if cset.is_empty() {
            break;
        }
        ocset.difference_with(&cset);
        omiset.union_with(cset.difference(iset));
    }
    if !ocset.is_empty() {
        tracing::debug!("no gflow");
        return None;
    }
    debug_assert!({
        let f_flatiter = f.iter().flat_map(|(i, fi)| std::iter::zip(std::iter::repeat(i), fi));
        validate::check_domain(f_flatiter, &vset, iset, oset).is_ok()
    });
    debug_assert!(validate::check_initial(&layer, oset, true).is_ok());
    debug_assert!(check_definition(&f, &layer, g, planes).is_ok());
    Some((f, layer))
}

/// Verifies a candidate gflow against the definition.
///
/// If `layer` is `None`, it is reconstructed with [`layer::infer`].
pub fn verify(
    f: &GFlow,
    layer: Option<&Layer>,
    g: &Graph,
    iset: &Nodes,
    oset: &Nodes,
    planes: &BTreeMap<usize, Plane>,
    ensure_optimal: bool,
) -> Result<(), FlowValidationError> {
    let n = g.len();
    let vset: Nodes = (0..n).collect();
    let f_flatiter = f.iter().flat_map(|(i, fi)| std::iter::zip(std::iter::repeat(i), fi));
    validate::check_domain(f_flatiter, &vset, iset, oset)?;
    validate::check_planelike(n, oset, planes)?;

    let anyflow: AnyFlow = f.clone();
    let owned_layer;
    let layer = match layer {
        Some(l) => l,
        None => {
            owned_layer = layer::infer(g, &anyflow, None)?;
            &owned_layer
        }
    };

    validate::check_initial(layer, oset, ensure_optimal)?;
    check_definition(f, layer, g, planes)?;
    if ensure_optimal {
        let canonical = layer::infer(g, &anyflow, None)?;
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

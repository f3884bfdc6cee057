//! Maximally-delayed causal flow algorithm (C3).
//!
//! Grounded on the teacher's `flow.rs`: a backward peel that claims, for
//! every not-yet-solved vertex `u`, the unique still-unclaimed output-side
//! candidate adjacent to it. Causal flow is the singleton-valued refinement
//! of gflow under the all-XY plane assignment.

use hashbrown::HashMap;

use crate::common::{Graph, Layer, Nodes};
use crate::error::FlowValidationError::{self, InconsistentFlowOrder};
use crate::internal::layer::{self, AnyFlow};
use crate::internal::utils::InPlaceSetOp;
use crate::internal::validate;

/// Causal flow: `f(u) = g(u)`, a single corrector vertex per domain vertex.
pub type Flow = HashMap<usize, usize>;

/// Checks the definition of causal flow:
///
/// 1. `u -> f(u)` (`f(u)` is strictly before `u`).
/// 2. `w` a neighbor of `f(u)` other than `u` itself is also strictly before `u`.
/// 3. `u` and `f(u)` are adjacent in `g`.
fn check_definition(f: &Flow, layer: &Layer, g: &Graph) -> Result<(), FlowValidationError> {
    for (&u, &fu) in f {
        validate::check_order(layer, u, fu)?;
        for &w in &g[fu] {
            if u != w {
                validate::check_order(layer, u, w)?;
            }
        }
        if !(g[fu].contains(&u) && g[u].contains(&fu)) {
            Err(InconsistentFlowOrder { edge: (u, fu) })?;
        }
    }
    Ok(())
}

/// Finds the maximally-delayed causal flow, if one exists.
///
/// # Note
///
/// - Vertex indices are assumed to be dense, `0..g.len()`.
/// - Arguments are **not** revalidated here; callers run
///   [`validate::check_graph`] first.
#[tracing::instrument(skip_all)]
pub fn find(g: &Graph, iset: &Nodes, oset: &Nodes) -> Option<(Flow, Layer)> {
    let n = g.len();
    let vset: Nodes = (0..n).collect();
    let mut solved = oset.clone();
    let mut cand = &solved - iset;
    let icset = &vset - iset;
    let ocset = &vset - oset;
    let mut f = Flow::with_capacity(ocset.len());
    let mut layer = vec![0_usize; n];
    // check[v] = neighbors of v that are still unsolved correction targets.
    let mut check: Vec<Nodes> = g.iter().map(|x| x & &ocset).collect();
    let mut claimed = Nodes::new();
    let mut next = Nodes::new();
    for l in 1_usize.. {
        tracing::debug!(layer = l, "causal flow peel");
        next.clear();
        claimed.clear();
        for &v in &cand {
            let checkv = &check[v];
            if checkv.len() != 1 {
                continue;
            }
            let u = *checkv.iter().next().expect("exactly one element");
            tracing::debug!(u, v, "claim");
            f.insert(u, v);
            layer[u] = l;
            next.insert(u);
            claimed.insert(v);
        }
        if next.is_empty() {
            break;
        }
        for &s in &next {
            for &w in &g[s] {
                check[w].remove(&s);
            }
        }
        solved.extend(&next);
        cand.difference_with(&claimed);
        cand.union_with(next.intersection(&icset));
    }
    if solved != vset {
        tracing::debug!("no causal flow");
        return None;
    }
    debug_assert!(validate::check_domain(f.iter(), &vset, iset, oset).is_ok());
    debug_assert!(validate::check_initial(&layer, oset, true).is_ok());
    debug_assert!(check_definition(&f, &layer, g).is_ok());
    Some((f, layer))
}

/// Verifies a candidate causal flow against the definition.
///
/// If `layer` is `None`, it is reconstructed with [`layer::infer`].
#[allow(clippy::needless_pass_by_value)]
pub fn verify(
    f: &Flow,
    layer: Option<&Layer>,
    g: &Graph,
    iset: &Nodes,
    oset: &Nodes,
    ensure_optimal: bool,
) -> Result<(), FlowValidationError> {
    let n = g.len();
    let vset: Nodes = (0..n).collect();
    validate::check_domain(f.iter(), &vset, iset, oset)?;

    let anyflow: AnyFlow = f.iter().map(|(&u, &v)| (u, Nodes::from([v]))).collect();
    let owned_layer;
    let layer = match layer {
        Some(l) => l,
        None => {
            owned_layer = layer::infer(g, &anyflow, None)?;
            &owned_layer
        }
    };

    validate::check_initial(layer, oset, ensure_optimal)?;
    check_definition(f, layer, g)?;
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

#[cfg(test)]
mod tests {
    use super::*;
    use crate::internal::test_utils::{self, TestCase};

    #[test]
    fn test_find_case0() {
        let TestCase { g, iset, oset } = test_utils::CASE0.clone();
        let flen = g.len() - oset.len();
        let (f, layer) = find(&g, &iset, &oset).unwrap();
        assert_eq!(f.len(), flen);
        assert_eq!(layer, vec![0, 0]);
        verify(&f, Some(&layer), &g, &iset, &oset, true).unwrap();
        verify(&f, None, &g, &iset, &oset, true).unwrap();
    }

    #[test_log::test]
    fn test_find_case1() {
        let TestCase { g, iset, oset } = test_utils::CASE1.clone();
        let (f, layer) = find(&g, &iset, &oset).unwrap();
        assert_eq!(f[&0], 1);
        assert_eq!(f[&1], 2);
        assert_eq!(f[&2], 3);
        assert_eq!(f[&3], 4);
        assert_eq!(layer, vec![4, 3, 2, 1, 0]);
        verify(&f, Some(&layer), &g, &iset, &oset, true).unwrap();
    }

    #[test]
    fn test_find_case2() {
        let TestCase { g, iset, oset } = test_utils::CASE2.clone();
        let (f, layer) = find(&g, &iset, &oset).unwrap();
        assert_eq!(f[&0], 2);
        assert_eq!(f[&1], 3);
        assert_eq!(f[&2], 4);
        assert_eq!(f[&3], 5);
        assert_eq!(layer, vec![2, 2, 1, 1, 0, 0]);
        verify(&f, Some(&layer), &g, &iset, &oset, true).unwrap();
    }

    #[test]
    fn test_find_no_flow_case3_through_8() {
        for case in [
            &*test_utils::CASE3,
            &*test_utils::CASE4,
            &*test_utils::CASE5,
            &*test_utils::CASE6,
            &*test_utils::CASE7,
            &*test_utils::CASE8,
        ] {
            assert!(find(&case.g, &case.iset, &case.oset).is_none());
        }
    }

    #[test]
    fn test_verify_rejects_bad_order() {
        let TestCase { g, iset, oset } = test_utils::CASE1.clone();
        let (f, mut layer) = find(&g, &iset, &oset).unwrap();
        layer[0] = 0;
        assert!(verify(&f, Some(&layer), &g, &iset, &oset, false).is_err());
    }
}

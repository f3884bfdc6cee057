//! Maximally-delayed causal flow, generalized flow, and Pauli flow for
//! open graphs arising in measurement-based quantum computing.
//!
//! The six entry points below are thin wrappers: they encode caller vertex
//! identities to dense indices with [`codec::IndexMap`], run the
//! corresponding [`internal`] algorithm, and decode the result (or error)
//! back. The core algorithms themselves never see a caller's vertex type.

pub mod codec;
pub mod common;
pub mod error;
mod internal;

use std::collections::BTreeMap;
use std::hash::Hash;

use hashbrown::{HashMap, HashSet};

use crate::codec::IndexMap;
use crate::common::{Nodes, PPlane, Plane};
use crate::error::Error;
use crate::internal::validate;

/// Adjacency map supplied by the caller: every vertex in `V` must appear as
/// a key, even if its neighbor set is empty.
pub type Adj<V> = HashMap<V, HashSet<V>>;
/// Causal flow, keyed by caller vertex identity.
pub type Flow<V> = HashMap<V, V>;
/// Generalized flow, keyed by caller vertex identity.
pub type GFlow<V> = HashMap<V, HashSet<V>>;
/// Pauli flow, keyed by caller vertex identity.
pub type PFlow<V> = HashMap<V, HashSet<V>>;
/// Layer assignment, keyed by caller vertex identity.
pub type Layer<V> = HashMap<V, usize>;

fn build_codec<V: Eq + Hash + Clone + Ord>(adj: &Adj<V>) -> IndexMap<V> {
    IndexMap::new(adj.keys().cloned())
}

/// Checks that every identity in `candidate` is a key of `vset`, raising
/// [`Error::InvalidInput`] naming the offending vertex otherwise.
///
/// Mirrors the original's `check_graph`/`check_planelike`, which validate
/// `iset`/`oset`/measurement-map domains against raw vertex identities
/// *before* any index is assigned — the codec silently drops identities
/// outside its domain, so this check has to happen first or such a mistake
/// would pass through unnoticed instead of raising an error.
fn check_vertex_subset<'a, V: Eq + Hash + Clone + Ord + std::fmt::Debug>(
    vset: &Adj<V>,
    candidate: impl IntoIterator<Item = &'a V>,
    label: &str,
) -> Result<(), Error<V>>
where
    V: 'a,
{
    for v in candidate {
        if !vset.contains_key(v) {
            return Err(Error::InvalidInput {
                reason: format!("{label} contains node {v:?} not in the graph"),
            });
        }
    }
    Ok(())
}

fn build_graph<V: Eq + Hash + Clone + Ord>(adj: &Adj<V>, codec: &IndexMap<V>) -> common::Graph {
    let mut g = vec![Nodes::new(); codec.len()];
    for (v, neighbors) in adj {
        let Some(vi) = codec.encode(v) else { continue };
        for w in neighbors {
            if let Some(wi) = codec.encode(w) {
                g[vi].insert(wi);
            }
        }
    }
    g
}

fn encode_planelike<V: Eq + Hash + Clone + Ord, P: Copy>(
    codec: &IndexMap<V>,
    planelike: &HashMap<V, P>,
) -> BTreeMap<usize, P> {
    planelike
        .iter()
        .filter_map(|(v, &p)| codec.encode(v).map(|vi| (vi, p)))
        .collect()
}

fn decode_layer<V: Eq + Hash + Clone + Ord>(codec: &IndexMap<V>, layer: &common::Layer) -> Layer<V> {
    layer
        .iter()
        .enumerate()
        .map(|(i, &l)| (codec.decode(i), l))
        .collect()
}

fn encode_layer<V: Eq + Hash + Clone + Ord>(
    codec: &IndexMap<V>,
    layer: &Layer<V>,
) -> Option<common::Layer> {
    let mut out = vec![usize::MAX; codec.len()];
    for (v, &l) in layer {
        out[codec.encode(v)?] = l;
    }
    Some(out)
}

/// Finds the maximally-delayed causal flow, if one exists.
///
/// # Errors
///
/// If `(adj, iset, oset)` fails the validation preconditions (empty graph,
/// self-loop, non-undirected adjacency, or `iset`/`oset` not a subset of
/// `V`).
pub fn flow_find<V: Eq + Hash + Clone + Ord + std::fmt::Debug>(
    adj: &Adj<V>,
    iset: &HashSet<V>,
    oset: &HashSet<V>,
) -> Result<Option<(Flow<V>, Layer<V>)>, Error<V>> {
    check_vertex_subset(adj, iset, "iset")?;
    check_vertex_subset(adj, oset, "oset")?;
    let codec = build_codec(adj);
    let g = build_graph(adj, &codec);
    let iset_ = codec.encode_set(iset);
    let oset_ = codec.encode_set(oset);
    validate::check_graph(&g, &iset_, &oset_)
        .map_err(|e| Error::from_internal(e, |i| codec.decode(i)))?;
    Ok(internal::flow::find(&g, &iset_, &oset_).map(|(f, layer)| {
        let f = f
            .into_iter()
            .map(|(u, v)| (codec.decode(u), codec.decode(v)))
            .collect();
        (f, decode_layer(&codec, &layer))
    }))
}

/// Verifies a candidate causal flow against the definition.
///
/// If `layer` is omitted, it is reconstructed internally.
///
/// # Errors
///
/// If the graph fails validation, or the candidate flow fails the causal
/// flow definition.
pub fn flow_verify<V: Eq + Hash + Clone + Ord + std::fmt::Debug>(
    f: &Flow<V>,
    layer: Option<&Layer<V>>,
    adj: &Adj<V>,
    iset: &HashSet<V>,
    oset: &HashSet<V>,
    ensure_optimal: bool,
) -> Result<(), Error<V>> {
    check_vertex_subset(adj, iset, "iset")?;
    check_vertex_subset(adj, oset, "oset")?;
    let codec = build_codec(adj);
    let g = build_graph(adj, &codec);
    let iset_ = codec.encode_set(iset);
    let oset_ = codec.encode_set(oset);
    validate::check_graph(&g, &iset_, &oset_)
        .map_err(|e| Error::from_internal(e, |i| codec.decode(i)))?;
    let f_: internal::flow::Flow = f
        .iter()
        .filter_map(|(u, v)| Some((codec.encode(u)?, codec.encode(v)?)))
        .collect();
    let layer_ = layer.and_then(|l| encode_layer(&codec, l));
    internal::flow::verify(&f_, layer_.as_ref(), &g, &iset_, &oset_, ensure_optimal)
        .map_err(|e| Error::from_internal(e, |i| codec.decode(i)))
}

/// Finds the maximally-delayed generalized flow, if one exists.
///
/// # Errors
///
/// If the graph fails validation, or `planes` is not defined on exactly
/// `V \ O`.
pub fn gflow_find<V: Eq + Hash + Clone + Ord + std::fmt::Debug>(
    adj: &Adj<V>,
    iset: &HashSet<V>,
    oset: &HashSet<V>,
    planes: &HashMap<V, Plane>,
) -> Result<Option<(GFlow<V>, Layer<V>)>, Error<V>> {
    check_vertex_subset(adj, iset, "iset")?;
    check_vertex_subset(adj, oset, "oset")?;
    check_vertex_subset(adj, planes.keys(), "measurement plane map")?;
    let codec = build_codec(adj);
    let g = build_graph(adj, &codec);
    let iset_ = codec.encode_set(iset);
    let oset_ = codec.encode_set(oset);
    validate::check_graph(&g, &iset_, &oset_)
        .map_err(|e| Error::from_internal(e, |i| codec.decode(i)))?;
    let planes_ = encode_planelike(&codec, planes);
    validate::check_planelike(g.len(), &oset_, &planes_)
        .map_err(|e| Error::from_internal(e, |i| codec.decode(i)))?;
    Ok(internal::gflow::find(&g, &iset_, &oset_, &planes_).map(|(f, layer)| {
        let f = f
            .into_iter()
            .map(|(u, fu)| {
                (
                    codec.decode(u),
                    fu.into_iter().map(|v| codec.decode(v)).collect(),
                )
            })
            .collect();
        (f, decode_layer(&codec, &layer))
    }))
}

/// Verifies a candidate generalized flow against the definition.
///
/// # Errors
///
/// If the graph or `planes` fail validation, or the candidate fails the
/// gflow definition.
pub fn gflow_verify<V: Eq + Hash + Clone + Ord + std::fmt::Debug>(
    f: &GFlow<V>,
    layer: Option<&Layer<V>>,
    adj: &Adj<V>,
    iset: &HashSet<V>,
    oset: &HashSet<V>,
    planes: &HashMap<V, Plane>,
    ensure_optimal: bool,
) -> Result<(), Error<V>> {
    check_vertex_subset(adj, iset, "iset")?;
    check_vertex_subset(adj, oset, "oset")?;
    check_vertex_subset(adj, planes.keys(), "measurement plane map")?;
    let codec = build_codec(adj);
    let g = build_graph(adj, &codec);
    let iset_ = codec.encode_set(iset);
    let oset_ = codec.encode_set(oset);
    validate::check_graph(&g, &iset_, &oset_)
        .map_err(|e| Error::from_internal(e, |i| codec.decode(i)))?;
    let planes_ = encode_planelike(&codec, planes);
    let f_: internal::gflow::GFlow = f
        .iter()
        .filter_map(|(u, fu)| {
            let ui = codec.encode(u)?;
            let fui: Nodes = fu.iter().filter_map(|v| codec.encode(v)).collect();
            Some((ui, fui))
        })
        .collect();
    let layer_ = layer.and_then(|l| encode_layer(&codec, l));
    internal::gflow::verify(&f_, layer_.as_ref(), &g, &iset_, &oset_, &planes_, ensure_optimal)
        .map_err(|e| Error::from_internal(e, |i| codec.decode(i)))
}

/// Finds the maximally-delayed Pauli flow, if one exists.
///
/// If `pplanes` contains no genuine Pauli (`X`/`Y`/`Z`) measurement, emits a
/// `tracing` advisory recommending [`gflow_find`] instead — that call path
/// does strictly less work for the same result in that case.
///
/// # Errors
///
/// If the graph fails validation, or `pplanes` is not defined on exactly
/// `V \ O`.
pub fn pflow_find<V: Eq + Hash + Clone + Ord + std::fmt::Debug>(
    adj: &Adj<V>,
    iset: &HashSet<V>,
    oset: &HashSet<V>,
    pplanes: &HashMap<V, PPlane>,
) -> Result<Option<(PFlow<V>, Layer<V>)>, Error<V>> {
    check_vertex_subset(adj, iset, "iset")?;
    check_vertex_subset(adj, oset, "oset")?;
    check_vertex_subset(adj, pplanes.keys(), "measurement plane map")?;
    let codec = build_codec(adj);
    let g = build_graph(adj, &codec);
    let iset_ = codec.encode_set(iset);
    let oset_ = codec.encode_set(oset);
    validate::check_graph(&g, &iset_, &oset_)
        .map_err(|e| Error::from_internal(e, |i| codec.decode(i)))?;
    let pplanes_ = encode_planelike(&codec, pplanes);
    validate::check_planelike(g.len(), &oset_, &pplanes_)
        .map_err(|e| Error::from_internal(e, |i| codec.decode(i)))?;
    if validate::all_non_pauli(&pplanes_) {
        tracing::warn!("no Pauli measurement found; gflow_find is equivalent and faster here");
    }
    Ok(internal::pflow::find(&g, &iset_, &oset_, &pplanes_).map(|(f, layer)| {
        let f = f
            .into_iter()
            .map(|(u, fu)| {
                (
                    codec.decode(u),
                    fu.into_iter().map(|v| codec.decode(v)).collect(),
                )
            })
            .collect();
        (f, decode_layer(&codec, &layer))
    }))
}

/// Verifies a candidate Pauli flow against the definition.
///
/// # Errors
///
/// If the graph or `pplanes` fail validation, or the candidate fails the
/// pflow definition.
pub fn pflow_verify<V: Eq + Hash + Clone + Ord + std::fmt::Debug>(
    f: &PFlow<V>,
    layer: Option<&Layer<V>>,
    adj: &Adj<V>,
    iset: &HashSet<V>,
    oset: &HashSet<V>,
    pplanes: &HashMap<V, PPlane>,
    ensure_optimal: bool,
) -> Result<(), Error<V>> {
    check_vertex_subset(adj, iset, "iset")?;
    check_vertex_subset(adj, oset, "oset")?;
    check_vertex_subset(adj, pplanes.keys(), "measurement plane map")?;
    let codec = build_codec(adj);
    let g = build_graph(adj, &codec);
    let iset_ = codec.encode_set(iset);
    let oset_ = codec.encode_set(oset);
    validate::check_graph(&g, &iset_, &oset_)
        .map_err(|e| Error::from_internal(e, |i| codec.decode(i)))?;
    let pplanes_ = encode_planelike(&codec, pplanes);
    let f_: internal::pflow::PFlow = f
        .iter()
        .filter_map(|(u, fu)| {
            let ui = codec.encode(u)?;
            let fui: Nodes = fu.iter().filter_map(|v| codec.encode(v)).collect();
            Some((ui, fui))
        })
        .collect();
    let layer_ = layer.and_then(|l| encode_layer(&codec, l));
    internal::pflow::verify(&f_, layer_.as_ref(), &g, &iset_, &oset_, &pplanes_, ensure_optimal)
        .map_err(|e| Error::from_internal(e, |i| codec.decode(i)))
}

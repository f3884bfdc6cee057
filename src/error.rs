//! Error taxonomy for flow/gflow/pflow validation.
//!
//! [`FlowValidationError`] is the internal (dense-index) error type produced
//! by [`crate::internal::validate`] and the finders/verifiers. It is never
//! returned across the public API directly: [`Error`] rewrites the offending
//! indices back to caller vertex identities via [`crate::codec::IndexMap`]
//! before leaving the crate, so every error a caller sees names a vertex they
//! recognize.

use std::fmt;

use thiserror::Error as ThisError;

use crate::common::{PPlane, Plane};

/// Internal error taxonomy, indexed over dense `0..n` vertex indices.
#[derive(Debug, Clone, PartialEq, Eq, ThisError)]
pub enum FlowValidationError {
    /// Type/shape error on the arguments themselves: empty graph, self-loop,
    /// `iset`/`oset` not a subset of `V`, or a measurement map whose domain
    /// is not exactly `V \ O`.
    #[error("invalid input: {reason}")]
    InvalidInput { reason: String },

    /// `f` is defined at a vertex outside `V \ O`.
    #[error("node {node} is not in the valid flow domain V \\ O")]
    InvalidFlowDomain { node: usize },

    /// `f(u)` contains a vertex outside `V \ I` (or, for causal flow, a
    /// non-neighbor of `u`).
    #[error("f({node}) contains a vertex outside V \\ I")]
    InvalidFlowCodomain { node: usize },

    /// Measurement is absent or inadmissible at `node`.
    #[error("node {node} has no admissible measurement specification")]
    InvalidMeasurementSpec { node: usize },

    /// The gflow correction axiom failed at `node` under its declared plane.
    #[error("correction axiom failed at node {node} under plane {plane:?}")]
    InconsistentFlowPlane { node: usize, plane: Plane },

    /// The pflow correction axiom failed at `node` under its declared Pauli
    /// spec.
    #[error("correction axiom failed at node {node} under measurement {pplane:?}")]
    InconsistentFlowPPlane { node: usize, pplane: PPlane },

    /// A required order edge contradicts the supplied layer.
    #[error("order constraint violated: node {} must strictly precede node {}", edge.0, edge.1)]
    InconsistentFlowOrder { edge: (usize, usize) },

    /// A layer-0 vertex lies outside the output set (checked only when
    /// `ensure_optimal` is requested).
    #[error("zero-layer node {node} lies outside the output set")]
    ExcessiveZeroLayer { node: usize },

    /// A vertex inside the output set was assigned a non-zero layer.
    #[error("node {node} has non-zero layer {layer} despite being an output node")]
    ExcessiveNonZeroLayer { node: usize, layer: usize },
}

/// Public error type, carrying original caller vertex identities instead of
/// dense indices.
#[derive(Debug, ThisError)]
pub enum Error<V: fmt::Debug> {
    #[error("invalid input: {reason}")]
    InvalidInput { reason: String },

    #[error("node {node:?} is not in the valid flow domain V \\ O")]
    InvalidFlowDomain { node: V },

    #[error("f({node:?}) contains a vertex outside V \\ I")]
    InvalidFlowCodomain { node: V },

    #[error("node {node:?} has no admissible measurement specification")]
    InvalidMeasurementSpec { node: V },

    #[error("correction axiom failed at node {node:?} under plane {plane:?}")]
    InconsistentFlowPlane { node: V, plane: Plane },

    #[error("correction axiom failed at node {node:?} under measurement {pplane:?}")]
    InconsistentFlowPPlane { node: V, pplane: PPlane },

    #[error("order constraint violated: node {:?} must strictly precede node {:?}", edge.0, edge.1)]
    InconsistentFlowOrder { edge: (V, V) },

    #[error("zero-layer node {node:?} lies outside the output set")]
    ExcessiveZeroLayer { node: V },

    #[error("node {node:?} has non-zero layer {layer} despite being an output node")]
    ExcessiveNonZeroLayer { node: V, layer: usize },
}

impl<V: fmt::Debug> Error<V> {
    /// Rewrites an internal error's dense indices back to caller identities.
    pub(crate) fn from_internal(err: FlowValidationError, decode: impl Fn(usize) -> V) -> Self {
        match err {
            FlowValidationError::InvalidInput { reason } => Error::InvalidInput { reason },
            FlowValidationError::InvalidFlowDomain { node } => Error::InvalidFlowDomain {
                node: decode(node),
            },
            FlowValidationError::InvalidFlowCodomain { node } => Error::InvalidFlowCodomain {
                node: decode(node),
            },
            FlowValidationError::InvalidMeasurementSpec { node } => {
                Error::InvalidMeasurementSpec {
                    node: decode(node),
                }
            }
            FlowValidationError::InconsistentFlowPlane { node, plane } => {
                Error::InconsistentFlowPlane {
                    node: decode(node),
                    plane,
                }
            }
            FlowValidationError::InconsistentFlowPPlane { node, pplane } => {
                Error::InconsistentFlowPPlane {
                    node: decode(node),
                    pplane,
                }
            }
            FlowValidationError::InconsistentFlowOrder { edge } => Error::InconsistentFlowOrder {
                edge: (decode(edge.0), decode(edge.1)),
            },
            FlowValidationError::ExcessiveZeroLayer { node } => Error::ExcessiveZeroLayer {
                node: decode(node),
            },
            FlowValidationError::ExcessiveNonZeroLayer { node, layer } => {
                Error::ExcessiveNonZeroLayer {
                    node: decode(node),
                    layer,
                }
            }
        }
    }
}

use std::fmt;

use crate::types::NodeId;

#[derive(Debug, Clone, PartialEq)]
pub enum Error {
    /// The requested node is not part of the graph.
    UnknownNode(NodeId),

    /// A node label could not be resolved to a node index.
    UnknownAsset(String),

    /// A retrace touched a node that already belongs to a reported cycle.
    SeenNode(NodeId),

    /// The candidate store of the given node has no unconsumed entries left.
    ExhaustedCandidates(NodeId),

    /// Incompatible search options or a graph that cannot serve the requested mode.
    Configuration(String),

    /// Two consecutive path nodes are not joined by an edge.
    MissingEdge(NodeId, NodeId),

    /// Depth-aware evaluation hit an edge without a depth attribute.
    MissingDepth(NodeId, NodeId),

    /// Trade instructions were requested for an edge without market metadata.
    MissingMarket(NodeId, NodeId),

    /// The cycle cannot be connected to the source with finite weight.
    UnreachableFromSource(NodeId),

    /// The reconstructed cycle does not have a negative total weight.
    NonNegativeCycle(f64),

    /// Guaranteeing profit would require repeating the cycle more often than allowed.
    RepeatLimitExceeded(f64),

    /// Indicates a structural inconsistency found during graph processing or validation.
    InvalidGraph,
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Error::UnknownNode(n) => write!(f, "Node {} is not in the graph.", n),

            Error::UnknownAsset(label) => write!(f, "Asset '{}' is not in the graph.", label),

            Error::SeenNode(n) => write!(f, "Node {} already belongs to a reported cycle.", n),

            Error::ExhaustedCandidates(n) => {
                write!(f, "No predecessor candidates left for node {}.", n)
            }

            Error::Configuration(msg) => write!(f, "Invalid finder configuration: {}", msg),

            Error::MissingEdge(u, v) => write!(f, "No edge between {} and {}.", u, v),

            Error::MissingDepth(u, v) => write!(f, "Edge {} -> {} has no depth.", u, v),

            Error::MissingMarket(u, v) => {
                write!(f, "Edge {} -> {} has no market metadata.", u, v)
            }

            Error::UnreachableFromSource(n) => {
                write!(f, "Cycle through node {} cannot be reached from the source.", n)
            }

            Error::NonNegativeCycle(w) => {
                write!(f, "Reconstructed cycle has non-negative weight {}.", w)
            }

            Error::RepeatLimitExceeded(scalar) => write!(
                f,
                "Cycle would need {} repetitions to outweigh its connecting paths.",
                scalar
            ),

            Error::InvalidGraph => write!(f, "Graph structure is invalid or inconsistent."),
        }
    }
}

impl std::error::Error for Error {}

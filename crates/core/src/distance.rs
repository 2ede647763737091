use tracing::debug;

use super::candidates::PredecessorTable;
use super::csr::GraphCSR;
use common::error::Error;
use common::types::NodeId;

/// Per-run Bellman-Ford state, kept in both directions around the source.
///
/// `distance_to[v]` is the best known weight of a walk `source -> v` and
/// `distance_from[u]` the best known weight of a walk `u -> source`. Every
/// relaxation is also recorded in `predecessor_to` / `predecessor_from`, which keep
/// the full candidate history needed to retrace and splice paths later.
#[derive(Debug, Clone, Default)]
pub struct DistanceTracker {
    pub distance_to: Vec<f64>,
    pub distance_from: Vec<f64>,
    pub predecessor_to: PredecessorTable,
    pub predecessor_from: PredecessorTable,
}

impl DistanceTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Resets all state for a run from `source`.
    ///
    /// # Errors
    /// Returns `Error::UnknownNode` if `source` is not a node of `graph`.
    pub fn initialize(&mut self, graph: &GraphCSR, source: NodeId) -> Result<(), Error> {
        if !graph.contains_node(source) {
            return Err(Error::UnknownNode(source));
        }

        let n = graph.num_nodes;
        self.distance_to = vec![f64::INFINITY; n];
        self.distance_from = vec![f64::INFINITY; n];
        self.predecessor_to = PredecessorTable::with_nodes(n);
        self.predecessor_from = PredecessorTable::with_nodes(n);

        self.distance_to[source] = 0.0;
        self.distance_from[source] = 0.0;

        Ok(())
    }

    /// Drops every per-run structure.
    pub fn clear(&mut self) {
        *self = Self::default();
    }

    /// Relaxes the edge stored at CSR index `edge_idx` in both directions.
    ///
    /// The candidate stores are fed whether or not the distance improved; later
    /// passes may offer equal or better predecessors the retracer needs.
    pub fn relax(&mut self, graph: &GraphCSR, edge_idx: usize) {
        let u = graph.edge_source_by_index[edge_idx];
        let v = graph.edge_targets[edge_idx];
        let weight = graph.edge_weights[edge_idx];

        let via_u = self.distance_to[u] + weight;
        if via_u < self.distance_to[v] {
            self.distance_to[v] = via_u;
        }
        self.predecessor_to.add(v, u, via_u);

        let via_v = self.distance_from[v] + weight;
        if via_v < self.distance_from[u] {
            self.distance_from[u] = via_v;
        }
        self.predecessor_from.add(u, v, via_v);
    }

    /// Runs the `|V| - 1` full relaxation passes of Bellman-Ford.
    ///
    /// There is no early exit: every pass records its candidates even when no
    /// distance changes.
    pub fn relax_all(&mut self, graph: &GraphCSR) {
        let passes = graph.num_nodes.saturating_sub(1);
        for pass in 0..passes {
            for edge_idx in 0..graph.num_edges() {
                self.relax(graph, edge_idx);
            }
            debug!(pass, "relaxation pass complete");
        }
    }

    /// True when the edge can still be relaxed, i.e. it witnesses a negative cycle
    /// reachable from its head.
    pub fn is_relaxable(&self, graph: &GraphCSR, edge_idx: usize) -> bool {
        let u = graph.edge_source_by_index[edge_idx];
        let v = graph.edge_targets[edge_idx];
        self.distance_to[u] + graph.edge_weights[edge_idx] < self.distance_to[v]
    }

    /// Rewinds the cursor of every candidate store in both directions.
    pub fn reset_predecessor_iteration(&mut self) {
        self.predecessor_to.reset();
        self.predecessor_from.reset();
    }
}

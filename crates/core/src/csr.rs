use std::collections::HashMap;
use std::ops::Range;

use common::error::Error;
use common::numeric_kernel::rate_to_weight;
use common::types::{Edge, EdgeAttributes, MarketEdge, MarketInfo, NodeId};

/// Immutable market graph snapshot in Compressed Sparse Row (CSR) format.
///
/// CSR format stores outgoing edges of each node contiguously in memory:
/// - `node_pointers[u]..node_pointers[u+1]` → edges from node `u`
/// - `edge_targets[i]` -> target node of edge `i`
/// - `edge_weights[i]` -> `-ln(effective rate)` of edge `i`
/// - `edge_depths[i]` -> `-ln(max volume)` of edge `i`, when known
/// - `edge_markets[i]` -> market metadata of edge `i`, when known
/// - `edge_source_by_index[i]` -> source node of edge `i`
///
/// Edge indices double as the iteration order of the finder: edges are grouped by
/// source node and keep their insertion order inside each group.
#[derive(Debug, Clone)]
pub struct GraphCSR {
    pub name: Option<String>,
    pub num_nodes: usize,
    pub labels: Vec<String>,
    label_index: HashMap<String, NodeId>,
    pub node_pointers: Vec<usize>,
    pub edge_targets: Vec<NodeId>,
    pub edge_weights: Vec<f64>,
    pub edge_depths: Vec<Option<f64>>,
    pub edge_markets: Vec<Option<MarketInfo>>,
    pub edge_source_by_index: Vec<NodeId>,
}

struct CsrArrays {
    node_pointers: Vec<usize>,
    edge_targets: Vec<NodeId>,
    edge_weights: Vec<f64>,
    edge_depths: Vec<Option<f64>>,
    edge_markets: Vec<Option<MarketInfo>>,
    edge_source_by_index: Vec<NodeId>,
}

impl GraphCSR {
    /// Creates a new CSR graph from a list of edges `(src, dst, rate)`.
    ///
    /// Each rate is transformed into the weight `-ln(rate)`. Nodes are labelled
    /// with their index.
    pub fn from_edges(num_nodes: usize, edges: &[Edge]) -> Result<Self, Error> {
        let market_edges = edges
            .iter()
            .map(|&(from, to, rate)| MarketEdge {
                from,
                to,
                attributes: EdgeAttributes::new(rate_to_weight(rate)),
            })
            .collect();

        Self::from_market_edges(None, index_labels(num_nodes), market_edges)
    }

    /// Creates a new CSR graph from `(src, dst, weight)` triples whose weights are
    /// already in negative-log form.
    pub fn from_weights(num_nodes: usize, edges: &[Edge]) -> Result<Self, Error> {
        let market_edges = edges
            .iter()
            .map(|&(from, to, weight)| MarketEdge {
                from,
                to,
                attributes: EdgeAttributes::new(weight),
            })
            .collect();

        Self::from_market_edges(None, index_labels(num_nodes), market_edges)
    }

    /// Creates a graph from labelled nodes and fully attributed edges.
    ///
    /// Repeated `(src, dst)` pairs keep the position of their first occurrence and the
    /// attributes of their last one.
    ///
    /// # Errors
    /// Returns `Error::UnknownNode` if an edge endpoint is not below `labels.len()`.
    pub fn from_market_edges(
        name: Option<String>,
        labels: Vec<String>,
        edges: Vec<MarketEdge>,
    ) -> Result<Self, Error> {
        let num_nodes = labels.len();

        if let Some(edge) = edges.iter().find(|e| e.from >= num_nodes || e.to >= num_nodes) {
            let bad = if edge.from >= num_nodes { edge.from } else { edge.to };
            return Err(Error::UnknownNode(bad));
        }

        let edges = keep_latest(edges);
        let arrays = Self::build_csr_from_edges(num_nodes, edges);

        let label_index = labels
            .iter()
            .enumerate()
            .map(|(i, label)| (label.clone(), i))
            .collect();

        Ok(Self {
            name,
            num_nodes,
            labels,
            label_index,
            node_pointers: arrays.node_pointers,
            edge_targets: arrays.edge_targets,
            edge_weights: arrays.edge_weights,
            edge_depths: arrays.edge_depths,
            edge_markets: arrays.edge_markets,
            edge_source_by_index: arrays.edge_source_by_index,
        })
    }

    /// Builds the CSR arrays with the two-pass counting technique.
    ///
    /// The first pass counts out-degrees into `node_pointers`, the prefix sum turns
    /// them into offsets, and the second pass drops every edge into the next free slot
    /// of its source. Placement is stable, so edges sharing a source keep their input order.
    fn build_csr_from_edges(num_nodes: usize, edges: Vec<MarketEdge>) -> CsrArrays {
        let m = edges.len();
        let mut node_pointers = vec![0; num_nodes + 1];

        for edge in &edges {
            node_pointers[edge.from + 1] += 1;
        }

        for i in 1..=num_nodes {
            node_pointers[i] += node_pointers[i - 1];
        }

        let mut edge_targets = vec![0; m];
        let mut edge_weights = vec![0.0; m];
        let mut edge_depths = vec![None; m];
        let mut edge_markets = vec![None; m];
        let mut edge_source_by_index = vec![0; m];

        let mut cursor = node_pointers.clone();

        for edge in edges {
            let pos = cursor[edge.from];
            edge_targets[pos] = edge.to;
            edge_weights[pos] = edge.attributes.weight;
            edge_depths[pos] = edge.attributes.depth;
            edge_markets[pos] = edge.attributes.market;
            edge_source_by_index[pos] = edge.from;

            cursor[edge.from] += 1;
        }

        CsrArrays {
            node_pointers,
            edge_targets,
            edge_weights,
            edge_depths,
            edge_markets,
            edge_source_by_index,
        }
    }

    pub fn num_edges(&self) -> usize {
        self.edge_targets.len()
    }

    pub fn contains_node(&self, node: NodeId) -> bool {
        node < self.num_nodes
    }

    /// Resolves an asset label to its node index.
    pub fn node_index(&self, label: &str) -> Result<NodeId, Error> {
        self.label_index
            .get(label)
            .copied()
            .ok_or_else(|| Error::UnknownAsset(label.to_string()))
    }

    pub fn label(&self, node: NodeId) -> Option<&str> {
        self.labels.get(node).map(String::as_str)
    }

    /// Labels of every node on `path`, falling back to the index for unlabelled nodes.
    pub fn path_labels(&self, path: &[NodeId]) -> Vec<String> {
        path.iter()
            .map(|&n| self.label(n).map_or_else(|| n.to_string(), str::to_string))
            .collect()
    }

    /// CSR index range of the outgoing edges of `node`.
    pub fn edge_range(&self, node: NodeId) -> Range<usize> {
        self.node_pointers[node]..self.node_pointers[node + 1]
    }

    /// CSR index of the edge `from -> to`, found by scanning the out-edges of `from`.
    pub fn edge_index(&self, from: NodeId, to: NodeId) -> Option<usize> {
        if !self.contains_node(from) {
            return None;
        }
        self.edge_range(from).find(|&i| self.edge_targets[i] == to)
    }

    fn require_edge(&self, from: NodeId, to: NodeId) -> Result<usize, Error> {
        self.edge_index(from, to).ok_or(Error::MissingEdge(from, to))
    }

    pub fn weight(&self, from: NodeId, to: NodeId) -> Result<f64, Error> {
        Ok(self.edge_weights[self.require_edge(from, to)?])
    }

    pub fn depth(&self, from: NodeId, to: NodeId) -> Result<f64, Error> {
        self.edge_depths[self.require_edge(from, to)?].ok_or(Error::MissingDepth(from, to))
    }

    pub fn market(&self, from: NodeId, to: NodeId) -> Result<&MarketInfo, Error> {
        self.edge_markets[self.require_edge(from, to)?]
            .as_ref()
            .ok_or(Error::MissingMarket(from, to))
    }

    /// True when every edge carries a depth, which the depth-aware finder requires.
    pub fn has_depths(&self) -> bool {
        self.edge_depths.iter().all(Option::is_some)
    }

    /// Sum of the edge weights along consecutive nodes of `path`.
    pub fn path_weight(&self, path: &[NodeId]) -> Result<f64, Error> {
        path.windows(2)
            .map(|hop| self.weight(hop[0], hop[1]))
            .sum()
    }
}

fn index_labels(num_nodes: usize) -> Vec<String> {
    (0..num_nodes).map(|i| i.to_string()).collect()
}

fn keep_latest(edges: Vec<MarketEdge>) -> Vec<MarketEdge> {
    let mut position: HashMap<(NodeId, NodeId), usize> = HashMap::with_capacity(edges.len());
    let mut unique: Vec<MarketEdge> = Vec::with_capacity(edges.len());

    for edge in edges {
        match position.get(&(edge.from, edge.to)) {
            Some(&i) => unique[i] = edge,
            None => {
                position.insert((edge.from, edge.to), unique.len());
                unique.push(edge);
            }
        }
    }

    unique
}

/// Incrementally assembles a [`GraphCSR`] from asset labels.
///
/// Nodes are numbered in the order their labels are first seen.
#[derive(Debug, Default)]
pub struct GraphBuilder {
    name: Option<String>,
    labels: Vec<String>,
    label_index: HashMap<String, NodeId>,
    edges: Vec<MarketEdge>,
}

impl GraphBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            ..Self::default()
        }
    }

    /// Returns the index of `label`, registering it when it is new.
    pub fn add_node(&mut self, label: &str) -> NodeId {
        if let Some(&id) = self.label_index.get(label) {
            return id;
        }
        let id = self.labels.len();
        self.labels.push(label.to_string());
        self.label_index.insert(label.to_string(), id);
        id
    }

    pub fn add_edge(&mut self, from: &str, to: &str, attributes: EdgeAttributes) -> &mut Self {
        let from = self.add_node(from);
        let to = self.add_node(to);
        self.edges.push(MarketEdge {
            from,
            to,
            attributes,
        });
        self
    }

    pub fn num_nodes(&self) -> usize {
        self.labels.len()
    }

    pub fn build(self) -> Result<GraphCSR, Error> {
        GraphCSR::from_market_edges(self.name, self.labels, self.edges)
    }
}

use std::collections::HashSet;
use std::iter::FusedIterator;

use tracing::{Span, debug, info, info_span};

use super::csr::GraphCSR;
use super::distance::DistanceTracker;
use super::retrace::Retracer;
use super::traits::GraphSolver;
use common::error::Error;
use common::types::{NegativeCycle, NodeId};

/// Selects how witness edges are turned into cycles.
///
/// `Weight` reports plain or source-anchored cycles; `Depth` additionally tracks the
/// largest volume the edge depths allow around the cycle.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum FinderMode {
    #[default]
    Weight,
    Depth,
}

/// Flags controlling a single search.
///
/// - `loop_from_source`: rewrite each cycle into a path that starts and ends at the source.
/// - `ensure_profit`: repeat the cycle until the anchored path as a whole is negative.
///   Only meaningful together with `loop_from_source`.
/// - `unique_paths`: never report two cycles that share a node.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SearchOptions {
    pub loop_from_source: bool,
    pub ensure_profit: bool,
    pub unique_paths: bool,
}

impl SearchOptions {
    pub fn unique() -> Self {
        Self {
            unique_paths: true,
            ..Self::default()
        }
    }

    pub fn anchored(ensure_profit: bool) -> Self {
        Self {
            loop_from_source: true,
            ensure_profit,
            ..Self::default()
        }
    }

    pub fn with_unique_paths(mut self, unique_paths: bool) -> Self {
        self.unique_paths = unique_paths;
        self
    }

    /// Rejects flag combinations the given mode cannot serve.
    pub fn validate(&self, mode: FinderMode, graph: &GraphCSR) -> Result<(), Error> {
        if self.ensure_profit && !self.loop_from_source {
            return Err(Error::Configuration(
                "ensure_profit requires loop_from_source".to_string(),
            ));
        }

        if mode == FinderMode::Depth {
            if self.loop_from_source || self.ensure_profit {
                return Err(Error::Configuration(
                    "the depth finder supports neither loop_from_source nor ensure_profit"
                        .to_string(),
                ));
            }
            if !graph.has_depths() {
                return Err(Error::Configuration(
                    "the depth finder needs a depth on every edge".to_string(),
                ));
            }
        }

        Ok(())
    }
}

/// Bellman-Ford negative cycle finder over one immutable graph snapshot.
///
/// Unlike the textbook algorithm it keeps every predecessor it was ever offered,
/// which lets it reconstruct several distinct cycles from one run, anchor them to
/// the source and back off when a reconstruction runs into a dead end.
///
/// A finder is single-use per run: [`NegativeCycleFinder::run`] resets all state and
/// the returned iterator borrows the finder mutably until it is dropped.
#[derive(Debug)]
pub struct NegativeCycleFinder<'g> {
    graph: &'g GraphCSR,
    mode: FinderMode,
    tracker: DistanceTracker,
    seen_nodes: HashSet<NodeId>,
    invocation: u64,
}

impl<'g> NegativeCycleFinder<'g> {
    pub fn new(graph: &'g GraphCSR) -> Self {
        Self::with_mode(graph, FinderMode::Weight)
    }

    /// A finder that reports the depth-limited volume along with every cycle.
    pub fn with_depth(graph: &'g GraphCSR) -> Self {
        Self::with_mode(graph, FinderMode::Depth)
    }

    pub fn with_mode(graph: &'g GraphCSR, mode: FinderMode) -> Self {
        Self {
            graph,
            mode,
            tracker: DistanceTracker::new(),
            seen_nodes: HashSet::new(),
            invocation: 0,
        }
    }

    pub fn graph(&self) -> &'g GraphCSR {
        self.graph
    }

    pub fn mode(&self) -> FinderMode {
        self.mode
    }

    pub fn tracker(&self) -> &DistanceTracker {
        &self.tracker
    }

    pub fn seen_nodes(&self) -> &HashSet<NodeId> {
        &self.seen_nodes
    }

    /// Discards distances, candidate stores and seen nodes; keeps the graph.
    pub fn reset_all_but_graph(&mut self) {
        self.tracker.clear();
        self.seen_nodes.clear();
    }

    /// Prepares fresh per-run state for a search from `source`.
    pub fn initialize(&mut self, source: NodeId) -> Result<(), Error> {
        self.seen_nodes.clear();
        self.tracker.initialize(self.graph, source)
    }

    /// Runs the relaxation passes from `source` and returns the lazy sequence of cycles.
    ///
    /// # Errors
    /// - `Error::Configuration` if `options` do not fit the finder mode or the graph.
    /// - `Error::UnknownNode` if `source` is not in the graph.
    ///
    /// Both are raised before any relaxation work.
    pub fn run(
        &mut self,
        source: NodeId,
        options: SearchOptions,
    ) -> Result<NegativeCycles<'_, 'g>, Error> {
        options.validate(self.mode, self.graph)?;
        if !self.graph.contains_node(source) {
            return Err(Error::UnknownNode(source));
        }

        self.invocation += 1;
        let span = info_span!(
            "bellman_ford",
            exchange = self.graph.name.as_deref().unwrap_or(""),
            invocation = self.invocation,
            source,
        );

        span.in_scope(|| -> Result<(), Error> {
            info!(
                nodes = self.graph.num_nodes,
                edges = self.graph.num_edges(),
                mode = ?self.mode,
                "Running bellman_ford"
            );
            self.initialize(source)?;
            self.tracker.relax_all(self.graph);
            debug!("Finished relaxing edges");
            Ok(())
        })?;

        Ok(NegativeCycles {
            finder: self,
            source,
            options,
            next_edge: 0,
            span,
        })
    }

    /// CSR indices of the edges that are still relaxable after the last run.
    pub fn witness_edges(&self) -> impl Iterator<Item = usize> + '_ {
        (0..self.graph.num_edges()).filter(|&i| self.tracker.is_relaxable(self.graph, i))
    }

    /// Reconstructs the cycle behind the witness node `start`.
    ///
    /// Every candidate store is rewound before this returns, so repeated calls from
    /// the same state give the same answer (seen nodes aside).
    pub fn retrace(
        &mut self,
        start: NodeId,
        source: NodeId,
        options: SearchOptions,
    ) -> Result<NegativeCycle, Error> {
        options.validate(self.mode, self.graph)?;
        self.retrace_witness(start, source, options)
    }

    fn retrace_witness(
        &mut self,
        start: NodeId,
        source: NodeId,
        options: SearchOptions,
    ) -> Result<NegativeCycle, Error> {
        Retracer::new(self.graph, &mut self.tracker, &mut self.seen_nodes)
            .retrace(self.mode, start, source, options)
    }

    pub fn reset_predecessor_iteration(&mut self) {
        self.tracker.reset_predecessor_iteration();
    }
}

/// Lazy, finite, forward-only sequence of cycles produced by one run.
///
/// Each call to `next` resumes the scan of witness edges where the previous one
/// stopped. Retraces that fail are skipped, so the sequence never yields an error.
/// Dropping it early is the way to cancel a search.
#[derive(Debug)]
pub struct NegativeCycles<'f, 'g> {
    finder: &'f mut NegativeCycleFinder<'g>,
    source: NodeId,
    options: SearchOptions,
    next_edge: usize,
    span: Span,
}

impl Iterator for NegativeCycles<'_, '_> {
    type Item = NegativeCycle;

    fn next(&mut self) -> Option<NegativeCycle> {
        let _guard = self.span.enter();
        let graph = self.finder.graph;

        while self.next_edge < graph.num_edges() {
            let edge_idx = self.next_edge;
            self.next_edge += 1;

            if !self.finder.tracker.is_relaxable(graph, edge_idx) {
                continue;
            }

            let start = graph.edge_targets[edge_idx];
            match self.finder.retrace_witness(start, self.source, self.options) {
                Ok(cycle) => {
                    info!(start, hops = cycle.hop_count(), "Retraced loop");
                    return Some(cycle);
                }
                Err(Error::SeenNode(node)) => {
                    debug!(start, node, "Retrace overlaps a reported cycle, skipping");
                }
                Err(err) => {
                    debug!(start, error = %err, "Retrace abandoned");
                }
            }
        }

        None
    }
}

impl FusedIterator for NegativeCycles<'_, '_> {}

/// Runs a weight-mode search and collects every cycle it yields.
pub fn bellman_ford(
    graph: &GraphCSR,
    source: NodeId,
    options: SearchOptions,
) -> Result<Vec<NegativeCycle>, Error> {
    let mut finder = NegativeCycleFinder::new(graph);
    let cycles: Vec<NegativeCycle> = finder.run(source, options)?.collect();
    Ok(cycles)
}

/// [`GraphSolver`] backed by [`NegativeCycleFinder`], in either mode.
#[derive(Debug, Clone, Copy, Default)]
pub struct BellmanFordSolver {
    pub mode: FinderMode,
}

impl BellmanFordSolver {
    pub fn new(mode: FinderMode) -> Self {
        Self { mode }
    }
}

impl GraphSolver for BellmanFordSolver {
    fn find_negative_cycles(
        &self,
        graph: &GraphCSR,
        source: NodeId,
        options: SearchOptions,
        limit: Option<usize>,
    ) -> Result<Vec<NegativeCycle>, Error> {
        let mut finder = NegativeCycleFinder::with_mode(graph, self.mode);
        let cycles: Vec<NegativeCycle> = finder
            .run(source, options)?
            .take(limit.unwrap_or(usize::MAX))
            .collect();
        Ok(cycles)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use common::types::EdgeAttributes;

    use crate::csr::GraphBuilder;

    /// Source 0 feeds the cycle 1 -> 2 -> 3 -> 1 of weight -0.3.
    fn triangle_with_entry() -> GraphCSR {
        GraphCSR::from_weights(4, &[(0, 1, 0.1), (1, 2, -0.1), (2, 3, -0.1), (3, 1, -0.1)])
            .unwrap()
    }

    /// Like `triangle_with_entry`, plus a way back from 1 to the source.
    fn triangle_with_return() -> GraphCSR {
        GraphCSR::from_weights(
            4,
            &[(0, 1, 0.5), (1, 2, -0.1), (1, 0, 0.5), (2, 3, -0.1), (3, 1, -0.1)],
        )
        .unwrap()
    }

    fn assert_valid_walk(graph: &GraphCSR, path: &[NodeId]) {
        assert!(path.len() > 1);
        for hop in path.windows(2) {
            assert!(
                graph.edge_index(hop[0], hop[1]).is_some(),
                "{:?} is not an edge",
                hop
            );
        }
    }

    fn sorted_nodes(cycle: &NegativeCycle) -> Vec<NodeId> {
        let mut nodes = cycle.path[1..].to_vec();
        nodes.sort_unstable();
        nodes
    }

    #[test]
    fn no_negative_cycle_yields_nothing() {
        let graph = GraphCSR::from_edges(4, &[(0, 1, 1.0), (1, 2, 0.5), (2, 0, 1.5), (2, 3, 0.9)])
            .unwrap();
        let mut finder = NegativeCycleFinder::new(&graph);

        assert_eq!(finder.run(0, SearchOptions::unique()).unwrap().count(), 0);
        assert_eq!(finder.witness_edges().count(), 0);
    }

    #[test]
    fn zero_weight_cycle_is_not_reported() {
        let graph = GraphCSR::from_weights(2, &[(0, 1, 0.5), (1, 0, -0.5)]).unwrap();
        assert!(bellman_ford(&graph, 0, SearchOptions::default()).unwrap().is_empty());
    }

    #[test]
    fn single_triangle_found_once_when_unique() {
        let graph = triangle_with_entry();
        let cycles = bellman_ford(&graph, 0, SearchOptions::unique()).unwrap();

        assert_eq!(cycles.len(), 1);
        let cycle = &cycles[0];
        assert!(cycle.is_closed());
        assert_eq!(sorted_nodes(cycle), vec![1, 2, 3]);
        assert_eq!(cycle.path, vec![2, 3, 1, 2]);
        assert_valid_walk(&graph, &cycle.path);
        assert!(graph.path_weight(&cycle.path).unwrap() < 0.0);
        assert_eq!(cycle.minimum, None);
    }

    #[test]
    fn disjoint_cycles_are_all_reported() {
        let graph = GraphCSR::from_weights(
            5,
            &[
                (0, 1, 0.1),
                (0, 3, 0.1),
                (1, 2, -0.1),
                (2, 1, -0.1),
                (3, 4, -0.2),
                (4, 3, -0.2),
            ],
        )
        .unwrap();

        let cycles = bellman_ford(&graph, 0, SearchOptions::unique()).unwrap();

        assert_eq!(cycles.len(), 2);
        assert_eq!(cycles[0].path, vec![2, 1, 2]);
        assert_eq!(cycles[1].path, vec![4, 3, 4]);
    }

    #[test]
    fn dropping_the_sequence_stops_retracing() {
        let graph = GraphCSR::from_weights(
            5,
            &[
                (0, 1, 0.1),
                (0, 3, 0.1),
                (1, 2, -0.1),
                (2, 1, -0.1),
                (3, 4, -0.2),
                (4, 3, -0.2),
            ],
        )
        .unwrap();

        let mut finder = NegativeCycleFinder::new(&graph);
        let first: Vec<NegativeCycle> =
            finder.run(0, SearchOptions::unique()).unwrap().take(1).collect();

        assert_eq!(first.len(), 1);
        assert_eq!(first[0].path, vec![2, 1, 2]);
        // The 3 <-> 4 witness was never retraced.
        assert_eq!(finder.seen_nodes(), &HashSet::from([1, 2]));

        let limited = BellmanFordSolver::default()
            .find_negative_cycles(&graph, 0, SearchOptions::unique(), Some(1))
            .unwrap();
        assert_eq!(limited, first);
    }

    #[test]
    fn unknown_source_is_rejected() {
        let graph = triangle_with_entry();
        let mut finder = NegativeCycleFinder::new(&graph);

        assert_eq!(
            finder.run(9, SearchOptions::default()).unwrap_err(),
            Error::UnknownNode(9)
        );
    }

    #[test]
    fn ensure_profit_requires_loop_from_source() {
        let graph = triangle_with_entry();
        let options = SearchOptions {
            ensure_profit: true,
            ..SearchOptions::default()
        };

        assert!(matches!(
            bellman_ford(&graph, 0, options),
            Err(Error::Configuration(_))
        ));
    }

    #[test]
    fn depth_finder_rejects_anchored_search_before_relaxing() {
        let mut builder = GraphBuilder::new();
        builder
            .add_edge("A", "B", EdgeAttributes::new(-0.1).with_depth(-1.0))
            .add_edge("B", "A", EdgeAttributes::new(-0.1).with_depth(-1.0));
        let graph = builder.build().unwrap();
        let mut finder = NegativeCycleFinder::with_depth(&graph);

        assert!(matches!(
            finder.run(0, SearchOptions::anchored(false)),
            Err(Error::Configuration(_))
        ));
        assert!(finder.tracker().distance_to.is_empty());
    }

    #[test]
    fn depth_finder_requires_depths() {
        let graph = triangle_with_entry();
        let mut finder = NegativeCycleFinder::with_depth(&graph);

        assert!(matches!(
            finder.run(0, SearchOptions::default()),
            Err(Error::Configuration(_))
        ));
    }

    #[test]
    fn retrace_is_idempotent_after_reset() {
        let graph = triangle_with_entry();
        let mut finder = NegativeCycleFinder::new(&graph);
        let options = SearchOptions::default();
        drop(finder.run(0, options).unwrap());

        let witness = finder.witness_edges().next().unwrap();
        let start = graph.edge_targets[witness];

        let first = finder.retrace(start, 0, options).unwrap();
        finder.reset_predecessor_iteration();
        let second = finder.retrace(start, 0, options).unwrap();

        assert_eq!(first, second);
    }

    #[test]
    fn anchored_cycle_is_spliced_to_source() {
        let graph = triangle_with_return();
        let mut finder = NegativeCycleFinder::new(&graph);
        let path = finder
            .run(0, SearchOptions::anchored(false))
            .unwrap()
            .next()
            .unwrap()
            .path;

        assert_eq!(path, vec![0, 1, 2, 3, 1, 0]);
        assert_valid_walk(&graph, &path);
    }

    #[test]
    fn ensure_profit_repeats_cycle_until_path_is_negative() {
        let graph = triangle_with_return();
        let mut finder = NegativeCycleFinder::new(&graph);
        let path = finder
            .run(0, SearchOptions::anchored(true))
            .unwrap()
            .next()
            .unwrap()
            .path;

        assert_eq!(path.first(), Some(&0));
        assert_eq!(path.last(), Some(&0));
        assert_valid_walk(&graph, &path);
        // 0.5 in, 0.5 out, -0.3 per lap: five laps are needed.
        assert_eq!(path.len(), 2 + 5 * 3 + 1);
        assert!(graph.path_weight(&path).unwrap() < 0.0);
    }

    #[test]
    fn ensure_profit_rotates_cycle_through_source() {
        let graph = triangle_with_return();
        let mut finder = NegativeCycleFinder::new(&graph);
        let path = finder
            .run(1, SearchOptions::anchored(true))
            .unwrap()
            .next()
            .unwrap()
            .path;

        assert_eq!(path, vec![1, 2, 3, 1]);
        assert!(graph.path_weight(&path).unwrap() < 0.0);
    }

    #[test]
    fn depth_finder_reports_minimum_volume() {
        let mut builder = GraphBuilder::named("depth-test");
        builder
            .add_edge("A", "B", EdgeAttributes::new(-0.1).with_depth(-(10.0f64.ln())))
            .add_edge("B", "C", EdgeAttributes::new(-0.1).with_depth(-(5.0f64.ln())))
            .add_edge("C", "A", EdgeAttributes::new(-0.1).with_depth(-(8.0f64.ln())));
        let graph = builder.build().unwrap();

        let mut finder = NegativeCycleFinder::with_depth(&graph);
        let cycles: Vec<NegativeCycle> = finder.run(0, SearchOptions::unique()).unwrap().collect();

        assert_eq!(cycles.len(), 1);
        let cycle = &cycles[0];
        let minimum = cycle.minimum.unwrap();
        assert_valid_walk(&graph, &cycle.path);
        for hop in cycle.path.windows(2) {
            assert!(minimum >= graph.depth(hop[0], hop[1]).unwrap());
        }
        assert!(cycle.max_volume().unwrap() <= 5.0 + 1e-9);
    }

    #[test]
    fn depth_finder_caps_volume_at_tied_hop() {
        // B -> A can carry e^1 units; its weight plus depth ties the A -> B minimum.
        let mut builder = GraphBuilder::new();
        builder
            .add_edge("A", "B", EdgeAttributes::new(-0.5).with_depth(-1.5))
            .add_edge("B", "A", EdgeAttributes::new(-0.5).with_depth(-1.0));
        let graph = builder.build().unwrap();

        let mut finder = NegativeCycleFinder::with_depth(&graph);
        let cycles: Vec<NegativeCycle> = finder.run(0, SearchOptions::default()).unwrap().collect();

        assert_eq!(cycles.len(), 1);
        assert_eq!(cycles[0].path, vec![1, 0, 1]);
        assert_eq!(cycles[0].minimum, Some(-1.0));
        assert!((cycles[0].max_volume().unwrap() - 1.0f64.exp()).abs() < 1e-12);
    }

    #[test]
    fn solver_collects_cycles() {
        let graph = triangle_with_entry();
        let solver = BellmanFordSolver::default();

        let cycles = solver
            .find_negative_cycles(&graph, 0, SearchOptions::unique(), None)
            .unwrap();
        assert_eq!(cycles.len(), 1);
    }

    #[test]
    fn reset_all_but_graph_clears_state() {
        let graph = triangle_with_entry();
        let mut finder = NegativeCycleFinder::new(&graph);
        assert_eq!(finder.run(0, SearchOptions::unique()).unwrap().count(), 1);
        assert!(!finder.seen_nodes().is_empty());

        finder.reset_all_but_graph();
        assert!(finder.seen_nodes().is_empty());
        assert!(finder.tracker().distance_to.is_empty());
    }
}

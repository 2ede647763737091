use std::collections::{HashSet, VecDeque};

use tracing::debug;

use super::csr::GraphCSR;
use super::distance::DistanceTracker;
use super::finder::{FinderMode, SearchOptions};
use common::error::Error;
use common::numeric_kernel::repeat_scalar;
use common::types::{NegativeCycle, NodeId};

/// Upper bound on how often a cycle may be repeated to outweigh its connecting paths.
pub const MAX_CYCLE_REPEATS: f64 = 10_000.0;

/// Rebuilds cycles from the candidate stores filled during relaxation.
///
/// Borrows the per-run state of a finder for the duration of one retrace.
pub struct Retracer<'a> {
    graph: &'a GraphCSR,
    tracker: &'a mut DistanceTracker,
    seen_nodes: &'a mut HashSet<NodeId>,
}

impl<'a> Retracer<'a> {
    pub fn new(
        graph: &'a GraphCSR,
        tracker: &'a mut DistanceTracker,
        seen_nodes: &'a mut HashSet<NodeId>,
    ) -> Self {
        Self {
            graph,
            tracker,
            seen_nodes,
        }
    }

    /// Reconstructs the cycle behind the witness node `start` in the given mode.
    ///
    /// Candidate stores are rewound afterwards whether or not the retrace succeeded.
    pub fn retrace(
        mut self,
        mode: FinderMode,
        start: NodeId,
        source: NodeId,
        options: SearchOptions,
    ) -> Result<NegativeCycle, Error> {
        debug!(start, "Retracing loop");

        let result = match mode {
            FinderMode::Weight if options.loop_from_source => self
                .anchored(start, source, options.ensure_profit, options.unique_paths)
                .map(NegativeCycle::new),
            FinderMode::Weight => self
                .walk_to_cycle(start, options.unique_paths)
                .map(NegativeCycle::new),
            FinderMode::Depth => self.with_minimum(start, options.unique_paths),
        };

        self.tracker.reset_predecessor_iteration();
        result
    }

    /// Marks `node` as part of a reported cycle.
    ///
    /// # Errors
    /// Returns `Error::SeenNode` when uniqueness is requested and `node` was already marked.
    fn visit(&mut self, node: NodeId, unique: bool) -> Result<(), Error> {
        if unique && self.seen_nodes.contains(&node) {
            return Err(Error::SeenNode(node));
        }
        self.seen_nodes.insert(node);
        Ok(())
    }

    /// Walks backward from `start` by consuming the best remaining predecessor of each
    /// node until a node repeats. Returns the cycle in trading order, closed at the
    /// repeated node.
    fn walk_to_cycle(&mut self, start: NodeId, unique: bool) -> Result<Vec<NodeId>, Error> {
        self.visit(start, unique)?;

        // trail[i + 1] precedes trail[i]
        let mut trail = vec![start];
        let mut head = start;

        loop {
            let next = self.tracker.predecessor_to.pop(head)?.node;

            if let Some(pos) = trail.iter().position(|&n| n == next) {
                let mut cycle = Vec::with_capacity(trail.len() - pos + 1);
                cycle.push(next);
                cycle.extend(trail[pos..].iter().rev());
                return Ok(cycle);
            }

            self.visit(next, unique)?;
            trail.push(next);
            head = next;
        }
    }

    /// Plain retrace that also tracks how much volume the cycle can carry.
    ///
    /// The cycle is walked backward from its last hop. Each earlier hop either becomes
    /// the new bottleneck (its own depth) or shrinks the running minimum by its weight,
    /// floored at its depth.
    fn with_minimum(&mut self, start: NodeId, unique: bool) -> Result<NegativeCycle, Error> {
        let cycle = self.walk_to_cycle(start, unique)?;

        let mut hops = cycle.windows(2).rev();
        let Some(last) = hops.next() else {
            return Err(Error::InvalidGraph);
        };
        let mut minimum = self.graph.depth(last[0], last[1])?;

        for hop in hops {
            let weight = self.graph.weight(hop[0], hop[1])?;
            let depth = self.graph.depth(hop[0], hop[1])?;

            if weight + depth > minimum {
                minimum = depth;
            } else {
                minimum = (minimum - weight).max(depth);
            }
        }

        debug!(start, minimum, "Retraced loop with depth");
        Ok(NegativeCycle::with_minimum(cycle, minimum))
    }

    /// Source-anchored retrace.
    ///
    /// Follows the best predecessor of each node without consuming it and closes the
    /// cycle once a hop would be walked a second time. The cycle is then spliced
    /// between a path from `source` and a path back to `source`. With `ensure_profit`
    /// the cycle is repeated often enough for the whole path to be negative.
    fn anchored(
        &mut self,
        start: NodeId,
        source: NodeId,
        ensure_profit: bool,
        unique: bool,
    ) -> Result<Vec<NodeId>, Error> {
        self.visit(start, unique)?;

        let mut walk = VecDeque::from([start]);
        let cycle: Vec<NodeId> = loop {
            let head = walk[0];
            let next = self.tracker.predecessor_to.peek(head)?.node;

            if let Some(pos) = hop_position(&walk, next, head) {
                // Close at the earlier walk of `next -> head`, now shifted by one.
                walk.push_front(next);
                walk.truncate(pos + 2);
                break walk.into();
            }

            if !walk.contains(&next) {
                self.visit(next, unique)?;
            }
            walk.push_front(next);
        };

        let mut cycle = cycle;
        let mut repeats = 1;

        if ensure_profit {
            if let Some(idx) = cycle.iter().position(|&n| n == source) {
                cycle = rotate_closed(&cycle, idx);
            }

            let head = cycle[0];
            let tail = cycle[cycle.len() - 1];
            let return_path_weight =
                self.tracker.distance_to[head] + self.tracker.distance_from[tail];

            if return_path_weight > 0.0 {
                if !return_path_weight.is_finite() {
                    return Err(Error::UnreachableFromSource(head));
                }
                let loop_weight = self.graph.path_weight(&cycle)?;
                repeats = repeat_count(return_path_weight, loop_weight)?;
            }
        }

        let mut path: VecDeque<NodeId> = repeat_cycle(&cycle, repeats).into();
        let prefix_len = self.splice_prefix(&mut path, source)?;
        let suffix_len = self.splice_suffix(&mut path, source)?;
        let mut path: Vec<NodeId> = path.into();

        if ensure_profit {
            let total = self.graph.path_weight(&path)?;
            if total >= 0.0 {
                let loop_weight = self.graph.path_weight(&cycle)?;
                let connector = total - repeats as f64 * loop_weight;
                let repeats = repeat_count(connector, loop_weight)?;
                debug!(start, repeats, "Connecting paths outweigh the cycle, repeating it");

                let mut rebuilt = path[..prefix_len].to_vec();
                rebuilt.extend(repeat_cycle(&cycle, repeats));
                rebuilt.extend_from_slice(&path[path.len() - suffix_len..]);
                path = rebuilt;
            }
        }

        Ok(path)
    }

    /// Prepends a path from `source` to the head of `path`.
    ///
    /// Candidates whose hop is already on the path are skipped. When a node runs out of
    /// candidates it is dropped and its successor tries its next candidate instead.
    /// Returns the number of nodes added.
    ///
    /// # Errors
    /// Returns `Error::ExhaustedCandidates` if the search would have to unwind into the
    /// cycle itself.
    fn splice_prefix(
        &mut self,
        path: &mut VecDeque<NodeId>,
        source: NodeId,
    ) -> Result<usize, Error> {
        let mut added = 0;

        while path[0] != source {
            let head = path[0];

            match self.tracker.predecessor_to.pop(head) {
                Ok(candidate) if candidate.priority.is_finite() => {
                    if contains_hop(path, candidate.node, head) {
                        continue;
                    }
                    path.push_front(candidate.node);
                    added += 1;
                }
                // Infinite priorities come last and were recorded before the tail was
                // reachable, so the store is effectively exhausted.
                Ok(_) | Err(_) => {
                    if added == 0 {
                        return Err(Error::ExhaustedCandidates(head));
                    }
                    path.pop_front();
                    added -= 1;
                }
            }
        }

        Ok(added)
    }

    /// Appends a path from the tail of `path` back to `source`, mirroring
    /// [`Retracer::splice_prefix`] on the backward candidate stores.
    fn splice_suffix(
        &mut self,
        path: &mut VecDeque<NodeId>,
        source: NodeId,
    ) -> Result<usize, Error> {
        let mut added = 0;

        while let Some(&tail) = path.back() {
            if tail == source {
                break;
            }

            match self.tracker.predecessor_from.pop(tail) {
                Ok(candidate) if candidate.priority.is_finite() => {
                    if contains_hop(path, tail, candidate.node) {
                        continue;
                    }
                    path.push_back(candidate.node);
                    added += 1;
                }
                Ok(_) | Err(_) => {
                    if added == 0 {
                        return Err(Error::ExhaustedCandidates(tail));
                    }
                    path.pop_back();
                    added -= 1;
                }
            }
        }

        Ok(added)
    }
}

/// Repetitions of a negative cycle needed to outweigh `connector`.
fn repeat_count(connector: f64, loop_weight: f64) -> Result<usize, Error> {
    if loop_weight >= 0.0 {
        return Err(Error::NonNegativeCycle(loop_weight));
    }

    let scalar = repeat_scalar(connector, loop_weight);
    if scalar.is_nan() || scalar > MAX_CYCLE_REPEATS {
        return Err(Error::RepeatLimitExceeded(scalar));
    }

    Ok(scalar as usize)
}

fn contains_hop(path: &VecDeque<NodeId>, from: NodeId, to: NodeId) -> bool {
    hop_position(path, from, to).is_some()
}

/// Index of the first `from` on `path` that is immediately followed by `to`.
fn hop_position(path: &VecDeque<NodeId>, from: NodeId, to: NodeId) -> Option<usize> {
    path.iter()
        .zip(path.iter().skip(1))
        .position(|(&a, &b)| a == from && b == to)
}

/// Rotates a closed cycle so that it starts and ends at `cycle[idx]`.
fn rotate_closed(cycle: &[NodeId], idx: usize) -> Vec<NodeId> {
    let body = &cycle[..cycle.len() - 1];
    let idx = idx % body.len();

    let mut rotated = Vec::with_capacity(cycle.len());
    rotated.extend_from_slice(&body[idx..]);
    rotated.extend_from_slice(&body[..idx]);
    rotated.push(body[idx]);
    rotated
}

/// Walks a closed cycle `times` times, e.g. `[a, b, a]` twice is `[a, b, a, b, a]`.
fn repeat_cycle(cycle: &[NodeId], times: usize) -> Vec<NodeId> {
    let body = &cycle[..cycle.len() - 1];

    let mut repeated = Vec::with_capacity(body.len() * times + 1);
    for _ in 0..times {
        repeated.extend_from_slice(body);
    }
    repeated.push(cycle[0]);
    repeated
}

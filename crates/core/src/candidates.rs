use common::error::Error;
use common::types::NodeId;

/// A predecessor recorded during relaxation, together with the distance it implies.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Candidate {
    pub priority: f64,
    pub node: NodeId,
}

/// Ordered history of the predecessors offered to one node, read through a cursor.
///
/// Entries are read ascending by priority, ties in insertion order, and are never
/// removed. `pop` only moves the cursor past an entry, so after a `reset` the whole
/// history can be walked again, which is what lets the retracer back off to a
/// worse candidate.
///
/// Every `add` happens during relaxation, before the first read, so entries are
/// appended as they come and sorted once when the store is first read.
#[derive(Debug, Clone, Default)]
pub struct CandidateStore {
    entries: Vec<Candidate>,
    cursor: usize,
    sorted: bool,
}

impl CandidateStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records `node` with the implied distance `priority` in amortized O(1).
    pub fn add(&mut self, node: NodeId, priority: f64) {
        self.entries.push(Candidate { priority, node });
        self.sorted = false;
    }

    fn ensure_sorted(&mut self) {
        if !self.sorted {
            // Stable, so equal priorities stay in insertion order.
            self.entries.sort_by(|a, b| a.priority.total_cmp(&b.priority));
            self.sorted = true;
        }
    }

    /// Best unconsumed candidate, without moving the cursor.
    pub fn peek(&mut self) -> Option<&Candidate> {
        self.ensure_sorted();
        self.entries.get(self.cursor)
    }

    /// Consumes the candidate under the cursor.
    pub fn pop(&mut self) -> Option<Candidate> {
        self.ensure_sorted();
        let candidate = self.entries.get(self.cursor).copied()?;
        self.cursor += 1;
        Some(candidate)
    }

    pub fn is_empty(&self) -> bool {
        self.cursor >= self.entries.len()
    }

    pub fn reset(&mut self) {
        self.cursor = 0;
    }

    /// Total number of recorded entries, consumed or not.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn remaining(&self) -> usize {
        self.entries.len().saturating_sub(self.cursor)
    }
}

/// The candidate stores of every node in one direction of the relaxation.
#[derive(Debug, Clone, Default)]
pub struct PredecessorTable {
    stores: Vec<CandidateStore>,
}

impl PredecessorTable {
    pub fn with_nodes(num_nodes: usize) -> Self {
        Self {
            stores: vec![CandidateStore::new(); num_nodes],
        }
    }

    pub fn add(&mut self, node: NodeId, predecessor: NodeId, priority: f64) {
        self.stores[node].add(predecessor, priority);
    }

    /// # Errors
    /// Returns `Error::ExhaustedCandidates` when the store of `node` has been fully consumed.
    pub fn peek(&mut self, node: NodeId) -> Result<Candidate, Error> {
        self.stores[node]
            .peek()
            .copied()
            .ok_or(Error::ExhaustedCandidates(node))
    }

    /// # Errors
    /// Returns `Error::ExhaustedCandidates` when the store of `node` has been fully consumed.
    pub fn pop(&mut self, node: NodeId) -> Result<Candidate, Error> {
        self.stores[node]
            .pop()
            .ok_or(Error::ExhaustedCandidates(node))
    }

    pub fn is_empty(&self, node: NodeId) -> bool {
        self.stores[node].is_empty()
    }

    pub fn store(&self, node: NodeId) -> &CandidateStore {
        &self.stores[node]
    }

    /// Rewinds every store to its best candidate.
    pub fn reset(&mut self) {
        self.stores.iter_mut().for_each(CandidateStore::reset);
    }
}

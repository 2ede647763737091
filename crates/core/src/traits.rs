use super::csr::GraphCSR;
use super::finder::SearchOptions;
use common::{
    error::Error,
    types::{NegativeCycle, NodeId},
};

/// Trait for graph solvers capable of detecting negative cycles.
pub trait GraphSolver {
    /// Collects the negative cycles reachable from `source`, stopping after `limit`
    /// cycles when one is given.
    ///
    /// Returns `Ok(cycles)`, possibly empty, or `Err(e)` when the search could not
    /// start (unknown source, unsupported options).
    fn find_negative_cycles(
        &self,
        graph: &GraphCSR,
        source: NodeId,
        options: SearchOptions,
        limit: Option<usize>,
    ) -> Result<Vec<NegativeCycle>, Error>;
}

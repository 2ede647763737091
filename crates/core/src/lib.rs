pub mod candidates;
pub mod csr;
pub mod distance;
pub mod finder;
pub mod profit;
pub mod retrace;
pub mod traits;

pub use csr::{GraphBuilder, GraphCSR};
pub use finder::{
    BellmanFordSolver, FinderMode, NegativeCycleFinder, NegativeCycles, SearchOptions,
    bellman_ford,
};
pub use profit::ProfitEvaluator;
pub use traits::GraphSolver;

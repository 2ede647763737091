use tracing::{debug, info};

use super::csr::GraphCSR;
use common::error::Error;
use common::numeric_kernel::weight_to_rate;
use common::types::{NodeId, TradeInstruction, TradeType};

/// Replays a path against a graph snapshot to compute its return.
///
/// Ratios are multiplicative: a result above `1.0` means the path ends with more of
/// its first asset than it started with.
#[derive(Debug, Clone, Copy)]
pub struct ProfitEvaluator<'g> {
    graph: &'g GraphCSR,
    starting_amount: f64,
}

impl<'g> ProfitEvaluator<'g> {
    pub fn new(graph: &'g GraphCSR) -> Self {
        Self {
            graph,
            starting_amount: 1.0,
        }
    }

    /// Amount of the first asset put into the path. Only matters when depths cap the
    /// volume of a hop.
    pub fn with_starting_amount(mut self, starting_amount: f64) -> Self {
        self.starting_amount = starting_amount;
        self
    }

    pub fn starting_amount(&self) -> f64 {
        self.starting_amount
    }

    /// Compounded rate of `path`, ignoring depths.
    ///
    /// # Errors
    /// Returns `Error::MissingEdge` if two consecutive nodes are not connected.
    pub fn profit_ratio(&self, path: &[NodeId]) -> Result<f64, Error> {
        info!(hops = path.len().saturating_sub(1), "Calculating profit ratio");

        let mut ratio = self.starting_amount;
        for hop in path.windows(2) {
            ratio *= weight_to_rate(self.graph.weight(hop[0], hop[1])?);
        }

        Ok(ratio / self.starting_amount)
    }

    /// Compounded rate of `path` when each hop can move at most `exp(-depth)` of its
    /// source asset.
    ///
    /// # Errors
    /// Returns `Error::MissingEdge` or `Error::MissingDepth` for a hop the graph cannot price.
    pub fn profit_ratio_with_depth(&self, path: &[NodeId]) -> Result<f64, Error> {
        self.replay(path, false).map(|(ratio, _)| ratio)
    }

    /// Depth-limited replay that also emits one trade instruction per hop.
    ///
    /// Instruction volumes are in the base currency of each market, so BUY volumes are
    /// converted from the quote currency the hop starts in.
    ///
    /// # Errors
    /// Returns `Error::MissingMarket` on a hop without market metadata, in addition to
    /// the errors of [`ProfitEvaluator::profit_ratio_with_depth`].
    pub fn evaluate_with_trades(
        &self,
        path: &[NodeId],
    ) -> Result<(f64, Vec<TradeInstruction>), Error> {
        self.replay(path, true)
    }

    fn replay(
        &self,
        path: &[NodeId],
        gather_trades: bool,
    ) -> Result<(f64, Vec<TradeInstruction>), Error> {
        info!(hops = path.len().saturating_sub(1), "Calculating profit ratio with depth");

        let mut trades = Vec::new();
        let mut ratio = self.starting_amount;

        for hop in path.windows(2) {
            let (from, to) = (hop[0], hop[1]);
            let rate_with_fee = weight_to_rate(self.graph.weight(from, to)?);
            let mut volume = ratio.min(weight_to_rate(self.graph.depth(from, to)?));
            ratio = volume * rate_with_fee;

            if gather_trades {
                let market = self.graph.market(from, to)?;
                if market.trade_type == TradeType::Buy {
                    volume /= market.no_fee_rate;
                }
                trades.push(TradeInstruction {
                    market_name: market.market_name.clone(),
                    side: market.trade_type,
                    fee: market.fee,
                    rate: market.no_fee_rate,
                    volume,
                });
            }
        }

        debug!(ratio, trades = trades.len(), "Calculated profit ratio");
        Ok((ratio / self.starting_amount, trades))
    }
}

use std::fmt;

/// Dense index of an asset node inside a graph snapshot.
pub type NodeId = usize;

/// Type alias for a single edge list: (from, to, rate)
pub type Edge = (NodeId, NodeId, f64);

/// Side of the order book an edge trades against.
///
/// A `Sell` edge goes from a market's base currency to its quote currency,
/// a `Buy` edge goes from quote to base.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TradeType {
    Buy,
    Sell,
}

impl fmt::Display for TradeType {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            TradeType::Buy => write!(f, "BUY"),
            TradeType::Sell => write!(f, "SELL"),
        }
    }
}

/// Market metadata carried by an edge, only read by the profit evaluator.
#[derive(Debug, Clone, PartialEq)]
pub struct MarketInfo {
    pub market_name: String,
    pub trade_type: TradeType,
    pub fee: f64,
    /// Quoted rate of the market before fees, always expressed in quote per base.
    pub no_fee_rate: f64,
}

/// Attributes of a single directed edge.
///
/// Fields:
/// - `weight`: `-ln(effective rate)`; negative values are profitable hops.
/// - `depth`: `-ln(max volume)` tradable at that rate, in units of the edge's source asset.
/// - `market`: optional metadata used to emit trade instructions.
#[derive(Debug, Clone, PartialEq)]
pub struct EdgeAttributes {
    pub weight: f64,
    pub depth: Option<f64>,
    pub market: Option<MarketInfo>,
}

impl EdgeAttributes {
    pub fn new(weight: f64) -> Self {
        Self {
            weight,
            depth: None,
            market: None,
        }
    }

    pub fn with_depth(mut self, depth: f64) -> Self {
        self.depth = Some(depth);
        self
    }

    pub fn with_market(mut self, market: MarketInfo) -> Self {
        self.market = Some(market);
        self
    }
}

/// A directed edge between two node indices together with its attributes.
#[derive(Debug, Clone, PartialEq)]
pub struct MarketEdge {
    pub from: NodeId,
    pub to: NodeId,
    pub attributes: EdgeAttributes,
}

/// A closed walk found by the cycle finder.
///
/// `path` starts and ends at the same node and lists the hops in trading order.
/// `minimum` is only set by the depth-aware finder and holds the `-ln` of the
/// largest volume that can be pushed around the cycle without exceeding any
/// edge's depth.
#[derive(Debug, Clone, PartialEq)]
pub struct NegativeCycle {
    pub path: Vec<NodeId>,
    pub minimum: Option<f64>,
}

impl NegativeCycle {
    pub fn new(path: Vec<NodeId>) -> Self {
        Self {
            path,
            minimum: None,
        }
    }

    pub fn with_minimum(path: Vec<NodeId>, minimum: f64) -> Self {
        Self {
            path,
            minimum: Some(minimum),
        }
    }

    /// Number of trades needed to walk the path once.
    pub fn hop_count(&self) -> usize {
        self.path.len().saturating_sub(1)
    }

    pub fn is_closed(&self) -> bool {
        self.path.len() > 1 && self.path.first() == self.path.last()
    }

    /// Largest volume (in units of the first asset) the depth finder allows, if known.
    pub fn max_volume(&self) -> Option<f64> {
        self.minimum.map(|m| (-m).exp())
    }
}

/// One hop of an evaluated path, ready to be handed to an order router.
///
/// `volume` is always expressed in the base currency of `market_name`.
#[derive(Debug, Clone, PartialEq)]
pub struct TradeInstruction {
    pub market_name: String,
    pub side: TradeType,
    pub fee: f64,
    pub rate: f64,
    pub volume: f64,
}

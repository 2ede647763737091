use std::fmt;
use tracing::{info, info_span, warn};

use super::config::SearchConfig;
use super::error::Error;
use arb_loop_core::{GraphCSR, ProfitEvaluator, traits::GraphSolver};
use common::types::{NegativeCycle, TradeInstruction};

/// A profitable loop found in a snapshot, priced by the profit evaluator.
#[derive(Debug, Clone, PartialEq)]
pub struct Opportunity {
    /// Asset labels in trading order; the first and last are the same asset.
    pub assets: Vec<String>,
    /// Multiplier on the starting amount, above 1.0 when profitable.
    pub profit_ratio: f64,
    /// Volume cap in the first asset, only known in depth mode.
    pub max_volume: Option<f64>,
    pub trades: Vec<TradeInstruction>,
}

impl fmt::Display for Opportunity {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{} ratio={:.6}", self.assets.join(" -> "), self.profit_ratio)?;
        if let Some(volume) = self.max_volume {
            write!(f, " max_volume={:.6}", volume)?;
        }
        for trade in &self.trades {
            write!(
                f,
                "\n  {} {} volume={:.8} rate={} fee={}",
                trade.side, trade.market_name, trade.volume, trade.rate, trade.fee
            )?;
        }
        Ok(())
    }
}

pub struct ArbSearcher<S> {
    solver: S,
    settings: SearchConfig,
}

impl<S> ArbSearcher<S>
where
    S: GraphSolver,
{
    pub fn new(solver: S, settings: SearchConfig) -> Self {
        ArbSearcher { solver, settings }
    }

    pub fn settings(&self) -> &SearchConfig {
        &self.settings
    }

    /// Runs one search over `graph` and prices every cycle it reports.
    pub fn search(&self, graph: &GraphCSR) -> Result<Vec<Opportunity>, Error> {
        let span = info_span!(
            "search",
            exchange = graph.name.as_deref().unwrap_or(""),
            source = %self.settings.source,
        );
        let _guard = span.enter();

        if graph.num_nodes < 2 {
            warn!(assets = graph.num_nodes, "Graph too small to search for cycles");
            return Ok(Vec::new());
        }

        let source = graph
            .node_index(&self.settings.source)
            .map_err(|_| Error::UnknownSource(self.settings.source.clone()))?;

        let cycles = self.solver.find_negative_cycles(
            graph,
            source,
            self.settings.options(),
            self.settings.max_results,
        )?;

        let opportunities = cycles
            .iter()
            .map(|cycle| self.price(graph, cycle))
            .collect::<Result<Vec<_>, _>>()?;

        if opportunities.is_empty() {
            info!("Search complete: no arbitrage opportunities");
        }
        for opportunity in &opportunities {
            info!(
                path = %opportunity.assets.join(" -> "),
                profit_ratio = opportunity.profit_ratio,
                max_volume = ?opportunity.max_volume,
                "Opportunity found"
            );
        }

        Ok(opportunities)
    }

    fn price(&self, graph: &GraphCSR, cycle: &NegativeCycle) -> Result<Opportunity, Error> {
        let evaluator =
            ProfitEvaluator::new(graph).with_starting_amount(self.settings.starting_amount);

        let (profit_ratio, trades) = if graph.has_depths() {
            evaluator.evaluate_with_trades(&cycle.path)?
        } else {
            (evaluator.profit_ratio(&cycle.path)?, Vec::new())
        };

        Ok(Opportunity {
            assets: graph.path_labels(&cycle.path),
            profit_ratio,
            max_volume: cycle.max_volume(),
            trades,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::snapshot::{build_graph, parse_records};
    use arb_loop_core::{BellmanFordSolver, FinderMode};
    use common::types::TradeType;

    const SAMPLE_SNAPSHOT: &str = include_str!("../data/snapshot.csv");

    fn sample_graph() -> GraphCSR {
        let records = parse_records(SAMPLE_SNAPSHOT.as_bytes()).unwrap();
        build_graph(Some("sample-exchange".to_string()), &records).unwrap()
    }

    fn settings(source: &str) -> SearchConfig {
        SearchConfig {
            source: source.to_string(),
            loop_from_source: false,
            ensure_profit: false,
            unique_paths: true,
            depth: false,
            starting_amount: 1.0,
            max_results: None,
        }
    }

    #[test]
    fn finds_the_profitable_triangle() {
        let graph = sample_graph();
        let searcher = ArbSearcher::new(BellmanFordSolver::default(), settings("USD"));

        let opportunities = searcher.search(&graph).unwrap();

        assert_eq!(opportunities.len(), 1);
        let opportunity = &opportunities[0];
        assert_eq!(opportunity.assets, vec!["BTC", "ETH", "USD", "BTC"]);
        // 0.999^3 * 1010 / (0.05 * 20000)
        assert!((opportunity.profit_ratio - 1.00697302899).abs() < 1e-9);
        assert_eq!(opportunity.max_volume, None);
        assert_eq!(opportunity.trades.len(), 3);
    }

    #[test]
    fn anchored_search_starts_at_source() {
        let graph = sample_graph();
        let mut config = settings("USD");
        config.loop_from_source = true;
        config.ensure_profit = true;
        let searcher = ArbSearcher::new(BellmanFordSolver::default(), config);

        let opportunities = searcher.search(&graph).unwrap();

        assert_eq!(opportunities.len(), 1);
        assert_eq!(opportunities[0].assets, vec!["USD", "BTC", "ETH", "USD"]);
        assert!(opportunities[0].profit_ratio > 1.0);
    }

    #[test]
    fn depth_search_reports_volume_and_trades() {
        let graph = sample_graph();
        let mut config = settings("USD");
        config.depth = true;
        let searcher = ArbSearcher::new(BellmanFordSolver::new(FinderMode::Depth), config);

        let opportunities = searcher.search(&graph).unwrap();

        assert_eq!(opportunities.len(), 1);
        let opportunity = &opportunities[0];
        // The 30 ETH bid is the bottleneck: 1 BTC buys 19.98 ETH after fees.
        let bottleneck = 30.0 / (0.999 / 0.05);
        assert!((opportunity.max_volume.unwrap() - bottleneck).abs() < 1e-9);

        let sides: Vec<TradeType> = opportunity.trades.iter().map(|t| t.side).collect();
        assert_eq!(sides, vec![TradeType::Buy, TradeType::Sell, TradeType::Buy]);
        assert_eq!(opportunity.trades[0].market_name, "ETH/BTC");
        // BUY volumes are in base: 1 BTC spent is 20 ETH at the quoted rate.
        assert!((opportunity.trades[0].volume - 20.0).abs() < 1e-9);
        assert!((opportunity.trades[1].volume - 19.98).abs() < 1e-9);
    }

    #[test]
    fn unknown_source_is_reported() {
        let graph = sample_graph();
        let searcher = ArbSearcher::new(BellmanFordSolver::default(), settings("DOGE"));

        assert!(matches!(
            searcher.search(&graph),
            Err(Error::UnknownSource(label)) if label == "DOGE"
        ));
    }

    #[test]
    fn max_results_limits_output() {
        // Two independent loops, A <-> B and C <-> D, both reachable from S.
        let records = parse_records(
            "\
market,base,quote,side,rate,fee,volume
A/S,A,S,SELL,1.0,0.0,
A/S,A,S,BUY,1.0,0.0,
C/S,C,S,SELL,1.0,0.0,
C/S,C,S,BUY,1.0,0.0,
A/B,A,B,SELL,2.0,0.0,
A/B,A,B,BUY,1.5,0.0,
C/D,C,D,SELL,2.0,0.0,
C/D,C,D,BUY,1.5,0.0,
"
            .as_bytes(),
        )
        .unwrap();
        let graph = build_graph(None, &records).unwrap();

        let unlimited = ArbSearcher::new(BellmanFordSolver::default(), settings("S"));
        assert_eq!(unlimited.search(&graph).unwrap().len(), 2);

        let mut config = settings("S");
        config.max_results = Some(1);
        let limited = ArbSearcher::new(BellmanFordSolver::default(), config);
        let opportunities = limited.search(&graph).unwrap();

        assert_eq!(opportunities.len(), 1);
        assert_eq!(opportunities[0].assets, vec!["B", "A", "B"]);
        assert!((opportunities[0].profit_ratio - 2.0 / 1.5).abs() < 1e-9);
        assert!(opportunities[0].trades.is_empty());
    }

    #[test]
    fn opportunity_display_lists_trades() {
        let opportunity = Opportunity {
            assets: vec!["USD".to_string(), "BTC".to_string(), "USD".to_string()],
            profit_ratio: 1.5,
            max_volume: Some(2.0),
            trades: vec![TradeInstruction {
                market_name: "BTC/USD".to_string(),
                side: TradeType::Buy,
                fee: 0.001,
                rate: 20000.0,
                volume: 0.5,
            }],
        };

        let rendered = opportunity.to_string();
        assert!(rendered.starts_with("USD -> BTC -> USD ratio=1.500000 max_volume=2.000000"));
        assert!(rendered.contains("BUY BTC/USD volume=0.50000000"));
    }
}

// ----------------------------
// Benchmark market graph
// ----------------------------

use arb_loop_core::GraphCSR;
use common::error::Error;
use common::numeric_kernel::rate_to_weight;
use common::types::{EdgeAttributes, MarketEdge};

pub const NUM_ASSETS: usize = 1_000;
pub const RING_RATE: f64 = 1.0001; // one basis point gained per ring hop
pub const NOISE_RATE: f64 = 0.9; // 10% lost per noise hop
pub const NOISE_FANOUT: usize = 3;

/// Generates a market graph of `num_assets` assets.
///
/// Asset `i` trades into `i + 1` at `RING_RATE`, so the full ring compounds to a
/// profit. Every asset also has `NOISE_FANOUT` lossy edges to pseudo-random assets.
/// Rates and depths vary slightly by index so the compiler cannot fold them.
pub fn generate_ring_graph(num_assets: usize) -> Result<GraphCSR, Error> {
    let labels: Vec<String> = (0..num_assets).map(|i| format!("A{}", i)).collect();
    let mut edges = Vec::with_capacity(num_assets * (NOISE_FANOUT + 1));

    for i in 0..num_assets {
        let next = (i + 1) % num_assets;
        edges.push(market_edge(i, next, RING_RATE, 10.0 + (i % 17) as f64));

        for k in 1..=NOISE_FANOUT {
            let to = (i * 7 + k * 131) % num_assets;
            if to == i || to == next {
                continue;
            }
            let rate = NOISE_RATE - (i as f64) * 1e-9;
            edges.push(market_edge(i, to, rate, 5.0 + k as f64));
        }
    }

    GraphCSR::from_market_edges(Some("bench".to_string()), labels, edges)
}

fn market_edge(from: usize, to: usize, rate: f64, volume: f64) -> MarketEdge {
    MarketEdge {
        from,
        to,
        attributes: EdgeAttributes::new(rate_to_weight(rate)).with_depth(rate_to_weight(volume)),
    }
}

use std::hint::black_box;
use std::time::Instant;

use arb_loop_core::{NegativeCycleFinder, SearchOptions};
use perf_bench::*;

fn main() -> Result<(), common::error::Error> {
    let graph = generate_ring_graph(NUM_ASSETS)?;
    let mut finder = NegativeCycleFinder::with_depth(&graph);

    let start_time = Instant::now();
    let mut volume = 0.0;

    for cycle in finder.run(0, SearchOptions::unique())? {
        volume += cycle.max_volume().unwrap_or(0.0);
    }

    let elapsed_time = start_time.elapsed();

    let final_volume = black_box(volume);

    println!(
        "--- Depth Finder Benchmark ({} Assets, {} Edges) ---",
        graph.num_nodes,
        graph.num_edges()
    );
    println!("Volume checksum: {:.10}", final_volume);
    println!("Elapsed Time: {:?}", elapsed_time);
    Ok(())
}

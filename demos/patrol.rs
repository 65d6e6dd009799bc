//! Walkers roaming a generated cave.
//!
//! Run: cargo run --bin patrol -- [ticks] [walkers] [seed]
//! Set `RUST_LOG=debug` to see scheduler batches.

use std::time::Instant;

use tilenav_demos::{Patrol, PatrolConfig};
use tracing_subscriber::EnvFilter;

fn arg<T: std::str::FromStr>(args: &[String], i: usize, default: T) -> T {
    args.get(i).and_then(|a| a.parse().ok()).unwrap_or(default)
}

fn main() {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let args: Vec<String> = std::env::args().collect();
    let ticks: u64 = arg(&args, 1, 500);
    let config = PatrolConfig {
        walkers: arg(&args, 2, 24),
        seed: arg(&args, 3, 42),
        ..PatrolConfig::default()
    };

    let mut patrol = match Patrol::new(config) {
        Ok(p) => p,
        Err(e) => {
            eprintln!("Error: {e}");
            std::process::exit(1);
        }
    };

    let started = Instant::now();
    let stats = patrol.run(ticks);
    let elapsed = started.elapsed();
    let graph = patrol.scheduler().graph().stats();

    println!("ticks          {}", stats.ticks);
    println!("elapsed        {elapsed:.2?}");
    println!("graph          {} chunks, {} nodes, {} obstructions", graph.chunks, graph.nodes, graph.obstructions);
    println!("requests       {}", stats.requests);
    println!("routes         {} ({} tiles)", stats.routes, stats.route_tiles);
    println!("failures       {}", stats.failures);
    println!("unreachable    {}", stats.unreachable);
    println!("cancelled      {}", stats.cancelled);
    println!("steps          {} ({} blocked)", stats.steps, stats.blocked_steps);
    println!("rockfalls      {}", stats.rockfalls);
    println!("deferred ticks {}", stats.deferred_ticks);
}

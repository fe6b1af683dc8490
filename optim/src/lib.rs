pub mod bundle;
pub mod error;
pub mod ilp;

pub use bundle::OptGraph;
pub use error::OptimError;
pub use ilp::OrderConfig;

use metromap_common::graph::CombGraph;
use metromap_common::util::config::OrderingConfig;
use rayon::prelude::*;

/// Orders the parallel lines of every bundle segment so that crossings at
/// junctions are minimized. Connected components of the bundle graph are
/// independent and solve in parallel; a component whose program is
/// infeasible fails the whole call.
pub fn order_lines(
    og: &OptGraph,
    comb: &CombGraph,
    cfg: &OrderingConfig,
) -> Result<OrderConfig, OptimError> {
    let comps = og.components();
    log::info!(
        "Ordering lines: {} segments in {} components",
        og.num_edges(),
        comps.len()
    );

    let partial: Result<Vec<OrderConfig>, OptimError> = comps
        .par_iter()
        .map(|comp| ilp::solve_component(og, comb, comp, cfg))
        .collect();

    let mut merged = OrderConfig::default();
    for part in partial? {
        merged.merge(part);
    }
    Ok(merged)
}

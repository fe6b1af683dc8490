pub mod algo;
pub mod check;
pub mod error;
pub mod gridgraph;
pub mod octilinearizer;

pub use error::GridError;
pub use octilinearizer::{RoutedLayout, RoutedPath};

use metromap_common::graph::CombGraph;
use metromap_common::util::config::GridConfig;

/// Embeds a comb graph onto an octilinear grid. Returns the grid (carrying
/// the settlement map and reservations) together with the per-edge paths.
pub fn octilinearize(
    comb: &CombGraph,
    config: &GridConfig,
) -> Result<(gridgraph::GridGraph, RoutedLayout), GridError> {
    octilinearizer::run(comb, config)
}

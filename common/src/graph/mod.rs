pub mod comb;
pub mod indices;
pub mod ordering;

pub use comb::{CombEdge, CombGraph, CombNode, LineData};
pub use indices::{CombEdgeId, CombNodeId, LineId};
pub use ordering::EdgeOrdering;

pub mod astar;

pub use astar::{AStar, PathResult};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum OptimError {
    /// The ordering program has no feasible solution or the backend solver
    /// failed. Fatal for the affected component.
    #[error("line ordering program unsolvable: {0}")]
    Unsolvable(String),

    /// The bundle graph and the solution disagree, e.g. a slot without a
    /// uniquely assigned line. Always a bug.
    #[error("inconsistent bundle graph or solution: {0}")]
    Inconsistent(String),
}

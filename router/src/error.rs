use thiserror::Error;

#[derive(Debug, Error)]
pub enum GridError {
    /// Construction or settlement precondition failed. Fatal for the solve.
    #[error("precondition violated: {0}")]
    PreconditionViolation(String),

    /// Direction index outside 0..8. Always a caller bug.
    #[error("invalid direction index {0}")]
    InvalidDirection(usize),

    /// No open grid candidate within the search radius. The caller may relax
    /// the radius and retry.
    #[error("no open grid candidate within the search radius")]
    NoCandidate,

    /// The grid search exhausted without reaching a target. The caller may
    /// relax the radius and retry.
    #[error("no grid path between the chosen endpoints")]
    NoPath,
}

use super::indices::CombEdgeId;
use serde::{Deserialize, Serialize};

/// Cyclic, clockwise sequence of the edges incident to one comb node.
///
/// `dist(a, b)` is the number of clockwise steps from `a` to `b`, in
/// `[0, deg)`, with `dist(a, a) == 0`.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct EdgeOrdering {
    edges: Vec<CombEdgeId>,
}

impl EdgeOrdering {
    pub fn new(edges: Vec<CombEdgeId>) -> Self {
        Self { edges }
    }

    pub fn len(&self) -> usize {
        self.edges.len()
    }

    pub fn is_empty(&self) -> bool {
        self.edges.is_empty()
    }

    pub fn has(&self, e: CombEdgeId) -> bool {
        self.edges.contains(&e)
    }

    pub fn edges(&self) -> &[CombEdgeId] {
        &self.edges
    }

    /// Clockwise step count from `a` to `b`. `None` if either edge is not
    /// part of the ordering.
    pub fn dist(&self, a: CombEdgeId, b: CombEdgeId) -> Option<usize> {
        let pa = self.edges.iter().position(|&e| e == a)?;
        let pb = self.edges.iter().position(|&e| e == b)?;
        let deg = self.edges.len();
        Some((pb + deg - pa) % deg)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ordering(n: usize) -> EdgeOrdering {
        EdgeOrdering::new((0..n).map(CombEdgeId::new).collect())
    }

    #[test]
    fn dist_is_clockwise_step_count() {
        let ord = ordering(4);
        let e = |i| CombEdgeId::new(i);
        assert_eq!(ord.dist(e(0), e(0)), Some(0));
        assert_eq!(ord.dist(e(0), e(3)), Some(3));
        assert_eq!(ord.dist(e(3), e(0)), Some(1));
        assert_eq!(ord.dist(e(2), e(1)), Some(3));
    }

    #[test]
    fn dist_of_foreign_edge_is_none() {
        let ord = ordering(3);
        assert_eq!(ord.dist(CombEdgeId::new(0), CombEdgeId::new(9)), None);
        assert!(!ord.has(CombEdgeId::new(9)));
    }
}

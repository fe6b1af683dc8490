use super::point::Point;
use super::rect::Rect;
use rstar::primitives::GeomWithData;
use rstar::{AABB, RTree};

/// R-tree over 2D points, each tagged with a caller-supplied id.
pub struct SpatialIndex {
    tree: RTree<GeomWithData<[f64; 2], usize>>,
}

impl SpatialIndex {
    pub fn new() -> Self {
        Self { tree: RTree::new() }
    }

    pub fn insert(&mut self, p: Point<f64>, id: usize) {
        self.tree.insert(GeomWithData::new([p.x, p.y], id));
    }

    /// Ids of all points inside the query rectangle (inclusive bounds).
    pub fn query(&self, rect: Rect) -> Vec<usize> {
        let aabb = AABB::from_corners([rect.min.x, rect.min.y], [rect.max.x, rect.max.y]);
        self.tree
            .locate_in_envelope(&aabb)
            .map(|item| item.data)
            .collect()
    }
}

impl Default for SpatialIndex {
    fn default() -> Self {
        Self::new()
    }
}

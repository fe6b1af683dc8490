pub mod node_cost;
pub mod penalties;

pub use node_cost::{CLOSE, NodeCost, is_close};

use crate::error::GridError;
use metromap_common::define_index;
use metromap_common::geom::{Point, Rect};
use metromap_common::geom::rtree::SpatialIndex;
use metromap_common::graph::{CombGraph, CombEdgeId, CombNodeId};
use metromap_common::util::config::Penalties;
use std::collections::{BinaryHeap, HashMap, HashSet};

const INF: f64 = f64::INFINITY;

/// One of the eight octilinear directions. Index 0 is north, continuing
/// clockwise: 1 = NE, 2 = E, 3 = SE, 4 = S, 5 = SW, 6 = W, 7 = NW.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Dir(u8);

const DIR_OFFSETS: [(i64, i64); 8] = [
    (0, 1),
    (1, 1),
    (1, 0),
    (1, -1),
    (0, -1),
    (-1, -1),
    (-1, 0),
    (-1, 1),
];

impl Dir {
    pub fn new(i: usize) -> Result<Dir, GridError> {
        if i < 8 {
            Ok(Dir(i as u8))
        } else {
            Err(GridError::InvalidDirection(i))
        }
    }

    pub fn all() -> impl Iterator<Item = Dir> {
        (0..8u8).map(Dir)
    }

    #[inline(always)]
    pub fn index(self) -> usize {
        self.0 as usize
    }

    pub fn opposite(self) -> Dir {
        Dir((self.0 + 4) % 8)
    }

    /// The direction `k` clockwise steps away.
    pub fn rotate(self, k: usize) -> Dir {
        Dir((self.0 + (k % 8) as u8) % 8)
    }

    /// Cell offset (dx, dy) of the neighbour in this direction.
    pub fn offset(self) -> (i64, i64) {
        DIR_OFFSETS[self.index()]
    }

    pub fn from_offset(dx: i64, dy: i64) -> Option<Dir> {
        DIR_OFFSETS
            .iter()
            .position(|&o| o == (dx, dy))
            .map(|i| Dir(i as u8))
    }

    pub fn is_diagonal(self) -> bool {
        self.0 % 2 == 1
    }

    pub fn is_vertical(self) -> bool {
        self.0 % 4 == 0
    }

    /// Cyclic angular distance to another direction, in 45-degree steps
    /// (0..=4).
    pub fn angular_distance(self, other: Dir) -> usize {
        let d = (self.0 as i32 - other.0 as i32).rem_euclid(8);
        d.min(8 - d) as usize
    }
}

define_index!(CellId);
define_index!(EdgeId);

/// A node of the augmented grid: either a cell center or one of its eight
/// direction-tagged ports.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum GridNodeRef {
    Center(CellId),
    Port(CellId, Dir),
}

impl GridNodeRef {
    pub fn cell(self) -> CellId {
        match self {
            GridNodeRef::Center(c) | GridNodeRef::Port(c, _) => c,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EdgeKind {
    /// Port-to-center adapter, used only to enter or leave a node.
    Sink { cell: CellId, dir: Dir },
    /// Intra-cell edge between two ports of one center; carries turn cost.
    Bend { cell: CellId, from: Dir, to: Dir },
    /// Inter-cell edge between mirrored ports of two adjacent centers.
    Traversal { from: CellId, dir: Dir },
}

#[derive(Clone, Debug)]
pub struct GridEdge {
    pub kind: EdgeKind,
    cost: f64,
    closed: bool,
    reserved: Vec<CombEdgeId>,
}

impl GridEdge {
    pub fn cost(&self) -> f64 {
        self.cost
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    pub fn reserved(&self) -> &[CombEdgeId] {
        &self.reserved
    }

    /// Impassable for the shortest-path search.
    pub fn is_blocked(&self) -> bool {
        self.closed || !self.cost.is_finite()
    }

    pub(crate) fn set_closed(&mut self, closed: bool) {
        self.closed = closed;
    }
}

#[derive(Clone, Debug)]
pub struct GridCell {
    x: usize,
    y: usize,
    pos: Point<f64>,
    closed: bool,
    port_pos: [Point<f64>; 8],
    sink_edges: [EdgeId; 8],
    bend_edges: [Option<EdgeId>; 28],
    traversal_edges: [Option<EdgeId>; 8],
}

impl GridCell {
    pub fn xy(&self) -> (usize, usize) {
        (self.x, self.y)
    }

    pub fn pos(&self) -> Point<f64> {
        self.pos
    }

    pub fn port_pos(&self, d: Dir) -> Point<f64> {
        self.port_pos[d.index()]
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    pub fn sink_edge(&self, d: Dir) -> EdgeId {
        self.sink_edges[d.index()]
    }

    pub fn traversal_edge(&self, d: Dir) -> Option<EdgeId> {
        self.traversal_edges[d.index()]
    }

    pub fn bend_edge(&self, a: Dir, b: Dir) -> Option<EdgeId> {
        if a == b {
            return None;
        }
        self.bend_edges[bend_slot(a, b)]
    }
}

/// Flat index into the 28 unordered port pairs of one cell.
fn bend_slot(a: Dir, b: Dir) -> usize {
    let (i, j) = if a.index() < b.index() {
        (a.index(), b.index())
    } else {
        (b.index(), a.index())
    };
    i * (15 - i) / 2 + (j - i - 1)
}

/// An open center returned by the candidate query, ordered so that a
/// max-heap pops the nearest candidate first.
#[derive(Clone, Copy, Debug)]
pub struct Candidate {
    pub cell: CellId,
    pub dist: f64,
}

impl PartialEq for Candidate {
    fn eq(&self, other: &Self) -> bool {
        self.cell == other.cell && self.dist == other.dist
    }
}
impl Eq for Candidate {}

impl Ord for Candidate {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        other
            .dist
            .total_cmp(&self.dist)
            .then_with(|| self.cell.cmp(&other.cell))
    }
}

impl PartialOrd for Candidate {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

/// The octilinear routing grid: centers with eight ports each, bend edges
/// inside every cell, traversal edges between mirrored ports of adjacent
/// cells, and the settlement map tying comb nodes to committed centers.
pub struct GridGraph {
    width: usize,
    height: usize,
    cell_size: f64,
    pens: Penalties,
    cells: Vec<GridCell>,
    edges: Vec<GridEdge>,
    index: SpatialIndex,
    settled: HashMap<CombNodeId, CellId>,
}

impl GridGraph {
    pub fn new(
        bbox: Rect,
        cell_size: f64,
        spacer: f64,
        pens: Penalties,
    ) -> Result<Self, GridError> {
        if !(pens.p_0 < pens.p_135 && pens.p_135 < pens.p_90 && pens.p_90 < pens.p_45) {
            return Err(GridError::PreconditionViolation(format!(
                "bend penalties must be strictly increasing, got p_0={} p_135={} p_90={} p_45={}",
                pens.p_0, pens.p_135, pens.p_90, pens.p_45
            )));
        }
        if cell_size <= 0.0 {
            return Err(GridError::PreconditionViolation(format!(
                "cell size must be positive, got {}",
                cell_size
            )));
        }

        let mut spacer = spacer;
        if spacer > cell_size / 2.0 {
            log::warn!(
                "spacer {} exceeds half the cell size, clamping to {}",
                spacer,
                cell_size / 2.0
            );
            spacer = cell_size / 2.0;
        }

        let width = (bbox.width() / cell_size).ceil() as usize + 1;
        let height = (bbox.height() / cell_size).ceil() as usize + 1;

        let mut g = Self {
            width,
            height,
            cell_size,
            pens,
            cells: Vec::with_capacity(width * height),
            edges: Vec::new(),
            index: SpatialIndex::new(),
            settled: HashMap::new(),
        };

        for y in 0..height {
            for x in 0..width {
                g.write_cell(x, y, bbox.min, spacer);
            }
        }

        for y in 0..height {
            for x in 0..width {
                for d in Dir::all() {
                    g.write_traversal_edge(x, y, d);
                }
            }
        }

        log::debug!(
            "grid built: {}x{} cells, {} edges",
            width,
            height,
            g.edges.len()
        );

        Ok(g)
    }

    fn write_cell(&mut self, x: usize, y: usize, origin: Point<f64>, spacer: f64) {
        let id = CellId::new(self.cells.len());
        let pos = Point::new(
            origin.x + x as f64 * self.cell_size,
            origin.y + y as f64 * self.cell_size,
        );

        let mut port_pos = [Point::new(0.0, 0.0); 8];
        let mut sink_edges = [EdgeId::new(0); 8];
        for d in Dir::all() {
            let (ox, oy) = d.offset();
            port_pos[d.index()] = Point::new(pos.x + ox as f64 * spacer, pos.y + oy as f64 * spacer);
            let e = EdgeId::new(self.edges.len());
            self.edges.push(GridEdge {
                kind: EdgeKind::Sink { cell: id, dir: d },
                cost: INF,
                closed: false,
                reserved: Vec::new(),
            });
            sink_edges[d.index()] = e;
        }

        // Bend edges between non-adjacent port pairs. A 45-degree turn is
        // disallowed, so adjacent pairs get no edge at all.
        let c_0 = self.pens.p_45 - self.pens.p_135;
        let c_135 = self.pens.p_45;
        let c_90 = self.pens.p_45 - self.pens.p_135 + self.pens.p_90;

        let mut bend_edges = [None; 28];
        for i in 0..8usize {
            for j in (i + 1)..8 {
                let a = Dir::new(i).unwrap();
                let b = Dir::new(j).unwrap();
                let cost = match a.angular_distance(b) {
                    1 => continue,
                    2 => c_90,
                    3 => c_135,
                    _ => c_0,
                };
                let e = EdgeId::new(self.edges.len());
                self.edges.push(GridEdge {
                    kind: EdgeKind::Bend {
                        cell: id,
                        from: a,
                        to: b,
                    },
                    cost,
                    closed: false,
                    reserved: Vec::new(),
                });
                bend_edges[bend_slot(a, b)] = Some(e);
            }
        }

        self.index.insert(pos, id.index());
        self.cells.push(GridCell {
            x,
            y,
            pos,
            closed: false,
            port_pos,
            sink_edges,
            bend_edges,
            traversal_edges: [None; 8],
        });
    }

    /// Adds the traversal edge from port `d` of (x, y) to the mirrored port
    /// of the neighbour in direction `d`, if the neighbour exists. A no-op
    /// when the edge is already present.
    fn write_traversal_edge(&mut self, x: usize, y: usize, d: Dir) {
        let Some(from) = self.node(x, y) else { return };
        let Some(to) = self.neighbour(x, y, d) else {
            return;
        };
        if self.cells[from.index()].traversal_edges[d.index()].is_some() {
            return;
        }

        let cost = if d.is_diagonal() {
            self.pens.diagonal_pen
        } else if d.is_vertical() {
            self.pens.vertical_pen
        } else {
            self.pens.horizontal_pen
        };

        let e = EdgeId::new(self.edges.len());
        self.edges.push(GridEdge {
            kind: EdgeKind::Traversal { from, dir: d },
            cost,
            closed: false,
            reserved: Vec::new(),
        });

        self.cells[from.index()].traversal_edges[d.index()] = Some(e);
        self.cells[to.index()].traversal_edges[d.opposite().index()] = Some(e);
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn cell_size(&self) -> f64 {
        self.cell_size
    }

    pub fn penalties(&self) -> &Penalties {
        &self.pens
    }

    pub fn num_cells(&self) -> usize {
        self.cells.len()
    }

    pub fn cell(&self, id: CellId) -> &GridCell {
        &self.cells[id.index()]
    }

    pub fn edge(&self, id: EdgeId) -> &GridEdge {
        &self.edges[id.index()]
    }

    pub fn node(&self, x: usize, y: usize) -> Option<CellId> {
        if x >= self.width || y >= self.height {
            return None;
        }
        Some(CellId::new(y * self.width + x))
    }

    pub fn neighbour(&self, x: usize, y: usize, d: Dir) -> Option<CellId> {
        let (dx, dy) = d.offset();
        let nx = x as i64 + dx;
        let ny = y as i64 + dy;
        if nx < 0 || ny < 0 {
            return None;
        }
        self.node(nx as usize, ny as usize)
    }

    pub fn neighbour_of(&self, c: CellId, d: Dir) -> Option<CellId> {
        let (x, y) = self.cells[c.index()].xy();
        self.neighbour(x, y, d)
    }

    /// Both endpoint cells of a traversal edge.
    pub fn traversal_cells(&self, e: EdgeId) -> Option<(CellId, CellId)> {
        match self.edges[e.index()].kind {
            EdgeKind::Traversal { from, dir } => {
                let to = self.neighbour_of(from, dir)?;
                Some((from, to))
            }
            _ => None,
        }
    }

    /// The unique traversal edge between two adjacent centers, if any.
    pub fn inter_cell_edge(&self, a: CellId, b: CellId) -> Option<EdgeId> {
        for d in Dir::all() {
            if let Some(e) = self.cells[a.index()].traversal_edge(d)
                && self.neighbour_of(a, d) == Some(b)
            {
                return Some(e);
            }
        }
        None
    }

    pub fn set_edge_cost(&mut self, e: EdgeId, cost: f64) {
        self.edges[e.index()].cost = cost;
    }

    pub(crate) fn edge_mut(&mut self, e: EdgeId) -> &mut GridEdge {
        &mut self.edges[e.index()]
    }

    /// Records that `comb_edge` is routed through grid edge `e`.
    pub fn reserve(&mut self, e: EdgeId, comb_edge: CombEdgeId) {
        let edge = &mut self.edges[e.index()];
        if !edge.reserved.contains(&comb_edge) {
            edge.reserved.push(comb_edge);
        }
    }

    /// Closes the node: every traversal edge incident to one of its ports
    /// becomes impassable. Bend edges are untouched. Idempotent.
    pub fn close_node(&mut self, n: CellId) {
        if self.cells[n.index()].closed {
            return;
        }
        for d in Dir::all() {
            if let Some(e) = self.cells[n.index()].traversal_edge(d) {
                self.edges[e.index()].closed = true;
            }
        }
        self.cells[n.index()].closed = true;
    }

    /// Inverse of `close_node`. Traversal edges with a non-empty reserved
    /// set, or whose far neighbour is itself closed, stay closed. Idempotent.
    pub fn open_node(&mut self, n: CellId) {
        if !self.cells[n.index()].closed {
            return;
        }
        for d in Dir::all() {
            let Some(neigh) = self.neighbour_of(n, d) else {
                continue;
            };
            if self.cells[neigh.index()].closed {
                continue;
            }
            if let Some(e) = self.cells[n.index()].traversal_edge(d)
                && self.edges[e.index()].reserved.is_empty()
            {
                self.edges[e.index()].closed = false;
            }
        }
        self.cells[n.index()].closed = false;
    }

    /// Makes the node unusable as a search endpoint.
    pub fn close_node_sink(&mut self, n: CellId) {
        for d in Dir::all() {
            let e = self.cells[n.index()].sink_edge(d);
            self.edges[e.index()].cost = INF;
        }
    }

    /// Admits the node as a search endpoint with a uniform sink cost.
    pub fn open_node_sink(&mut self, n: CellId, cost: f64) {
        for d in Dir::all() {
            let e = self.cells[n.index()].sink_edge(d);
            self.edges[e.index()].cost = cost;
        }
    }

    /// Commits one step of a routed path: makes the traversal edge between
    /// the adjacent centers `a` and `b` permanent (cost infinity), closes
    /// both endpoints, and for diagonal steps also closes the crossing
    /// diagonal between the two off-axis neighbours so no second path can
    /// cut through the same cell corner.
    pub fn balance_edge(&mut self, a: CellId, b: CellId) -> Result<(), GridError> {
        if a == b {
            return Ok(());
        }
        let (ax, ay) = self.cells[a.index()].xy();
        let (bx, by) = self.cells[b.index()].xy();
        let d = Dir::from_offset(bx as i64 - ax as i64, by as i64 - ay as i64).ok_or_else(|| {
            GridError::PreconditionViolation(format!(
                "balance_edge endpoints ({},{}) and ({},{}) are not neighbours",
                ax, ay, bx, by
            ))
        })?;

        let e = self.cells[a.index()].traversal_edge(d).ok_or_else(|| {
            GridError::PreconditionViolation("missing traversal edge between neighbours".into())
        })?;
        self.edges[e.index()].cost = INF;

        self.close_node(a);
        self.close_node(b);

        if d.is_diagonal() {
            let na = self.neighbour(ax, ay, d.rotate(7));
            let nb = self.neighbour(ax, ay, d.rotate(1));
            if let (Some(na), Some(nb)) = (na, nb)
                && let Some(cross) = self.inter_cell_edge(na, nb)
            {
                self.edges[cross.index()].closed = true;
            }
        }
        Ok(())
    }

    /// Open centers within `max_d` of a point, nearest first.
    pub fn candidates_for(&self, p: Point<f64>, max_d: f64) -> BinaryHeap<Candidate> {
        let mut ret = BinaryHeap::new();
        for id in self.index.query(Rect::around(p, max_d)) {
            let cell = &self.cells[id];
            if cell.closed {
                continue;
            }
            let d = cell.pos.dist(&p);
            if d < max_d {
                ret.push(Candidate {
                    cell: CellId::new(id),
                    dist: d,
                });
            }
        }
        ret
    }

    /// Admissible lower bound on the cost of any grid path between two
    /// cells: the cheapest possible traversal per hop plus the cheapest
    /// possible bend between hops.
    pub fn heuristic(&self, a: CellId, b: CellId) -> f64 {
        if a == b {
            return 0.0;
        }
        let (ax, ay) = self.cells[a.index()].xy();
        let (bx, by) = self.cells[b.index()].xy();
        let min_hops = (bx as i64 - ax as i64)
            .abs()
            .max((by as i64 - ay as i64).abs()) as f64;

        let edge_cost = min_hops
            * self
                .pens
                .vertical_pen
                .min(self.pens.horizontal_pen)
                .min(self.pens.diagonal_pen);
        let hop_cost = (min_hops - 1.0) * (self.pens.p_45 - self.pens.p_135);
        edge_cost + hop_cost
    }

    pub fn is_settled(&self, n: CombNodeId) -> bool {
        self.settled.contains_key(&n)
    }

    pub fn settled(&self, n: CombNodeId) -> Option<CellId> {
        self.settled.get(&n).copied()
    }

    /// Commits a comb node to a grid center. Settling the same comb node
    /// twice is a caller bug.
    pub fn settle(&mut self, grid_node: CellId, comb_node: CombNodeId) -> Result<(), GridError> {
        if self.settled.contains_key(&comb_node) {
            return Err(GridError::PreconditionViolation(format!(
                "comb node {:?} is already settled",
                comb_node
            )));
        }
        self.settled.insert(comb_node, grid_node);
        Ok(())
    }

    /// The grid node a routed edge should start from: the settled center if
    /// the comb node is committed, otherwise the nearest open candidate.
    pub fn grid_node_from(
        &self,
        comb: &CombGraph,
        n: CombNodeId,
        max_dis: f64,
    ) -> Option<CellId> {
        if let Some(c) = self.settled(n) {
            return Some(c);
        }
        let mut cands = self.candidates_for(comb.node(n).pos, max_dis);
        while let Some(c) = cands.pop() {
            if !self.cells[c.cell.index()].closed {
                return Some(c.cell);
            }
        }
        None
    }

    /// All grid nodes a routed edge may end at.
    pub fn grid_nodes_to(
        &self,
        comb: &CombGraph,
        n: CombNodeId,
        max_dis: f64,
    ) -> HashSet<CellId> {
        let mut tos = HashSet::new();
        if let Some(c) = self.settled(n) {
            tos.insert(c);
            return tos;
        }
        let mut cands = self.candidates_for(comb.node(n).pos, max_dis);
        while let Some(c) = cands.pop() {
            if !self.cells[c.cell.index()].closed {
                tos.insert(c.cell);
            }
        }
        tos
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn small_grid(w: usize, h: usize) -> GridGraph {
        let bbox = Rect::new(
            Point::new(0.0, 0.0),
            Point::new((w - 1) as f64, (h - 1) as f64),
        );
        GridGraph::new(bbox, 1.0, 0.25, Penalties::default()).unwrap()
    }

    #[test]
    fn construction_rejects_bad_penalties() {
        let pens = Penalties {
            p_0: 3.0,
            p_135: 2.0,
            p_90: 1.0,
            p_45: 0.0,
            ..Penalties::default()
        };
        let bbox = Rect::new(Point::new(0.0, 0.0), Point::new(2.0, 2.0));
        assert!(matches!(
            GridGraph::new(bbox, 1.0, 0.25, pens),
            Err(GridError::PreconditionViolation(_))
        ));
    }

    #[test]
    fn construction_invariants() {
        let g = small_grid(3, 3);
        assert_eq!(g.width(), 3);
        assert_eq!(g.height(), 3);

        for y in 0..3 {
            for x in 0..3 {
                let c = g.node(x, y).unwrap();
                let cell = g.cell(c);

                // eight sink edges, all at infinite cost
                for d in Dir::all() {
                    let e = g.edge(cell.sink_edge(d));
                    assert!(matches!(e.kind, EdgeKind::Sink { .. }));
                    assert!(e.cost().is_infinite());
                }

                // twenty bend edges, none between adjacent directions
                let mut bends = 0;
                for i in 0..8 {
                    for j in (i + 1)..8 {
                        let a = Dir::new(i).unwrap();
                        let b = Dir::new(j).unwrap();
                        match a.angular_distance(b) {
                            1 => assert!(cell.bend_edge(a, b).is_none()),
                            _ => {
                                assert!(cell.bend_edge(a, b).is_some());
                                bends += 1;
                            }
                        }
                    }
                }
                assert_eq!(bends, 20);

                // traversal edges exist exactly towards existing neighbours
                for d in Dir::all() {
                    assert_eq!(
                        cell.traversal_edge(d).is_some(),
                        g.neighbour(x, y, d).is_some()
                    );
                }
            }
        }

        // corner cell has 3 neighbours, middle cell has 8
        let corner = g.cell(g.node(0, 0).unwrap());
        assert_eq!(
            Dir::all().filter(|&d| corner.traversal_edge(d).is_some()).count(),
            3
        );
        let mid = g.cell(g.node(1, 1).unwrap());
        assert_eq!(
            Dir::all().filter(|&d| mid.traversal_edge(d).is_some()).count(),
            8
        );
    }

    #[test]
    fn traversal_edges_are_shared_between_neighbours() {
        let g = small_grid(2, 1);
        let a = g.node(0, 0).unwrap();
        let b = g.node(1, 0).unwrap();
        let east = Dir::new(2).unwrap();
        let e1 = g.cell(a).traversal_edge(east).unwrap();
        let e2 = g.cell(b).traversal_edge(east.opposite()).unwrap();
        assert_eq!(e1, e2);
        assert_eq!(g.inter_cell_edge(a, b), Some(e1));
        assert_eq!(g.inter_cell_edge(b, a), Some(e1));
    }

    #[test]
    fn bend_costs_are_rotation_symmetric() {
        let g = small_grid(1, 1);
        let cell = g.cell(g.node(0, 0).unwrap());
        for i in 0..8 {
            for j in 0..8 {
                let a = Dir::new(i).unwrap();
                let b = Dir::new(j).unwrap();
                if a == b || a.angular_distance(b) == 1 {
                    continue;
                }
                for k in 1..8 {
                    let ar = a.rotate(k);
                    let br = b.rotate(k);
                    let c1 = g.edge(cell.bend_edge(a, b).unwrap()).cost();
                    let c2 = g.edge(cell.bend_edge(ar, br).unwrap()).cost();
                    assert_eq!(c1, c2, "bend cost differs under rotation by {}", k);
                }
            }
        }
    }

    #[test]
    fn initial_traversal_costs_follow_orientation() {
        let g = small_grid(3, 3);
        let c = g.node(1, 1).unwrap();
        let pens = Penalties::default();
        for d in Dir::all() {
            let e = g.edge(g.cell(c).traversal_edge(d).unwrap());
            let expect = if d.is_diagonal() {
                pens.diagonal_pen
            } else if d.is_vertical() {
                pens.vertical_pen
            } else {
                pens.horizontal_pen
            };
            assert_eq!(e.cost(), expect);
        }
    }

    #[test]
    fn close_and_open_node_round_trip() {
        let mut g = small_grid(3, 3);
        let c = g.node(1, 1).unwrap();

        g.close_node(c);
        g.close_node(c); // idempotent
        assert!(g.cell(c).is_closed());
        for d in Dir::all() {
            let e = g.cell(c).traversal_edge(d).unwrap();
            assert!(g.edge(e).is_closed());
        }

        g.open_node(c);
        g.open_node(c); // idempotent
        assert!(!g.cell(c).is_closed());
        for d in Dir::all() {
            let e = g.cell(c).traversal_edge(d).unwrap();
            assert!(!g.edge(e).is_closed());
        }
    }

    #[test]
    fn open_node_keeps_reserved_edges_closed() {
        let mut g = small_grid(3, 3);
        let c = g.node(1, 1).unwrap();
        let east = Dir::new(2).unwrap();
        let e = g.cell(c).traversal_edge(east).unwrap();

        g.reserve(e, CombEdgeId::new(0));
        g.close_node(c);
        g.open_node(c);

        assert!(!g.cell(c).is_closed());
        assert!(g.edge(e).is_closed());
        for d in Dir::all().filter(|&d| d != east) {
            let other = g.cell(c).traversal_edge(d).unwrap();
            assert!(!g.edge(other).is_closed());
        }
    }

    #[test]
    fn balance_edge_blocks_crossing_diagonal() {
        let mut g = small_grid(3, 3);
        let a = g.node(0, 0).unwrap();
        let b = g.node(1, 1).unwrap();
        g.balance_edge(a, b).unwrap();

        assert!(g.cell(a).is_closed());
        assert!(g.cell(b).is_closed());
        assert!(g.edge(g.inter_cell_edge(a, b).unwrap()).cost().is_infinite());

        // the crossing diagonal between (1,0) and (0,1) must be closed
        let na = g.node(1, 0).unwrap();
        let nb = g.node(0, 1).unwrap();
        let cross = g.inter_cell_edge(na, nb).unwrap();
        assert!(g.edge(cross).is_closed());
    }

    #[test]
    fn balance_edge_rejects_non_neighbours() {
        let mut g = small_grid(3, 3);
        let a = g.node(0, 0).unwrap();
        let b = g.node(2, 2).unwrap();
        assert!(matches!(
            g.balance_edge(a, b),
            Err(GridError::PreconditionViolation(_))
        ));
    }

    #[test]
    fn candidates_skip_closed_centers() {
        let mut g = small_grid(3, 3);
        let c = g.node(1, 1).unwrap();
        let p = g.cell(c).pos();
        g.close_node(c);

        let mut cands = g.candidates_for(p, 2.0);
        let top = cands.pop().unwrap();
        assert_ne!(top.cell, c);
        // the best candidate is one of the eight immediate neighbours
        let (x, y) = g.cell(top.cell).xy();
        assert!(x.abs_diff(1) <= 1 && y.abs_diff(1) <= 1);
        assert!((top.dist - 1.0).abs() < 1e-9);

        while let Some(cand) = cands.pop() {
            assert_ne!(cand.cell, c);
        }
    }

    #[test]
    fn heuristic_matches_straight_line_floor() {
        let g = small_grid(3, 3);
        let a = g.node(0, 0).unwrap();
        let b = g.node(2, 0).unwrap();
        // two hops at min traversal cost 1.0, one inter-hop bend floor of
        // p_45 - p_135 = 2.0
        assert!((g.heuristic(a, b) - 4.0).abs() < 1e-9);
        assert_eq!(g.heuristic(a, a), 0.0);
    }

    #[test]
    fn settle_twice_is_an_error() {
        let mut g = small_grid(2, 2);
        let c = g.node(0, 0).unwrap();
        let n = CombNodeId::new(0);
        g.settle(c, n).unwrap();
        assert!(g.is_settled(n));
        assert!(matches!(
            g.settle(c, n),
            Err(GridError::PreconditionViolation(_))
        ));
    }
}

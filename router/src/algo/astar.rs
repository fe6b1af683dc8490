use crate::gridgraph::{CellId, Dir, EdgeId, EdgeKind, GridGraph, GridNodeRef};
use std::cmp::Ordering;
use std::collections::{BinaryHeap, HashSet};

#[derive(Copy, Clone, PartialEq)]
struct State {
    f: f64,
    g: f64,
    node: u32,
}

impl Eq for State {}

impl Ord for State {
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .f
            .total_cmp(&self.f)
            .then_with(|| self.g.total_cmp(&other.g))
    }
}

impl PartialOrd for State {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// A path through the augmented grid: the centers entered in order and the
/// traversal edges crossed between them.
#[derive(Clone, Debug)]
pub struct PathResult {
    pub cells: Vec<CellId>,
    pub edges: Vec<EdgeId>,
    pub cost: f64,
}

/// Reusable A* solver over the port/center graph. Nodes are encoded as
/// `cell * 9 + dir` for ports and `cell * 9 + 8` for centers, so the scratch
/// arrays stay dense and are reset by tag instead of by clearing.
pub struct AStar {
    parents: Vec<u32>,
    parent_edge: Vec<u32>,
    g_score: Vec<f64>,
    visited_tag: Vec<u32>,
    current_tag: u32,
    capacity: usize,
}

const NODES_PER_CELL: usize = 9;
const NONE: u32 = u32::MAX;

fn encode(node: GridNodeRef) -> u32 {
    match node {
        GridNodeRef::Port(c, d) => (c.index() * NODES_PER_CELL + d.index()) as u32,
        GridNodeRef::Center(c) => (c.index() * NODES_PER_CELL + 8) as u32,
    }
}

fn decode(idx: u32) -> GridNodeRef {
    let cell = CellId::new(idx as usize / NODES_PER_CELL);
    match idx as usize % NODES_PER_CELL {
        8 => GridNodeRef::Center(cell),
        d => GridNodeRef::Port(cell, Dir::new(d).unwrap()),
    }
}

impl AStar {
    pub fn new() -> Self {
        Self {
            parents: Vec::new(),
            parent_edge: Vec::new(),
            g_score: Vec::new(),
            visited_tag: Vec::new(),
            current_tag: 0,
            capacity: 0,
        }
    }

    fn ensure_capacity(&mut self, size: usize) {
        if size > self.capacity {
            self.capacity = size;
            self.parents.resize(size, NONE);
            self.parent_edge.resize(size, NONE);
            self.g_score.resize(size, f64::INFINITY);
            self.visited_tag.resize(size, 0);
        }
    }

    fn reset(&mut self) {
        self.current_tag += 1;
        if self.current_tag == 0 {
            self.visited_tag.fill(0);
            self.current_tag = 1;
        }
    }

    fn visit(&mut self, idx: u32, g: f64, parent: u32, edge: u32) {
        let i = idx as usize;
        self.g_score[i] = g;
        self.parents[i] = parent;
        self.parent_edge[i] = edge;
        self.visited_tag[i] = self.current_tag;
    }

    fn score(&self, idx: u32) -> f64 {
        if self.visited_tag[idx as usize] == self.current_tag {
            self.g_score[idx as usize]
        } else {
            f64::INFINITY
        }
    }

    /// Cheapest path from the center of `from` to the center of any cell in
    /// `targets`, honoring closed edges and infinite costs. `None` when no
    /// target is reachable.
    pub fn find_path(
        &mut self,
        grid: &GridGraph,
        from: CellId,
        targets: &HashSet<CellId>,
    ) -> Option<PathResult> {
        if targets.is_empty() {
            return None;
        }

        self.ensure_capacity(grid.num_cells() * NODES_PER_CELL);
        self.reset();

        let h = |cell: CellId| -> f64 {
            targets
                .iter()
                .map(|&t| grid.heuristic(cell, t))
                .fold(f64::INFINITY, f64::min)
        };

        let goal_ids: HashSet<u32> = targets
            .iter()
            .map(|&t| encode(GridNodeRef::Center(t)))
            .collect();

        let start = encode(GridNodeRef::Center(from));
        self.visit(start, 0.0, NONE, NONE);

        let mut heap = BinaryHeap::new();
        heap.push(State {
            f: h(from),
            g: 0.0,
            node: start,
        });

        while let Some(State { g, node, .. }) = heap.pop() {
            if g > self.score(node) {
                continue;
            }
            if goal_ids.contains(&node) {
                return Some(self.reconstruct(grid, from, node, g));
            }

            let node_ref = decode(node);
            let push = |solver: &mut Self,
                            heap: &mut BinaryHeap<State>,
                            next: GridNodeRef,
                            edge: EdgeId,
                            cost: f64| {
                let next_id = encode(next);
                let tentative = g + cost;
                if tentative < solver.score(next_id) {
                    solver.visit(next_id, tentative, node, edge.index() as u32);
                    heap.push(State {
                        f: tentative + h(next.cell()),
                        g: tentative,
                        node: next_id,
                    });
                }
            };

            match node_ref {
                GridNodeRef::Center(c) => {
                    for d in Dir::all() {
                        let e = grid.cell(c).sink_edge(d);
                        if grid.edge(e).is_blocked() {
                            continue;
                        }
                        push(
                            self,
                            &mut heap,
                            GridNodeRef::Port(c, d),
                            e,
                            grid.edge(e).cost(),
                        );
                    }
                }
                GridNodeRef::Port(c, d) => {
                    // leave through the center sink
                    let sink = grid.cell(c).sink_edge(d);
                    if !grid.edge(sink).is_blocked() {
                        push(
                            self,
                            &mut heap,
                            GridNodeRef::Center(c),
                            sink,
                            grid.edge(sink).cost(),
                        );
                    }

                    // cross into the neighbouring cell
                    if let Some(e) = grid.cell(c).traversal_edge(d)
                        && !grid.edge(e).is_blocked()
                        && let Some(neigh) = grid.neighbour_of(c, d)
                    {
                        push(
                            self,
                            &mut heap,
                            GridNodeRef::Port(neigh, d.opposite()),
                            e,
                            grid.edge(e).cost(),
                        );
                    }

                    // turn inside the cell
                    for d2 in Dir::all() {
                        if d2 == d {
                            continue;
                        }
                        let Some(e) = grid.cell(c).bend_edge(d, d2) else {
                            continue;
                        };
                        if grid.edge(e).is_blocked() {
                            continue;
                        }
                        push(
                            self,
                            &mut heap,
                            GridNodeRef::Port(c, d2),
                            e,
                            grid.edge(e).cost(),
                        );
                    }
                }
            }
        }

        None
    }

    fn reconstruct(&self, grid: &GridGraph, from: CellId, goal: u32, cost: f64) -> PathResult {
        let mut edge_ids = Vec::new();
        let mut curr = goal;
        loop {
            let e = self.parent_edge[curr as usize];
            let p = self.parents[curr as usize];
            if p == NONE {
                break;
            }
            if e != NONE {
                edge_ids.push(EdgeId::new(e as usize));
            }
            curr = p;
        }
        edge_ids.reverse();

        let mut cells = vec![from];
        let mut edges = Vec::new();
        for &e in &edge_ids {
            if let EdgeKind::Traversal { .. } = grid.edge(e).kind {
                let (a, b) = grid.traversal_cells(e).unwrap();
                let last = *cells.last().unwrap();
                cells.push(if a == last { b } else { a });
                edges.push(e);
            }
        }

        PathResult { cells, edges, cost }
    }
}

impl Default for AStar {
    fn default() -> Self {
        Self::new()
    }
}

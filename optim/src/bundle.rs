use metromap_common::define_index;
use metromap_common::geom::Point;
use metromap_common::graph::{CombEdgeId, CombGraph, LineId};

define_index!(OptNodeId);
define_index!(OptEdgeId);

/// One line slot holder inside a bundle segment. `relatives` lists the
/// original lines this (possibly collapsed) line stands for; penalty
/// weights scale with their count.
#[derive(Clone, Debug)]
pub struct OptLine {
    pub line: LineId,
    pub relatives: Vec<LineId>,
}

/// Reference from a bundle segment back to an underlying edge-trip-group of
/// the input graph.
#[derive(Clone, Debug)]
pub struct EtgRef {
    pub etg: CombEdgeId,
    pub order: usize,
    pub dir: bool,
    pub was_cut: bool,
}

/// A bundle segment: an ordered set of parallel line slots between two
/// junctions.
#[derive(Clone, Debug)]
pub struct OptEdge {
    pub from: OptNodeId,
    pub to: OptNodeId,
    pub lines: Vec<OptLine>,
    pub etgs: Vec<EtgRef>,
}

impl OptEdge {
    /// Number of parallel line slots.
    pub fn cardinality(&self) -> usize {
        self.lines.len()
    }

    pub fn has_line(&self, l: LineId) -> bool {
        self.lines.iter().any(|lo| lo.line == l)
    }

    pub fn line(&self, l: LineId) -> Option<&OptLine> {
        self.lines.iter().find(|lo| lo.line == l)
    }

    pub fn other_node(&self, n: OptNodeId) -> Option<OptNodeId> {
        if self.from == n {
            Some(self.to)
        } else if self.to == n {
            Some(self.from)
        } else {
            None
        }
    }
}

/// A junction of the bundle graph.
#[derive(Clone, Debug)]
pub struct OptNode {
    pub pos: Point<f64>,
    adj: Vec<OptEdgeId>,
}

impl OptNode {
    pub fn adj(&self) -> &[OptEdgeId] {
        &self.adj
    }
}

/// The bundled graph the line-ordering program runs on.
#[derive(Clone, Debug, Default)]
pub struct OptGraph {
    nodes: Vec<OptNode>,
    edges: Vec<OptEdge>,
}

impl OptGraph {
    /// One-to-one construction from the input graph: every comb node becomes
    /// a junction, every comb edge a bundle segment whose slots are its
    /// lines, each standing only for itself.
    pub fn from_comb(comb: &CombGraph) -> Self {
        let mut og = OptGraph::default();
        for n in comb.node_ids() {
            og.nodes.push(OptNode {
                pos: comb.node(n).pos,
                adj: Vec::new(),
            });
        }
        for e in comb.edge_ids() {
            let edge = comb.edge(e);
            let id = OptEdgeId::new(og.edges.len());
            og.edges.push(OptEdge {
                from: OptNodeId::new(edge.from.index()),
                to: OptNodeId::new(edge.to.index()),
                lines: edge
                    .lines
                    .iter()
                    .map(|&l| OptLine {
                        line: l,
                        relatives: vec![l],
                    })
                    .collect(),
                etgs: vec![EtgRef {
                    etg: e,
                    order: 0,
                    dir: true,
                    was_cut: false,
                }],
            });
            og.nodes[edge.from.index()].adj.push(id);
            og.nodes[edge.to.index()].adj.push(id);
        }
        og
    }

    pub fn node(&self, id: OptNodeId) -> &OptNode {
        &self.nodes[id.index()]
    }

    pub fn edge(&self, id: OptEdgeId) -> &OptEdge {
        &self.edges[id.index()]
    }

    pub fn num_nodes(&self) -> usize {
        self.nodes.len()
    }

    pub fn num_edges(&self) -> usize {
        self.edges.len()
    }

    pub fn node_ids(&self) -> impl Iterator<Item = OptNodeId> + '_ {
        (0..self.nodes.len()).map(OptNodeId::new)
    }

    /// Distinct line pairs of segment `a` that interact with at least one
    /// neighbouring segment: the pair continues together into a partner, or
    /// diverges into a partner pair.
    pub fn line_pairs(&self, a: OptEdgeId) -> Vec<(LineId, LineId)> {
        let edge = self.edge(a);
        let mut pairs = Vec::new();
        for i in 0..edge.lines.len() {
            for j in (i + 1)..edge.lines.len() {
                let pair = (edge.lines[i].line, edge.lines[j].line);
                let relevant = [edge.from, edge.to].iter().any(|&n| {
                    !self.edge_partners(n, a, pair).is_empty()
                        || !self.edge_partner_pairs(n, a, pair).is_empty()
                });
                if relevant {
                    pairs.push(pair);
                }
            }
        }
        pairs
    }

    /// Segments at `n`, other than `a`, that carry both lines of the pair.
    pub fn edge_partners(
        &self,
        n: OptNodeId,
        a: OptEdgeId,
        pair: (LineId, LineId),
    ) -> Vec<OptEdgeId> {
        self.node(n)
            .adj()
            .iter()
            .copied()
            .filter(|&b| b != a && self.edge(b).has_line(pair.0) && self.edge(b).has_line(pair.1))
            .collect()
    }

    /// Segment pairs (b, c) at `n` into which the line pair of `a` diverges:
    /// b continues the first line only, c the second line only.
    pub fn edge_partner_pairs(
        &self,
        n: OptNodeId,
        a: OptEdgeId,
        pair: (LineId, LineId),
    ) -> Vec<(OptEdgeId, OptEdgeId)> {
        let mut ret = Vec::new();
        for &b in self.node(n).adj() {
            if b == a || !self.edge(b).has_line(pair.0) || self.edge(b).has_line(pair.1) {
                continue;
            }
            for &c in self.node(n).adj() {
                if c == a || c == b || !self.edge(c).has_line(pair.1) || self.edge(c).has_line(pair.0)
                {
                    continue;
                }
                ret.push((b, c));
            }
        }
        ret
    }

    /// Connected components of the bundle graph, as node sets. Components
    /// share no segments and can be ordered independently.
    pub fn components(&self) -> Vec<Vec<OptNodeId>> {
        let mut seen = vec![false; self.nodes.len()];
        let mut comps = Vec::new();
        for start in 0..self.nodes.len() {
            if seen[start] {
                continue;
            }
            let mut comp = Vec::new();
            let mut queue = std::collections::VecDeque::from([OptNodeId::new(start)]);
            seen[start] = true;
            while let Some(n) = queue.pop_front() {
                comp.push(n);
                for &e in self.node(n).adj() {
                    let other = self.edge(e).other_node(n).unwrap();
                    if !seen[other.index()] {
                        seen[other.index()] = true;
                        queue.push_back(other);
                    }
                }
            }
            comps.push(comp);
        }
        comps
    }

    /// Slot position inside the cross-section of `e`, counted left to right
    /// when traveling towards `n`. Slots are stored left to right in the
    /// segment's canonical from-to direction.
    fn pos_towards(&self, e: OptEdgeId, n: OptNodeId, p: usize) -> usize {
        let edge = self.edge(e);
        if edge.to == n {
            p
        } else {
            edge.cardinality() - 1 - p
        }
    }

    /// Slot position counted left to right when traveling away from `n`.
    fn pos_away(&self, e: OptEdgeId, n: OptNodeId, p: usize) -> usize {
        let edge = self.edge(e);
        if edge.from == n {
            p
        } else {
            edge.cardinality() - 1 - p
        }
    }

    /// Whether two lines that continue from `a` into `b` across junction `n`
    /// cross, given their slots in both segments: travel through the
    /// junction preserves left-right order, so a flipped relative order is a
    /// crossing.
    pub fn crosses_same_seg(
        &self,
        n: OptNodeId,
        a: OptEdgeId,
        b: OptEdgeId,
        pos_a: (usize, usize),
        pos_b: (usize, usize),
    ) -> bool {
        let order_in = self.pos_towards(a, n, pos_a.0) < self.pos_towards(a, n, pos_b.0);
        let order_out = self.pos_away(b, n, pos_a.1) < self.pos_away(b, n, pos_b.1);
        order_in != order_out
    }

    /// Whether two lines that diverge at `n` from `a` into the distinct
    /// segments `b` and `c` cross each other right at the junction: the line
    /// on the left must leave through the more leftward (counter-clockwise)
    /// segment.
    pub fn crosses_diff_seg(
        &self,
        n: OptNodeId,
        a: OptEdgeId,
        (b, c): (OptEdgeId, OptEdgeId),
        positions: (usize, usize),
    ) -> bool {
        let first_is_left =
            self.pos_towards(a, n, positions.0) < self.pos_towards(a, n, positions.1);

        // heading when arriving at n through a
        let a_other = self.edge(a).other_node(n).unwrap();
        let heading = self.node(a_other).pos.angle_to(&self.node(n).pos);

        let turn = |seg: OptEdgeId| -> f64 {
            let other = self.edge(seg).other_node(n).unwrap();
            let out = self.node(n).pos.angle_to(&self.node(other).pos);
            // signed turn in (-pi, pi], positive turns left
            let mut t = out - heading;
            while t <= -std::f64::consts::PI {
                t += std::f64::consts::TAU;
            }
            while t > std::f64::consts::PI {
                t -= std::f64::consts::TAU;
            }
            t
        };

        let b_more_left = turn(b) > turn(c);
        first_is_left != b_more_left
    }
}

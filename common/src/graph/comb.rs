use super::indices::{CombEdgeId, CombNodeId, LineId};
use super::ordering::EdgeOrdering;
use crate::geom::Point;
use serde::{Deserialize, Serialize};

/// A transit line (a route identity shared by several inter-stop links).
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct LineData {
    pub label: String,
}

/// A stop in the input graph.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct CombNode {
    pub pos: Point<f64>,
    pub label: String,
    adj: Vec<CombEdgeId>,
    ordering: EdgeOrdering,
}

impl CombNode {
    pub fn adj(&self) -> &[CombEdgeId] {
        &self.adj
    }

    pub fn degree(&self) -> usize {
        self.adj.len()
    }

    pub fn ordering(&self) -> &EdgeOrdering {
        &self.ordering
    }
}

/// An inter-stop link, carrying the set of lines traversing it.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct CombEdge {
    pub from: CombNodeId,
    pub to: CombNodeId,
    pub lines: Vec<LineId>,
}

impl CombEdge {
    /// The endpoint that is not `n`. `None` if `n` is not an endpoint.
    pub fn other_end(&self, n: CombNodeId) -> Option<CombNodeId> {
        if self.from == n {
            Some(self.to)
        } else if self.to == n {
            Some(self.from)
        } else {
            None
        }
    }
}

/// The planar input graph of transit stops and inter-stop links.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct CombGraph {
    nodes: Vec<CombNode>,
    edges: Vec<CombEdge>,
    lines: Vec<LineData>,
}

impl CombGraph {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_node(&mut self, pos: Point<f64>, label: impl Into<String>) -> CombNodeId {
        let id = CombNodeId::new(self.nodes.len());
        self.nodes.push(CombNode {
            pos,
            label: label.into(),
            adj: Vec::new(),
            ordering: EdgeOrdering::default(),
        });
        id
    }

    pub fn add_line(&mut self, label: impl Into<String>) -> LineId {
        let id = LineId::new(self.lines.len());
        self.lines.push(LineData {
            label: label.into(),
        });
        id
    }

    pub fn add_edge(&mut self, from: CombNodeId, to: CombNodeId, lines: Vec<LineId>) -> CombEdgeId {
        let id = CombEdgeId::new(self.edges.len());
        self.edges.push(CombEdge { from, to, lines });
        self.nodes[from.index()].adj.push(id);
        self.nodes[to.index()].adj.push(id);
        id
    }

    pub fn node(&self, id: CombNodeId) -> &CombNode {
        &self.nodes[id.index()]
    }

    pub fn edge(&self, id: CombEdgeId) -> &CombEdge {
        &self.edges[id.index()]
    }

    pub fn line(&self, id: LineId) -> &LineData {
        &self.lines[id.index()]
    }

    pub fn num_nodes(&self) -> usize {
        self.nodes.len()
    }

    pub fn num_edges(&self) -> usize {
        self.edges.len()
    }

    pub fn num_lines(&self) -> usize {
        self.lines.len()
    }

    pub fn node_ids(&self) -> impl Iterator<Item = CombNodeId> + '_ {
        (0..self.nodes.len()).map(CombNodeId::new)
    }

    pub fn edge_ids(&self) -> impl Iterator<Item = CombEdgeId> + '_ {
        (0..self.edges.len()).map(CombEdgeId::new)
    }

    /// Position of `line` in the edge's line list, the slot reference frame
    /// used by the ordering output.
    pub fn line_pos(&self, e: CombEdgeId, line: LineId) -> Option<usize> {
        self.edges[e.index()].lines.iter().position(|&l| l == line)
    }

    /// Geometric length of an edge.
    pub fn edge_len(&self, e: CombEdgeId) -> f64 {
        let edge = &self.edges[e.index()];
        self.nodes[edge.from.index()]
            .pos
            .dist(&self.nodes[edge.to.index()].pos)
    }

    /// Recomputes every node's cyclic edge ordering from the geographic
    /// bearing of each incident edge, clockwise starting at north.
    pub fn build_orderings(&mut self) {
        for i in 0..self.nodes.len() {
            let id = CombNodeId::new(i);
            let pos = self.nodes[i].pos;
            let mut incident: Vec<(f64, CombEdgeId)> = self.nodes[i]
                .adj
                .iter()
                .map(|&e| {
                    let other = self.edges[e.index()].other_end(id).unwrap();
                    let ang = pos.angle_to(&self.nodes[other.index()].pos);
                    // clockwise angle from north
                    let cw = (std::f64::consts::FRAC_PI_2 - ang)
                        .rem_euclid(std::f64::consts::TAU);
                    (cw, e)
                })
                .collect();
            incident.sort_by(|a, b| a.0.total_cmp(&b.0));
            self.nodes[i].ordering =
                EdgeOrdering::new(incident.into_iter().map(|(_, e)| e).collect());
        }
    }
}

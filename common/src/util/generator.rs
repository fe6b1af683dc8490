use crate::geom::Point;
use crate::graph::{CombGraph, CombNodeId, LineId};
use rand::Rng;
use rand::seq::SliceRandom;

const STATION_SPACING: f64 = 300.0;

/// Generates a random benchmark comb graph: stations with a minimum mutual
/// spacing, non-crossing links to nearby stations, and transit lines laid
/// over the links as random walks.
pub fn generate_comb(num_stations: usize, num_lines: usize) -> CombGraph {
    let mut rng = rand::thread_rng();
    let mut g = CombGraph::new();

    let side = STATION_SPACING * (num_stations as f64).sqrt() * 1.5;

    log::info!(
        "Generating benchmark: {} stations, {} lines, extent {:.0}x{:.0}",
        num_stations,
        num_lines,
        side,
        side
    );

    let mut positions: Vec<Point<f64>> = Vec::with_capacity(num_stations);
    let mut attempts = 0;
    while positions.len() < num_stations && attempts < num_stations * 200 {
        attempts += 1;
        let p = Point::new(rng.gen_range(0.0..side), rng.gen_range(0.0..side));
        if positions.iter().all(|q| q.dist(&p) >= STATION_SPACING) {
            positions.push(p);
        }
    }

    for (i, &p) in positions.iter().enumerate() {
        g.add_node(p, format!("st{}", i));
    }
    if positions.len() < 2 {
        return g;
    }

    // Link each station to its nearest neighbours, skipping links that would
    // cross an existing one.
    let mut segments: Vec<(Point<f64>, Point<f64>)> = Vec::new();
    let mut linked: Vec<(usize, usize)> = Vec::new();
    for i in 0..positions.len() {
        let mut others: Vec<usize> = (0..positions.len()).filter(|&j| j != i).collect();
        others.sort_by(|&a, &b| {
            positions[i]
                .dist(&positions[a])
                .total_cmp(&positions[i].dist(&positions[b]))
        });

        for &j in others.iter().take(3) {
            let key = (i.min(j), i.max(j));
            if linked.contains(&key) {
                continue;
            }
            let seg = (positions[i], positions[j]);
            if segments
                .iter()
                .any(|s| segments_cross(s.0, s.1, seg.0, seg.1))
            {
                continue;
            }
            segments.push(seg);
            linked.push(key);
        }
    }

    // Lay lines over the links as random walks, then materialize the edges
    // with the union of lines that use them.
    let line_ids: Vec<LineId> = (0..num_lines.max(1))
        .map(|i| g.add_line(format!("L{}", i + 1)))
        .collect();

    let mut adj: Vec<Vec<usize>> = vec![Vec::new(); positions.len()];
    for (k, &(i, j)) in linked.iter().enumerate() {
        adj[i].push(k);
        adj[j].push(k);
    }

    let mut edge_lines: Vec<Vec<LineId>> = vec![Vec::new(); linked.len()];
    for &line in &line_ids {
        let mut at = rng.gen_range(0..positions.len());
        let steps = rng.gen_range(3..=8);
        let mut last_edge = usize::MAX;
        for _ in 0..steps {
            let Some(&k) = adj[at].choose(&mut rng) else {
                break;
            };
            if k == last_edge {
                continue;
            }
            if !edge_lines[k].contains(&line) {
                edge_lines[k].push(line);
            }
            let (i, j) = linked[k];
            at = if at == i { j } else { i };
            last_edge = k;
        }
    }

    for (k, &(i, j)) in linked.iter().enumerate() {
        let mut lines = std::mem::take(&mut edge_lines[k]);
        if lines.is_empty() {
            // every link carries at least one line
            lines.push(*line_ids.choose(&mut rng).unwrap());
        }
        lines.sort();
        g.add_edge(CombNodeId::new(i), CombNodeId::new(j), lines);
    }

    g.build_orderings();
    log::info!(
        "Benchmark graph: {} stations, {} links, {} lines",
        g.num_nodes(),
        g.num_edges(),
        g.num_lines()
    );
    g
}

fn segments_cross(a1: Point<f64>, a2: Point<f64>, b1: Point<f64>, b2: Point<f64>) -> bool {
    // shared endpoints do not count as crossings
    for (p, q) in [(a1, b1), (a1, b2), (a2, b1), (a2, b2)] {
        if p.dist(&q) < 1e-9 {
            return false;
        }
    }
    let o = |p: Point<f64>, q: Point<f64>, r: Point<f64>| -> f64 {
        (q.y - p.y) * (r.x - q.x) - (q.x - p.x) * (r.y - q.y)
    };
    let d1 = o(a1, a2, b1);
    let d2 = o(a1, a2, b2);
    let d3 = o(b1, b2, a1);
    let d4 = o(b1, b2, a2);
    (d1 * d2 < 0.0) && (d3 * d4 < 0.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generated_graph_is_connected_enough() {
        let g = generate_comb(12, 3);
        assert_eq!(g.num_nodes(), 12);
        assert!(g.num_edges() >= g.num_nodes() / 2);
        for e in g.edge_ids() {
            assert!(!g.edge(e).lines.is_empty());
        }
        for n in g.node_ids() {
            assert_eq!(g.node(n).ordering().len(), g.node(n).degree());
        }
    }

    #[test]
    fn crossing_test_detects_proper_intersections() {
        let p = |x, y| Point::new(x, y);
        assert!(segments_cross(
            p(0.0, 0.0),
            p(2.0, 2.0),
            p(0.0, 2.0),
            p(2.0, 0.0)
        ));
        assert!(!segments_cross(
            p(0.0, 0.0),
            p(1.0, 0.0),
            p(0.0, 1.0),
            p(1.0, 1.0)
        ));
        // sharing an endpoint is not a crossing
        assert!(!segments_cross(
            p(0.0, 0.0),
            p(1.0, 1.0),
            p(0.0, 0.0),
            p(1.0, 0.0)
        ));
    }
}

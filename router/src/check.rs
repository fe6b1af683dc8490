use crate::gridgraph::{Dir, EdgeId, GridGraph};
use crate::octilinearizer::RoutedLayout;
use metromap_common::graph::{CombEdgeId, CombGraph};
use std::collections::HashMap;

/// Verifies a routed layout against the grid: corridor contiguity,
/// reservation bookkeeping, endpoint settlement, and the no-crossing rule
/// for diagonal corridors.
pub fn run(grid: &GridGraph, comb: &CombGraph, layout: &RoutedLayout) -> Result<(), String> {
    log::info!("Starting layout verification...");
    let mut msgs = Vec::new();

    let mut used: HashMap<EdgeId, CombEdgeId> = HashMap::new();

    for e in comb.edge_ids() {
        let Some(path) = layout.path(e) else { continue };

        if path.cells.len() != path.edges.len() + 1 {
            msgs.push(format!(
                "edge {:?}: {} cells do not match {} grid hops",
                e,
                path.cells.len(),
                path.edges.len()
            ));
            continue;
        }

        for (w, &ge) in path.cells.windows(2).zip(&path.edges) {
            match grid.inter_cell_edge(w[0], w[1]) {
                Some(expect) if expect == ge => {}
                _ => {
                    msgs.push(format!(
                        "edge {:?}: corridor step {:?} -> {:?} is not a grid neighbour hop",
                        e, w[0], w[1]
                    ));
                }
            }

            if !grid.edge(ge).reserved().contains(&e) {
                msgs.push(format!(
                    "edge {:?}: grid edge {:?} lacks its reservation",
                    e, ge
                ));
            }

            if let Some(&other) = used.get(&ge) {
                msgs.push(format!(
                    "grid edge {:?} is used by both {:?} and {:?}",
                    ge, other, e
                ));
            }
            used.insert(ge, e);
        }

        let (u, v) = (comb.edge(e).from, comb.edge(e).to);
        let ends = (path.cells.first().copied(), path.cells.last().copied());
        if grid.settled(u) != ends.0 && grid.settled(u) != ends.1 {
            msgs.push(format!("edge {:?}: endpoint {:?} is not settled on the corridor", e, u));
        }
        if grid.settled(v) != ends.0 && grid.settled(v) != ends.1 {
            msgs.push(format!("edge {:?}: endpoint {:?} is not settled on the corridor", e, v));
        }
    }

    // no two diagonal corridors may cut through the same cell corner
    for e in comb.edge_ids() {
        let Some(path) = layout.path(e) else { continue };
        for w in path.cells.windows(2) {
            let (ax, ay) = grid.cell(w[0]).xy();
            let (bx, by) = grid.cell(w[1]).xy();
            let Some(d) = Dir::from_offset(bx as i64 - ax as i64, by as i64 - ay as i64) else {
                continue;
            };
            if !d.is_diagonal() {
                continue;
            }
            let na = grid.neighbour(ax, ay, d.rotate(7));
            let nb = grid.neighbour(ax, ay, d.rotate(1));
            if let (Some(na), Some(nb)) = (na, nb)
                && let Some(cross) = grid.inter_cell_edge(na, nb)
                && used.contains_key(&cross)
            {
                msgs.push(format!(
                    "edge {:?}: diagonal hop at ({},{}) crosses corridor on edge {:?}",
                    e, ax, ay, cross
                ));
            }
        }
    }

    if msgs.is_empty() {
        log::info!("\x1b[32mPASS\x1b[0m: layout is consistent.");
        Ok(())
    } else {
        for m in &msgs {
            log::error!("FAIL: {}", m);
        }
        Err(msgs.join("; "))
    }
}

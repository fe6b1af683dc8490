use super::node_cost::{NodeCost, is_close};
use super::{CellId, Dir, GridGraph};
use metromap_common::graph::{CombEdgeId, CombGraph, CombNodeId};

impl GridGraph {
    /// Snapshot of which outgoing directions of `n` are already taken:
    /// for each direction, one comb edge reserving the traversal edge there,
    /// if any.
    pub fn settled_outgoing(&self, n: CellId) -> [Option<CombEdgeId>; 8] {
        let mut outgoing = [None; 8];
        for d in Dir::all() {
            if let Some(e) = self.cell(n).traversal_edge(d) {
                outgoing[d.index()] = self.edge(e).reserved().first().copied();
            }
        }
        outgoing
    }

    /// Soft repulsion keeping the incident edges of `orig` spread around the
    /// grid node at their ideal angular distance, plus hard blocks on the
    /// directions already taken and their immediate cyclic windows.
    ///
    /// `e` must appear in the node's edge ordering; if it does not, the
    /// penalty degenerates to zero and a warning is logged.
    pub fn spacing_penalty(
        &self,
        n: CellId,
        comb: &CombGraph,
        orig: CombNodeId,
        e: CombEdgeId,
    ) -> NodeCost {
        let mut add_c = NodeCost::zero();

        let deg = comb.node(orig).degree() as i64;
        if deg == 0 {
            return add_c;
        }
        let optim_distance = 8 / deg - 1;

        let ordering = comb.node(orig).ordering();
        if !ordering.has(e) {
            log::warn!(
                "spacing penalty for edge {:?} at node {:?}, but the edge is not in the node's ordering",
                e,
                orig
            );
            return add_c;
        }

        let outgoing = self.settled_outgoing(n);

        for i in 0..8i64 {
            let Some(f) = outgoing[i as usize] else {
                continue;
            };
            if f == e {
                continue;
            }

            // edges that would sit between f and e, clockwise and
            // counter-clockwise around the comb node
            let (Some(cw), Some(ccw)) = (ordering.dist(f, e), ordering.dist(e, f)) else {
                continue;
            };
            let d_cw = cw as i64 - 1;
            let d_ccw = ccw as i64 - 1;

            // ideal angular offsets for e relative to slot i, given the
            // total number of incident edges
            let dd = ((2 * d_cw + 1).rem_euclid(8) * optim_distance).rem_euclid(8);
            let ddd = (6 - dd).rem_euclid(8);

            let pen = self.penalties().p_45 * 2.0 - 1.0;

            if dd != 0 {
                for j in 1..=dd + 1 {
                    let slot = Dir::new(((i + j).rem_euclid(8)) as usize).unwrap();
                    if add_c.is_closed(slot) {
                        continue;
                    }
                    add_c.add(slot, pen * (1.0 - (j - 1) as f64 / dd as f64));
                }
            }

            if ddd != 0 {
                for j in 1..=ddd + 1 {
                    let slot = Dir::new(((i + 8 - j).rem_euclid(8)) as usize).unwrap();
                    if add_c.is_closed(slot) {
                        continue;
                    }
                    add_c.add(slot, pen * (1.0 - (j - 1) as f64 / ddd as f64));
                }
            }

            add_c.close(Dir::new(i as usize).unwrap());
            for j in 1..=d_cw {
                add_c.close(Dir::new(((i + j).rem_euclid(8)) as usize).unwrap());
            }
            for j in 1..=d_ccw {
                add_c.close(Dir::new(((i + 8 - j).rem_euclid(8)) as usize).unwrap());
            }
        }

        add_c
    }

    /// Closes every grid direction whose use would violate the cyclic order
    /// of the already-settled edges around the comb node: if two settled
    /// edges bracket a sector that `e` does not belong into, all slots
    /// strictly between them are blocked.
    pub fn topo_block_penalty(
        &self,
        n: CellId,
        comb: &CombGraph,
        orig: CombNodeId,
        e: CombEdgeId,
    ) -> NodeCost {
        let mut add_c = NodeCost::zero();
        let ordering = comb.node(orig).ordering();
        let outgoing = self.settled_outgoing(n);

        for i in 0..8usize {
            let Some(fi) = outgoing[i] else {
                continue;
            };

            for j in (i + 1)..(i + 8) {
                let Some(fj) = outgoing[j % 8] else {
                    continue;
                };
                if fj == fi {
                    break;
                }

                let (Some(da), Some(db)) = (ordering.dist(fi, e), ordering.dist(fj, e)) else {
                    continue;
                };

                if db < da {
                    // e does not belong in the clockwise sector (i, j)
                    for x in (i + 1)..j {
                        add_c.close(Dir::new(x % 8).unwrap());
                    }
                }
            }
        }

        add_c
    }

    /// Soft preference for grid directions close to the geographic bearing
    /// towards the edge's other endpoint.
    pub fn bearing_penalty(
        &self,
        comb: &CombGraph,
        orig: CombNodeId,
        e: CombEdgeId,
    ) -> NodeCost {
        let mut ret = NodeCost::zero();
        let Some(other) = comb.edge(e).other_end(orig) else {
            return ret;
        };

        let ang = comb.node(orig).pos.angle_to(&comb.node(other).pos);

        let mut deg = (-ang.to_degrees()) as i64;
        if deg < 0 {
            deg += 360;
        }
        deg = (deg + 90) % 360;

        for i in 0..8i64 {
            let diff = (deg - 45 * i).abs().min(360 - (deg - 45 * i).abs());
            ret.add(Dir::new(i as usize).unwrap(), 0.1 * diff as f64);
        }
        ret
    }

    /// The full penalty vector for routing `e` through grid node `n`, which
    /// currently stands for comb node `orig`.
    pub fn node_penalties(
        &self,
        n: CellId,
        comb: &CombGraph,
        orig: CombNodeId,
        e: CombEdgeId,
    ) -> NodeCost {
        self.spacing_penalty(n, comb, orig, e)
            + self.topo_block_penalty(n, comb, orig, e)
            + self.bearing_penalty(comb, orig, e)
    }

    /// Applies a cost vector around `n` and returns the inverse vector that
    /// undoes it. Close-sentinel slots close the traversal edge and its far
    /// neighbour; if the edge is already closed nothing is changed and the
    /// inverse slot stays zero, so the undo will not reopen foreign state.
    /// The far neighbour cannot already be closed in the branch that closes
    /// it: that would imply this edge was closed too.
    pub fn apply_cost_vector(&mut self, n: CellId, add_c: &NodeCost) -> NodeCost {
        let mut inv = NodeCost::zero();

        for d in Dir::all() {
            let Some(neigh) = self.neighbour_of(n, d) else {
                continue;
            };
            let Some(e) = self.cell(n).traversal_edge(d) else {
                continue;
            };

            let v = add_c.get(d);
            if v == 0.0 {
                continue;
            }

            if is_close(v) {
                if self.edge(e).is_closed() {
                    inv.set(d, 0.0);
                } else {
                    self.edge_mut(e).set_closed(true);
                    self.close_node(neigh);
                    inv.set(d, v);
                }
            } else {
                let cost = self.edge(e).cost();
                self.set_edge_cost(e, cost + v);
                inv.set(d, v);
            }
        }

        inv
    }

    /// Undoes a previously applied cost vector. Must be called with the
    /// inverse returned by `apply_cost_vector`, in LIFO order relative to
    /// other applications around the same search.
    pub fn unapply_cost_vector(&mut self, n: CellId, inv: &NodeCost) {
        for d in Dir::all() {
            let Some(neigh) = self.neighbour_of(n, d) else {
                continue;
            };
            let Some(e) = self.cell(n).traversal_edge(d) else {
                continue;
            };

            let v = inv.get(d);
            if v == 0.0 {
                continue;
            }

            if is_close(v) {
                self.edge_mut(e).set_closed(false);
                self.open_node(neigh);
            } else {
                let cost = self.edge(e).cost();
                self.set_edge_cost(e, cost - v);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use metromap_common::geom::{Point, Rect};
    use metromap_common::util::config::Penalties;

    fn grid(w: usize, h: usize) -> GridGraph {
        let bbox = Rect::new(
            Point::new(0.0, 0.0),
            Point::new((w - 1) as f64, (h - 1) as f64),
        );
        GridGraph::new(bbox, 1.0, 0.25, Penalties::default()).unwrap()
    }

    fn d(i: usize) -> Dir {
        Dir::new(i).unwrap()
    }

    /// Comb star: center at the world position of grid cell (cx, cy), with
    /// neighbours in the given compass offsets (unit world steps).
    fn star(
        center: Point<f64>,
        arms: &[(f64, f64)],
    ) -> (CombGraph, CombNodeId, Vec<CombEdgeId>) {
        let mut comb = CombGraph::new();
        let u = comb.add_node(center, "u");
        let l = comb.add_line("1");
        let mut edges = Vec::new();
        for (i, &(dx, dy)) in arms.iter().enumerate() {
            let v = comb.add_node(Point::new(center.x + dx, center.y + dy), format!("v{}", i));
            edges.push(comb.add_edge(u, v, vec![l]));
        }
        comb.build_orderings();
        (comb, u, edges)
    }

    #[test]
    fn apply_unapply_round_trip() {
        let mut g = grid(3, 3);
        let n = g.node(1, 1).unwrap();

        let before: Vec<(f64, bool)> = Dir::all()
            .map(|dir| {
                let e = g.cell(n).traversal_edge(dir).unwrap();
                (g.edge(e).cost(), g.edge(e).is_closed())
            })
            .collect();

        let mut add_c = NodeCost::zero();
        add_c.set(d(0), 0.5);
        add_c.set(d(2), 1.0);
        add_c.close(d(4));

        let inv = g.apply_cost_vector(n, &add_c);

        let e0 = g.cell(n).traversal_edge(d(0)).unwrap();
        let e2 = g.cell(n).traversal_edge(d(2)).unwrap();
        let e4 = g.cell(n).traversal_edge(d(4)).unwrap();
        assert_eq!(g.edge(e0).cost(), before[0].0 + 0.5);
        assert_eq!(g.edge(e2).cost(), before[2].0 + 1.0);
        assert!(g.edge(e4).is_closed());
        // the far neighbour of the closed direction is closed alongside
        let s = g.node(1, 0).unwrap();
        assert!(g.cell(s).is_closed());

        g.unapply_cost_vector(n, &inv);

        for (dir, (cost, closed)) in Dir::all().zip(before) {
            let e = g.cell(n).traversal_edge(dir).unwrap();
            assert_eq!(g.edge(e).cost(), cost);
            assert_eq!(g.edge(e).is_closed(), closed);
        }
        assert!(!g.cell(s).is_closed());
    }

    #[test]
    fn apply_on_already_closed_edge_records_no_undo() {
        let mut g = grid(3, 3);
        let n = g.node(1, 1).unwrap();
        let e4 = g.cell(n).traversal_edge(d(4)).unwrap();

        // close the south edge out of band first
        let s = g.node(1, 0).unwrap();
        g.close_node(s);
        assert!(g.edge(e4).is_closed());

        let mut add_c = NodeCost::zero();
        add_c.close(d(4));
        let inv = g.apply_cost_vector(n, &add_c);
        assert_eq!(inv.get(d(4)), 0.0);

        g.unapply_cost_vector(n, &inv);
        // the out-of-band closure survives the undo
        assert!(g.edge(e4).is_closed());
        assert!(g.cell(s).is_closed());
    }

    #[test]
    fn settled_outgoing_reports_reserved_directions() {
        let mut g = grid(3, 3);
        let n = g.node(1, 1).unwrap();
        let ce = CombEdgeId::new(3);
        let e = g.cell(n).traversal_edge(d(2)).unwrap();
        g.reserve(e, ce);

        let outgoing = g.settled_outgoing(n);
        assert_eq!(outgoing[2], Some(ce));
        assert!(outgoing.iter().enumerate().all(|(i, o)| i == 2 || o.is_none()));
    }

    #[test]
    fn spacing_penalty_prefers_the_free_quadrant() {
        let mut g = grid(5, 5);
        let n = g.node(2, 2).unwrap();
        let center = g.cell(n).pos();

        // four comb edges ordered N, E, S, W; the first three already
        // settled at grid directions 0, 2 and 4
        let (comb, u, edges) = star(center, &[(0.0, 1.0), (1.0, 0.0), (0.0, -1.0), (-1.0, 0.0)]);
        for (dir, &ce) in [0usize, 2, 4].iter().zip(&edges[..3]) {
            let e = g.cell(n).traversal_edge(d(*dir)).unwrap();
            g.reserve(e, ce);
        }

        let pen = g.spacing_penalty(n, &comb, u, edges[3]);

        // the taken directions and the sectors between them are blocked
        for i in [0usize, 2, 4] {
            assert!(pen.is_closed(d(i)), "direction {} should be closed", i);
        }
        // direction 6, at 90 degrees from both free-side neighbours, is the
        // unique soft minimum among the open slots
        assert!(!pen.is_closed(d(6)));
        assert!(pen.get(d(6)) < pen.get(d(5)));
        assert!(pen.get(d(6)) < pen.get(d(7)));
    }

    #[test]
    fn spacing_penalty_without_ordering_membership_is_zero() {
        let g = grid(3, 3);
        let n = g.node(1, 1).unwrap();
        let (mut comb, u, _) = star(Point::new(1.0, 1.0), &[(0.0, 1.0)]);
        // an edge that exists in the graph but not at u
        let a = comb.add_node(Point::new(5.0, 5.0), "a");
        let b = comb.add_node(Point::new(6.0, 5.0), "b");
        let l = comb.add_line("x");
        let foreign = comb.add_edge(a, b, vec![l]);

        let pen = g.spacing_penalty(n, &comb, u, foreign);
        assert!(pen.is_zero());
    }

    #[test]
    fn topo_block_closes_out_of_order_sectors() {
        let mut g = grid(5, 5);
        let n = g.node(2, 2).unwrap();
        let center = g.cell(n).pos();

        // three comb edges ordered e0, e1, e2 clockwise; settle e0 at grid
        // direction 0 and e1 at direction 4. Routing e2 between them
        // (directions 1..3) would contradict the cyclic order, because from
        // e0 the order demands e1 before e2 clockwise.
        let (comb, u, edges) =
            star(center, &[(0.0, 1.0), (1.0, -1.0), (-1.0, -1.0)]);
        let e0 = g.cell(n).traversal_edge(d(0)).unwrap();
        let e4 = g.cell(n).traversal_edge(d(4)).unwrap();
        g.reserve(e0, edges[0]);
        g.reserve(e4, edges[1]);

        let pen = g.topo_block_penalty(n, &comb, u, edges[2]);
        for i in 1..4 {
            assert!(pen.is_closed(d(i)), "slot {} should be blocked", i);
        }
        assert!(!pen.is_closed(d(6)));
        assert!(!pen.is_closed(d(7)));
    }

    #[test]
    fn bearing_penalty_is_cheapest_towards_the_target() {
        let g = grid(3, 3);
        let (comb, u, edges) = star(Point::new(1.0, 1.0), &[(0.0, 1.0)]);

        let pen = g.bearing_penalty(&comb, u, edges[0]);
        assert_eq!(pen.get(d(0)), 0.0);
        // directly away from the target costs the most
        assert!((pen.get(d(4)) - 18.0).abs() < 1e-9);
        for i in [1usize, 2, 3, 5, 6, 7] {
            assert!(pen.get(d(i)) > 0.0);
            assert!(pen.get(d(i)) < pen.get(d(4)) + 1e-9);
        }
    }
}

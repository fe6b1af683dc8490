use crate::bundle::{OptEdgeId, OptGraph, OptNodeId};
use crate::error::OptimError;
use good_lp::{
    Expression, ProblemVariables, Solution, SolverModel, Variable, constraint, variable,
};
use metromap_common::graph::{CombEdgeId, CombGraph, LineId};
use metromap_common::util::config::OrderingConfig;
use metromap_common::util::profiler::ScopedTimer;
use serde::Serialize;
use std::collections::{BTreeMap, HashMap, HashSet};

/// Ordered line positions per underlying edge-trip-group and order index:
/// the final product of the line-ordering solve, consumed by rendering.
#[derive(Clone, Debug, Default, Serialize)]
pub struct OrderConfig {
    entries: HashMap<CombEdgeId, BTreeMap<usize, Vec<usize>>>,
}

impl OrderConfig {
    pub fn prepend(&mut self, etg: CombEdgeId, order: usize, pos: usize) {
        self.entries
            .entry(etg)
            .or_default()
            .entry(order)
            .or_default()
            .insert(0, pos);
    }

    pub fn append(&mut self, etg: CombEdgeId, order: usize, pos: usize) {
        self.entries
            .entry(etg)
            .or_default()
            .entry(order)
            .or_default()
            .push(pos);
    }

    pub fn positions(&self, etg: CombEdgeId, order: usize) -> Option<&[usize]> {
        self.entries
            .get(&etg)
            .and_then(|m| m.get(&order))
            .map(|v| v.as_slice())
    }

    pub fn merge(&mut self, other: OrderConfig) {
        for (etg, orders) in other.entries {
            for (order, mut positions) in orders {
                self.entries
                    .entry(etg)
                    .or_default()
                    .entry(order)
                    .or_default()
                    .append(&mut positions);
            }
        }
    }

    pub fn iter(
        &self,
    ) -> impl Iterator<Item = (CombEdgeId, usize, &[usize])> + '_ {
        self.entries.iter().flat_map(|(&etg, orders)| {
            orders
                .iter()
                .map(move |(&order, positions)| (etg, order, positions.as_slice()))
        })
    }
}

/// Solves the slot assignment for one connected component of the bundle
/// graph as a mixed-integer program: binary slot variables per
/// (segment, line, position), slot-exclusive and line-unique assignment
/// rows, and crossing indicator variables that the objective penalizes.
pub fn solve_component(
    og: &OptGraph,
    comb: &CombGraph,
    comp: &[OptNodeId],
    cfg: &OrderingConfig,
) -> Result<OrderConfig, OptimError> {
    let timer = ScopedTimer::new("ilp component solve");

    let mut comp_edges: Vec<OptEdgeId> = comp
        .iter()
        .flat_map(|&n| og.node(n).adj().iter().copied())
        .collect::<HashSet<_>>()
        .into_iter()
        .collect();
    comp_edges.sort();

    let mut vars = ProblemVariables::new();
    let mut constraints = Vec::new();
    let mut objective: Expression = 0.into();

    // x(s, l, p) = 1 iff line l occupies slot p of segment s
    let mut x: HashMap<(OptEdgeId, LineId, usize), Variable> = HashMap::new();
    for &e in &comp_edges {
        let edge = og.edge(e);
        for lo in &edge.lines {
            for p in 0..edge.cardinality() {
                x.insert((e, lo.line, p), vars.add(variable().binary()));
            }
        }
    }

    for &e in &comp_edges {
        let edge = og.edge(e);

        // every slot holds exactly one line
        for p in 0..edge.cardinality() {
            let mut sum: Expression = 0.into();
            for lo in &edge.lines {
                sum += x[&(e, lo.line, p)];
            }
            constraints.push(constraint!(sum == 1));
        }

        // every line occupies exactly one slot
        for lo in &edge.lines {
            let mut sum: Expression = 0.into();
            for p in 0..edge.cardinality() {
                sum += x[&(e, lo.line, p)];
            }
            constraints.push(constraint!(sum == 1));
        }
    }

    // crossing indicators at every junction
    let mut num_decs = 0usize;
    for &node in comp {
        let mut processed: HashSet<OptEdgeId> = HashSet::new();
        for &seg_a in og.node(node).adj() {
            processed.insert(seg_a);

            for pair in og.line_pairs(seg_a) {
                let weight = (og.edge(seg_a).line(pair.0).map_or(1, |l| l.relatives.len())
                    * og.edge(seg_a).line(pair.1).map_or(1, |l| l.relatives.len()))
                    as f64;

                // both lines continue together into segment b
                for seg_b in og.edge_partners(node, seg_a, pair) {
                    if processed.contains(&seg_b) {
                        continue;
                    }

                    let dec = vars.add(variable().binary());
                    num_decs += 1;
                    objective += dec * (cfg.same_seg_penalty as f64 * weight);

                    let card_a = og.edge(seg_a).cardinality();
                    let card_b = og.edge(seg_b).cardinality();
                    for pa in 0..card_a {
                        for pb in 0..card_a {
                            if pa == pb {
                                continue;
                            }
                            for pa2 in 0..card_b {
                                for pb2 in 0..card_b {
                                    if pa2 == pb2 {
                                        continue;
                                    }
                                    if !og.crosses_same_seg(node, seg_a, seg_b, (pa, pa2), (pb, pb2))
                                    {
                                        continue;
                                    }
                                    // if all four slots are taken, dec is
                                    // forced to 1
                                    let lhs = x[&(seg_a, pair.0, pa)]
                                        + x[&(seg_b, pair.0, pa2)]
                                        + x[&(seg_a, pair.1, pb)]
                                        + x[&(seg_b, pair.1, pb2)]
                                        - dec;
                                    constraints.push(constraint!(lhs <= 3));
                                }
                            }
                        }
                    }
                }

                // the lines diverge into two different segments
                for (seg_b, seg_c) in og.edge_partner_pairs(node, seg_a, pair) {
                    let dec = vars.add(variable().binary());
                    num_decs += 1;
                    objective += dec * (cfg.diff_seg_penalty as f64 * weight);

                    let card_a = og.edge(seg_a).cardinality();
                    for pa in 0..card_a {
                        for pb in 0..card_a {
                            if pa == pb {
                                continue;
                            }
                            if !og.crosses_diff_seg(node, seg_a, (seg_b, seg_c), (pa, pb)) {
                                continue;
                            }
                            let lhs = x[&(seg_a, pair.0, pa)] + x[&(seg_a, pair.1, pb)] - dec;
                            constraints.push(constraint!(lhs <= 1));
                        }
                    }
                }
            }
        }
    }

    log::debug!(
        "ilp component: {} segments, {} vars, {} rows, {} crossing indicators",
        comp_edges.len(),
        x.len() + num_decs,
        constraints.len(),
        num_decs
    );

    let mut model = vars
        .minimise(objective)
        .using(good_lp::solvers::coin_cbc::coin_cbc);
    model.set_parameter("seconds", &cfg.solver_seconds.to_string());
    model.set_parameter("logLevel", "0");

    for c in constraints {
        model.add_constraint(c);
    }

    let solution = model
        .solve()
        .map_err(|e| OptimError::Unsolvable(format!("{:?}", e)))?;

    log::info!("ILP component solved in {} ms", timer.elapsed_ms());

    extract(og, comb, &comp_edges, &x, &solution)
}

/// Reads the slot assignment back out of the solved model and translates it
/// into per-etg line positions. Segments traversed against their reference
/// direction insert at the front instead of the back.
fn extract(
    og: &OptGraph,
    comb: &CombGraph,
    comp_edges: &[OptEdgeId],
    x: &HashMap<(OptEdgeId, LineId, usize), Variable>,
    solution: &impl Solution,
) -> Result<OrderConfig, OptimError> {
    let mut hc = OrderConfig::default();

    for &e in comp_edges {
        let edge = og.edge(e);
        let Some(front) = edge.etgs.first() else {
            continue;
        };

        for etgp in &edge.etgs {
            if etgp.was_cut {
                continue;
            }
            for p in 0..edge.cardinality() {
                let mut found = false;
                for lo in &edge.lines {
                    if solution.value(x[&(e, lo.line, p)]) < 0.5 {
                        continue;
                    }
                    if found {
                        return Err(OptimError::Inconsistent(format!(
                            "two lines assigned to slot {} of segment {:?}",
                            p, e
                        )));
                    }
                    found = true;

                    for &rel in &lo.relatives {
                        let pos = comb.line_pos(etgp.etg, rel).ok_or_else(|| {
                            OptimError::Inconsistent(format!(
                                "line {:?} missing from etg {:?}",
                                rel, etgp.etg
                            ))
                        })?;
                        if !(etgp.dir ^ front.dir) {
                            hc.prepend(etgp.etg, etgp.order, pos);
                        } else {
                            hc.append(etgp.etg, etgp.order, pos);
                        }
                    }
                }
                if !found {
                    return Err(OptimError::Inconsistent(format!(
                        "no line assigned to slot {} of segment {:?}",
                        p, e
                    )));
                }
            }
        }
    }

    Ok(hc)
}

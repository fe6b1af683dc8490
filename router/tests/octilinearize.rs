use metromap_common::geom::Point;
use metromap_common::graph::CombGraph;
use metromap_common::util::config::{GridConfig, Penalties};
use metromap_common::util::generator;
use metromap_router::{check, octilinearize};

fn config() -> GridConfig {
    GridConfig {
        cell_size: 1.0,
        spacer: 0.25,
        candidate_radius: 2.0,
        route_attempts: 3,
        penalties: Penalties {
            vertical_pen: 1.0,
            horizontal_pen: 1.0,
            diagonal_pen: 1.4,
            p_0: 0.0,
            p_135: 1.0,
            p_90: 2.0,
            p_45: 3.0,
        },
    }
}

#[test]
fn straight_corridor_routes_along_the_axis() {
    let mut comb = CombGraph::new();
    let a = comb.add_node(Point::new(0.0, 0.0), "a");
    let b = comb.add_node(Point::new(3.0, 0.0), "b");
    let l = comb.add_line("1");
    let e = comb.add_edge(a, b, vec![l]);
    comb.build_orderings();

    let (grid, layout) = octilinearize(&comb, &config()).unwrap();

    let path = layout.path(e).unwrap();
    assert_eq!(path.edges.len(), 3);
    // three east traversals at cost 1, two straight pass-through bends at
    // p_45 - p_135 = 2 each
    assert!((path.cost - 7.0).abs() < 1e-9);

    check::run(&grid, &comb, &layout).unwrap();
}

#[test]
fn star_junction_spreads_arms_and_shares_the_center() {
    let mut comb = CombGraph::new();
    let m = comb.add_node(Point::new(0.0, 0.0), "m");
    let arms = [
        comb.add_node(Point::new(0.0, 3.0), "n"),
        comb.add_node(Point::new(3.0, 0.0), "e"),
        comb.add_node(Point::new(0.0, -3.0), "s"),
        comb.add_node(Point::new(-3.0, 0.0), "w"),
    ];
    let l = comb.add_line("1");
    let edges: Vec<_> = arms.iter().map(|&v| comb.add_edge(m, v, vec![l])).collect();
    comb.build_orderings();

    let (grid, layout) = octilinearize(&comb, &config()).unwrap();

    let center = grid.settled(m).expect("hub is settled");
    for &e in &edges {
        let path = layout.path(e).expect("arm routed");
        assert!(
            path.cells.first() == Some(&center) || path.cells.last() == Some(&center),
            "arm does not touch the settled hub"
        );
    }

    // the four arms leave the hub through four distinct directions
    let mut first_hops: Vec<_> = edges
        .iter()
        .map(|&e| {
            let p = layout.path(e).unwrap();
            if p.cells[0] == center {
                p.cells[1]
            } else {
                p.cells[p.cells.len() - 2]
            }
        })
        .collect();
    first_hops.sort();
    first_hops.dedup();
    assert_eq!(first_hops.len(), 4);

    check::run(&grid, &comb, &layout).unwrap();
}

#[test]
fn triangle_cycle_routes_without_conflicts() {
    let mut comb = CombGraph::new();
    let a = comb.add_node(Point::new(0.0, 0.0), "a");
    let b = comb.add_node(Point::new(4.0, 0.0), "b");
    let c = comb.add_node(Point::new(2.0, 3.0), "c");
    let l1 = comb.add_line("1");
    let l2 = comb.add_line("2");
    comb.add_edge(a, b, vec![l1, l2]);
    comb.add_edge(b, c, vec![l1]);
    comb.add_edge(c, a, vec![l2]);
    comb.build_orderings();

    let (grid, layout) = octilinearize(&comb, &config()).unwrap();
    assert_eq!(layout.routed_count(), 3);
    check::run(&grid, &comb, &layout).unwrap();
}

#[test]
fn generated_benchmark_stays_consistent() {
    let comb = generator::generate_comb(10, 3);
    let cfg = GridConfig {
        cell_size: 150.0,
        spacer: 37.5,
        candidate_radius: 2.0,
        route_attempts: 3,
        penalties: Penalties::default(),
    };

    let (grid, layout) = octilinearize(&comb, &cfg).unwrap();

    // whatever was routed must be internally consistent
    check::run(&grid, &comb, &layout).unwrap();
    assert!(layout.routed_count() * 2 >= comb.num_edges());
}

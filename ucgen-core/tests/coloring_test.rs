//! Unit tests for the Γ₁ two-colouring and the split tree

use rand::rngs::StdRng;
use rand::SeedableRng;

use ucgen_core::compiler::gamma::gamma2::{color_gamma2, random_gamma2, Gamma2};
use ucgen_core::compiler::hybrid::HybridChoice;

/// Multiset of the edges of a Γ₂ graph, as (from, to) pairs.
fn gamma2_edges(g: &Gamma2) -> Vec<(usize, usize)> {
    let mut edges = Vec::new();
    for (i, node) in g.nodes.iter().enumerate() {
        for child in [node.left, node.right].into_iter().flatten() {
            edges.push((i, child));
        }
    }
    edges.sort();
    edges
}

#[test]
fn test_partition_covers_every_edge() {
    let mut rng = StdRng::seed_from_u64(23);
    for n in [6usize, 17, 32, 65, 100] {
        let g = random_gamma2(n, &mut rng);
        let expected = gamma2_edges(&g);
        let (first, second) = color_gamma2(&g, 0).expect("colouring");

        let mut colored = Vec::new();
        for gamma1 in [&first, &second] {
            for (i, node) in gamma1.nodes.iter().enumerate() {
                if let Some(child) = node.child {
                    colored.push((i, child));
                }
            }
        }
        colored.sort();
        assert_eq!(expected, colored, "n = {}", n);
    }
}

#[test]
fn test_each_colouring_has_degree_one()
{
    let mut rng = StdRng::seed_from_u64(29);
    for n in [9usize, 24, 50] {
        let g = random_gamma2(n, &mut rng);
        let (first, second) = color_gamma2(&g, 0).expect("colouring");
        for gamma1 in [&first, &second] {
            // Degree bounds hold by construction of the node slots; check
            // the parent/child references agree.
            for (i, node) in gamma1.nodes.iter().enumerate() {
                if let Some(child) = node.child {
                    assert_eq!(gamma1.nodes[child].parent, Some(i));
                }
                if let Some(parent) = node.parent {
                    assert_eq!(gamma1.nodes[parent].child, Some(i));
                }
            }
        }
    }
}

#[test]
fn test_odd_parity_trims_the_first_colouring() {
    // A simple path alternates colours edge by edge, so for odd lengths
    // the colouring without the last in-edge ends on a parent-less node.
    for n in [5usize, 9, 13, 21] {
        let mut g = Gamma2::new(n);
        for i in 0..n - 1 {
            g.add_edge(i, i + 1);
        }
        let (first, second) = color_gamma2(&g, n).expect("colouring");
        // The parent-less leftover of the larger colouring is dropped.
        assert_eq!(first.len(), n - 1, "n = {}", n);
        assert_eq!(second.len(), n, "n = {}", n);
        // All edges still covered.
        let total: usize = [&first, &second]
            .iter()
            .map(|g1| g1.nodes.iter().filter(|nd| nd.child.is_some()).count())
            .sum();
        assert_eq!(total, g.edge_count());
    }
}

#[test]
fn test_parallel_duplicate_edges_split() {
    // Two edges between the same pair of nodes must take one colour each.
    let mut g = Gamma2::new(2);
    g.add_edge(0, 1);
    g.add_edge(0, 1);
    let (first, second) = color_gamma2(&g, 0).expect("colouring");
    assert_eq!(first.nodes[0].child, Some(1));
    assert_eq!(second.nodes[0].child, Some(1));
}

#[test]
fn test_parity_sweep_is_idempotent() {
    let mut rng = StdRng::seed_from_u64(37);
    for n in [12usize, 27, 60] {
        for k in [2u32, 4] {
            let choice = HybridChoice::build(n, false);
            let mut g = random_gamma2(n, &mut rng);
            g.create_subgraphs(0, true, k == 4, false, &choice)
                .expect("split tree");
            g.check_subgraphs();
            let once = format!("{:?}", g);
            g.check_subgraphs();
            let twice = format!("{:?}", g);
            assert_eq!(once, twice, "n = {}, k = {}", n, k);
        }
    }
}

#[test]
fn test_split_tree_small_odd_graph() {
    // Five nodes: the colourings have sizes 5 and the sub-graphs absorb
    // the parity leftovers without losing edges.
    let mut rng = StdRng::seed_from_u64(41);
    let choice = HybridChoice::build(5, false);
    let mut g = random_gamma2(5, &mut rng);
    let edges = g.edge_count();
    g.create_subgraphs(0, true, false, false, &choice)
        .expect("split tree");
    g.check_subgraphs();

    let left = g.gamma1_left.as_ref().expect("left colouring");
    let right = g.gamma1_right.as_ref().expect("right colouring");
    let colored: usize = [left, right]
        .iter()
        .map(|g1| g1.nodes.iter().filter(|nd| nd.child.is_some()).count())
        .sum();
    assert_eq!(colored, edges);
}

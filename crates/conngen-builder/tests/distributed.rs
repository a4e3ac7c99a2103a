//! Multi-rank runs simulated with one kernel per rank
//!
//! Every rank is configured identically apart from its rank number and
//! creates the same nodes; the union of the ranks' edges is the global graph.

use conngen_builder::{connect, connect_tripartite, ConnSpec, TripartiteSynSpecs};
use conngen_kernel::{KernelConfig, MemoryKernel, NodeCollection, NodeRegistry};

use std::collections::HashMap;

const SEED: u64 = 12_345;

fn ranks(num_processes: usize, threads: usize, nodes: usize) -> (Vec<MemoryKernel>, NodeCollection) {
    let mut collection = NodeCollection::empty();
    let kernels = (0..num_processes)
        .map(|rank| {
            let config = KernelConfig::default()
                .with_threads(threads)
                .with_processes(num_processes, rank)
                .with_seed(SEED);
            let mut kernel = MemoryKernel::new(config).unwrap();
            collection = kernel.create_neurons(nodes).unwrap();
            kernel
        })
        .collect();
    (kernels, collection)
}

fn union(kernels: &[MemoryKernel]) -> Vec<(u64, u64)> {
    let mut edges: Vec<(u64, u64)> = kernels
        .iter()
        .flat_map(|k| k.edges())
        .map(|e| (e.source.raw(), e.target.raw()))
        .collect();
    edges.sort_unstable();
    edges
}

fn connect_all(kernels: &[MemoryKernel], nodes: &NodeCollection, spec: &ConnSpec) {
    for kernel in kernels {
        connect(kernel, nodes, nodes, spec, &[]).unwrap();
    }
}

#[test]
fn every_edge_is_stored_on_exactly_one_rank() {
    let (kernels, nodes) = ranks(2, 2, 12);
    connect_all(&kernels, &nodes, &ConnSpec::all_to_all());

    assert!(kernels.iter().all(|k| k.num_edges() > 0));
    let edges = union(&kernels);
    assert_eq!(edges.len(), 144);
    let mut distinct = edges.clone();
    distinct.dedup();
    assert_eq!(distinct.len(), edges.len());
}

#[test]
fn one_to_one_across_ranks() {
    let (kernels, nodes) = ranks(3, 2, 12);
    connect_all(&kernels, &nodes, &ConnSpec::one_to_one());

    let expected: Vec<(u64, u64)> = (1..=12).map(|i| (i, i)).collect();
    assert_eq!(union(&kernels), expected);
}

#[test]
fn fixed_total_number_across_ranks() {
    let (kernels, nodes) = ranks(2, 3, 20);
    connect_all(&kernels, &nodes, &ConnSpec::fixed_total_number(50));

    assert_eq!(union(&kernels).len(), 50);
}

#[test]
fn fixed_indegree_across_ranks() {
    let (kernels, nodes) = ranks(2, 2, 12);
    connect_all(&kernels, &nodes, &ConnSpec::fixed_indegree(3).with_multapses(false));

    let mut degrees: HashMap<u64, usize> = HashMap::new();
    for (_, target) in union(&kernels) {
        *degrees.entry(target).or_insert(0) += 1;
    }
    assert_eq!(degrees.len(), 12);
    assert!(degrees.values().all(|&d| d == 3));
}

#[test]
fn fixed_outdegree_matches_single_rank_graph() {
    let spec = ConnSpec::fixed_outdegree(4).with_autapses(false);

    let (single, nodes) = ranks(1, 1, 12);
    connect_all(&single, &nodes, &spec);

    let (kernels, nodes) = ranks(2, 2, 12);
    connect_all(&kernels, &nodes, &spec);

    let edges = union(&kernels);
    assert_eq!(edges.len(), 48);
    assert_eq!(edges, union(&single));
}

#[test]
fn symmetric_bernoulli_matches_single_rank_graph() {
    let spec = ConnSpec::symmetric_pairwise_bernoulli(0.25)
        .with_autapses(false)
        .with_symmetric(true);

    let (single, nodes) = ranks(1, 1, 14);
    connect_all(&single, &nodes, &spec);

    let (kernels, nodes) = ranks(2, 3, 14);
    connect_all(&kernels, &nodes, &spec);

    let edges = union(&kernels);
    assert_eq!(edges, union(&single));
    for &(s, t) in &edges {
        assert!(edges.binary_search(&(t, s)).is_ok(), "edge {} -> {} not mirrored", s, t);
    }
}

#[test]
fn tripartite_matches_single_rank_graph() {
    let spec = ConnSpec::tripartite_bernoulli_with_pool(0.6, 0.5);
    let run = |num_processes: usize, threads: usize| {
        let kernels: Vec<MemoryKernel> = (0..num_processes)
            .map(|rank| {
                let config = KernelConfig::default()
                    .with_threads(threads)
                    .with_processes(num_processes, rank)
                    .with_seed(SEED);
                let mut kernel = MemoryKernel::new(config).unwrap();
                let sources = kernel.create_neurons(5).unwrap();
                let targets = kernel.create_neurons(6).unwrap();
                let third = kernel.create_neurons(3).unwrap();
                connect_tripartite(
                    &kernel,
                    &sources,
                    &targets,
                    &third,
                    &spec,
                    &TripartiteSynSpecs::default(),
                )
                .unwrap();
                kernel
            })
            .collect();
        union(&kernels)
    };

    assert_eq!(run(2, 2), run(1, 1));
}

#[test]
fn nodes_are_local_to_one_rank_only() {
    let (kernels, nodes) = ranks(2, 2, 8);
    for node in &nodes {
        let owners = kernels
            .iter()
            .filter(|k| k.is_local_node_id(node))
            .count();
        assert_eq!(owners, 1, "node {} owned by {} ranks", node, owners);
    }
}

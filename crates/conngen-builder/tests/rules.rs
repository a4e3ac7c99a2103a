//! Edge counts and parameter placement for the two-population rules

use conngen_builder::{connect, ConnError, ConnSpec, Distribution, NodeExpression, SynSpec};
use conngen_kernel::{Kernel, KernelConfig, MemoryKernel, NodeCollection, NodeId, RngExt};

use std::collections::{BTreeSet, HashMap, HashSet};
use std::sync::Arc;

fn kernel(threads: usize) -> MemoryKernel {
    MemoryKernel::new(KernelConfig::default().with_threads(threads)).unwrap()
}

fn in_degrees(kernel: &MemoryKernel) -> HashMap<NodeId, usize> {
    let mut counts = HashMap::new();
    for edge in kernel.edges() {
        *counts.entry(edge.target).or_insert(0) += 1;
    }
    counts
}

fn out_degrees(kernel: &MemoryKernel) -> HashMap<NodeId, usize> {
    let mut counts = HashMap::new();
    for edge in kernel.edges() {
        *counts.entry(edge.source).or_insert(0) += 1;
    }
    counts
}

#[test]
fn one_to_one_pairs_by_position() {
    let mut kernel = kernel(2);
    let sources = kernel.create_neurons(3).unwrap();
    let targets = kernel.create_neurons(3).unwrap();

    connect(&kernel, &sources, &targets, &ConnSpec::one_to_one(), &[]).unwrap();

    let pairs: Vec<(u64, u64)> = kernel
        .edges()
        .iter()
        .map(|e| (e.source.raw(), e.target.raw()))
        .collect();
    assert_eq!(pairs, vec![(1, 4), (2, 5), (3, 6)]);
}

#[test]
fn one_to_one_without_autapses_on_same_population() {
    let mut kernel = kernel(3);
    let nodes = kernel.create_neurons(6).unwrap();

    connect(&kernel, &nodes, &nodes, &ConnSpec::one_to_one().with_autapses(false), &[]).unwrap();
    assert_eq!(kernel.num_edges(), 0);

    connect(&kernel, &nodes, &nodes, &ConnSpec::one_to_one(), &[]).unwrap();
    assert_eq!(kernel.num_edges(), 6);
}

#[test]
fn one_to_one_weight_array_follows_pair_order() {
    let mut kernel = kernel(3);
    let sources = kernel.create_neurons(3).unwrap();
    let targets = kernel.create_neurons(3).unwrap();

    let syn = SynSpec::default().with_weight(vec![0.5, 1.5, 2.5]);
    connect(&kernel, &sources, &targets, &ConnSpec::one_to_one(), &[syn]).unwrap();

    let weights: Vec<f64> = kernel.edges().iter().map(|e| e.weight).collect();
    assert_eq!(weights, vec![0.5, 1.5, 2.5]);
}

#[test]
fn one_to_one_onto_devices_stores_each_edge_once() {
    let mut kernel = kernel(2);
    let neurons = kernel.create_neurons(3).unwrap();
    let devices = kernel.create_devices(3).unwrap();

    connect(&kernel, &neurons, &devices, &ConnSpec::one_to_one(), &[]).unwrap();
    assert_eq!(kernel.num_edges(), 3);
}

#[test]
fn all_to_all_counts() {
    let mut kernel = kernel(3);
    let nodes = kernel.create_neurons(5).unwrap();

    connect(&kernel, &nodes, &nodes, &ConnSpec::all_to_all(), &[]).unwrap();
    assert_eq!(kernel.num_edges(), 25);

    kernel.clear_edges();
    connect(&kernel, &nodes, &nodes, &ConnSpec::all_to_all().with_autapses(false), &[]).unwrap();
    assert_eq!(kernel.num_edges(), 20);
    assert!(kernel.edges().iter().all(|e| e.source != e.target));
}

#[test]
fn all_to_all_weight_array_is_target_major() {
    let mut kernel = kernel(2);
    let sources = kernel.create_neurons(2).unwrap();
    let targets = kernel.create_neurons(3).unwrap();

    let weights: Vec<f64> = (0..6).map(f64::from).collect();
    let syn = SynSpec::default().with_weight(weights);
    connect(&kernel, &sources, &targets, &ConnSpec::all_to_all(), &[syn]).unwrap();

    assert_eq!(kernel.num_edges(), 6);
    for (t, target) in targets.iter().enumerate() {
        for (s, source) in sources.iter().enumerate() {
            let edges = kernel.connections(source, target);
            assert_eq!(edges.len(), 1);
            assert_eq!(edges[0].weight, (t * 2 + s) as f64);
        }
    }
}

#[test]
fn all_to_all_with_several_synapse_specs() {
    let mut kernel = kernel(2);
    let nodes = kernel.create_neurons(3).unwrap();
    let specs = [
        SynSpec::default().with_weight(1.0),
        SynSpec::new("stdp_synapse").with_weight(2.0).with_param("tau_plus", 15.0),
    ];

    connect(&kernel, &nodes, &nodes, &ConnSpec::all_to_all(), &specs).unwrap();
    assert_eq!(kernel.num_edges(), 18);

    let stdp = kernel
        .edges()
        .into_iter()
        .filter(|e| e.weight == 2.0)
        .collect::<Vec<_>>();
    assert_eq!(stdp.len(), 9);
    assert!(stdp.iter().all(|e| e.params.get("tau_plus").map(|v| v.as_f64()) == Some(15.0)));
}

#[test]
fn fixed_indegree_gives_every_target_the_same_degree() {
    let mut kernel = kernel(2);
    let nodes = kernel.create_neurons(10).unwrap();
    let spec = ConnSpec::fixed_indegree(3).with_autapses(false).with_multapses(false);

    connect(&kernel, &nodes, &nodes, &spec, &[]).unwrap();

    let degrees = in_degrees(&kernel);
    assert_eq!(degrees.len(), 10);
    assert!(degrees.values().all(|&d| d == 3));

    let edges = kernel.edges();
    let distinct: HashSet<(NodeId, NodeId)> = edges.iter().map(|e| (e.source, e.target)).collect();
    assert_eq!(distinct.len(), edges.len());
    assert!(edges.iter().all(|e| e.source != e.target));
}

#[test]
fn fixed_indegree_validation() {
    let mut kernel = kernel(1);
    let nodes = kernel.create_neurons(4).unwrap();

    let err = connect(&kernel, &nodes, &nodes, &ConnSpec::fixed_indegree(-1), &[]).unwrap_err();
    assert_eq!(err, ConnError::bad_property("Indegree cannot be less than zero."));

    let spec = ConnSpec::fixed_indegree(5).with_multapses(false);
    let err = connect(&kernel, &nodes, &nodes, &spec, &[]).unwrap_err();
    assert!(matches!(err, ConnError::BadProperty { .. }), "unexpected error: {}", err);

    let err = connect(
        &kernel,
        &NodeCollection::empty(),
        &nodes,
        &ConnSpec::fixed_indegree(1),
        &[],
    )
    .unwrap_err();
    assert_eq!(err, ConnError::bad_property("Source array must not be empty."));
    assert_eq!(kernel.num_edges(), 0);
}

#[test]
fn fixed_outdegree_gives_every_source_the_same_degree() {
    let mut kernel = kernel(3);
    let sources = kernel.create_neurons(4).unwrap();
    let targets = kernel.create_neurons(8).unwrap();
    let spec = ConnSpec::fixed_outdegree(5).with_multapses(false);

    connect(&kernel, &sources, &targets, &spec, &[]).unwrap();

    let degrees = out_degrees(&kernel);
    assert_eq!(degrees.len(), 4);
    assert!(degrees.values().all(|&d| d == 5));
    assert!(kernel.edges().iter().all(|e| targets.contains(e.target)));
}

#[test]
fn one_to_one_on_id_lists() {
    for threads in 1..=3 {
        let mut kernel = kernel(threads);
        kernel.create_neurons(30).unwrap();
        let sources = NodeCollection::from_ids([1u64, 2, 3]).unwrap();
        let targets = NodeCollection::from_ids([10u64, 20, 30]).unwrap();

        connect(&kernel, &sources, &targets, &ConnSpec::one_to_one(), &[]).unwrap();

        let mut pairs: Vec<(u64, u64)> = kernel
            .edges()
            .iter()
            .map(|e| (e.source.raw(), e.target.raw()))
            .collect();
        pairs.sort_unstable();
        assert_eq!(pairs, vec![(1, 10), (2, 20), (3, 30)], "threads: {}", threads);
    }
}

#[test]
fn fixed_outdegree_on_id_lists() {
    let graphs: Vec<BTreeSet<(u64, u64)>> = (1..=3)
        .map(|threads| {
            let mut kernel = kernel(threads);
            kernel.create_neurons(30).unwrap();
            let sources = NodeCollection::from_ids([1u64, 2]).unwrap();
            let targets = NodeCollection::from_ids([10u64, 20, 30]).unwrap();
            let spec = ConnSpec::fixed_outdegree(2).with_multapses(false);

            connect(&kernel, &sources, &targets, &spec, &[]).unwrap();

            let edges = kernel.edges();
            assert_eq!(edges.len(), 4);
            assert!(edges.iter().all(|e| targets.contains(e.target)));
            let degrees = out_degrees(&kernel);
            assert!(degrees.values().all(|&d| d == 2));
            edges.iter().map(|e| (e.source.raw(), e.target.raw())).collect()
        })
        .collect();

    assert_eq!(graphs[0].len(), 4);
    assert_eq!(graphs[0], graphs[1]);
    assert_eq!(graphs[0], graphs[2]);
}

#[test]
fn fixed_outdegree_workers_may_use_the_rank_stream() {
    let mut kernel = kernel(2);
    let sources = kernel.create_neurons(3).unwrap();
    let targets = kernel.create_neurons(4).unwrap();
    let kernel = Arc::new(kernel);

    let shared = Arc::clone(&kernel);
    let weight = NodeExpression::new(move |_, _| 1.0 + shared.rngs().rank_synced().drand());
    let syn = SynSpec::default().with_weight(weight);
    connect(&*kernel, &sources, &targets, &ConnSpec::fixed_outdegree(2), &[syn]).unwrap();

    assert_eq!(kernel.num_edges(), 6);
    assert!(kernel.edges().iter().all(|e| (1.0..2.0).contains(&e.weight)));
}

#[test]
fn fixed_outdegree_empty_targets() {
    let mut kernel = kernel(1);
    let nodes = kernel.create_neurons(2).unwrap();
    let err = connect(
        &kernel,
        &nodes,
        &NodeCollection::empty(),
        &ConnSpec::fixed_outdegree(1),
        &[],
    )
    .unwrap_err();
    assert_eq!(err, ConnError::bad_property("Target array must not be empty."));
}

#[test]
fn fixed_total_number_is_exact() {
    let mut kernel = kernel(4);
    let sources = kernel.create_neurons(7).unwrap();
    let targets = kernel.create_neurons(9).unwrap();

    connect(&kernel, &sources, &targets, &ConnSpec::fixed_total_number(37), &[]).unwrap();

    let edges = kernel.edges();
    assert_eq!(edges.len(), 37);
    assert!(edges.iter().all(|e| sources.contains(e.source) && targets.contains(e.target)));
}

#[test]
fn fixed_total_number_validation() {
    let mut kernel = kernel(2);
    let nodes = kernel.create_neurons(3).unwrap();

    let err = connect(&kernel, &nodes, &nodes, &ConnSpec::fixed_total_number(-1), &[]).unwrap_err();
    assert_eq!(err, ConnError::bad_property("Total number of connections cannot be negative."));

    let spec = ConnSpec::fixed_total_number(10).with_multapses(false);
    let err = connect(&kernel, &nodes, &nodes, &spec, &[]).unwrap_err();
    assert!(matches!(err, ConnError::BadProperty { .. }), "unexpected error: {}", err);

    let spec = ConnSpec::fixed_total_number(4).with_multapses(false);
    let err = connect(&kernel, &nodes, &nodes, &spec, &[]).unwrap_err();
    assert!(matches!(err, ConnError::NotImplemented { .. }), "unexpected error: {}", err);
}

#[test]
fn pairwise_bernoulli_extremes() {
    let mut kernel = kernel(2);
    let nodes = kernel.create_neurons(6).unwrap();

    connect(&kernel, &nodes, &nodes, &ConnSpec::pairwise_bernoulli(0.0), &[]).unwrap();
    assert_eq!(kernel.num_edges(), 0);

    connect(&kernel, &nodes, &nodes, &ConnSpec::pairwise_bernoulli(1.0), &[]).unwrap();
    assert_eq!(kernel.num_edges(), 36);

    kernel.clear_edges();
    let spec = ConnSpec::pairwise_bernoulli(1.0).with_autapses(false);
    connect(&kernel, &nodes, &nodes, &spec, &[]).unwrap();
    assert_eq!(kernel.num_edges(), 30);
}

#[test]
fn pairwise_bernoulli_rejects_bad_probability() {
    let mut kernel = kernel(1);
    let nodes = kernel.create_neurons(2).unwrap();
    let err = connect(&kernel, &nodes, &nodes, &ConnSpec::pairwise_bernoulli(1.5), &[]).unwrap_err();
    assert_eq!(err, ConnError::bad_property("Connection probability 0 <= p <= 1 required."));
}

#[test]
fn random_weights_stay_in_range() {
    let mut kernel = kernel(2);
    let nodes = kernel.create_neurons(8).unwrap();
    let syn = SynSpec::default()
        .with_weight(Distribution::Uniform { min: 1.0, max: 2.0 })
        .with_delay(Distribution::Uniform { min: 1.0, max: 3.0 });

    connect(&kernel, &nodes, &nodes, &ConnSpec::all_to_all(), &[syn]).unwrap();

    let edges = kernel.edges();
    assert_eq!(edges.len(), 64);
    assert!(edges.iter().all(|e| (1.0..2.0).contains(&e.weight)));
    assert!(edges.iter().all(|e| (1.0..3.0).contains(&e.delay)));
}

#[test]
fn node_expression_sees_edge_endpoints() {
    let mut kernel = kernel(2);
    let sources = kernel.create_neurons(3).unwrap();
    let targets = kernel.create_neurons(3).unwrap();
    let weight = NodeExpression::new(|_, ctx| {
        let source = ctx.source.map_or(0.0, |n| n.raw() as f64);
        let target = ctx.node.map_or(0.0, |n| n.raw() as f64);
        target * 10.0 + source
    });

    let syn = SynSpec::default().with_weight(weight);
    connect(&kernel, &sources, &targets, &ConnSpec::all_to_all(), &[syn]).unwrap();

    for edge in kernel.edges() {
        assert_eq!(edge.weight, edge.target.raw() as f64 * 10.0 + edge.source.raw() as f64);
    }
}

#[test]
fn unknown_synapse_model_is_rejected_before_connecting() {
    let mut kernel = kernel(1);
    let nodes = kernel.create_neurons(2).unwrap();
    let err = connect(
        &kernel,
        &nodes,
        &nodes,
        &ConnSpec::all_to_all(),
        &[SynSpec::new("no_such_synapse")],
    )
    .unwrap_err();
    assert_eq!(
        err,
        ConnError::UnknownSynapseType {
            name: "no_such_synapse".to_string()
        }
    );
    assert_eq!(kernel.num_edges(), 0);
}

#[test]
fn homogeneous_weight_model_rejects_weight() {
    let mut kernel = kernel(1);
    let nodes = kernel.create_neurons(2).unwrap();
    let syn = SynSpec::new("static_synapse_hom_w").with_weight(2.0);
    let err = connect(&kernel, &nodes, &nodes, &ConnSpec::all_to_all(), &[syn]).unwrap_err();
    let msg = err.to_string();
    assert!(msg.contains("equal for all connections"), "unexpected error: {}", msg);
}

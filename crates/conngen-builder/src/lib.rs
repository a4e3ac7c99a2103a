//! Rule-based connection builders for distributed network simulation
//!
//! A builder takes a source and a target population, a connection spec
//! naming the rule and a list of synapse specs, and creates the edges on
//! the threads that own their targets. All threads draw from streams that
//! keep them in agreement, so the same seed yields the same graph whatever
//! the number of threads per rank.

#![deny(missing_docs)]
#![warn(clippy::all)]

// Re-export the kernel types that appear in the builder API
pub use conngen_kernel::{
    Kernel, KernelConfig, KernelError, MemoryKernel, NodeCollection, NodeHandle, NodeId,
    SynapseModelId,
};

// Core modules
mod base;
pub mod builder;
pub mod error;
pub mod param;
mod parallel;
mod rules;
pub mod spec;
pub mod structural;
pub mod tripartite;

// Re-export essential types
pub use base::BuilderCore;
pub use builder::{connect, disconnect, ConnBuilder};
pub use error::{ConnError, Result};
pub use param::{ConnParameter, Distribution, NodeExpression, ParamContext, ParamValue};
pub use spec::{ConnSpec, PoolType, RuleSpec, SynSpec, TripartiteSynSpecs};
pub use structural::SpBuilder;
pub use tripartite::{connect_tripartite, AuxiliaryBuilder, TripartiteBuilder};

/// Names of the available connection rules
pub const RULE_NAMES: [&str; 8] = [
    "one_to_one",
    "all_to_all",
    "fixed_indegree",
    "fixed_outdegree",
    "fixed_total_number",
    "pairwise_bernoulli",
    "symmetric_pairwise_bernoulli",
    "tripartite_bernoulli_with_pool",
];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_basic_integration() {
        let mut kernel = MemoryKernel::new(KernelConfig::default().with_threads(2)).unwrap();
        let nodes = kernel.create_neurons(5).unwrap();
        connect(&kernel, &nodes, &nodes, &ConnSpec::one_to_one(), &[]).unwrap();
        assert_eq!(kernel.num_edges(), 5);
        assert!(RULE_NAMES.contains(&ConnSpec::all_to_all().rule.name()));
    }
}

//! Connection builder for two populations

use crate::{
    base::BuilderCore,
    error::{ConnError, Result},
    rules::Rule,
    spec::{ConnSpec, SynSpec},
};
use conngen_kernel::{Kernel, NodeCollection, SynapseModelId};

pub(crate) const SYMMETRIC_MODEL_REQUIRED: &str = "Connections with this synapse model can only be created as \
one-to-one connections with \"make_symmetric\" set to true or as all-to-all connections with equal \
source and target populations and default or scalar parameters.";

/// Builds the edges of one connect call between a source and a target population
///
/// Construction validates every spec; nothing is written to the kernel
/// until [`connect`](Self::connect) or [`disconnect`](Self::disconnect).
///
/// # Example
///
/// ```
/// use conngen_builder::{ConnBuilder, ConnSpec, SynSpec};
/// use conngen_kernel::{KernelConfig, MemoryKernel};
///
/// let mut kernel = MemoryKernel::new(KernelConfig::default().with_threads(2)).unwrap();
/// let nodes = kernel.create_neurons(10).unwrap();
///
/// let mut builder = ConnBuilder::new(
///     &kernel,
///     nodes.clone(),
///     nodes,
///     &ConnSpec::fixed_indegree(3),
///     &[SynSpec::default().with_weight(0.5)],
/// )
/// .unwrap();
/// builder.connect().unwrap();
/// assert_eq!(kernel.num_edges(), 30);
/// ```
#[derive(Debug)]
pub struct ConnBuilder<'k> {
    core: BuilderCore<'k>,
    rule: Rule,
}

impl<'k> ConnBuilder<'k> {
    /// Validate the specs for the given populations
    ///
    /// An empty `syn_specs` slice means one default synapse spec.
    pub fn new(
        kernel: &'k dyn Kernel,
        sources: NodeCollection,
        targets: NodeCollection,
        conn_spec: &ConnSpec,
        syn_specs: &[SynSpec],
    ) -> Result<Self> {
        let mut core = BuilderCore::new(kernel, sources, targets, conn_spec, syn_specs)?;
        let rule = Rule::new(&core, &conn_spec.rule)?;
        core.set_requires_proxies(rule.requires_proxies());

        // the mirrored pass replays every parameter from the start
        if core.make_symmetric() && !rule.creates_symmetric() {
            core.reset_parameters()?;
        }

        log::debug!(
            "Built {} connection builder ({} sources, {} targets)",
            rule.name(),
            core.sources().len(),
            core.targets().len()
        );
        Ok(Self { core, rule })
    }

    /// Create the edges
    pub fn connect(&mut self) -> Result<()> {
        for model in self.core.models_requiring_symmetry()? {
            if !(self.rule.is_symmetric(&self.core) || self.core.make_symmetric()) {
                log::warn!("Synapse model {} requires symmetric connectivity", model);
                return Err(ConnError::bad_property(SYMMETRIC_MODEL_REQUIRED));
            }
        }

        if self.core.make_symmetric() && !self.rule.supports_symmetric() {
            return Err(ConnError::not_implemented(
                "This connection rule does not support symmetric connections.",
            ));
        }

        if self.core.use_structural_plasticity() {
            if self.core.make_symmetric() {
                return Err(ConnError::not_implemented(
                    "Symmetric connections are not supported in combination with structural plasticity.",
                ));
            }
            self.rule.sp_connect(&self.core)?;
        } else {
            self.rule.connect(&self.core)?;

            if self.core.make_symmetric() && !self.rule.creates_symmetric() {
                self.core.drain_failures()?;
                self.core.reset_parameters()?;
                self.core.swap_populations();
                let mirrored = self.rule.connect(&self.core);
                self.core.swap_populations();
                mirrored?;
            }
        }

        self.core.drain_failures()?;
        log::info!("{} connect finished", self.rule.name());
        Ok(())
    }

    /// Remove the edges the rule describes
    pub fn disconnect(&mut self) -> Result<()> {
        if self.core.use_structural_plasticity() {
            self.rule.sp_disconnect(&self.core)?;
        } else {
            self.rule.disconnect(&self.core)?;
        }
        self.core.drain_failures()
    }

    /// Configure structural plasticity with the given element names
    pub fn set_synaptic_element_names(&mut self, pre: &str, post: &str) -> Result<()> {
        self.core.set_synaptic_element_names(pre, post)
    }

    /// Rule name
    pub fn rule_name(&self) -> &'static str {
        self.rule.name()
    }

    /// Source population
    pub fn sources(&self) -> &NodeCollection {
        self.core.sources()
    }

    /// Target population
    pub fn targets(&self) -> &NodeCollection {
        self.core.targets()
    }

    /// Synapse model, when exactly one synapse spec is used
    pub fn synapse_model(&self) -> Result<SynapseModelId> {
        self.core.synapse_model()
    }

    /// Whether the model default delay is used, when exactly one synapse spec is used
    pub fn default_delay(&self) -> Result<bool> {
        self.core.default_delay()
    }

    /// Whether edges from a node to itself are allowed
    pub fn allows_autapses(&self) -> bool {
        self.core.allows_autapses()
    }

    /// Whether repeated edges between the same pair are allowed
    pub fn allows_multapses(&self) -> bool {
        self.core.allows_multapses()
    }

    /// Whether every edge is mirrored
    pub fn make_symmetric(&self) -> bool {
        self.core.make_symmetric()
    }

    /// Whether every synapse parameter is a constant
    pub fn all_parameters_scalar(&self) -> bool {
        self.core.all_parameters_scalar()
    }

    /// Whether the rule accepts `make_symmetric`
    pub fn supports_symmetric(&self) -> bool {
        self.rule.supports_symmetric()
    }

    /// Whether the rule yields a symmetric topology by itself
    pub fn is_symmetric(&self) -> bool {
        self.rule.is_symmetric(&self.core)
    }

    /// Whether targets must be nodes with proxies
    pub fn requires_proxies(&self) -> bool {
        self.rule.requires_proxies()
    }

    /// Whether structural-plasticity element names are configured
    pub fn use_structural_plasticity(&self) -> bool {
        self.core.use_structural_plasticity()
    }

    /// Presynaptic element name
    pub fn pre_synaptic_element_name(&self) -> Option<&str> {
        self.core.pre_synaptic_element_name()
    }

    /// Postsynaptic element name
    pub fn post_synaptic_element_name(&self) -> Option<&str> {
        self.core.post_synaptic_element_name()
    }
}

/// Connect `sources` to `targets` in one call
pub fn connect(
    kernel: &dyn Kernel,
    sources: &NodeCollection,
    targets: &NodeCollection,
    conn_spec: &ConnSpec,
    syn_specs: &[SynSpec],
) -> Result<()> {
    ConnBuilder::new(kernel, sources.clone(), targets.clone(), conn_spec, syn_specs)?.connect()
}

/// Disconnect `sources` from `targets` in one call
pub fn disconnect(
    kernel: &dyn Kernel,
    sources: &NodeCollection,
    targets: &NodeCollection,
    conn_spec: &ConnSpec,
    syn_specs: &[SynSpec],
) -> Result<()> {
    ConnBuilder::new(kernel, sources.clone(), targets.clone(), conn_spec, syn_specs)?.disconnect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use conngen_kernel::{KernelConfig, MemoryKernel, NodeId};

    fn setup(n: usize) -> (MemoryKernel, NodeCollection) {
        let mut kernel = MemoryKernel::new(KernelConfig::default().with_threads(2)).unwrap();
        let nodes = kernel.create_neurons(n).unwrap();
        (kernel, nodes)
    }

    #[test]
    fn test_one_to_one_size_mismatch() {
        let (kernel, nodes) = setup(4);
        let part = NodeCollection::range(NodeId::new(1), 3).unwrap();
        let err = ConnBuilder::new(&kernel, part, nodes, &ConnSpec::one_to_one(), &[]).unwrap_err();
        assert!(matches!(err, ConnError::DimensionMismatch { sources: 3, targets: 4, .. }));
    }

    #[test]
    fn test_symmetric_replay_requires_resettable_params() {
        let (kernel, nodes) = setup(4);
        let random = SynSpec::default()
            .with_weight(crate::param::Distribution::Uniform { min: 0.0, max: 1.0 });

        let err = ConnBuilder::new(
            &kernel,
            nodes.clone(),
            nodes.clone(),
            &ConnSpec::one_to_one().with_symmetric(true),
            &[random.clone()],
        )
        .unwrap_err();
        assert!(matches!(err, ConnError::NotImplemented { .. }));

        let spec = ConnSpec::symmetric_pairwise_bernoulli(0.5)
            .with_autapses(false)
            .with_symmetric(true);
        assert!(ConnBuilder::new(&kernel, nodes.clone(), nodes, &spec, &[random]).is_ok());
    }

    #[test]
    fn test_rule_flags() {
        let (kernel, nodes) = setup(4);
        let b = ConnBuilder::new(&kernel, nodes.clone(), nodes.clone(), &ConnSpec::all_to_all(), &[])
            .unwrap();
        assert!(b.is_symmetric());
        assert!(!b.supports_symmetric());
        assert!(!b.requires_proxies());
        assert_eq!(b.rule_name(), "all_to_all");

        let b = ConnBuilder::new(&kernel, nodes.clone(), nodes, &ConnSpec::fixed_indegree(2), &[])
            .unwrap();
        assert!(!b.is_symmetric());
        assert!(b.requires_proxies());
    }

    #[test]
    fn test_tripartite_rule_needs_third_population() {
        let (kernel, nodes) = setup(4);
        let err = ConnBuilder::new(
            &kernel,
            nodes.clone(),
            nodes,
            &ConnSpec::tripartite_bernoulli_with_pool(1.0, 1.0),
            &[],
        )
        .unwrap_err();
        assert!(matches!(err, ConnError::BadProperty { .. }));
    }

    #[test]
    fn test_unsupported_symmetric_rule() {
        let (kernel, nodes) = setup(4);
        let mut b = ConnBuilder::new(
            &kernel,
            nodes.clone(),
            nodes,
            &ConnSpec::fixed_indegree(2).with_symmetric(true),
            &[],
        )
        .unwrap();
        let err = b.connect().unwrap_err();
        assert_eq!(
            err,
            ConnError::not_implemented("This connection rule does not support symmetric connections.")
        );
        assert_eq!(kernel.num_edges(), 0);
    }

    #[test]
    fn test_disconnect_not_implemented_for_bernoulli() {
        let (kernel, nodes) = setup(4);
        let err = disconnect(&kernel, &nodes, &nodes, &ConnSpec::pairwise_bernoulli(0.5), &[])
            .unwrap_err();
        assert_eq!(err, ConnError::not_implemented("This disconnection rule is not implemented."));
    }
}

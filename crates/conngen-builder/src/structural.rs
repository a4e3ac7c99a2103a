//! Builder used by structural plasticity to wire up grown synapses

use crate::{
    base::BuilderCore,
    error::{ConnError, Result},
    rules::SP_NOT_IMPLEMENTED,
    spec::{ConnSpec, SynSpec},
};
use conngen_kernel::{Kernel, NodeCollection, NodeId, SynapseModelId, DELAY};

/// Creates synapses between explicitly paired nodes while keeping the
/// synaptic-element counters of both endpoints up to date
///
/// Unlike the rule builders it has no algorithm of its own: a growth
/// manager decides which (source, target) pairs to connect and passes them
/// to [`sp_connect`](Self::sp_connect).
#[derive(Debug)]
pub struct SpBuilder<'k> {
    core: BuilderCore<'k>,
    name: String,
}

impl<'k> SpBuilder<'k> {
    /// Create a builder; the single synapse spec must name both synaptic elements
    pub fn new(
        kernel: &'k dyn Kernel,
        sources: NodeCollection,
        targets: NodeCollection,
        conn_spec: &ConnSpec,
        syn_specs: &[SynSpec],
    ) -> Result<Self> {
        let core = BuilderCore::new(kernel, sources, targets, conn_spec, syn_specs)?;
        if !core.use_structural_plasticity() {
            return Err(ConnError::bad_property(
                "pre_synaptic_element and/or post_synaptic_elements is missing.",
            ));
        }
        Ok(Self {
            core,
            name: String::new(),
        })
    }

    /// Name identifying this builder among the plasticity synapses
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Set the identifying name
    pub fn set_name(&mut self, name: impl Into<String>) {
        self.name = name.into();
    }

    /// Presynaptic element name
    pub fn pre_synaptic_element_name(&self) -> &str {
        self.core.pre_synaptic_element_name().unwrap_or_default()
    }

    /// Postsynaptic element name
    pub fn post_synaptic_element_name(&self) -> &str {
        self.core.post_synaptic_element_name().unwrap_or_default()
    }

    /// Synapse model of the grown synapses
    pub fn synapse_model(&self) -> Result<SynapseModelId> {
        self.core.synapse_model()
    }

    /// Whether grown synapses use the model default delay
    pub fn default_delay(&self) -> Result<bool> {
        self.core.default_delay()
    }

    /// Delay in simulation steps for grown synapses
    ///
    /// Returns the model default delay converted to steps when the builder
    /// uses the default delay, `delay_steps` unchanged otherwise.
    pub fn update_delay(&self, delay_steps: i64) -> Result<i64> {
        if !self.core.default_delay()? {
            return Ok(delay_steps);
        }
        let kernel = self.core.kernel();
        let defaults = kernel.connector_defaults(self.core.synapse_model()?)?;
        let delay_ms = defaults
            .get(DELAY)
            .map(|d| d.as_f64())
            .ok_or_else(|| ConnError::internal("synapse model has no default delay"))?;
        Ok(kernel.config().ms_to_steps(delay_ms))
    }

    /// Connect `sources[i]` to `targets[i]` for every `i`
    ///
    /// Each edge increments the presynaptic element of its source and the
    /// postsynaptic element of its target.
    pub fn sp_connect(&mut self, sources: &[NodeId], targets: &[NodeId]) -> Result<()> {
        if sources.len() != targets.len() {
            return Err(ConnError::dimension_mismatch(
                "Source and target population must be of the same size.",
                sources.len(),
                targets.len(),
            ));
        }

        let core = &self.core;
        let kernel = core.kernel();

        core.for_each_thread(|tid| {
            let mut rng = kernel.rngs().vp_specific(tid)?;
            for (&source, &target) in sources.iter().zip(targets) {
                if source == target && !core.allows_autapses() {
                    continue;
                }
                if !core.change_connected_synaptic_elements(source, target, tid, 1)? {
                    core.skip_conn_parameter(tid, 1)?;
                    continue;
                }
                let handle = kernel.node_or_proxy(target, tid)?;
                core.single_connect(source, &handle, tid, &mut *rng)?;
            }
            Ok(())
        });

        self.core.drain_failures()?;
        log::debug!("{}: created up to {} grown synapses", self.name, sources.len());
        Ok(())
    }

    /// Not possible without explicit pairs; use [`sp_connect`](Self::sp_connect)
    pub fn connect(&mut self) -> Result<()> {
        Err(ConnError::not_implemented(
            "Connection without structural plasticity is not possible for this connection builder.",
        ))
    }

    /// Not possible for this builder
    pub fn disconnect(&mut self) -> Result<()> {
        Err(ConnError::not_implemented(SP_NOT_IMPLEMENTED))
    }
}

//! State and primitives shared by every connection rule

use crate::{
    error::{ConnError, Result},
    param::{ConnParameter, ParamContext, ParamValue},
    parallel::{self, ThreadFailures},
    spec::{ConnSpec, SynSpec},
};
use conngen_kernel::{
    EdgeValues, Kernel, NodeCollection, NodeHandle, NodeId, ParamDict, ParamScalar, SynapseModelId,
    DELAY, WEIGHT,
};

use parking_lot::Mutex;
use rand::RngCore;

/// Parameters of one synapse spec, resolved against its model
#[derive(Debug)]
pub(crate) struct SynapseParams {
    pub(crate) model: SynapseModelId,
    pub(crate) model_name: String,
    pub(crate) weight: Option<ConnParameter>,
    pub(crate) delay: Option<ConnParameter>,
    pub(crate) extras: Vec<(String, ConnParameter)>,
}

impl SynapseParams {
    fn new(kernel: &dyn Kernel, spec: &SynSpec) -> Result<Self> {
        let name = spec
            .synapse_model
            .as_deref()
            .ok_or_else(|| ConnError::bad_property("Synapse spec must contain synapse model."))?;
        let model = kernel.synapse_model_id(name)?;

        let mut names: Vec<&str> = spec.params.keys().map(String::as_str).collect();
        if spec.weight.is_some() {
            names.push(WEIGHT);
        }
        if spec.delay.is_some() {
            names.push(DELAY);
        }
        kernel.check_synapse_params(model, &names)?;

        let threads = kernel.num_threads();
        let wrap = |value: &Option<ParamValue>| {
            value
                .clone()
                .map(|v| ConnParameter::new(v, threads))
                .transpose()
        };
        let extras = spec
            .params
            .iter()
            .map(|(key, value)| Ok((key.clone(), ConnParameter::new(value.clone(), threads)?)))
            .collect::<Result<Vec<_>>>()?;

        Ok(Self {
            model,
            model_name: name.to_string(),
            weight: wrap(&spec.weight)?,
            delay: wrap(&spec.delay)?,
            extras,
        })
    }

    fn parameters(&self) -> impl Iterator<Item = &ConnParameter> {
        self.weight
            .iter()
            .chain(self.delay.iter())
            .chain(self.extras.iter().map(|(_, p)| p))
    }

    /// Per-thread scratch dict with one placeholder per extra parameter
    fn scratch_dict(&self) -> ParamDict {
        self.extras
            .iter()
            .map(|(key, p)| {
                let placeholder = if p.provides_long() {
                    ParamScalar::Int(0)
                } else {
                    ParamScalar::Double(0.0)
                };
                (key.clone(), placeholder)
            })
            .collect()
    }
}

/// Builder state common to all rules
///
/// Constructed once per connect call; owns the resolved parameters, the
/// per-thread scratch dicts and the per-thread failure slots.
pub struct BuilderCore<'k> {
    kernel: &'k dyn Kernel,
    sources: NodeCollection,
    targets: NodeCollection,
    allow_autapses: bool,
    allow_multapses: bool,
    make_symmetric: bool,
    requires_proxies: bool,
    pre_synaptic_element: Option<String>,
    post_synaptic_element: Option<String>,
    synapses: Vec<SynapseParams>,
    /// Set when any parameter is an array and must be kept in step
    skip_required: bool,
    scratch: Vec<Mutex<Vec<ParamDict>>>,
    failures: ThreadFailures,
}

impl<'k> BuilderCore<'k> {
    /// Validate the specs and resolve all synapse parameters
    ///
    /// An empty `syn_specs` slice means one default synapse spec.
    pub fn new(
        kernel: &'k dyn Kernel,
        sources: NodeCollection,
        targets: NodeCollection,
        conn_spec: &ConnSpec,
        syn_specs: &[SynSpec],
    ) -> Result<Self> {
        kernel.validate_collection(&sources)?;
        kernel.validate_collection(&targets)?;

        let default_spec = [SynSpec::default()];
        let syn_specs = if syn_specs.is_empty() {
            &default_spec[..]
        } else {
            syn_specs
        };

        let synapses = syn_specs
            .iter()
            .map(|spec| SynapseParams::new(kernel, spec))
            .collect::<Result<Vec<_>>>()?;
        let skip_required = synapses
            .iter()
            .flat_map(SynapseParams::parameters)
            .any(ConnParameter::is_array);

        let num_threads = kernel.num_threads();
        let scratch = (0..num_threads)
            .map(|_| Mutex::new(synapses.iter().map(SynapseParams::scratch_dict).collect()))
            .collect();

        let mut core = Self {
            kernel,
            sources,
            targets,
            allow_autapses: conn_spec.allow_autapses,
            allow_multapses: conn_spec.allow_multapses,
            make_symmetric: conn_spec.make_symmetric,
            requires_proxies: true,
            pre_synaptic_element: None,
            post_synaptic_element: None,
            synapses,
            skip_required,
            scratch,
            failures: ThreadFailures::new(num_threads),
        };

        if syn_specs.iter().any(SynSpec::uses_structural_plasticity) {
            if syn_specs.len() > 1 {
                return Err(ConnError::bad_property(
                    "Structural plasticity can only be used with a single syn_spec.",
                ));
            }
            let spec = &syn_specs[0];
            match (&spec.pre_synaptic_element, &spec.post_synaptic_element) {
                (Some(pre), Some(post)) => core.set_synaptic_element_names(pre, post)?,
                _ => {
                    return Err(ConnError::bad_property(
                        "Structural plasticity requires both a pre- and postsynaptic element.",
                    ))
                }
            }
        }

        Ok(core)
    }

    /// Kernel services
    pub fn kernel(&self) -> &'k dyn Kernel {
        self.kernel
    }

    /// Source population
    pub fn sources(&self) -> &NodeCollection {
        &self.sources
    }

    /// Target population
    pub fn targets(&self) -> &NodeCollection {
        &self.targets
    }

    /// Source at position `lid`
    pub(crate) fn source_at(&self, lid: usize) -> Result<NodeId> {
        self.sources
            .get(lid)
            .ok_or_else(|| ConnError::internal(format!("source index {} out of range", lid)))
    }

    /// Target at position `lid`
    pub(crate) fn target_at(&self, lid: usize) -> Result<NodeId> {
        self.targets
            .get(lid)
            .ok_or_else(|| ConnError::internal(format!("target index {} out of range", lid)))
    }

    /// Exchange source and target populations
    pub(crate) fn swap_populations(&mut self) {
        std::mem::swap(&mut self.sources, &mut self.targets);
    }

    /// Whether edges from a node to itself are allowed
    pub fn allows_autapses(&self) -> bool {
        self.allow_autapses
    }

    /// Whether repeated edges between the same pair are allowed
    pub fn allows_multapses(&self) -> bool {
        self.allow_multapses
    }

    /// Whether every edge is mirrored
    pub fn make_symmetric(&self) -> bool {
        self.make_symmetric
    }

    pub(crate) fn set_requires_proxies(&mut self, requires_proxies: bool) {
        self.requires_proxies = requires_proxies;
    }

    /// Whether structural-plasticity element names are configured
    pub fn use_structural_plasticity(&self) -> bool {
        self.pre_synaptic_element.is_some()
    }

    /// Presynaptic element name
    pub fn pre_synaptic_element_name(&self) -> Option<&str> {
        self.pre_synaptic_element.as_deref()
    }

    /// Postsynaptic element name
    pub fn post_synaptic_element_name(&self) -> Option<&str> {
        self.post_synaptic_element.as_deref()
    }

    /// Configure structural plasticity with the given element names
    pub fn set_synaptic_element_names(&mut self, pre: &str, post: &str) -> Result<()> {
        if pre.is_empty() || post.is_empty() {
            return Err(ConnError::bad_property("synaptic element names cannot be empty."));
        }
        self.pre_synaptic_element = Some(pre.to_string());
        self.post_synaptic_element = Some(post.to_string());
        Ok(())
    }

    /// Number of local worker threads
    pub fn num_threads(&self) -> usize {
        self.kernel.num_threads()
    }

    /// Resolved synapse models, one per synapse spec
    pub(crate) fn synapse_models(&self) -> impl Iterator<Item = SynapseModelId> + '_ {
        self.synapses.iter().map(|s| s.model)
    }

    /// Synapse model, when exactly one synapse spec is used
    pub fn synapse_model(&self) -> Result<SynapseModelId> {
        match self.synapses.as_slice() {
            [single] => Ok(single.model),
            _ => Err(ConnError::internal(
                "Can only retrieve synapse model when one synapse per connection is used.",
            )),
        }
    }

    /// Name of the synapse model, when exactly one synapse spec is used
    pub fn synapse_model_name(&self) -> Result<&str> {
        match self.synapses.as_slice() {
            [single] => Ok(single.model_name.as_str()),
            _ => Err(ConnError::internal(
                "Can only retrieve synapse model when one synapse per connection is used.",
            )),
        }
    }

    /// Whether the model default delay is used, when exactly one synapse spec is used
    pub fn default_delay(&self) -> Result<bool> {
        match self.synapses.as_slice() {
            [single] => Ok(single.delay.is_none()),
            _ => Err(ConnError::internal(
                "Can only retrieve default delay when one synapse per connection is used.",
            )),
        }
    }

    /// Whether every weight, delay and extra parameter is a constant
    pub fn all_parameters_scalar(&self) -> bool {
        self.synapses
            .iter()
            .flat_map(SynapseParams::parameters)
            .all(ConnParameter::is_scalar)
    }

    /// Whether rules must walk the full target collection on every thread
    ///
    /// True when the targets do not cover the network as one contiguous
    /// range, or when array parameters must be advanced for skipped edges.
    pub fn loop_over_targets(&self) -> bool {
        self.targets.len() < self.kernel.num_nodes() || !self.targets.is_range() || self.skip_required
    }

    /// Rewind all parameters
    pub fn reset_parameters(&self) -> Result<()> {
        self.synapses
            .iter()
            .flat_map(SynapseParams::parameters)
            .try_for_each(ConnParameter::reset)
    }

    /// Advance array parameters of thread `tid` past `n` edges not created here
    pub fn skip_conn_parameter(&self, tid: usize, n: usize) -> Result<()> {
        if !self.skip_required {
            return Ok(());
        }
        self.synapses
            .iter()
            .flat_map(SynapseParams::parameters)
            .filter(|p| p.is_array())
            .try_for_each(|p| p.skip(tid, n))
    }

    /// Create one edge per synapse spec from `source` to the local `target`
    pub fn single_connect(
        &self,
        source: NodeId,
        target: &NodeHandle,
        tid: usize,
        rng: &mut dyn RngCore,
    ) -> Result<()> {
        if self.requires_proxies && !target.has_proxies {
            return Err(ConnError::illegal_connection(
                "Cannot use this rule to connect to nodes without proxies (usually devices).",
            ));
        }

        let ctx = ParamContext::edge(source, target.id);
        let mut scratch = self
            .scratch
            .get(tid)
            .ok_or_else(|| ConnError::internal(format!("no scratch space for thread {}", tid)))?
            .lock();

        for (synapse, dict) in self.synapses.iter().zip(scratch.iter_mut()) {
            for (key, param) in &synapse.extras {
                let value = if param.provides_long() {
                    ParamScalar::Int(param.value_int(tid, rng, ctx)?)
                } else {
                    ParamScalar::Double(param.value_double(tid, rng, ctx)?)
                };
                match dict.get_mut(key) {
                    Some(slot) => *slot = value,
                    None => {
                        dict.insert(key.clone(), value);
                    }
                }
            }

            // delay is drawn before weight when both are given
            let delay = match &synapse.delay {
                Some(p) => Some(p.value_double(tid, rng, ctx)?),
                None => None,
            };
            let weight = match &synapse.weight {
                Some(p) => Some(p.value_double(tid, rng, ctx)?),
                None => None,
            };

            self.kernel.connect(
                source,
                target,
                tid,
                synapse.model,
                dict,
                EdgeValues::from_parts(weight, delay),
            )?;
        }
        Ok(())
    }

    /// Remove one edge per synapse spec from `source` to `target`
    pub fn single_disconnect(&self, source: NodeId, target: &NodeHandle, tid: usize) -> Result<()> {
        for model in self.synapse_models() {
            self.kernel.disconnect(source, target, tid, model)?;
        }
        Ok(())
    }

    /// Fail `InexistentConnection` when `tid` owns `target` but holds no
    /// edge from `source` for one of the synapse models
    pub fn check_connected(&self, source: NodeId, target: NodeId, tid: usize) -> Result<()> {
        if !self.kernel.is_local_node_id(target) {
            return Ok(());
        }
        let handle = self.kernel.node_or_proxy(target, tid)?;
        if handle.thread != tid || handle.is_proxy {
            return Ok(());
        }
        for model in self.synapse_models() {
            self.kernel.check_edge(source, &handle, tid, model)?;
        }
        Ok(())
    }

    /// Adjust the element counters for an edge about to be made or removed
    ///
    /// The presynaptic counter changes only if `tid` owns the source.
    /// Returns `true` when `tid` owns the target, after adjusting its
    /// postsynaptic counter; the caller creates or removes the edge only then.
    pub fn change_connected_synaptic_elements(
        &self,
        source: NodeId,
        target: NodeId,
        tid: usize,
        delta: i32,
    ) -> Result<bool> {
        let (pre, post) = match (&self.pre_synaptic_element, &self.post_synaptic_element) {
            (Some(pre), Some(post)) => (pre.as_str(), post.as_str()),
            _ => {
                return Err(ConnError::internal(
                    "synaptic element names are not configured",
                ))
            }
        };

        if self.kernel.is_local_node_id(source) {
            let handle = self.kernel.node_or_proxy(source, tid)?;
            if handle.thread == tid && !handle.is_proxy {
                self.kernel.connect_synaptic_element(source, pre, delta)?;
            }
        }

        if !self.kernel.is_local_node_id(target) {
            return Ok(false);
        }
        let handle = self.kernel.node_or_proxy(target, tid)?;
        if handle.thread != tid || handle.is_proxy {
            return Ok(false);
        }
        self.kernel.connect_synaptic_element(target, post, delta)?;
        Ok(true)
    }

    /// Run `work` on every local thread; failures go to the per-thread slots
    pub(crate) fn for_each_thread<F>(&self, work: F)
    where
        F: Fn(usize) -> Result<()> + Send + Sync,
    {
        parallel::for_each_thread(self.num_threads(), &self.failures, work);
    }

    /// Report the failure of the lowest failing thread, if any
    pub(crate) fn drain_failures(&self) -> Result<()> {
        self.failures.drain()
    }

    /// Whether any used model may only be used on symmetric topologies
    pub(crate) fn models_requiring_symmetry(&self) -> Result<Vec<String>> {
        let mut names = Vec::new();
        for synapse in &self.synapses {
            if self.kernel.model_properties(synapse.model)?.requires_symmetric {
                names.push(synapse.model_name.clone());
            }
        }
        Ok(names)
    }
}

impl std::fmt::Debug for BuilderCore<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BuilderCore")
            .field("sources", &self.sources)
            .field("targets", &self.targets)
            .field("allow_autapses", &self.allow_autapses)
            .field("allow_multapses", &self.allow_multapses)
            .field("make_symmetric", &self.make_symmetric)
            .field("synapses", &self.synapses)
            .finish_non_exhaustive()
    }
}

//! Three-population connectivity: sources, targets and a third-factor population
//!
//! Primary edges source → target are drawn Bernoulli-style. For each primary
//! edge, with probability `p_third_if_primary`, a third-factor node is taken
//! from the target's pool and connected source → third and third → target.
//! The third-factor edges are created by two [`AuxiliaryBuilder`]s that carry
//! their own synapse parameters.

use crate::{
    base::BuilderCore,
    builder::SYMMETRIC_MODEL_REQUIRED,
    error::{ConnError, Result},
    rules::{DISCONNECT_NOT_IMPLEMENTED, SP_NOT_IMPLEMENTED},
    spec::{ConnSpec, PoolType, RuleSpec, SynSpec, TripartiteSynSpecs},
};
use conngen_kernel::{Kernel, NodeCollection, NodeHandle, NodeId, RngExt};

use rand::RngCore;

/// Builder without a rule of its own, used for the third-factor edges
///
/// It only resolves synapse parameters and creates single edges on request.
#[derive(Debug)]
pub struct AuxiliaryBuilder<'k> {
    core: BuilderCore<'k>,
}

impl<'k> AuxiliaryBuilder<'k> {
    /// Resolve `syn_specs` for edges from `sources` to `targets`
    pub fn new(
        kernel: &'k dyn Kernel,
        sources: NodeCollection,
        targets: NodeCollection,
        conn_spec: &ConnSpec,
        syn_specs: &[SynSpec],
    ) -> Result<Self> {
        Ok(Self {
            core: BuilderCore::new(kernel, sources, targets, conn_spec, syn_specs)?,
        })
    }

    /// Create one edge per synapse spec onto the local `target`
    pub fn single_connect(
        &self,
        source: NodeId,
        target: &NodeHandle,
        tid: usize,
        rng: &mut dyn RngCore,
    ) -> Result<()> {
        self.core.single_connect(source, target, tid, rng)
    }
}

/// Builder for the tripartite Bernoulli rule with third-factor pools
#[derive(Debug)]
pub struct TripartiteBuilder<'k> {
    core: BuilderCore<'k>,
    third: NodeCollection,
    third_in: AuxiliaryBuilder<'k>,
    third_out: AuxiliaryBuilder<'k>,
    p_primary: f64,
    p_third_if_primary: f64,
    pool_type: PoolType,
    pool_size: usize,
    targets_per_third: usize,
}

impl<'k> TripartiteBuilder<'k> {
    /// Validate the specs for the three populations
    pub fn new(
        kernel: &'k dyn Kernel,
        sources: NodeCollection,
        targets: NodeCollection,
        third: NodeCollection,
        conn_spec: &ConnSpec,
        syn_specs: &TripartiteSynSpecs,
    ) -> Result<Self> {
        let (p_primary, p_third_if_primary, pool_size, pool_type) = match conn_spec.rule {
            RuleSpec::TripartiteBernoulliWithPool {
                p_primary,
                p_third_if_primary,
                pool_size,
                pool_type,
            } => (p_primary, p_third_if_primary, pool_size, pool_type),
            ref other => {
                return Err(ConnError::bad_property(format!(
                    "Rule {} cannot be used with a third-factor population.",
                    other.name()
                )))
            }
        };

        kernel.validate_collection(&third)?;
        if third.is_empty() {
            return Err(ConnError::bad_property(
                "Third-factor population must not be empty.",
            ));
        }

        let core = BuilderCore::new(
            kernel,
            sources.clone(),
            targets.clone(),
            conn_spec,
            &syn_specs.primary,
        )?;
        let third_in = AuxiliaryBuilder::new(
            kernel,
            sources,
            third.clone(),
            conn_spec,
            &syn_specs.third_in,
        )?;
        let third_out = AuxiliaryBuilder::new(
            kernel,
            third.clone(),
            targets.clone(),
            conn_spec,
            &syn_specs.third_out,
        )?;

        if !(0.0..=1.0).contains(&p_primary) {
            return Err(ConnError::bad_property(
                "Probability of primary connection 0 ≤ p_primary ≤ 1 required",
            ));
        }
        if !(0.0..=1.0).contains(&p_third_if_primary) {
            return Err(ConnError::bad_property(
                "Conditional probability of third-factor connection 0 ≤ p_third_if_primary ≤ 1 required",
            ));
        }

        let pool_size = pool_size.unwrap_or(third.len() as i64);
        if pool_size < 1 || pool_size as usize > third.len() {
            return Err(ConnError::bad_property(
                "Pool size 1 ≤ pool_size ≤ size of third-factor population required",
            ));
        }
        let pool_size = pool_size as usize;

        let fits_block = targets.len() * pool_size == third.len()
            || (pool_size == 1 && targets.len() % third.len() == 0);
        if pool_type == PoolType::Block && !fits_block {
            return Err(ConnError::bad_property(
                "The sizes of target and third-factor populations and the chosen pool size do not fit. \
                 If pool_size == 1, the target population size must be a multiple of the third-factor \
                 population size. For pool_size > 1, size(targets) * pool_size == size(third factor) \
                 is required. For all other cases, use random pools.",
            ));
        }

        let targets_per_third = (targets.len() / third.len()).max(1);

        log::debug!(
            "Built tripartite builder ({} sources, {} targets, {} third, {:?} pool of {})",
            core.sources().len(),
            targets.len(),
            third.len(),
            pool_type,
            pool_size
        );

        Ok(Self {
            core,
            third,
            third_in,
            third_out,
            p_primary,
            p_third_if_primary,
            pool_type,
            pool_size,
            targets_per_third,
        })
    }

    /// Third-factor population
    pub fn third(&self) -> &NodeCollection {
        &self.third
    }

    /// Pool size per target
    pub fn pool_size(&self) -> usize {
        self.pool_size
    }

    /// Pool selection strategy
    pub fn pool_type(&self) -> PoolType {
        self.pool_type
    }

    /// Position in the third population where the block pool of target `lid` starts
    fn first_pool_index(&self, lid: usize) -> usize {
        if self.pool_size > 1 {
            lid * self.pool_size
        } else {
            lid / self.targets_per_third
        }
    }

    /// Create the edges
    pub fn connect(&mut self) -> Result<()> {
        if !self.core.make_symmetric() {
            if let Some(model) = self.core.models_requiring_symmetry()?.first() {
                log::warn!("Synapse model {} requires symmetric connectivity", model);
                return Err(ConnError::bad_property(SYMMETRIC_MODEL_REQUIRED));
            }
        }
        if self.core.make_symmetric() {
            return Err(ConnError::not_implemented(
                "This connection rule does not support symmetric connections.",
            ));
        }
        if self.core.use_structural_plasticity() {
            return Err(ConnError::not_implemented(SP_NOT_IMPLEMENTED));
        }

        let core = &self.core;
        let kernel = core.kernel();
        let num_sources = core.sources().len();

        core.for_each_thread(|tid| {
            // edge existence on the synced stream, edge parameters on the private one
            let mut synced = kernel.rngs().vp_synced(tid)?;
            let mut rng = kernel.rngs().vp_specific(tid)?;

            for (lid, target) in core.targets().iter_with_lid() {
                let target_handle = kernel.node_or_proxy(target, tid)?;
                let local_target = !target_handle.is_proxy;

                let indegree = synced.binomial(num_sources as u64, self.p_primary)? as usize;
                if indegree == 0 {
                    continue;
                }

                let pool = self.pool_for(lid, &mut *synced)?;
                let chosen = synced.sample_indices(num_sources, indegree)?;

                for source_lid in chosen {
                    let source = core.source_at(source_lid)?;
                    if source == target && !core.allows_autapses() {
                        continue;
                    }

                    if local_target {
                        core.single_connect(source, &target_handle, tid, &mut *rng)?;
                    }

                    if synced.drand() >= self.p_third_if_primary {
                        continue;
                    }

                    let third_index = if self.pool_size == 1 {
                        0
                    } else {
                        synced.ulrand(self.pool_size)
                    };
                    let third_node = pool[third_index];
                    let third_handle = kernel.node_or_proxy(third_node, tid)?;

                    if !third_handle.is_proxy {
                        self.third_in
                            .single_connect(source, &third_handle, tid, &mut *rng)?;
                    }
                    if local_target {
                        self.third_out
                            .single_connect(third_node, &target_handle, tid, &mut *rng)?;
                    }
                }
            }
            Ok(())
        });

        self.core.drain_failures()?;
        log::info!("tripartite_bernoulli_with_pool connect finished");
        Ok(())
    }

    fn pool_for(&self, lid: usize, synced: &mut dyn RngCore) -> Result<Vec<NodeId>> {
        let indices: Vec<usize> = match self.pool_type {
            PoolType::Random => synced.sample_indices(self.third.len(), self.pool_size)?,
            PoolType::Block => {
                let first = self.first_pool_index(lid);
                (first..first + self.pool_size).collect()
            }
        };
        indices
            .into_iter()
            .map(|idx| {
                self.third.get(idx).ok_or_else(|| {
                    ConnError::internal(format!("third-factor index {} out of range", idx))
                })
            })
            .collect()
    }

    /// Not supported for this rule
    pub fn disconnect(&mut self) -> Result<()> {
        Err(ConnError::not_implemented(DISCONNECT_NOT_IMPLEMENTED))
    }
}

/// Connect three populations with the tripartite rule in one call
pub fn connect_tripartite(
    kernel: &dyn Kernel,
    sources: &NodeCollection,
    targets: &NodeCollection,
    third: &NodeCollection,
    conn_spec: &ConnSpec,
    syn_specs: &TripartiteSynSpecs,
) -> Result<()> {
    TripartiteBuilder::new(
        kernel,
        sources.clone(),
        targets.clone(),
        third.clone(),
        conn_spec,
        syn_specs,
    )?
    .connect()
}

//! Bernoulli connectivity where every edge comes with its reverse

use crate::{
    base::BuilderCore,
    error::{ConnError, Result},
};
use conngen_kernel::{NodeId, RngExt};

use std::collections::HashSet;

#[derive(Debug)]
pub(crate) struct SymmetricBernoulli {
    p: f64,
}

impl SymmetricBernoulli {
    pub(crate) fn new(core: &BuilderCore<'_>, p: f64) -> Result<Self> {
        if !(0.0..1.0).contains(&p) {
            return Err(ConnError::bad_property("Connection probability 0 <= p < 1 required."));
        }
        if !core.allows_multapses() {
            return Err(ConnError::bad_property("Multapses must be enabled."));
        }
        if core.allows_autapses() {
            return Err(ConnError::bad_property("Autapses must be disabled."));
        }
        if !core.make_symmetric() {
            return Err(ConnError::bad_property("Symmetric connections must be enabled."));
        }
        if core.sources().is_empty() {
            return Err(ConnError::bad_property("Source array must not be empty."));
        }
        Ok(Self { p })
    }

    /// Every thread replays the same draws on the vp-synchronized stream and
    /// creates whichever side of each pair it owns. Edge parameters come from
    /// the thread's private stream so the synced draws stay aligned.
    pub(crate) fn connect(&self, core: &BuilderCore<'_>) -> Result<()> {
        let kernel = core.kernel();
        let num_sources = core.sources().len();

        core.for_each_thread(|tid| {
            let mut synced = kernel.rngs().vp_synced(tid)?;
            let mut rng = kernel.rngs().vp_specific(tid)?;
            let mut previous: HashSet<NodeId> = HashSet::new();

            for target in core.targets() {
                // truncated binomial: a target never draws all sources
                let mut indegree = num_sources as u64;
                while indegree >= num_sources as u64 {
                    indegree = synced.binomial(num_sources as u64, self.p)?;
                }

                let target_handle = kernel.node_or_proxy(target, tid)?;
                previous.clear();

                let mut created = 0;
                while created < indegree {
                    let source = core.source_at(synced.ulrand(num_sources))?;
                    if source == target || previous.contains(&source) {
                        continue;
                    }
                    previous.insert(source);

                    let source_handle = kernel.node_or_proxy(source, tid)?;
                    if !target_handle.is_proxy {
                        core.single_connect(source, &target_handle, tid, &mut *rng)?;
                    }
                    if !source_handle.is_proxy {
                        core.single_connect(target, &source_handle, tid, &mut *rng)?;
                    }
                    created += 1;
                }
            }
            Ok(())
        });
        Ok(())
    }
}

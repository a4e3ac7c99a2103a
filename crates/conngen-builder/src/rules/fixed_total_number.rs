//! Fixed total number of edges between random pairs

use crate::{
    base::BuilderCore,
    error::{ConnError, Result},
};
use conngen_kernel::{KernelRng, NodeId, RngExt};

#[derive(Debug)]
pub(crate) struct FixedTotalNumber {
    n: u64,
}

impl FixedTotalNumber {
    pub(crate) fn new(core: &BuilderCore<'_>, n: i64) -> Result<Self> {
        let (num_sources, num_targets) = (core.sources().len(), core.targets().len());

        if !core.allows_multapses() && i128::from(n) > num_sources as i128 * num_targets as i128 {
            return Err(ConnError::bad_property(
                "Total number of connections cannot exceed product of source and target population sizes.",
            ));
        }
        if n < 0 {
            return Err(ConnError::bad_property("Total number of connections cannot be negative."));
        }
        if !core.allows_multapses() {
            return Err(ConnError::not_implemented(
                "Connect doesn't support the suppression of multapses in the FixedTotalNumber connector.",
            ));
        }
        if n > 0 && (num_sources == 0 || num_targets == 0) {
            return Err(ConnError::bad_property(
                "Total number of connections cannot be positive for an empty source or target population.",
            ));
        }

        Ok(Self { n: n as u64 })
    }

    pub(crate) fn connect(&self, core: &BuilderCore<'_>) -> Result<()> {
        let kernel = core.kernel();
        let vp_map = kernel.vp_map();

        let mut targets_on_vp = vec![0usize; vp_map.num_virtual_processes()];
        let mut local_targets: Vec<NodeId> = Vec::new();
        for target in core.targets() {
            let vp = vp_map.node_to_vp(target);
            targets_on_vp[vp] += 1;
            if vp_map.is_local_vp(vp) {
                local_targets.push(target);
            }
        }

        let conns_on_vp = self.partition(
            &targets_on_vp,
            core.targets().len(),
            &mut kernel.rngs().rank_synced(),
        )?;
        log::debug!("fixed_total_number: edges per virtual process {:?}", conns_on_vp);

        let num_sources = core.sources().len();
        core.for_each_thread(|tid| {
            let vp = vp_map.thread_to_vp(tid);
            if !vp_map.is_local_vp(vp) {
                return Ok(());
            }
            let mut rng = kernel.rngs().vp_specific(tid)?;

            let thread_targets: Vec<NodeId> = local_targets
                .iter()
                .copied()
                .filter(|&t| vp_map.node_to_vp(t) == vp)
                .collect();

            let mut remaining = conns_on_vp[vp];
            while remaining > 0 {
                let source = core.source_at(rng.ulrand(num_sources))?;
                let target = thread_targets[rng.ulrand(thread_targets.len())];
                let handle = kernel.node_or_proxy(target, tid)?;

                if core.allows_autapses() || source != target {
                    core.single_connect(source, &handle, handle.thread, &mut *rng)?;
                    remaining -= 1;
                }
            }
            Ok(())
        });
        Ok(())
    }

    /// Multinomial split of `n` edges over virtual processes, weighted by
    /// the number of targets each one owns
    fn partition(
        &self,
        targets_on_vp: &[usize],
        num_targets: usize,
        rng: &mut KernelRng,
    ) -> Result<Vec<u64>> {
        let mut conns_on_vp = vec![0u64; targets_on_vp.len()];
        let mut sum_dist = 0.0;
        let mut sum_partitions = 0u64;

        for (k, &on_vp) in targets_on_vp.iter().enumerate() {
            if sum_partitions == self.n {
                break;
            }
            if on_vp > 0 {
                let p = (on_vp as f64 / (num_targets as f64 - sum_dist)).clamp(0.0, 1.0);
                conns_on_vp[k] = rng.binomial(self.n - sum_partitions, p)?;
            }
            sum_dist += on_vp as f64;
            sum_partitions += conns_on_vp[k];
        }
        Ok(conns_on_vp)
    }
}

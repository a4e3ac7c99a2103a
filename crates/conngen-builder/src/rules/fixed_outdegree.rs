//! Fixed number of outgoing edges per source

use super::{check_degree, degree_count};
use crate::{
    base::BuilderCore,
    error::{ConnError, Result},
    param::{ConnParameter, ParamContext, ParamValue},
};
use conngen_kernel::{NodeId, RngExt};

use std::collections::HashSet;

#[derive(Debug)]
pub(crate) struct FixedOutDegree {
    outdegree: ConnParameter,
}

impl FixedOutDegree {
    pub(crate) fn new(core: &BuilderCore<'_>, outdegree: &ParamValue) -> Result<Self> {
        let num_targets = core.targets().len();
        if num_targets == 0 {
            return Err(ConnError::bad_property("Target array must not be empty."));
        }

        let outdegree = ConnParameter::for_rule("outdegree", outdegree.clone(), core.num_threads())?;
        if let Some(value) = outdegree.constant() {
            check_degree(
                "Outdegree",
                value.round() as i64,
                num_targets,
                core.allows_autapses(),
                core.allows_multapses(),
            )?;
        }
        Ok(Self { outdegree })
    }

    /// Targets are drawn on the rank-synchronized stream so that every
    /// rank and thread agrees on them; each thread then creates the edges
    /// onto the targets it owns.
    pub(crate) fn connect(&self, core: &BuilderCore<'_>) -> Result<()> {
        let kernel = core.kernel();
        let num_targets = core.targets().len();

        for source in core.sources() {
            let target_ids = {
                let mut grng = kernel.rngs().rank_synced();
                let outdegree = degree_count(self.outdegree.value_double(
                    0,
                    &mut *grng,
                    ParamContext::node(source),
                )?);
                if !core.allows_multapses() && outdegree > num_targets {
                    return Err(ConnError::bad_property(
                        "Outdegree cannot be larger than population size.",
                    ));
                }

                let mut chosen: HashSet<usize> = HashSet::new();
                let mut target_ids: Vec<NodeId> = Vec::with_capacity(outdegree);
                for _ in 0..outdegree {
                    let (lid, target) = loop {
                        let lid = grng.ulrand(num_targets);
                        let target = core.target_at(lid)?;
                        let autapse = target == source && !core.allows_autapses();
                        let multapse = !core.allows_multapses() && chosen.contains(&lid);
                        if !autapse && !multapse {
                            break (lid, target);
                        }
                    };
                    if !core.allows_multapses() {
                        chosen.insert(lid);
                    }
                    target_ids.push(target);
                }
                target_ids
            };

            core.for_each_thread(|tid| {
                let mut rng = kernel.rngs().vp_specific(tid)?;
                for &target in &target_ids {
                    let handle = kernel.node_or_proxy(target, tid)?;
                    if handle.is_proxy {
                        core.skip_conn_parameter(tid, 1)?;
                        continue;
                    }
                    core.single_connect(source, &handle, tid, &mut *rng)?;
                }
                Ok(())
            });
        }
        Ok(())
    }
}

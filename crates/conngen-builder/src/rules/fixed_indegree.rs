//! Fixed number of incoming edges per target

use super::{check_degree, degree_count};
use crate::{
    base::BuilderCore,
    error::{ConnError, Result},
    param::{ConnParameter, ParamContext, ParamValue},
};
use conngen_kernel::{NodeHandle, RngExt};

use rand::RngCore;
use std::collections::HashSet;

#[derive(Debug)]
pub(crate) struct FixedInDegree {
    indegree: ConnParameter,
}

impl FixedInDegree {
    pub(crate) fn new(core: &BuilderCore<'_>, indegree: &ParamValue) -> Result<Self> {
        let num_sources = core.sources().len();
        if num_sources == 0 {
            return Err(ConnError::bad_property("Source array must not be empty."));
        }

        let indegree = ConnParameter::for_rule("indegree", indegree.clone(), core.num_threads())?;
        if let Some(value) = indegree.constant() {
            check_degree(
                "Indegree",
                value.round() as i64,
                num_sources,
                core.allows_autapses(),
                core.allows_multapses(),
            )?;
        }
        Ok(Self { indegree })
    }

    pub(crate) fn connect(&self, core: &BuilderCore<'_>) -> Result<()> {
        let loop_over_targets = core.loop_over_targets();
        let kernel = core.kernel();

        core.for_each_thread(|tid| {
            let mut rng = kernel.rngs().vp_specific(tid)?;

            if loop_over_targets {
                for target in core.targets() {
                    let handle = kernel.node_or_proxy(target, tid)?;
                    let indegree = self.draw_indegree(core, tid, &mut *rng, &handle)?;
                    if handle.is_proxy {
                        core.skip_conn_parameter(tid, indegree)?;
                        continue;
                    }
                    self.inner_connect(core, tid, &mut *rng, &handle, true, indegree)?;
                }
            } else {
                for handle in kernel.local_nodes(tid)? {
                    if !core.targets().contains(handle.id) {
                        continue;
                    }
                    let indegree = self.draw_indegree(core, tid, &mut *rng, &handle)?;
                    self.inner_connect(core, tid, &mut *rng, &handle, false, indegree)?;
                }
            }
            Ok(())
        });
        Ok(())
    }

    fn draw_indegree(
        &self,
        core: &BuilderCore<'_>,
        tid: usize,
        rng: &mut dyn RngCore,
        target: &NodeHandle,
    ) -> Result<usize> {
        let indegree = degree_count(self.indegree.value_double(tid, rng, ParamContext::node(target.id))?);
        if !core.allows_multapses() && indegree > core.sources().len() {
            return Err(ConnError::bad_property("Indegree cannot be larger than population size."));
        }
        Ok(indegree)
    }

    fn inner_connect(
        &self,
        core: &BuilderCore<'_>,
        tid: usize,
        rng: &mut dyn RngCore,
        target: &NodeHandle,
        skip: bool,
        indegree: usize,
    ) -> Result<()> {
        if target.thread != tid {
            if skip {
                core.skip_conn_parameter(tid, indegree)?;
            }
            return Ok(());
        }

        let num_sources = core.sources().len();
        let mut chosen: HashSet<usize> = HashSet::with_capacity(indegree);

        for _ in 0..indegree {
            let (lid, source) = loop {
                let lid = rng.ulrand(num_sources);
                let source = core.source_at(lid)?;
                let autapse = source == target.id && !core.allows_autapses();
                let multapse = !core.allows_multapses() && chosen.contains(&lid);
                if !autapse && !multapse {
                    break (lid, source);
                }
            };
            if !core.allows_multapses() {
                chosen.insert(lid);
            }
            core.single_connect(source, target, tid, rng)?;
        }
        Ok(())
    }
}

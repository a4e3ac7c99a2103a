//! Independent Bernoulli trial per source-target pair

use crate::{
    base::BuilderCore,
    error::{ConnError, Result},
    param::{ConnParameter, ParamContext, ParamValue},
};
use conngen_kernel::{NodeHandle, RngExt};

use rand::RngCore;

#[derive(Debug)]
pub(crate) struct Bernoulli {
    p: ConnParameter,
}

impl Bernoulli {
    pub(crate) fn new(core: &BuilderCore<'_>, p: &ParamValue) -> Result<Self> {
        let p = ConnParameter::for_rule("p", p.clone(), core.num_threads())?;
        if let Some(value) = p.constant() {
            if !(0.0..=1.0).contains(&value) {
                return Err(ConnError::bad_property("Connection probability 0 <= p <= 1 required."));
            }
        }
        Ok(Self { p })
    }

    pub(crate) fn connect(&self, core: &BuilderCore<'_>) -> Result<()> {
        let loop_over_targets = core.loop_over_targets();
        let kernel = core.kernel();

        core.for_each_thread(|tid| {
            let mut rng = kernel.rngs().vp_specific(tid)?;

            if loop_over_targets {
                for target in core.targets() {
                    let handle = kernel.node_or_proxy(target, tid)?;
                    if handle.is_proxy {
                        core.skip_conn_parameter(tid, 1)?;
                        continue;
                    }
                    self.inner_connect(core, tid, &mut *rng, &handle)?;
                }
            } else {
                for handle in kernel.local_nodes(tid)? {
                    if !core.targets().contains(handle.id) {
                        continue;
                    }
                    self.inner_connect(core, tid, &mut *rng, &handle)?;
                }
            }
            Ok(())
        });
        Ok(())
    }

    fn inner_connect(
        &self,
        core: &BuilderCore<'_>,
        tid: usize,
        rng: &mut dyn RngCore,
        target: &NodeHandle,
    ) -> Result<()> {
        if target.thread != tid {
            return Ok(());
        }

        for source in core.sources() {
            if source == target.id && !core.allows_autapses() {
                continue;
            }
            let draw = rng.drand();
            if draw >= self.p.value_double(tid, rng, ParamContext::node(target.id))? {
                continue;
            }
            core.single_connect(source, target, tid, rng)?;
        }
        Ok(())
    }
}

//! Every source to every target

use crate::{base::BuilderCore, error::Result};
use conngen_kernel::NodeHandle;

use rand::RngCore;

#[derive(Debug)]
pub(crate) struct AllToAll;

impl AllToAll {
    pub(crate) fn connect(&self, core: &BuilderCore<'_>) -> Result<()> {
        let loop_over_targets = core.loop_over_targets();
        let kernel = core.kernel();
        let num_sources = core.sources().len();

        core.for_each_thread(|tid| {
            let mut rng = kernel.rngs().vp_specific(tid)?;

            if loop_over_targets {
                for target in core.targets() {
                    let handle = kernel.node_or_proxy(target, tid)?;
                    if handle.is_proxy {
                        core.skip_conn_parameter(tid, num_sources)?;
                        continue;
                    }
                    Self::inner_connect(core, tid, &mut *rng, &handle, true)?;
                }
            } else {
                for handle in kernel.local_nodes(tid)? {
                    if !core.targets().contains(handle.id) {
                        continue;
                    }
                    Self::inner_connect(core, tid, &mut *rng, &handle, false)?;
                }
            }
            Ok(())
        });
        Ok(())
    }

    fn inner_connect(
        core: &BuilderCore<'_>,
        tid: usize,
        rng: &mut dyn RngCore,
        target: &NodeHandle,
        skip: bool,
    ) -> Result<()> {
        if target.thread != tid {
            if skip {
                core.skip_conn_parameter(tid, core.sources().len())?;
            }
            return Ok(());
        }

        for source in core.sources() {
            if source == target.id && !core.allows_autapses() {
                if skip {
                    core.skip_conn_parameter(tid, 1)?;
                }
                continue;
            }
            core.single_connect(source, target, tid, rng)?;
        }
        Ok(())
    }

    pub(crate) fn disconnect(&self, core: &BuilderCore<'_>) -> Result<()> {
        let kernel = core.kernel();

        core.for_each_thread(|tid| {
            for target in core.targets() {
                if !kernel.is_local_node_id(target) {
                    continue;
                }
                let handle = kernel.node_or_proxy(target, tid)?;
                if handle.is_proxy {
                    continue;
                }
                for source in core.sources() {
                    core.single_disconnect(source, &handle, tid)?;
                }
            }
            Ok(())
        });
        Ok(())
    }

    pub(crate) fn sp_connect(&self, core: &BuilderCore<'_>) -> Result<()> {
        let kernel = core.kernel();

        core.for_each_thread(|tid| {
            let mut rng = kernel.rngs().vp_specific(tid)?;
            for target in core.targets() {
                for source in core.sources() {
                    if source == target && !core.allows_autapses() {
                        core.skip_conn_parameter(tid, 1)?;
                        continue;
                    }
                    if !core.change_connected_synaptic_elements(source, target, tid, 1)? {
                        core.skip_conn_parameter(tid, 1)?;
                        continue;
                    }
                    let handle = kernel.node_or_proxy(target, tid)?;
                    core.single_connect(source, &handle, tid, &mut *rng)?;
                }
            }
            Ok(())
        });
        Ok(())
    }

    pub(crate) fn sp_disconnect(&self, core: &BuilderCore<'_>) -> Result<()> {
        let kernel = core.kernel();

        // counters stay untouched unless every edge to remove exists
        core.for_each_thread(|tid| {
            for target in core.targets() {
                for source in core.sources() {
                    core.check_connected(source, target, tid)?;
                }
            }
            Ok(())
        });
        core.drain_failures()?;

        core.for_each_thread(|tid| {
            for target in core.targets() {
                for source in core.sources() {
                    if !core.change_connected_synaptic_elements(source, target, tid, -1)? {
                        continue;
                    }
                    let handle = kernel.node_or_proxy(target, tid)?;
                    core.single_disconnect(source, &handle, tid)?;
                }
            }
            Ok(())
        });
        Ok(())
    }
}

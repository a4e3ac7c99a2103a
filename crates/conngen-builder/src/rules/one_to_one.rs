//! i-th source to i-th target

use crate::{
    base::BuilderCore,
    error::{ConnError, Result},
};

#[derive(Debug)]
pub(crate) struct OneToOne;

impl OneToOne {
    pub(crate) fn new(core: &BuilderCore<'_>) -> Result<Self> {
        let (sources, targets) = (core.sources().len(), core.targets().len());
        if sources != targets {
            return Err(ConnError::dimension_mismatch(
                "Source and Target population must be of the same size.",
                sources,
                targets,
            ));
        }
        Ok(Self)
    }

    pub(crate) fn connect(&self, core: &BuilderCore<'_>) -> Result<()> {
        let loop_over_targets = core.loop_over_targets();
        let kernel = core.kernel();

        core.for_each_thread(|tid| {
            let mut rng = kernel.rngs().vp_specific(tid)?;

            if loop_over_targets {
                for (source, target) in core.sources().iter().zip(core.targets().iter()) {
                    if source == target && !core.allows_autapses() {
                        continue;
                    }
                    let handle = kernel.node_or_proxy(target, tid)?;
                    if handle.is_proxy {
                        core.skip_conn_parameter(tid, 1)?;
                        continue;
                    }
                    core.single_connect(source, &handle, tid, &mut *rng)?;
                }
            } else {
                for handle in kernel.local_nodes(tid)? {
                    let Some(lid) = core.targets().get_lid(handle.id) else {
                        continue;
                    };
                    let source = core.source_at(lid)?;
                    if source == handle.id && !core.allows_autapses() {
                        continue;
                    }
                    core.single_connect(source, &handle, tid, &mut *rng)?;
                }
            }
            Ok(())
        });
        Ok(())
    }

    pub(crate) fn disconnect(&self, core: &BuilderCore<'_>) -> Result<()> {
        let kernel = core.kernel();

        core.for_each_thread(|tid| {
            for (source, target) in core.sources().iter().zip(core.targets().iter()) {
                if !kernel.is_local_node_id(target) {
                    continue;
                }
                let handle = kernel.node_or_proxy(target, tid)?;
                if handle.is_proxy {
                    continue;
                }
                core.single_disconnect(source, &handle, tid)?;
            }
            Ok(())
        });
        Ok(())
    }

    pub(crate) fn sp_connect(&self, core: &BuilderCore<'_>) -> Result<()> {
        let kernel = core.kernel();

        core.for_each_thread(|tid| {
            let mut rng = kernel.rngs().vp_specific(tid)?;
            for (source, target) in core.sources().iter().zip(core.targets().iter()) {
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
        Ok(())
    }

    pub(crate) fn sp_disconnect(&self, core: &BuilderCore<'_>) -> Result<()> {
        let kernel = core.kernel();

        // counters stay untouched unless every edge to remove exists
        core.for_each_thread(|tid| {
            for (source, target) in core.sources().iter().zip(core.targets().iter()) {
                core.check_connected(source, target, tid)?;
            }
            Ok(())
        });
        core.drain_failures()?;

        core.for_each_thread(|tid| {
            for (source, target) in core.sources().iter().zip(core.targets().iter()) {
                if !core.change_connected_synaptic_elements(source, target, tid, -1)? {
                    continue;
                }
                let handle = kernel.node_or_proxy(target, tid)?;
                core.single_disconnect(source, &handle, tid)?;
            }
            Ok(())
        });
        Ok(())
    }
}

//! Virtual-process mapping between nodes, threads and ranks

use crate::NodeId;

/// Mapping of node ids onto virtual processes, threads and ranks
///
/// Every rank runs the same number of local threads. Virtual process `vp`
/// lives on rank `vp % num_processes` as thread `vp / num_processes`, and
/// node `id` is owned by virtual process `id % num_virtual_processes`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VirtualProcessMap {
    local_num_threads: usize,
    num_processes: usize,
    rank: usize,
}

impl VirtualProcessMap {
    /// Create a mapping for the given rank of a run
    ///
    /// Zero thread or process counts are clamped to one.
    pub fn new(local_num_threads: usize, num_processes: usize, rank: usize) -> Self {
        Self {
            local_num_threads: local_num_threads.max(1),
            num_processes: num_processes.max(1),
            rank,
        }
    }

    /// Number of threads on each rank
    pub fn num_threads(&self) -> usize {
        self.local_num_threads
    }

    /// Number of ranks
    pub fn num_processes(&self) -> usize {
        self.num_processes
    }

    /// Rank this mapping was created for
    pub fn rank(&self) -> usize {
        self.rank
    }

    /// Total number of virtual processes across all ranks
    pub fn num_virtual_processes(&self) -> usize {
        self.local_num_threads * self.num_processes
    }

    /// Virtual process owning the node
    pub fn node_to_vp(&self, id: NodeId) -> usize {
        (id.raw() % self.num_virtual_processes() as u64) as usize
    }

    /// Thread index a virtual process runs on
    pub fn vp_to_thread(&self, vp: usize) -> usize {
        vp / self.num_processes
    }

    /// Rank a virtual process runs on
    pub fn vp_to_rank(&self, vp: usize) -> usize {
        vp % self.num_processes
    }

    /// Virtual process of a local thread
    pub fn thread_to_vp(&self, tid: usize) -> usize {
        tid * self.num_processes + self.rank
    }

    /// Whether the virtual process runs on this rank
    pub fn is_local_vp(&self, vp: usize) -> bool {
        self.vp_to_rank(vp) == self.rank
    }

    /// Thread that owns the node on its rank
    pub fn node_to_thread(&self, id: NodeId) -> usize {
        self.vp_to_thread(self.node_to_vp(id))
    }

    /// Whether the node is owned by this rank
    pub fn is_local_node(&self, id: NodeId) -> bool {
        self.is_local_vp(self.node_to_vp(id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_single_rank_mapping() {
        let map = VirtualProcessMap::new(4, 1, 0);
        assert_eq!(map.num_virtual_processes(), 4);
        assert_eq!(map.node_to_vp(NodeId::new(6)), 2);
        assert_eq!(map.node_to_thread(NodeId::new(6)), 2);
        assert!(map.is_local_node(NodeId::new(6)));
    }

    #[test]
    fn test_multi_rank_mapping() {
        let map = VirtualProcessMap::new(2, 3, 1);
        assert_eq!(map.num_virtual_processes(), 6);
        for tid in 0..2 {
            let vp = map.thread_to_vp(tid);
            assert!(map.is_local_vp(vp));
            assert_eq!(map.vp_to_thread(vp), tid);
        }
        // vp 3 lives on rank 0
        assert!(!map.is_local_vp(3));
        assert!(map.is_local_node(NodeId::new(4)));
        assert!(!map.is_local_node(NodeId::new(5)));
    }

    #[test]
    fn test_zero_counts_are_clamped() {
        let map = VirtualProcessMap::new(0, 0, 0);
        assert_eq!(map.num_threads(), 1);
        assert_eq!(map.num_processes(), 1);
    }
}

//! Node ownership and collection indexing for arbitrary layouts

use conngen_kernel::{KernelConfig, MemoryKernel, NodeCollection, NodeId, NodeRegistry, VirtualProcessMap};
use proptest::prelude::*;

proptest! {
    #[test]
    fn every_node_has_exactly_one_owner(
        threads in 1usize..6,
        processes in 1usize..5,
        id in 1u64..10_000
    ) {
        let node = NodeId::new(id);
        let owners: Vec<(usize, usize)> = (0..processes)
            .map(|rank| VirtualProcessMap::new(threads, processes, rank))
            .filter(|map| map.is_local_node(node))
            .map(|map| (map.rank(), map.node_to_thread(node)))
            .collect();

        prop_assert_eq!(owners.len(), 1);
        let (rank, thread) = owners[0];
        prop_assert!(thread < threads);
        let map = VirtualProcessMap::new(threads, processes, rank);
        prop_assert_eq!(map.thread_to_vp(thread), map.node_to_vp(node));
    }

    #[test]
    fn thread_and_vp_are_inverse(
        threads in 1usize..6,
        processes in 1usize..5,
        rank_seed in any::<usize>()
    ) {
        let rank = rank_seed % processes;
        let map = VirtualProcessMap::new(threads, processes, rank);
        for tid in 0..threads {
            let vp = map.thread_to_vp(tid);
            prop_assert!(map.is_local_vp(vp));
            prop_assert_eq!(map.vp_to_thread(vp), tid);
        }
    }

    #[test]
    fn collection_lids_match_positions(ids in proptest::collection::btree_set(1u64..500, 0..40)) {
        let ids: Vec<u64> = ids.into_iter().collect();
        let collection = NodeCollection::from_ids(ids.iter().map(|&i| NodeId::new(i))).unwrap();

        prop_assert_eq!(collection.len(), ids.len());
        for (lid, &id) in ids.iter().enumerate() {
            prop_assert_eq!(collection.get(lid), Some(NodeId::new(id)));
            prop_assert_eq!(collection.get_lid(NodeId::new(id)), Some(lid));
        }
        prop_assert_eq!(collection.get(ids.len()), None);
    }
}

#[test]
fn local_nodes_partition_the_network() {
    let mut kernel = MemoryKernel::new(KernelConfig::default().with_threads(3)).unwrap();
    let neurons = kernel.create_neurons(10).unwrap();
    let devices = kernel.create_devices(2).unwrap();

    let mut owned: Vec<u64> = Vec::new();
    for tid in 0..3 {
        let local = kernel.local_nodes(tid).unwrap();
        // devices are replicated on every thread
        for device in &devices {
            assert!(local.iter().any(|h| h.id == device && !h.has_proxies));
        }
        owned.extend(local.iter().filter(|h| h.has_proxies).map(|h| h.id.raw()));
    }
    owned.sort_unstable();
    assert_eq!(owned, neurons.ids().iter().map(|id| id.raw()).collect::<Vec<_>>());
}

//! Randomized structural checks for `NodeStore`.
//!
//! A fixed-seed generator drives a long mix of creates, reparents and
//! deletes; after every step the store must still be one tree.

use mm_core::{MapError, NodeFields, NodeId, NodeStore, persist};
use pretty_assertions::assert_eq;
use std::collections::HashSet;

/// Small deterministic LCG so failures replay exactly.
struct Lcg(u64);

impl Lcg {
    fn next(&mut self) -> u64 {
        self.0 = self
            .0
            .wrapping_mul(6_364_136_223_846_793_005)
            .wrapping_add(1_442_695_040_888_963_407);
        self.0 >> 33
    }

    fn pick<T: Copy>(&mut self, items: &[T]) -> T {
        items[(self.next() as usize) % items.len()]
    }
}

#[test]
fn random_edits_keep_a_single_tree() {
    let mut rng = Lcg(0x5eed);
    let mut store = NodeStore::new(NodeId::intern("inv_root"), NodeFields::default());
    let mut ever_used: HashSet<NodeId> = HashSet::from([store.root()]);

    for step in 0..2_000 {
        let live = store.pre_order();
        match rng.next() % 4 {
            0 | 1 => {
                let parent = rng.pick(&live);
                let id = store.allocate_id();
                assert!(ever_used.insert(id), "step {step}: {id} handed out twice");
                store.create(id, Some(parent), NodeFields::default()).unwrap();
            }
            2 => {
                let node = rng.pick(&live);
                let target = rng.pick(&live);
                let result = store.set_parent(node, target);
                if node == store.root() {
                    assert!(matches!(result, Err(MapError::InvalidRootOperation(_))));
                } else if node == target || store.is_ancestor_of(node, target) {
                    assert!(matches!(result, Err(MapError::Cycle { .. })));
                } else {
                    result.unwrap();
                    assert_eq!(store.parent_of(node), Some(target));
                }
            }
            _ => {
                let node = rng.pick(&live);
                let result = store.delete(node);
                if node == store.root() {
                    assert!(result.is_err());
                } else if store.child_count(node) > 0 {
                    assert_eq!(result.unwrap_err(), MapError::HasChildren(node));
                } else {
                    result.unwrap();
                    assert!(!store.contains(node));
                }
            }
        }
        if let Err(e) = store.validate() {
            panic!("step {step}: {e}");
        }
        assert_eq!(store.pre_order().len(), store.len());
    }
}

#[test]
fn persistence_roundtrip_after_random_edits() {
    let mut rng = Lcg(42);
    let mut store = NodeStore::new(NodeId::intern("inv_rt_root"), NodeFields::default());
    for _ in 0..200 {
        let parent = rng.pick(&store.pre_order());
        let id = store.allocate_id();
        store.create(id, Some(parent), NodeFields::default()).unwrap();
    }

    let json = persist::to_json(&store).unwrap();
    let back = persist::from_json(&json).unwrap();
    assert_eq!(back.pre_order(), store.pre_order());
    for id in store.pre_order() {
        assert_eq!(back.parent_of(id), store.parent_of(id));
        assert_eq!(back.children(id), store.children(id));
    }
}

#[test]
fn restored_store_keeps_id_history() {
    let mut store = NodeStore::new(NodeId::intern("inv_hist_root"), NodeFields::default());
    let first = store.allocate_id();
    store.create(first, Some(store.root()), NodeFields::default()).unwrap();
    let snapshot = persist::to_snapshot(&store).unwrap();

    let second = store.allocate_id();
    store.create(second, Some(store.root()), NodeFields::default()).unwrap();
    store.delete(second).unwrap();

    let mut restored = persist::from_snapshot(&snapshot).unwrap();
    restored.adopt_id_history(&store);
    assert!(restored.is_used(second));
    let next = restored.allocate_id();
    assert!(next != first && next != second);
}

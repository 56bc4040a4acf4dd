//! Hit testing: point → node lookup.
//!
//! Nodes are painted in pre-order, so the topmost node at a point is the
//! last match in pre-order. Unplaced nodes are invisible and never hit.

use mm_core::{NodeId, NodeStore};

/// Find the topmost node at position (px, py).
/// Returns `None` if no node is hit (background).
pub fn hit_test(store: &NodeStore, px: f32, py: f32) -> Option<NodeId> {
    topmost_at(store, px, py, |_| true)
}

/// Find all nodes whose bounds intersect the given rectangle.
/// Used for drag-box selection.
pub fn hit_test_rect(store: &NodeStore, rx: f32, ry: f32, rw: f32, rh: f32) -> Vec<NodeId> {
    store
        .pre_order()
        .into_iter()
        .filter(|id| {
            store
                .get(*id)
                .is_some_and(|n| n.is_placed() && n.bounds().intersects_rect(rx, ry, rw, rh))
        })
        .collect()
}

/// Node that `dragged` would be dropped onto at (px, py).
///
/// The dragged node and its descendants are skipped: dropping there would
/// create a cycle, and the dragged box itself is always under the pointer.
pub fn drop_target(store: &NodeStore, dragged: NodeId, px: f32, py: f32) -> Option<NodeId> {
    topmost_at(store, px, py, |id| {
        id != dragged && !store.is_ancestor_of(dragged, id)
    })
}

fn topmost_at(
    store: &NodeStore,
    px: f32,
    py: f32,
    accept: impl Fn(NodeId) -> bool,
) -> Option<NodeId> {
    store.pre_order().into_iter().rev().find(|id| {
        accept(*id)
            && store
                .get(*id)
                .is_some_and(|n| n.is_placed() && n.bounds().contains(px, py))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use mm_core::{NodeFields, Position};

    fn at(x: f32, y: f32) -> NodeFields {
        NodeFields {
            position: Some(Position::new(x, y)),
            ..NodeFields::default()
        }
    }

    /// root at (0,0); a at (200,0); b (child of a) overlapping a's right half.
    fn sample() -> (NodeStore, NodeId, NodeId) {
        let mut store = NodeStore::new(NodeId::intern("h_root"), at(0.0, 0.0));
        let a = store
            .create(NodeId::intern("h_a"), Some(store.root()), at(200.0, 0.0))
            .unwrap();
        let b = store
            .create(NodeId::intern("h_b"), Some(a), at(250.0, 20.0))
            .unwrap();
        (store, a, b)
    }

    #[test]
    fn hit_test_basic() {
        let (store, a, b) = sample();
        assert_eq!(hit_test(&store, 10.0, 10.0), Some(store.root()));
        assert_eq!(hit_test(&store, 210.0, 10.0), Some(a));
        // Overlap: b is painted after a.
        assert_eq!(hit_test(&store, 260.0, 30.0), Some(b));
        assert_eq!(hit_test(&store, 799.0, 599.0), None);
    }

    #[test]
    fn unplaced_nodes_are_not_hit() {
        let (mut store, _, _) = sample();
        store
            .create(NodeId::intern("h_loose"), Some(store.root()), NodeFields::default())
            .unwrap();
        // The loose node's default (0,0) box overlaps the root but is invisible.
        assert_eq!(hit_test(&store, 10.0, 10.0), Some(store.root()));
    }

    #[test]
    fn rect_collects_in_pre_order() {
        let (store, a, b) = sample();
        assert_eq!(hit_test_rect(&store, 150.0, 0.0, 200.0, 100.0), vec![a, b]);
        assert!(hit_test_rect(&store, 1000.0, 1000.0, 5.0, 5.0).is_empty());
    }

    #[test]
    fn drop_target_skips_dragged_subtree() {
        let (store, a, b) = sample();
        // Over the a/b overlap while dragging a: neither a nor b qualifies.
        assert_eq!(drop_target(&store, a, 260.0, 30.0), None);
        // Dragging b over the same spot lands on a.
        assert_eq!(drop_target(&store, b, 260.0, 30.0), Some(a));
        assert_eq!(drop_target(&store, b, 10.0, 10.0), Some(store.root()));
    }
}

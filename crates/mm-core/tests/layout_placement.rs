//! Integration tests: build a map → layout pass → verify placement.

use mm_core::layout::{LayoutConfig, LayoutEngine, Viewport};
use mm_core::{Bounds, NodeFields, NodeId, NodeStore, Placement, Position, Side};
use pretty_assertions::assert_eq;

const VIEWPORT: Viewport = Viewport {
    width: 800.0,
    height: 600.0,
};

fn add(store: &mut NodeStore, id: &str, parent: NodeId) -> NodeId {
    store
        .create(NodeId::intern(id), Some(parent), NodeFields::default())
        .unwrap()
}

/// Root with two children, each with two children, each with two children.
fn three_levels() -> NodeStore {
    let mut store = NodeStore::new(NodeId::intern("lp_root"), NodeFields::default());
    let root = store.root();
    for a in ["lp_a", "lp_b"] {
        let a_id = add(&mut store, a, root);
        for b in ["1", "2"] {
            let b_id = add(&mut store, &format!("{a}{b}"), a_id);
            for c in ["x", "y"] {
                add(&mut store, &format!("{a}{b}{c}"), b_id);
            }
        }
    }
    store
}

fn boxes(store: &NodeStore) -> Vec<(NodeId, Bounds)> {
    store.iter().map(|n| (n.id(), n.bounds())).collect()
}

// ─── Full pass ──────────────────────────────────────────────────────────

#[test]
fn full_pass_places_every_node_without_overlap() {
    let mut store = three_levels();
    let engine = LayoutEngine::default();
    let report = engine.layout_all(&mut store, VIEWPORT);

    assert_eq!(report.placed.len(), store.len() - 1);
    assert!(report.crowded.is_empty(), "crowded: {:?}", report.crowded);
    assert!(store.iter().all(|n| n.placement == Placement::Auto));

    let all = boxes(&store);
    for (i, (a, ba)) in all.iter().enumerate() {
        for (b, bb) in &all[i + 1..] {
            assert!(!ba.intersects(bb), "{a} overlaps {b}: {ba:?} vs {bb:?}");
        }
    }
}

#[test]
fn children_grow_away_from_the_root() {
    let mut store = three_levels();
    LayoutEngine::default().layout_all(&mut store, VIEWPORT);

    let root = store.get(store.root()).unwrap().bounds();
    for node in store.iter().filter(|n| n.id() != store.root()) {
        let parent = store.get(store.parent_of(node.id()).unwrap()).unwrap();
        match node.side {
            Some(Side::Right) => {
                assert!(node.position.x >= parent.bounds().right(), "{}", node.id());
                assert!(node.position.x >= root.right());
            }
            Some(Side::Left) => {
                assert!(node.bounds().right() <= parent.position.x, "{}", node.id());
                assert!(node.bounds().right() <= root.x);
            }
            None => panic!("{} has no side", node.id()),
        }
    }
}

#[test]
fn layout_is_deterministic() {
    let mut first = three_levels();
    let mut second = three_levels();
    let engine = LayoutEngine::default();
    engine.layout_all(&mut first, VIEWPORT);
    engine.layout_all(&mut second, VIEWPORT);
    // Repeat on an already-placed map: stored sides keep the result stable.
    engine.layout_all(&mut second, VIEWPORT);

    let positions = |s: &NodeStore| -> Vec<(NodeId, Position)> {
        s.pre_order()
            .into_iter()
            .map(|id| (id, s.get(id).unwrap().position))
            .collect()
    };
    assert_eq!(positions(&first), positions(&second));
}

#[test]
fn pinned_nodes_are_obstacles() {
    let mut store = NodeStore::new(NodeId::intern("lp_pin_root"), NodeFields::default());
    let root = store.root();
    // Sits exactly where the first right-hand child would go.
    store
        .create(
            NodeId::intern("lp_pin_blocker"),
            Some(root),
            NodeFields {
                position: Some(Position::new(500.0, 280.0)),
                ..NodeFields::default()
            },
        )
        .unwrap();
    let free = add(&mut store, "lp_pin_free", root);
    let later = add(&mut store, "lp_pin_later", root);

    LayoutEngine::default().layout_all(&mut store, VIEWPORT);

    let blocker = store.get(NodeId::intern("lp_pin_blocker")).unwrap();
    assert_eq!(blocker.position, Position::new(500.0, 280.0));
    let free = store.get(free).unwrap();
    let later = store.get(later).unwrap();
    // Index 1 → left, index 2 → right and nudged off the blocker.
    assert_eq!(free.side, Some(Side::Left));
    assert_eq!(later.side, Some(Side::Right));
    assert!(!later.bounds().intersects(&blocker.bounds()));
}

#[test]
fn tighter_config_changes_spacing() {
    let mut store = NodeStore::new(NodeId::intern("lp_cfg_root"), NodeFields::default());
    let root = store.root();
    let child = add(&mut store, "lp_cfg_child", root);
    let engine = LayoutEngine::new(LayoutConfig {
        horizontal_spacing: 10.0,
        ..LayoutConfig::default()
    });
    engine.layout_all(&mut store, VIEWPORT);
    assert_eq!(store.get(child).unwrap().position, Position::new(460.0, 280.0));
}

//! Incremental mind map layout.
//!
//! Places nodes beside their parent (left or right) and nudges them
//! vertically in alternating steps until their box clears every other
//! placed box. Pinned nodes are obstacles, never moved. The search is
//! bounded: when it runs out of attempts the last candidate is used and a
//! warning is logged.

use crate::id::NodeId;
use crate::model::*;
use serde::{Deserialize, Serialize};

/// The canvas (viewport) dimensions.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Viewport {
    pub width: f32,
    pub height: f32,
}

impl Default for Viewport {
    fn default() -> Self {
        Self {
            width: 800.0,
            height: 600.0,
        }
    }
}

/// Source of the current container size, queried at layout time.
pub trait ViewportProvider {
    fn viewport(&self) -> Viewport;
}

impl ViewportProvider for Viewport {
    fn viewport(&self) -> Viewport {
        *self
    }
}

/// Layout tuning.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LayoutConfig {
    /// Gap between a parent's outer edge and its child. Default: 50.
    pub horizontal_spacing: f32,
    /// Vertical nudge per collision attempt. Default: 20.
    pub vertical_step: f32,
    /// Minimum clearance between two boxes. Default: 4.
    pub collision_margin: f32,
    /// Candidates tried before settling for the last one. Default: 50.
    pub max_attempts: u32,
    /// Size given to nodes the host has not measured yet. Default: 100×40.
    pub default_node_size: Size,
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            horizontal_spacing: 50.0,
            vertical_step: 20.0,
            collision_margin: 4.0,
            max_attempts: 50,
            default_node_size: Size::default(),
        }
    }
}

/// Outcome of placing one node.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlacementResult {
    pub position: Position,
    pub side: Side,
    /// `false` when the search was exhausted and the last candidate was kept.
    pub collision_free: bool,
    pub attempts: u32,
}

/// Summary of a layout pass.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LayoutReport {
    /// Nodes whose position was (re)computed.
    pub placed: Vec<NodeId>,
    /// Placed nodes that could not be given a collision-free slot.
    pub crowded: Vec<NodeId>,
}

impl LayoutReport {
    fn record(&mut self, id: NodeId, result: &PlacementResult) {
        self.placed.push(id);
        if !result.collision_free {
            self.crowded.push(id);
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct LayoutEngine {
    config: LayoutConfig,
}

impl LayoutEngine {
    pub fn new(config: LayoutConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &LayoutConfig {
        &self.config
    }

    /// Root box centered in the viewport.
    pub fn root_position(&self, viewport: Viewport, root_size: Size) -> Position {
        Position::new(
            viewport.width / 2.0 - root_size.width / 2.0,
            viewport.height / 2.0 - root_size.height / 2.0,
        )
    }

    /// Lay out the whole map: center the root, then re-place every
    /// non-pinned node in pre-order.
    pub fn layout_all(&self, store: &mut NodeStore, viewport: Viewport) -> LayoutReport {
        let root = store.root();
        let mut report = LayoutReport::default();

        if let Some(node) = store.get_mut(root) {
            node.position = self.root_position(viewport, node.size);
            node.placement = Placement::Auto;
            node.side = None;
        }

        let order = store.descendants(root);
        let mut obstacles: Vec<(NodeId, Bounds)> = store
            .iter()
            .filter(|n| n.id() == root || n.is_pinned())
            .map(|n| (n.id(), n.bounds()))
            .collect();

        self.place_in_order(store, &order, &mut obstacles, &mut report);
        log::debug!(
            "layout pass: {} nodes placed, {} crowded",
            report.placed.len(),
            report.crowded.len()
        );
        report
    }

    /// Re-place `anchor` (unless pinned) and its non-pinned descendants,
    /// treating everything outside the subtree as fixed.
    pub fn layout_subtree(
        &self,
        store: &mut NodeStore,
        anchor: NodeId,
        viewport: Viewport,
    ) -> LayoutReport {
        if anchor == store.root() {
            return self.layout_all(store, viewport);
        }
        if !store.contains(anchor) {
            return LayoutReport::default();
        }

        let mut order = vec![anchor];
        order.extend(store.descendants(anchor));

        let mut obstacles: Vec<(NodeId, Bounds)> = store
            .iter()
            .filter(|n| n.is_placed())
            .filter(|n| n.is_pinned() || !order.contains(&n.id()))
            .map(|n| (n.id(), n.bounds()))
            .collect();

        let mut report = LayoutReport::default();
        self.place_in_order(store, &order, &mut obstacles, &mut report);
        report
    }

    /// Place a single node against every other placed node.
    pub fn place_node(&self, store: &mut NodeStore, id: NodeId) -> Option<PlacementResult> {
        let node = store.get(id)?;
        if node.is_pinned() || id == store.root() {
            return None;
        }
        let obstacles: Vec<(NodeId, Bounds)> = store
            .iter()
            .filter(|n| n.is_placed() && n.id() != id)
            .map(|n| (n.id(), n.bounds()))
            .collect();
        let result = self.compute(store, id, &obstacles)?;
        apply(store, id, &result);
        Some(result)
    }

    fn place_in_order(
        &self,
        store: &mut NodeStore,
        order: &[NodeId],
        obstacles: &mut Vec<(NodeId, Bounds)>,
        report: &mut LayoutReport,
    ) {
        for &id in order {
            let pinned = store.get(id).is_none_or(|n| n.is_pinned());
            if pinned {
                continue;
            }
            let Some(result) = self.compute(store, id, obstacles) else {
                continue;
            };
            apply(store, id, &result);
            report.record(id, &result);
            if let Some(node) = store.get(id) {
                obstacles.push((id, node.bounds()));
            }
        }
    }

    fn compute(
        &self,
        store: &NodeStore,
        id: NodeId,
        obstacles: &[(NodeId, Bounds)],
    ) -> Option<PlacementResult> {
        let node = store.get(id)?;
        let parent = store.get(store.parent_of(id)?)?;
        let side = self.choose_side(store, id);
        let others: Vec<Bounds> = obstacles
            .iter()
            .filter(|(other, _)| *other != id)
            .map(|(_, b)| *b)
            .collect();
        let result = self.search(&parent.bounds(), node.size, side, &others);
        if !result.collision_free {
            log::warn!(
                "no free slot for {id} after {} attempts; keeping last candidate",
                result.attempts
            );
        }
        Some(result)
    }

    /// Side for a non-root node.
    ///
    /// Children of the root alternate by sibling index (even → right,
    /// odd → left) unless a side was already recorded; deeper nodes grow
    /// on their parent's side.
    pub fn choose_side(&self, store: &NodeStore, id: NodeId) -> Side {
        let root = store.root();
        let Some(parent_id) = store.parent_of(id) else {
            return Side::Right;
        };
        if parent_id == root {
            if let Some(side) = store.get(id).and_then(|n| n.side) {
                return side;
            }
            let index = store.sibling_index(id).unwrap_or(0);
            return if index % 2 == 0 { Side::Right } else { Side::Left };
        }
        match store.get(parent_id) {
            Some(parent) => parent
                .side
                .unwrap_or_else(|| side_of(store, parent.bounds())),
            None => Side::Right,
        }
    }

    /// Alternating vertical search: `0, +step, -step, +2·step, -2·step, …`.
    pub fn search(
        &self,
        parent: &Bounds,
        size: Size,
        side: Side,
        obstacles: &[Bounds],
    ) -> PlacementResult {
        let spacing = self.config.horizontal_spacing;
        let x = match side {
            Side::Right => parent.right() + spacing,
            Side::Left => parent.x - spacing - size.width,
        };

        let max_attempts = self.config.max_attempts.max(1);
        let mut candidate = Position::new(x, parent.y);
        for attempt in 0..max_attempts {
            let k = attempt.div_ceil(2) as f32;
            let sign = if attempt % 2 == 1 { 1.0 } else { -1.0 };
            candidate = Position::new(x, parent.y + sign * k * self.config.vertical_step);

            let bounds = Bounds::new(candidate, size);
            let clear = !obstacles
                .iter()
                .any(|o| bounds.collides(o, self.config.collision_margin));
            if clear {
                return PlacementResult {
                    position: candidate,
                    side,
                    collision_free: true,
                    attempts: attempt + 1,
                };
            }
        }

        PlacementResult {
            position: candidate,
            side,
            collision_free: false,
            attempts: max_attempts,
        }
    }
}

/// Side of the root a box sits on, by center.
pub fn side_of(store: &NodeStore, bounds: Bounds) -> Side {
    let root_center = store
        .get(store.root())
        .map(|r| r.bounds().center().0)
        .unwrap_or(0.0);
    if bounds.center().0 < root_center {
        Side::Left
    } else {
        Side::Right
    }
}

fn apply(store: &mut NodeStore, id: NodeId, result: &PlacementResult) {
    if let Some(node) = store.get_mut(id) {
        node.position = result.position;
        node.placement = Placement::Auto;
        node.side = Some(result.side);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const VIEWPORT: Viewport = Viewport {
        width: 800.0,
        height: 600.0,
    };

    fn store() -> NodeStore {
        NodeStore::new(NodeId::intern("root"), NodeFields::default())
    }

    fn add(store: &mut NodeStore, id: &str, parent: NodeId) -> NodeId {
        store
            .create(NodeId::intern(id), Some(parent), NodeFields::default())
            .unwrap()
    }

    #[test]
    fn root_is_centered() {
        let mut s = store();
        let engine = LayoutEngine::default();
        engine.layout_all(&mut s, VIEWPORT);
        let root = s.get(s.root()).unwrap();
        assert_eq!(root.position, Position::new(350.0, 280.0));
        assert_eq!(root.bounds().center(), (400.0, 300.0));
    }

    #[test]
    fn search_sequence_alternates() {
        let engine = LayoutEngine::default();
        let parent = Bounds::new(Position::new(0.0, 100.0), Size::new(100.0, 40.0));
        // Block y = 100 and y = 120 (the first two candidates).
        let obstacles = [
            Bounds::new(Position::new(150.0, 90.0), Size::new(100.0, 50.0)),
            Bounds::new(Position::new(150.0, 140.0), Size::new(100.0, 10.0)),
        ];
        let result = engine.search(&parent, Size::new(100.0, 40.0), Side::Right, &obstacles);
        assert!(result.collision_free);
        // 0 and +20 collide; -20 still touches the first obstacle's margin,
        // so the search keeps alternating until it clears.
        assert_eq!(result.position.x, 150.0);
        assert!(result.attempts > 2);
        let placed = Bounds::new(result.position, Size::new(100.0, 40.0));
        assert!(obstacles.iter().all(|o| !placed.collides(o, 4.0)));
    }

    #[test]
    fn exhausted_search_returns_last_candidate() {
        let engine = LayoutEngine::new(LayoutConfig {
            max_attempts: 3,
            ..LayoutConfig::default()
        });
        let parent = Bounds::new(Position::new(0.0, 0.0), Size::new(100.0, 40.0));
        let wall = [Bounds::new(
            Position::new(0.0, -1000.0),
            Size::new(1000.0, 2000.0),
        )];
        let result = engine.search(&parent, Size::new(100.0, 40.0), Side::Right, &wall);
        assert!(!result.collision_free);
        assert_eq!(result.attempts, 3);
        // attempts: 0, +20, -20
        assert_eq!(result.position.y, -20.0);
    }

    #[test]
    fn root_children_alternate_sides() {
        let mut s = store();
        let engine = LayoutEngine::default();
        engine.layout_all(&mut s, VIEWPORT);
        let root = s.root();
        let a = add(&mut s, "a", root);
        engine.place_node(&mut s, a);
        let b = add(&mut s, "b", root);
        engine.place_node(&mut s, b);

        assert_eq!(s.get(a).unwrap().side, Some(Side::Right));
        assert_eq!(s.get(b).unwrap().side, Some(Side::Left));
        assert_eq!(s.get(a).unwrap().position.x, 450.0 + 50.0);
        assert_eq!(s.get(b).unwrap().position.x, 350.0 - 50.0 - 100.0);
    }

    #[test]
    fn grandchildren_follow_parent_side() {
        let mut s = store();
        let engine = LayoutEngine::default();
        let root = s.root();
        let a = add(&mut s, "a", root);
        let b = add(&mut s, "b", root);
        let b1 = add(&mut s, "b1", b);
        engine.layout_all(&mut s, VIEWPORT);

        assert_eq!(s.get(a).unwrap().side, Some(Side::Right));
        assert_eq!(s.get(b1).unwrap().side, Some(Side::Left));
        assert!(s.get(b1).unwrap().position.x < s.get(b).unwrap().position.x);
    }

    #[test]
    fn pinned_nodes_are_not_moved() {
        let mut s = store();
        let engine = LayoutEngine::default();
        let root = s.root();
        let a = add(&mut s, "a", root);
        engine.layout_all(&mut s, VIEWPORT);
        {
            let node = s.get_mut(a).unwrap();
            node.position = Position::new(0.0, 0.0);
            node.placement = Placement::Pinned;
        }
        engine.layout_all(&mut s, VIEWPORT);
        // A pinned node at the origin stays there: no sentinel semantics.
        assert_eq!(s.get(a).unwrap().position, Position::new(0.0, 0.0));
        assert!(s.get(a).unwrap().is_pinned());
    }

    #[test]
    fn subtree_layout_follows_moved_anchor() {
        let mut s = store();
        let engine = LayoutEngine::default();
        let root = s.root();
        let a = add(&mut s, "a", root);
        let a1 = add(&mut s, "a1", a);
        engine.layout_all(&mut s, VIEWPORT);
        let before = s.get(a1).unwrap().position;

        {
            let node = s.get_mut(a).unwrap();
            node.position.y += 200.0;
            node.placement = Placement::Pinned;
        }
        engine.layout_subtree(&mut s, a, VIEWPORT);
        let after = s.get(a1).unwrap().position;
        assert_eq!(after.x, before.x);
        assert_eq!(after.y, before.y + 200.0);
    }
}

//! Tree mutation engine.
//!
//! `TreeMutator` owns the `NodeStore` and is the only component that
//! changes topology. Every mutation validates its preconditions before
//! touching the store, then triggers layout for the affected nodes and
//! marks their connectors dirty. Connector geometry is rebuilt once per
//! animation frame by `flush_frame`, so a burst of drag moves costs one
//! redraw.

use mm_core::layout::{LayoutEngine, Viewport, ViewportProvider, side_of};
use mm_core::{
    Content, MapError, NodeFields, NodeId, NodeStore, NodeStyle, Placement, Position, Result,
    RootOp, Size, StyleEdit, persist,
};
use mm_render::ConnectorSet;
use std::collections::HashSet;

/// A topology or record change, as produced by tools and shortcuts.
#[derive(Debug, Clone, PartialEq)]
pub enum MapMutation {
    AddChild {
        parent: NodeId,
        content: Option<Content>,
    },
    RemoveNodes {
        targets: Vec<NodeId>,
        cascade: bool,
    },
    /// `relayout: false` keeps the node pinned where it was dropped.
    Reparent {
        id: NodeId,
        new_parent: NodeId,
        relayout: bool,
    },
    MoveNode {
        id: NodeId,
        dx: f32,
        dy: f32,
    },
    SetPosition {
        id: NodeId,
        position: Position,
    },
    ResetPosition {
        id: NodeId,
    },
    SetContent {
        id: NodeId,
        content: Content,
    },
    SetStyle {
        id: NodeId,
        style: NodeStyle,
    },
    EditStyle {
        id: NodeId,
        edit: StyleEdit,
    },
    SetNodeSize {
        id: NodeId,
        size: Size,
    },
}

/// What a successfully applied mutation did.
#[derive(Debug, Clone, PartialEq)]
pub enum Applied {
    Created(NodeId),
    Removed(RemoveReport),
    /// `false` when the mutation was valid but changed nothing.
    Updated(bool),
}

/// Result of `remove_nodes`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RemoveReport {
    /// Deleted ids, leaves before their ancestors.
    pub removed: Vec<NodeId>,
    /// Children re-homed onto their grandparent (non-cascade only).
    pub promoted: Vec<NodeId>,
    /// The root was among the targets and was left alone.
    pub skipped_root: bool,
}

#[derive(Debug, Clone, Default, PartialEq)]
enum Dirty {
    #[default]
    Clean,
    Nodes(HashSet<NodeId>),
    All,
}

impl Dirty {
    fn mark(&mut self, ids: impl IntoIterator<Item = NodeId>) {
        match self {
            Dirty::All => {}
            Dirty::Clean => *self = Dirty::Nodes(ids.into_iter().collect()),
            Dirty::Nodes(set) => set.extend(ids),
        }
    }
}

pub struct TreeMutator {
    store: NodeStore,
    layout: LayoutEngine,
    viewport: Box<dyn ViewportProvider>,
    connectors: ConnectorSet,
    dirty: Dirty,
    default_topic: String,
}

impl TreeMutator {
    /// Start a map holding only a root node, centered in the viewport.
    pub fn new(
        root_id: NodeId,
        root_content: Content,
        layout: LayoutEngine,
        viewport: Box<dyn ViewportProvider>,
    ) -> Self {
        let store = NodeStore::new(
            root_id,
            NodeFields {
                content: root_content,
                size: layout.config().default_node_size,
                ..NodeFields::default()
            },
        );
        Self::from_store(store, layout, viewport)
    }

    /// Take over a loaded store. Nodes that were never placed get a full
    /// layout pass; otherwise stored positions are kept as they are.
    pub fn from_store(
        store: NodeStore,
        layout: LayoutEngine,
        viewport: Box<dyn ViewportProvider>,
    ) -> Self {
        let mut mutator = Self {
            store,
            layout,
            viewport,
            connectors: ConnectorSet::new(),
            dirty: Dirty::All,
            default_topic: "New Node".to_string(),
        };
        if mutator.store.iter().any(|n| !n.is_placed()) {
            mutator.layout_all();
        }
        mutator.flush_frame();
        mutator
    }

    pub fn with_default_topic(mut self, topic: impl Into<String>) -> Self {
        self.default_topic = topic.into();
        self
    }

    // ─── Accessors ───────────────────────────────────────────────────────

    pub fn store(&self) -> &NodeStore {
        &self.store
    }

    pub fn layout(&self) -> &LayoutEngine {
        &self.layout
    }

    pub fn connectors(&self) -> &ConnectorSet {
        &self.connectors
    }

    pub fn viewport(&self) -> Viewport {
        self.viewport.viewport()
    }

    pub fn set_viewport_provider(&mut self, viewport: Box<dyn ViewportProvider>) {
        self.viewport = viewport;
    }

    /// `true` when connectors are waiting for the next `flush_frame`.
    pub fn needs_redraw(&self) -> bool {
        self.dirty != Dirty::Clean
    }

    // ─── Dispatch ────────────────────────────────────────────────────────

    pub fn apply(&mut self, mutation: MapMutation) -> Result<Applied> {
        match mutation {
            MapMutation::AddChild { parent, content } => {
                self.add_child(parent, content).map(Applied::Created)
            }
            MapMutation::RemoveNodes { targets, cascade } => {
                self.remove_nodes(&targets, cascade).map(Applied::Removed)
            }
            MapMutation::Reparent {
                id,
                new_parent,
                relayout,
            } => self.reparent(id, new_parent, relayout).map(Applied::Updated),
            MapMutation::MoveNode { id, dx, dy } => {
                self.move_node(id, dx, dy).map(Applied::Updated)
            }
            MapMutation::SetPosition { id, position } => {
                self.set_position(id, position).map(Applied::Updated)
            }
            MapMutation::ResetPosition { id } => {
                self.reset_position(id).map(|()| Applied::Updated(true))
            }
            MapMutation::SetContent { id, content } => {
                self.set_content(id, content).map(Applied::Updated)
            }
            MapMutation::SetStyle { id, style } => {
                self.set_style(id, style).map(Applied::Updated)
            }
            MapMutation::EditStyle { id, edit } => {
                self.apply_style_edit(id, &edit).map(Applied::Updated)
            }
            MapMutation::SetNodeSize { id, size } => {
                self.set_node_size(id, size).map(Applied::Updated)
            }
        }
    }

    // ─── Topology ────────────────────────────────────────────────────────

    /// Create a child of `parent` with a structural copy of the parent's
    /// style, then place it.
    pub fn add_child(&mut self, parent: NodeId, content: Option<Content>) -> Result<NodeId> {
        let Some(parent_node) = self.store.get(parent) else {
            log::warn!("add child: parent not found: {parent}");
            return Err(MapError::NotFound(parent));
        };
        let fields = NodeFields {
            content: content.unwrap_or_else(|| Content::text(self.default_topic.clone())),
            style: parent_node.style.inherit(),
            size: self.layout.config().default_node_size,
            ..NodeFields::default()
        };
        let parent_placed = parent_node.is_placed();

        let id = self.store.allocate_id();
        self.store.create(id, Some(parent), fields)?;

        if parent_placed {
            self.layout.place_node(&mut self.store, id);
            self.dirty.mark([id]);
        } else {
            self.layout_all();
        }
        log::debug!("added {id} under {parent}");
        Ok(id)
    }

    /// Remove `targets`. With `cascade` every target goes with its whole
    /// subtree; without it the target's children move to the target's
    /// parent, appended in order after their new siblings.
    ///
    /// Every id is checked before anything is removed. The root is skipped
    /// (and reported); naming only the root is an error.
    pub fn remove_nodes(&mut self, targets: &[NodeId], cascade: bool) -> Result<RemoveReport> {
        if let Some(missing) = targets.iter().find(|id| !self.store.contains(**id)) {
            return Err(MapError::NotFound(*missing));
        }
        let root = self.store.root();
        if !targets.is_empty() && targets.iter().all(|id| *id == root) {
            return Err(MapError::InvalidRootOperation(RootOp::Delete));
        }

        let mut report = RemoveReport::default();
        let mut seen = HashSet::new();
        for &target in targets {
            if !seen.insert(target) {
                continue;
            }
            if target == root {
                log::warn!("remove: the root node is never removed");
                report.skipped_root = true;
                continue;
            }
            // Gone already with an earlier target's subtree.
            if !self.store.contains(target) {
                continue;
            }

            if cascade {
                let mut doomed = self.store.descendants(target);
                doomed.reverse();
                doomed.push(target);
                for id in doomed {
                    self.store.delete(id)?;
                    report.removed.push(id);
                }
            } else {
                let parent = self
                    .store
                    .parent_of(target)
                    .ok_or(MapError::InvalidRootOperation(RootOp::Delete))?;
                for child in self.store.children(target) {
                    self.store.set_parent(child, parent)?;
                    report.promoted.push(child);
                }
                self.store.delete(target)?;
                report.removed.push(target);
            }
        }

        if !report.removed.is_empty() {
            log::debug!(
                "removed {} nodes ({} promoted)",
                report.removed.len(),
                report.promoted.len()
            );
            self.layout_all();
        }
        Ok(report)
    }

    /// Move `id` under `new_parent`.
    ///
    /// With `relayout` the node loses its position and side and is placed
    /// fresh beside its new parent. Without it (drag-drop) the node stays
    /// pinned where it was dropped; its auto-placed descendants follow it.
    pub fn reparent(&mut self, id: NodeId, new_parent: NodeId, relayout: bool) -> Result<bool> {
        let old_parent = self.store.parent_of(id);
        self.store.set_parent(id, new_parent)?;
        if old_parent == Some(new_parent) && !relayout {
            return Ok(false);
        }

        let bounds = self.store.node(id)?.bounds();
        let dropped_side = side_of(&self.store, bounds);
        let node = self.store.node_mut(id)?;
        if relayout {
            node.placement = Placement::Unplaced;
            node.side = None;
        } else {
            node.placement = Placement::Pinned;
            node.side = Some(dropped_side);
        }
        let viewport = self.viewport();
        self.layout.layout_subtree(&mut self.store, id, viewport);
        self.mark_subtree(id);
        Ok(true)
    }

    // ─── Positions ───────────────────────────────────────────────────────

    /// Drag `id` by `(dx, dy)`. The node becomes pinned and its auto-placed
    /// descendants move with it.
    pub fn move_node(&mut self, id: NodeId, dx: f32, dy: f32) -> Result<bool> {
        let root = self.store.root();
        let node = self.store.node_mut(id)?;
        if !node.draggable {
            return if id == root {
                Err(MapError::InvalidRootOperation(RootOp::Move))
            } else {
                log::debug!("move: {id} is not draggable");
                Ok(false)
            };
        }
        if dx == 0.0 && dy == 0.0 {
            return Ok(false);
        }
        node.position.x += dx;
        node.position.y += dy;
        node.placement = Placement::Pinned;
        self.drag_auto_children(id, dx, dy);
        self.mark_subtree(id);
        Ok(true)
    }

    /// Pin `id` at `position`; auto-placed descendants keep their offset.
    pub fn set_position(&mut self, id: NodeId, position: Position) -> Result<bool> {
        if id == self.store.root() {
            return Err(MapError::InvalidRootOperation(RootOp::Move));
        }
        let node = self.store.node_mut(id)?;
        let (dx, dy) = (position.x - node.position.x, position.y - node.position.y);
        let changed = dx != 0.0 || dy != 0.0 || !node.is_pinned();
        node.position = position;
        node.placement = Placement::Pinned;
        self.drag_auto_children(id, dx, dy);
        self.mark_subtree(id);
        Ok(changed)
    }

    /// Unpin `id` and lay it out again. Resetting the root re-centers it.
    pub fn reset_position(&mut self, id: NodeId) -> Result<()> {
        if id == self.store.root() {
            self.layout_all();
            return Ok(());
        }
        let node = self.store.node_mut(id)?;
        node.placement = Placement::Unplaced;
        node.side = None;
        let viewport = self.viewport();
        self.layout.layout_subtree(&mut self.store, id, viewport);
        self.mark_subtree(id);
        Ok(())
    }

    fn drag_auto_children(&mut self, id: NodeId, dx: f32, dy: f32) {
        for child in self.store.children(id) {
            let moved = match self.store.get_mut(child) {
                Some(node) if node.placement == Placement::Auto => {
                    node.position.x += dx;
                    node.position.y += dy;
                    true
                }
                _ => false,
            };
            if moved {
                self.drag_auto_children(child, dx, dy);
            }
        }
    }

    // ─── Records ─────────────────────────────────────────────────────────

    pub fn set_content(&mut self, id: NodeId, content: Content) -> Result<bool> {
        let node = self.store.node_mut(id)?;
        if node.content == content {
            return Ok(false);
        }
        node.content = content;
        Ok(true)
    }

    pub fn set_style(&mut self, id: NodeId, style: NodeStyle) -> Result<bool> {
        let node = self.store.node_mut(id)?;
        if node.style == style {
            return Ok(false);
        }
        node.style = style;
        self.dirty.mark([id]);
        Ok(true)
    }

    pub fn apply_style_edit(&mut self, id: NodeId, edit: &StyleEdit) -> Result<bool> {
        let changed = self.store.node_mut(id)?.style.apply(edit);
        if changed {
            self.dirty.mark([id]);
        }
        Ok(changed)
    }

    /// Record the measured size of a node. A new box can push into its
    /// siblings as well as its children, so every auto-placed node is laid
    /// out again.
    pub fn set_node_size(&mut self, id: NodeId, size: Size) -> Result<bool> {
        let node = self.store.node_mut(id)?;
        if node.size == size {
            return Ok(false);
        }
        node.size = size;
        self.layout_all();
        Ok(true)
    }

    /// Presentation-only flag driven by the selection.
    pub fn set_highlighted(&mut self, id: NodeId, highlighted: bool) -> Result<bool> {
        let node = self.store.node_mut(id)?;
        let changed = node.highlighted != highlighted;
        node.highlighted = highlighted;
        Ok(changed)
    }

    // ─── Layout and redraw ───────────────────────────────────────────────

    /// Full layout pass against the current viewport; every connector is
    /// redrawn on the next frame.
    pub fn layout_all(&mut self) {
        let viewport = self.viewport();
        self.layout.layout_all(&mut self.store, viewport);
        self.dirty = Dirty::All;
    }

    /// Rebuild dirty connectors. Returns `true` if anything was redrawn.
    pub fn flush_frame(&mut self) -> bool {
        match std::mem::take(&mut self.dirty) {
            Dirty::Clean => false,
            Dirty::All => {
                self.connectors.rebuild(&self.store);
                true
            }
            Dirty::Nodes(ids) => {
                self.connectors.update_nodes(&self.store, ids);
                true
            }
        }
    }

    fn mark_subtree(&mut self, id: NodeId) {
        let mut ids = vec![id];
        ids.extend(self.store.descendants(id));
        self.dirty.mark(ids);
    }

    // ─── Snapshots ───────────────────────────────────────────────────────

    pub fn snapshot(&self) -> Result<Vec<u8>> {
        persist::to_snapshot(&self.store)
    }

    /// Replace the map with a snapshot taken earlier. Ids used since then
    /// stay retired.
    pub fn restore(&mut self, snapshot: &[u8]) -> Result<()> {
        let mut store = persist::from_snapshot(snapshot)?;
        store.adopt_id_history(&self.store);
        self.store = store;
        self.dirty = Dirty::All;
        Ok(())
    }

    /// Swap in a freshly loaded map (no id history carried over).
    pub fn replace_store(&mut self, store: NodeStore) {
        self.store = store;
        if self.store.iter().any(|n| !n.is_placed()) {
            self.layout_all();
        }
        self.dirty = Dirty::All;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mm_core::{Bounds, LayoutConfig, Side, StyleSection, keys};
    use pretty_assertions::assert_eq;

    fn mutator() -> TreeMutator {
        TreeMutator::new(
            NodeId::intern("root"),
            Content::text("Root"),
            LayoutEngine::new(LayoutConfig::default()),
            Box::new(Viewport::default()),
        )
    }

    #[test]
    fn root_starts_centered() {
        let m = mutator();
        let root = m.store().get(m.store().root()).unwrap();
        assert_eq!(root.bounds().center(), (400.0, 300.0));
        assert!(!root.draggable);
    }

    #[test]
    fn two_children_go_to_opposite_sides() {
        let mut m = mutator();
        let root = m.store().root();
        let a = m.add_child(root, None).unwrap();
        let b = m.add_child(root, None).unwrap();

        let a = m.store().get(a).unwrap();
        let b = m.store().get(b).unwrap();
        assert_eq!(a.side, Some(Side::Right));
        assert_eq!(b.side, Some(Side::Left));
        assert_eq!(a.position.x, 450.0 + 50.0);
        assert_eq!(b.bounds().right(), 350.0 - 50.0);
        assert!(!a.bounds().intersects(&b.bounds()));
        assert_eq!(a.content, Content::text("New Node"));
    }

    #[test]
    fn add_child_unknown_parent_changes_nothing() {
        let mut m = mutator();
        let ghost = NodeId::intern("ghost");
        assert_eq!(m.add_child(ghost, None), Err(MapError::NotFound(ghost)));
        assert_eq!(m.store().len(), 1);
    }

    #[test]
    fn child_style_is_a_copy() {
        let mut m = mutator();
        let root = m.store().root();
        m.apply_style_edit(root, &StyleEdit::set(StyleSection::Line, keys::LINE_COLOR, "red"))
            .unwrap();
        let child = m.add_child(root, None).unwrap();
        m.apply_style_edit(child, &StyleEdit::set(StyleSection::Line, keys::LINE_COLOR, "blue"))
            .unwrap();
        assert_eq!(m.store().get(root).unwrap().style.line["color"], "red");
        assert_eq!(m.store().get(child).unwrap().style.line["color"], "blue");
    }

    #[test]
    fn connectors_wait_for_the_frame() {
        let mut m = mutator();
        let root = m.store().root();
        let a = m.add_child(root, None).unwrap();
        assert!(m.needs_redraw());
        assert!(m.connectors().get(a).is_none());
        assert!(m.flush_frame());
        assert!(m.connectors().get(a).is_some());
        assert!(!m.flush_frame());
    }

    #[test]
    fn move_pins_and_drags_auto_children() {
        let mut m = mutator();
        let root = m.store().root();
        let a = m.add_child(root, None).unwrap();
        let a1 = m.add_child(a, None).unwrap();
        let before = m.store().get(a1).unwrap().position;

        assert!(m.move_node(a, 10.0, 30.0).unwrap());
        assert!(m.store().get(a).unwrap().is_pinned());
        let after = m.store().get(a1).unwrap();
        assert_eq!(after.position, Position::new(before.x + 10.0, before.y + 30.0));
        assert_eq!(after.placement, Placement::Auto);

        assert_eq!(
            m.move_node(root, 1.0, 1.0),
            Err(MapError::InvalidRootOperation(RootOp::Move))
        );
    }

    #[test]
    fn reset_position_unpins() {
        let mut m = mutator();
        let root = m.store().root();
        let a = m.add_child(root, None).unwrap();
        let home = m.store().get(a).unwrap().position;
        m.set_position(a, Position::new(0.0, 0.0)).unwrap();
        assert_eq!(m.store().get(a).unwrap().position, Position::new(0.0, 0.0));

        // A full pass leaves a node pinned at the origin alone.
        m.layout_all();
        assert_eq!(m.store().get(a).unwrap().position, Position::new(0.0, 0.0));

        m.reset_position(a).unwrap();
        let node = m.store().get(a).unwrap();
        assert_eq!(node.placement, Placement::Auto);
        assert_eq!(node.position, home);
    }

    #[test]
    fn size_change_relayouts_children() {
        let mut m = mutator();
        let root = m.store().root();
        let a = m.add_child(root, None).unwrap();
        let a1 = m.add_child(a, None).unwrap();
        m.set_node_size(a, Size::new(200.0, 40.0)).unwrap();
        let a_box = m.store().get(a).unwrap().bounds();
        assert_eq!(m.store().get(a1).unwrap().position.x, a_box.right() + 50.0);
    }

    #[test]
    fn taller_node_pushes_its_stacked_siblings_clear() {
        let mut m = mutator();
        let root = m.store().root();
        let ids: Vec<NodeId> = (0..5).map(|_| m.add_child(root, None).unwrap()).collect();
        assert!(m.set_node_size(ids[0], Size::new(100.0, 200.0)).unwrap());
        assert!(!m.set_node_size(ids[0], Size::new(100.0, 200.0)).unwrap());

        let boxes: Vec<(NodeId, Bounds)> = m.store().iter().map(|n| (n.id(), n.bounds())).collect();
        for (i, (a, a_box)) in boxes.iter().enumerate() {
            for (b, b_box) in &boxes[i + 1..] {
                assert!(!a_box.intersects(b_box), "{a} overlaps {b}");
            }
        }
        assert!(m.flush_frame());
    }

    #[test]
    fn restore_keeps_ids_retired() {
        let mut m = mutator();
        let root = m.store().root();
        let snapshot = m.snapshot().unwrap();
        let a = m.add_child(root, None).unwrap();
        m.restore(&snapshot).unwrap();
        assert!(!m.store().contains(a));
        let b = m.add_child(root, None).unwrap();
        assert_ne!(a, b);
    }
}

//! Core data model for mind maps.
//!
//! The map is a tree stored in a `StableDiGraph`: nodes are `MindNode`
//! records and edges go parent → child. Child order lives next to the graph
//! because petgraph adjacency order is not insertion order. `NodeStore` is
//! the only owner of that mapping and keeps both directions consistent on
//! every mutation.

use crate::error::{MapError, Result, RootOp};
use crate::id::NodeId;
use crate::style::NodeStyle;
use petgraph::Direction;
use petgraph::graph::NodeIndex;
use petgraph::stable_graph::StableDiGraph;
use petgraph::visit::Dfs;
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;
use std::collections::{HashMap, HashSet};

// ─── Geometry ────────────────────────────────────────────────────────────

/// Top-left canvas coordinate of a node box.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub x: f32,
    pub y: f32,
}

impl Position {
    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Size {
    pub width: f32,
    pub height: f32,
}

impl Size {
    pub const fn new(width: f32, height: f32) -> Self {
        Self { width, height }
    }
}

impl Default for Size {
    fn default() -> Self {
        Self::new(100.0, 40.0)
    }
}

/// Axis-aligned box of a placed node, in canvas coordinates.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Bounds {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl Bounds {
    pub fn new(position: Position, size: Size) -> Self {
        Self {
            x: position.x,
            y: position.y,
            width: size.width,
            height: size.height,
        }
    }

    pub fn right(&self) -> f32 {
        self.x + self.width
    }

    pub fn bottom(&self) -> f32 {
        self.y + self.height
    }

    pub fn contains(&self, px: f32, py: f32) -> bool {
        px >= self.x && px <= self.right() && py >= self.y && py <= self.bottom()
    }

    pub fn center(&self) -> (f32, f32) {
        (self.x + self.width / 2.0, self.y + self.height / 2.0)
    }

    /// Strict AABB overlap (touching edges do not count).
    pub fn intersects(&self, other: &Bounds) -> bool {
        self.x < other.right()
            && self.right() > other.x
            && self.y < other.bottom()
            && self.bottom() > other.y
    }

    /// Overlap after growing `self` by `margin` on every side.
    pub fn collides(&self, other: &Bounds, margin: f32) -> bool {
        self.x - margin < other.right()
            && self.right() + margin > other.x
            && self.y - margin < other.bottom()
            && self.bottom() + margin > other.y
    }

    /// Check if this bounds intersects with a rectangle (AABB overlap).
    pub fn intersects_rect(&self, rx: f32, ry: f32, rw: f32, rh: f32) -> bool {
        self.intersects(&Bounds {
            x: rx,
            y: ry,
            width: rw,
            height: rh,
        })
    }
}

// ─── Node record ─────────────────────────────────────────────────────────

/// Opaque node content handed to persistence unchanged.
///
/// Plain strings and objects with a `"markdown"` field expose their text to
/// the content renderer; any other JSON is carried through untouched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Content(pub serde_json::Value);

impl Content {
    pub fn text(text: impl Into<String>) -> Self {
        Content(serde_json::Value::String(text.into()))
    }

    pub fn markdown(&self) -> Option<&str> {
        match &self.0 {
            serde_json::Value::String(s) => Some(s),
            serde_json::Value::Object(map) => map.get("markdown").and_then(|v| v.as_str()),
            _ => None,
        }
    }

    /// Replace the markdown text, keeping any other object fields.
    #[must_use]
    pub fn with_markdown(&self, text: impl Into<String>) -> Content {
        match &self.0 {
            serde_json::Value::Object(map) => {
                let mut map = map.clone();
                map.insert("markdown".into(), serde_json::Value::String(text.into()));
                Content(serde_json::Value::Object(map))
            }
            _ => Content::text(text),
        }
    }
}

impl Default for Content {
    fn default() -> Self {
        Content::text("")
    }
}

/// Where a node's position came from.
///
/// `Unplaced → Auto` when the layout engine first positions the node,
/// `Auto → Pinned` on drag or explicit move. Only `Auto` nodes are
/// recomputed by later layout passes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Placement {
    #[default]
    Unplaced,
    Auto,
    Pinned,
}

/// Which side of its parent a node grows on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    Left,
    Right,
}

/// A single node of the mind map.
#[derive(Debug, Clone)]
pub struct MindNode {
    id: NodeId,
    pub content: Content,
    pub style: NodeStyle,
    pub position: Position,
    pub size: Size,
    pub placement: Placement,
    /// Side chosen at placement time; kept so relayout is stable.
    pub side: Option<Side>,
    pub draggable: bool,
    /// Presentation only: set by the selection, never persisted.
    pub highlighted: bool,
}

impl MindNode {
    fn from_fields(id: NodeId, fields: NodeFields) -> Self {
        let (position, placement) = match fields.position {
            Some(p) => (p, fields.placement.unwrap_or(Placement::Pinned)),
            None => (Position::default(), Placement::Unplaced),
        };
        Self {
            id,
            content: fields.content,
            style: fields.style,
            position,
            size: fields.size,
            placement,
            side: fields.side,
            draggable: fields.draggable,
            highlighted: false,
        }
    }

    pub fn id(&self) -> NodeId {
        self.id
    }

    pub fn bounds(&self) -> Bounds {
        Bounds::new(self.position, self.size)
    }

    pub fn is_placed(&self) -> bool {
        self.placement != Placement::Unplaced
    }

    pub fn is_pinned(&self) -> bool {
        self.placement == Placement::Pinned
    }
}

/// Initial field values for `NodeStore::create`.
#[derive(Debug, Clone)]
pub struct NodeFields {
    pub content: Content,
    pub style: NodeStyle,
    pub size: Size,
    /// `Some` places the node immediately (pinned unless `placement` says otherwise).
    pub position: Option<Position>,
    pub placement: Option<Placement>,
    pub side: Option<Side>,
    pub draggable: bool,
}

impl Default for NodeFields {
    fn default() -> Self {
        Self {
            content: Content::default(),
            style: NodeStyle::default(),
            size: Size::default(),
            position: None,
            placement: None,
            side: None,
            draggable: true,
        }
    }
}

// ─── Node store ──────────────────────────────────────────────────────────

type ChildList = SmallVec<[NodeIndex; 4]>;

/// Owner of every node record and of the parent/child links.
#[derive(Debug, Clone)]
pub struct NodeStore {
    graph: StableDiGraph<MindNode, ()>,
    root: NodeIndex,
    id_index: HashMap<NodeId, NodeIndex>,
    child_order: HashMap<NodeIndex, ChildList>,
    /// Ids that were deleted; never handed out again.
    retired: HashSet<NodeId>,
    next_serial: u64,
}

impl NodeStore {
    /// Create a store holding only the root node.
    #[must_use]
    pub fn new(root_id: NodeId, mut fields: NodeFields) -> Self {
        // The root is positioned by the layout engine, never by the user.
        fields.draggable = false;
        let mut graph = StableDiGraph::new();
        let root = graph.add_node(MindNode::from_fields(root_id, fields));
        let mut id_index = HashMap::new();
        id_index.insert(root_id, root);
        Self {
            graph,
            root,
            id_index,
            child_order: HashMap::new(),
            retired: HashSet::new(),
            next_serial: 0,
        }
    }

    pub fn root(&self) -> NodeId {
        self.graph[self.root].id
    }

    pub fn len(&self) -> usize {
        self.graph.node_count()
    }

    /// A store always holds its root.
    pub fn is_empty(&self) -> bool {
        false
    }

    pub fn contains(&self, id: NodeId) -> bool {
        self.id_index.contains_key(&id)
    }

    /// `true` if `id` is live or was ever deleted from this map.
    pub fn is_used(&self, id: NodeId) -> bool {
        self.contains(id) || self.retired.contains(&id)
    }

    pub fn get(&self, id: NodeId) -> Option<&MindNode> {
        self.id_index.get(&id).map(|idx| &self.graph[*idx])
    }

    /// Mutable access to a record's data fields. Links are not reachable
    /// through `MindNode`, so this cannot break tree consistency.
    pub fn get_mut(&mut self, id: NodeId) -> Option<&mut MindNode> {
        self.id_index
            .get(&id)
            .copied()
            .map(|idx| &mut self.graph[idx])
    }

    /// Like `get`, but with a `NotFound` error.
    pub fn node(&self, id: NodeId) -> Result<&MindNode> {
        self.get(id).ok_or(MapError::NotFound(id))
    }

    pub fn node_mut(&mut self, id: NodeId) -> Result<&mut MindNode> {
        self.get_mut(id).ok_or(MapError::NotFound(id))
    }

    fn index_of(&self, id: NodeId) -> Result<NodeIndex> {
        self.id_index.get(&id).copied().ok_or(MapError::NotFound(id))
    }

    fn parent_index(&self, idx: NodeIndex) -> Option<NodeIndex> {
        self.graph.neighbors_directed(idx, Direction::Incoming).next()
    }

    /// Create a node under `parent`.
    ///
    /// The root is created by `NodeStore::new`; passing `None` here is an
    /// attempt to create a second root and fails.
    pub fn create(
        &mut self,
        id: NodeId,
        parent: Option<NodeId>,
        fields: NodeFields,
    ) -> Result<NodeId> {
        let Some(parent) = parent else {
            return Err(MapError::InvalidRootOperation(RootOp::CreateSecondRoot));
        };
        if self.is_used(id) {
            return Err(MapError::DuplicateId(id));
        }
        let parent_idx = self.index_of(parent)?;

        let idx = self.graph.add_node(MindNode::from_fields(id, fields));
        self.graph.add_edge(parent_idx, idx, ());
        self.child_order.entry(parent_idx).or_default().push(idx);
        self.id_index.insert(id, idx);
        Ok(id)
    }

    /// Hand out a fresh `node_N` id that was never used in this map.
    pub fn allocate_id(&mut self) -> NodeId {
        loop {
            self.next_serial += 1;
            let candidate = NodeId::intern(&format!("node_{}", self.next_serial));
            if !self.is_used(candidate) {
                return candidate;
            }
        }
    }

    pub fn parent_of(&self, id: NodeId) -> Option<NodeId> {
        let idx = self.id_index.get(&id)?;
        self.parent_index(*idx).map(|p| self.graph[p].id)
    }

    /// Children of `id` in order. Unknown ids have no children.
    pub fn children(&self, id: NodeId) -> Vec<NodeId> {
        self.id_index
            .get(&id)
            .and_then(|idx| self.child_order.get(idx))
            .map(|list| list.iter().map(|c| self.graph[*c].id).collect())
            .unwrap_or_default()
    }

    pub fn child_count(&self, id: NodeId) -> usize {
        self.id_index
            .get(&id)
            .and_then(|idx| self.child_order.get(idx))
            .map_or(0, |list| list.len())
    }

    /// Position of `id` among its siblings.
    pub fn sibling_index(&self, id: NodeId) -> Option<usize> {
        let idx = *self.id_index.get(&id)?;
        let parent = self.parent_index(idx)?;
        self.child_order.get(&parent)?.iter().position(|c| *c == idx)
    }

    /// Check if `ancestor` is a parent/grandparent/etc. of `descendant`.
    /// A node is not its own ancestor.
    pub fn is_ancestor_of(&self, ancestor: NodeId, descendant: NodeId) -> bool {
        let mut current = match self.id_index.get(&descendant) {
            Some(idx) => *idx,
            None => return false,
        };
        while let Some(parent) = self.parent_index(current) {
            if self.graph[parent].id == ancestor {
                return true;
            }
            current = parent;
        }
        false
    }

    pub fn depth(&self, id: NodeId) -> Option<usize> {
        let mut current = *self.id_index.get(&id)?;
        let mut depth = 0;
        while let Some(parent) = self.parent_index(current) {
            depth += 1;
            current = parent;
        }
        Some(depth)
    }

    /// All descendants of `id` in pre-order (children in order), excluding `id`.
    pub fn descendants(&self, id: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        if let Some(idx) = self.id_index.get(&id) {
            self.collect_pre_order(*idx, &mut out);
        }
        out
    }

    fn collect_pre_order(&self, idx: NodeIndex, out: &mut Vec<NodeId>) {
        if let Some(children) = self.child_order.get(&idx) {
            for &child in children {
                out.push(self.graph[child].id);
                self.collect_pre_order(child, out);
            }
        }
    }

    /// Every node, root first, in pre-order.
    pub fn pre_order(&self) -> Vec<NodeId> {
        let mut out = vec![self.root()];
        self.collect_pre_order(self.root, &mut out);
        out
    }

    pub fn iter(&self) -> impl Iterator<Item = &MindNode> {
        self.graph.node_weights()
    }

    /// Move `id` under `new_parent`, appended after its existing children.
    ///
    /// Fails with `Cycle` when `new_parent` is `id` or one of its
    /// descendants. The check walks ancestor links from `new_parent` up to
    /// the root before anything is touched.
    pub fn set_parent(&mut self, id: NodeId, new_parent: NodeId) -> Result<()> {
        let idx = self.index_of(id)?;
        if idx == self.root {
            return Err(MapError::InvalidRootOperation(RootOp::Reparent));
        }
        let new_parent_idx = self.index_of(new_parent)?;

        let mut cursor = Some(new_parent_idx);
        while let Some(current) = cursor {
            if current == idx {
                return Err(MapError::Cycle {
                    node: id,
                    new_parent,
                });
            }
            cursor = self.parent_index(current);
        }

        let old_parent_idx = self.parent_index(idx);
        if old_parent_idx == Some(new_parent_idx) {
            return Ok(());
        }
        if let Some(old) = old_parent_idx {
            if let Some(edge) = self.graph.find_edge(old, idx) {
                self.graph.remove_edge(edge);
            }
            if let Some(list) = self.child_order.get_mut(&old) {
                list.retain(|c| *c != idx);
            }
        }
        self.graph.add_edge(new_parent_idx, idx, ());
        self.child_order.entry(new_parent_idx).or_default().push(idx);
        Ok(())
    }

    /// Delete a leaf node and retire its id.
    ///
    /// Callers remove or re-home the children first; a node that still has
    /// children fails with `HasChildren` so no orphan can ever exist.
    pub fn delete(&mut self, id: NodeId) -> Result<MindNode> {
        let idx = self.index_of(id)?;
        if idx == self.root {
            return Err(MapError::InvalidRootOperation(RootOp::Delete));
        }
        if self.child_order.get(&idx).is_some_and(|list| !list.is_empty()) {
            return Err(MapError::HasChildren(id));
        }
        if let Some(parent) = self.parent_index(idx)
            && let Some(list) = self.child_order.get_mut(&parent)
        {
            list.retain(|c| *c != idx);
        }
        self.child_order.remove(&idx);
        self.id_index.remove(&id);
        self.retired.insert(id);
        self.graph
            .remove_node(idx)
            .ok_or(MapError::NotFound(id))
    }

    /// Carry id history over from a store this one replaces (undo/redo
    /// restore), so ids deleted or created there are never reused here.
    pub fn adopt_id_history(&mut self, previous: &NodeStore) {
        self.retired.extend(previous.retired.iter().copied());
        for id in previous.id_index.keys() {
            if !self.contains(*id) {
                self.retired.insert(*id);
            }
        }
        self.next_serial = self.next_serial.max(previous.next_serial);
    }

    /// Verify the structural invariants: one parent per non-root node,
    /// child lists matching graph edges, every node reachable from the root.
    pub fn validate(&self) -> Result<()> {
        for idx in self.graph.node_indices() {
            let id = self.graph[idx].id;
            let parents = self
                .graph
                .neighbors_directed(idx, Direction::Incoming)
                .count();
            let expected = usize::from(idx != self.root);
            if parents != expected {
                return Err(MapError::invalid_data(format!(
                    "{id} has {parents} parents, expected {expected}"
                )));
            }

            let mut from_edges: Vec<NodeIndex> = self
                .graph
                .neighbors_directed(idx, Direction::Outgoing)
                .collect();
            let mut from_order: Vec<NodeIndex> = self
                .child_order
                .get(&idx)
                .map(|l| l.to_vec())
                .unwrap_or_default();
            from_edges.sort();
            from_order.sort();
            if from_edges != from_order {
                return Err(MapError::invalid_data(format!(
                    "child list of {id} does not match its links"
                )));
            }
            if self.id_index.get(&id) != Some(&idx) {
                return Err(MapError::invalid_data(format!("{id} is not indexed")));
            }
        }

        let mut reached = 0;
        let mut dfs = Dfs::new(&self.graph, self.root);
        while dfs.next(&self.graph).is_some() {
            reached += 1;
        }
        if reached != self.graph.node_count() {
            return Err(MapError::invalid_data(format!(
                "{} nodes are unreachable from the root",
                self.graph.node_count() - reached
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store() -> NodeStore {
        NodeStore::new(NodeId::intern("root"), NodeFields::default())
    }

    fn add(store: &mut NodeStore, id: &str, parent: &str) -> NodeId {
        store
            .create(
                NodeId::intern(id),
                Some(NodeId::intern(parent)),
                NodeFields::default(),
            )
            .unwrap()
    }

    #[test]
    fn create_and_children_in_order() {
        let mut s = store();
        add(&mut s, "b", "root");
        add(&mut s, "a", "root");
        add(&mut s, "c", "root");

        let children = s.children(s.root());
        let names: Vec<&str> = children.iter().map(|id| id.as_str()).collect();
        assert_eq!(names, ["b", "a", "c"]);
        assert_eq!(s.parent_of(NodeId::intern("a")), Some(s.root()));
        assert_eq!(s.parent_of(s.root()), None);
        s.validate().unwrap();
    }

    #[test]
    fn create_rejects_duplicates_and_unknown_parents() {
        let mut s = store();
        add(&mut s, "a", "root");
        assert_eq!(
            s.create(NodeId::intern("a"), Some(s.root()), NodeFields::default()),
            Err(MapError::DuplicateId(NodeId::intern("a")))
        );
        assert_eq!(
            s.create(
                NodeId::intern("x"),
                Some(NodeId::intern("ghost")),
                NodeFields::default()
            ),
            Err(MapError::NotFound(NodeId::intern("ghost")))
        );
        assert_eq!(
            s.create(NodeId::intern("x"), None, NodeFields::default()),
            Err(MapError::InvalidRootOperation(RootOp::CreateSecondRoot))
        );
        assert_eq!(s.len(), 2);
    }

    #[test]
    fn deleted_ids_are_never_reused() {
        let mut s = store();
        let a = add(&mut s, "a", "root");
        s.delete(a).unwrap();
        assert!(!s.contains(a));
        assert_eq!(
            s.create(a, Some(s.root()), NodeFields::default()),
            Err(MapError::DuplicateId(a))
        );
    }

    #[test]
    fn allocate_skips_used_ids() {
        let mut s = store();
        add(&mut s, "node_1", "root");
        let fresh = s.allocate_id();
        assert_eq!(fresh.as_str(), "node_2");
    }

    #[test]
    fn set_parent_rejects_cycles() {
        let mut s = store();
        let a = add(&mut s, "a", "root");
        let b = add(&mut s, "b", "a");
        let c = add(&mut s, "c", "b");

        assert_eq!(
            s.set_parent(a, c),
            Err(MapError::Cycle {
                node: a,
                new_parent: c
            })
        );
        assert_eq!(
            s.set_parent(a, a),
            Err(MapError::Cycle {
                node: a,
                new_parent: a
            })
        );
        assert_eq!(
            s.set_parent(s.root(), a),
            Err(MapError::InvalidRootOperation(RootOp::Reparent))
        );
        // Unchanged
        assert_eq!(s.parent_of(b), Some(a));
        assert_eq!(s.children(s.root()), vec![a]);
        s.validate().unwrap();
    }

    #[test]
    fn set_parent_moves_to_end_of_new_parent() {
        let mut s = store();
        let a = add(&mut s, "a", "root");
        let b = add(&mut s, "b", "root");
        let c = add(&mut s, "c", "a");
        s.set_parent(b, a).unwrap();

        assert_eq!(s.children(a), vec![c, b]);
        assert_eq!(s.children(s.root()), vec![a]);
        assert_eq!(s.depth(b), Some(2));
        s.validate().unwrap();
    }

    #[test]
    fn delete_requires_leaf_and_protects_root() {
        let mut s = store();
        let a = add(&mut s, "a", "root");
        add(&mut s, "b", "a");
        assert_eq!(s.delete(a).unwrap_err(), MapError::HasChildren(a));
        assert_eq!(
            s.delete(s.root()).unwrap_err(),
            MapError::InvalidRootOperation(RootOp::Delete)
        );
        assert_eq!(s.len(), 3);
    }

    #[test]
    fn ancestry_queries() {
        let mut s = store();
        let a = add(&mut s, "a", "root");
        let b = add(&mut s, "b", "a");
        let other = add(&mut s, "other", "root");

        assert!(s.is_ancestor_of(a, b));
        assert!(s.is_ancestor_of(s.root(), b));
        assert!(!s.is_ancestor_of(b, a));
        assert!(!s.is_ancestor_of(a, a));
        assert!(!s.is_ancestor_of(other, b));
        assert_eq!(s.descendants(s.root()), vec![a, b, other]);
        assert_eq!(s.pre_order(), vec![s.root(), a, b, other]);
    }

    #[test]
    fn fields_with_position_start_pinned() {
        let mut s = store();
        let id = s
            .create(
                NodeId::intern("p"),
                Some(s.root()),
                NodeFields {
                    position: Some(Position::new(5.0, 6.0)),
                    ..NodeFields::default()
                },
            )
            .unwrap();
        let node = s.get(id).unwrap();
        assert!(node.is_pinned());
        assert_eq!(node.position, Position::new(5.0, 6.0));
        assert!(!s.get(s.root()).unwrap().draggable);
    }

    #[test]
    fn content_markdown_views() {
        assert_eq!(Content::text("hi").markdown(), Some("hi"));
        let rich = Content(serde_json::json!({ "markdown": "# t", "icon": "star" }));
        assert_eq!(rich.markdown(), Some("# t"));
        let updated = rich.with_markdown("body");
        assert_eq!(updated.0["icon"], "star");
        assert_eq!(updated.markdown(), Some("body"));
        assert_eq!(Content(serde_json::json!(42)).markdown(), None);
    }

    #[test]
    fn bounds_collision_margin() {
        let a = Bounds::new(Position::new(0.0, 0.0), Size::new(10.0, 10.0));
        let b = Bounds::new(Position::new(12.0, 0.0), Size::new(10.0, 10.0));
        assert!(!a.intersects(&b));
        assert!(!a.collides(&b, 1.0));
        assert!(a.collides(&b, 3.0));
    }
}

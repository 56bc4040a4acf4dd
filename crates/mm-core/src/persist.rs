//! Persistence tree and binary snapshots.
//!
//! `serialize` produces a recursive tree rooted at the root node with the
//! field names `id`, `content`, `style`, `position`, `parentId`;
//! `deserialize` validates such a tree and rebuilds a `NodeStore`. Writing
//! the tree to disk is the host's job. The JSON helpers exist for the
//! bridge; snapshots (MessagePack) back undo/redo.

use crate::error::{MapError, Result};
use crate::id::NodeId;
use crate::model::*;
use crate::style::NodeStyle;
use serde::{Deserialize, Serialize};

/// One node of the persisted tree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeTree {
    pub id: NodeId,
    pub content: Content,
    #[serde(default)]
    pub style: NodeStyle,
    /// Absent while the node is still waiting for the layout engine.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub position: Option<Position>,
    pub parent_id: Option<NodeId>,
    #[serde(default)]
    pub size: Size,
    /// Absent in trees written by other tools. A stored `position` then
    /// counts as pinned.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub placement: Option<Placement>,
    #[serde(default)]
    pub side: Option<Side>,
    #[serde(default = "default_draggable")]
    pub draggable: bool,
    #[serde(default)]
    pub children: Vec<NodeTree>,
}

fn default_draggable() -> bool {
    true
}

/// Snapshot the whole map as a tree rooted at the root node.
pub fn serialize(store: &NodeStore) -> NodeTree {
    serialize_node(store, store.root())
}

fn serialize_node(store: &NodeStore, id: NodeId) -> NodeTree {
    let children = store
        .children(id)
        .into_iter()
        .map(|child| serialize_node(store, child))
        .collect();
    // Every id handed out by `children` is live.
    match store.get(id) {
        Some(node) => NodeTree {
            id,
            content: node.content.clone(),
            style: node.style.clone(),
            position: node.is_placed().then_some(node.position),
            parent_id: store.parent_of(id),
            size: node.size,
            placement: Some(node.placement),
            side: node.side,
            draggable: node.draggable,
            children,
        },
        None => NodeTree {
            id,
            content: Content::default(),
            style: NodeStyle::default(),
            position: None,
            parent_id: store.parent_of(id),
            size: Size::default(),
            placement: Some(Placement::Unplaced),
            side: None,
            draggable: true,
            children,
        },
    }
}

/// Rebuild a store from a tree. The tree is validated before anything is
/// built: the top node must have no parent, every `parentId` must name the
/// enclosing node, and ids must be unique.
pub fn deserialize(tree: &NodeTree) -> Result<NodeStore> {
    if let Some(parent) = tree.parent_id {
        return Err(MapError::invalid_data(format!(
            "root {} names a parent ({parent})",
            tree.id
        )));
    }
    let mut seen = std::collections::HashSet::new();
    check_tree(tree, &mut seen)?;

    let mut store = NodeStore::new(tree.id, fields_of(tree));
    for child in &tree.children {
        insert_recursive(&mut store, tree.id, child)?;
    }
    store.validate()?;
    Ok(store)
}

fn check_tree(node: &NodeTree, seen: &mut std::collections::HashSet<NodeId>) -> Result<()> {
    if !seen.insert(node.id) {
        return Err(MapError::invalid_data(format!("duplicate id {}", node.id)));
    }
    for child in &node.children {
        if child.parent_id != Some(node.id) {
            return Err(MapError::invalid_data(format!(
                "{} is nested under {} but names parent {:?}",
                child.id, node.id, child.parent_id
            )));
        }
        check_tree(child, seen)?;
    }
    Ok(())
}

/// `placement` wins when present; a bare `position` is pinned; a node
/// with neither is left for the layout engine.
fn fields_of(node: &NodeTree) -> NodeFields {
    let (position, placement) = match (node.position, node.placement) {
        (_, Some(Placement::Unplaced)) | (None, _) => (None, None),
        (Some(p), Some(placement)) => (Some(p), Some(placement)),
        (Some(p), None) => (Some(p), Some(Placement::Pinned)),
    };
    NodeFields {
        content: node.content.clone(),
        style: node.style.clone(),
        size: node.size,
        position,
        placement,
        side: node.side,
        draggable: node.draggable,
    }
}

fn insert_recursive(store: &mut NodeStore, parent: NodeId, node: &NodeTree) -> Result<()> {
    store.create(node.id, Some(parent), fields_of(node))?;
    for child in &node.children {
        insert_recursive(store, node.id, child)?;
    }
    Ok(())
}

pub fn to_json(store: &NodeStore) -> Result<String> {
    serde_json::to_string(&serialize(store)).map_err(|e| MapError::invalid_data(e.to_string()))
}

pub fn from_json(json: &str) -> Result<NodeStore> {
    let tree: NodeTree =
        serde_json::from_str(json).map_err(|e| MapError::invalid_data(e.to_string()))?;
    deserialize(&tree)
}

/// Compact binary snapshot (MessagePack, named fields).
pub fn to_snapshot(store: &NodeStore) -> Result<Vec<u8>> {
    rmp_serde::to_vec_named(&serialize(store)).map_err(|e| MapError::invalid_data(e.to_string()))
}

pub fn from_snapshot(bytes: &[u8]) -> Result<NodeStore> {
    let tree: NodeTree =
        rmp_serde::from_slice(bytes).map_err(|e| MapError::invalid_data(e.to_string()))?;
    deserialize(&tree)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::style::{StyleEdit, StyleSection};
    use pretty_assertions::assert_eq;

    fn sample() -> NodeStore {
        let mut store = NodeStore::new(NodeId::intern("root"), NodeFields::default());
        let a = store
            .create(
                NodeId::intern("a"),
                Some(store.root()),
                NodeFields {
                    content: Content::text("**A**"),
                    position: Some(Position::new(12.5, -3.0)),
                    ..NodeFields::default()
                },
            )
            .unwrap();
        store
            .create(NodeId::intern("a1"), Some(a), NodeFields::default())
            .unwrap();
        store
            .get_mut(a)
            .unwrap()
            .style
            .apply(&StyleEdit::set(StyleSection::Line, "type", "bezier"));
        store
    }

    #[test]
    fn tree_shape_uses_contract_field_names() {
        let json = to_json(&sample()).unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["id"], "root");
        assert_eq!(value["parentId"], serde_json::Value::Null);
        let a = &value["children"][0];
        assert_eq!(a["parentId"], "root");
        assert_eq!(a["content"], "**A**");
        assert_eq!(a["position"]["x"], 12.5);
        assert_eq!(a["style"]["line"]["type"], "bezier");
    }

    #[test]
    fn json_roundtrip_is_identical() {
        let store = sample();
        let back = from_json(&to_json(&store).unwrap()).unwrap();
        assert_eq!(serialize(&back), serialize(&store));
    }

    #[test]
    fn snapshot_roundtrip_is_identical() {
        let store = sample();
        let back = from_snapshot(&to_snapshot(&store).unwrap()).unwrap();
        assert_eq!(serialize(&back), serialize(&store));
    }

    #[test]
    fn rejects_inconsistent_trees() {
        let mut tree = serialize(&sample());
        tree.children[0].parent_id = Some(NodeId::intern("elsewhere"));
        assert!(matches!(
            deserialize(&tree),
            Err(MapError::InvalidData { .. })
        ));

        let mut tree = serialize(&sample());
        let dup = tree.children[0].clone();
        tree.children.push(dup);
        assert!(matches!(
            deserialize(&tree),
            Err(MapError::InvalidData { .. })
        ));
    }

    #[test]
    fn minimal_json_gets_defaults() {
        let store = from_json(
            r#"{ "id": "r", "content": "Root", "parentId": null,
                 "children": [ { "id": "c", "content": "Child", "parentId": "r" } ] }"#,
        )
        .unwrap();
        let c = store.get(NodeId::intern("c")).unwrap();
        assert_eq!(c.placement, Placement::Unplaced);
        assert!(c.draggable);
        assert_eq!(c.size, Size::default());
    }

    #[test]
    fn bare_positions_load_pinned() {
        let store = from_json(
            r#"{ "id": "r", "content": "Root", "style": {}, "position": {"x": 5, "y": 6},
                 "parentId": null,
                 "children": [ { "id": "p", "content": "Child", "style": {},
                                 "position": {"x": 20, "y": 40}, "parentId": "r" } ] }"#,
        )
        .unwrap();
        let p = store.get(NodeId::intern("p")).unwrap();
        assert_eq!(p.position, Position::new(20.0, 40.0));
        assert_eq!(p.placement, Placement::Pinned);
        assert_eq!(
            store.get(store.root()).unwrap().position,
            Position::new(5.0, 6.0)
        );
    }

    #[test]
    fn explicit_unplaced_drops_the_position() {
        let store = from_json(
            r#"{ "id": "r", "content": "Root", "parentId": null,
                 "children": [ { "id": "u", "content": "Child", "parentId": "r",
                                 "position": {"x": 20, "y": 40}, "placement": "unplaced" } ] }"#,
        )
        .unwrap();
        let u = store.get(NodeId::intern("u")).unwrap();
        assert_eq!(u.placement, Placement::Unplaced);
        assert!(!u.is_placed());
    }

    #[test]
    fn unplaced_nodes_serialize_without_position() {
        let json = to_json(&sample()).unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        let a1 = &value["children"][0]["children"][0];
        assert_eq!(a1["placement"], "unplaced");
        assert!(a1.get("position").is_none());
        assert_eq!(value["children"][0]["placement"], "pinned");
    }
}

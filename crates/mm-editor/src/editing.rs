//! In-place editing state machine.
//!
//! ```text
//!   Viewing ──dblclick node──▶ NodeEditing ──Enter/Blur──▶ Viewing (commit)
//!      │                          │   └──Escape──────────▶ Viewing (cancel)
//!      │                          └──dblclick block──▶ BlockEditing
//!      └──dblclick block──▶ BlockEditing ──Enter/Blur──▶ Viewing (commit block)
//!                               ├──Escape──▶ Viewing (cancel)
//!                               └──Delete──▶ Viewing (delete block)
//! ```
//!
//! The machine only decides; the session carries out the returned effects.
//! A block is one paragraph of the node's markdown (paragraphs are
//! separated by blank lines).

use mm_core::NodeId;
use smallvec::{SmallVec, smallvec};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EditState {
    #[default]
    Viewing,
    NodeEditing {
        node: NodeId,
    },
    BlockEditing {
        node: NodeId,
        block: usize,
    },
}

impl EditState {
    /// Node being edited, if any.
    pub fn node(&self) -> Option<NodeId> {
        match self {
            EditState::Viewing => None,
            EditState::NodeEditing { node } | EditState::BlockEditing { node, .. } => Some(*node),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum EditEvent {
    DoubleClick { node: NodeId, block: Option<usize> },
    /// Editor lost focus; carries the editor's current text.
    Blur(String),
    /// Enter in the editor. Shift+Enter is a line break, not a commit.
    Enter { shift: bool, text: String },
    Escape,
    Delete,
    /// The node under edit was removed from the map.
    NodeRemoved(NodeId),
}

#[derive(Debug, Clone, PartialEq)]
pub enum EditEffect {
    BeginNode(NodeId),
    BeginBlock { node: NodeId, block: usize },
    CommitNode { node: NodeId, text: String },
    CommitBlock { node: NodeId, block: usize, text: String },
    DeleteBlock { node: NodeId, block: usize },
    Cancel(NodeId),
}

pub type Effects = SmallVec<[EditEffect; 2]>;

#[derive(Debug, Clone, Default)]
pub struct EditMachine {
    state: EditState,
}

impl EditMachine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> EditState {
        self.state
    }

    pub fn is_editing(&self) -> bool {
        self.state != EditState::Viewing
    }

    /// Drop back to `Viewing` without effects (map replaced wholesale).
    pub fn reset(&mut self) {
        self.state = EditState::Viewing;
    }

    /// Apply one event, returning the effects to carry out in order.
    pub fn handle(&mut self, event: EditEvent) -> Effects {
        use EditEvent as Ev;
        use EditState as St;

        let (next, effects): (EditState, Effects) = match (self.state, event) {
            // ── Entering ──
            (St::Viewing, Ev::DoubleClick { node, block: None }) => {
                (St::NodeEditing { node }, smallvec![EditEffect::BeginNode(node)])
            }
            (St::Viewing, Ev::DoubleClick {
                node,
                block: Some(block),
            }) => (
                St::BlockEditing { node, block },
                smallvec![EditEffect::BeginBlock { node, block }],
            ),
            (St::NodeEditing { node }, Ev::DoubleClick {
                node: target,
                block: Some(block),
            }) if target == node => (
                St::BlockEditing { node, block },
                smallvec![EditEffect::BeginBlock { node, block }],
            ),
            // Double-click elsewhere while editing: abandon the old edit.
            (current, Ev::DoubleClick { node, block }) => {
                let mut effects: Effects = SmallVec::new();
                if let Some(old) = current.node() {
                    effects.push(EditEffect::Cancel(old));
                }
                match block {
                    Some(block) => {
                        effects.push(EditEffect::BeginBlock { node, block });
                        (St::BlockEditing { node, block }, effects)
                    }
                    None => {
                        effects.push(EditEffect::BeginNode(node));
                        (St::NodeEditing { node }, effects)
                    }
                }
            }

            // ── Committing ──
            (St::NodeEditing { node }, Ev::Blur(text))
            | (St::NodeEditing { node }, Ev::Enter { shift: false, text }) => {
                (St::Viewing, smallvec![EditEffect::CommitNode { node, text }])
            }
            (St::BlockEditing { node, block }, Ev::Blur(text))
            | (St::BlockEditing { node, block }, Ev::Enter { shift: false, text }) => (
                St::Viewing,
                smallvec![EditEffect::CommitBlock { node, block, text }],
            ),

            // ── Leaving ──
            (St::NodeEditing { node }, Ev::Escape) | (St::BlockEditing { node, .. }, Ev::Escape) => {
                (St::Viewing, smallvec![EditEffect::Cancel(node)])
            }
            (St::BlockEditing { node, block }, Ev::Delete) => {
                (St::Viewing, smallvec![EditEffect::DeleteBlock { node, block }])
            }
            (current, Ev::NodeRemoved(id)) if current.node() == Some(id) => {
                (St::Viewing, smallvec![EditEffect::Cancel(id)])
            }

            // Everything else (Shift+Enter, Delete inside a node editor,
            // keys while viewing) leaves the state alone.
            (current, _) => (current, SmallVec::new()),
        };

        if next != self.state {
            log::trace!("edit state {:?} → {:?}", self.state, next);
        }
        self.state = next;
        effects
    }
}

// ─── Content blocks ─────────────────────────────────────────────────────

/// Split markdown into paragraphs separated by blank lines.
pub fn split_blocks(markdown: &str) -> Vec<String> {
    let mut blocks = Vec::new();
    let mut current: Vec<&str> = Vec::new();
    for line in markdown.lines() {
        if line.trim().is_empty() {
            if !current.is_empty() {
                blocks.push(current.join("\n"));
                current.clear();
            }
        } else {
            current.push(line);
        }
    }
    if !current.is_empty() {
        blocks.push(current.join("\n"));
    }
    blocks
}

pub fn join_blocks(blocks: &[String]) -> String {
    blocks.join("\n\n")
}

/// Replace block `index`. An index past the end appends a new block.
pub fn replace_block(markdown: &str, index: usize, text: &str) -> String {
    let mut blocks = split_blocks(markdown);
    match blocks.get_mut(index) {
        Some(block) => *block = text.to_string(),
        None => blocks.push(text.to_string()),
    }
    blocks.retain(|b| !b.trim().is_empty());
    join_blocks(&blocks)
}

/// Remove block `index`; out-of-range indices leave the text unchanged.
pub fn remove_block(markdown: &str, index: usize) -> String {
    let mut blocks = split_blocks(markdown);
    if index < blocks.len() {
        blocks.remove(index);
    }
    join_blocks(&blocks)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn id(s: &str) -> NodeId {
        NodeId::intern(s)
    }

    #[test]
    fn node_edit_commit_on_enter() {
        let mut m = EditMachine::new();
        let effects = m.handle(EditEvent::DoubleClick {
            node: id("a"),
            block: None,
        });
        assert_eq!(effects.as_slice(), &[EditEffect::BeginNode(id("a"))]);
        assert_eq!(m.state(), EditState::NodeEditing { node: id("a") });

        // Shift+Enter is a newline.
        assert!(
            m.handle(EditEvent::Enter {
                shift: true,
                text: "x".into()
            })
            .is_empty()
        );
        let effects = m.handle(EditEvent::Enter {
            shift: false,
            text: "Hello".into(),
        });
        assert_eq!(
            effects.as_slice(),
            &[EditEffect::CommitNode {
                node: id("a"),
                text: "Hello".into()
            }]
        );
        assert_eq!(m.state(), EditState::Viewing);
    }

    #[test]
    fn block_edit_escape_and_delete() {
        let mut m = EditMachine::new();
        m.handle(EditEvent::DoubleClick {
            node: id("a"),
            block: Some(1),
        });
        assert_eq!(
            m.handle(EditEvent::Escape).as_slice(),
            &[EditEffect::Cancel(id("a"))]
        );

        m.handle(EditEvent::DoubleClick {
            node: id("a"),
            block: None,
        });
        m.handle(EditEvent::DoubleClick {
            node: id("a"),
            block: Some(2),
        });
        assert_eq!(
            m.state(),
            EditState::BlockEditing {
                node: id("a"),
                block: 2
            }
        );
        assert_eq!(
            m.handle(EditEvent::Delete).as_slice(),
            &[EditEffect::DeleteBlock {
                node: id("a"),
                block: 2
            }]
        );
    }

    #[test]
    fn switching_nodes_cancels_the_old_edit() {
        let mut m = EditMachine::new();
        m.handle(EditEvent::DoubleClick {
            node: id("a"),
            block: None,
        });
        let effects = m.handle(EditEvent::DoubleClick {
            node: id("b"),
            block: None,
        });
        assert_eq!(
            effects.as_slice(),
            &[EditEffect::Cancel(id("a")), EditEffect::BeginNode(id("b"))]
        );
    }

    #[test]
    fn removal_of_edited_node_returns_to_viewing() {
        let mut m = EditMachine::new();
        m.handle(EditEvent::DoubleClick {
            node: id("a"),
            block: None,
        });
        assert!(m.handle(EditEvent::NodeRemoved(id("b"))).is_empty());
        assert!(m.is_editing());
        m.handle(EditEvent::NodeRemoved(id("a")));
        assert!(!m.is_editing());
    }

    #[test]
    fn viewing_ignores_editor_keys() {
        let mut m = EditMachine::new();
        assert!(m.handle(EditEvent::Delete).is_empty());
        assert!(m.handle(EditEvent::Escape).is_empty());
        assert!(m.handle(EditEvent::Blur(String::new())).is_empty());
        assert_eq!(m.state(), EditState::Viewing);
    }

    #[test]
    fn blocks_split_on_blank_lines() {
        let md = "# Title\n\nfirst line\nsecond line\n\n\n- item";
        assert_eq!(
            split_blocks(md),
            vec!["# Title", "first line\nsecond line", "- item"]
        );
        assert_eq!(
            replace_block(md, 1, "changed"),
            "# Title\n\nchanged\n\n- item"
        );
        assert_eq!(remove_block(md, 0), "first line\nsecond line\n\n- item");
        assert_eq!(replace_block("", 0, "new"), "new");
        assert_eq!(remove_block("only", 5), "only");
    }
}

//! Content rendering queue.
//!
//! Markdown → markup conversion happens outside the core and finishes
//! asynchronously. Each request gets a ticket; a result is applied only if
//! its ticket is still the newest one for the node and the node still
//! exists. Failures keep whatever markup was shown before.

use mm_core::{MapError, NodeId, NodeStore};
use std::collections::HashMap;

/// Handle for one outstanding render request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RenderTicket {
    pub id: u64,
    pub node: NodeId,
}

/// External markdown renderer. `request` must not block: the host renders
/// in the background and reports back through `RenderQueue::complete`.
pub trait ContentRenderer {
    fn request(&mut self, ticket: RenderTicket, markdown: &str);
}

/// What happened to a completed render.
#[derive(Debug, Clone, PartialEq)]
pub enum RenderOutcome {
    Applied(NodeId),
    /// The node was deleted while the render was in flight.
    Stale(NodeId),
    /// A newer request for the same node is outstanding.
    Superseded(NodeId),
    /// The renderer failed; the previous markup stays.
    Failed(MapError),
}

#[derive(Debug, Default)]
pub struct RenderQueue {
    next_ticket: u64,
    pending: HashMap<NodeId, u64>,
    markup: HashMap<NodeId, String>,
}

impl RenderQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Ask `renderer` for the markup of `node`. Nodes whose content has no
    /// markdown view are skipped.
    pub fn request(
        &mut self,
        store: &NodeStore,
        node: NodeId,
        renderer: &mut dyn ContentRenderer,
    ) -> Option<RenderTicket> {
        let markdown = store.get(node)?.content.markdown()?.to_string();
        self.next_ticket += 1;
        let ticket = RenderTicket {
            id: self.next_ticket,
            node,
        };
        self.pending.insert(node, ticket.id);
        renderer.request(ticket, &markdown);
        Some(ticket)
    }

    /// Request markup for every node, root first.
    pub fn request_all(
        &mut self,
        store: &NodeStore,
        renderer: &mut dyn ContentRenderer,
    ) -> Vec<RenderTicket> {
        let mut tickets = Vec::new();
        for id in store.pre_order() {
            if let Some(ticket) = self.request(store, id, &mut *renderer) {
                tickets.push(ticket);
            }
        }
        tickets
    }

    /// Deliver a render result.
    pub fn complete(
        &mut self,
        store: &NodeStore,
        ticket: RenderTicket,
        result: std::result::Result<String, String>,
    ) -> RenderOutcome {
        let node = ticket.node;
        if !store.contains(node) {
            self.forget(node);
            log::debug!("discarding render for deleted node {node}");
            return RenderOutcome::Stale(node);
        }
        if self.pending.get(&node) != Some(&ticket.id) {
            return RenderOutcome::Superseded(node);
        }
        self.pending.remove(&node);

        match result {
            Ok(markup) => {
                self.markup.insert(node, markup);
                RenderOutcome::Applied(node)
            }
            Err(message) => {
                let err = MapError::RenderFailure { node, message };
                log::error!("{err}");
                RenderOutcome::Failed(err)
            }
        }
    }

    pub fn markup(&self, node: NodeId) -> Option<&str> {
        self.markup.get(&node).map(String::as_str)
    }

    pub fn is_pending(&self, node: NodeId) -> bool {
        self.pending.contains_key(&node)
    }

    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }

    pub fn forget(&mut self, node: NodeId) {
        self.pending.remove(&node);
        self.markup.remove(&node);
    }

    /// Forget every node that is no longer in `store`.
    pub fn prune(&mut self, store: &NodeStore) {
        self.pending.retain(|id, _| store.contains(*id));
        self.markup.retain(|id, _| store.contains(*id));
    }

    pub fn clear(&mut self) {
        self.pending.clear();
        self.markup.clear();
    }
}

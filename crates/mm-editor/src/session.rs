//! Editor session: one open mind map and everything that edits it.
//!
//! The session owns the `TreeMutator` and routes every user-level action
//! through the command stack, so each action is one undo step. Tools,
//! shortcuts and the editing state machine only decide; the session
//! carries out their decisions in a fixed order: mutate, then fix up the
//! selection, editing state and render queue.

use crate::commands::CommandStack;
use crate::content::{ContentRenderer, RenderOutcome, RenderQueue, RenderTicket};
use crate::editing::{EditEffect, EditEvent, EditMachine, EditState, remove_block, replace_block};
use crate::input::{InputEvent, Modifiers};
use crate::mutator::{Applied, MapMutation, RemoveReport, TreeMutator};
use crate::selection::{SelectionObserver, SelectionTracker};
use crate::shortcuts::{ShortcutAction, ShortcutMap};
use crate::tools::{SelectTool, ToolAction};
use mm_core::layout::{LayoutConfig, LayoutEngine, Viewport, ViewportProvider};
use mm_core::{Content, MapError, NodeId, Result, RootOp, Size, StyleEdit, persist};
use mm_render::hit::{drop_target, hit_test, hit_test_rect};
use serde::{Deserialize, Serialize};

/// Editor configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EditorConfig {
    /// Maximum undo steps kept. Default: 200.
    pub undo_depth: usize,
    /// Topic of nodes created without content. Default: "New Node".
    pub default_topic: String,
    /// Topic of the root of a new map. Default: "Root".
    pub root_topic: String,
    pub layout: LayoutConfig,
}

impl Default for EditorConfig {
    fn default() -> Self {
        Self {
            undo_depth: 200,
            default_topic: "New Node".to_string(),
            root_topic: "Root".to_string(),
            layout: LayoutConfig::default(),
        }
    }
}

pub struct MindMapSession {
    map: TreeMutator,
    selection: SelectionTracker,
    commands: CommandStack,
    editing: EditMachine,
    renders: RenderQueue,
    tool: SelectTool,
    /// A node drag opened an undo batch that is still waiting to close.
    drag_batch: bool,
    renderer: Box<dyn ContentRenderer>,
}

impl MindMapSession {
    /// New map with a root node only.
    pub fn new(
        config: EditorConfig,
        viewport: Box<dyn ViewportProvider>,
        renderer: Box<dyn ContentRenderer>,
    ) -> Self {
        let map = TreeMutator::new(
            NodeId::intern("root"),
            Content::text(config.root_topic.clone()),
            LayoutEngine::new(config.layout.clone()),
            viewport,
        )
        .with_default_topic(config.default_topic.clone());

        let mut session = Self {
            map,
            selection: SelectionTracker::new(),
            commands: CommandStack::new(config.undo_depth),
            editing: EditMachine::new(),
            renders: RenderQueue::new(),
            tool: SelectTool::new(),
            drag_batch: false,
            renderer,
        };
        session.request_all_renders();
        session
    }

    // ─── Accessors ───────────────────────────────────────────────────────

    pub fn map(&self) -> &TreeMutator {
        &self.map
    }

    pub fn selection(&self) -> &SelectionTracker {
        &self.selection
    }

    pub fn commands(&self) -> &CommandStack {
        &self.commands
    }

    pub fn edit_state(&self) -> EditState {
        self.editing.state()
    }

    pub fn renders(&self) -> &RenderQueue {
        &self.renders
    }

    pub fn tool(&self) -> &SelectTool {
        &self.tool
    }

    pub fn set_selection_observer(&mut self, observer: Box<dyn SelectionObserver>) {
        self.selection.set_observer(observer);
    }

    // ─── Persistence ─────────────────────────────────────────────────────

    /// Replace the open map. History, selection and edits are dropped.
    pub fn load_json(&mut self, json: &str) -> Result<()> {
        let store = persist::from_json(json)?;
        self.selection.clear(&mut self.map);
        self.map.replace_store(store);
        self.commands.clear();
        self.tool = SelectTool::new();
        self.drag_batch = false;
        self.editing.reset();
        self.renders.clear();
        self.request_all_renders();
        log::info!("loaded map with {} nodes", self.map.store().len());
        Ok(())
    }

    pub fn save_json(&self) -> Result<String> {
        persist::to_json(self.map.store())
    }

    // ─── Structure ───────────────────────────────────────────────────────

    /// Add a child and select it.
    pub fn add_child(&mut self, parent: NodeId) -> Result<NodeId> {
        let applied = self.commands.execute(
            &mut self.map,
            MapMutation::AddChild {
                parent,
                content: None,
            },
            "Add child",
        )?;
        let Applied::Created(id) = applied else {
            return Err(MapError::invalid_data("add child created no node"));
        };
        self.request_render(id);
        self.selection.replace(&mut self.map, [id])?;
        Ok(id)
    }

    /// Add a node after `of` under the same parent.
    pub fn add_sibling(&mut self, of: NodeId) -> Result<NodeId> {
        let store = self.map.store();
        store.node(of)?;
        let parent = store
            .parent_of(of)
            .ok_or(MapError::InvalidRootOperation(RootOp::CreateSecondRoot))?;
        self.add_child(parent)
    }

    pub fn remove_nodes(&mut self, targets: &[NodeId], cascade: bool) -> Result<RemoveReport> {
        let description = if cascade { "Delete" } else { "Delete node" };
        let applied = self.commands.execute(
            &mut self.map,
            MapMutation::RemoveNodes {
                targets: targets.to_vec(),
                cascade,
            },
            description,
        )?;
        let Applied::Removed(report) = applied else {
            return Err(MapError::invalid_data("remove reported no removal"));
        };
        self.after_removal(&report.removed);
        Ok(report)
    }

    /// Remove the current selection. `None` when nothing is selected.
    pub fn remove_selected(&mut self, cascade: bool) -> Result<Option<RemoveReport>> {
        if self.selection.is_empty() {
            return Ok(None);
        }
        let targets = self.selection.sorted();
        self.remove_nodes(&targets, cascade).map(Some)
    }

    pub fn reparent(&mut self, id: NodeId, new_parent: NodeId, relayout: bool) -> Result<bool> {
        let applied = self.commands.execute(
            &mut self.map,
            MapMutation::Reparent {
                id,
                new_parent,
                relayout,
            },
            "Reparent",
        )?;
        Ok(applied == Applied::Updated(true))
    }

    pub fn reset_position(&mut self, id: NodeId) -> Result<()> {
        self.commands
            .execute(&mut self.map, MapMutation::ResetPosition { id }, "Reset position")?;
        Ok(())
    }

    // ─── Records ─────────────────────────────────────────────────────────

    /// Replace a node's content and re-render it.
    pub fn set_content(&mut self, id: NodeId, content: Content) -> Result<bool> {
        let applied = self.commands.execute(
            &mut self.map,
            MapMutation::SetContent { id, content },
            "Edit content",
        )?;
        let changed = applied == Applied::Updated(true);
        if changed {
            self.request_render(id);
        }
        Ok(changed)
    }

    /// Measured size from the host. Not an undo step.
    pub fn set_node_size(&mut self, id: NodeId, size: Size) -> Result<bool> {
        self.map.set_node_size(id, size)
    }

    /// Apply one style edit to every selected node as a single undo step.
    pub fn apply_style_to_selection(&mut self, edit: &StyleEdit) -> Result<usize> {
        self.commands.begin_batch(&self.map, "Style")?;
        let result = self.selection.apply_style_edit(&mut self.map, edit);
        if matches!(result, Ok(n) if n > 0) {
            self.commands.touch();
        }
        self.commands.end_batch(&self.map)?;
        result
    }

    // ─── Selection ───────────────────────────────────────────────────────

    pub fn select(&mut self, ids: &[NodeId]) -> Result<()> {
        self.selection.replace(&mut self.map, ids.iter().copied())
    }

    pub fn toggle_selected(&mut self, id: NodeId) -> Result<bool> {
        self.selection.toggle(&mut self.map, id)
    }

    pub fn clear_selection(&mut self) {
        self.selection.clear(&mut self.map);
    }

    // ─── Pointer ─────────────────────────────────────────────────────────

    /// Returns `true` when the canvas needs a repaint.
    pub fn pointer_down(&mut self, x: f32, y: f32, pressure: f32, mods: Modifiers) -> Result<bool> {
        let event = InputEvent::from_pointer_down(x, y, pressure, mods);
        self.pointer(event)
    }

    pub fn pointer_move(&mut self, x: f32, y: f32, pressure: f32, mods: Modifiers) -> Result<bool> {
        let event = InputEvent::from_pointer_move(x, y, pressure, mods);
        self.pointer(event)
    }

    pub fn pointer_up(&mut self, x: f32, y: f32, mods: Modifiers) -> Result<bool> {
        let event = InputEvent::from_pointer_up(x, y, mods);
        self.pointer(event)
    }

    /// Double-click: start editing the node under the pointer. `block`
    /// names the paragraph the host found under the pointer, if any.
    pub fn double_click(&mut self, x: f32, y: f32, block: Option<usize>) -> Result<bool> {
        if let Some(action) = self.tool.interrupt() {
            self.dispatch_tool(action)?;
        }
        let Some(node) = hit_test(self.map.store(), x, y) else {
            return Ok(false);
        };
        self.edit(EditEvent::DoubleClick { node, block })?;
        Ok(true)
    }

    fn pointer(&mut self, event: InputEvent) -> Result<bool> {
        let (x, y) = event.position();
        let hit = hit_test(self.map.store(), x, y);
        let actions = self.tool.handle(&event, hit, &self.selection);
        let marquee = self.tool.marquee_rect.is_some();
        let acted = !actions.is_empty();
        for action in actions {
            self.dispatch_tool(action)?;
        }
        Ok(acted || marquee)
    }

    fn is_draggable(&self, id: NodeId) -> bool {
        self.map.store().get(id).is_some_and(|n| n.draggable)
    }

    fn dispatch_tool(&mut self, action: ToolAction) -> Result<()> {
        match action {
            ToolAction::ClearSelection => self.selection.clear(&mut self.map),
            ToolAction::ReplaceSelection(ids) => self.selection.replace(&mut self.map, ids)?,
            ToolAction::ToggleSelection(id) => {
                self.selection.toggle(&mut self.map, id)?;
            }
            ToolAction::BeginDrag(node) => {
                if self.is_draggable(node) && !self.drag_batch {
                    self.commands.begin_batch(&self.map, "Move node")?;
                    self.drag_batch = true;
                }
            }
            ToolAction::Mutate(mutation) => {
                let target = match &mutation {
                    MapMutation::MoveNode { id, .. } => Some(*id),
                    _ => None,
                };
                if target.is_some_and(|id| !self.is_draggable(id)) {
                    return Ok(());
                }
                self.commands.execute(&mut self.map, mutation, "Move node")?;
            }
            ToolAction::Drop { node, x, y } => {
                let result = if self.is_draggable(node) {
                    self.drop_node(node, x, y)
                } else {
                    Ok(())
                };
                self.close_drag_batch()?;
                result?;
            }
            ToolAction::EndDrag(node) => {
                log::debug!("drag of {node} ended without a release");
                self.close_drag_batch()?;
            }
            ToolAction::Marquee { rect, additive } => {
                let (rx, ry, rw, rh) = rect;
                let mut ids = hit_test_rect(self.map.store(), rx, ry, rw, rh);
                if additive {
                    ids.extend(self.selection.current().iter().copied());
                }
                self.selection.replace(&mut self.map, ids)?;
            }
            ToolAction::Edit(node) => self.edit(EditEvent::DoubleClick { node, block: None })?,
        }
        Ok(())
    }

    fn close_drag_batch(&mut self) -> Result<()> {
        if std::mem::take(&mut self.drag_batch) {
            self.commands.end_batch(&self.map)?;
        }
        Ok(())
    }

    /// Drop `node` at (x, y): re-home it under the node below the pointer,
    /// keeping the dropped position. The node stays exactly where it was
    /// let go, even when that is on top of its new parent.
    fn drop_node(&mut self, node: NodeId, x: f32, y: f32) -> Result<()> {
        let store = self.map.store();
        let Some(target) = drop_target(store, node, x, y) else {
            return Ok(());
        };
        if store.parent_of(node) == Some(target) {
            return Ok(());
        }
        log::debug!("drop {node} onto {target}");
        self.commands.execute(
            &mut self.map,
            MapMutation::Reparent {
                id: node,
                new_parent: target,
                relayout: false,
            },
            "Reparent",
        )?;
        Ok(())
    }

    // ─── Editing ─────────────────────────────────────────────────────────

    /// Feed the editing state machine and carry out its effects.
    pub fn edit(&mut self, event: EditEvent) -> Result<()> {
        let effects = self.editing.handle(event);
        for effect in effects {
            self.apply_edit_effect(effect)?;
        }
        Ok(())
    }

    fn apply_edit_effect(&mut self, effect: EditEffect) -> Result<()> {
        match effect {
            EditEffect::BeginNode(node) | EditEffect::BeginBlock { node, .. } => {
                if !self.selection.contains(node) {
                    self.selection.replace(&mut self.map, [node])?;
                }
            }
            EditEffect::CommitNode { node, text } => {
                let content = self.map.store().node(node)?.content.with_markdown(text);
                self.set_content(node, content)?;
            }
            EditEffect::CommitBlock { node, block, text } => {
                let current = &self.map.store().node(node)?.content;
                let markdown = replace_block(current.markdown().unwrap_or_default(), block, &text);
                let content = current.with_markdown(markdown);
                self.set_content(node, content)?;
            }
            EditEffect::DeleteBlock { node, block } => {
                let current = &self.map.store().node(node)?.content;
                let markdown = remove_block(current.markdown().unwrap_or_default(), block);
                let content = current.with_markdown(markdown);
                self.set_content(node, content)?;
            }
            EditEffect::Cancel(node) => log::trace!("edit of {node} cancelled"),
        }
        Ok(())
    }

    // ─── Keyboard ────────────────────────────────────────────────────────

    /// Resolve and run a shortcut. Keys are left to the host while an
    /// editor is open.
    pub fn handle_key(&mut self, key: &str, mods: Modifiers) -> Result<Option<ShortcutAction>> {
        if self.editing.is_editing() {
            return Ok(None);
        }
        let Some(action) = ShortcutMap::resolve(key, mods.ctrl, mods.shift, mods.alt, mods.meta)
        else {
            return Ok(None);
        };
        self.run_shortcut(action)?;
        Ok(Some(action))
    }

    fn run_shortcut(&mut self, action: ShortcutAction) -> Result<()> {
        let single = self.selection.single();
        match action {
            ShortcutAction::AddChild => {
                if let Some(parent) = single {
                    self.add_child(parent)?;
                }
            }
            ShortcutAction::AddSibling => {
                if let Some(of) = single.filter(|id| *id != self.map.store().root()) {
                    self.add_sibling(of)?;
                }
            }
            ShortcutAction::Delete => {
                self.remove_selected(true)?;
            }
            ShortcutAction::DeleteKeepChildren => {
                self.remove_selected(false)?;
            }
            ShortcutAction::EditNode => {
                if let Some(node) = single {
                    self.edit(EditEvent::DoubleClick { node, block: None })?;
                }
            }
            ShortcutAction::Undo => {
                self.undo()?;
            }
            ShortcutAction::Redo => {
                self.redo()?;
            }
            ShortcutAction::SelectAll => {
                let all = self.map.store().pre_order();
                self.selection.replace(&mut self.map, all)?;
            }
            ShortcutAction::Deselect => self.selection.clear(&mut self.map),
            ShortcutAction::ResetPosition => {
                for id in self.selection.sorted() {
                    self.reset_position(id)?;
                }
            }
        }
        Ok(())
    }

    // ─── History ─────────────────────────────────────────────────────────

    pub fn undo(&mut self) -> Result<bool> {
        let undone = self.commands.undo(&mut self.map)?;
        if let Some(description) = &undone {
            log::debug!("undo: {description}");
            self.after_restore();
        }
        Ok(undone.is_some())
    }

    pub fn redo(&mut self) -> Result<bool> {
        let redone = self.commands.redo(&mut self.map)?;
        if let Some(description) = &redone {
            log::debug!("redo: {description}");
            self.after_restore();
        }
        Ok(redone.is_some())
    }

    fn after_restore(&mut self) {
        self.selection.resync(&mut self.map);
        if let Some(node) = self.editing.state().node()
            && !self.map.store().contains(node)
        {
            self.editing.handle(EditEvent::NodeRemoved(node));
        }
        self.renders.prune(self.map.store());
        self.request_all_renders();
    }

    fn after_removal(&mut self, removed: &[NodeId]) {
        for id in removed {
            self.editing.handle(EditEvent::NodeRemoved(*id));
            self.renders.forget(*id);
        }
        self.selection.prune(&self.map);
    }

    // ─── Rendering ───────────────────────────────────────────────────────

    fn request_render(&mut self, id: NodeId) {
        self.renders
            .request(self.map.store(), id, self.renderer.as_mut());
    }

    /// Ask for fresh markup for every node (new renderer, theme change).
    pub fn request_all_renders(&mut self) {
        self.renders
            .request_all(self.map.store(), self.renderer.as_mut());
    }

    /// Deliver a content render result from the host.
    pub fn render_complete(
        &mut self,
        ticket: RenderTicket,
        result: std::result::Result<String, String>,
    ) -> RenderOutcome {
        self.renders.complete(self.map.store(), ticket, result)
    }

    /// Once per animation frame: rebuild dirty connectors.
    pub fn flush_frame(&mut self) -> bool {
        self.map.flush_frame()
    }

    /// The host container changed size: re-center and lay out again.
    pub fn resize(&mut self, viewport: Viewport) {
        self.map.set_viewport_provider(Box::new(viewport));
        self.map.layout_all();
    }
}

//! WASM bridge for the mind map editor: exposes the Rust session to
//! JavaScript.
//!
//! Compiled via `wasm-pack build --target web`. The host page owns the
//! `<canvas>`, the markdown renderer and the inline text editor; every
//! call that changes the map returns enough for the host to repaint.

mod render2d;

use mm_core::layout::Viewport;
use mm_core::{Content, NodeId, Size, StyleEdit, StyleSection};
use mm_editor::{
    ContentRenderer, EditEvent, EditState, EditorConfig, MindMapSession, Modifiers,
    RenderOutcome, RenderTicket, ShortcutAction,
};
use std::cell::RefCell;
use std::rc::Rc;
use wasm_bindgen::prelude::*;
use web_sys::CanvasRenderingContext2d;

/// The main WASM-facing canvas controller.
///
/// Holds the editor session. All interaction from the page goes through
/// this struct.
#[wasm_bindgen]
pub struct MindMapCanvas {
    session: MindMapSession,
    /// Render callback shared with the session's content renderer.
    render_callback: Rc<RefCell<Option<js_sys::Function>>>,
    width: f64,
    height: f64,
    /// Dark mode flag: `false` = light (default), `true` = dark.
    dark_mode: bool,
}

/// Forwards render requests to a JS callback
/// `(ticket: number, nodeId: string, markdown: string) => void`.
struct JsRenderer(Rc<RefCell<Option<js_sys::Function>>>);

impl ContentRenderer for JsRenderer {
    fn request(&mut self, ticket: RenderTicket, markdown: &str) {
        let Some(callback) = self.0.borrow().clone() else {
            return;
        };
        let result = callback.call3(
            &JsValue::NULL,
            &JsValue::from_f64(ticket.id as f64),
            &JsValue::from_str(ticket.node.as_str()),
            &JsValue::from_str(markdown),
        );
        if let Err(e) = result {
            log::error!("render callback failed for {}: {e:?}", ticket.node);
        }
    }
}

#[wasm_bindgen]
impl MindMapCanvas {
    /// Create a new canvas controller with the given dimensions.
    #[wasm_bindgen(constructor)]
    pub fn new(width: f64, height: f64) -> Self {
        Self::build(width, height, EditorConfig::default())
    }

    /// Create a canvas controller from a JSON `EditorConfig`; missing
    /// fields take their defaults.
    pub fn with_config(width: f64, height: f64, config_json: &str) -> Result<MindMapCanvas, JsValue> {
        let config: EditorConfig = serde_json::from_str(config_json)
            .map_err(|e| JsValue::from_str(&format!("invalid editor config: {e}")))?;
        Ok(Self::build(width, height, config))
    }

    fn build(width: f64, height: f64, config: EditorConfig) -> Self {
        console_error_panic_hook_setup();

        let viewport = Viewport {
            width: width as f32,
            height: height as f32,
        };
        let render_callback = Rc::new(RefCell::new(None));
        let session = MindMapSession::new(
            config,
            Box::new(viewport),
            Box::new(JsRenderer(render_callback.clone())),
        );

        Self {
            session,
            render_callback,
            width,
            height,
            dark_mode: false,
        }
    }

    // ─── Host callbacks ──────────────────────────────────────────────────

    /// Install the markdown renderer. Every node is queued for rendering.
    pub fn set_render_callback(&mut self, callback: js_sys::Function) {
        *self.render_callback.borrow_mut() = Some(callback);
        self.session.request_all_renders();
    }

    /// Install a selection observer `(hasActive: boolean, size: number) => void`.
    pub fn set_selection_callback(&mut self, callback: js_sys::Function) {
        self.session
            .set_selection_observer(Box::new(move |has_active: bool, size: usize| {
                let _ = callback.call2(
                    &JsValue::NULL,
                    &JsValue::from_bool(has_active),
                    &JsValue::from_f64(size as f64),
                );
            }));
    }

    /// Deliver rendered markup for a ticket. Returns the outcome name:
    /// `applied`, `stale`, `superseded` or `failed`.
    pub fn render_complete(&mut self, ticket: f64, node_id: &str, markup: String) -> String {
        let ticket = Self::ticket(ticket, node_id);
        outcome_name(&self.session.render_complete(ticket, Ok(markup))).to_string()
    }

    /// Report a renderer failure. The node keeps its previous markup.
    pub fn render_failed(&mut self, ticket: f64, node_id: &str, message: String) -> String {
        let ticket = Self::ticket(ticket, node_id);
        outcome_name(&self.session.render_complete(ticket, Err(message))).to_string()
    }

    /// Last markup rendered for a node, if any.
    pub fn get_markup(&self, node_id: &str) -> Option<String> {
        self.session
            .renders()
            .markup(NodeId::intern(node_id))
            .map(str::to_string)
    }

    fn ticket(id: f64, node_id: &str) -> RenderTicket {
        RenderTicket {
            id: id as u64,
            node: NodeId::intern(node_id),
        }
    }

    // ─── Document ────────────────────────────────────────────────────────

    /// Replace the map from its JSON tree. Returns
    /// `{"ok":true}` or `{"ok":false,"error":"..."}`.
    pub fn load_json(&mut self, json: &str) -> String {
        match self.session.load_json(json) {
            Ok(()) => r#"{"ok":true}"#.to_string(),
            Err(e) => error_json(&e),
        }
    }

    /// The map as a JSON tree.
    pub fn save_json(&self) -> String {
        self.session.save_json().unwrap_or_else(|e| {
            log::error!("save failed: {e}");
            String::new()
        })
    }

    // ─── Drawing ─────────────────────────────────────────────────────────

    /// Rebuild dirty connectors. Call once per animation frame before
    /// `render`; returns `true` when anything needs repainting.
    pub fn flush_frame(&mut self) -> bool {
        self.session.flush_frame()
    }

    pub fn render(&self, ctx: &CanvasRenderingContext2d) {
        let theme = if self.dark_mode {
            render2d::CanvasTheme::dark()
        } else {
            render2d::CanvasTheme::light()
        };
        let map = self.session.map();
        render2d::render_map(
            ctx,
            map.store(),
            map.connectors(),
            self.width,
            self.height,
            &theme,
            self.session.tool().marquee_rect,
        );
    }

    pub fn set_theme(&mut self, is_dark: bool) {
        self.dark_mode = is_dark;
    }

    /// Resize the canvas; the root is re-centered and the map laid out.
    pub fn resize(&mut self, width: f64, height: f64) {
        self.width = width;
        self.height = height;
        self.session.resize(Viewport {
            width: width as f32,
            height: height as f32,
        });
    }

    /// Every placed node's box as JSON, for the host's markup overlay:
    /// `[{"id","x","y","width","height","side","pinned","selected"}]`.
    pub fn get_nodes_json(&self) -> String {
        let store = self.session.map().store();
        let nodes: Vec<serde_json::Value> = store
            .pre_order()
            .into_iter()
            .filter_map(|id| store.get(id))
            .filter(|n| n.is_placed())
            .map(|n| {
                serde_json::json!({
                    "id": n.id().as_str(),
                    "x": n.position.x,
                    "y": n.position.y,
                    "width": n.size.width,
                    "height": n.size.height,
                    "side": n.side,
                    "pinned": n.is_pinned(),
                    "selected": n.highlighted,
                })
            })
            .collect();
        serde_json::Value::Array(nodes).to_string()
    }

    /// Connectors as SVG path data:
    /// `[{"parent","child","kind","d","width","dash","color"}]`.
    pub fn get_connectors_json(&self) -> String {
        let connectors: Vec<serde_json::Value> = self
            .session
            .map()
            .connectors()
            .iter()
            .map(|c| {
                serde_json::json!({
                    "parent": c.parent.as_str(),
                    "child": c.child.as_str(),
                    "kind": c.kind.name(),
                    "d": c.to_svg(),
                    "width": c.width,
                    "dash": c.dash,
                    "color": c.color.to_hex(),
                })
            })
            .collect();
        serde_json::Value::Array(connectors).to_string()
    }

    /// The host measured a node's rendered markup.
    pub fn set_node_size(&mut self, node_id: &str, width: f32, height: f32) -> bool {
        let size = Size { width, height };
        self.session
            .set_node_size(NodeId::intern(node_id), size)
            .unwrap_or(false)
    }

    // ─── Pointer ─────────────────────────────────────────────────────────

    /// Handle pointer down event. Returns true if a repaint is needed.
    #[allow(clippy::too_many_arguments)]
    pub fn handle_pointer_down(
        &mut self,
        x: f32,
        y: f32,
        pressure: f32,
        shift: bool,
        ctrl: bool,
        alt: bool,
        meta: bool,
    ) -> bool {
        let mods = modifiers(shift, ctrl, alt, meta);
        let result = self.session.pointer_down(x, y, pressure, mods);
        report(result)
    }

    #[allow(clippy::too_many_arguments)]
    pub fn handle_pointer_move(
        &mut self,
        x: f32,
        y: f32,
        pressure: f32,
        shift: bool,
        ctrl: bool,
        alt: bool,
        meta: bool,
    ) -> bool {
        let mods = modifiers(shift, ctrl, alt, meta);
        let result = self.session.pointer_move(x, y, pressure, mods);
        report(result)
    }

    pub fn handle_pointer_up(
        &mut self,
        x: f32,
        y: f32,
        shift: bool,
        ctrl: bool,
        alt: bool,
        meta: bool,
    ) -> bool {
        let mods = modifiers(shift, ctrl, alt, meta);
        let result = self.session.pointer_up(x, y, mods);
        report(result)
    }

    /// Double-click; `block` is the paragraph index under the pointer when
    /// the host knows it. Returns true if an edit started.
    pub fn handle_double_click(&mut self, x: f32, y: f32, block: Option<u32>) -> bool {
        let result = self
            .session
            .double_click(x, y, block.map(|b| b as usize));
        report(result)
    }

    // ─── Keyboard Shortcut API ───────────────────────────────────────────

    /// Handle a keyboard event. Returns a JSON string:
    /// `{"changed":bool,"action":"<action_name>"}`, plus `"error"` when the
    /// action was refused.
    pub fn handle_key(
        &mut self,
        key: &str,
        ctrl: bool,
        shift: bool,
        alt: bool,
        meta: bool,
    ) -> String {
        let mods = modifiers(shift, ctrl, alt, meta);
        match self.session.handle_key(key, mods) {
            Ok(Some(action)) => {
                let action_name = action_to_name(action);
                format!(r#"{{"changed":true,"action":"{action_name}"}}"#)
            }
            Ok(None) => r#"{"changed":false,"action":"none"}"#.to_string(),
            Err(e) => serde_json::json!({
                "changed": false,
                "action": "error",
                "error": e.to_string(),
            })
            .to_string(),
        }
    }

    // ─── Inline editing ──────────────────────────────────────────────────

    /// Current editing mode: `{"mode":"viewing"}`,
    /// `{"mode":"node","node":"..."}` or
    /// `{"mode":"block","node":"...","block":n}`.
    pub fn get_edit_state(&self) -> String {
        match self.session.edit_state() {
            EditState::Viewing => r#"{"mode":"viewing"}"#.to_string(),
            EditState::NodeEditing { node } => {
                serde_json::json!({ "mode": "node", "node": node.as_str() }).to_string()
            }
            EditState::BlockEditing { node, block } => {
                serde_json::json!({ "mode": "block", "node": node.as_str(), "block": block })
                    .to_string()
            }
        }
    }

    /// Enter in the inline editor.
    pub fn edit_enter(&mut self, text: String, shift: bool) -> bool {
        report(self.session.edit(EditEvent::Enter { shift, text }).map(|()| true))
    }

    /// The inline editor lost focus.
    pub fn edit_blur(&mut self, text: String) -> bool {
        report(self.session.edit(EditEvent::Blur(text)).map(|()| true))
    }

    pub fn edit_escape(&mut self) -> bool {
        report(self.session.edit(EditEvent::Escape).map(|()| true))
    }

    /// Delete pressed in a block editor: drop the block.
    pub fn edit_delete(&mut self) -> bool {
        report(self.session.edit(EditEvent::Delete).map(|()| true))
    }

    // ─── Structure ───────────────────────────────────────────────────────

    /// Add a child; returns the new id, or an empty string on failure.
    pub fn add_child(&mut self, parent_id: &str) -> String {
        match self.session.add_child(NodeId::intern(parent_id)) {
            Ok(id) => id.as_str().to_string(),
            Err(e) => {
                log::warn!("add child: {e}");
                String::new()
            }
        }
    }

    pub fn add_sibling(&mut self, node_id: &str) -> String {
        match self.session.add_sibling(NodeId::intern(node_id)) {
            Ok(id) => id.as_str().to_string(),
            Err(e) => {
                log::warn!("add sibling: {e}");
                String::new()
            }
        }
    }

    /// Remove the selection. Returns
    /// `{"ok":true,"removed":[...],"promoted":[...],"skippedRoot":bool}`.
    pub fn delete_selected(&mut self, cascade: bool) -> String {
        match self.session.remove_selected(cascade) {
            Ok(Some(report)) => serde_json::json!({
                "ok": true,
                "removed": report.removed.iter().map(|id| id.as_str()).collect::<Vec<_>>(),
                "promoted": report.promoted.iter().map(|id| id.as_str()).collect::<Vec<_>>(),
                "skippedRoot": report.skipped_root,
            })
            .to_string(),
            Ok(None) => r#"{"ok":true,"removed":[],"promoted":[],"skippedRoot":false}"#.to_string(),
            Err(e) => error_json(&e),
        }
    }

    pub fn reparent(&mut self, node_id: &str, new_parent_id: &str, relayout: bool) -> String {
        let result = self.session.reparent(
            NodeId::intern(node_id),
            NodeId::intern(new_parent_id),
            relayout,
        );
        match result {
            Ok(changed) => format!(r#"{{"ok":true,"changed":{changed}}}"#),
            Err(e) => error_json(&e),
        }
    }

    /// Reset a node to automatic placement.
    pub fn reset_position(&mut self, node_id: &str) -> bool {
        report(
            self.session
                .reset_position(NodeId::intern(node_id))
                .map(|()| true),
        )
    }

    /// Replace a node's content with any JSON value.
    pub fn set_content_json(&mut self, node_id: &str, json: &str) -> bool {
        let value: serde_json::Value = match serde_json::from_str(json) {
            Ok(v) => v,
            Err(e) => {
                log::warn!("content for {node_id} is not JSON: {e}");
                return false;
            }
        };
        report(
            self.session
                .set_content(NodeId::intern(node_id), Content(value)),
        )
    }

    // ─── Selection & style ───────────────────────────────────────────────

    /// Get all selected node IDs as a JSON array.
    pub fn get_selected_ids(&self) -> String {
        let selected = self.session.selection().sorted();
        let ids: Vec<&str> = selected.iter().map(|id| id.as_str()).collect();
        serde_json::to_string(&ids).unwrap_or_else(|_| "[]".to_string())
    }

    /// Select a single node by id. Returns false for unknown ids.
    pub fn select_by_id(&mut self, node_id: &str) -> bool {
        self.session.select(&[NodeId::intern(node_id)]).is_ok()
    }

    pub fn clear_selection(&mut self) {
        self.session.clear_selection();
    }

    /// Set one style property on every selected node (one undo step).
    /// Returns the number of nodes that changed, or -1 for an unknown
    /// section.
    pub fn set_selection_style(&mut self, section: &str, key: &str, value: &str) -> i32 {
        let Some(section) = StyleSection::from_name(section) else {
            return -1;
        };
        self.style_selection(&StyleEdit::set(section, key, value))
    }

    pub fn clear_selection_style(&mut self, section: &str, key: &str) -> i32 {
        let Some(section) = StyleSection::from_name(section) else {
            return -1;
        };
        self.style_selection(&StyleEdit::clear(section, key))
    }

    fn style_selection(&mut self, edit: &StyleEdit) -> i32 {
        match self.session.apply_style_to_selection(edit) {
            Ok(n) => n as i32,
            Err(e) => {
                log::warn!("style: {e}");
                -1
            }
        }
    }

    // ─── History ─────────────────────────────────────────────────────────

    pub fn undo(&mut self) -> bool {
        report(self.session.undo())
    }

    pub fn redo(&mut self) -> bool {
        report(self.session.redo())
    }

    pub fn can_undo(&self) -> bool {
        self.session.commands().can_undo()
    }

    pub fn can_redo(&self) -> bool {
        self.session.commands().can_redo()
    }
}

fn modifiers(shift: bool, ctrl: bool, alt: bool, meta: bool) -> Modifiers {
    Modifiers {
        shift,
        ctrl,
        alt,
        meta,
    }
}

/// Log a refused action and fold it to `false`.
fn report(result: mm_core::Result<bool>) -> bool {
    result.unwrap_or_else(|e| {
        log::warn!("{e}");
        false
    })
}

fn error_json(e: &mm_core::MapError) -> String {
    serde_json::json!({ "ok": false, "error": e.to_string() }).to_string()
}

fn outcome_name(outcome: &RenderOutcome) -> &'static str {
    match outcome {
        RenderOutcome::Applied(_) => "applied",
        RenderOutcome::Stale(_) => "stale",
        RenderOutcome::Superseded(_) => "superseded",
        RenderOutcome::Failed(_) => "failed",
    }
}

fn action_to_name(action: ShortcutAction) -> &'static str {
    match action {
        ShortcutAction::AddChild => "addChild",
        ShortcutAction::AddSibling => "addSibling",
        ShortcutAction::Delete => "delete",
        ShortcutAction::DeleteKeepChildren => "deleteKeepChildren",
        ShortcutAction::EditNode => "editNode",
        ShortcutAction::Undo => "undo",
        ShortcutAction::Redo => "redo",
        ShortcutAction::SelectAll => "selectAll",
        ShortcutAction::Deselect => "deselect",
        ShortcutAction::ResetPosition => "resetPosition",
    }
}

// ─── Panic hook for WASM debugging ───────────────────────────────────────

fn console_error_panic_hook_setup() {
    #[cfg(target_arch = "wasm32")]
    {
        use std::sync::Once;
        static SET_HOOK: Once = Once::new();
        SET_HOOK.call_once(|| {
            std::panic::set_hook(Box::new(|info| {
                let msg = format!("mind map WASM panic: {info}");
                web_sys::console::error_1(&msg.into());
            }));
        });
    }
}

// ─── Standalone validation (no canvas needed) ────────────────────────────

/// Validate a JSON map tree. Returns `{"ok":true,"nodes":n}` or
/// `{"ok":false,"error":"..."}`.
#[wasm_bindgen]
pub fn validate_map(json: &str) -> String {
    match mm_core::persist::from_json(json) {
        Ok(store) => format!(r#"{{"ok":true,"nodes":{}}}"#, store.len()),
        Err(e) => error_json(&e),
    }
}

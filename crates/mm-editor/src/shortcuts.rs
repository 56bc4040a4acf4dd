//! Keyboard shortcut mapping.
//!
//! Maps key + modifier combos to semantic `ShortcutAction`s.
//! The shortcut map lives in Rust so it's shared across WASM and native.
//! Shortcuts apply while viewing; an open editor keeps its keys.

/// Actions that keyboard shortcuts can trigger.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShortcutAction {
    // ── Structure ──
    AddChild,
    AddSibling,
    /// Remove the selection with its subtrees.
    Delete,
    /// Remove the selection, promoting children to the grandparent.
    DeleteKeepChildren,

    // ── Edit ──
    EditNode,
    Undo,
    Redo,
    SelectAll,
    Deselect,
    ResetPosition,
}

/// Resolves key events into shortcut actions.
///
/// Uses platform-aware modifier detection: on macOS `meta` is ⌘,
/// on other platforms `ctrl` serves the same role.
pub struct ShortcutMap;

impl ShortcutMap {
    /// Resolve a key event to an action.
    ///
    /// `key` is the `KeyboardEvent.key` value (e.g. `"z"`, `"Delete"`).
    /// Returns `None` if the key combo has no binding.
    pub fn resolve(
        key: &str,
        ctrl: bool,
        shift: bool,
        _alt: bool,
        meta: bool,
    ) -> Option<ShortcutAction> {
        let cmd = ctrl || meta;

        // ── Modifier combos first (most specific) ──
        if cmd && shift {
            return match key {
                "z" | "Z" => Some(ShortcutAction::Redo),
                _ => None,
            };
        }

        if cmd {
            return match key {
                "z" | "Z" => Some(ShortcutAction::Undo),
                "y" | "Y" => Some(ShortcutAction::Redo),
                "a" | "A" => Some(ShortcutAction::SelectAll),
                "0" => Some(ShortcutAction::ResetPosition),
                _ => None,
            };
        }

        if shift {
            return match key {
                "Delete" | "Backspace" => Some(ShortcutAction::DeleteKeepChildren),
                _ => None,
            };
        }

        // ── Single keys (no modifiers) ──
        match key {
            "Tab" | "Insert" => Some(ShortcutAction::AddChild),
            "Enter" => Some(ShortcutAction::AddSibling),
            "F2" => Some(ShortcutAction::EditNode),
            "Delete" | "Backspace" => Some(ShortcutAction::Delete),
            "Escape" => Some(ShortcutAction::Deselect),
            _ => None,
        }
    }
}

//! Pointer interaction.
//!
//! The select tool turns pointer events into `ToolAction`s: selection
//! changes, drag moves, drops and drag-box (marquee) selection. It never
//! touches the map itself; the session applies the actions.
//!
//! ## Modifier behaviors
//!
//! | Modifier | Click on node | Drag node | Drag background |
//! |----------|---------------|-----------|-----------------|
//! | **Ctrl/⌘** | Toggle in selection | — | — |
//! | **Shift** | Toggle in selection | Axis-constrain | Add to selection |

use crate::input::InputEvent;
use crate::mutator::MapMutation;
use crate::selection::SelectionTracker;
use mm_core::NodeId;

/// Pointer travel before a press on a node becomes a drag.
const DRAG_THRESHOLD: f32 = 3.0;
/// Smallest marquee that selects anything.
const MARQUEE_MIN: f32 = 2.0;

#[derive(Debug, Clone, PartialEq)]
pub enum ToolAction {
    ClearSelection,
    ReplaceSelection(Vec<NodeId>),
    ToggleSelection(NodeId),
    /// First movement of a node drag; the gesture is one undo step.
    BeginDrag(NodeId),
    Mutate(MapMutation),
    /// Node drag finished at (x, y); the session resolves the drop target.
    Drop { node: NodeId, x: f32, y: f32 },
    /// Node drag cut off without a release (a new press or a double-click
    /// arrived first). The moves so far stand; nothing is re-homed.
    EndDrag(NodeId),
    /// Drag-box finished (normalized x, y, w, h).
    Marquee {
        rect: (f32, f32, f32, f32),
        additive: bool,
    },
    /// Double-click on a node.
    Edit(NodeId),
}

#[derive(Debug, Clone, Copy)]
struct DragState {
    node: NodeId,
    press_x: f32,
    press_y: f32,
    last_x: f32,
    last_y: f32,
    active: bool,
}

#[derive(Debug, Default)]
pub struct SelectTool {
    drag: Option<DragState>,
    /// Set when pointer-down hits empty space. `(start_x, start_y)`.
    pub marquee_start: Option<(f32, f32)>,
    /// Current marquee rectangle (normalized: x, y, w, h).
    pub marquee_rect: Option<(f32, f32, f32, f32)>,
}

impl SelectTool {
    pub fn new() -> Self {
        Self::default()
    }

    /// Node currently being dragged, once past the threshold.
    pub fn dragging(&self) -> Option<NodeId> {
        self.drag.filter(|d| d.active).map(|d| d.node)
    }

    /// Abandon the gesture in progress. Returns `EndDrag` when a node drag
    /// was past its threshold.
    pub fn interrupt(&mut self) -> Option<ToolAction> {
        self.marquee_start = None;
        self.marquee_rect = None;
        self.drag
            .take()
            .filter(|d| d.active)
            .map(|d| ToolAction::EndDrag(d.node))
    }

    /// Normalize a drag rectangle from start + current positions.
    fn normalize_rect(x1: f32, y1: f32, x2: f32, y2: f32) -> (f32, f32, f32, f32) {
        (x1.min(x2), y1.min(y2), (x2 - x1).abs(), (y2 - y1).abs())
    }

    pub fn handle(
        &mut self,
        event: &InputEvent,
        hit: Option<NodeId>,
        selection: &SelectionTracker,
    ) -> Vec<ToolAction> {
        match *event {
            InputEvent::PointerDown {
                x, y, modifiers, ..
            } => {
                let mut actions: Vec<ToolAction> = self.interrupt().into_iter().collect();

                let Some(hit_id) = hit else {
                    // Empty space: start marquee
                    self.marquee_start = Some((x, y));
                    self.marquee_rect = Some((x, y, 0.0, 0.0));
                    if !modifiers.shift && !selection.is_empty() {
                        actions.push(ToolAction::ClearSelection);
                    }
                    return actions;
                };

                if modifiers.cmd() || modifiers.shift {
                    actions.push(ToolAction::ToggleSelection(hit_id));
                    return actions;
                }
                self.drag = Some(DragState {
                    node: hit_id,
                    press_x: x,
                    press_y: y,
                    last_x: x,
                    last_y: y,
                    active: false,
                });
                // Keep a multi-selection that contains the node (drag starts there).
                if !selection.contains(hit_id) {
                    actions.push(ToolAction::ReplaceSelection(vec![hit_id]));
                }
                actions
            }

            InputEvent::PointerMove {
                x, y, modifiers, ..
            } => {
                if let Some((sx, sy)) = self.marquee_start {
                    self.marquee_rect = Some(Self::normalize_rect(sx, sy, x, y));
                    return vec![];
                }
                let Some(drag) = self.drag.as_mut() else {
                    return vec![];
                };

                let mut actions = Vec::new();
                if !drag.active {
                    let travel = (x - drag.press_x).hypot(y - drag.press_y);
                    if travel < DRAG_THRESHOLD {
                        return actions;
                    }
                    drag.active = true;
                    actions.push(ToolAction::BeginDrag(drag.node));
                }

                let mut dx = x - drag.last_x;
                let mut dy = y - drag.last_y;
                drag.last_x = x;
                drag.last_y = y;
                // Shift: constrain to dominant axis
                if modifiers.shift {
                    if dx.abs() > dy.abs() {
                        dy = 0.0;
                    } else {
                        dx = 0.0;
                    }
                }
                actions.push(ToolAction::Mutate(MapMutation::MoveNode {
                    id: drag.node,
                    dx,
                    dy,
                }));
                actions
            }

            InputEvent::PointerUp { x, y, modifiers } => {
                if let Some((rx, ry, rw, rh)) = self.marquee_rect.take() {
                    self.marquee_start = None;
                    if rw > MARQUEE_MIN || rh > MARQUEE_MIN {
                        return vec![ToolAction::Marquee {
                            rect: (rx, ry, rw, rh),
                            additive: modifiers.shift,
                        }];
                    }
                    return vec![];
                }
                match self.drag.take() {
                    Some(drag) if drag.active => vec![ToolAction::Drop {
                        node: drag.node,
                        x,
                        y,
                    }],
                    _ => vec![],
                }
            }

            InputEvent::DoubleClick { .. } => self
                .interrupt()
                .into_iter()
                .chain(hit.map(ToolAction::Edit))
                .collect(),
        }
    }
}

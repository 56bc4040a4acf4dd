//! Input abstraction layer.
//!
//! Normalizes mouse, touch and pen events into a unified `InputEvent`
//! consumed by the select tool.

/// Keyboard modifiers held during an event.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Modifiers {
    pub shift: bool,
    pub ctrl: bool,
    pub alt: bool,
    pub meta: bool,
}

impl Modifiers {
    pub const NONE: Modifiers = Modifiers {
        shift: false,
        ctrl: false,
        alt: false,
        meta: false,
    };

    /// Platform command key: ⌘ on macOS, Ctrl elsewhere.
    pub fn cmd(&self) -> bool {
        self.ctrl || self.meta
    }
}

/// A normalized input event from any pointing device.
#[derive(Debug, Clone, PartialEq)]
pub enum InputEvent {
    /// Pointer pressed (mouse down, touch start, pen contact).
    PointerDown {
        x: f32,
        y: f32,
        /// Pressure from 0.0 (none) to 1.0 (max). Mouse is always 1.0.
        pressure: f32,
        modifiers: Modifiers,
    },

    PointerMove {
        x: f32,
        y: f32,
        pressure: f32,
        modifiers: Modifiers,
    },

    PointerUp {
        x: f32,
        y: f32,
        modifiers: Modifiers,
    },

    DoubleClick {
        x: f32,
        y: f32,
    },
}

impl InputEvent {
    pub fn from_pointer_down(x: f32, y: f32, pressure: f32, modifiers: Modifiers) -> Self {
        Self::PointerDown {
            x,
            y,
            pressure,
            modifiers,
        }
    }

    pub fn from_pointer_move(x: f32, y: f32, pressure: f32, modifiers: Modifiers) -> Self {
        Self::PointerMove {
            x,
            y,
            pressure,
            modifiers,
        }
    }

    pub fn from_pointer_up(x: f32, y: f32, modifiers: Modifiers) -> Self {
        Self::PointerUp { x, y, modifiers }
    }

    /// Extract position if this is a pointer event.
    pub fn position(&self) -> (f32, f32) {
        match self {
            Self::PointerDown { x, y, .. }
            | Self::PointerMove { x, y, .. }
            | Self::PointerUp { x, y, .. }
            | Self::DoubleClick { x, y } => (*x, *y),
        }
    }
}

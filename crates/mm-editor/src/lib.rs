pub mod commands;
pub mod content;
pub mod editing;
pub mod input;
pub mod mutator;
pub mod selection;
pub mod session;
pub mod shortcuts;
pub mod tools;

pub use commands::CommandStack;
pub use content::{ContentRenderer, RenderOutcome, RenderQueue, RenderTicket};
pub use editing::{EditEffect, EditEvent, EditMachine, EditState};
pub use input::{InputEvent, Modifiers};
pub use mutator::{Applied, MapMutation, RemoveReport, TreeMutator};
pub use selection::{SelectionObserver, SelectionTracker};
pub use session::{EditorConfig, MindMapSession};
pub use shortcuts::{ShortcutAction, ShortcutMap};
pub use tools::{SelectTool, ToolAction};

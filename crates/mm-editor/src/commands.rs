//! Undo/Redo command stack.
//!
//! Every command is a pair of map snapshots (MessagePack bytes) taken
//! before and after the change. Undo restores `before`, redo restores
//! `after`; there is no per-mutation inverse to get wrong.
//!
//! Drag gestures and multi-node edits use **batching**: the snapshot is
//! captured when the outermost batch opens and compared when it closes,
//! so the whole gesture is one undo step.

use crate::mutator::{Applied, MapMutation, TreeMutator};
use mm_core::Result;

#[derive(Debug, Clone)]
pub struct Command {
    before: Vec<u8>,
    after: Vec<u8>,
    pub description: String,
}

/// Manages undo/redo stacks with batch grouping for drag gestures.
pub struct CommandStack {
    undo_stack: Vec<Command>,
    redo_stack: Vec<Command>,
    /// Maximum undo depth.
    max_depth: usize,
    /// Batch nesting depth (0 = not batching).
    batch_depth: usize,
    /// Snapshot captured at the start of a batch.
    batch_snapshot: Option<Vec<u8>>,
    batch_description: String,
    /// Whether any mutation succeeded during the current batch.
    batch_dirty: bool,
}

impl CommandStack {
    pub fn new(max_depth: usize) -> Self {
        Self {
            undo_stack: Vec::with_capacity(max_depth.min(64)),
            redo_stack: Vec::new(),
            max_depth,
            batch_depth: 0,
            batch_snapshot: None,
            batch_description: String::new(),
            batch_dirty: false,
        }
    }

    /// Start a batch group. All mutations until `end_batch()` are applied
    /// live but tracked as one undo step.
    pub fn begin_batch(&mut self, map: &TreeMutator, description: &str) -> Result<()> {
        if self.batch_depth == 0 {
            self.batch_snapshot = Some(map.snapshot()?);
            self.batch_description = description.to_string();
            self.batch_dirty = false;
        }
        self.batch_depth += 1;
        Ok(())
    }

    /// End a batch group. When the outermost batch closes and the map
    /// actually changed, one command is pushed.
    pub fn end_batch(&mut self, map: &TreeMutator) -> Result<()> {
        if self.batch_depth == 0 {
            return Ok(());
        }
        self.batch_depth -= 1;
        if self.batch_depth > 0 {
            return Ok(());
        }
        let before = self.batch_snapshot.take();
        let dirty = std::mem::replace(&mut self.batch_dirty, false);
        if let Some(before) = before
            && dirty
        {
            let after = map.snapshot()?;
            let description = std::mem::take(&mut self.batch_description);
            self.push(before, after, description);
        }
        Ok(())
    }

    pub fn in_batch(&self) -> bool {
        self.batch_depth > 0
    }

    /// Apply `mutation` and record it. A failed mutation leaves both the
    /// map and the stacks untouched.
    pub fn execute(
        &mut self,
        map: &mut TreeMutator,
        mutation: MapMutation,
        description: &str,
    ) -> Result<Applied> {
        if self.batch_depth > 0 {
            let applied = map.apply(mutation)?;
            self.batch_dirty = true;
            return Ok(applied);
        }

        let before = map.snapshot()?;
        let applied = map.apply(mutation)?;
        let after = map.snapshot()?;
        self.push(before, after, description.to_string());
        Ok(applied)
    }

    /// Mark the open batch as changed by work done outside `execute`.
    pub fn touch(&mut self) {
        if self.batch_depth > 0 {
            self.batch_dirty = true;
        }
    }

    fn push(&mut self, before: Vec<u8>, after: Vec<u8>, description: String) {
        if before == after {
            return;
        }
        self.undo_stack.push(Command {
            before,
            after,
            description,
        });
        if self.undo_stack.len() > self.max_depth {
            self.undo_stack.remove(0);
        }
        // Clear redo stack on new action
        self.redo_stack.clear();
    }

    /// Undo the last command. Returns its description.
    pub fn undo(&mut self, map: &mut TreeMutator) -> Result<Option<String>> {
        let Some(cmd) = self.undo_stack.pop() else {
            return Ok(None);
        };
        if let Err(e) = map.restore(&cmd.before) {
            self.undo_stack.push(cmd);
            return Err(e);
        }
        let description = cmd.description.clone();
        self.redo_stack.push(cmd);
        Ok(Some(description))
    }

    /// Redo the last undone command. Returns its description.
    pub fn redo(&mut self, map: &mut TreeMutator) -> Result<Option<String>> {
        let Some(cmd) = self.redo_stack.pop() else {
            return Ok(None);
        };
        if let Err(e) = map.restore(&cmd.after) {
            self.redo_stack.push(cmd);
            return Err(e);
        }
        let description = cmd.description.clone();
        self.undo_stack.push(cmd);
        Ok(Some(description))
    }

    pub fn can_undo(&self) -> bool {
        !self.undo_stack.is_empty()
    }

    pub fn can_redo(&self) -> bool {
        !self.redo_stack.is_empty()
    }

    /// Forget all history (e.g. after loading another map).
    pub fn clear(&mut self) {
        self.undo_stack.clear();
        self.redo_stack.clear();
        self.batch_depth = 0;
        self.batch_snapshot = None;
        self.batch_dirty = false;
    }
}

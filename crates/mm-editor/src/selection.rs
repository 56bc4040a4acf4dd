//! Active-node selection.
//!
//! The selection only ever touches the presentation flag `highlighted`;
//! bulk style edits are fanned out through the mutator, one write per
//! selected node, so no two nodes end up sharing a style record.

use crate::mutator::TreeMutator;
use mm_core::{MapError, NodeId, Result, StyleEdit};
use std::collections::HashSet;

/// Told about every selection change with `(has_active_selection, size)`.
/// UI policy (e.g. "add child" only for a single selection) lives there.
pub trait SelectionObserver {
    fn selection_changed(&mut self, has_active: bool, size: usize);
}

impl<F: FnMut(bool, usize)> SelectionObserver for F {
    fn selection_changed(&mut self, has_active: bool, size: usize) {
        self(has_active, size)
    }
}

#[derive(Default)]
pub struct SelectionTracker {
    selected: HashSet<NodeId>,
    observer: Option<Box<dyn SelectionObserver>>,
}

impl SelectionTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_observer(&mut self, observer: Box<dyn SelectionObserver>) {
        self.observer = Some(observer);
    }

    pub fn current(&self) -> &HashSet<NodeId> {
        &self.selected
    }

    /// Selected ids in a stable order.
    pub fn sorted(&self) -> Vec<NodeId> {
        let mut ids: Vec<NodeId> = self.selected.iter().copied().collect();
        ids.sort();
        ids
    }

    /// The selected node, when exactly one is selected.
    pub fn single(&self) -> Option<NodeId> {
        match self.selected.len() {
            1 => self.selected.iter().next().copied(),
            _ => None,
        }
    }

    pub fn contains(&self, id: NodeId) -> bool {
        self.selected.contains(&id)
    }

    pub fn len(&self) -> usize {
        self.selected.len()
    }

    pub fn is_empty(&self) -> bool {
        self.selected.is_empty()
    }

    // ─── Mutations ───────────────────────────────────────────────────────

    /// Background click.
    pub fn clear(&mut self, map: &mut TreeMutator) {
        if self.selected.is_empty() {
            return;
        }
        for id in self.selected.drain() {
            // Ids removed from the map since they were selected are fine to skip.
            let _ = map.set_highlighted(id, false);
        }
        self.notify();
    }

    pub fn add(&mut self, map: &mut TreeMutator, id: NodeId) -> Result<bool> {
        if !map.store().contains(id) {
            return Err(MapError::NotFound(id));
        }
        if !self.selected.insert(id) {
            return Ok(false);
        }
        map.set_highlighted(id, true)?;
        self.notify();
        Ok(true)
    }

    pub fn remove(&mut self, map: &mut TreeMutator, id: NodeId) -> bool {
        if !self.selected.remove(&id) {
            return false;
        }
        let _ = map.set_highlighted(id, false);
        self.notify();
        true
    }

    /// Ctrl-click. Returns whether `id` is selected afterwards.
    pub fn toggle(&mut self, map: &mut TreeMutator, id: NodeId) -> Result<bool> {
        if self.selected.contains(&id) {
            self.remove(map, id);
            Ok(false)
        } else {
            self.add(map, id)
        }
    }

    /// Replace the selection wholesale (drag-box selection). Unknown ids
    /// fail the whole call before anything changes.
    pub fn replace(
        &mut self,
        map: &mut TreeMutator,
        ids: impl IntoIterator<Item = NodeId>,
    ) -> Result<()> {
        let next: HashSet<NodeId> = ids.into_iter().collect();
        if let Some(missing) = next.iter().find(|id| !map.store().contains(**id)) {
            return Err(MapError::NotFound(*missing));
        }
        if next == self.selected {
            return Ok(());
        }
        for id in self.selected.difference(&next) {
            let _ = map.set_highlighted(*id, false);
        }
        for id in &next {
            map.set_highlighted(*id, true)?;
        }
        self.selected = next;
        self.notify();
        Ok(())
    }

    /// Drop ids that no longer exist in the map.
    pub fn prune(&mut self, map: &TreeMutator) {
        let before = self.selected.len();
        self.selected.retain(|id| map.store().contains(*id));
        if self.selected.len() != before {
            self.notify();
        }
    }

    /// Re-apply highlight flags after the map was swapped (undo/redo,
    /// load), dropping ids that did not survive.
    pub fn resync(&mut self, map: &mut TreeMutator) {
        self.prune(map);
        for id in &self.selected {
            let _ = map.set_highlighted(*id, true);
        }
    }

    /// Apply one style edit to every selected node. Returns how many
    /// records changed. Nothing is written unless every selected id exists.
    pub fn apply_style_edit(&self, map: &mut TreeMutator, edit: &StyleEdit) -> Result<usize> {
        let ids = self.sorted();
        for id in &ids {
            map.store().node(*id)?;
        }
        let mut changed = 0;
        for id in ids {
            if map.apply_style_edit(id, edit)? {
                changed += 1;
            }
        }
        Ok(changed)
    }

    fn notify(&mut self) {
        let size = self.selected.len();
        log::trace!("selection changed: {size} active");
        if let Some(observer) = self.observer.as_mut() {
            observer.selection_changed(size > 0, size);
        }
    }
}

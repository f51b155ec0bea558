//! Undo/redo history over whole-graph snapshots.
//!
//! Snapshots are deep copies of the graph. The past stack is bounded and
//! evicts its oldest entry first; any newly recorded action clears the
//! future stack.

use std::collections::VecDeque;

use tracing::debug;

use crate::workflow::Graph;

/// Default number of snapshots kept on the past stack.
pub const DEFAULT_HISTORY_CAPACITY: usize = 50;

#[derive(Debug, Clone)]
pub struct History {
    past: VecDeque<Graph>,
    future: Vec<Graph>,
    capacity: usize,
    /// set by undo/redo so the save triggered by applying the snapshot is not recorded
    skip_next_save: bool,
}

impl Default for History {
    fn default() -> Self {
        Self::new(DEFAULT_HISTORY_CAPACITY)
    }
}

impl History {
    pub fn new(capacity: usize) -> Self {
        Self {
            past: VecDeque::with_capacity(capacity.min(DEFAULT_HISTORY_CAPACITY)),
            future: Vec::new(),
            capacity: capacity.max(1),
            skip_next_save: false,
        }
    }

    /// Records `state` as an undoable point.
    ///
    /// The first call after an undo or redo only clears the re-entrancy guard.
    pub fn save_state(
        &mut self,
        state: &Graph,
    ) {
        if self.skip_next_save {
            self.skip_next_save = false;
            return;
        }

        self.past.push_back(state.clone());
        while self.past.len() > self.capacity {
            self.past.pop_front();
        }
        self.future.clear();
        debug!(past = self.past.len(), "history saved");
    }

    /// Steps back: returns the snapshot to apply, remembering `current` for redo.
    pub fn undo(
        &mut self,
        current: &Graph,
    ) -> Option<Graph> {
        let previous = self.past.pop_back()?;
        self.future.push(current.clone());
        self.skip_next_save = true;
        debug!(past = self.past.len(), future = self.future.len(), "undo");
        Some(previous)
    }

    /// Steps forward: returns the snapshot to apply, remembering `current` for undo.
    pub fn redo(
        &mut self,
        current: &Graph,
    ) -> Option<Graph> {
        let next = self.future.pop()?;
        self.past.push_back(current.clone());
        while self.past.len() > self.capacity {
            self.past.pop_front();
        }
        self.skip_next_save = true;
        debug!(past = self.past.len(), future = self.future.len(), "redo");
        Some(next)
    }

    pub fn can_undo(&self) -> bool {
        !self.past.is_empty()
    }

    pub fn can_redo(&self) -> bool {
        !self.future.is_empty()
    }

    pub fn undo_len(&self) -> usize {
        self.past.len()
    }

    pub fn redo_len(&self) -> usize {
        self.future.len()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn clear(&mut self) {
        self.past.clear();
        self.future.clear();
        self.skip_next_save = false;
    }
}

#[cfg(test)]
mod test {
    use super::History;
    use crate::workflow::{Graph, node::Node};

    fn graph(ids: &[&str]) -> Graph {
        Graph::from_parts(ids.iter().map(|id| Node::card(*id, "dcf")).collect(), vec![]).unwrap()
    }

    #[test]
    fn test_undo_redo_round_trip() {
        let s0 = graph(&["a"]);
        let s1 = graph(&["a", "b"]);
        let mut history = History::default();

        history.save_state(&s0);
        assert!(history.can_undo());
        assert!(!history.can_redo());

        let undone = history.undo(&s1).unwrap();
        assert_eq!(undone, s0);
        history.save_state(&undone);
        assert!(history.can_redo());

        let redone = history.redo(&undone).unwrap();
        assert_eq!(redone, s1);
        history.save_state(&redone);
        assert_eq!(history.undo_len(), 1);
        assert_eq!(history.redo_len(), 0);
    }

    #[test]
    fn test_guard_skips_only_one_save() {
        let mut history = History::default();
        history.save_state(&graph(&["a"]));
        history.undo(&graph(&["a", "b"])).unwrap();

        // side-effect save of the applied snapshot
        history.save_state(&graph(&["a"]));
        assert_eq!(history.undo_len(), 0);
        assert_eq!(history.redo_len(), 1);

        // a brand-new action invalidates redo
        history.save_state(&graph(&["a"]));
        assert_eq!(history.undo_len(), 1);
        assert!(!history.can_redo());
        assert!(history.redo(&graph(&["a", "c"])).is_none());
    }

    #[test]
    fn test_empty_stacks_are_noops() {
        let mut history = History::default();
        assert!(history.undo(&graph(&["a"])).is_none());
        assert!(history.redo(&graph(&["a"])).is_none());
        // no guard left behind
        history.save_state(&graph(&["a"]));
        assert_eq!(history.undo_len(), 1);
    }

    #[test]
    fn test_capacity_evicts_oldest() {
        let mut history = History::new(50);
        for i in 0..60 {
            history.save_state(&graph(&[&format!("n{}", i)]));
        }
        assert_eq!(history.undo_len(), 50);

        let current = graph(&["current"]);
        let mut last = None;
        let mut state = current;
        while let Some(prev) = history.undo(&state) {
            history.save_state(&prev);
            last = Some(prev.clone());
            state = prev;
        }
        // n0..n9 were evicted
        assert_eq!(last.unwrap().nodes[0].id, "n10");
    }
}

//! Snapshot history with a cursor.
//!
//! Every committed mutation appends a full `SceneGraph` snapshot. Undo and
//! redo only move the cursor; snapshots are never mutated in place. A
//! commit after an undo drops the redo tail first.

use sb_core::SceneGraph;

#[derive(Debug, Clone)]
pub struct History {
    snapshots: Vec<SceneGraph>,
    /// Always a valid index into `snapshots`.
    cursor: usize,
    max_depth: usize,
}

impl History {
    /// Start with `initial` as the only snapshot. `max_depth` is clamped to ≥ 1.
    pub fn new(initial: SceneGraph, max_depth: usize) -> Self {
        Self {
            snapshots: vec![initial],
            cursor: 0,
            max_depth: max_depth.max(1),
        }
    }

    pub fn current(&self) -> &SceneGraph {
        &self.snapshots[self.cursor]
    }

    /// Append `graph` after the cursor and move onto it.
    pub fn commit(&mut self, graph: SceneGraph) {
        self.snapshots.truncate(self.cursor + 1);
        self.snapshots.push(graph);
        if self.snapshots.len() > self.max_depth {
            let excess = self.snapshots.len() - self.max_depth;
            self.snapshots.drain(..excess);
        }
        self.cursor = self.snapshots.len() - 1;
        log::debug!(
            "history commit: {} snapshots, cursor {}",
            self.snapshots.len(),
            self.cursor
        );
    }

    /// Step back; `None` at the oldest snapshot.
    pub fn undo(&mut self) -> Option<&SceneGraph> {
        if self.cursor == 0 {
            return None;
        }
        self.cursor -= 1;
        Some(&self.snapshots[self.cursor])
    }

    /// Step forward; `None` at the newest snapshot.
    pub fn redo(&mut self) -> Option<&SceneGraph> {
        if self.cursor + 1 >= self.snapshots.len() {
            return None;
        }
        self.cursor += 1;
        Some(&self.snapshots[self.cursor])
    }

    pub fn can_undo(&self) -> bool {
        self.cursor > 0
    }

    pub fn can_redo(&self) -> bool {
        self.cursor + 1 < self.snapshots.len()
    }

    pub fn len(&self) -> usize {
        self.snapshots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.snapshots.is_empty()
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sb_core::{Color, Element, ElementKind};

    fn graph_with(n: usize) -> SceneGraph {
        let elements = (0..n)
            .map(|i| Element::new(ElementKind::circle(5.0, Color::BLACK), i as f64, 0.0))
            .collect();
        SceneGraph::from_elements(elements).unwrap()
    }

    #[test]
    fn undo_redo_stop_at_bounds() {
        let mut h = History::new(SceneGraph::new(), 10);
        assert!(h.undo().is_none());
        assert!(h.redo().is_none());
        h.commit(graph_with(1));
        assert_eq!(h.undo().map(SceneGraph::len), Some(0));
        assert!(h.undo().is_none());
        assert_eq!(h.redo().map(SceneGraph::len), Some(1));
        assert!(h.redo().is_none());
    }

    #[test]
    fn commit_after_undo_drops_redo_tail() {
        let mut h = History::new(SceneGraph::new(), 10);
        h.commit(graph_with(1));
        h.commit(graph_with(2));
        h.undo();
        h.commit(graph_with(3));
        assert_eq!(h.len(), 3);
        assert!(!h.can_redo());
        assert_eq!(h.current().len(), 3);
        assert_eq!(h.undo().map(SceneGraph::len), Some(1));
    }

    #[test]
    fn depth_bound_keeps_cursor_on_newest() {
        let mut h = History::new(SceneGraph::new(), 3);
        for n in 1..=5 {
            h.commit(graph_with(n));
        }
        assert_eq!(h.len(), 3);
        assert_eq!(h.cursor(), 2);
        assert_eq!(h.current().len(), 5);
        h.undo();
        h.undo();
        assert!(!h.can_undo());
        assert_eq!(h.current().len(), 3);
    }
}

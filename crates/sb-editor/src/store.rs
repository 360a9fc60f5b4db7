//! Scene graph store: the live graph, the selection and the undo history.
//!
//! Every public mutation here is one committed step: it lands in the
//! history as a single snapshot. Gestures are the exception. Between
//! [`SceneStore::begin_gesture`] and [`SceneStore::end_gesture`] the
//! controller edits the live graph directly, and one snapshot is committed
//! at the end only if something actually changed.

use crate::error::EditError;
use crate::history::History;
use sb_core::{EditorConfig, Element, ElementId, SceneGraph, import_template};

/// Offset applied to duplicated elements.
pub const DUPLICATE_OFFSET: f64 = 20.0;

#[derive(Debug, Clone)]
pub struct SceneStore {
    graph: SceneGraph,
    /// Every id here exists in `graph`.
    selection: Vec<ElementId>,
    history: History,
    config: EditorConfig,
    /// Graph as it was when the current gesture started.
    gesture_start: Option<SceneGraph>,
}

impl Default for SceneStore {
    fn default() -> Self {
        Self::new(EditorConfig::default())
    }
}

impl SceneStore {
    pub fn new(config: EditorConfig) -> Self {
        Self::with_graph(SceneGraph::new(), config)
    }

    pub fn with_graph(graph: SceneGraph, config: EditorConfig) -> Self {
        Self {
            history: History::new(graph.clone(), config.history_depth),
            graph,
            selection: Vec::new(),
            config,
            gesture_start: None,
        }
    }

    pub fn graph(&self) -> &SceneGraph {
        &self.graph
    }

    pub fn config(&self) -> &EditorConfig {
        &self.config
    }

    pub fn history(&self) -> &History {
        &self.history
    }

    pub fn selection(&self) -> &[ElementId] {
        &self.selection
    }

    pub fn is_selected(&self, id: ElementId) -> bool {
        self.selection.contains(&id)
    }

    /// Live graph for in-gesture edits, which bypass history.
    pub(crate) fn graph_mut(&mut self) -> &mut SceneGraph {
        &mut self.graph
    }

    fn commit(&mut self, what: &str) {
        log::debug!("commit: {what}");
        self.history.commit(self.graph.clone());
    }

    fn ensure_idle(&self) -> Result<(), EditError> {
        if self.gesture_start.is_some() {
            return Err(EditError::GestureActive);
        }
        Ok(())
    }

    // ─── Selection ───────────────────────────────────────────────────────

    /// Replace the selection. Unknown ids are dropped; order follows z-order.
    pub fn set_selection(&mut self, ids: &[ElementId]) {
        self.selection = self
            .graph
            .iter()
            .map(|e| e.id)
            .filter(|id| ids.contains(id))
            .collect();
    }

    pub fn toggle_selection(&mut self, id: ElementId) {
        if let Some(pos) = self.selection.iter().position(|s| *s == id) {
            self.selection.remove(pos);
        } else if self.graph.contains(id) {
            let mut next = self.selection.clone();
            next.push(id);
            self.set_selection(&next);
        }
    }

    pub fn select_all(&mut self) {
        self.selection = self.graph.ids();
    }

    pub fn clear_selection(&mut self) {
        self.selection.clear();
    }

    fn prune_selection(&mut self) {
        let graph = &self.graph;
        self.selection.retain(|id| graph.contains(*id));
    }

    /// `ids` plus the children of any groups among them, in z-order.
    pub fn with_group_members(&self, ids: &[ElementId]) -> Vec<ElementId> {
        let mut wanted: Vec<ElementId> = ids.to_vec();
        for id in ids {
            wanted.extend(self.graph.children_of(*id));
        }
        self.graph
            .iter()
            .map(|e| e.id)
            .filter(|id| wanted.contains(id))
            .collect()
    }

    // ─── Mutations ───────────────────────────────────────────────────────

    pub fn add(&mut self, element: Element) -> Result<ElementId, EditError> {
        self.ensure_idle()?;
        let id = element.id;
        self.graph.push(element)?;
        self.commit("add");
        Ok(id)
    }

    /// Add several elements as one step. Nothing is added if any is rejected.
    pub fn add_all(&mut self, elements: Vec<Element>) -> Result<Vec<ElementId>, EditError> {
        self.ensure_idle()?;
        let mut next = self.graph.clone();
        let mut ids = Vec::with_capacity(elements.len());
        for element in elements {
            ids.push(element.id);
            next.push(element)?;
        }
        if ids.is_empty() {
            return Ok(ids);
        }
        self.graph = next;
        self.commit("add all");
        Ok(ids)
    }

    /// Import a draw-command template as one step.
    pub fn import_template(&mut self, json: &str) -> Result<Vec<ElementId>, EditError> {
        let elements = import_template(json)?;
        self.add_all(elements)
    }

    /// Replace an element's payload/position. No-op (no snapshot) if unchanged.
    pub fn update(&mut self, element: Element) -> Result<(), EditError> {
        self.ensure_idle()?;
        if self.graph.get(element.id) == Some(&element) {
            return Ok(());
        }
        self.graph.replace(element)?;
        self.commit("update");
        Ok(())
    }

    /// Delete elements. Returns how many were removed.
    pub fn delete(&mut self, ids: &[ElementId]) -> Result<usize, EditError> {
        self.ensure_idle()?;
        let removed = self.graph.remove(ids);
        if removed.is_empty() {
            return Ok(0);
        }
        self.prune_selection();
        self.commit("delete");
        Ok(removed.len())
    }

    pub fn delete_selection(&mut self) -> Result<usize, EditError> {
        let ids = self.selection.clone();
        self.delete(&ids)
    }

    /// Group the selection; the new group becomes the selection.
    pub fn group_selection(&mut self) -> Result<ElementId, EditError> {
        self.ensure_idle()?;
        let gid = self.graph.group(&self.selection)?;
        self.selection = vec![gid];
        self.commit("group");
        Ok(gid)
    }

    /// Dissolve the given groups; their former children become the selection.
    pub fn ungroup(&mut self, group_ids: &[ElementId]) -> Result<Vec<ElementId>, EditError> {
        self.ensure_idle()?;
        // Groups are never empty, so nothing freed means nothing dissolved.
        let freed = self.graph.ungroup(group_ids);
        if freed.is_empty() {
            return Ok(freed);
        }
        self.set_selection(&freed);
        self.commit("ungroup");
        Ok(freed)
    }

    pub fn ungroup_selection(&mut self) -> Result<Vec<ElementId>, EditError> {
        let ids = self.selection.clone();
        self.ungroup(&ids)
    }

    /// Duplicate the selection with fresh ids at `(+20, +20)`.
    ///
    /// Selected groups are duplicated with their members and regrouped.
    /// Returns the new top-level ids, which become the selection.
    pub fn duplicate_selection(&mut self) -> Result<Vec<ElementId>, EditError> {
        self.ensure_idle()?;
        let selected = self.selection.clone();
        let mut created = Vec::new();
        let mut next = self.graph.clone();

        for element in self.graph.iter().filter(|e| selected.contains(&e.id)) {
            if element.kind.is_group() {
                let mut members = Vec::new();
                for child in self.graph.children_of(element.id) {
                    if let Some(src) = self.graph.get(child) {
                        let copy = duplicate_of(src);
                        members.push(copy.id);
                        next.push(copy)?;
                    }
                }
                if members.len() >= 2 {
                    created.push(next.group(&members)?);
                } else {
                    created.extend(members);
                }
            } else if element
                .group_id
                .is_none_or(|g| !selected.contains(&g))
            {
                let copy = duplicate_of(element);
                created.push(copy.id);
                next.push(copy)?;
            }
        }

        if created.is_empty() {
            return Ok(created);
        }
        self.graph = next;
        self.set_selection(&created);
        self.commit("duplicate");
        Ok(created)
    }

    /// Move the selection (and members of selected groups) by `(dx, dy)`.
    pub fn nudge_selection(&mut self, dx: f64, dy: f64) -> Result<bool, EditError> {
        self.ensure_idle()?;
        let ids = self.with_group_members(&self.selection);
        if ids.is_empty() || (dx == 0.0 && dy == 0.0) {
            return Ok(false);
        }
        for id in ids {
            if let Some(el) = self.graph.get_mut(id) {
                el.translate(dx, dy);
            }
        }
        self.commit("nudge");
        Ok(true)
    }

    fn reorder(
        &mut self,
        id: ElementId,
        what: &str,
        op: fn(&mut SceneGraph, ElementId) -> bool,
    ) -> Result<bool, EditError> {
        self.ensure_idle()?;
        if !self.graph.contains(id) {
            return Err(sb_core::ModelError::UnknownId(id).into());
        }
        let changed = op(&mut self.graph, id);
        if changed {
            self.commit(what);
        }
        Ok(changed)
    }

    pub fn send_backward(&mut self, id: ElementId) -> Result<bool, EditError> {
        self.reorder(id, "send backward", SceneGraph::send_backward)
    }

    pub fn bring_forward(&mut self, id: ElementId) -> Result<bool, EditError> {
        self.reorder(id, "bring forward", SceneGraph::bring_forward)
    }

    pub fn send_to_back(&mut self, id: ElementId) -> Result<bool, EditError> {
        self.reorder(id, "send to back", SceneGraph::send_to_back)
    }

    pub fn bring_to_front(&mut self, id: ElementId) -> Result<bool, EditError> {
        self.reorder(id, "bring to front", SceneGraph::bring_to_front)
    }

    // ─── History ─────────────────────────────────────────────────────────

    /// Step back one snapshot. Clears the selection. Returns false at the start.
    pub fn undo(&mut self) -> bool {
        if self.gesture_start.is_some() {
            return false;
        }
        match self.history.undo() {
            Some(g) => {
                self.graph = g.clone();
                self.selection.clear();
                true
            }
            None => false,
        }
    }

    pub fn redo(&mut self) -> bool {
        if self.gesture_start.is_some() {
            return false;
        }
        match self.history.redo() {
            Some(g) => {
                self.graph = g.clone();
                self.selection.clear();
                true
            }
            None => false,
        }
    }

    // ─── Gestures ────────────────────────────────────────────────────────

    pub fn gesture_active(&self) -> bool {
        self.gesture_start.is_some()
    }

    /// Remember the current graph; later live edits are batched into one step.
    pub fn begin_gesture(&mut self) {
        if self.gesture_start.is_none() {
            self.gesture_start = Some(self.graph.clone());
        }
    }

    /// Close the gesture. Commits one snapshot if the graph changed and
    /// returns whether it did.
    pub fn end_gesture(&mut self) -> bool {
        let Some(start) = self.gesture_start.take() else {
            return false;
        };
        if start == self.graph {
            return false;
        }
        self.commit("gesture");
        true
    }

    /// Abort the gesture and restore the graph it started from.
    pub fn cancel_gesture(&mut self) -> bool {
        match self.gesture_start.take() {
            Some(start) => {
                self.graph = start;
                self.prune_selection();
                true
            }
            None => false,
        }
    }
}

fn duplicate_of(src: &Element) -> Element {
    let mut copy = src.clone();
    copy.id = ElementId::with_prefix(src.kind.type_name());
    copy.group_id = None;
    copy.translate(DUPLICATE_OFFSET, DUPLICATE_OFFSET);
    copy
}

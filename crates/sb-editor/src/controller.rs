//! Interaction controller: pointer/key events → store mutations.
//!
//! One gesture at a time. Pointer-down picks the gesture: a resize handle
//! of a selected element, then the topmost element, then a marquee (Shift)
//! or a pan (Alt or the middle button). Moves edit the live graph against
//! the state captured at gesture start; pointer-up commits at most one
//! history snapshot.
//!
//! ## Modifier behaviors
//!
//! | Modifier | On element | On background | While resizing |
//! |----------|------------|---------------|----------------|
//! | **Shift** | Toggle in selection | Marquee select | Lock aspect |
//! | **Alt** | | Pan view | |

use crate::input::{Button, InputEvent, Modifiers};
use crate::shortcuts::{ShortcutAction, ShortcutMap};
use crate::store::SceneStore;
use sb_core::geometry::{Bounds, Handle, apply_resize};
use sb_core::{Element, ElementId};
use sb_render::hit::{handle_at, hit_test_rect, topmost_at};

#[derive(Debug, Clone, PartialEq)]
pub enum GestureState {
    Idle,
    /// Marquee from `origin`; `base` is the selection when it started.
    Selecting {
        origin: (f64, f64),
        rect: Bounds,
        base: Vec<ElementId>,
    },
    /// Moving elements; `originals` are their states at gesture start.
    /// `anchor` is the grabbed element's position, the one snapped to the grid.
    Dragging {
        start: (f64, f64),
        anchor: (f64, f64),
        originals: Vec<Element>,
    },
    Resizing {
        handle: Handle,
        original: Element,
    },
    /// Moving the view; `last` is the previous pointer position (view space).
    Panning { last: (f64, f64) },
}

#[derive(Debug, Clone)]
pub struct Controller {
    state: GestureState,
    view_offset: (f64, f64),
}

impl Default for Controller {
    fn default() -> Self {
        Self::new()
    }
}

impl Controller {
    pub fn new() -> Self {
        Self {
            state: GestureState::Idle,
            view_offset: (0.0, 0.0),
        }
    }

    pub fn state(&self) -> &GestureState {
        &self.state
    }

    pub fn is_idle(&self) -> bool {
        self.state == GestureState::Idle
    }

    pub fn view_offset(&self) -> (f64, f64) {
        self.view_offset
    }

    /// Current marquee rectangle, in scene coordinates.
    pub fn marquee(&self) -> Option<Bounds> {
        match &self.state {
            GestureState::Selecting { rect, .. } => Some(*rect),
            _ => None,
        }
    }

    /// View → scene coordinates.
    pub fn to_scene(&self, x: f64, y: f64) -> (f64, f64) {
        (x - self.view_offset.0, y - self.view_offset.1)
    }

    /// Feed one event. Returns whether the host should redraw.
    pub fn handle(&mut self, store: &mut SceneStore, event: &InputEvent) -> bool {
        match event {
            InputEvent::PointerDown {
                x,
                y,
                button,
                modifiers,
            } => self.pointer_down(store, *x, *y, *button, *modifiers),
            InputEvent::PointerMove { x, y, modifiers } => {
                self.pointer_move(store, *x, *y, *modifiers)
            }
            InputEvent::PointerUp { .. } => self.pointer_up(store),
            InputEvent::Key { key, modifiers } => match ShortcutMap::resolve(key, *modifiers) {
                Some(action) => self.apply(store, action),
                None => false,
            },
        }
    }

    pub fn pointer_down(
        &mut self,
        store: &mut SceneStore,
        vx: f64,
        vy: f64,
        button: Button,
        modifiers: Modifiers,
    ) -> bool {
        if !self.is_idle() {
            log::trace!("pointer-down ignored: gesture in progress");
            return false;
        }
        if button == Button::Middle {
            self.state = GestureState::Panning { last: (vx, vy) };
            return false;
        }
        let (x, y) = self.to_scene(vx, vy);

        if let Some((id, handle)) = handle_at(store.graph(), store.selection(), x, y)
            && let Some(original) = store.graph().get(id).cloned()
        {
            store.begin_gesture();
            log::debug!("resize {id} via {handle:?}");
            self.state = GestureState::Resizing { handle, original };
            return true;
        }

        if let Some(hit) = topmost_at(store.graph(), x, y) {
            if modifiers.shift {
                store.toggle_selection(hit);
                if !store.is_selected(hit) {
                    return true;
                }
            } else if !store.is_selected(hit) {
                store.set_selection(&[hit]);
            }
            let ids = store.with_group_members(store.selection());
            let originals = ids
                .iter()
                .filter_map(|id| store.graph().get(*id).cloned())
                .collect();
            let anchor = store.graph().get(hit).map_or((x, y), |e| (e.x, e.y));
            store.begin_gesture();
            log::debug!("drag {} elements", store.selection().len());
            self.state = GestureState::Dragging {
                start: (x, y),
                anchor,
                originals,
            };
            return true;
        }

        if modifiers.shift {
            self.state = GestureState::Selecting {
                origin: (x, y),
                rect: Bounds::new(x, y, 0.0, 0.0),
                base: store.selection().to_vec(),
            };
            return true;
        }
        if modifiers.alt {
            self.state = GestureState::Panning { last: (vx, vy) };
            return false;
        }

        let had_selection = !store.selection().is_empty();
        store.clear_selection();
        had_selection
    }

    pub fn pointer_move(
        &mut self,
        store: &mut SceneStore,
        vx: f64,
        vy: f64,
        modifiers: Modifiers,
    ) -> bool {
        let (x, y) = self.to_scene(vx, vy);
        match &mut self.state {
            GestureState::Idle => false,

            GestureState::Dragging {
                start,
                anchor,
                originals,
            } => {
                let (dx, dy) = (x - start.0, y - start.1);
                // Every element moves by the same snapped delta.
                let config = store.config();
                let sdx = config.snap(anchor.0 + dx) - anchor.0;
                let sdy = config.snap(anchor.1 + dy) - anchor.1;
                let graph = store.graph_mut();
                for original in originals.iter() {
                    if let Some(live) = graph.get_mut(original.id) {
                        let mut moved = original.clone();
                        moved.translate(sdx, sdy);
                        moved.group_id = live.group_id;
                        *live = moved;
                    }
                }
                log::trace!("drag delta ({sdx}, {sdy})");
                true
            }

            GestureState::Resizing { handle, original } => {
                let grid = store.config().grid_size;
                let Some(result) = apply_resize(original, *handle, x, y, modifiers.shift, grid)
                else {
                    return false;
                };
                let resized = result.applied_to(original);
                if let Err(e) = store.graph_mut().replace(resized) {
                    log::warn!("resize of {} rejected: {e}", original.id);
                    return false;
                }
                true
            }

            GestureState::Selecting { origin, rect, base } => {
                *rect = Bounds::from_corners(origin.0, origin.1, x, y);
                let mut selection = base.clone();
                selection.extend(hit_test_rect(store.graph(), rect));
                store.set_selection(&selection);
                true
            }

            GestureState::Panning { last } => {
                self.view_offset.0 += vx - last.0;
                self.view_offset.1 += vy - last.1;
                *last = (vx, vy);
                true
            }
        }
    }

    /// End the gesture. Commits one snapshot if it changed the graph.
    pub fn pointer_up(&mut self, store: &mut SceneStore) -> bool {
        let state = std::mem::replace(&mut self.state, GestureState::Idle);
        match state {
            GestureState::Dragging { .. } | GestureState::Resizing { .. } => {
                let committed = store.end_gesture();
                log::debug!("gesture end (committed: {committed})");
                true
            }
            GestureState::Selecting { .. } => true,
            GestureState::Panning { .. } | GestureState::Idle => false,
        }
    }

    /// Abort the active gesture, restoring the graph it started from.
    pub fn cancel(&mut self, store: &mut SceneStore) -> bool {
        let state = std::mem::replace(&mut self.state, GestureState::Idle);
        match state {
            GestureState::Dragging { .. } | GestureState::Resizing { .. } => {
                store.cancel_gesture()
            }
            GestureState::Selecting { base, .. } => {
                store.set_selection(&base);
                true
            }
            GestureState::Panning { .. } | GestureState::Idle => false,
        }
    }

    /// Run a shortcut action. Returns whether anything visible changed.
    pub fn apply(&mut self, store: &mut SceneStore, action: ShortcutAction) -> bool {
        if action == ShortcutAction::Cancel {
            let cancelled = self.cancel(store);
            let had_selection = !store.selection().is_empty();
            store.clear_selection();
            return cancelled || had_selection;
        }
        if !self.is_idle() {
            log::trace!("{action:?} ignored: gesture in progress");
            return false;
        }

        let single = store.selection().first().copied();
        let result = match action {
            ShortcutAction::Undo => Ok(store.undo()),
            ShortcutAction::Redo => Ok(store.redo()),
            ShortcutAction::Delete => store.delete_selection().map(|n| n > 0),
            ShortcutAction::SelectAll => {
                store.select_all();
                Ok(true)
            }
            ShortcutAction::Duplicate => store.duplicate_selection().map(|c| !c.is_empty()),
            ShortcutAction::Group => store.group_selection().map(|_| true),
            ShortcutAction::Ungroup => store.ungroup_selection().map(|f| !f.is_empty()),
            ShortcutAction::Nudge { dx, dy, large } => {
                let step = if large {
                    store.config().nudge_step_large
                } else {
                    store.config().nudge_step
                };
                store.nudge_selection(f64::from(dx) * step, f64::from(dy) * step)
            }
            ShortcutAction::SendBackward
            | ShortcutAction::BringForward
            | ShortcutAction::SendToBack
            | ShortcutAction::BringToFront => match single {
                Some(id) => match action {
                    ShortcutAction::SendBackward => store.send_backward(id),
                    ShortcutAction::BringForward => store.bring_forward(id),
                    ShortcutAction::SendToBack => store.send_to_back(id),
                    _ => store.bring_to_front(id),
                },
                None => Ok(false),
            },
            ShortcutAction::Cancel => Ok(false),
        };
        result.unwrap_or_else(|e| {
            log::warn!("{action:?} failed: {e}");
            false
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use sb_core::{Color, EditorConfig, ElementKind, bounding_box};

    fn store_with_rect() -> (SceneStore, ElementId) {
        let mut store = SceneStore::default();
        let id = store
            .add(Element::new(ElementKind::rect(200.0, 100.0, Color::BLACK), 600.0, 400.0))
            .unwrap();
        (store, id)
    }

    #[test]
    fn click_selects_and_drag_commits_once() {
        let (mut store, id) = store_with_rect();
        let mut ctl = Controller::new();
        let before = store.history().len();

        ctl.handle(&mut store, &InputEvent::down(600.0, 400.0, Modifiers::NONE));
        assert_eq!(store.selection(), &[id]);
        for i in 1..=10 {
            ctl.handle(
                &mut store,
                &InputEvent::moved(600.0 + i as f64 * 3.0, 400.0, Modifiers::NONE),
            );
        }
        ctl.handle(&mut store, &InputEvent::up(630.0, 400.0, Modifiers::NONE));

        assert!(ctl.is_idle());
        assert_eq!(store.graph().get(id).unwrap().x, 630.0);
        assert_eq!(store.history().len(), before + 1);
    }

    #[test]
    fn click_without_move_commits_nothing() {
        let (mut store, _) = store_with_rect();
        let mut ctl = Controller::new();
        let before = store.history().len();
        ctl.handle(&mut store, &InputEvent::down(600.0, 400.0, Modifiers::NONE));
        ctl.handle(&mut store, &InputEvent::up(600.0, 400.0, Modifiers::NONE));
        assert_eq!(store.history().len(), before);
    }

    #[test]
    fn se_handle_resize_keeps_top_left() {
        let (mut store, id) = store_with_rect();
        store.set_selection(&[id]);
        let mut ctl = Controller::new();

        ctl.handle(&mut store, &InputEvent::down(704.0, 454.0, Modifiers::NONE));
        assert!(matches!(
            ctl.state(),
            GestureState::Resizing { handle: Handle::Se, .. }
        ));
        ctl.handle(&mut store, &InputEvent::moved(750.0, 500.0, Modifiers::NONE));
        ctl.handle(&mut store, &InputEvent::moved(800.0, 600.0, Modifiers::NONE));
        ctl.handle(&mut store, &InputEvent::up(800.0, 600.0, Modifiers::NONE));

        let el = store.graph().get(id).unwrap();
        let b = bounding_box(el);
        assert_eq!((el.x, el.y), (650.0, 475.0));
        assert_eq!((b.width, b.height), (300.0, 250.0));
        assert_eq!(store.history().len(), 3);
    }

    #[test]
    fn pointer_down_during_gesture_is_ignored() {
        let (mut store, _) = store_with_rect();
        let mut ctl = Controller::new();
        ctl.handle(&mut store, &InputEvent::down(600.0, 400.0, Modifiers::NONE));
        let state = ctl.state().clone();
        assert!(!ctl.handle(&mut store, &InputEvent::down(10.0, 10.0, Modifiers::SHIFT)));
        assert_eq!(ctl.state(), &state);
    }

    #[test]
    fn marquee_adds_to_base_selection() {
        let mut store = SceneStore::default();
        let a = store
            .add(Element::new(ElementKind::circle(10.0, Color::BLACK), 50.0, 50.0))
            .unwrap();
        let b = store
            .add(Element::new(ElementKind::circle(10.0, Color::BLACK), 200.0, 200.0))
            .unwrap();
        let c = store
            .add(Element::new(ElementKind::circle(10.0, Color::BLACK), 500.0, 500.0))
            .unwrap();
        store.set_selection(&[c]);
        let mut ctl = Controller::new();

        ctl.handle(&mut store, &InputEvent::down(0.0, 0.0, Modifiers::SHIFT));
        ctl.handle(&mut store, &InputEvent::moved(100.0, 100.0, Modifiers::SHIFT));
        assert_eq!(store.selection(), &[a, c]);
        assert!(ctl.marquee().is_some());
        ctl.handle(&mut store, &InputEvent::moved(250.0, 250.0, Modifiers::SHIFT));
        assert_eq!(store.selection(), &[a, b, c]);
        ctl.handle(&mut store, &InputEvent::up(250.0, 250.0, Modifiers::SHIFT));
        assert!(ctl.marquee().is_none());
        assert_eq!(store.history().len(), 4);
    }

    #[test]
    fn background_click_clears_selection() {
        let (mut store, id) = store_with_rect();
        store.set_selection(&[id]);
        let mut ctl = Controller::new();
        assert!(ctl.handle(&mut store, &InputEvent::down(5.0, 5.0, Modifiers::NONE)));
        assert!(store.selection().is_empty());
        assert!(ctl.is_idle());
    }

    #[test]
    fn alt_drag_pans_the_view() {
        let (mut store, id) = store_with_rect();
        let mut ctl = Controller::new();
        ctl.handle(&mut store, &InputEvent::down(5.0, 5.0, Modifiers::ALT));
        ctl.handle(&mut store, &InputEvent::moved(105.0, 55.0, Modifiers::ALT));
        ctl.handle(&mut store, &InputEvent::up(105.0, 55.0, Modifiers::ALT));
        assert_eq!(ctl.view_offset(), (100.0, 50.0));

        // The rect at scene (600, 400) is now under view (700, 450).
        ctl.handle(&mut store, &InputEvent::down(700.0, 450.0, Modifiers::NONE));
        assert_eq!(store.selection(), &[id]);
    }

    #[test]
    fn escape_cancels_drag() {
        let (mut store, id) = store_with_rect();
        let mut ctl = Controller::new();
        ctl.handle(&mut store, &InputEvent::down(600.0, 400.0, Modifiers::NONE));
        ctl.handle(&mut store, &InputEvent::moved(700.0, 400.0, Modifiers::NONE));
        assert_eq!(store.graph().get(id).unwrap().x, 700.0);
        ctl.handle(&mut store, &InputEvent::key("Escape", Modifiers::NONE));
        assert_eq!(store.graph().get(id).unwrap().x, 600.0);
        assert!(store.selection().is_empty());
        assert_eq!(store.history().len(), 2);
    }

    #[test]
    fn drag_snaps_to_grid_and_moves_segments_whole() {
        let config = EditorConfig {
            grid_size: Some(10.0),
            ..EditorConfig::default()
        };
        let mut store = SceneStore::new(config);
        let id = store
            .add(Element::new(ElementKind::line(100.0, 50.0, Color::BLACK), 0.0, 0.0))
            .unwrap();
        let mut ctl = Controller::new();
        ctl.handle(&mut store, &InputEvent::down(50.0, 25.0, Modifiers::NONE));
        ctl.handle(&mut store, &InputEvent::moved(63.0, 31.0, Modifiers::NONE));
        ctl.handle(&mut store, &InputEvent::up(63.0, 31.0, Modifiers::NONE));

        let line = store.graph().get(id).unwrap();
        assert_eq!((line.x, line.y), (10.0, 10.0));
        assert!(matches!(
            line.kind,
            ElementKind::Line { end_x, end_y, .. } if end_x == 110.0 && end_y == 60.0
        ));
    }

    #[test]
    fn shift_click_toggles_membership() {
        let mut store = SceneStore::default();
        let a = store
            .add(Element::new(ElementKind::circle(10.0, Color::BLACK), 0.0, 0.0))
            .unwrap();
        let b = store
            .add(Element::new(ElementKind::circle(10.0, Color::BLACK), 100.0, 0.0))
            .unwrap();
        let mut ctl = Controller::new();
        ctl.handle(&mut store, &InputEvent::down(0.0, 0.0, Modifiers::NONE));
        ctl.handle(&mut store, &InputEvent::up(0.0, 0.0, Modifiers::NONE));
        ctl.handle(&mut store, &InputEvent::down(100.0, 0.0, Modifiers::SHIFT));
        ctl.handle(&mut store, &InputEvent::up(100.0, 0.0, Modifiers::SHIFT));
        assert_eq!(store.selection(), &[a, b]);
        ctl.handle(&mut store, &InputEvent::down(0.0, 0.0, Modifiers::SHIFT));
        assert!(ctl.is_idle());
        assert_eq!(store.selection(), &[b]);
    }

    #[test]
    fn shortcuts_drive_the_store() {
        let (mut store, id) = store_with_rect();
        let mut ctl = Controller::new();
        let cmd = Modifiers {
            ctrl: true,
            ..Modifiers::NONE
        };
        assert!(ctl.handle(&mut store, &InputEvent::key("a", cmd)));
        assert!(ctl.handle(&mut store, &InputEvent::key("ArrowRight", Modifiers::SHIFT)));
        assert_eq!(store.graph().get(id).unwrap().x, 610.0);
        assert!(ctl.handle(&mut store, &InputEvent::key("z", cmd)));
        assert_eq!(store.graph().get(id).unwrap().x, 600.0);
        assert!(!ctl.handle(&mut store, &InputEvent::key("q", Modifiers::NONE)));
        // Grouping a single element fails softly.
        store.set_selection(&[id]);
        assert!(!ctl.handle(&mut store, &InputEvent::key("g", cmd)));
    }
}

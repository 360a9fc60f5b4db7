//! Integration tests: grouping through the store and controller.

use pretty_assertions::assert_eq;
use sb_core::{Color, EditorConfig, Element, ElementKind, bounding_box};
use sb_editor::{Controller, InputEvent, Modifiers, SceneStore};

const CMD: Modifiers = Modifiers {
    ctrl: true,
    ..Modifiers::NONE
};

/// Three elements whose boxes span x ∈ [100, 400], y ∈ [100, 300].
fn three_elements(store: &mut SceneStore) -> Vec<sb_core::ElementId> {
    vec![
        store
            .add(Element::new(ElementKind::rect(100.0, 100.0, Color::BLACK), 150.0, 150.0))
            .unwrap(),
        store
            .add(Element::new(ElementKind::circle(50.0, Color::BLACK), 350.0, 250.0))
            .unwrap(),
        store
            .add(Element::new(ElementKind::arrow(300.0, 280.0, Color::BLACK), 200.0, 200.0))
            .unwrap(),
    ]
}

#[test]
fn group_box_is_union_plus_padding() {
    let mut store = SceneStore::default();
    let ids = three_elements(&mut store);
    store.set_selection(&ids);
    let gid = store.group_selection().unwrap();

    let b = bounding_box(store.graph().get(gid).unwrap());
    assert!(b.width >= 300.0 + 100.0);
    assert!(b.height >= 200.0 + 100.0);
    assert_eq!((b.x, b.y), (50.0, 50.0));
    assert_eq!(store.selection(), &[gid]);
    for id in &ids {
        assert_eq!(store.graph().get(*id).unwrap().group_id, Some(gid));
    }
}

#[test]
fn group_then_ungroup_restores_the_three() {
    let mut store = SceneStore::default();
    let ids = three_elements(&mut store);
    let before: Vec<Element> = store.graph().elements().to_vec();

    store.set_selection(&ids);
    let gid = store.group_selection().unwrap();
    store.ungroup(&[gid]).unwrap();

    assert_eq!(store.graph().elements(), before.as_slice());
    assert!(!store.graph().contains(gid));
}

#[test]
fn needs_two_free_elements() {
    let mut store = SceneStore::default();
    let ids = three_elements(&mut store);
    store.set_selection(&ids[..1]);
    assert!(store.group_selection().is_err());

    store.set_selection(&ids[..2]);
    let gid = store.group_selection().unwrap();
    store.set_selection(&[gid, ids[2]]);
    assert!(store.group_selection().is_err(), "groups cannot nest");
}

#[test]
fn deleting_group_keeps_children() {
    let mut store = SceneStore::default();
    let ids = three_elements(&mut store);
    store.set_selection(&ids);
    let gid = store.group_selection().unwrap();
    store.delete(&[gid]).unwrap();
    assert_eq!(store.graph().len(), 3);
    assert!(store.graph().iter().all(|e| e.group_id.is_none()));
    store.graph().validate().unwrap();
}

#[test]
fn dragging_a_group_moves_its_children() {
    let mut store = SceneStore::default();
    let ids = three_elements(&mut store);
    let mut ctl = Controller::new();

    ctl.handle(&mut store, &InputEvent::key("a", CMD));
    ctl.handle(&mut store, &InputEvent::key("g", CMD));
    let gid = store.selection()[0];

    // Inside the padding: only the group is under the pointer.
    ctl.handle(&mut store, &InputEvent::down(60.0, 60.0, Modifiers::NONE));
    ctl.handle(&mut store, &InputEvent::moved(70.0, 80.0, Modifiers::NONE));
    ctl.handle(&mut store, &InputEvent::up(70.0, 80.0, Modifiers::NONE));

    assert_eq!(store.graph().get(ids[0]).unwrap().x, 160.0);
    assert_eq!(store.graph().get(ids[1]).unwrap().y, 270.0);
    let arrow = store.graph().get(ids[2]).unwrap();
    assert!(matches!(
        arrow.kind,
        ElementKind::Arrow { end_x, end_y, .. } if end_x == 310.0 && end_y == 300.0
    ));
    assert_eq!(bounding_box(store.graph().get(gid).unwrap()).x, 60.0);

    ctl.handle(&mut store, &InputEvent::key("G", Modifiers { shift: true, ..CMD }));
    assert_eq!(store.selection(), ids.as_slice());
    store.graph().validate().unwrap();
}

#[test]
fn grid_drag_keeps_children_spacing() {
    let mut store = SceneStore::new(EditorConfig {
        grid_size: Some(10.0),
        ..EditorConfig::default()
    });
    let a = store
        .add(Element::new(ElementKind::rect(100.0, 100.0, Color::BLACK), 103.0, 150.0))
        .unwrap();
    let b = store
        .add(Element::new(ElementKind::rect(100.0, 100.0, Color::BLACK), 217.0, 150.0))
        .unwrap();
    store.set_selection(&[a, b]);
    let gid = store.group_selection().unwrap();
    assert_eq!(store.graph().get(gid).unwrap().x, 160.0);

    let mut ctl = Controller::new();
    ctl.handle(&mut store, &InputEvent::down(60.0, 60.0, Modifiers::NONE));
    ctl.handle(&mut store, &InputEvent::moved(90.0, 60.0, Modifiers::NONE));
    ctl.handle(&mut store, &InputEvent::up(90.0, 60.0, Modifiers::NONE));

    let x = |id| store.graph().get(id).unwrap().x;
    assert_eq!(x(gid), 190.0);
    assert_eq!(x(a), 133.0);
    assert_eq!(x(b) - x(a), 114.0);
    store.graph().validate().unwrap();
}

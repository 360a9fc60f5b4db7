use pretty_assertions::assert_eq;
use sb_core::geometry::apply_resize;
use sb_core::*;

fn easing_linear_fade() -> AnimationDescriptor {
    AnimationDescriptor::new(AnimationKind::FadeIn, 1000.0, 0.0, Easing::Linear).unwrap()
}

#[test]
fn dragging_se_handle_of_rect() {
    let rect = Element::new(ElementKind::rect(200.0, 100.0, Color::BLACK), 600.0, 400.0);
    let handle = geometry::resize_handle(&rect, 704.0, 454.0).unwrap();
    assert_eq!(handle, Handle::Se);

    let resized = apply_resize(&rect, handle, 800.0, 600.0, false, None)
        .unwrap()
        .applied_to(&rect);
    let b = bounding_box(&resized);
    assert_eq!((resized.x, resized.y), (650.0, 475.0));
    assert_eq!((b.width, b.height), (300.0, 250.0));
    assert_eq!((b.x, b.y), (500.0, 350.0));
    assert_eq!(resized.id, rect.id);
}

#[test]
fn linear_fade_samples() {
    let el = Element::new(ElementKind::circle(20.0, Color::BLACK), 0.0, 0.0)
        .animated(easing_linear_fade());
    assert_eq!(evaluate(&el, 500.0).opacity, 0.5);
    assert_eq!(evaluate(&el, 1000.0).opacity, 1.0);
    assert_eq!(evaluate(&el, 1500.0).opacity, 1.0);
}

#[test]
fn group_spans_union_plus_padding() {
    // Boxes spanning x ∈ [100, 400], y ∈ [100, 300].
    let a = Element::new(ElementKind::rect(100.0, 100.0, Color::BLACK), 150.0, 150.0);
    let b = Element::new(ElementKind::circle(50.0, Color::BLACK), 350.0, 250.0);
    let c = Element::new(ElementKind::line(250.0, 200.0, Color::BLACK), 200.0, 120.0);
    let ids = [a.id, b.id, c.id];
    let mut graph = SceneGraph::from_elements(vec![a, b, c]).unwrap();

    let gid = graph.group(&ids).unwrap();
    let group = graph.get(gid).unwrap();
    let ElementKind::Group {
        width,
        height,
        children,
    } = &group.kind
    else {
        panic!("expected a group, got {:?}", group.kind);
    };
    assert!(*width >= 400.0, "width {width}");
    assert!(*height >= 300.0, "height {height}");
    assert_eq!(children.as_slice(), &ids);
    assert_eq!(graph.elements().last().map(|e| e.id), Some(gid));
    graph.validate().unwrap();
}

#[test]
fn group_then_ungroup_restores_members() {
    let template = r##"[
        {"type": "text", "x": 100, "y": 100, "text": "Hello"},
        {"type": "rect", "x": 300, "y": 200, "width": 80, "height": 40, "color": "#ff0000"},
        {"type": "circle", "x": 500, "y": 300, "radius": 25}
    ]"##;
    let elements = import_template(template).unwrap();
    let original = SceneGraph::from_elements(elements).unwrap();
    let ids = original.ids();

    let mut graph = original.clone();
    let gid = graph.group(&ids).unwrap();
    assert_eq!(graph.len(), 4);
    assert!(graph.iter().take(3).all(|e| e.group_id == Some(gid)));

    let freed = graph.ungroup(&[gid]);
    assert_eq!(freed, ids);
    assert_eq!(graph, original);
}

#[test]
fn scene_json_round_trips() {
    let a = Element::new(ElementKind::arrow(10.0, 20.0, Color::parse("red").unwrap()), 0.0, 0.0)
        .animated(easing_linear_fade());
    let graph = SceneGraph::from_elements(vec![a]).unwrap();
    let json = serde_json::to_string(&graph).unwrap();
    assert!(json.contains(r#""type":"arrow""#), "{json}");
    assert!(json.contains(r#""endX":10.0"#), "{json}");
    let back: SceneGraph = serde_json::from_str(&json).unwrap();
    assert_eq!(back, graph);
}

#[test]
fn loading_rejects_broken_scenes() {
    let a = Element::new(ElementKind::circle(5.0, Color::BLACK), 0.0, 0.0);
    let graph = SceneGraph::from_elements(vec![a]).unwrap();
    let mut records = serde_json::to_value(&graph).unwrap();
    let first = records[0].clone();
    records.as_array_mut().unwrap().push(first);
    let err = serde_json::from_value::<SceneGraph>(records).unwrap_err();
    assert!(err.to_string().contains("duplicate element id"), "{err}");

    let mut orphan = serde_json::to_value(&graph).unwrap();
    orphan[0]["groupId"] = serde_json::json!("no_such_group");
    assert!(serde_json::from_value::<SceneGraph>(orphan).is_err());
}

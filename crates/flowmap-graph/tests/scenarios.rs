use flowmap_core::{GraphModel, LinkSpec, NodeId, NodeSpec, RawGraph};
use flowmap_graph::{
    CategoryPalette, Extent, HighlightController, HighlightState, NeighborhoodIndex,
    NodeAlignment, Scene, SceneStyle, Visibility, layout,
};
use std::sync::Arc;

fn chain() -> GraphModel {
    GraphModel::build(
        vec![NodeSpec::new("A"), NodeSpec::new("B"), NodeSpec::new("C")],
        vec![LinkSpec::new("A", "B", 10.0), LinkSpec::new("B", "C", 10.0)],
    )
    .unwrap()
}

fn controller(model: GraphModel) -> (Arc<GraphModel>, HighlightController) {
    let model = Arc::new(model);
    let index = Arc::new(NeighborhoodIndex::build(&model));
    (Arc::clone(&model), HighlightController::new(model, index))
}

#[test]
fn test_chain_at_100_by_100() {
    let model = chain();
    let result = layout(&model, Extent::new(0.0, 0.0, 100.0, 100.0), NodeAlignment::Justify)
        .unwrap();

    let layers: Vec<usize> = result.nodes.iter().map(|n| n.layer).collect();
    assert_eq!(layers, vec![0, 1, 2]);
    let h = result.nodes[0].height();
    assert!(result.nodes.iter().all(|n| (n.height() - h).abs() < 1e-9));

    let (_, mut highlight) = controller(model);
    let update = highlight.hover(&NodeId::from("B")).unwrap();
    assert!(update.diff.nodes.is_empty());
    assert!(update.diff.links.is_empty());
}

#[test]
fn test_isolated_node_highlights_only_itself() {
    let model = GraphModel::build(
        vec![
            NodeSpec::new("A"),
            NodeSpec::new("B"),
            NodeSpec::new("C"),
            NodeSpec::new("D"),
        ],
        vec![LinkSpec::new("A", "B", 10.0), LinkSpec::new("B", "C", 10.0)],
    )
    .unwrap();
    let result = layout(&model, Extent::new(0.0, 0.0, 100.0, 100.0), NodeAlignment::Justify)
        .unwrap();
    let d = &result.nodes[3];
    assert!(d.y1 > d.y0);

    let (model, mut highlight) = controller(model);
    highlight.hover(&NodeId::from("D")).unwrap();
    let visibility = highlight.visibility();
    let full: Vec<&str> = model
        .node_indices()
        .filter(|&n| visibility.node(n) == Visibility::Full)
        .map(|n| model[n].name())
        .collect();
    assert_eq!(full, vec!["D"]);
}

#[test]
fn test_unknown_endpoint_rejects_graph() {
    let raw: RawGraph = serde_json::from_str(
        r#"{"nodes":[{"name":"A"}],"links":[{"source":"A","target":"missing","value":1}]}"#,
    )
    .unwrap();
    let err = GraphModel::from_raw(raw).unwrap_err();
    assert!(err.to_string().contains("missing"));
}

#[test]
fn test_scene_is_deterministic_and_serializable() {
    let raw: RawGraph = serde_json::from_str(
        r#"{
            "nodes": [{"name":"Oil"},{"name":"Gas"},{"name":"Power"},{"name":"Transport"},{"name":"Homes"}],
            "links": [
                {"source":0,"target":3,"value":40},
                {"source":0,"target":2,"value":5},
                {"source":1,"target":2,"value":25},
                {"source":1,"target":4,"value":12},
                {"source":2,"target":4,"value":30}
            ]
        }"#,
    )
    .unwrap();
    let model = GraphModel::from_raw(raw).unwrap();
    let extent = Extent::new(1.0, 5.0, 799.0, 595.0);

    let render = || {
        let result = layout(&model, extent, NodeAlignment::Justify).unwrap();
        let (m, highlight) = controller(model.clone());
        Scene::build(
            &m,
            &result,
            &highlight.visibility(),
            &CategoryPalette::for_model(&m),
            &SceneStyle::default(),
        )
    };
    let first = render();
    let second = render();
    assert_eq!(first, second);

    let json = serde_json::to_value(&first).unwrap();
    assert_eq!(json["nodes"][0]["fill"], "#1f77b4");
    assert_eq!(json["links"][0]["tooltip"], "Oil → Transport\n40 TWh");
    assert!(json["links"][4]["d"].as_str().unwrap().starts_with('M'));
}

#[test]
fn test_locked_highlight_ignores_hover() {
    let (_, mut highlight) = controller(chain());
    highlight.click(&NodeId::from("A")).unwrap();
    let locked = highlight.visibility();
    highlight.hover(&NodeId::from("C")).unwrap();
    highlight.unhover();
    assert!(matches!(highlight.state(), HighlightState::Locked(_)));
    assert_eq!(*highlight.visibility(), *locked);
}

use flowmap_core::{GraphModel, LinkSpec, NodeSpec, ValidationError};

/// Layered graph with `layers` columns of `width` nodes; every node links to
/// three nodes of the next column.
pub fn layered_graph(layers: usize, width: usize) -> Result<GraphModel, ValidationError> {
    let name = |layer: usize, i: usize| format!("n{layer}_{i}");
    let nodes = (0..layers)
        .flat_map(|layer| (0..width).map(move |i| (layer, i)))
        .map(|(layer, i)| NodeSpec::new(name(layer, i)).with_category(format!("layer{layer}")))
        .collect();
    let links = (0..layers.saturating_sub(1))
        .flat_map(|layer| (0..width).map(move |i| (layer, i)))
        .flat_map(|(layer, i)| {
            (0..3).map(move |k| {
                let target = (i * 7 + k * 3) % width;
                (layer, i, target, ((i + k) % 9 + 1) as f64)
            })
        })
        .map(|(layer, i, target, value)| LinkSpec::new(name(layer, i), name(layer + 1, target), value))
        .collect();
    GraphModel::build(nodes, links)
}

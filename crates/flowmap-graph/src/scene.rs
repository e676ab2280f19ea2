//! Render-ready description of a laid out graph.
//!
//! A [`Scene`] carries everything a drawing backend needs (rectangles,
//! paths, colors, opacities, labels and tooltips) and serializes to JSON.

use crate::highlight::VisibilityMap;
use crate::layout::LayoutResult;
use crate::link_path::LinkPath;
use crate::style::{
    CategoryPalette, Color, LABEL_BACKGROUND_COLOR, LABEL_BACKGROUND_PADDING, LABEL_FONT_FAMILY,
    LABEL_FONT_SIZE, LABEL_TEXT_COLOR, LINK_STROKE_OPACITY,
};
use flowmap_core::{GraphModel, LinkIndex, NodeId, NodeIndex};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SceneStyle {
    /// Opacity of nodes and links outside the highlighted neighborhood.
    pub dimmed_opacity: f64,
    /// Horizontal gap between a node and its label.
    pub label_offset: f64,
    /// Unit appended to values in tooltips.
    pub value_unit: String,
}

impl Default for SceneStyle {
    fn default() -> Self {
        Self {
            dimmed_opacity: 0.1,
            label_offset: 6.0,
            value_unit: "TWh".to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TextAnchor {
    Start,
    End,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LabelShape {
    pub text: String,
    pub x: f64,
    pub y: f64,
    pub anchor: TextAnchor,
    pub opacity: f64,
}

/// Shared look of every node label: bold text on a padded plate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LabelStyle {
    pub text_color: Color,
    pub background: Color,
    pub font_family: String,
    pub font_size: f64,
    pub bold: bool,
    /// Space between the text and the edge of the background plate.
    pub background_padding: f64,
}

impl Default for LabelStyle {
    fn default() -> Self {
        Self {
            text_color: LABEL_TEXT_COLOR,
            background: LABEL_BACKGROUND_COLOR,
            font_family: LABEL_FONT_FAMILY.to_string(),
            font_size: LABEL_FONT_SIZE,
            bold: true,
            background_padding: LABEL_BACKGROUND_PADDING,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeShape {
    pub id: NodeId,
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
    pub fill: Color,
    pub stroke: Color,
    pub opacity: f64,
    pub tooltip: String,
    pub label: LabelShape,
}

/// Horizontal two-stop gradient from the source color to the target color.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Gradient {
    pub id: String,
    pub x1: f64,
    pub x2: f64,
    pub from: Color,
    pub to: Color,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LinkShape {
    pub source: NodeId,
    pub target: NodeId,
    pub path: LinkPath,
    /// SVG path data for `path`.
    pub d: String,
    pub stroke_width: f64,
    pub gradient: Gradient,
    pub opacity: f64,
    pub tooltip: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Scene {
    pub nodes: Vec<NodeShape>,
    pub links: Vec<LinkShape>,
    pub link_stroke_opacity: f64,
    pub label_style: LabelStyle,
}

impl Scene {
    pub fn build(
        model: &GraphModel,
        layout: &LayoutResult,
        visibility: &VisibilityMap,
        palette: &CategoryPalette,
        style: &SceneStyle,
    ) -> Self {
        let mid_x = (layout.extent.x0 + layout.extent.x1) / 2.0;

        let nodes = model
            .node_indices()
            .map(|idx| {
                let node = &model[idx];
                let geom = layout.node(idx);
                let fill = palette.node_color(model, idx);
                let (x, anchor) = if geom.x0 < mid_x {
                    (geom.x1 + style.label_offset, TextAnchor::Start)
                } else {
                    (geom.x0 - style.label_offset, TextAnchor::End)
                };
                NodeShape {
                    id: node.id.clone(),
                    x: geom.x0,
                    y: geom.y0,
                    width: geom.x1 - geom.x0,
                    height: geom.height(),
                    fill,
                    stroke: fill.darken(0.3),
                    opacity: visibility.node(idx).opacity(style.dimmed_opacity),
                    tooltip: format!(
                        "{}\n{} {}",
                        node.name(),
                        format_value(node.value),
                        style.value_unit
                    ),
                    label: LabelShape {
                        text: node.name().to_string(),
                        x,
                        y: geom.center_y(),
                        anchor,
                        opacity: visibility.label(idx).opacity(),
                    },
                }
            })
            .collect();

        let links = model
            .link_indices()
            .map(|idx| link_shape(model, layout, visibility, palette, style, idx))
            .collect();

        Self {
            nodes,
            links,
            link_stroke_opacity: LINK_STROKE_OPACITY,
            label_style: LabelStyle::default(),
        }
    }

    pub fn node(&self, index: NodeIndex) -> &NodeShape {
        &self.nodes[index.0]
    }

    pub fn link(&self, index: LinkIndex) -> &LinkShape {
        &self.links[index.0]
    }
}

fn link_shape(
    model: &GraphModel,
    layout: &LayoutResult,
    visibility: &VisibilityMap,
    palette: &CategoryPalette,
    style: &SceneStyle,
    idx: LinkIndex,
) -> LinkShape {
    let link = &model[idx];
    let geom = layout.link(idx);
    let path = layout.link_path(idx);
    let source = &model[link.source_idx];
    let target = &model[link.target_idx];

    LinkShape {
        source: link.source.clone(),
        target: link.target.clone(),
        d: path.to_svg_path(),
        path,
        stroke_width: geom.width,
        gradient: Gradient {
            id: format!("link-{idx}"),
            x1: layout.node(link.source_idx).x1,
            x2: layout.node(link.target_idx).x0,
            from: palette.node_color(model, link.source_idx),
            to: palette.node_color(model, link.target_idx),
        },
        opacity: visibility.link(idx).opacity(style.dimmed_opacity),
        tooltip: format!(
            "{} → {}\n{} {}",
            source.name(),
            target.name(),
            format_value(link.value),
            style.value_unit
        ),
    }
}

/// Round to an integer and group thousands with commas (`1234.6` -> `1,235`).
pub fn format_value(value: f64) -> String {
    let rounded = value.round();
    let digits = format!("{:.0}", rounded.abs());
    let mut out = String::with_capacity(digits.len() + digits.len() / 3 + 1);
    if rounded < 0.0 {
        out.push('-');
    }
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    out
}

pub mod detail;
pub mod highlight;
pub mod hit_tester;
pub mod layout;
pub mod link_path;
pub mod neighborhood;
pub mod scene;
pub mod style;

pub use detail::{
    DetailPanelBinder, FlowDirection, NeighborRecord, RecordingBinder, neighbor_records,
};
pub use highlight::{
    HighlightController, HighlightError, HighlightState, HighlightUpdate, LabelVisibility,
    Visibility, VisibilityDiff, VisibilityMap,
};
pub use hit_tester::{HitResult, HitTester};
pub use layout::{
    Extent, LayoutError, LayoutResult, Layouter, LinkLayout, Margins, NodeAlignment, NodeLayout,
    SankeyLayouter, layout,
};
pub use link_path::{LinkPath, Point};
pub use neighborhood::NeighborhoodIndex;
pub use scene::{
    Gradient, LabelShape, LabelStyle, LinkShape, NodeShape, Scene, SceneStyle, TextAnchor,
    format_value,
};
pub use style::{CATEGORY10, CategoryPalette, Color};

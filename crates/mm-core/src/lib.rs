pub mod error;
pub mod id;
pub mod layout;
pub mod model;
pub mod persist;
pub mod style;
pub mod style_value;

pub use error::{MapError, Result, RootOp};
pub use id::NodeId;
pub use layout::{
    LayoutConfig, LayoutEngine, LayoutReport, PlacementResult, Viewport, ViewportProvider,
};
pub use model::*;
pub use persist::{NodeTree, deserialize, serialize};
pub use style::{LineKind, NodeStyle, StyleEdit, StyleMap, StyleSection, keys};
pub use style_value::{Color, parse_color, parse_length};

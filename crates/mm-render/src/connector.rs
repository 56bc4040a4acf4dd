//! Parent → child connector geometry.
//!
//! One connector per non-root node, drawn from the parent's box center to
//! the node's box center with the node's own line style. Geometry is
//! expressed as `kurbo::BezPath` so the same paths feed the Vello painter
//! and the SVG strings handed to the host.

use kurbo::{BezPath, Point};
use mm_core::{Color, LineKind, NodeId, NodeStore};
use std::collections::BTreeMap;

pub const DEFAULT_LINE_WIDTH: f64 = 2.0;
/// `#555555`
pub const DEFAULT_LINE_COLOR: Color = Color::rgba(0.333, 0.333, 0.333, 1.0);

const DASH_PATTERN: [f64; 2] = [6.0, 4.0];
const DOT_PATTERN: [f64; 2] = [2.0, 3.0];

/// A resolved connector, ready to stroke.
#[derive(Debug, Clone, PartialEq)]
pub struct Connector {
    pub parent: NodeId,
    pub child: NodeId,
    pub kind: LineKind,
    pub path: BezPath,
    pub width: f64,
    /// Stroke dash pattern (`dash`, `gap`) for dashed and dotted lines.
    pub dash: Option<[f64; 2]>,
    pub color: Color,
}

impl Connector {
    /// SVG path data (`d` attribute).
    pub fn to_svg(&self) -> String {
        self.path.to_svg()
    }
}

/// Path between two anchor points for the given line kind.
///
/// - straight, dashed, dotted: a line.
/// - curved: one quadratic segment whose control point sits at the
///   horizontal midpoint, at the source's height.
/// - bezier: a cubic segment with both control points pulled in
///   horizontally by half the horizontal delta.
pub fn connector_path(kind: LineKind, from: Point, to: Point) -> BezPath {
    let mut path = BezPath::new();
    path.move_to(from);
    match kind {
        LineKind::Straight | LineKind::Dashed | LineKind::Dotted => path.line_to(to),
        LineKind::Curved => path.quad_to(Point::new((from.x + to.x) / 2.0, from.y), to),
        LineKind::Bezier => {
            let half = (to.x - from.x) / 2.0;
            path.curve_to(
                Point::new(from.x + half, from.y),
                Point::new(to.x - half, to.y),
                to,
            );
        }
    }
    path
}

pub fn dash_pattern(kind: LineKind) -> Option<[f64; 2]> {
    match kind {
        LineKind::Dashed => Some(DASH_PATTERN),
        LineKind::Dotted => Some(DOT_PATTERN),
        _ => None,
    }
}

fn anchor(store: &NodeStore, id: NodeId) -> Option<Point> {
    let node = store.get(id).filter(|n| n.is_placed())?;
    let (cx, cy) = node.bounds().center();
    Some(Point::new(f64::from(cx), f64::from(cy)))
}

/// Build the connector ending at `child`. `None` for the root, for
/// unknown ids, and while either end is still unplaced.
pub fn build_connector(store: &NodeStore, child: NodeId) -> Option<Connector> {
    let parent = store.parent_of(child)?;
    let from = anchor(store, parent)?;
    let to = anchor(store, child)?;
    let style = &store.get(child)?.style;
    let kind = style.line_kind();
    Some(Connector {
        parent,
        child,
        kind,
        path: connector_path(kind, from, to),
        width: style
            .line_width()
            .map_or(DEFAULT_LINE_WIDTH, f64::from),
        dash: dash_pattern(kind),
        color: style.line_color().unwrap_or(DEFAULT_LINE_COLOR),
    })
}

/// All connectors of a map, keyed by child id.
#[derive(Debug, Clone, Default)]
pub struct ConnectorSet {
    connectors: BTreeMap<NodeId, Connector>,
}

impl ConnectorSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Clear and rebuild every connector. Returns how many were built.
    pub fn rebuild(&mut self, store: &NodeStore) -> usize {
        self.connectors.clear();
        for id in store.pre_order() {
            if let Some(connector) = build_connector(store, id) {
                self.connectors.insert(id, connector);
            }
        }
        log::trace!("connectors rebuilt: {}", self.connectors.len());
        self.connectors.len()
    }

    /// Refresh only the connectors touching `ids`: the one to each node's
    /// parent and the ones to each node's children. Ids that no longer exist
    /// lose their connector.
    pub fn update_nodes(&mut self, store: &NodeStore, ids: impl IntoIterator<Item = NodeId>) {
        for id in ids {
            self.refresh(store, id);
            for child in store.children(id) {
                self.refresh(store, child);
            }
        }
    }

    fn refresh(&mut self, store: &NodeStore, id: NodeId) {
        match build_connector(store, id) {
            Some(connector) => {
                self.connectors.insert(id, connector);
            }
            None => {
                self.connectors.remove(&id);
            }
        }
    }

    pub fn get(&self, child: NodeId) -> Option<&Connector> {
        self.connectors.get(&child)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Connector> {
        self.connectors.values()
    }

    pub fn len(&self) -> usize {
        self.connectors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.connectors.is_empty()
    }
}

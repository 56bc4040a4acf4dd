//! Mind map → Vello drawing commands.
//!
//! Connectors are painted first, then node boxes in pre-order so children
//! sit above their parents. Node content (rendered markup) is drawn by the
//! host on top of the boxes.

use crate::connector::ConnectorSet;
use kurbo::{Affine, Cap, Join, Rect, RoundedRect, Stroke as KurboStroke};
use mm_core::{MindNode, NodeStore};
use peniko::{Color, Fill};
use vello::Scene;

/// Colors and metrics used when a node's style does not say otherwise.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PaintTheme {
    pub node_fill: mm_core::Color,
    pub node_border: mm_core::Color,
    pub highlight: mm_core::Color,
    pub corner_radius: f64,
    pub border_width: f64,
    pub highlight_width: f64,
}

impl Default for PaintTheme {
    fn default() -> Self {
        Self {
            node_fill: mm_core::Color::rgba(1.0, 1.0, 1.0, 1.0),
            node_border: mm_core::Color::from_rgba8(0xC8, 0xC8, 0xCC, 0xFF),
            highlight: mm_core::Color::from_rgba8(0x00, 0x7A, 0xFF, 0xFF),
            corner_radius: 6.0,
            border_width: 1.0,
            highlight_width: 2.5,
        }
    }
}

/// Paint the whole map to a Vello scene.
///
/// Call once per frame with a freshly-cleared `Scene`.
pub fn paint_scene(
    scene: &mut Scene,
    store: &NodeStore,
    connectors: &ConnectorSet,
    theme: &PaintTheme,
) {
    for connector in connectors.iter() {
        let mut stroke = KurboStroke::new(connector.width).with_caps(Cap::Round);
        if let Some(dash) = connector.dash {
            stroke = stroke.with_dashes(0.0, dash);
        }
        scene.stroke(
            &stroke,
            Affine::IDENTITY,
            to_peniko(connector.color),
            None,
            &connector.path,
        );
    }

    for id in store.pre_order() {
        if let Some(node) = store.get(id).filter(|n| n.is_placed()) {
            paint_node(scene, node, theme);
        }
    }
}

fn paint_node(scene: &mut Scene, node: &MindNode, theme: &PaintTheme) {
    let b = node.bounds();
    let shape: RoundedRect = Rect::new(
        f64::from(b.x),
        f64::from(b.y),
        f64::from(b.right()),
        f64::from(b.bottom()),
    )
    .to_rounded_rect(theme.corner_radius);

    let fill = node.style.background().unwrap_or(theme.node_fill);
    scene.fill(Fill::NonZero, Affine::IDENTITY, to_peniko(fill), None, &shape);

    let border = node.style.border_color().unwrap_or(theme.node_border);
    let border_stroke = KurboStroke::new(theme.border_width).with_join(Join::Round);
    scene.stroke(
        &border_stroke,
        Affine::IDENTITY,
        to_peniko(border),
        None,
        &shape,
    );

    if node.highlighted {
        let ring = shape.rect().inflate(2.0, 2.0).to_rounded_rect(theme.corner_radius + 2.0);
        scene.stroke(
            &KurboStroke::new(theme.highlight_width),
            Affine::IDENTITY,
            to_peniko(theme.highlight),
            None,
            &ring,
        );
    }

    log::trace!(
        "NODE {} at ({}, {}) {}x{}",
        node.id(),
        b.x,
        b.y,
        b.width,
        b.height
    );
}

fn to_peniko(c: mm_core::Color) -> Color {
    Color::new([
        c.r.clamp(0.0, 1.0),
        c.g.clamp(0.0, 1.0),
        c.b.clamp(0.0, 1.0),
        c.a.clamp(0.0, 1.0),
    ])
}

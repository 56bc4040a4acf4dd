//! Canvas2D software renderer.
//!
//! Draws connectors, node boxes and the marquee to an HTML `<canvas>` via
//! `CanvasRenderingContext2d`. Rendered markup is overlaid by the host;
//! the canvas only draws the first line of each topic as a placeholder.

use kurbo::{BezPath, PathEl};
use mm_core::{MindNode, NodeStore};
use mm_render::ConnectorSet;
use wasm_bindgen::JsValue;
use web_sys::CanvasRenderingContext2d;

/// Theme-dependent colors for the canvas renderer.
pub struct CanvasTheme {
    pub bg: &'static str,
    pub node_fill: &'static str,
    pub node_border: &'static str,
    pub text: &'static str,
    pub highlight: &'static str,
}

impl CanvasTheme {
    pub fn light() -> Self {
        Self {
            bg: "#F5F5F7",
            node_fill: "#FFFFFF",
            node_border: "#C8C8CC",
            text: "#1D1D1F",
            highlight: "#007AFF",
        }
    }

    pub fn dark() -> Self {
        Self {
            bg: "#1C1C1E",
            node_fill: "#2C2C2E",
            node_border: "#48484A",
            text: "#F5F5F7",
            highlight: "#0A84FF",
        }
    }
}

const CORNER_RADIUS: f64 = 6.0;
const TEXT_PADDING: f64 = 6.0;

/// Render the whole map to a Canvas2D context.
pub fn render_map(
    ctx: &CanvasRenderingContext2d,
    store: &NodeStore,
    connectors: &ConnectorSet,
    canvas_width: f64,
    canvas_height: f64,
    theme: &CanvasTheme,
    marquee_rect: Option<(f32, f32, f32, f32)>,
) {
    ctx.set_fill_style_str(theme.bg);
    ctx.fill_rect(0.0, 0.0, canvas_width, canvas_height);

    draw_connectors(ctx, connectors);

    // Pre-order: children above their parents.
    for id in store.pre_order() {
        if let Some(node) = store.get(id).filter(|n| n.is_placed()) {
            draw_node(ctx, node, theme);
        }
    }

    if let Some((rx, ry, rw, rh)) = marquee_rect {
        draw_marquee_rect(ctx, rx, ry, rw, rh);
    }
}

fn draw_connectors(ctx: &CanvasRenderingContext2d, connectors: &ConnectorSet) {
    ctx.save();
    ctx.set_line_cap("round");
    for connector in connectors.iter() {
        ctx.set_stroke_style_str(&connector.color.to_hex());
        ctx.set_line_width(connector.width);
        let dash = match connector.dash {
            Some([on, off]) => {
                js_sys::Array::of2(&JsValue::from_f64(on), &JsValue::from_f64(off))
            }
            None => js_sys::Array::new(),
        };
        let _ = ctx.set_line_dash(&dash);
        trace_path(ctx, &connector.path);
        ctx.stroke();
    }
    ctx.restore();
}

/// Replay a kurbo path onto the context as a fresh sub-path list.
fn trace_path(ctx: &CanvasRenderingContext2d, path: &BezPath) {
    ctx.begin_path();
    for el in path.elements() {
        match *el {
            PathEl::MoveTo(p) => ctx.move_to(p.x, p.y),
            PathEl::LineTo(p) => ctx.line_to(p.x, p.y),
            PathEl::QuadTo(c, p) => ctx.quadratic_curve_to(c.x, c.y, p.x, p.y),
            PathEl::CurveTo(c1, c2, p) => ctx.bezier_curve_to(c1.x, c1.y, c2.x, c2.y, p.x, p.y),
            PathEl::ClosePath => ctx.close_path(),
        }
    }
}

fn draw_node(ctx: &CanvasRenderingContext2d, node: &MindNode, theme: &CanvasTheme) {
    let b = node.bounds();
    let (x, y, w, h) = (
        f64::from(b.x),
        f64::from(b.y),
        f64::from(b.width),
        f64::from(b.height),
    );
    let fill = node.style.background().map(|c| c.to_hex());
    let border = node.style.border_color().map(|c| c.to_hex());

    ctx.save();
    rounded_rect_path(ctx, x, y, w, h, CORNER_RADIUS);
    ctx.set_fill_style_str(fill.as_deref().unwrap_or(theme.node_fill));
    ctx.fill();
    if node.highlighted {
        ctx.set_stroke_style_str(theme.highlight);
        ctx.set_line_width(2.5);
    } else {
        ctx.set_stroke_style_str(border.as_deref().unwrap_or(theme.node_border));
        ctx.set_line_width(1.0);
    }
    ctx.stroke();

    if let Some(label) = node.content.markdown().and_then(|m| m.lines().next()) {
        ctx.set_fill_style_str(theme.text);
        ctx.set_font("14px Inter, system-ui, sans-serif");
        ctx.set_text_align("center");
        ctx.set_text_baseline("middle");
        let max_width = (w - 2.0 * TEXT_PADDING).max(0.0);
        let _ = ctx.fill_text_with_max_width(label, x + w / 2.0, y + h / 2.0, max_width);
    }
    ctx.restore();
}

fn draw_marquee_rect(ctx: &CanvasRenderingContext2d, x: f32, y: f32, w: f32, h: f32) {
    let (x, y, w, h) = (x as f64, y as f64, w as f64, h as f64);
    if w < 1.0 && h < 1.0 {
        return;
    }

    ctx.save();
    ctx.set_fill_style_str("rgba(0, 122, 255, 0.08)");
    ctx.fill_rect(x, y, w, h);
    ctx.set_stroke_style_str("#007AFF");
    ctx.set_line_width(1.0);
    let _ = ctx.set_line_dash(&js_sys::Array::of2(
        &JsValue::from_f64(4.0),
        &JsValue::from_f64(4.0),
    ));
    ctx.stroke_rect(x, y, w, h);
    ctx.restore();
}

fn rounded_rect_path(ctx: &CanvasRenderingContext2d, x: f64, y: f64, w: f64, h: f64, r: f64) {
    let r = r.min(w / 2.0).min(h / 2.0);
    ctx.begin_path();
    ctx.move_to(x + r, y);
    ctx.line_to(x + w - r, y);
    ctx.arc_to(x + w, y, x + w, y + r, r).unwrap_or(());
    ctx.line_to(x + w, y + h - r);
    ctx.arc_to(x + w, y + h, x + w - r, y + h, r).unwrap_or(());
    ctx.line_to(x + r, y + h);
    ctx.arc_to(x, y + h, x, y + h - r, r).unwrap_or(());
    ctx.line_to(x, y + r);
    ctx.arc_to(x, y, x + r, y, r).unwrap_or(());
    ctx.close_path();
}

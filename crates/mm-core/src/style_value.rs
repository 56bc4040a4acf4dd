//! CSS-like value parsing for the free-form style maps.
//!
//! Built on `winnow` 0.7. Style maps store strings exactly as the host
//! wrote them; these parsers give the layout and connector code typed
//! views (`Color`, lengths) without ever rewriting the stored value.

use serde::{Deserialize, Serialize};
use winnow::ascii::{float, space0};
use winnow::combinator::{alt, delimited, opt, preceded, terminated};
use winnow::error::{ContextError, ErrMode};
use winnow::prelude::*;
use winnow::token::take_while;

/// RGBA color. Stored as 4 × f32 [0.0, 1.0].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Color {
    pub r: f32,
    pub g: f32,
    pub b: f32,
    pub a: f32,
}

impl Color {
    pub const BLACK: Color = Color::rgba(0.0, 0.0, 0.0, 1.0);

    pub const fn rgba(r: f32, g: f32, b: f32, a: f32) -> Self {
        Self { r, g, b, a }
    }

    pub fn from_rgba8(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self::rgba(
            f32::from(r) / 255.0,
            f32::from(g) / 255.0,
            f32::from(b) / 255.0,
            f32::from(a) / 255.0,
        )
    }

    /// Emit as shortest valid hex string (`#RRGGBB` when opaque).
    pub fn to_hex(&self) -> String {
        let to8 = |c: f32| (c.clamp(0.0, 1.0) * 255.0).round() as u8;
        let (r, g, b, a) = (to8(self.r), to8(self.g), to8(self.b), to8(self.a));
        if a == 255 {
            format!("#{r:02X}{g:02X}{b:02X}")
        } else {
            format!("#{r:02X}{g:02X}{b:02X}{a:02X}")
        }
    }
}

/// Parse a color value: `#RGB`, `#RGBA`, `#RRGGBB`, `#RRGGBBAA`,
/// `rgb(r, g, b)`, `rgba(r, g, b, a)` or a handful of CSS names.
pub fn parse_color(value: &str) -> Option<Color> {
    alt((hex_color, rgb_function, named_color))
        .parse(value.trim())
        .ok()
}

/// Parse a length in pixels: `2`, `2.5`, `2px`.
pub fn parse_length(value: &str) -> Option<f32> {
    terminated(float::<_, f32, ErrMode<ContextError>>, opt("px"))
        .parse(value.trim())
        .ok()
        .filter(|v| v.is_finite())
}

// ─── Low-level parsers ──────────────────────────────────────────────────

fn hex_val(c: u8) -> u8 {
    match c {
        b'0'..=b'9' => c - b'0',
        b'a'..=b'f' => c - b'a' + 10,
        _ => c - b'A' + 10,
    }
}

fn hex_color(input: &mut &str) -> ModalResult<Color> {
    let digits: &str =
        preceded('#', take_while(3..=8, |c: char| c.is_ascii_hexdigit())).parse_next(input)?;
    let b: Vec<u8> = digits.bytes().map(hex_val).collect();
    let short = |n: u8| n * 17;
    let long = |hi: u8, lo: u8| (hi << 4) | lo;
    match b.len() {
        3 => Ok(Color::from_rgba8(short(b[0]), short(b[1]), short(b[2]), 255)),
        4 => Ok(Color::from_rgba8(
            short(b[0]),
            short(b[1]),
            short(b[2]),
            short(b[3]),
        )),
        6 => Ok(Color::from_rgba8(
            long(b[0], b[1]),
            long(b[2], b[3]),
            long(b[4], b[5]),
            255,
        )),
        8 => Ok(Color::from_rgba8(
            long(b[0], b[1]),
            long(b[2], b[3]),
            long(b[4], b[5]),
            long(b[6], b[7]),
        )),
        _ => Err(ErrMode::Backtrack(ContextError::new())),
    }
}

fn channel(input: &mut &str) -> ModalResult<f32> {
    delimited(space0, float, space0).parse_next(input)
}

fn rgb_function(input: &mut &str) -> ModalResult<Color> {
    let _ = alt(("rgba", "rgb")).parse_next(input)?;
    let _ = '('.parse_next(input)?;
    let r = channel(input)?;
    let _ = ','.parse_next(input)?;
    let g = channel(input)?;
    let _ = ','.parse_next(input)?;
    let b = channel(input)?;
    let a = opt(preceded(',', channel)).parse_next(input)?;
    let _ = ')'.parse_next(input)?;
    let c = |v: f32| (v / 255.0).clamp(0.0, 1.0);
    Ok(Color::rgba(c(r), c(g), c(b), a.unwrap_or(1.0).clamp(0.0, 1.0)))
}

fn named_color(input: &mut &str) -> ModalResult<Color> {
    let name: &str = take_while(1.., |c: char| c.is_ascii_alphabetic()).parse_next(input)?;
    let color = match name.to_ascii_lowercase().as_str() {
        "black" => Color::BLACK,
        "white" => Color::rgba(1.0, 1.0, 1.0, 1.0),
        "red" => Color::from_rgba8(255, 0, 0, 255),
        "green" => Color::from_rgba8(0, 128, 0, 255),
        "blue" => Color::from_rgba8(0, 0, 255, 255),
        "gray" | "grey" => Color::from_rgba8(128, 128, 128, 255),
        "orange" => Color::from_rgba8(255, 165, 0, 255),
        "transparent" => Color::rgba(0.0, 0.0, 0.0, 0.0),
        _ => return Err(ErrMode::Backtrack(ContextError::new())),
    };
    Ok(color)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hex_forms() {
        assert_eq!(parse_color("#6C5CE7").unwrap().to_hex(), "#6C5CE7");
        assert_eq!(parse_color("#fff").unwrap().to_hex(), "#FFFFFF");
        let translucent = parse_color("#FF000080").unwrap();
        assert!((translucent.a - 128.0 / 255.0).abs() < 0.01);
        assert_eq!(translucent.to_hex().len(), 9);
    }

    #[test]
    fn rgb_functions() {
        assert_eq!(parse_color("rgb(255, 0, 0)").unwrap().to_hex(), "#FF0000");
        let c = parse_color("rgba(0,0,255,0.5)").unwrap();
        assert_eq!(c.b, 1.0);
        assert_eq!(c.a, 0.5);
    }

    #[test]
    fn names_and_garbage() {
        assert_eq!(parse_color(" Gray ").unwrap().to_hex(), "#808080");
        assert!(parse_color("#12").is_none());
        assert!(parse_color("rgb(1,2)").is_none());
        assert!(parse_color("chartreuse-ish").is_none());
    }

    #[test]
    fn lengths() {
        assert_eq!(parse_length("2"), Some(2.0));
        assert_eq!(parse_length("1.5px"), Some(1.5));
        assert_eq!(parse_length(" 3px "), Some(3.0));
        assert_eq!(parse_length("wide"), None);
    }
}

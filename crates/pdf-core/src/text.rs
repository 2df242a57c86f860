//! Text rendering utilities for the standard Helvetica faces

use crate::document::Color;
use crate::Align;

/// Standard (non-embedded) fonts used for generated pages
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StandardFont {
    Helvetica,
    HelveticaBold,
}

impl StandardFont {
    /// PostScript base font name
    pub fn base_font(self) -> &'static str {
        match self {
            StandardFont::Helvetica => "Helvetica",
            StandardFont::HelveticaBold => "Helvetica-Bold",
        }
    }

    /// Font resource name used in content streams
    pub fn resource_name(self) -> &'static str {
        match self {
            StandardFont::Helvetica => "F1",
            StandardFont::HelveticaBold => "F2",
        }
    }

    fn widths(self) -> &'static [u16; 95] {
        match self {
            StandardFont::Helvetica => &HELVETICA_WIDTHS,
            StandardFont::HelveticaBold => &HELVETICA_BOLD_WIDTHS,
        }
    }
}

/// Glyph widths (1/1000 em) for printable ASCII 0x20..=0x7E
const HELVETICA_WIDTHS: [u16; 95] = [
    278, 278, 355, 556, 556, 889, 667, 191, 333, 333, 389, 584, 278, 333, 278, 278, // 0x20
    556, 556, 556, 556, 556, 556, 556, 556, 556, 556, 278, 278, 584, 584, 584, 556, // 0x30
    1015, 667, 667, 722, 722, 667, 611, 778, 722, 278, 500, 667, 556, 833, 722, 778, // 0x40
    667, 778, 722, 667, 611, 722, 667, 944, 667, 667, 611, 278, 278, 278, 469, 556, // 0x50
    333, 556, 556, 500, 556, 556, 278, 556, 556, 222, 222, 500, 222, 833, 556, 556, // 0x60
    556, 556, 333, 500, 278, 556, 500, 722, 500, 500, 500, 334, 260, 334, 584, // 0x70
];

const HELVETICA_BOLD_WIDTHS: [u16; 95] = [
    278, 333, 474, 556, 556, 889, 722, 238, 333, 333, 389, 584, 278, 333, 278, 278, // 0x20
    556, 556, 556, 556, 556, 556, 556, 556, 556, 556, 333, 333, 584, 584, 584, 611, // 0x30
    975, 722, 722, 722, 722, 667, 611, 778, 722, 278, 556, 722, 611, 833, 722, 778, // 0x40
    667, 778, 722, 667, 611, 722, 667, 944, 667, 667, 611, 333, 278, 333, 584, 556, // 0x50
    333, 556, 611, 556, 611, 556, 333, 611, 611, 278, 278, 556, 278, 889, 611, 611, // 0x60
    611, 611, 389, 556, 333, 611, 556, 778, 556, 556, 500, 389, 280, 389, 584, // 0x70
];

/// Width used for characters outside printable ASCII
const FALLBACK_WIDTH: u16 = 556;

/// Context for rendering text
pub struct TextRenderContext {
    /// PDF font resource name (e.g., "F1")
    pub font_name: String,
    /// Font size in points
    pub font_size: f32,
    /// Text width in points (for alignment)
    pub text_width: f64,
    /// Text color (RGB)
    pub color: Color,
}

/// Encode text as WinAnsiEncoding bytes
///
/// Latin-1 characters map directly, a handful of common typographic
/// characters map to their Windows-1252 slots, control characters become
/// spaces and everything else becomes `?`.
pub fn encode_win_ansi(text: &str) -> Vec<u8> {
    text.chars()
        .map(|ch| match ch {
            '\u{20}'..='\u{7E}' => ch as u8,
            '\u{A0}'..='\u{FF}' => ch as u32 as u8,
            '\u{20AC}' => 0x80,
            '\u{2026}' => 0x85,
            '\u{2018}' => 0x91,
            '\u{2019}' => 0x92,
            '\u{201C}' => 0x93,
            '\u{201D}' => 0x94,
            '\u{2022}' => 0x95,
            '\u{2013}' => 0x96,
            '\u{2014}' => 0x97,
            c if c.is_control() => b' ',
            _ => b'?',
        })
        .collect()
}

/// Width of text in points for a standard font at the given size
pub fn text_width(text: &str, font: StandardFont, font_size: f32) -> f64 {
    let widths = font.widths();
    let units: u32 = encode_win_ansi(text)
        .into_iter()
        .map(|byte| match byte {
            0x20..=0x7E => widths[(byte - 0x20) as usize] as u32,
            _ => FALLBACK_WIDTH as u32,
        })
        .sum();
    units as f64 * font_size as f64 / 1000.0
}

/// Truncate text so that it fits in `max_width` points
///
/// Truncated text ends with `...`. Returns an empty string when not even
/// the ellipsis fits.
pub fn fit_text(text: &str, font: StandardFont, font_size: f32, max_width: f64) -> String {
    if text_width(text, font, font_size) <= max_width {
        return text.to_string();
    }

    let ellipsis_width = text_width("...", font, font_size);
    if ellipsis_width > max_width {
        return String::new();
    }

    let mut fitted = String::new();
    let mut width = ellipsis_width;
    for ch in text.chars() {
        let mut buf = [0u8; 4];
        let ch_width = text_width(ch.encode_utf8(&mut buf), font, font_size);
        if width + ch_width > max_width {
            break;
        }
        width += ch_width;
        fitted.push(ch);
    }
    fitted.push_str("...");
    fitted
}

/// Hex string operand (e.g., "<48656C6C6F>") for WinAnsi-encoded text
pub fn to_hex_operand(text: &str) -> String {
    let mut hex = String::from("<");
    for byte in encode_win_ansi(text) {
        hex.push_str(&format!("{byte:02X}"));
    }
    hex.push('>');
    hex
}

/// Generate PDF operators for text insertion
///
/// Creates the proper PDF text operators (BT, Tf, Td, Tj, ET) to render text
/// at a specific position with alignment support.
///
/// # Arguments
/// * `text_hex` - Hex-encoded text (e.g., "<414243>")
/// * `x` - X coordinate in points (PDF coordinates, from left)
/// * `y` - Y coordinate in points (PDF coordinates, from bottom)
/// * `align` - Text alignment relative to `x`
/// * `ctx` - Text rendering context
///
/// # Returns
/// Vector of bytes containing the PDF operators
pub fn generate_text_operators(
    text_hex: &str,
    x: f64,
    y: f64,
    align: Align,
    ctx: &TextRenderContext,
) -> Vec<u8> {
    let mut ops = String::new();

    let x_offset = match align {
        Align::Left => 0.0,
        Align::Center => -ctx.text_width / 2.0,
        Align::Right => -ctx.text_width,
    };

    let final_x = x + x_offset;

    ops.push_str("BT\n");

    // Non-stroking color for glyph fill
    ops.push_str(&format!(
        "{} {} {} rg\n",
        ctx.color.r, ctx.color.g, ctx.color.b
    ));

    ops.push_str(&format!("/{} {} Tf\n", ctx.font_name, ctx.font_size));
    ops.push_str(&format!("{final_x:.2} {y:.2} Td\n"));
    ops.push_str(&format!("{text_hex} Tj\n"));
    ops.push_str("ET\n");

    ops.into_bytes()
}

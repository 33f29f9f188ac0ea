//! Series Color Palette
//!
//! Fixed palette for entities that do not supply an explicit color.
//! Colors are assigned by registration order and cycle when exhausted.
//! Each entry pairs a muted variant with the strong line color; the band
//! fill is derived from the line color at reduced opacity.

/// Palette entries as `(muted, strong)` hex pairs.
///
/// The strong color is used for the center line; the muted variant is kept
/// for renderers that want a pre-lightened tone instead of an alpha fill.
const PALETTE: &[(&str, &str)] = &[
    ("#F4A6A6", "#D32F2F"),
    ("#F7C59F", "#F57C00"),
    ("#FBE8A6", "#FFB300"),
    ("#FFF7AE", "#FBC02D"),
    ("#B2D8B2", "#388E3C"),
    ("#A8DAD3", "#00897B"),
    ("#B2EBF2", "#00ACC1"),
    ("#A6C8FF", "#1976D2"),
    ("#C5CAE9", "#303F9F"),
    ("#D1C4E9", "#7B1FA2"),
    ("#F8BBD0", "#C2185B"),
    ("#D7CCC8", "#795548"),
    ("#E0E0E0", "#616161"),
];

/// Get the line color for a registration index, cycling through the palette.
#[must_use]
pub fn line_color(index: usize) -> &'static str {
    PALETTE[index % PALETTE.len()].1
}

/// Derive a translucent band-fill color from a `#RRGGBB` line color.
///
/// Returns an `rgba(r, g, b, 0.3)` string. Colors that do not parse as
/// six-digit hex are passed through unchanged so an unexpected token from
/// upstream never breaks the render pipeline.
#[must_use]
pub fn band_fill(color: &str) -> String {
    parse_hex(color).map_or_else(
        || color.to_string(),
        |(r, g, b)| format!("rgba({r}, {g}, {b}, 0.3)"),
    )
}

/// Parse a `#RRGGBB` string into its components.
fn parse_hex(color: &str) -> Option<(u8, u8, u8)> {
    let hex = color.strip_prefix('#')?;
    if hex.len() != 6 || !hex.is_ascii() {
        return None;
    }
    let r = u8::from_str_radix(&hex[0..2], 16).ok()?;
    let g = u8::from_str_radix(&hex[2..4], 16).ok()?;
    let b = u8::from_str_radix(&hex[4..6], 16).ok()?;
    Some((r, g, b))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn line_color_cycles() {
        assert_eq!(line_color(0), "#D32F2F");
        assert_eq!(line_color(1), "#F57C00");
        assert_eq!(line_color(PALETTE.len()), "#D32F2F");
        assert_eq!(line_color(PALETTE.len() + 1), "#F57C00");
    }

    #[test]
    fn band_fill_from_hex() {
        assert_eq!(band_fill("#D32F2F"), "rgba(211, 47, 47, 0.3)");
        assert_eq!(band_fill("#00ACC1"), "rgba(0, 172, 193, 0.3)");
    }

    #[test]
    fn band_fill_passes_through_unparseable() {
        assert_eq!(band_fill("teal"), "teal");
        assert_eq!(band_fill("#FFF"), "#FFF");
        assert_eq!(band_fill(""), "");
    }
}

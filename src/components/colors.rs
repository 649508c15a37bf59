use crate::canvas::Pixel;

/// Parse `#rgb`, `#rrggbb` or `#rrggbbaa` (leading `#` optional).
///
/// An alpha byte of `00` yields `Transparent`; any other alpha is dropped and
/// the color is opaque.
pub fn parse_hex(text: &str) -> Option<Pixel> {
    let hex = text.trim();
    let hex = hex.strip_prefix('#').unwrap_or(hex);
    if !hex.chars().all(|c| c.is_ascii_hexdigit()) {
        return None;
    }

    match hex.len() {
        3 => {
            let value = u32::from_str_radix(hex, 16).ok()?;
            let expand = |nibble: u32| ((nibble & 0xF) * 0x11) as u8;
            Some(Pixel::rgb(
                expand(value >> 8),
                expand(value >> 4),
                expand(value),
            ))
        }
        6 => u32::from_str_radix(hex, 16).ok().map(Pixel::from_rgb),
        8 => {
            let value = u32::from_str_radix(hex, 16).ok()?;
            if value & 0xFF == 0 {
                Some(Pixel::Transparent)
            } else {
                Some(Pixel::from_rgb(value >> 8))
            }
        }
        _ => None,
    }
}

/// `#rrggbb` for colors, `rgba(0,0,0,0)` for both sentinels.
pub fn to_css(pixel: Pixel) -> String {
    match pixel.channels() {
        Some([r, g, b]) => format!("#{:02x}{:02x}{:02x}", r, g, b),
        _ => "rgba(0,0,0,0)".to_string(),
    }
}

//! The fixed 9-entry color-override table.
//!
//! Grounded on `original_source/pkg/text/color.go`. Colors 1..=8 pair with
//! the color-code letters in [`crate::core::color_code`] (`r g b y R G B Y`);
//! color 0 means "don't override anything" and is never looked up directly
//! by a [`crate::core::line::Run`] (see that module's invariants).

/// A 24-bit RGB color, used only for the palette overrides. Not a general
/// rendering type — terminal/GTK consumers map these down to their own
/// color representations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Color {
    const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }
}

pub const WHITE: Color = Color::rgb(255, 255, 255);
pub const BLACK: Color = Color::rgb(0, 0, 0);

/// Foreground/background override for one palette entry. A `None` field
/// means "leave the underlying syntax color alone" for that channel.
#[derive(Debug, Clone, Copy)]
pub struct ColorInfo {
    pub fg: Option<Color>,
    pub bg: Option<Color>,
}

const fn bg_only(bg: Color) -> ColorInfo {
    ColorInfo {
        fg: None,
        bg: Some(bg),
    }
}

const fn fg_bg(fg: Color, bg: Color) -> ColorInfo {
    ColorInfo {
        fg: Some(fg),
        bg: Some(bg),
    }
}

/// Indexed by run color (0..=8). Entry 0 overrides nothing.
pub const PALETTE: [ColorInfo; 9] = [
    ColorInfo { fg: None, bg: None },
    bg_only(Color::rgb(170, 0, 0)),
    bg_only(Color::rgb(0, 170, 0)),
    bg_only(Color::rgb(0, 50, 170)),
    bg_only(Color::rgb(170, 150, 0)),
    fg_bg(WHITE, Color::rgb(240, 0, 0)),
    fg_bg(WHITE, Color::rgb(0, 230, 0)),
    fg_bg(WHITE, Color::rgb(0, 200, 255)),
    fg_bg(BLACK, Color::rgb(240, 230, 0)),
];

/// Look up the override for a run color. `color` is expected to be `0..=8`;
/// anything else falls back to the no-override entry.
pub fn lookup(color: u8) -> ColorInfo {
    PALETTE.get(color as usize).copied().unwrap_or(PALETTE[0])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn entry_zero_overrides_nothing() {
        let info = lookup(0);
        assert_eq!(info.fg, None);
        assert_eq!(info.bg, None);
    }

    #[test]
    fn entry_one_is_dark_red_background_only() {
        let info = lookup(1);
        assert_eq!(info.fg, None);
        assert_eq!(info.bg, Some(Color::rgb(170, 0, 0)));
    }

    #[test]
    fn entry_five_has_white_foreground() {
        let info = lookup(5);
        assert_eq!(info.fg, Some(WHITE));
        assert_eq!(info.bg, Some(Color::rgb(240, 0, 0)));
    }

    #[test]
    fn entry_eight_has_black_foreground() {
        let info = lookup(8);
        assert_eq!(info.fg, Some(BLACK));
    }

    #[test]
    fn out_of_range_falls_back_to_zero() {
        assert_eq!(lookup(9).fg, None);
        assert_eq!(lookup(9).bg, None);
    }
}

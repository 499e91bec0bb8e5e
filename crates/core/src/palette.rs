//! Reserved background colors for notes authored by this tool.
//!
//! A note whose background is one of the [`MagicColor`]s and whose parent
//! is an image marks that image as already annotated. This is what lets a
//! restarted process skip images it labelled in a previous run. The colors
//! are reserved: a user who paints their own note on an image with one of
//! them will suppress annotation of that image.

/// The reserved palette, in rotation order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MagicColor {
    Lime,
    Sky,
    Apricot,
    Lilac,
}

impl MagicColor {
    pub const ALL: [MagicColor; 4] = [Self::Lime, Self::Sky, Self::Apricot, Self::Lilac];

    /// Lowercase `#rrggbb` value sent to the canvas.
    pub fn hex(&self) -> &'static str {
        match self {
            Self::Lime => "#99ff33",
            Self::Sky => "#66e0ff",
            Self::Apricot => "#ffb366",
            Self::Lilac => "#d9b3ff",
        }
    }

    /// Match a canvas color value against the palette, ignoring case and
    /// surrounding whitespace.
    pub fn from_hex(value: &str) -> Option<Self> {
        let value = value.trim();
        Self::ALL
            .into_iter()
            .find(|color| color.hex().eq_ignore_ascii_case(value))
    }
}

/// Round-robin cursor over [`MagicColor::ALL`].
///
/// Advances on every call and wraps; the color carries no meaning beyond
/// membership in the palette.
#[derive(Debug, Default)]
pub struct ColorRotation {
    next: usize,
}

impl ColorRotation {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn next_color(&mut self) -> MagicColor {
        let color = MagicColor::ALL[self.next % MagicColor::ALL.len()];
        self.next = (self.next + 1) % MagicColor::ALL.len();
        color
    }
}

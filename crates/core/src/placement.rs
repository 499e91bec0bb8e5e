//! Note geometry relative to the annotated image.
//!
//! Notes are a fixed [`NOTE_SIDE`] square scaled down in proportion to the
//! image height, anchored near the image's bottom-right corner.

use serde::Serialize;

use crate::types::WidgetSize;

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

/// Unscaled side length of a note, in canvas units.
pub const NOTE_SIDE: f64 = 300.0;

/// Image height divided by this gives the rendered note side.
pub const HEIGHT_DIVISOR: f64 = 4.5;

/// Vertical offset of the note, in unscaled note sides.
pub const VERTICAL_OFFSET_FACTOR: f64 = 1.33;

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct NoteSize {
    pub width: f64,
    pub height: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct NoteLocation {
    pub x: f64,
    pub y: f64,
}

/// Size, position and scale of a note attached to an image.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NotePlacement {
    pub size: NoteSize,
    pub location: NoteLocation,
    pub scale: f64,
}

impl NotePlacement {
    /// Compute the placement for a note on an image of the given size.
    ///
    /// A coordinate that would be negative falls back to the image's own
    /// extent on that axis.
    pub fn for_image(image: &WidgetSize) -> Self {
        let scale = (image.height / HEIGHT_DIVISOR) / NOTE_SIDE;

        let x = image.width - (NOTE_SIDE / 2.0) * scale;
        let y = image.height - (NOTE_SIDE * VERTICAL_OFFSET_FACTOR) * scale;

        Self {
            size: NoteSize {
                width: NOTE_SIDE,
                height: NOTE_SIDE,
            },
            location: NoteLocation {
                x: if x < 0.0 { image.width } else { x },
                y: if y < 0.0 { image.height } else { y },
            },
            scale,
        }
    }
}

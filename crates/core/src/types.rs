//! Wire types shared by the canvas client and the annotation pipeline.
//!
//! [`WidgetUpdate`] is what the subscribe feed pushes, [`ExistingNote`] is
//! what the notes listing returns, and [`NewNote`] is the body posted to
//! create an annotation.

use serde::{Deserialize, Deserializer, Serialize};

use crate::error::CoreError;
use crate::palette::MagicColor;
use crate::placement::{NoteLocation, NotePlacement, NoteSize};

/// Widget type of the only widgets this tool cares about.
pub const IMAGE_WIDGET_TYPE: &str = "Image";

/// Stacking depth of every published note.
pub const NOTE_DEPTH: u32 = 1;

// ---------------------------------------------------------------------------
// Feed records
// ---------------------------------------------------------------------------

/// Width and height of a widget in canvas units.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct WidgetSize {
    #[serde(default, deserialize_with = "null_as_default")]
    pub height: f64,
    #[serde(default, deserialize_with = "null_as_default")]
    pub width: f64,
}

/// One entry of a subscribe feed record.
///
/// Fields the server omits or sends as `null` decode as empty strings or
/// zero sizes so that the reconciliation rules, not the decoder, decide
/// what to ignore.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(from = "WireWidgetUpdate")]
pub struct WidgetUpdate {
    pub id: String,
    pub widget_type: String,
    pub state: String,
    /// Empty until the server has finished processing the uploaded bytes.
    pub content_hash: String,
    pub size: WidgetSize,
}

/// Feed entry as sent. Older servers name the hash `hash`; some send both
/// keys, in which case a non-empty `content_hash` wins.
#[derive(Deserialize)]
struct WireWidgetUpdate {
    #[serde(default, deserialize_with = "null_as_default")]
    id: String,
    #[serde(default, deserialize_with = "null_as_default")]
    widget_type: String,
    #[serde(default, deserialize_with = "null_as_default")]
    state: String,
    #[serde(default)]
    content_hash: Option<String>,
    #[serde(default)]
    hash: Option<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    size: WidgetSize,
}

impl From<WireWidgetUpdate> for WidgetUpdate {
    fn from(wire: WireWidgetUpdate) -> Self {
        let content_hash = wire
            .content_hash
            .filter(|h| !h.is_empty())
            .or(wire.hash)
            .unwrap_or_default();
        Self {
            id: wire.id,
            widget_type: wire.widget_type,
            state: wire.state,
            content_hash,
            size: wire.size,
        }
    }
}

/// Lifecycle states of a widget that reconciliation acts on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WidgetState {
    Normal,
    Deleted,
}

impl WidgetState {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Normal => "normal",
            Self::Deleted => "deleted",
        }
    }

    pub fn parse(s: &str) -> Result<Self, CoreError> {
        match s {
            "normal" => Ok(Self::Normal),
            "deleted" => Ok(Self::Deleted),
            other => Err(CoreError::UnexpectedState(other.to_string())),
        }
    }
}

impl WidgetUpdate {
    /// Check that this update describes an image with a known state.
    ///
    /// Returns the parsed state, or the reason the update must be ignored.
    pub fn validate(&self) -> Result<WidgetState, CoreError> {
        if self.widget_type != IMAGE_WIDGET_TYPE {
            return Err(CoreError::UnexpectedWidgetType(self.widget_type.clone()));
        }
        if self.id.is_empty() {
            return Err(CoreError::EmptyWidgetId);
        }
        WidgetState::parse(&self.state)
    }

    pub fn has_content(&self) -> bool {
        !self.content_hash.is_empty()
    }

    pub fn snapshot(&self) -> ImageSnapshot {
        ImageSnapshot {
            id: self.id.clone(),
            size: self.size,
        }
    }
}

/// The parts of an image the annotation stages need once it leaves the
/// reconciliation store.
#[derive(Debug, Clone, PartialEq)]
pub struct ImageSnapshot {
    pub id: String,
    pub size: WidgetSize,
}

// ---------------------------------------------------------------------------
// Notes
// ---------------------------------------------------------------------------

/// A note already present on the canvas. Read-only.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct ExistingNote {
    #[serde(default, deserialize_with = "null_as_default")]
    pub id: String,
    #[serde(default)]
    pub parent_id: Option<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub state: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub text: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub background_color: String,
}

impl ExistingNote {
    /// Whether this note is an annotation this tool attached to `image_id`.
    ///
    /// Only notes carrying one of the reserved [`MagicColor`]s count; a
    /// user-authored note on the same image does not.
    pub fn annotates(&self, image_id: &str) -> bool {
        self.parent_id.as_deref() == Some(image_id)
            && MagicColor::from_hex(&self.background_color).is_some()
    }
}

/// Body of `POST /canvases/{id}/notes`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NewNote {
    pub parent_id: String,
    pub text: String,
    pub depth: u32,
    pub background_color: String,
    pub size: NoteSize,
    pub location: NoteLocation,
    pub scale: f64,
}

impl NewNote {
    /// Build the note that annotates `image` with `text`, placed near the
    /// image's bottom-right corner.
    pub fn for_image(image: &ImageSnapshot, text: impl Into<String>, color: MagicColor) -> Self {
        let placement = NotePlacement::for_image(&image.size);
        Self {
            parent_id: image.id.clone(),
            text: text.into(),
            depth: NOTE_DEPTH,
            background_color: color.hex().to_string(),
            size: placement.size,
            location: placement.location,
            scale: placement.scale,
        }
    }
}

fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de> + Default,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

//! Serializable card drafts.
//!
//! A [`CardDraft`] captures the text fields, background and export settings in
//! a JSON-friendly format so a card can be described in a file and exported
//! without typing every field on the command line.
//!
//! # Example
//!
//! ```
//! use preety_post::{Background, CardDraft, CompositionStore, Configurable};
//!
//! let draft = CardDraft::from_json(
//!     r#"{ "displayName": "Ada", "handle": "ada", "body": "Hello", "background": "sunset" }"#,
//! ).unwrap();
//!
//! let mut store = CompositionStore::new();
//! store.apply_draft(&draft);
//! assert_eq!(store.state().background(), Background::Sunset);
//! ```

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::background::Background;
use crate::export::ExportSettings;
use crate::state::CompositionStore;

// ============================================================================
// Configurable Trait
// ============================================================================

/// Types that can be configured from a [`CardDraft`].
pub trait Configurable {
    /// Applies a draft's text fields and background.
    ///
    /// The draft's picture path is not read here; loading it is asynchronous
    /// and goes through [`CompositionStore::upload_profile_image`].
    fn apply_draft(&mut self, draft: &CardDraft);

    /// Exports the current text fields and background as a draft.
    fn export_draft(&self) -> CardDraft;
}

// ============================================================================
// CardDraft
// ============================================================================

/// A serializable description of a card.
///
/// # JSON Format
///
/// ```json
/// {
///   "displayName": "Ada Lovelace",
///   "handle": "ada",
///   "body": "Hello world",
///   "background": "emerald-cyan",
///   "profileImage": "avatar.png",
///   "export": { "scale": 3.0, "fileName": "preety-post.png" }
/// }
/// ```
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[cfg_attr(feature = "jsonschema", derive(schemars::JsonSchema))]
#[serde(rename_all = "camelCase", default)]
pub struct CardDraft {
    pub display_name: String,
    /// Handle without the leading `@`.
    pub handle: String,
    pub body: String,
    pub background: Background,

    /// Path of a picture to load into the card.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub profile_image: Option<PathBuf>,

    /// Scale, file name and backing used when exporting.
    pub export: ExportSettings,
}

impl CardDraft {
    /// Creates an empty draft with default settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the display name.
    pub fn with_display_name(mut self, name: impl Into<String>) -> Self {
        self.display_name = name.into();
        self
    }

    /// Sets the handle.
    pub fn with_handle(mut self, handle: impl Into<String>) -> Self {
        self.handle = handle.into();
        self
    }

    /// Sets the post text.
    pub fn with_body(mut self, body: impl Into<String>) -> Self {
        self.body = body.into();
        self
    }

    /// Sets the background.
    pub fn with_background(mut self, background: Background) -> Self {
        self.background = background;
        self
    }

    /// Serializes the draft to a JSON string.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Serializes the draft to a pretty-printed JSON string.
    pub fn to_json_pretty(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Deserializes a draft from a JSON string.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }
}

impl Configurable for CompositionStore {
    fn apply_draft(&mut self, draft: &CardDraft) {
        self.set_display_name(draft.display_name.clone());
        self.set_handle(draft.handle.clone());
        self.set_body(draft.body.clone());
        self.set_background(draft.background);
    }

    fn export_draft(&self) -> CardDraft {
        let state = self.state();
        CardDraft {
            display_name: state.display_name().to_string(),
            handle: state.handle().to_string(),
            body: state.body().to_string(),
            background: state.background(),
            profile_image: None,
            export: ExportSettings::default(),
        }
    }
}

// ============================================================================
// Tests
// ============================================================================

//! The composition state and its owning store.

use std::fmt;
use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};

use tracing::{debug, trace};

use crate::background::Background;
use crate::error::Result;
use crate::profile_image::{ProfileImage, read_profile_image};
use crate::render::{RenderedCard, render_card};

// ============================================================================
// CompositionState
// ============================================================================

/// Everything the user has entered for the card.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CompositionState {
    display_name: String,
    handle: String,
    body: String,
    profile_image: Option<ProfileImage>,
    background: Background,
}

impl CompositionState {
    /// Creates a state with empty text and the default background.
    pub fn new() -> Self {
        Self::default()
    }

    /// The display name as typed.
    pub fn display_name(&self) -> &str {
        &self.display_name
    }

    /// The handle without the leading `@`.
    pub fn handle(&self) -> &str {
        &self.handle
    }

    /// The post text, line breaks included.
    pub fn body(&self) -> &str {
        &self.body
    }

    /// The loaded picture, if any.
    pub fn profile_image(&self) -> Option<&ProfileImage> {
        self.profile_image.as_ref()
    }

    /// The selected gradient.
    pub fn background(&self) -> Background {
        self.background
    }

    /// Returns true if both required fields contain non-whitespace text.
    pub fn is_complete(&self) -> bool {
        !self.display_name.trim().is_empty() && !self.body.trim().is_empty()
    }
}

// ============================================================================
// CompositionStore
// ============================================================================

type Listener = Box<dyn FnMut(&CompositionState)>;

static NEXT_STORE_ID: AtomicU64 = AtomicU64::new(0);

/// Single owner of the [`CompositionState`].
///
/// Every setter is total. Each mutation increments [`version`](Self::version)
/// and notifies every subscribed listener so dependent views can re-render.
pub struct CompositionStore {
    id: u64,
    state: CompositionState,
    version: u64,
    listeners: Vec<Listener>,
}

impl Default for CompositionStore {
    fn default() -> Self {
        Self {
            id: NEXT_STORE_ID.fetch_add(1, Ordering::Relaxed),
            state: CompositionState::default(),
            version: 0,
            listeners: Vec::new(),
        }
    }
}

impl CompositionStore {
    /// Creates a store holding a fresh state.
    pub fn new() -> Self {
        Self::default()
    }

    /// Identifies this store among all stores created by the process.
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Returns the current state.
    pub fn state(&self) -> &CompositionState {
        &self.state
    }

    /// Returns the current version number.
    pub fn version(&self) -> u64 {
        self.version
    }

    /// Registers a listener called after every mutation.
    pub fn subscribe(&mut self, listener: impl FnMut(&CompositionState) + 'static) {
        self.listeners.push(Box::new(listener));
    }

    /// Replaces the display name.
    pub fn set_display_name(&mut self, name: impl Into<String>) {
        self.state.display_name = name.into();
        self.changed("display_name");
    }

    /// Replaces the handle.
    pub fn set_handle(&mut self, handle: impl Into<String>) {
        self.state.handle = handle.into();
        self.changed("handle");
    }

    /// Replaces the post text.
    pub fn set_body(&mut self, body: impl Into<String>) {
        self.state.body = body.into();
        self.changed("body");
    }

    /// Replaces the picture.
    pub fn set_profile_image(&mut self, image: ProfileImage) {
        self.state.profile_image = Some(image);
        self.changed("profile_image");
    }

    /// Removes the picture, bringing back the initial glyph.
    pub fn clear_profile_image(&mut self) {
        self.state.profile_image = None;
        self.changed("profile_image");
    }

    /// Selects a background.
    pub fn set_background(&mut self, background: Background) {
        self.state.background = background;
        self.changed("background");
    }

    /// Replaces the background with a uniformly random palette entry.
    ///
    /// The new value may equal the old one.
    pub fn randomize_background(&mut self) -> Background {
        let background = Background::random();
        self.set_background(background);
        background
    }

    /// Loads the picture at `file` into the state.
    ///
    /// `None` means nothing was selected and leaves the state untouched. On a
    /// read or decode failure the previous picture is kept and the error is
    /// returned. When several uploads are awaited in turn, the last one wins.
    pub async fn upload_profile_image(&mut self, file: Option<&Path>) -> Result<()> {
        let Some(path) = file else {
            trace!("no file selected");
            return Ok(());
        };
        let image = read_profile_image(path).await?;
        self.set_profile_image(image);
        Ok(())
    }

    fn changed(&mut self, field: &'static str) {
        self.version = self.version.wrapping_add(1);
        debug!(field, version = self.version, "composition changed");
        for listener in &mut self.listeners {
            listener(&self.state);
        }
    }
}

impl fmt::Debug for CompositionStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CompositionStore")
            .field("id", &self.id)
            .field("state", &self.state)
            .field("version", &self.version)
            .field("listeners", &self.listeners.len())
            .finish()
    }
}

// ============================================================================
// LivePreview
// ============================================================================

/// Keeps the most recent [`RenderedCard`] for a store.
///
/// The card is re-rendered only when the store or its version differs from
/// the last call.
#[derive(Debug, Default)]
pub struct LivePreview {
    cached: Option<(u64, u64, RenderedCard)>,
}

impl LivePreview {
    /// Creates an empty preview.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the card for the store's current state.
    pub fn card(&mut self, store: &CompositionStore) -> &RenderedCard {
        let key = (store.id(), store.version());
        if !matches!(&self.cached, Some((id, version, _)) if (*id, *version) == key) {
            self.cached = None;
        }
        &self
            .cached
            .get_or_insert_with(|| (key.0, key.1, render_card(store.state())))
            .2
    }

    /// Drops the cached card.
    pub fn invalidate(&mut self) {
        self.cached = None;
    }
}

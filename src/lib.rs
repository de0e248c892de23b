//! preety-post: compose a social post card and export it as a PNG.
//!
//! The crate is split along the path a card takes:
//!
//! - [`CompositionStore`] owns the user's fields and background.
//! - [`render_card`] / [`render_view`] project that state into SVG, wrapping
//!   text with a [`TextMeasure`].
//! - [`ExportPipeline`] locates the card, rasterizes it through a
//!   [`Rasterizer`], encodes a PNG and hands it to a [`Downloader`].
//!
//! # Example
//!
//! ```no_run
//! use preety_post::{
//!     CompositionStore, DirectoryDownloader, ExportOutcome, ExportPipeline, LogNotifier,
//!     ResvgRasterizer,
//! };
//!
//! # async fn run() -> preety_post::Result<()> {
//! let mut store = CompositionStore::new();
//! store.set_display_name("Ada");
//! store.set_handle("ada");
//! store.set_body("Hello world");
//! store.randomize_background();
//!
//! let pipeline = ExportPipeline::new(
//!     ResvgRasterizer::new(),
//!     DirectoryDownloader::new("."),
//!     LogNotifier,
//! );
//! if let ExportOutcome::Downloaded(path) = pipeline.export(store.state()).await? {
//!     println!("saved {}", path.display());
//! }
//! # Ok(())
//! # }
//! ```

mod background;
mod draft;
mod error;
mod export;
mod profile_image;
mod raster;
mod render;
mod state;
mod text;

pub use background::{Background, GradientDirection};
pub use draft::{CardDraft, Configurable};
pub use error::{Error, Result};
pub use export::{
    DEFAULT_FILE_NAME, DirectoryDownloader, Downloader, ExportOutcome, ExportPipeline,
    ExportSettings, LogNotifier, Notice, NoticeKind, Notifier, can_export,
};
pub use profile_image::{ProfileImage, read_profile_image};
pub use raster::{
    BackingFill, DEFAULT_SCALE, RasterOptions, Rasterizer, ResvgRasterizer, encode_png, find_node,
};
pub use render::{
    BODY_PLACEHOLDER, CARD_ID, CARD_WIDTH, GLYPH_PLACEHOLDER, HANDLE_PLACEHOLDER, NAME_PLACEHOLDER,
    RenderedCard, RenderedView, fallback_glyph, header_handle, header_name, render_card,
    render_card_with, render_view, render_view_with,
};
pub use state::{CompositionState, CompositionStore, LivePreview};
pub use text::{AverageMetrics, FontMetrics, TextMeasure, TextStyle};

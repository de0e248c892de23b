//! Error types for card composition and export.

use std::path::PathBuf;

use thiserror::Error;

/// Result type alias for card operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while ingesting pictures or exporting a card.
#[derive(Error, Debug)]
pub enum Error {
    /// The selected picture could not be read from disk.
    #[error("Failed to read image {path}: {source}")]
    ImageRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The picture bytes are not an image the card can display.
    #[error("Unsupported or corrupt image: {0}")]
    ImageDecode(String),

    /// The rendered view could not be parsed as SVG.
    #[error("Failed to parse rendered card: {0}")]
    Parse(String),

    /// Rasterizing the card failed.
    #[error("Rasterization failed: {0}")]
    Raster(String),

    /// PNG encoding failed.
    #[error("PNG encoding failed: {0}")]
    Encode(#[from] image::ImageError),

    /// Saving the downloaded file failed.
    #[error("Download failed: {0}")]
    Download(#[source] std::io::Error),

    /// The download name is empty or points outside the target directory.
    #[error("Invalid file name: {0:?}")]
    InvalidFileName(String),

    /// Unknown background key.
    #[error("Unknown background: {0}")]
    UnknownBackground(String),

    /// Draft JSON could not be read or written.
    #[error("Invalid draft: {0}")]
    Draft(#[from] serde_json::Error),

    /// The blocking rasterization task panicked or was cancelled.
    #[error("Export task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

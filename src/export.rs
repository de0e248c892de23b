//! The export pipeline: validate, rasterize, encode, download, notify.
//!
//! The pipeline never mutates the [`CompositionState`] it is given. Each call
//! to [`ExportPipeline::export`] is independent; there is no shared lock, so
//! overlapping exports simply produce separate downloads.

use std::fmt;
use std::fs;
use std::io::{self, Write};
use std::path::{Component, Path, PathBuf};
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, trace, warn};

use crate::error::{Error, Result};
use crate::raster::{BackingFill, DEFAULT_SCALE, RasterOptions, Rasterizer, encode_png};
use crate::render::{CARD_ID, render_view_with};
use crate::state::CompositionState;

/// File name used for every download.
pub const DEFAULT_FILE_NAME: &str = "preety-post.png";

// ============================================================================
// Notices
// ============================================================================

/// Visual variant of a notice.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeKind {
    /// The operation completed.
    Success,
    /// The operation was refused or failed.
    Destructive,
}

/// A short, transient, user-visible message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub kind: NoticeKind,
    /// Short headline.
    pub title: &'static str,
    /// One sentence of detail.
    pub description: &'static str,
}

impl Notice {
    /// Export refused because the display name or body is blank.
    pub const fn missing_information() -> Self {
        Self {
            kind: NoticeKind::Destructive,
            title: "Missing information",
            description: "Please enter a username and post content",
        }
    }

    /// The PNG was saved.
    pub const fn downloaded() -> Self {
        Self {
            kind: NoticeKind::Success,
            title: "Success!",
            description: "Your high-quality Preety Post has been downloaded",
        }
    }

    /// Rasterizing, encoding or saving failed.
    pub const fn download_failed() -> Self {
        Self {
            kind: NoticeKind::Destructive,
            title: "Download failed",
            description: "There was an error generating your image",
        }
    }
}

impl fmt::Display for Notice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.title, self.description)
    }
}

/// Surface that shows notices to the user.
pub trait Notifier {
    /// Shows `notice`.
    fn notify(&self, notice: Notice);
}

impl<F: Fn(Notice)> Notifier for F {
    fn notify(&self, notice: Notice) {
        self(notice)
    }
}

/// [`Notifier`] that writes notices to the log.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogNotifier;

impl Notifier for LogNotifier {
    fn notify(&self, notice: Notice) {
        match notice.kind {
            NoticeKind::Success => info!(title = notice.title, "{}", notice.description),
            NoticeKind::Destructive => warn!(title = notice.title, "{}", notice.description),
        }
    }
}

// ============================================================================
// Downloads
// ============================================================================

/// Host mechanism for saving a generated file.
pub trait Downloader {
    /// Saves `bytes` under `file_name` and returns where it landed.
    ///
    /// Implementations must not leave a partial file behind on failure.
    fn save(&self, file_name: &str, bytes: &[u8]) -> Result<PathBuf>;
}

/// Saves downloads into a directory.
///
/// Data is written to a hidden temporary file and then moved into place
/// without replacing anything. If the name is taken, ` (1)`, ` (2)`, ... is
/// appended to the file stem, so concurrent saves never clobber each other.
#[derive(Debug, Clone)]
pub struct DirectoryDownloader {
    dir: PathBuf,
}

impl DirectoryDownloader {
    /// Saves into `dir`, creating it on first use.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Returns the target directory.
    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

impl Downloader for DirectoryDownloader {
    fn save(&self, file_name: &str, bytes: &[u8]) -> Result<PathBuf> {
        check_file_name(file_name)?;
        fs::create_dir_all(&self.dir).map_err(Error::Download)?;

        let prefix = format!(".{file_name}.");
        let mut temp = tempfile::Builder::new()
            .prefix(&prefix)
            .suffix(".part")
            .tempfile_in(&self.dir)
            .map_err(Error::Download)?;
        temp.write_all(bytes).map_err(Error::Download)?;

        // The temporary file is removed on drop if no name is claimed.
        for n in 0u32.. {
            let target = numbered_path(&self.dir, file_name, n);
            match temp.persist_noclobber(&target) {
                Ok(_) => return Ok(target),
                Err(e) if e.error.kind() == io::ErrorKind::AlreadyExists => {
                    trace!(path = %target.display(), "name taken");
                    temp = e.file;
                }
                Err(e) => return Err(Error::Download(e.error)),
            }
        }
        Err(Error::Download(io::Error::new(
            io::ErrorKind::AlreadyExists,
            format!("no free name for {file_name}"),
        )))
    }
}

/// Rejects names that are empty or would leave the target directory.
fn check_file_name(file_name: &str) -> Result<()> {
    let mut components = Path::new(file_name).components();
    let single = matches!(
        (components.next(), components.next()),
        (Some(Component::Normal(_)), None)
    );
    if !single || file_name.contains(['/', '\\']) {
        return Err(Error::InvalidFileName(file_name.to_string()));
    }
    Ok(())
}

/// `name` for `n == 0`, otherwise `stem (n).ext`.
fn numbered_path(dir: &Path, file_name: &str, n: u32) -> PathBuf {
    if n == 0 {
        return dir.join(file_name);
    }
    match file_name.rsplit_once('.') {
        Some((stem, ext)) if !stem.is_empty() => dir.join(format!("{stem} ({n}).{ext}")),
        _ => dir.join(format!("{file_name} ({n})")),
    }
}

// ============================================================================
// ExportSettings
// ============================================================================

/// Tunables for the export pipeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "jsonschema", derive(schemars::JsonSchema))]
#[serde(rename_all = "camelCase", default)]
pub struct ExportSettings {
    /// Linear scale over the card's natural size.
    pub scale: f32,
    /// Name of the downloaded file.
    pub file_name: String,
    /// What fills pixels the card does not cover.
    pub backing: BackingFill,
}

impl Default for ExportSettings {
    fn default() -> Self {
        Self {
            scale: DEFAULT_SCALE,
            file_name: DEFAULT_FILE_NAME.to_string(),
            backing: BackingFill::Transparent,
        }
    }
}

impl ExportSettings {
    /// The rasterizer options these settings describe.
    pub fn raster_options(&self) -> RasterOptions {
        RasterOptions {
            scale: self.scale,
            backing: self.backing,
        }
    }
}

// ============================================================================
// ExportPipeline
// ============================================================================

/// Result of a single export request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExportOutcome {
    /// The card was saved at this path.
    Downloaded(PathBuf),
    /// Required text was missing; nothing was rasterized.
    Refused,
    /// The card could not be located in the rendered view.
    Aborted,
}

/// Returns true if the state has everything an export needs.
pub fn can_export(state: &CompositionState) -> bool {
    state.is_complete()
}

/// Turns the rendered card into a downloaded PNG.
pub struct ExportPipeline<R, D, N> {
    rasterizer: Arc<R>,
    downloader: D,
    notifier: N,
    settings: ExportSettings,
}

impl<R, D, N> ExportPipeline<R, D, N>
where
    R: Rasterizer + 'static,
    D: Downloader,
    N: Notifier,
{
    /// Creates a pipeline with default settings.
    pub fn new(rasterizer: R, downloader: D, notifier: N) -> Self {
        Self {
            rasterizer: Arc::new(rasterizer),
            downloader,
            notifier,
            settings: ExportSettings::default(),
        }
    }

    /// Replaces the settings.
    pub fn with_settings(mut self, settings: ExportSettings) -> Self {
        self.settings = settings;
        self
    }

    /// Returns the current settings.
    pub fn settings(&self) -> &ExportSettings {
        &self.settings
    }

    /// Returns the rasterizer.
    pub fn rasterizer(&self) -> &R {
        &self.rasterizer
    }

    /// Returns the downloader.
    pub fn downloader(&self) -> &D {
        &self.downloader
    }

    /// Exports the card for `state`.
    ///
    /// Blank display name or body refuses the export with a notice. Failures
    /// while rasterizing, encoding or saving produce the generic failure
    /// notice and are returned; no file is left behind.
    pub async fn export(&self, state: &CompositionState) -> Result<ExportOutcome> {
        if !can_export(state) {
            debug!("export refused: missing display name or body");
            self.notifier.notify(Notice::missing_information());
            return Ok(ExportOutcome::Refused);
        }

        let svg = render_view_with(state, self.rasterizer.text_metrics()).into_svg();
        let rasterizer = Arc::clone(&self.rasterizer);
        let options = self.settings.raster_options();

        let encoded = tokio::task::spawn_blocking(move || -> Result<Option<Vec<u8>>> {
            let tree = rasterizer.load(&svg)?;
            let Some(card) = tree.node_by_id(CARD_ID) else {
                return Ok(None);
            };
            let bitmap = rasterizer.rasterize(card, &options)?;
            encode_png(&bitmap).map(Some)
        })
        .await
        .map_err(Error::from)
        .and_then(|inner| inner);

        let saved = match encoded {
            Ok(None) => {
                debug!(id = CARD_ID, "card not found in rendered view");
                return Ok(ExportOutcome::Aborted);
            }
            Ok(Some(bytes)) => self.downloader.save(&self.settings.file_name, &bytes),
            Err(e) => Err(e),
        };

        match saved {
            Ok(path) => {
                info!(path = %path.display(), "card exported");
                self.notifier.notify(Notice::downloaded());
                Ok(ExportOutcome::Downloaded(path))
            }
            Err(e) => {
                error!(error = %e, "card export failed");
                self.notifier.notify(Notice::download_failed());
                Err(e)
            }
        }
    }
}

//! Rasterization of a rendered card using resvg/usvg.
//!
//! The export pipeline talks to a [`Rasterizer`], which loads a rendered view
//! and turns a single node of it into an RGBA bitmap. [`ResvgRasterizer`] is
//! the production implementation.

use std::sync::Arc;

use image::codecs::png::{CompressionType, FilterType, PngEncoder};
use image::{ExtendedColorType, ImageEncoder, RgbaImage};
use palette::Srgb;
use resvg::tiny_skia::{Color, Pixmap, Transform};
use resvg::usvg::{self, Node, Options, Tree, fontdb};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::text::{AverageMetrics, FontMetrics, TextMeasure};

/// Default linear scale over the card's natural size.
pub const DEFAULT_SCALE: f32 = 3.0;

// ============================================================================
// RasterOptions
// ============================================================================

/// What sits behind the card's transparent pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[cfg_attr(feature = "jsonschema", derive(schemars::JsonSchema))]
#[serde(rename_all = "camelCase")]
pub enum BackingFill {
    /// Leave uncovered pixels fully transparent.
    #[default]
    Transparent,
    /// Paint uncovered pixels with an opaque colour.
    Solid { red: u8, green: u8, blue: u8 },
}

impl BackingFill {
    /// An opaque backing of `color`.
    pub fn solid(color: Srgb<u8>) -> Self {
        Self::Solid {
            red: color.red,
            green: color.green,
            blue: color.blue,
        }
    }
}

/// Parameters for a single rasterization.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RasterOptions {
    /// Linear scale factor over the natural size.
    pub scale: f32,
    /// What fills pixels the subtree does not cover.
    pub backing: BackingFill,
}

impl Default for RasterOptions {
    fn default() -> Self {
        Self {
            scale: DEFAULT_SCALE,
            backing: BackingFill::Transparent,
        }
    }
}

// ============================================================================
// Rasterizer
// ============================================================================

/// Converts a visual subtree into a bitmap.
pub trait Rasterizer: Send + Sync {
    /// Parses rendered SVG markup into a tree whose nodes can be rasterized.
    fn load(&self, svg: &str) -> Result<Tree>;

    /// Rasterizes `subtree` alone, sized to its own bounds.
    fn rasterize(&self, subtree: &Node, options: &RasterOptions) -> Result<RgbaImage>;

    /// Metrics of the fonts text is drawn with, used to lay out the view
    /// before it is loaded.
    fn text_metrics(&self) -> &dyn TextMeasure {
        &AverageMetrics
    }
}

/// [`Rasterizer`] backed by resvg.
///
/// System fonts are loaded once on construction and shared by every load
/// and by the text metrics used for layout.
#[derive(Clone)]
pub struct ResvgRasterizer {
    fontdb: Arc<fontdb::Database>,
    metrics: FontMetrics,
}

impl ResvgRasterizer {
    /// Creates a rasterizer with the system fonts available.
    pub fn new() -> Self {
        let mut db = fontdb::Database::new();
        db.load_system_fonts();
        Self::with_fonts(db)
    }

    /// Creates a rasterizer using the given font database.
    pub fn with_fonts(fontdb: fontdb::Database) -> Self {
        let fontdb = Arc::new(fontdb);
        Self {
            metrics: FontMetrics::new(Arc::clone(&fontdb)),
            fontdb,
        }
    }
}

impl Default for ResvgRasterizer {
    fn default() -> Self {
        Self::new()
    }
}

impl Rasterizer for ResvgRasterizer {
    fn load(&self, svg: &str) -> Result<Tree> {
        let opts = Options {
            fontdb: self.fontdb.clone(),
            ..Options::default()
        };
        Tree::from_str(svg, &opts).map_err(|e| Error::Parse(e.to_string()))
    }

    fn rasterize(&self, subtree: &Node, options: &RasterOptions) -> Result<RgbaImage> {
        let bbox = subtree
            .abs_layer_bounding_box()
            .ok_or_else(|| Error::Raster("subtree has no visible area".into()))?;
        let size = bbox
            .size()
            .to_int_size()
            .scale_by(options.scale)
            .ok_or_else(|| Error::Raster(format!("invalid scale {}", options.scale)))?;

        let mut pixmap = Pixmap::new(size.width(), size.height())
            .ok_or_else(|| Error::Raster(format!("cannot allocate {}x{}", size.width(), size.height())))?;
        if let BackingFill::Solid { red, green, blue } = options.backing {
            pixmap.fill(Color::from_rgba8(red, green, blue, 255));
        }

        let transform = Transform::from_scale(options.scale, options.scale)
            .pre_translate(-bbox.x(), -bbox.y());
        resvg::render_node(subtree, transform, &mut pixmap.as_mut())
            .ok_or_else(|| Error::Raster("nothing was rendered".into()))?;

        Ok(pixmap_to_rgba_image(&pixmap))
    }

    fn text_metrics(&self) -> &dyn TextMeasure {
        &self.metrics
    }
}

// ============================================================================
// Pixel conversion
// ============================================================================

/// Converts a tiny_skia Pixmap to an image::RgbaImage.
fn pixmap_to_rgba_image(pixmap: &Pixmap) -> RgbaImage {
    let mut img = RgbaImage::new(pixmap.width(), pixmap.height());

    for (dst, src) in img.pixels_mut().zip(pixmap.pixels()) {
        // tiny_skia uses premultiplied alpha, we need to unpremultiply
        let (r, g, b, a) = unpremultiply(src.red(), src.green(), src.blue(), src.alpha());
        dst.0 = [r, g, b, a];
    }

    img
}

/// Unpremultiplies a premultiplied alpha pixel.
fn unpremultiply(r: u8, g: u8, b: u8, a: u8) -> (u8, u8, u8, u8) {
    if a == 0 {
        (0, 0, 0, 0)
    } else {
        let a_f = a as f32 / 255.0;
        (
            (r as f32 / a_f).round().min(255.0) as u8,
            (g as f32 / a_f).round().min(255.0) as u8,
            (b as f32 / a_f).round().min(255.0) as u8,
            a,
        )
    }
}

// ============================================================================
// Encoding
// ============================================================================

/// Encodes a bitmap as a losslessly compressed PNG.
pub fn encode_png(image: &RgbaImage) -> Result<Vec<u8>> {
    let mut bytes = Vec::new();
    PngEncoder::new_with_quality(&mut bytes, CompressionType::Best, FilterType::Adaptive)
        .write_image(
            image.as_raw(),
            image.width(),
            image.height(),
            ExtendedColorType::Rgba8,
        )?;
    Ok(bytes)
}

/// Returns the node with the given id, if the tree has one.
pub fn find_node<'a>(tree: &'a Tree, id: &str) -> Option<&'a usvg::Node> {
    tree.node_by_id(id)
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgba;

    const TWO_BOXES: &str = r##"<svg xmlns="http://www.w3.org/2000/svg" width="100" height="60">
        <rect width="100" height="60" fill="#ffffff"/>
        <g id="target" transform="translate(10 20)"><rect width="30" height="20" rx="5" fill="#ff0000"/></g>
    </svg>"##;

    fn rasterizer() -> ResvgRasterizer {
        ResvgRasterizer::with_fonts(fontdb::Database::new())
    }

    #[test]
    fn renders_only_the_located_node() {
        let r = rasterizer();
        let tree = r.load(TWO_BOXES).unwrap();
        let node = find_node(&tree, "target").expect("target group");

        let img = r.rasterize(node, &RasterOptions::default()).unwrap();
        assert_eq!((img.width(), img.height()), (90, 60));

        // Centre is the red box, the rounded corner is transparent, and the
        // white page behind it was never painted.
        assert_eq!(img.get_pixel(45, 30).0, [255, 0, 0, 255]);
        assert_eq!(img.get_pixel(0, 0).0[3], 0);
    }

    #[test]
    fn solid_backing_fills_corners() {
        let r = rasterizer();
        let tree = r.load(TWO_BOXES).unwrap();
        let node = find_node(&tree, "target").unwrap();

        let options = RasterOptions {
            scale: 1.0,
            backing: BackingFill::solid(Srgb::new(0, 0, 255)),
        };
        let img = r.rasterize(node, &options).unwrap();
        assert_eq!((img.width(), img.height()), (30, 20));
        assert_eq!(img.get_pixel(0, 0).0, [0, 0, 255, 255]);
    }

    #[test]
    fn missing_id_is_none() {
        let r = rasterizer();
        let tree = r.load(TWO_BOXES).unwrap();
        assert!(find_node(&tree, "post-card").is_none());
    }

    #[test]
    fn bad_markup_is_parse_error() {
        assert!(matches!(rasterizer().load("<svg"), Err(Error::Parse(_))));
    }

    #[test]
    fn png_is_lossless() {
        let mut img = RgbaImage::from_pixel(3, 2, Rgba([10, 20, 30, 40]));
        img.put_pixel(1, 1, Rgba([200, 100, 0, 255]));

        let bytes = encode_png(&img).unwrap();
        assert_eq!(&bytes[..8], b"\x89PNG\r\n\x1a\n");

        let decoded = image::load_from_memory(&bytes).unwrap().to_rgba8();
        assert_eq!(decoded, img);
    }

    #[test]
    fn unpremultiply_transparent() {
        assert_eq!(unpremultiply(10, 10, 10, 0), (0, 0, 0, 0));
        assert_eq!(unpremultiply(51, 0, 0, 51), (255, 0, 0, 51));
        assert_eq!(unpremultiply(7, 8, 9, 255), (7, 8, 9, 255));
    }
}

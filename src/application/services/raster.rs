//! Chart rasterizer
//!
//! Renders a computed layout into an RGB buffer at a fixed supersampling
//! factor. Boxes and connectors are always drawn; labels need a font.

use std::path::Path;

use fontdue::layout::{CoordinateSystem, Layout, LayoutSettings, TextStyle};
use image::{Rgb, RgbImage};
use tracing::{debug, instrument};

use crate::application::error_ext::IoResultExt;
use crate::application::{ApplicationError, ApplicationResult};
use crate::config::{ExportSettings, MIN_SUPERSAMPLE};
use crate::domain::{ChartLayout, PlacedNode, Rect, Segment, StyleTier, ViewTransform};
use crate::infrastructure::traits::FileSystem;

const CONNECTOR: [u8; 3] = [203, 213, 225];
/// Connector stroke, in layout units
const CONNECTOR_WIDTH: f32 = 1.0;
const BORDER_WIDTH: f32 = 1.0;
const ACCENT_WIDTH: f32 = 4.0;
const TEXT_INSET: f32 = 16.0;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RasterOptions {
    /// Raster pixels per layout unit
    pub supersample: u32,
    /// Blank border around the chart, in layout units
    pub padding: f32,
    pub background: [u8; 3],
    /// Longest accepted edge of the output image
    pub max_edge_px: u32,
}

impl Default for RasterOptions {
    fn default() -> Self {
        Self::from(&ExportSettings::default())
    }
}

impl From<&ExportSettings> for RasterOptions {
    fn from(settings: &ExportSettings) -> Self {
        Self {
            supersample: settings.supersample.max(MIN_SUPERSAMPLE),
            padding: settings.padding,
            background: settings.background,
            max_edge_px: settings.max_edge_px,
        }
    }
}

/// Load a TrueType/OpenType font for labels.
pub fn load_font(fs: &dyn FileSystem, path: &Path) -> ApplicationResult<fontdue::Font> {
    let bytes = fs.read_bytes(path).with_path_context("read font", path)?;
    fontdue::Font::from_bytes(bytes, fontdue::FontSettings::default()).map_err(|e| {
        ApplicationError::OperationFailed {
            context: format!("parse font: {}", path.display()),
            source: e.into(),
        }
    })
}

pub struct ChartRasterizer {
    options: RasterOptions,
    font: Option<fontdue::Font>,
}

impl ChartRasterizer {
    pub fn new(options: RasterOptions) -> Self {
        Self {
            options,
            font: None,
        }
    }

    pub fn with_font(mut self, font: fontdue::Font) -> Self {
        self.font = Some(font);
        self
    }

    pub fn options(&self) -> &RasterOptions {
        &self.options
    }

    pub fn has_font(&self) -> bool {
        self.font.is_some()
    }

    /// Pixel size of the capture for `layout`, padding included.
    pub fn capture_size(&self, layout: &ChartLayout) -> (u32, u32) {
        let scale = self.options.supersample as f32;
        let pad = 2.0 * self.options.padding;
        let edge = |len: f32| {
            if len > 0.0 {
                ((len + pad) * scale).ceil() as u32
            } else {
                0
            }
        };
        (edge(layout.bounds.width), edge(layout.bounds.height))
    }

    /// Rasterize `layout` as seen through `transform`.
    ///
    /// The capture region is the layout bounds plus padding; a transform
    /// other than identity shifts the drawing inside that fixed region.
    #[instrument(level = "debug", skip(self, layout), fields(nodes = layout.nodes.len()))]
    pub fn capture(
        &self,
        layout: &ChartLayout,
        transform: ViewTransform,
    ) -> ApplicationResult<RgbImage> {
        let (width, height) = self.capture_size(layout);
        if layout.is_empty() || width == 0 || height == 0 {
            return Err(ApplicationError::EmptyCapture { width, height });
        }
        if width > self.options.max_edge_px || height > self.options.max_edge_px {
            return Err(ApplicationError::CaptureTooLarge {
                width,
                height,
                max: self.options.max_edge_px,
            });
        }

        let mut canvas = Canvas {
            image: RgbImage::from_pixel(width, height, Rgb(self.options.background)),
            scale: self.options.supersample as f32,
            origin: (
                self.options.padding - layout.bounds.x,
                self.options.padding - layout.bounds.y,
            ),
            transform,
        };

        for segment in &layout.connectors {
            canvas.draw_segment(segment);
        }
        for node in &layout.nodes {
            canvas.draw_node(node);
            if let Some(font) = &self.font {
                canvas.draw_labels(font, node);
            }
        }
        debug!("capture: {}x{} px", width, height);
        Ok(canvas.image)
    }
}

/// Output buffer plus the mapping from layout units to pixels.
struct Canvas {
    image: RgbImage,
    scale: f32,
    origin: (f32, f32),
    transform: ViewTransform,
}

impl Canvas {
    fn to_px(&self, x: f32, y: f32) -> (f32, f32) {
        let (tx, ty) = self.transform.apply(x, y);
        (
            (tx + self.origin.0) * self.scale,
            (ty + self.origin.1) * self.scale,
        )
    }

    /// Length in layout units to pixels.
    fn len_px(&self, len: f32) -> f32 {
        len * self.transform.zoom * self.scale
    }

    fn fill_rect(&mut self, x0: f32, y0: f32, x1: f32, y1: f32, color: [u8; 3]) {
        let (w, h) = (self.image.width() as f32, self.image.height() as f32);
        let cx0 = x0.min(x1).floor().clamp(0.0, w) as u32;
        let cx1 = x0.max(x1).ceil().clamp(0.0, w) as u32;
        let cy0 = y0.min(y1).floor().clamp(0.0, h) as u32;
        let cy1 = y0.max(y1).ceil().clamp(0.0, h) as u32;
        for y in cy0..cy1 {
            for x in cx0..cx1 {
                self.image.put_pixel(x, y, Rgb(color));
            }
        }
    }

    fn fill_layout_rect(&mut self, rect: &Rect, color: [u8; 3]) {
        let (x0, y0) = self.to_px(rect.x, rect.y);
        let (x1, y1) = self.to_px(rect.right(), rect.bottom());
        self.fill_rect(x0, y0, x1, y1, color);
    }

    fn draw_segment(&mut self, segment: &Segment) {
        let half = self.len_px(CONNECTOR_WIDTH) / 2.0;
        let (x0, y0) = self.to_px(segment.from.x, segment.from.y);
        let (x1, y1) = self.to_px(segment.to.x, segment.to.y);
        // widen both ends so bus and drops join without gaps
        self.fill_rect(
            x0.min(x1) - half,
            y0.min(y1) - half,
            x0.max(x1) + half,
            y0.max(y1) + half,
            CONNECTOR,
        );
    }

    fn draw_node(&mut self, node: &PlacedNode) {
        let style = node.tier.style();
        let r = node.rect;
        self.fill_layout_rect(&r, style.border);
        let inner = Rect::new(
            r.x + BORDER_WIDTH,
            r.y + BORDER_WIDTH,
            r.width - 2.0 * BORDER_WIDTH,
            r.height - 2.0 * BORDER_WIDTH,
        );
        self.fill_layout_rect(&inner, style.fill);
        if node.tier != StyleTier::Unit {
            let accent = Rect::new(r.x, r.y, ACCENT_WIDTH, r.height);
            self.fill_layout_rect(&accent, style.accent);
        }
    }

    fn draw_labels(&mut self, font: &fontdue::Font, node: &PlacedNode) {
        let style = node.tier.style();
        let r = node.rect;
        let max_width = self.len_px(r.width - 2.0 * TEXT_INSET);
        let assignee = if node.assignee_name.trim().is_empty() {
            "Unassigned"
        } else {
            node.assignee_name.as_str()
        };
        let lines = [
            (node.role.label(), 10.0, 0.2, style.muted_text),
            (node.title.as_str(), 15.0, 0.48, style.text),
            (assignee, 12.0, 0.76, style.muted_text),
        ];
        for (text, size, at, color) in lines {
            let (x, center_y) = self.to_px(r.x + TEXT_INSET, r.y + r.height * at);
            let size = fit_text_size(font, text, self.len_px(size), max_width, 6.0);
            self.draw_text(font, text, size, x, center_y, color);
        }
    }

    fn draw_text(
        &mut self,
        font: &fontdue::Font,
        text: &str,
        size: f32,
        x: f32,
        center_y: f32,
        color: [u8; 3],
    ) {
        let mut layout = Layout::new(CoordinateSystem::PositiveYDown);
        let mut settings = LayoutSettings::default();
        if let Some(metrics) = font.horizontal_line_metrics(size) {
            let baseline = center_y + (metrics.ascent + metrics.descent) * 0.5;
            settings.y = baseline - metrics.ascent;
        } else {
            settings.y = center_y - size * 0.5;
        }
        settings.x = x;
        layout.reset(&settings);
        layout.append(&[font], &TextStyle::new(text, size, 0));

        for glyph in layout.glyphs() {
            if glyph.width == 0 || glyph.height == 0 {
                continue;
            }
            let (metrics, bitmap) = font.rasterize_indexed(glyph.key.glyph_index, glyph.key.px);
            self.blend_glyph(glyph.x, glyph.y, metrics.width, metrics.height, &bitmap, color);
        }
    }

    fn blend_glyph(
        &mut self,
        x: f32,
        y: f32,
        width: usize,
        height: usize,
        bitmap: &[u8],
        color: [u8; 3],
    ) {
        let start_x = x.floor() as i64;
        let start_y = y.floor() as i64;
        for row in 0..height {
            for col in 0..width {
                let alpha = bitmap[row * width + col];
                if alpha == 0 {
                    continue;
                }
                let px = start_x + col as i64;
                let py = start_y + row as i64;
                if px < 0 || py < 0 {
                    continue;
                }
                let (px, py) = (px as u32, py as u32);
                if px >= self.image.width() || py >= self.image.height() {
                    continue;
                }
                let a = alpha as u16;
                let dst = self.image.get_pixel_mut(px, py);
                for (channel, src) in dst.0.iter_mut().zip(color) {
                    *channel = ((src as u16 * a + *channel as u16 * (255 - a)) / 255) as u8;
                }
            }
        }
    }
}

fn measure_text_width(font: &fontdue::Font, text: &str, size: f32) -> f32 {
    let mut layout = Layout::new(CoordinateSystem::PositiveYDown);
    layout.reset(&LayoutSettings::default());
    layout.append(&[font], &TextStyle::new(text, size, 0));
    let mut min_x = f32::INFINITY;
    let mut max_x = f32::NEG_INFINITY;
    for glyph in layout.glyphs() {
        min_x = min_x.min(glyph.x);
        max_x = max_x.max(glyph.x + glyph.width as f32);
    }
    if min_x.is_finite() && max_x.is_finite() {
        (max_x - min_x).max(0.0)
    } else {
        0.0
    }
}

/// Shrink `size` until `text` fits in `max_width`, but not below `min_size`.
fn fit_text_size(font: &fontdue::Font, text: &str, size: f32, max_width: f32, min_size: f32) -> f32 {
    if max_width <= 0.0 {
        return size;
    }
    let width = measure_text_width(font, text, size);
    if width <= max_width || width <= 0.0 {
        return size;
    }
    (size * (max_width / width)).max(min_size)
}

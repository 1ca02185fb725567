//! Printable document composition
//!
//! One landscape page: centered title and metadata lines, the chart
//! raster scaled to fit below them, and a small generation footer.

use chrono::{DateTime, Local};
use image::RgbImage;
use printpdf::{
    BuiltinFont, Color, ColorBits, ColorSpace, Image, ImageTransform, ImageXObject, Mm,
    PdfDocument, Px, Rgb,
};
use tracing::{debug, instrument};

use crate::application::{ApplicationError, ApplicationResult};
use crate::config::ExportSettings;

const TITLE_Y_MM: f32 = 15.0;
const SUBTITLE_Y_MM: f32 = 22.0;
const IMAGE_TOP_MM: f32 = 30.0;
const TITLE_PT: f32 = 16.0;
const SUBTITLE_PT: f32 = 10.0;
const FOOTER_PT: f32 = 7.0;
const PT_TO_MM: f32 = 0.3528;
/// Average Helvetica glyph advance as a fraction of the font size
const HELVETICA_ADVANCE: f32 = 0.5;

/// Fixed page geometry, in millimetres.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PageGeometry {
    pub width: f32,
    pub height: f32,
    pub margin: f32,
}

impl Default for PageGeometry {
    fn default() -> Self {
        Self::from(&ExportSettings::default())
    }
}

impl From<&ExportSettings> for PageGeometry {
    fn from(settings: &ExportSettings) -> Self {
        Self {
            width: settings.page_width_mm,
            height: settings.page_height_mm,
            margin: settings.margin_mm,
        }
    }
}

/// Where the chart image lands on the page; origin at the top-left corner.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ImagePlacement {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl PageGeometry {
    /// Width and height left for the chart between the header and the
    /// bottom margin. Either may be non-positive for a bad geometry.
    pub fn image_area(&self) -> (f32, f32) {
        (
            self.width - 2.0 * self.margin,
            self.height - IMAGE_TOP_MM - self.margin,
        )
    }

    pub fn is_usable(&self) -> bool {
        let (w, h) = self.image_area();
        w > 0.0 && h > 0.0
    }

    /// Scale an image of `px_width` x `px_height` uniformly into the area
    /// below the header, centered horizontally.
    pub fn fit_image(&self, px_width: u32, px_height: u32) -> ImagePlacement {
        let (budget_w, budget_h) = self.image_area();
        let ratio = (budget_w / px_width.max(1) as f32)
            .min(budget_h / px_height.max(1) as f32)
            .max(f32::EPSILON);
        let width = px_width as f32 * ratio;
        let height = px_height as f32 * ratio;
        ImagePlacement {
            x: (self.width - width) / 2.0,
            y: IMAGE_TOP_MM,
            width,
            height,
        }
    }
}

/// Header text and timestamp for one page.
#[derive(Debug, Clone)]
pub struct PageText {
    pub title: String,
    pub subtitle: String,
    pub generated_at: DateTime<Local>,
}

#[derive(Debug, Clone, Default)]
pub struct PdfComposer {
    page: PageGeometry,
}

fn pdf_err(context: &str) -> impl FnOnce(printpdf::Error) -> ApplicationError + '_ {
    move |e| ApplicationError::OperationFailed {
        context: context.to_string(),
        source: e.to_string().into(),
    }
}

impl PdfComposer {
    pub fn new(page: PageGeometry) -> Self {
        Self { page }
    }

    pub fn page(&self) -> &PageGeometry {
        &self.page
    }

    /// Approximate: titles heavy in wide capitals such as W or M land right of centre.
    fn centered_x(&self, text: &str, size_pt: f32) -> f32 {
        let approx_width = text.chars().count() as f32 * size_pt * HELVETICA_ADVANCE * PT_TO_MM;
        ((self.page.width - approx_width) / 2.0).max(self.page.margin)
    }

    /// PDF y axis points up; convert from a top-based offset.
    fn from_top(&self, y: f32) -> Mm {
        Mm(self.page.height - y)
    }

    #[instrument(level = "debug", skip(self, image, text), fields(w = image.width(), h = image.height()))]
    pub fn compose(&self, image: &RgbImage, text: &PageText) -> ApplicationResult<Vec<u8>> {
        let (doc, page_idx, layer_idx) = PdfDocument::new(
            text.title.as_str(),
            Mm(self.page.width),
            Mm(self.page.height),
            "chart",
        );
        let layer = doc.get_page(page_idx).get_layer(layer_idx);
        let bold = doc
            .add_builtin_font(BuiltinFont::HelveticaBold)
            .map_err(pdf_err("load title font"))?;
        let regular = doc
            .add_builtin_font(BuiltinFont::Helvetica)
            .map_err(pdf_err("load body font"))?;

        layer.set_fill_color(Color::Rgb(Rgb::new(0.0, 0.0, 0.0, None)));
        layer.use_text(
            text.title.as_str(),
            TITLE_PT,
            Mm(self.centered_x(&text.title, TITLE_PT)),
            self.from_top(TITLE_Y_MM),
            &bold,
        );

        let grey = 80.0 / 255.0;
        layer.set_fill_color(Color::Rgb(Rgb::new(grey, grey, grey, None)));
        layer.use_text(
            text.subtitle.as_str(),
            SUBTITLE_PT,
            Mm(self.centered_x(&text.subtitle, SUBTITLE_PT)),
            self.from_top(SUBTITLE_Y_MM),
            &regular,
        );

        let footer = format!("Generated {}", text.generated_at.format("%Y-%m-%d %H:%M"));
        let light = 150.0 / 255.0;
        layer.set_fill_color(Color::Rgb(Rgb::new(light, light, light, None)));
        layer.use_text(
            footer,
            FOOTER_PT,
            Mm(self.page.margin),
            Mm(self.page.margin / 2.0),
            &regular,
        );

        let placement = self.page.fit_image(image.width(), image.height());
        let dpi = image.width() as f32 * 25.4 / placement.width;
        let xobject = ImageXObject {
            width: Px(image.width() as usize),
            height: Px(image.height() as usize),
            color_space: ColorSpace::Rgb,
            bits_per_component: ColorBits::Bit8,
            interpolate: true,
            image_data: image.as_raw().clone(),
            image_filter: None,
            smask: None,
            clipping_bbox: None,
        };
        Image::from(xobject).add_to_layer(
            layer,
            ImageTransform {
                translate_x: Some(Mm(placement.x)),
                translate_y: Some(self.from_top(placement.y + placement.height)),
                dpi: Some(dpi),
                ..Default::default()
            },
        );

        let bytes = doc.save_to_bytes().map_err(pdf_err("write pdf"))?;
        debug!("compose: {} bytes, image at {:?}", bytes.len(), placement);
        Ok(bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn given_wide_image_when_fitted_then_width_bound_and_centered() {
        let page = PageGeometry::default();
        let p = page.fit_image(2770, 500);
        assert!((p.width - 277.0).abs() < 1e-3);
        assert!((p.height - 50.0).abs() < 1e-3);
        assert!((p.x - 10.0).abs() < 1e-3);
        assert_eq!(p.y, 30.0);
    }

    #[test]
    fn given_tall_image_when_fitted_then_height_bound_and_aspect_kept() {
        let page = PageGeometry::default();
        let p = page.fit_image(1000, 2000);
        assert!((p.height - 170.0).abs() < 1e-3);
        assert!((p.width - 85.0).abs() < 1e-3);
        assert!((p.x + p.width / 2.0 - 148.5).abs() < 1e-3);
    }

    #[test]
    fn given_narrow_margin_when_fitting_tall_image_then_stays_above_bottom_margin() {
        let page = PageGeometry {
            width: 297.0,
            height: 210.0,
            margin: 5.0,
        };
        let p = page.fit_image(1000, 2000);
        assert_eq!(p.y, 30.0);
        assert!((p.height - 175.0).abs() < 1e-3);
        assert!(p.y + p.height <= page.height - page.margin + 1e-3);
    }

    #[test]
    fn given_page_too_short_for_header_when_fitting_then_unusable_and_size_positive() {
        let page = PageGeometry {
            width: 297.0,
            height: 35.0,
            margin: 10.0,
        };
        assert!(!page.is_usable());
        let p = page.fit_image(400, 300);
        assert!(p.width > 0.0 && p.height > 0.0);
        assert!(PageGeometry::default().is_usable());
    }

    #[test]
    fn given_title_when_centering_then_uses_average_advance_and_respects_margin() {
        let composer = PdfComposer::default();
        let x = composer.centered_x("WWWW", 10.0);
        assert!((x - (297.0 - 4.0 * 10.0 * 0.5 * 0.3528) / 2.0).abs() < 1e-3);
        assert_eq!(composer.centered_x(&"M".repeat(400), 10.0), 10.0);
    }

    #[test]
    fn given_image_when_composed_then_pdf_bytes() {
        let image = RgbImage::from_pixel(30, 20, image::Rgb([255, 255, 255]));
        let text = PageText {
            title: "ICS Organization Chart - Incident".into(),
            subtitle: "Task: N/A  |  Op Period: Unspecified".into(),
            generated_at: Local::now(),
        };
        let bytes = PdfComposer::default().compose(&image, &text).unwrap();
        assert!(bytes.starts_with(b"%PDF"));
    }
}

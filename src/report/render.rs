//! Report table rendering
//!
//! Draws a compiled report as a fixed-width PNG table. Outline fonts are
//! loaded from a font directory; when a font is missing or unreadable the
//! built-in 8x8 bitmap font is used instead.

use super::format::{format_amount, format_points, wrap_name};
use super::CompiledReport;
use ab_glyph::{FontVec, PxScale};
use font8x8::{UnicodeFonts, BASIC_FONTS, LATIN_FONTS};
use image::{DynamicImage, ImageFormat, Rgb, RgbImage};
use imageproc::drawing::{draw_filled_rect_mut, draw_text_mut, text_size};
use imageproc::rect::Rect;
use std::io::Cursor;
use std::path::Path;
use thiserror::Error;

pub const WIDTH: u32 = 1100;
/// Height of one wrapped name line's share of a row
pub const BASE_ROW_HEIGHT: u32 = 35;
/// Header, column titles and summary block
pub const FIXED_HEIGHT: u32 = 330;

const MARGIN: i32 = 50;
const RULE_THICKNESS: u32 = 2;
const NAME_LINE_STEP: i32 = 20;
/// Raises single-line cells to sit on the row's midline
const CELL_RAISE: i32 = 8;

const TITLE_SIZE: f32 = 32.0;
const HEADER_SIZE: f32 = 18.0;
const TEXT_SIZE: f32 = 15.0;

const BOLD_FONT_FILE: &str = "arialbd.ttf";
const REGULAR_FONT_FILE: &str = "arial.ttf";

const WHITE: Rgb<u8> = Rgb([255, 255, 255]);
const BLACK: Rgb<u8> = Rgb([0, 0, 0]);

const GLYPH_SIZE: u32 = 8;
const GLYPH_PX: f32 = 8.0;

struct Column {
    title: &'static str,
    x: i32,
}

const CODE: Column = Column { title: "Kod", x: 50 };
const PRODUCT: Column = Column { title: "Mahsulot", x: 150 };
const QUANTITY: Column = Column { title: "Soni", x: 700 };
const PRICE: Column = Column { title: "Narxi", x: 830 };
const POINTS: Column = Column { title: "Jami Ball", x: 980 };

#[derive(Debug, Error)]
pub enum RenderError {
    #[error("Image encoding failed: {0}")]
    Encode(#[from] image::ImageError),
}

enum Typeface {
    Outline(FontVec),
    Bitmap,
}

impl Typeface {
    fn load(dir: Option<&Path>, file: &str) -> Self {
        let Some(dir) = dir else {
            return Typeface::Bitmap;
        };
        let path = dir.join(file);
        let bytes = match std::fs::read(&path) {
            Ok(bytes) => bytes,
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "Font unavailable, using built-in font");
                return Typeface::Bitmap;
            }
        };
        match FontVec::try_from_vec(bytes) {
            Ok(font) => Typeface::Outline(font),
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "Font unreadable, using built-in font");
                Typeface::Bitmap
            }
        }
    }

    fn draw(&self, canvas: &mut RgbImage, size: f32, x: i32, y: i32, text: &str) {
        match self {
            Typeface::Outline(font) => draw_text_mut(canvas, BLACK, x, y, PxScale::from(size), font, text),
            Typeface::Bitmap => draw_bitmap_text(canvas, bitmap_scale(size), x, y, text),
        }
    }

    fn width(&self, size: f32, text: &str) -> u32 {
        match self {
            Typeface::Outline(font) => text_size(PxScale::from(size), font, text).0,
            Typeface::Bitmap => {
                let chars = u32::try_from(text.chars().count()).unwrap_or(u32::MAX);
                chars.saturating_mul(GLYPH_SIZE * bitmap_scale(size))
            }
        }
    }
}

/// Renders compiled reports to PNG
pub struct ReportRenderer {
    bold: Typeface,
    regular: Typeface,
}

impl ReportRenderer {
    /// Load `arialbd.ttf` and `arial.ttf` from `font_dir`, falling back to
    /// the built-in font for whichever is unavailable.
    pub fn new(font_dir: Option<&Path>) -> Self {
        Self {
            bold: Typeface::load(font_dir, BOLD_FONT_FILE),
            regular: Typeface::load(font_dir, REGULAR_FONT_FILE),
        }
    }

    /// Renderer that only uses the built-in font
    #[allow(dead_code)] // Used in tests
    pub fn builtin() -> Self {
        Self {
            bold: Typeface::Bitmap,
            regular: Typeface::Bitmap,
        }
    }

    pub fn uses_builtin_font(&self) -> bool {
        matches!(self.bold, Typeface::Bitmap) || matches!(self.regular, Typeface::Bitmap)
    }

    /// Draw the report table and encode it as PNG
    pub fn render(&self, report: &CompiledReport) -> Result<Vec<u8>, RenderError> {
        let wrapped: Vec<Vec<String>> = report
            .rows
            .iter()
            .map(|row| wrap_name(&row.display_name))
            .collect();
        let mut canvas = RgbImage::from_pixel(WIDTH, image_height(&wrapped), WHITE);

        // Header block
        let title = "Sotuv Hisoboti";
        let title_width = i32::try_from(self.bold.width(TITLE_SIZE, title)).unwrap_or(0);
        let title_x = (i32::try_from(WIDTH).unwrap_or(0) - title_width) / 2;
        self.bold.draw(&mut canvas, TITLE_SIZE, title_x, 50 - font_px(TITLE_SIZE), title);
        self.bold.draw(
            &mut canvas,
            HEADER_SIZE,
            MARGIN,
            110,
            &format!("Sotuvchi: {}", report.salesperson_name),
        );
        self.bold.draw(
            &mut canvas,
            HEADER_SIZE,
            MARGIN,
            140,
            &format!("Sana: {}", report.formatted_date()),
        );
        draw_rule(&mut canvas, 180);

        let mut y = 200;
        for column in [&CODE, &PRODUCT, &QUANTITY, &PRICE, &POINTS] {
            self.bold.draw(&mut canvas, HEADER_SIZE, column.x, y, column.title);
        }
        y += 40;

        for (row, lines) in report.rows.iter().zip(&wrapped) {
            let row_height = row_height(lines.len());
            let cell_y = y + row_height / 2 - CELL_RAISE;

            self.regular.draw(&mut canvas, TEXT_SIZE, CODE.x, cell_y, &row.code);
            self.regular.draw(
                &mut canvas,
                TEXT_SIZE,
                QUANTITY.x,
                cell_y,
                &format!("{} dona", row.quantity),
            );
            self.regular.draw(
                &mut canvas,
                TEXT_SIZE,
                PRICE.x,
                cell_y,
                &format!("{} so'm", format_amount(row.unit_price)),
            );
            self.regular.draw(
                &mut canvas,
                TEXT_SIZE,
                POINTS.x,
                cell_y,
                &format_points(row.total_points),
            );

            let mut text_y = y;
            for line in lines {
                self.regular.draw(&mut canvas, TEXT_SIZE, PRODUCT.x, text_y, line);
                text_y += NAME_LINE_STEP;
            }
            y += row_height;
        }

        // Summary block
        draw_rule(&mut canvas, y);
        y += 20;
        self.bold.draw(
            &mut canvas,
            HEADER_SIZE,
            MARGIN,
            y,
            &format!("UMUMIY TUSHUM: {} so'm", format_amount(report.grand_total_sum)),
        );
        y += 30;
        self.bold.draw(
            &mut canvas,
            HEADER_SIZE,
            MARGIN,
            y,
            &format!("UMUMIY BALL: {}", format_points(report.grand_total_points)),
        );

        let mut bytes = Vec::new();
        DynamicImage::ImageRgb8(canvas).write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png)?;
        Ok(bytes)
    }
}

/// Total image height for rows with the given wrapped names
fn image_height(wrapped: &[Vec<String>]) -> u32 {
    let lines: usize = wrapped.iter().map(Vec::len).sum();
    let lines = u32::try_from(lines).unwrap_or(u32::MAX);
    FIXED_HEIGHT.saturating_add(BASE_ROW_HEIGHT.saturating_mul(lines))
}

fn row_height(line_count: usize) -> i32 {
    i32::try_from(line_count)
        .unwrap_or(i32::MAX)
        .saturating_mul(i32::try_from(BASE_ROW_HEIGHT).unwrap_or(0))
}

fn draw_rule(canvas: &mut RgbImage, y: i32) {
    let length = WIDTH - 2 * MARGIN.unsigned_abs();
    draw_filled_rect_mut(canvas, Rect::at(MARGIN, y).of_size(length, RULE_THICKNESS), BLACK);
}

#[allow(clippy::cast_possible_truncation)] // Font sizes are small constants
fn font_px(size: f32) -> i32 {
    size.round() as i32
}

/// Integer magnification of the 8px bitmap font closest to `size`
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn bitmap_scale(size: f32) -> u32 {
    ((size / GLYPH_PX).round() as u32).max(1)
}

fn bitmap_glyph(ch: char) -> [u8; 8] {
    BASIC_FONTS
        .get(ch)
        .or_else(|| LATIN_FONTS.get(ch))
        .or_else(|| BASIC_FONTS.get('?'))
        .unwrap_or([0; 8])
}

fn draw_bitmap_text(canvas: &mut RgbImage, scale: u32, x: i32, y: i32, text: &str) {
    let advance = i64::from(GLYPH_SIZE * scale);
    let mut origin_x = i64::from(x);

    for ch in text.chars() {
        for (row, bits) in (0u32..).zip(bitmap_glyph(ch)) {
            for col in 0..GLYPH_SIZE {
                // Bit 0 is the leftmost pixel
                if bits & (1 << col) == 0 {
                    continue;
                }
                for dy in 0..scale {
                    for dx in 0..scale {
                        let px = origin_x + i64::from(col * scale + dx);
                        let py = i64::from(y) + i64::from(row * scale + dy);
                        put_pixel_clipped(canvas, px, py);
                    }
                }
            }
        }
        origin_x += advance;
    }
}

fn put_pixel_clipped(canvas: &mut RgbImage, x: i64, y: i64) {
    if let (Ok(x), Ok(y)) = (u32::try_from(x), u32::try_from(y)) {
        if x < canvas.width() && y < canvas.height() {
            canvas.put_pixel(x, y, BLACK);
        }
    }
}

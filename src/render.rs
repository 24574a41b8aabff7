//! Meme image rendering: plain background, centered multi-line text.
//!
//! Lines are never wrapped and the font is never shrunk; a line wider than the
//! canvas is clipped at the edges.

use crate::errors::RenderError;
use crate::models::MemeText;
use ab_glyph::{Font, FontVec, PxScale, ScaleFont, point};
use font8x8::UnicodeFonts;
use image::{ImageFormat, Rgb, RgbImage};
use std::path::{Path, PathBuf};

pub const CANVAS_SIZE: u32 = 1080;
pub const FONT_SIZE: f32 = 60.0;
pub const LINE_SPACING: u32 = 20;

/// Fonts tried in order before falling back to the built-in face.
const FONT_CANDIDATES: &[&str] = &[
    "/usr/share/fonts/truetype/dejavu/DejaVuSans-Bold.ttf",
    "arial.ttf",
    "/usr/share/fonts/truetype/msttcorefonts/Arial_Bold.ttf",
    "/usr/share/fonts/truetype/liberation/LiberationSans-Bold.ttf",
    "/Library/Fonts/Arial Bold.ttf",
];

/// Size of one glyph cell in the built-in face.
const BUILTIN_CELL: u32 = 8;

/// A face that can rasterize a single line of text.
pub enum Face {
    Outline {
        name: String,
        font: FontVec,
        scale: PxScale,
    },
    /// 8x8 bitmap glyphs scaled up by an integer factor. Always available.
    Builtin { scale: u32 },
}

impl std::fmt::Debug for Face {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Face::Outline { name, scale, .. } => f
                .debug_struct("Outline")
                .field("name", name)
                .field("scale", &scale.y)
                .finish(),
            Face::Builtin { scale } => f.debug_struct("Builtin").field("scale", scale).finish(),
        }
    }
}

impl Face {
    /// Walks the font chain at `size` pixels. Never fails.
    pub fn load(size: f32) -> Self {
        for candidate in FONT_CANDIDATES {
            match Self::from_file(candidate, size) {
                Some(face) => {
                    tracing::debug!(font = %candidate, "Using font");
                    return face;
                }
                None => tracing::trace!(font = %candidate, "Font not usable, trying next"),
            }
        }
        tracing::warn!("No system font found, using built-in bitmap face");
        Self::builtin(size)
    }

    pub fn from_file(path: impl AsRef<Path>, size: f32) -> Option<Self> {
        let path = path.as_ref();
        let data = std::fs::read(path).ok()?;
        let font = FontVec::try_from_vec(data).ok()?;
        Some(Face::Outline {
            name: path.display().to_string(),
            font,
            scale: PxScale::from(size),
        })
    }

    /// Bitmap cells are square, so they are drawn at half the requested size
    /// to keep line lengths close to what the outline fonts produce.
    pub fn builtin(size: f32) -> Self {
        let scale = (size / (2 * BUILTIN_CELL) as f32).round().max(1.0) as u32;
        Face::Builtin { scale }
    }

    /// Nominal height used for lines without any ink (e.g. blank lines).
    fn nominal_height(&self) -> u32 {
        match self {
            Face::Outline { font, scale, .. } => {
                let scaled = font.as_scaled(*scale);
                (scaled.ascent() - scaled.descent()).ceil().max(0.0) as u32
            }
            Face::Builtin { scale } => BUILTIN_CELL * scale,
        }
    }

    /// Rasterizes `line` with its pen origin at (0, 0).
    pub fn rasterize(&self, line: &str) -> RasterLine {
        let mut pixels = Vec::new();
        match self {
            Face::Outline { font, scale, .. } => {
                let scaled = font.as_scaled(*scale);
                let baseline = scaled.ascent();
                let mut caret = 0.0f32;
                let mut previous = None;
                for c in line.chars() {
                    let id = scaled.glyph_id(c);
                    if let Some(prev) = previous {
                        caret += scaled.kern(prev, id);
                    }
                    let glyph = id.with_scale_and_position(*scale, point(caret, baseline));
                    caret += scaled.h_advance(id);
                    previous = Some(id);

                    if let Some(outlined) = font.outline_glyph(glyph) {
                        let bounds = outlined.px_bounds();
                        let (left, top) = (bounds.min.x as i32, bounds.min.y as i32);
                        outlined.draw(|x, y, coverage| {
                            if coverage > 0.0 {
                                pixels.push((left + x as i32, top + y as i32, coverage.min(1.0)));
                            }
                        });
                    }
                }
            }
            Face::Builtin { scale } => {
                let scale = *scale as i32;
                let cell = BUILTIN_CELL as i32 * scale;
                for (index, c) in line.chars().enumerate() {
                    let rows = builtin_glyph(c);
                    let left = index as i32 * cell;
                    for (row, bits) in rows.iter().enumerate() {
                        for col in 0..BUILTIN_CELL as i32 {
                            if (*bits >> col) & 1 == 0 {
                                continue;
                            }
                            for dy in 0..scale {
                                for dx in 0..scale {
                                    pixels.push((
                                        left + col * scale + dx,
                                        row as i32 * scale + dy,
                                        1.0,
                                    ));
                                }
                            }
                        }
                    }
                }
            }
        }
        RasterLine::from_pixels(pixels, self.nominal_height())
    }
}

fn builtin_glyph(c: char) -> [u8; 8] {
    font8x8::BASIC_FONTS
        .get(c)
        .or_else(|| font8x8::LATIN_FONTS.get(c))
        .or_else(|| font8x8::BASIC_FONTS.get('?'))
        .unwrap_or([0; 8])
}

/// Ink extent of a rasterized line, relative to its pen origin.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InkBox {
    pub min_x: i32,
    pub min_y: i32,
    pub max_x: i32,
    pub max_y: i32,
}

/// Coverage samples for one line plus its measured size.
#[derive(Debug, Clone)]
pub struct RasterLine {
    pixels: Vec<(i32, i32, f32)>,
    ink: Option<InkBox>,
    pub metrics: LineMetrics,
}

impl RasterLine {
    fn from_pixels(pixels: Vec<(i32, i32, f32)>, nominal_height: u32) -> Self {
        let ink = pixels.iter().fold(None, |acc: Option<InkBox>, &(x, y, _)| {
            Some(match acc {
                None => InkBox { min_x: x, min_y: y, max_x: x + 1, max_y: y + 1 },
                Some(b) => InkBox {
                    min_x: b.min_x.min(x),
                    min_y: b.min_y.min(y),
                    max_x: b.max_x.max(x + 1),
                    max_y: b.max_y.max(y + 1),
                },
            })
        });
        let metrics = match ink {
            Some(b) => LineMetrics {
                width: (b.max_x - b.min_x) as u32,
                height: (b.max_y - b.min_y) as u32,
            },
            None => LineMetrics { width: 0, height: nominal_height },
        };
        Self { pixels, ink, metrics }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LineMetrics {
    pub width: u32,
    pub height: u32,
}

/// Top-left corner of each line's ink box so the lines are centered
/// horizontally and the block is centered vertically.
pub fn layout_lines(lines: &[LineMetrics], width: u32, height: u32, spacing: u32) -> Vec<(i32, i32)> {
    let gaps = lines.len().saturating_sub(1) as i64 * spacing as i64;
    let total: i64 = lines.iter().map(|l| l.height as i64).sum::<i64>() + gaps;
    let mut y = (height as i64 - total).div_euclid(2);

    lines
        .iter()
        .map(|line| {
            let x = (width as i64 - line.width as i64).div_euclid(2);
            let position = (x as i32, y as i32);
            y += line.height as i64 + spacing as i64;
            position
        })
        .collect()
}

pub struct MemeRenderer {
    face: Face,
    width: u32,
    height: u32,
    spacing: u32,
    background: Rgb<u8>,
    foreground: Rgb<u8>,
}

impl MemeRenderer {
    /// Square canvas, black on white.
    pub fn new(face: Face) -> Self {
        Self {
            face,
            width: CANVAS_SIZE,
            height: CANVAS_SIZE,
            spacing: LINE_SPACING,
            background: Rgb([255, 255, 255]),
            foreground: Rgb([0, 0, 0]),
        }
    }

    pub fn face(&self) -> &Face {
        &self.face
    }

    pub fn render(&self, text: &MemeText) -> RgbImage {
        let mut canvas = RgbImage::from_pixel(self.width, self.height, self.background);
        let lines: Vec<RasterLine> = text.lines().map(|l| self.face.rasterize(l)).collect();
        let metrics: Vec<LineMetrics> = lines.iter().map(|l| l.metrics).collect();
        let positions = layout_lines(&metrics, self.width, self.height, self.spacing);

        for (line, (x, y)) in lines.iter().zip(positions) {
            let Some(ink) = line.ink else { continue };
            for &(px, py, coverage) in &line.pixels {
                let cx = x + (px - ink.min_x);
                let cy = y + (py - ink.min_y);
                if cx < 0 || cy < 0 || cx >= self.width as i32 || cy >= self.height as i32 {
                    continue;
                }
                let pixel = canvas.get_pixel_mut(cx as u32, cy as u32);
                *pixel = blend(*pixel, self.foreground, coverage);
            }
        }
        canvas
    }

    /// Renders `text` and writes it as PNG to `path`.
    pub fn render_to(&self, text: &MemeText, path: &Path) -> Result<PathBuf, RenderError> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|source| RenderError::OutputDir {
                path: parent.to_path_buf(),
                source,
            })?;
        }

        self.render(text)
            .save_with_format(path, ImageFormat::Png)
            .map_err(|source| RenderError::Encode { path: path.to_path_buf(), source })?;

        tracing::info!(path = %path.display(), "Created meme image");
        Ok(path.to_path_buf())
    }
}

fn blend(under: Rgb<u8>, over: Rgb<u8>, alpha: f32) -> Rgb<u8> {
    let mix = |a: u8, b: u8| (a as f32 * (1.0 - alpha) + b as f32 * alpha).round() as u8;
    Rgb([mix(under[0], over[0]), mix(under[1], over[1]), mix(under[2], over[2])])
}

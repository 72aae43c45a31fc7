// Color filters: closed mode enum mapped to pure per-pixel transforms

use image::{DynamicImage, Rgba, RgbaImage};
use serde::Deserialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ColorMode {
    #[default]
    Original,
    Grayscale,
    #[serde(alias = "bw")]
    BlackAndWhite,
    Invert,
    Sepia,
}

type PixelTransform = fn(Rgba<u8>) -> Rgba<u8>;

/// Luminance threshold separating black from white.
const BW_THRESHOLD: u8 = 128;

impl ColorMode {
    pub const ALL: [ColorMode; 5] = [
        ColorMode::Original,
        ColorMode::Grayscale,
        ColorMode::BlackAndWhite,
        ColorMode::Invert,
        ColorMode::Sepia,
    ];

    /// Every mode except `Original` can only be expressed by resampling pixels.
    pub fn requires_rasterization(self) -> bool {
        self.transform().is_some()
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ColorMode::Original => "original",
            ColorMode::Grayscale => "grayscale",
            ColorMode::BlackAndWhite => "black_and_white",
            ColorMode::Invert => "invert",
            ColorMode::Sepia => "sepia",
        }
    }

    /// Whether the filtered output carries no chroma and can be stored as DeviceGray.
    pub fn is_monochrome(self) -> bool {
        matches!(self, ColorMode::Grayscale | ColorMode::BlackAndWhite)
    }

    fn transform(self) -> Option<PixelTransform> {
        match self {
            ColorMode::Original => None,
            ColorMode::Grayscale => Some(grayscale),
            ColorMode::BlackAndWhite => Some(black_and_white),
            ColorMode::Invert => Some(invert),
            ColorMode::Sepia => Some(sepia),
        }
    }

    /// Applies the filter in place. `Original` leaves the pixels untouched.
    pub fn apply(self, image: &mut RgbaImage) {
        if let Some(f) = self.transform() {
            for pixel in image.pixels_mut() {
                *pixel = f(*pixel);
            }
        }
    }

    /// Converts to RGBA and applies the filter.
    pub fn apply_dynamic(self, image: &DynamicImage) -> RgbaImage {
        let mut rgba = image.to_rgba8();
        self.apply(&mut rgba);
        rgba
    }
}

/// ITU-R BT.601 luma.
fn luma(p: Rgba<u8>) -> u8 {
    let [r, g, b, _] = p.0;
    (0.299 * r as f32 + 0.587 * g as f32 + 0.114 * b as f32).round() as u8
}

fn grayscale(p: Rgba<u8>) -> Rgba<u8> {
    let y = luma(p);
    Rgba([y, y, y, p.0[3]])
}

fn black_and_white(p: Rgba<u8>) -> Rgba<u8> {
    let v = if luma(p) >= BW_THRESHOLD { 255 } else { 0 };
    Rgba([v, v, v, p.0[3]])
}

fn invert(p: Rgba<u8>) -> Rgba<u8> {
    let [r, g, b, a] = p.0;
    Rgba([255 - r, 255 - g, 255 - b, a])
}

fn sepia(p: Rgba<u8>) -> Rgba<u8> {
    let [r, g, b, a] = p.0;
    let (r, g, b) = (r as f32, g as f32, b as f32);
    let clamp = |v: f32| v.round().clamp(0.0, 255.0) as u8;
    Rgba([
        clamp(0.393 * r + 0.769 * g + 0.189 * b),
        clamp(0.349 * r + 0.686 * g + 0.168 * b),
        clamp(0.272 * r + 0.534 * g + 0.131 * b),
        a,
    ])
}

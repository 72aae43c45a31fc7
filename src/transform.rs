// Transform resolver: pure page geometry
//
// Three coordinate systems meet here:
// - crop rectangles: percent of the unrotated page box, top-left origin
// - rasters: pixels, top-left origin
// - output pages: points, bottom-left origin, rotated by /Rotate at display time

use crate::model::{CropRect, NumberingConfig, Page, Rotation, StampPosition};
use crate::pdf::content_stream::Matrix;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Size {
    pub width: f64,
    pub height: f64,
}

impl Size {
    pub fn new(width: f64, height: f64) -> Self {
        Size { width, height }
    }

    pub fn swapped(self) -> Self {
        Size {
            width: self.height,
            height: self.width,
        }
    }
}

/// Axis-aligned box in PDF user space (bottom-left origin).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PageBox {
    pub x0: f64,
    pub y0: f64,
    pub x1: f64,
    pub y1: f64,
}

impl PageBox {
    pub fn from_size(width: f64, height: f64) -> Self {
        PageBox {
            x0: 0.0,
            y0: 0.0,
            x1: width,
            y1: height,
        }
    }

    /// Normalizes corner order, as PDF allows any two opposite corners.
    pub fn from_corners(a: f64, b: f64, c: f64, d: f64) -> Self {
        PageBox {
            x0: a.min(c),
            y0: b.min(d),
            x1: a.max(c),
            y1: b.max(d),
        }
    }

    pub fn width(&self) -> f64 {
        self.x1 - self.x0
    }

    pub fn height(&self) -> f64 {
        self.y1 - self.y0
    }

    pub fn size(&self) -> Size {
        Size::new(self.width(), self.height())
    }
}

/// Size of the page as it appears on screen and in the export.
///
/// `base` is the source page's own `/Rotate`, which the preview and the
/// export add to the page rotation. Cheap and pure: called per preview
/// frame, never renders.
pub fn display_size(page: &Page, native: Size, base: Rotation) -> Size {
    let size = match &page.crop {
        Some(crop) => Size::new(
            native.width * crop.width / 100.0,
            native.height * crop.height / 100.0,
        ),
        None => native,
    };
    if base.compose(page.rotation).is_quarter_turn() {
        size.swapped()
    } else {
        size
    }
}

/// The one branch point between lossless copy and render-and-embed.
pub fn requires_rasterization(page: &Page) -> bool {
    page.color_mode.requires_rasterization()
}

/// Converts a percentage crop into a box in the page's own user space.
pub fn crop_box(crop: &CropRect, page_box: &PageBox) -> PageBox {
    let width = page_box.width();
    let height = page_box.height();
    let crop_width = crop.width / 100.0 * width;
    let crop_height = crop.height / 100.0 * height;
    let x = page_box.x0 + crop.x / 100.0 * width;
    let y = page_box.y0 + height - crop.y / 100.0 * height - crop_height;
    PageBox {
        x0: x,
        y0: y,
        x1: x + crop_width,
        y1: y + crop_height,
    }
}

/// Placement of a rasterized page: the output page is sized to the crop
/// region and the full image is drawn shifted so the crop origin lands at
/// the page origin.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RasterLayout {
    pub page: Size,
    pub image_x: f64,
    pub image_y: f64,
    pub image_width: f64,
    pub image_height: f64,
}

pub fn raster_layout(
    crop: Option<&CropRect>,
    pixel_width: u32,
    pixel_height: u32,
    scale: f64,
) -> RasterLayout {
    let image_width = pixel_width as f64 / scale;
    let image_height = pixel_height as f64 / scale;
    match crop {
        None => RasterLayout {
            page: Size::new(image_width, image_height),
            image_x: 0.0,
            image_y: 0.0,
            image_width,
            image_height,
        },
        Some(crop) => {
            let cropped = crop_box(crop, &PageBox::from_size(image_width, image_height));
            RasterLayout {
                page: cropped.size(),
                image_x: -cropped.x0,
                image_y: -cropped.y0,
                image_width,
                image_height,
            }
        }
    }
}

/// The page as the reader sees it after `/Rotate`: visible dimensions plus
/// the matrix taking visible coordinates (bottom-left origin) into user space.
#[derive(Debug, Clone, PartialEq)]
pub struct Frame {
    pub size: Size,
    pub to_user_space: Matrix,
}

/// `rotation` is the page's final `/Rotate` (clockwise at display time).
pub fn visible_frame(page_box: &PageBox, rotation: Rotation) -> Frame {
    let w = page_box.width();
    let h = page_box.height();
    let (size, m) = match rotation {
        Rotation::R0 => (Size::new(w, h), [1.0, 0.0, 0.0, 1.0, 0.0, 0.0]),
        Rotation::R90 => (Size::new(h, w), [0.0, 1.0, -1.0, 0.0, w, 0.0]),
        Rotation::R180 => (Size::new(w, h), [-1.0, 0.0, 0.0, -1.0, w, h]),
        Rotation::R270 => (Size::new(h, w), [0.0, -1.0, 1.0, 0.0, 0.0, h]),
    };
    Frame {
        size,
        to_user_space: Matrix {
            a: m[0],
            b: m[1],
            c: m[2],
            d: m[3],
            e: m[4] + page_box.x0,
            f: m[5] + page_box.y0,
        },
    }
}

/// Centers for a stamp of `stamp` size, in visible coordinates.
pub fn stamp_anchors(
    position: StampPosition,
    frame: Size,
    stamp: Size,
    margin: f64,
    grid: u32,
) -> Vec<(f64, f64)> {
    let left = margin + stamp.width / 2.0;
    let right = frame.width - margin - stamp.width / 2.0;
    let bottom = margin + stamp.height / 2.0;
    let top = frame.height - margin - stamp.height / 2.0;
    match position {
        StampPosition::TopLeft => vec![(left, top)],
        StampPosition::TopRight => vec![(right, top)],
        StampPosition::BottomLeft => vec![(left, bottom)],
        StampPosition::BottomRight => vec![(right, bottom)],
        StampPosition::Center => vec![(frame.width / 2.0, frame.height / 2.0)],
        StampPosition::Tiled => {
            let grid = grid.max(1);
            let step_x = frame.width / grid as f64;
            let step_y = frame.height / grid as f64;
            (0..grid)
                .flat_map(|row| {
                    (0..grid).map(move |col| {
                        (
                            step_x * (col as f64 + 0.5),
                            frame.height - step_y * (row as f64 + 0.5),
                        )
                    })
                })
                .collect()
        }
    }
}

/// Baseline-center point of a page number, in visible coordinates.
pub fn number_anchor(config: &NumberingConfig, frame: Size) -> (f64, f64) {
    (
        config.x_percent / 100.0 * frame.width,
        frame.height - config.y_percent / 100.0 * frame.height,
    )
}

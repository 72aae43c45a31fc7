// Watermark and page-number overlays, drawn in the page's visible frame

use crate::config::Settings;
use crate::model::{NumberingConfig, WatermarkConfig, WatermarkKind};
use crate::pdf::content_stream::{ContentBuilder, Matrix, helvetica_text_width};
use crate::pdf::writer::{ImageRef, OutputDocument, PageRef};
use crate::transform::{Frame, Size, number_anchor, stamp_anchors};

/// Fraction of the font size below the vertical center where the baseline sits.
const BASELINE_DROP: f64 = 0.35;

const NUMBER_COLOR: [f64; 3] = [0.0, 0.0, 0.0];

/// Draws `config` on the page. `image` is the embedded stamp for image
/// watermarks; an image watermark without one is skipped.
pub(crate) fn draw_watermark(
    doc: &mut OutputDocument,
    page: PageRef,
    frame: &Frame,
    config: &WatermarkConfig,
    image: Option<&ImageRef>,
    settings: &Settings,
) -> crate::error::Result<()> {
    if matches!(config.kind, WatermarkKind::Image { .. }) && image.is_none() {
        return Ok(());
    }
    let gs = doc.register_opacity(page, config.opacity)?;
    let mut ops = ContentBuilder::new();

    match &config.kind {
        WatermarkKind::Text {
            text,
            font_size,
            color,
        } => {
            let size = font_size * config.scale;
            let width = helvetica_text_width(text, size);
            let font = doc.register_font(page)?;
            let anchors = stamp_anchors(
                config.position,
                frame.size,
                Size::new(width, size),
                settings.stamp_margin,
                settings.watermark_grid,
            );
            for (cx, cy) in anchors {
                ops.save();
                ops.set_graphics_state(&gs);
                ops.concat(&anchor_matrix(frame, cx, cy, config.rotation));
                ops.draw_text(&font, size, -width / 2.0, -size * BASELINE_DROP, *color, text);
                ops.restore();
            }
        }
        WatermarkKind::Image { .. } => {
            let Some(image) = image else {
                return Ok(());
            };
            let width = image.width as f64 * config.scale;
            let height = image.height as f64 * config.scale;
            let name = doc.register_image(page, image)?;
            let anchors = stamp_anchors(
                config.position,
                frame.size,
                Size::new(width, height),
                settings.stamp_margin,
                settings.watermark_grid,
            );
            for (cx, cy) in anchors {
                ops.save();
                ops.set_graphics_state(&gs);
                ops.concat(&anchor_matrix(frame, cx, cy, config.rotation));
                ops.draw_image(&name, -width / 2.0, -height / 2.0, width, height);
                ops.restore();
            }
        }
    }

    doc.append_content(page, ops)
}

/// Draws the page number `label` centered on the configured position.
pub(crate) fn draw_page_number(
    doc: &mut OutputDocument,
    page: PageRef,
    frame: &Frame,
    config: &NumberingConfig,
    label: &str,
) -> crate::error::Result<()> {
    let font = doc.register_font(page)?;
    let (x, y) = number_anchor(config, frame.size);
    let width = helvetica_text_width(label, config.font_size);

    let mut ops = ContentBuilder::new();
    ops.save();
    ops.concat(&frame.to_user_space);
    ops.draw_text(&font, config.font_size, x - width / 2.0, y, NUMBER_COLOR, label);
    ops.restore();
    doc.append_content(page, ops)
}

/// Stamp-local coordinates (origin at the stamp center, rotated) to user space.
fn anchor_matrix(frame: &Frame, cx: f64, cy: f64, rotation: f64) -> Matrix {
    Matrix::rotate(rotation)
        .multiply(&Matrix::translate(cx, cy))
        .multiply(&frame.to_user_space)
}

use pdf_workbench::model::{CropRect, NumberingConfig, Page, PagePatch, Rotation, StampPosition};
use pdf_workbench::transform::{
    PageBox, Size, crop_box, display_size, number_anchor, raster_layout, requires_rasterization,
    stamp_anchors, visible_frame,
};
use pdf_workbench::filter::ColorMode;

fn approx(a: f64, b: f64) -> bool {
    (a - b).abs() < 1e-6
}

fn page_with(rotation: Rotation, crop: Option<CropRect>) -> Page {
    let mut page = Page::create_blank(200.0, 300.0);
    PagePatch {
        rotate_by: Some(rotation),
        crop: Some(crop),
        ..PagePatch::default()
    }
    .apply(&mut page);
    page
}

// ============================================================
// display_size
// ============================================================

#[test]
fn test_display_size_without_edits_is_native() {
    let page = page_with(Rotation::R0, None);
    assert_eq!(
        display_size(&page, Size::new(200.0, 300.0), Rotation::R0),
        Size::new(200.0, 300.0)
    );
}

#[test]
fn test_display_size_swaps_on_quarter_turns() {
    let native = Size::new(200.0, 300.0);
    for (rotation, expected) in [
        (Rotation::R90, Size::new(300.0, 200.0)),
        (Rotation::R180, Size::new(200.0, 300.0)),
        (Rotation::R270, Size::new(300.0, 200.0)),
    ] {
        assert_eq!(
            display_size(&page_with(rotation, None), native, Rotation::R0),
            expected
        );
    }
}

#[test]
fn test_display_size_applies_crop_before_rotation() {
    let crop = CropRect::new(10.0, 10.0, 50.0, 50.0).unwrap();
    let page = page_with(Rotation::R90, Some(crop));
    let size = display_size(&page, Size::new(200.0, 300.0), Rotation::R0);
    assert!(approx(size.width, 150.0));
    assert!(approx(size.height, 100.0));
}

#[test]
fn test_display_size_adds_source_rotation() {
    let native = Size::new(200.0, 100.0);
    let unrotated = page_with(Rotation::R0, None);
    assert_eq!(
        display_size(&unrotated, native, Rotation::R90),
        Size::new(100.0, 200.0)
    );
    // A quarter turn on top of the source's quarter turn is upright again.
    let turned = page_with(Rotation::R90, None);
    assert_eq!(display_size(&turned, native, Rotation::R90), native);
}

// ============================================================
// crop_box
// ============================================================

#[test]
fn test_crop_box_flips_top_left_origin() {
    // 200x300 page, crop 10%/10%, 50%x50%.
    let crop = CropRect::new(10.0, 10.0, 50.0, 50.0).unwrap();
    let b = crop_box(&crop, &PageBox::from_size(200.0, 300.0));
    assert!(approx(b.x0, 20.0));
    assert!(approx(b.y0, 120.0));
    assert!(approx(b.x1, 120.0));
    assert!(approx(b.y1, 270.0));
}

#[test]
fn test_crop_box_honors_box_origin() {
    let crop = CropRect::new(0.0, 0.0, 50.0, 50.0).unwrap();
    let b = crop_box(&crop, &PageBox::from_corners(100.0, 100.0, 300.0, 500.0));
    assert!(approx(b.x0, 100.0));
    assert!(approx(b.y0, 300.0));
    assert!(approx(b.x1, 200.0));
    assert!(approx(b.y1, 500.0));
}

#[test]
fn test_full_crop_is_whole_box() {
    let crop = CropRect::new(0.0, 0.0, 100.0, 100.0).unwrap();
    let page_box = PageBox::from_size(612.0, 792.0);
    assert_eq!(crop_box(&crop, &page_box), page_box);
}

// ============================================================
// raster_layout
// ============================================================

#[test]
fn test_raster_layout_without_crop_fills_page() {
    let layout = raster_layout(None, 400, 600, 2.0);
    assert_eq!(layout.page, Size::new(200.0, 300.0));
    assert_eq!((layout.image_x, layout.image_y), (0.0, 0.0));
    assert_eq!((layout.image_width, layout.image_height), (200.0, 300.0));
}

#[test]
fn test_raster_layout_shifts_image_by_crop_origin() {
    let crop = CropRect::new(10.0, 10.0, 50.0, 50.0).unwrap();
    let layout = raster_layout(Some(&crop), 400, 600, 2.0);
    assert!(approx(layout.page.width, 100.0));
    assert!(approx(layout.page.height, 150.0));
    assert!(approx(layout.image_x, -20.0));
    assert!(approx(layout.image_y, -120.0));
    assert!(approx(layout.image_width, 200.0));
}

// ============================================================
// Frames and anchors
// ============================================================

#[test]
fn test_visible_frame_180_maps_origin_to_far_corner() {
    let frame = visible_frame(&PageBox::from_size(200.0, 300.0), Rotation::R180);
    let m = &frame.to_user_space;
    assert_eq!(frame.size, Size::new(200.0, 300.0));
    assert_eq!((m.e, m.f), (200.0, 300.0));
    assert_eq!((m.a, m.d), (-1.0, -1.0));
}

#[test]
fn test_corner_anchors_respect_margin() {
    let frame = Size::new(600.0, 800.0);
    let stamp = Size::new(100.0, 20.0);
    let anchors = stamp_anchors(StampPosition::TopLeft, frame, stamp, 24.0, 3);
    assert_eq!(anchors.len(), 1);
    let (x, y) = anchors[0];
    assert!(approx(x, 74.0));
    assert!(approx(y, 766.0));
    let anchors = stamp_anchors(StampPosition::BottomRight, frame, stamp, 24.0, 3);
    assert_eq!(anchors.len(), 1);
    let (x, y) = anchors[0];
    assert!(approx(x, 526.0));
    assert!(approx(y, 34.0));
}

#[test]
fn test_tiled_anchors_cover_grid() {
    let anchors = stamp_anchors(
        StampPosition::Tiled,
        Size::new(300.0, 300.0),
        Size::new(10.0, 10.0),
        24.0,
        3,
    );
    assert_eq!(anchors.len(), 9);
    assert!(anchors.contains(&(150.0, 150.0)));
    assert!(anchors.contains(&(50.0, 250.0)));
}

#[test]
fn test_number_anchor_measures_from_top() {
    let config = NumberingConfig {
        x_percent: 50.0,
        y_percent: 95.0,
        ..NumberingConfig::default()
    };
    let (x, y) = number_anchor(&config, Size::new(200.0, 400.0));
    assert!(approx(x, 100.0));
    assert!(approx(y, 20.0));
}

// ============================================================
// Rasterization decision
// ============================================================

#[test]
fn test_only_color_filters_force_rasterization() {
    let mut page = page_with(
        Rotation::R90,
        Some(CropRect::new(0.0, 0.0, 50.0, 50.0).unwrap()),
    );
    assert!(!requires_rasterization(&page));
    for mode in ColorMode::ALL {
        page.color_mode = mode;
        assert_eq!(requires_rasterization(&page), mode != ColorMode::Original);
    }
}

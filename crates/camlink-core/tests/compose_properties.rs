//! Integration tests for the compositor through the public API.
//!
//! Covers the canvas size invariant across layouts and source shapes, aspect
//! preservation, and the end-to-end placement scenarios a user sees on the
//! virtual webcam.

use camlink_core::{fit_within, Compositor, Frame, LayoutMode, Rotation, SourceView};
use image::RgbImage;

const BLACK: [u8; 3] = [0, 0, 0];

fn is_lit(canvas: &RgbImage, x: u32, y: u32) -> bool {
    canvas.get_pixel(x, y).0 != BLACK
}

// ── Invariants ────────────────────────────────────────────────────────────────

#[test]
fn test_canvas_size_is_constant_for_every_layout_and_source_shape() {
    let compositor = Compositor::new(320, 180);
    let shapes = [(1, 1), (16, 9), (9, 16), (300, 7), (7, 300), (640, 480)];
    let modes = [LayoutMode::Auto, LayoutMode::FirstOnly, LayoutMode::SecondOnly];

    for &(w, h) in &shapes {
        let a = Frame::solid(w, h, [10, 200, 10]);
        let b = Frame::solid(h, w, [200, 10, 10]);
        for mode in modes {
            for rotation in Rotation::ALL {
                for mirror in [false, true] {
                    for count in 0..=3 {
                        let sources: Vec<SourceView<'_>> = [&a, &b, &a]
                            .iter()
                            .take(count)
                            .map(|f| SourceView::new(Some(*f), rotation))
                            .collect();

                        let canvas = compositor.compose(&sources, mode, mirror);

                        assert_eq!(
                            canvas.dimensions(),
                            (320, 180),
                            "{w}x{h} {mode:?} {rotation} mirror={mirror} count={count}"
                        );
                    }
                }
            }
        }
    }
}

#[test]
fn test_fit_within_preserves_aspect_and_touches_one_bound() {
    let boxes = [(1920u32, 1080u32), (960, 1080), (640, 480), (33, 17)];
    let sources = [(1u32, 1u32), (4, 3), (3, 4), (100, 50), (50, 100), (1920, 1080), (7, 300)];

    for &(bw, bh) in &boxes {
        for &(sw, sh) in &sources {
            // Act
            let (w, h) = fit_within(sw, sh, bw, bh);

            // Assert: fits, touches a bound, and is within one pixel of the
            // exact aspect on the non-binding axis
            assert!(w <= bw && h <= bh, "{sw}x{sh} in {bw}x{bh} -> {w}x{h}");
            assert!(w == bw || h == bh, "{sw}x{sh} in {bw}x{bh} -> {w}x{h}");
            let exact_h = f64::from(w) * f64::from(sh) / f64::from(sw);
            let exact_w = f64::from(h) * f64::from(sw) / f64::from(sh);
            assert!(
                (f64::from(h) - exact_h).abs() <= 1.0 || (f64::from(w) - exact_w).abs() <= 1.0,
                "{sw}x{sh} in {bw}x{bh} -> {w}x{h} distorts the aspect ratio"
            );
        }
    }
}

// ── Scenarios ─────────────────────────────────────────────────────────────────

#[test]
fn test_no_active_endpoints_gives_black_canvas() {
    let canvas = Compositor::new(1920, 1080).compose(&[], LayoutMode::Auto, true);
    assert!(canvas.pixels().all(|p| p.0 == BLACK));
}

#[test]
fn test_rotated_landscape_is_pillarboxed_in_the_centre() {
    // Arrange: a 100×50 frame rotated 90° becomes 50×100, which fits a
    // 1920×1080 canvas as 540×1080 at x = 690
    let compositor = Compositor::new(1920, 1080);
    let frame = Frame::solid(100, 50, [200, 200, 200]);

    // Act
    let canvas = compositor.compose(
        &[SourceView::new(Some(&frame), Rotation::Deg90)],
        LayoutMode::Auto,
        false,
    );

    // Assert
    assert!(!is_lit(&canvas, 689, 540));
    assert!(is_lit(&canvas, 690, 540));
    assert!(is_lit(&canvas, 1229, 540));
    assert!(!is_lit(&canvas, 1230, 540));
    assert!(is_lit(&canvas, 960, 0));
    assert!(is_lit(&canvas, 960, 1079));
}

#[test]
fn test_split_with_mirror_shows_first_endpoint_on_the_right() {
    // Arrange
    let compositor = Compositor::new(1920, 1080);
    let first = Frame::solid(960, 1080, [255, 0, 0]);
    let second = Frame::solid(960, 1080, [0, 0, 255]);
    let sources = [
        SourceView::new(Some(&first), Rotation::Deg0),
        SourceView::new(Some(&second), Rotation::Deg0),
    ];

    // Act
    let canvas = compositor.compose(&sources, LayoutMode::Auto, true);

    // Assert
    assert_eq!(canvas.get_pixel(100, 540).0, [0, 0, 255]);
    assert_eq!(canvas.get_pixel(1800, 540).0, [255, 0, 0]);
}

#[test]
fn test_third_endpoint_is_never_shown() {
    let compositor = Compositor::new(40, 10);
    let a = Frame::solid(20, 10, [255, 0, 0]);
    let b = Frame::solid(20, 10, [0, 255, 0]);
    let c = Frame::solid(20, 10, [0, 0, 255]);

    let canvas = compositor.compose(
        &[
            SourceView::new(Some(&a), Rotation::Deg0),
            SourceView::new(Some(&b), Rotation::Deg0),
            SourceView::new(Some(&c), Rotation::Deg0),
        ],
        LayoutMode::Auto,
        false,
    );

    assert!(canvas.pixels().all(|p| p.0 != [0, 0, 255]));
}

use serde::{Deserialize, Serialize};

/// Width/height pair in viewport units.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Size {
    pub width: f64,
    pub height: f64,
}

impl Size {
    pub const fn new(width: f64, height: f64) -> Self {
        Self { width, height }
    }

    /// A viewport with a zero, negative or NaN dimension cannot anchor a region.
    pub fn is_degenerate(&self) -> bool {
        !(self.width > 0.0 && self.height > 0.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Rect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl Rect {
    pub const fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    pub fn max_x(&self) -> f64 {
        self.x + self.width
    }

    pub fn max_y(&self) -> f64 {
        self.y + self.height
    }
}

/// Minimum size and edge margin every region is clamped against.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RegionLimits {
    pub min_size: f64,
    pub margin: f64,
}

impl Default for RegionLimits {
    fn default() -> Self {
        Self {
            min_size: 100.0,
            margin: 16.0,
        }
    }
}

/// The user-adjustable region of interest, in the coordinates of the viewport
/// it was last computed against.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Region {
    pub rect: Rect,
    pub viewport: Size,
}

impl Region {
    pub fn new(rect: Rect, viewport: Size) -> Self {
        Self { rect, viewport }
    }

    /// Centered square covering `fraction` of the shorter viewport side,
    /// clamped like any other region.
    pub fn initial(viewport: Size, limits: &RegionLimits, fraction: f64) -> Self {
        if viewport.is_degenerate() {
            return Self::new(Rect::default(), viewport);
        }
        let side = viewport.width.min(viewport.height) * fraction.clamp(0.0, 1.0);
        let proposed = Rect::new(
            (viewport.width - side) / 2.0,
            (viewport.height - side) / 2.0,
            side,
            side,
        );
        clamp_to_viewport(proposed, viewport, limits)
    }

    pub fn meets_minimum(&self, min_size: f64) -> bool {
        self.rect.width >= min_size && self.rect.height >= min_size
    }

    /// Region expressed as fractions of its viewport, top-left origin.
    pub fn normalized(&self) -> NormalizedRect {
        if self.viewport.is_degenerate() {
            return NormalizedRect::FULL;
        }
        NormalizedRect::new(
            self.rect.x / self.viewport.width,
            self.rect.y / self.viewport.height,
            self.rect.width / self.viewport.width,
            self.rect.height / self.viewport.height,
        )
    }
}

/// Rectangle in the 0-1 range of a frame, independent of resolution.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct NormalizedRect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl NormalizedRect {
    pub const FULL: NormalizedRect = NormalizedRect {
        x: 0.0,
        y: 0.0,
        width: 1.0,
        height: 1.0,
    };

    /// Builds a rect clipped to the unit square.
    pub fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        let x0 = unit(x);
        let y0 = unit(y);
        let x1 = unit(x + width).max(x0);
        let y1 = unit(y + height).max(y0);
        Self {
            x: x0,
            y: y0,
            width: x1 - x0,
            height: y1 - y0,
        }
    }

    /// Pixel rectangle inside a `frame_width` x `frame_height` image. Never
    /// empty as long as the image itself is not.
    pub fn to_pixels(&self, frame_width: u32, frame_height: u32) -> PixelRect {
        let fw = f64::from(frame_width);
        let fh = f64::from(frame_height);
        let x = ((self.x * fw).floor() as u32).min(frame_width.saturating_sub(1));
        let y = ((self.y * fh).floor() as u32).min(frame_height.saturating_sub(1));
        let width = ((self.width * fw).round() as u32).clamp(1, (frame_width - x).max(1));
        let height = ((self.height * fh).round() as u32).clamp(1, (frame_height - y).max(1));
        PixelRect {
            x,
            y,
            width,
            height,
        }
    }
}

fn unit(value: f64) -> f64 {
    if value.is_nan() {
        0.0
    } else {
        value.clamp(0.0, 1.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PixelRect {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

/// Rescales `region` from `old_viewport` to `new_viewport` and clamps the
/// result back inside the new viewport.
///
/// A degenerate viewport on either side returns the region untouched. When the
/// viewport is narrower than `2 * margin + min_size` the region is anchored at
/// the margin and overhangs the far edge; that is the only case in which the
/// output is not fully contained.
pub fn resize(
    region: &Region,
    old_viewport: Size,
    new_viewport: Size,
    limits: &RegionLimits,
) -> Region {
    if old_viewport.is_degenerate() || new_viewport.is_degenerate() {
        return *region;
    }

    let scale_x = new_viewport.width / old_viewport.width;
    let scale_y = new_viewport.height / old_viewport.height;
    let scaled = Rect::new(
        region.rect.x * scale_x,
        region.rect.y * scale_y,
        region.rect.width * scale_x,
        region.rect.height * scale_y,
    );

    clamp_to_viewport(scaled, new_viewport, limits)
}

/// Applies a user drag or pinch. The proposed rectangle is clamped against the
/// region's current viewport with the same rules as [`resize`].
pub fn adjust(region: &Region, proposed: Rect, limits: &RegionLimits) -> Region {
    if region.viewport.is_degenerate() {
        return *region;
    }
    clamp_to_viewport(proposed, region.viewport, limits)
}

fn clamp_to_viewport(rect: Rect, viewport: Size, limits: &RegionLimits) -> Region {
    let width = clamp_extent(rect.width, viewport.width, limits);
    let height = clamp_extent(rect.height, viewport.height, limits);
    let x = clamp_origin(rect.x, width, viewport.width, limits.margin);
    let y = clamp_origin(rect.y, height, viewport.height, limits.margin);

    Region::new(Rect::new(x, y, width, height), viewport)
}

// Minimum size wins when the viewport is too small to honor both bounds.
fn clamp_extent(extent: f64, viewport_extent: f64, limits: &RegionLimits) -> f64 {
    let upper = viewport_extent - 2.0 * limits.margin;
    let extent = if extent.is_nan() { limits.min_size } else { extent };
    extent.min(upper).max(limits.min_size)
}

fn clamp_origin(origin: f64, extent: f64, viewport_extent: f64, margin: f64) -> f64 {
    let origin = if origin.is_nan() { margin } else { origin };
    let mut origin = origin.max(margin);
    if origin + extent > viewport_extent - margin {
        origin = viewport_extent - margin - extent;
    }
    // Leading margin is never given up, even if the far edge overhangs.
    origin.max(margin)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    const EPS: f64 = 1e-9;

    fn limits() -> RegionLimits {
        RegionLimits {
            min_size: 100.0,
            margin: 16.0,
        }
    }

    fn assert_contained(region: &Region, limits: &RegionLimits) {
        let r = region.rect;
        let v = region.viewport;
        assert!(r.width >= limits.min_size - EPS, "width {r:?}");
        assert!(r.height >= limits.min_size - EPS, "height {r:?}");
        assert!(r.x >= limits.margin - EPS, "left edge {r:?}");
        assert!(r.y >= limits.margin - EPS, "top edge {r:?}");
        assert!(r.max_x() <= v.width - limits.margin + EPS, "right edge {r:?} in {v:?}");
        assert!(r.max_y() <= v.height - limits.margin + EPS, "bottom edge {r:?} in {v:?}");
    }

    #[test]
    fn doubling_the_viewport_doubles_the_region() {
        let region = Region::new(Rect::new(10.0, 10.0, 80.0, 80.0), Size::new(300.0, 300.0));

        let resized = resize(
            &region,
            Size::new(300.0, 300.0),
            Size::new(600.0, 600.0),
            &limits(),
        );

        assert_eq!(resized.rect, Rect::new(20.0, 20.0, 160.0, 160.0));
        assert_eq!(resized.viewport, Size::new(600.0, 600.0));
    }

    #[test]
    fn degenerate_viewport_returns_region_unchanged() {
        let region = Region::new(Rect::new(30.0, 40.0, 120.0, 150.0), Size::new(400.0, 800.0));

        let from_zero = resize(&region, Size::new(0.0, 800.0), Size::new(400.0, 800.0), &limits());
        let to_zero = resize(&region, Size::new(400.0, 800.0), Size::new(400.0, 0.0), &limits());

        assert_eq!(from_zero, region);
        assert_eq!(to_zero, region);
    }

    #[test]
    fn same_viewport_is_a_no_op_for_valid_regions() {
        let viewport = Size::new(390.0, 844.0);
        let regions = [
            Rect::new(16.0, 16.0, 100.0, 100.0),
            Rect::new(45.0, 200.0, 300.0, 300.0),
            Rect::new(16.0, 16.0, 358.0, 812.0),
            Rect::new(274.0, 728.0, 100.0, 100.0),
        ];

        for rect in regions {
            let region = Region::new(rect, viewport);
            assert_eq!(resize(&region, viewport, viewport, &limits()), region);
        }
    }

    #[test]
    fn rotation_keeps_region_inside_the_new_viewport() {
        let portrait = Size::new(390.0, 844.0);
        let landscape = Size::new(844.0, 390.0);
        let region = Region::new(Rect::new(20.0, 500.0, 350.0, 320.0), portrait);

        let rotated = resize(&region, portrait, landscape, &limits());

        assert_contained(&rotated, &limits());
    }

    #[test]
    fn oversized_region_is_shrunk_to_the_margins() {
        let viewport = Size::new(500.0, 500.0);
        let region = Region::new(Rect::new(0.0, 0.0, 500.0, 500.0), viewport);

        let resized = resize(&region, viewport, viewport, &limits());

        assert_eq!(resized.rect, Rect::new(16.0, 16.0, 468.0, 468.0));
    }

    #[test]
    fn shrinking_below_minimum_size_is_clamped_up() {
        let region = Region::new(Rect::new(100.0, 100.0, 100.0, 100.0), Size::new(1000.0, 1000.0));

        let resized = resize(
            &region,
            Size::new(1000.0, 1000.0),
            Size::new(400.0, 400.0),
            &limits(),
        );

        assert_eq!(resized.rect.width, 100.0);
        assert_eq!(resized.rect.height, 100.0);
        assert_contained(&resized, &limits());
    }

    // A viewport narrower than 2 * margin + min_size cannot contain a legal
    // region. The region stays anchored at the margin and overhangs the far
    // edge instead of being pushed past the leading margin.
    #[test]
    fn tiny_viewport_anchors_at_margin_and_overhangs_far_edge() {
        let region = Region::new(Rect::new(50.0, 50.0, 200.0, 200.0), Size::new(400.0, 400.0));
        let tiny = Size::new(120.0, 400.0);

        let resized = resize(&region, Size::new(400.0, 400.0), tiny, &limits());

        assert_eq!(resized.rect.x, 16.0);
        assert_eq!(resized.rect.width, 100.0);
        assert!(resized.rect.max_x() > tiny.width - 16.0);
        // The other axis is unaffected by the relaxation.
        assert!(resized.rect.y >= 16.0);
        assert!(resized.rect.max_y() <= 400.0 - 16.0);
    }

    #[test]
    fn sampled_resizes_satisfy_containment() {
        let mut rng = StdRng::seed_from_u64(0x5eed);
        let limits = limits();
        let floor = 2.0 * limits.margin + limits.min_size;

        for _ in 0..2_000 {
            let old = Size::new(rng.random_range(floor..2_000.0), rng.random_range(floor..2_000.0));
            let new = Size::new(rng.random_range(floor..2_000.0), rng.random_range(floor..2_000.0));
            let width = rng.random_range(limits.min_size..=old.width - 2.0 * limits.margin);
            let height = rng.random_range(limits.min_size..=old.height - 2.0 * limits.margin);
            let x = rng.random_range(limits.margin..=old.width - limits.margin - width);
            let y = rng.random_range(limits.margin..=old.height - limits.margin - height);
            let region = Region::new(Rect::new(x, y, width, height), old);

            let resized = resize(&region, old, new, &limits);

            assert_contained(&resized, &limits);
        }
    }

    #[test]
    fn adjust_clamps_a_drag_past_the_edge() {
        let viewport = Size::new(400.0, 800.0);
        let region = Region::initial(viewport, &limits(), 0.6);

        let dragged = adjust(&region, Rect::new(-50.0, 760.0, 240.0, 240.0), &limits());

        assert_eq!(dragged.rect, Rect::new(16.0, 544.0, 240.0, 240.0));
    }

    #[test]
    fn initial_region_is_centered() {
        let region = Region::initial(Size::new(400.0, 800.0), &limits(), 0.5);

        assert_eq!(region.rect, Rect::new(100.0, 300.0, 200.0, 200.0));
        assert_contained(&region, &limits());
    }

    #[test]
    fn initial_region_on_unknown_viewport_fails_minimum() {
        let region = Region::initial(Size::default(), &limits(), 0.6);

        assert!(!region.meets_minimum(limits().min_size));
    }

    #[test]
    fn normalized_region_maps_to_pixels() {
        let region = Region::new(Rect::new(100.0, 200.0, 200.0, 400.0), Size::new(400.0, 800.0));

        let roi = region.normalized();
        assert_eq!(roi, NormalizedRect::new(0.25, 0.25, 0.5, 0.5));

        let pixels = roi.to_pixels(1920, 1080);
        assert_eq!(
            pixels,
            PixelRect {
                x: 480,
                y: 270,
                width: 960,
                height: 540
            }
        );
    }

    #[test]
    fn normalized_rect_is_clipped_to_unit_square() {
        let roi = NormalizedRect::new(0.8, -0.2, 0.5, 0.5);

        assert!((roi.x - 0.8).abs() < EPS);
        assert_eq!(roi.y, 0.0);
        assert!((roi.width - 0.2).abs() < EPS);
        assert!((roi.height - 0.3).abs() < EPS);
    }
}

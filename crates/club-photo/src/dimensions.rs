/// Target dimensions for the final 4:5 crop, keyed off the smaller source
/// dimension (spec §4.8 step 4b).
pub fn target_dimensions(src_width: u32, src_height: u32) -> (u32, u32) {
    let min_dim = src_width.min(src_height);
    if min_dim < 600 {
        (600, 750)
    } else if min_dim >= 2000 {
        (1200, 1500)
    } else {
        (800, 1000)
    }
}

/// Center crop box within the source that has exactly a 4:5 aspect ratio,
/// as large as the source allows.
pub fn center_crop_box(src_width: u32, src_height: u32) -> (u32, u32, u32, u32) {
    let target_ratio = 4.0 / 5.0;
    let src_ratio = src_width as f64 / src_height as f64;

    let (crop_w, crop_h) = if src_ratio > target_ratio {
        let crop_h = src_height;
        let crop_w = (crop_h as f64 * target_ratio).round() as u32;
        (crop_w.min(src_width), crop_h)
    } else {
        let crop_w = src_width;
        let crop_h = (crop_w as f64 / target_ratio).round() as u32;
        (crop_w, crop_h.min(src_height))
    };

    let x = (src_width - crop_w) / 2;
    let y = (src_height - crop_h) / 2;
    (x, y, crop_w, crop_h)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn small_source_uses_smallest_target() {
        assert_eq!(target_dimensions(500, 900), (600, 750));
    }

    #[test]
    fn large_source_uses_largest_target() {
        assert_eq!(target_dimensions(2200, 3000), (1200, 1500));
    }

    #[test]
    fn min_dimension_exactly_2000_uses_largest_target() {
        assert_eq!(target_dimensions(3000, 2000), (1200, 1500));
    }

    #[test]
    fn mid_source_uses_mid_target() {
        assert_eq!(target_dimensions(1200, 1600), (800, 1000));
    }

    #[test]
    fn crop_box_is_4_5_for_wide_source() {
        let (_, _, w, h) = center_crop_box(2000, 1500);
        assert!((w as f64 / h as f64 - 0.8).abs() < 0.01);
    }

    #[test]
    fn crop_box_is_4_5_for_tall_source() {
        let (_, _, w, h) = center_crop_box(1000, 3000);
        assert!((w as f64 / h as f64 - 0.8).abs() < 0.01);
    }

    #[test]
    fn crop_box_centered() {
        let (x, y, w, h) = center_crop_box(1000, 1000);
        assert_eq!(w, 800);
        assert_eq!(h, 1000);
        assert_eq!(x, 100);
        assert_eq!(y, 0);
    }
}

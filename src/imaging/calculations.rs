//! Pure calculation functions for image dimensions.
//!
//! All functions here are pure and testable without any I/O or images.
//! Arithmetic is integer (truncating) and widened to 64 bits, so results are
//! identical on every platform.

/// Largest rectangle inside `target` with the source's aspect ratio.
///
/// One axis matches the target exactly; the other may come out smaller.
/// Callers must pass a non-empty source.
///
/// ```
/// # use simple_img::imaging::clip_dimensions;
/// // 200x100 into a 50x50 box → 50x25
/// assert_eq!(clip_dimensions((200, 100), (50, 50)), (50, 25));
/// ```
pub fn clip_dimensions(source: (u32, u32), target: (u32, u32)) -> (u32, u32) {
    let (fit_w, fit_h) = fitted_axes(source, target);
    let (tgt_w, tgt_h) = target;

    if fit_w <= u64::from(tgt_w) {
        // Source is relatively taller: height matches
        (fit_w as u32, tgt_h)
    } else {
        (tgt_w, fit_h.min(u64::from(tgt_h)) as u32)
    }
}

/// Smallest aspect-preserving size that covers `target` on both axes.
///
/// One axis matches the target exactly; the other may exceed it. The
/// truncating formulas can land one pixel short, so the result is widened to
/// at least the target on both axes.
///
/// ```
/// # use simple_img::imaging::cover_dimensions;
/// // 200x100 to cover 50x50 → 100x50
/// assert_eq!(cover_dimensions((200, 100), (50, 50)), (100, 50));
/// ```
pub fn cover_dimensions(source: (u32, u32), target: (u32, u32)) -> (u32, u32) {
    let (fit_w, fit_h) = fitted_axes(source, target);
    let (tgt_w, tgt_h) = target;

    if fit_w > u64::from(tgt_w) {
        // Source is wider: crop horizontally
        (saturate(fit_w), tgt_h)
    } else {
        (tgt_w, saturate(fit_h).max(tgt_h))
    }
}

/// Top-left corner of a `window` cut from an image of size `scaled`, centered
/// at (`center_x`%, `center_y`%) of the image and clamped inside it.
pub fn crop_origin(
    scaled: (u32, u32),
    window: (u32, u32),
    center: (u32, u32),
) -> (u32, u32) {
    (
        axis_origin(scaled.0, window.0, center.0),
        axis_origin(scaled.1, window.1, center.1),
    )
}

fn axis_origin(extent: u32, size: u32, center_percent: u32) -> u32 {
    let center = i64::from(center_percent) * i64::from(extent) / 100;
    let max = i64::from(extent) - i64::from(size);
    (center - i64::from(size) / 2).min(max).max(0) as u32
}

/// Width for the target height, and height for the target width, at the
/// source's aspect ratio.
fn fitted_axes(source: (u32, u32), target: (u32, u32)) -> (u64, u64) {
    let (src_w, src_h) = (u64::from(source.0), u64::from(source.1));
    let (tgt_w, tgt_h) = (u64::from(target.0), u64::from(target.1));
    (tgt_h * src_w / src_h, tgt_w * src_h / src_w)
}

fn saturate(v: u64) -> u32 {
    v.min(u64::from(u32::MAX)) as u32
}

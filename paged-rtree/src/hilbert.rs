//! Hilbert curve ordering used by bulk loading.
//!
//! Points close on the plane stay close along the curve, so inserting
//! entries in curve order fills leaves with spatial neighbours.

use crate::bounding_box::BoundingBox;

/// Curve order used by [`DiskRTree::bulk_load`](crate::DiskRTree::bulk_load):
/// a 65536 x 65536 grid
pub const DEFAULT_ORDER: u32 = 16;

/// Highest order whose index still fits in a `u64`
pub const MAX_ORDER: u32 = 32;

/// Position along the Hilbert curve of a point in the unit square.
///
/// Coordinates outside `[0, 1]` are clamped. `order` is clamped to
/// `1..=MAX_ORDER`; the result is below `4^order`.
pub fn hilbert_index(x: f64, y: f64, order: u32) -> u64 {
    let order = order.clamp(1, MAX_ORDER);
    let n = 1u64 << order;
    xy2d(n, to_cell(x, n), to_cell(y, n))
}

/// Like [`hilbert_index`], for a point expressed in the coordinate space of
/// `bounds`. A degenerate axis maps to the middle of the curve's range.
pub fn hilbert_index_bounded(x: f64, y: f64, bounds: &BoundingBox, order: u32) -> u64 {
    hilbert_index(
        normalize(x, bounds.min_x, bounds.max_x),
        normalize(y, bounds.min_y, bounds.max_y),
        order,
    )
}

fn normalize(value: f64, min: f64, max: f64) -> f64 {
    let range = max - min;
    if range > 0.0 {
        (value - min) / range
    } else {
        0.5
    }
}

fn to_cell(value: f64, n: u64) -> u64 {
    let clamped = if value.is_nan() { 0.0 } else { value.clamp(0.0, 1.0) };
    ((clamped * n as f64) as u64).min(n - 1)
}

/// Grid cell to curve distance, rotating the quadrant frame at each level
fn xy2d(n: u64, mut x: u64, mut y: u64) -> u64 {
    let mut d = 0u64;
    let mut s = n / 2;
    while s > 0 {
        let rx = u64::from(x & s > 0);
        let ry = u64::from(y & s > 0);
        d += s * s * ((3 * rx) ^ ry);
        if ry == 0 {
            if rx == 1 {
                x = n - 1 - x;
                y = n - 1 - y;
            }
            std::mem::swap(&mut x, &mut y);
        }
        s /= 2;
    }
    d
}

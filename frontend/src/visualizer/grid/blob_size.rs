//! Mapping from a bucket's difference count to a blob radius
//!
//! Counts grow logarithmically so a bucket with thousands of differences
//! stays inside its cell while a single difference is still visible.

/// Smallest radius drawn for a non-empty bucket.
pub const VALUE_FLOOR: f64 = 2.0;
/// Counts below this are not drawn.
pub const MINIMUM_IN: u32 = 1;
/// Count at which the transform reaches the maximum radius.
pub const MAXIMUM_CUT_OFF: f64 = 100.0;

/// Radius for `count` given the largest radius a cell can hold.
///
/// Zero for empty buckets, [`VALUE_FLOOR`] for a single difference and
/// `maximum` at [`MAXIMUM_CUT_OFF`]. Larger counts keep growing and are
/// clamped by [`limit`].
pub fn transform_bucket_size(count: u32, maximum: f64) -> f64 {
    if count < MINIMUM_IN {
        return 0.0;
    }
    let scale = (maximum - VALUE_FLOOR) / MAXIMUM_CUT_OFF.ln();
    VALUE_FLOOR + scale * f64::from(count).ln()
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Limited {
    pub value: f64,
    /// Set when `value` had to be clamped; such blobs get a thicker outline.
    pub limited: bool,
}

pub fn limit(value: f64, maximum: f64) -> Limited {
    if value > maximum {
        Limited {
            value: maximum,
            limited: true,
        }
    } else {
        Limited {
            value,
            limited: false,
        }
    }
}

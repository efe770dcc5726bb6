pub trait FloatExt: Copy {
    fn approximately_eq(self, other: Self) -> bool;

    /// True when `self` and `other` differ by at most `tolerance` relative to the
    /// larger magnitude. Values below `EPSILON` in magnitude compare absolutely.
    fn relative_eq(self, other: Self, tolerance: Self) -> bool;
}

impl FloatExt for f32 {
    fn approximately_eq(self, other: Self) -> bool {
        (self - other).abs() < crate::EPSILON as f32
    }

    fn relative_eq(self, other: Self, tolerance: Self) -> bool {
        let scale = self.abs().max(other.abs());
        if scale < crate::EPSILON as f32 {
            return self.approximately_eq(other);
        }
        (self - other).abs() <= tolerance * scale
    }
}

impl FloatExt for f64 {
    fn approximately_eq(self, other: Self) -> bool {
        (self - other).abs() < crate::EPSILON
    }

    fn relative_eq(self, other: Self, tolerance: Self) -> bool {
        let scale = self.abs().max(other.abs());
        if scale < crate::EPSILON {
            return self.approximately_eq(other);
        }
        (self - other).abs() <= tolerance * scale
    }
}

/// Largest relative difference between two equally sized slices.
///
/// Pairs where both values are below `EPSILON` in magnitude contribute their
/// absolute difference instead.
pub fn max_relative_diff(a: &[f32], b: &[f32]) -> f32 {
    assert_eq!(a.len(), b.len(), "length mismatch");
    a.iter()
        .zip(b)
        .map(|(&x, &y)| {
            let scale = x.abs().max(y.abs());
            if scale < crate::EPSILON as f32 {
                (x - y).abs()
            } else {
                (x - y).abs() / scale
            }
        })
        .fold(0.0, f32::max)
}

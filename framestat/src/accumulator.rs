//! Mergeable per-element variance accumulators.
//!
//! An [`Accumulator`] holds, for every signal element, the sum of squared
//! deviations from the running mean (`variance_sum`, i.e. variance times N) and
//! the running sum of raw values (`value_sum`), together with the number of frames
//! N both arrays describe.
//!
//! Two accumulators over the same elements are combined with the pairwise update of
//! Chan, Golub and LeVeque (see also Schubert & Gertz, "Numerically Stable Parallel
//! Computation of (Co-)Variance", doi:10.1145/3221269.3223036):
//!
//! ```text
//! delta         = mean_B - mean_A
//! mean          = mean_A + N_B * delta / N
//! variance_sum' = variance_sum_A + variance_sum_B + N_B * delta * (mean_B - mean)
//! value_sum'    = value_sum_A + value_sum_B
//! ```
//!
//! The update does not depend on how the frames were grouped, so any merge tree
//! gives the same result up to rounding. Storage is `f32`; the per-element update is
//! evaluated in `f64`.

use rayon::prelude::*;

use crate::error::Error;

/// Elements handed to one rayon task by the elementwise kernels (16KB of f32s).
pub(crate) const ACCUMULATE_CHUNK_SIZE: usize = 4096;

/// Unnormalized variance sum, value sum and frame count over a set of elements.
#[derive(Debug, Clone, PartialEq)]
pub struct Accumulator {
    variance_sum: Vec<f32>,
    value_sum: Vec<f32>,
    count: u64,
}

impl Accumulator {
    /// An accumulator over `len` elements that has seen no frames.
    pub fn empty(len: usize) -> Self {
        Self {
            variance_sum: vec![0.0; len],
            value_sum: vec![0.0; len],
            count: 0,
        }
    }

    /// Wraps existing sums, e.g. read back from result buffers.
    ///
    /// Fails if the two arrays differ in length.
    pub fn from_parts(
        variance_sum: Vec<f32>,
        value_sum: Vec<f32>,
        count: u64,
    ) -> Result<Self, Error> {
        if variance_sum.len() != value_sum.len() {
            return Err(Error::ShapeMismatch {
                expected: variance_sum.len(),
                actual: value_sum.len(),
            });
        }
        Ok(Self {
            variance_sum,
            value_sum,
            count,
        })
    }

    /// Contribution of a dense `[frames, len]` block of samples.
    ///
    /// `variance_sum` is the plain sum of squared deviations from the block's own
    /// per-element mean, not divided by anything.
    pub(crate) fn from_frames(data: &[f32], frames: usize, len: usize) -> Self {
        debug_assert!(frames > 0);
        debug_assert_eq!(data.len(), frames * len);

        let mut variance_sum = vec![0.0f32; len];
        let mut value_sum = vec![0.0f32; len];

        value_sum
            .par_chunks_mut(ACCUMULATE_CHUNK_SIZE)
            .zip(variance_sum.par_chunks_mut(ACCUMULATE_CHUNK_SIZE))
            .enumerate()
            .for_each(|(chunk_idx, (sums, vars))| {
                let offset = chunk_idx * ACCUMULATE_CHUNK_SIZE;
                frames_chunk_stats(data, frames, len, offset, sums, vars);
            });

        Self {
            variance_sum,
            value_sum,
            count: frames as u64,
        }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.value_sum.len()
    }

    /// True when no frames have been folded in.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    #[inline]
    pub fn count(&self) -> u64 {
        self.count
    }

    #[inline]
    pub fn variance_sum(&self) -> &[f32] {
        &self.variance_sum
    }

    #[inline]
    pub fn value_sum(&self) -> &[f32] {
        &self.value_sum
    }

    pub fn into_parts(self) -> (Vec<f32>, Vec<f32>, u64) {
        (self.variance_sum, self.value_sum, self.count)
    }

    /// Combine two accumulators over the same elements.
    ///
    /// Consumes both inputs; the returned accumulator is the only valid one
    /// afterwards. An empty operand on either side yields the other unchanged.
    pub fn merge(mut self, other: Self) -> Result<Self, Error> {
        if self.len() != other.len() {
            return Err(Error::ShapeMismatch {
                expected: self.len(),
                actual: other.len(),
            });
        }
        if self.count == 0 {
            return Ok(other);
        }
        if other.count == 0 {
            return Ok(self);
        }

        self.count = merge_into(
            &mut self.variance_sum,
            &mut self.value_sum,
            self.count,
            &other.variance_sum,
            &other.value_sum,
            other.count,
        );
        Ok(self)
    }
}

/// Merge `src` (N = `n_src`) into `dst` (N = `n_dst`) in place and return the
/// combined count.
///
/// `n_dst == 0` copies `src` over `dst` bit for bit; `n_src == 0` leaves `dst`
/// untouched.
pub(crate) fn merge_into(
    dst_var: &mut [f32],
    dst_sum: &mut [f32],
    n_dst: u64,
    src_var: &[f32],
    src_sum: &[f32],
    n_src: u64,
) -> u64 {
    debug_assert_eq!(dst_var.len(), dst_sum.len());
    debug_assert_eq!(dst_var.len(), src_var.len());
    debug_assert_eq!(dst_var.len(), src_sum.len());

    if n_src == 0 {
        return n_dst;
    }
    if n_dst == 0 {
        dst_var.copy_from_slice(src_var);
        dst_sum.copy_from_slice(src_sum);
        return n_src;
    }

    let n_a = n_dst as f64;
    let n_b = n_src as f64;

    if dst_var.len() <= ACCUMULATE_CHUNK_SIZE {
        merge_chunk(dst_var, dst_sum, src_var, src_sum, n_a, n_b);
    } else {
        dst_var
            .par_chunks_mut(ACCUMULATE_CHUNK_SIZE)
            .zip(dst_sum.par_chunks_mut(ACCUMULATE_CHUNK_SIZE))
            .zip(
                src_var
                    .par_chunks(ACCUMULATE_CHUNK_SIZE)
                    .zip(src_sum.par_chunks(ACCUMULATE_CHUNK_SIZE)),
            )
            .for_each(|((dv, ds), (sv, ss))| merge_chunk(dv, ds, sv, ss, n_a, n_b));
    }

    n_dst + n_src
}

#[inline]
fn merge_chunk(
    dst_var: &mut [f32],
    dst_sum: &mut [f32],
    src_var: &[f32],
    src_sum: &[f32],
    n_a: f64,
    n_b: f64,
) {
    let n = n_a + n_b;
    for (((var_a, sum_a), &var_b), &sum_b) in dst_var
        .iter_mut()
        .zip(dst_sum.iter_mut())
        .zip(src_var)
        .zip(src_sum)
    {
        let mean_a = *sum_a as f64 / n_a;
        let mean_b = sum_b as f64 / n_b;
        let delta = mean_b - mean_a;
        let mean = mean_a + n_b * delta / n;
        let delta_p = mean_b - mean;

        *var_a = (*var_a as f64 + var_b as f64 + n_b * delta * delta_p) as f32;
        *sum_a = (*sum_a as f64 + sum_b as f64) as f32;
    }
}

/// Sum and sum of squared deviations for elements `offset..offset + sums.len()`
/// of a `[frames, len]` block.
fn frames_chunk_stats(
    data: &[f32],
    frames: usize,
    len: usize,
    offset: usize,
    sums: &mut [f32],
    vars: &mut [f32],
) {
    let width = sums.len();
    let mut acc = vec![0.0f64; width];
    for frame in 0..frames {
        let row = &data[frame * len + offset..][..width];
        for (a, &v) in acc.iter_mut().zip(row) {
            *a += v as f64;
        }
    }

    for (s, &a) in sums.iter_mut().zip(&acc) {
        *s = a as f32;
    }

    // acc becomes the per-element mean
    let inv_frames = 1.0 / frames as f64;
    for a in acc.iter_mut() {
        *a *= inv_frames;
    }

    let mut squares = vec![0.0f64; width];
    for frame in 0..frames {
        let row = &data[frame * len + offset..][..width];
        for ((q, &mean), &v) in squares.iter_mut().zip(&acc).zip(row) {
            let d = v as f64 - mean;
            *q += d * d;
        }
    }

    for (out, &q) in vars.iter_mut().zip(&squares) {
        *out = q as f32;
    }
}

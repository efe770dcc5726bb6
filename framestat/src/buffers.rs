//! Host-owned result storage the accumulation steps write into.

use crate::accumulator::Accumulator;
use crate::error::Error;
use crate::region::RegionCounts;
use crate::shape::SigShape;

/// Signal-shaped `var` / `sum_frame` arrays plus the per-region `num_frame` counts.
///
/// `var` holds the unnormalized variance sum and `sum_frame` the raw value sum for
/// every signal element. Both are zero until the first tile for a region arrives.
#[derive(Debug, Clone, PartialEq)]
pub struct ResultBuffers {
    sig_shape: SigShape,
    var: Vec<f32>,
    sum_frame: Vec<f32>,
    num_frame: RegionCounts,
}

impl ResultBuffers {
    /// Zeroed buffers for frames of `sig_shape`.
    pub fn new(sig_shape: SigShape) -> Self {
        let len = sig_shape.size();
        Self {
            sig_shape,
            var: vec![0.0; len],
            sum_frame: vec![0.0; len],
            num_frame: RegionCounts::new(),
        }
    }

    #[inline]
    pub fn sig_shape(&self) -> &SigShape {
        &self.sig_shape
    }

    #[inline]
    pub fn var(&self) -> &[f32] {
        &self.var
    }

    #[inline]
    pub fn sum_frame(&self) -> &[f32] {
        &self.sum_frame
    }

    #[inline]
    pub fn num_frame(&self) -> &RegionCounts {
        &self.num_frame
    }

    /// Validated frame count shared by every region.
    pub fn frame_count(&self) -> Result<u64, Error> {
        self.num_frame.validate_consistent_count()
    }

    /// Snapshot of the whole buffer as one accumulator.
    ///
    /// Fails if the region counts disagree.
    pub fn to_accumulator(&self) -> Result<Accumulator, Error> {
        let count = self.frame_count()?;
        Accumulator::from_parts(self.var.clone(), self.sum_frame.clone(), count)
    }

    /// Back to the zeroed state, keeping the allocation.
    pub fn reset(&mut self) {
        self.var.fill(0.0);
        self.sum_frame.fill(0.0);
        self.num_frame.clear();
    }

    pub(crate) fn parts_mut(&mut self) -> (&mut [f32], &mut [f32], &mut RegionCounts) {
        (&mut self.var, &mut self.sum_frame, &mut self.num_frame)
    }
}

//! Streaming per-pixel mean / variance / standard deviation.
//!
//! The three steps a host engine drives:
//!
//! - [`StdDev::process_tile`] folds one streamed tile into a worker's buffers,
//! - [`StdDev::merge`] folds one worker's or partition's buffers into another's,
//! - [`StdDev::finalize`] turns fully merged buffers into variance, std and mean.
//!
//! Buffers only ever change through these calls. Tile folds on one buffer must be
//! sequential; merges may run in any tree shape across workers, since the pairwise
//! update is associative and commutative up to rounding.
//!
//! # Example
//!
//! ```
//! use framestat::{SigShape, SigSlice, StdDev, Tile};
//!
//! let shape = SigShape::from([2, 2]);
//! let udf = StdDev::default();
//! let mut buffers = udf.allocate_buffers(shape.clone());
//!
//! // three frames with values 1, 2, 3 everywhere
//! let data: Vec<f32> = (1..=3).flat_map(|v| [v as f32; 4]).collect();
//! let tile = Tile::new(data, 3, SigSlice::full(&shape))?;
//! udf.process_tile(&mut buffers, &tile)?;
//!
//! let result = udf.finalize(&buffers)?;
//! assert_eq!(result.num_frame, 3);
//! assert_eq!(result.mean, vec![2.0; 4]);
//! # Ok::<(), framestat::Error>(())
//! ```

use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::accumulator::{self, Accumulator};
use crate::buffers::ResultBuffers;
use crate::config::{CountMerge, EmptyPolicy, StdDevConfig};
use crate::error::Error;
use crate::shape::{SigShape, SigSlice};
use crate::tile::Tile;


/// Finalized statistics over every accumulated frame.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StdDevResult {
    pub sig_shape: SigShape,
    /// Population variance (divided by N).
    pub variance: Vec<f32>,
    pub std: Vec<f32>,
    pub mean: Vec<f32>,
    /// Raw per-element sum over all frames.
    pub sum_frame: Vec<f32>,
    pub num_frame: u64,
}

/// The accumulation steps, parameterized by [`StdDevConfig`].
#[derive(Debug, Clone, Default)]
pub struct StdDev {
    config: StdDevConfig,
}

impl StdDev {
    pub fn new(config: StdDevConfig) -> Self {
        Self { config }
    }

    #[inline]
    pub fn config(&self) -> &StdDevConfig {
        &self.config
    }

    /// Zeroed buffers for frames of `sig_shape`.
    pub fn allocate_buffers(&self, sig_shape: SigShape) -> ResultBuffers {
        ResultBuffers::new(sig_shape)
    }

    /// Fold one tile into `buffers`.
    ///
    /// The tile's region is registered with a zero count on first sight; its
    /// contribution is merged into the buffer elements the region covers, using the
    /// region's current count, and the region's count advances by the tile's frames.
    /// Invalid tiles are rejected before anything is written.
    pub fn process_tile(&self, buffers: &mut ResultBuffers, tile: &Tile) -> Result<(), Error> {
        let region = tile.slice();
        region.check_within(buffers.sig_shape())?;

        let sig_shape = buffers.sig_shape().clone();
        let local = tile.contribution();
        let (var, sum_frame, num_frame) = buffers.parts_mut();
        let n_region = num_frame.get_or_register(region);

        let mut merged = n_region;
        let mut offset = 0;
        for run in region.runs(&sig_shape) {
            let len = run.len();
            merged = accumulator::merge_into(
                &mut var[run.clone()],
                &mut sum_frame[run],
                n_region,
                &local.variance_sum()[offset..offset + len],
                &local.value_sum()[offset..offset + len],
                local.count(),
            );
            offset += len;
        }
        // a region without elements still counts its frames
        if offset == 0 {
            merged = n_region + local.count();
        }
        num_frame.set(region.clone(), merged);

        tracing::trace!(
            region = %region,
            frames = tile.frames(),
            count = merged,
            "Folded tile"
        );
        Ok(())
    }

    /// Fold `src` into `dest`.
    ///
    /// Each side's region counts are validated first, so a side with inconsistent
    /// counts fails here instead of being merged with a meaningless N. Region counts
    /// in `dest` are then rewritten according to [`CountMerge`]; under
    /// [`CountMerge::Strict`] two non-empty sides with different region sets are
    /// rejected before anything is written.
    pub fn merge(&self, dest: &mut ResultBuffers, src: &ResultBuffers) -> Result<(), Error> {
        if dest.sig_shape() != src.sig_shape() {
            return Err(Error::SignalShapeMismatch {
                expected: dest.sig_shape().clone(),
                actual: src.sig_shape().clone(),
            });
        }

        let n_dest = dest.frame_count()?;
        let n_src = src.frame_count()?;

        let strict = self.config.count_merge == CountMerge::Strict;
        if strict && n_dest > 0 && n_src > 0 {
            if let Some((region, found)) = dest.num_frame().first_unshared(src.num_frame()) {
                tracing::warn!(
                    region = %region,
                    n_dest,
                    n_src,
                    "Merged sides cover different regions"
                );
                return Err(Error::InconsistentCount {
                    expected: n_dest + n_src,
                    found,
                    region,
                });
            }
        }

        let (var, sum_frame, num_frame) = dest.parts_mut();
        let merged = accumulator::merge_into(
            var,
            sum_frame,
            n_dest,
            src.var(),
            src.sum_frame(),
            n_src,
        );

        if !strict || n_src > 0 {
            // an empty strict destination only holds zero-count regions without data
            if strict && n_dest == 0 {
                num_frame.clear();
            }
            for region in src.num_frame().regions() {
                num_frame.set(region.clone(), merged);
            }
        }

        tracing::debug!(n_dest, n_src, merged, "Merged partial results");
        Ok(())
    }

    /// Variance, std and mean from fully merged buffers.
    ///
    /// Does not modify `buffers`; finalizing twice gives identical results.
    pub fn finalize(&self, buffers: &ResultBuffers) -> Result<StdDevResult, Error> {
        let n = buffers.frame_count()?;
        if n == 0 {
            return match self.config.empty {
                EmptyPolicy::Fail => Err(Error::NoFrames),
                EmptyPolicy::Nan => Ok(nan_result(buffers)),
            };
        }

        let n_f = n as f64;
        let variance: Vec<f32> = buffers
            .var()
            .par_iter()
            .map(|&v| (v as f64 / n_f) as f32)
            .collect();
        let mean: Vec<f32> = buffers
            .sum_frame()
            .par_iter()
            .map(|&s| (s as f64 / n_f) as f32)
            .collect();

        // rounding can leave a variance a hair below zero
        let clamped = variance.iter().filter(|&&v| v < 0.0).count();
        if clamped > 0 {
            tracing::debug!(clamped, "Clamped negative variance before sqrt");
        }
        let std: Vec<f32> = variance.par_iter().map(|&v| v.max(0.0).sqrt()).collect();

        tracing::info!(
            num_frame = n,
            elements = variance.len(),
            regions = buffers.num_frame().len(),
            "Finalized frame statistics"
        );

        Ok(StdDevResult {
            sig_shape: buffers.sig_shape().clone(),
            variance,
            std,
            mean,
            sum_frame: buffers.sum_frame().to_vec(),
            num_frame: n,
        })
    }

    /// Fold a whole sequence of tiles into fresh buffers.
    pub fn fold_tiles<I>(&self, sig_shape: SigShape, tiles: I) -> Result<ResultBuffers, Error>
    where
        I: IntoIterator<Item = Tile>,
    {
        let mut buffers = self.allocate_buffers(sig_shape);
        for tile in tiles {
            self.process_tile(&mut buffers, &tile)?;
        }
        Ok(buffers)
    }
}

fn nan_result(buffers: &ResultBuffers) -> StdDevResult {
    let len = buffers.sig_shape().size();
    StdDevResult {
        sig_shape: buffers.sig_shape().clone(),
        variance: vec![f32::NAN; len],
        std: vec![f32::NAN; len],
        mean: vec![f32::NAN; len],
        sum_frame: vec![0.0; len],
        num_frame: 0,
    }
}

/// [`StdDev::process_tile`] with the default configuration.
pub fn process_tile(buffers: &mut ResultBuffers, tile: &Tile) -> Result<(), Error> {
    StdDev::default().process_tile(buffers, tile)
}

/// [`StdDev::merge`] with the default configuration.
pub fn merge(dest: &mut ResultBuffers, src: &ResultBuffers) -> Result<(), Error> {
    StdDev::default().merge(dest, src)
}

/// [`StdDev::finalize`] with the default configuration.
pub fn finalize(buffers: &ResultBuffers) -> Result<StdDevResult, Error> {
    StdDev::default().finalize(buffers)
}

/// Finalize a single accumulator, e.g. one built with [`Accumulator::merge`].
pub fn finalize_accumulator(
    sig_shape: SigShape,
    acc: Accumulator,
    empty: EmptyPolicy,
) -> Result<StdDevResult, Error> {
    if acc.len() != sig_shape.size() {
        return Err(Error::ShapeMismatch {
            expected: sig_shape.size(),
            actual: acc.len(),
        });
    }
    let (var, sum_frame, count) = acc.into_parts();
    let full = SigSlice::full(&sig_shape);
    let mut buffers = ResultBuffers::new(sig_shape);
    {
        let (dst_var, dst_sum, counts) = buffers.parts_mut();
        dst_var.copy_from_slice(&var);
        dst_sum.copy_from_slice(&sum_frame);
        if count > 0 {
            counts.set(full, count);
        }
    }
    StdDev::new(StdDevConfig::default().empty(empty)).finalize(&buffers)
}

//! Reference host: folds partitions on rayon workers and tree-reduces the results.
//!
//! A real streaming engine decides tiling and merge topology itself and only needs
//! [`StdDev`]. This module is the minimal in-memory version of such an engine, used
//! for whole-dataset runs and as the reference in tests.

use crate::buffers::ResultBuffers;
use crate::config::StdDevConfig;
use crate::error::Error;
use crate::shape::SigShape;
use crate::stddev::{StdDev, StdDevResult};
use crate::tile::Tile;

/// A worker-level unit of the dataset: the tiles one worker folds in order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Partition {
    tiles: Vec<Tile>,
}

impl Partition {
    pub fn new(tiles: Vec<Tile>) -> Self {
        Self { tiles }
    }

    pub fn push(&mut self, tile: Tile) {
        self.tiles.push(tile);
    }

    #[inline]
    pub fn tiles(&self) -> &[Tile] {
        &self.tiles
    }

    /// Total frames over all tiles (frames are counted once per tile).
    pub fn frame_count(&self) -> usize {
        self.tiles.iter().map(Tile::frames).sum()
    }
}

impl FromIterator<Tile> for Partition {
    fn from_iter<I: IntoIterator<Item = Tile>>(iter: I) -> Self {
        Self {
            tiles: iter.into_iter().collect(),
        }
    }
}

/// Region of interest over navigation (frame) indices.
///
/// Frames at indices past the end of the mask are excluded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Roi {
    mask: Vec<bool>,
}

impl Roi {
    pub fn new(mask: Vec<bool>) -> Self {
        Self { mask }
    }

    #[inline]
    pub fn contains(&self, frame: u64) -> bool {
        usize::try_from(frame)
            .ok()
            .and_then(|idx| self.mask.get(idx))
            .copied()
            .unwrap_or(false)
    }

    /// Number of selected frames.
    pub fn selected(&self) -> usize {
        self.mask.iter().filter(|&&m| m).count()
    }
}

impl StdDev {
    /// Fold one partition's tiles, dropping frames outside `roi`.
    pub fn fold_partition(
        &self,
        partition: Partition,
        sig_shape: &SigShape,
        roi: Option<&Roi>,
    ) -> Result<ResultBuffers, Error> {
        let tiles = partition.tiles.into_iter().filter_map(|tile| match roi {
            Some(roi) => tile.retain_frames(|frame| roi.contains(frame)),
            None => Some(tile),
        });
        self.fold_tiles(sig_shape.clone(), tiles)
    }

    /// Pairwise tree reduction of partial results into one.
    ///
    /// An empty input reduces to zeroed buffers of `sig_shape`.
    pub fn reduce_buffers(
        &self,
        partials: Vec<ResultBuffers>,
        sig_shape: &SigShape,
    ) -> Result<ResultBuffers, Error> {
        let reduced = common::parallel::try_tree_reduce(partials, |mut dest, src| {
            self.merge(&mut dest, &src)?;
            Ok::<ResultBuffers, Error>(dest)
        })?;
        Ok(reduced.unwrap_or_else(|| self.allocate_buffers(sig_shape.clone())))
    }
}

/// Compute per-element variance, std and mean over all partitions.
///
/// Partitions are folded in parallel, at most `config.max_concurrent_partitions` at
/// a time, then merged pairwise and finalized.
pub fn run_stddev(
    partitions: Vec<Partition>,
    sig_shape: &SigShape,
    roi: Option<&Roi>,
    config: &StdDevConfig,
) -> Result<StdDevResult, Error> {
    config.validate()?;
    let udf = StdDev::new(config.clone());

    tracing::info!(
        partitions = partitions.len(),
        sig_shape = %sig_shape,
        roi_frames = roi.map(Roi::selected),
        max_concurrent = config.max_concurrent_partitions,
        "Starting stddev run"
    );

    let partials = common::parallel::try_map_bounded(
        partitions,
        config.max_concurrent_partitions,
        |partition| udf.fold_partition(partition, sig_shape, roi),
    )?;
    let total = udf.reduce_buffers(partials, sig_shape)?;
    udf.finalize(&total)
}

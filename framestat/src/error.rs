//! Error types for accumulation, merging and finalization.

use crate::shape::{SigShape, SigSlice};

/// Errors that can occur while folding, merging or finalizing frame statistics.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Two regions of the same result were fed a different number of frames.
    #[error(
        "Inconsistent frame counts: region {region} has {found} frames, expected {expected}"
    )]
    InconsistentCount {
        expected: u64,
        found: u64,
        region: SigSlice,
    },

    #[error("No frames were accumulated")]
    NoFrames,

    #[error("Tile has no frames")]
    EmptyTile,

    #[error("Element count mismatch: expected {expected}, got {actual}")]
    ShapeMismatch { expected: usize, actual: usize },

    #[error("Tile of {frames} frames over {slice} has more elements than fit in memory")]
    ElementCountOverflow { frames: usize, slice: SigSlice },

    #[error("Signal shape mismatch: {expected} vs {actual}")]
    SignalShapeMismatch {
        expected: SigShape,
        actual: SigShape,
    },

    #[error("Region {slice} does not fit signal shape {shape}")]
    SliceOutOfBounds { slice: SigSlice, shape: SigShape },

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("Failed to parse configuration")]
    ConfigFormat(#[from] common::SerdeFormatError),
}

//! Framestat - single-pass per-pixel statistics over streamed frames.
//!
//! Computes per-element mean, variance and standard deviation over a stack of
//! frames without holding the stack in memory:
//! - Frames arrive as tiles covering a region of the signal
//! - Each worker folds its tiles into its own [`ResultBuffers`]
//! - Worker results merge pairwise in any order with the Chan et al. update
//! - Finalization validates per-region frame counts and normalizes by N
//!
//! # Quick Start
//!
//! ```rust,ignore
//! use framestat::{Partition, SigShape, StdDevConfig, run_stddev};
//!
//! let partitions: Vec<Partition> = load_partitions()?;
//! let result = run_stddev(partitions, &SigShape::from([512, 512]), None, &StdDevConfig::default())?;
//!
//! println!("{} frames, std[0] = {}", result.num_frame, result.std[0]);
//! ```

pub(crate) mod accumulator;
mod buffers;
mod config;
mod driver;
mod error;
mod region;
mod shape;
mod stddev;
mod tile;

// ============================================================================
// Geometry and input
// ============================================================================

pub use shape::{SigShape, SigSlice, SliceRuns};
pub use tile::Tile;

// ============================================================================
// Accumulation
// ============================================================================

pub use accumulator::Accumulator;
pub use buffers::ResultBuffers;
pub use region::{RegionCounts, validate_consistent_count};
pub use stddev::{StdDev, StdDevResult, finalize, finalize_accumulator, merge, process_tile};

// ============================================================================
// Driver and configuration
// ============================================================================

pub use config::{CountMerge, EmptyPolicy, StdDevConfig};
pub use driver::{Partition, Roi, run_stddev};
pub use error::Error;

//! Streamed tiles: a dense block of frames over one signal-space region.

use crate::accumulator::Accumulator;
use crate::error::Error;
use crate::shape::SigSlice;

/// A `[frames, *slice.shape()]` block of samples, frame-major.
///
/// `slice` is the signal-space region the tile covers and doubles as its region
/// key. `first_frame` is the navigation index of the tile's first frame; frames are
/// consecutive from there.
#[derive(Debug, Clone, PartialEq)]
pub struct Tile {
    data: Vec<f32>,
    frames: usize,
    slice: SigSlice,
    first_frame: u64,
}

impl Tile {
    pub fn new(data: Vec<f32>, frames: usize, slice: SigSlice) -> Result<Self, Error> {
        if frames == 0 {
            return Err(Error::EmptyTile);
        }
        let Some(expected) = slice.checked_len(frames) else {
            return Err(Error::ElementCountOverflow { frames, slice });
        };
        if data.len() != expected {
            return Err(Error::ShapeMismatch {
                expected,
                actual: data.len(),
            });
        }
        Ok(Self {
            data,
            frames,
            slice,
            first_frame: 0,
        })
    }

    pub fn with_first_frame(mut self, first_frame: u64) -> Self {
        self.first_frame = first_frame;
        self
    }

    #[inline]
    pub fn frames(&self) -> usize {
        self.frames
    }

    #[inline]
    pub fn slice(&self) -> &SigSlice {
        &self.slice
    }

    #[inline]
    pub fn first_frame(&self) -> u64 {
        self.first_frame
    }

    #[inline]
    pub fn data(&self) -> &[f32] {
        &self.data
    }

    /// Samples of the `index`-th frame of this tile.
    pub fn frame(&self, index: usize) -> &[f32] {
        let len = self.slice.size();
        &self.data[index * len..(index + 1) * len]
    }

    /// The tile's own (variance sum, value sum, count) accumulator.
    pub fn contribution(&self) -> Accumulator {
        Accumulator::from_frames(&self.data, self.frames, self.slice.size())
    }

    /// Keeps only frames whose navigation index satisfies `keep`.
    ///
    /// Returns `None` when no frame survives. `first_frame` of the result is the
    /// index of the first kept frame.
    pub fn retain_frames(self, keep: impl Fn(u64) -> bool) -> Option<Self> {
        let kept: Vec<usize> = (0..self.frames)
            .filter(|&i| keep(self.first_frame + i as u64))
            .collect();
        if kept.len() == self.frames {
            return Some(self);
        }
        let &first = kept.first()?;

        let mut data = Vec::with_capacity(kept.len() * self.slice.size());
        for &i in &kept {
            data.extend_from_slice(self.frame(i));
        }
        Some(Self {
            data,
            frames: kept.len(),
            first_frame: self.first_frame + first as u64,
            slice: self.slice,
        })
    }
}

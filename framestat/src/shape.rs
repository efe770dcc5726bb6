//! Signal-space geometry: frame shapes and the rectangular regions tiles cover.

use std::fmt;
use std::ops::Range;

use serde::{Deserialize, Serialize};

use crate::error::Error;

/// Shape of a single frame, row-major, last axis contiguous.
///
/// A zero-dimensional shape describes a scalar signal with one element.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SigShape(Vec<usize>);

impl SigShape {
    pub fn new(dims: Vec<usize>) -> Self {
        Self(dims)
    }

    #[inline]
    pub fn dims(&self) -> &[usize] {
        &self.0
    }

    #[inline]
    pub fn ndim(&self) -> usize {
        self.0.len()
    }

    /// Number of elements in one frame.
    #[inline]
    pub fn size(&self) -> usize {
        self.0.iter().product()
    }

    /// Row-major element strides.
    pub fn strides(&self) -> Vec<usize> {
        let mut strides = vec![1; self.0.len()];
        for axis in (0..self.0.len().saturating_sub(1)).rev() {
            strides[axis] = strides[axis + 1] * self.0[axis + 1];
        }
        strides
    }
}

impl From<&[usize]> for SigShape {
    fn from(dims: &[usize]) -> Self {
        Self(dims.to_vec())
    }
}

impl<const N: usize> From<[usize; N]> for SigShape {
    fn from(dims: [usize; N]) -> Self {
        Self(dims.to_vec())
    }
}

impl fmt::Display for SigShape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "(")?;
        for (i, dim) in self.0.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{dim}")?;
        }
        write!(f, ")")
    }
}

/// Axis-aligned box in signal space: `origin[i]..origin[i] + shape[i]` per axis.
///
/// This is the region key used for frame count bookkeeping. Every tile reports
/// the signal-space box it covers, independent of which frames it carries.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SigSlice {
    origin: Vec<usize>,
    shape: Vec<usize>,
}

impl SigSlice {
    /// A box starting at `origin` with per-axis extent `shape`.
    ///
    /// # Panics
    ///
    /// Panics if `origin` and `shape` have a different number of axes.
    pub fn new(origin: Vec<usize>, shape: Vec<usize>) -> Self {
        assert_eq!(
            origin.len(),
            shape.len(),
            "origin and shape must have the same number of axes"
        );
        Self { origin, shape }
    }

    /// The slice covering all of `sig_shape`.
    pub fn full(sig_shape: &SigShape) -> Self {
        Self {
            origin: vec![0; sig_shape.ndim()],
            shape: sig_shape.dims().to_vec(),
        }
    }

    #[inline]
    pub fn origin(&self) -> &[usize] {
        &self.origin
    }

    #[inline]
    pub fn shape(&self) -> &[usize] {
        &self.shape
    }

    /// Number of signal elements covered.
    #[inline]
    pub fn size(&self) -> usize {
        self.shape.iter().product()
    }

    /// Elements in `frames` frames of this slice, or `None` on overflow.
    pub fn checked_len(&self, frames: usize) -> Option<usize> {
        self.shape
            .iter()
            .try_fold(frames, |acc, &extent| acc.checked_mul(extent))
    }

    pub fn check_within(&self, sig_shape: &SigShape) -> Result<(), Error> {
        let fits = self.origin.len() == sig_shape.ndim()
            && self
                .origin
                .iter()
                .zip(&self.shape)
                .zip(sig_shape.dims())
                .all(|((&origin, &extent), &dim)| {
                    origin.checked_add(extent).is_some_and(|end| end <= dim)
                });
        if fits {
            Ok(())
        } else {
            Err(Error::SliceOutOfBounds {
                slice: self.clone(),
                shape: sig_shape.clone(),
            })
        }
    }

    /// Contiguous runs of flat indices into a `sig_shape` buffer covered by this slice.
    ///
    /// Runs are yielded in row-major order, so concatenating them visits the slice's
    /// elements in the same order as a dense `shape`-sized array. The slice must fit
    /// `sig_shape` (see [`SigSlice::check_within`]).
    pub fn runs(&self, sig_shape: &SigShape) -> SliceRuns<'_> {
        debug_assert!(self.check_within(sig_shape).is_ok());
        SliceRuns::new(self, sig_shape.strides())
    }
}

impl fmt::Display for SigSlice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[")?;
        for (i, (&origin, &extent)) in self.origin.iter().zip(&self.shape).enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}:{}", origin, origin.saturating_add(extent))?;
        }
        write!(f, "]")
    }
}

/// Iterator over the flat index runs of a [`SigSlice`], see [`SigSlice::runs`].
pub struct SliceRuns<'a> {
    slice: &'a SigSlice,
    strides: Vec<usize>,
    // Odometer over every axis except the last.
    cursor: Vec<usize>,
    run_len: usize,
    remaining: usize,
}

impl<'a> SliceRuns<'a> {
    fn new(slice: &'a SigSlice, strides: Vec<usize>) -> Self {
        let ndim = slice.shape.len();
        let outer = ndim.saturating_sub(1);
        let run_len = slice.shape.last().copied().unwrap_or(1);
        let remaining = if run_len == 0 {
            0
        } else {
            slice.shape[..outer].iter().product()
        };
        Self {
            slice,
            strides,
            cursor: vec![0; outer],
            run_len,
            remaining,
        }
    }
}

impl Iterator for SliceRuns<'_> {
    type Item = Range<usize>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.remaining == 0 {
            return None;
        }

        let ndim = self.slice.shape.len();
        let mut start = if ndim == 0 {
            0
        } else {
            self.slice.origin[ndim - 1]
        };
        for (axis, &pos) in self.cursor.iter().enumerate() {
            start += (self.slice.origin[axis] + pos) * self.strides[axis];
        }

        self.remaining -= 1;
        for axis in (0..self.cursor.len()).rev() {
            self.cursor[axis] += 1;
            if self.cursor[axis] < self.slice.shape[axis] {
                break;
            }
            self.cursor[axis] = 0;
        }

        Some(start..start + self.run_len)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

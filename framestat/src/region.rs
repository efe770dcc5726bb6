//! Per-region frame count bookkeeping.

use hashbrown::HashMap;

use crate::error::Error;
use crate::shape::SigSlice;

/// Frame counts keyed by the signal-space region they were accumulated for.
///
/// Tiles of different signal coverage accumulate their counts independently. Once
/// the stream is complete every region must hold the same count, otherwise some
/// part of the signal saw a different number of frames than another.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RegionCounts {
    counts: HashMap<SigSlice, u64>,
}

impl RegionCounts {
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.counts.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.counts.is_empty()
    }

    pub fn get(&self, region: &SigSlice) -> Option<u64> {
        self.counts.get(region).copied()
    }

    /// Count for `region`, registering it with zero frames if unseen.
    pub fn get_or_register(&mut self, region: &SigSlice) -> u64 {
        if let Some(&count) = self.counts.get(region) {
            return count;
        }
        self.counts.insert(region.clone(), 0);
        0
    }

    pub fn set(&mut self, region: SigSlice, count: u64) {
        self.counts.insert(region, count);
    }

    pub fn regions(&self) -> impl Iterator<Item = &SigSlice> {
        self.counts.keys()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&SigSlice, u64)> {
        self.counts.iter().map(|(region, &count)| (region, count))
    }

    pub fn clear(&mut self) {
        self.counts.clear();
    }

    /// Smallest region registered on only one of the two sides, with its count there.
    pub fn first_unshared(&self, other: &RegionCounts) -> Option<(SigSlice, u64)> {
        let only_self = self
            .counts
            .iter()
            .filter(|(region, _)| !other.counts.contains_key(*region));
        let only_other = other
            .counts
            .iter()
            .filter(|(region, _)| !self.counts.contains_key(*region));
        only_self
            .chain(only_other)
            .min_by(|a, b| a.0.cmp(b.0))
            .map(|(region, &count)| (region.clone(), count))
    }

    /// The frame count shared by all regions, or 0 if none are registered.
    ///
    /// Fails with [`Error::InconsistentCount`] if any two regions disagree. The
    /// reported pair is the smallest region (in `SigSlice` order) against the first
    /// region found with a different count, so the message is stable across runs.
    pub fn validate_consistent_count(&self) -> Result<u64, Error> {
        let Some((reference, &expected)) = self.counts.iter().min_by_key(|(region, _)| *region)
        else {
            return Ok(0);
        };

        let mut mismatched: Vec<(&SigSlice, u64)> = self
            .counts
            .iter()
            .filter(|&(_, &count)| count != expected)
            .map(|(region, &count)| (region, count))
            .collect();
        if mismatched.is_empty() {
            return Ok(expected);
        }

        mismatched.sort_unstable_by(|a, b| a.0.cmp(b.0));
        let (region, found) = mismatched[0];
        tracing::warn!(
            reference = %reference,
            expected,
            region = %region,
            found,
            "Region frame counts disagree"
        );
        Err(Error::InconsistentCount {
            expected,
            found,
            region: region.clone(),
        })
    }
}

/// Free-function form of [`RegionCounts::validate_consistent_count`].
pub fn validate_consistent_count(counts: &RegionCounts) -> Result<u64, Error> {
    counts.validate_consistent_count()
}

impl FromIterator<(SigSlice, u64)> for RegionCounts {
    fn from_iter<I: IntoIterator<Item = (SigSlice, u64)>>(iter: I) -> Self {
        Self {
            counts: iter.into_iter().collect(),
        }
    }
}

use alloy_primitives::Address;
use std::collections::{BTreeSet, HashMap};

/// An instruction executed at the top call depth of a transaction: the called contract and the
/// program counter within its code.
pub type ProgramPoint = (Address, u64);

/// Campaign-wide coverage statistics driving the search.
///
/// Tracks how often every program point was observed across trials and the trial in which it
/// was first observed. [`CoverageMap::record`] turns a trial's coverage into a score that rises
/// for trials touching recently discovered points, not merely many points.
#[derive(Clone, Debug, Default)]
pub struct CoverageMap {
    hits: HashMap<ProgramPoint, u64>,
    first_seen: HashMap<ProgramPoint, u64>,
    current_max: u64,
}

impl CoverageMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Folds the coverage of trial `trial` into the map and returns its targeting score.
    ///
    /// - If any point is observed for the first time, the score is `trial` and becomes the new
    ///   current maximum.
    /// - Otherwise the score is the latest first-seen trial among the covered points, which
    ///   equals the current maximum when the trial reaches the newest discoveries.
    ///
    /// Returns `None` for an empty coverage set.
    pub fn record(&mut self, trial: u64, covered: &BTreeSet<ProgramPoint>) -> Option<u64> {
        if covered.is_empty() {
            return None;
        }

        let mut discovered = false;
        for point in covered {
            let count = self.hits.entry(*point).or_default();
            *count += 1;
            if *count == 1 {
                self.first_seen.insert(*point, trial);
                discovered = true;
            }
        }

        if discovered {
            trace!(target: "chainprop::coverage", trial, points = self.hits.len(), "new program points");
            self.current_max = trial;
            return Some(trial);
        }

        covered.iter().filter_map(|point| self.first_seen.get(point)).copied().max()
    }

    /// Number of distinct program points observed.
    pub fn len(&self) -> usize {
        self.hits.len()
    }

    pub fn is_empty(&self) -> bool {
        self.hits.is_empty()
    }

    pub fn hits(&self, point: &ProgramPoint) -> u64 {
        self.hits.get(point).copied().unwrap_or_default()
    }

    pub fn first_seen(&self, point: &ProgramPoint) -> Option<u64> {
        self.first_seen.get(point).copied()
    }

    /// Trial index of the latest discovery.
    pub fn current_max(&self) -> u64 {
        self.current_max
    }
}

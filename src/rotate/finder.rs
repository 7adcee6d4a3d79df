use rayon::prelude::*;

use crate::error::{IdealError, Result};
use crate::rotate::window::{self, CHUNK_LEN, WindowMethod};

// Invariants for the scan layer:
// 1. Scan chunks cover value indices `[from, from + CHUNK_LEN)` and advance
//    by `CHUNK_LEN / 2`, so every index is seen by at least one chunk and
//    boundary minima are never missed. Duplicate hits from the overlap are
//    removed before grouping.
// 2. `|value - ideal|` is compared as f32. Chunks recompute prefix sums from
//    different bases, and last-ULP noise must not register as a new minimum.
// 3. Runs returned to callers are ascending and, after pruning, satisfy
//    `next.start >= prev.start + prev.len + window - 1`.

/// Best score and its consecutive-window runs for one search space. A
/// `None` score means the space held no window at all.
#[derive(Debug, Clone, PartialEq)]
pub struct IdealWindows {
    pub score: Option<f64>,
    pub runs: Vec<(usize, usize)>,
}

impl IdealWindows {
    pub(crate) fn empty() -> Self {
        Self {
            score: None,
            runs: Vec::new(),
        }
    }
}

/// Source of window values for the minimum scan: either computed on the fly
/// from a numeric slice or read back from the on-disk value cache.
pub(crate) trait WindowValues: Sync {
    /// Total number of windows in this search space.
    fn len(&self) -> usize;

    /// Window values for start positions `[from, to)`.
    fn values(&self, from: usize, to: usize) -> Vec<f64>;
}

pub(crate) struct ComputedValues<'a> {
    pub a: &'a [f64],
    pub window: usize,
    pub method: WindowMethod,
}

impl WindowValues for ComputedValues<'_> {
    fn len(&self) -> usize {
        (self.a.len() + 1).saturating_sub(self.window)
    }

    fn values(&self, from: usize, to: usize) -> Vec<f64> {
        let mut out = Vec::with_capacity(to - from);
        window::windowed_into(
            &self.a[from..to + self.window - 1],
            self.window,
            self.method,
            &mut out,
        );
        out
    }
}

/// Find the windows of `a` whose score is closest to `ideal`, grouped into
/// consecutive runs. With `prune_overlap`, partially overlapping runs are
/// trimmed so kept runs never share a covered position.
pub fn find_ideal_windows(
    a: &[f64],
    window: usize,
    ideal: f64,
    method: WindowMethod,
    prune_overlap: bool,
) -> Result<IdealWindows> {
    if window == 0 {
        return Err(IdealError::InvalidInput(
            "window size must be at least 1".to_string(),
        ));
    }
    if window > a.len() {
        return Err(IdealError::WindowTooLarge {
            window,
            length: a.len(),
        });
    }
    let source = ComputedValues { a, window, method };
    Ok(find_in_source(&source, window, ideal, prune_overlap))
}

pub(crate) fn find_in_source<S: WindowValues>(
    source: &S,
    window: usize,
    ideal: f64,
    prune_overlap: bool,
) -> IdealWindows {
    find_in_source_with_chunk(source, window, ideal, prune_overlap, CHUNK_LEN)
}

pub(crate) fn find_in_source_with_chunk<S: WindowValues>(
    source: &S,
    window: usize,
    ideal: f64,
    prune_overlap: bool,
    chunk_len: usize,
) -> IdealWindows {
    let Some((score, indices)) = scan_minimum(source, ideal, chunk_len) else {
        return IdealWindows::empty();
    };
    let runs = group_consecutive(&indices);
    let runs = if prune_overlap {
        prune_overlapping(&runs, window)
    } else {
        runs
    };
    IdealWindows {
        score: Some(score),
        runs,
    }
}

struct ChunkScan {
    min_diff: f32,
    score: f64,
    indices: Vec<usize>,
}

/// Scan all window values for the minimum `|value - ideal|`; returns the
/// score at a best index and every index attaining it, sorted and deduped.
fn scan_minimum<S: WindowValues>(
    source: &S,
    ideal: f64,
    chunk_len: usize,
) -> Option<(f64, Vec<usize>)> {
    let total = source.len();
    if total == 0 {
        return None;
    }
    let chunk_len = chunk_len.max(2);
    let step = chunk_len / 2;

    let mut starts = Vec::new();
    let mut from = 0usize;
    loop {
        starts.push(from);
        if from + chunk_len >= total {
            break;
        }
        from += step;
    }

    let scans: Vec<ChunkScan> = starts
        .into_par_iter()
        .map(|from| {
            let to = (from + chunk_len).min(total);
            scan_chunk(&source.values(from, to), from, ideal)
        })
        .collect();

    let mut best_diff = f32::INFINITY;
    let mut best_score = 0.0f64;
    let mut indices: Vec<usize> = Vec::new();
    for scan in scans {
        if scan.min_diff < best_diff {
            best_diff = scan.min_diff;
            indices.clear();
        }
        if scan.min_diff == best_diff {
            best_score = scan.score;
            indices.extend_from_slice(&scan.indices);
        }
    }
    indices.sort_unstable();
    indices.dedup();
    Some((best_score, indices))
}

fn scan_chunk(values: &[f64], base: usize, ideal: f64) -> ChunkScan {
    let mut min_diff = f32::INFINITY;
    for &value in values {
        let diff = (value - ideal).abs() as f32;
        if diff < min_diff {
            min_diff = diff;
        }
    }
    let mut indices = Vec::new();
    let mut score = 0.0f64;
    for (i, &value) in values.iter().enumerate() {
        if (value - ideal).abs() as f32 == min_diff {
            if indices.is_empty() {
                score = value;
            }
            indices.push(base + i);
        }
    }
    ChunkScan {
        min_diff,
        score,
        indices,
    }
}

/// Split sorted indices at gaps greater than one; each maximal block of
/// adjacent indices becomes a `(start, count)` run.
pub(crate) fn group_consecutive(indices: &[usize]) -> Vec<(usize, usize)> {
    let mut runs = Vec::new();
    let mut iter = indices.iter().copied();
    let Some(first) = iter.next() else {
        return runs;
    };
    let mut start = first;
    let mut prev = first;
    for idx in iter {
        if idx - prev > 1 {
            runs.push((start, prev - start + 1));
            start = idx;
        }
        prev = idx;
    }
    runs.push((start, prev - start + 1));
    runs
}

/// Drop or trim runs that share covered positions with an earlier kept run.
/// `next_allowed` is the first start that no longer overlaps the previous
/// run's coverage; a run starting exactly there abuts and is kept.
pub(crate) fn prune_overlapping(runs: &[(usize, usize)], window: usize) -> Vec<(usize, usize)> {
    let mut kept: Vec<(usize, usize)> = Vec::with_capacity(runs.len());
    for &(start, len) in runs {
        match kept.last().copied() {
            None => kept.push((start, len)),
            Some((prev_start, prev_len)) => {
                let next_allowed = prev_start + prev_len + window - 1;
                let end_pos = start + len - 1;
                if end_pos < next_allowed {
                    continue;
                }
                let strip = next_allowed.saturating_sub(start);
                kept.push((start.max(next_allowed), len - strip));
            }
        }
    }
    debug_assert!(
        kept.windows(2)
            .all(|pair| pair[1].0 >= pair[0].0 + pair[0].1 + window - 1),
        "pruned runs overlap"
    );
    kept
}

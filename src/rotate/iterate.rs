use log::warn;

use crate::records::IterRound;
use crate::rotate::cache::CachedValues;
use crate::rotate::finder::{self, ComputedValues, IdealWindows};
use crate::rotate::window::WindowMethod;

/// Find the next-best windows of `a`, excluding everything already selected
/// in `excluded_rounds`. The sequence is partitioned into the gaps left by
/// prior runs (each run blocks its own starts plus the `window - 1` tail
/// its coverage extends over); every gap is searched independently and the
/// gap results closest to `ideal` are merged. Returns `(None, [])` once no
/// gap holds a window.
///
/// `cached` may hold the precomputed whole-sequence window values; the
/// result is the same with or without it.
pub fn next_round(
    a: &[f64],
    window: usize,
    excluded_rounds: &[IterRound],
    ideal: f64,
    method: WindowMethod,
    prune_overlap: bool,
    cached: Option<&CachedValues>,
) -> IdealWindows {
    if window == 0 || window > a.len() {
        warn!(
            "sequence length {} is smaller than window size {window}",
            a.len()
        );
        return IdealWindows::empty();
    }

    let mut best: Option<GapAggregate> = None;
    for (gap_start, gap_end) in gaps(a.len(), window, excluded_rounds) {
        let sub = match cached {
            Some(values) => {
                let slice = values.slice(gap_start, gap_end, window);
                finder::find_in_source(&slice, window, ideal, prune_overlap)
            }
            None => {
                let source = ComputedValues {
                    a: &a[gap_start..gap_end],
                    window,
                    method,
                };
                finder::find_in_source(&source, window, ideal, prune_overlap)
            }
        };
        let Some(score) = sub.score else {
            continue;
        };
        let diff = (score - ideal).abs();
        let translated = sub.runs.iter().map(|&(start, len)| (gap_start + start, len));
        match &mut best {
            None => {
                best = Some(GapAggregate {
                    diff,
                    score,
                    runs: translated.collect(),
                });
            }
            Some(aggregate) => {
                if diff < aggregate.diff {
                    aggregate.diff = diff;
                    aggregate.score = score;
                    aggregate.runs.clear();
                }
                if diff == aggregate.diff {
                    aggregate.runs.extend(translated);
                }
            }
        }
    }

    match best {
        None => IdealWindows::empty(),
        Some(aggregate) => IdealWindows {
            score: Some(aggregate.score),
            runs: aggregate.runs,
        },
    }
}

struct GapAggregate {
    diff: f64,
    score: f64,
    runs: Vec<(usize, usize)>,
}

/// Half-open sub-ranges of `[0, len)` not covered by any excluded run or
/// its `window - 1` coverage tail. Gaps too short to hold a window are
/// dropped.
fn gaps(len: usize, window: usize, excluded_rounds: &[IterRound]) -> Vec<(usize, usize)> {
    let mut runs: Vec<(usize, usize)> = excluded_rounds
        .iter()
        .flat_map(|round| round.windows.iter().copied())
        .collect();
    runs.sort_unstable_by_key(|run| run.0);

    let mut gaps = Vec::new();
    let mut last_end = 0usize;
    for (start, run_len) in runs {
        if start > last_end && start - last_end >= window {
            gaps.push((last_end, start));
        }
        last_end = start + run_len + window - 1;
    }
    if last_end < len && len - last_end >= window {
        gaps.push((last_end, len));
    }
    gaps
}

#[cfg(test)]
mod tests {
    use super::*;

    fn round(windows: Vec<(usize, usize)>) -> IterRound {
        IterRound {
            score: Some(0.0),
            windows,
        }
    }

    #[test]
    fn no_exclusions_yield_one_full_gap() {
        assert_eq!(gaps(20, 4, &[]), vec![(0, 20)]);
    }

    #[test]
    fn runs_block_their_coverage_tails() {
        // Run (0,1) with window 4 covers positions 0..=3, so the next gap
        // starts at 4; run (9,9) covers through 20.
        let rounds = [round(vec![(0, 1), (9, 9)])];
        assert_eq!(gaps(21, 4, &rounds), vec![(4, 9)]);
    }

    #[test]
    fn short_gaps_are_dropped() {
        let rounds = [round(vec![(0, 1)])];
        // Tail gap [4, 6) is shorter than the window.
        assert_eq!(gaps(6, 4, &rounds), Vec::<(usize, usize)>::new());
    }

    #[test]
    fn runs_from_all_rounds_are_flattened() {
        let rounds = [round(vec![(10, 2)]), round(vec![(0, 1)])];
        assert_eq!(gaps(30, 3, &rounds), vec![(3, 10), (14, 30)]);
    }
}

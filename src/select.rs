//! Global top-K selection over all sequences.
//!
//! The selector runs rounds over the live sequence store. Each round asks
//! every live sequence for its next-best windows, admits candidates that
//! either fill a free result slot or tie the worst kept difference, then
//! sorts the round's candidates externally by `(score_diff, start_idx)`,
//! keeps the head, and recycles the admitted sequences into the next
//! round. Sequences stop being live once they are exhausted or fail
//! admission.

use std::path::Path;

use log::info;

use crate::error::{IdealError, Result};
use crate::records::{IterRound, NumericRecord, SelectedWindow};
use crate::rotate::cache::{CachedValues, WindowCache};
use crate::rotate::{IdealWindows, WindowMethod, next_round, windowed};
use crate::store::{F64Key, JsonlStore};

/// Tuning knobs for the selection loop.
#[derive(Debug, Clone)]
pub struct FinderConfig {
    pub window: usize,
    pub top: usize,
    pub ideal_value: f64,
    pub method: WindowMethod,
    pub prune_overlap: bool,
    pub sort_chunk_size: usize,
    pub precision: u32,
}

impl FinderConfig {
    pub fn new(window: usize, top: usize, ideal_value: f64) -> Self {
        Self {
            window,
            top,
            ideal_value,
            method: WindowMethod::Mean,
            prune_overlap: true,
            sort_chunk_size: 10_000_000,
            precision: 4,
        }
    }

    fn validate(&self) -> Result<()> {
        if self.window == 0 {
            return Err(IdealError::InvalidInput(
                "window size must be at least 1".to_string(),
            ));
        }
        if self.top == 0 {
            return Err(IdealError::InvalidInput(
                "top count must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

pub struct Selector {
    config: FinderConfig,
    cache: Option<WindowCache>,
}

impl Selector {
    pub fn new(config: FinderConfig) -> Self {
        Self {
            config,
            cache: None,
        }
    }

    /// Enable the whole-sequence window value cache. Purely an
    /// optimization: results are identical with and without it.
    pub fn with_cache(mut self, cache: WindowCache) -> Self {
        self.cache = Some(cache);
        self
    }

    /// Run the round loop over `input`. The returned store holds at most
    /// `top` records, globally sorted by `(score_diff, start_idx)` within
    /// the rounds that contributed, and is backed by `save_path` when given.
    pub fn find(
        &self,
        input: JsonlStore<NumericRecord>,
        save_path: Option<&Path>,
    ) -> Result<JsonlStore<SelectedWindow>> {
        self.config.validate()?;
        let config = &self.config;

        let mut selected = match save_path {
            Some(path) => JsonlStore::open(path)?,
            None => JsonlStore::temp()?,
        };
        selected.clear()?;
        let mut selected_count = 0usize;
        let mut worst_kept = f64::NEG_INFINITY;

        let mut live = input;
        let mut seqs_to_seek = live.len()?;
        let mut round_num = 0usize;

        while seqs_to_seek > 0 {
            let remaining = config.top.saturating_sub(selected_count);
            let mut round_worst = worst_kept;
            let mut candidates_w: JsonlStore<SelectedWindow> = JsonlStore::temp()?;
            let mut candidates_s: JsonlStore<NumericRecord> = JsonlStore::temp()?;
            let mut admitted_windows = 0usize;
            let mut found_windows = 0usize;

            info!("round {round_num}: {seqs_to_seek} sequences to seek, {remaining} windows to find");

            for record in live.iter()? {
                let mut seq = record?;
                let result = self.search_next(&seq)?;
                found_windows += result.runs.len();
                seq.iter_results.push(IterRound {
                    score: result.score,
                    windows: result.runs.clone(),
                });

                let Some(raw_score) = result.score else {
                    // Exhausted: every gap is now shorter than the window.
                    continue;
                };
                let score = round_to(raw_score, config.precision);
                let diff = round_to((score - config.ideal_value).abs(), config.precision);

                let within_worst = diff <= round_worst;
                if admitted_windows < remaining || within_worst {
                    if !within_worst {
                        round_worst = diff;
                    }
                    for &(start, len) in &result.runs {
                        let end_idx = start + len + config.window - 2;
                        if end_idx >= seq.seq.len() {
                            return Err(IdealError::Internal(format!(
                                "run ({start}, {len}) escapes sequence {} of length {}",
                                seq.id,
                                seq.seq.len()
                            )));
                        }
                        candidates_w.append(&SelectedWindow {
                            seq_id: seq.id.clone(),
                            start_idx: start,
                            end_idx,
                            consecutive_window_length: len,
                            score,
                            score_diff: diff,
                        })?;
                    }
                    admitted_windows += result.runs.len();
                    candidates_s.append(&seq)?;
                }
            }

            candidates_w.sort_by_key(
                |record| (F64Key(record.score_diff), record.start_idx),
                false,
                config.sort_chunk_size,
            )?;
            candidates_w.truncate_head(remaining)?;

            let mut last_diff = None;
            for record in candidates_w.iter()? {
                let record = record?;
                last_diff = Some(record.score_diff);
                selected.append(&record)?;
                selected_count += 1;
            }
            if selected_count >= config.top
                && let Some(diff) = last_diff
            {
                worst_kept = diff;
            }

            candidates_w.close()?;
            live.close()?;
            live = candidates_s;
            seqs_to_seek = live.len()?;

            info!(
                "round {round_num} finished: {found_windows} windows found, {admitted_windows} admitted"
            );
            round_num += 1;
        }

        live.close()?;
        Ok(selected)
    }

    fn search_next(&self, seq: &NumericRecord) -> Result<IdealWindows> {
        let config = &self.config;
        let cached = self.cached_values(seq)?;
        Ok(next_round(
            &seq.seq,
            config.window,
            &seq.iter_results,
            config.ideal_value,
            config.method,
            config.prune_overlap,
            cached.as_ref(),
        ))
    }

    /// Whole-sequence window values from the cache, computing and storing
    /// them on a miss. `None` when caching is off or the sequence is too
    /// short to hold a window.
    fn cached_values(&self, seq: &NumericRecord) -> Result<Option<CachedValues>> {
        let Some(cache) = &self.cache else {
            return Ok(None);
        };
        let config = &self.config;
        if config.window > seq.seq.len() {
            return Ok(None);
        }
        if let Some(values) = cache.load(&seq.id, config.method, config.window, seq.seq.len()) {
            return Ok(Some(values));
        }
        let values = windowed(&seq.seq, config.window, config.method)?;
        cache.store(&seq.id, config.method, &values)?;
        Ok(cache.load(&seq.id, config.method, config.window, seq.seq.len()))
    }
}

fn round_to(value: f64, precision: u32) -> f64 {
    let factor = 10f64.powi(precision as i32);
    (value * factor).round() / factor
}

//! Stable external sort for [`JsonlStore`].
//!
//! Records are loaded in chunks of at most `chunk_size`, sorted in memory,
//! and spilled to numbered temp runs; the runs are then merged with a
//! min-heap, one in-flight record per run. Ties keep insertion order: the
//! in-memory sort is stable and the heap breaks key ties by run index.

use std::cmp::{Ordering, Reverse};
use std::collections::BinaryHeap;
use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Seek, SeekFrom, Write};

use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::error::Result;

use super::{JsonlStore, open_append, parent_dir, parse_line};

/// Total-order wrapper so float fields can participate in sort keys.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct F64Key(pub f64);

impl Eq for F64Key {}

impl PartialOrd for F64Key {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for F64Key {
    fn cmp(&self, other: &Self) -> Ordering {
        self.0.total_cmp(&other.0)
    }
}

#[derive(PartialEq, Eq)]
struct RunEntry<K: Ord> {
    key: K,
    run: usize,
    line: String,
}

impl<K: Ord> Ord for RunEntry<K> {
    fn cmp(&self, other: &Self) -> Ordering {
        // Reverse ordering for min-heap; run index keeps equal keys stable.
        other
            .key
            .cmp(&self.key)
            .then_with(|| other.run.cmp(&self.run))
    }
}

impl<K: Ord> PartialOrd for RunEntry<K> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl<T: Serialize + DeserializeOwned> JsonlStore<T> {
    /// Stable external sort of the whole store by `key`, ascending (or
    /// descending when `reverse`). Peak memory is `chunk_size` records plus
    /// one in-flight record per spilled run.
    pub fn sort_by_key<K, F>(&mut self, key: F, reverse: bool, chunk_size: usize) -> Result<()>
    where
        K: Ord,
        F: Fn(&T) -> K,
    {
        if reverse {
            self.external_sort(|record| Reverse(key(record)), chunk_size)
        } else {
            self.external_sort(key, chunk_size)
        }
    }

    fn external_sort<K, F>(&mut self, key: F, chunk_size: usize) -> Result<()>
    where
        K: Ord,
        F: Fn(&T) -> K,
    {
        let chunk_size = chunk_size.max(1);
        let mut runs = self.spill_sorted_runs(&key, chunk_size)?;

        let parent = parent_dir(&self.path);
        let mut merged = tempfile::NamedTempFile::new_in(parent)?;
        {
            let mut writer = BufWriter::new(merged.as_file_mut());
            let mut heap: BinaryHeap<RunEntry<K>> = BinaryHeap::with_capacity(runs.len());
            let mut record_number = 0usize;

            for (run, reader) in runs.iter_mut().enumerate() {
                if let Some(line) = next_line(reader)? {
                    record_number += 1;
                    let record: T = parse_line(line.trim(), record_number)?;
                    heap.push(RunEntry {
                        key: key(&record),
                        run,
                        line,
                    });
                }
            }

            while let Some(entry) = heap.pop() {
                writer.write_all(entry.line.as_bytes())?;
                if !entry.line.ends_with('\n') {
                    writer.write_all(b"\n")?;
                }
                if let Some(line) = next_line(&mut runs[entry.run])? {
                    record_number += 1;
                    let record: T = parse_line(line.trim(), record_number)?;
                    heap.push(RunEntry {
                        key: key(&record),
                        run: entry.run,
                        line,
                    });
                }
            }
            writer.flush()?;
        }
        merged.persist(&self.path).map_err(|e| e.error)?;
        self.writer = open_append(&self.path)?;
        Ok(())
    }

    fn spill_sorted_runs<K, F>(
        &mut self,
        key: &F,
        chunk_size: usize,
    ) -> Result<Vec<BufReader<File>>>
    where
        K: Ord,
        F: Fn(&T) -> K,
    {
        self.writer.flush()?;
        let input = File::open(&self.path)?;
        let mut reader = BufReader::with_capacity(1 << 20, input);
        let mut runs = Vec::new();
        let mut line_number = 0usize;

        loop {
            let mut chunk: Vec<(K, String)> = Vec::with_capacity(chunk_size.min(1 << 16));
            while chunk.len() < chunk_size {
                let Some(line) = next_line(&mut reader)? else {
                    break;
                };
                line_number += 1;
                let record: T = parse_line(line.trim(), line_number)?;
                chunk.push((key(&record), line));
            }
            if chunk.is_empty() {
                break;
            }
            chunk.sort_by(|a, b| a.0.cmp(&b.0));

            let mut run = tempfile::tempfile()?;
            {
                let mut writer = BufWriter::new(&mut run);
                for (_, line) in &chunk {
                    writer.write_all(line.as_bytes())?;
                    if !line.ends_with('\n') {
                        writer.write_all(b"\n")?;
                    }
                }
                writer.flush()?;
            }
            run.seek(SeekFrom::Start(0))?;
            runs.push(BufReader::with_capacity(1 << 16, run));
        }
        Ok(runs)
    }
}

fn next_line<R: BufRead>(reader: &mut R) -> Result<Option<String>> {
    let mut line = String::new();
    loop {
        line.clear();
        if reader.read_line(&mut line)? == 0 {
            return Ok(None);
        }
        if !line.trim().is_empty() {
            return Ok(Some(line));
        }
    }
}

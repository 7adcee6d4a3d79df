//! On-disk cache of whole-sequence window values.
//!
//! One file per `(sequence id, method)` under the cache directory, holding
//! the window value array as little-endian f64. Entries are validated
//! against the expected window count for `(window, sequence length)`; a
//! mismatch invalidates the entry and the values are recomputed. Writes go
//! through a temp file and an atomic rename so concurrent readers never see
//! a partial file.

use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use log::warn;
use memmap2::Mmap;

use crate::error::Result;
use crate::rotate::finder::WindowValues;
use crate::rotate::window::WindowMethod;

/// Default cache directory name, created next to the input file.
pub const CACHE_DIR_NAME: &str = ".rotate_windows";

pub struct WindowCache {
    dir: PathBuf,
}

impl WindowCache {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Cache directory rooted next to `input`.
    pub fn beside(input: &Path) -> Self {
        let parent = match input.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };
        Self::new(parent.join(CACHE_DIR_NAME))
    }

    fn file_path(&self, seq_id: &str, method: WindowMethod) -> PathBuf {
        self.dir
            .join(format!("{}_{}.bin", sanitize_id(seq_id), method.label()))
    }

    /// Load the cached values for one sequence, or `None` on a miss. A file
    /// whose size disagrees with the expected window count is treated as
    /// corrupt: it is removed and the caller recomputes.
    pub fn load(
        &self,
        seq_id: &str,
        method: WindowMethod,
        window: usize,
        seq_len: usize,
    ) -> Option<CachedValues> {
        if window == 0 || window > seq_len {
            return None;
        }
        let path = self.file_path(seq_id, method);
        let file = File::open(&path).ok()?;
        let mmap = unsafe { Mmap::map(&file) }.ok()?;
        let expected = (seq_len - window + 1) * 8;
        if mmap.len() != expected {
            warn!(
                "window cache {path:?} holds {} bytes, expected {expected}; recomputing",
                mmap.len()
            );
            let _ = fs::remove_file(&path);
            return None;
        }
        Some(CachedValues { mmap })
    }

    /// Persist the value array for one sequence.
    pub fn store(&self, seq_id: &str, method: WindowMethod, values: &[f64]) -> Result<()> {
        fs::create_dir_all(&self.dir)?;
        let mut tmp = tempfile::NamedTempFile::new_in(&self.dir)?;
        {
            let mut writer = BufWriter::with_capacity(1 << 20, tmp.as_file_mut());
            for &value in values {
                writer.write_all(&value.to_le_bytes())?;
            }
            writer.flush()?;
        }
        tmp.persist(self.file_path(seq_id, method))
            .map_err(|e| e.error)?;
        Ok(())
    }
}

/// A memory-mapped window value array for one whole sequence.
pub struct CachedValues {
    mmap: Mmap,
}

impl CachedValues {
    pub fn len(&self) -> usize {
        self.mmap.len() / 8
    }

    pub fn is_empty(&self) -> bool {
        self.mmap.is_empty()
    }

    fn read_range(&self, from: usize, to: usize) -> Vec<f64> {
        self.mmap[from * 8..to * 8]
            .chunks_exact(8)
            .map(|chunk| {
                let mut raw = [0u8; 8];
                raw.copy_from_slice(chunk);
                f64::from_le_bytes(raw)
            })
            .collect()
    }

    /// View of the values whose window starts fall inside the gap
    /// `[gap_start, gap_end)` of the original sequence.
    pub(crate) fn slice(&self, gap_start: usize, gap_end: usize, window: usize) -> CachedSlice<'_> {
        CachedSlice {
            values: self,
            base: gap_start,
            len: (gap_end - gap_start + 1).saturating_sub(window),
        }
    }
}

pub(crate) struct CachedSlice<'a> {
    values: &'a CachedValues,
    base: usize,
    len: usize,
}

impl WindowValues for CachedSlice<'_> {
    fn len(&self) -> usize {
        self.len
    }

    fn values(&self, from: usize, to: usize) -> Vec<f64> {
        self.values.read_range(self.base + from, self.base + to)
    }
}

fn sanitize_id(raw: &str) -> String {
    let mut sanitized = String::new();
    for ch in raw.chars() {
        if ch.is_ascii_alphanumeric() || matches!(ch, '-' | '_') {
            sanitized.push(ch);
        } else {
            sanitized.push('_');
        }
    }
    if sanitized.is_empty() {
        "sequence".to_string()
    } else {
        sanitized
    }
}

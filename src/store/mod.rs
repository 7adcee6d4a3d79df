//! Line-delimited JSON record stores.
//!
//! A [`JsonlStore`] is an ordered, append-only collection of typed records,
//! one JSON object per line. Stores created without an explicit path back
//! onto a temp file that is deleted on [`JsonlStore::close`] or drop.
//! Mutations (append, sort, truncate, clear) invalidate any outstanding
//! iterator; `iter` always restarts from the beginning of the file.

mod sort;

pub use sort::F64Key;

use std::fs::{self, File, OpenOptions};
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::marker::PhantomData;
use std::path::{Path, PathBuf};

use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::error::{IdealError, Result};

pub struct JsonlStore<T> {
    path: PathBuf,
    is_temp: bool,
    writer: BufWriter<File>,
    _marker: PhantomData<fn() -> T>,
}

impl<T: Serialize + DeserializeOwned> JsonlStore<T> {
    /// Open a store at `path`, creating the file when missing. Existing
    /// records are preserved; appends go to the end.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let writer = open_append(&path)?;
        Ok(Self {
            path,
            is_temp: false,
            writer,
            _marker: PhantomData,
        })
    }

    /// Create a store backed by a fresh temp file. The file is removed on
    /// `close` or drop.
    pub fn temp() -> Result<Self> {
        let file = tempfile::Builder::new()
            .prefix("idealwin-")
            .suffix(".jsonl")
            .tempfile()?;
        let (_, path) = file.keep().map_err(|e| e.error)?;
        let writer = open_append(&path)?;
        Ok(Self {
            path,
            is_temp: true,
            writer,
            _marker: PhantomData,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append one record. The line is flushed to the OS but not fsynced.
    pub fn append(&mut self, record: &T) -> Result<()> {
        serde_json::to_writer(&mut self.writer, record).map_err(|e| {
            if e.is_io() {
                IdealError::Io(e.into())
            } else {
                IdealError::Internal(format!("record serialization failed: {e}"))
            }
        })?;
        self.writer.write_all(b"\n")?;
        self.writer.flush()?;
        Ok(())
    }

    /// Iterate records in insertion order, restarting from the beginning.
    pub fn iter(&self) -> Result<StoreIter<T>> {
        let file = File::open(&self.path)?;
        Ok(StoreIter {
            reader: BufReader::with_capacity(1 << 20, file),
            line: String::new(),
            line_number: 0,
            _marker: PhantomData,
        })
    }

    /// Number of records, by scanning the file.
    pub fn len(&self) -> Result<usize> {
        let file = File::open(&self.path)?;
        let mut reader = BufReader::with_capacity(1 << 20, file);
        let mut line = String::new();
        let mut count = 0usize;
        loop {
            line.clear();
            if reader.read_line(&mut line)? == 0 {
                break;
            }
            if !line.trim().is_empty() {
                count += 1;
            }
        }
        Ok(count)
    }

    pub fn is_empty(&self) -> Result<bool> {
        Ok(self.len()? == 0)
    }

    /// Keep the first `keep` records and drop the rest.
    pub fn truncate_head(&mut self, keep: usize) -> Result<()> {
        let parent = parent_dir(&self.path);
        let mut tmp = tempfile::NamedTempFile::new_in(parent)?;
        {
            let file = File::open(&self.path)?;
            let mut reader = BufReader::with_capacity(1 << 20, file);
            let mut writer = BufWriter::new(tmp.as_file_mut());
            let mut line = String::new();
            let mut written = 0usize;
            while written < keep {
                line.clear();
                if reader.read_line(&mut line)? == 0 {
                    break;
                }
                if line.trim().is_empty() {
                    continue;
                }
                writer.write_all(line.as_bytes())?;
                if !line.ends_with('\n') {
                    writer.write_all(b"\n")?;
                }
                written += 1;
            }
            writer.flush()?;
        }
        tmp.persist(&self.path).map_err(|e| e.error)?;
        self.writer = open_append(&self.path)?;
        Ok(())
    }

    /// Remove all records.
    pub fn clear(&mut self) -> Result<()> {
        File::create(&self.path)?;
        self.writer = open_append(&self.path)?;
        Ok(())
    }

    /// Release resources; temporary stores delete their backing file.
    pub fn close(mut self) -> Result<()> {
        self.writer.flush()?;
        if self.is_temp {
            self.is_temp = false;
            match fs::remove_file(&self.path) {
                Ok(()) => {}
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => return Err(e.into()),
            }
        }
        Ok(())
    }
}

impl<T> Drop for JsonlStore<T> {
    fn drop(&mut self) {
        if self.is_temp {
            let _ = fs::remove_file(&self.path);
        }
    }
}

pub struct StoreIter<T> {
    reader: BufReader<File>,
    line: String,
    line_number: usize,
    _marker: PhantomData<fn() -> T>,
}

impl<T: DeserializeOwned> Iterator for StoreIter<T> {
    type Item = Result<T>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            self.line.clear();
            match self.reader.read_line(&mut self.line) {
                Ok(0) => return None,
                Ok(_) => {}
                Err(e) => return Some(Err(e.into())),
            }
            self.line_number += 1;
            let trimmed = self.line.trim();
            if trimmed.is_empty() {
                continue;
            }
            return Some(parse_line(trimmed, self.line_number));
        }
    }
}

pub(crate) fn parse_line<T: DeserializeOwned>(line: &str, number: usize) -> Result<T> {
    serde_json::from_str(line).map_err(|source| IdealError::Record {
        line: number,
        source,
    })
}

fn open_append(path: &Path) -> Result<BufWriter<File>> {
    let file = OpenOptions::new().create(true).append(true).open(path)?;
    Ok(BufWriter::new(file))
}

pub(crate) fn parent_dir(path: &Path) -> &Path {
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    }
}

//! FASTA ingestion: one symbolic JSONL record per FASTA sequence.

use std::path::Path;

use needletail::parse_fastx_file;

use crate::error::{IdealError, Result};
use crate::records::SymbolRecord;
use crate::store::JsonlStore;

/// Convert a FASTA file into a symbolic record store at `jsonl_path`,
/// replacing any previous contents. The record id is the header up to the
/// first whitespace; sequences keep their original case.
pub fn fasta_to_store(fasta: &Path, jsonl_path: &Path) -> Result<JsonlStore<SymbolRecord>> {
    let mut store = JsonlStore::open(jsonl_path)?;
    store.clear()?;

    let mut reader = parse_fastx_file(fasta)
        .map_err(|e| IdealError::InvalidInput(format!("failed to open {fasta:?}: {e}")))?;
    let mut index = 0usize;
    while let Some(record) = reader.next() {
        let record = record.map_err(|e| {
            IdealError::InvalidInput(format!("malformed FASTA record in {fasta:?}: {e}"))
        })?;
        index += 1;
        let id = record_id(record.id(), index);
        let seq = record.seq();
        let seq = std::str::from_utf8(&seq)
            .map_err(|e| {
                IdealError::InvalidInput(format!("sequence {id} is not valid UTF-8: {e}"))
            })?
            .to_string();
        store.append(&SymbolRecord { id, seq })?;
    }
    Ok(store)
}

fn record_id(header: &[u8], index: usize) -> String {
    let header = String::from_utf8_lossy(header);
    header
        .split_whitespace()
        .next()
        .filter(|token| !token.is_empty())
        .map(str::to_string)
        .unwrap_or_else(|| format!("sequence_{index}"))
}

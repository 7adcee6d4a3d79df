//! Symbol-to-numeric translation.

use std::collections::HashMap;
use std::path::Path;

use crate::error::Result;
use crate::records::{NumericRecord, SymbolRecord};
use crate::store::JsonlStore;

/// Finite symbol dictionary with a default value for unmapped symbols.
#[derive(Debug, Clone)]
pub struct SymbolMap {
    dict: HashMap<char, f64>,
    default: f64,
}

impl SymbolMap {
    pub fn new(dict: HashMap<char, f64>, default: f64) -> Self {
        Self { dict, default }
    }

    /// `G`, `C`, `g`, `c` map to 1; everything else to `default`.
    pub fn gc(default: f64) -> Self {
        Self::preset(&['G', 'C', 'g', 'c'], default)
    }

    /// `A`, `T`, `a`, `t` map to 1; everything else to `default`.
    pub fn at(default: f64) -> Self {
        Self::preset(&['A', 'T', 'a', 't'], default)
    }

    fn preset(symbols: &[char], default: f64) -> Self {
        let dict = symbols.iter().map(|&symbol| (symbol, 1.0)).collect();
        Self::new(dict, default)
    }

    pub fn value(&self, symbol: char) -> f64 {
        self.dict.get(&symbol).copied().unwrap_or(self.default)
    }

    /// One-pass, position-preserving translation of a symbolic record.
    pub fn map_record(&self, record: &SymbolRecord) -> NumericRecord {
        let seq = record.seq.chars().map(|symbol| self.value(symbol)).collect();
        NumericRecord::new(record.id.clone(), seq)
    }
}

/// Translate every record of a symbolic store into a numeric store, backed
/// by `save_path` when given and by a temp file otherwise.
pub fn to_numeric_store(
    symbols: &JsonlStore<SymbolRecord>,
    map: &SymbolMap,
    save_path: Option<&Path>,
) -> Result<JsonlStore<NumericRecord>> {
    let mut numeric = match save_path {
        Some(path) => JsonlStore::open(path)?,
        None => JsonlStore::temp()?,
    };
    numeric.clear()?;
    for record in symbols.iter()? {
        numeric.append(&map.map_record(&record?))?;
    }
    Ok(numeric)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn gc_preset_maps_both_cases() {
        let map = SymbolMap::gc(0.0);
        let record = SymbolRecord {
            id: "dna".to_string(),
            seq: "GcAtN".to_string(),
        };
        let numeric = map.map_record(&record);
        assert_eq!(numeric.id, "dna");
        assert_eq!(numeric.seq, vec![1.0, 1.0, 0.0, 0.0, 0.0]);
        assert!(numeric.iter_results.is_empty());
    }

    #[test]
    fn unmapped_symbols_take_the_default() {
        let map = SymbolMap::at(0.5);
        let record = SymbolRecord {
            id: "dna".to_string(),
            seq: "AXG".to_string(),
        };
        assert_eq!(map.map_record(&record).seq, vec![1.0, 0.5, 0.5]);
    }

    #[test]
    fn explicit_dictionary_overrides_presets() {
        let dict = HashMap::from([('A', 2.0), ('B', -1.0)]);
        let map = SymbolMap::new(dict, 0.0);
        let record = SymbolRecord {
            id: "s".to_string(),
            seq: "ABBA".to_string(),
        };
        assert_eq!(map.map_record(&record).seq, vec![2.0, -1.0, -1.0, 2.0]);
    }

    #[test]
    fn store_translation_keeps_record_order() {
        let mut symbols: JsonlStore<SymbolRecord> = JsonlStore::temp().unwrap();
        for (id, seq) in [("a", "GG"), ("b", "AT")] {
            symbols
                .append(&SymbolRecord {
                    id: id.to_string(),
                    seq: seq.to_string(),
                })
                .unwrap();
        }
        let numeric = to_numeric_store(&symbols, &SymbolMap::gc(0.0), None).unwrap();
        let records: Vec<NumericRecord> = numeric.iter().unwrap().map(|r| r.unwrap()).collect();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].id, "a");
        assert_eq!(records[0].seq, vec![1.0, 1.0]);
        assert_eq!(records[1].seq, vec![0.0, 0.0]);
    }
}

//! Result output conversion.

use std::path::Path;

use crate::error::Result;
use crate::records::SelectedWindow;
use crate::store::JsonlStore;

/// Write a selected-window store as CSV: the field names as a header row,
/// then one row per record in store order.
pub fn write_csv(store: &JsonlStore<SelectedWindow>, csv_path: &Path) -> Result<()> {
    let mut writer = csv::Writer::from_path(csv_path)?;
    for record in store.iter()? {
        writer.serialize(&record?)?;
    }
    writer.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(start: usize) -> SelectedWindow {
        SelectedWindow {
            seq_id: "chr1".to_string(),
            start_idx: start,
            end_idx: start + 4,
            consecutive_window_length: 1,
            score: 0.5,
            score_diff: 0.5,
        }
    }

    #[test]
    fn csv_has_header_and_one_row_per_record() {
        let dir = tempfile::tempdir().unwrap();
        let mut store: JsonlStore<SelectedWindow> = JsonlStore::temp().unwrap();
        store.append(&record(0)).unwrap();
        store.append(&record(9)).unwrap();

        let csv_path = dir.path().join("out.csv");
        write_csv(&store, &csv_path).unwrap();

        let text = std::fs::read_to_string(&csv_path).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 3);
        assert_eq!(
            lines[0],
            "seq_id,start_idx,end_idx,consecutive_window_length,score,score_diff"
        );
        assert!(lines[1].starts_with("chr1,0,4,1,"));
        assert!(lines[2].starts_with("chr1,9,13,1,"));
    }
}

use std::collections::HashMap;

use ideal_windows::{
    FinderConfig, JsonlStore, NumericRecord, SelectedWindow, Selector, SymbolMap, WindowCache,
    fasta, mapper,
};

fn numeric_store(records: &[(&str, &str)], map: &SymbolMap) -> JsonlStore<NumericRecord> {
    let mut store: JsonlStore<NumericRecord> = JsonlStore::temp().unwrap();
    for (id, dna) in records {
        let symbol = ideal_windows::SymbolRecord {
            id: id.to_string(),
            seq: dna.to_string(),
        };
        store.append(&map.map_record(&symbol)).unwrap();
    }
    store
}

fn collect(store: &JsonlStore<SelectedWindow>) -> Vec<SelectedWindow> {
    store.iter().unwrap().map(|r| r.unwrap()).collect()
}

#[test]
fn duplicated_dna_yields_paired_runs() {
    let dna = "GCAATGGATTAGCTAGGTTCGAAAGTA";
    let map = SymbolMap::gc(0.0);
    let input = numeric_store(&[("test-dna", dna), ("copy", dna)], &map);

    let selector = Selector::new(FinderConfig::new(4, 6, 1.0));
    let selected = selector.find(input, None).unwrap();
    let records = collect(&selected);
    assert_eq!(records.len(), 6);

    for record in &records {
        assert_eq!(record.score, 0.5);
        assert_eq!(record.score_diff, 0.5);
    }

    // Stable (score_diff, start_idx) order interleaves the two ids.
    let starts: Vec<usize> = records.iter().map(|r| r.start_idx).collect();
    assert_eq!(starts, vec![0, 0, 4, 4, 9, 9]);
    let ids: Vec<&str> = records.iter().map(|r| r.seq_id.as_str()).collect();
    assert_eq!(
        ids,
        vec!["test-dna", "copy", "test-dna", "copy", "test-dna", "copy"]
    );

    for id in ["test-dna", "copy"] {
        let triples: Vec<(usize, usize, usize)> = records
            .iter()
            .filter(|r| r.seq_id == id)
            .map(|r| (r.start_idx, r.end_idx, r.consecutive_window_length))
            .collect();
        assert_eq!(triples, vec![(0, 3, 1), (4, 8, 2), (9, 22, 11)]);
    }
}

#[test]
fn high_gc_fasta_selects_the_gc_block() {
    let dir = tempfile::tempdir().unwrap();
    let fasta_path = dir.path().join("example.fasta");
    std::fs::write(
        &fasta_path,
        ">example_sequence\nGCGCGCGCGCGCGCGCATATATATATATAT\n",
    )
    .unwrap();

    let symbols = fasta::fasta_to_store(&fasta_path, &dir.path().join("example.jsonl")).unwrap();
    let numeric = mapper::to_numeric_store(&symbols, &SymbolMap::gc(0.0), None).unwrap();

    let selector = Selector::new(FinderConfig::new(8, 1, 1.0));
    let selected = selector.find(numeric, None).unwrap();
    let records = collect(&selected);

    assert_eq!(records.len(), 1);
    let record = &records[0];
    assert_eq!(record.seq_id, "example_sequence");
    assert_eq!(record.score, 1.0);
    assert_eq!(record.score_diff, 0.0);
    assert_eq!(record.start_idx, 0);
    assert_eq!(record.consecutive_window_length, 9);
    assert_eq!(record.end_idx, 15);
}

#[test]
fn kept_results_beat_every_rejected_candidate() {
    let map = SymbolMap::gc(0.0);
    let input = numeric_store(&[("all", "GGGGGG"), ("half", "GGAA"), ("none", "AAA")], &map);

    let selector = Selector::new(FinderConfig::new(2, 2, 1.0));
    let selected = selector.find(input, None).unwrap();
    let records = collect(&selected);

    assert_eq!(records.len(), 2);
    assert!(records.iter().all(|r| r.score_diff == 0.0));
    let ids: Vec<&str> = records.iter().map(|r| r.seq_id.as_str()).collect();
    assert!(ids.contains(&"all"));
    assert!(ids.contains(&"half"));
}

#[test]
fn later_rounds_fill_remaining_slots() {
    let map = SymbolMap::gc(0.0);
    let input = numeric_store(&[("seq", "GGAAGG")], &map);

    let selector = Selector::new(FinderConfig::new(2, 3, 1.0));
    let selected = selector.find(input, None).unwrap();
    let records = collect(&selected);

    assert_eq!(records.len(), 3);
    let diffs: Vec<f64> = records.iter().map(|r| r.score_diff).collect();
    assert_eq!(diffs, vec![0.0, 0.0, 1.0]);
    let starts: Vec<usize> = records.iter().map(|r| r.start_idx).collect();
    assert_eq!(starts, vec![0, 4, 2]);
}

#[test]
fn selection_stops_when_sequences_run_dry() {
    // Fewer candidates than requested: the loop must still terminate.
    let map = SymbolMap::gc(0.0);
    let input = numeric_store(&[("tiny", "GGA")], &map);

    let selector = Selector::new(FinderConfig::new(2, 10, 1.0));
    let selected = selector.find(input, None).unwrap();
    let records = collect(&selected);
    assert!(!records.is_empty());
    assert!(records.len() < 10);
}

#[test]
fn too_short_sequences_are_skipped_not_fatal() {
    let map = SymbolMap::gc(0.0);
    let input = numeric_store(&[("short", "GC"), ("long", "GGGGAAAA")], &map);

    let selector = Selector::new(FinderConfig::new(4, 2, 1.0));
    let selected = selector.find(input, None).unwrap();
    let records = collect(&selected);
    assert!(!records.is_empty());
    assert!(records.iter().all(|r| r.seq_id == "long"));
}

#[test]
fn window_cache_does_not_change_results() {
    let dir = tempfile::tempdir().unwrap();
    let dna = "GCAATGGATTAGCTAGGTTCGAAAGTAGGCCGATTACCA";
    let map = SymbolMap::gc(0.0);

    let cold_path = dir.path().join("cold.jsonl");
    let warm_path = dir.path().join("warm.jsonl");
    let cache_dir = dir.path().join(".rotate_windows");

    let selector = Selector::new(FinderConfig::new(4, 5, 1.0));
    let cold = selector
        .find(numeric_store(&[("s1", dna), ("s2", dna)], &map), Some(&cold_path))
        .unwrap();
    cold.close().unwrap();

    // Two cached runs: the first populates the cache, the second reads it.
    for _ in 0..2 {
        let cached_selector = Selector::new(FinderConfig::new(4, 5, 1.0))
            .with_cache(WindowCache::new(&cache_dir));
        let warm = cached_selector
            .find(numeric_store(&[("s1", dna), ("s2", dna)], &map), Some(&warm_path))
            .unwrap();
        warm.close().unwrap();

        let cold_bytes = std::fs::read(&cold_path).unwrap();
        let warm_bytes = std::fs::read(&warm_path).unwrap();
        assert_eq!(cold_bytes, warm_bytes);
    }
    assert!(cache_dir.join("s1_mean.bin").exists());
}

#[test]
fn explicit_dictionaries_flow_through_the_pipeline() {
    let dict = HashMap::from([('G', 1.0), ('C', 1.0)]);
    let map = SymbolMap::new(dict, 0.0);
    let input = numeric_store(&[("upper-only", "GCgc")], &map);

    // Lowercase symbols fall back to the default, so the best mean-1.0
    // window is the uppercase prefix.
    let selector = Selector::new(FinderConfig::new(2, 1, 1.0));
    let selected = selector.find(input, None).unwrap();
    let records = collect(&selected);
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].start_idx, 0);
    assert_eq!(records[0].score, 1.0);
}

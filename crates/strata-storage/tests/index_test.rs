//! End-to-end tests for the block arena and B+ tree index.
//!
//! Exercises the workload the crate is built for: ingest fixed-size rating
//! records from a TSV file, index them by vote count, answer point and range
//! queries with simulated I/O accounting, and delete with rebalancing.

use std::collections::HashSet;
use std::fs::File;
use std::io::{BufReader, Write};

use rand::seq::SliceRandom;
use strata_common::{RecordHandle, StorageConfig, StrataError};
use strata_storage::{load_ratings, BPlusTree, BlockArena, RatingRecord};

/// Synthetic rating rows: 100 titles, vote counts in 20 groups of 5.
fn sample_rows() -> Vec<(String, f32, i32)> {
    (0..100)
        .map(|i| {
            let title = format!("tt{:07}", i + 1);
            let rating = (i % 10) as f32 + 0.5;
            let votes = (i / 5) as i32 * 100;
            (title, rating, votes)
        })
        .collect()
}

fn write_tsv(rows: &[(String, f32, i32)]) -> tempfile::NamedTempFile {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(file, "tconst\taverageRating\tnumVotes").unwrap();
    for (title, rating, votes) in rows {
        writeln!(file, "{title}\t{rating}\t{votes}").unwrap();
    }
    file.flush().unwrap();
    file
}

#[test]
fn test_ingest_then_query() {
    let rows = sample_rows();
    let file = write_tsv(&rows);

    let config = StorageConfig::new(10_000, 200);
    let mut arena = BlockArena::new(&config).unwrap();
    let mut tree = BPlusTree::new(config.block_capacity).unwrap();

    let reader = BufReader::new(File::open(file.path()).unwrap());
    let stats = load_ratings(reader, &mut arena, &mut tree).unwrap();

    assert_eq!(stats.records, 100);
    assert_eq!(stats.bytes_used, 100 * RatingRecord::SIZE);
    // A 200-byte block holds 11 records of 18 bytes.
    assert_eq!(stats.blocks_used, 10);
    assert_eq!(arena.blocks_used(), 10);

    // Fanout follows from the block size: (200 - 8) / 16 = 12.
    assert_eq!(tree.max_keys(), 12);

    // Every vote group resolves to its 5 records, byte-for-byte.
    let bucket = tree.search(700).unwrap();
    assert_eq!(bucket.len(), 5);
    for &handle in bucket {
        let record =
            RatingRecord::from_bytes(arena.read(handle, RatingRecord::SIZE).unwrap()).unwrap();
        assert_eq!(record.votes, 700);
    }

    assert!(matches!(
        tree.search(701),
        Err(StrataError::KeyNotFound(701))
    ));
}

#[test]
fn test_range_scan_accounting_matches_source_rows() {
    let rows = sample_rows();
    let file = write_tsv(&rows);

    let config = StorageConfig::new(10_000, 200);
    let mut arena = BlockArena::new(&config).unwrap();
    let mut tree = BPlusTree::new(config.block_capacity).unwrap();
    let reader = BufReader::new(File::open(file.path()).unwrap());
    load_ratings(reader, &mut arena, &mut tree).unwrap();

    let (low, high) = (500, 900);

    // Expected values computed from the source rows, not the index.
    let matching: Vec<usize> = (0..rows.len())
        .filter(|&i| (low..=high).contains(&(rows[i].2 as i64)))
        .collect();
    let expected_mean = matching.iter().map(|&i| rows[i].1 as f64).sum::<f64>()
        / matching.len() as f64;
    // Records are appended in row order: row i lives in block i / 11.
    let expected_blocks: HashSet<usize> = matching.iter().map(|&i| i / 11).collect();

    let stats = tree
        .range_scan(low, high, |handle| {
            let bytes = arena.read(handle, RatingRecord::SIZE).unwrap();
            RatingRecord::from_bytes(bytes).unwrap().rating as f64
        })
        .unwrap();

    assert_eq!(stats.records_visited, matching.len());
    assert_eq!(stats.distinct_blocks_touched, expected_blocks.len());
    assert!((stats.mean_of_field - expected_mean).abs() < 1e-9);
    assert_eq!(stats.internal_nodes_visited, tree.height() - 1);
}

#[test]
fn test_duplicate_then_split_then_delete_scenario() {
    // Two 18-byte records per 40-byte block; max_keys = (40 - 8) / 16 = 2.
    let config = StorageConfig::new(400, 40);
    let mut arena = BlockArena::new(&config).unwrap();
    let mut tree = BPlusTree::new(config.block_capacity).unwrap();
    assert_eq!(tree.max_keys(), 2);

    let rows = [
        ("tt1", 8.0f32, 500),
        ("tt2", 6.0f32, 300),
        ("tt3", 7.0f32, 500),
        ("tt4", 5.0f32, 700),
    ];
    let mut handles: Vec<RecordHandle> = Vec::new();
    for (title, rating, votes) in rows {
        let record = RatingRecord::new(title, rating, votes).unwrap();
        let handle = arena.add_record(RatingRecord::SIZE).unwrap();
        arena.write(handle, &record.to_bytes()).unwrap();
        tree.insert(votes as i64, handle).unwrap();
        handles.push(handle);
    }

    // Third insert was a duplicate: the split came from the fourth.
    assert_eq!(tree.height(), 2);
    assert_eq!(tree.node_count(), 3);
    // The bucket keeps its handles in insertion order.
    assert_eq!(tree.search(500).unwrap(), &[handles[0], handles[2]]);

    let stats = tree
        .range_scan(300, 700, |handle| {
            let bytes = arena.read(handle, RatingRecord::SIZE).unwrap();
            RatingRecord::from_bytes(bytes).unwrap().rating as f64
        })
        .unwrap();
    assert_eq!(stats.records_visited, 4);
    // Records 0-1 share block 0, records 2-3 share block 1.
    assert_eq!(stats.distinct_blocks_touched, 2);
    assert!((stats.mean_of_field - 6.5).abs() < 1e-9);

    let keys: Vec<i64> = tree
        .range_entries(300, 700)
        .unwrap()
        .iter()
        .map(|&(k, _)| k)
        .collect();
    assert_eq!(keys, vec![300, 500, 500, 700]);

    tree.remove(500).unwrap();
    assert!(matches!(
        tree.search(500),
        Err(StrataError::KeyNotFound(500))
    ));
    let keys: Vec<i64> = tree
        .range_entries(0, 1000)
        .unwrap()
        .iter()
        .map(|&(k, _)| k)
        .collect();
    assert_eq!(keys, vec![300, 700]);
}

#[test]
fn test_shuffled_round_trip() {
    let config = StorageConfig::new(100_000, 200);
    let mut arena = BlockArena::new(&config).unwrap();
    let mut tree = BPlusTree::new(config.block_capacity).unwrap();

    let mut votes: Vec<i64> = (0..500).map(|i| i * 7).collect();
    votes.shuffle(&mut rand::rng());

    let mut handles = Vec::new();
    for &v in &votes {
        let handle = arena.add_record(RatingRecord::SIZE).unwrap();
        tree.insert(v, handle).unwrap();
        handles.push((v, handle));
    }

    // Round-trip: every inserted key resolves to its handle.
    for &(v, handle) in &handles {
        assert_eq!(tree.search(v).unwrap(), &[handle]);
    }

    // Order preservation regardless of insertion order.
    let scanned: Vec<i64> = tree
        .range_entries(i64::MIN, i64::MAX)
        .unwrap()
        .iter()
        .map(|&(k, _)| k)
        .collect();
    let mut expected = votes.clone();
    expected.sort_unstable();
    assert_eq!(scanned, expected);

    // Remove half, in a fresh shuffled order.
    let mut to_remove = votes[..250].to_vec();
    to_remove.shuffle(&mut rand::rng());
    for &v in &to_remove {
        tree.remove(v).unwrap();
        assert!(matches!(tree.search(v), Err(StrataError::KeyNotFound(_))));
    }
    let removed: HashSet<i64> = to_remove.iter().copied().collect();
    for &(v, handle) in &handles {
        if !removed.contains(&v) {
            assert_eq!(tree.search(v).unwrap(), &[handle]);
        }
    }
}

#[test]
fn test_ingest_aborts_when_storage_exhausted() {
    let rows = sample_rows();
    let file = write_tsv(&rows);

    // Room for 3 blocks of 2 records each: the 7th record must fail.
    let config = StorageConfig::new(120, 40);
    let mut arena = BlockArena::new(&config).unwrap();
    let mut tree = BPlusTree::new(config.block_capacity).unwrap();

    let reader = BufReader::new(File::open(file.path()).unwrap());
    let err = load_ratings(reader, &mut arena, &mut tree).unwrap_err();
    assert!(matches!(err, StrataError::StorageExhausted { .. }));
    assert_eq!(arena.record_count(), 6);
    assert_eq!(arena.blocks_used(), 3);
}

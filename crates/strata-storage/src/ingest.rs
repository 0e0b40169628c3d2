//! Line-oriented ingestion of tab-separated rating rows.
//!
//! Each row is `title_id <tab> rating <tab> votes`. The first line is a
//! header and is skipped. Every parsed record is stored in the arena and
//! indexed by its vote count; the arena handle is the only state shared
//! between the two.

use std::io::BufRead;

use strata_common::{Result, StrataError};
use tracing::debug;

use crate::arena::BlockArena;
use crate::btree::{BPlusTree, Key};
use crate::record::RatingRecord;

/// Summary of a completed load.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoadStats {
    /// Records stored and indexed.
    pub records: usize,
    /// Blocks the arena allocated so far.
    pub blocks_used: usize,
    /// Bytes occupied by records in the arena.
    pub bytes_used: usize,
}

/// Reads rating rows from `reader`, stores each record in the arena, and
/// inserts `(votes, handle)` into the index.
///
/// Malformed rows fail the load with [`StrataError::InvalidRecord`]; arena
/// exhaustion aborts it with [`StrataError::StorageExhausted`] rather than
/// skipping the record, so the index never references more rows than the
/// arena holds.
pub fn load_ratings<R: BufRead>(
    reader: R,
    arena: &mut BlockArena,
    tree: &mut BPlusTree,
) -> Result<LoadStats> {
    let mut lines = reader.lines();
    // Header row.
    lines.next().transpose()?;

    let mut records = 0;
    for line in lines {
        let line = line?;
        if line.is_empty() {
            continue;
        }
        let record = parse_row(&line)?;
        let handle = arena.add_record(RatingRecord::SIZE)?;
        arena.write(handle, &record.to_bytes())?;
        tree.insert(record.votes as Key, handle)?;
        records += 1;
    }

    debug!(records, blocks = arena.blocks_used(), "load complete");
    Ok(LoadStats {
        records,
        blocks_used: arena.blocks_used(),
        bytes_used: arena.used_bytes(),
    })
}

fn parse_row(line: &str) -> Result<RatingRecord> {
    let mut fields = line.split('\t');
    let title_id = fields
        .next()
        .filter(|s| !s.is_empty())
        .ok_or_else(|| StrataError::InvalidRecord(format!("missing title id: {line:?}")))?;
    let rating = fields
        .next()
        .and_then(|s| s.parse::<f32>().ok())
        .ok_or_else(|| StrataError::InvalidRecord(format!("bad rating field: {line:?}")))?;
    let votes = fields
        .next()
        .and_then(|s| s.parse::<i32>().ok())
        .ok_or_else(|| StrataError::InvalidRecord(format!("bad votes field: {line:?}")))?;
    RatingRecord::new(title_id, rating, votes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;
    use strata_common::StorageConfig;

    const HEADER: &str = "tconst\taverageRating\tnumVotes\n";

    fn setup(storage: usize, block: usize) -> (BlockArena, BPlusTree) {
        let config = StorageConfig::new(storage, block);
        let arena = BlockArena::new(&config).unwrap();
        let tree = BPlusTree::new(config.block_capacity).unwrap();
        (arena, tree)
    }

    #[test]
    fn test_parse_row() {
        let record = parse_row("tt0000001\t5.6\t1589").unwrap();
        assert_eq!(record.title_id_str(), "tt0000001");
        assert_eq!(record.rating, 5.6);
        assert_eq!(record.votes, 1589);
    }

    #[test]
    fn test_parse_row_rejects_malformed_input() {
        assert!(matches!(
            parse_row("tt0000001\tnot-a-number\t1589"),
            Err(StrataError::InvalidRecord(_))
        ));
        assert!(matches!(
            parse_row("tt0000001\t5.6"),
            Err(StrataError::InvalidRecord(_))
        ));
        assert!(matches!(
            parse_row(""),
            Err(StrataError::InvalidRecord(_))
        ));
    }

    #[test]
    fn test_load_stores_and_indexes() {
        let data = format!(
            "{HEADER}tt0000001\t5.6\t1589\ntt0000002\t6.1\t198\ntt0000003\t6.5\t1589\n"
        );
        let (mut arena, mut tree) = setup(10_000, 200);

        let stats = load_ratings(Cursor::new(data), &mut arena, &mut tree).unwrap();
        assert_eq!(stats.records, 3);
        assert_eq!(stats.bytes_used, 3 * RatingRecord::SIZE);
        assert_eq!(stats.blocks_used, 1);

        // Duplicate vote counts share one key.
        let bucket = tree.search(1589).unwrap();
        assert_eq!(bucket.len(), 2);
        let record = RatingRecord::from_bytes(
            arena.read(bucket[0], RatingRecord::SIZE).unwrap(),
        )
        .unwrap();
        assert_eq!(record.title_id_str(), "tt0000001");
        assert_eq!(record.votes, 1589);

        assert_eq!(tree.search(198).unwrap().len(), 1);
    }

    #[test]
    fn test_load_skips_header_and_blank_lines() {
        let data = format!("{HEADER}\ntt0000001\t5.6\t10\n\n");
        let (mut arena, mut tree) = setup(10_000, 200);

        let stats = load_ratings(Cursor::new(data), &mut arena, &mut tree).unwrap();
        assert_eq!(stats.records, 1);
        assert_eq!(arena.record_count(), 1);
    }

    #[test]
    fn test_load_empty_input() {
        let (mut arena, mut tree) = setup(10_000, 200);
        let stats = load_ratings(Cursor::new(""), &mut arena, &mut tree).unwrap();
        assert_eq!(stats.records, 0);
        assert_eq!(stats.blocks_used, 0);
    }

    #[test]
    fn test_load_aborts_on_exhaustion() {
        // One 40-byte block holds exactly two 18-byte records.
        let (mut arena, mut tree) = setup(40, 40);
        let data = format!(
            "{HEADER}tt1\t1.0\t1\ntt2\t2.0\t2\ntt3\t3.0\t3\n"
        );

        let err = load_ratings(Cursor::new(data), &mut arena, &mut tree).unwrap_err();
        assert!(matches!(err, StrataError::StorageExhausted { .. }));

        // The two records that fit were stored and indexed before the abort.
        assert_eq!(arena.record_count(), 2);
        assert!(tree.search(1).is_ok());
        assert!(tree.search(2).is_ok());
        assert!(matches!(tree.search(3), Err(StrataError::KeyNotFound(3))));
    }

    #[test]
    fn test_load_fails_on_malformed_row() {
        let data = format!("{HEADER}tt1\t1.0\tmany\n");
        let (mut arena, mut tree) = setup(10_000, 200);
        assert!(matches!(
            load_ratings(Cursor::new(data), &mut arena, &mut tree),
            Err(StrataError::InvalidRecord(_))
        ));
    }
}

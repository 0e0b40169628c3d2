//! Storage engine for StrataDB.
//!
//! This crate provides:
//! - A simulated block-structured storage arena handing out stable record
//!   handles
//! - A fixed-size rating record format and line-oriented TSV ingestion
//! - A B+ tree secondary index whose fanout is derived from the block size

mod arena;
mod btree;
mod ingest;
mod record;

pub use arena::BlockArena;
pub use btree::{
    max_keys_for, BPlusTree, Key, RangeScanStats, BUCKET_REF_SIZE, CHILD_REF_SIZE, KEY_SIZE,
};
pub use ingest::{load_ratings, LoadStats};
pub use record::{RatingRecord, TITLE_ID_LEN};

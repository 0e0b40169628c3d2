//! B+ tree secondary index sized to simulated disk blocks.
//!
//! The index maintains sorted key order over opaque arena record handles:
//!
//! - fanout is derived once from the block capacity ([`constants`]), so a
//!   node always fits in one simulated block;
//! - nodes live in a slot store ([`store`]) and reference each other by id,
//!   with leaves chained left-to-right for ordered range scans;
//! - duplicate keys share one leaf slot and grow that key's bucket instead
//!   of restructuring the tree;
//! - lookups and range scans account for the simulated I/O they perform:
//!   index nodes touched and distinct data blocks resolved through handles.

mod constants;
mod node;
mod store;
mod tree;

/// Key type indexed by the tree.
pub type Key = i64;

pub use constants::{max_keys_for, BUCKET_REF_SIZE, CHILD_REF_SIZE, KEY_SIZE};
pub use tree::{BPlusTree, RangeScanStats};

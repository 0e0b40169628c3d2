//! Fixed-size rating record format.
//!
//! This is the record the ingestion collaborator feeds into the arena: a
//! zero-padded title identifier, the average rating, and the vote count. The
//! vote count is the indexed key; the rating is the non-key field aggregated
//! during cost-accounted scans.

use bytes::{BufMut, Bytes, BytesMut};
use strata_common::{Result, StrataError};

/// Length of the zero-padded title identifier (9 source characters plus a
/// terminator byte).
pub const TITLE_ID_LEN: usize = 10;

/// A movie rating record.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RatingRecord {
    /// Zero-padded title identifier.
    pub title_id: [u8; TITLE_ID_LEN],
    /// Average rating.
    pub rating: f32,
    /// Number of votes.
    pub votes: i32,
}

impl RatingRecord {
    /// Size of an encoded record in bytes.
    pub const SIZE: usize = TITLE_ID_LEN + 4 + 4;

    /// Creates a record, zero-padding the title identifier.
    pub fn new(title_id: &str, rating: f32, votes: i32) -> Result<Self> {
        if title_id.len() >= TITLE_ID_LEN {
            return Err(StrataError::InvalidRecord(format!(
                "title id too long: {:?}",
                title_id
            )));
        }
        let mut id = [0u8; TITLE_ID_LEN];
        id[..title_id.len()].copy_from_slice(title_id.as_bytes());
        Ok(Self {
            title_id: id,
            rating,
            votes,
        })
    }

    /// Returns the title identifier with the zero padding stripped.
    pub fn title_id_str(&self) -> &str {
        let end = self
            .title_id
            .iter()
            .position(|&b| b == 0)
            .unwrap_or(TITLE_ID_LEN);
        std::str::from_utf8(&self.title_id[..end]).unwrap_or("")
    }

    /// Serializes the record to bytes.
    ///
    /// Layout (18 bytes):
    /// - title_id: 10 bytes (zero-padded)
    /// - rating: 4 bytes (f32, little-endian)
    /// - votes: 4 bytes (i32, little-endian)
    pub fn to_bytes(&self) -> Bytes {
        let mut buf = BytesMut::with_capacity(Self::SIZE);
        buf.put_slice(&self.title_id);
        buf.put_f32_le(self.rating);
        buf.put_i32_le(self.votes);
        buf.freeze()
    }

    /// Deserializes a record from bytes.
    pub fn from_bytes(buf: &[u8]) -> Option<Self> {
        if buf.len() < Self::SIZE {
            return None;
        }
        let mut title_id = [0u8; TITLE_ID_LEN];
        title_id.copy_from_slice(&buf[..TITLE_ID_LEN]);
        let rating = f32::from_le_bytes([buf[10], buf[11], buf[12], buf[13]]);
        let votes = i32::from_le_bytes([buf[14], buf[15], buf[16], buf[17]]);
        Some(Self {
            title_id,
            rating,
            votes,
        })
    }
}

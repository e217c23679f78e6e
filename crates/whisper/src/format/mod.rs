//! Whisper file format types.
//!
//! A Whisper file stores the history of a single metric as a fixed-size
//! header followed by one circular buffer per archive. All fields are
//! big-endian.
//!
//! ## File Structure
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │  Metadata (16 bytes)                                         │
//! │  - Aggregation method: u32                                   │
//! │  - Max retention (seconds): u32                              │
//! │  - X-files factor: f32                                       │
//! │  - Archive count: u32                                        │
//! ├─────────────────────────────────────────────────────────────┤
//! │  Archive Info (12 bytes, repeated archive count times)       │
//! │  - Offset: u32                                               │
//! │  - Seconds per point: u32                                    │
//! │  - Number of points: u32                                     │
//! ├─────────────────────────────────────────────────────────────┤
//! │  Archive Data (repeated per archive, finest first)           │
//! │  - Slots of (timestamp: u32, value: f64), 12 bytes each      │
//! └─────────────────────────────────────────────────────────────┘
//! ```

pub mod archive;
pub mod header;

pub use archive::{Archive, Database};
pub use header::decode_header;

/// Seconds since the Unix epoch, as used for query bounds.
pub type Timestamp = i64;

/// Size of the metadata block in bytes.
pub const METADATA_SIZE: usize = 16;

/// Size of one archive descriptor in bytes.
pub const ARCHIVE_INFO_SIZE: usize = 12;

/// Size of one stored point (slot) in bytes.
pub const POINT_SIZE: usize = 12;

/// Method used by writers to roll fine-grained values up into coarser
/// archives. Readers never apply it, but an unknown value marks the file as
/// unreadable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u32)]
pub enum AggregationMethod {
    /// Arithmetic mean of the non-empty values.
    Average = 1,
    /// Sum of the values.
    Sum = 2,
    /// Most recent value.
    Last = 3,
    /// Largest value.
    Max = 4,
    /// Smallest value.
    Min = 5,
    /// Mean with empty slots counted as zero.
    AvgZero = 6,
    /// Value with the largest magnitude.
    AbsMax = 7,
    /// Value with the smallest magnitude.
    AbsMin = 8,
}

impl AggregationMethod {
    /// Creates an AggregationMethod from its on-disk value.
    pub fn from_u32(value: u32) -> Option<Self> {
        match value {
            1 => Some(Self::Average),
            2 => Some(Self::Sum),
            3 => Some(Self::Last),
            4 => Some(Self::Max),
            5 => Some(Self::Min),
            6 => Some(Self::AvgZero),
            7 => Some(Self::AbsMax),
            8 => Some(Self::AbsMin),
            _ => None,
        }
    }

    /// Returns the on-disk value.
    pub fn as_u32(self) -> u32 {
        self as u32
    }
}

/// File-wide metadata block (16 bytes).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Metadata {
    /// Rollup method used by writers.
    pub aggregation: AggregationMethod,
    /// Retention of the coarsest archive, in seconds.
    pub max_retention: u32,
    /// Fraction of fine slots that must be known for a rollup to be written.
    pub x_files_factor: f32,
    /// Number of archive descriptors following the metadata.
    pub archive_count: u32,
}

impl Metadata {
    /// Creates a metadata block.
    pub fn new(
        aggregation: AggregationMethod,
        max_retention: u32,
        x_files_factor: f32,
        archive_count: u32,
    ) -> Self {
        Self {
            aggregation,
            max_retention,
            x_files_factor,
            archive_count,
        }
    }

    /// Size of the header (metadata plus descriptor table) this metadata
    /// declares, in bytes.
    pub fn header_size(&self) -> u64 {
        METADATA_SIZE as u64 + u64::from(self.archive_count) * ARCHIVE_INFO_SIZE as u64
    }
}

/// Descriptor of one archive (12 bytes).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ArchiveInfo {
    /// Byte offset of the archive's data region from file start.
    pub offset: u32,
    /// Resolution: seconds between consecutive slots.
    pub seconds_per_point: u32,
    /// Capacity in slots.
    pub num_points: u32,
}

impl ArchiveInfo {
    /// Creates an archive descriptor.
    pub fn new(offset: u32, seconds_per_point: u32, num_points: u32) -> Self {
        Self {
            offset,
            seconds_per_point,
            num_points,
        }
    }

    /// Time span the archive holds before slots are overwritten, in seconds.
    pub fn retention(&self) -> u64 {
        u64::from(self.seconds_per_point) * u64::from(self.num_points)
    }

    /// Size of the archive's data region in bytes.
    pub fn size(&self) -> u64 {
        u64::from(self.num_points) * POINT_SIZE as u64
    }

    /// Offset one past the end of the archive's data region.
    pub fn end(&self) -> u64 {
        u64::from(self.offset) + self.size()
    }
}

/// Decoded and validated file header.
///
/// Headers are only produced by [`Header::decode`], which guarantees the
/// archives are ordered finest first and lie inside the file.
#[derive(Debug, Clone, PartialEq)]
pub struct Header {
    metadata: Metadata,
    archives: Vec<ArchiveInfo>,
}

impl Header {
    /// Returns the metadata block.
    pub fn metadata(&self) -> &Metadata {
        &self.metadata
    }

    /// Returns the archive descriptors, finest resolution first.
    pub fn archives(&self) -> &[ArchiveInfo] {
        &self.archives
    }

    /// Size of the header in bytes.
    pub fn size(&self) -> u64 {
        self.metadata.header_size()
    }
}

/// A single `(timestamp, value)` slot.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Point {
    /// Seconds since the Unix epoch; zero marks an unwritten slot.
    pub timestamp: u32,
    /// Stored value.
    pub value: f64,
}

impl Point {
    /// Creates a point.
    pub fn new(timestamp: u32, value: f64) -> Self {
        Self { timestamp, value }
    }

    /// Returns true if the slot has never been written.
    pub fn is_empty(&self) -> bool {
        self.timestamp == 0
    }
}

//! Alopex Whisper - read-only query engine for Whisper time series files
//!
//! A Whisper file holds one metric's history as several round-robin
//! archives of decreasing resolution and increasing retention. This crate
//! decodes such files and answers range queries against them.
//!
//! # Components
//!
//! - [`format`]: header codec and archive slot decoding
//! - [`source`]: per-call byte access (positioned reads or memory maps)
//! - [`query`]: request validation, archive selection, circular buffer walk
//! - [`WhisperReader`]: ties the pieces together for files on disk
//!
//! The engine keeps no state between calls. Each query opens the file,
//! decodes what it needs and releases it before returning.
//!
//! # Example
//!
//! ```rust,ignore
//! use alopex_whisper::{fetch_header, fetch_points};
//!
//! let header = fetch_header(path)?;
//! println!("{} archives", header.archives().len());
//!
//! for point in fetch_points(path, from, until, now)? {
//!     println!("{}: {}", point.timestamp, point.value);
//! }
//! ```

#![deny(missing_docs)]

pub mod error;
pub mod format;
pub mod query;
pub mod reader;
pub mod source;

use std::path::Path;

pub use error::{ErrorKind, Result, WhisperError};
pub use format::{
    decode_header, AggregationMethod, Archive, ArchiveInfo, Database, Header, Metadata, Point,
    Timestamp,
};
pub use query::{FetchRequest, FetchResponse};
pub use reader::{AccessMode, ReaderConfig, WhisperReader};

/// Reads the header of the Whisper file at `path`.
///
/// No time-range checks apply to header-only reads.
pub fn fetch_header(path: &Path) -> Result<Header> {
    WhisperReader::default().read_header(path)
}

/// Reads the points of the Whisper file at `path` within `[from, until]`,
/// measuring retention back from `now`.
///
/// Points are returned in ascending timestamp order. Unwritten slots are
/// omitted rather than reported as gaps.
pub fn fetch_points(
    path: &Path,
    from: Timestamp,
    until: Timestamp,
    now: Timestamp,
) -> Result<Vec<Point>> {
    let request = FetchRequest::new(from, until, now);
    WhisperReader::default()
        .fetch(path, &request)
        .map(FetchResponse::into_points)
}

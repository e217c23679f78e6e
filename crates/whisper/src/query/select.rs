//! Archive selection by retention.

use crate::error::{Result, WhisperError};
use crate::format::{ArchiveInfo, Timestamp};
use crate::query::FetchRequest;

/// Picks the finest archive whose retention reaches back to `from`.
///
/// `archives` must be ordered finest first, as decoded headers are. Only a
/// single archive is ever used; there is no merging across resolutions.
///
/// # Errors
///
/// Returns `NoArchiveAvailable` if no archive retains `now - from` seconds.
pub fn select_archive(
    archives: &[ArchiveInfo],
    from: Timestamp,
    until: Timestamp,
    now: Timestamp,
) -> Result<&ArchiveInfo> {
    let required = FetchRequest::new(from, until, now).required_retention();

    archives
        .iter()
        .find(|archive| archive.retention() >= required)
        .ok_or(WhisperError::NoArchiveAvailable { required })
}

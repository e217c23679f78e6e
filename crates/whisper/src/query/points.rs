//! Circular buffer point extraction.
//!
//! Archives carry no write-head pointer. Slot 0's timestamp (the base)
//! anchors every other slot: the slot holding time `t` sits
//! `(t - base) / seconds_per_point` slots after slot 0, modulo capacity.
//! Reading starts at the slot for `from` (aligned down to the resolution)
//! and walks forward, wrapping at the end, visiting each slot at most once.

use crate::error::Result;
use crate::format::archive::{decode_slot, read_region};
use crate::format::{ArchiveInfo, Point, Timestamp};
use crate::source::ByteSource;
use tracing::debug;

/// Reads the points of `archive` that fall within `[from, until]`.
///
/// Empty slots are skipped, so the result is sparse: missing intervals are
/// simply absent. An archive whose first slot was never written yields no
/// points.
///
/// # Errors
///
/// Returns `CorruptDatabase` if the archive region extends past the end of
/// the source, or `IoError` if reading fails.
pub fn decode_points<S>(
    source: &mut S,
    archive: &ArchiveInfo,
    from: Timestamp,
    until: Timestamp,
) -> Result<Vec<Point>>
where
    S: ByteSource + ?Sized,
{
    let region = read_region(source, archive)?;
    points_in_region(&region, archive, from, until)
}

/// Index of the slot that holds the interval containing `from`.
pub(crate) fn start_index(archive: &ArchiveInfo, base: u32, from: Timestamp) -> usize {
    let step = i128::from(archive.seconds_per_point);
    let capacity = i128::from(archive.num_points);
    let from = i128::from(from);

    let from_interval = from - from.rem_euclid(step);
    let distance = (from_interval - i128::from(base)).div_euclid(step);
    // rem_euclid keeps this in [0, capacity), which fits in usize.
    distance.rem_euclid(capacity) as usize
}

fn points_in_region(
    region: &[u8],
    archive: &ArchiveInfo,
    from: Timestamp,
    until: Timestamp,
) -> Result<Vec<Point>> {
    let base = decode_slot(region, 0)?;
    if base.is_empty() {
        debug!(offset = archive.offset, "archive has no data");
        return Ok(Vec::new());
    }

    let capacity = archive.num_points as usize;
    let start = start_index(archive, base.timestamp, from);
    let mut points = Vec::new();

    for step in 0..capacity {
        let index = (start + step) % capacity;
        let point = decode_slot(region, index)?;
        let timestamp = Timestamp::from(point.timestamp);

        if timestamp > until {
            break;
        }
        if !point.is_empty() && timestamp >= from {
            points.push(point);
        }
    }

    debug!(
        offset = archive.offset,
        start,
        found = points.len(),
        "decoded archive points"
    );
    Ok(points)
}

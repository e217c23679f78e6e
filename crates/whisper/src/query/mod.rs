//! Range queries: request validation, archive selection, point extraction.
//!
//! A points query runs in a fixed order once the header has decoded:
//!
//! 1. [`FetchRequest::validate`] rejects impossible windows
//! 2. [`select_archive`] picks the finest archive reaching back to `from`
//! 3. [`decode_points`] walks that archive's circular buffer

pub mod points;
pub mod select;

pub use points::decode_points;
pub use select::select_archive;

use crate::error::{Result, WhisperError};
use crate::format::{ArchiveInfo, Metadata, Point, Timestamp};
use std::time::{SystemTime, UNIX_EPOCH};

/// Time window to fetch, in seconds since the Unix epoch.
///
/// `from` and `until` are both inclusive. `now` is the reference time the
/// file's retention is measured back from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FetchRequest {
    /// Start of the window (inclusive).
    pub from: Timestamp,
    /// End of the window (inclusive).
    pub until: Timestamp,
    /// Reference time for retention checks.
    pub now: Timestamp,
}

impl FetchRequest {
    /// Creates a request with an explicit reference time.
    pub fn new(from: Timestamp, until: Timestamp, now: Timestamp) -> Self {
        Self { from, until, now }
    }

    /// Creates a request measured back from the current wall-clock time.
    pub fn ending_now(from: Timestamp, until: Timestamp) -> Self {
        Self::new(from, until, current_timestamp())
    }

    /// Uses the given `from` time for this request.
    pub fn with_from(mut self, from: Timestamp) -> Self {
        self.from = from;
        self
    }

    /// Uses the given `until` time for this request.
    pub fn with_until(mut self, until: Timestamp) -> Self {
        self.until = until;
        self
    }

    /// Uses the given reference time for this request.
    pub fn with_now(mut self, now: Timestamp) -> Self {
        self.now = now;
        self
    }

    /// Seconds of history an archive must retain to reach back to `from`.
    ///
    /// Zero when `from` is not in the past.
    pub fn required_retention(&self) -> u64 {
        u64::try_from(i128::from(self.now) - i128::from(self.from)).unwrap_or(0)
    }

    /// Checks the window against the file's metadata.
    ///
    /// # Errors
    ///
    /// - `InvalidTimeRange` if `from >= until`
    /// - `InvalidTimeEnd` if `until > now`
    /// - `InvalidTimeStart` if `from` is more than `max_retention` seconds
    ///   before `now`
    pub fn validate(&self, metadata: &Metadata) -> Result<()> {
        if self.from >= self.until {
            return Err(WhisperError::InvalidTimeRange {
                from: self.from,
                until: self.until,
            });
        }

        if self.until > self.now {
            return Err(WhisperError::InvalidTimeEnd {
                until: self.until,
                now: self.now,
            });
        }

        if self.required_retention() > u64::from(metadata.max_retention) {
            return Err(WhisperError::InvalidTimeStart {
                from: self.from,
                now: self.now,
                max_retention: metadata.max_retention,
            });
        }

        Ok(())
    }
}

/// Points for a request together with the archive that produced them.
#[derive(Debug, Clone, PartialEq)]
pub struct FetchResponse {
    archive: ArchiveInfo,
    points: Vec<Point>,
}

impl FetchResponse {
    /// Creates a response.
    pub fn new(archive: ArchiveInfo, points: Vec<Point>) -> Self {
        Self { archive, points }
    }

    /// Returns the archive the points were read from.
    pub fn archive(&self) -> &ArchiveInfo {
        &self.archive
    }

    /// Returns the points, ascending by timestamp.
    pub fn points(&self) -> &[Point] {
        &self.points
    }

    /// Consumes the response, returning the points.
    pub fn into_points(self) -> Vec<Point> {
        self.points
    }
}

fn current_timestamp() -> Timestamp {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| Timestamp::try_from(elapsed.as_secs()).unwrap_or(Timestamp::MAX))
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::format::AggregationMethod;

    const NOW: Timestamp = 1_000_000;

    fn metadata(max_retention: u32) -> Metadata {
        Metadata::new(AggregationMethod::Average, max_retention, 0.5, 1)
    }

    #[test]
    fn test_valid_request() {
        let req = FetchRequest::new(NOW - 3600, NOW - 60, NOW);
        assert!(req.validate(&metadata(86_400)).is_ok());
    }

    #[test]
    fn test_from_not_before_until_is_invalid_range() {
        let meta = metadata(86_400);
        let equal = FetchRequest::new(NOW - 60, NOW - 60, NOW);
        let inverted = FetchRequest::new(NOW - 60, NOW - 120, NOW);

        assert_eq!(
            equal.validate(&meta).unwrap_err().kind(),
            ErrorKind::InvalidTimeRange
        );
        assert_eq!(
            inverted.validate(&meta).unwrap_err().kind(),
            ErrorKind::InvalidTimeRange
        );
    }

    #[test]
    fn test_until_after_now_is_invalid_end() {
        let req = FetchRequest::new(NOW - 60, NOW + 3600, NOW);
        assert_eq!(
            req.validate(&metadata(86_400)).unwrap_err().kind(),
            ErrorKind::InvalidTimeEnd
        );
    }

    #[test]
    fn test_retention_boundary() {
        let meta = metadata(86_400);
        let at_limit = FetchRequest::new(NOW - 86_400, NOW, NOW);
        let past_limit = FetchRequest::new(NOW - 86_401, NOW, NOW);

        assert!(at_limit.validate(&meta).is_ok());
        assert_eq!(
            past_limit.validate(&meta).unwrap_err().kind(),
            ErrorKind::InvalidTimeStart
        );
    }

    #[test]
    fn test_range_checked_before_end_and_start() {
        // Every check fails here; the range check wins.
        let req = FetchRequest::new(NOW + 10, -5, NOW);
        assert_eq!(
            req.validate(&metadata(60)).unwrap_err().kind(),
            ErrorKind::InvalidTimeRange
        );
    }

    #[test]
    fn test_extreme_values_do_not_overflow() {
        let req = FetchRequest::new(Timestamp::MIN, 0, Timestamp::MAX);
        assert_eq!(req.required_retention(), u64::MAX);
        assert_eq!(
            req.validate(&metadata(u32::MAX)).unwrap_err().kind(),
            ErrorKind::InvalidTimeStart
        );
    }

    #[test]
    fn test_builders() {
        let req = FetchRequest::new(0, 0, 0)
            .with_from(10)
            .with_until(20)
            .with_now(30);
        assert_eq!(req, FetchRequest::new(10, 20, 30));
        assert_eq!(req.required_retention(), 20);
    }

    #[test]
    fn test_ending_now_uses_wall_clock() {
        let req = FetchRequest::ending_now(0, 1);
        assert!(req.now > 1_500_000_000);
    }
}

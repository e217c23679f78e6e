//! Error and Result types for Whisper query operations.

use crate::format::Timestamp;
use std::io;
use thiserror::Error;

/// A convenience `Result` type for Whisper operations.
pub type Result<T> = std::result::Result<T, WhisperError>;

/// Flat classification of every [`WhisperError`].
///
/// Callers that only need to branch on the failure class (or hand a stable
/// numeric code across a language boundary) match on this instead of the
/// full error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// The file could not be opened or read.
    IoError,
    /// The bytes are too short for the declared structure, or an
    /// enumerated field holds an unknown value.
    ParseError,
    /// The header decoded but describes an impossible file layout.
    CorruptDatabase,
    /// `from` is not before `until`.
    InvalidTimeRange,
    /// `from` predates anything the file could retain.
    InvalidTimeStart,
    /// `until` lies after the reference time.
    InvalidTimeEnd,
    /// No single archive retains enough history for the request.
    NoArchiveAvailable,
}

impl ErrorKind {
    /// Stable numeric code for this kind, for use by foreign-language
    /// bindings. Zero is reserved for "no error".
    pub fn code(self) -> u32 {
        match self {
            Self::IoError => 1001,
            Self::ParseError => 1002,
            Self::InvalidTimeRange => 1003,
            Self::InvalidTimeStart => 1004,
            Self::InvalidTimeEnd => 1005,
            Self::NoArchiveAvailable => 1006,
            Self::CorruptDatabase => 1007,
        }
    }
}

/// The error type for Whisper operations.
#[derive(Debug, Error)]
pub enum WhisperError {
    /// Underlying I/O error.
    #[error("I/O error: {0}")]
    IoError(#[from] io::Error),

    /// Input ended before a fixed-size section could be read.
    #[error("Truncated {section}: need {needed} bytes, have {available}")]
    Truncated {
        /// Section being decoded when input ran out.
        section: &'static str,
        /// Bytes required to finish the section.
        needed: u64,
        /// Bytes actually available.
        available: u64,
    },

    /// Aggregation method field holds an unknown value.
    #[error("Unknown aggregation method: {0}")]
    UnknownAggregation(u32),

    /// Header fields are individually readable but mutually inconsistent.
    #[error("Corrupt database: {0}")]
    CorruptDatabase(String),

    /// Requested range is empty or inverted.
    #[error("Invalid time range: from {from} is not before until {until}")]
    InvalidTimeRange {
        /// Requested start (seconds since epoch).
        from: Timestamp,
        /// Requested end (seconds since epoch).
        until: Timestamp,
    },

    /// Requested start is older than the file's maximum retention.
    #[error("Invalid start time: {from} is more than {max_retention}s before {now}")]
    InvalidTimeStart {
        /// Requested start (seconds since epoch).
        from: Timestamp,
        /// Reference time of the request.
        now: Timestamp,
        /// Maximum retention declared by the file, in seconds.
        max_retention: u32,
    },

    /// Requested end is after the reference time.
    #[error("Invalid end time: until {until} is after now {now}")]
    InvalidTimeEnd {
        /// Requested end (seconds since epoch).
        until: Timestamp,
        /// Reference time of the request.
        now: Timestamp,
    },

    /// No archive in the file retains the requested history.
    #[error("No archive available with a retention of at least {required}s")]
    NoArchiveAvailable {
        /// Retention needed to reach back to the requested start.
        required: u64,
    },
}

impl WhisperError {
    /// Returns the flat [`ErrorKind`] of this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::IoError(_) => ErrorKind::IoError,
            Self::Truncated { .. } | Self::UnknownAggregation(_) => ErrorKind::ParseError,
            Self::CorruptDatabase(_) => ErrorKind::CorruptDatabase,
            Self::InvalidTimeRange { .. } => ErrorKind::InvalidTimeRange,
            Self::InvalidTimeStart { .. } => ErrorKind::InvalidTimeStart,
            Self::InvalidTimeEnd { .. } => ErrorKind::InvalidTimeEnd,
            Self::NoArchiveAvailable { .. } => ErrorKind::NoArchiveAvailable,
        }
    }

    pub(crate) fn corrupt(reason: impl Into<String>) -> Self {
        Self::CorruptDatabase(reason.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_mapping() {
        let err = WhisperError::from(io::Error::new(io::ErrorKind::NotFound, "missing"));
        assert_eq!(err.kind(), ErrorKind::IoError);

        let err = WhisperError::Truncated {
            section: "metadata",
            needed: 16,
            available: 3,
        };
        assert_eq!(err.kind(), ErrorKind::ParseError);
        assert_eq!(WhisperError::UnknownAggregation(9).kind(), ErrorKind::ParseError);
        assert_eq!(
            WhisperError::corrupt("overlap").kind(),
            ErrorKind::CorruptDatabase
        );
        assert_eq!(
            WhisperError::NoArchiveAvailable { required: 10 }.kind(),
            ErrorKind::NoArchiveAvailable
        );
    }

    #[test]
    fn test_codes_are_distinct_and_nonzero() {
        let kinds = [
            ErrorKind::IoError,
            ErrorKind::ParseError,
            ErrorKind::CorruptDatabase,
            ErrorKind::InvalidTimeRange,
            ErrorKind::InvalidTimeStart,
            ErrorKind::InvalidTimeEnd,
            ErrorKind::NoArchiveAvailable,
        ];
        let mut codes: Vec<u32> = kinds.iter().map(|k| k.code()).collect();
        assert!(codes.iter().all(|&c| c != 0));
        codes.sort_unstable();
        codes.dedup();
        assert_eq!(codes.len(), kinds.len());
    }

    #[test]
    fn test_display_includes_context() {
        let err = WhisperError::InvalidTimeEnd {
            until: 200,
            now: 100,
        };
        assert_eq!(err.to_string(), "Invalid end time: until 200 is after now 100");
    }
}

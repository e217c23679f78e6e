//! Archive data regions: fixed-size slots of `(timestamp, value)`.

use crate::error::{Result, WhisperError};
use crate::format::header::FieldReader;
use crate::format::{ArchiveInfo, Header, Point, POINT_SIZE};
use crate::source::ByteSource;
use std::io;

/// Reads the raw data region of `info` from `source`.
///
/// The header has already promised the region lies inside the file, so a
/// short read means the header lied and is reported as corruption.
pub(crate) fn read_region<S>(source: &mut S, info: &ArchiveInfo) -> Result<Vec<u8>>
where
    S: ByteSource + ?Sized,
{
    source
        .read_vec(u64::from(info.offset), info.size())
        .map_err(|err| match err.kind() {
            io::ErrorKind::UnexpectedEof => WhisperError::corrupt(format!(
                "archive at offset {} is truncated: {err}",
                info.offset
            )),
            _ => WhisperError::IoError(err),
        })
}

/// Decodes the slot at `index` of an archive region.
pub(crate) fn decode_slot(region: &[u8], index: usize) -> Result<Point> {
    let mut reader = FieldReader::at(
        region,
        index.saturating_mul(POINT_SIZE),
        "archive slot",
        POINT_SIZE,
    );
    let timestamp = reader.u32()?;
    let value = reader.f64()?;
    Ok(Point::new(timestamp, value))
}

/// One fully decoded archive.
#[derive(Debug, Clone, PartialEq)]
pub struct Archive {
    info: ArchiveInfo,
    slots: Vec<Point>,
}

impl Archive {
    /// Decodes every slot of `region`, which must be exactly `info.size()`
    /// bytes long.
    pub(crate) fn decode(info: ArchiveInfo, region: &[u8]) -> Result<Self> {
        if region.len() as u64 != info.size() {
            return Err(WhisperError::corrupt(format!(
                "archive region is {} bytes, expected {}",
                region.len(),
                info.size()
            )));
        }

        let slots = (0..info.num_points as usize)
            .map(|index| decode_slot(region, index))
            .collect::<Result<Vec<_>>>()?;

        Ok(Self { info, slots })
    }

    /// Returns the archive descriptor.
    pub fn info(&self) -> &ArchiveInfo {
        &self.info
    }

    /// Returns every slot in storage order, including empty ones.
    pub fn slots(&self) -> &[Point] {
        &self.slots
    }

    /// Returns the written slots ordered by timestamp.
    pub fn points(&self) -> Vec<Point> {
        let mut points: Vec<Point> = self
            .slots
            .iter()
            .filter(|p| !p.is_empty())
            .copied()
            .collect();
        points.sort_by_key(|p| p.timestamp);
        points
    }
}

/// A whole Whisper file: header plus every archive.
#[derive(Debug, Clone, PartialEq)]
pub struct Database {
    header: Header,
    archives: Vec<Archive>,
}

impl Database {
    /// Reads every archive described by `header` from `source`.
    pub(crate) fn read_from<S>(source: &mut S, header: Header) -> Result<Self>
    where
        S: ByteSource + ?Sized,
    {
        let archives = header
            .archives()
            .iter()
            .map(|info| {
                let region = read_region(source, info)?;
                Archive::decode(*info, &region)
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Self { header, archives })
    }

    /// Returns the file header.
    pub fn header(&self) -> &Header {
        &self.header
    }

    /// Returns the decoded archives, finest resolution first.
    pub fn archives(&self) -> &[Archive] {
        &self.archives
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::source::SliceSource;

    fn region(points: &[(u32, f64)]) -> Vec<u8> {
        let mut buf = Vec::new();
        for (ts, value) in points {
            buf.extend_from_slice(&ts.to_be_bytes());
            buf.extend_from_slice(&value.to_be_bytes());
        }
        buf
    }

    #[test]
    fn test_decode_slot() {
        let bytes = region(&[(1_511_396_041, 42.0), (1_511_396_051, -1.5)]);
        assert_eq!(
            decode_slot(&bytes, 1).unwrap(),
            Point::new(1_511_396_051, -1.5)
        );
        assert!(matches!(
            decode_slot(&bytes, 2).unwrap_err(),
            WhisperError::Truncated {
                section: "archive slot",
                needed: 36,
                available: 24,
            }
        ));
    }

    #[test]
    fn test_archive_points_skip_empty_and_sort() {
        let info = ArchiveInfo::new(0, 10, 4);
        let bytes = region(&[(130, 3.0), (0, 0.0), (110, 1.0), (120, 2.0)]);
        let archive = Archive::decode(info, &bytes).unwrap();

        assert_eq!(archive.slots().len(), 4);
        assert_eq!(
            archive.points(),
            vec![
                Point::new(110, 1.0),
                Point::new(120, 2.0),
                Point::new(130, 3.0)
            ]
        );
    }

    #[test]
    fn test_archive_wrong_region_size_is_corrupt() {
        let info = ArchiveInfo::new(0, 10, 4);
        let bytes = region(&[(110, 1.0)]);
        assert_eq!(
            Archive::decode(info, &bytes).unwrap_err().kind(),
            ErrorKind::CorruptDatabase
        );
    }

    #[test]
    fn test_read_region_past_end_is_corrupt() {
        let bytes = region(&[(110, 1.0)]);
        let mut source = SliceSource::new(&bytes);
        let info = ArchiveInfo::new(0, 10, 2);
        assert_eq!(
            read_region(&mut source, &info).unwrap_err().kind(),
            ErrorKind::CorruptDatabase
        );
    }
}

//! Header codec: metadata block and archive descriptor table.

use crate::error::{Result, WhisperError};
use crate::format::{AggregationMethod, ArchiveInfo, Header, Metadata, METADATA_SIZE};

/// Bounds-checked big-endian reader over one fixed-size section of a byte
/// slice.
///
/// Every read that would run past the end of the slice fails with
/// [`WhisperError::Truncated`] naming the section and the bytes the whole
/// section needs.
pub(crate) struct FieldReader<'a> {
    buf: &'a [u8],
    pos: usize,
    section: &'static str,
    section_end: usize,
}

impl<'a> FieldReader<'a> {
    /// Reads the `size`-byte section at the start of `buf`.
    pub(crate) fn new(buf: &'a [u8], section: &'static str, size: usize) -> Self {
        Self::at(buf, 0, section, size)
    }

    /// Reads the `size`-byte section starting at `pos`.
    pub(crate) fn at(buf: &'a [u8], pos: usize, section: &'static str, size: usize) -> Self {
        Self {
            buf,
            pos,
            section,
            section_end: pos.saturating_add(size),
        }
    }

    fn take<const N: usize>(&mut self) -> Result<[u8; N]> {
        let end = self.pos.saturating_add(N);
        let bytes = self.buf.get(self.pos..end).ok_or(WhisperError::Truncated {
            section: self.section,
            needed: self.section_end.max(end) as u64,
            available: self.buf.len() as u64,
        })?;
        let mut out = [0u8; N];
        out.copy_from_slice(bytes);
        self.pos = end;
        Ok(out)
    }

    pub(crate) fn u32(&mut self) -> Result<u32> {
        self.take::<4>().map(u32::from_be_bytes)
    }

    pub(crate) fn f32(&mut self) -> Result<f32> {
        self.take::<4>().map(f32::from_be_bytes)
    }

    pub(crate) fn f64(&mut self) -> Result<f64> {
        self.take::<8>().map(f64::from_be_bytes)
    }
}

impl Metadata {
    /// Reads the 16-byte metadata block from the start of `bytes`.
    ///
    /// # Errors
    ///
    /// Returns `WhisperError::Truncated` if fewer than 16 bytes are given and
    /// `WhisperError::UnknownAggregation` for an unknown aggregation method.
    pub fn decode(bytes: &[u8]) -> Result<Self> {
        let mut reader = FieldReader::new(bytes, "metadata", METADATA_SIZE);
        let raw_aggregation = reader.u32()?;
        let max_retention = reader.u32()?;
        let x_files_factor = reader.f32()?;
        let archive_count = reader.u32()?;

        let aggregation = AggregationMethod::from_u32(raw_aggregation)
            .ok_or(WhisperError::UnknownAggregation(raw_aggregation))?;

        Ok(Self::new(
            aggregation,
            max_retention,
            x_files_factor,
            archive_count,
        ))
    }
}

impl ArchiveInfo {
    fn read_from(reader: &mut FieldReader<'_>) -> Result<Self> {
        let offset = reader.u32()?;
        let seconds_per_point = reader.u32()?;
        let num_points = reader.u32()?;
        Ok(Self::new(offset, seconds_per_point, num_points))
    }
}

impl Header {
    /// Decodes a header from the leading bytes of a file whose total length
    /// is `file_len`.
    ///
    /// `bytes` only has to cover the metadata block and the descriptor
    /// table; archive data is never touched. `file_len` is used to check
    /// that every archive region lies inside the file.
    ///
    /// # Errors
    ///
    /// Returns a parse error (`Truncated`, `UnknownAggregation`) when the
    /// raw fields cannot be read, and `CorruptDatabase` when they describe
    /// an impossible layout.
    pub fn decode(bytes: &[u8], file_len: u64) -> Result<Self> {
        let metadata = Metadata::decode(bytes)?;

        let needed = metadata.header_size();
        if (bytes.len() as u64) < needed {
            return Err(WhisperError::Truncated {
                section: "archive info",
                needed,
                available: bytes.len() as u64,
            });
        }

        // `needed` fits in usize: it is no larger than `bytes.len()`.
        let table_size = needed as usize - METADATA_SIZE;
        let mut reader = FieldReader::at(bytes, METADATA_SIZE, "archive info", table_size);
        let archives = (0..metadata.archive_count)
            .map(|_| ArchiveInfo::read_from(&mut reader))
            .collect::<Result<Vec<_>>>()?;

        let header = Self { metadata, archives };
        header.validate(file_len)?;
        Ok(header)
    }

    /// Checks the structural invariants of a decoded header.
    fn validate(&self, file_len: u64) -> Result<()> {
        let metadata = &self.metadata;

        if self.archives.is_empty() {
            return Err(WhisperError::corrupt("file declares no archives"));
        }

        let xff = metadata.x_files_factor;
        if !(0.0..=1.0).contains(&xff) {
            return Err(WhisperError::corrupt(format!(
                "x-files factor {xff} outside [0, 1]"
            )));
        }

        // The descriptor table must end exactly where the first archive starts.
        let first = self.archives[0];
        if u64::from(first.offset) != self.size() {
            return Err(WhisperError::corrupt(format!(
                "archive count {} implies data at offset {}, first archive starts at {}",
                metadata.archive_count,
                self.size(),
                first.offset
            )));
        }

        let mut prev: Option<ArchiveInfo> = None;
        for (index, archive) in self.archives.iter().enumerate() {
            if archive.seconds_per_point == 0 || archive.num_points == 0 {
                return Err(WhisperError::corrupt(format!(
                    "archive {index} has zero resolution or capacity"
                )));
            }

            if let Some(prev) = prev {
                if archive.seconds_per_point <= prev.seconds_per_point {
                    return Err(WhisperError::corrupt(format!(
                        "archive {index} resolution {}s is not coarser than {}s",
                        archive.seconds_per_point, prev.seconds_per_point
                    )));
                }
                if u64::from(archive.offset) < prev.end() {
                    return Err(WhisperError::corrupt(format!(
                        "archive {index} at offset {} overlaps previous archive ending at {}",
                        archive.offset,
                        prev.end()
                    )));
                }
            }

            if archive.end() > file_len {
                return Err(WhisperError::corrupt(format!(
                    "archive {index} ends at {} beyond file length {file_len}",
                    archive.end()
                )));
            }

            prev = Some(*archive);
        }

        Ok(())
    }
}

/// Decodes and validates the header at the start of a complete file image.
///
/// Equivalent to [`Header::decode`] with the slice length as file length.
pub fn decode_header(bytes: &[u8]) -> Result<Header> {
    Header::decode(bytes, bytes.len() as u64)
}

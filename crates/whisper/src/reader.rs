//! File reader: opens a byte source per call and runs a query pipeline.
//!
//! Every call opens its own source, reads what it needs and drops the
//! source before returning, so a [`WhisperReader`] holds nothing but its
//! configuration and can be shared freely between threads.
//!
//! # Example
//!
//! ```rust,ignore
//! use alopex_whisper::{AccessMode, FetchRequest, ReaderConfig, WhisperReader};
//!
//! let reader = WhisperReader::new(ReaderConfig::default().with_access(AccessMode::Mapped));
//! let response = reader.fetch(path, &FetchRequest::ending_now(from, until))?;
//! println!("{}s resolution", response.archive().seconds_per_point);
//! ```

use crate::error::{ErrorKind, Result};
use crate::format::{Database, Header, Metadata, METADATA_SIZE};
use crate::query::{decode_points, select_archive, FetchRequest, FetchResponse};
use crate::source::{ByteSource, FileSource, MappedSource};
use std::path::Path;
use tracing::{debug, warn};

/// How file bytes are accessed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AccessMode {
    /// Positioned reads through the file handle (default).
    #[default]
    Direct,
    /// Read-only memory map of the whole file, under a shared file lock.
    Mapped,
}

/// Configuration for [`WhisperReader`].
#[derive(Debug, Clone, Default)]
pub struct ReaderConfig {
    /// How file bytes are accessed.
    pub access: AccessMode,
}

impl ReaderConfig {
    /// Creates a reader configuration.
    pub fn new(access: AccessMode) -> Self {
        Self { access }
    }

    /// Uses the given access mode.
    pub fn with_access(mut self, access: AccessMode) -> Self {
        self.access = access;
        self
    }
}

/// Stateless reader for Whisper files.
#[derive(Debug, Clone, Default)]
pub struct WhisperReader {
    config: ReaderConfig,
}

impl WhisperReader {
    /// Creates a reader with the given configuration.
    pub fn new(config: ReaderConfig) -> Self {
        Self { config }
    }

    /// Returns the reader configuration.
    pub fn config(&self) -> &ReaderConfig {
        &self.config
    }

    fn open(&self, path: &Path) -> Result<Box<dyn ByteSource>> {
        debug!(path = %path.display(), access = ?self.config.access, "opening whisper file");
        let source: Box<dyn ByteSource> = match self.config.access {
            AccessMode::Direct => Box::new(FileSource::open(path)?),
            AccessMode::Mapped => Box::new(MappedSource::open(path)?),
        };
        Ok(source)
    }

    /// Reads only the header of a Whisper file.
    ///
    /// # Errors
    ///
    /// Returns `IoError` if the file cannot be read, or a parse/corruption
    /// error if the header is malformed.
    pub fn read_header(&self, path: &Path) -> Result<Header> {
        let mut source = self.open(path)?;
        read_header_from(source.as_mut()).inspect_err(|err| log_rejected(path, err.kind()))
    }

    /// Fetches the points of a Whisper file within the requested window.
    ///
    /// # Errors
    ///
    /// Returns `IoError` if the file cannot be read, a parse/corruption
    /// error if it is malformed, or a time-range error if the request
    /// cannot be answered by this file.
    pub fn fetch(&self, path: &Path, request: &FetchRequest) -> Result<FetchResponse> {
        let mut source = self.open(path)?;
        fetch_from(source.as_mut(), request).inspect_err(|err| log_rejected(path, err.kind()))
    }

    /// Reads an entire Whisper file: header plus every archive.
    ///
    /// # Errors
    ///
    /// Returns `IoError` if the file cannot be read, or a parse/corruption
    /// error if it is malformed.
    pub fn read_database(&self, path: &Path) -> Result<Database> {
        let mut source = self.open(path)?;
        read_database_from(source.as_mut()).inspect_err(|err| log_rejected(path, err.kind()))
    }
}

fn log_rejected(path: &Path, kind: ErrorKind) {
    if matches!(kind, ErrorKind::ParseError | ErrorKind::CorruptDatabase) {
        warn!(path = %path.display(), ?kind, "rejected malformed whisper file");
    }
}

/// Reads the header from a byte source.
///
/// Only the metadata block and descriptor table are read; archive data is
/// left untouched.
pub fn read_header_from<S>(source: &mut S) -> Result<Header>
where
    S: ByteSource + ?Sized,
{
    let file_len = source.len();

    let prefix = source.read_vec(0, (METADATA_SIZE as u64).min(file_len))?;
    let metadata = Metadata::decode(&prefix)?;

    // Never read past the end; a short table is reported by the decoder.
    let bytes = source.read_vec(0, metadata.header_size().min(file_len))?;
    let header = Header::decode(&bytes, file_len)?;

    debug!(
        archives = header.archives().len(),
        max_retention = header.metadata().max_retention,
        "decoded whisper header"
    );
    Ok(header)
}

/// Runs a points query against a byte source.
pub fn fetch_from<S>(source: &mut S, request: &FetchRequest) -> Result<FetchResponse>
where
    S: ByteSource + ?Sized,
{
    let header = read_header_from(source)?;
    request.validate(header.metadata())?;

    let archive = *select_archive(header.archives(), request.from, request.until, request.now)?;
    debug!(
        seconds_per_point = archive.seconds_per_point,
        num_points = archive.num_points,
        from = request.from,
        until = request.until,
        "selected archive"
    );

    let points = decode_points(source, &archive, request.from, request.until)?;
    Ok(FetchResponse::new(archive, points))
}

/// Reads a whole database from a byte source.
pub fn read_database_from<S>(source: &mut S) -> Result<Database>
where
    S: ByteSource + ?Sized,
{
    let header = read_header_from(source)?;
    Database::read_from(source, header)
}

//! CSV archiving of result records
//!
//! Each archive is a CSV file inside the session's archive directory, one row
//! per serialised record.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External imports
use csv::WriterBuilder;
pub use csv::Writer;
use serde::Serialize;
use std::fs::File;
use std::path::{Path, PathBuf};
use thiserror::Error;

// Internal imports
use crate::session::Session;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// An object used to write CSV archive files.
pub struct Archiver {
    path: PathBuf,
    writer: Writer<File>,
}

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// Errors which can occur while archiving.
#[derive(Debug, Error)]
pub enum ArchiveError {
    #[error("Cannot create the archive file {0:?}: {1}")]
    CreateError(PathBuf, std::io::Error),

    #[error("Cannot write a record to {0:?}: {1}")]
    WriteError(PathBuf, csv::Error),

    #[error("Cannot flush the archive {0:?}: {1}")]
    FlushError(PathBuf, std::io::Error),
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl Archiver {
    /// Create a new archiver from a paricular path relative to the session's
    /// archive root. Any existing file is truncated.
    pub fn from_path<P: AsRef<Path>>(session: &Session, path: P) -> Result<Self, ArchiveError> {
        Self::from_file_path(session.arch_root.join(path))
    }

    /// Create a new archiver writing to the given file path.
    pub fn from_file_path<P: AsRef<Path>>(path: P) -> Result<Self, ArchiveError> {
        let path = path.as_ref().to_path_buf();

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| ArchiveError::CreateError(path.clone(), e))?;
        }

        let file = File::create(&path).map_err(|e| ArchiveError::CreateError(path.clone(), e))?;

        let writer = WriterBuilder::new().has_headers(true).from_writer(file);

        Ok(Self { path, writer })
    }

    /// Serialise a record into the archive.
    pub fn serialise<T: Serialize>(&mut self, record: T) -> Result<(), ArchiveError> {
        self.writer
            .serialize(record)
            .map_err(|e| ArchiveError::WriteError(self.path.clone(), e))
    }

    /// Serialise every record of an iterator, then flush.
    pub fn serialise_all<T, I>(&mut self, records: I) -> Result<(), ArchiveError>
    where
        T: Serialize,
        I: IntoIterator<Item = T>,
    {
        for r in records {
            self.serialise(r)?;
        }
        self.flush()
    }

    /// Flush buffered records to disk.
    pub fn flush(&mut self) -> Result<(), ArchiveError> {
        self.writer
            .flush()
            .map_err(|e| ArchiveError::FlushError(self.path.clone(), e))
    }

    /// Path of the archive file.
    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[derive(Serialize)]
    struct Row {
        channel: usize,
        value: f64,
    }

    #[test]
    fn test_archive_rows() {
        let path = std::env::temp_dir().join("util_archive_test/rows.csv");
        let mut arch = Archiver::from_file_path(&path).unwrap();
        assert_eq!(arch.path(), path.as_path());
        arch.serialise_all(vec![
            Row { channel: 0, value: 1.5 },
            Row { channel: 1, value: -2.0 },
        ])
        .unwrap();

        let contents = std::fs::read_to_string(&path).unwrap();
        assert_eq!(contents, "channel,value\n0,1.5\n1,-2.0\n");
    }
}

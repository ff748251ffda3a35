// src/sink.rs
use std::{
    fs::{self, OpenOptions},
    io::{BufWriter, Write},
    path::{Path, PathBuf},
};

use crate::config::consts::STORE_SEP;
use crate::csv::write_row;
use crate::error::SinkError;
use crate::record::{headers, FieldRecord};

/// Where finished records go. Appends are all-or-error per call.
pub trait Sink {
    fn append(&mut self, records: &[FieldRecord]) -> Result<(), SinkError>;
}

impl<S: Sink + ?Sized> Sink for &mut S {
    fn append(&mut self, records: &[FieldRecord]) -> Result<(), SinkError> {
        (**self).append(records)
    }
}

/// Appends to one CSV file; the header is written only when the file is new.
#[derive(Clone, Debug)]
pub struct CsvSink {
    path: PathBuf,
}

impl CsvSink {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn io_err(&self, source: std::io::Error) -> SinkError {
        SinkError::Io { path: self.path.clone(), source }
    }
}

impl Sink for CsvSink {
    fn append(&mut self, records: &[FieldRecord]) -> Result<(), SinkError> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).map_err(|e| self.io_err(e))?;
            }
        }
        let fresh = fs::metadata(&self.path).map(|m| m.len() == 0).unwrap_or(true);
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .map_err(|e| self.io_err(e))?;
        let mut w = BufWriter::new(file);
        if fresh {
            write_row(&mut w, &headers(), STORE_SEP).map_err(|e| self.io_err(e))?;
        }
        for rec in records {
            write_row(&mut w, &rec.to_row(), STORE_SEP).map_err(|e| self.io_err(e))?;
        }
        w.flush().map_err(|e| self.io_err(e))?;
        tracing::debug!(path = %self.path.display(), count = records.len(), "appended");
        Ok(())
    }
}

/// Keeps every flushed batch; used by tests and dry runs.
#[derive(Clone, Debug, Default)]
pub struct MemorySink {
    pub batches: Vec<Vec<FieldRecord>>,
}

impl MemorySink {
    pub fn records(&self) -> impl Iterator<Item = &FieldRecord> {
        self.batches.iter().flatten()
    }
}

impl Sink for MemorySink {
    fn append(&mut self, records: &[FieldRecord]) -> Result<(), SinkError> {
        self.batches.push(records.to_vec());
        Ok(())
    }
}

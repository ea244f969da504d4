//! Delimited-text report files.
//!
//! One file per trial per metric family: a header line, then one line per
//! measurement. Numeric durations use two decimals so repeated runs diff
//! cleanly. Quoting and escaping are left to the `csv` crate.

use std::fs::File;
use std::io::BufWriter;
use std::path::{Path, PathBuf};
use std::time::Duration;
use svcbench_types::LoadResult;
use thiserror::Error;

/// Field delimiter.
pub const DELIMITER: u8 = b',';

/// Report I/O errors.
#[derive(Debug, Error)]
pub enum ReportError {
    /// The file could not be created.
    #[error("cannot open report {path}: {source}")]
    Open {
        /// Report path.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// Writing or flushing failed.
    #[error("cannot write report {path}: {source}")]
    Write {
        /// Report path.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// Encoding a record failed.
    #[error("cannot encode report {path}: {source}")]
    Encode {
        /// Report path.
        path: PathBuf,
        /// Underlying CSV error.
        source: csv::Error,
    },

    /// Reading a report back failed.
    #[error("cannot read report {path}: {source}")]
    Read {
        /// Report path.
        path: PathBuf,
        /// Underlying CSV error.
        source: csv::Error,
    },

    /// A row was written before the header.
    #[error("report {0}: row written before header")]
    MissingHeader(PathBuf),

    /// The header was written twice.
    #[error("report {0}: header already written")]
    DuplicateHeader(PathBuf),

    /// A row's field count differs from the header's.
    #[error("report {path}: row has {actual} fields, header has {expected}")]
    FieldCount {
        /// Report path.
        path: PathBuf,
        /// Header width.
        expected: usize,
        /// Row width.
        actual: usize,
    },

    /// A report could not be parsed back.
    #[error("cannot parse report {path} line {line}: {reason}")]
    Parse {
        /// Report path.
        path: PathBuf,
        /// 1-based line number.
        line: usize,
        /// What went wrong.
        reason: String,
    },
}

/// Append-only writer for one report file.
///
/// Dropping the writer without [`ReportWriter::close`] still flushes on a
/// best-effort basis, but only `close` reports flush errors.
#[derive(Debug)]
pub struct ReportWriter {
    path: PathBuf,
    out: csv::Writer<BufWriter<File>>,
    columns: Option<usize>,
    rows: usize,
}

impl ReportWriter {
    /// Create (or truncate) the report file at `path`.
    pub fn open(path: &Path) -> Result<Self, ReportError> {
        let file = File::create(path).map_err(|e| ReportError::Open {
            path: path.to_path_buf(),
            source: e,
        })?;

        let out = csv::WriterBuilder::new()
            .delimiter(DELIMITER)
            .from_writer(BufWriter::new(file));

        Ok(Self {
            path: path.to_path_buf(),
            out,
            columns: None,
            rows: 0,
        })
    }

    /// Report path.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Data rows written so far.
    pub fn rows(&self) -> usize {
        self.rows
    }

    /// Write the header line. Must be called exactly once, before any row.
    pub fn write_header(&mut self, columns: &[&str]) -> Result<(), ReportError> {
        if self.columns.is_some() {
            return Err(ReportError::DuplicateHeader(self.path.clone()));
        }
        self.write_record(columns)?;
        self.columns = Some(columns.len());
        Ok(())
    }

    /// Append one data row.
    pub fn write_row<S: AsRef<str>>(&mut self, fields: &[S]) -> Result<(), ReportError> {
        let expected = self
            .columns
            .ok_or_else(|| ReportError::MissingHeader(self.path.clone()))?;
        if fields.len() != expected {
            return Err(ReportError::FieldCount {
                path: self.path.clone(),
                expected,
                actual: fields.len(),
            });
        }
        self.write_record(fields)?;
        self.rows += 1;
        Ok(())
    }

    /// Flush, sync and close the file. Returns its path.
    pub fn close(mut self) -> Result<PathBuf, ReportError> {
        let path = self.path.clone();
        let write_err = |source| ReportError::Write {
            path: path.clone(),
            source,
        };
        self.out.flush().map_err(write_err)?;
        self.out.get_ref().get_ref().sync_all().map_err(write_err)?;
        tracing::info!(path = %path.display(), rows = self.rows, "report closed");
        Ok(path)
    }

    fn write_record<S: AsRef<str>>(&mut self, fields: &[S]) -> Result<(), ReportError> {
        self.out
            .write_record(fields.iter().map(AsRef::as_ref))
            .map_err(|e| ReportError::Encode {
                path: self.path.clone(),
                source: e,
            })
    }
}

/// Seconds with two decimals.
pub fn format_secs(duration: Duration) -> String {
    format!("{:.2}", duration.as_secs_f64())
}

/// Milliseconds with two decimals.
pub fn format_millis(duration: Duration) -> String {
    format!("{:.2}", duration.as_secs_f64() * 1000.0)
}

/// A row that can be written to a report.
pub trait ReportRow {
    /// Fields in column order.
    fn fields(&self) -> Vec<String>;
}

/// Failure-recovery measurement for one service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecoveryRow {
    /// Service name.
    pub service: String,
    /// Restart until both signals passed.
    pub recovery_time: Duration,
    /// Restart until the discovery registry reported the service passing.
    pub detection_time: Duration,
}

impl ReportRow for RecoveryRow {
    fn fields(&self) -> Vec<String> {
        vec![
            self.service.clone(),
            format_secs(self.recovery_time),
            format_secs(self.detection_time),
        ]
    }
}

/// Startup measurement for one service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StartupRow {
    /// Service name.
    pub service: String,
    /// Start command until both signals passed.
    pub total: Duration,
    /// Start command until the registry reported the service passing.
    pub discovery_time: Duration,
    /// Start command until the health endpoint answered 200.
    pub health_time: Duration,
    /// Whether the registry checks passed.
    pub discovery_passed: bool,
    /// Duration of the start command itself.
    pub container_start_time: Duration,
}

impl ReportRow for StartupRow {
    fn fields(&self) -> Vec<String> {
        vec![
            self.service.clone(),
            format_secs(self.total),
            format_secs(self.discovery_time),
            format_secs(self.health_time),
            self.discovery_passed.to_string(),
            format_secs(self.container_start_time),
        ]
    }
}

impl ReportRow for LoadResult {
    fn fields(&self) -> Vec<String> {
        vec![
            self.service_name.clone(),
            self.issued_at
                .to_rfc3339_opts(chrono::SecondsFormat::Millis, true),
            format_millis(self.latency),
            self.success.to_string(),
            self.concurrency_group.to_string(),
        ]
    }
}

/// A report read back from disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedReport {
    /// Header columns.
    pub header: Vec<String>,
    /// Data rows.
    pub rows: Vec<Vec<String>>,
}

/// Parse a report written by [`ReportWriter`].
///
/// An empty file or a row whose width differs from the header's is an error.
pub fn read_report(path: &Path) -> Result<ParsedReport, ReportError> {
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(DELIMITER)
        .has_headers(true)
        .from_path(path)
        .map_err(|e| ReportError::Read {
            path: path.to_path_buf(),
            source: e,
        })?;

    let header: Vec<String> = reader
        .headers()
        .map_err(|e| parse_error(path, e))?
        .iter()
        .map(String::from)
        .collect();
    if header.is_empty() {
        return Err(ReportError::Parse {
            path: path.to_path_buf(),
            line: 1,
            reason: "missing header".into(),
        });
    }

    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record.map_err(|e| parse_error(path, e))?;
        rows.push(record.iter().map(String::from).collect());
    }

    Ok(ParsedReport { header, rows })
}

fn parse_error(path: &Path, error: csv::Error) -> ReportError {
    if matches!(error.kind(), csv::ErrorKind::Io(_)) {
        return ReportError::Read {
            path: path.to_path_buf(),
            source: error,
        };
    }
    let line = error.position().map_or(1, |pos| pos.line() as usize);
    ReportError::Parse {
        path: path.to_path_buf(),
        line,
        reason: error.to_string(),
    }
}

//! Sample recorder for persisting emitted samples
//!
//! Each sample is written as one line, stamped with the wall-clock time it
//! was recorded. CSV output starts with a header row unless it is appended
//! to a non-empty file.

use std::fs::{File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use chrono::{DateTime, SecondsFormat, Utc};
use serde::Serialize;

use crate::config::{AppConfig, RecordFormat};
use crate::error::{OcdError, Result, ResultExt};
use crate::types::{Representation, Sample};

/// CSV header row
pub const CSV_HEADER: &str = "timestamp,frame,value,type,stale";

/// One recorded line in JSON Lines output
#[derive(Debug, Serialize)]
struct RecordLine<'a> {
    timestamp: &'a str,
    frame: u64,
    value: f64,
    #[serde(rename = "type")]
    representation: Representation,
    stale: bool,
}

/// Writes samples to a CSV or JSON Lines file
#[derive(Debug)]
pub struct SampleRecorder {
    writer: BufWriter<File>,
    format: RecordFormat,
    path: PathBuf,
    records: u64,
}

impl SampleRecorder {
    /// Open the recorder described by the recording section of `config`
    pub fn from_config(config: &AppConfig) -> Result<Self> {
        let recording = &config.recording;
        let path = recording
            .file_path
            .as_deref()
            .ok_or_else(|| OcdError::Config("recording has no file path".to_string()))?;
        Self::open(path, recording.format, recording.append)
    }

    /// Open `path` for recording, truncating it unless `append` is set
    pub fn open(path: impl AsRef<Path>, format: RecordFormat, append: bool) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)
                .map_err(OcdError::from)
                .context(format!("creating {}", parent.display()))?;
        }

        let file = OpenOptions::new()
            .create(true)
            .write(true)
            .append(append)
            .truncate(!append)
            .open(&path)
            .map_err(OcdError::from)
            .context(format!("opening {}", path.display()))?;
        let needs_header = file.metadata().map(|m| m.len() == 0).unwrap_or(true);

        let mut recorder = Self {
            writer: BufWriter::new(file),
            format,
            path,
            records: 0,
        };
        if format == RecordFormat::Csv && needs_header {
            writeln!(recorder.writer, "{}", CSV_HEADER)?;
        }

        tracing::info!("Recording samples to {} ({})", recorder.path.display(), format);
        Ok(recorder)
    }

    /// Append one sample
    pub fn record(&mut self, sample: &Sample) -> Result<()> {
        self.record_at(sample, Utc::now())
    }

    /// Append one sample with an explicit timestamp
    pub fn record_at(&mut self, sample: &Sample, at: DateTime<Utc>) -> Result<()> {
        let timestamp = at.to_rfc3339_opts(SecondsFormat::Millis, true);
        let representation = sample.value.representation();

        match self.format {
            RecordFormat::Csv => writeln!(
                self.writer,
                "{},{},{},{},{}",
                timestamp,
                sample.frame,
                sample.value,
                representation.c_name(),
                sample.stale
            )?,
            RecordFormat::JsonLines => {
                let line = RecordLine {
                    timestamp: &timestamp,
                    frame: sample.frame,
                    value: sample.value.as_f64(),
                    representation,
                    stale: sample.stale,
                };
                let json = serde_json::to_string(&line).map_err(std::io::Error::from)?;
                writeln!(self.writer, "{}", json)?;
            }
        }

        self.records += 1;
        Ok(())
    }

    /// Flush buffered lines to disk
    pub fn flush(&mut self) -> Result<()> {
        self.writer.flush()?;
        Ok(())
    }

    /// Number of samples written by this recorder
    pub fn records(&self) -> u64 {
        self.records
    }

    /// Output file
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Output format
    pub fn format(&self) -> RecordFormat {
        self.format
    }
}

impl Drop for SampleRecorder {
    fn drop(&mut self) {
        let _ = self.writer.flush();
    }
}

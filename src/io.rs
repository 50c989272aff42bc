/**
 * sessionprep
 * Copyright (C) 2018 Sebastian Schelter
 *
 * This program is free software: you can redistribute it and/or modify
 * it under the terms of the GNU General Public License as published by
 * the Free Software Foundation, either version 3 of the License, or
 * (at your option) any later version.
 *
 * This program is distributed in the hope that it will be useful,
 * but WITHOUT ANY WARRANTY; without even the implied warranty of
 * MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
 * GNU General Public License for more details.
 *
 * You should have received a copy of the GNU General Public License
 * along with this program. If not, see <http://www.gnu.org/licenses/>.
 */

use std::fs::{File, OpenOptions};
use std::io;
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::str;

use crate::config::PipelineConfig;
use crate::error::{LineError, PipelineError, Result, Stage};
use crate::stats::PipelineReport;
use crate::time;
use crate::types::Event;

pub fn open_reader(stage: Stage, path: &Path) -> Result<BufReader<File>> {
    let file = File::open(path).map_err(PipelineError::io(stage, path))?;
    Ok(BufReader::new(file))
}

/// Creates (or truncates) a file for writing.
pub fn create_writer(stage: Stage, path: &Path) -> Result<BufWriter<File>> {
    let file = File::create(path).map_err(PipelineError::io(stage, path))?;
    Ok(BufWriter::new(file))
}

pub fn append_writer(stage: Stage, path: &Path) -> Result<BufWriter<File>> {
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .map_err(PipelineError::io(stage, path))?;

    Ok(BufWriter::new(file))
}

/// Reads raw interaction logs. We expect NO headers and one interaction per line, the positions
/// of user, item and timestamp are configurable. Quotes carry no special meaning. Blank lines
/// are dropped by the reader and never reach the parser.
pub fn csv_reader(config: &PipelineConfig, path: &Path) -> Result<csv::Reader<File>> {
    csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .quoting(false)
        .delimiter(config.separator_byte())
        .from_path(path)
        .map_err(|error| csv_error(Stage::Parse, path, error))
}

fn csv_error(stage: Stage, path: &Path, error: csv::Error) -> PipelineError {
    match error.into_kind() {
        csv::ErrorKind::Io(source) => PipelineError::Io { stage, path: path.to_path_buf(), source },
        other => PipelineError::Io {
            stage,
            path: path.to_path_buf(),
            source: io::Error::new(io::ErrorKind::InvalidData, format!("{:?}", other)),
        },
    }
}

/// Lazily turns the lines of an interaction log into events. Lines which cannot be parsed are
/// skipped with a warning, only a failing read ends the stream with an error.
pub struct EventParser<R: io::Read> {
    path: PathBuf,
    records: csv::ByteRecordsIntoIter<R>,
    user_column: usize,
    item_column: usize,
    timestamp_column: usize,
    time_format: Option<String>,
    separator: char,
    num_skipped: u64,
    failed: bool,
}

impl EventParser<File> {

    pub fn open(config: &PipelineConfig, path: &Path) -> Result<Self> {
        let reader = csv_reader(config, path)?;
        Ok(EventParser::new(config, path, reader))
    }
}

impl<R: io::Read> EventParser<R> {

    pub fn new(config: &PipelineConfig, path: &Path, reader: csv::Reader<R>) -> Self {
        EventParser {
            path: path.to_path_buf(),
            records: reader.into_byte_records(),
            user_column: config.user_column,
            item_column: config.item_column,
            timestamp_column: config.timestamp_column,
            time_format: config.time_format.clone(),
            separator: config.separator,
            num_skipped: 0,
            failed: false,
        }
    }

    /// Number of lines skipped so far.
    pub fn num_skipped(&self) -> u64 {
        self.num_skipped
    }

    fn parse(&self, record: &csv::ByteRecord) -> std::result::Result<Event, LineError> {

        if record.len() < 3 {
            return Err(LineError::TooFewFields(record.len()));
        }

        let user = self.field(record, self.user_column)?;
        let item = self.field(record, self.item_column)?;
        let raw_timestamp = self.field(record, self.timestamp_column)?;

        let timestamp = match self.time_format {
            Some(ref format) => time::parse_timestamp(raw_timestamp, format)?,
            None => time::parse_raw_timestamp(raw_timestamp)?,
        };

        // Later stages compute gaps and calendar features from the timestamp.
        if time::TimeContext::from_timestamp(timestamp).is_none() {
            return Err(LineError::TimestampOutOfRange(timestamp));
        }

        Ok(Event::new(user, item, timestamp))
    }

    fn field<'a>(
        &self,
        record: &'a csv::ByteRecord,
        column: usize
    ) -> std::result::Result<&'a str, LineError> {

        let bytes = record.get(column)
            .ok_or(LineError::ColumnOutOfRange { column, num_fields: record.len() })?;

        str::from_utf8(bytes).map(str::trim).map_err(|_| LineError::Undecodable)
    }

    fn content(&self, record: &csv::ByteRecord) -> String {
        let fields: Vec<_> = record.iter().map(String::from_utf8_lossy).collect();
        fields.join(&self.separator.to_string())
    }
}

impl<R: io::Read> Iterator for EventParser<R> {
    type Item = Result<Event>;

    fn next(&mut self) -> Option<Self::Item> {

        if self.failed {
            return None;
        }

        loop {
            let record = match self.records.next()? {
                Ok(record) => record,
                Err(error) => {
                    self.failed = true;
                    return Some(Err(csv_error(Stage::Parse, &self.path, error)));
                }
            };

            match self.parse(&record) {
                Ok(event) => return Some(Ok(event)),
                Err(problem) => {
                    let line = record.position().map(|position| position.line()).unwrap_or(0);
                    warn!(line, "couldn't parse line ('{}'), ignoring: {}",
                        self.content(&record), problem);
                    self.num_skipped += 1;
                }
            }
        }
    }
}

/// Writes the run statistics as pretty-printed JSON.
pub fn write_report(report: &PipelineReport, path: &Path) -> Result<()> {
    let mut out = create_writer(Stage::Report, path)?;
    serde_json::to_writer_pretty(&mut out, report)?;
    write!(out, "\n").map_err(PipelineError::io(Stage::Report, path))?;
    out.flush().map_err(PipelineError::io(Stage::Report, path))?;

    Ok(())
}

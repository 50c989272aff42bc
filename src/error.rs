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

use std::fmt;
use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;

/// The pipeline stage in which a fatal error occurred.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Stage {
    Config,
    Parse,
    Aggregate,
    Store,
    Segment,
    Prune,
    Report,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let name = match *self {
            Stage::Config => "config",
            Stage::Parse => "parse",
            Stage::Aggregate => "aggregate",
            Stage::Store => "store",
            Stage::Segment => "segment",
            Stage::Prune => "prune",
            Stage::Report => "report",
        };
        write!(f, "{}", name)
    }
}

/// Errors which abort a run.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("[{stage}] i/o error on {}: {source}", .path.display())]
    Io {
        stage: Stage,
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("[{stage}] malformed record in {} at line {line}: '{content}'", .path.display())]
    MalformedRecord {
        stage: Stage,
        path: PathBuf,
        line: u64,
        content: String,
    },
    #[error("[config] {0}")]
    Config(String),
    #[error("[report] cannot serialize statistics: {0}")]
    Report(#[from] serde_json::Error),
}

impl PipelineError {

    pub fn io(stage: Stage, path: &Path) -> impl FnOnce(io::Error) -> PipelineError {
        let path = path.to_path_buf();
        move |source| PipelineError::Io { stage, path, source }
    }

    pub fn malformed(stage: Stage, path: &Path, line: u64, content: &str) -> PipelineError {
        PipelineError::MalformedRecord {
            stage,
            path: path.to_path_buf(),
            line,
            content: content.to_owned(),
        }
    }

    pub fn stage(&self) -> Stage {
        match *self {
            PipelineError::Io { stage, .. } => stage,
            PipelineError::MalformedRecord { stage, .. } => stage,
            PipelineError::Config(_) => Stage::Config,
            PipelineError::Report(_) => Stage::Report,
        }
    }
}

/// Reasons for skipping a single input line. These are logged and never abort a run.
#[derive(Debug, Error, PartialEq)]
pub enum LineError {
    #[error("expected at least 3 fields, found {0}")]
    TooFewFields(usize),
    #[error("column {column} out of range for {num_fields} fields")]
    ColumnOutOfRange { column: usize, num_fields: usize },
    #[error("cannot parse timestamp '{value}' with format '{format}'")]
    InvalidTimestamp { value: String, format: String },
    #[error("timestamp {0} is outside the supported calendar range")]
    TimestampOutOfRange(i64),
    #[error("line is not valid UTF-8")]
    Undecodable,
}

pub type Result<T> = std::result::Result<T, PipelineError>;

#[cfg(test)]
mod tests {

    use std::io;
    use std::path::Path;

    use super::{PipelineError, Stage};

    #[test]
    fn messages_name_the_stage() {
        let error = PipelineError::io(Stage::Store, Path::new("/tmp/users"))(
            io::Error::new(io::ErrorKind::PermissionDenied, "denied"));

        assert_eq!(error.stage(), Stage::Store);
        assert!(error.to_string().starts_with("[store] i/o error on /tmp/users"));

        let malformed = PipelineError::malformed(Stage::Prune, Path::new("train"), 3, "1,x");
        assert_eq!(malformed.to_string(), "[prune] malformed record in train at line 3: '1,x'");
    }
}

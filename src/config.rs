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

use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};

use crate::error::{PipelineError, Result, Stage};

pub const DEFAULT_TIME_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%Z";

/// Which stages of the pipeline to run.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Operation {
    /// Parse the input, rebuild the user store, then segment and prune.
    All,
    /// Segment and prune an existing user store.
    Split,
}

impl Operation {
    pub fn from_name(name: &str) -> Option<Operation> {
        match name {
            "all" => Some(Operation::All),
            "split" => Some(Operation::Split),
            _ => None,
        }
    }
}

/// The three partitions every retained user contributes to.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Split {
    Train,
    Dev,
    Test,
}

impl Split {
    pub fn name(&self) -> &'static str {
        match *self {
            Split::Train => "train",
            Split::Dev => "dev",
            Split::Test => "test",
        }
    }
}

/// All tunables of a run. Every stage receives this explicitly, there is no global state.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub input_path: Option<PathBuf>,
    pub user_store_dir: PathBuf,
    pub output_dir: PathBuf,
    /// Origin sessions longer than this are dropped entirely.
    pub max_valid_seq_len: usize,
    /// Sessions hold at most `max_session_len + 1` events.
    pub max_session_len: usize,
    pub min_occurrences: u64,
    /// Inactivity gap in seconds which closes an origin session.
    pub time_interval: i64,
    pub user_column: usize,
    pub item_column: usize,
    pub timestamp_column: usize,
    pub time_format: Option<String>,
    pub separator: char,
    pub prefix: String,
    pub suffix: String,
    pub operation: Operation,
    /// Selects per-dataset event filters, falls back to `prefix` when absent.
    pub dataset: Option<String>,
    pub min_user_sessions: usize,
    pub num_workers: Option<usize>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        PipelineConfig {
            input_path: None,
            user_store_dir: PathBuf::from("data/users"),
            output_dir: PathBuf::from("data/processed"),
            max_valid_seq_len: 500,
            max_session_len: 10,
            min_occurrences: 10,
            time_interval: 3600,
            user_column: 0,
            item_column: 5,
            timestamp_column: 1,
            time_format: Some(DEFAULT_TIME_FORMAT.to_owned()),
            separator: '\t',
            prefix: String::new(),
            suffix: String::new(),
            operation: Operation::All,
            dataset: None,
            min_user_sessions: 5,
            num_workers: None,
        }
    }
}

impl PipelineConfig {

    /// Reads a JSON configuration, absent fields keep their defaults.
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let file = File::open(path).map_err(PipelineError::io(Stage::Config, path))?;

        serde_json::from_reader(BufReader::new(file)).map_err(|error| {
            PipelineError::Config(format!("invalid configuration in {}: {}", path.display(), error))
        })
    }

    pub fn validate(&self) -> Result<()> {

        if self.operation == Operation::All && self.input_path.is_none() {
            return Err(PipelineError::Config(
                "an input path is required when running all stages".to_owned()));
        }

        if self.max_session_len == 0 {
            return Err(PipelineError::Config("max_session_len must be positive".to_owned()));
        }

        if self.time_interval <= 0 {
            return Err(PipelineError::Config("time_interval must be positive".to_owned()));
        }

        if !self.separator.is_ascii() {
            return Err(PipelineError::Config(
                format!("separator '{}' is not a single byte", self.separator)));
        }

        if let Some(ref input_path) = self.input_path {
            if input_path.starts_with(&self.user_store_dir) {
                return Err(PipelineError::Config(format!(
                    "input file {} lies inside the user store {}, which is wiped on every run",
                    input_path.display(),
                    self.user_store_dir.display())));
            }
        }

        if self.output_dir.starts_with(&self.user_store_dir) {
            return Err(PipelineError::Config(format!(
                "output directory {} lies inside the user store {}, which is wiped on every run",
                self.output_dir.display(),
                self.user_store_dir.display())));
        }

        Ok(())
    }

    pub fn dataset_name(&self) -> &str {
        self.dataset.as_ref().map(String::as_str).unwrap_or(&self.prefix)
    }

    pub fn num_workers(&self) -> usize {
        self.num_workers.unwrap_or_else(num_cpus::get).max(1)
    }

    pub fn separator_byte(&self) -> u8 {
        self.separator as u8
    }

    pub fn split_file_name(&self, split: Split) -> String {
        format!("{}{}{}", self.prefix, split.name(), self.suffix)
    }

    /// `{prefix}{split}{suffix}` in the output directory.
    pub fn split_path(&self, split: Split) -> PathBuf {
        self.output_dir.join(self.split_file_name(split))
    }

    /// The pruned counterpart of `split_path`.
    pub fn clean_path(&self, split: Split) -> PathBuf {
        self.output_dir.join(format!("clean-{}", self.split_file_name(split)))
    }

    pub fn metadata_path(&self) -> PathBuf {
        self.output_dir.join(format!("clean-{}-metadata", self.split_file_name(Split::Train)))
    }

    pub fn stats_path(&self) -> PathBuf {
        self.output_dir.join(format!("{}stats{}.json", self.prefix, self.suffix))
    }
}

#[cfg(test)]
mod tests {

    use std::io::Write;
    use std::path::PathBuf;

    use tempfile::NamedTempFile;

    use super::{Operation, PipelineConfig, Split};

    fn config_with_input() -> PipelineConfig {
        PipelineConfig {
            input_path: Some(PathBuf::from("events.tsv")),
            ..PipelineConfig::default()
        }
    }

    #[test]
    fn file_names() {
        let config = PipelineConfig {
            output_dir: PathBuf::from("out"),
            prefix: String::from("lastfm-"),
            suffix: String::from(".txt"),
            ..PipelineConfig::default()
        };

        assert_eq!(config.split_path(Split::Dev), PathBuf::from("out/lastfm-dev.txt"));
        assert_eq!(config.clean_path(Split::Test), PathBuf::from("out/clean-lastfm-test.txt"));
        assert_eq!(config.metadata_path(), PathBuf::from("out/clean-lastfm-train.txt-metadata"));
        assert_eq!(config.stats_path(), PathBuf::from("out/lastfm-stats.txt.json"));
    }

    #[test]
    fn validation() {
        assert!(config_with_input().validate().is_ok());

        assert!(PipelineConfig::default().validate().is_err());

        let split_only = PipelineConfig { operation: Operation::Split, ..PipelineConfig::default() };
        assert!(split_only.validate().is_ok());

        let no_window = PipelineConfig { max_session_len: 0, ..config_with_input() };
        assert!(no_window.validate().is_err());

        let wide_separator = PipelineConfig { separator: 'ß', ..config_with_input() };
        assert!(wide_separator.validate().is_err());

        let nested = PipelineConfig {
            user_store_dir: PathBuf::from("data"),
            output_dir: PathBuf::from("data/processed"),
            ..config_with_input()
        };
        assert!(nested.validate().is_err());

        let input_in_store = PipelineConfig {
            input_path: Some(PathBuf::from("data/users/events.tsv")),
            user_store_dir: PathBuf::from("data/users"),
            ..config_with_input()
        };
        assert!(input_in_store.validate().is_err());
    }

    #[test]
    fn dataset_falls_back_to_prefix() {
        let config = PipelineConfig { prefix: String::from("lastfm"), ..PipelineConfig::default() };
        assert_eq!(config.dataset_name(), "lastfm");

        let named = PipelineConfig { dataset: Some(String::from("yoochoose")), ..config };
        assert_eq!(named.dataset_name(), "yoochoose");
    }

    #[test]
    fn json_overrides_defaults() {
        let mut file = NamedTempFile::new().unwrap();
        write!(file, r#"{{"max_session_len": 20, "time_format": null, "operation": "split"}}"#)
            .unwrap();

        let config = PipelineConfig::from_json_file(file.path()).unwrap();

        assert_eq!(config.max_session_len, 20);
        assert_eq!(config.time_format, None);
        assert_eq!(config.operation, Operation::Split);
        assert_eq!(config.min_occurrences, 10);
        assert_eq!(config.separator, '\t');
    }
}

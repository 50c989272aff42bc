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

use std::fs;
use std::fs::File;
use std::io::{BufWriter, ErrorKind, Write};
use std::ops::Range;
use std::path::PathBuf;

use crate::config::{PipelineConfig, Split};
use crate::error::{PipelineError, Result, Stage};
use crate::io;
use crate::time::TimeContext;
use crate::types::{Session, SESSION_DELIMITER};

/// Positions of a user's sessions in each split: everything up to the second to last session
/// goes to train, the second to last one to dev and the last one to test.
#[derive(Debug, PartialEq)]
pub struct SplitBounds {
    pub train: Range<usize>,
    pub dev: Range<usize>,
    pub test: Range<usize>,
}

impl SplitBounds {

    /// The bounds follow slicing semantics with negative indices counting from the end, so a
    /// user with a single session only contributes to test.
    pub fn new(num_sessions: usize) -> Self {
        let length = num_sessions as i64;
        let train_end = slice_index(length - 2, num_sessions);
        let dev_end = slice_index(length - 1, num_sessions);

        SplitBounds {
            train: 0..train_end,
            dev: train_end..dev_end,
            test: dev_end..num_sessions,
        }
    }

    pub fn range(&self, split: Split) -> Range<usize> {
        match split {
            Split::Train => self.train.clone(),
            Split::Dev => self.dev.clone(),
            Split::Test => self.test.clone(),
        }
    }
}

fn slice_index(index: i64, length: usize) -> usize {
    if index < 0 {
        (index + length as i64).max(0) as usize
    } else {
        (index as usize).min(length)
    }
}

/// Number of sessions written to each split.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct SplitCounts {
    pub train: u64,
    pub dev: u64,
    pub test: u64,
}

struct SplitFile {
    split: Split,
    path: PathBuf,
    out: BufWriter<File>,
    num_lines: u64,
}

/// Appends the sessions of retained users to the train, dev and test files.
pub struct SplitWriter {
    files: Vec<SplitFile>,
}

pub const SPLITS: [Split; 3] = [Split::Train, Split::Dev, Split::Test];

impl SplitWriter {

    /// Removes split files left over from previous runs, then opens all splits for appending.
    pub fn create(config: &PipelineConfig) -> Result<Self> {

        fs::create_dir_all(&config.output_dir)
            .map_err(PipelineError::io(Stage::Segment, &config.output_dir))?;

        let mut files = Vec::with_capacity(SPLITS.len());

        for &split in SPLITS.iter() {
            let path = config.split_path(split);

            if let Err(source) = fs::remove_file(&path) {
                if source.kind() != ErrorKind::NotFound {
                    return Err(PipelineError::Io { stage: Stage::Segment, path, source });
                }
            }

            let out = io::append_writer(Stage::Segment, &path)?;
            files.push(SplitFile { split, path, out, num_lines: 0 });
        }

        Ok(SplitWriter { files })
    }

    /// Writes every event as `user,item,hour,weekday,half_month`, each session is terminated by
    /// a delimiter line.
    pub fn write_user(&mut self, sessions: &[Session]) -> Result<SplitCounts> {

        let bounds = SplitBounds::new(sessions.len());
        let mut counts = SplitCounts::default();

        for file in self.files.iter_mut() {
            let range = bounds.range(file.split);
            let num_sessions = range.len() as u64;

            for session in &sessions[range] {
                write_session(file, session)?;
            }

            match file.split {
                Split::Train => counts.train += num_sessions,
                Split::Dev => counts.dev += num_sessions,
                Split::Test => counts.test += num_sessions,
            }
        }

        Ok(counts)
    }

    pub fn finish(mut self) -> Result<()> {
        for file in self.files.iter_mut() {
            file.out.flush().map_err(PipelineError::io(Stage::Segment, &file.path))?;
        }

        Ok(())
    }
}

fn write_session(file: &mut SplitFile, session: &Session) -> Result<()> {

    for event in session {
        // Records are checked against the calendar when they are read from the store.
        let context = TimeContext::from_timestamp(event.timestamp).ok_or_else(|| {
            let content = format!("{},{},{}", event.user, event.item, event.timestamp);
            PipelineError::malformed(Stage::Segment, &file.path, file.num_lines + 1, &content)
        })?;

        write!(file.out, "{},{},{},{},{}\n",
            event.user, event.item, context.hour, context.weekday, context.half_month)
            .map_err(PipelineError::io(Stage::Segment, &file.path))?;
        file.num_lines += 1;
    }

    write!(file.out, "{}\n", SESSION_DELIMITER).map_err(PipelineError::io(Stage::Segment, &file.path))?;
    file.num_lines += 1;

    Ok(())
}

#[cfg(test)]
mod tests {

    use std::fs;
    use std::path::PathBuf;

    use tempfile::TempDir;

    use super::{SplitBounds, SplitCounts, SplitWriter};
    use crate::config::{PipelineConfig, Split};
    use crate::types::{Session, StoredEvent};

    #[test]
    fn last_two_sessions_go_to_dev_and_test() {
        let bounds = SplitBounds::new(5);

        assert_eq!(bounds.train, 0..3);
        assert_eq!(bounds.dev, 3..4);
        assert_eq!(bounds.test, 4..5);
    }

    #[test]
    fn degenerate_bounds() {
        assert_eq!(SplitBounds::new(2), SplitBounds { train: 0..0, dev: 0..1, test: 1..2 });
        assert_eq!(SplitBounds::new(1), SplitBounds { train: 0..0, dev: 0..0, test: 0..1 });
        assert_eq!(SplitBounds::new(0), SplitBounds { train: 0..0, dev: 0..0, test: 0..0 });
    }

    fn session(user: u32, items: &[u32], start: i64) -> Session {
        items.iter().enumerate()
            .map(|(offset, &item)| StoredEvent { user, item, timestamp: start + offset as i64 * 60 })
            .collect()
    }

    fn config(dir: PathBuf) -> PipelineConfig {
        PipelineConfig { output_dir: dir, ..PipelineConfig::default() }
    }

    #[test]
    fn sessions_are_written_with_time_context() {
        let temp = TempDir::new().unwrap();
        let config = config(temp.path().to_path_buf());

        // 2009-05-04T23:00:00Z, a Monday
        let monday = 1241478000;
        let sessions = vec![
            session(1, &[1, 2], monday),
            session(1, &[3, 4], monday + 10_000),
            session(1, &[5, 6], monday + 20_000),
        ];

        let mut writer = SplitWriter::create(&config).unwrap();
        let counts = writer.write_user(&sessions).unwrap();
        writer.finish().unwrap();

        assert_eq!(counts, SplitCounts { train: 1, dev: 1, test: 1 });

        let train = fs::read_to_string(config.split_path(Split::Train)).unwrap();
        assert_eq!(train, "1,1,23,0,9\n1,2,23,0,9\n-----\n");

        let test = fs::read_to_string(config.split_path(Split::Test)).unwrap();
        assert_eq!(test, "1,5,4,1,9\n1,6,4,1,9\n-----\n");
    }

    #[test]
    fn previous_outputs_are_cleared() {
        let temp = TempDir::new().unwrap();
        let config = config(temp.path().to_path_buf());

        fs::write(config.split_path(Split::Dev), "9,9,0,0,1\n-----\n").unwrap();

        let mut writer = SplitWriter::create(&config).unwrap();
        writer.write_user(&[session(2, &[1, 2], 0)]).unwrap();
        writer.write_user(&[session(3, &[3, 4], 0)]).unwrap();
        writer.finish().unwrap();

        assert_eq!(fs::read_to_string(config.split_path(Split::Dev)).unwrap(), "");
        assert_eq!(
            fs::read_to_string(config.split_path(Split::Test)).unwrap(),
            "2,1,0,3,1\n2,2,0,3,1\n-----\n3,3,0,3,1\n3,4,0,3,1\n-----\n");
    }
}

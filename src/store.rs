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
use std::io::{BufRead, Write};
use std::path::{Path, PathBuf};

use crate::aggregate::Aggregated;
use crate::error::{PipelineError, Result, Stage};
use crate::io;
use crate::time::TimeContext;
use crate::types::{StoredEvent, UserId};

/// One file per user holding the user's chronologically sorted interactions as
/// `user_id,item_id,timestamp` lines with dense ids.
pub struct UserStore {
    dir: PathBuf,
}

impl UserStore {

    pub fn new<P: Into<PathBuf>>(dir: P) -> Self {
        UserStore { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Deletes the store directory with ALL of its contents and recreates it empty.
    pub fn reset(&self) -> Result<()> {

        if self.dir.exists() {
            warn!("Removing all contents of the user store at {}", self.dir.display());
            fs::remove_dir_all(&self.dir).map_err(PipelineError::io(Stage::Store, &self.dir))?;
        }

        fs::create_dir_all(&self.dir).map_err(PipelineError::io(Stage::Store, &self.dir))
    }

    /// Writes one record per user, returns the number of records written.
    pub fn write_all(&self, aggregated: &Aggregated) -> Result<usize> {

        let mut num_records = 0;

        for (user, history) in aggregated.histories.iter() {

            // The vocabularies were built from the histories themselves.
            let user_id = match aggregated.users.id(user.as_str()) {
                Some(user_id) => user_id,
                None => continue,
            };

            let events: Vec<StoredEvent> = history.iter()
                .filter_map(|&(timestamp, ref item)| {
                    aggregated.items.id(item.as_str())
                        .map(|item_id| StoredEvent { user: user_id, item: item_id, timestamp })
                })
                .collect();

            self.write_user(user, user_id, &events)?;
            num_records += 1;
        }

        Ok(num_records)
    }

    pub fn write_user(&self, raw_user: &str, user_id: UserId, events: &[StoredEvent]) -> Result<()> {

        let path = self.dir.join(record_name(raw_user, user_id));
        let mut out = io::create_writer(Stage::Store, &path)?;

        for event in events {
            write!(out, "{},{},{}\n", event.user, event.item, event.timestamp)
                .map_err(PipelineError::io(Stage::Store, &path))?;
        }

        out.flush().map_err(PipelineError::io(Stage::Store, &path))
    }

    /// All records, sorted by file name so that later passes visit users in a stable order.
    pub fn records(&self) -> Result<Vec<PathBuf>> {

        let entries = fs::read_dir(&self.dir).map_err(PipelineError::io(Stage::Store, &self.dir))?;

        let mut records = Vec::new();
        for entry in entries {
            let entry = entry.map_err(PipelineError::io(Stage::Store, &self.dir))?;
            let path = entry.path();
            if path.is_file() {
                records.push(path);
            }
        }

        records.sort_by(|a, b| a.file_name().cmp(&b.file_name()));

        Ok(records)
    }

    pub fn read(path: &Path) -> Result<Vec<StoredEvent>> {

        let reader = io::open_reader(Stage::Store, path)?;
        let mut events = Vec::new();

        for (index, line) in reader.lines().enumerate() {
            let line = line.map_err(PipelineError::io(Stage::Store, path))?;
            let line = line.trim();

            if line.is_empty() {
                continue;
            }

            let event = parse_stored_event(line)
                .ok_or_else(|| PipelineError::malformed(Stage::Store, path, index as u64 + 1, line))?;
            events.push(event);
        }

        Ok(events)
    }
}

fn parse_stored_event(line: &str) -> Option<StoredEvent> {
    let mut fields = line.split(',');

    let user = fields.next()?.parse().ok()?;
    let item = fields.next()?.parse().ok()?;
    let timestamp = fields.next()?.parse().ok()?;

    if fields.next().is_some() || TimeContext::from_timestamp(timestamp).is_none() {
        return None;
    }

    Some(StoredEvent { user, item, timestamp })
}

/// The raw user id if it is safe to use as a file name, `@<user_id>` otherwise.
pub fn record_name(raw_user: &str, user_id: UserId) -> String {

    let is_safe = !raw_user.is_empty()
        && !raw_user.starts_with('.')
        && raw_user.chars().all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-' || c == '.');

    if is_safe {
        raw_user.to_owned()
    } else {
        format!("@{}", user_id)
    }
}

#[cfg(test)]
mod tests {

    use std::fs;

    use tempfile::TempDir;

    use super::{record_name, UserStore};
    use crate::aggregate;
    use crate::filters::KeepAll;
    use crate::types::{Event, StoredEvent};

    #[test]
    fn unsafe_names_are_substituted() {
        assert_eq!(record_name("user_000001", 7), "user_000001");
        assert_eq!(record_name("a.b-c", 7), "a.b-c");
        assert_eq!(record_name("../etc", 7), "@7");
        assert_eq!(record_name("with space", 8), "@8");
        assert_eq!(record_name("", 9), "@9");
        assert_eq!(record_name("..", 9), "@9");
    }

    #[test]
    fn reset_wipes_previous_contents() {
        let temp = TempDir::new().unwrap();
        let store = UserStore::new(temp.path().join("users"));

        store.reset().unwrap();
        fs::write(store.dir().join("stale"), "1,1,1\n").unwrap();
        store.reset().unwrap();

        assert!(store.dir().exists());
        assert!(store.records().unwrap().is_empty());
    }

    #[test]
    fn records_round_trip_through_the_store() {
        let temp = TempDir::new().unwrap();
        let store = UserStore::new(temp.path().join("users"));
        store.reset().unwrap();

        let events = vec![
            Ok(Event::new("bob", "pony", 20)),
            Ok(Event::new("alice", "apple", 10)),
            Ok(Event::new("alice", "pony", 5)),
        ];
        let aggregated = aggregate::aggregate(events, &KeepAll, 1).unwrap();

        assert_eq!(store.write_all(&aggregated).unwrap(), 2);

        let records = store.records().unwrap();
        let names: Vec<_> = records.iter()
            .map(|path| path.file_name().unwrap().to_str().unwrap().to_owned())
            .collect();
        assert_eq!(names, vec!["alice", "bob"]);

        let alice = UserStore::read(&records[0]).unwrap();
        assert_eq!(alice, vec![
            StoredEvent { user: 1, item: 2, timestamp: 5 },
            StoredEvent { user: 1, item: 1, timestamp: 10 },
        ]);

        assert_eq!(fs::read_to_string(&records[1]).unwrap(), "2,2,20\n");
    }

    #[test]
    fn malformed_records_are_fatal() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("broken");
        fs::write(&path, "1,1,1\n1,x,2\n").unwrap();

        let error = UserStore::read(&path).unwrap_err();
        assert!(error.to_string().contains("at line 2"));
    }

    #[test]
    fn timestamps_off_the_calendar_are_fatal() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("edited");
        fs::write(&path, "1,1,100\n1,2,99999999999999\n").unwrap();

        let error = UserStore::read(&path).unwrap_err();
        assert!(error.to_string().contains("at line 2"));
    }
}

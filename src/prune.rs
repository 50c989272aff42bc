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

use std::io::{BufRead, Write};
use std::path::Path;

use fnv::FnvHashSet;

use crate::config::{PipelineConfig, Split};
use crate::error::{PipelineError, Result, Stage};
use crate::io;
use crate::split::SPLITS;
use crate::stats::PruneStats;
use crate::types::{ItemId, UserId, SESSION_DELIMITER};
use crate::vocab::Vocabulary;

enum SplitLine<'a> {
    Delimiter,
    Event { user: UserId, item: ItemId, context: &'a str },
}

fn parse_line(line: &str) -> Option<SplitLine> {

    if line == SESSION_DELIMITER {
        return Some(SplitLine::Delimiter);
    }

    let mut fields = line.splitn(3, ',');
    let user = fields.next()?.parse().ok()?;
    let item = fields.next()?.parse().ok()?;
    let context = fields.next()?;

    if context.split(',').count() != 3 {
        return None;
    }

    Some(SplitLine::Event { user, item, context })
}

/// Streams the lines of a split file into `visit`.
fn for_each_line<F>(path: &Path, mut visit: F) -> Result<()>
    where F: FnMut(SplitLine) -> Result<()> {

    let reader = io::open_reader(Stage::Prune, path)?;

    for (index, line) in reader.lines().enumerate() {
        let line = line.map_err(PipelineError::io(Stage::Prune, path))?;
        let line = line.trim();

        if line.is_empty() {
            continue;
        }

        let parsed = parse_line(line)
            .ok_or_else(|| PipelineError::malformed(Stage::Prune, path, index as u64 + 1, line))?;

        visit(parsed)?;
    }

    Ok(())
}

/// Removes all items which never occur in the training data from the splits, and re-indexes
/// the remaining users and items to consecutive ids. The results are written to `clean-`
/// prefixed copies of the splits, together with a metadata file holding the number of items,
/// the number of users and the maximum session length.
pub fn remove_unseen_data(config: &PipelineConfig) -> Result<PruneStats> {

    let mut users: FnvHashSet<UserId> = FnvHashSet::default();
    let mut train_items: FnvHashSet<ItemId> = FnvHashSet::default();
    let mut stats = PruneStats::default();

    for_each_line(&config.split_path(Split::Train), |line| {
        if let SplitLine::Event { user, item, .. } = line {
            users.insert(user);
            train_items.insert(item);
            stats.num_train_events += 1;
        }
        Ok(())
    })?;

    info!("[TRAIN] Total events: {}", stats.num_train_events);

    for &split in [Split::Test, Split::Dev].iter() {
        let mut num_events = 0;

        for_each_line(&config.split_path(split), |line| {
            if let SplitLine::Event { user, item, .. } = line {
                if train_items.contains(&item) {
                    users.insert(user);
                    num_events += 1;
                }
            }
            Ok(())
        })?;

        info!("[{}] Total events: {}", split.name().to_uppercase(), num_events);

        match split {
            Split::Test => stats.num_test_events = num_events,
            _ => stats.num_dev_events = num_events,
        }
    }

    let user_ids = Vocabulary::from_keys(users);
    let item_ids = Vocabulary::from_keys(train_items);

    for &split in SPLITS.iter() {
        rewrite(&config.split_path(split), &config.clean_path(split), &user_ids, &item_ids)?;
    }

    write_metadata(&config.metadata_path(), item_ids.len(), user_ids.len(), config.max_session_len)?;

    stats.num_users = user_ids.len();
    stats.num_items = item_ids.len();

    Ok(stats)
}

fn rewrite(
    from: &Path,
    to: &Path,
    user_ids: &Vocabulary<UserId>,
    item_ids: &Vocabulary<ItemId>,
) -> Result<()> {

    let mut out = io::create_writer(Stage::Prune, to)?;

    for_each_line(from, |line| {
        let written = match line {
            SplitLine::Delimiter => write!(out, "{}\n", SESSION_DELIMITER),
            SplitLine::Event { user, item, context } => {
                match (user_ids.id(&user), item_ids.id(&item)) {
                    (Some(user), Some(item)) => write!(out, "{},{},{}\n", user, item, context),
                    _ => Ok(()),
                }
            }
        };

        written.map_err(PipelineError::io(Stage::Prune, to))
    })?;

    out.flush().map_err(PipelineError::io(Stage::Prune, to))
}

fn write_metadata(path: &Path, num_items: usize, num_users: usize, max_session_len: usize) -> Result<()> {
    let mut out = io::create_writer(Stage::Prune, path)?;

    write!(out, "{}\n{}\n{}\n", num_items, num_users, max_session_len)
        .map_err(PipelineError::io(Stage::Prune, path))?;

    out.flush().map_err(PipelineError::io(Stage::Prune, path))
}

#[cfg(test)]
mod tests {

    use std::fs;

    use tempfile::TempDir;

    use super::remove_unseen_data;
    use crate::config::{PipelineConfig, Split};

    fn config(temp: &TempDir) -> PipelineConfig {
        PipelineConfig {
            output_dir: temp.path().to_path_buf(),
            max_session_len: 10,
            ..PipelineConfig::default()
        }
    }

    fn write_splits(config: &PipelineConfig, train: &str, dev: &str, test: &str) {
        fs::write(config.split_path(Split::Train), train).unwrap();
        fs::write(config.split_path(Split::Dev), dev).unwrap();
        fs::write(config.split_path(Split::Test), test).unwrap();
    }

    fn clean(config: &PipelineConfig, split: Split) -> String {
        fs::read_to_string(config.clean_path(split)).unwrap()
    }

    #[test]
    fn items_unseen_in_train_are_removed() {
        let temp = TempDir::new().unwrap();
        let config = config(&temp);

        write_splits(&config,
            "4,10,1,2,3\n4,30,1,2,3\n-----\n",
            "4,20,5,6,7\n4,30,5,6,7\n-----\n",
            "9,20,8,0,9\n-----\n7,10,8,0,9\n-----\n");

        let stats = remove_unseen_data(&config).unwrap();

        assert_eq!(stats.num_train_events, 2);
        assert_eq!(stats.num_dev_events, 1);
        assert_eq!(stats.num_test_events, 1);
        // user 9 only interacted with an unseen item
        assert_eq!(stats.num_users, 2);
        assert_eq!(stats.num_items, 2);

        assert_eq!(clean(&config, Split::Train), "1,1,1,2,3\n1,2,1,2,3\n-----\n");
        assert_eq!(clean(&config, Split::Dev), "1,2,5,6,7\n-----\n");
        assert_eq!(clean(&config, Split::Test), "-----\n2,1,8,0,9\n-----\n");

        assert_eq!(fs::read_to_string(config.metadata_path()).unwrap(), "2\n2\n10\n");
    }

    #[test]
    fn pruning_clean_splits_again_changes_nothing() {
        let temp = TempDir::new().unwrap();
        let config = config(&temp);

        write_splits(&config,
            "3,7,1,2,3\n3,8,1,2,3\n-----\n5,8,4,4,4\n5,9,4,4,4\n-----\n",
            "3,9,5,6,7\n3,2,5,6,7\n-----\n",
            "5,7,8,0,9\n6,1,8,0,9\n-----\n");
        remove_unseen_data(&config).unwrap();

        let first: Vec<String> = [Split::Train, Split::Dev, Split::Test].iter()
            .map(|&split| clean(&config, split))
            .collect();

        let again = PipelineConfig {
            prefix: String::from("clean-"),
            ..config.clone()
        };
        remove_unseen_data(&again).unwrap();

        let second: Vec<String> = [Split::Train, Split::Dev, Split::Test].iter()
            .map(|&split| clean(&again, split))
            .collect();

        assert_eq!(first, second);
        assert_eq!(
            fs::read_to_string(config.metadata_path()).unwrap(),
            fs::read_to_string(again.metadata_path()).unwrap());
    }

    #[test]
    fn corrupt_splits_are_fatal() {
        let temp = TempDir::new().unwrap();
        let config = config(&temp);

        write_splits(&config, "1,1,1,2,3\n1,one,1,2,3\n-----\n", "", "");

        let error = remove_unseen_data(&config).unwrap_err();
        assert!(error.to_string().contains("at line 2"));
    }

    #[test]
    fn empty_splits_yield_empty_vocabularies() {
        let temp = TempDir::new().unwrap();
        let config = config(&temp);

        write_splits(&config, "", "", "");

        let stats = remove_unseen_data(&config).unwrap();

        assert_eq!(stats.num_users, 0);
        assert_eq!(stats.num_items, 0);
        assert_eq!(fs::read_to_string(config.metadata_path()).unwrap(), "0\n0\n10\n");
    }
}

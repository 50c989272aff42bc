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

extern crate chrono;
extern crate csv;
extern crate fnv;
extern crate num_cpus;
extern crate scoped_pool;
extern crate serde;
#[macro_use]
extern crate serde_derive;
extern crate serde_json;
extern crate thiserror;
#[macro_use]
extern crate tracing;

#[cfg(test)]
extern crate tempfile;

use std::io as std_io;
use std::path::PathBuf;
use std::time::Instant;

use scoped_pool::Pool;

pub mod aggregate;
pub mod config;
pub mod error;
pub mod filters;
pub mod io;
pub mod prune;
pub mod session;
pub mod split;
pub mod stats;
pub mod store;
pub mod time;
pub mod types;
pub mod utils;
pub mod vocab;


use config::{Operation, PipelineConfig};
use error::{PipelineError, Result, Stage};
use session::{SessionCutter, UserSessions};
use split::SplitWriter;
use stats::{AggregationStats, PipelineReport, SegmentationStats};
use store::UserStore;

/// Number of user records cut in parallel before their sessions are written.
const BATCH_SIZE: usize = 1024;

/// Runs the configured stages and writes the statistics report next to the split files.
pub fn run(config: &PipelineConfig) -> Result<PipelineReport> {

    config.validate()?;

    let store = UserStore::new(config.user_store_dir.clone());

    let aggregation = match config.operation {
        Operation::All => Some(preprocess(config, &store)?),
        Operation::Split => None,
    };

    let segmentation = split_sessions(config, &store)?;

    let prune_start = Instant::now();
    let pruning = prune::remove_unseen_data(config)?;
    info!(
        "Kept {} users and {} items after removing items unseen in training ({}ms)",
        pruning.num_users,
        pruning.num_items,
        utils::to_millis(prune_start.elapsed()));

    let report = PipelineReport::new(aggregation, segmentation, pruning, config.max_session_len);

    let stats_path = config.stats_path();
    io::write_report(&report, &stats_path)?;
    info!("Wrote statistics to {}", stats_path.display());

    Ok(report)
}

/// Parses the raw interactions, drops infrequent items and rebuilds the user store from scratch.
pub fn preprocess(config: &PipelineConfig, store: &UserStore) -> Result<AggregationStats> {

    let input_path = config.input_path.as_ref()
        .ok_or_else(|| PipelineError::Config("no input path given".to_owned()))?;

    let start = Instant::now();

    info!("Reading {} to count and group interactions", input_path.display());

    let mut parser = io::EventParser::open(config, input_path)?;
    let filter = filters::for_dataset(config.dataset_name());

    let mut aggregated = aggregate::aggregate(
        parser.by_ref(), filter.as_ref(), config.min_occurrences)?;
    aggregated.stats.num_skipped_lines = parser.num_skipped();

    info!(
        "Found {} interactions ({} with frequent items) between {} users and {} items, \
         skipped {} lines ({}ms)",
        aggregated.stats.num_events,
        aggregated.stats.num_frequent_events,
        aggregated.stats.num_users,
        aggregated.stats.num_items,
        aggregated.stats.num_skipped_lines,
        utils::to_millis(start.elapsed()));

    store.reset()?;
    let num_records = store.write_all(&aggregated)?;

    info!("Wrote {} user records to {}", num_records, store.dir().display());

    Ok(aggregated.stats)
}

/// Cuts the sessions of every user in the store and appends those of retained users to the
/// splits. Users are cut in parallel, but always written in the sorted order of their records,
/// so the output does not depend on the number of workers.
pub fn split_sessions(config: &PipelineConfig, store: &UserStore) -> Result<SegmentationStats> {

    let start = Instant::now();

    let records = store.records()?;
    let cutter = SessionCutter::new(config);
    let mut writer = SplitWriter::create(config)?;
    let mut stats = SegmentationStats::default();

    info!("Cutting sessions for {} users with {} workers", records.len(), config.num_workers());

    let pool = Pool::new(config.num_workers());

    for batch in records.chunks(BATCH_SIZE) {

        let cut_sessions = utils::map_in_order(&pool, batch, |path| {
            UserStore::read(path).map(|events| cutter.cut_user(&events))
        });

        for (path, user_sessions) in batch.iter().zip(cut_sessions.into_iter()) {

            let user_sessions: UserSessions = match user_sessions {
                Some(result) => result?,
                None => return Err(worker_failed(path.clone())),
            };

            if !cutter.is_retained(&user_sessions) {
                debug!(
                    "Dropping {}, only {} valid sessions",
                    path.display(),
                    user_sessions.num_origin_sessions);
                continue;
            }

            stats.num_users += 1;
            stats.num_origin_sessions += user_sessions.num_origin_sessions;
            stats.num_cut_sessions += user_sessions.sessions.len() as u64;
            stats.num_events += user_sessions.num_events;

            let counts = writer.write_user(&user_sessions.sessions)?;
            stats.num_train_sessions += counts.train;
            stats.num_dev_sessions += counts.dev;
            stats.num_test_sessions += counts.test;
        }
    }

    pool.shutdown();
    writer.finish()?;

    info!("Cut sessions in {}ms", utils::to_millis(start.elapsed()));
    stats.log();

    Ok(stats)
}

fn worker_failed(path: PathBuf) -> PipelineError {
    PipelineError::Io {
        stage: Stage::Segment,
        path,
        source: std_io::Error::new(std_io::ErrorKind::Other, "worker did not complete"),
    }
}

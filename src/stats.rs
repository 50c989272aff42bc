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

/// `numerator / denominator`, or `None` if nothing was observed.
pub fn ratio(numerator: u64, denominator: u64) -> Option<f64> {
    if denominator == 0 {
        None
    } else {
        Some(numerator as f64 / denominator as f64)
    }
}

/// Displays a ratio which might be undefined.
pub struct Ratio(pub Option<f64>);

impl fmt::Display for Ratio {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self.0 {
            Some(value) => write!(f, "{:.4}", value),
            None => write!(f, "undefined"),
        }
    }
}

/// Counts collected while parsing and aggregating the raw interactions.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct AggregationStats {
    pub num_skipped_lines: u64,
    /// Events retained by the dataset filter, before frequency filtering.
    pub num_events: u64,
    pub num_frequent_events: u64,
    pub num_users: usize,
    pub num_items: usize,
}

/// Counts over the users retained during segmentation.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct SegmentationStats {
    pub num_users: u64,
    pub num_origin_sessions: u64,
    pub num_cut_sessions: u64,
    pub num_events: u64,
    pub num_train_sessions: u64,
    pub num_dev_sessions: u64,
    pub num_test_sessions: u64,
}

impl SegmentationStats {

    pub fn events_per_origin_session(&self) -> Option<f64> {
        ratio(self.num_events, self.num_origin_sessions)
    }

    pub fn events_per_cut_session(&self) -> Option<f64> {
        ratio(self.num_events, self.num_cut_sessions)
    }

    pub fn sessions_per_user(&self) -> Option<f64> {
        ratio(self.num_origin_sessions, self.num_users)
    }

    pub fn log(&self) {
        info!("Total users: {}", self.num_users);
        info!("Total origin sessions: {}", self.num_origin_sessions);
        info!("Total cut sessions: {}", self.num_cut_sessions);
        info!("Total events: {}", self.num_events);
        info!("Events per origin session: {}", Ratio(self.events_per_origin_session()));
        info!("Events per cut session: {}", Ratio(self.events_per_cut_session()));
        info!("Sessions per user: {}", Ratio(self.sessions_per_user()));
    }
}

/// Counts after removing items unseen during training.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct PruneStats {
    pub num_train_events: u64,
    pub num_dev_events: u64,
    pub num_test_events: u64,
    pub num_users: usize,
    pub num_items: usize,
}

/// Everything we know about a run, written next to the split files.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct PipelineReport {
    /// Absent when an existing user store was segmented.
    pub aggregation: Option<AggregationStats>,
    pub segmentation: SegmentationStats,
    pub events_per_origin_session: Option<f64>,
    pub events_per_cut_session: Option<f64>,
    pub sessions_per_user: Option<f64>,
    pub pruning: PruneStats,
    pub max_session_len: usize,
}

impl PipelineReport {

    pub fn new(
        aggregation: Option<AggregationStats>,
        segmentation: SegmentationStats,
        pruning: PruneStats,
        max_session_len: usize,
    ) -> Self {
        PipelineReport {
            aggregation,
            events_per_origin_session: segmentation.events_per_origin_session(),
            events_per_cut_session: segmentation.events_per_cut_session(),
            sessions_per_user: segmentation.sessions_per_user(),
            segmentation,
            pruning,
            max_session_len,
        }
    }
}

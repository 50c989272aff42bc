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

use std::cmp;

use crate::config::PipelineConfig;
use crate::types::{Session, StoredEvent};

/// Result of cutting a single origin session into windows.
#[derive(Debug, PartialEq)]
pub struct Cut {
    pub sessions: Vec<Session>,
    /// Whether the origin session counts towards the user's sessions.
    pub is_valid: bool,
    /// Length of the origin session if it is valid, 0 otherwise.
    pub num_events: usize,
}

/// All sessions of one user, in chronological order.
#[derive(Debug, Default, PartialEq)]
pub struct UserSessions {
    pub sessions: Vec<Session>,
    pub num_origin_sessions: u64,
    pub num_events: u64,
}

pub struct SessionCutter {
    time_interval: u64,
    max_valid_seq_len: usize,
    max_session_len: usize,
    min_user_sessions: usize,
}

impl SessionCutter {

    pub fn new(config: &PipelineConfig) -> Self {
        SessionCutter {
            time_interval: config.time_interval.max(0) as u64,
            max_valid_seq_len: config.max_valid_seq_len,
            max_session_len: config.max_session_len,
            min_user_sessions: config.min_user_sessions,
        }
    }

    /// Splits a user's chronological events into origin sessions at every gap of at least
    /// `time_interval` seconds. An event repeating the item of the previously kept event within
    /// a session is dropped.
    pub fn origin_sessions(&self, events: &[StoredEvent]) -> Vec<Vec<StoredEvent>> {

        let mut origin_sessions = Vec::new();
        let mut current: Vec<StoredEvent> = Vec::new();

        for event in events {

            let continues_session = match current.last() {
                Some(last) => event.timestamp.abs_diff(last.timestamp) < self.time_interval,
                None => false,
            };

            if continues_session {
                let repeats_last_item = current.last()
                    .map(|last| last.item == event.item)
                    .unwrap_or(false);

                if !repeats_last_item {
                    current.push(*event);
                }
            } else {
                if !current.is_empty() {
                    origin_sessions.push(current);
                }
                current = vec![*event];
            }
        }

        if !current.is_empty() {
            origin_sessions.push(current);
        }

        origin_sessions
    }

    /// Cuts an origin session into windows of `max_session_len + 1` events, starting every
    /// `max_session_len` events, so that neighbouring windows share one event. Single events and
    /// origin sessions longer than `max_valid_seq_len` yield nothing.
    pub fn cut(&self, origin_session: &[StoredEvent]) -> Cut {

        let length = origin_session.len();

        if length <= 1 || length > self.max_valid_seq_len {
            return Cut { sessions: Vec::new(), is_valid: false, num_events: 0 };
        }

        let num_windows = (length - 1) / self.max_session_len + 1;
        let mut sessions = Vec::with_capacity(num_windows);

        for window in 0..num_windows {
            let start = window * self.max_session_len;
            let end = cmp::min(start + self.max_session_len + 1, length);

            if end - start > 1 {
                sessions.push(origin_session[start..end].to_vec());
            }
        }

        Cut { sessions, is_valid: true, num_events: length }
    }

    /// Sessions for all origin sessions of a user.
    pub fn cut_user(&self, events: &[StoredEvent]) -> UserSessions {

        let mut user_sessions = UserSessions::default();

        for origin_session in self.origin_sessions(events) {
            let cut = self.cut(&origin_session);

            if cut.is_valid {
                user_sessions.num_origin_sessions += 1;
            }
            user_sessions.num_events += cut.num_events as u64;
            user_sessions.sessions.extend(cut.sessions);
        }

        user_sessions
    }

    /// Users with too few valid origin sessions are excluded from the dataset.
    pub fn is_retained(&self, user_sessions: &UserSessions) -> bool {
        user_sessions.num_origin_sessions >= self.min_user_sessions as u64
    }
}

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

use fnv::FnvHashMap;

/// Dense identifiers start at 1, 0 is reserved for padding downstream.
pub type UserId = u32;
pub type ItemId = u32;

/// UTC epoch seconds.
pub type Timestamp = i64;

/// Line separating two sessions in a split file.
pub const SESSION_DELIMITER: &str = "-----";

/// A parsed interaction with the original (opaque) identifiers.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Event {
    pub user: String,
    pub item: String,
    pub timestamp: Timestamp,
}

impl Event {
    pub fn new<U: Into<String>, I: Into<String>>(user: U, item: I, timestamp: Timestamp) -> Self {
        Event { user: user.into(), item: item.into(), timestamp }
    }
}

/// An interaction after dense ids have been assigned, as held in the user store.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct StoredEvent {
    pub user: UserId,
    pub item: ItemId,
    pub timestamp: Timestamp,
}

/// A window of a user's events, the unit written to the split files.
pub type Session = Vec<StoredEvent>;

/// Per-user chronological history of (timestamp, raw item) pairs.
pub type Histories = FnvHashMap<String, Vec<(Timestamp, String)>>;

pub fn new_histories(capacity: usize) -> Histories {
    FnvHashMap::with_capacity_and_hasher(capacity, Default::default())
}

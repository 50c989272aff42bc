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

use crate::time;
use crate::types::Event;

/// Decides whether a parsed event takes part in the dataset at all, before any counting.
pub trait EventFilter: Send + Sync {
    fn keep(&self, event: &Event) -> bool;
}

/// Retains every event.
pub struct KeepAll;

impl EventFilter for KeepAll {
    fn keep(&self, _event: &Event) -> bool {
        true
    }
}

/// Retains events which happened during a single calendar year (UTC).
pub struct YearFilter {
    pub year: i32,
}

impl EventFilter for YearFilter {
    fn keep(&self, event: &Event) -> bool {
        time::year_of(event.timestamp) == Some(self.year)
    }
}

/// The filter for a named dataset. The last.fm listening logs are restricted to 2008.
pub fn for_dataset(name: &str) -> Box<dyn EventFilter> {
    if name.contains("lastfm") {
        Box::new(YearFilter { year: 2008 })
    } else {
        Box::new(KeepAll)
    }
}

#[cfg(test)]
mod tests {

    use chrono::{TimeZone, Utc};

    use super::for_dataset;
    use crate::types::Event;

    fn event_in(year: i32) -> Event {
        Event::new("u", "i", Utc.with_ymd_and_hms(year, 6, 1, 12, 0, 0).unwrap().timestamp())
    }

    #[test]
    fn lastfm_keeps_2008_only() {
        let filter = for_dataset("lastfm-");

        assert!(filter.keep(&event_in(2008)));
        assert!(!filter.keep(&event_in(2007)));
        assert!(!filter.keep(&event_in(2009)));
    }

    #[test]
    fn other_datasets_keep_everything() {
        let filter = for_dataset("");

        assert!(filter.keep(&event_in(2007)));
        assert!(filter.keep(&event_in(2009)));
    }
}

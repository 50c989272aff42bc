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

use fnv::{FnvHashMap, FnvHashSet};

use crate::error::Result;
use crate::filters::EventFilter;
use crate::stats::AggregationStats;
use crate::types::{self, Event, Histories};
use crate::vocab::Vocabulary;

/// Frequent interactions grouped per user, plus the vocabularies over the surviving users and
/// items.
pub struct Aggregated {
    pub histories: Histories,
    pub users: Vocabulary<String>,
    pub items: Vocabulary<String>,
    pub stats: AggregationStats,
}

/// Groups the events per user after removing infrequent items.
///
/// This needs two passes over the data (one to count item occurrences, one to filter and group),
/// so all events retained by the `filter` are held in memory. The memory footprint therefore
/// grows with the size of the input, which is fine for offline preprocessing but bounds the size
/// of the datasets we can handle.
///
/// Histories are sorted by timestamp with a stable sort, events with the same timestamp keep the
/// order in which they were encountered.
pub fn aggregate<I>(events: I, filter: &dyn EventFilter, min_occurrences: u64) -> Result<Aggregated>
    where I: IntoIterator<Item=Result<Event>> {

    let mut data: Vec<Event> = Vec::new();
    let mut occurrences: FnvHashMap<String, u64> =
        FnvHashMap::with_capacity_and_hasher(100, Default::default());

    for event in events {
        let event = event?;

        if !filter.keep(&event) {
            continue;
        }

        *occurrences.entry(event.item.clone()).or_insert(0) += 1;
        data.push(event);
    }

    let num_events = data.len() as u64;
    let mut num_frequent_events: u64 = 0;
    let mut histories = types::new_histories(100);

    for Event { user, item, timestamp } in data.into_iter() {

        let count = occurrences.get(&item).cloned().unwrap_or(0);
        if count < min_occurrences {
            continue;
        }

        histories.entry(user).or_insert_with(Vec::new).push((timestamp, item));
        num_frequent_events += 1;
    }

    for history in histories.values_mut() {
        history.sort_by_key(|&(timestamp, _)| timestamp);
    }

    let users = Vocabulary::from_keys(histories.keys().cloned());

    let distinct_items: FnvHashSet<&String> = histories.values()
        .flat_map(|history| history.iter().map(|&(_, ref item)| item))
        .collect();
    let items = Vocabulary::from_keys(distinct_items.into_iter().cloned());

    let stats = AggregationStats {
        num_skipped_lines: 0,
        num_events,
        num_frequent_events,
        num_users: users.len(),
        num_items: items.len(),
    };

    Ok(Aggregated { histories, users, items, stats })
}

#[cfg(test)]
mod tests {

    use super::aggregate;
    use crate::filters::{KeepAll, YearFilter};
    use crate::types::Event;

    fn events(raw: &[(&str, &str, i64)]) -> Vec<crate::error::Result<Event>> {
        raw.iter().map(|&(user, item, timestamp)| Ok(Event::new(user, item, timestamp))).collect()
    }

    #[test]
    fn infrequent_items_are_dropped() {
        let input = events(&[
            ("alice", "apple", 3),
            ("alice", "dog", 1),
            ("bob", "apple", 5),
            ("charles", "dog", 2),
            ("charles", "bike", 4),
        ]);

        let aggregated = aggregate(input, &KeepAll, 2).unwrap();

        assert_eq!(aggregated.stats.num_events, 5);
        assert_eq!(aggregated.stats.num_frequent_events, 4);
        assert_eq!(aggregated.items.len(), 2);
        assert!(!aggregated.items.contains("bike"));
        assert_eq!(aggregated.users.len(), 3);

        assert_eq!(
            aggregated.histories["alice"],
            vec![(1, String::from("dog")), (3, String::from("apple"))]);
        assert_eq!(aggregated.histories["charles"], vec![(2, String::from("dog"))]);
    }

    #[test]
    fn users_without_frequent_items_vanish() {
        let input = events(&[("alice", "apple", 1), ("alice", "apple", 2), ("bob", "bike", 3)]);

        let aggregated = aggregate(input, &KeepAll, 2).unwrap();

        assert_eq!(aggregated.users.len(), 1);
        assert!(!aggregated.histories.contains_key("bob"));
    }

    #[test]
    fn equal_timestamps_keep_encounter_order() {
        let input = events(&[
            ("alice", "pony", 7),
            ("alice", "apple", 7),
            ("alice", "dog", 1),
        ]);

        let aggregated = aggregate(input, &KeepAll, 1).unwrap();

        let order: Vec<&str> = aggregated.histories["alice"].iter()
            .map(|&(_, ref item)| item.as_str())
            .collect();
        assert_eq!(order, vec!["dog", "pony", "apple"]);
    }

    #[test]
    fn filtered_events_are_not_counted() {
        // 2008-06-01 and 2009-06-01
        let input = events(&[
            ("alice", "apple", 1212321600),
            ("alice", "apple", 1243857600),
        ]);

        let aggregated = aggregate(input, &YearFilter { year: 2008 }, 2).unwrap();

        assert_eq!(aggregated.stats.num_events, 1);
        assert_eq!(aggregated.stats.num_frequent_events, 0);
        assert!(aggregated.histories.is_empty());
    }
}

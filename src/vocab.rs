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

use std::borrow::Borrow;
use std::hash::Hash;

use fnv::FnvHashMap;

/// Bijection from original identifiers to consecutive ids `1..=len`. Ids are handed out in
/// ascending key order, so building a vocabulary over keys `1..=n` yields the identity.
pub struct Vocabulary<K: Hash + Eq> {
    ids: FnvHashMap<K, u32>,
}

impl<K: Hash + Eq + Ord> Vocabulary<K> {

    pub fn from_keys<I: IntoIterator<Item=K>>(keys: I) -> Self {

        let mut sorted_keys: Vec<K> = keys.into_iter().collect();
        sorted_keys.sort();
        sorted_keys.dedup();

        let mut ids: FnvHashMap<K, u32> =
            FnvHashMap::with_capacity_and_hasher(sorted_keys.len(), Default::default());

        for (index, key) in sorted_keys.into_iter().enumerate() {
            ids.insert(key, index as u32 + 1);
        }

        Vocabulary { ids }
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    pub fn id<Q: ?Sized>(&self, key: &Q) -> Option<u32>
        where K: Borrow<Q>, Q: Hash + Eq {

        self.ids.get(key).cloned()
    }

    pub fn contains<Q: ?Sized>(&self, key: &Q) -> bool
        where K: Borrow<Q>, Q: Hash + Eq {

        self.ids.contains_key(key)
    }
}

#[cfg(test)]
mod tests {

    use super::Vocabulary;

    #[test]
    fn dense_ids_start_at_one() {
        let vocabulary = Vocabulary::from_keys(
            vec!["pony", "apple", "dog", "apple"].into_iter().map(String::from));

        assert_eq!(vocabulary.len(), 3);
        assert_eq!(vocabulary.id("apple"), Some(1));
        assert_eq!(vocabulary.id("dog"), Some(2));
        assert_eq!(vocabulary.id("pony"), Some(3));
        assert_eq!(vocabulary.id("bike"), None);
        assert!(!vocabulary.contains("bike"));
    }

    #[test]
    fn dense_keys_map_to_themselves() {
        let vocabulary = Vocabulary::from_keys(vec![3_u32, 1, 2]);

        for key in 1..4 {
            assert_eq!(vocabulary.id(&key), Some(key));
        }
    }

    #[test]
    fn gaps_are_closed() {
        let vocabulary = Vocabulary::from_keys(vec![7_u32, 42, 3]);

        assert_eq!(vocabulary.id(&3), Some(1));
        assert_eq!(vocabulary.id(&7), Some(2));
        assert_eq!(vocabulary.id(&42), Some(3));
        assert!(Vocabulary::<u32>::from_keys(Vec::new()).is_empty());
    }
}

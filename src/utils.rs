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

use std::sync::Mutex;
use std::time::Duration;

use scoped_pool::Pool;

pub fn to_millis(duration: Duration) -> u64 {
    (duration.as_secs() * 1_000) + (duration.subsec_nanos() / 1_000_000) as u64
}

/// Applies `job` to every input on the pool and returns the outputs in input order. Returns
/// `None` for an input whose job did not complete.
pub fn map_in_order<T, R, F>(pool: &Pool, inputs: &[T], job: F) -> Vec<Option<R>>
    where T: Sync, R: Send, F: Fn(&T) -> R + Sync {

    let slots: Vec<Mutex<Option<R>>> = inputs.iter().map(|_| Mutex::new(None)).collect();

    pool.scoped(|scope| {
        for (input, slot) in inputs.iter().zip(slots.iter()) {
            let job = &job;
            scope.execute(move || {
                let output = job(input);
                if let Ok(mut slot) = slot.lock() {
                    *slot = Some(output);
                }
            });
        }
    });

    slots.into_iter()
        .map(|slot| slot.into_inner().unwrap_or_else(|poisoned| poisoned.into_inner()))
        .collect()
}

#[cfg(test)]
mod tests {

    use std::time::Duration;

    use scoped_pool::Pool;

    use super::{map_in_order, to_millis};

    #[test]
    fn millis() {
        assert_eq!(to_millis(Duration::new(2, 345_678_901)), 2345);
    }

    #[test]
    fn outputs_keep_input_order() {
        let pool = Pool::new(4);
        let inputs: Vec<u64> = (0..100).collect();

        let outputs = map_in_order(&pool, &inputs, |value| value * value);
        pool.shutdown();

        let expected: Vec<Option<u64>> = inputs.iter().map(|value| Some(value * value)).collect();
        assert_eq!(outputs, expected);
    }
}

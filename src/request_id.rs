/********************************************************************************
 * Copyright (c) 2024 Contributors to the Eclipse Foundation
 *
 * See the NOTICE file(s) distributed with this work for additional
 * information regarding copyright ownership.
 *
 * This program and the accompanying materials are made available under the
 * terms of the Apache License Version 2.0 which is available at
 * https://www.apache.org/licenses/LICENSE-2.0
 *
 * SPDX-License-Identifier: Apache-2.0
 ********************************************************************************/

use std::sync::atomic::{AtomicU64, Ordering};

use rand::Rng;

use crate::ConfigurationError;

/// Hands out identifiers for RPC requests.
///
/// Identifiers are taken from a wrapping sequence `0..bound`. Each call to [`next`](Self::next)
/// returns the current value and advances the counter atomically, so concurrent invocations never
/// observe the same identifier before the sequence wraps around.
#[derive(Debug)]
pub struct RequestIdGenerator {
    counter: AtomicU64,
    bound: u64,
}

impl RequestIdGenerator {
    /// Identifiers stay below 2^53 so that they can be represented exactly by any JSON parser.
    pub const DEFAULT_BOUND: u64 = 1 << 53;

    /// Creates a generator that starts at a random position of the sequence.
    ///
    /// Seeding randomly reduces the chance of identifier collisions between independently
    /// created clients that share the same transport.
    ///
    /// # Errors
    ///
    /// Returns an error if `bound` is zero.
    pub fn new(bound: u64) -> Result<Self, ConfigurationError> {
        if bound == 0 {
            return Err(ConfigurationError::InvalidIdBound);
        }
        let initial = rand::rng().random_range(0..bound);
        Self::starting_at(bound, initial)
    }

    /// Creates a generator that hands out `initial` first.
    ///
    /// # Errors
    ///
    /// Returns an error if `bound` is zero or `initial` is not below `bound`.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use eth_query::RequestIdGenerator;
    ///
    /// let ids = RequestIdGenerator::starting_at(3, 1).unwrap();
    /// assert_eq!(ids.next(), 1);
    /// assert_eq!(ids.next(), 2);
    /// assert_eq!(ids.next(), 0);
    /// ```
    pub fn starting_at(bound: u64, initial: u64) -> Result<Self, ConfigurationError> {
        if bound == 0 {
            return Err(ConfigurationError::InvalidIdBound);
        }
        if initial >= bound {
            return Err(ConfigurationError::InvalidInitialId { initial, bound });
        }
        Ok(RequestIdGenerator {
            counter: AtomicU64::new(initial),
            bound,
        })
    }

    /// Gets the next request identifier.
    #[allow(clippy::should_implement_trait)]
    pub fn next(&self) -> u64 {
        let bound = self.bound;
        // the closure never returns None, so both variants carry the previous value
        match self
            .counter
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |current| {
                Some(current.wrapping_add(1) % bound)
            }) {
            Ok(previous) | Err(previous) => previous,
        }
    }

    /// Gets the identifier that the next call to [`next`](Self::next) will return.
    pub fn current(&self) -> u64 {
        self.counter.load(Ordering::Acquire)
    }

    /// Gets the (exclusive) upper bound of the identifiers handed out by this generator.
    pub fn bound(&self) -> u64 {
        self.bound
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::collections::HashSet;
    use std::sync::Arc;

    use test_case::test_case;

    #[test_case(0, 0; "zero bound")]
    #[test_case(5, 5; "initial equal to bound")]
    #[test_case(5, 17; "initial above bound")]
    fn test_starting_at_rejects_invalid_parameters(bound: u64, initial: u64) {
        assert!(RequestIdGenerator::starting_at(bound, initial).is_err());
    }

    #[test]
    fn test_new_rejects_zero_bound() {
        assert!(RequestIdGenerator::new(0).is_err_and(|e| e == ConfigurationError::InvalidIdBound));
    }

    #[test]
    fn test_random_seed_is_within_bound() {
        for _ in 0..100 {
            let ids = RequestIdGenerator::new(7).unwrap();
            assert!(ids.current() < 7);
        }
    }

    #[test]
    fn test_sequence_covers_range_exactly_once_before_wrapping() {
        const BOUND: u64 = 64;
        let ids = RequestIdGenerator::new(BOUND).unwrap();
        let first = ids.next();
        let mut seen = HashSet::from([first]);
        for _ in 1..BOUND {
            assert!(seen.insert(ids.next()));
        }
        assert_eq!(seen.len() as u64, BOUND);
        assert!(seen.iter().all(|id| *id < BOUND));
        // the (bound + 1)-th allocation repeats the first value
        assert_eq!(ids.next(), first);
    }

    #[test]
    fn test_wraps_around_at_bound() {
        let ids = RequestIdGenerator::starting_at(10, 8).unwrap();
        assert_eq!(ids.next(), 8);
        assert_eq!(ids.next(), 9);
        assert_eq!(ids.next(), 0);
        assert_eq!(ids.current(), 1);
    }

    #[test]
    fn test_default_bound_does_not_overflow() {
        let ids = RequestIdGenerator::starting_at(
            RequestIdGenerator::DEFAULT_BOUND,
            RequestIdGenerator::DEFAULT_BOUND - 1,
        )
        .unwrap();
        assert_eq!(ids.next(), RequestIdGenerator::DEFAULT_BOUND - 1);
        assert_eq!(ids.next(), 0);
    }

    #[test]
    fn test_concurrent_allocations_are_unique() {
        const THREADS: usize = 8;
        const PER_THREAD: usize = 500;
        let ids = Arc::new(RequestIdGenerator::starting_at(1 << 20, 0).unwrap());
        let handles: Vec<_> = (0..THREADS)
            .map(|_| {
                let ids = ids.clone();
                std::thread::spawn(move || (0..PER_THREAD).map(|_| ids.next()).collect::<Vec<_>>())
            })
            .collect();
        let mut all = HashSet::new();
        for handle in handles {
            for id in handle.join().unwrap() {
                assert!(all.insert(id));
            }
        }
        assert_eq!(all.len(), THREADS * PER_THREAD);
    }
}

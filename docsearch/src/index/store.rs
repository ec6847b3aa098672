use dashmap::DashMap;
use rayon::prelude::*;
use std::sync::atomic::{AtomicU64, Ordering};

use crate::tokenizer::Normalizer;

/// Number of addressable counter slots: every non-negative 32-bit signed
/// hash value except `i32::MAX` itself.
pub const SLOT_COUNT: u32 = i32::MAX as u32;

/// 31-multiplier polynomial hash over the UTF-16 code units of `token`,
/// wrapping at 32 bits.
///
/// Stable across runs and platforms, so a given token always lands on the
/// same slot.
pub fn token_hash(token: &str) -> i32 {
    token
        .encode_utf16()
        .fold(0i32, |hash, unit| hash.wrapping_mul(31).wrapping_add(i32::from(unit)))
}

/// Maps a token to its counter slot.
///
/// Not collision-free: distinct tokens with equal slots (`"Aa"` and `"BB"`
/// for instance) share one counter and both read the combined total.
pub fn slot_for(token: &str) -> u32 {
    token_hash(token).unsigned_abs() % SLOT_COUNT
}

/// Sparse slot -> occurrence counter table for one source file.
///
/// Only slots some token hashed to are materialized; every other slot reads 0.
/// Increments go through the map's entry API, which holds the slot's shard
/// lock across the read-modify-write, so concurrent writers never lose counts.
#[derive(Debug, Default)]
pub struct IndexStore {
    counters: DashMap<u32, u64>,
    tokens: AtomicU64,
}

impl IndexStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a store from `content`, one parallel task per line.
    ///
    /// Runs on the current rayon pool and returns only after every line has
    /// been counted.
    pub fn build(content: &str, normalizer: Normalizer) -> Self {
        let store = Self::new();
        content.par_lines().for_each(|line| {
            normalizer.for_each_token(line, |token| store.record_token(token));
        });
        store
    }

    /// Counts one occurrence of `token`.
    pub fn record_token(&self, token: &str) {
        self.increment(slot_for(token));
        self.tokens.fetch_add(1, Ordering::Relaxed);
    }

    /// Adds one to the counter at `slot`.
    pub fn increment(&self, slot: u32) {
        *self.counters.entry(slot).or_insert(0) += 1;
    }

    /// Counter at `slot`, 0 when never written.
    pub fn get(&self, slot: u32) -> u64 {
        self.counters.get(&slot).map_or(0, |count| *count)
    }

    /// Counter for `token`'s slot.
    pub fn count(&self, token: &str) -> u64 {
        self.get(slot_for(token))
    }

    /// Number of materialized slots.
    pub fn len(&self) -> usize {
        self.counters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.counters.is_empty()
    }

    /// Total tokens recorded.
    pub fn tokens(&self) -> u64 {
        self.tokens.load(Ordering::Relaxed)
    }

    /// Materialized `(slot, counter)` pairs ordered by slot.
    pub fn sorted_entries(&self) -> Vec<(u32, u64)> {
        let mut entries: Vec<(u32, u64)> = self
            .counters
            .iter()
            .map(|entry| (*entry.key(), *entry.value()))
            .collect();
        entries.sort_unstable_by_key(|&(slot, _)| slot);
        entries
    }
}

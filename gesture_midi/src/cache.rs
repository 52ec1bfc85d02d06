//! Debounce cache for control changes.
//!
//! Remembers the last value *delivered* per (channel, control).  The emitter
//! records a value only after the sink accepted it, so the cache never holds
//! a value that was not sent.

use std::collections::HashMap;

/// One continuous-controller stream.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ControlKey {
    pub channel: u8,
    pub control: u8,
}

impl ControlKey {
    pub fn new(channel: u8, control: u8) -> Self {
        ControlKey { channel, control }
    }
}

#[derive(Clone, Debug, Default)]
pub struct DebounceCache {
    last: HashMap<ControlKey, u8>,
}

impl DebounceCache {
    pub fn new() -> Self {
        DebounceCache::default()
    }

    /// Would sending `value` on `key` change anything?
    pub fn is_fresh(&self, key: ControlKey, value: u8) -> bool {
        self.last.get(&key) != Some(&value)
    }

    pub fn record(&mut self, key: ControlKey, value: u8) {
        self.last.insert(key, value);
    }

    pub fn get(&self, key: ControlKey) -> Option<u8> {
        self.last.get(&key).copied()
    }

    /// Drop the entry so the next value is always sent.
    pub fn forget(&mut self, key: ControlKey) -> Option<u8> {
        self.last.remove(&key)
    }

    pub fn len(&self) -> usize { self.last.len() }
    pub fn is_empty(&self) -> bool { self.last.is_empty() }
}

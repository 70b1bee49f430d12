use crate::constants::DEFAULT_REPEATING_KEYS_DELAY;
use std::collections::HashMap;

/// Sets the rhythm for keys held down across many frames.
///
/// A key is let through at most once per `delay` seconds. Timestamps are
/// supplied by the caller, so replayed recordings throttle deterministically.
#[derive(Debug, Clone)]
pub struct RepeatingKeysThrottler {
    delay: f64,
    last_press: HashMap<String, f64>,
}

impl Default for RepeatingKeysThrottler {
    fn default() -> Self {
        Self::new(DEFAULT_REPEATING_KEYS_DELAY)
    }
}

impl RepeatingKeysThrottler {
    /// Create a throttler with the given delay in seconds
    #[must_use]
    pub fn new(delay: f64) -> Self {
        Self {
            delay,
            last_press: HashMap::new(),
        }
    }

    /// Whether `key` may be pressed at time `now` (seconds).
    ///
    /// Records `now` as the key's last press when allowed.
    pub fn key_press_allowed(&mut self, key: &str, now: f64) -> bool {
        if let Some(&last) = self.last_press.get(key) {
            if now - last < self.delay {
                return false;
            }
        }
        self.last_press.insert(key.to_string(), now);
        true
    }

    /// Minimum delay between presses of the same key, in seconds
    #[must_use]
    pub const fn delay(&self) -> f64 {
        self.delay
    }

    /// Forget all recorded presses
    pub fn reset(&mut self) {
        self.last_press.clear();
    }
}

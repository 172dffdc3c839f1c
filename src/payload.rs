use rand::Rng;
use rand::seq::SliceRandom;
use serde::{Deserialize, Serialize};
use std::time::{SystemTime, UNIX_EPOCH};

/// Upper- and lower-case English letters used for generated payload text.
const ALPHABET: &[u8] = b"abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ";

/// Discriminator stamped into every published record.
pub const DATA_TAG: i64 = 2;

/// Generate a string of exactly `len` characters drawn uniformly from the
/// 52-letter alphabet.
pub fn random_string(rng: &mut impl Rng, len: usize) -> String {
    (0..len)
        .map(|_| ALPHABET[rng.gen_range(0..ALPHABET.len())] as char)
        .collect()
}

/// Generate `count` independent random words of `length` characters each.
/// Called once at startup; the result is shared read-only by all workers.
pub fn build_word_list(rng: &mut impl Rng, count: usize, length: usize) -> Vec<String> {
    (0..count).map(|_| random_string(rng, length)).collect()
}

/// Per-message data producer over an immutable word list.
///
/// With a single word, every call returns that word unchanged and consumes no
/// entropy. With more, each call returns a fresh uniformly-random permutation
/// of the words joined by single spaces.
#[derive(Debug)]
pub struct DataSource {
    words: Vec<String>,
}

impl DataSource {
    pub fn new(words: Vec<String>) -> Self {
        debug_assert!(!words.is_empty(), "word list must hold at least one word");
        Self { words }
    }

    pub fn data(&self, rng: &mut impl Rng) -> String {
        if self.words.len() == 1 {
            return self.words[0].clone();
        }
        let mut shuffled: Vec<&str> = self.words.iter().map(String::as_str).collect();
        shuffled.shuffle(rng);
        shuffled.join(" ")
    }

    pub fn word_count(&self) -> usize {
        self.words.len()
    }
}

/// The published message body.
///
/// The timestamp reflects generation time, not send time: it is captured when
/// the record is constructed, before any queueing delay.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimestampedRecord {
    pub timestamp: i64,
    pub data: i64,
    pub data_string: String,
}

impl TimestampedRecord {
    pub fn new(data_string: String) -> Self {
        Self::with_timestamp(unix_millis_now(), data_string)
    }

    pub fn with_timestamp(timestamp: i64, data_string: String) -> Self {
        Self {
            timestamp,
            data: DATA_TAG,
            data_string,
        }
    }

    /// Serialize to the compact JSON wire form.
    pub fn encode(&self) -> serde_json::Result<Vec<u8>> {
        serde_json::to_vec(self)
    }
}

/// Current wall-clock time as milliseconds since the UNIX epoch.
pub fn unix_millis_now() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as i64)
        .unwrap_or(0)
}

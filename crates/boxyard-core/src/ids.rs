//! Sources of short identifiers for generated names and staging directories.

use rand::Rng;

const ALPHABET: &[u8] = b"abcdefghijklmnopqrstuvwxyz0123456789";

/// Yields short lowercase identifiers. Passed explicitly into the reconciler
/// and stager so tests can make every generated name predictable.
pub trait IdSource {
    fn next_id(&mut self, len: usize) -> String;
}

/// Random `[a-z0-9]` identifiers from the thread-local RNG.
#[derive(Debug, Default, Clone, Copy)]
pub struct RandomIds;

impl IdSource for RandomIds {
    fn next_id(&mut self, len: usize) -> String {
        let mut rng = rand::rng();
        (0..len)
            .map(|_| char::from(ALPHABET[rng.random_range(0..ALPHABET.len())]))
            .collect()
    }
}

/// Zero-padded counter: `00000001`, `00000002`, ...
#[derive(Debug, Default, Clone)]
pub struct SequenceIds {
    counter: u64,
}

impl SequenceIds {
    pub fn new() -> Self {
        Self::default()
    }
}

impl IdSource for SequenceIds {
    fn next_id(&mut self, len: usize) -> String {
        self.counter += 1;
        format!("{:0>len$}", self.counter)
    }
}

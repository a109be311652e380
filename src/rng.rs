//! Random sources for question sampling.
//!
//! The generator never touches a global RNG. Callers pass a `RandomSource`
//! explicitly: a seeded `StdRng` for reproducible batches, the thread RNG
//! otherwise, or a `ScriptedRandom` in tests.

use rand::rngs::StdRng;
use rand::SeedableRng;

/// A source of uniform floats in `[0, 1)`.
pub trait RandomSource {
    fn next_float(&mut self) -> f64;

    /// Uniform index into a collection of `len` items. `len` must be non-zero.
    fn pick_index(&mut self, len: usize) -> usize {
        debug_assert!(len > 0, "pick_index called with an empty range");
        let index = (self.next_float() * len as f64) as usize;
        // Guard against a source that returns exactly 1.0.
        index.min(len - 1)
    }
}

impl<R: rand::Rng + ?Sized> RandomSource for R {
    fn next_float(&mut self) -> f64 {
        self.random::<f64>()
    }
}

/// Build the random source for a generation request.
pub fn source_for_seed(seed: Option<u64>) -> Box<dyn RandomSource + Send> {
    match seed {
        Some(seed) => Box::new(StdRng::seed_from_u64(seed)),
        None => Box::new(StdRng::from_rng(&mut rand::rng())),
    }
}

/// Replays a fixed list of values. Used to drive the generator down exact
/// paths in tests.
#[derive(Debug, Clone)]
pub struct ScriptedRandom {
    outcomes: Vec<f64>,
    index: usize,
}

impl ScriptedRandom {
    pub fn new_for_test(outcomes: Vec<f64>) -> Self {
        Self { outcomes, index: 0 }
    }

    pub fn consumed(&self) -> usize {
        self.index
    }
}

impl RandomSource for ScriptedRandom {
    fn next_float(&mut self) -> f64 {
        if self.index >= self.outcomes.len() {
            panic!(
                "ScriptedRandom exhausted after {} values. Need more random values.",
                self.outcomes.len()
            );
        }
        let outcome = self.outcomes[self.index];
        self.index += 1;
        outcome
    }
}

//! Uniform random sources for the draw engine.

use rand::rngs::ThreadRng;
use rand::{Rng, SeedableRng};
use rand_xoshiro::Xoshiro256PlusPlus;

/// Source of uniform values in `[0, 1)`
pub trait UniformSource {
    fn next_uniform(&mut self) -> f64;
}

impl<T: UniformSource + ?Sized> UniformSource for &mut T {
    fn next_uniform(&mut self) -> f64 {
        (**self).next_uniform()
    }
}

impl<T: UniformSource + ?Sized> UniformSource for Box<T> {
    fn next_uniform(&mut self) -> f64 {
        (**self).next_uniform()
    }
}

/// Deterministic source (same seed → same draws)
#[derive(Debug, Clone)]
pub struct SeededSource {
    rng: Xoshiro256PlusPlus,
}

impl SeededSource {
    pub fn new(seed: u64) -> Self {
        Self {
            rng: Xoshiro256PlusPlus::seed_from_u64(seed),
        }
    }
}

impl UniformSource for SeededSource {
    fn next_uniform(&mut self) -> f64 {
        self.rng.gen::<f64>()
    }
}

/// Thread-local entropy, for live sessions
#[derive(Debug, Clone, Default)]
pub struct EntropySource {
    rng: ThreadRng,
}

impl EntropySource {
    pub fn new() -> Self {
        Self::default()
    }
}

impl UniformSource for EntropySource {
    fn next_uniform(&mut self) -> f64 {
        self.rng.gen::<f64>()
    }
}

/// Replays a fixed list of values, cycling when exhausted.
///
/// Values are clamped into `[0, 1)` so boundary tests can feed exact rolls.
#[derive(Debug, Clone)]
pub struct SequenceSource {
    values: Vec<f64>,
    cursor: usize,
}

impl SequenceSource {
    pub fn new(values: Vec<f64>) -> Self {
        Self { values, cursor: 0 }
    }

    /// Values consumed so far
    pub fn consumed(&self) -> usize {
        self.cursor
    }
}

impl UniformSource for SequenceSource {
    fn next_uniform(&mut self) -> f64 {
        if self.values.is_empty() {
            return 0.0;
        }
        let value = self.values[self.cursor % self.values.len()];
        self.cursor += 1;
        if value.is_nan() {
            return 0.0;
        }
        value.clamp(0.0, 1.0 - f64::EPSILON)
    }
}

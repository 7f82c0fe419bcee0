use crate::error::Error;
use crate::Generator;
use parking_lot::Mutex;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use wormhole_core::ShortCode;

/// Characters a generated code is drawn from.
pub const ALPHABET: &[u8; 62] =
    b"abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";

pub const DEFAULT_CODE_LENGTH: usize = 7;

/// Random fixed-length alphanumeric code generator.
///
/// Each character is drawn independently and uniformly from [`ALPHABET`].
/// The RNG is seeded once when the generator is built and reused for every
/// call; it is owned by the generator and only reachable through
/// [`Generator::generate`].
#[derive(Debug)]
pub struct RandomGenerator {
    length: usize,
    rng: Mutex<StdRng>,
}

impl RandomGenerator {
    /// Creates a generator producing codes of `length` characters.
    ///
    /// # Panics
    ///
    /// Panics if `length` is zero.
    pub fn new(length: usize) -> Self {
        Self::try_new(length).expect("short code length must be at least 1")
    }

    /// Creates a generator producing codes of `length` characters.
    pub fn try_new(length: usize) -> Result<Self, Error> {
        Self::with_rng(length, StdRng::from_rng(&mut rand::rng()))
    }

    /// Creates a generator with a fixed seed, for reproducible sequences.
    pub fn with_seed(length: usize, seed: u64) -> Result<Self, Error> {
        Self::with_rng(length, StdRng::seed_from_u64(seed))
    }

    fn with_rng(length: usize, rng: StdRng) -> Result<Self, Error> {
        if length == 0 {
            return Err(Error::ZeroLength);
        }

        Ok(Self {
            length,
            rng: Mutex::new(rng),
        })
    }

    pub fn length(&self) -> usize {
        self.length
    }
}

impl Default for RandomGenerator {
    fn default() -> Self {
        Self::new(DEFAULT_CODE_LENGTH)
    }
}

impl Generator for RandomGenerator {
    type Output = ShortCode;

    fn generate(&self) -> Self::Output {
        let mut rng = self.rng.lock();
        let code: String = (0..self.length)
            .map(|_| ALPHABET[rng.random_range(0..ALPHABET.len())] as char)
            .collect();
        ShortCode::new_unchecked(code)
    }
}

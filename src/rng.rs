use rand_core::{Error, RngCore};
use std::time::{SystemTime, UNIX_EPOCH};

// --- Pseudo-Random Number Generator ---
// Algorithm: xoshiro256** (StarStar)
// Reference: https://prng.di.unimi.it/
// Implements RngCore so the `rand` adapters (gen_range, SliceRandom, index::sample) work on it.

#[derive(Clone, Debug)]
pub struct Rng {
    state: [u64; 4],
}

impl Rng {
    /// Deterministic generator for reproducible generation and recombination runs.
    pub fn from_seed(mut seed: u64) -> Self {
        // SplitMix64 expands one 64-bit seed into the four xoshiro words.
        let sm64 = |s: &mut u64| -> u64 {
            *s = s.wrapping_add(0x9e3779b97f4a7c15);
            let mut z = *s;
            z = (z ^ (z >> 30)).wrapping_mul(0xbf58476d1ce4e5b9);
            z = (z ^ (z >> 27)).wrapping_mul(0x94d049bb133111eb);
            z ^ (z >> 31)
        };

        Rng {
            state: [
                sm64(&mut seed),
                sm64(&mut seed),
                sm64(&mut seed),
                sm64(&mut seed),
            ],
        }
    }

    pub fn new() -> Self {
        let nanos = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_nanos() as u64)
            .unwrap_or(0x5eed);

        // Heap address mixes ASLR entropy into the clock seed.
        let heap_var = Box::new(0u8);
        let ptr_val = &*heap_var as *const u8 as u64;

        Self::from_seed(nanos ^ ptr_val.rotate_left(32))
    }

    #[inline]
    pub fn next_u64(&mut self) -> u64 {
        let result = self.state[1].wrapping_mul(5).rotate_left(7).wrapping_mul(9);

        let t = self.state[1] << 17;

        self.state[2] ^= self.state[0];
        self.state[3] ^= self.state[1];
        self.state[1] ^= self.state[2];
        self.state[0] ^= self.state[3];

        self.state[2] ^= t;

        self.state[3] = self.state[3].rotate_left(45);

        result
    }

    // Float in [0.0, 1.0): (u64 >> 11) * 2^-53
    #[inline]
    pub fn next_f64(&mut self) -> f64 {
        let v = self.next_u64() >> 11;
        (v as f64) * (1.0 / 9007199254740992.0)
    }

    // Unbiased [0, range) by rejection sampling (no modulo bias).
    pub fn next_u64_bounded(&mut self, range: u64) -> u64 {
        debug_assert!(range > 0);
        let threshold = (0u64.wrapping_sub(range)) % range;
        loop {
            let x = self.next_u64();
            if x >= threshold {
                return x % range;
            }
        }
    }

    /// Uniform ball in `[low, high]`. `None` when the range is empty.
    pub fn ball_in(&mut self, low: u32, high: u32) -> Option<u32> {
        if low > high {
            return None;
        }
        let span = (high - low) as u64 + 1;
        Some(low + self.next_u64_bounded(span) as u32)
    }

    /// Bernoulli trial with probability `p`.
    #[inline]
    pub fn chance(&mut self, p: f64) -> bool {
        self.next_f64() < p
    }
}

impl Default for Rng {
    fn default() -> Self {
        Self::new()
    }
}

impl RngCore for Rng {
    fn next_u32(&mut self) -> u32 {
        (self.next_u64() >> 32) as u32
    }

    fn next_u64(&mut self) -> u64 {
        Rng::next_u64(self)
    }

    fn fill_bytes(&mut self, dest: &mut [u8]) {
        let mut i = 0;
        while i < dest.len() {
            let bytes = Rng::next_u64(self).to_le_bytes();
            let n = std::cmp::min(dest.len() - i, 8);
            dest[i..i + n].copy_from_slice(&bytes[..n]);
            i += n;
        }
    }

    fn try_fill_bytes(&mut self, dest: &mut [u8]) -> Result<(), Error> {
        self.fill_bytes(dest);
        Ok(())
    }
}

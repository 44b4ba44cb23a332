//! Injectable pseudo-random source for the randomized patterns and the spray
//! brush. Implements <https://en.wikipedia.org/wiki/Xorshift>.

use std::time::{SystemTime, UNIX_EPOCH};

pub trait RandomSource {
    fn next_u64(&mut self) -> u64;

    /// Uniform in [0, 1).
    fn next_f64(&mut self) -> f64 {
        // 53 high bits fill the mantissa exactly.
        (self.next_u64() >> 11) as f64 / (1u64 << 53) as f64
    }

    /// Uniform in [lo, hi).
    fn range(&mut self, lo: f64, hi: f64) -> f64 {
        lo + (hi - lo) * self.next_f64()
    }
}

#[derive(Clone, Debug)]
pub struct XorShift {
    state: u64,
}

impl XorShift {
    const FALLBACK_STATE: u64 = 0xcafebabedeadbeef;

    /// Deterministic stream. A zero seed would lock the generator at zero, so
    /// it is replaced with a fixed non-zero state.
    pub fn seeded(seed: u64) -> Self {
        Self {
            state: if seed == 0 { Self::FALLBACK_STATE } else { seed },
        }
    }

    /// Seed from the wall clock; two renders of the same scene differ.
    pub fn from_clock() -> Self {
        let nanos = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_nanos() as u64)
            .unwrap_or(Self::FALLBACK_STATE);
        Self::seeded(nanos ^ Self::FALLBACK_STATE)
    }

    /// Stable seed derived from a string (FNV-1a), used for per-node streams.
    pub fn from_key(key: &str) -> Self {
        let mut hash: u64 = 0xcbf29ce484222325;
        for byte in key.bytes() {
            hash ^= byte as u64;
            hash = hash.wrapping_mul(0x100000001b3);
        }
        Self::seeded(hash)
    }
}

impl Default for XorShift {
    fn default() -> Self {
        Self::seeded(Self::FALLBACK_STATE)
    }
}

impl RandomSource for XorShift {
    fn next_u64(&mut self) -> u64 {
        self.state ^= self.state << 13;
        self.state ^= self.state >> 7;
        self.state ^= self.state << 17;
        self.state
    }
}

//! Deterministic per-stage randomness.
//!
//! Each stage derives its own stream by XOR-ing the master seed with a fixed
//! golden-ratio constant, so changing what one stage consumes never shifts
//! the draws seen by another. ChaCha8 gives identical streams on every
//! platform and word size.

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

/// Stage salts. XOR-ed with the master seed.
pub const MESH_SALT: u64 = 0x9E37_79B9;
pub const ELEVATION_SALT: u64 = 0xA54F_F53A;
pub const CLIMATE_SALT: u64 = 0x63D8_3595;
pub const RIVER_SALT: u64 = 0x7B9D_14E1;

/// Scalar RNG owned by a single stage. All draws happen on the driver
/// thread in a documented order; parallel regions never touch it.
pub struct StageRng {
    inner: ChaCha8Rng,
}

impl StageRng {
    pub fn new(master_seed: u64, salt: u64) -> Self {
        Self { inner: ChaCha8Rng::seed_from_u64(master_seed ^ salt) }
    }

    /// Uniform draw in `[lo, hi)`.
    pub fn uniform(&mut self, lo: f64, hi: f64) -> f64 {
        lo + self.inner.gen::<f64>() * (hi - lo)
    }

    /// Bernoulli draw; always consumes exactly one value.
    pub fn chance(&mut self, p: f64) -> bool {
        self.inner.gen::<f64>() < p
    }

    /// Uniform index in `[0, n)`. `n` must be positive.
    pub fn pick_index(&mut self, n: usize) -> usize {
        self.inner.gen_range(0..n)
    }
}

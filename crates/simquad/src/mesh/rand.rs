//! Reproducible random simplices (rejection sampling + replay tokens).
//!
//! Purpose
//! - Provide a small, deterministic sampler for non-degenerate simplices
//!   used by property tests and benches. Every draw is indexable through a
//!   replay token, so failing cases can be replayed exactly.

use nalgebra::DMatrix;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use super::Simplex;

/// Sampler configuration.
#[derive(Clone, Copy, Debug)]
pub struct SimplexCfg {
    pub dim: usize,
    /// Vertices are drawn uniformly from `[-scale, scale]^d`.
    pub scale: f64,
    /// Draws below this volume are rejected and redrawn.
    pub min_volume: f64,
    /// Bound on redraws before giving up.
    pub max_attempts: u32,
}

impl SimplexCfg {
    pub fn new(dim: usize) -> Self {
        Self {
            dim,
            scale: 1.0,
            min_volume: 1e-6,
            max_attempts: 64,
        }
    }
}

/// Replay token to make draws reproducible and indexable.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ReplayToken {
    pub seed: u64,
    pub index: u64,
}

impl ReplayToken {
    #[inline]
    fn to_std_rng(self) -> StdRng {
        // SplitMix64-style mixing, cheap and stable.
        fn mix(mut x: u64) -> u64 {
            x ^= x >> 30;
            x = x.wrapping_mul(0xbf58476d1ce4e5b9);
            x ^= x >> 27;
            x = x.wrapping_mul(0x94d049bb133111eb);
            x ^ (x >> 31)
        }
        let k = mix(self.seed ^ mix(self.index.wrapping_add(0x9e3779b97f4a7c15)));
        StdRng::seed_from_u64(k)
    }
}

/// Draw a random non-degenerate simplex; `None` once attempts are exhausted.
pub fn draw_simplex(cfg: SimplexCfg, tok: ReplayToken) -> Option<Simplex> {
    if cfg.dim == 0 || !(cfg.scale > 0.0) {
        return None;
    }
    let mut rng = tok.to_std_rng();
    for _ in 0..cfg.max_attempts.max(1) {
        let verts =
            DMatrix::from_fn(cfg.dim, cfg.dim + 1, |_, _| rng.gen_range(-cfg.scale..cfg.scale));
        let s = Simplex::new(verts).ok()?;
        if s.volume() >= cfg.min_volume {
            return Some(s);
        }
    }
    None
}

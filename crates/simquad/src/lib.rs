//! Adaptive cubature over simplicial meshes.
//!
//! The engine integrates a vector-valued function over a union of
//! d-simplices to a caller-specified accuracy under a hard evaluation
//! budget. Fully symmetric rules with embedded null rules ([`rules`])
//! provide per-region values and error estimates; a curvature-driven
//! splitter refines the region with the worst error until tolerance or
//! budget stops the loop ([`adaptive`]).
//!
//! The reference behavior is single-threaded and deterministic: identical
//! inputs reproduce bit-identical results.

pub mod adaptive;
pub mod error;
pub mod integrand;
pub mod mesh;
pub mod rules;

mod eval;
mod region;
mod split;
mod util;

/// Library version string.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

pub use adaptive::{integrate, IntegralResult, IntegrateCfg, Termination};
pub use error::CubatureError;

/// Common exports for quick imports in callers.
pub mod prelude {
    pub use crate::adaptive::{integrate, IntegralResult, IntegrateCfg, Termination};
    pub use crate::error::CubatureError;
    pub use crate::integrand::{scalar, vector, Integrand};
    pub use crate::mesh::{Simplex, SimplexMesh};
    pub use crate::rules::RuleTable;
    pub use nalgebra::{DMatrix, DVector};
}

//! Closed-form fully symmetric cubature rules with embedded null rules.
//!
//! Construction
//! - The value rule of order r integrates polynomials of degree 2r+1 exactly
//!   over any simplex. Its nodes are the barycentric points
//!   `(2β+1)/(2r+1+d-2i)` over all multisets β of size r-i in d+1 slots,
//!   grouped by level i into permutation orbits, one generator column per
//!   orbit. Per-node weights follow a closed form in (d, r, i).
//! - The family is embedded: the order-(r-1) member occupies exactly the
//!   level 1..r nodes. Subtracting the value rule from each lower-order
//!   member yields null rules of degrees 2r-1, 2r-3, ..., 1 on the same
//!   nodes, used only for error estimation.
//! - Null columns are orthogonalized against each other under the
//!   orbit-size weighted inner product and rescaled to the value column's
//!   norm. Omitting this step biases the error estimate.
//! - Order 1 carries a companion degree-1 seed (uniform weights on the
//!   non-centroid orbit) so at least two null rules exist at every order.

use nalgebra::DMatrix;

use super::symsum::orbit_size;
use crate::error::CubatureError;
use crate::util::{binomial, factorial};

/// Shared generator/weight/orbit tables for one (dimension, order) pair.
#[derive(Clone, Debug)]
pub struct RuleTable {
    dim: usize,
    order: usize,
    /// `(d+1) × W`; column j is the descending representative of orbit j.
    generators: DMatrix<f64>,
    /// `W × R`; column 0 is the value rule, the rest are null rules.
    weights: DMatrix<f64>,
    orbit_sizes: Vec<usize>,
    nodes: usize,
}

impl RuleTable {
    /// Build the tables for dimension `dim ≥ 1` and rule order `order ∈ 1..=4`.
    pub fn new(dim: usize, order: usize) -> Result<Self, CubatureError> {
        if dim == 0 {
            return Err(CubatureError::invalid("dimension must be at least 1"));
        }
        if !(1..=4).contains(&order) {
            return Err(CubatureError::invalid(format!(
                "rule order {order} outside the supported range 1..=4"
            )));
        }

        let np = dim + 1;
        let mut columns: Vec<Vec<f64>> = Vec::new();
        let mut levels: Vec<usize> = Vec::new();
        let mut orbit_sizes: Vec<usize> = Vec::new();
        for level in 0..=order {
            let denom = (2 * order + 1 + dim - 2 * level) as f64;
            for part in partitions(order - level, np) {
                let mut col = vec![1.0 / denom; np];
                for (slot, &p) in part.iter().enumerate() {
                    col[slot] = (2 * p + 1) as f64 / denom;
                }
                orbit_sizes.push(orbit_size(&col));
                columns.push(col);
                levels.push(level);
            }
        }

        let w_count = columns.len();
        let num_rules = if order == 1 { 3 } else { order + 1 };
        let mut generators = DMatrix::zeros(np, w_count);
        for (j, col) in columns.iter().enumerate() {
            for (row, &v) in col.iter().enumerate() {
                generators[(row, j)] = v;
            }
        }

        // Seed columns: the value rule plus one embedded member per degree.
        let mut weights = DMatrix::zeros(w_count, num_rules);
        for (j, &level) in levels.iter().enumerate() {
            weights[(j, 0)] = member_weight(dim, order, level);
            for k in 1..=order {
                if level >= k {
                    weights[(j, k)] = member_weight(dim, order - k, level - k);
                }
            }
        }
        if order == 1 {
            // Companion degree-1 seed: uniform weights on the level-0 orbit.
            weights[(0, 2)] = 1.0 / orbit_sizes[0] as f64;
        }

        // Lower-order member minus value rule = null rule of that degree.
        for col in 1..num_rules {
            for j in 0..w_count {
                let base = weights[(j, 0)];
                weights[(j, col)] -= base;
            }
        }

        // Orthogonalize the null columns against each other and rescale them
        // to the value column's norm, all under the orbit-size weighted
        // inner product.
        let ip = |w: &DMatrix<f64>, a: usize, b: usize| -> f64 {
            (0..w_count)
                .map(|j| orbit_sizes[j] as f64 * w[(j, a)] * w[(j, b)])
                .sum()
        };
        let base_norm = ip(&weights, 0, 0);
        for col in 1..num_rules {
            for prev in 1..col {
                let denom = ip(&weights, prev, prev);
                if denom > 0.0 {
                    let c = ip(&weights, col, prev) / denom;
                    for j in 0..w_count {
                        let adj = c * weights[(j, prev)];
                        weights[(j, col)] -= adj;
                    }
                }
            }
            let nrm = ip(&weights, col, col);
            if nrm > 0.0 {
                let scale = (base_norm / nrm).sqrt();
                for j in 0..w_count {
                    weights[(j, col)] *= scale;
                }
            }
        }

        let nodes: usize = orbit_sizes.iter().sum();
        debug_assert_eq!(nodes, binomial(dim + 1 + order, order));

        Ok(Self {
            dim,
            order,
            generators,
            weights,
            orbit_sizes,
            nodes,
        })
    }

    #[inline]
    pub fn dim(&self) -> usize {
        self.dim
    }

    #[inline]
    pub fn order(&self) -> usize {
        self.order
    }

    /// Polynomial degree the value rule integrates exactly.
    #[inline]
    pub fn degree(&self) -> usize {
        2 * self.order + 1
    }

    /// Number of generator orbits (W).
    #[inline]
    pub fn num_generators(&self) -> usize {
        self.orbit_sizes.len()
    }

    /// Number of weight columns (R): the value rule plus the null rules.
    #[inline]
    pub fn num_rules(&self) -> usize {
        self.weights.ncols()
    }

    /// Integrand evaluations consumed by one region evaluation.
    #[inline]
    pub fn nodes(&self) -> usize {
        self.nodes
    }

    #[inline]
    pub(crate) fn orbit(&self, j: usize) -> usize {
        self.orbit_sizes[j]
    }

    #[inline]
    pub(crate) fn weight(&self, j: usize, col: usize) -> f64 {
        self.weights[(j, col)]
    }

    /// Copy generator column j into `out` (`out.len() == d+1`).
    pub(crate) fn fill_generator(&self, j: usize, out: &mut [f64]) {
        for (row, slot) in out.iter_mut().enumerate() {
            *slot = self.generators[(row, j)];
        }
    }

    #[cfg(test)]
    pub(crate) fn orbit_sizes(&self) -> &[usize] {
        &self.orbit_sizes
    }
}

/// Per-node weight of the embedded member of index `s` at its level `i`,
/// normalized so the member integrates constants to 1.
fn member_weight(d: usize, s: usize, level: usize) -> f64 {
    let deg = 2 * s + 1;
    let base = (deg + d - 2 * level) as f64;
    let sign = if level % 2 == 0 { 1.0 } else { -1.0 };
    sign * factorial(d) * base.powi(deg as i32)
        / (4f64.powi(s as i32) * factorial(level) * factorial(deg + d - level))
}

/// Descending partitions of `total` into at most `max_len` parts.
fn partitions(total: usize, max_len: usize) -> Vec<Vec<usize>> {
    fn recur(rem: usize, max_part: usize, slots: usize, cur: &mut Vec<usize>, out: &mut Vec<Vec<usize>>) {
        if rem == 0 {
            out.push(cur.clone());
            return;
        }
        if slots == 0 {
            return;
        }
        for p in (1..=max_part.min(rem)).rev() {
            cur.push(p);
            recur(rem - p, p, slots - 1, cur, out);
            cur.pop();
        }
    }
    let mut out = Vec::new();
    recur(total, total.max(1), max_len, &mut Vec::new(), &mut out);
    out
}

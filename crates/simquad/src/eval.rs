//! Per-region rule application and error estimation.
//!
//! One call costs exactly `RuleTable::nodes()` integrand evaluations: every
//! distinct permutation of every generator is visited once, mapped to
//! Cartesian coordinates through the region's vertex matrix, and accumulated
//! into an (m × R) rule matrix. Column 0 is the value; the null columns feed
//! the ratio test below.

use nalgebra::{DMatrix, DVector};

use crate::error::CubatureError;
use crate::integrand::{eval_checked, Integrand};
use crate::rules::{next_permutation, RuleTable};

/// Safety factor applied to the raw null-rule estimate.
const ERR_SAFETY: f64 = 8.0;
/// Error floor and negligibility threshold, relative to the value magnitude.
const ERR_FLOOR: f64 = 100.0 * f64::EPSILON;
/// Smallest ratio the extrapolation is allowed to assume.
const RATIO_MIN: f64 = 0.1;

/// Value and error estimate for one region.
#[derive(Clone, Debug)]
pub(crate) struct RegionEval {
    pub value: DVector<f64>,
    pub error: DVector<f64>,
}

/// Evaluate the shared rule over one region.
pub(crate) fn apply_rule<F: Integrand + ?Sized>(
    f: &mut F,
    table: &RuleTable,
    verts: &DMatrix<f64>,
    volume: f64,
) -> Result<RegionEval, CubatureError> {
    let d = table.dim();
    let m = f.components();
    let rls = table.num_rules();

    let mut rule = DMatrix::zeros(m, rls);
    let mut bary = vec![0.0; d + 1];
    let mut x = vec![0.0; d];
    let mut fx = vec![0.0; m];
    let mut symsum = vec![0.0; m];

    for j in 0..table.num_generators() {
        if table.orbit(j) == 0 {
            continue;
        }
        table.fill_generator(j, &mut bary);
        // Ascending start so next_permutation walks the whole orbit.
        bary.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
        symsum.fill(0.0);
        loop {
            map_point(verts, &bary, &mut x);
            eval_checked(f, &x, &mut fx)?;
            for (acc, &v) in symsum.iter_mut().zip(fx.iter()) {
                *acc += v;
            }
            if !next_permutation(&mut bary) {
                break;
            }
        }
        for col in 0..rls {
            let w = volume * table.weight(j, col);
            for l in 0..m {
                rule[(l, col)] += w * symsum[l];
            }
        }
    }

    let mut value = DVector::zeros(m);
    let mut error = DVector::zeros(m);
    let mut row = vec![0.0; rls];
    for l in 0..m {
        for (col, slot) in row.iter_mut().enumerate() {
            *slot = rule[(l, col)];
        }
        value[l] = row[0];
        error[l] = estimate_error(table.order(), &row);
    }
    Ok(RegionEval { value, error })
}

/// Cartesian point from barycentric coordinates: `x = V · b`.
fn map_point(verts: &DMatrix<f64>, bary: &[f64], x: &mut [f64]) {
    for row in 0..verts.nrows() {
        let mut acc = 0.0;
        for (c, &b) in bary.iter().enumerate() {
            acc += verts[(row, c)] * b;
        }
        x[row] = acc;
    }
}

/// Null-rule ratio test.
///
/// `row[0]` is the value, `row[1..]` the null magnitudes ordered from the
/// highest degree down. In the smooth regime every null rule is smaller than
/// the next lower-degree one; the worst observed ratio then extrapolates the
/// highest-degree magnitude one step further. Otherwise the largest null
/// magnitude stands as-is. Orders with only degree-1 null rules skip the
/// extrapolation. The result carries a fixed safety factor and a floor at
/// machine precision times the value magnitude.
fn estimate_error(order: usize, row: &[f64]) -> f64 {
    let basis = row[0].abs();
    let nulls = &row[1..];
    let mut worst = 0.0f64;
    for &e in nulls {
        worst = worst.max(e.abs());
    }
    let mut err = worst;
    if order >= 2 {
        let mut ratio = RATIO_MIN;
        for k in 1..nulls.len() {
            let hi = nulls[k - 1].abs();
            let lo = nulls[k].abs();
            if hi > ERR_FLOOR * basis {
                ratio = if lo > 0.0 { ratio.max(hi / lo) } else { f64::INFINITY };
            }
        }
        if ratio < 1.0 {
            err = ratio * nulls[0].abs();
        }
    }
    (ERR_SAFETY * err).max(ERR_FLOOR * basis)
}

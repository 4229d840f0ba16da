//! Curvature-driven subdivision.
//!
//! Model
//! - For every vertex pair, a scaled fourth difference along the connecting
//!   direction (five-point stencil through the centroid) serves as a
//!   curvature proxy, weighted by the edge extent. The two strongest pairs
//!   decide the split: a close runner-up triggers a 4-way split bisecting
//!   both edges, otherwise the strongest edge is trisected 2:1, optionally
//!   drawing a third vertex into the second cut.
//! - The probe costs `1 + 2d(d+1)` evaluations regardless of outcome and is
//!   charged to the budget by the caller.
//! - Children report volume fractions instead of recomputed volumes; the
//!   caller derives exact-sum volumes from the parent's cached volume.

use nalgebra::DMatrix;

use crate::error::CubatureError;
use crate::integrand::{eval_checked, Integrand};

/// Runner-up to best ratio that still forces a 4-way split.
const CUT_FOUR: f64 = 2.0;
/// Runner-up to best ratio that draws a third vertex into a 3-way split.
const CUT_DRAW: f64 = 8.0;

/// Integrand evaluations consumed by one subdivision probe.
pub(crate) const fn probe_cost(d: usize) -> usize {
    1 + 2 * d * (d + 1)
}

/// Child vertex sets plus their volume fractions of the parent.
pub(crate) struct Split {
    pub children: Vec<DMatrix<f64>>,
    pub fractions: Vec<f64>,
}

/// Probe a region and produce 3 or 4 children partitioning it.
pub(crate) fn split_region<F: Integrand + ?Sized>(
    f: &mut F,
    verts: &DMatrix<f64>,
) -> Result<Split, CubatureError> {
    let d = verts.nrows();
    let np = d + 1;
    let m = f.components();

    let mut cn = vec![0.0; d];
    for (row, slot) in cn.iter_mut().enumerate() {
        *slot = (0..np).map(|c| verts[(row, c)]).sum::<f64>() / np as f64;
    }
    let mut fc = vec![0.0; m];
    eval_checked(f, &cn, &mut fc)?;
    let dfmd: f64 = fc.iter().map(|v| v.abs()).sum();

    // Strongest pair, runner-up, and the longest edge as a flat fallback.
    let (mut is, mut js, mut dfmx) = (0usize, 1usize, 0.0f64);
    let (mut it, mut jt, mut dfnx) = (0usize, 1usize, 0.0f64);
    let (mut ie, mut je, mut emx) = (0usize, 1usize, -1.0f64);

    let mut h = vec![0.0; d];
    let mut x = vec![0.0; d];
    let mut fx = vec![0.0; m];
    let mut diff = vec![0.0; m];
    for i in 0..d {
        for j in (i + 1)..np {
            let mut ewd = 0.0;
            for (row, slot) in h.iter_mut().enumerate() {
                *slot = 2.0 * (verts[(row, i)] - verts[(row, j)]) / (5.0 * np as f64);
                ewd += slot.abs();
            }
            if ewd >= emx {
                ie = i;
                je = j;
                emx = ewd;
            }
            for (slot, &v) in diff.iter_mut().zip(fc.iter()) {
                *slot = 6.0 * v;
            }
            for step in [-2.0, -1.0, 1.0, 2.0] {
                for row in 0..d {
                    x[row] = cn[row] + step * h[row];
                }
                eval_checked(f, &x, &mut fx)?;
                let scale = if step * step > 2.0 { 1.0 } else { -4.0 };
                for (slot, &v) in diff.iter_mut().zip(fx.iter()) {
                    *slot += scale * v;
                }
            }
            let mut dfr: f64 = diff.iter().map(|v| v.abs()).sum();
            if dfmd + dfr / 8.0 == dfmd {
                // Lost to cancellation against the centroid value.
                dfr = 0.0;
            }
            dfr *= ewd;
            if dfr >= dfmx {
                it = is;
                jt = js;
                dfnx = dfmx;
                is = i;
                js = j;
                dfmx = dfr;
            } else if dfr > dfnx {
                it = i;
                jt = j;
                dfnx = dfr;
            }
        }
    }

    if dfnx > dfmx / CUT_FOUR {
        // 4-way: bisect the strongest pair, then the runner-up pair by index
        // inside both halves.
        let (a, b) = bisect(verts, is, js);
        let (a1, a2) = bisect(&a, it, jt);
        let (b1, b2) = bisect(&b, it, jt);
        Ok(Split {
            children: vec![a1, a2, b1, b2],
            fractions: vec![0.25; 4],
        })
    } else {
        // 3-way: 2:1 trisection of the dominant edge (longest edge when the
        // probe saw no curvature at all).
        let (ci, cj) = if dfmx > 0.0 { (is, js) } else { (ie, je) };
        let mut near = verts.clone();
        let mut far = verts.clone();
        for row in 0..d {
            let p = (2.0 * verts[(row, ci)] + verts[(row, cj)]) / 3.0;
            near[(row, cj)] = p;
            far[(row, ci)] = p;
        }
        // Second cut through the far piece: along the runner-up pair when it
        // survives there and its curvature is non-negligible.
        let (si, sj) = if dfmx > 0.0 && dfnx >= dfmx / CUT_DRAW && it != ci && jt != ci {
            (it, jt)
        } else {
            (ci, cj)
        };
        let (far1, far2) = bisect(&far, si, sj);
        Ok(Split {
            children: vec![near, far1, far2],
            fractions: vec![1.0 / 3.0; 3],
        })
    }
}

/// Split a simplex in half at the midpoint of the edge between vertex
/// indices `i` and `j`. Each half keeps the parent's vertex indexing.
fn bisect(verts: &DMatrix<f64>, i: usize, j: usize) -> (DMatrix<f64>, DMatrix<f64>) {
    let mut a = verts.clone();
    let mut b = verts.clone();
    for row in 0..verts.nrows() {
        let mid = (verts[(row, i)] + verts[(row, j)]) / 2.0;
        a[(row, j)] = mid;
        b[(row, i)] = mid;
    }
    (a, b)
}

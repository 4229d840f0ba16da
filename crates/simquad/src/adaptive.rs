//! The adaptive refinement driver.
//!
//! Seed → Refine → Done: every mesh simplex is evaluated once and summed
//! into the running totals, then the worst region (single largest
//! per-component error entry) is split and re-evaluated until either every
//! component meets `max(abs_tol, rel_tol·|value|)` or the next round would
//! exceed the evaluation budget. Budget exhaustion is a normal exit carrying
//! the best current estimate.
//!
//! Single-threaded and deterministic: identical integrand, mesh, order and
//! tolerances reproduce bit-identical results.

use nalgebra::DVector;

use crate::error::CubatureError;
use crate::eval::apply_rule;
use crate::integrand::Integrand;
use crate::mesh::SimplexMesh;
use crate::region::{Accumulator, Region, RegionStore};
use crate::rules::RuleTable;
use crate::split::{probe_cost, split_region};

/// Engine configuration.
#[derive(Clone, Copy, Debug)]
pub struct IntegrateCfg {
    /// Rule order r ∈ 1..=4; the value rule has polynomial degree 2r+1.
    pub order: usize,
    /// Per-component absolute tolerance (> 0).
    pub abs_tol: f64,
    /// Per-component relative tolerance (> 0).
    pub rel_tol: f64,
    /// Cap on integrand evaluations, checked before each refinement round.
    pub max_evals: usize,
}

impl Default for IntegrateCfg {
    fn default() -> Self {
        Self {
            order: 3,
            abs_tol: 1e-10,
            rel_tol: 1e-6,
            max_evals: 100_000,
        }
    }
}

impl IntegrateCfg {
    pub fn validate(&self) -> Result<(), CubatureError> {
        if !(1..=4).contains(&self.order) {
            return Err(CubatureError::invalid(format!(
                "rule order {} outside the supported range 1..=4",
                self.order
            )));
        }
        if !(self.abs_tol > 0.0 && self.abs_tol.is_finite()) {
            return Err(CubatureError::invalid(
                "absolute tolerance must be positive and finite",
            ));
        }
        if !(self.rel_tol > 0.0 && self.rel_tol.is_finite()) {
            return Err(CubatureError::invalid(
                "relative tolerance must be positive and finite",
            ));
        }
        if self.max_evals == 0 {
            return Err(CubatureError::invalid("evaluation budget must be nonzero"));
        }
        Ok(())
    }
}

/// Why the refinement loop stopped.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Termination {
    /// Every component met `max(abs_tol, rel_tol·|value|)`.
    Accuracy,
    /// The next round would have exceeded the evaluation budget; the value
    /// is the best current estimate, not a failure.
    Budget,
}

/// Integral estimate plus diagnostics.
#[derive(Clone, Debug)]
pub struct IntegralResult {
    /// Componentwise integral estimate.
    pub value: DVector<f64>,
    /// Componentwise error estimate over all live regions.
    pub error: DVector<f64>,
    /// Integrand evaluations actually spent.
    pub evaluations: usize,
    pub termination: Termination,
    /// Number of live regions at exit.
    pub regions: usize,
}

/// Integrate `f` over `mesh` adaptively.
pub fn integrate<F: Integrand + ?Sized>(
    f: &mut F,
    mesh: &SimplexMesh,
    cfg: &IntegrateCfg,
) -> Result<IntegralResult, CubatureError> {
    cfg.validate()?;
    let m = f.components();
    if m == 0 {
        return Err(CubatureError::invalid(
            "integrand must have at least one component",
        ));
    }
    let d = mesh.dim();
    let table = RuleTable::new(d, cfg.order)?;
    let nodes = table.nodes();
    let probe = probe_cost(d);

    // Seed: evaluate every initial region. The seed pass always runs in
    // full; an undersized budget surfaces as Termination::Budget below.
    let mut store = RegionStore::with_capacity(mesh.len());
    let mut acc = Accumulator::zeros(m);
    let mut evals = 0usize;
    for (index, s) in mesh.simplices().iter().enumerate() {
        let volume = s.volume();
        if !(volume > 0.0 && volume.is_finite()) {
            return Err(CubatureError::DegenerateSimplex { index, volume });
        }
        let ev = apply_rule(f, &table, s.vertices(), volume)?;
        evals += nodes;
        acc.add(&ev.value, &ev.error);
        store.push(Region {
            verts: s.vertices().clone(),
            volume,
            value: ev.value,
            error: ev.error,
        });
    }

    // Refine: a round costs the probe plus up to four child evaluations;
    // that worst case must fit the budget before the round starts, because
    // spent evaluations cannot be returned.
    let round_cost = probe + 4 * nodes;
    let termination = loop {
        if converged(&acc, cfg) {
            break Termination::Accuracy;
        }
        if evals + round_cost > cfg.max_evals {
            break Termination::Budget;
        }

        let idx = store.worst();
        let parent_volume = store.get(idx).volume;
        let split = split_region(f, &store.get(idx).verts)?;
        evals += probe;

        // Exact-fraction child volumes; the last child takes the remainder
        // so the cached volumes sum exactly to the parent's.
        let mut volumes: Vec<f64> = split
            .fractions
            .iter()
            .map(|fr| fr * parent_volume)
            .collect();
        let head: f64 = volumes[..volumes.len() - 1].iter().sum();
        let n = volumes.len();
        volumes[n - 1] = parent_volume - head;

        // Evaluate every child before touching the store, so a failing
        // integrand never leaves a half-replaced worklist behind.
        let mut children = Vec::with_capacity(n);
        for (verts, volume) in split.children.into_iter().zip(volumes) {
            let ev = apply_rule(f, &table, &verts, volume)?;
            evals += nodes;
            children.push(Region {
                verts,
                volume,
                value: ev.value,
                error: ev.error,
            });
        }

        acc.subtract(&store.get(idx).value, &store.get(idx).error);
        for child in &children {
            acc.add(&child.value, &child.error);
        }
        store.replace_and_append(idx, children);
        debug_assert!(acc.consistent_with(&store, 1e-6));
    };

    Ok(IntegralResult {
        value: acc.value,
        error: acc.error,
        evaluations: evals,
        termination,
        regions: store.len(),
    })
}

fn converged(acc: &Accumulator, cfg: &IntegrateCfg) -> bool {
    acc.error
        .iter()
        .zip(acc.value.iter())
        .all(|(&e, &v)| e <= cfg.abs_tol.max(cfg.rel_tol * v.abs()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::integrand::{scalar, vector};
    use crate::mesh::{Simplex, SimplexMesh};
    use nalgebra::DMatrix;

    fn unit_triangle() -> SimplexMesh {
        SimplexMesh::canonical(2)
    }

    fn peak(x: &[f64]) -> f64 {
        let r2: f64 = x.iter().map(|v| (v - 0.1).powi(2)).sum();
        1.0 / (r2 + 1e-3)
    }

    #[test]
    fn constant_over_interval_mesh() {
        // Scenario: f ≡ 1 over [0,1] as two 1-simplices.
        let mesh = SimplexMesh::interval(0.0, 1.0, 2).unwrap();
        let mut f = scalar(|_: &[f64]| 1.0);
        let cfg = IntegrateCfg::default();
        let result = integrate(&mut f, &mesh, &cfg).unwrap();
        assert!((result.value[0] - 1.0).abs() < 1e-8);
        assert_eq!(result.termination, Termination::Accuracy);
        assert_eq!(result.regions, 2);
    }

    #[test]
    fn linear_over_unit_triangle_at_order_one() {
        // Scenario: f(x,y) = x + y over the unit right triangle; exact 1/3.
        let mesh = unit_triangle();
        let mut f = scalar(|x: &[f64]| x[0] + x[1]);
        let cfg = IntegrateCfg {
            order: 1,
            ..IntegrateCfg::default()
        };
        let result = integrate(&mut f, &mesh, &cfg).unwrap();
        assert!((result.value[0] - 1.0 / 3.0).abs() < 1e-6);
        assert_eq!(result.termination, Termination::Accuracy);
    }

    #[test]
    fn smooth_2d_integral_matches_closed_form() {
        // ∫∫_{x+y≤1} e^{x+y} = ∫_0^1 t e^t dt = 1.
        let mesh = unit_triangle();
        let mut f = scalar(|x: &[f64]| (x[0] + x[1]).exp());
        let cfg = IntegrateCfg {
            rel_tol: 1e-9,
            abs_tol: 1e-12,
            ..IntegrateCfg::default()
        };
        let result = integrate(&mut f, &mesh, &cfg).unwrap();
        assert!((result.value[0] - 1.0).abs() < 1e-8, "got {}", result.value[0]);
    }

    #[test]
    fn vector_integrand_converges_componentwise() {
        let mesh = unit_triangle();
        let mut f = vector(2, |x: &[f64], out: &mut [f64]| {
            out[0] = 1.0;
            out[1] = (x[0] * x[1]).sin();
        });
        let cfg = IntegrateCfg::default();
        let result = integrate(&mut f, &mesh, &cfg).unwrap();
        assert!((result.value[0] - 0.5).abs() < 1e-9);
        assert!(result.value[1] > 0.0 && result.value[1] < 0.5);
        assert_eq!(result.termination, Termination::Accuracy);
    }

    #[test]
    fn deterministic_bitwise_repeats() {
        let mesh = unit_triangle();
        let cfg = IntegrateCfg {
            rel_tol: 1e-7,
            ..IntegrateCfg::default()
        };
        let run = || {
            let mut f = scalar(peak);
            integrate(&mut f, &mesh, &cfg).unwrap()
        };
        let a = run();
        let b = run();
        assert_eq!(a.value[0].to_bits(), b.value[0].to_bits());
        assert_eq!(a.error[0].to_bits(), b.error[0].to_bits());
        assert_eq!(a.evaluations, b.evaluations);
        assert_eq!(a.regions, b.regions);
    }

    #[test]
    fn budget_is_never_exceeded_when_it_covers_the_seed() {
        let mesh = unit_triangle();
        let mut f = scalar(peak);
        let cfg = IntegrateCfg {
            rel_tol: 1e-12,
            abs_tol: 1e-14,
            max_evals: 2_000,
            ..IntegrateCfg::default()
        };
        let result = integrate(&mut f, &mesh, &cfg).unwrap();
        assert_eq!(result.termination, Termination::Budget);
        assert!(result.evaluations <= cfg.max_evals);
    }

    #[test]
    fn undersized_budget_returns_seed_estimate() {
        // Scenario: a budget below the seed-pass cost still returns the
        // unrefined estimate, flagged budget-exhausted.
        let mesh = SimplexMesh::interval(0.0, 1.0, 2).unwrap();
        let cfg = IntegrateCfg {
            rel_tol: 1e-12,
            abs_tol: 1e-14,
            max_evals: 1,
            ..IntegrateCfg::default()
        };
        let mut f = scalar(peak);
        let result = integrate(&mut f, &mesh, &cfg).unwrap();
        assert_eq!(result.termination, Termination::Budget);
        assert_eq!(result.regions, 2);
        // Identical to a pure seed pass: same value as a huge-tolerance run.
        let mut g = scalar(peak);
        let seed_only = integrate(
            &mut g,
            &mesh,
            &IntegrateCfg {
                rel_tol: 1e30,
                abs_tol: 1e30,
                ..cfg
            },
        )
        .unwrap();
        assert_eq!(result.value[0].to_bits(), seed_only.value[0].to_bits());
    }

    #[test]
    fn total_error_shrinks_with_larger_budgets() {
        let mesh = unit_triangle();
        let mut last = f64::INFINITY;
        for budget in [200usize, 2_000, 20_000] {
            let mut f = scalar(peak);
            let cfg = IntegrateCfg {
                rel_tol: 1e-12,
                abs_tol: 1e-14,
                max_evals: budget,
                ..IntegrateCfg::default()
            };
            let result = integrate(&mut f, &mesh, &cfg).unwrap();
            assert!(
                result.error[0] <= last + 1e-15,
                "error grew at budget {budget}"
            );
            last = result.error[0];
        }
    }

    #[test]
    fn adaptive_beats_uniform_refinement_on_a_peak() {
        // Scenario: a sharply peaked integrand at 1e-3 relative tolerance
        // must use fewer evaluations than uniform refinement needs for the
        // same accuracy.
        let sharp = |x: &[f64]| {
            let r2: f64 = x.iter().map(|v| (v - 0.1).powi(2)).sum();
            1.0 / (r2 + 1e-4)
        };
        let mesh = unit_triangle();
        let cfg = IntegrateCfg {
            order: 3,
            rel_tol: 1e-3,
            abs_tol: 1e-12,
            max_evals: 1_000_000,
        };
        let mut f = scalar(sharp);
        let adaptive = integrate(&mut f, &mesh, &cfg).unwrap();
        assert_eq!(adaptive.termination, Termination::Accuracy);

        // Reference value from a much tighter run.
        let mut f = scalar(sharp);
        let reference = integrate(
            &mut f,
            &mesh,
            &IntegrateCfg {
                rel_tol: 1e-8,
                max_evals: 4_000_000,
                ..cfg
            },
        )
        .unwrap();
        let target = 1e-3 * reference.value[0].abs();
        assert!((adaptive.value[0] - reference.value[0]).abs() <= target);

        // Uniform refinement: split every triangle at the edge midpoints
        // until the seed-pass estimate reaches the same true accuracy.
        let mut uniform_cost = None;
        let mut tris = vec![Simplex::canonical(2).vertices().clone()];
        for _depth in 0..9 {
            let mesh = SimplexMesh::new(
                tris.iter()
                    .map(|v| Simplex::new(v.clone()).unwrap())
                    .collect(),
            )
            .unwrap();
            let mut f = scalar(sharp);
            let seed = integrate(
                &mut f,
                &mesh,
                &IntegrateCfg {
                    rel_tol: 1e30,
                    abs_tol: 1e30,
                    max_evals: usize::MAX / 2,
                    ..cfg
                },
            )
            .unwrap();
            if (seed.value[0] - reference.value[0]).abs() <= target {
                uniform_cost = Some(seed.evaluations);
                break;
            }
            tris = tris.iter().flat_map(|v| refine_triangle(v)).collect();
        }
        let uniform_cost = uniform_cost.expect("uniform refinement converged");
        assert!(
            adaptive.evaluations < uniform_cost,
            "adaptive {} vs uniform {}",
            adaptive.evaluations,
            uniform_cost
        );
    }

    fn refine_triangle(verts: &DMatrix<f64>) -> Vec<DMatrix<f64>> {
        let col = |c: usize| [verts[(0, c)], verts[(1, c)]];
        let mid = |p: [f64; 2], q: [f64; 2]| [(p[0] + q[0]) / 2.0, (p[1] + q[1]) / 2.0];
        let (a, b, c) = (col(0), col(1), col(2));
        let (ab, bc, ca) = (mid(a, b), mid(b, c), mid(c, a));
        [[a, ab, ca], [ab, b, bc], [ca, bc, c], [ab, bc, ca]]
            .iter()
            .map(|tri| DMatrix::from_fn(2, 3, |r, k| tri[k][r]))
            .collect()
    }

    #[test]
    fn config_validation_fails_fast() {
        let mesh = unit_triangle();
        let base = IntegrateCfg::default();
        for cfg in [
            IntegrateCfg { order: 0, ..base },
            IntegrateCfg { order: 5, ..base },
            IntegrateCfg {
                abs_tol: 0.0,
                ..base
            },
            IntegrateCfg {
                rel_tol: -1.0,
                ..base
            },
            IntegrateCfg {
                abs_tol: f64::NAN,
                ..base
            },
            IntegrateCfg {
                max_evals: 0,
                ..base
            },
        ] {
            let mut f = scalar(|_: &[f64]| 1.0);
            assert!(matches!(
                integrate(&mut f, &mesh, &cfg),
                Err(CubatureError::InvalidConfig { .. })
            ));
        }
    }

    #[test]
    fn degenerate_mesh_simplex_fails_fast() {
        let flat = Simplex::new(DMatrix::from_row_slice(2, 3, &[
            0.0, 1.0, 2.0, //
            0.0, 1.0, 2.0,
        ]))
        .unwrap();
        let mesh = SimplexMesh::new(vec![Simplex::canonical(2), flat]).unwrap();
        let mut f = scalar(|_: &[f64]| 1.0);
        let err = integrate(&mut f, &mesh, &IntegrateCfg::default()).unwrap_err();
        assert!(matches!(
            err,
            CubatureError::DegenerateSimplex { index: 1, .. }
        ));
    }

    #[test]
    fn integrand_failure_propagates_from_refinement() {
        let mesh = unit_triangle();
        let mut calls = 0usize;
        let mut f = scalar(move |x: &[f64]| {
            calls += 1;
            if calls > 40 {
                f64::INFINITY
            } else {
                peak(x)
            }
        });
        let cfg = IntegrateCfg {
            rel_tol: 1e-10,
            ..IntegrateCfg::default()
        };
        assert!(matches!(
            integrate(&mut f, &mesh, &cfg),
            Err(CubatureError::IntegrandFailure { .. })
        ));
    }
}

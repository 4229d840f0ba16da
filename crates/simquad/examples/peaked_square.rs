//! Adaptive vs seed-only integration of a peaked function over the unit
//! square, printing the evaluation counts side by side.

use simquad::prelude::*;

fn main() {
    let mesh = SimplexMesh::unit_square();
    let peak = |x: &[f64]| {
        let r2: f64 = x.iter().map(|v| (v - 0.7).powi(2)).sum();
        1.0 / (r2 + 5e-4)
    };

    let cfg = IntegrateCfg {
        order: 3,
        abs_tol: 1e-12,
        rel_tol: 1e-4,
        max_evals: 200_000,
    };
    let mut f = scalar(peak);
    let adaptive = integrate(&mut f, &mesh, &cfg).expect("integration");

    let mut f = scalar(peak);
    let seed_only = integrate(
        &mut f,
        &mesh,
        &IntegrateCfg {
            rel_tol: 1e30,
            abs_tol: 1e30,
            ..cfg
        },
    )
    .expect("seed pass");

    println!(
        "adaptive:  value {:.10}  est err {:.2e}  evals {}  regions {}  ({:?})",
        adaptive.value[0],
        adaptive.error[0],
        adaptive.evaluations,
        adaptive.regions,
        adaptive.termination,
    );
    println!(
        "seed only: value {:.10}  est err {:.2e}  evals {}",
        seed_only.value[0], seed_only.error[0], seed_only.evaluations,
    );
    println!(
        "refinement moved the estimate by {:.2e}",
        (adaptive.value[0] - seed_only.value[0]).abs()
    );
}

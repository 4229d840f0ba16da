//! A downstream-consumer sketch: evaluate a CDF-style probability mass by
//! integrating a joint density over a simplex region and clipping the
//! scalar result to [0, 1], the way an order-statistics CDF evaluator
//! consumes this engine.

use simquad::prelude::*;

fn main() {
    // P(X + Y <= 1) for independent Exp(1) variables, restricted to the
    // triangle {x, y >= 0, x + y <= 1}. Exact: 1 - 2/e.
    let mesh = SimplexMesh::canonical(2);
    let mut density = scalar(|x: &[f64]| (-(x[0] + x[1])).exp());

    let cfg = IntegrateCfg {
        order: 2,
        abs_tol: 1e-10,
        rel_tol: 1e-8,
        max_evals: 50_000,
    };
    let result = integrate(&mut density, &mesh, &cfg).expect("integration");
    let p = result.value[0].clamp(0.0, 1.0);

    let exact = 1.0 - 2.0 / std::f64::consts::E;
    println!("P(X+Y <= 1) = {p:.12}   (exact {exact:.12})");
    println!(
        "evals {}  est err {:.2e}  ({:?})",
        result.evaluations, result.error[0], result.termination
    );
}

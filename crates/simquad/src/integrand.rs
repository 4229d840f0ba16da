//! Integrand abstraction.
//!
//! The engine only needs repeated, order-independent evaluation of an opaque
//! callable `R^d -> R^m`. Closures cover the common cases through [`scalar`]
//! and [`vector`]; implement [`Integrand`] directly when evaluation can fail
//! for reasons other than a non-finite result.

use crate::error::CubatureError;

/// Vector-valued integrand over points in `R^d`.
pub trait Integrand {
    /// Number of output components (m ≥ 1).
    fn components(&self) -> usize;

    /// Evaluate at `x`, writing every component into `out`
    /// (`out.len() == self.components()`).
    fn eval(&mut self, x: &[f64], out: &mut [f64]) -> Result<(), CubatureError>;
}

/// Evaluate and reject non-finite components.
pub(crate) fn eval_checked<F: Integrand + ?Sized>(
    f: &mut F,
    x: &[f64],
    out: &mut [f64],
) -> Result<(), CubatureError> {
    f.eval(x, out)?;
    for (component, &v) in out.iter().enumerate() {
        if !v.is_finite() {
            return Err(CubatureError::integrand(format!(
                "component {component} evaluated to {v}"
            )));
        }
    }
    Ok(())
}

/// Wrap a scalar closure as a one-component integrand.
pub fn scalar<F: FnMut(&[f64]) -> f64>(f: F) -> ScalarFn<F> {
    ScalarFn(f)
}

/// Adapter returned by [`scalar`].
pub struct ScalarFn<F>(F);

impl<F: FnMut(&[f64]) -> f64> Integrand for ScalarFn<F> {
    fn components(&self) -> usize {
        1
    }

    fn eval(&mut self, x: &[f64], out: &mut [f64]) -> Result<(), CubatureError> {
        out[0] = (self.0)(x);
        Ok(())
    }
}

/// Wrap a vector closure with a fixed component count.
pub fn vector<F: FnMut(&[f64], &mut [f64])>(components: usize, f: F) -> VectorFn<F> {
    VectorFn { f, components }
}

/// Adapter returned by [`vector`].
pub struct VectorFn<F> {
    f: F,
    components: usize,
}

impl<F: FnMut(&[f64], &mut [f64])> Integrand for VectorFn<F> {
    fn components(&self) -> usize {
        self.components
    }

    fn eval(&mut self, x: &[f64], out: &mut [f64]) -> Result<(), CubatureError> {
        (self.f)(x, out);
        Ok(())
    }
}

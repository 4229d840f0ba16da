//! Region arena and running totals.
//!
//! The worklist is an index-addressed arena: refining a region overwrites
//! its slot with the first child and appends the rest, so indices stay
//! stable and nothing is deleted mid-run. The running totals are maintained
//! incrementally (subtract the parent, add the children) as an explicit step
//! so the `totals == Σ regions` invariant can be asserted between rounds.

use nalgebra::{DMatrix, DVector};

/// One worklist entry with its cached geometry and rule results.
#[derive(Clone, Debug)]
pub(crate) struct Region {
    pub verts: DMatrix<f64>,
    pub volume: f64,
    pub value: DVector<f64>,
    pub error: DVector<f64>,
}

/// Index-addressed arena of regions.
#[derive(Clone, Debug, Default)]
pub(crate) struct RegionStore {
    regions: Vec<Region>,
}

impl RegionStore {
    pub fn with_capacity(n: usize) -> Self {
        Self {
            regions: Vec::with_capacity(n),
        }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.regions.len()
    }

    #[inline]
    pub fn get(&self, idx: usize) -> &Region {
        &self.regions[idx]
    }

    pub fn push(&mut self, region: Region) {
        self.regions.push(region);
    }

    /// Index of the region holding the single largest per-component error
    /// entry (not a norm). Ties go to the first found in scan order.
    pub fn worst(&self) -> usize {
        let mut best = 0;
        let mut best_err = f64::NEG_INFINITY;
        for (idx, region) in self.regions.iter().enumerate() {
            for &e in region.error.iter() {
                if e > best_err {
                    best_err = e;
                    best = idx;
                }
            }
        }
        best
    }

    /// Replace slot `idx` with the first child and append the rest.
    pub fn replace_and_append(&mut self, idx: usize, children: Vec<Region>) {
        let mut it = children.into_iter();
        if let Some(first) = it.next() {
            self.regions[idx] = first;
        }
        self.regions.extend(it);
    }

    pub fn iter(&self) -> impl Iterator<Item = &Region> {
        self.regions.iter()
    }
}

/// Running totals over all live regions.
#[derive(Clone, Debug)]
pub(crate) struct Accumulator {
    pub value: DVector<f64>,
    pub error: DVector<f64>,
}

impl Accumulator {
    pub fn zeros(components: usize) -> Self {
        Self {
            value: DVector::zeros(components),
            error: DVector::zeros(components),
        }
    }

    pub fn add(&mut self, value: &DVector<f64>, error: &DVector<f64>) {
        self.value += value;
        self.error += error;
    }

    pub fn subtract(&mut self, value: &DVector<f64>, error: &DVector<f64>) {
        self.value -= value;
        self.error -= error;
    }

    /// Totals must match the per-region sums at every quiescent point, up to
    /// round-off scaled by the totals themselves.
    pub fn consistent_with(&self, store: &RegionStore, tol: f64) -> bool {
        let m = self.value.len();
        let mut value = DVector::<f64>::zeros(m);
        let mut error = DVector::<f64>::zeros(m);
        for region in store.iter() {
            value += &region.value;
            error += &region.error;
        }
        (0..m).all(|l| {
            let vs = 1.0 + self.value[l].abs();
            let es = 1.0 + self.error[l].abs();
            (value[l] - self.value[l]).abs() <= tol * vs && (error[l] - self.error[l]).abs() <= tol * es
        })
    }
}

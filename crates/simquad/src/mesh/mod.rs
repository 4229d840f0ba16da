//! Simplicial meshes.
//!
//! Purpose
//! - Represent the integration domain as a plain collection of d-simplices,
//!   each a `d × (d+1)` vertex matrix (one vertex per column) with an
//!   independently computable volume. No adjacency is tracked; the adaptive
//!   engine never needs it.
//! - Vertex order matters only for consistent indexing during subdivision,
//!   not for geometry.

use nalgebra::{DMatrix, DVector};

use crate::error::CubatureError;
use crate::util::factorial;

pub mod rand;

/// A d-simplex stored as a `d × (d+1)` matrix, one vertex per column.
#[derive(Clone, Debug, PartialEq)]
pub struct Simplex {
    verts: DMatrix<f64>,
}

impl Simplex {
    /// Wrap a vertex matrix; the shape must be `d × (d+1)` with `d ≥ 1`.
    pub fn new(verts: DMatrix<f64>) -> Result<Self, CubatureError> {
        let d = verts.nrows();
        if d == 0 || verts.ncols() != d + 1 {
            return Err(CubatureError::invalid(format!(
                "simplex vertex matrix must be d x (d+1), got {} x {}",
                verts.nrows(),
                verts.ncols()
            )));
        }
        Ok(Self { verts })
    }

    /// Build from d+1 points of equal dimension d.
    pub fn from_points(points: &[DVector<f64>]) -> Result<Self, CubatureError> {
        let d = points.len().saturating_sub(1);
        if d == 0 {
            return Err(CubatureError::invalid("a simplex needs at least 2 points"));
        }
        let mut verts = DMatrix::zeros(d, d + 1);
        for (c, p) in points.iter().enumerate() {
            if p.len() != d {
                return Err(CubatureError::invalid(format!(
                    "point {c} has dimension {}, expected {d}",
                    p.len()
                )));
            }
            verts.set_column(c, p);
        }
        Ok(Self { verts })
    }

    /// The canonical simplex: origin plus the unit basis vectors.
    pub fn canonical(dim: usize) -> Self {
        let mut verts = DMatrix::zeros(dim.max(1), dim.max(1) + 1);
        for k in 0..dim.max(1) {
            verts[(k, k + 1)] = 1.0;
        }
        Self { verts }
    }

    #[inline]
    pub fn dim(&self) -> usize {
        self.verts.nrows()
    }

    #[inline]
    pub fn vertices(&self) -> &DMatrix<f64> {
        &self.verts
    }

    /// Euclidean volume `(1/d!) · |det(edge matrix)|`.
    pub fn volume(&self) -> f64 {
        let d = self.dim();
        let mut edges = DMatrix::zeros(d, d);
        for k in 0..d {
            for row in 0..d {
                edges[(row, k)] = self.verts[(row, k + 1)] - self.verts[(row, 0)];
            }
        }
        edges.determinant().abs() / factorial(d)
    }
}

/// A validated collection of same-dimension simplices.
#[derive(Clone, Debug)]
pub struct SimplexMesh {
    dim: usize,
    simplices: Vec<Simplex>,
}

impl SimplexMesh {
    /// Wrap a non-empty, dimension-consistent list of simplices.
    pub fn new(simplices: Vec<Simplex>) -> Result<Self, CubatureError> {
        let dim = match simplices.first() {
            Some(s) => s.dim(),
            None => return Err(CubatureError::invalid("mesh must contain a simplex")),
        };
        for (k, s) in simplices.iter().enumerate() {
            if s.dim() != dim {
                return Err(CubatureError::invalid(format!(
                    "simplex {k} has dimension {}, expected {dim}",
                    s.dim()
                )));
            }
        }
        Ok(Self { dim, simplices })
    }

    /// `[a, b]` split into `pieces` equal 1-simplices.
    pub fn interval(a: f64, b: f64, pieces: usize) -> Result<Self, CubatureError> {
        if pieces == 0 || !(a < b) {
            return Err(CubatureError::invalid(format!(
                "interval mesh needs a < b and pieces > 0, got [{a}, {b}] x {pieces}"
            )));
        }
        let width = (b - a) / pieces as f64;
        let simplices = (0..pieces)
            .map(|k| {
                let lo = a + k as f64 * width;
                Simplex {
                    verts: DMatrix::from_row_slice(1, 2, &[lo, lo + width]),
                }
            })
            .collect();
        Ok(Self { dim: 1, simplices })
    }

    /// The unit square split along the diagonal into two triangles.
    pub fn unit_square() -> Self {
        let lower = Simplex {
            verts: DMatrix::from_row_slice(2, 3, &[0.0, 1.0, 1.0, 0.0, 0.0, 1.0]),
        };
        let upper = Simplex {
            verts: DMatrix::from_row_slice(2, 3, &[0.0, 1.0, 0.0, 0.0, 1.0, 1.0]),
        };
        Self {
            dim: 2,
            simplices: vec![lower, upper],
        }
    }

    /// A single canonical simplex of dimension `dim`.
    pub fn canonical(dim: usize) -> Self {
        let s = Simplex::canonical(dim);
        Self {
            dim: s.dim(),
            simplices: vec![s],
        }
    }

    #[inline]
    pub fn dim(&self) -> usize {
        self.dim
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.simplices.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.simplices.is_empty()
    }

    #[inline]
    pub fn simplices(&self) -> &[Simplex] {
        &self.simplices
    }
}

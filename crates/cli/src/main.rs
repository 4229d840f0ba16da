use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use serde::{Deserialize, Serialize};
use simquad::prelude::*;
use std::path::Path;
use tracing_subscriber::fmt::SubscriberBuilder;

#[derive(Parser)]
#[command(name = "simquad")]
#[command(about = "Adaptive simplex cubature runner")]
struct Cmd {
    #[command(subcommand)]
    action: Action,
}

#[derive(Subcommand)]
enum Action {
    /// Integrate a named built-in integrand over a mesh file
    Integrate {
        /// Mesh JSON produced by the `mesh` subcommand (or by hand)
        #[arg(long)]
        mesh: String,
        /// one | linear-sum | peak | gauss
        #[arg(long, default_value = "one")]
        integrand: String,
        #[arg(long, default_value_t = 3)]
        order: usize,
        #[arg(long, default_value_t = 1e-10)]
        abs_tol: f64,
        #[arg(long, default_value_t = 1e-6)]
        rel_tol: f64,
        #[arg(long, default_value_t = 100_000)]
        max_evals: usize,
        /// Write the JSON report here instead of stdout
        #[arg(long)]
        out: Option<String>,
    },
    /// Write a demo mesh as JSON
    Mesh {
        /// interval | triangle | square | canonical
        #[arg(long, default_value = "triangle")]
        kind: String,
        /// Pieces for the interval mesh
        #[arg(long, default_value_t = 2)]
        pieces: usize,
        /// Dimension for the canonical mesh
        #[arg(long, default_value_t = 2)]
        dim: usize,
        #[arg(long)]
        out: String,
    },
}

/// On-disk mesh: one entry per simplex, each a list of d+1 points.
#[derive(Serialize, Deserialize)]
struct MeshFile {
    dim: usize,
    simplices: Vec<Vec<Vec<f64>>>,
}

fn main() -> Result<()> {
    SubscriberBuilder::default().with_target(false).init();
    let cmd = Cmd::parse();
    match cmd.action {
        Action::Integrate {
            mesh,
            integrand,
            order,
            abs_tol,
            rel_tol,
            max_evals,
            out,
        } => run_integrate(mesh, integrand, order, abs_tol, rel_tol, max_evals, out),
        Action::Mesh {
            kind,
            pieces,
            dim,
            out,
        } => write_mesh(kind, pieces, dim, out),
    }
}

#[allow(clippy::too_many_arguments)]
fn run_integrate(
    mesh_path: String,
    integrand: String,
    order: usize,
    abs_tol: f64,
    rel_tol: f64,
    max_evals: usize,
    out: Option<String>,
) -> Result<()> {
    let text = std::fs::read_to_string(&mesh_path)
        .with_context(|| format!("reading mesh file {mesh_path}"))?;
    let file: MeshFile = serde_json::from_str(&text).context("parsing mesh JSON")?;
    let mesh = build_mesh(file)?;
    let mut f = named_integrand(&integrand)?;
    let cfg = IntegrateCfg {
        order,
        abs_tol,
        rel_tol,
        max_evals,
    };
    tracing::info!(mesh = mesh_path, integrand, order, max_evals, "integrate");
    let result = integrate(f.as_mut(), &mesh, &cfg)?;
    tracing::info!(
        evaluations = result.evaluations,
        regions = result.regions,
        termination = termination_str(result.termination),
        "done"
    );

    let report = serde_json::json!({
        "value": result.value.as_slice(),
        "error": result.error.as_slice(),
        "evaluations": result.evaluations,
        "termination": termination_str(result.termination),
        "regions": result.regions,
        "engine_version": simquad::VERSION,
    });
    let rendered = serde_json::to_string_pretty(&report)?;
    match out {
        Some(path) => {
            write_with_parents(Path::new(&path), rendered.as_bytes())?;
        }
        None => println!("{rendered}"),
    }
    Ok(())
}

fn write_mesh(kind: String, pieces: usize, dim: usize, out: String) -> Result<()> {
    let mesh = match kind.as_str() {
        "interval" => SimplexMesh::interval(0.0, 1.0, pieces)?,
        "triangle" => SimplexMesh::canonical(2),
        "square" => SimplexMesh::unit_square(),
        "canonical" => SimplexMesh::canonical(dim),
        other => bail!("unknown mesh kind '{other}'"),
    };
    let file = MeshFile {
        dim: mesh.dim(),
        simplices: mesh
            .simplices()
            .iter()
            .map(|s| {
                (0..s.vertices().ncols())
                    .map(|c| s.vertices().column(c).iter().copied().collect())
                    .collect()
            })
            .collect(),
    };
    tracing::info!(kind, dim = file.dim, simplices = file.simplices.len(), out, "mesh");
    write_with_parents(Path::new(&out), serde_json::to_string_pretty(&file)?.as_bytes())?;
    Ok(())
}

fn build_mesh(file: MeshFile) -> Result<SimplexMesh> {
    let mut simplices = Vec::with_capacity(file.simplices.len());
    for (k, points) in file.simplices.iter().enumerate() {
        let d = file.dim;
        if points.len() != d + 1 {
            bail!("simplex {k} has {} points, expected {}", points.len(), d + 1);
        }
        let mut verts = DMatrix::zeros(d, d + 1);
        for (c, p) in points.iter().enumerate() {
            if p.len() != d {
                bail!("simplex {k} point {c} has dimension {}, expected {d}", p.len());
            }
            for (row, &v) in p.iter().enumerate() {
                verts[(row, c)] = v;
            }
        }
        simplices.push(Simplex::new(verts)?);
    }
    Ok(SimplexMesh::new(simplices)?)
}

fn named_integrand(name: &str) -> Result<Box<dyn Integrand>> {
    Ok(match name {
        "one" => Box::new(scalar(|_: &[f64]| 1.0)),
        "linear-sum" => Box::new(scalar(|x: &[f64]| x.iter().sum())),
        "peak" => Box::new(scalar(|x: &[f64]| {
            let r2: f64 = x.iter().map(|v| (v - 0.3).powi(2)).sum();
            1.0 / (r2 + 1e-3)
        })),
        "gauss" => Box::new(scalar(|x: &[f64]| {
            let r2: f64 = x.iter().map(|v| v * v).sum();
            (-8.0 * r2).exp()
        })),
        other => bail!("unknown integrand '{other}'"),
    })
}

fn termination_str(t: Termination) -> &'static str {
    match t {
        Termination::Accuracy => "accuracy",
        Termination::Budget => "budget",
    }
}

fn write_with_parents(path: &Path, bytes: &[u8]) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }
    std::fs::write(path, bytes)?;
    Ok(())
}

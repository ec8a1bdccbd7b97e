use std::path::PathBuf;
use std::process::ExitCode;

use afv_core::AfvResult;
use afv_io::{
    HistoryWriter, RunReport, SolverOptions, entropy_error_l2, nodal_field,
    surface_coefficients, write_surface_file, write_vtu,
};
use afv_mesh::{Mesh, gmsh::read_gmsh};
use afv_solver::{FaceBsr, SteadySolver, StepRecord};
use afv_spatial::{FlowNumericsConfig, FlowScheme, SlopeLimiter, ViscousModel};
use clap::Parser;
use tracing::{error, info};

#[derive(Parser)]
#[command(name = "afv")]
#[command(about = "Steady two-dimensional finite-volume flow solver", long_about = None)]
struct Cli {
    /// Control file describing the case
    control_file: PathBuf,
    /// Mesh file, consumed when io.mesh_file is "from-cmd"
    mesh_file: Option<PathBuf>,
}

fn main() -> ExitCode {
    tracing_subscriber::fmt::init();
    let cli = Cli::parse();
    match run(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            error!(kind = err.kind(), "{err}");
            ExitCode::FAILURE
        }
    }
}

/// Low-fidelity variant of the main numerics for the starter stage.
fn starter_numerics(main: FlowNumericsConfig) -> FlowNumericsConfig {
    FlowNumericsConfig {
        second_order: false,
        limiter: SlopeLimiter::None,
        ..main
    }
}

fn run(cli: &Cli) -> AfvResult<()> {
    let opts = SolverOptions::load(&cli.control_file, cli.mesh_file.as_deref())?;

    let data = read_gmsh(&opts.io.mesh_file)?;
    let mesh = Mesh::build(data, opts.ghost_policy, opts.periodic)?;
    info!(
        cells = mesh.n_cells(),
        faces = mesh.n_faces(),
        boundary_faces = mesh.n_boundary_faces(),
        mesh = %opts.io.mesh_file.display(),
        "mesh loaded"
    );

    let main_scheme = FlowScheme::new(&mesh, &opts.physics, opts.numerics)?;
    let starter_scheme = match opts.pseudotime.starter {
        Some(_) => Some(FlowScheme::new(
            &mesh,
            &opts.physics,
            starter_numerics(opts.numerics),
        )?),
        None => None,
    };

    let interior_faces = mesh
        .faces()
        .iter()
        .skip(mesh.n_boundary_faces())
        .map(|f| (f.left, f.right))
        .collect();
    let mut op = FaceBsr::new(mesh.n_cells(), interior_faces);

    let mut u = vec![main_scheme.free_stream(); mesh.n_cells()];
    let mut history = match opts.io.convergence_history_required {
        true => Some(HistoryWriter::create(&opts.io.log_file_prefix)?),
        false => None,
    };
    let mut observer = |rec: &StepRecord| {
        if let Some(writer) = history.as_mut() {
            if let Err(err) = writer.record(rec) {
                error!("dropping convergence history: {err}");
            }
        }
        if rec.step % 50 == 0 {
            info!(
                stage = ?rec.stage,
                step = rec.step,
                cfl = rec.cfl,
                rel_residual = rec.rel_residual,
                "progress"
            );
        }
    };

    let driver = SteadySolver::new(&main_scheme, starter_scheme.as_ref(), opts.pseudotime.clone());
    let report = driver.solve(&mut u, Some(&mut op), Some(&mut observer))?;
    if let Some(writer) = history {
        if let Err(err) = writer.finish() {
            error!("dropping convergence history: {err}");
        }
    }
    info!(
        converged = report.converged,
        steps = report.total_steps,
        rel_residual = report.final_rel_residual,
        wall_s = report.timing.total_wall_s,
        "solve finished"
    );

    // Output-file trouble from here on is reported but does not fail the
    // run; the solve itself already succeeded.
    let gas = main_scheme.gas();
    if let Some(path) = &opts.io.solution_output_file {
        let field = nodal_field(&mesh, gas, &u);
        match write_vtu(path, &mesh, &field) {
            Ok(()) => info!(file = %path.display(), "volume solution written"),
            Err(err) => error!("dropping volume solution: {err}"),
        }
    }

    let viscous = opts.physics.viscous.then(|| ViscousModel::new(&opts.physics));
    let surface_prefix = opts
        .io
        .surface_output_prefix
        .clone()
        .unwrap_or_else(|| opts.io.log_file_prefix.clone());
    let alpha_rad = opts.physics.aoa_deg.to_radians();
    for &marker in opts
        .io
        .output_wall_markers
        .iter()
        .chain(&opts.io.output_other_markers)
    {
        let coeffs = surface_coefficients(&mesh, gas, &u, marker, alpha_rad, viscous.as_ref());
        match write_surface_file(&surface_prefix, &coeffs) {
            Ok(path) => info!(
                marker,
                cl = coeffs.cl,
                cd = coeffs.cd,
                file = %path.display(),
                "surface coefficients written"
            ),
            Err(err) => error!(marker, "dropping surface coefficients: {err}"),
        }
    }

    let entropy = entropy_error_l2(&mesh, gas, &u, &main_scheme.free_stream());
    let case = opts.io.log_file_prefix.clone();
    let run_report = RunReport::from_solve(&case, &report, Some(entropy));
    let report_path = PathBuf::from(format!("{case}-report.json"));
    match run_report.write_json(&report_path) {
        Ok(()) => info!(file = %report_path.display(), "run report written"),
        Err(err) => error!("dropping run report: {err}"),
    }
    Ok(())
}

//! Typed solver options extracted from a parsed control file.

use std::path::{Path, PathBuf};

use afv_core::{AfvError, AfvResult};
use afv_flux::NumFlux;
use afv_mesh::{GhostPolicy, PeriodicAxis, PeriodicSpec};
use afv_solver::{
    LinearSolveParams, PseudoTimeConfig, PseudoTimeMode, SmoothingParams, StageParams,
};
use afv_spatial::{
    BcRule, BoundarySpec, FlowNumericsConfig, FlowPhysicsConfig, GradientMethod, SlopeLimiter,
};
use tracing::debug;

use crate::control::{ConfigBlock, parse_control_file};

/// Output-related options from the `io` and `bc` blocks.
#[derive(Clone, Debug)]
pub struct IoOptions {
    pub mesh_file: PathBuf,
    pub solution_output_file: Option<PathBuf>,
    pub log_file_prefix: String,
    pub convergence_history_required: bool,
    pub surface_output_prefix: Option<String>,
    pub output_wall_markers: Vec<i32>,
    pub output_other_markers: Vec<i32>,
}

/// Everything a run needs, decoded and validated.
#[derive(Clone, Debug)]
pub struct SolverOptions {
    pub io: IoOptions,
    pub physics: FlowPhysicsConfig,
    pub numerics: FlowNumericsConfig,
    pub pseudotime: PseudoTimeConfig,
    pub ghost_policy: GhostPolicy,
    pub periodic: Option<PeriodicSpec>,
}

impl SolverOptions {
    /// Load and decode a control file. `mesh_from_cmd` supplies the mesh
    /// path when `io.mesh_file` is the sentinel `"from-cmd"`.
    pub fn load(path: &Path, mesh_from_cmd: Option<&Path>) -> AfvResult<Self> {
        let root = parse_control_file(path)?;
        Self::from_tree(&root, mesh_from_cmd)
    }

    pub fn from_tree(root: &ConfigBlock, mesh_from_cmd: Option<&Path>) -> AfvResult<Self> {
        let io = decode_io(root, mesh_from_cmd)?;
        let (physics, periodic) = decode_physics(root)?;
        let numerics = decode_numerics(root, &physics)?;
        let pseudotime = decode_pseudotime(root)?;
        decode_time(root)?;
        debug!(mesh = %io.mesh_file.display(), "control file decoded");
        Ok(Self {
            io,
            physics,
            numerics,
            pseudotime,
            ghost_policy: GhostPolicy::ReflectMidpoint,
            periodic,
        })
    }
}

fn decode_io(root: &ConfigBlock, mesh_from_cmd: Option<&Path>) -> AfvResult<IoOptions> {
    let io = root.block("io")?;
    let mesh_name = io.str("mesh_file")?;
    let mesh_file = if mesh_name == "from-cmd" {
        mesh_from_cmd
            .map(Path::to_path_buf)
            .ok_or_else(|| {
                AfvError::config(
                    "io.mesh_file is \"from-cmd\" but no mesh path was given on the command line",
                )
            })?
    } else {
        PathBuf::from(mesh_name)
    };

    let bc = root.block_opt("bc");
    Ok(IoOptions {
        mesh_file,
        solution_output_file: io.str_opt("solution_output_file").map(PathBuf::from),
        log_file_prefix: io.str_opt("log_file_prefix").unwrap_or_else(|| "run".to_string()),
        convergence_history_required: io.bool_or("convergence_history_required", false)?,
        surface_output_prefix: bc.and_then(|b| b.str_opt("surface_output_file_prefix")),
        output_wall_markers: bc
            .map(|b| b.i32_list("listof_output_wall_boundaries"))
            .transpose()?
            .unwrap_or_default(),
        output_other_markers: bc
            .map(|b| b.i32_list("listof_output_other_boundaries"))
            .transpose()?
            .unwrap_or_default(),
    })
}

fn decode_time(root: &ConfigBlock) -> AfvResult<()> {
    if let Some(time) = root.block_opt("time") {
        let kind = time.str_opt("simulation_type").unwrap_or_else(|| "steady".to_string());
        if kind.to_ascii_lowercase() != "steady" {
            return Err(AfvError::config(format!(
                "simulation_type '{kind}' is not supported; this solver is steady-state only"
            )));
        }
    }
    Ok(())
}

fn decode_physics(root: &ConfigBlock) -> AfvResult<(FlowPhysicsConfig, Option<PeriodicSpec>)> {
    let flow = root.block("flow_conditions")?;
    let flow_type = flow.str("flow_type")?.to_ascii_lowercase();
    let viscous = match flow_type.as_str() {
        "euler" => false,
        "navierstokes" => true,
        other => {
            return Err(AfvError::config(format!(
                "unknown flow_type '{other}' (expected euler or navierstokes)"
            )));
        }
    };

    let (boundaries, periodic) = decode_boundaries(root)?;
    let mut phys = FlowPhysicsConfig::inviscid(
        flow.f64("adiabatic_index")?,
        flow.f64("freestream_Mach_number")?,
        flow.f64_or("angle_of_attack", 0.0)?,
        boundaries,
    );
    phys.viscous = viscous;
    if viscous {
        phys.re_inf = flow.f64("freestream_Reynolds_number")?;
        phys.reference_temperature = flow.f64("freestream_temperature")?;
        phys.prandtl = flow.f64_or("Prandtl_number", 0.72)?;
        phys.constant_viscosity = flow.bool_or("use_constant_viscosity", false)?;
    }
    Ok((phys, periodic))
}

fn decode_boundaries(root: &ConfigBlock) -> AfvResult<(Vec<BoundarySpec>, Option<PeriodicSpec>)> {
    let Some(bc) = root.block_opt("bc") else {
        return Err(AfvError::config("missing required block 'bc'"));
    };
    let mut specs = Vec::new();
    let mut push = |marker: i32, rule: BcRule| specs.push(BoundarySpec { marker, rule });

    if bc.contains("slipwall_marker") {
        push(bc.i32("slipwall_marker")?, BcRule::SlipWall);
    }
    if bc.contains("adiabaticwall_marker") {
        push(
            bc.i32("adiabaticwall_marker")?,
            BcRule::AdiabaticWall {
                tangential_velocity: bc.f64_or("adiabaticwall_velocity", 0.0)?,
            },
        );
    }
    if bc.contains("isothermalwall_marker") {
        push(
            bc.i32("isothermalwall_marker")?,
            BcRule::IsothermalWall {
                wall_temperature: bc.f64("isothermalwall_temperature")?,
            },
        );
    }
    if bc.contains("isothermalpressurewall_marker") {
        push(
            bc.i32("isothermalpressurewall_marker")?,
            BcRule::IsothermalPressureWall {
                wall_temperature: bc.f64("isothermalpressurewall_temperature")?,
                wall_pressure: bc.f64("isothermalpressurewall_pressure")?,
            },
        );
    }
    if bc.contains("farfield_marker") {
        push(bc.i32("farfield_marker")?, BcRule::Farfield);
    }
    if bc.contains("inoutflow_marker") {
        push(bc.i32("inoutflow_marker")?, BcRule::InflowOutflow);
    }
    if bc.contains("characteristic_marker") {
        if !bc.bool_or("allow_experimental", false)? {
            return Err(AfvError::config(
                "the characteristic boundary is experimental; set bc.allow_experimental true \
                 to use it",
            ));
        }
        push(bc.i32("characteristic_marker")?, BcRule::Characteristic);
    }

    let periodic = if bc.contains("periodic_marker") {
        let marker = bc.i32("periodic_marker")?;
        let axis = match bc.str("periodic_axis")?.to_ascii_lowercase().as_str() {
            "x" => PeriodicAxis::X,
            "y" => PeriodicAxis::Y,
            other => {
                return Err(AfvError::config(format!(
                    "periodic_axis must be x or y, got '{other}'"
                )));
            }
        };
        specs.push(BoundarySpec {
            marker,
            rule: BcRule::Periodic,
        });
        Some(PeriodicSpec { marker, axis })
    } else {
        None
    };

    Ok((specs, periodic))
}

fn decode_numerics(root: &ConfigBlock, phys: &FlowPhysicsConfig) -> AfvResult<FlowNumericsConfig> {
    let spatial = root.block("spatial_discretization")?;
    let inviscid_flux = NumFlux::from_name(&spatial.str("inviscid_flux")?)?;
    let jacobian_flux = match root.str_opt("Jacobian_inviscid_flux") {
        None => inviscid_flux,
        Some(name) if name.eq_ignore_ascii_case("consistent") => inviscid_flux,
        Some(name) => NumFlux::from_name(&name)?,
    };
    let gradient = match spatial.str_opt("gradient_method") {
        Some(name) => GradientMethod::from_name(&name)?,
        None => GradientMethod::None,
    };
    let limiter = match spatial.str_opt("limiter") {
        Some(name) => SlopeLimiter::from_name(&name)?,
        None => SlopeLimiter::None,
    };
    Ok(FlowNumericsConfig {
        inviscid_flux,
        jacobian_flux,
        gradient,
        limiter,
        limiter_param: spatial.f64_or("limiter_parameter", 2.0)?,
        second_order: spatial.bool_or("second_order", gradient != GradientMethod::None)?,
        reconstruct_primitive: spatial.bool_or("reconstruct_primitive", phys.viscous)?,
    })
}

fn decode_stage(block: &ConfigBlock) -> AfvResult<StageParams> {
    let max_steps = block.usize("max_timesteps")?;
    Ok(StageParams {
        cfl_min: block.f64("cfl_min")?,
        cfl_max: block.f64("cfl_max")?,
        ramp_start: block.usize_or("ramp_start", 0)?,
        ramp_end: block.usize_or("ramp_end", 0)?,
        tolerance: block.f64("tolerance")?,
        max_steps,
    })
}

fn decode_pseudotime(root: &ConfigBlock) -> AfvResult<PseudoTimeConfig> {
    let pt = root.block("pseudotime")?;
    let mode = match pt.str("pseudotime_stepping_type")?.to_ascii_lowercase().as_str() {
        "explicit" => PseudoTimeMode::Explicit,
        "implicit" => PseudoTimeMode::Implicit,
        other => {
            return Err(AfvError::config(format!(
                "unknown pseudotime_stepping_type '{other}' (expected explicit or implicit)"
            )));
        }
    };
    let main = decode_stage(pt.block("main")?)?;
    let starter = pt
        .block_opt("initialization")
        .map(decode_stage)
        .transpose()?;
    let smoothing = match pt.block_opt("residual_smoothing") {
        Some(block) if block.bool_or("enable", true)? => Some(SmoothingParams {
            coefficient: block.f64_or("coefficient", 0.5)?,
            sweeps: block.usize_or("sweeps", 2)?,
        }),
        _ => None,
    };
    let linear = match pt.block_opt("linear_solver") {
        Some(block) => LinearSolveParams {
            rel_tol: block.f64_or("tolerance", 1e-4)?,
            max_iters: block.usize_or("max_iterations", 200)?,
        },
        None => LinearSolveParams::default(),
    };

    let mut config = match mode {
        PseudoTimeMode::Explicit => PseudoTimeConfig::explicit(main),
        PseudoTimeMode::Implicit => PseudoTimeConfig::implicit(main),
    };
    config.starter = starter;
    config.smoothing = smoothing;
    config.linear = linear;
    config.matrix_free = pt.bool_or("matrix_free", false)?;
    Ok(config)
}

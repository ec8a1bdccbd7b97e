//! Cell-centered residual and Jacobian assembly.
//!
//! The residual pass is a parallel map over faces producing per-face flux
//! records, followed by a parallel per-cell gather through the mesh's
//! face-incidence table. The gather order per cell is fixed, so the
//! result does not depend on the parallel schedule.

use afv_core::{AfvError, AfvResult};
use afv_flux::euler::max_wave_speed;
use afv_mesh::{Mesh, Point};
use afv_physics::{Block, Gas, State};
use rayon::prelude::*;
use tracing::debug;

use crate::bc::BoundaryTable;
use crate::config::{FlowNumericsConfig, FlowPhysicsConfig};
use crate::gradient::{CellGradient, GradientMethod, compute_gradients};
use crate::limiter::{SlopeLimiter, cell_limiter_factors, van_albada_pair, weno_smooth_gradients};
use crate::linear::{LinearOperator, StorageKind, SubmitSlot};
use crate::scheme::SpatialScheme;
use crate::viscous::ViscousModel;

/// The flow spatial discretization: flux, reconstruction, limiting, and
/// boundary closure over a borrowed mesh.
#[derive(Debug)]
pub struct FlowScheme<'m> {
    mesh: &'m Mesh,
    gas: Gas,
    uinf: State,
    bcs: BoundaryTable,
    num: FlowNumericsConfig,
    viscous: Option<ViscousModel>,
}

/// Face states and (optionally) the primitive cell data the viscous terms
/// consume.
struct FaceData {
    ul: Vec<State>,
    ur: Vec<State>,
    /// Primitive cell averages, ghost values, and gradients; present when
    /// the viscous terms are active.
    prim: Option<(Vec<State>, Vec<State>, Vec<CellGradient>)>,
}

impl<'m> FlowScheme<'m> {
    pub fn new(
        mesh: &'m Mesh,
        phys: &FlowPhysicsConfig,
        mut num: FlowNumericsConfig,
    ) -> AfvResult<Self> {
        let gas = Gas::new(phys.gamma, phys.mach_inf)?;
        let uinf = gas.free_stream(phys.aoa_deg.to_radians());
        let bcs = BoundaryTable::new(phys.boundaries.clone())?;
        mesh.check_markers(&bcs.markers())?;
        for bf in 0..mesh.n_boundary_faces() {
            let marker = mesh.face(bf).marker;
            if bcs.rule(marker).is_none() {
                return Err(AfvError::config(format!(
                    "mesh boundary marker {marker} has no boundary condition"
                )));
            }
        }
        let viscous = phys.viscous.then(|| ViscousModel::new(phys));
        if viscous.is_some() {
            if num.gradient == GradientMethod::None {
                return Err(AfvError::config(
                    "viscous runs need a gradient method (leastSquares or greenGauss)",
                ));
            }
            // Viscous terms consume primitive gradients.
            num.reconstruct_primitive = true;
        }
        debug!(
            second_order = num.second_order,
            viscous = viscous.is_some(),
            "flow scheme constructed"
        );
        Ok(Self {
            mesh,
            gas,
            uinf,
            bcs,
            num,
            viscous,
        })
    }

    pub fn mesh(&self) -> &Mesh {
        self.mesh
    }

    pub fn gas(&self) -> &Gas {
        &self.gas
    }

    pub fn free_stream(&self) -> State {
        self.uinf
    }

    pub fn boundaries(&self) -> &BoundaryTable {
        &self.bcs
    }

    pub fn numerics(&self) -> &FlowNumericsConfig {
        &self.num
    }

    /// Ghost state for boundary face `bf` from the interior value `ul`.
    fn ghost_state(&self, bf: usize, ul: &State, u: &[State]) -> State {
        if let Some(partner) = self.mesh.periodic_partner(bf) {
            return u[partner];
        }
        let face = self.mesh.face(bf);
        let rule = self
            .bcs
            .rule(face.marker)
            .expect("markers validated at construction");
        rule.ghost_state(&self.gas, &self.uinf, ul, face.normal)
    }

    fn to_recon(&self, u: &State) -> State {
        if self.num.reconstruct_primitive {
            self.gas.cons_to_prim_p(u)
        } else {
            *u
        }
    }

    fn from_recon(&self, w: &State) -> State {
        if self.num.reconstruct_primitive {
            self.gas.prim_p_to_cons(w)
        } else {
            *w
        }
    }

    /// Reconstructed value of cell `i` at point `gp`, clipped back to the
    /// cell average when the limited value leaves the physical region.
    fn recon_at(
        &self,
        i: usize,
        gp: Point,
        w: &[State],
        grads: &[CellGradient],
        phi: Option<&[State]>,
        origin: Point,
    ) -> State {
        let dr = gp - origin;
        let mut val = w[i];
        for k in 0..4 {
            let d = grads[i][0][k] * dr.x + grads[i][1][k] * dr.y;
            let factor = phi.map_or(1.0, |phi| phi[i][k]);
            val[k] += factor * d;
        }
        val
    }

    /// Left/right face states for every face, plus the primitive data the
    /// viscous terms need.
    fn face_states(&self, u: &[State]) -> FaceData {
        let nf = self.mesh.n_faces();
        let nb = self.mesh.n_boundary_faces();
        let needs_gradients = self.viscous.is_some()
            || (self.num.second_order && self.num.gradient != GradientMethod::None);

        if !needs_gradients {
            let mut ul = vec![State::zeros(); nf];
            let mut ur = vec![State::zeros(); nf];
            for f in 0..nf {
                let face = self.mesh.face(f);
                ul[f] = u[face.left];
                ur[f] = if f < nb {
                    self.ghost_state(f, &u[face.left], u)
                } else {
                    u[face.right]
                };
            }
            return FaceData {
                ul,
                ur,
                prim: None,
            };
        }

        // Cell averages and ghost values in reconstruction space.
        let w: Vec<State> = u.iter().map(|ui| self.to_recon(ui)).collect();
        let wg: Vec<State> = (0..nb)
            .map(|bf| {
                let face = self.mesh.face(bf);
                let ghost = self.ghost_state(bf, &u[face.left], u);
                self.to_recon(&ghost)
            })
            .collect();

        let mut grads = compute_gradients(self.mesh, self.num.gradient, &w, &wg);
        if self.num.second_order && self.num.limiter == SlopeLimiter::Weno {
            grads = weno_smooth_gradients(self.mesh, &grads);
        }
        let phi = (self.num.second_order
            && matches!(
                self.num.limiter,
                SlopeLimiter::BarthJespersen | SlopeLimiter::Venkatakrishnan
            ))
        .then(|| {
            cell_limiter_factors(
                self.mesh,
                self.num.limiter,
                &w,
                &wg,
                &grads,
                self.num.limiter_param,
            )
        });

        let mut ul = vec![State::zeros(); nf];
        let mut ur = vec![State::zeros(); nf];
        for f in 0..nf {
            let face = self.mesh.face(f);
            let gp = self.mesh.face_gauss_point(f, 0, 1);

            let wl = if !self.num.second_order {
                w[face.left]
            } else if self.num.limiter == SlopeLimiter::VanAlbada {
                let (rj, wj) = if f < nb {
                    (self.mesh.ghost_center(f), wg[f])
                } else {
                    (self.mesh.cell_centroid(face.right), w[face.right])
                };
                self.van_albada_value(face.left, rj, wj, &w, &grads)
            } else {
                self.recon_at(
                    face.left,
                    gp,
                    &w,
                    &grads,
                    phi.as_deref(),
                    self.mesh.cell_centroid(face.left),
                )
            };
            let cand_l = self.from_recon(&wl);
            ul[f] = if self.gas.is_physical(&cand_l) {
                cand_l
            } else {
                u[face.left]
            };

            ur[f] = if f < nb {
                if let Some(partner) = self.mesh.periodic_partner(f) {
                    // Reconstruct from the translated partner cell.
                    let wr = if !self.num.second_order {
                        w[partner]
                    } else if self.num.limiter == SlopeLimiter::VanAlbada {
                        self.van_albada_from(
                            partner,
                            self.mesh.ghost_center(f),
                            self.mesh.cell_centroid(face.left),
                            w[face.left],
                            &w,
                            &grads,
                        )
                    } else {
                        self.recon_at(
                            partner,
                            gp,
                            &w,
                            &grads,
                            phi.as_deref(),
                            self.mesh.ghost_center(f),
                        )
                    };
                    let cand = self.from_recon(&wr);
                    if self.gas.is_physical(&cand) {
                        cand
                    } else {
                        u[partner]
                    }
                } else {
                    // Boundary rule applied to the reconstructed left state.
                    self.ghost_state(f, &ul[f], u)
                }
            } else {
                let wr = if !self.num.second_order {
                    w[face.right]
                } else if self.num.limiter == SlopeLimiter::VanAlbada {
                    self.van_albada_value(
                        face.right,
                        self.mesh.cell_centroid(face.left),
                        w[face.left],
                        &w,
                        &grads,
                    )
                } else {
                    self.recon_at(
                        face.right,
                        gp,
                        &w,
                        &grads,
                        phi.as_deref(),
                        self.mesh.cell_centroid(face.right),
                    )
                };
                let cand = self.from_recon(&wr);
                if self.gas.is_physical(&cand) {
                    cand
                } else {
                    u[face.right]
                }
            };
        }

        let prim = self.viscous.is_some().then(|| (w, wg, grads));
        FaceData {
            ul,
            ur,
            prim,
        }
    }

    /// MUSCL/Van Albada value of cell `i` toward a neighbor at `rj` with
    /// value `wj`.
    fn van_albada_value(
        &self,
        i: usize,
        rj: Point,
        wj: State,
        w: &[State],
        grads: &[CellGradient],
    ) -> State {
        self.van_albada_from(i, self.mesh.cell_centroid(i), rj, wj, w, grads)
    }

    fn van_albada_from(
        &self,
        i: usize,
        ri: Point,
        rj: Point,
        wj: State,
        w: &[State],
        grads: &[CellGradient],
    ) -> State {
        let d = rj - ri;
        let mut val = w[i];
        for k in 0..4 {
            let central = wj[k] - w[i][k];
            let upwind = 2.0 * (grads[i][0][k] * d.x + grads[i][1][k] * d.y) - central;
            val[k] += 0.5 * van_albada_pair(upwind, central);
        }
        val
    }

    /// Distance, primitive face value, and corrected face gradient for the
    /// viscous flux across face `f`.
    fn viscous_face(
        &self,
        f: usize,
        prim: &(Vec<State>, Vec<State>, Vec<CellGradient>),
    ) -> (State, CellGradient) {
        let (w, wg, grads) = prim;
        let face = self.mesh.face(f);
        let nb = self.mesh.n_boundary_faces();
        let l = face.left;
        let (wr, rr, grad_r) = if f < nb {
            let grad = self
                .mesh
                .periodic_partner(f)
                .map_or(grads[l], |partner| grads[partner]);
            (wg[f], self.mesh.ghost_center(f), grad)
        } else {
            (w[face.right], self.mesh.cell_centroid(face.right), grads[face.right])
        };
        let d = rr - self.mesh.cell_centroid(l);
        let dist = d.norm().max(f64::MIN_POSITIVE);
        let dhat = d / dist;

        let face_value = 0.5 * (w[l] + wr);
        let mut grad_f: CellGradient = [
            0.5 * (grads[l][0] + grad_r[0]),
            0.5 * (grads[l][1] + grad_r[1]),
        ];
        // Deferred correction along the cell-to-cell direction.
        for k in 0..4 {
            let along = grad_f[0][k] * dhat.x + grad_f[1][k] * dhat.y;
            let target = (wr[k] - w[l][k]) / dist;
            grad_f[0][k] += (target - along) * dhat.x;
            grad_f[1][k] += (target - along) * dhat.y;
        }
        (face_value, grad_f)
    }

    /// Center-to-center (or center-to-ghost) distance across face `f`.
    fn face_span(&self, f: usize) -> f64 {
        let face = self.mesh.face(f);
        let other = if f < self.mesh.n_boundary_faces() {
            self.mesh.ghost_center(f)
        } else {
            self.mesh.cell_centroid(face.right)
        };
        (other - self.mesh.cell_centroid(face.left))
            .norm()
            .max(f64::MIN_POSITIVE)
    }

    /// Fill the residual and the per-cell wave-speed integrals.
    pub fn compute_residual(
        &self,
        u: &[State],
        r: &mut [State],
        wave: &mut [f64],
    ) -> AfvResult<()> {
        let ncells = self.mesh.n_cells();
        if u.len() != ncells || r.len() != ncells || wave.len() != ncells {
            return Err(AfvError::InvalidArg {
                what: "residual buffers must have one entry per cell",
            });
        }

        let face_data = self.face_states(u);
        let fluxes: Vec<(State, f64)> = (0..self.mesh.n_faces())
            .into_par_iter()
            .map(|f| {
                let face = self.mesh.face(f);
                let n = face.normal;
                let ul = &face_data.ul[f];
                let ur = &face_data.ur[f];
                let mut flux = self.num.inviscid_flux.flux(&self.gas, ul, ur, n);
                let mut speed = max_wave_speed(&self.gas, ul, n)
                    .max(max_wave_speed(&self.gas, ur, n))
                    * face.length;
                if let (Some(model), Some(prim)) = (&self.viscous, &face_data.prim) {
                    let (prim_f, grad_f) = self.viscous_face(f, prim);
                    flux -= model.flux(&self.gas, &prim_f, &grad_f, n);
                    let t_f = self.gas.gamma
                        * self.gas.mach_inf
                        * self.gas.mach_inf
                        * prim_f[3]
                        / prim_f[0];
                    speed += model.spectral_radius(
                        &self.gas,
                        prim_f[0],
                        t_f,
                        face.length,
                        self.face_span(f),
                    ) * face.length;
                }
                (face.length * flux, speed)
            })
            .collect();

        r.par_iter_mut()
            .zip(wave.par_iter_mut())
            .enumerate()
            .for_each(|(i, (ri, wi))| {
                let mut acc = State::zeros();
                let mut speed = 0.0;
                for &(f, sign) in self.mesh.cell_faces(i) {
                    acc += sign * fluxes[f].0;
                    speed += fluxes[f].1;
                }
                *ri = acc;
                *wi = speed;
            });
        Ok(())
    }

    /// Add ∂R/∂u into the operator. The linearization is first order in
    /// space (cell-average face states), which is the usual implicit
    /// operator even under a second-order residual.
    pub fn compute_jacobian(&self, u: &[State], op: &mut dyn LinearOperator) -> AfvResult<()> {
        if u.len() != self.mesh.n_cells() || op.n_cells() != self.mesh.n_cells() {
            return Err(AfvError::InvalidArg {
                what: "operator and state must have one block row per cell",
            });
        }
        let nb = self.mesh.n_boundary_faces();
        let jac = self.num.jacobian_flux;

        for f in 0..self.mesh.n_faces() {
            let face = self.mesh.face(f);
            let n = face.normal;
            let len = face.length;
            let l = face.left;

            if f < nb {
                if let Some(partner) = self.mesh.periodic_partner(f) {
                    // The cross-cell coupling is dropped; only the local
                    // dependence enters the operator.
                    let (jl, _) = jac.jacobian(&self.gas, &u[l], &u[partner], n);
                    op.update_diag_block(l, &(len * jl));
                } else {
                    let rule = self
                        .bcs
                        .rule(face.marker)
                        .expect("markers validated at construction");
                    let ug = self.ghost_state(f, &u[l], u);
                    let (jl, jr) = jac.jacobian(&self.gas, &u[l], &ug, n);
                    // Fold the ghost dependence into the diagonal: exact
                    // ∂u_g/∂u_L for the linear rules, identity otherwise.
                    let mut diag = match rule.ghost_jacobian(n) {
                        Some(dg) => len * (jl + jr * dg),
                        None => len * (jl + jr),
                    };
                    if let Some(model) = &self.viscous {
                        let t = self.gas.temperature(&u[l]);
                        let wv = model.spectral_radius(
                            &self.gas,
                            u[l][0],
                            t,
                            len,
                            self.face_span(f),
                        ) * len;
                        diag += wv * Block::identity();
                    }
                    op.update_diag_block(l, &diag);
                }
                continue;
            }

            let rgt = face.right;
            let (jl, jr) = jac.jacobian(&self.gas, &u[l], &u[rgt], n);
            let mut diag_l = len * jl;
            let mut diag_r = -len * jr;
            let mut off_lr = len * jr;
            let mut off_rl = -len * jl;
            if let Some(model) = &self.viscous {
                let t = 0.5 * (self.gas.temperature(&u[l]) + self.gas.temperature(&u[rgt]));
                let rho = 0.5 * (u[l][0] + u[rgt][0]);
                let wv =
                    model.spectral_radius(&self.gas, rho, t, len, self.face_span(f)) * len;
                let wid = wv * Block::identity();
                diag_l += wid;
                diag_r += wid;
                off_lr -= wid;
                off_rl -= wid;
            }
            op.update_diag_block(l, &diag_l);
            op.update_diag_block(rgt, &diag_r);
            let k = f - nb;
            let (slot_lr, slot_rl) = match op.storage() {
                StorageKind::FaceIndexed => (SubmitSlot::FaceUpper(k), SubmitSlot::FaceLower(k)),
                StorageKind::General => (SubmitSlot::Pair, SubmitSlot::Pair),
            };
            op.submit_block(l, rgt, &off_lr, slot_lr);
            op.submit_block(rgt, l, &off_rl, slot_rl);
        }
        Ok(())
    }
}

impl SpatialScheme for FlowScheme<'_> {
    fn n_cells(&self) -> usize {
        self.mesh.n_cells()
    }

    fn cell_volume(&self, i: usize) -> f64 {
        self.mesh.cell_area(i)
    }

    fn residual(&self, u: &[State], r: &mut [State], wave: &mut [f64]) -> AfvResult<()> {
        self.compute_residual(u, r, wave)
    }

    fn assemble_jacobian(&self, u: &[State], op: &mut dyn LinearOperator) -> AfvResult<()> {
        self.compute_jacobian(u, op)
    }

    fn is_physical(&self, u: &State) -> bool {
        self.gas.is_physical(u)
    }

    fn smooth_residual(&self, r: &mut [State], coefficient: f64, sweeps: usize) {
        if sweeps == 0 || coefficient <= 0.0 {
            return;
        }
        // Jacobi iterations of (1 + β L) r_s = r.
        let mut smoothed = r.to_vec();
        for _ in 0..sweeps {
            let prev = smoothed.clone();
            for (i, slot) in smoothed.iter_mut().enumerate() {
                let mut sum = State::zeros();
                let mut degree = 0.0;
                for &(f, _) in self.mesh.cell_faces(i) {
                    if !self.mesh.is_interior_face(f) {
                        continue;
                    }
                    let face = self.mesh.face(f);
                    let j = if face.left == i { face.right } else { face.left };
                    sum += prev[j];
                    degree += 1.0;
                }
                *slot = (r[i] + coefficient * sum) / (1.0 + coefficient * degree);
            }
        }
        r.copy_from_slice(&smoothed);
    }
}

use context::{PeriodicFunction, SimulationContext};
use dwconsts::*;
use kscf::KPointSet;
use tracing::{info, warn};
use types::c64;
use vector3::Vector3f64;

mod density_matrix;
pub use density_matrix::*;

mod kernel;
pub use kernel::*;

mod paw;
pub use paw::*;

mod augment;
mod initial;
mod mt;
mod symmetrize;
mod valence;

const PARALLEL_MIN_LEN: usize = 8192;

#[inline]
fn use_parallel_for_len(len: usize) -> bool {
    len >= PARALLEL_MIN_LEN && rayon::current_num_threads() > 1
}

#[derive(Debug, thiserror::Error)]
pub enum DensityError {
    #[error("{0} is not implemented")]
    Unimplemented(&'static str),

    #[error("{what}: found {found}, expected {expected}")]
    ShapeMismatch {
        what: &'static str,
        found: usize,
        expected: usize,
    },

    #[error("k-point {ik} carries no beta projectors")]
    MissingBetaProjectors { ik: usize },

    #[error("k-point {ik} carries no muffin-tin coefficients")]
    MissingMtCoeffs { ik: usize },
}

/// Charge density, magnetization and the atom-block density matrix.
///
/// Usual cycle: `initial_density`, then `generate` (valence, augmentation, transform),
/// `normalize` and optionally `symmetrize_density_matrix`.
pub struct Density<'a> {
    ctx: &'a SimulationContext,
    kernel: Box<dyn DensityKernel>,

    rho: PeriodicFunction,
    // mz, or mz, mx, my
    magnetization: Vec<PeriodicFunction>,

    density_matrix: DensityMatrix,
    paw: Vec<PawDensity>,

    // augmentation already added to the current valence density
    augmented: bool,
}

impl<'a> Density<'a> {
    pub fn new(ctx: &'a SimulationContext) -> Density<'a> {
        let num_mag_dims = ctx.num_mag_dims();

        let density_matrix = DensityMatrix::for_unit_cell(ctx.unit_cell(), num_mag_dims, ctx.full_potential());

        Density {
            ctx,
            kernel: new_kernel(ctx.processing_unit()),
            rho: PeriodicFunction::new(ctx),
            magnetization: (0..num_mag_dims).map(|_| PeriodicFunction::new(ctx)).collect(),
            density_matrix,
            paw: Vec::new(),
            augmented: false,
        }
    }

    pub fn ctx(&self) -> &SimulationContext {
        self.ctx
    }

    pub fn kernel_name(&self) -> &'static str {
        self.kernel.name()
    }

    pub fn rho(&self) -> &PeriodicFunction {
        &self.rho
    }

    pub fn rho_mut(&mut self) -> &mut PeriodicFunction {
        &mut self.rho
    }

    /// Magnetization component `i`: 0 = mz, 1 = mx, 2 = my.
    pub fn magnetization(&self, i: usize) -> &PeriodicFunction {
        &self.magnetization[i]
    }

    pub fn magnetization_mut(&mut self, i: usize) -> &mut PeriodicFunction {
        &mut self.magnetization[i]
    }

    /// rho for 0, magnetization(i - 1) otherwise.
    pub fn component(&self, i: usize) -> &PeriodicFunction {
        if i == 0 {
            &self.rho
        } else {
            &self.magnetization[i - 1]
        }
    }

    pub fn component_mut(&mut self, i: usize) -> &mut PeriodicFunction {
        if i == 0 {
            &mut self.rho
        } else {
            &mut self.magnetization[i - 1]
        }
    }

    pub fn num_components(&self) -> usize {
        1 + self.magnetization.len()
    }

    pub fn density_matrix(&self) -> &DensityMatrix {
        &self.density_matrix
    }

    pub fn density_matrix_mut(&mut self) -> &mut DensityMatrix {
        &mut self.density_matrix
    }

    pub fn paw_densities(&self) -> &[PawDensity] {
        &self.paw
    }

    /// Electrons the density must hold: valence, plus core for full potential.
    pub fn num_electrons(&self) -> f64 {
        let cell = self.ctx.unit_cell();

        if self.ctx.full_potential() {
            cell.num_valence_electrons() + cell.num_core_electrons()
        } else {
            cell.num_valence_electrons()
        }
    }

    /// Valence density from the wave functions plus everything the method adds on top.
    ///
    /// Pseudopotential runs are augmented and get the extra charge back on G = 0.
    /// Full-potential runs get the core density when `add_core` is set.
    pub fn generate(&mut self, kset: &KPointSet, add_core: bool, transform_to_rg: bool) -> Result<(), DensityError> {
        self.generate_valence(kset)?;

        let ctx = self.ctx;

        if ctx.full_potential() {
            if add_core {
                self.add_core_mt();
            }

            for i in 0..self.num_components() {
                self.component_mut(i).sync_mt(ctx.comm());
            }
        } else {
            self.augment();

            let omega = ctx.unit_cell().omega();
            let extra = ctx.control().get_extra_charge();

            if ctx.gvec_range().start == 0 && ctx.num_gvec_loc() > 0 {
                self.rho.f_pw_local_mut()[0] += c64::new(extra / omega, 0.0);
            }

            let nel = self.rho.f_0(ctx).re * omega;
            let target = self.num_electrons();

            if (nel - target).abs() > 1.0E-8 && self.is_root() {
                warn!(
                    obtained = nel,
                    target,
                    difference = (nel - target).abs(),
                    "wrong unsymmetrized density"
                );
            }
        }

        if transform_to_rg {
            for i in 0..self.num_components() {
                self.component_mut(i).pw_to_rg(ctx);
            }
        }

        Ok(())
    }

    fn add_core_mt(&mut self) {
        let ctx = self.ctx;
        let cell = ctx.unit_cell();

        for ia in 0..cell.num_atoms() {
            if !ctx.is_local_atom(ia) {
                continue;
            }

            let core = cell.atom_type_of(ia).get_core_rho();
            let f = self.rho.f_mt_mut(ia);
            let nr = f.ncol().min(core.len());

            for ir in 0..nr {
                f[[0, ir]] += core[ir] / Y00;
            }
        }
    }

    /// Scale rho so that it integrates to `num_electrons()`.
    pub fn normalize(&mut self) {
        let (total, _, _) = self.rho.integrate(self.ctx);

        if total.abs() < EPS20 {
            return;
        }

        let scale = self.num_electrons() / total;

        self.rho.scale(scale);
    }

    /// Compare the integrated charge with the expected count; false and a warning on mismatch.
    pub fn check_num_electrons(&self) -> bool {
        let ctx = self.ctx;

        let nel = if ctx.full_potential() {
            self.rho.integrate(ctx).0
        } else {
            self.rho.f_0(ctx).re * ctx.unit_cell().omega()
        };

        let target = self.num_electrons();
        let diff = (nel - target).abs();

        if diff > 1.0E-5 {
            if self.is_root() {
                warn!(obtained = nel, target, difference = diff, "wrong number of electrons");
            }

            return false;
        }

        true
    }

    /// Integrated magnetization around each atom, (mx, my, mz), over the atom-to-grid map.
    pub fn compute_atomic_mag_mom(&self) -> Vec<Vector3f64> {
        let ctx = self.ctx;
        let cell = ctx.unit_cell();
        let dv = cell.omega() / ctx.fft_grid().get_ntotf64();

        let num_mag_dims = ctx.num_mag_dims();

        (0..cell.num_atoms())
            .map(|ia| {
                let mut mom = [0.0; 3];

                for &(ir, _) in ctx.atoms_to_grid_idx_map(ia).iter() {
                    for (j, m) in self.magnetization.iter().enumerate() {
                        mom[j] += m.f_rg()[ir];
                    }
                }

                match num_mag_dims {
                    0 => Vector3f64::zeros(),
                    1 => Vector3f64::new(0.0, 0.0, mom[0] * dv),
                    _ => Vector3f64::new(mom[1] * dv, mom[2] * dv, mom[0] * dv),
                }
            })
            .collect()
    }

    pub fn display(&self) {
        if !self.is_root() {
            return;
        }

        let (total, it, mt) = self.rho.integrate(self.ctx);

        info!("{:-^80}", " density ");
        info!("{:<28} = {:>18}", "kernel", self.kernel.name());
        info!("{:<28} = {:>18.10}", "total_charge", total);
        info!("{:<28} = {:>18.10}", "interstitial_charge", it);

        for (ia, q) in mt.iter().enumerate() {
            info!("{:<28} = {:>18.10}", format!("mt_charge[{}]", ia), q);
        }

        for (ia, m) in self.compute_atomic_mag_mom().iter().enumerate() {
            info!(
                "{:<28} = {:>12.6} {:>12.6} {:>12.6}",
                format!("atomic_moment[{}]", ia),
                m.x,
                m.y,
                m.z
            );
        }
    }

    fn is_root(&self) -> bool {
        self.ctx.comm().is_root()
    }

    fn print_checksum(&self, name: &str, v: c64) {
        if self.ctx.control().get_print_checksum() && self.is_root() {
            info!(checksum = name, re = v.re, im = v.im);
        }
    }
}

#[cfg(test)]
mod tests;

use crate::SimulationContext;
use dwconsts::*;
use dwmpi::Communicator;
use matrix::Matrix;
use types::c64;

/// Real periodic field kept as local PW coefficients and values on the full real-space grid.
///
/// Full-potential runs add one (lmmax x num_mt_points) block of real-harmonic coefficients per
/// atom. Changing one representation leaves the other stale until the matching transform runs.
#[derive(Debug, Clone)]
pub struct PeriodicFunction {
    f_pw_local: Vec<c64>,
    f_rg: Vec<f64>,
    f_mt: Vec<Matrix<f64>>,
}

impl PeriodicFunction {
    pub fn new(ctx: &SimulationContext) -> PeriodicFunction {
        let cell = ctx.unit_cell();

        let f_mt = if ctx.full_potential() {
            let lmmax = ctx.control().lmmax_rho();

            (0..cell.num_atoms())
                .map(|ia| Matrix::<f64>::new(lmmax, cell.atom_type_of(ia).num_mt_points()))
                .collect()
        } else {
            Vec::new()
        };

        PeriodicFunction {
            f_pw_local: vec![ZERO_C64; ctx.num_gvec_loc()],
            f_rg: vec![0.0; ctx.fft_grid().get_ntot()],
            f_mt,
        }
    }

    pub fn zero(&mut self) {
        for v in self.f_pw_local.iter_mut() {
            *v = ZERO_C64;
        }

        for v in self.f_rg.iter_mut() {
            *v = 0.0;
        }

        for m in self.f_mt.iter_mut() {
            m.set_zeros();
        }
    }

    pub fn f_pw_local(&self) -> &[c64] {
        &self.f_pw_local
    }

    pub fn f_pw_local_mut(&mut self) -> &mut [c64] {
        &mut self.f_pw_local
    }

    pub fn f_rg(&self) -> &[f64] {
        &self.f_rg
    }

    pub fn f_rg_mut(&mut self) -> &mut [f64] {
        &mut self.f_rg
    }

    pub fn has_mt(&self) -> bool {
        !self.f_mt.is_empty()
    }

    /// (lm, ir) coefficients of atom `ia`.
    pub fn f_mt(&self, ia: usize) -> &Matrix<f64> {
        &self.f_mt[ia]
    }

    pub fn f_mt_mut(&mut self, ia: usize) -> &mut Matrix<f64> {
        &mut self.f_mt[ia]
    }

    /// G = 0 coefficient, known on every rank.
    pub fn f_0(&self, ctx: &SimulationContext) -> c64 {
        let v = if ctx.gvec_range().start == 0 && !self.f_pw_local.is_empty() {
            self.f_pw_local[0]
        } else {
            ZERO_C64
        };

        dwmpi::allreduce_sum_scalar(ctx.comm(), v)
    }

    /// Real-space values from the PW coefficients.
    pub fn pw_to_rg(&mut self, ctx: &SimulationContext) {
        ctx.rgtransform().pw_to_rg(ctx.gvec(), ctx.comm(), &self.f_pw_local, &mut self.f_rg);
    }

    /// PW coefficients from the real-space values.
    pub fn rg_to_pw(&mut self, ctx: &SimulationContext) {
        ctx.rgtransform().rg_to_pw(ctx.gvec(), ctx.comm(), &self.f_rg, &mut self.f_pw_local);
    }

    /// Sum the muffin-tin parts that each rank computed for its own atoms.
    pub fn sync_mt(&mut self, comm: &dyn Communicator) {
        for m in self.f_mt.iter_mut() {
            dwmpi::allreduce_sum(comm, m.as_mut_slice());
        }
    }

    /// (total, interstitial, per-atom muffin-tin) integrals.
    pub fn integrate(&self, ctx: &SimulationContext) -> (f64, f64, Vec<f64>) {
        let dv = ctx.unit_cell().omega() / ctx.fft_grid().get_ntotf64();

        let it = if self.has_mt() {
            self.f_rg
                .iter()
                .zip(ctx.step_function().iter())
                .map(|(f, theta)| f * theta)
                .sum::<f64>()
                * dv
        } else {
            self.f_rg.iter().sum::<f64>() * dv
        };

        let cell = ctx.unit_cell();

        // int R_00 dOmega = 4pi Y00
        let mt: Vec<f64> = self
            .f_mt
            .iter()
            .enumerate()
            .map(|(ia, m)| {
                let grid = cell.atom_type_of(ia).get_radial_grid();
                let f: Vec<f64> = (0..m.ncol()).map(|ir| m[[0, ir]] * grid.r(ir) * grid.r(ir)).collect();

                FOURPI * Y00 * grid.integrate(&f)
            })
            .collect();

        (it + mt.iter().sum::<f64>(), it, mt)
    }

    /// Scale every representation by `s`.
    pub fn scale(&mut self, s: f64) {
        for v in self.f_pw_local.iter_mut() {
            *v *= s;
        }

        for v in self.f_rg.iter_mut() {
            *v *= s;
        }

        for m in self.f_mt.iter_mut() {
            for v in m.as_mut_slice().iter_mut() {
                *v *= s;
            }
        }
    }

    pub fn checksum_rg(&self) -> f64 {
        self.f_rg.iter().sum()
    }

    pub fn checksum_pw(&self, comm: &dyn Communicator) -> c64 {
        let s: c64 = self.f_pw_local.iter().sum();

        dwmpi::allreduce_sum_scalar(comm, s)
    }

    pub fn checksum_mt(&self) -> f64 {
        self.f_mt.iter().map(|m| m.as_slice().iter().sum::<f64>()).sum()
    }
}

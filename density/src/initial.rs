use crate::Density;
use crystal::RadialGrid;
use dwconsts::*;
use special::{real_ylm_all_of_vector, spherical_bessel_jn};
use tracing::warn;
use types::c64;
use utility::lmmax;
use vector3::Vector3f64;

impl<'a> Density<'a> {
    /// Starting density and magnetization from atomic data.
    pub fn initial_density(&mut self) {
        for i in 0..self.num_components() {
            self.component_mut(i).zero();
        }
        self.augmented = false;

        if self.ctx.full_potential() {
            self.initial_density_full_pot();
        } else {
            self.initial_density_pseudo();
        }
    }

    /// Superposition of the atomic pseudo densities plus a moment-carrying bump per atom.
    pub fn initial_density_pseudo(&mut self) {
        let ctx = self.ctx;
        let cell = ctx.unit_cell();
        let ri = ctx.radial_integrals();

        let v = ctx.make_periodic_function(|iat, g| ri.ps_rho(iat, g));

        if ctx.control().get_print_checksum() {
            let s: c64 = v.iter().sum();
            self.print_checksum("rho_pw_init", dwmpi::allreduce_sum_scalar(ctx.comm(), s));
        }

        self.rho.f_pw_local_mut().copy_from_slice(&v);

        let charge = self.rho.f_0(ctx).re * cell.omega();
        let nval = cell.num_valence_electrons();

        if (charge - nval).abs() > 1.0E-6 && self.is_root() {
            warn!(
                obtained = charge,
                target = nval,
                difference = (charge - nval).abs(),
                "wrong initial charge density"
            );
        }

        self.rho.pw_to_rg(ctx);

        for x in self.rho.f_rg_mut().iter_mut() {
            if *x < 0.0 {
                *x = 0.0;
            }
        }

        self.normalize();

        self.print_checksum("rho_rg", c64::new(self.rho.checksum_rg(), 0.0));

        let num_mag_dims = ctx.num_mag_dims();

        if num_mag_dims > 0 {
            let rmax = ctx.control().get_rmt_max();
            let norm = 4.0 * PI * rmax.powi(3) / 3.0;

            // integrates to 1 over the sphere of radius rmax
            let w = |r: f64| -> f64 {
                let x = r / rmax;
                35.0 / 8.0 * (1.0 - x * x).powi(2) / norm
            };

            for ia in 0..cell.num_atoms() {
                let vf = cell.atom(ia).get_vector_field();
                if vf.norm2() < 1.0E-8 {
                    continue;
                }

                for &(ir, dist) in ctx.atoms_to_grid_idx_map(ia).iter() {
                    let wr = w(dist);

                    self.magnetization[0].f_rg_mut()[ir] += vf.z * wr;

                    if num_mag_dims == 3 {
                        self.magnetization[1].f_rg_mut()[ir] += vf.x * wr;
                        self.magnetization[2].f_rg_mut()[ir] += vf.y * wr;
                    }
                }
            }
        }

        for i in 0..self.num_components() {
            self.component_mut(i).rg_to_pw(ctx);
        }

        if !cell.paw_atoms().is_empty() {
            self.init_paw();
            self.init_density_matrix_for_paw();
            self.generate_paw_loc_density();
        }
    }

    /// Free-atom densities inside the spheres, matched continuously to the superposition outside.
    pub fn initial_density_full_pot(&mut self) {
        let ctx = self.ctx;
        let cell = ctx.unit_cell();
        let ri = ctx.radial_integrals();

        let v = ctx.make_periodic_function(|iat, g| ri.free_atom_rho(iat, g));

        self.rho.f_pw_local_mut().copy_from_slice(&v);
        self.rho.pw_to_rg(ctx);

        for x in self.rho.f_rg_mut().iter_mut() {
            if *x < 0.0 {
                *x = 0.0;
            }
        }

        let lmax = ctx.control().get_lmax_rho();
        let n = lmmax(lmax);

        for ia in 0..cell.num_atoms() {
            let atype = cell.atom_type_of(ia);
            let grid = atype.get_radial_grid();
            let free = atype.get_free_atom_rho();

            let rmt = atype.get_mt_radius();
            let nr = self.rho.f_mt(ia).ncol();

            // interstitial expansion at the sphere boundary minus the free atom there
            let mut glm = self.rayleigh_at_sphere(ia, &v, lmax, rmt);
            glm[0] -= interpolate(grid, free, rmt) / Y00;

            let f = self.rho.f_mt_mut(ia);

            for ir in 0..nr {
                let x = grid.r(ir) / rmt;

                if ir < free.len() {
                    f[[0, ir]] = free[ir] / Y00;
                }

                for lm in 0..n {
                    f[[lm, ir]] += glm[lm] * x * x;
                }
            }
        }

        self.normalize();
        self.check_num_electrons();

        let num_mag_dims = ctx.num_mag_dims();

        if num_mag_dims > 0 {
            for ia in 0..cell.num_atoms() {
                if !ctx.is_local_atom(ia) {
                    continue;
                }

                let atype = cell.atom_type_of(ia);
                let grid = atype.get_radial_grid();
                let rmt = atype.get_mt_radius();
                let nr = self.rho.f_mt(ia).ncol();

                let rho_s: Vec<f64> = (0..nr)
                    .map(|ir| {
                        let x = grid.r(ir) / rmt;
                        self.rho.f_mt(ia)[[0, ir]] * Y00 * (1.0 - 3.0 * x * x + 2.0 * x * x * x)
                    })
                    .collect();

                let r2rho: Vec<f64> = (0..nr).map(|ir| rho_s[ir] * grid.r(ir) * grid.r(ir)).collect();
                let q = FOURPI * grid.integrate(&r2rho);

                let mut vf = cell.atom(ia).get_vector_field();
                let mut len = vf.norm2();

                if q < len {
                    vf = Vector3f64::new(vf.x * q / len, vf.y * q / len, vf.z * q / len);
                    len = q;
                }

                if len > 1.0E-8 {
                    let comps = [vf.z, vf.x, vf.y];

                    for (j, m) in self.magnetization.iter_mut().enumerate() {
                        let f = m.f_mt_mut(ia);

                        for ir in 0..nr {
                            f[[0, ir]] = rho_s[ir] * comps[j] / q / Y00;
                        }
                    }
                }
            }

            for m in self.magnetization.iter_mut() {
                m.sync_mt(ctx.comm());
            }
        }

        for i in 0..self.num_components() {
            self.component_mut(i).rg_to_pw(ctx);
        }
    }

    // real-harmonic expansion of sum_G f(G) exp(iG(r_a + x)) on |x| = radius
    fn rayleigh_at_sphere(&self, ia: usize, f_pw: &[c64], lmax: usize, radius: f64) -> Vec<f64> {
        let ctx = self.ctx;
        let gvec = ctx.gvec();
        let pos = ctx.unit_cell().atom(ia).get_position();

        let mut flm = vec![0.0; lmmax(lmax)];

        for (igloc, ig) in ctx.gvec_range().enumerate() {
            let gc = gvec.gvec_cart(ig);
            let g = gc.norm2();

            let ylm = real_ylm_all_of_vector(lmax, gc);
            let z = FOURPI * f_pw[igloc] * fhkl::phase_factor(gvec.gvec(ig), pos).conj();

            let mult = if gvec.reduced() && ig != 0 { 2.0 } else { 1.0 };

            for l in 0..=lmax {
                let jl = spherical_bessel_jn(l, g * radius);
                if jl == 0.0 {
                    continue;
                }

                // i^l
                let zl = z * vnl::minus_i_pow(l).conj() * jl;

                for m in utility::get_quant_num_m(l) {
                    let lm = utility::lm(l, m);
                    flm[lm] += mult * (zl * ylm[lm]).re;
                }
            }
        }

        dwmpi::allreduce_sum(ctx.comm(), &mut flm);

        flm
    }
}

// linear interpolation of f tabulated on the grid
fn interpolate(grid: &RadialGrid, f: &[f64], x: f64) -> f64 {
    let n = f.len().min(grid.len());
    if n == 0 {
        return 0.0;
    }

    let i = grid.index_of(x);
    if i == 0 {
        return f[0];
    }
    if i >= n {
        return f[n - 1];
    }

    let (x0, x1) = (grid.r(i - 1), grid.r(i));
    let t = (x - x0) / (x1 - x0);

    f[i - 1] * (1.0 - t) + f[i] * t
}

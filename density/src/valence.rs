use crate::{Density, DensityError};
use crystal::AtomType;
use dwconsts::*;
use kscf::{KPoint, KPointSet};
use matrix::Matrix;
use tracing::warn;
use types::c64;

impl<'a> Density<'a> {
    /// Valence density and density matrix of all occupied bands of `kset`.
    pub fn generate_valence(&mut self, kset: &KPointSet) -> Result<(), DensityError> {
        let ctx = self.ctx;
        let cell = ctx.unit_cell();
        let num_mag_dims = ctx.num_mag_dims();

        let wsum: f64 = kset.weights().iter().sum();
        if (wsum - 1.0).abs() > 1.0E-12 && self.is_root() {
            warn!(
                obtained = wsum,
                target = 1.0,
                difference = (wsum - 1.0).abs(),
                "k-point weights are not normalized"
            );
        }

        let occ_val = kset.total_band_weight(ctx.control().num_spin_dims());
        let expected = cell.num_valence_electrons() - ctx.control().get_extra_charge();
        if (occ_val - expected).abs() > 1.0E-8 && self.is_root() {
            warn!(
                obtained = occ_val,
                target = expected,
                difference = (occ_val - expected).abs(),
                "wrong band occupancies"
            );
        }

        for i in 0..self.num_components() {
            self.component_mut(i).zero();
        }
        self.density_matrix.zero();
        self.augmented = false;

        let ntot = ctx.fft_grid().get_ntot();
        let nrg = if num_mag_dims == 3 { 4 } else { ctx.control().num_spins() };
        let mut rho_rg = vec![vec![0.0; ntot]; nrg];

        for (ik, kp) in kset.local_kpoints() {
            self.add_k_point_contribution_rg(kp, &mut rho_rg)?;

            if ctx.full_potential() {
                self.add_k_point_contribution_mt(ik, kp)?;
            } else if cell.max_nbf() > 0 {
                self.add_k_point_contribution_dm(ik, kp)?;
            }
        }

        for f in rho_rg.iter_mut() {
            dwmpi::allreduce_sum(kset.comm(), f);
        }
        self.density_matrix.allreduce(kset.comm());

        match num_mag_dims {
            0 => {
                self.rho.f_rg_mut().copy_from_slice(&rho_rg[0]);
            }
            _ => {
                for ir in 0..ntot {
                    let (up, dn) = (rho_rg[0][ir], rho_rg[1][ir]);

                    self.rho.f_rg_mut()[ir] = up + dn;
                    self.magnetization[0].f_rg_mut()[ir] = up - dn;
                }

                if num_mag_dims == 3 {
                    self.magnetization[1].f_rg_mut().copy_from_slice(&rho_rg[2]);
                    self.magnetization[2].f_rg_mut().copy_from_slice(&rho_rg[3]);
                }
            }
        }

        if ctx.full_potential() {
            self.generate_valence_mt()?;
        }

        for i in 0..self.num_components() {
            self.component_mut(i).rg_to_pw(ctx);
        }

        if ctx.control().get_print_checksum() {
            self.print_checksum("density_matrix", self.density_matrix.checksum());
            self.print_checksum("rho_rg", c64::new(self.rho.checksum_rg(), 0.0));
            let pw = self.rho.checksum_pw(ctx.comm());
            self.print_checksum("rho_pw", pw);
        }

        if !self.paw.is_empty() {
            self.generate_paw_loc_density();
        }

        Ok(())
    }

    fn add_k_point_contribution_rg(&self, kp: &dyn KPoint, rho_rg: &mut [Vec<f64>]) -> Result<(), DensityError> {
        let ctx = self.ctx;
        let gkvec = kp.gkvec();
        let ngk = gkvec.num_gvec();
        let omega = ctx.unit_cell().omega();
        let rgt = ctx.rgtransform();

        let ntot = ctx.fft_grid().get_ntot();
        let mut psi = vec![ZERO_C64; ntot];

        let nspinor = if ctx.num_mag_dims() == 3 { 2 } else { ctx.control().num_spins() };
        for ispn in 0..nspinor {
            check_rows("pw_coeffs rows", kp.pw_coeffs(ispn).nrow(), ngk)?;
        }

        if ctx.num_mag_dims() == 3 {
            let mut psi_dn = vec![ZERO_C64; ntot];

            for ibnd in 0..kp.num_occupied_bands(0) {
                let w = kp.band_weight(ibnd, 0) / omega;
                if w.abs() < EPS14 {
                    continue;
                }

                rgt.g1d_to_r3d(gkvec, kp.pw_coeffs(0).get_col(ibnd), &mut psi);
                rgt.g1d_to_r3d(gkvec, kp.pw_coeffs(1).get_col(ibnd), &mut psi_dn);

                self.kernel.add_spinor_density(&psi, &psi_dn, w, rho_rg);
            }
        } else {
            for (ispn, rho) in rho_rg.iter_mut().enumerate() {
                for ibnd in 0..kp.num_occupied_bands(ispn) {
                    let w = kp.band_weight(ibnd, ispn) / omega;
                    if w.abs() < EPS14 {
                        continue;
                    }

                    rgt.g1d_to_r3d(gkvec, kp.pw_coeffs(ispn).get_col(ibnd), &mut psi);

                    self.kernel.add_band_density(&psi, w, rho);
                }
            }
        }

        Ok(())
    }

    fn add_k_point_contribution_dm(&mut self, ik: usize, kp: &dyn KPoint) -> Result<(), DensityError> {
        let ctx = self.ctx;
        let cell = ctx.unit_cell();
        let num_mag_dims = ctx.num_mag_dims();

        let betas = kp.beta_projectors().ok_or(DensityError::MissingBetaProjectors { ik })?;
        check_rows("beta projector rows", betas.num_gkvec(), kp.gkvec().num_gvec())?;

        let reduced = kp.gkvec().reduced();
        let nbnd = kp.num_bands();

        // (channel of the coefficients, channel of the occupancy)
        let channels: Vec<(usize, usize)> = match num_mag_dims {
            0 => vec![(0, 0)],
            1 => vec![(0, 0), (1, 1)],
            _ => vec![(0, 0), (1, 0)],
        };

        for ic in 0..betas.num_chunks() {
            let bp: Vec<Matrix<c64>> = channels
                .iter()
                .map(|&(ispn, _)| {
                    if reduced {
                        real_to_complex(&betas.inner_real(ic, kp.pw_coeffs(ispn)))
                    } else {
                        betas.inner(ic, kp.pw_coeffs(ispn))
                    }
                })
                .collect();

            let chunk = betas.chunk(ic);

            for (i, &ia) in chunk.atoms.iter().enumerate() {
                let atype = cell.atom_type_of(ia);
                let nbf = atype.nbf();
                let off = chunk.offsets[i];

                let mut bp_atom: Vec<Matrix<c64>> = bp.iter().map(|m| atom_rows(m, off, nbf)).collect();

                if num_mag_dims == 3 {
                    if atype.spin_orbit() {
                        let (up, dn) = spin_orbit_rotate(atype, &bp_atom[0], &bp_atom[1]);
                        bp_atom = vec![up, dn];
                    }

                    let w: Vec<f64> = (0..nbnd).map(|ib| kp.band_weight(ib, 0)).collect();

                    self.kernel
                        .add_density_matrix(&bp_atom[0], &bp_atom[0], &w, self.density_matrix.block_mut(0, ia));
                    self.kernel
                        .add_density_matrix(&bp_atom[1], &bp_atom[1], &w, self.density_matrix.block_mut(1, ia));
                    self.kernel
                        .add_density_matrix(&bp_atom[0], &bp_atom[1], &w, self.density_matrix.block_mut(2, ia));
                } else {
                    for (comp, &(_, iocc)) in channels.iter().enumerate() {
                        let w: Vec<f64> = (0..nbnd).map(|ib| kp.band_weight(ib, iocc)).collect();

                        self.kernel.add_density_matrix(
                            &bp_atom[comp],
                            &bp_atom[comp],
                            &w,
                            self.density_matrix.block_mut(comp, ia),
                        );
                    }
                }
            }
        }

        Ok(())
    }

    fn add_k_point_contribution_mt(&mut self, ik: usize, kp: &dyn KPoint) -> Result<(), DensityError> {
        let ctx = self.ctx;
        let cell = ctx.unit_cell();
        let num_mag_dims = ctx.num_mag_dims();
        let nbnd = kp.num_bands();

        let nspinor = if num_mag_dims == 0 { 1 } else { 2 };

        let coeffs: Vec<&Matrix<c64>> = (0..nspinor)
            .map(|ispn| kp.mt_coeffs(ispn).ok_or(DensityError::MissingMtCoeffs { ik }))
            .collect::<Result<_, _>>()?;

        for ia in 0..cell.num_atoms() {
            let nbf = cell.atom_type_of(ia).mt_nbf();
            if nbf == 0 {
                continue;
            }

            let off = kp.mt_offset(ia);
            for c in coeffs.iter() {
                if off + nbf > c.nrow() {
                    return Err(DensityError::ShapeMismatch {
                        what: "muffin-tin coefficient rows",
                        found: c.nrow(),
                        expected: off + nbf,
                    });
                }
            }

            let a: Vec<Matrix<c64>> = coeffs.iter().map(|c| atom_rows(c, off, nbf)).collect();

            match num_mag_dims {
                0 => {
                    let w: Vec<f64> = (0..nbnd).map(|ib| kp.band_weight(ib, 0)).collect();
                    self.kernel
                        .add_density_matrix(&a[0], &a[0], &w, self.density_matrix.block_mut(0, ia));
                }
                1 => {
                    for ispn in 0..2 {
                        let w: Vec<f64> = (0..nbnd).map(|ib| kp.band_weight(ib, ispn)).collect();
                        self.kernel.add_density_matrix(
                            &a[ispn],
                            &a[ispn],
                            &w,
                            self.density_matrix.block_mut(ispn, ia),
                        );
                    }
                }
                _ => {
                    let w: Vec<f64> = (0..nbnd).map(|ib| kp.band_weight(ib, 0)).collect();

                    self.kernel
                        .add_density_matrix(&a[0], &a[0], &w, self.density_matrix.block_mut(0, ia));
                    self.kernel
                        .add_density_matrix(&a[1], &a[1], &w, self.density_matrix.block_mut(1, ia));
                    self.kernel
                        .add_density_matrix(&a[0], &a[1], &w, self.density_matrix.block_mut(2, ia));
                }
            }
        }

        Ok(())
    }
}

fn check_rows(what: &'static str, found: usize, expected: usize) -> Result<(), DensityError> {
    if found != expected {
        return Err(DensityError::ShapeMismatch { what, found, expected });
    }

    Ok(())
}

// rows [off, off + n) of m
fn atom_rows(m: &Matrix<c64>, off: usize, n: usize) -> Matrix<c64> {
    let mut out = Matrix::<c64>::new(n, m.ncol());

    for j in 0..m.ncol() {
        out.get_mut_col(j).copy_from_slice(&m.get_col(j)[off..off + n]);
    }

    out
}

fn real_to_complex(m: &Matrix<f64>) -> Matrix<c64> {
    let data: Vec<c64> = m.as_slice().iter().map(|&x| c64::new(x, 0.0)).collect();

    Matrix::<c64>::from_col_slice(m.nrow(), m.ncol(), &data)
}

// bp'_s(xi) = sum_{xi' ~ xi} sum_s' f(xi, xi', s, s') bp_s'(xi')
fn spin_orbit_rotate(atype: &AtomType, up: &Matrix<c64>, dn: &Matrix<c64>) -> (Matrix<c64>, Matrix<c64>) {
    let nbf = up.nrow();
    let nbnd = up.ncol();

    let mut out = [Matrix::<c64>::new(nbf, nbnd), Matrix::<c64>::new(nbf, nbnd)];
    let src = [up, dn];

    for xi in 0..nbf {
        for xi1 in 0..nbf {
            if !atype.compare_index_beta_functions(xi, xi1) {
                continue;
            }

            for (s, o) in out.iter_mut().enumerate() {
                for (s1, b) in src.iter().enumerate() {
                    let f = atype.f_coefficients(xi, xi1, s, s1);
                    if f == ZERO_C64 {
                        continue;
                    }

                    for ib in 0..nbnd {
                        o[[xi, ib]] += f * b[[xi1, ib]];
                    }
                }
            }
        }
    }

    let [u, d] = out;
    (u, d)
}

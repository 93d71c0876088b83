use crate::{inner_product, HubbardError, HubbardPotential};
use dwconsts::*;
use kscf::KPointSet;
use matrix::Matrix;
use types::c64;

impl<'a> HubbardPotential<'a> {
    /// Diagonal starting occupation from the orbital occupancy and the starting moment of each atom.
    ///
    /// The majority channel is filled first; in non-collinear runs the resulting spin
    /// density matrix is rotated onto the direction of the moment.
    pub fn calculate_initial_occupation_numbers(&mut self) {
        self.occupation.set_value(ZERO_C64);

        let cell = self.ctx.unit_cell();
        let num_mag_dims = self.ctx.num_mag_dims();
        let num_spins = self.ctx.control().num_spins();

        for ia in 0..cell.num_atoms() {
            let orb = match self.hubbard_orbital(ia) {
                Some(orb) => orb,
                None => continue,
            };

            let n = 2 * orb.l + 1;
            let charge = orb.occupancy;
            let v = cell.atom(ia).get_vector_field();

            let (majority, minority) = if charge > n as f64 {
                (1.0, (charge - n as f64) / n as f64)
            } else {
                (charge / n as f64, 0.0)
            };

            match num_mag_dims {
                0 => {
                    for m in 0..n {
                        self.occupation[[m, m, 0, ia, 0]] = c64::new(0.5 * charge / n as f64, 0.0);
                    }
                }
                1 if v.z.abs() < EPS8 => {
                    for is in 0..num_spins {
                        for m in 0..n {
                            self.occupation[[m, m, is, ia, 0]] = c64::new(0.5 * charge / n as f64, 0.0);
                        }
                    }
                }
                1 => {
                    let (up, dn) = if v.z > 0.0 { (majority, minority) } else { (minority, majority) };

                    for m in 0..n {
                        self.occupation[[m, m, 0, ia, 0]] = c64::new(up, 0.0);
                        self.occupation[[m, m, 1, ia, 0]] = c64::new(dn, 0.0);
                    }
                }
                _ => {
                    let len = v.norm2();

                    if len < EPS8 {
                        for m in 0..n {
                            self.occupation[[m, m, 0, ia, 0]] = c64::new(0.5 * charge / n as f64, 0.0);
                            self.occupation[[m, m, 1, ia, 0]] = c64::new(0.5 * charge / n as f64, 0.0);
                        }
                        continue;
                    }

                    let nc = majority + minority;
                    let mag = majority - minority;

                    // 1/2 (nc + mag sigma.e), e = v / |v|
                    let cos_theta = v.z / len;
                    let ud = c64::new(v.x, -v.y) * (0.5 * mag / len);

                    for m in 0..n {
                        self.occupation[[m, m, 0, ia, 0]] = c64::new(0.5 * (nc + mag * cos_theta), 0.0);
                        self.occupation[[m, m, 1, ia, 0]] = c64::new(0.5 * (nc - mag * cos_theta), 0.0);
                        self.occupation[[m, m, 2, ia, 0]] = ud;
                        self.occupation[[m, m, 3, ia, 0]] = ud.conj();
                    }
                }
            }
        }
    }

    /// Occupation numbers n(m1, m2) = sum_k sum_n w f <S phi_m1|psi> <psi|S phi_m2>
    /// from the Hubbard orbitals stored on each local k-point.
    pub fn hubbard_compute_occupation_numbers(&mut self, kset: &KPointSet) -> Result<(), HubbardError> {
        self.occupation.set_value(ZERO_C64);

        if !self.enabled {
            return Ok(());
        }

        let num_mag_dims = self.ctx.num_mag_dims();
        let num_spins = self.ctx.control().num_spins();

        // non-magnetic bands hold both spins
        let scale = if num_mag_dims == 0 { 0.5 } else { 1.0 };

        for (ik, kp) in kset.local_kpoints() {
            let sphi = kp.hubbard_orbitals().ok_or(HubbardError::MissingOrbitals { ik })?;
            let reduced = kp.gkvec().reduced();

            if self.noncollinear {
                let nbnd = kp.num_occupied_bands(0);
                let weights: Vec<f64> = (0..nbnd).map(|ibnd| kp.band_weight(ibnd, 0)).collect();

                let proj: Vec<Matrix<c64>> = (0..2)
                    .map(|ispn| inner_product(sphi, kp.pw_coeffs(ispn), reduced))
                    .collect();

                for (s1, s2, block) in [(0, 0, 0), (1, 1, 1), (0, 1, 2), (1, 0, 3)].iter() {
                    self.accumulate(&proj[*s1], &proj[*s2], &weights, *block);
                }
            } else {
                for ispn in 0..num_spins {
                    let nbnd = kp.num_occupied_bands(ispn);
                    let proj = inner_product(sphi, kp.pw_coeffs(ispn), reduced);

                    let weights: Vec<f64> = (0..nbnd).map(|ibnd| scale * kp.band_weight(ibnd, ispn)).collect();
                    self.accumulate(&proj, &proj, &weights, ispn);
                }
            }
        }

        dwmpi::allreduce_sum(kset.comm(), self.occupation.as_mut_slice());

        self.symmetrize_occupation_hermitian();

        Ok(())
    }

    // n(m1, m2, block) += sum_n w_n p1(m1, n) conj(p2(m2, n)) on every Hubbard atom
    fn accumulate(&mut self, p1: &Matrix<c64>, p2: &Matrix<c64>, weights: &[f64], block: usize) {
        for ia in 0..self.offsets.len() {
            let (offs, orb) = match (self.offsets[ia], self.hubbard_orbital(ia)) {
                (Some(offs), Some(orb)) => (offs, orb),
                _ => continue,
            };

            let n = 2 * orb.l + 1;

            for m2 in 0..n {
                for m1 in 0..n {
                    let z: c64 = weights
                        .iter()
                        .enumerate()
                        .map(|(ibnd, w)| *w * p1[[offs + m1, ibnd]] * p2[[offs + m2, ibnd]].conj())
                        .sum();

                    self.occupation[[m1, m2, block, ia, 0]] += z;
                }
            }
        }
    }

    /// n^{ss'}(m1, m2) = conj(n^{s's}(m2, m1)).
    pub fn symmetrize_occupation_hermitian(&mut self) {
        let nblocks = self.num_spin_blocks();

        for ia in 0..self.offsets.len() {
            let n = match self.hubbard_orbital(ia) {
                Some(orb) => 2 * orb.l + 1,
                None => continue,
            };

            for is in 0..nblocks.min(2) {
                for m2 in 0..n {
                    for m1 in 0..=m2 {
                        let z = 0.5 * (self.occupation[[m1, m2, is, ia, 0]] + self.occupation[[m2, m1, is, ia, 0]].conj());

                        self.occupation[[m1, m2, is, ia, 0]] = z;
                        self.occupation[[m2, m1, is, ia, 0]] = z.conj();
                    }
                }
            }

            if nblocks == 4 {
                for m2 in 0..n {
                    for m1 in 0..n {
                        let z = 0.5 * (self.occupation[[m1, m2, 2, ia, 0]] + self.occupation[[m2, m1, 3, ia, 0]].conj());

                        self.occupation[[m1, m2, 2, ia, 0]] = z;
                        self.occupation[[m2, m1, 3, ia, 0]] = z.conj();
                    }
                }
            }
        }
    }
}

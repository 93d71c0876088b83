use crate::{inner_product, use_parallel_for_len, HubbardError, HubbardPotential};
use dwconsts::*;
use kscf::{KPoint, KPointSet};
use matrix::Matrix;
use rayon::prelude::*;
use special::real_ylm_all_of_vector;
use types::c64;
use vnl::{BetaProjectors, NonLocalOperator, SpinBlock};

impl<'a> HubbardPotential<'a> {
    /// Hubbard orbitals of one k-point, stored on it with S applied.
    ///
    /// phi_{a,lm}(G+k) = 4pi / sqrt(omega) (-i)^l R_lm(G+k) int phi_a(r) j_l(|G+k| r) r^2 dr exp(-i (G+k).r_a)
    pub fn generate_atomic_orbitals(&self, kp: &mut dyn KPoint, ik: usize) -> Result<(), HubbardError> {
        if !self.enabled {
            return Ok(());
        }

        let ctx = self.ctx;
        let cell = ctx.unit_cell();
        let gkvec = kp.gkvec();
        let ngk = gkvec.num_gvec();
        let reduced = gkvec.reduced();

        let fact = FOURPI / cell.omega().sqrt();

        let ylm: Vec<Vec<f64>> = (0..ngk)
            .map(|ig| real_ylm_all_of_vector(self.lmax, gkvec.gkvec_cart(ig)))
            .collect();
        let kg: Vec<f64> = (0..ngk).map(|ig| gkvec.gkvec_cart(ig).norm2()).collect();

        // radial transform per Hubbard type
        let radial: Vec<Option<Vec<f64>>> = cell
            .atom_types()
            .iter()
            .map(|atype| {
                let orb = atype.get_hubbard_orbitals().first()?;
                let grid = atype.get_radial_grid();
                let f = &orb.f;

                let transform = |q: &f64| fact * grid.bessel_transform(f, orb.l, *q, 1);

                Some(if use_parallel_for_len(ngk) {
                    kg.par_iter().map(transform).collect()
                } else {
                    kg.iter().map(transform).collect()
                })
            })
            .collect();

        let mut phi = Matrix::<c64>::new(ngk, self.num_orbitals);

        for ia in 0..cell.num_atoms() {
            let (offs, orb) = match (self.offsets[ia], self.hubbard_orbital(ia)) {
                (Some(offs), Some(orb)) => (offs, orb),
                _ => continue,
            };

            let rf = match radial[cell.atom(ia).get_type_id()].as_ref() {
                Some(rf) => rf,
                None => continue,
            };

            let l = orb.l;
            let phase = fhkl::compute_gk_phase_factors_one_atom(gkvec, cell.atom(ia).get_position());
            let zl = vnl::minus_i_pow(l);

            for m in 0..2 * l + 1 {
                let lm = l * l + m;
                let col = phi.get_mut_col(offs + m);

                for ig in 0..ngk {
                    col[ig] = zl * ylm[ig][lm] * rf[ig] * phase[ig];
                }
            }
        }

        let mut sphi = phi.clone();

        if cell.augment() {
            let betas = kp.beta_projectors().ok_or(HubbardError::MissingBetaProjectors { ik })?;
            apply_s_operator(self, betas, &phi, &mut sphi, reduced);
        }

        if self.orthogonalize || self.normalize {
            let overlap = inner_product(&phi, &sphi, reduced);
            let n = overlap.nrow();

            let transform = if self.orthogonalize {
                overlap.inverse_sqrt_hermitian().ok_or(HubbardError::SingularOverlap { ik })?
            } else {
                let mut t = Matrix::<c64>::new(n, n);

                for i in 0..n {
                    let d = overlap[[i, i]].re;
                    if d <= EPS12 {
                        return Err(HubbardError::SingularOverlap { ik });
                    }
                    t[[i, i]] = c64::new(1.0 / d.sqrt(), 0.0);
                }

                t
            };

            let mut out = Matrix::<c64>::new(ngk, n);
            Matrix::<c64>::gemm(ONE_C64, &sphi, false, &transform, ZERO_C64, &mut out);
            sphi = out;
        }

        kp.set_hubbard_orbitals(sphi);

        Ok(())
    }

    /// `generate_atomic_orbitals` on every local k-point of `kset`.
    pub fn generate_atomic_orbitals_kset(&self, kset: &mut KPointSet) -> Result<(), HubbardError> {
        for (ik, kp) in kset.local_kpoints_mut() {
            self.generate_atomic_orbitals(kp.as_mut(), ik)?;
        }

        Ok(())
    }

    /// hphi += sum |S phi_m2> V(m1, m2) <S phi_m1|phi> for spin channel `ispn` (collinear).
    pub fn apply_hubbard_potential(
        &self,
        kp: &dyn KPoint,
        ik: usize,
        ispn: usize,
        phi: &Matrix<c64>,
        hphi: &mut Matrix<c64>,
    ) -> Result<(), HubbardError> {
        if !self.enabled {
            return Ok(());
        }

        let sphi = kp.hubbard_orbitals().ok_or(HubbardError::MissingOrbitals { ik })?;
        let proj = inner_product(sphi, phi, kp.gkvec().reduced());

        let mut coeffs = Matrix::<c64>::new(self.num_orbitals, phi.ncol());
        self.add_potential_times_projection(&proj, ispn, &mut coeffs);

        Matrix::<c64>::gemm(ONE_C64, sphi, false, &coeffs, ONE_C64, hphi);

        Ok(())
    }

    /// Spinor version: (H psi)^{s'} += sum |S phi_m2> V^{s s'}(m1, m2) <S phi_m1|psi^s>.
    pub fn apply_hubbard_potential_spinor(
        &self,
        kp: &dyn KPoint,
        ik: usize,
        phi: &[Matrix<c64>; 2],
        hphi: &mut [Matrix<c64>; 2],
    ) -> Result<(), HubbardError> {
        if !self.enabled {
            return Ok(());
        }

        let sphi = kp.hubbard_orbitals().ok_or(HubbardError::MissingOrbitals { ik })?;
        let reduced = kp.gkvec().reduced();

        let proj = [inner_product(sphi, &phi[0], reduced), inner_product(sphi, &phi[1], reduced)];

        for s2 in 0..2 {
            let mut coeffs = Matrix::<c64>::new(self.num_orbitals, phi[0].ncol());

            for (s1, p) in proj.iter().enumerate() {
                self.add_potential_times_projection(p, spin_block_index(s1, s2), &mut coeffs);
            }

            Matrix::<c64>::gemm(ONE_C64, sphi, false, &coeffs, ONE_C64, &mut hphi[s2]);
        }

        Ok(())
    }

    // coeffs(m2, n) += sum_m1 V(m1, m2) proj(m1, n) atom by atom
    fn add_potential_times_projection(&self, proj: &Matrix<c64>, block: usize, coeffs: &mut Matrix<c64>) {
        for ia in 0..self.offsets.len() {
            let (offs, orb) = match (self.offsets[ia], self.hubbard_orbital(ia)) {
                (Some(offs), Some(orb)) => (offs, orb),
                _ => continue,
            };

            let n = 2 * orb.l + 1;

            for j in 0..proj.ncol() {
                for m2 in 0..n {
                    let mut z = ZERO_C64;

                    for m1 in 0..n {
                        z += self.potential[[m1, m2, block, ia, 0]] * proj[[offs + m1, j]];
                    }

                    coeffs[[offs + m2, j]] += z;
                }
            }
        }
    }
}

// (s, s') -> 0 up-up, 1 dn-dn, 2 up-dn, 3 dn-up
fn spin_block_index(s1: usize, s2: usize) -> usize {
    match (s1, s2) {
        (0, 0) => 0,
        (1, 1) => 1,
        (0, 1) => 2,
        _ => 3,
    }
}

// sphi += sum_chunks |beta> Q <beta|phi>
fn apply_s_operator(hub: &HubbardPotential, betas: &BetaProjectors, phi: &Matrix<c64>, sphi: &mut Matrix<c64>, reduced: bool) {
    let ctx = hub.ctx;
    let q_op = NonLocalOperator::q_operator(ctx.unit_cell(), ctx.augmentation_ops());

    for ic in 0..betas.num_chunks() {
        let beta_phi = if reduced {
            let re = betas.inner_real(ic, phi);
            let mut z = Matrix::<c64>::new(re.nrow(), re.ncol());

            for (dst, src) in z.as_mut_slice().iter_mut().zip(re.as_slice().iter()) {
                *dst = c64::new(*src, 0.0);
            }

            z
        } else {
            betas.inner(ic, phi)
        };

        q_op.apply(betas, ic, SpinBlock::UpUp, &beta_phi, sphi);
    }
}

use crate::Density;
use crystal::packed_index;
use dwconsts::*;
use matrix::Matrix;
use types::c64;

impl<'a> Density<'a> {
    /// Add the augmentation charge to the PW coefficients of every component.
    ///
    /// Applied once per generated valence density; later calls are no-ops until the next
    /// `generate_valence`.
    pub fn augment(&mut self) {
        if self.augmented || !self.ctx.unit_cell().augment() {
            return;
        }

        let rho_aug = self.generate_rho_aug();

        for (i, aug) in rho_aug.iter().enumerate() {
            for (v, a) in self.component_mut(i).f_pw_local_mut().iter_mut().zip(aug.iter()) {
                *v += *a;
            }
        }

        self.augmented = true;

        if self.ctx.control().get_print_checksum() {
            let s: c64 = rho_aug[0].iter().sum();
            let s = dwmpi::allreduce_sum_scalar(self.ctx.comm(), s);

            self.print_checksum("rho_aug", s);
        }
    }

    pub fn is_augmented(&self) -> bool {
        self.augmented
    }

    /// Real (num_idx12 x num_atoms_of_type) matrices of pair combinations, one per component.
    pub fn density_matrix_aux(&self, iat: usize) -> Vec<Matrix<f64>> {
        let cell = self.ctx.unit_cell();
        let atoms = cell.atoms_of_type(iat);
        let nbf = cell.atom_type(iat).nbf();
        let nidx12 = nbf * (nbf + 1) / 2;

        let mut aux = vec![Matrix::<f64>::new(nidx12, atoms.len()); self.num_components()];

        for (i, &ia) in atoms.iter().enumerate() {
            for xi2 in 0..nbf {
                for xi1 in 0..=xi2 {
                    let idx12 = packed_index(xi1, xi2);
                    let v = self.density_matrix.aux(xi1, xi2, ia);

                    for (comp, m) in aux.iter_mut().enumerate() {
                        m[[idx12, i]] = v[comp];
                    }
                }
            }
        }

        aux
    }

    /// Local PW coefficients of the augmentation charge, one vector per component.
    pub fn generate_rho_aug(&self) -> Vec<Vec<c64>> {
        let ctx = self.ctx;
        let cell = ctx.unit_cell();
        let gvec = ctx.gvec();
        let range = ctx.gvec_range();
        let ngv = range.len();

        let mut rho_aug = vec![vec![ZERO_C64; ngv]; self.num_components()];

        for (iat, aug) in ctx.augmentation_ops().iter().enumerate() {
            let aug = match aug {
                Some(aug) => aug,
                None => continue,
            };

            let atoms = cell.atoms_of_type(iat);
            if atoms.is_empty() || aug.num_idx12() == 0 {
                continue;
            }

            aug.prepare(ctx.processing_unit());

            // exp(-i G r_a), re/im interleaved per G like q_pw
            let mut phase = Matrix::<f64>::new(atoms.len(), 2 * ngv);

            for (i, &ia) in atoms.iter().enumerate() {
                let pos = cell.atom(ia).get_position();
                let pf = fhkl::compute_phase_factors_one_atom(gvec, range.clone(), pos);

                for (igloc, z) in pf.iter().enumerate() {
                    phase[[i, 2 * igloc]] = z.re;
                    phase[[i, 2 * igloc + 1]] = z.im;
                }
            }

            let aux = self.density_matrix_aux(iat);

            for (comp, m) in aux.iter().enumerate() {
                let mut d_pw = Matrix::<f64>::new(aug.num_idx12(), 2 * ngv);
                Matrix::<f64>::gemm(1.0, m, false, &phase, false, 0.0, &mut d_pw);

                self.kernel.add_rho_aug(aug, &d_pw, &mut rho_aug[comp]);
            }

            aug.dismiss();
        }

        rho_aug
    }
}

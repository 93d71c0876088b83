use crate::{Density, DensityError};
use matrix::Matrix;
use special::RealGaunt;
use utility::lmmax;

impl<'a> Density<'a> {
    /// Muffin-tin (lm, r) expansion of the valence density from the muffin-tin density matrix.
    ///
    /// Only the atoms local to this rank are filled; `generate` sums the parts.
    pub fn generate_valence_mt(&mut self) -> Result<(), DensityError> {
        let ctx = self.ctx;

        if ctx.control().get_hubbard_correction() {
            return Err(DensityError::Unimplemented("muffin-tin Hubbard occupation matrix"));
        }

        let cell = ctx.unit_cell();
        let lmax_rho = ctx.control().get_lmax_rho();
        let lmmax_rho = lmmax(lmax_rho);
        let ncomp = self.num_components();

        for ia in 0..cell.num_atoms() {
            if !ctx.is_local_atom(ia) {
                continue;
            }

            let atype = cell.atom_type_of(ia);
            let indexb = atype.mt_indexb();
            let nbf = indexb.size();
            if nbf == 0 {
                continue;
            }

            let nr = atype.num_mt_points();
            let radial = atype.get_mt_radial();
            let lmax_mt = indexb.lmax();
            let gaunt = RealGaunt::new(lmax_mt, lmax_rho, lmax_mt);

            // real combinations summed over all (xi1, xi2)
            let mut dm = vec![vec![0.0; nbf * nbf]; ncomp];

            for xi2 in 0..nbf {
                for xi1 in 0..nbf {
                    let v = self.mt_pair_values(xi1, xi2, ia);

                    for (comp, d) in dm.iter_mut().enumerate() {
                        d[xi1 + nbf * xi2] = v[comp];
                    }
                }
            }

            let mut f_mt = vec![Matrix::<f64>::new(lmmax_rho, nr); ncomp];

            for xi2 in 0..nbf {
                let b2 = indexb.get(xi2);
                let u2 = &radial[b2.idxrf].f;

                for xi1 in 0..nbf {
                    let b1 = indexb.get(xi1);
                    let u1 = &radial[b1.idxrf].f;

                    for &(lm, coef) in gaunt.nonzero(b1.lm, b2.lm).iter() {
                        if lm >= lmmax_rho {
                            continue;
                        }

                        for (comp, f) in f_mt.iter_mut().enumerate() {
                            let d = dm[comp][xi1 + nbf * xi2] * coef;
                            if d == 0.0 {
                                continue;
                            }

                            for ir in 0..nr.min(u1.len()).min(u2.len()) {
                                f[[lm, ir]] += d * u1[ir] * u2[ir];
                            }
                        }
                    }
                }
            }

            for (comp, f) in f_mt.into_iter().enumerate() {
                *self.component_mut(comp).f_mt_mut(ia) = f;
            }
        }

        Ok(())
    }

    // rho, mz, mx, my weights of one ordered pair
    fn mt_pair_values(&self, xi1: usize, xi2: usize, ia: usize) -> [f64; 4] {
        let dm = &self.density_matrix;
        let mut out = [0.0; 4];

        match dm.num_comp() {
            1 => {
                out[0] = dm.get(xi1, xi2, 0, ia).re;
            }
            2 => {
                let (uu, dd) = (dm.get(xi1, xi2, 0, ia), dm.get(xi1, xi2, 1, ia));
                out[0] = (uu + dd).re;
                out[1] = (uu - dd).re;
            }
            _ => {
                let (uu, dd) = (dm.get(xi1, xi2, 0, ia), dm.get(xi1, xi2, 1, ia));
                let ud = dm.get(xi1, xi2, 2, ia);

                out[0] = (uu + dd).re;
                out[1] = (uu - dd).re;
                out[2] = 2.0 * ud.re;
                out[3] = 2.0 * ud.im;
            }
        }

        out
    }
}

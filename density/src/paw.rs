use crate::Density;
use dwconsts::*;
use matrix::Matrix;
use special::RealGaunt;
use types::c64;
use utility::{l_by_lm, lmmax};

/// All-electron and pseudo one-centre densities of a PAW atom, (lm, r) per component.
#[derive(Debug, Clone)]
pub struct PawDensity {
    ia: usize,
    lmax: usize,
    ae: Vec<Matrix<f64>>,
    ps: Vec<Matrix<f64>>,
}

impl PawDensity {
    pub fn atom(&self) -> usize {
        self.ia
    }

    pub fn lmax(&self) -> usize {
        self.lmax
    }

    pub fn ae(&self, comp: usize) -> &Matrix<f64> {
        &self.ae[comp]
    }

    pub fn ps(&self, comp: usize) -> &Matrix<f64> {
        &self.ps[comp]
    }
}

impl<'a> Density<'a> {
    /// Allocate the one-centre densities of all PAW atoms.
    pub fn init_paw(&mut self) {
        let cell = self.ctx.unit_cell();
        let ncomp = self.num_components();

        self.paw = cell
            .paw_atoms()
            .into_iter()
            .filter_map(|ia| {
                let atype = cell.atom_type_of(ia);
                let nr = paw_num_points(atype)?;
                let lmax = 2 * atype.indexb().lmax();
                let n = lmmax(lmax);

                Some(PawDensity {
                    ia,
                    lmax,
                    ae: vec![Matrix::<f64>::new(n, nr); ncomp],
                    ps: vec![Matrix::<f64>::new(n, nr); ncomp],
                })
            })
            .collect();
    }

    /// Diagonal density matrix of PAW atoms from the partial-wave occupations.
    ///
    /// With magnetism the occupation is split by the clamped starting moment along z.
    pub fn init_density_matrix_for_paw(&mut self) {
        let cell = self.ctx.unit_cell();
        let num_mag_dims = self.ctx.num_mag_dims();

        for ia in cell.paw_atoms() {
            let atype = cell.atom_type_of(ia);
            let paw = match atype.get_paw() {
                Some(p) => p,
                None => continue,
            };

            for v in self.density_matrix.atom_mut(ia).iter_mut() {
                *v = ZERO_C64;
            }

            let nm = cell.atom(ia).get_vector_field().z.max(-1.0).min(1.0);

            for (xi, b) in atype.indexb().iter().enumerate() {
                let occ = paw.occupations[b.idxrf] / (2 * b.l + 1) as f64;

                if num_mag_dims == 0 {
                    self.density_matrix.set(xi, xi, 0, ia, c64::new(occ, 0.0));
                } else {
                    self.density_matrix.set(xi, xi, 0, ia, c64::new(0.5 * (1.0 + nm) * occ, 0.0));
                    self.density_matrix.set(xi, xi, 1, ia, c64::new(0.5 * (1.0 - nm) * occ, 0.0));
                }
            }
        }
    }

    /// One-centre densities from the current density matrix.
    ///
    /// ae = sum D G phi_1 phi_2 / r^2, ps = sum D G (phi~_1 phi~_2 + Q_12^l) / r^2.
    pub fn generate_paw_loc_density(&mut self) {
        let cell = self.ctx.unit_cell();
        let ncomp = self.num_components();

        for ipaw in 0..self.paw.len() {
            let ia = self.paw[ipaw].ia;
            let lmax = self.paw[ipaw].lmax;

            let atype = cell.atom_type_of(ia);
            let paw = match atype.get_paw() {
                Some(p) => p,
                None => continue,
            };

            let indexb = atype.indexb();
            let grid = atype.get_radial_grid();
            let nbf = indexb.size();
            let nr = self.paw[ipaw].ae[0].ncol();
            let n = lmmax(lmax);

            let gaunt = RealGaunt::new(indexb.lmax(), lmax, indexb.lmax());
            let lofs = l_by_lm(lmax);

            let mut ae = vec![Matrix::<f64>::new(n, nr); ncomp];
            let mut ps = vec![Matrix::<f64>::new(n, nr); ncomp];

            for xi2 in 0..nbf {
                let b2 = indexb.get(xi2);

                for xi1 in 0..=xi2 {
                    let b1 = indexb.get(xi1);

                    let diag = if xi1 == xi2 { 1.0 } else { 2.0 };
                    let aux = self.density_matrix.aux(xi1, xi2, ia);

                    let (rf1, rf2) = (b1.idxrf, b2.idxrf);

                    for &(lm3, coef) in gaunt.nonzero(b1.lm, b2.lm).iter() {
                        let l3 = lofs[lm3];

                        let (q1, q2) = if rf1 <= rf2 { (rf1, rf2) } else { (rf2, rf1) };
                        let qf = atype
                            .get_q_radial()
                            .iter()
                            .find(|q| q.idxrf1 == q1 && q.idxrf2 == q2 && q.l == l3)
                            .map(|q| q.f.as_slice());

                        for ir in 0..nr {
                            let r = grid.r(ir);
                            if r < 1.0E-12 {
                                continue;
                            }
                            let inv_r2 = 1.0 / (r * r);

                            let ae_val = paw.ae_wfc[rf1][ir] * paw.ae_wfc[rf2][ir] * inv_r2;
                            let q = qf.and_then(|f| f.get(ir)).copied().unwrap_or(0.0);
                            let ps_val = (paw.ps_wfc[rf1][ir] * paw.ps_wfc[rf2][ir] + q) * inv_r2;

                            for comp in 0..ncomp {
                                let d = aux[comp] * diag * coef;

                                ae[comp][[lm3, ir]] += d * ae_val;
                                ps[comp][[lm3, ir]] += d * ps_val;
                            }
                        }
                    }
                }
            }

            self.paw[ipaw].ae = ae;
            self.paw[ipaw].ps = ps;
        }
    }
}

// points covered by every partial wave, limited to the PAW cutoff when given
fn paw_num_points(atype: &crystal::AtomType) -> Option<usize> {
    let paw = atype.get_paw()?;

    let mut nr = atype.get_radial_grid().len();
    if paw.cutoff_index > 0 {
        nr = nr.min(paw.cutoff_index);
    }

    for f in paw.ae_wfc.iter().chain(paw.ps_wfc.iter()) {
        nr = nr.min(f.len());
    }

    Some(nr)
}

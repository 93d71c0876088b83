use crate::{minus_i_pow, use_parallel_for_len};
use crystal::{packed_index, AtomType};
use dwconsts::*;
use gvector::Gvec;
use matrix::Matrix;
use rayon::prelude::*;
use special::RealGaunt;
use std::sync::{Arc, Mutex};
use tracing::debug;
use types::ProcessingUnit;

/// Plane-wave form factors Q_{xi1 xi2}(G) of one atom type on the local G-vector slice.
///
/// `q_pw` is (num_idx12 x 2 * num_gvec_loc): column 2ig holds Re Q(G), column 2ig+1 holds Im Q(G).
#[derive(Debug)]
pub struct AugmentationOperator {
    atom_type: usize,
    nbf: usize,
    gvec_offset: usize,
    num_gvec_loc: usize,
    q_pw: Matrix<f64>,
    sym_weight: Vec<f64>,
    q_mtrx: Matrix<f64>,
    device_q_pw: Mutex<Option<Arc<Vec<f64>>>>,
}

impl AugmentationOperator {
    /// Form factors of type `iat` for the G-vectors owned by `rank` in `gvec`.
    pub fn new(atype: &AtomType, iat: usize, gvec: &Gvec, rank: usize, omega: f64) -> AugmentationOperator {
        let indexb = atype.indexb();
        let nbf = indexb.size();
        let nidx12 = indexb.size_packed();

        let gvec_offset = gvec.gvec_offset(rank);
        let num_gvec_loc = gvec.gvec_count(rank);

        let lmax_beta = indexb.lmax();
        let lmax_q = 2 * lmax_beta;
        let gaunt = RealGaunt::new(lmax_beta, lmax_beta, lmax_q);

        let grid = atype.get_radial_grid();
        let nrf = indexb.num_radial();

        // radial integrals per shell, per (rf1 <= rf2, l)
        let nshells = gvec.num_shells();
        let qri_index = |rf1: usize, rf2: usize, l: usize| -> usize { (rf2 * (rf2 + 1) / 2 + rf1) * (lmax_q + 1) + l };
        let nqri = nrf * (nrf + 1) / 2 * (lmax_q + 1);

        let mut qri = vec![vec![0.0; nqri]; nshells];

        for (ish, row) in qri.iter_mut().enumerate() {
            let q = gvec.shell_len(ish);

            for aug in atype.get_q_radial() {
                row[qri_index(aug.idxrf1, aug.idxrf2, aug.l)] = grid.bessel_transform(&aug.f, aug.l, q, 0);
            }
        }

        let fact = FOURPI / omega;

        let compute_one = |ig: usize, out: &mut [f64]| {
            let rlm = special::real_ylm_all_of_vector(lmax_q, gvec.gvec_cart(ig));
            let ish = gvec.shell(ig);

            for xi2 in 0..nbf {
                let b2 = indexb.get(xi2);

                for xi1 in 0..=xi2 {
                    let b1 = indexb.get(xi1);
                    let (rf1, rf2) = if b1.idxrf <= b2.idxrf { (b1.idxrf, b2.idxrf) } else { (b2.idxrf, b1.idxrf) };

                    let mut z = ZERO_C64;

                    for l in 0..=lmax_q {
                        let v = qri[ish][qri_index(rf1, rf2, l)];
                        if v == 0.0 {
                            continue;
                        }

                        let mut s = 0.0;
                        for m in utility::get_quant_num_m(l) {
                            let lm3 = utility::lm(l, m);
                            s += rlm[lm3] * gaunt.get(b1.lm, b2.lm, lm3);
                        }

                        z += minus_i_pow(l) * s * v;
                    }

                    let idx12 = packed_index(xi1, xi2);
                    out[2 * idx12] = fact * z.re;
                    out[2 * idx12 + 1] = fact * z.im;
                }
            }
        };

        // one G-vector: [re(idx12=0), im(idx12=0), re(1), im(1), ...]
        let mut interleaved = vec![0.0; 2 * nidx12 * num_gvec_loc];

        if nidx12 > 0 {
            if use_parallel_for_len(num_gvec_loc) {
                interleaved
                    .par_chunks_mut(2 * nidx12)
                    .enumerate()
                    .for_each(|(igloc, out)| compute_one(gvec_offset + igloc, out));
            } else {
                for (igloc, out) in interleaved.chunks_mut(2 * nidx12).enumerate() {
                    compute_one(gvec_offset + igloc, out);
                }
            }
        }

        let mut q_pw = Matrix::<f64>::new(nidx12, 2 * num_gvec_loc);

        for igloc in 0..num_gvec_loc {
            for idx12 in 0..nidx12 {
                let base = 2 * (igloc * nidx12 + idx12);
                q_pw[[idx12, 2 * igloc]] = interleaved[base];
                q_pw[[idx12, 2 * igloc + 1]] = interleaved[base + 1];
            }
        }

        let mut sym_weight = vec![0.0; nidx12];
        let mut q_mtrx = Matrix::<f64>::new(nbf, nbf);

        for xi2 in 0..nbf {
            let b2 = indexb.get(xi2);

            for xi1 in 0..=xi2 {
                let b1 = indexb.get(xi1);

                sym_weight[packed_index(xi1, xi2)] = if xi1 == xi2 { 1.0 } else { 2.0 };

                if b1.lm == b2.lm {
                    let q = atype.q_radial_integral(b1.idxrf, b2.idxrf);
                    q_mtrx[[xi1, xi2]] = q;
                    q_mtrx[[xi2, xi1]] = q;
                }
            }
        }

        debug!(
            atom_type = atype.get_symbol(),
            num_idx12 = nidx12,
            num_gvec_loc,
            "augmentation operator constructed"
        );

        AugmentationOperator {
            atom_type: iat,
            nbf,
            gvec_offset,
            num_gvec_loc,
            q_pw,
            sym_weight,
            q_mtrx,
            device_q_pw: Mutex::new(None),
        }
    }

    pub fn atom_type(&self) -> usize {
        self.atom_type
    }

    pub fn nbf(&self) -> usize {
        self.nbf
    }

    pub fn num_idx12(&self) -> usize {
        self.sym_weight.len()
    }

    pub fn gvec_offset(&self) -> usize {
        self.gvec_offset
    }

    pub fn num_gvec_loc(&self) -> usize {
        self.num_gvec_loc
    }

    pub fn q_pw(&self) -> &Matrix<f64> {
        &self.q_pw
    }

    /// Q_{idx12}(G) of the local G-vector `igloc`.
    pub fn q_pw_value(&self, idx12: usize, igloc: usize) -> types::c64 {
        types::c64::new(self.q_pw[[idx12, 2 * igloc]], self.q_pw[[idx12, 2 * igloc + 1]])
    }

    /// 1 on the diagonal, 2 for xi1 < xi2.
    pub fn sym_weight(&self, idx12: usize) -> f64 {
        self.sym_weight[idx12]
    }

    pub fn q_mtrx(&self, xi1: usize, xi2: usize) -> f64 {
        self.q_mtrx[[xi1, xi2]]
    }

    /// Make the form factors resident on the execution device.
    pub fn prepare(&self, pu: ProcessingUnit) {
        if pu != ProcessingUnit::Gpu {
            return;
        }

        let mut dev = self.device_q_pw.lock().unwrap_or_else(|e| e.into_inner());
        if dev.is_none() {
            *dev = Some(Arc::new(self.q_pw.as_slice().to_vec()));
        }
    }

    /// Release the device copy.
    pub fn dismiss(&self) {
        *self.device_q_pw.lock().unwrap_or_else(|e| e.into_inner()) = None;
    }

    pub fn is_prepared(&self) -> bool {
        self.device_q_pw.lock().unwrap_or_else(|e| e.into_inner()).is_some()
    }

    pub fn q_pw_device(&self) -> Option<Arc<Vec<f64>>> {
        self.device_q_pw.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }
}

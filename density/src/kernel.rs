use crate::use_parallel_for_len;
use dwconsts::*;
use itertools::multizip;
use matrix::Matrix;
use rayon::prelude::*;
use types::{c64, ProcessingUnit};
use vnl::AugmentationOperator;

/// Inner loops of the density construction.
///
/// The orchestration in `Density` is written once; only these kernels differ between
/// execution targets, and both implementations give the same numbers.
pub trait DensityKernel: Send + Sync {
    fn name(&self) -> &'static str;

    /// rho(r) += w |psi(r)|^2
    fn add_band_density(&self, psi: &[c64], w: f64, rho: &mut [f64]);

    /// Spinor band into [|up|^2, |dn|^2, 2 Re(up dn^*), -2 Im(up dn^*)], all scaled by w.
    fn add_spinor_density(&self, up: &[c64], dn: &[c64], w: f64, out: &mut [Vec<f64>]);

    /// out(xi1, xi2) += sum_b w_b conj(bp1(xi1, b)) bp2(xi2, b); out is column-major nbf x nbf.
    fn add_density_matrix(&self, bp1: &Matrix<c64>, bp2: &Matrix<c64>, w: &[f64], out: &mut [c64]);

    /// out(G) += sum_idx12 sym_weight(idx12) Q(idx12, G) D(idx12, G) over the local G-vectors.
    ///
    /// `d_pw` has the interleaved layout of `AugmentationOperator::q_pw`.
    fn add_rho_aug(&self, aug: &AugmentationOperator, d_pw: &Matrix<f64>, out: &mut [c64]);
}

pub fn new_kernel(pu: ProcessingUnit) -> Box<dyn DensityKernel> {
    match pu {
        ProcessingUnit::Cpu => Box::new(HostKernel::new()),
        ProcessingUnit::Gpu => Box::new(AcceleratorKernel::new()),
    }
}

pub struct HostKernel {}

impl HostKernel {
    pub fn new() -> HostKernel {
        HostKernel {}
    }
}

impl Default for HostKernel {
    fn default() -> Self {
        HostKernel::new()
    }
}

impl DensityKernel for HostKernel {
    fn name(&self) -> &'static str {
        "host"
    }

    fn add_band_density(&self, psi: &[c64], w: f64, rho: &mut [f64]) {
        assert_eq!(psi.len(), rho.len());

        if use_parallel_for_len(rho.len()) {
            rho.par_iter_mut().zip(psi.par_iter()).for_each(|(r, p)| *r += w * p.norm_sqr());
        } else {
            for (r, p) in multizip((rho.iter_mut(), psi.iter())) {
                *r += w * p.norm_sqr();
            }
        }
    }

    fn add_spinor_density(&self, up: &[c64], dn: &[c64], w: f64, out: &mut [Vec<f64>]) {
        assert_eq!(out.len(), 4);

        let (r01, r23) = out.split_at_mut(2);
        let (r0, r1) = r01.split_at_mut(1);
        let (r2, r3) = r23.split_at_mut(1);

        for (ir, (u, d)) in multizip((up.iter(), dn.iter())).enumerate() {
            let z = u * d.conj();

            r0[0][ir] += w * u.norm_sqr();
            r1[0][ir] += w * d.norm_sqr();
            r2[0][ir] += 2.0 * w * z.re;
            r3[0][ir] -= 2.0 * w * z.im;
        }
    }

    fn add_density_matrix(&self, bp1: &Matrix<c64>, bp2: &Matrix<c64>, w: &[f64], out: &mut [c64]) {
        let nbf = bp1.nrow();

        assert_eq!(bp2.nrow(), nbf);
        assert_eq!(out.len(), nbf * nbf);

        for (ib, &wb) in w.iter().enumerate() {
            if wb == 0.0 {
                continue;
            }

            let c1 = bp1.get_col(ib);
            let c2 = bp2.get_col(ib);

            for xi2 in 0..nbf {
                let z = wb * c2[xi2];

                for xi1 in 0..nbf {
                    out[xi1 + nbf * xi2] += c1[xi1].conj() * z;
                }
            }
        }
    }

    fn add_rho_aug(&self, aug: &AugmentationOperator, d_pw: &Matrix<f64>, out: &mut [c64]) {
        let nidx12 = aug.num_idx12();
        let ngv = aug.num_gvec_loc();

        assert_eq!(d_pw.nrow(), nidx12);
        assert_eq!(d_pw.ncol(), 2 * ngv);
        assert_eq!(out.len(), ngv);

        let q = aug.q_pw();

        for (igloc, v) in out.iter_mut().enumerate() {
            let mut z = ZERO_C64;

            for idx12 in 0..nidx12 {
                let qz = c64::new(q[[idx12, 2 * igloc]], q[[idx12, 2 * igloc + 1]]);
                let dz = c64::new(d_pw[[idx12, 2 * igloc]], d_pw[[idx12, 2 * igloc + 1]]);

                z += aug.sym_weight(idx12) * qz * dz;
            }

            *v += z;
        }
    }
}

/// Kernels that work on device-resident copies and batched products.
///
/// Augmentation reads the copy published by `AugmentationOperator::prepare`.
pub struct AcceleratorKernel {}

impl AcceleratorKernel {
    pub fn new() -> AcceleratorKernel {
        AcceleratorKernel {}
    }
}

impl Default for AcceleratorKernel {
    fn default() -> Self {
        AcceleratorKernel::new()
    }
}

impl DensityKernel for AcceleratorKernel {
    fn name(&self) -> &'static str {
        "accelerator"
    }

    fn add_band_density(&self, psi: &[c64], w: f64, rho: &mut [f64]) {
        assert_eq!(psi.len(), rho.len());

        rho.par_iter_mut().zip(psi.par_iter()).for_each(|(r, p)| *r += w * p.norm_sqr());
    }

    fn add_spinor_density(&self, up: &[c64], dn: &[c64], w: f64, out: &mut [Vec<f64>]) {
        assert_eq!(out.len(), 4);

        let (r01, r23) = out.split_at_mut(2);
        let (r0, r1) = r01.split_at_mut(1);
        let (r2, r3) = r23.split_at_mut(1);

        r0[0].par_iter_mut().zip(up.par_iter()).for_each(|(r, u)| *r += w * u.norm_sqr());
        r1[0].par_iter_mut().zip(dn.par_iter()).for_each(|(r, d)| *r += w * d.norm_sqr());

        r2[0]
            .par_iter_mut()
            .zip(r3[0].par_iter_mut())
            .zip(up.par_iter().zip(dn.par_iter()))
            .for_each(|((x, y), (u, d))| {
                let z = u * d.conj();
                *x += 2.0 * w * z.re;
                *y -= 2.0 * w * z.im;
            });
    }

    fn add_density_matrix(&self, bp1: &Matrix<c64>, bp2: &Matrix<c64>, w: &[f64], out: &mut [c64]) {
        let nbf = bp1.nrow();
        let nbnd = w.len();

        assert_eq!(bp2.nrow(), nbf);
        assert_eq!(out.len(), nbf * nbf);

        // out = X1^H (W X2) with X = bp^T (nbnd x nbf)
        let mut x1 = Matrix::<c64>::new(nbnd, nbf);
        let mut x2 = Matrix::<c64>::new(nbnd, nbf);

        for xi in 0..nbf {
            for ib in 0..nbnd {
                x1[[ib, xi]] = bp1[[xi, ib]];
                x2[[ib, xi]] = w[ib] * bp2[[xi, ib]];
            }
        }

        let mut c = Matrix::<c64>::from_col_slice(nbf, nbf, out);
        Matrix::<c64>::gemm(ONE_C64, &x1, true, &x2, ONE_C64, &mut c);

        out.copy_from_slice(c.as_slice());
    }

    fn add_rho_aug(&self, aug: &AugmentationOperator, d_pw: &Matrix<f64>, out: &mut [c64]) {
        let nidx12 = aug.num_idx12();
        let ngv = aug.num_gvec_loc();

        assert_eq!(d_pw.nrow(), nidx12);
        assert_eq!(d_pw.ncol(), 2 * ngv);
        assert_eq!(out.len(), ngv);

        if nidx12 == 0 {
            return;
        }

        let device = aug.q_pw_device();
        let q: &[f64] = match device.as_ref() {
            Some(v) => v.as_slice(),
            None => aug.q_pw().as_slice(),
        };

        let weights: Vec<f64> = (0..nidx12).map(|idx12| aug.sym_weight(idx12)).collect();
        let d = d_pw.as_slice();

        // column 2ig / 2ig+1 of a column-major (nidx12 x 2 ngv) matrix
        out.par_iter_mut().enumerate().for_each(|(igloc, v)| {
            let q_re = &q[2 * igloc * nidx12..(2 * igloc + 1) * nidx12];
            let q_im = &q[(2 * igloc + 1) * nidx12..(2 * igloc + 2) * nidx12];
            let d_re = &d[2 * igloc * nidx12..(2 * igloc + 1) * nidx12];
            let d_im = &d[(2 * igloc + 1) * nidx12..(2 * igloc + 2) * nidx12];

            let mut re = 0.0;
            let mut im = 0.0;

            for i in 0..nidx12 {
                re += weights[i] * (q_re[i] * d_re[i] - q_im[i] * d_im[i]);
                im += weights[i] * (q_re[i] * d_im[i] + q_im[i] * d_re[i]);
            }

            *v += c64::new(re, im);
        });
    }
}

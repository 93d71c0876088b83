use crate::Matrix;

use dwconsts::*;
use nalgebra::DMatrix;
use std::ops::Mul;
use types::c64;

impl Matrix<c64> {
    pub fn identity(n: usize) -> Matrix<c64> {
        let mut mat = Matrix::<c64>::new(n, n);

        for i in 0..n {
            mat[[i, i]] = ONE_C64;
        }

        mat
    }

    pub fn adjoint(&self) -> Matrix<c64> {
        let mut mat = Matrix::<c64>::new(self.ncol, self.nrow);

        for j in 0..self.ncol {
            for i in 0..self.nrow {
                mat[[j, i]] = self[[i, j]].conj();
            }
        }

        mat
    }

    pub fn action(&self, vin: &[c64], vout: &mut [c64]) {
        vout.iter_mut().for_each(|x| *x = ZERO_C64);

        for i in 0..self.ncol {
            for j in 0..self.nrow {
                vout[j] += self[[j, i]] * vin[i];
            }
        }
    }

    /// C = alpha * op(A) * B + beta * C, op = conjugate transpose when `adjoint_a` is set
    pub fn gemm(alpha: c64, a: &Matrix<c64>, adjoint_a: bool, b: &Matrix<c64>, beta: c64, c: &mut Matrix<c64>) {
        let ma = DMatrix::<c64>::from_column_slice(a.nrow, a.ncol, a.as_slice());
        let mb = DMatrix::<c64>::from_column_slice(b.nrow, b.ncol, b.as_slice());
        let mut mc = DMatrix::<c64>::from_column_slice(c.nrow, c.ncol, c.as_slice());

        if adjoint_a {
            mc.gemm_ad(alpha, &ma, &mb, beta);
        } else {
            mc.gemm(alpha, &ma, &mb, beta);
        }

        c.data.copy_from_slice(mc.as_slice());
    }

    /// Eigenvalues in ascending order and the eigenvectors stored column-wise.
    pub fn eigh(&self) -> (Vec<f64>, Matrix<c64>) {
        assert_eq!(self.nrow, self.ncol, "Matrix::eigh requires a square matrix");

        let n = self.nrow;
        let mat = DMatrix::<c64>::from_column_slice(n, n, self.as_slice());
        let eig = mat.symmetric_eigen();

        let mut order: Vec<usize> = (0..n).collect();
        order.sort_by(|&a, &b| eig.eigenvalues[a].total_cmp(&eig.eigenvalues[b]));

        let evals = order.iter().map(|&i| eig.eigenvalues[i]).collect();

        let mut evecs = Matrix::<c64>::new(n, n);
        for (jnew, &jold) in order.iter().enumerate() {
            for i in 0..n {
                evecs[[i, jnew]] = eig.eigenvectors[(i, jold)];
            }
        }

        (evals, evecs)
    }

    /// S^{-1/2} of a Hermitian positive definite matrix; None if an eigenvalue is not positive.
    pub fn inverse_sqrt_hermitian(&self) -> Option<Matrix<c64>> {
        let (evals, evecs) = self.eigh();

        if evals.iter().any(|&e| e <= EPS12) {
            return None;
        }

        let n = self.nrow;
        let mut out = Matrix::<c64>::new(n, n);

        for (k, e) in evals.iter().enumerate() {
            let f = 1.0 / e.sqrt();
            for j in 0..n {
                let vj = evecs[[j, k]].conj() * f;
                for i in 0..n {
                    out[[i, j]] += evecs[[i, k]] * vj;
                }
            }
        }

        Some(out)
    }
}

impl Mul<f64> for Matrix<c64> {
    type Output = Matrix<c64>;

    fn mul(mut self, rhs: f64) -> Matrix<c64> {
        self.data.iter_mut().for_each(|v| *v *= rhs);

        self
    }
}

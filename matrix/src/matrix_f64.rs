use crate::Matrix;

use nalgebra::DMatrix;
use std::ops::Mul;

impl Mul<f64> for Matrix<f64> {
    type Output = Matrix<f64>;

    fn mul(mut self, rhs: f64) -> Matrix<f64> {
        self.data.iter_mut().for_each(|v| *v *= rhs);

        self
    }
}

impl Matrix<f64> {
    pub fn identity(n: usize) -> Matrix<f64> {
        let mut mat = Matrix::<f64>::new(n, n);

        for i in 0..n {
            mat[[i, i]] = 1.0;
        }

        mat
    }

    pub fn action(&self, vin: &[f64], vout: &mut [f64]) {
        vout.iter_mut().for_each(|x| *x = 0.0);

        for i in 0..self.ncol {
            for j in 0..self.nrow {
                vout[j] += self[[j, i]] * vin[i];
            }
        }
    }

    pub fn inv(&mut self) {
        assert_eq!(self.nrow, self.ncol, "Matrix::inv requires a square matrix");

        let mat = DMatrix::<f64>::from_column_slice(self.nrow, self.ncol, self.as_slice());

        if let Some(inv) = mat.try_inverse() {
            self.data.copy_from_slice(inv.as_slice());
        }
    }

    /// C = alpha * op(A) * op(B) + beta * C, op = transpose when the flag is set
    pub fn gemm(
        alpha: f64,
        a: &Matrix<f64>,
        trans_a: bool,
        b: &Matrix<f64>,
        trans_b: bool,
        beta: f64,
        c: &mut Matrix<f64>,
    ) {
        let ma = DMatrix::<f64>::from_column_slice(a.nrow, a.ncol, a.as_slice());
        let mb = DMatrix::<f64>::from_column_slice(b.nrow, b.ncol, b.as_slice());
        let mut mc = DMatrix::<f64>::from_column_slice(c.nrow, c.ncol, c.as_slice());

        match (trans_a, trans_b) {
            (false, false) => mc.gemm(alpha, &ma, &mb, beta),
            (true, false) => mc.gemm_tr(alpha, &ma, &mb, beta),
            (false, true) => mc.gemm(alpha, &ma, &mb.transpose(), beta),
            (true, true) => mc.gemm_tr(alpha, &ma, &mb.transpose(), beta),
        }

        c.data.copy_from_slice(mc.as_slice());
    }
}

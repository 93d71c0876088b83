// column-major memory layout
// [i,j] : i + j * nrow
//   0,0 0,1 0,2        0 2 4
//   1,0 1,1 1,2        1 3 5

mod matrix_c64;
pub use matrix_c64::*;

mod matrix_f64;
pub use matrix_f64::*;

//////////////////////////////////////////

use itertools::multizip;
use std::ops::*;
use std::{fmt, fmt::Display};

pub trait Dot<RHS = Self> {
    type Output;

    fn dot(&self, other: &RHS) -> Self::Output;
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Matrix<T> {
    nrow: usize,
    ncol: usize,
    data: Vec<T>,
}

impl<T> Dot<Matrix<T>> for Matrix<T>
where
    T: num_traits::Zero + Default + Copy + AddAssign + Mul<Output = T>,
{
    type Output = Self;

    fn dot(&self, rhs: &Matrix<T>) -> Self::Output {
        assert_eq!(self.ncol, rhs.nrow);

        let mut mdot = Matrix::<T>::new(self.nrow, rhs.ncol);

        for j in 0..rhs.ncol {
            for k in 0..self.ncol {
                let f = rhs[[k, j]];
                for (d, s) in multizip((mdot.get_mut_col(j).iter_mut(), self.get_col(k).iter())) {
                    *d += *s * f;
                }
            }
        }

        mdot
    }
}

impl<T> AddAssign<&Matrix<T>> for Matrix<T>
where
    T: Copy + AddAssign,
{
    fn add_assign(&mut self, rhs: &Matrix<T>) {
        assert_eq!(self.data.len(), rhs.data.len());

        for (d, s) in multizip((self.data.iter_mut(), rhs.data.iter())) {
            *d += *s;
        }
    }
}

impl<T: num_traits::Zero + Default + Copy> Matrix<T> {
    pub fn new(nrow: usize, ncol: usize) -> Matrix<T> {
        Matrix {
            nrow,
            ncol,
            data: vec![T::default(); nrow * ncol],
        }
    }

    pub fn from_row_slice(nrow: usize, ncol: usize, s: &[T]) -> Matrix<T> {
        assert_eq!(s.len(), nrow * ncol);

        let mut data = vec![T::default(); nrow * ncol];

        for i in 0..nrow {
            for j in 0..ncol {
                data[i + j * nrow] = s[i * ncol + j];
            }
        }

        Matrix { nrow, ncol, data }
    }

    pub fn from_col_slice(nrow: usize, ncol: usize, s: &[T]) -> Matrix<T> {
        assert_eq!(s.len(), nrow * ncol);

        Matrix {
            nrow,
            ncol,
            data: s.to_vec(),
        }
    }

    pub fn nrow(&self) -> usize {
        self.nrow
    }

    pub fn ncol(&self) -> usize {
        self.ncol
    }

    pub fn as_slice(&self) -> &[T] {
        &self.data
    }

    pub fn as_mut_slice(&mut self) -> &mut [T] {
        &mut self.data
    }

    pub fn set_zeros(&mut self) {
        self.data.iter_mut().for_each(|x| *x = T::zero());
    }

    pub fn get_col(&self, icol: usize) -> &[T] {
        let n1 = icol * self.nrow;

        &self.data[n1..n1 + self.nrow]
    }

    pub fn get_mut_col(&mut self, icol: usize) -> &mut [T] {
        let n1 = icol * self.nrow;

        &mut self.data[n1..n1 + self.nrow]
    }

    pub fn set_col(&mut self, icol: usize, v: &[T]) {
        self.get_mut_col(icol).copy_from_slice(v);
    }

    pub fn transpose(&self) -> Matrix<T> {
        let mut mt = Matrix::<T>::new(self.ncol, self.nrow);

        for j in 0..self.ncol {
            for i in 0..self.nrow {
                mt[[j, i]] = self[[i, j]];
            }
        }

        mt
    }
}

impl<T> Index<[usize; 2]> for Matrix<T> {
    type Output = T;

    fn index(&self, idx: [usize; 2]) -> &T {
        &self.data[idx[0] + idx[1] * self.nrow]
    }
}

impl<T> IndexMut<[usize; 2]> for Matrix<T> {
    fn index_mut(&mut self, idx: [usize; 2]) -> &mut Self::Output {
        &mut self.data[idx[0] + idx[1] * self.nrow]
    }
}

impl<T: Display> fmt::Display for Matrix<T> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        for i in 0..self.nrow {
            write!(f, " | ")?;
            for j in 0..self.ncol {
                write!(f, "{:+8.3} ", self.data[i + j * self.nrow])?;
            }
            writeln!(f, "|")?;
        }
        Ok(())
    }
}

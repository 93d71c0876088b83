mod array3_c64;

mod array5;
pub use array5::*;

use ndarray_crate::{Array3 as NdArray3, ShapeBuilder, Zip};
use num_traits::Zero;
use std::ops::{Index, IndexMut};

/// Three-index array with the first index running fastest, matching the FFT box layout.
#[derive(Debug, Clone)]
pub struct Array3<T> {
    shape: [usize; 3],
    data: NdArray3<T>,
}

impl<T: Default + Clone> Default for Array3<T> {
    fn default() -> Self {
        Self {
            shape: [0, 0, 0],
            data: NdArray3::from_elem((0, 0, 0).f(), T::default()),
        }
    }
}

impl<T: Default + Copy + Zero + std::ops::Mul<Output = T>> Array3<T> {
    pub fn new(shape: [usize; 3]) -> Array3<T> {
        Array3 {
            shape,
            data: NdArray3::from_elem((shape[0], shape[1], shape[2]).f(), T::default()),
        }
    }

    pub fn from_vec(shape: [usize; 3], data: Vec<T>) -> Array3<T> {
        assert_eq!(data.len(), shape[0] * shape[1] * shape[2]);

        let mut a = Array3::<T>::new(shape);
        a.as_mut_slice().copy_from_slice(&data);

        a
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn sum(&self) -> T {
        self.data.iter().fold(T::zero(), |s, v| s + *v)
    }

    pub fn set_value(&mut self, value: T) {
        self.data.fill(value);
    }

    pub fn shape(&self) -> [usize; 3] {
        self.shape
    }

    pub fn as_slice(&self) -> &[T] {
        // from_elem with .f() always yields a contiguous buffer
        self.data.as_slice_memory_order().unwrap_or(&[])
    }

    pub fn as_mut_slice(&mut self) -> &mut [T] {
        self.data.as_slice_memory_order_mut().unwrap_or(&mut [])
    }

    pub fn assign(&mut self, rhs: &Array3<T>) {
        assert_eq!(self.shape, rhs.shape);
        self.data.assign(&rhs.data);
    }

    pub fn add_from(&mut self, rhs: &Array3<T>) {
        assert_eq!(self.shape, rhs.shape);
        Zip::from(self.data.view_mut())
            .and(rhs.data.view())
            .for_each(|d, &s| *d = *d + s);
    }
}

impl<T> Index<[usize; 3]> for Array3<T> {
    type Output = T;

    fn index(&self, idx: [usize; 3]) -> &T {
        &self.data[[idx[0], idx[1], idx[2]]]
    }
}

impl<T> IndexMut<[usize; 3]> for Array3<T> {
    fn index_mut(&mut self, idx: [usize; 3]) -> &mut T {
        &mut self.data[[idx[0], idx[1], idx[2]]]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use types::c64;

    #[test]
    fn test_array3_first_index_fastest() {
        let a = Array3::<f64>::from_vec([2, 3, 2], (0..12).map(|x| x as f64).collect());

        assert_eq!(a[[1, 0, 0]], 1.0);
        assert_eq!(a[[0, 1, 0]], 2.0);
        assert_eq!(a[[0, 0, 1]], 6.0);
        assert_eq!(a.sum(), 66.0);
    }

    #[test]
    fn test_array3_c64_helpers() {
        let mut a = Array3::<c64>::new([2, 2, 1]);
        a.set_value(c64::new(1.0, 1.0));
        a.scale(0.5);

        assert!((a.norm2() - (4.0f64 * 0.5).sqrt()).abs() < 1.0E-14);
        assert!((a.sum().re - 2.0).abs() < 1.0E-14);
    }
}

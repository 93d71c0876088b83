use ndarray_crate::{Array5 as NdArray5, ShapeBuilder};
use std::ops::{Index, IndexMut};

/// Five-index array, first index fastest.
///
/// Used for the on-site tensors `(m1, m2, spin block, atom, channel)`.
#[derive(Debug, Clone)]
pub struct Array5<T> {
    shape: [usize; 5],
    data: NdArray5<T>,
}

impl<T: Default + Copy> Array5<T> {
    pub fn new(shape: [usize; 5]) -> Array5<T> {
        let sh = (shape[0], shape[1], shape[2], shape[3], shape[4]);

        Array5 {
            shape,
            data: NdArray5::from_elem(sh.f(), T::default()),
        }
    }

    pub fn shape(&self) -> [usize; 5] {
        self.shape
    }

    pub fn set_value(&mut self, value: T) {
        self.data.fill(value);
    }

    pub fn as_slice(&self) -> &[T] {
        self.data.as_slice_memory_order().unwrap_or(&[])
    }

    pub fn as_mut_slice(&mut self) -> &mut [T] {
        self.data.as_slice_memory_order_mut().unwrap_or(&mut [])
    }

    /// Contiguous `(m1, m2)` block of one spin block of one atom.
    pub fn block(&self, is: usize, ia: usize, ich: usize) -> &[T] {
        let n = self.shape[0] * self.shape[1];
        let off = n * (is + self.shape[2] * (ia + self.shape[3] * ich));

        &self.as_slice()[off..off + n]
    }

    pub fn block_mut(&mut self, is: usize, ia: usize, ich: usize) -> &mut [T] {
        let n = self.shape[0] * self.shape[1];
        let off = n * (is + self.shape[2] * (ia + self.shape[3] * ich));

        &mut self.as_mut_slice()[off..off + n]
    }
}

impl<T> Index<[usize; 5]> for Array5<T> {
    type Output = T;

    fn index(&self, i: [usize; 5]) -> &T {
        &self.data[[i[0], i[1], i[2], i[3], i[4]]]
    }
}

impl<T> IndexMut<[usize; 5]> for Array5<T> {
    fn index_mut(&mut self, i: [usize; 5]) -> &mut T {
        &mut self.data[[i[0], i[1], i[2], i[3], i[4]]]
    }
}

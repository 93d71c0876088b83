use crate::Array3;
use types::c64;

impl Array3<c64> {
    pub fn scale(&mut self, f: f64) {
        self.as_mut_slice().iter_mut().for_each(|v| *v *= f);
    }

    pub fn norm2(&self) -> f64 {
        self.as_slice().iter().map(|v| v.norm_sqr()).sum::<f64>().sqrt()
    }

    pub fn real_part(&self) -> Vec<f64> {
        self.as_slice().iter().map(|v| v.re).collect()
    }
}

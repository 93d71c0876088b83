use crate::{real_ylm_all, SphereQuadrature};
use utility::lmmax;

/// Real Gaunt coefficients <R_lm1 | R_lm2 | R_lm3> = int R_lm1 R_lm2 R_lm3 dOmega.
#[derive(Debug, Clone)]
pub struct RealGaunt {
    lmax1: usize,
    lmax2: usize,
    lmax3: usize,
    data: Vec<f64>,
    nonzero: Vec<Vec<(usize, f64)>>,
}

impl RealGaunt {
    pub fn new(lmax1: usize, lmax2: usize, lmax3: usize) -> RealGaunt {
        let (n1, n2, n3) = (lmmax(lmax1), lmmax(lmax2), lmmax(lmax3));

        let lmax = lmax1.max(lmax2).max(lmax3);
        let quad = SphereQuadrature::new(lmax1 + lmax2 + lmax3);

        let mut data = vec![0.0; n1 * n2 * n3];

        for ip in 0..quad.len() {
            let (theta, phi, w) = quad.point(ip);
            let rlm = real_ylm_all(lmax, theta, phi);

            for i3 in 0..n3 {
                for i2 in 0..n2 {
                    let f = w * rlm[i2] * rlm[i3];
                    let off = n1 * (i2 + n2 * i3);

                    for i1 in 0..n1 {
                        data[off + i1] += rlm[i1] * f;
                    }
                }
            }
        }

        // drop quadrature noise
        for v in data.iter_mut() {
            if v.abs() < 1.0E-12 {
                *v = 0.0;
            }
        }

        let mut nonzero = vec![Vec::new(); n1 * n3];

        for i3 in 0..n3 {
            for i1 in 0..n1 {
                for i2 in 0..n2 {
                    let v = data[i1 + n1 * (i2 + n2 * i3)];
                    if v != 0.0 {
                        nonzero[i1 + n1 * i3].push((i2, v));
                    }
                }
            }
        }

        RealGaunt {
            lmax1,
            lmax2,
            lmax3,
            data,
            nonzero,
        }
    }

    pub fn get_lmax(&self) -> (usize, usize, usize) {
        (self.lmax1, self.lmax2, self.lmax3)
    }

    pub fn get(&self, lm1: usize, lm2: usize, lm3: usize) -> f64 {
        let (n1, n2) = (lmmax(self.lmax1), lmmax(self.lmax2));

        self.data[lm1 + n1 * (lm2 + n2 * lm3)]
    }

    /// Non-vanishing (lm2, coefficient) pairs for fixed lm1, lm3.
    pub fn nonzero(&self, lm1: usize, lm3: usize) -> &[(usize, f64)] {
        &self.nonzero[lm1 + lmmax(self.lmax1) * lm3]
    }
}

use dwconsts::*;

/// Gauss-Legendre nodes and weights on [-1, 1].
pub fn gauss_legendre(n: usize) -> (Vec<f64>, Vec<f64>) {
    let mut x = vec![0.0; n];
    let mut w = vec![0.0; n];

    for i in 0..(n + 1) / 2 {
        let mut z = (PI * (i as f64 + 0.75) / (n as f64 + 0.5)).cos();
        let mut dp = 1.0;

        for _ in 0..100 {
            let mut p0 = 1.0;
            let mut p1 = 0.0;

            for j in 0..n {
                let p2 = p1;
                p1 = p0;
                p0 = ((2 * j + 1) as f64 * z * p1 - j as f64 * p2) / (j + 1) as f64;
            }

            dp = n as f64 * (z * p0 - p1) / (z * z - 1.0);

            let dz = p0 / dp;
            z -= dz;

            if dz.abs() < 1.0E-15 {
                break;
            }
        }

        x[i] = -z;
        x[n - 1 - i] = z;
        w[i] = 2.0 / ((1.0 - z * z) * dp * dp);
        w[n - 1 - i] = w[i];
    }

    (x, w)
}

/// Product quadrature on the unit sphere, exact for polynomials up to the given degree.
#[derive(Debug, Clone)]
pub struct SphereQuadrature {
    theta: Vec<f64>,
    phi: Vec<f64>,
    weight: Vec<f64>,
}

impl SphereQuadrature {
    pub fn new(degree: usize) -> SphereQuadrature {
        let ntheta = degree / 2 + 1;
        let nphi = degree + 1;

        let (x, wx) = gauss_legendre(ntheta);

        let mut theta = Vec::with_capacity(ntheta * nphi);
        let mut phi = Vec::with_capacity(ntheta * nphi);
        let mut weight = Vec::with_capacity(ntheta * nphi);

        let dphi = TWOPI / nphi as f64;

        for it in 0..ntheta {
            for ip in 0..nphi {
                theta.push(x[it].acos());
                phi.push(ip as f64 * dphi);
                weight.push(wx[it] * dphi);
            }
        }

        SphereQuadrature { theta, phi, weight }
    }

    pub fn len(&self) -> usize {
        self.weight.len()
    }

    pub fn is_empty(&self) -> bool {
        self.weight.is_empty()
    }

    /// (theta, phi, weight)
    pub fn point(&self, i: usize) -> (f64, f64, f64) {
        (self.theta[i], self.phi[i], self.weight[i])
    }
}

use special::spherical_bessel_jn;

/// Radial mesh with the derivative dr/di at every point.
#[derive(Debug, Clone, Default)]
pub struct RadialGrid {
    r: Vec<f64>,
    rab: Vec<f64>,
}

impl RadialGrid {
    /// r_i = rmin * (rmax/rmin)^(i/(n-1))
    pub fn exponential(n: usize, rmin: f64, rmax: f64) -> RadialGrid {
        assert!(n > 1 && rmin > 0.0 && rmax > rmin);

        let a = (rmax / rmin).ln() / (n - 1) as f64;

        let r: Vec<f64> = (0..n).map(|i| rmin * (a * i as f64).exp()).collect();
        let rab = r.iter().map(|x| x * a).collect();

        RadialGrid { r, rab }
    }

    /// Equidistant points from 0 to rmax.
    pub fn linear(n: usize, rmax: f64) -> RadialGrid {
        assert!(n > 1);

        let dr = rmax / (n - 1) as f64;

        RadialGrid {
            r: (0..n).map(|i| dr * i as f64).collect(),
            rab: vec![dr; n],
        }
    }

    pub fn from_points(r: Vec<f64>, rab: Vec<f64>) -> RadialGrid {
        assert_eq!(r.len(), rab.len());

        RadialGrid { r, rab }
    }

    pub fn len(&self) -> usize {
        self.r.len()
    }

    pub fn is_empty(&self) -> bool {
        self.r.is_empty()
    }

    pub fn get_r(&self) -> &[f64] {
        &self.r
    }

    pub fn get_rab(&self) -> &[f64] {
        &self.rab
    }

    pub fn r(&self, ir: usize) -> f64 {
        self.r[ir]
    }

    /// Number of leading points with r <= rcut.
    pub fn index_of(&self, rcut: f64) -> usize {
        self.r.iter().take_while(|&&x| x <= rcut + 1.0E-12).count()
    }

    /// Integral of f over the first f.len() points.
    pub fn integrate(&self, f: &[f64]) -> f64 {
        integral::simpson_rab(f, &self.rab[..f.len()])
    }

    /// int f(r) j_l(q r) r^m dr
    pub fn bessel_transform(&self, f: &[f64], l: usize, q: f64, m: i32) -> f64 {
        let work: Vec<f64> = f
            .iter()
            .zip(self.r.iter())
            .map(|(y, &x)| y * spherical_bessel_jn(l, q * x) * x.powi(m))
            .collect();

        self.integrate(&work)
    }
}

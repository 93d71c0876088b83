use dwconsts::*;
use lattice::Lattice;
use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FFTGrid {
    n1: usize,
    n2: usize,
    n3: usize,
}

impl FFTGrid {
    /// Smallest FFT-friendly box holding every G with |G| <= gmax.
    pub fn new(latt: &Lattice, gmax: f64) -> FFTGrid {
        let n1 = (2.0 * gmax * latt.get_vector_a().norm2() / TWOPI).ceil() as usize + 1;
        let n2 = (2.0 * gmax * latt.get_vector_b().norm2() / TWOPI).ceil() as usize + 1;
        let n3 = (2.0 * gmax * latt.get_vector_c().norm2() / TWOPI).ceil() as usize + 1;

        FFTGrid {
            n1: get_fftwn(n1),
            n2: get_fftwn(n2),
            n3: get_fftwn(n3),
        }
    }

    pub fn from_size(n1: usize, n2: usize, n3: usize) -> FFTGrid {
        FFTGrid { n1, n2, n3 }
    }

    pub fn get_ntotf64(&self) -> f64 {
        (self.n1 * self.n2 * self.n3) as f64
    }

    pub fn get_ntot(&self) -> usize {
        self.n1 * self.n2 * self.n3
    }

    pub fn get_n1(&self) -> usize {
        self.n1
    }

    pub fn get_n2(&self) -> usize {
        self.n2
    }

    pub fn get_n3(&self) -> usize {
        self.n3
    }

    pub fn get_size(&self) -> [usize; 3] {
        [self.n1, self.n2, self.n3]
    }

    /// Size along one axis.
    pub fn get_n(&self, axis: usize) -> usize {
        self.get_size()[axis]
    }

    /// Lowest and highest frequency along one axis.
    pub fn get_limits(&self, axis: usize) -> (i32, i32) {
        let n = self.get_n(axis);

        (utility::fft_left_end(n), utility::fft_right_end(n))
    }

    /// Storage position of a frequency along one axis.
    pub fn freq_to_index(&self, axis: usize, freq: i32) -> usize {
        utility::fft_i2n(freq, self.get_n(axis))
    }

    pub fn index_to_freq(&self, axis: usize, idx: usize) -> i32 {
        utility::fft_n2i(idx, self.get_n(axis))
    }

    pub fn linear_index(&self, i: usize, j: usize, k: usize) -> usize {
        i + self.n1 * (j + self.n2 * k)
    }

    /// (i, j, k) of a linear box index
    pub fn coord_of(&self, idx: usize) -> (usize, usize, usize) {
        (idx % self.n1, (idx / self.n1) % self.n2, idx / (self.n1 * self.n2))
    }
}

impl fmt::Display for FFTGrid {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{} x {} x {}", self.n1, self.n2, self.n3)
    }
}

fn get_fftwn(n: usize) -> usize {
    let mut tn = n.max(1);

    while !is_fftw_ok(tn) {
        tn += 1;
    }

    tn
}

fn is_fftw_ok(n_to_check: usize) -> bool {
    const FACTORS: [usize; 6] = [2, 3, 5, 7, 11, 13];

    let mut tn = n_to_check;

    for fi in FACTORS.iter() {
        while tn % fi == 0 && tn != 1 {
            tn /= fi;
        }
    }

    tn == 1
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fftw_friendly_sizes() {
        assert_eq!(get_fftwn(17), 18);
        assert_eq!(get_fftwn(31), 32);
        assert!(is_fftw_ok(2 * 3 * 5 * 7 * 11 * 13));
        assert!(!is_fftw_ok(17 * 2));
    }

    #[test]
    fn test_grid_covers_cutoff_sphere() {
        let latt = Lattice::cubic(10.0);
        let gmax = 2.0;
        let grid = FFTGrid::new(&latt, gmax);

        // |G| <= gmax needs |n| <= gmax a / 2pi
        let nmax = (gmax * 10.0 / TWOPI).floor() as i32;
        for axis in 0..3 {
            let (lo, hi) = grid.get_limits(axis);
            assert!(lo <= -nmax && hi >= nmax);
        }
    }

    #[test]
    fn test_coordinates() {
        let g = FFTGrid::from_size(4, 3, 5);
        let idx = g.linear_index(3, 2, 4);

        assert_eq!(g.coord_of(idx), (3, 2, 4));
        assert_eq!(g.freq_to_index(0, -1), 3);
        assert_eq!(g.index_to_freq(2, 4), -1);
    }
}

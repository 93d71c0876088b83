use dwconsts::*;
use gvector::Gvec;
use matrix::Matrix;
use types::c64;
use vnl::BetaProjectors;

mod kpoint_set;
pub use kpoint_set::*;

/// Wave-function data of one k-point as seen by the density and Hubbard kernels.
///
/// Collinear runs store one set of bands per spin channel. Non-collinear runs store spinor
/// bands: component `ispn` of band `ibnd` is column `ibnd` of `pw_coeffs(ispn)`, and the
/// occupancy is read from channel 0.
pub trait KPoint {
    fn weight(&self) -> f64;

    fn num_bands(&self) -> usize;

    fn band_occupancy(&self, ibnd: usize, ispn: usize) -> f64;

    fn gkvec(&self) -> &Gvec;

    /// (num_gkvec x num_bands) plane-wave coefficients of spin channel (or spinor component) `ispn`.
    fn pw_coeffs(&self, ispn: usize) -> &Matrix<c64>;

    fn beta_projectors(&self) -> Option<&BetaProjectors>;

    /// (mt_basis_size x num_bands) muffin-tin coefficients of spin channel `ispn`.
    fn mt_coeffs(&self, ispn: usize) -> Option<&Matrix<c64>>;

    /// First row of atom `ia` inside the muffin-tin coefficients.
    fn mt_offset(&self, ia: usize) -> usize;

    /// Hubbard orbitals (num_gkvec x num_hubbard_orbitals), S already applied when requested.
    fn hubbard_orbitals(&self) -> Option<&Matrix<c64>>;

    fn set_hubbard_orbitals(&mut self, phi: Matrix<c64>);

    /// occupancy * k-point weight
    fn band_weight(&self, ibnd: usize, ispn: usize) -> f64 {
        self.band_occupancy(ibnd, ispn) * self.weight()
    }

    /// Bands of channel `ispn` with a non-negligible occupancy.
    fn num_occupied_bands(&self, ispn: usize) -> usize {
        (0..self.num_bands())
            .rev()
            .find(|&ibnd| self.band_occupancy(ibnd, ispn).abs() > EPS14)
            .map_or(0, |ibnd| ibnd + 1)
    }
}

/// Plain in-memory k-point.
pub struct KPointData {
    gkvec: Gvec,
    weight: f64,
    occupations: Vec<Vec<f64>>,
    pw_coeffs: Vec<Matrix<c64>>,
    beta_projectors: Option<BetaProjectors>,
    mt_coeffs: Option<Vec<Matrix<c64>>>,
    mt_offsets: Vec<usize>,
    hubbard_orbitals: Option<Matrix<c64>>,
}

impl KPointData {
    /// `occupations[ispn][ibnd]`, `pw_coeffs[ispn]` is (num_gkvec x num_bands).
    pub fn new(gkvec: Gvec, weight: f64, occupations: Vec<Vec<f64>>, pw_coeffs: Vec<Matrix<c64>>) -> KPointData {
        assert!(!pw_coeffs.is_empty());
        assert!(!occupations.is_empty());

        let nbnd = pw_coeffs[0].ncol();

        for c in pw_coeffs.iter() {
            assert_eq!(c.nrow(), gkvec.num_gvec());
            assert_eq!(c.ncol(), nbnd);
        }
        for occ in occupations.iter() {
            assert_eq!(occ.len(), nbnd);
        }

        KPointData {
            gkvec,
            weight,
            occupations,
            pw_coeffs,
            beta_projectors: None,
            mt_coeffs: None,
            mt_offsets: Vec::new(),
            hubbard_orbitals: None,
        }
    }

    pub fn with_beta_projectors(mut self, betas: BetaProjectors) -> KPointData {
        assert_eq!(betas.num_gkvec(), self.gkvec.num_gvec());

        self.beta_projectors = Some(betas);
        self
    }

    /// `offsets[ia]` is the first row of atom `ia` in every coefficient matrix.
    pub fn with_mt_coeffs(mut self, coeffs: Vec<Matrix<c64>>, offsets: Vec<usize>) -> KPointData {
        let nbnd = self.num_bands();

        for c in coeffs.iter() {
            assert_eq!(c.ncol(), nbnd);
        }

        self.mt_coeffs = Some(coeffs);
        self.mt_offsets = offsets;
        self
    }

    pub fn set_weight(&mut self, weight: f64) {
        self.weight = weight;
    }

    pub fn set_occupancy(&mut self, ibnd: usize, ispn: usize, occ: f64) {
        self.occupations[ispn][ibnd] = occ;
    }
}

impl KPoint for KPointData {
    fn weight(&self) -> f64 {
        self.weight
    }

    fn num_bands(&self) -> usize {
        self.pw_coeffs[0].ncol()
    }

    fn band_occupancy(&self, ibnd: usize, ispn: usize) -> f64 {
        self.occupations[ispn.min(self.occupations.len() - 1)][ibnd]
    }

    fn gkvec(&self) -> &Gvec {
        &self.gkvec
    }

    fn pw_coeffs(&self, ispn: usize) -> &Matrix<c64> {
        &self.pw_coeffs[ispn]
    }

    fn beta_projectors(&self) -> Option<&BetaProjectors> {
        self.beta_projectors.as_ref()
    }

    fn mt_coeffs(&self, ispn: usize) -> Option<&Matrix<c64>> {
        self.mt_coeffs.as_ref().map(|c| &c[ispn])
    }

    fn mt_offset(&self, ia: usize) -> usize {
        self.mt_offsets[ia]
    }

    fn hubbard_orbitals(&self) -> Option<&Matrix<c64>> {
        self.hubbard_orbitals.as_ref()
    }

    fn set_hubbard_orbitals(&mut self, phi: Matrix<c64>) {
        assert_eq!(phi.nrow(), self.gkvec.num_gvec());

        self.hubbard_orbitals = Some(phi);
    }
}

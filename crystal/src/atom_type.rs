use crate::{BasisIndex, CrystalError, RadialGrid};
use matrix::Matrix;
use special::ylm_real_to_complex;
use types::c64;

/// Radial part of a projector, stored as r * beta(r).
#[derive(Debug, Clone)]
pub struct BetaRadial {
    pub l: usize,
    pub j: Option<f64>,
    pub f: Vec<f64>,
}

/// Radial augmentation function of the pair (idxrf1, idxrf2) for one l, stored as r^2 Q(r).
#[derive(Debug, Clone)]
pub struct AugmentationRadial {
    pub idxrf1: usize,
    pub idxrf2: usize,
    pub l: usize,
    pub f: Vec<f64>,
}

/// Localized orbital used by the Hubbard correction, stored as r * phi(r).
#[derive(Debug, Clone, Default)]
pub struct HubbardOrbital {
    pub n: usize,
    pub l: usize,
    pub occupancy: f64,
    pub u: f64,
    pub j: f64,
    pub alpha: f64,
    pub beta: f64,
    pub j0: f64,
    pub f: Vec<f64>,
}

/// Partial waves of a PAW data set (r * phi(r)), one per projector radial function.
#[derive(Debug, Clone, Default)]
pub struct PawData {
    pub ae_wfc: Vec<Vec<f64>>,
    pub ps_wfc: Vec<Vec<f64>>,
    pub occupations: Vec<f64>,
    pub cutoff_index: usize,
}

/// Radial function u(r) of the full-potential muffin-tin basis.
#[derive(Debug, Clone)]
pub struct MtRadial {
    pub l: usize,
    pub f: Vec<f64>,
}

#[derive(Debug, Clone, Default)]
pub struct AtomType {
    symbol: String,
    zn: f64,
    zion: f64,
    grid: RadialGrid,
    mt_radius: f64,

    beta: Vec<BetaRadial>,
    d_ion: Matrix<f64>,
    q_radial: Vec<AugmentationRadial>,
    augment: bool,
    spin_orbit: bool,

    ps_rho: Vec<f64>,
    free_atom_rho: Vec<f64>,
    core_rho: Vec<f64>,

    hubbard: Vec<HubbardOrbital>,
    paw: Option<PawData>,
    mt_radial: Vec<MtRadial>,

    indexb: BasisIndex,
    mt_indexb: BasisIndex,
    f_coefficients: Vec<c64>,
}

impl AtomType {
    pub fn new(symbol: &str, zn: f64, zion: f64, grid: RadialGrid) -> AtomType {
        AtomType {
            symbol: symbol.to_string(),
            zn,
            zion,
            grid,
            mt_radius: 2.0,
            ..Default::default()
        }
    }

    pub fn add_beta(&mut self, l: usize, j: Option<f64>, f: Vec<f64>) {
        self.beta.push(BetaRadial { l, j, f });
    }

    /// Bare D matrix over radial functions.
    pub fn set_d_ion(&mut self, d_ion: Matrix<f64>) {
        self.d_ion = d_ion;
    }

    pub fn add_q_radial(&mut self, idxrf1: usize, idxrf2: usize, l: usize, f: Vec<f64>) {
        let (idxrf1, idxrf2) = if idxrf1 <= idxrf2 { (idxrf1, idxrf2) } else { (idxrf2, idxrf1) };

        self.q_radial.push(AugmentationRadial { idxrf1, idxrf2, l, f });
        self.augment = true;
    }

    /// 4 pi r^2 rho(r) of the pseudo atom.
    pub fn set_ps_rho(&mut self, f: Vec<f64>) {
        self.ps_rho = f;
    }

    /// rho(r) of the free (all-electron) atom.
    pub fn set_free_atom_rho(&mut self, f: Vec<f64>) {
        self.free_atom_rho = f;
    }

    /// rho_core(r), spherical.
    pub fn set_core_rho(&mut self, f: Vec<f64>) {
        self.core_rho = f;
    }

    pub fn add_hubbard_orbital(&mut self, orb: HubbardOrbital) {
        self.hubbard.push(orb);
    }

    pub fn set_paw(&mut self, paw: PawData) {
        self.paw = Some(paw);
    }

    pub fn add_mt_radial(&mut self, l: usize, f: Vec<f64>) {
        self.mt_radial.push(MtRadial { l, f });
    }

    pub fn set_mt_radius(&mut self, r: f64) {
        self.mt_radius = r;
    }

    pub fn set_spin_orbit(&mut self, so: bool) {
        self.spin_orbit = so;
    }

    /// Build basis indices and derived tables once all radial data is in place.
    pub fn init(&mut self) -> Result<(), CrystalError> {
        let ngrid = self.grid.len();

        let mut lengths: Vec<usize> = Vec::new();
        lengths.extend(self.beta.iter().map(|b| b.f.len()));
        lengths.extend(self.q_radial.iter().map(|q| q.f.len()));
        lengths.extend(self.hubbard.iter().map(|h| h.f.len()));
        lengths.extend(self.mt_radial.iter().map(|u| u.f.len()));
        for f in [&self.ps_rho, &self.free_atom_rho, &self.core_rho].iter() {
            if !f.is_empty() {
                lengths.push(f.len());
            }
        }

        if let Some(&found) = lengths.iter().find(|&&n| n > ngrid) {
            return Err(CrystalError::GridMismatch {
                symbol: self.symbol.clone(),
                found,
                expected: ngrid,
            });
        }

        if self.spin_orbit && self.beta.iter().any(|b| b.j.is_none()) {
            return Err(self.invalid("spin-orbit projectors need a total angular momentum"));
        }

        let nrf = self.beta.len();

        if self.d_ion.nrow() == 0 {
            self.d_ion = Matrix::new(nrf, nrf);
        } else if self.d_ion.nrow() != nrf || self.d_ion.ncol() != nrf {
            return Err(self.invalid("D matrix does not match the number of projectors"));
        }

        if self.q_radial.iter().any(|q| q.idxrf2 >= nrf) {
            return Err(self.invalid("augmentation function refers to a missing projector"));
        }

        if let Some(paw) = self.paw.as_ref() {
            if paw.ae_wfc.len() != nrf || paw.ps_wfc.len() != nrf || paw.occupations.len() != nrf {
                return Err(self.invalid("PAW partial waves do not match the projectors"));
            }
        }

        let radial: Vec<(usize, Option<f64>)> = self.beta.iter().map(|b| (b.l, b.j)).collect();
        self.indexb = BasisIndex::new(&radial);

        let radial: Vec<(usize, Option<f64>)> = self.mt_radial.iter().map(|u| (u.l, None)).collect();
        self.mt_indexb = BasisIndex::new(&radial);

        if self.spin_orbit {
            self.generate_f_coefficients();
        }

        Ok(())
    }

    fn invalid(&self, msg: &str) -> CrystalError {
        CrystalError::InvalidAtomType {
            symbol: self.symbol.clone(),
            msg: msg.to_string(),
        }
    }

    // f(xi1, xi2, s1, s2) = sum_mj <R_l m1|Omega^s1_ljmj> <Omega^s2_ljmj|R_l m2>
    fn generate_f_coefficients(&mut self) {
        let nbf = self.indexb.size();

        self.f_coefficients = vec![c64::new(0.0, 0.0); nbf * nbf * 4];

        for xi2 in 0..nbf {
            let b2 = *self.indexb.get(xi2);

            for xi1 in 0..nbf {
                let b1 = *self.indexb.get(xi1);

                let (j1, j2) = match (b1.j, b2.j) {
                    (Some(j1), Some(j2)) => (j1, j2),
                    _ => continue,
                };

                if b1.l != b2.l || (j1 - j2).abs() > 1.0E-8 {
                    continue;
                }

                let l = b1.l;
                let nmj = (2.0 * j1 + 1.0).round() as usize;

                for s1 in 0..2 {
                    for s2 in 0..2 {
                        let mut coef = c64::new(0.0, 0.0);

                        for k in 0..nmj {
                            let mj = -j1 + k as f64;

                            let a1 = spinor_overlap(l, j1, mj, b1.m, s1);
                            let a2 = spinor_overlap(l, j1, mj, b2.m, s2);

                            coef += a1 * a2.conj();
                        }

                        self.f_coefficients[xi1 + nbf * (xi2 + nbf * (s1 + 2 * s2))] = coef;
                    }
                }
            }
        }
    }

    pub fn get_symbol(&self) -> &str {
        &self.symbol
    }

    pub fn get_zn(&self) -> f64 {
        self.zn
    }

    pub fn get_zion(&self) -> f64 {
        self.zion
    }

    pub fn get_radial_grid(&self) -> &RadialGrid {
        &self.grid
    }

    pub fn get_mt_radius(&self) -> f64 {
        self.mt_radius
    }

    /// Grid points inside the muffin-tin sphere.
    pub fn num_mt_points(&self) -> usize {
        self.grid.index_of(self.mt_radius)
    }

    pub fn get_beta(&self) -> &[BetaRadial] {
        &self.beta
    }

    pub fn get_d_ion(&self) -> &Matrix<f64> {
        &self.d_ion
    }

    pub fn get_q_radial(&self) -> &[AugmentationRadial] {
        &self.q_radial
    }

    pub fn augment(&self) -> bool {
        self.augment
    }

    pub fn spin_orbit(&self) -> bool {
        self.spin_orbit
    }

    pub fn get_ps_rho(&self) -> &[f64] {
        &self.ps_rho
    }

    pub fn get_free_atom_rho(&self) -> &[f64] {
        &self.free_atom_rho
    }

    pub fn get_core_rho(&self) -> &[f64] {
        &self.core_rho
    }

    pub fn get_hubbard_orbitals(&self) -> &[HubbardOrbital] {
        &self.hubbard
    }

    pub fn hubbard_correction(&self) -> bool {
        !self.hubbard.is_empty()
    }

    pub fn get_paw(&self) -> Option<&PawData> {
        self.paw.as_ref()
    }

    pub fn is_paw(&self) -> bool {
        self.paw.is_some()
    }

    pub fn get_mt_radial(&self) -> &[MtRadial] {
        &self.mt_radial
    }

    pub fn indexb(&self) -> &BasisIndex {
        &self.indexb
    }

    pub fn mt_indexb(&self) -> &BasisIndex {
        &self.mt_indexb
    }

    /// Number of projector basis functions.
    pub fn nbf(&self) -> usize {
        self.indexb.size()
    }

    /// Number of muffin-tin basis functions.
    pub fn mt_nbf(&self) -> usize {
        self.mt_indexb.size()
    }

    pub fn f_coefficients(&self, xi1: usize, xi2: usize, s1: usize, s2: usize) -> c64 {
        let nbf = self.indexb.size();

        self.f_coefficients[xi1 + nbf * (xi2 + nbf * (s1 + 2 * s2))]
    }

    /// Whether xi1 and xi2 belong to projectors with the same l and j.
    pub fn compare_index_beta_functions(&self, xi1: usize, xi2: usize) -> bool {
        let b1 = self.indexb.get(xi1);
        let b2 = self.indexb.get(xi2);

        b1.l == b2.l
            && match (b1.j, b2.j) {
                (Some(j1), Some(j2)) => (j1 - j2).abs() < 1.0E-8,
                (None, None) => true,
                _ => false,
            }
    }

    /// Integral of r^2 Q_{rf1,rf2}^{l=0}, the augmentation charge of a radial pair.
    pub fn q_radial_integral(&self, idxrf1: usize, idxrf2: usize) -> f64 {
        let (idxrf1, idxrf2) = if idxrf1 <= idxrf2 { (idxrf1, idxrf2) } else { (idxrf2, idxrf1) };

        self.q_radial
            .iter()
            .filter(|q| q.l == 0 && q.idxrf1 == idxrf1 && q.idxrf2 == idxrf2)
            .map(|q| self.grid.integrate(&q.f))
            .sum()
    }

    pub fn lmax_hubbard(&self) -> usize {
        self.hubbard.iter().map(|h| h.l).max().unwrap_or(0)
    }
}

// <R_{l m}|Omega^s_{l j mj}>, s = 0 for spin up
fn spinor_overlap(l: usize, j: f64, mj: f64, m: i32, s: usize) -> c64 {
    let sigma = if s == 0 { 0.5 } else { -0.5 };
    let mc = (mj - sigma).round() as i32;

    if mc.abs() > l as i32 {
        return c64::new(0.0, 0.0);
    }

    let lf = l as f64;
    let denom = 2.0 * lf + 1.0;

    let cg = if j > lf {
        if s == 0 {
            ((lf + mj + 0.5) / denom).sqrt()
        } else {
            ((lf - mj + 0.5) / denom).sqrt()
        }
    } else if s == 0 {
        -((lf - mj + 0.5) / denom).sqrt()
    } else {
        ((lf + mj + 0.5) / denom).sqrt()
    };

    ylm_real_to_complex(m, mc).conj() * cg
}

use dwconsts::*;
use gvector::Gvec;
use num_traits::Zero;
use std::ops::Range;
use types::c64;
use vector3::*;

/// exp(-i 2pi G.r) with G in reciprocal-lattice units and r fractional.
#[inline]
pub fn phase_factor(g: Vector3i32, pos: Vector3f64) -> c64 {
    let gr = utility::dot_product_v3i32_v3f64(g, pos);

    (-I_C64 * TWOPI * gr).exp()
}

/// exp(-i 2pi (G+k).r)
#[inline]
pub fn gk_phase_factor(gk: Vector3f64, pos: Vector3f64) -> c64 {
    (-I_C64 * TWOPI * gk.dot_product(&pos)).exp()
}

/// Sum of phase factors of all atoms for the G-vectors `range` of `gvec`.
pub fn compute_structure_factor(gvec: &Gvec, range: Range<usize>, atom_positions: &[Vector3f64]) -> Vec<c64> {
    let mut sfact = vec![c64::zero(); range.len()];

    for (i, ig) in range.enumerate() {
        let g = gvec.gvec(ig);

        let mut t = c64::zero();

        for at in atom_positions {
            t += phase_factor(g, *at);
        }

        sfact[i] = t;
    }

    sfact
}

/// Phase factors of one atom for the G-vectors `range` of `gvec`.
pub fn compute_phase_factors_one_atom(gvec: &Gvec, range: Range<usize>, atom_position: Vector3f64) -> Vec<c64> {
    range.map(|ig| phase_factor(gvec.gvec(ig), atom_position)).collect()
}

/// Phase factors exp(-i (G+k).r) of one atom for every G+k vector of `gkvec`.
pub fn compute_gk_phase_factors_one_atom(gkvec: &Gvec, atom_position: Vector3f64) -> Vec<c64> {
    (0..gkvec.num_gvec())
        .map(|ig| gk_phase_factor(gkvec.gkvec(ig), atom_position))
        .collect()
}

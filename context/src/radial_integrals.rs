use crystal::UnitCell;
use dwconsts::*;

/// Spherical-Bessel transforms of the tabulated atomic densities.
///
/// `make_periodic_function` multiplies the returned values by `4 pi / omega`.
pub trait RadialIntegrals: Send + Sync {
    /// (1 / 4pi) int (4 pi r^2 rho_ps) j_0(g r) dr of atom type `iat`
    fn ps_rho(&self, iat: usize, g: f64) -> f64;

    /// int rho_free(r) j_0(g r) r^2 dr of atom type `iat`
    fn free_atom_rho(&self, iat: usize, g: f64) -> f64;
}

/// Radial integrals evaluated directly on each type's radial grid.
pub struct AtomicRadialIntegrals {
    grids: Vec<crystal::RadialGrid>,
    ps_rho: Vec<Vec<f64>>,
    free_atom_rho: Vec<Vec<f64>>,
}

impl AtomicRadialIntegrals {
    pub fn new(cell: &UnitCell) -> AtomicRadialIntegrals {
        let types = cell.atom_types();

        AtomicRadialIntegrals {
            grids: types.iter().map(|t| t.get_radial_grid().clone()).collect(),
            ps_rho: types.iter().map(|t| t.get_ps_rho().to_vec()).collect(),
            free_atom_rho: types.iter().map(|t| t.get_free_atom_rho().to_vec()).collect(),
        }
    }
}

impl RadialIntegrals for AtomicRadialIntegrals {
    fn ps_rho(&self, iat: usize, g: f64) -> f64 {
        let f = &self.ps_rho[iat];

        if f.is_empty() {
            return 0.0;
        }

        self.grids[iat].bessel_transform(f, 0, g, 0) / FOURPI
    }

    fn free_atom_rho(&self, iat: usize, g: f64) -> f64 {
        let f = &self.free_atom_rho[iat];

        if f.is_empty() {
            return 0.0;
        }

        self.grids[iat].bessel_transform(f, 0, g, 2)
    }
}

use crystal::{BasisIndex, UnitCell};
use dwconsts::*;
use dwmpi::Communicator;
use types::c64;

/// Atom-block density matrix D(xi1, xi2, comp, ia) in one flat buffer.
///
/// Block of atom `ia` starts at `offsets[ia]` and is laid out as
/// `xi1 + nbf * (xi2 + nbf * comp)`. Components are `[uu]`, `[uu, dd]` or
/// `[uu, dd, ud]`; `du(xi1, xi2) = conj(ud(xi2, xi1))` is not stored.
#[derive(Debug, Clone)]
pub struct DensityMatrix {
    nbf: Vec<usize>,
    offsets: Vec<usize>,
    num_comp: usize,
    data: Vec<c64>,
}

impl DensityMatrix {
    pub fn new(nbf: Vec<usize>, num_comp: usize) -> DensityMatrix {
        let mut offsets = Vec::with_capacity(nbf.len());
        let mut size = 0;

        for n in nbf.iter() {
            offsets.push(size);
            size += n * n * num_comp;
        }

        DensityMatrix {
            nbf,
            offsets,
            num_comp,
            data: vec![ZERO_C64; size],
        }
    }

    /// Sized by the projector basis, or by the muffin-tin basis in full-potential runs.
    pub fn for_unit_cell(cell: &UnitCell, num_mag_dims: usize, full_potential: bool) -> DensityMatrix {
        let nbf = (0..cell.num_atoms())
            .map(|ia| basis_of(cell, ia, full_potential).size())
            .collect();

        DensityMatrix::new(nbf, num_density_matrix_comp(num_mag_dims))
    }

    pub fn num_atoms(&self) -> usize {
        self.nbf.len()
    }

    pub fn num_comp(&self) -> usize {
        self.num_comp
    }

    pub fn nbf(&self, ia: usize) -> usize {
        self.nbf[ia]
    }

    #[inline]
    fn index(&self, xi1: usize, xi2: usize, comp: usize, ia: usize) -> usize {
        let n = self.nbf[ia];

        debug_assert!(xi1 < n && xi2 < n && comp < self.num_comp);

        self.offsets[ia] + xi1 + n * (xi2 + n * comp)
    }

    pub fn get(&self, xi1: usize, xi2: usize, comp: usize, ia: usize) -> c64 {
        self.data[self.index(xi1, xi2, comp, ia)]
    }

    pub fn set(&mut self, xi1: usize, xi2: usize, comp: usize, ia: usize, v: c64) {
        let i = self.index(xi1, xi2, comp, ia);
        self.data[i] = v;
    }

    pub fn add(&mut self, xi1: usize, xi2: usize, comp: usize, ia: usize, v: c64) {
        let i = self.index(xi1, xi2, comp, ia);
        self.data[i] += v;
    }

    /// Column-major (nbf x nbf) block of one component of atom `ia`.
    pub fn block(&self, comp: usize, ia: usize) -> &[c64] {
        let n = self.nbf[ia] * self.nbf[ia];
        let start = self.offsets[ia] + n * comp;

        &self.data[start..start + n]
    }

    pub fn block_mut(&mut self, comp: usize, ia: usize) -> &mut [c64] {
        let n = self.nbf[ia] * self.nbf[ia];
        let start = self.offsets[ia] + n * comp;

        &mut self.data[start..start + n]
    }

    /// All components of atom `ia`.
    pub fn atom_mut(&mut self, ia: usize) -> &mut [c64] {
        let start = self.offsets[ia];
        let n = self.nbf[ia] * self.nbf[ia] * self.num_comp;

        &mut self.data[start..start + n]
    }

    pub fn zero(&mut self) {
        for v in self.data.iter_mut() {
            *v = ZERO_C64;
        }
    }

    pub fn scale(&mut self, s: f64) {
        for v in self.data.iter_mut() {
            *v *= s;
        }
    }

    pub fn allreduce(&mut self, comm: &dyn Communicator) {
        dwmpi::allreduce_sum(comm, &mut self.data);
    }

    pub fn as_slice(&self) -> &[c64] {
        &self.data
    }

    pub fn checksum(&self) -> c64 {
        self.data.iter().sum()
    }

    /// Real combinations of one (xi1, xi2) pair: rho, then mz, mx, my as available.
    ///
    /// With the pair counted once for xi1 < xi2 and weighted by 2, the sum over pairs
    /// reproduces the full double sum over a symmetric kernel.
    pub fn aux(&self, xi1: usize, xi2: usize, ia: usize) -> [f64; 4] {
        let mut out = [0.0; 4];

        match self.num_comp {
            1 => {
                out[0] = self.get(xi1, xi2, 0, ia).re;
            }
            2 => {
                let uu = self.get(xi1, xi2, 0, ia);
                let dd = self.get(xi1, xi2, 1, ia);

                out[0] = (uu + dd).re;
                out[1] = (uu - dd).re;
            }
            _ => {
                let uu = self.get(xi1, xi2, 0, ia);
                let dd = self.get(xi1, xi2, 1, ia);
                let ud = self.get(xi1, xi2, 2, ia) + self.get(xi2, xi1, 2, ia);

                out[0] = (uu + dd).re;
                out[1] = (uu - dd).re;
                out[2] = ud.re;
                out[3] = ud.im;
            }
        }

        out
    }
}

/// Stored components for a given number of magnetic dimensions.
pub fn num_density_matrix_comp(num_mag_dims: usize) -> usize {
    match num_mag_dims {
        0 => 1,
        1 => 2,
        _ => 3,
    }
}

pub(crate) fn basis_of(cell: &UnitCell, ia: usize, full_potential: bool) -> &BasisIndex {
    let atype = cell.atom_type_of(ia);

    if full_potential {
        atype.mt_indexb()
    } else {
        atype.indexb()
    }
}

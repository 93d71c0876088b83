use crate::{AugmentationOperator, BetaProjectors};
use crystal::UnitCell;
use dwconsts::*;
use matrix::Matrix;
use types::c64;

/// Spin block of an operator acting on spinor components.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpinBlock {
    UpUp,
    DnDn,
    UpDn,
    DnUp,
}

impl SpinBlock {
    /// Diagonal block of collinear spin channel `ispn`.
    pub fn diagonal(ispn: usize) -> SpinBlock {
        if ispn == 0 {
            SpinBlock::UpUp
        } else {
            SpinBlock::DnDn
        }
    }
}

/// Atom-block matrices (D or Q) packed into one buffer.
///
/// Block of atom `ia` starts at `offset(ia)` and stores (xi1, xi2) as xi2 * nbf + xi1.
/// Only the real part is kept.
#[derive(Debug, Clone)]
pub struct NonLocalOperator {
    packed_mtrx_offset: Vec<usize>,
    nbf: Vec<usize>,
    packed_mtrx_size: usize,
    num_channels: usize,
    spin_dependent: bool,
    // op[ch][offset + xi2 * nbf + xi1]
    op: Vec<Vec<f64>>,
}

impl NonLocalOperator {
    fn empty(cell: &UnitCell, num_channels: usize, spin_dependent: bool) -> NonLocalOperator {
        let mut packed_mtrx_offset = Vec::with_capacity(cell.num_atoms());
        let mut nbf = Vec::with_capacity(cell.num_atoms());
        let mut packed_mtrx_size = 0;

        for ia in 0..cell.num_atoms() {
            let n = cell.atom_type_of(ia).nbf();

            packed_mtrx_offset.push(packed_mtrx_size);
            nbf.push(n);
            packed_mtrx_size += n * n;
        }

        NonLocalOperator {
            packed_mtrx_offset,
            nbf,
            packed_mtrx_size,
            num_channels,
            spin_dependent,
            op: vec![vec![0.0; packed_mtrx_size]; num_channels],
        }
    }

    /// D operator with channels (up, down[, x, y]) built from the (scalar, z[, x, y]) atom matrices.
    pub fn d_operator(cell: &UnitCell, num_mag_dims: usize) -> NonLocalOperator {
        let nch = num_mag_dims + 1;

        let mut d = NonLocalOperator::empty(cell, nch, num_mag_dims > 0);

        for ia in 0..cell.num_atoms() {
            let nbf = d.nbf[ia];
            let offs = d.packed_mtrx_offset[ia];

            for j in 0..nch {
                let dm = cell.atom(ia).get_d_mtrx(j);

                for xi2 in 0..nbf {
                    for xi1 in 0..nbf {
                        let v = dm[[xi1, xi2]];

                        debug_assert!(v.im.abs() < 1.0E-10, "D matrix of atom {} is not real: {}", ia, v);

                        d.op[j][offs + xi2 * nbf + xi1] = v.re;
                    }
                }
            }

            if num_mag_dims > 0 {
                for i in offs..offs + nbf * nbf {
                    let v0 = d.op[0][i];
                    let v1 = d.op[1][i];

                    d.op[0][i] = v0 + v1;
                    d.op[1][i] = v0 - v1;
                }
            }
        }

        d
    }

    /// Q operator: augmentation charges shared by all atoms of a type.
    pub fn q_operator(cell: &UnitCell, aug: &[Option<AugmentationOperator>]) -> NonLocalOperator {
        let mut q = NonLocalOperator::empty(cell, 1, false);

        for ia in 0..cell.num_atoms() {
            let iat = cell.atom(ia).get_type_id();

            let Some(aug_op) = aug[iat].as_ref() else { continue };

            let nbf = q.nbf[ia];
            let offs = q.packed_mtrx_offset[ia];

            for xi2 in 0..nbf {
                for xi1 in 0..nbf {
                    q.op[0][offs + xi2 * nbf + xi1] = aug_op.q_mtrx(xi1, xi2);
                }
            }
        }

        q
    }

    pub fn offset(&self, ia: usize) -> usize {
        self.packed_mtrx_offset[ia]
    }

    pub fn packed_mtrx_size(&self) -> usize {
        self.packed_mtrx_size
    }

    pub fn num_channels(&self) -> usize {
        self.num_channels
    }

    pub fn get(&self, xi1: usize, xi2: usize, ch: usize, ia: usize) -> f64 {
        let nbf = self.nbf[ia];

        self.op[ch][self.packed_mtrx_offset[ia] + xi2 * nbf + xi1]
    }

    pub fn set(&mut self, xi1: usize, xi2: usize, ch: usize, ia: usize, v: f64) {
        let nbf = self.nbf[ia];

        self.op[ch][self.packed_mtrx_offset[ia] + xi2 * nbf + xi1] = v;
    }

    /// Element of spin block `block`; off-diagonal blocks are x -/+ i y.
    pub fn value(&self, xi1: usize, xi2: usize, block: SpinBlock, ia: usize) -> c64 {
        if !self.spin_dependent {
            return match block {
                SpinBlock::UpUp | SpinBlock::DnDn => c64::new(self.get(xi1, xi2, 0, ia), 0.0),
                _ => ZERO_C64,
            };
        }

        match block {
            SpinBlock::UpUp => c64::new(self.get(xi1, xi2, 0, ia), 0.0),
            SpinBlock::DnDn => c64::new(self.get(xi1, xi2, 1, ia), 0.0),
            SpinBlock::UpDn | SpinBlock::DnUp if self.num_channels < 4 => ZERO_C64,
            SpinBlock::UpDn => c64::new(self.get(xi1, xi2, 2, ia), -self.get(xi1, xi2, 3, ia)),
            SpinBlock::DnUp => c64::new(self.get(xi1, xi2, 2, ia), self.get(xi1, xi2, 3, ia)),
        }
    }

    /// op_phi += |beta> O <beta|phi> for the atoms of chunk `ic`.
    pub fn apply(
        &self,
        betas: &BetaProjectors,
        ic: usize,
        block: SpinBlock,
        beta_phi: &Matrix<c64>,
        op_phi: &mut Matrix<c64>,
    ) {
        let chunk = betas.chunk(ic);

        debug_assert_eq!(beta_phi.nrow(), chunk.num_beta);
        debug_assert_eq!(op_phi.ncol(), beta_phi.ncol());

        let n = beta_phi.ncol();
        let mut work = Matrix::<c64>::new(chunk.num_beta, n);

        for (i, &ia) in chunk.atoms.iter().enumerate() {
            let nbf = self.nbf[ia];
            let offs = chunk.offsets[i];

            for j in 0..n {
                for xi1 in 0..nbf {
                    let mut s = ZERO_C64;

                    for xi2 in 0..nbf {
                        s += self.value(xi1, xi2, block, ia) * beta_phi[[offs + xi2, j]];
                    }

                    work[[offs + xi1, j]] = s;
                }
            }
        }

        Matrix::<c64>::gemm(ONE_C64, betas.pw_coeffs(ic), false, &work, ONE_C64, op_phi);
    }
}

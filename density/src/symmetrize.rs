use crate::density_matrix::basis_of;
use crate::{Density, DensityMatrix};
use dwconsts::*;
use matrix::Matrix;
use special::rotation_matrix_ylm;
use types::c64;

impl<'a> Density<'a> {
    /// Average the density matrix over the magnetic symmetry group.
    ///
    /// Each operation rotates the (l, m) indices with the real-harmonic rotation matrix,
    /// the spin indices with the SU(2) matrix, and moves atom `ia` onto `sym_table(ia, isym)`.
    pub fn symmetrize_density_matrix(&mut self) {
        let ctx = self.ctx;
        let cell = ctx.unit_cell();
        let sym = ctx.symmetry();
        let full_potential = ctx.full_potential();

        let nsym = sym.num_sym_ops();
        if nsym == 0 {
            return;
        }

        let lmax = (0..cell.num_atoms())
            .map(|ia| basis_of(cell, ia, full_potential).lmax())
            .max()
            .unwrap_or(0);

        let num_comp = self.density_matrix.num_comp();
        let nbf: Vec<usize> = (0..cell.num_atoms()).map(|ia| self.density_matrix.nbf(ia)).collect();

        let mut dm_sym = DensityMatrix::new(nbf, num_comp);

        for isym in 0..nsym {
            let rot_ylm = rotation_matrix_ylm(lmax, sym.get_rotation(isym));
            let u = sym.get_spin_rotation(isym);

            for ia in 0..cell.num_atoms() {
                let ja = sym.sym_table(ia, isym);
                let indexb = basis_of(cell, ia, full_potential);
                let n = indexb.size();

                if n == 0 {
                    continue;
                }

                // orbital rotation, one component at a time
                let rotated: Vec<Matrix<c64>> = (0..num_comp)
                    .map(|comp| {
                        let mut out = Matrix::<c64>::new(n, n);

                        for xi2p in 0..n {
                            let b2 = indexb.get(xi2p);
                            let off2 = indexb.offset_of_rf(b2.idxrf);
                            let l2 = b2.l * b2.l;

                            for xi1p in 0..n {
                                let b1 = indexb.get(xi1p);
                                let off1 = indexb.offset_of_rf(b1.idxrf);
                                let l1 = b1.l * b1.l;

                                let mut z = ZERO_C64;

                                for m2 in 0..2 * b2.l + 1 {
                                    let r2 = rot_ylm[[b2.lm, l2 + m2]];
                                    if r2 == 0.0 {
                                        continue;
                                    }

                                    for m1 in 0..2 * b1.l + 1 {
                                        let r1 = rot_ylm[[b1.lm, l1 + m1]];
                                        if r1 == 0.0 {
                                            continue;
                                        }

                                        z += r1 * r2 * self.density_matrix.get(off1 + m1, off2 + m2, comp, ia);
                                    }
                                }

                                out[[xi1p, xi2p]] = z;
                            }
                        }

                        out
                    })
                    .collect();

                // spin rotation: S' = conj(U) S U^T
                for xi2 in 0..n {
                    for xi1 in 0..n {
                        let s = spin_block(&rotated, xi1, xi2, num_comp);
                        let sp = rotate_spin(u, &s);

                        dm_sym.add(xi1, xi2, 0, ja, if num_comp == 1 { s[0][0] } else { sp[0][0] });

                        if num_comp > 1 {
                            dm_sym.add(xi1, xi2, 1, ja, sp[1][1]);
                        }
                        if num_comp > 2 {
                            dm_sym.add(xi1, xi2, 2, ja, sp[0][1]);
                        }
                    }
                }
            }
        }

        dm_sym.scale(1.0 / nsym as f64);
        self.density_matrix = dm_sym;

        self.print_checksum("density_matrix", self.density_matrix.checksum());
    }
}

// 2x2 spin matrix of the pair (xi1, xi2); du(1,2) = conj(ud(2,1))
fn spin_block(d: &[Matrix<c64>], xi1: usize, xi2: usize, num_comp: usize) -> [[c64; 2]; 2] {
    match num_comp {
        1 => [[d[0][[xi1, xi2]], ZERO_C64], [ZERO_C64, ZERO_C64]],
        2 => [[d[0][[xi1, xi2]], ZERO_C64], [ZERO_C64, d[1][[xi1, xi2]]]],
        _ => [
            [d[0][[xi1, xi2]], d[2][[xi1, xi2]]],
            [d[2][[xi2, xi1]].conj(), d[1][[xi1, xi2]]],
        ],
    }
}

fn rotate_spin(u: &[[c64; 2]; 2], s: &[[c64; 2]; 2]) -> [[c64; 2]; 2] {
    let mut out = [[ZERO_C64; 2]; 2];

    for i in 0..2 {
        for j in 0..2 {
            let mut z = ZERO_C64;

            for k in 0..2 {
                for l in 0..2 {
                    z += u[i][k].conj() * s[k][l] * u[j][l];
                }
            }

            out[i][j] = z;
        }
    }

    out
}

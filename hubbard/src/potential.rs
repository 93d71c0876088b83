use crate::{HubbardPotential, InteractionTensor};
use dwconsts::*;
use tracing::debug;
use types::c64;

impl<'a> HubbardPotential<'a> {
    /// Potential V = dE/dn and the energy terms of the current occupation.
    ///
    /// Everything is recomputed from scratch; the branch (simplified, full collinear or
    /// non-collinear) was fixed when the object was built.
    pub fn calculate_hubbard_potential_and_energy(&mut self) {
        self.energy = 0.0;
        self.energy_u = 0.0;
        self.energy_dc = 0.0;
        self.energy_noflip = 0.0;
        self.energy_flip = 0.0;

        self.potential.set_value(ZERO_C64);

        if !self.enabled {
            return;
        }

        if self.noncollinear {
            self.potential_and_energy_noncollinear();
        } else if self.simplified {
            self.potential_and_energy_simplified();
        } else {
            self.potential_and_energy_collinear();
        }

        debug!(
            energy = self.energy,
            energy_u = self.energy_u,
            energy_dc = self.energy_dc,
            "hubbard potential and energy"
        );
    }

    // (m1, m2) block of spin block `is` on atom `ia`, m1 fastest
    fn occupation_block(&self, is: usize, ia: usize, n: usize) -> Vec<c64> {
        let mut out = vec![ZERO_C64; n * n];

        for m2 in 0..n {
            for m1 in 0..n {
                out[m1 + n * m2] = self.occupation[[m1, m2, is, ia, 0]];
            }
        }

        out
    }

    // Dudarev form with the alpha, beta and J0 extensions
    fn potential_and_energy_simplified(&mut self) {
        let num_spins = self.ctx.control().num_spins();

        for ia in 0..self.offsets.len() {
            let orb = match self.hubbard_orbital(ia) {
                Some(orb) => orb,
                None => continue,
            };

            let n = 2 * orb.l + 1;
            let u_eff = orb.u - orb.j0;
            let spin_terms = orb.j0.abs() > EPS8 || orb.beta.abs() > EPS8;

            let occ: Vec<Vec<c64>> = (0..num_spins).map(|is| self.occupation_block(is, ia, n)).collect();

            for is in 0..num_spins {
                let other = if num_spins == 2 { 1 - is } else { is };
                let sign = if num_spins == 1 {
                    0.0
                } else if is == 0 {
                    1.0
                } else {
                    -1.0
                };

                let mut e = 0.0;

                for m1 in 0..n {
                    e += (orb.alpha + 0.5 * u_eff) * occ[is][m1 + n * m1].re;
                    self.potential[[m1, m1, is, ia, 0]] += orb.alpha + 0.5 * u_eff;

                    for m2 in 0..n {
                        e -= 0.5 * u_eff * (occ[is][m2 + n * m1] * occ[is][m1 + n * m2]).re;
                        self.potential[[m1, m2, is, ia, 0]] -= u_eff * occ[is][m2 + n * m1];
                    }
                }

                if spin_terms {
                    for m1 in 0..n {
                        e += sign * orb.beta * occ[is][m1 + n * m1].re;
                        self.potential[[m1, m1, is, ia, 0]] += sign * orb.beta;

                        for m2 in 0..n {
                            e += 0.5 * orb.j0 * (occ[is][m2 + n * m1] * occ[other][m1 + n * m2]).re;
                            self.potential[[m1, m2, is, ia, 0]] += orb.j0 * occ[other][m2 + n * m1];
                        }
                    }
                }

                self.energy += e;
            }
        }

        if num_spins == 1 {
            self.energy *= 2.0;
        }

        self.energy_u = self.energy;
    }

    // rotationally invariant form, fully localized limit double counting
    fn potential_and_energy_collinear(&mut self) {
        let num_spins = self.ctx.control().num_spins();
        let cell = self.ctx.unit_cell();

        for ia in 0..self.offsets.len() {
            let orb = match self.hubbard_orbital(ia) {
                Some(orb) => orb,
                None => continue,
            };

            let iat = cell.atom(ia).get_type_id();
            let tensor = match self.interaction[iat].as_ref() {
                Some(t) => t.clone(),
                None => continue,
            };

            let n = 2 * orb.l + 1;
            let (u, j) = (orb.u, orb.j);

            let occ: Vec<Vec<c64>> = (0..num_spins).map(|is| self.occupation_block(is, ia, n)).collect();
            let traces: Vec<f64> = occ.iter().map(|o| trace(o, n)).collect();

            let (ntot, nel, mag) = if num_spins == 1 {
                (occ[0].iter().map(|z| 2.0 * *z).collect::<Vec<c64>>(), 2.0 * traces[0], 0.0)
            } else {
                (
                    occ[0].iter().zip(occ[1].iter()).map(|(a, b)| *a + *b).collect(),
                    traces[0] + traces[1],
                    traces[0] - traces[1],
                )
            };

            let dc = 0.5 * (u * nel * (nel - 1.0) - j * nel * (0.5 * nel - 1.0) - 0.5 * j * mag * mag);

            let mut energy_u = 0.0;

            for is in 0..num_spins {
                let v = mean_field(&tensor, &ntot, &occ[is], n);

                for m2 in 0..n {
                    for m1 in 0..n {
                        let mut z = v[m1 + n * m2];

                        if m1 == m2 {
                            z += j * traces[is] + 0.5 * (u - j) - u * nel;
                        }

                        self.potential[[m1, m2, is, ia, 0]] = z;
                    }
                }

                energy_u += interaction_energy(&tensor, &occ[is], &ntot, &occ[is], n);
            }

            if num_spins == 1 {
                energy_u *= 2.0;
            }

            self.energy_u += energy_u;
            self.energy_dc += dc;
        }

        self.energy = self.energy_u - self.energy_dc;
    }

    // spinor occupation; no-flip and flip terms plus the spin-rotation invariant double counting
    fn potential_and_energy_noncollinear(&mut self) {
        let cell = self.ctx.unit_cell();

        for ia in 0..self.offsets.len() {
            let orb = match self.hubbard_orbital(ia) {
                Some(orb) => orb,
                None => continue,
            };

            let iat = cell.atom(ia).get_type_id();
            let tensor = match self.interaction[iat].as_ref() {
                Some(t) => t.clone(),
                None => continue,
            };

            let n = 2 * orb.l + 1;
            let (u, j) = (orb.u, orb.j);

            let occ: Vec<Vec<c64>> = (0..4).map(|is| self.occupation_block(is, ia, n)).collect();
            let ntot: Vec<c64> = occ[0].iter().zip(occ[1].iter()).map(|(a, b)| *a + *b).collect();

            let (n_up, n_dn) = (trace(&occ[0], n), trace(&occ[1], n));
            let t_ud: c64 = (0..n).map(|m| occ[2][m + n * m]).sum();
            let t_du: c64 = (0..n).map(|m| occ[3][m + n * m]).sum();

            let nel = n_up + n_dn;
            let mz = n_up - n_dn;
            let mx = 2.0 * t_ud.re;
            let my = -2.0 * t_ud.im;
            let mag2 = mz * mz + mx * mx + my * my;

            let dc = 0.5 * (u * nel * (nel - 1.0) - j * nel * (0.5 * nel - 1.0) - 0.5 * j * mag2);

            let mut noflip = 0.0;

            for is in 0..2 {
                let v = mean_field(&tensor, &ntot, &occ[is], n);
                let sign = if is == 0 { 1.0 } else { -1.0 };

                for m2 in 0..n {
                    for m1 in 0..n {
                        let mut z = v[m1 + n * m2];

                        if m1 == m2 {
                            z -= u * (nel - 0.5) - j * (0.5 * nel - 0.5) - sign * 0.5 * j * mz;
                        }

                        self.potential[[m1, m2, is, ia, 0]] = z;
                    }
                }

                noflip += interaction_energy(&tensor, &occ[is], &ntot, &occ[is], n);
            }

            let mut flip = 0.0;

            // block 2 (up-dn) couples to block 3 (dn-up) and back
            for (is, js, tr) in [(2, 3, t_du), (3, 2, t_ud)].iter() {
                let v = exchange_field(&tensor, &occ[*js], n);

                for m2 in 0..n {
                    for m1 in 0..n {
                        let mut z = -v[m1 + n * m2];

                        if m1 == m2 {
                            z += j * *tr;
                        }

                        self.potential[[m1, m2, *is, ia, 0]] = z;
                    }
                }

                flip -= 0.5 * exchange_energy(&tensor, &occ[*is], &occ[*js], n);
            }

            self.energy_noflip += noflip;
            self.energy_flip += flip;
            self.energy_dc += dc;
        }

        self.energy_u = self.energy_noflip + self.energy_flip;
        self.energy = self.energy_u - self.energy_dc;
    }
}

fn trace(a: &[c64], n: usize) -> f64 {
    (0..n).map(|m| a[m + n * m].re).sum()
}

// sum_{m3 m4} U(m1, m3, m2, m4) ntot(m3, m4) - U(m1, m3, m4, m2) n(m3, m4)
fn mean_field(u: &InteractionTensor, ntot: &[c64], n_s: &[c64], n: usize) -> Vec<c64> {
    let mut v = vec![ZERO_C64; n * n];
    let x = exchange_field(u, n_s, n);

    for m2 in 0..n {
        for m1 in 0..n {
            let mut z = ZERO_C64;

            for m4 in 0..n {
                for m3 in 0..n {
                    z += u.get(m1, m3, m2, m4) * ntot[m3 + n * m4];
                }
            }

            v[m1 + n * m2] = z - x[m1 + n * m2];
        }
    }

    v
}

// sum_{m3 m4} U(m1, m3, m4, m2) n(m3, m4)
fn exchange_field(u: &InteractionTensor, n_s: &[c64], n: usize) -> Vec<c64> {
    let mut v = vec![ZERO_C64; n * n];

    for m2 in 0..n {
        for m1 in 0..n {
            let mut z = ZERO_C64;

            for m4 in 0..n {
                for m3 in 0..n {
                    z += u.get(m1, m3, m4, m2) * n_s[m3 + n * m4];
                }
            }

            v[m1 + n * m2] = z;
        }
    }

    v
}

// 1/2 sum U(m1, m2, m3, m4) a(m1, m3) b(m2, m4) - 1/2 sum U(m1, m2, m4, m3) a(m1, m3) c(m2, m4)
fn interaction_energy(u: &InteractionTensor, a: &[c64], b: &[c64], c: &[c64], n: usize) -> f64 {
    let mut e = 0.0;

    for m4 in 0..n {
        for m3 in 0..n {
            for m2 in 0..n {
                for m1 in 0..n {
                    let z = u.get(m1, m2, m3, m4) * a[m1 + n * m3] * b[m2 + n * m4]
                        - u.get(m1, m2, m4, m3) * a[m1 + n * m3] * c[m2 + n * m4];
                    e += 0.5 * z.re;
                }
            }
        }
    }

    e
}

// sum U(m1, m2, m4, m3) a(m1, m3) b(m2, m4)
fn exchange_energy(u: &InteractionTensor, a: &[c64], b: &[c64], n: usize) -> f64 {
    let mut e = 0.0;

    for m4 in 0..n {
        for m3 in 0..n {
            for m2 in 0..n {
                for m1 in 0..n {
                    e += (u.get(m1, m2, m4, m3) * a[m1 + n * m3] * b[m2 + n * m4]).re;
                }
            }
        }
    }

    e
}

use crystal::HubbardOrbital;
use dwconsts::*;
use special::RealGaunt;

/// Slater integrals F0, F2, .. F2l from U and J with the usual atomic ratios.
pub fn slater_integrals(l: usize, u: f64, j: f64) -> Vec<f64> {
    let mut f = vec![0.0; l + 1];
    f[0] = u;

    match l {
        1 => {
            f[1] = 5.0 * j;
        }
        2 => {
            f[1] = 14.0 * j / (1.0 + 0.625);
            f[2] = 0.625 * f[1];
        }
        3 => {
            f[1] = 6435.0 * j / (286.0 + 195.0 * 0.668 + 250.0 * 0.494);
            f[2] = 0.668 * f[1];
            f[3] = 0.494 * f[1];
        }
        _ => {}
    }

    f
}

/// Rotationally invariant on-site interaction U(m1, m2, m3, m4) = <m1 m2|V|m3 m4>
/// over the real harmonics of one l shell.
#[derive(Debug, Clone)]
pub struct InteractionTensor {
    l: usize,
    u: f64,
    j: f64,
    data: Vec<f64>,
}

impl InteractionTensor {
    pub fn new(orb: &HubbardOrbital) -> InteractionTensor {
        let l = orb.l;
        let n = 2 * l + 1;

        let f = slater_integrals(l, orb.u, orb.j);
        let gaunt = RealGaunt::new(l, 2 * l, l);

        let mut data = vec![0.0; n * n * n * n];

        for m4 in 0..n {
            for m3 in 0..n {
                for m2 in 0..n {
                    for m1 in 0..n {
                        let mut s = 0.0;

                        // only even k couple two orbitals of the same l
                        for (ik, fk) in f.iter().enumerate() {
                            let k = 2 * ik;
                            let mut sq = 0.0;

                            for q in 0..2 * k + 1 {
                                let kq = k * k + q;
                                sq += gaunt.get(l * l + m1, kq, l * l + m3) * gaunt.get(l * l + m2, kq, l * l + m4);
                            }

                            s += fk * FOURPI / (2 * k + 1) as f64 * sq;
                        }

                        data[m1 + n * (m2 + n * (m3 + n * m4))] = s;
                    }
                }
            }
        }

        InteractionTensor { l, u: orb.u, j: orb.j, data }
    }

    pub fn l(&self) -> usize {
        self.l
    }

    pub fn hubbard_u(&self) -> f64 {
        self.u
    }

    pub fn hubbard_j(&self) -> f64 {
        self.j
    }

    #[inline]
    pub fn get(&self, m1: usize, m2: usize, m3: usize, m4: usize) -> f64 {
        let n = 2 * self.l + 1;

        self.data[m1 + n * (m2 + n * (m3 + n * m4))]
    }
}

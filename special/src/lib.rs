mod quadrature;
pub use quadrature::*;

mod gaunt;
pub use gaunt::*;

mod rotation;
pub use rotation::*;

use dwconsts::*;
use types::c64;
use vector3::*;

// https://en.wikipedia.org/wiki/Bessel_function#Spherical_Bessel_functions:_jn,_yn

pub fn spherical_bessel_jn(n: usize, x: f64) -> f64 {
    let x = x.abs();

    if x < 1.0E-4 {
        // x^n / (2n+1)!! * (1 - x^2 / (2(2n+3)))
        let mut dfact = 1.0;
        for k in 0..=n {
            dfact *= (2 * k + 1) as f64;
        }

        let x2 = x * x;

        return x.powi(n as i32) / dfact
            * (1.0 - x2 / (2.0 * (2 * n + 3) as f64)
                + x2 * x2 / (8.0 * ((2 * n + 3) * (2 * n + 5)) as f64));
    }

    let j0 = x.sin() / x;

    if n == 0 {
        return j0;
    }

    let j1 = x.sin() / x / x - x.cos() / x;

    if (n as f64) < x {
        // upward recurrence is stable for x > n
        let mut jm = j0;
        let mut jc = j1;

        for k in 1..n {
            let jp = (2 * k + 1) as f64 / x * jc - jm;
            jm = jc;
            jc = jp;
        }

        return jc;
    }

    // Miller's downward recurrence, normalized with whichever of j0, j1 is larger
    let nstart = n + 16 + (10.0 * (n as f64).sqrt()) as usize + x as usize;

    let mut jp = 0.0;
    let mut jc = 1.0E-30;
    let mut jn = 0.0;
    let mut j1_unnorm = 0.0;

    for k in (1..=nstart).rev() {
        let jm = (2 * k + 1) as f64 / x * jc - jp;
        jp = jc;
        jc = jm;

        if k - 1 == n {
            jn = jc;
        }

        if k - 1 == 1 {
            j1_unnorm = jc;
        }

        if jc.abs() > 1.0E250 {
            jc *= 1.0E-250;
            jp *= 1.0E-250;
            jn *= 1.0E-250;
            j1_unnorm *= 1.0E-250;
        }
    }

    if j0.abs() > j1.abs() {
        jn * j0 / jc
    } else {
        jn * j1 / j1_unnorm
    }
}

/// Associated Legendre functions P_l^m(x) for 0 <= m <= l <= lmax, Condon-Shortley phase included.
///
/// Stored at `l * (l + 1) / 2 + m`.
pub fn associated_legendre(lmax: usize, x: f64) -> Vec<f64> {
    let idx = |l: usize, m: usize| l * (l + 1) / 2 + m;

    let mut p = vec![0.0; (lmax + 1) * (lmax + 2) / 2];

    let s = (1.0 - x * x).max(0.0).sqrt();

    let mut pmm = 1.0;

    for m in 0..=lmax {
        if m > 0 {
            pmm *= -((2 * m - 1) as f64) * s;
        }

        p[idx(m, m)] = pmm;

        if m < lmax {
            p[idx(m + 1, m)] = x * (2 * m + 1) as f64 * pmm;
        }

        for l in m + 2..=lmax {
            p[idx(l, m)] = ((2 * l - 1) as f64 * x * p[idx(l - 1, m)]
                - (l + m - 1) as f64 * p[idx(l - 2, m)])
                / (l - m) as f64;
        }
    }

    p
}

/// All real spherical harmonics R_lm(theta, phi) up to lmax, ordered by `utility::lm`.
pub fn real_ylm_all(lmax: usize, theta: f64, phi: f64) -> Vec<f64> {
    let p = associated_legendre(lmax, theta.cos());

    let mut rlm = vec![0.0; utility::lmmax(lmax)];

    for l in 0..=lmax {
        for m in 0..=l {
            // (l-m)! / (l+m)!
            let mut ratio = 1.0;
            for k in (l - m + 1)..=(l + m) {
                ratio /= k as f64;
            }

            let norm = ((2 * l + 1) as f64 / FOURPI * ratio).sqrt();
            let plm = p[l * (l + 1) / 2 + m];

            if m == 0 {
                rlm[utility::lm(l, 0)] = norm * plm;
            } else {
                let f = std::f64::consts::SQRT_2 * norm * plm;
                let mf = m as f64 * phi;

                rlm[utility::lm(l, m as i32)] = f * mf.cos();
                rlm[utility::lm(l, -(m as i32))] = f * mf.sin();
            }
        }
    }

    rlm
}

pub fn real_ylm_all_of_vector(lmax: usize, v: Vector3f64) -> Vec<f64> {
    let (_, theta, phi) = v.to_spherical();

    real_ylm_all(lmax, theta, phi)
}

pub fn real_spherical_harmonics(l: usize, m: i32, v: Vector3f64) -> f64 {
    real_ylm_all_of_vector(l, v)[utility::lm(l, m)]
}

/// Coefficient of Y_{l m_c} in the expansion of R_{l m_r} in complex spherical harmonics.
///
/// The complex harmonics carry the Condon-Shortley phase.
pub fn ylm_real_to_complex(m_r: i32, m_c: i32) -> c64 {
    let s = std::f64::consts::FRAC_1_SQRT_2;
    let mu = m_r.abs();
    let sign = if mu % 2 == 0 { 1.0 } else { -1.0 };

    if m_r == 0 {
        if m_c == 0 {
            c64::new(1.0, 0.0)
        } else {
            c64::new(0.0, 0.0)
        }
    } else if m_r > 0 {
        if m_c == mu {
            c64::new(s, 0.0)
        } else if m_c == -mu {
            c64::new(sign * s, 0.0)
        } else {
            c64::new(0.0, 0.0)
        }
    } else if m_c == mu {
        c64::new(0.0, -s)
    } else if m_c == -mu {
        c64::new(0.0, sign * s)
    } else {
        c64::new(0.0, 0.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_spherical_bessel_closed_forms() {
        for &x in [1.0E-5f64, 0.3, 1.7, 4.2, 11.0].iter() {
            let (s, c) = (x.sin(), x.cos());

            let j0 = s / x;
            let j1 = s / x / x - c / x;
            let j2 = (3.0 / x / x - 1.0) * s / x - 3.0 * c / x / x;
            let j3 = (15.0 / x.powi(4) - 6.0 / x.powi(2)) * s - (15.0 / x.powi(3) - 1.0 / x) * c;

            assert!((spherical_bessel_jn(0, x) - j0).abs() < 1.0E-12);
            if x > 1.0E-3 {
                assert!((spherical_bessel_jn(1, x) - j1).abs() < 1.0E-10);
                assert!((spherical_bessel_jn(2, x) - j2).abs() < 1.0E-10);
                assert!((spherical_bessel_jn(3, x) - j3).abs() < 1.0E-9);
            }
        }
    }

    #[test]
    fn test_spherical_bessel_near_zero_of_j0() {
        let x = PI;
        let j4 = (105.0 / x.powi(5) - 45.0 / x.powi(3) + 1.0 / x) * x.sin()
            - (105.0 / x.powi(4) - 10.0 / x.powi(2)) * x.cos();

        assert!((spherical_bessel_jn(4, x) - j4).abs() < 1.0E-12);
    }

    #[test]
    fn test_spherical_bessel_small_argument() {
        let x = 1.0E-5;
        assert!((spherical_bessel_jn(2, x) - x * x / 15.0).abs() < 1.0E-20);
        assert!(spherical_bessel_jn(6, 0.0).abs() < 1.0E-300);
    }

    #[test]
    fn test_real_ylm_low_orders() {
        let v = Vector3f64::new(0.3, -0.4, 0.5);
        let r = v.norm2();
        let c1 = (3.0 / FOURPI).sqrt();

        assert!((real_spherical_harmonics(0, 0, v) - Y00).abs() < 1.0E-14);
        assert!((real_spherical_harmonics(1, -1, v) + c1 * v.y / r).abs() < 1.0E-14);
        assert!((real_spherical_harmonics(1, 0, v) - c1 * v.z / r).abs() < 1.0E-14);
        assert!((real_spherical_harmonics(1, 1, v) + c1 * v.x / r).abs() < 1.0E-14);

        let c2 = 0.5 * (15.0 / PI).sqrt();
        assert!((real_spherical_harmonics(2, -2, v) - c2 * v.x * v.y / r / r).abs() < 1.0E-14);
    }

    #[test]
    fn test_real_ylm_orthonormal() {
        let lmax = 4;
        let quad = SphereQuadrature::new(2 * lmax);
        let n = utility::lmmax(lmax);

        let mut ovlp = vec![0.0; n * n];

        for ip in 0..quad.len() {
            let (theta, phi, w) = quad.point(ip);
            let rlm = real_ylm_all(lmax, theta, phi);

            for i in 0..n {
                for j in 0..n {
                    ovlp[i + j * n] += w * rlm[i] * rlm[j];
                }
            }
        }

        for i in 0..n {
            for j in 0..n {
                let expected = if i == j { 1.0 } else { 0.0 };
                assert!((ovlp[i + j * n] - expected).abs() < 1.0E-12);
            }
        }
    }

    #[test]
    fn test_ylm_real_to_complex_reconstructs_real_harmonics() {
        let lmax = 3;
        let rlm = real_ylm_all(lmax, 0.7, -1.9);

        // complex Y_lm from the real set
        let ylm = |l: usize, m: i32| -> c64 {
            let mu = m.abs();
            if mu == 0 {
                return c64::new(rlm[utility::lm(l, 0)], 0.0);
            }
            let y = c64::new(rlm[utility::lm(l, mu)], rlm[utility::lm(l, -mu)]) / std::f64::consts::SQRT_2;
            if m > 0 {
                y
            } else if mu % 2 == 0 {
                y.conj()
            } else {
                -y.conj()
            }
        };

        for l in 0..=lmax {
            let li = l as i32;
            for mr in -li..=li {
                let mut sum = c64::new(0.0, 0.0);
                for mc in -li..=li {
                    sum += ylm_real_to_complex(mr, mc) * ylm(l, mc);
                }
                assert!((sum.re - rlm[utility::lm(l, mr)]).abs() < 1.0E-12);
                assert!(sum.im.abs() < 1.0E-12);
            }
        }
    }
}

use itertools::multizip;

/// Composite Simpson rule on a mapped grid, `rab = dr/di`.
///
/// An even number of points is handled with a 3/8 rule on the last four.
pub fn simpson_rab(y: &[f64], rab: &[f64]) -> f64 {
    assert_eq!(y.len(), rab.len());

    let npts = y.len();

    match npts {
        0 | 1 => return 0.0,
        2 => return 0.5 * (y[0] * rab[0] + y[1] * rab[1]),
        _ => {}
    }

    let even = npts % 2 == 0;

    // 4 points: 3/8 rule only
    let n = if even { npts - 3 } else { npts };

    let r12 = 1.0 / 3.0;

    let mut s = 0.0;

    for i in (0..n.saturating_sub(1)).step_by(2) {
        s += (y[i] * rab[i] + 4.0 * y[i + 1] * rab[i + 1] + y[i + 2] * rab[i + 2]) * r12;
    }

    if even {
        let r38 = 3.0 / 8.0;

        s += (y[npts - 4] * rab[npts - 4]
            + 3.0 * y[npts - 3] * rab[npts - 3]
            + 3.0 * y[npts - 2] * rab[npts - 2]
            + y[npts - 1] * rab[npts - 1])
            * r38;
    }

    s
}

/// int f(r) r^m dr on a mapped grid
pub fn radial_moment(f: &[f64], r: &[f64], rab: &[f64], m: i32) -> f64 {
    let y: Vec<f64> = multizip((f.iter(), r.iter())).map(|(f, r)| f * r.powi(m)).collect();

    simpson_rab(&y, rab)
}

/// Uniform-step Simpson rule.
pub fn simpson(y: &[f64], dx: f64) -> f64 {
    simpson_rab(y, &vec![dx; y.len()])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_simpson_rab_odd_count_matches_analytic() {
        let y = vec![0.0, 1.0, 4.0, 9.0, 16.0];
        let rab = vec![1.0; y.len()];

        assert!((simpson_rab(&y, &rab) - 64.0 / 3.0).abs() < 1.0e-12);
    }

    #[test]
    fn test_simpson_rab_even_count_uses_38_tail() {
        let y = vec![0.0, 1.0, 8.0, 27.0, 64.0, 125.0];
        let rab = vec![1.0; y.len()];

        assert!((simpson_rab(&y, &rab) - 625.0 / 4.0).abs() < 1.0e-12);
    }

    #[test]
    fn test_simpson_four_points() {
        // x^3 on [0, 3]
        let y = vec![0.0, 1.0, 8.0, 27.0];

        assert!((simpson(&y, 1.0) - 81.0 / 4.0).abs() < 1.0e-12);
    }

    #[test]
    fn test_radial_moment_log_grid() {
        // int_0^R r^2 dr on an exponential grid r_i = r0 exp(i dx)
        let n = 801;
        let r0 = 1.0e-6f64;
        let rmax = 2.0f64;
        let dx = (rmax / r0).ln() / (n - 1) as f64;

        let r: Vec<f64> = (0..n).map(|i| r0 * (i as f64 * dx).exp()).collect();
        let rab: Vec<f64> = r.iter().map(|r| r * dx).collect();
        let f = vec![1.0; n];

        let got = radial_moment(&f, &r, &rab, 2);
        assert!((got - rmax.powi(3) / 3.0).abs() < 1.0e-6);
    }
}

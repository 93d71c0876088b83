use super::*;
use lattice::Lattice;
use matrix::Matrix;
use vector3::*;

fn grid() -> RadialGrid {
    RadialGrid::exponential(801, 1.0E-5, 10.0)
}

fn make_type(symbol: &str, zion: f64) -> AtomType {
    let g = grid();
    let r = g.get_r().to_vec();

    let mut t = AtomType::new(symbol, zion + 2.0, zion, g);

    t.add_beta(0, None, r.iter().map(|x| x * (-x * x).exp()).collect());
    t.add_beta(1, None, r.iter().map(|x| x * x * (-x * x).exp()).collect());

    let mut d = Matrix::<f64>::new(2, 2);
    d[[0, 0]] = 1.5;
    d[[1, 1]] = -0.5;
    d[[0, 1]] = 0.25;
    d[[1, 0]] = 0.25;
    t.set_d_ion(d);

    t
}

#[test]
fn test_radial_grid_integrates_polynomial() {
    let g = grid();
    let f: Vec<f64> = g.get_r().iter().map(|x| x * x).collect();

    let exact = (1000.0 - 1.0E-15) / 3.0;
    assert!((g.integrate(&f) - exact).abs() / exact < 1.0E-6);

    let lin = RadialGrid::linear(101, 2.0);
    assert_eq!(lin.index_of(1.0), 51);
    assert_eq!(lin.index_of(5.0), 101);
}

#[test]
fn test_bessel_transform_of_gaussian() {
    // int r^2 exp(-r^2) j0(qr) dr = sqrt(pi)/4 exp(-q^2/4)
    let g = grid();
    let f: Vec<f64> = g.get_r().iter().map(|x| (-x * x).exp()).collect();

    for &q in [0.0, 0.5, 2.0].iter() {
        let v = g.bessel_transform(&f, 0, q, 2);
        let exact = std::f64::consts::PI.sqrt() / 4.0 * (-q * q / 4.0).exp();
        assert!((v - exact).abs() < 1.0E-7);
    }
}

#[test]
fn test_basis_index_layout() {
    let idx = BasisIndex::new(&[(0, None), (2, None), (1, None)]);

    assert_eq!(idx.size(), 9);
    assert_eq!(idx.size_packed(), 45);
    assert_eq!(idx.lmax(), 2);
    assert_eq!(idx.num_radial(), 3);
    assert_eq!(idx.offset_of_rf(1), 1);
    assert_eq!(idx.offset_of_rf(2), 6);

    let b = idx.get(7);
    assert_eq!((b.l, b.m, b.lm, b.idxrf), (1, 0, 2, 2));

    assert_eq!(packed_index(0, 0), 0);
    assert_eq!(packed_index(0, 1), 1);
    assert_eq!(packed_index(1, 1), 2);
    assert_eq!(packed_index(2, 3), 8);
}

#[test]
fn test_spin_orbit_f_coefficients_complete() {
    let g = grid();
    let r = g.get_r().to_vec();
    let f: Vec<f64> = r.iter().map(|x| x * (-x).exp()).collect();

    let mut t = AtomType::new("Pt", 78.0, 10.0, g);
    t.set_spin_orbit(true);
    t.add_beta(1, Some(0.5), f.clone());
    t.add_beta(1, Some(1.5), f);
    t.init().unwrap();

    assert_eq!(t.nbf(), 6);
    assert!(t.compare_index_beta_functions(0, 2));
    assert!(!t.compare_index_beta_functions(0, 3));

    for s1 in 0..2 {
        for s2 in 0..2 {
            for m1 in 0..3 {
                for m2 in 0..3 {
                    let sum = t.f_coefficients(m1, m2, s1, s2) + t.f_coefficients(3 + m1, 3 + m2, s1, s2);
                    let expected = if m1 == m2 && s1 == s2 { 1.0 } else { 0.0 };
                    assert!((sum.re - expected).abs() < 1.0E-12);
                    assert!(sum.im.abs() < 1.0E-12);
                }
            }
        }
    }

    // trace is 2j + 1
    let mut tr = [0.0; 2];
    for s in 0..2 {
        for m in 0..3 {
            tr[0] += t.f_coefficients(m, m, s, s).re;
            tr[1] += t.f_coefficients(3 + m, 3 + m, s, s).re;
        }
    }
    assert!((tr[0] - 2.0).abs() < 1.0E-12);
    assert!((tr[1] - 4.0).abs() < 1.0E-12);

    // no coupling between different j
    assert!(t.f_coefficients(0, 3, 0, 0).norm() < 1.0E-14);
}

#[test]
fn test_atom_type_validation() {
    let mut t = make_type("X", 4.0);
    t.add_q_radial(0, 5, 0, vec![0.0; 10]);
    assert!(matches!(t.init(), Err(CrystalError::InvalidAtomType { .. })));

    let mut t = make_type("X", 4.0);
    t.set_ps_rho(vec![0.0; 5000]);
    assert!(matches!(t.init(), Err(CrystalError::GridMismatch { found: 5000, .. })));

    let mut t = make_type("X", 4.0);
    t.set_spin_orbit(true);
    assert!(t.init().is_err());
}

#[test]
fn test_q_radial_integral() {
    let mut t = make_type("X", 4.0);
    let r = t.get_radial_grid().get_r().to_vec();

    // r^2 Q(r) = r^2 exp(-3r), integral = 2/27
    t.add_q_radial(1, 0, 0, r.iter().map(|x| x * x * (-3.0 * x).exp()).collect());
    t.add_q_radial(0, 1, 2, r.iter().map(|x| x * x * (-3.0 * x).exp()).collect());
    t.init().unwrap();

    assert!(t.augment());
    assert!((t.q_radial_integral(0, 1) - 2.0 / 27.0).abs() < 1.0E-7);
    assert!((t.q_radial_integral(1, 0) - 2.0 / 27.0).abs() < 1.0E-7);
    assert!(t.q_radial_integral(0, 0).abs() < 1.0E-14);
}

#[test]
fn test_unit_cell_from_lines() {
    let mut ti = make_type("Ti", 4.0);
    ti.init().unwrap();
    let mut o = make_type("O", 6.0);
    o.init().unwrap();

    let lines: Vec<String> = [
        "1.0 1.0 1.0",
        "4.0 0.0 0.0",
        "0.0 4.0 0.0",
        "0.0 0.0 3.0   # c axis",
        "Ti 0.0 0.0 0.0 0.0 0.0 2.0",
        "O  0.5 0.5 0.0",
        "",
        "O  0.0 0.5 0.5",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect();

    let cell = UnitCell::parse(&lines, vec![ti, o]).unwrap();

    assert_eq!(cell.num_atoms(), 3);
    assert_eq!(cell.atoms_of_type(1), &[1, 2]);
    assert!((cell.num_valence_electrons() - 16.0).abs() < 1.0E-12);
    assert!((cell.num_core_electrons() - 6.0).abs() < 1.0E-12);
    assert_eq!(cell.atom(0).get_vector_field(), Vector3f64::new(0.0, 0.0, 2.0));

    let a = 4.0 * dwconsts::ANG_TO_BOHR;
    let c = 3.0 * dwconsts::ANG_TO_BOHR;
    assert!((cell.omega() - a * a * c).abs() < 1.0E-9);

    // bare D expanded over m, diagonal in lm
    let d = cell.atom(0).get_d_mtrx(0);
    assert_eq!(d.nrow(), 4);
    assert!((d[[0, 0]].re - 1.5).abs() < 1.0E-14);
    assert!((d[[2, 2]].re + 0.5).abs() < 1.0E-14);
    assert!(d[[0, 2]].norm() < 1.0E-14);
    assert!(cell.atom(0).get_d_mtrx(1)[[0, 0]].norm() < 1.0E-14);
}

#[test]
fn test_unknown_atom_type() {
    let mut ti = make_type("Ti", 4.0);
    ti.init().unwrap();

    let mut cell = UnitCell::new(Lattice::cubic(5.0), vec![ti]);
    let r = cell.add_atom("Fe", Vector3f64::zeros(), Vector3f64::zeros());

    assert!(matches!(r, Err(CrystalError::UnknownAtomType(ref s)) if s == "Fe"));
}

use super::*;
use approx::assert_relative_eq;
use context::ContextError;
use control::Control;
use crystal::{packed_index, AtomType, PawData, RadialGrid, UnitCell};
use dwmpi::{Communicator, SerialComm};
use gvector::Gvec;
use kscf::{KPoint, KPointData, KPointSet};
use lattice::Lattice;
use matrix::Matrix;
use std::sync::Arc;
use symmetry::{MagneticSymmetry, MagneticSymmetryOps};
use types::ProcessingUnit;

const ALPHA: f64 = 1.3;

fn gaussian_type(with_aug: bool) -> AtomType {
    let g = RadialGrid::exponential(1201, 1.0E-6, 12.0);
    let r = g.get_r().to_vec();

    let mut t = AtomType::new("X", 2.0, 2.0, g);

    let norm = (ALPHA / PI).powf(1.5) * 2.0;
    t.set_ps_rho(r.iter().map(|x| FOURPI * x * x * norm * (-ALPHA * x * x).exp()).collect());
    t.set_free_atom_rho(r.iter().map(|x| norm * (-ALPHA * x * x).exp()).collect());

    if with_aug {
        t.add_beta(0, None, r.iter().map(|x| x * (-x * x).exp()).collect());
        t.add_beta(0, None, r.iter().map(|x| x * x * (-x * x).exp()).collect());

        for &(rf1, rf2, a) in [(0, 0, 2.0_f64), (0, 1, 2.5), (1, 1, 3.0)].iter() {
            t.add_q_radial(rf1, rf2, 0, r.iter().map(|x| 0.1 * x * x * (-a * x * x).exp()).collect());
        }
    }

    t.init().unwrap();
    t
}

fn make_cell(atype: AtomType, positions: &[[f64; 3]], fields: &[[f64; 3]]) -> UnitCell {
    let mut cell = UnitCell::new(Lattice::cubic(7.0), vec![atype]);

    for (p, v) in positions.iter().zip(fields.iter()) {
        cell.add_atom(
            "X",
            Vector3f64::new(p[0], p[1], p[2]),
            Vector3f64::new(v[0], v[1], v[2]),
        )
        .unwrap();
    }

    cell
}

fn make_control(lines: &[&str]) -> Control {
    let mut control = Control::new();
    control.read_lines(lines).unwrap();
    control
}

fn make_ctx(cell: UnitCell, lines: &[&str]) -> Result<SimulationContext, ContextError> {
    let natoms = cell.num_atoms();

    make_ctx_with_symmetry(cell, lines, Box::new(MagneticSymmetryOps::identity(natoms)))
}

fn make_ctx_with_symmetry(
    cell: UnitCell,
    lines: &[&str],
    sym: Box<dyn MagneticSymmetry>,
) -> Result<SimulationContext, ContextError> {
    let comm: Arc<dyn Communicator> = Arc::new(SerialComm);

    SimulationContext::new(make_control(lines), cell, sym, comm)
}

fn make_gkvec(ctx: &SimulationContext, reduce: bool) -> Gvec {
    Gvec::new(
        Vector3f64::zeros(),
        &ctx.unit_cell().get_latt().reciprocal(),
        ctx.control().get_gk_cutoff(),
        ctx.fft_grid(),
        1,
        &SerialComm,
        reduce,
    )
    .unwrap()
}

// c(-G) = conj(c(G)), so the same bands can be stored on a reduced set
fn test_wfc(gkvec: &Gvec, nbnd: usize) -> Matrix<c64> {
    let ngk = gkvec.num_gvec();
    let mut m = Matrix::<c64>::new(ngk, nbnd);

    for ib in 0..nbnd {
        let mut norm = 0.0;

        for ig in 0..ngk {
            let g = gkvec.gvec(ig);
            let g2 = gkvec.gvec_len(ig).powi(2);

            let a = (-(0.3 + 0.2 * ib as f64) * g2).exp();
            let b = 0.1 * (g.x + 2 * g.y + 3 * g.z) as f64;

            let z = c64::new(a, a * b);
            m[[ig, ib]] = z;

            let is_zero = g.x == 0 && g.y == 0 && g.z == 0;
            let mult = if gkvec.reduced() && !is_zero { 2.0 } else { 1.0 };
            norm += mult * z.norm_sqr();
        }

        let s = 1.0 / norm.sqrt();
        for v in m.get_mut_col(ib).iter_mut() {
            *v *= s;
        }
    }

    m
}

fn make_kset<F>(ctx: &SimulationContext, occupations: Vec<Vec<f64>>, reduce: bool, with_betas: bool, coeffs: F) -> KPointSet
where
    F: Fn(&Gvec) -> Vec<Matrix<c64>>,
{
    KPointSet::new(vec![1.0], ctx.comm_arc(), |_| {
        let gkvec = make_gkvec(ctx, reduce);
        let pw = coeffs(&gkvec);

        let mut kp = KPointData::new(gkvec, 1.0, occupations.clone(), pw);

        if with_betas {
            let betas = vnl::BetaProjectors::new(ctx.unit_cell(), kp.gkvec(), 64);
            kp = kp.with_beta_projectors(betas);
        }

        Ok::<Box<dyn KPoint>, ()>(Box::new(kp))
    })
    .unwrap()
}

fn one_band_kset(ctx: &SimulationContext, occ: f64, reduce: bool) -> KPointSet {
    make_kset(ctx, vec![vec![occ]], reduce, true, |gk| vec![test_wfc(gk, 1)])
}

const PW_LINES: [&str; 2] = ["pw_cutoff = 4.5", "gk_cutoff = 2.0"];

#[test]
fn test_density_matrix_layout() {
    let mut dm = DensityMatrix::new(vec![2, 0, 3], 3);

    assert_eq!(dm.num_atoms(), 3);
    assert_eq!(dm.num_comp(), 3);
    assert_eq!(dm.nbf(2), 3);
    assert_eq!(dm.as_slice().len(), (4 + 9) * 3);

    dm.set(1, 2, 2, 2, c64::new(0.5, -0.25));
    dm.add(1, 2, 2, 2, c64::new(0.5, 0.0));

    assert_eq!(dm.get(1, 2, 2, 2), c64::new(1.0, -0.25));
    assert_eq!(dm.block(2, 2)[1 + 3 * 2], c64::new(1.0, -0.25));

    dm.scale(2.0);
    assert_eq!(dm.get(1, 2, 2, 2), c64::new(2.0, -0.5));

    dm.zero();
    assert_eq!(dm.checksum(), ZERO_C64);
}

#[test]
fn test_density_matrix_aux_combinations() {
    let mut dm = DensityMatrix::new(vec![2], 3);

    dm.set(0, 1, 0, 0, c64::new(0.4, 0.1));
    dm.set(0, 1, 1, 0, c64::new(0.1, -0.2));
    dm.set(0, 1, 2, 0, c64::new(0.3, 0.2));
    dm.set(1, 0, 2, 0, c64::new(0.1, 0.05));

    let aux = dm.aux(0, 1, 0);

    assert_relative_eq!(aux[0], 0.5, epsilon = 1.0E-14);
    assert_relative_eq!(aux[1], 0.3, epsilon = 1.0E-14);
    assert_relative_eq!(aux[2], 0.4, epsilon = 1.0E-14);
    assert_relative_eq!(aux[3], 0.25, epsilon = 1.0E-14);

    assert_eq!(num_density_matrix_comp(0), 1);
    assert_eq!(num_density_matrix_comp(1), 2);
    assert_eq!(num_density_matrix_comp(3), 3);
}

#[test]
fn test_generate_conserves_augmented_charge() {
    let cell = make_cell(gaussian_type(true), &[[0.1, 0.2, 0.3]], &[[0.0; 3]]);
    let ctx = make_ctx(cell, &PW_LINES).unwrap();

    let kset = one_band_kset(&ctx, 2.0, false);

    let mut density = Density::new(&ctx);
    assert_eq!(density.kernel_name(), "host");

    density.generate(&kset, false, true).unwrap();
    assert!(density.is_augmented());

    let omega = ctx.unit_cell().omega();
    let (_, kp) = kset.local_kpoints().next().unwrap();
    let bp = kp.beta_projectors().unwrap().inner(0, kp.pw_coeffs(0));
    let aug = ctx.augmentation_op(0).unwrap();

    let mut expected = 2.0;
    for xi1 in 0..2 {
        for xi2 in 0..2 {
            let d = 2.0 * bp[[xi1, 0]].conj() * bp[[xi2, 0]];

            assert!((density.density_matrix().get(xi1, xi2, 0, 0) - d).norm() < 1.0E-12);
            expected += d.re * aug.q_mtrx(xi1, xi2);
        }
    }

    let nel = density.rho().f_0(&ctx).re * omega;
    assert_relative_eq!(nel, expected, epsilon = 1.0E-8);

    // second call does not add the augmentation charge again
    density.augment();
    assert_relative_eq!(density.rho().f_0(&ctx).re * omega, nel, epsilon = 1.0E-14);

    let (total, _, _) = density.rho().integrate(&ctx);
    assert_relative_eq!(total, nel, epsilon = 1.0E-8);

    density.normalize();
    let (total, _, _) = density.rho().integrate(&ctx);
    assert_relative_eq!(total, 2.0, epsilon = 1.0E-10);
    assert_relative_eq!(density.rho().f_0(&ctx).re * omega, 2.0, epsilon = 1.0E-10);
    assert!(density.check_num_electrons());

    let before = density.rho().f_pw_local().to_vec();
    density.normalize();
    for (a, b) in density.rho().f_pw_local().iter().zip(before.iter()) {
        assert!((a - b).norm() < 1.0E-14);
    }
}

#[test]
fn test_extra_charge_goes_to_g0() {
    let lines = ["pw_cutoff = 4.5", "gk_cutoff = 2.0", "extra_charge = 0.5"];
    let cell = make_cell(gaussian_type(false), &[[0.0; 3]], &[[0.0; 3]]);
    let ctx = make_ctx(cell, &lines).unwrap();

    // 2 valence electrons, 0.5 of them removed from the bands
    let kset = make_kset(&ctx, vec![vec![1.5]], false, false, |gk| vec![test_wfc(gk, 1)]);

    let mut density = Density::new(&ctx);
    density.generate(&kset, false, false).unwrap();

    let omega = ctx.unit_cell().omega();
    assert_relative_eq!(density.rho().f_0(&ctx).re * omega, 2.0, epsilon = 1.0E-10);
    assert_relative_eq!(density.num_electrons(), 2.0);
}

#[test]
fn test_wrong_occupancy_warns_and_continues() {
    let cell = make_cell(gaussian_type(false), &[[0.0; 3]], &[[0.0; 3]]);
    let ctx = make_ctx(cell, &PW_LINES).unwrap();

    // one electron in the bands of a two-electron atom
    let kset = make_kset(&ctx, vec![vec![1.0]], false, false, |gk| vec![test_wfc(gk, 1)]);

    let mut density = Density::new(&ctx);
    assert!(density.generate(&kset, false, true).is_ok());

    let omega = ctx.unit_cell().omega();
    assert_relative_eq!(density.rho().f_0(&ctx).re * omega, 1.0, epsilon = 1.0E-10);

    let (total, _, _) = density.rho().integrate(&ctx);
    assert_relative_eq!(total, 1.0, epsilon = 1.0E-8);

    assert!(!density.check_num_electrons());

    density.normalize();
    assert!(density.check_num_electrons());
}

#[test]
fn test_unnormalized_kpoint_weights_warn_and_continue() {
    let cell = make_cell(gaussian_type(false), &[[0.0; 3]], &[[0.0; 3]]);
    let ctx = make_ctx(cell, &PW_LINES).unwrap();

    let kset = KPointSet::new(vec![0.5], ctx.comm_arc(), |_| {
        let gkvec = make_gkvec(&ctx, false);
        let pw = vec![test_wfc(&gkvec, 1)];

        Ok::<Box<dyn KPoint>, ()>(Box::new(KPointData::new(gkvec, 0.5, vec![vec![2.0]], pw)))
    })
    .unwrap();

    let mut density = Density::new(&ctx);
    assert!(density.generate(&kset, false, true).is_ok());

    // the density follows the weights it was given
    let omega = ctx.unit_cell().omega();
    assert_relative_eq!(density.rho().f_0(&ctx).re * omega, 1.0, epsilon = 1.0E-10);
    assert!(density.rho().f_rg().iter().all(|v| v.is_finite()));

    assert!(!density.check_num_electrons());
}

#[test]
fn test_augmentation_closed_form() {
    let cell = make_cell(gaussian_type(true), &[[0.0; 3]], &[[0.0; 3]]);
    let ctx = make_ctx(cell, &PW_LINES).unwrap();

    let mut density = Density::new(&ctx);

    let d12 = c64::new(0.2, 0.3);
    {
        let dm = density.density_matrix_mut();
        dm.set(0, 0, 0, 0, c64::new(0.7, 0.0));
        dm.set(1, 1, 0, 0, c64::new(0.4, 0.0));
        dm.set(0, 1, 0, 0, d12);
        dm.set(1, 0, 0, 0, d12.conj());
    }

    let aux = density.density_matrix_aux(0);
    assert_eq!(aux.len(), 1);
    assert_relative_eq!(aux[0][[packed_index(0, 1), 0]], 0.2, epsilon = 1.0E-14);

    let rho_aug = density.generate_rho_aug();
    let aug = ctx.augmentation_op(0).unwrap();

    assert_eq!(rho_aug[0].len(), ctx.num_gvec_loc());

    for igloc in 0..ctx.num_gvec_loc() {
        let expected = 0.7 * aug.q_pw_value(packed_index(0, 0), igloc)
            + 0.4 * aug.q_pw_value(packed_index(1, 1), igloc)
            + 2.0 * d12.re * aug.q_pw_value(packed_index(0, 1), igloc);

        assert!((rho_aug[0][igloc] - expected).norm() < 1.0E-12);
    }

    // G = 0 carries the integrated augmentation charge
    let q0 = 0.7 * aug.q_mtrx(0, 0) + 0.4 * aug.q_mtrx(1, 1) + 2.0 * d12.re * aug.q_mtrx(0, 1);
    assert_relative_eq!(rho_aug[0][0].re * ctx.unit_cell().omega(), q0, epsilon = 1.0E-10);
}

#[test]
fn test_host_and_accelerator_kernels_agree() {
    let host = HostKernel::new();
    let acc = AcceleratorKernel::new();

    let nbf = 3;
    let nbnd = 4;

    let mut bp1 = Matrix::<c64>::new(nbf, nbnd);
    let mut bp2 = Matrix::<c64>::new(nbf, nbnd);
    for ib in 0..nbnd {
        for xi in 0..nbf {
            let x = (xi + 3 * ib) as f64;
            bp1[[xi, ib]] = c64::new((0.3 * x).sin(), (0.7 * x).cos());
            bp2[[xi, ib]] = c64::new((0.5 * x).cos(), (0.2 * x).sin());
        }
    }
    let w = [1.0, 0.5, 0.0, 0.25];

    let init: Vec<c64> = (0..nbf * nbf).map(|i| c64::new(0.1 * i as f64, -0.05)).collect();
    let mut out_host = init.clone();
    let mut out_acc = init;

    host.add_density_matrix(&bp1, &bp2, &w, &mut out_host);
    acc.add_density_matrix(&bp1, &bp2, &w, &mut out_acc);

    for (a, b) in out_host.iter().zip(out_acc.iter()) {
        assert!((a - b).norm() < 1.0E-13);
    }

    let psi: Vec<c64> = (0..50).map(|i| c64::new((0.1 * i as f64).sin(), 0.3)).collect();
    let dn: Vec<c64> = (0..50).map(|i| c64::new(0.2, (0.05 * i as f64).cos())).collect();

    let mut rho_host = vec![0.5; 50];
    let mut rho_acc = vec![0.5; 50];
    host.add_band_density(&psi, 0.7, &mut rho_host);
    acc.add_band_density(&psi, 0.7, &mut rho_acc);

    for (a, b) in rho_host.iter().zip(rho_acc.iter()) {
        assert_relative_eq!(*a, *b, epsilon = 1.0E-14);
    }

    let mut s_host = vec![vec![0.0; 50]; 4];
    let mut s_acc = vec![vec![0.0; 50]; 4];
    host.add_spinor_density(&psi, &dn, 0.3, &mut s_host);
    acc.add_spinor_density(&psi, &dn, 0.3, &mut s_acc);

    for (ch_host, ch_acc) in s_host.iter().zip(s_acc.iter()) {
        for (a, b) in ch_host.iter().zip(ch_acc.iter()) {
            assert_relative_eq!(*a, *b, epsilon = 1.0E-14);
        }
    }

    // |up|^2 + |dn|^2 squared equals the squared length of the moment
    for ir in 0..50 {
        let r = s_host[0][ir] + s_host[1][ir];
        let m2 = (s_host[0][ir] - s_host[1][ir]).powi(2) + s_host[2][ir].powi(2) + s_host[3][ir].powi(2);
        assert_relative_eq!(r * r, m2, epsilon = 1.0E-12);
    }
}

#[test]
fn test_accelerator_rho_aug_reads_device_copy() {
    let cell = make_cell(gaussian_type(true), &[[0.1, 0.0, 0.0]], &[[0.0; 3]]);
    let ctx = make_ctx(cell, &PW_LINES).unwrap();
    let aug = ctx.augmentation_op(0).unwrap();

    let nidx12 = aug.num_idx12();
    let ngv = aug.num_gvec_loc();

    let mut d_pw = Matrix::<f64>::new(nidx12, 2 * ngv);
    for j in 0..2 * ngv {
        for i in 0..nidx12 {
            d_pw[[i, j]] = ((i + 7 * j) as f64 * 0.13).sin();
        }
    }

    let mut out_host = vec![ZERO_C64; ngv];
    HostKernel::new().add_rho_aug(aug, &d_pw, &mut out_host);

    aug.prepare(ProcessingUnit::Gpu);
    assert!(aug.is_prepared());

    let mut out_acc = vec![ZERO_C64; ngv];
    AcceleratorKernel::new().add_rho_aug(aug, &d_pw, &mut out_acc);

    aug.dismiss();
    assert!(!aug.is_prepared());

    for (a, b) in out_host.iter().zip(out_acc.iter()) {
        assert!((a - b).norm() < 1.0E-12);
    }
}

#[test]
fn test_accelerator_density_matches_host() {
    let positions = [[0.1, 0.2, 0.3], [0.6, 0.5, 0.9]];
    let fields = [[0.0; 3]; 2];

    let ctx_cpu = make_ctx(make_cell(gaussian_type(true), &positions, &fields), &PW_LINES).unwrap();

    let mut lines = PW_LINES.to_vec();
    lines.push("processing_unit = gpu");
    let ctx_gpu = make_ctx(make_cell(gaussian_type(true), &positions, &fields), &lines).unwrap();

    let kset = make_kset(&ctx_cpu, vec![vec![2.0, 2.0]], false, true, |gk| vec![test_wfc(gk, 2)]);

    let mut host = Density::new(&ctx_cpu);
    host.generate(&kset, false, true).unwrap();

    let mut acc = Density::new(&ctx_gpu);
    assert_eq!(acc.kernel_name(), "accelerator");
    acc.generate(&kset, false, true).unwrap();

    assert!(!ctx_gpu.augmentation_op(0).unwrap().is_prepared());

    for (a, b) in host.rho().f_pw_local().iter().zip(acc.rho().f_pw_local().iter()) {
        assert!((a - b).norm() < 1.0E-12);
    }
    for (a, b) in host.density_matrix().as_slice().iter().zip(acc.density_matrix().as_slice().iter()) {
        assert!((a - b).norm() < 1.0E-12);
    }
}

#[test]
fn test_reduced_gkvec_gives_same_density() {
    let cell = make_cell(gaussian_type(true), &[[0.1, 0.2, 0.3]], &[[0.0; 3]]);
    let ctx = make_ctx(cell, &PW_LINES).unwrap();

    let full = one_band_kset(&ctx, 2.0, false);
    let reduced = one_band_kset(&ctx, 2.0, true);

    let mut d_full = Density::new(&ctx);
    d_full.generate_valence(&full).unwrap();

    let mut d_reduced = Density::new(&ctx);
    d_reduced.generate_valence(&reduced).unwrap();

    for (a, b) in d_full.rho().f_rg().iter().zip(d_reduced.rho().f_rg().iter()) {
        assert_relative_eq!(*a, *b, epsilon = 1.0E-12);
    }

    for xi1 in 0..2 {
        for xi2 in 0..2 {
            let a = d_full.density_matrix().get(xi1, xi2, 0, 0);
            let b = d_reduced.density_matrix().get(xi1, xi2, 0, 0);

            assert!((a - b).norm() < 1.0E-10);
            assert!(b.im.abs() < 1.0E-14);
        }
    }
}

#[test]
fn test_missing_beta_projectors() {
    let cell = make_cell(gaussian_type(true), &[[0.0; 3]], &[[0.0; 3]]);
    let ctx = make_ctx(cell, &PW_LINES).unwrap();

    let kset = make_kset(&ctx, vec![vec![2.0]], false, false, |gk| vec![test_wfc(gk, 1)]);

    let mut density = Density::new(&ctx);
    let err = density.generate(&kset, false, false).unwrap_err();

    assert!(matches!(err, DensityError::MissingBetaProjectors { ik: 0 }));
}

#[test]
fn test_noncollinear_spinor_density() {
    let mut lines = PW_LINES.to_vec();
    lines.push("num_mag_dims = 3");

    let cell = make_cell(gaussian_type(false), &[[0.0; 3]], &[[0.0; 3]]);
    let ctx = make_ctx(cell, &lines).unwrap();

    let (theta, phi) = (0.4_f64, 1.1_f64);

    let kset = make_kset(&ctx, vec![vec![1.0]], false, false, |gk| {
        let c = test_wfc(gk, 1);

        let mut up = c.clone();
        let mut dn = c;
        for v in up.as_mut_slice().iter_mut() {
            *v *= theta.cos();
        }
        for v in dn.as_mut_slice().iter_mut() {
            *v *= theta.sin() * c64::new(phi.cos(), phi.sin());
        }

        vec![up, dn]
    });

    let mut density = Density::new(&ctx);
    assert_eq!(density.num_components(), 4);

    density.generate_valence(&kset).unwrap();

    let rho = density.rho().f_rg();
    let (mz, mx, my) = (
        density.magnetization(0).f_rg(),
        density.magnetization(1).f_rg(),
        density.magnetization(2).f_rg(),
    );

    let s2 = (2.0 * theta).sin();
    for ir in 0..rho.len() {
        assert_relative_eq!(mz[ir], rho[ir] * (2.0 * theta).cos(), epsilon = 1.0E-12);
        assert_relative_eq!(mx[ir], rho[ir] * s2 * phi.cos(), epsilon = 1.0E-12);
        assert_relative_eq!(my[ir], rho[ir] * s2 * phi.sin(), epsilon = 1.0E-12);
    }

    let omega = ctx.unit_cell().omega();
    assert_relative_eq!(density.rho().f_0(&ctx).re * omega, 1.0, epsilon = 1.0E-10);
}

#[test]
fn test_symmetrize_identity_keeps_density_matrix() {
    let mut lines = PW_LINES.to_vec();
    lines.push("num_mag_dims = 3");

    let positions = [[0.1, 0.2, 0.3], [0.6, 0.5, 0.9]];
    let cell = make_cell(gaussian_type(true), &positions, &[[0.0; 3]; 2]);
    let ctx = make_ctx(cell, &lines).unwrap();

    let mut density = Density::new(&ctx);

    {
        let dm = density.density_matrix_mut();
        for ia in 0..2 {
            for comp in 0..3 {
                for xi2 in 0..2 {
                    for xi1 in 0..2 {
                        let x = (xi1 + 2 * xi2 + 4 * comp + 12 * ia) as f64;
                        dm.set(xi1, xi2, comp, ia, c64::new((0.3 * x).sin(), (0.2 * x).cos()));
                    }
                }
            }
        }
    }

    let before = density.density_matrix().clone();
    density.symmetrize_density_matrix();

    for (a, b) in before.as_slice().iter().zip(density.density_matrix().as_slice().iter()) {
        assert!((a - b).norm() < 1.0E-12);
    }
}

#[test]
fn test_symmetrize_inversion_averages_atoms() {
    let positions = [[0.2, 0.3, 0.4], [0.8, 0.7, 0.6]];
    let cell = make_cell(gaussian_type(true), &positions, &[[0.0; 3]; 2]);

    let pos: Vec<Vector3f64> = positions.iter().map(|p| Vector3f64::new(p[0], p[1], p[2])).collect();
    let one = [[1, 0, 0], [0, 1, 0], [0, 0, 1]];
    let inv = [[-1, 0, 0], [0, -1, 0], [0, 0, -1]];

    let sym = MagneticSymmetryOps::new(
        cell.get_latt(),
        &pos,
        &[0, 0],
        &[one, inv],
        &[[0.0; 3], [0.0; 3]],
        None,
        1.0E-6,
    );
    assert_eq!(sym.num_sym_ops(), 2);
    assert_eq!(sym.sym_table(0, 1), 1);

    let ctx = make_ctx_with_symmetry(cell, &PW_LINES, Box::new(sym)).unwrap();
    let mut density = Density::new(&ctx);

    let d0 = [[0.9, 0.1], [0.1, 0.3]];
    let d1 = [[0.5, -0.2], [-0.2, 0.7]];
    {
        let dm = density.density_matrix_mut();
        for xi1 in 0..2 {
            for xi2 in 0..2 {
                dm.set(xi1, xi2, 0, 0, c64::new(d0[xi1][xi2], 0.0));
                dm.set(xi1, xi2, 0, 1, c64::new(d1[xi1][xi2], 0.0));
            }
        }
    }

    density.symmetrize_density_matrix();

    for ia in 0..2 {
        for xi1 in 0..2 {
            for xi2 in 0..2 {
                let v = density.density_matrix().get(xi1, xi2, 0, ia);
                assert_relative_eq!(v.re, 0.5 * (d0[xi1][xi2] + d1[xi1][xi2]), epsilon = 1.0E-12);
                assert!(v.im.abs() < 1.0E-12);
            }
        }
    }
}

#[test]
fn test_initial_density_pseudo_magnetization() {
    let lines = ["pw_cutoff = 8.0", "gk_cutoff = 2.0", "num_mag_dims = 1", "rmt_max = 2.0"];
    let cell = make_cell(gaussian_type(false), &[[0.0; 3]], &[[0.0, 0.0, 1.5]]);
    let ctx = make_ctx(cell, &lines).unwrap();

    let mut density = Density::new(&ctx);
    density.initial_density();

    let omega = ctx.unit_cell().omega();
    assert_relative_eq!(density.rho().f_0(&ctx).re * omega, 2.0, epsilon = 1.0E-10);
    assert!(density.rho().f_rg().iter().all(|&x| x >= 0.0));
    assert!(density.check_num_electrons());

    let mom = density.compute_atomic_mag_mom();
    assert_eq!(mom.len(), 1);
    assert_relative_eq!(mom[0].z, 1.5, max_relative = 0.05);
    assert_relative_eq!(mom[0].x, 0.0);

    // the whole bump sits inside the atomic sphere
    let m0 = density.magnetization(0).f_0(&ctx).re * omega;
    assert_relative_eq!(m0, mom[0].z, epsilon = 1.0E-10);
}

#[test]
fn test_initial_density_noncollinear_direction() {
    let lines = ["pw_cutoff = 6.0", "gk_cutoff = 2.0", "num_mag_dims = 3", "rmt_max = 2.0"];
    let cell = make_cell(gaussian_type(false), &[[0.0; 3]], &[[0.6, 0.0, 0.8]]);
    let ctx = make_ctx(cell, &lines).unwrap();

    let mut density = Density::new(&ctx);
    density.initial_density();

    let mom = density.compute_atomic_mag_mom();

    assert_relative_eq!(mom[0].x / mom[0].z, 0.75, epsilon = 1.0E-12);
    assert_relative_eq!(mom[0].y, 0.0);
}

#[test]
fn test_paw_one_centre_density() {
    let g = RadialGrid::exponential(1201, 1.0E-6, 12.0);
    let r = g.get_r().to_vec();

    let mut t = AtomType::new("X", 2.0, 2.0, g);
    let norm = (ALPHA / PI).powf(1.5) * 2.0;
    t.set_ps_rho(r.iter().map(|x| FOURPI * x * x * norm * (-ALPHA * x * x).exp()).collect());
    t.add_beta(0, None, r.iter().map(|x| x * (-x * x).exp()).collect());
    t.set_paw(PawData {
        ae_wfc: vec![r.iter().map(|x| x * (-x * x).exp()).collect()],
        ps_wfc: vec![r.iter().map(|x| x * (-1.5 * x * x).exp()).collect()],
        occupations: vec![2.0],
        cutoff_index: 0,
    });
    t.init().unwrap();

    let cell = make_cell(t, &[[0.0; 3]], &[[0.0; 3]]);
    let ctx = make_ctx(cell, &PW_LINES).unwrap();

    let mut density = Density::new(&ctx);
    density.initial_density();

    assert_relative_eq!(density.density_matrix().get(0, 0, 0, 0).re, 2.0);

    let paw = density.paw_densities();
    assert_eq!(paw.len(), 1);
    assert_eq!(paw[0].atom(), 0);
    assert_eq!(paw[0].lmax(), 0);

    let grid = ctx.unit_cell().atom_type(0).get_radial_grid();
    for ir in (100..1000).step_by(50) {
        let x = grid.r(ir);

        assert_relative_eq!(paw[0].ae(0)[[0, ir]], 2.0 * Y00 * (-2.0 * x * x).exp(), epsilon = 1.0E-12);
        assert_relative_eq!(paw[0].ps(0)[[0, ir]], 2.0 * Y00 * (-3.0 * x * x).exp(), epsilon = 1.0E-12);
    }
}

const FP_LINES: [&str; 4] = [
    "pw_cutoff = 4.5",
    "gk_cutoff = 2.0",
    "electronic_structure_method = full_potential_lapwlo",
    "lmax_rho = 2",
];

#[test]
fn test_initial_density_full_potential() {
    let mut lines = FP_LINES.to_vec();
    lines.push("num_mag_dims = 1");

    let cell = make_cell(gaussian_type(false), &[[0.1, 0.2, 0.3]], &[[0.0, 0.0, 0.5]]);
    let ctx = make_ctx(cell, &lines).unwrap();

    let mut density = Density::new(&ctx);
    density.initial_density();

    let (total, it, mt) = density.rho().integrate(&ctx);
    assert_relative_eq!(total, 2.0, epsilon = 1.0E-10);
    assert!(it > 0.0);
    assert!(mt[0] > 0.0);
    assert!(density.check_num_electrons());

    // all of the moment sits in the sphere
    let (m_total, m_it, m_mt) = density.magnetization(0).integrate(&ctx);
    assert_relative_eq!(m_it, 0.0);
    assert_relative_eq!(m_mt[0], 0.5, epsilon = 1.0E-10);
    assert_relative_eq!(m_total, 0.5, epsilon = 1.0E-10);
}

fn mt_type() -> AtomType {
    let g = RadialGrid::exponential(1201, 1.0E-6, 12.0);
    let r = g.get_r().to_vec();

    let mut t = AtomType::new("X", 2.0, 2.0, g);
    let norm = (ALPHA / PI).powf(1.5) * 2.0;
    t.set_free_atom_rho(r.iter().map(|x| norm * (-ALPHA * x * x).exp()).collect());
    t.add_mt_radial(0, r.iter().map(|x| (-x).exp()).collect());
    t.init().unwrap();
    t
}

fn mt_kset(ctx: &SimulationContext, a: f64, with_mt: bool) -> KPointSet {
    KPointSet::new(vec![1.0], ctx.comm_arc(), |_| {
        let gkvec = make_gkvec(ctx, false);
        let pw = Matrix::<c64>::new(gkvec.num_gvec(), 1);

        let mut kp = KPointData::new(gkvec, 1.0, vec![vec![2.0]], vec![pw]);

        if with_mt {
            let mut c = Matrix::<c64>::new(1, 1);
            c[[0, 0]] = c64::new(a, 0.0);
            kp = kp.with_mt_coeffs(vec![c], vec![0]);
        }

        Ok::<Box<dyn KPoint>, ()>(Box::new(kp))
    })
    .unwrap()
}

#[test]
fn test_generate_valence_muffin_tin() {
    let cell = make_cell(mt_type(), &[[0.0; 3]], &[[0.0; 3]]);
    let ctx = make_ctx(cell, &FP_LINES).unwrap();

    let kset = mt_kset(&ctx, 0.8, true);

    let mut density = Density::new(&ctx);
    density.generate_valence(&kset).unwrap();

    let d = 2.0 * 0.8 * 0.8;
    assert_relative_eq!(density.density_matrix().get(0, 0, 0, 0).re, d, epsilon = 1.0E-14);

    let grid = ctx.unit_cell().atom_type(0).get_radial_grid();
    let f = density.rho().f_mt(0);

    for ir in (0..f.ncol()).step_by(40) {
        let u = (-grid.r(ir)).exp();

        assert_relative_eq!(f[[0, ir]], d * Y00 * u * u, epsilon = 1.0E-12);
        for lm in 1..f.nrow() {
            assert_relative_eq!(f[[lm, ir]], 0.0, epsilon = 1.0E-14);
        }
    }
}

#[test]
fn test_full_potential_errors() {
    let cell = make_cell(mt_type(), &[[0.0; 3]], &[[0.0; 3]]);
    let ctx = make_ctx(cell, &FP_LINES).unwrap();

    let mut density = Density::new(&ctx);
    let err = density.generate_valence(&mt_kset(&ctx, 0.8, false)).unwrap_err();
    assert!(matches!(err, DensityError::MissingMtCoeffs { ik: 0 }));

    let mut lines = FP_LINES.to_vec();
    lines.push("hubbard_correction = true");

    let cell = make_cell(mt_type(), &[[0.0; 3]], &[[0.0; 3]]);
    let ctx = make_ctx(cell, &lines).unwrap();

    let mut density = Density::new(&ctx);
    let err = density.generate_valence(&mt_kset(&ctx, 0.8, true)).unwrap_err();
    assert!(matches!(err, DensityError::Unimplemented(_)));
}

use super::*;
use crystal::{AtomType, RadialGrid};
use dwmpi::{SerialComm, ThreadComm};
use lattice::Lattice;
use symmetry::MagneticSymmetryOps;

const ALPHA: f64 = 1.3;

fn make_type(zion: f64) -> AtomType {
    let g = RadialGrid::exponential(1201, 1.0E-6, 12.0);
    let r = g.get_r().to_vec();

    let mut t = AtomType::new("X", zion, zion, g);

    // normalized Gaussian carrying zion electrons
    let norm = (ALPHA / PI).powf(1.5) * zion;
    t.set_ps_rho(r.iter().map(|x| FOURPI * x * x * norm * (-ALPHA * x * x).exp()).collect());
    t.set_free_atom_rho(r.iter().map(|x| norm * (-ALPHA * x * x).exp()).collect());

    t.init().unwrap();
    t
}

fn make_cell(positions: &[[f64; 3]]) -> UnitCell {
    let mut cell = UnitCell::new(Lattice::cubic(7.0), vec![make_type(2.0)]);

    for p in positions.iter() {
        cell.add_atom("X", Vector3f64::new(p[0], p[1], p[2]), Vector3f64::zeros()).unwrap();
    }

    cell
}

fn make_control(lines: &[&str]) -> Control {
    let mut control = Control::new();
    control.read_lines(lines).unwrap();
    control
}

fn make_ctx(cell: UnitCell, lines: &[&str], comm: Arc<dyn Communicator>) -> Result<SimulationContext, ContextError> {
    let natoms = cell.num_atoms();

    SimulationContext::new(
        make_control(lines),
        cell,
        Box::new(MagneticSymmetryOps::identity(natoms)),
        comm,
    )
}

#[test]
fn test_periodic_function_of_gaussian() {
    let cell = make_cell(&[[0.0, 0.0, 0.0]]);
    let ctx = make_ctx(cell, &["pw_cutoff = 4.0"], Arc::new(SerialComm)).unwrap();

    let ri = ctx.radial_integrals();
    let f_pw = ctx.make_periodic_function(|iat, g| ri.ps_rho(iat, g));

    let omega = ctx.unit_cell().omega();
    assert_eq!(f_pw.len(), ctx.gvec().num_gvec());

    // 2 electrons
    assert!((f_pw[0].re * omega - 2.0).abs() < 1.0E-8);

    for ig in 1..20 {
        let g = ctx.gvec().gvec_len(ig);
        let expected = 2.0 * (-g * g / (4.0 * ALPHA)).exp() / omega;

        assert!((f_pw[ig].re - expected).abs() < 1.0E-8);
        assert!(f_pw[ig].im.abs() < 1.0E-12);
    }

    // free-atom density of the same Gaussian
    let f_free = ctx.make_periodic_function(|iat, g| ri.free_atom_rho(iat, g));
    for (a, b) in f_free.iter().zip(f_pw.iter()) {
        assert!((a - b).norm() < 1.0E-8);
    }
}

#[test]
fn test_periodic_function_phase() {
    let pos = [0.25, 0.1, 0.4];
    let cell = make_cell(&[pos]);
    let ctx = make_ctx(cell, &["pw_cutoff = 3.0"], Arc::new(SerialComm)).unwrap();

    let f_pw = ctx.make_periodic_function(|_, _| 1.0);
    let fact = FOURPI / ctx.unit_cell().omega();

    for ig in 0..ctx.gvec().num_gvec() {
        let expected = fact * fhkl::phase_factor(ctx.gvec().gvec(ig), Vector3f64::new(pos[0], pos[1], pos[2]));
        assert!((f_pw[ig] - expected).norm() < 1.0E-12);
    }
}

#[test]
fn test_periodic_function_distributed_matches_serial() {
    let positions = [[0.0, 0.0, 0.0], [0.5, 0.5, 0.5]];
    let serial = make_ctx(make_cell(&positions), &["pw_cutoff = 3.0"], Arc::new(SerialComm)).unwrap();
    let reference = serial.make_periodic_function(|iat, g| serial.radial_integrals().ps_rho(iat, g));

    let comms = ThreadComm::world(3);

    let pieces: Vec<(usize, Vec<c64>)> = std::thread::scope(|s| {
        let handles: Vec<_> = comms
            .into_iter()
            .map(|comm| {
                s.spawn(move || {
                    let ctx = make_ctx(make_cell(&positions), &["pw_cutoff = 3.0"], Arc::new(comm)).unwrap();
                    let f = ctx.make_periodic_function(|iat, g| ctx.radial_integrals().ps_rho(iat, g));

                    (ctx.gvec_range().start, f)
                })
            })
            .collect();

        handles.into_iter().map(|h| h.join().unwrap()).collect()
    });

    let total: usize = pieces.iter().map(|(_, f)| f.len()).sum();
    assert_eq!(total, reference.len());

    for (offset, f) in pieces.iter() {
        for (i, v) in f.iter().enumerate() {
            assert!((v - reference[offset + i]).norm() < 1.0E-12);
        }
    }
}

#[test]
fn test_pw_rg_transform_and_integral() {
    let cell = make_cell(&[[0.1, 0.2, 0.3]]);
    let ctx = make_ctx(cell, &["pw_cutoff = 4.0"], Arc::new(SerialComm)).unwrap();

    let mut rho = PeriodicFunction::new(&ctx);
    let f_pw = ctx.make_periodic_function(|iat, g| ctx.radial_integrals().ps_rho(iat, g));
    rho.f_pw_local_mut().copy_from_slice(&f_pw);

    rho.pw_to_rg(&ctx);

    let (total, it, mt) = rho.integrate(&ctx);
    assert!(mt.is_empty());
    assert_eq!(total, it);
    assert!((total - rho.f_0(&ctx).re * ctx.unit_cell().omega()).abs() < 1.0E-10);

    rho.f_pw_local_mut().iter_mut().for_each(|v| *v = ZERO_C64);
    rho.rg_to_pw(&ctx);

    for (a, b) in rho.f_pw_local().iter().zip(f_pw.iter()) {
        assert!((a - b).norm() < 1.0E-10);
    }

    let sum_rg = rho.checksum_rg();
    rho.scale(2.0);
    assert!((rho.checksum_rg() - 2.0 * sum_rg).abs() < 1.0E-10);
    assert!((rho.checksum_pw(ctx.comm()) - 2.0 * f_pw.iter().sum::<c64>()).norm() < 1.0E-10);
}

#[test]
fn test_atoms_to_grid_map_matches_brute_force() {
    let pos = [0.05, 0.9, 0.5];
    let cell = make_cell(&[pos]);
    let ctx = make_ctx(cell, &["pw_cutoff = 3.0", "rmt_max = 1.7"], Arc::new(SerialComm)).unwrap();

    let grid = ctx.fft_grid();
    let latt = ctx.unit_cell().get_latt();
    let n = grid.get_size();

    let mut expected = Vec::new();
    for k in 0..n[2] {
        for j in 0..n[1] {
            for i in 0..n[0] {
                let mut d = Vector3f64::new(
                    i as f64 / n[0] as f64 - pos[0],
                    j as f64 / n[1] as f64 - pos[1],
                    k as f64 / n[2] as f64 - pos[2],
                );
                // nearest image
                d.x -= d.x.round();
                d.y -= d.y.round();
                d.z -= d.z.round();

                let dist = latt.frac_to_cart(d).norm2();
                if dist < 1.7 {
                    expected.push((grid.linear_index(i, j, k), dist));
                }
            }
        }
    }

    let mut found = ctx.atoms_to_grid_idx_map(0).to_vec();
    found.sort_by_key(|p| p.0);
    expected.sort_by_key(|p| p.0);

    assert_eq!(found.len(), expected.len());
    for (a, b) in found.iter().zip(expected.iter()) {
        assert_eq!(a.0, b.0);
        assert!((a.1 - b.1).abs() < 1.0E-12);
    }
}

#[test]
fn test_rank_topology_errors() {
    let err = make_ctx(make_cell(&[[0.0; 3]]), &["fft_comm_size = 2"], Arc::new(SerialComm));
    assert!(matches!(
        err,
        Err(ContextError::Gvector(GVectorError::RankTopology { num_ranks: 1, fft_size: 2 }))
    ));

    let comms = ThreadComm::world(3);

    std::thread::scope(|s| {
        for comm in comms.into_iter() {
            s.spawn(move || {
                let err = make_ctx(make_cell(&[[0.0; 3]]), &["fft_comm_size = 2"], Arc::new(comm));
                assert!(matches!(
                    err,
                    Err(ContextError::Gvector(GVectorError::RankTopology { num_ranks: 3, fft_size: 2 }))
                ));
            });
        }
    });
}

#[test]
fn test_fft_communicator_of_two_out_of_four_ranks() {
    let comms = ThreadComm::world(4);

    std::thread::scope(|s| {
        for comm in comms.into_iter() {
            s.spawn(move || {
                let w = comm.rank();
                let ctx = make_ctx(make_cell(&[[0.0; 3]]), &["pw_cutoff = 4.0", "fft_comm_size = 2"], Arc::new(comm))
                    .unwrap();

                let fft = ctx.comm_fft();
                let ortho = ctx.comm_ortho_fft();

                assert_eq!(fft.size(), 2);
                assert_eq!(fft.rank(), w / 2);
                assert_eq!(ortho.size(), 2);
                assert_eq!(ortho.rank(), w % 2);

                let gvec = ctx.gvec();
                assert_eq!(gvec.num_ranks(), 4);
                assert_eq!(gvec.fft_comm_rank(), w / 2);

                for r in 0..2 {
                    assert_eq!(gvec.gvec_count_fft(r), gvec.gvec_count(2 * r) + gvec.gvec_count(2 * r + 1));
                }

                // the two slabs of one FFT rank add up to its PW buffer
                let nloc = dwmpi::allreduce_sum_scalar(ortho, ctx.num_gvec_loc() as i32);
                assert_eq!(nloc as usize, gvec.gvec_count_fft(w / 2));

                let ntot = dwmpi::allreduce_sum_scalar(ctx.comm(), ctx.num_gvec_loc() as i32);
                assert_eq!(ntot as usize, gvec.num_gvec());
            });
        }
    });
}

#[test]
fn test_full_potential_step_function_and_mt_integral() {
    let g = RadialGrid::linear(201, 4.0);
    let mut t = AtomType::new("X", 2.0, 2.0, g);
    t.set_mt_radius(2.0);
    t.init().unwrap();

    let mut cell = UnitCell::new(Lattice::cubic(7.0), vec![t]);
    cell.add_atom("X", Vector3f64::new(0.5, 0.5, 0.5), Vector3f64::zeros()).unwrap();

    let ctx = make_ctx(
        cell,
        &["pw_cutoff = 3.0", "electronic_structure_method = full_potential_lapwlo", "lmax_rho = 2"],
        Arc::new(SerialComm),
    )
    .unwrap();

    let theta = ctx.step_function();
    assert_eq!(theta.len(), ctx.fft_grid().get_ntot());
    assert!(theta.iter().all(|&x| x == 0.0 || x == 1.0));

    let inside = theta.iter().filter(|&&x| x == 0.0).count() as f64;
    let fraction = inside / ctx.fft_grid().get_ntotf64();
    let sphere = FOURPI * 8.0 / 3.0 / ctx.unit_cell().omega();
    assert!((fraction - sphere).abs() < 0.05);

    // rho = 1 everywhere
    let mut f = PeriodicFunction::new(&ctx);
    assert!(f.has_mt());
    assert_eq!(f.f_mt(0).nrow(), 9);
    assert_eq!(f.f_mt(0).ncol(), 101);

    f.f_rg_mut().iter_mut().for_each(|v| *v = 1.0);
    for ir in 0..101 {
        f.f_mt_mut(0)[[0, ir]] = 1.0 / Y00;
    }

    let (total, it, mt) = f.integrate(&ctx);
    assert!((mt[0] - FOURPI * 8.0 / 3.0).abs() < 1.0E-10);
    assert!((it - (1.0 - fraction) * ctx.unit_cell().omega()).abs() < 1.0E-10);
    assert!((total - it - mt[0]).abs() < 1.0E-12);
}

#[test]
fn test_augmentation_ops_per_type() {
    let ctx = make_ctx(make_cell(&[[0.0; 3]]), &["pw_cutoff = 3.0"], Arc::new(SerialComm)).unwrap();

    assert_eq!(ctx.augmentation_ops().len(), 1);
    assert!(ctx.augmentation_op(0).is_none());
    assert!(ctx.is_local_atom(0));
    assert_eq!(ctx.gvec_range(), 0..ctx.gvec().num_gvec());
}

use dwfft3d::DWFFT3D;
use dwmpi::Communicator;
use fftgrid::FFTGrid;
use gvector::Gvec;
use ndarray::*;
use types::c64;

use std::cell::RefCell;
use std::collections::HashMap;

struct ThreadWorkspace {
    pfft: DWFFT3D,
    fft_work: Array3<c64>,
}

thread_local! {
    static THREAD_WORKSPACE: RefCell<HashMap<[usize; 3], ThreadWorkspace>> = RefCell::new(HashMap::new());
}

/// Plane-wave <-> real-space transforms on one FFT box.
///
/// Forward (r -> G) divides by the number of grid points, backward is a plain sum over G.
pub struct RGTransform {
    grid: FFTGrid,
}

impl RGTransform {
    pub fn new(grid: &FFTGrid) -> RGTransform {
        RGTransform { grid: grid.clone() }
    }

    pub fn get_grid(&self) -> &FFTGrid {
        &self.grid
    }

    fn with_workspace<R>(&self, f: impl FnOnce(&DWFFT3D, &mut Array3<c64>) -> R) -> R {
        let mesh = self.grid.get_size();

        THREAD_WORKSPACE.with(|workspaces| {
            let mut workspaces = workspaces.borrow_mut();

            let workspace = workspaces.entry(mesh).or_insert_with(|| ThreadWorkspace {
                pfft: DWFFT3D::new(mesh[0], mesh[1], mesh[2]),
                fft_work: Array3::<c64>::new(mesh),
            });

            f(&workspace.pfft, &mut workspace.fft_work)
        })
    }

    /// Box position of the stored G-vector `ig`.
    pub fn fft_index(&self, gvec: &Gvec, ig: usize) -> usize {
        let g = gvec.gvec(ig);

        self.grid.linear_index(
            self.grid.freq_to_index(0, g.x),
            self.grid.freq_to_index(1, g.y),
            self.grid.freq_to_index(2, g.z),
        )
    }

    fn fft_index_of_minus(&self, gvec: &Gvec, ig: usize) -> usize {
        let g = -gvec.gvec(ig);

        self.grid.linear_index(
            self.grid.freq_to_index(0, g.x),
            self.grid.freq_to_index(1, g.y),
            self.grid.freq_to_index(2, g.z),
        )
    }

    /// Real function from the local slice of its PW coefficients.
    ///
    /// Every rank receives the full real-space grid.
    pub fn pw_to_rg(&self, gvec: &Gvec, comm: &dyn Communicator, f_pw: &[c64], f_rg: &mut [f64]) {
        let rank = comm.rank();
        let offset = gvec.gvec_offset(rank);

        assert_eq!(gvec.num_ranks(), comm.size());
        assert_eq!(f_pw.len(), gvec.gvec_count(rank));
        assert_eq!(f_rg.len(), self.grid.get_ntot());

        self.with_workspace(|pfft, fft_work| {
            fft_work.set_value(c64::new(0.0, 0.0));

            let work = fft_work.as_mut_slice();

            for (igloc, v) in f_pw.iter().enumerate() {
                let ig = igloc + offset;

                work[self.fft_index(gvec, ig)] = *v;

                // f(-G) = f(G)^*
                if gvec.reduced() && ig != 0 {
                    work[self.fft_index_of_minus(gvec, ig)] = v.conj();
                }
            }

            dwmpi::allreduce_sum(comm, work);

            let mut out = vec![c64::new(0.0, 0.0); work.len()];
            pfft.ifft3d(work, &mut out);

            for (r, z) in f_rg.iter_mut().zip(out.iter()) {
                *r = z.re;
            }
        });
    }

    /// Local slice of PW coefficients of a real function given on the full grid.
    pub fn rg_to_pw(&self, gvec: &Gvec, comm: &dyn Communicator, f_rg: &[f64], f_pw: &mut [c64]) {
        let rank = comm.rank();
        let offset = gvec.gvec_offset(rank);

        assert_eq!(f_pw.len(), gvec.gvec_count(rank));
        assert_eq!(f_rg.len(), self.grid.get_ntot());

        self.with_workspace(|pfft, fft_work| {
            let rg: Vec<c64> = f_rg.iter().map(|&x| c64::new(x, 0.0)).collect();

            let work = fft_work.as_mut_slice();
            pfft.fft3d(&rg, work);

            let ntot = work.len() as f64;

            for (igloc, v) in f_pw.iter_mut().enumerate() {
                *v = work[self.fft_index(gvec, igloc + offset)] / ntot;
            }
        });
    }

    /// Complex function (wave function) from all its G+k coefficients, no distribution.
    pub fn g1d_to_r3d(&self, gkvec: &Gvec, psi_pw: &[c64], psi_rg: &mut [c64]) {
        assert_eq!(psi_pw.len(), gkvec.num_gvec());

        self.with_workspace(|pfft, fft_work| {
            fft_work.set_value(c64::new(0.0, 0.0));

            let work = fft_work.as_mut_slice();

            for (ig, v) in psi_pw.iter().enumerate() {
                work[self.fft_index(gkvec, ig)] = *v;

                if gkvec.reduced() && ig != 0 {
                    work[self.fft_index_of_minus(gkvec, ig)] = v.conj();
                }
            }

            pfft.ifft3d(work, psi_rg);
        });
    }

    pub fn r3d_to_g1d(&self, gkvec: &Gvec, psi_rg: &[c64], psi_pw: &mut [c64]) {
        assert_eq!(psi_pw.len(), gkvec.num_gvec());

        self.with_workspace(|pfft, fft_work| {
            let work = fft_work.as_mut_slice();
            pfft.fft3d(psi_rg, work);

            let ntot = work.len() as f64;

            for (ig, v) in psi_pw.iter_mut().enumerate() {
                *v = work[self.fft_index(gkvec, ig)] / ntot;
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dwmpi::{SerialComm, ThreadComm};
    use lattice::Lattice;
    use vector3::*;

    fn setup(num_ranks: usize, reduce: bool, comm: &dyn Communicator) -> (FFTGrid, Gvec) {
        let latt = Lattice::cubic(6.0);
        let gmax = 2.5;
        let grid = FFTGrid::new(&latt, 2.0 * gmax);
        let gvec = Gvec::new(Vector3f64::zeros(), &latt.reciprocal(), gmax, &grid, num_ranks, comm, reduce).unwrap();

        (grid, gvec)
    }

    #[test]
    fn test_pw_rg_round_trip_serial() {
        for &reduce in [false, true].iter() {
            let comm = SerialComm;
            let (grid, gvec) = setup(1, reduce, &comm);
            let rgt = RGTransform::new(&grid);

            // coefficients of a real function: f(-G) = f(G)^*
            let mut f_pw = vec![c64::new(0.0, 0.0); gvec.num_gvec()];
            for ig in 0..gvec.num_gvec() {
                let g = gvec.gvec(ig);
                let h = (g.x * 3 + g.y * 5 + g.z * 7) as f64;
                let mut v = c64::new((-0.1 * gvec.gvec_len(ig)).exp(), 0.05 * h);
                if ig == 0 {
                    v.im = 0.0;
                }
                f_pw[ig] = v;
            }

            let mut f_rg = vec![0.0; grid.get_ntot()];
            rgt.pw_to_rg(&gvec, &comm, &f_pw, &mut f_rg);

            // G = 0 component is the average
            let avg = f_rg.iter().sum::<f64>() / grid.get_ntotf64();
            assert!((avg - f_pw[0].re).abs() < 1.0E-12);

            let mut back = vec![c64::new(0.0, 0.0); gvec.num_gvec()];
            rgt.rg_to_pw(&gvec, &comm, &f_rg, &mut back);

            if reduce {
                for (a, b) in back.iter().zip(f_pw.iter()) {
                    assert!((a - b).norm() < 1.0E-12);
                }
            } else {
                // the imaginary odd part is not a real function: only the Hermitian part survives
                for ig in 0..gvec.num_gvec() {
                    let jg = gvec.index_by_gvec(-gvec.gvec(ig)).unwrap();
                    let herm = 0.5 * (f_pw[ig] + f_pw[jg].conj());
                    assert!((back[ig] - herm).norm() < 1.0E-12);
                }
            }
        }
    }

    #[test]
    fn test_pw_to_rg_distributed_matches_serial() {
        let (grid, gvec_serial) = setup(1, false, &SerialComm);
        let rgt = RGTransform::new(&grid);

        let coeff = |g: Vector3i32| -> c64 {
            let r = (g.x * g.x + 2 * g.y * g.y + 3 * g.z * g.z) as f64;
            c64::new((-0.2 * r).exp(), 0.0)
        };

        let f_pw: Vec<c64> = (0..gvec_serial.num_gvec()).map(|ig| coeff(gvec_serial.gvec(ig))).collect();
        let mut f_ref = vec![0.0; grid.get_ntot()];
        rgt.pw_to_rg(&gvec_serial, &SerialComm, &f_pw, &mut f_ref);

        let comms = ThreadComm::world(3);

        let results: Vec<Vec<f64>> = std::thread::scope(|s| {
            let handles: Vec<_> = comms
                .iter()
                .map(|comm| {
                    let grid = grid.clone();
                    s.spawn(move || {
                        let latt = Lattice::cubic(6.0);
                        let fft_comm = SerialComm;
                        let gvec =
                            Gvec::new(Vector3f64::zeros(), &latt.reciprocal(), 2.5, &grid, 3, &fft_comm, false)
                                .unwrap();

                        let rank = comm.rank();
                        let off = gvec.gvec_offset(rank);
                        let local: Vec<c64> = (0..gvec.gvec_count(rank)).map(|i| coeff(gvec.gvec(off + i))).collect();

                        let rgt = RGTransform::new(&grid);
                        let mut f_rg = vec![0.0; grid.get_ntot()];
                        rgt.pw_to_rg(&gvec, comm, &local, &mut f_rg);

                        f_rg
                    })
                })
                .collect();

            handles.into_iter().map(|h| h.join().unwrap()).collect()
        });

        for f_rg in results.iter() {
            for (a, b) in f_rg.iter().zip(f_ref.iter()) {
                assert!((a - b).abs() < 1.0E-12);
            }
        }
    }
}

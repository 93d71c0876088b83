use control::Control;
use crystal::UnitCell;
use dwconsts::*;
use dwmpi::Communicator;
use fftgrid::FFTGrid;
use gvector::{GVectorError, Gvec};
use rayon::prelude::*;
use rgtransform::RGTransform;
use symmetry::MagneticSymmetry;
use tracing::{debug, info};
use types::{c64, ProcessingUnit};
use vector3::*;
use vnl::AugmentationOperator;

use std::{ops::Range, sync::Arc};

pub mod logging;

mod radial_integrals;
pub use radial_integrals::*;

mod periodic_function;
pub use periodic_function::*;

const PARALLEL_MIN_LEN: usize = 8192;

#[inline]
fn use_parallel_for_len(len: usize) -> bool {
    len >= PARALLEL_MIN_LEN && rayon::current_num_threads() > 1
}

#[derive(Debug, thiserror::Error)]
pub enum ContextError {
    #[error(transparent)]
    Gvector(#[from] GVectorError),
}

/// Everything the density and Hubbard kernels read but never own.
pub struct SimulationContext {
    control: Control,
    unit_cell: UnitCell,
    symmetry: Box<dyn MagneticSymmetry>,
    comm: Arc<dyn Communicator>,
    // ranks sharing one FFT; and the ranks holding the same slab of different FFTs
    comm_fft: Arc<dyn Communicator>,
    comm_ortho_fft: Arc<dyn Communicator>,

    fft_grid: FFTGrid,
    gvec: Gvec,
    rgtransform: RGTransform,

    aug_ops: Vec<Option<AugmentationOperator>>,
    radial_integrals: Box<dyn RadialIntegrals>,

    // (grid index, distance) of the points within rmt_max of each atom
    atoms_to_grid_idx: Vec<Vec<(usize, f64)>>,

    // 1 in the interstitial, 0 inside muffin-tin spheres; full potential only
    step_function: Vec<f64>,
}

impl SimulationContext {
    pub fn new(
        control: Control,
        unit_cell: UnitCell,
        symmetry: Box<dyn MagneticSymmetry>,
        comm: Arc<dyn Communicator>,
    ) -> Result<SimulationContext, ContextError> {
        let num_ranks = comm.size();
        let fft_size = control.get_fft_comm_size();

        if fft_size == 0 || num_ranks % fft_size != 0 {
            return Err(GVectorError::RankTopology { num_ranks, fft_size }.into());
        }

        let latt = unit_cell.get_latt();
        let fft_grid = FFTGrid::new(latt, control.get_pw_cutoff());

        // fine rank r belongs to FFT rank r / nrc and holds slab r % nrc of it
        let nrc = num_ranks / fft_size;
        let rank = comm.rank();

        let comm_fft = comm.split(rank % nrc, rank / nrc);
        let comm_ortho_fft = comm.split(rank / nrc, rank % nrc);

        let gvec = Gvec::new(
            Vector3f64::zeros(),
            &latt.reciprocal(),
            control.get_pw_cutoff(),
            &fft_grid,
            num_ranks,
            comm_fft.as_ref(),
            control.get_reduce_gvec(),
        )?;

        let omega = unit_cell.omega();

        let aug_ops = unit_cell
            .atom_types()
            .iter()
            .enumerate()
            .map(|(iat, atype)| {
                if atype.augment() {
                    Some(AugmentationOperator::new(atype, iat, &gvec, rank, omega))
                } else {
                    None
                }
            })
            .collect();

        let rmt_max = control.get_rmt_max();
        let atoms_to_grid_idx = atoms_to_grid_map(&unit_cell, &fft_grid, |_| rmt_max);

        let step_function = if control.full_potential() {
            let mt = atoms_to_grid_map(&unit_cell, &fft_grid, |ia| unit_cell.atom_type_of(ia).get_mt_radius());

            let mut theta = vec![1.0; fft_grid.get_ntot()];
            for points in mt.iter() {
                for &(ir, _) in points.iter() {
                    theta[ir] = 0.0;
                }
            }

            theta
        } else {
            Vec::new()
        };

        let radial_integrals = Box::new(AtomicRadialIntegrals::new(&unit_cell));
        let rgtransform = RGTransform::new(&fft_grid);

        debug!(
            rank,
            num_gvec = gvec.num_gvec(),
            num_gvec_loc = gvec.gvec_count(rank),
            fft_grid = %fft_grid,
            "simulation context ready"
        );

        Ok(SimulationContext {
            control,
            unit_cell,
            symmetry,
            comm,
            comm_fft,
            comm_ortho_fft,
            fft_grid,
            gvec,
            rgtransform,
            aug_ops,
            radial_integrals,
            atoms_to_grid_idx,
            step_function,
        })
    }

    /// Replace the tabulated radial integrals, e.g. with interpolated ones.
    pub fn with_radial_integrals(mut self, ri: Box<dyn RadialIntegrals>) -> SimulationContext {
        self.radial_integrals = ri;
        self
    }

    pub fn control(&self) -> &Control {
        &self.control
    }

    pub fn unit_cell(&self) -> &UnitCell {
        &self.unit_cell
    }

    pub fn symmetry(&self) -> &dyn MagneticSymmetry {
        self.symmetry.as_ref()
    }

    pub fn comm(&self) -> &dyn Communicator {
        self.comm.as_ref()
    }

    pub fn comm_arc(&self) -> Arc<dyn Communicator> {
        self.comm.clone()
    }

    pub fn comm_fft(&self) -> &dyn Communicator {
        self.comm_fft.as_ref()
    }

    pub fn comm_ortho_fft(&self) -> &dyn Communicator {
        self.comm_ortho_fft.as_ref()
    }

    pub fn fft_grid(&self) -> &FFTGrid {
        &self.fft_grid
    }

    pub fn gvec(&self) -> &Gvec {
        &self.gvec
    }

    pub fn rgtransform(&self) -> &RGTransform {
        &self.rgtransform
    }

    pub fn radial_integrals(&self) -> &dyn RadialIntegrals {
        self.radial_integrals.as_ref()
    }

    pub fn augmentation_op(&self, iat: usize) -> Option<&AugmentationOperator> {
        self.aug_ops[iat].as_ref()
    }

    pub fn augmentation_ops(&self) -> &[Option<AugmentationOperator>] {
        &self.aug_ops
    }

    pub fn atoms_to_grid_idx_map(&self, ia: usize) -> &[(usize, f64)] {
        &self.atoms_to_grid_idx[ia]
    }

    pub fn step_function(&self) -> &[f64] {
        &self.step_function
    }

    pub fn full_potential(&self) -> bool {
        self.control.full_potential()
    }

    pub fn num_mag_dims(&self) -> usize {
        self.control.get_num_mag_dims()
    }

    pub fn processing_unit(&self) -> ProcessingUnit {
        self.control.get_processing_unit()
    }

    /// Global indices of the G-vectors stored on this rank.
    pub fn gvec_range(&self) -> Range<usize> {
        let rank = self.comm.rank();
        let offset = self.gvec.gvec_offset(rank);

        offset..offset + self.gvec.gvec_count(rank)
    }

    pub fn num_gvec_loc(&self) -> usize {
        self.gvec.gvec_count(self.comm.rank())
    }

    /// Atoms whose muffin-tin work is done on this rank.
    pub fn is_local_atom(&self, ia: usize) -> bool {
        ia % self.comm.size() == self.comm.rank()
    }

    /// Local PW coefficients of sum_a f_{type(a)}(|G|) exp(-iG.r_a), scaled by 4pi/omega.
    pub fn make_periodic_function<F>(&self, form_factor: F) -> Vec<c64>
    where
        F: Fn(usize, f64) -> f64 + Sync,
    {
        let cell = &self.unit_cell;
        let gvec = &self.gvec;
        let range = self.gvec_range();

        let ntypes = cell.num_atom_types();
        let nsh = gvec.num_shells();
        let fact = FOURPI / cell.omega();

        let mut shells: Vec<usize> = range.clone().map(|ig| gvec.shell(ig)).collect();
        shells.sort_unstable();
        shells.dedup();

        let eval = |&ish: &usize| -> (usize, Vec<f64>) {
            let g = gvec.shell_len(ish);
            (ish, (0..ntypes).map(|iat| form_factor(iat, g)).collect())
        };

        let values: Vec<(usize, Vec<f64>)> = if use_parallel_for_len(shells.len()) {
            shells.par_iter().map(eval).collect()
        } else {
            shells.iter().map(eval).collect()
        };

        let mut ff = vec![0.0; ntypes * nsh];
        for (ish, v) in values.into_iter() {
            for (iat, x) in v.into_iter().enumerate() {
                ff[iat * nsh + ish] = x;
            }
        }

        let mut f_pw = vec![ZERO_C64; range.len()];

        for iat in 0..ntypes {
            let positions = cell.get_atom_positions_of_type(iat);

            if positions.is_empty() {
                continue;
            }

            let sfact = fhkl::compute_structure_factor(gvec, range.clone(), &positions);
            let offset = range.start;
            let ff = &ff[iat * nsh..(iat + 1) * nsh];

            let add = |(igloc, v): (usize, &mut c64)| {
                *v += fact * ff[gvec.shell(igloc + offset)] * sfact[igloc];
            };

            if use_parallel_for_len(f_pw.len()) {
                f_pw.par_iter_mut().enumerate().for_each(add);
            } else {
                f_pw.iter_mut().enumerate().for_each(add);
            }
        }

        f_pw
    }

    pub fn display(&self) {
        info!("{:-^80}", " simulation context ");
        info!("{:<28} = {:>18}", "num_ranks", self.comm.size());
        info!("{:<28} = {:>18}", "fft_grid", self.fft_grid.to_string());
        info!("{:<28} = {:>18}", "num_gvec", self.gvec.num_gvec());
        info!("{:<28} = {:>18}", "num_gvec_shells", self.gvec.num_shells());
        info!("{:<28} = {:>18}", "reduced_gvec", self.gvec.reduced());
        info!(
            "{:<28} = {:>18}",
            "augmentation_types",
            self.aug_ops.iter().filter(|op| op.is_some()).count()
        );
    }
}

/// Grid points (linear index, distance) within `radius(ia)` of every atom, periodic images included.
pub fn atoms_to_grid_map<R>(cell: &UnitCell, grid: &FFTGrid, radius: R) -> Vec<Vec<(usize, f64)>>
where
    R: Fn(usize) -> f64 + Sync,
{
    let latt = cell.get_latt();
    let recip = latt.reciprocal();

    let bnorm = [
        recip.get_vector_a().norm2(),
        recip.get_vector_b().norm2(),
        recip.get_vector_c().norm2(),
    ];

    let n = grid.get_size();

    let one_atom = |ia: usize| -> Vec<(usize, f64)> {
        let r = radius(ia);
        let pos = cell.atom(ia).get_position();

        let mut lim = [(0i32, 0i32); 3];
        for axis in 0..3 {
            let delta = r * bnorm[axis] / TWOPI;
            let nf = n[axis] as f64;

            lim[axis] = (
                ((pos.get(axis) - delta) * nf).floor() as i32,
                ((pos.get(axis) + delta) * nf).ceil() as i32,
            );
        }

        let mut points = Vec::new();

        for k in lim[2].0..=lim[2].1 {
            for j in lim[1].0..=lim[1].1 {
                for i in lim[0].0..=lim[0].1 {
                    let d = Vector3f64::new(
                        i as f64 / n[0] as f64 - pos.x,
                        j as f64 / n[1] as f64 - pos.y,
                        k as f64 / n[2] as f64 - pos.z,
                    );

                    let dist = latt.frac_to_cart(d).norm2();

                    if dist < r {
                        let idx = grid.linear_index(wrap(i, n[0]), wrap(j, n[1]), wrap(k, n[2]));
                        points.push((idx, dist));
                    }
                }
            }
        }

        points
    };

    if use_parallel_for_len(grid.get_ntot()) {
        (0..cell.num_atoms()).into_par_iter().map(one_atom).collect()
    } else {
        (0..cell.num_atoms()).map(one_atom).collect()
    }
}

#[inline]
fn wrap(i: i32, n: usize) -> usize {
    i.rem_euclid(n as i32) as usize
}

#[cfg(test)]
mod tests;

use crate::KPoint;
use dwmpi::Communicator;
use std::ops::Range;
use std::sync::Arc;
use tracing::debug;

/// All k-point weights plus the k-points owned by this rank.
pub struct KPointSet {
    weights: Vec<f64>,
    local_range: Range<usize>,
    local: Vec<Box<dyn KPoint>>,
    comm: Arc<dyn Communicator>,
}

impl KPointSet {
    /// Build the k-points of the local range given by `kpts_distribution`.
    pub fn new<E, F>(weights: Vec<f64>, comm: Arc<dyn Communicator>, mut make_kpoint: F) -> Result<KPointSet, E>
    where
        F: FnMut(usize) -> Result<Box<dyn KPoint>, E>,
    {
        let nkpt = weights.len();
        let local_range = kpts_distribution::get_my_k_range(nkpt, comm.as_ref());

        let mut local = Vec::with_capacity(local_range.len());
        for ik in local_range.clone() {
            local.push(make_kpoint(ik)?);
        }

        debug!(
            rank = comm.rank(),
            num_kpoints = nkpt,
            k_first = local_range.start,
            k_total = local_range.len(),
            "k-points distributed"
        );

        Ok(KPointSet {
            weights,
            local_range,
            local,
            comm,
        })
    }

    pub fn num_kpoints(&self) -> usize {
        self.weights.len()
    }

    pub fn weight(&self, ik: usize) -> f64 {
        self.weights[ik]
    }

    pub fn weights(&self) -> &[f64] {
        &self.weights
    }

    pub fn comm(&self) -> &dyn Communicator {
        self.comm.as_ref()
    }

    pub fn local_range(&self) -> Range<usize> {
        self.local_range.clone()
    }

    pub fn num_local_kpoints(&self) -> usize {
        self.local.len()
    }

    /// (global index, k-point) of every local k-point.
    pub fn local_kpoints(&self) -> impl Iterator<Item = (usize, &dyn KPoint)> + '_ {
        self.local_range.clone().zip(self.local.iter().map(|k| k.as_ref()))
    }

    pub fn local_kpoints_mut(&mut self) -> impl Iterator<Item = (usize, &mut Box<dyn KPoint>)> + '_ {
        self.local_range.clone().zip(self.local.iter_mut())
    }

    /// Sum over all k-points and bands of occupancy * weight.
    pub fn total_band_weight(&self, num_spins: usize) -> f64 {
        let mut s = 0.0;

        for (_, kp) in self.local_kpoints() {
            for ispn in 0..num_spins {
                for ibnd in 0..kp.num_bands() {
                    s += kp.band_weight(ibnd, ispn);
                }
            }
        }

        dwmpi::allreduce_sum_scalar(self.comm(), s)
    }

    pub fn max_num_bands(&self) -> usize {
        self.local.iter().map(|k| k.num_bands()).max().unwrap_or(0)
    }
}

mod descriptor;
pub use descriptor::*;

mod error;
pub use error::*;

use dwmpi::Communicator;
use fftgrid::FFTGrid;
use lattice::Lattice;
use rayon::prelude::*;
use std::collections::BTreeMap;
use tracing::debug;
use vector3::{Vector3f64, Vector3i32};

/// Bits of the packed index holding the position inside a z-column.
const ZCOL_BITS: usize = 12;

pub const MAX_ZCOL_LEN: usize = 1 << ZCOL_BITS;

const PARALLEL_MIN_LEN: usize = 8192;

#[inline]
fn use_parallel_for_len(len: usize) -> bool {
    len >= PARALLEL_MIN_LEN && rayon::current_num_threads() > 1
}

/// Start and length of the z-column stored at (x, y).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct XYEntry {
    start: usize,
    len: usize,
}

/// G (or G+k) vectors inside a sphere, grouped in z-columns and distributed over ranks.
///
/// Not `Clone`: one instance owns its FFT-communicator binding.
#[derive(Debug)]
pub struct Gvec {
    vk: Vector3f64,
    lattice: Lattice,
    reduce_gvec: bool,
    num_ranks: usize,

    fft_comm_size: usize,
    fft_comm_rank: usize,

    num_gvec: usize,

    /// (column << 12) | position in column
    full_index: Vec<usize>,

    shell: Vec<usize>,
    shell_len: Vec<f64>,

    xlim: (i32, i32),
    ylim: (i32, i32),
    index_by_xy: Vec<Option<XYEntry>>,

    z_columns: Vec<ZColumn>,

    gvec_distr: BlockDescriptor,
    zcol_distr: BlockDescriptor,
    gvec_distr_fft: BlockDescriptor,
    zcol_distr_fft: BlockDescriptor,
    gvec_fft_slab: BlockDescriptor,
}

impl Gvec {
    /// `lattice` holds the reciprocal lattice vectors, `vk` is given in their units.
    pub fn new(
        vk: Vector3f64,
        lattice: &Lattice,
        gmax: f64,
        fft_box: &FFTGrid,
        num_ranks: usize,
        fft_comm: &dyn Communicator,
        reduce_gvec: bool,
    ) -> Result<Gvec, GVectorError> {
        assert!(num_ranks > 0);

        let xlim = fft_box.get_limits(0);
        let ylim = fft_box.get_limits(1);

        let candidates = scan_columns(vk, lattice, gmax, fft_box, reduce_gvec);

        let nx = (xlim.1 - xlim.0 + 1) as usize;
        let ny = (ylim.1 - ylim.0 + 1) as usize;
        let xy_pos = |x: i32, y: i32| -> Option<usize> {
            if x < xlim.0 || x > xlim.1 || y < ylim.0 || y > ylim.1 {
                None
            } else {
                Some((x - xlim.0) as usize + nx * (y - ylim.0) as usize)
            }
        };

        let mut non_zero_columns = vec![false; nx * ny];
        let mut z_columns = Vec::new();

        for col in candidates.into_iter() {
            let Some(pos) = xy_pos(col.x, col.y) else { continue };

            if non_zero_columns[pos] {
                continue;
            }

            if col.len() > MAX_ZCOL_LEN {
                return Err(GVectorError::ColumnTooLong {
                    x: col.x,
                    y: col.y,
                    len: col.len(),
                    max: MAX_ZCOL_LEN,
                });
            }

            non_zero_columns[pos] = true;

            if reduce_gvec {
                if let Some(mpos) = xy_pos(-col.x, -col.y) {
                    non_zero_columns[mpos] = true;
                }
            }

            z_columns.push(col);
        }

        if z_columns.is_empty() {
            return Err(GVectorError::EmptyGvecSet);
        }

        // {0, 0} column goes first, the rest by decreasing length
        if let Some(i0) = z_columns.iter().position(|c| c.x == 0 && c.y == 0) {
            z_columns.swap(0, i0);
        }
        z_columns[1..].sort_by(|a, b| b.len().cmp(&a.len()));

        let (z_columns, gvec_distr, zcol_distr) = distribute_z_columns(z_columns, num_ranks);

        let num_gvec = gvec_distr.total();

        let mut index_by_xy = vec![None; nx * ny];
        let mut full_index = Vec::with_capacity(num_gvec);

        for (icol, col) in z_columns.iter().enumerate() {
            if let Some(pos) = xy_pos(col.x, col.y) {
                index_by_xy[pos] = Some(XYEntry {
                    start: full_index.len(),
                    len: col.len(),
                });
            }

            for j in 0..col.len() {
                full_index.push((icol << ZCOL_BITS) | j);
            }
        }

        let mut gvec = Gvec {
            vk,
            lattice: lattice.clone(),
            reduce_gvec,
            num_ranks,
            fft_comm_size: fft_comm.size(),
            fft_comm_rank: fft_comm.rank(),
            num_gvec,
            full_index,
            shell: Vec::new(),
            shell_len: Vec::new(),
            xlim,
            ylim,
            index_by_xy,
            z_columns,
            gvec_distr,
            zcol_distr,
            gvec_distr_fft: BlockDescriptor::default(),
            zcol_distr_fft: BlockDescriptor::default(),
            gvec_fft_slab: BlockDescriptor::default(),
        };

        // never remove this check
        let g0 = gvec.gvec(0);
        if !g0.is_zero() {
            return Err(GVectorError::FirstGvecNotZero(g0.x, g0.y, g0.z));
        }

        gvec.find_shells();

        gvec.prepare(fft_comm)?;

        debug!(
            num_gvec = gvec.num_gvec,
            num_zcol = gvec.z_columns.len(),
            num_shells = gvec.shell_len.len(),
            "G-vector set constructed"
        );

        Ok(gvec)
    }

    /// Rebind the FFT communicator and rebuild everything derived from it.
    pub fn prepare(&mut self, fft_comm: &dyn Communicator) -> Result<(), GVectorError> {
        self.fft_comm_size = fft_comm.size();
        self.fft_comm_rank = fft_comm.rank();

        self.build_fft_distr()?;
        self.calc_offsets()?;
        self.pile_gvec();

        Ok(())
    }

    fn find_shells(&mut self) {
        let mut gsh: BTreeMap<u64, Vec<usize>> = BTreeMap::new();

        for ig in 0..self.num_gvec {
            // 1e-10 roundoff
            let len = (self.gkvec_cart(ig).norm2() * 1.0E10) as u64;
            gsh.entry(len).or_default().push(ig);
        }

        self.shell = vec![0; self.num_gvec];
        self.shell_len = Vec::with_capacity(gsh.len());

        for (ish, (len, members)) in gsh.iter().enumerate() {
            self.shell_len.push(*len as f64 * 1.0E-10);

            for &ig in members.iter() {
                self.shell[ig] = ish;
            }
        }
    }

    fn ranks_per_fft_rank(&self) -> Result<usize, GVectorError> {
        let fft_size = self.fft_comm_size;

        if fft_size == 0 || self.num_ranks % fft_size != 0 {
            return Err(GVectorError::RankTopology {
                num_ranks: self.num_ranks,
                fft_size,
            });
        }

        Ok(self.num_ranks / fft_size)
    }

    fn build_fft_distr(&mut self) -> Result<(), GVectorError> {
        let nrc = self.ranks_per_fft_rank()?;

        let mut gvec_distr_fft = BlockDescriptor::new(self.fft_comm_size);
        let mut zcol_distr_fft = BlockDescriptor::new(self.fft_comm_size);

        for rank in 0..self.fft_comm_size {
            for i in 0..nrc {
                // fine-grained rank
                let r = rank * nrc + i;
                gvec_distr_fft.add(rank, self.gvec_distr.count(r));
                zcol_distr_fft.add(rank, self.zcol_distr.count(r));
            }
        }

        gvec_distr_fft.calc_offsets();
        zcol_distr_fft.calc_offsets();

        self.gvec_distr_fft = gvec_distr_fft;
        self.zcol_distr_fft = zcol_distr_fft;

        Ok(())
    }

    /// Offsets of z-columns inside the PW buffer of each FFT rank.
    fn calc_offsets(&mut self) -> Result<(), GVectorError> {
        for rank in 0..self.fft_comm_size {
            let mut offs = 0;

            let first = self.zcol_distr_fft.offset(rank);
            let ncol = self.zcol_distr_fft.count(rank);

            for col in self.z_columns[first..first + ncol].iter_mut() {
                col.offset = offs;
                offs += col.len();
            }

            if offs != self.gvec_distr_fft.count(rank) {
                return Err(GVectorError::OffsetMismatch {
                    rank,
                    found: offs,
                    expected: self.gvec_distr_fft.count(rank),
                });
            }
        }

        Ok(())
    }

    /// Slabs of the fine-grained ranks that make up this FFT rank.
    fn pile_gvec(&mut self) {
        let nrc = self.num_ranks / self.fft_comm_size;

        let counts = (0..nrc)
            .map(|i| self.gvec_distr.count(self.fft_comm_rank * nrc + i))
            .collect();

        self.gvec_fft_slab = BlockDescriptor::from_counts(counts);

        debug_assert_eq!(self.gvec_fft_slab.total(), self.gvec_distr_fft.count(self.fft_comm_rank));
    }

    #[inline]
    fn gvec_by_full_index(&self, idx: usize) -> Vector3i32 {
        let j = idx & (MAX_ZCOL_LEN - 1);
        let i = idx >> ZCOL_BITS;

        let col = &self.z_columns[i];

        Vector3i32::new(col.x, col.y, col.z[j])
    }

    pub fn num_gvec(&self) -> usize {
        self.num_gvec
    }

    pub fn num_ranks(&self) -> usize {
        self.num_ranks
    }

    pub fn reduced(&self) -> bool {
        self.reduce_gvec
    }

    pub fn vk(&self) -> Vector3f64 {
        self.vk
    }

    pub fn lattice(&self) -> &Lattice {
        &self.lattice
    }

    /// Number of G-vectors of a fine-grained rank.
    pub fn gvec_count(&self, rank: usize) -> usize {
        self.gvec_distr.count(rank)
    }

    /// Global index of the first G-vector of a fine-grained rank.
    pub fn gvec_offset(&self, rank: usize) -> usize {
        self.gvec_distr.offset(rank)
    }

    pub fn zcol_count(&self, rank: usize) -> usize {
        self.zcol_distr.count(rank)
    }

    pub fn zcol_offset(&self, rank: usize) -> usize {
        self.zcol_distr.offset(rank)
    }

    pub fn gvec_count_fft(&self, fft_rank: usize) -> usize {
        self.gvec_distr_fft.count(fft_rank)
    }

    pub fn gvec_offset_fft(&self, fft_rank: usize) -> usize {
        self.gvec_distr_fft.offset(fft_rank)
    }

    pub fn zcol_count_fft(&self, fft_rank: usize) -> usize {
        self.zcol_distr_fft.count(fft_rank)
    }

    pub fn zcol_offset_fft(&self, fft_rank: usize) -> usize {
        self.zcol_distr_fft.offset(fft_rank)
    }

    pub fn fft_comm_rank(&self) -> usize {
        self.fft_comm_rank
    }

    pub fn gvec_distr(&self) -> &BlockDescriptor {
        &self.gvec_distr
    }

    pub fn zcol_distr(&self) -> &BlockDescriptor {
        &self.zcol_distr
    }

    pub fn gvec_distr_fft(&self) -> &BlockDescriptor {
        &self.gvec_distr_fft
    }

    pub fn zcol_distr_fft(&self) -> &BlockDescriptor {
        &self.zcol_distr_fft
    }

    pub fn gvec_fft_slab(&self) -> &BlockDescriptor {
        &self.gvec_fft_slab
    }

    pub fn num_zcol(&self) -> usize {
        self.z_columns.len()
    }

    pub fn zcol(&self, icol: usize) -> &ZColumn {
        &self.z_columns[icol]
    }

    pub fn num_shells(&self) -> usize {
        self.shell_len.len()
    }

    pub fn shell(&self, ig: usize) -> usize {
        self.shell[ig]
    }

    pub fn shell_len(&self, ish: usize) -> f64 {
        self.shell_len[ish]
    }

    pub fn gvec_len(&self, ig: usize) -> f64 {
        self.shell_len[self.shell[ig]]
    }

    /// G in lattice coordinates
    pub fn gvec(&self, ig: usize) -> Vector3i32 {
        self.gvec_by_full_index(self.full_index[ig])
    }

    /// G+k in lattice coordinates
    pub fn gkvec(&self, ig: usize) -> Vector3f64 {
        self.gvec(ig).to_f64() + self.vk
    }

    pub fn gvec_cart(&self, ig: usize) -> Vector3f64 {
        self.lattice.int_to_cart(self.gvec(ig))
    }

    pub fn gkvec_cart(&self, ig: usize) -> Vector3f64 {
        self.lattice.frac_to_cart(self.gkvec(ig))
    }

    /// Global index of G, or None when G is not stored.
    pub fn index_by_gvec(&self, g: Vector3i32) -> Option<usize> {
        if self.reduce_gvec && g.x == 0 && g.y == 0 && g.z < 0 {
            return None;
        }

        if g.x < self.xlim.0 || g.x > self.xlim.1 || g.y < self.ylim.0 || g.y > self.ylim.1 {
            return None;
        }

        let nx = (self.xlim.1 - self.xlim.0 + 1) as usize;
        let pos = (g.x - self.xlim.0) as usize + nx * (g.y - self.ylim.0) as usize;

        let entry = self.index_by_xy[pos]?;

        let offs = if g.z >= 0 {
            g.z as i64
        } else {
            g.z as i64 + entry.len as i64
        };

        if offs >= 0 && (offs as usize) < entry.len {
            let ig = entry.start + offs as usize;
            if self.gvec(ig).z == g.z {
                return Some(ig);
            }
        }

        // columns cut off-center by the sphere are not contiguous around z = 0
        (entry.start..entry.start + entry.len).find(|&ig| self.gvec(ig).z == g.z)
    }

    /// Index of G1 - G2.
    pub fn index_g12(&self, g1: Vector3i32, g2: Vector3i32) -> Option<usize> {
        self.index_by_gvec(g1 - g2)
    }
}

/// Columns (x, y) with at least one |G+k| <= gmax, in x-major scan order.
fn scan_columns(
    vk: Vector3f64,
    lattice: &Lattice,
    gmax: f64,
    fft_box: &FFTGrid,
    reduce_gvec: bool,
) -> Vec<ZColumn> {
    let (x0, x1) = fft_box.get_limits(0);
    let (y0, y1) = fft_box.get_limits(1);
    let nz = fft_box.get_n3();
    let z_right = fft_box.get_limits(2).1;

    let scan_x = |i: i32| -> Vec<ZColumn> {
        let mut cols = Vec::new();

        for j in y0..=y1 {
            // in case of reduction only z in [0, Nz/2] for the {0, 0} column
            let zmax = if reduce_gvec && i == 0 && j == 0 {
                z_right as usize
            } else {
                nz - 1
            };

            let zcol: Vec<i32> = (0..=zmax)
                .map(|iz| fft_box.index_to_freq(2, iz))
                .filter(|&k| {
                    let g = Vector3f64::new(i as f64, j as f64, k as f64) + vk;
                    lattice.frac_to_cart(g).norm2() <= gmax
                })
                .collect();

            if !zcol.is_empty() {
                cols.push(ZColumn::new(i, j, zcol));
            }
        }

        cols
    };

    if use_parallel_for_len(fft_box.get_ntot()) {
        (x0..=x1).into_par_iter().flat_map_iter(scan_x).collect()
    } else {
        (x0..=x1).flat_map(scan_x).collect()
    }
}

/// Greedy assignment of whole columns, done in passes over the ranks.
///
/// Each pass starts from the full list of ranks in rank order. A column goes to the rank
/// with the fewest G-vectors among those not yet served in the current pass (first one in
/// list order on a tie), which then leaves the list; an empty list starts the next pass.
fn distribute_z_columns(
    z_columns: Vec<ZColumn>,
    num_ranks: usize,
) -> (Vec<ZColumn>, BlockDescriptor, BlockDescriptor) {
    let mut gvec_distr = BlockDescriptor::new(num_ranks);
    let mut zcol_distr = BlockDescriptor::new(num_ranks);

    let mut zcols_local: Vec<Vec<ZColumn>> = vec![Vec::new(); num_ranks];

    let mut ranks: Vec<usize> = Vec::with_capacity(num_ranks);

    for col in z_columns.into_iter() {
        if ranks.is_empty() {
            ranks.extend(0..num_ranks);
        }

        // first minimum in list order
        let mut ipos = 0;
        for (p, &r) in ranks.iter().enumerate() {
            if gvec_distr.count(r) < gvec_distr.count(ranks[ipos]) {
                ipos = p;
            }
        }

        let rank = ranks.remove(ipos);

        gvec_distr.add(rank, col.len());
        zcol_distr.add(rank, 1);
        zcols_local[rank].push(col);
    }

    gvec_distr.calc_offsets();
    zcol_distr.calc_offsets();

    let z_columns = zcols_local.into_iter().flatten().collect();

    (z_columns, gvec_distr, zcol_distr)
}

use context::SimulationContext;
use crystal::HubbardOrbital;
use dwconsts::*;
use matrix::Matrix;
use ndarray::Array5;
use tracing::{debug, info};
use types::c64;

mod interaction;
pub use interaction::*;

mod occupation;
mod orbitals;
mod potential;

const PARALLEL_MIN_LEN: usize = 8192;

#[inline]
fn use_parallel_for_len(len: usize) -> bool {
    len >= PARALLEL_MIN_LEN && rayon::current_num_threads() > 1
}

#[derive(Debug, thiserror::Error)]
pub enum HubbardError {
    #[error("atom type {symbol} has a Hubbard orbital without a radial function")]
    MissingRadialOrbital { symbol: String },

    #[error("atom type {symbol}: Hubbard correction for l = {l} is not supported")]
    InvalidL { symbol: String, l: usize },

    #[error("k-point {ik}: overlap of the Hubbard orbitals is singular")]
    SingularOverlap { ik: usize },

    #[error("k-point {ik} carries no Hubbard orbitals")]
    MissingOrbitals { ik: usize },

    #[error("k-point {ik} carries no beta projectors")]
    MissingBetaProjectors { ik: usize },
}

/// On-site Hubbard correction: occupation numbers, potential and energy.
///
/// Both tensors are indexed `(m1, m2, spin block, atom, channel)`. Spin blocks are
/// 0 = up-up, 1 = dn-dn, 2 = up-dn, 3 = dn-up; collinear runs only use the first
/// `num_spins` blocks.
pub struct HubbardPotential<'a> {
    ctx: &'a SimulationContext,

    enabled: bool,
    // num_mag_dims == 3, fixed for the lifetime of the object
    noncollinear: bool,
    simplified: bool,
    orthogonalize: bool,
    normalize: bool,

    lmax: usize,
    offsets: Vec<Option<usize>>,
    num_orbitals: usize,

    occupation: Array5<c64>,
    potential: Array5<c64>,

    // U(m1, m2, m3, m4) per atom type
    interaction: Vec<Option<InteractionTensor>>,

    energy: f64,
    energy_u: f64,
    energy_dc: f64,
    energy_noflip: f64,
    energy_flip: f64,
}

impl<'a> HubbardPotential<'a> {
    /// Offsets, interaction tensors and the starting occupation; the potential and
    /// energy of that occupation are ready on return.
    pub fn new(ctx: &'a SimulationContext) -> Result<HubbardPotential<'a>, HubbardError> {
        let control = ctx.control();
        let cell = ctx.unit_cell();

        let enabled = control.get_hubbard_correction() && cell.hubbard_correction();
        let noncollinear = ctx.num_mag_dims() == 3;

        let mut hubbard = HubbardPotential {
            ctx,
            enabled,
            noncollinear,
            simplified: control.get_hubbard_simplified() && !control.get_so_correction() && !noncollinear,
            orthogonalize: control.get_hubbard_orthogonalize(),
            normalize: control.get_hubbard_normalize(),
            lmax: 0,
            offsets: vec![None; cell.num_atoms()],
            num_orbitals: 0,
            occupation: Array5::new([1, 1, 4, cell.num_atoms().max(1), 1]),
            potential: Array5::new([1, 1, 4, cell.num_atoms().max(1), 1]),
            interaction: vec![None; cell.num_atom_types()],
            energy: 0.0,
            energy_u: 0.0,
            energy_dc: 0.0,
            energy_noflip: 0.0,
            energy_flip: 0.0,
        };

        if !enabled {
            return Ok(hubbard);
        }

        for atype in cell.atom_types().iter() {
            if let Some(orb) = atype.get_hubbard_orbitals().first() {
                if orb.l > 3 {
                    return Err(HubbardError::InvalidL {
                        symbol: atype.get_symbol().to_string(),
                        l: orb.l,
                    });
                }

                if orb.f.is_empty() {
                    return Err(HubbardError::MissingRadialOrbital {
                        symbol: atype.get_symbol().to_string(),
                    });
                }
            }
        }

        hubbard.calculate_offsets();

        let n = 2 * hubbard.lmax + 1;
        hubbard.occupation = Array5::new([n, n, 4, cell.num_atoms(), 1]);
        hubbard.potential = Array5::new([n, n, 4, cell.num_atoms(), 1]);

        for (iat, atype) in cell.atom_types().iter().enumerate() {
            if let Some(orb) = atype.get_hubbard_orbitals().first() {
                hubbard.interaction[iat] = Some(InteractionTensor::new(orb));
            }
        }

        hubbard.calculate_initial_occupation_numbers();
        hubbard.calculate_hubbard_potential_and_energy();

        debug!(
            num_orbitals = hubbard.num_orbitals,
            lmax = hubbard.lmax,
            simplified = hubbard.simplified,
            noncollinear = hubbard.noncollinear,
            "hubbard correction initialized"
        );

        Ok(hubbard)
    }

    // 2l+1 per Hubbard atom, in atom order
    fn calculate_offsets(&mut self) {
        let cell = self.ctx.unit_cell();

        let mut counter = 0;
        self.lmax = 0;

        for ia in 0..cell.num_atoms() {
            self.offsets[ia] = None;

            if let Some(orb) = cell.atom_type_of(ia).get_hubbard_orbitals().first() {
                self.offsets[ia] = Some(counter);
                counter += 2 * orb.l + 1;
                self.lmax = self.lmax.max(orb.l);
            }
        }

        self.num_orbitals = counter;
    }

    pub(crate) fn hubbard_orbital(&self, ia: usize) -> Option<&'a HubbardOrbital> {
        let ctx: &'a SimulationContext = self.ctx;

        ctx.unit_cell().atom_type_of(ia).get_hubbard_orbitals().first()
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn is_noncollinear(&self) -> bool {
        self.noncollinear
    }

    pub fn is_simplified(&self) -> bool {
        self.simplified
    }

    pub fn number_of_hubbard_orbitals(&self) -> usize {
        self.num_orbitals
    }

    /// First orbital of atom `ia` in the packed Hubbard basis; None for atoms without U.
    pub fn offset(&self, ia: usize) -> Option<usize> {
        self.offsets[ia]
    }

    pub fn hubbard_lmax(&self) -> usize {
        self.lmax
    }

    pub fn occupation_matrix(&self) -> &Array5<c64> {
        &self.occupation
    }

    pub fn occupation_matrix_mut(&mut self) -> &mut Array5<c64> {
        &mut self.occupation
    }

    pub fn potential_matrix(&self) -> &Array5<c64> {
        &self.potential
    }

    pub fn potential_matrix_mut(&mut self) -> &mut Array5<c64> {
        &mut self.potential
    }

    /// Potential element (m1, m2) of spin block `is` on atom `ia`.
    pub fn u(&self, m1: usize, m2: usize, is: usize, ia: usize) -> c64 {
        self.potential[[m1, m2, is, ia, 0]]
    }

    pub fn u_mut(&mut self, m1: usize, m2: usize, is: usize, ia: usize) -> &mut c64 {
        &mut self.potential[[m1, m2, is, ia, 0]]
    }

    pub fn u_channel(&self, m1: usize, m2: usize, is: usize, ia: usize, ch: usize) -> c64 {
        self.potential[[m1, m2, is, ia, ch]]
    }

    pub fn u_channel_mut(&mut self, m1: usize, m2: usize, is: usize, ia: usize, ch: usize) -> &mut c64 {
        &mut self.potential[[m1, m2, is, ia, ch]]
    }

    /// Interaction tensor of atom type `iat`.
    pub fn interaction(&self, iat: usize) -> Option<&InteractionTensor> {
        self.interaction[iat].as_ref()
    }

    pub fn hubbard_energy(&self) -> f64 {
        self.energy
    }

    pub fn hubbard_energy_u(&self) -> f64 {
        self.energy_u
    }

    pub fn hubbard_energy_dc(&self) -> f64 {
        self.energy_dc
    }

    pub fn hubbard_energy_noflip(&self) -> f64 {
        self.energy_noflip
    }

    pub fn hubbard_energy_flip(&self) -> f64 {
        self.energy_flip
    }

    fn num_spin_blocks(&self) -> usize {
        if self.noncollinear {
            4
        } else {
            self.ctx.control().num_spins()
        }
    }

    pub fn display(&self) {
        if !self.enabled || !self.ctx.comm().is_root() {
            return;
        }

        info!("{:-^80}", " hubbard correction ");
        info!("{:<28} = {:>18}", "num_orbitals", self.num_orbitals);
        info!("{:<28} = {:>18}", "simplified", self.simplified);
        info!("{:<28} = {:>18.10}", "energy", self.energy);
        info!("{:<28} = {:>18.10}", "energy_u", self.energy_u);
        info!("{:<28} = {:>18.10}", "energy_dc", self.energy_dc);

        if self.noncollinear {
            info!("{:<28} = {:>18.10}", "energy_noflip", self.energy_noflip);
            info!("{:<28} = {:>18.10}", "energy_flip", self.energy_flip);
        }

        for ia in 0..self.offsets.len() {
            let orb = match self.hubbard_orbital(ia) {
                Some(orb) => orb,
                None => continue,
            };

            let traces: Vec<String> = (0..self.num_spin_blocks().min(2))
                .map(|is| {
                    let tr: f64 = (0..2 * orb.l + 1).map(|m| self.occupation[[m, m, is, ia, 0]].re).sum();
                    format!("{:.6}", tr)
                })
                .collect();

            info!("atom {:>4} l = {} occupation = [{}]", ia, orb.l, traces.join(", "));
        }
    }
}

// a^H b; for a reduced G+k set the real 2 Re sum - G0 term
pub(crate) fn inner_product(a: &Matrix<c64>, b: &Matrix<c64>, reduced: bool) -> Matrix<c64> {
    let mut out = Matrix::<c64>::new(a.ncol(), b.ncol());
    Matrix::<c64>::gemm(ONE_C64, a, true, b, ZERO_C64, &mut out);

    if reduced {
        for j in 0..out.ncol() {
            for i in 0..out.nrow() {
                let g0 = a[[0, i]].conj() * b[[0, j]];
                out[[i, j]] = c64::new(2.0 * out[[i, j]].re - g0.re, 0.0);
            }
        }
    }

    out
}

use crystal::{AtomType, UnitCell};
use dwconsts::*;
use gvector::Gvec;
use matrix::Matrix;
use types::c64;

/// (-i)^l
pub fn minus_i_pow(l: usize) -> c64 {
    match l % 4 {
        0 => c64::new(1.0, 0.0),
        1 => c64::new(0.0, -1.0),
        2 => c64::new(-1.0, 0.0),
        _ => c64::new(0.0, 1.0),
    }
}

// PRB, 51, 14697 (1995), Eq.11
fn compute_vnl_of_kg(kg: &[f64], l: usize, beta: &[f64], atype: &AtomType, volume: f64) -> Vec<f64> {
    let grid = atype.get_radial_grid();

    let fact = FOURPI / volume.sqrt();

    kg.iter().map(|&q| fact * grid.bessel_transform(beta, l, q, 1)).collect()
}

/// Atoms whose projectors are handled together.
#[derive(Debug, Clone, Default)]
pub struct BetaChunk {
    pub atoms: Vec<usize>,
    /// first projector of each atom inside the chunk
    pub offsets: Vec<usize>,
    pub num_beta: usize,
}

/// Plane-wave coefficients of all |beta> at one k-point, split into chunks of atoms.
pub struct BetaProjectors {
    num_gkvec: usize,
    reduced: bool,
    chunks: Vec<BetaChunk>,
    pw_coeffs: Vec<Matrix<c64>>,
    beta_offset: Vec<usize>,
    num_total_beta: usize,
}

impl BetaProjectors {
    /// `max_chunk_size` bounds the number of projectors per chunk; one atom never spans two chunks.
    pub fn new(cell: &UnitCell, gkvec: &Gvec, max_chunk_size: usize) -> BetaProjectors {
        let ngk = gkvec.num_gvec();
        let omega = cell.omega();

        let kg: Vec<f64> = (0..ngk).map(|ig| gkvec.gkvec_cart(ig).norm2()).collect();

        let lmax = cell.atom_types().iter().map(|t| t.indexb().lmax()).max().unwrap_or(0);
        let ylm: Vec<Vec<f64>> = (0..ngk)
            .map(|ig| special::real_ylm_all_of_vector(lmax, gkvec.gkvec_cart(ig)))
            .collect();

        // beta_rf(|G+k|) per type
        let radial: Vec<Vec<Vec<f64>>> = cell
            .atom_types()
            .iter()
            .map(|t| {
                t.get_beta()
                    .iter()
                    .map(|b| compute_vnl_of_kg(&kg, b.l, &b.f, t, omega))
                    .collect()
            })
            .collect();

        let mut chunks = Vec::new();
        let mut current = BetaChunk::default();

        let mut beta_offset = vec![0; cell.num_atoms()];
        let mut num_total_beta = 0;

        for ia in 0..cell.num_atoms() {
            let nbf = cell.atom_type_of(ia).nbf();

            beta_offset[ia] = num_total_beta;
            num_total_beta += nbf;

            if nbf == 0 {
                continue;
            }

            if current.num_beta > 0 && current.num_beta + nbf > max_chunk_size {
                chunks.push(std::mem::take(&mut current));
            }

            current.atoms.push(ia);
            current.offsets.push(current.num_beta);
            current.num_beta += nbf;
        }

        if current.num_beta > 0 {
            chunks.push(current);
        }

        let mut pw_coeffs = Vec::with_capacity(chunks.len());

        for chunk in chunks.iter() {
            let mut m = Matrix::<c64>::new(ngk, chunk.num_beta);

            for (i, &ia) in chunk.atoms.iter().enumerate() {
                let iat = cell.atom(ia).get_type_id();
                let atype = cell.atom_type(iat);

                let phase = fhkl::compute_gk_phase_factors_one_atom(gkvec, cell.atom(ia).get_position());

                for (xi, b) in atype.indexb().iter().enumerate() {
                    let pref = minus_i_pow(b.l);
                    let col = m.get_mut_col(chunk.offsets[i] + xi);

                    for ig in 0..ngk {
                        col[ig] = pref * ylm[ig][b.lm] * radial[iat][b.idxrf][ig] * phase[ig];
                    }
                }
            }

            pw_coeffs.push(m);
        }

        BetaProjectors {
            num_gkvec: ngk,
            reduced: gkvec.reduced(),
            chunks,
            pw_coeffs,
            beta_offset,
            num_total_beta,
        }
    }

    pub fn num_gkvec(&self) -> usize {
        self.num_gkvec
    }

    pub fn num_chunks(&self) -> usize {
        self.chunks.len()
    }

    pub fn chunk(&self, ic: usize) -> &BetaChunk {
        &self.chunks[ic]
    }

    pub fn num_total_beta(&self) -> usize {
        self.num_total_beta
    }

    /// First projector of atom `ia` in the global beta index.
    pub fn beta_offset(&self, ia: usize) -> usize {
        self.beta_offset[ia]
    }

    pub fn pw_coeffs(&self, ic: usize) -> &Matrix<c64> {
        &self.pw_coeffs[ic]
    }

    /// <beta|phi> for the projectors of chunk `ic`; phi is (num_gkvec x n).
    pub fn inner(&self, ic: usize, phi: &Matrix<c64>) -> Matrix<c64> {
        assert_eq!(phi.nrow(), self.num_gkvec);

        let beta = &self.pw_coeffs[ic];

        let mut out = Matrix::<c64>::new(beta.ncol(), phi.ncol());
        Matrix::<c64>::gemm(ONE_C64, beta, true, phi, ZERO_C64, &mut out);

        out
    }

    /// Real <beta|phi> for a reduced (gamma) G+k set: 2 Re sum_G - Re(G=0 term).
    pub fn inner_real(&self, ic: usize, phi: &Matrix<c64>) -> Matrix<f64> {
        assert!(self.reduced);

        let beta = &self.pw_coeffs[ic];
        let full = self.inner(ic, phi);

        let mut out = Matrix::<f64>::new(full.nrow(), full.ncol());

        for j in 0..full.ncol() {
            let p0 = phi[[0, j]];

            for i in 0..full.nrow() {
                out[[i, j]] = 2.0 * full[[i, j]].re - (beta[[0, i]].conj() * p0).re;
            }
        }

        out
    }
}

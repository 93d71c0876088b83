/// One (l, m) component of a radial function of an atom type.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BasisFunction {
    pub l: usize,
    pub m: i32,
    pub lm: usize,
    /// total angular momentum for spin-orbit projectors
    pub j: Option<f64>,
    pub idxrf: usize,
}

/// Flat index xi over all (radial function, m) pairs of an atom type.
#[derive(Debug, Clone, Default)]
pub struct BasisIndex {
    entries: Vec<BasisFunction>,
    offset_by_rf: Vec<usize>,
    lmax: usize,
}

impl BasisIndex {
    /// `radial` lists (l, j) of each radial function in order.
    pub fn new(radial: &[(usize, Option<f64>)]) -> BasisIndex {
        let mut entries = Vec::new();
        let mut offset_by_rf = Vec::with_capacity(radial.len());
        let mut lmax = 0;

        for (idxrf, &(l, j)) in radial.iter().enumerate() {
            offset_by_rf.push(entries.len());
            lmax = lmax.max(l);

            for m in utility::get_quant_num_m(l) {
                entries.push(BasisFunction {
                    l,
                    m,
                    lm: utility::lm(l, m),
                    j,
                    idxrf,
                });
            }
        }

        BasisIndex {
            entries,
            offset_by_rf,
            lmax,
        }
    }

    pub fn size(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// nbf (nbf + 1) / 2
    pub fn size_packed(&self) -> usize {
        let n = self.size();
        n * (n + 1) / 2
    }

    pub fn get(&self, xi: usize) -> &BasisFunction {
        &self.entries[xi]
    }

    pub fn iter(&self) -> std::slice::Iter<'_, BasisFunction> {
        self.entries.iter()
    }

    pub fn lmax(&self) -> usize {
        self.lmax
    }

    pub fn num_radial(&self) -> usize {
        self.offset_by_rf.len()
    }

    pub fn offset_of_rf(&self, idxrf: usize) -> usize {
        self.offset_by_rf[idxrf]
    }
}

/// Position of the pair (xi1, xi2), xi1 <= xi2, in the upper-triangle packing.
#[inline]
pub fn packed_index(xi1: usize, xi2: usize) -> usize {
    debug_assert!(xi1 <= xi2);

    xi2 * (xi2 + 1) / 2 + xi1
}

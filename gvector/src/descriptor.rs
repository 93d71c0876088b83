/// Per-rank (count, offset) pairs; offsets are the exclusive prefix sum of counts.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BlockDescriptor {
    counts: Vec<usize>,
    offsets: Vec<usize>,
}

impl BlockDescriptor {
    pub fn new(num_ranks: usize) -> BlockDescriptor {
        BlockDescriptor {
            counts: vec![0; num_ranks],
            offsets: vec![0; num_ranks],
        }
    }

    pub fn from_counts(counts: Vec<usize>) -> BlockDescriptor {
        let mut d = BlockDescriptor {
            offsets: vec![0; counts.len()],
            counts,
        };
        d.calc_offsets();

        d
    }

    pub fn calc_offsets(&mut self) {
        let mut offs = 0;

        for (o, c) in self.offsets.iter_mut().zip(self.counts.iter()) {
            *o = offs;
            offs += *c;
        }
    }

    pub fn len(&self) -> usize {
        self.counts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.counts.is_empty()
    }

    pub fn count(&self, rank: usize) -> usize {
        self.counts[rank]
    }

    pub fn offset(&self, rank: usize) -> usize {
        self.offsets[rank]
    }

    pub fn counts(&self) -> &[usize] {
        &self.counts
    }

    pub fn offsets(&self) -> &[usize] {
        &self.offsets
    }

    pub fn total(&self) -> usize {
        self.counts.iter().sum()
    }

    pub(crate) fn add(&mut self, rank: usize, n: usize) {
        self.counts[rank] += n;
    }
}

/// G-vectors sharing (x, y); z values are kept in FFT storage order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ZColumn {
    pub x: i32,
    pub y: i32,
    pub z: Vec<i32>,
    /// Position of the column inside the PW buffer of its FFT rank.
    pub offset: usize,
}

impl ZColumn {
    pub fn new(x: i32, y: i32, z: Vec<i32>) -> ZColumn {
        ZColumn { x, y, z, offset: 0 }
    }

    pub fn len(&self) -> usize {
        self.z.len()
    }

    pub fn is_empty(&self) -> bool {
        self.z.is_empty()
    }
}

#[derive(Debug, thiserror::Error, PartialEq)]
pub enum GVectorError {
    #[error("first G-vector is not zero: ({0}, {1}, {2})")]
    FirstGvecNotZero(i32, i32, i32),

    #[error("no G-vectors inside the cutoff sphere")]
    EmptyGvecSet,

    #[error("wrong number of MPI ranks: {num_ranks} is not a multiple of the FFT communicator size {fft_size}")]
    RankTopology { num_ranks: usize, fft_size: usize },

    #[error("z-column ({x}, {y}) holds {len} G-vectors, more than the packed index allows ({max})")]
    ColumnTooLong { x: i32, y: i32, len: usize, max: usize },

    #[error("G-vector offsets of FFT rank {rank} add up to {found}, expected {expected}")]
    OffsetMismatch { rank: usize, found: usize, expected: usize },
}

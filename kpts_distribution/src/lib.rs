use dwmpi::Communicator;
use std::ops::Range;

/// Contiguous k-point ranges per rank; counts follow the round-robin rule ik % nrank.
///
/// Ranks beyond `nkpt` receive an empty range.
pub fn get_chunks(nkpt: usize, nrank: usize) -> Vec<Range<usize>> {
    assert!(nrank > 0);

    let mut vchunks_size = vec![0; nrank];
    for ik in 0..nkpt {
        vchunks_size[ik % nrank] += 1;
    }

    let mut vchunks = Vec::with_capacity(nrank);

    let mut n = 0;
    for size in vchunks_size {
        vchunks.push(n..n + size);
        n += size;
    }

    vchunks
}

pub fn get_k_range(nkpt: usize, nrank: usize, rank: usize) -> Range<usize> {
    get_chunks(nkpt, nrank)[rank].clone()
}

/// First k-point of `rank`; None when the rank owns no k-point.
pub fn get_k_first(nkpt: usize, nrank: usize, rank: usize) -> Option<usize> {
    let r = get_k_range(nkpt, nrank, rank);

    if r.is_empty() {
        None
    } else {
        Some(r.start)
    }
}

pub fn get_k_last(nkpt: usize, nrank: usize, rank: usize) -> Option<usize> {
    let r = get_k_range(nkpt, nrank, rank);

    if r.is_empty() {
        None
    } else {
        Some(r.end - 1)
    }
}

pub fn get_k_total(nkpt: usize, nrank: usize, rank: usize) -> usize {
    get_k_range(nkpt, nrank, rank).len()
}

/// Rank owning k-point `ik`.
pub fn get_k_owner(nkpt: usize, nrank: usize, ik: usize) -> usize {
    assert!(ik < nkpt);

    get_chunks(nkpt, nrank)
        .iter()
        .position(|r| r.contains(&ik))
        .unwrap_or(0)
}

pub fn get_my_k_range(nkpt: usize, comm: &dyn Communicator) -> Range<usize> {
    get_k_range(nkpt, comm.size(), comm.rank())
}

pub fn get_my_k_total(nkpt: usize, comm: &dyn Communicator) -> usize {
    get_k_total(nkpt, comm.size(), comm.rank())
}

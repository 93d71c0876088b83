use std::sync::{Arc, Barrier, Mutex, MutexGuard};
use types::*;

/// Element types that can travel through a reduction.
pub trait MPIDataType: Copy + Default + Send + 'static {
    fn to_f64_parts(v: &[Self]) -> Vec<f64>;
    fn from_f64_parts(p: &[f64], v: &mut [Self]);
}

impl MPIDataType for f64 {
    fn to_f64_parts(v: &[Self]) -> Vec<f64> {
        v.to_vec()
    }

    fn from_f64_parts(p: &[f64], v: &mut [Self]) {
        v.copy_from_slice(p);
    }
}

impl MPIDataType for c64 {
    fn to_f64_parts(v: &[Self]) -> Vec<f64> {
        v.iter().flat_map(|z| [z.re, z.im]).collect()
    }

    fn from_f64_parts(p: &[f64], v: &mut [Self]) {
        for (z, ri) in v.iter_mut().zip(p.chunks_exact(2)) {
            *z = c64::new(ri[0], ri[1]);
        }
    }
}

impl MPIDataType for i32 {
    fn to_f64_parts(v: &[Self]) -> Vec<f64> {
        v.iter().map(|&x| x as f64).collect()
    }

    fn from_f64_parts(p: &[f64], v: &mut [Self]) {
        for (x, y) in v.iter_mut().zip(p.iter()) {
            *x = y.round() as i32;
        }
    }
}

/// Group of ranks exchanging data through collective operations.
pub trait Communicator: Send + Sync {
    fn rank(&self) -> usize;

    fn size(&self) -> usize;

    fn barrier(&self);

    /// In-place element-wise sum over all ranks.
    fn allreduce_sum_f64(&self, buf: &mut [f64]);

    /// Collective split: ranks passing the same `color` form a new communicator,
    /// ranked by `key` and then by their rank in `self`.
    fn split(&self, color: usize, key: usize) -> Arc<dyn Communicator>;

    fn is_root(&self) -> bool {
        self.rank() == 0
    }
}

pub fn allreduce_sum<T: MPIDataType>(comm: &dyn Communicator, buf: &mut [T]) {
    if comm.size() == 1 || buf.is_empty() {
        return;
    }

    let mut parts = T::to_f64_parts(buf);
    comm.allreduce_sum_f64(&mut parts);
    T::from_f64_parts(&parts, buf);
}

pub fn allreduce_sum_scalar<T: MPIDataType>(comm: &dyn Communicator, v: T) -> T {
    let mut buf = [v];
    allreduce_sum(comm, &mut buf);
    buf[0]
}

/// Single-rank communicator.
#[derive(Debug, Default, Clone, Copy)]
pub struct SerialComm;

impl Communicator for SerialComm {
    fn rank(&self) -> usize {
        0
    }

    fn size(&self) -> usize {
        1
    }

    fn barrier(&self) {}

    fn allreduce_sum_f64(&self, _buf: &mut [f64]) {}

    fn split(&self, _color: usize, _key: usize) -> Arc<dyn Communicator> {
        Arc::new(SerialComm)
    }
}

struct SharedState {
    barrier: Barrier,
    slots: Mutex<Vec<Vec<f64>>>,
    // (color, key) of every rank during a split
    split_slots: Mutex<Vec<(usize, usize)>>,
    // state of the new groups, stored at the slot of each group's lowest rank
    groups: Mutex<Vec<Option<Arc<SharedState>>>>,
}

impl SharedState {
    fn new(size: usize) -> SharedState {
        SharedState {
            barrier: Barrier::new(size),
            slots: Mutex::new(vec![Vec::new(); size]),
            split_slots: Mutex::new(vec![(0, 0); size]),
            groups: Mutex::new(vec![None; size]),
        }
    }
}

/// Ranks living as threads of one process.
///
/// Contributions are summed in rank order, so results do not depend on thread timing.
#[derive(Clone)]
pub struct ThreadComm {
    rank: usize,
    size: usize,
    shared: Arc<SharedState>,
}

impl ThreadComm {
    /// One communicator handle per rank, to be moved into its thread.
    pub fn world(size: usize) -> Vec<ThreadComm> {
        assert!(size > 0);

        let shared = Arc::new(SharedState::new(size));

        (0..size)
            .map(|rank| ThreadComm {
                rank,
                size,
                shared: shared.clone(),
            })
            .collect()
    }
}

impl Communicator for ThreadComm {
    fn rank(&self) -> usize {
        self.rank
    }

    fn size(&self) -> usize {
        self.size
    }

    fn barrier(&self) {
        self.shared.barrier.wait();
    }

    fn allreduce_sum_f64(&self, buf: &mut [f64]) {
        {
            let mut slots = lock(&self.shared.slots);
            slots[self.rank] = buf.to_vec();
        }

        self.shared.barrier.wait();

        {
            let slots = lock(&self.shared.slots);

            buf.iter_mut().for_each(|v| *v = 0.0);

            for s in slots.iter() {
                assert_eq!(s.len(), buf.len(), "allreduce with mismatched buffer lengths");

                for (d, v) in buf.iter_mut().zip(s.iter()) {
                    *d += *v;
                }
            }
        }

        // nobody overwrites a slot before every rank has read it
        self.shared.barrier.wait();
    }

    fn split(&self, color: usize, key: usize) -> Arc<dyn Communicator> {
        lock(&self.shared.split_slots)[self.rank] = (color, key);

        self.shared.barrier.wait();

        let mut members: Vec<(usize, usize)> = lock(&self.shared.split_slots)
            .iter()
            .enumerate()
            .filter(|(_, slot)| slot.0 == color)
            .map(|(r, slot)| (slot.1, r))
            .collect();
        members.sort_unstable();

        let leader = members.iter().map(|&(_, r)| r).min().unwrap_or(self.rank);
        let rank = members.iter().position(|&(_, r)| r == self.rank).unwrap_or(0);
        let size = members.len();

        if self.rank == leader {
            lock(&self.shared.groups)[leader] = Some(Arc::new(SharedState::new(size)));
        }

        self.shared.barrier.wait();

        let shared = match lock(&self.shared.groups)[leader].clone() {
            Some(shared) => shared,
            None => unreachable!("group of rank {} was not published", leader),
        };

        // the next split may reuse the slots only after everybody picked up its group
        self.shared.barrier.wait();

        Arc::new(ThreadComm { rank, size, shared })
    }
}

fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    match m.lock() {
        Ok(g) => g,
        Err(poisoned) => poisoned.into_inner(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_serial_comm() {
        let comm = SerialComm;
        let mut v = vec![c64::new(1.0, 2.0)];

        allreduce_sum(&comm, &mut v);

        assert_eq!(comm.size(), 1);
        assert!(comm.is_root());
        assert_eq!(v[0], c64::new(1.0, 2.0));
    }

    #[test]
    fn test_thread_comm_allreduce() {
        let comms = ThreadComm::world(4);

        let results: Vec<(Vec<c64>, i32)> = std::thread::scope(|s| {
            let handles: Vec<_> = comms
                .iter()
                .map(|comm| {
                    s.spawn(move || {
                        let r = comm.rank() as f64;
                        let mut v = vec![c64::new(r, -r), c64::new(1.0, 0.0)];
                        allreduce_sum(comm, &mut v);

                        let n = allreduce_sum_scalar(comm, 1i32);

                        (v, n)
                    })
                })
                .collect();

            handles.into_iter().map(|h| h.join().unwrap()).collect()
        });

        for (v, n) in results {
            assert_eq!(v[0], c64::new(6.0, -6.0));
            assert_eq!(v[1], c64::new(4.0, 0.0));
            assert_eq!(n, 4);
        }
    }

    #[test]
    fn test_serial_split() {
        let sub = SerialComm.split(3, 7);

        assert_eq!(sub.size(), 1);
        assert_eq!(sub.rank(), 0);
    }

    #[test]
    fn test_thread_comm_split() {
        let comms = ThreadComm::world(6);

        // groups {0, 2, 4} and {1, 3, 5}; keys reverse the order inside each group
        let results: Vec<(usize, usize, usize, f64, f64)> = std::thread::scope(|s| {
            let handles: Vec<_> = comms
                .iter()
                .map(|comm| {
                    s.spawn(move || {
                        let w = comm.rank();
                        let sub = comm.split(w % 2, 10 - w);

                        let sum = allreduce_sum_scalar(sub.as_ref(), w as f64);

                        // the parent still works after the split
                        let total = allreduce_sum_scalar(comm, 1.0);

                        (w, sub.rank(), sub.size(), sum, total)
                    })
                })
                .collect();

            handles.into_iter().map(|h| h.join().unwrap()).collect()
        });

        for (w, rank, size, sum, total) in results {
            assert_eq!(size, 3);
            assert_eq!(rank, 2 - w / 2);

            let expected = if w % 2 == 0 { 6.0 } else { 9.0 };
            assert_eq!(sum, expected);
            assert_eq!(total, 6.0);
        }
    }
}

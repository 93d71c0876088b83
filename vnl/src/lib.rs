mod beta_projectors;
pub use beta_projectors::*;

mod non_local_operator;
pub use non_local_operator::*;

mod augmentation;
pub use augmentation::*;

const PARALLEL_MIN_LEN: usize = 8192;

#[inline]
fn use_parallel_for_len(len: usize) -> bool {
    len >= PARALLEL_MIN_LEN && rayon::current_num_threads() > 1
}

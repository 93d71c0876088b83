use itertools::multizip;
use types::c64;
use vector3::*;

pub fn get_quant_num_m(l: usize) -> Vec<i32> {
    (0..2 * l + 1).map(|im| im as i32 - l as i32).collect()
}

/// Combined (l, m) index, m in -l..=l.
#[inline]
pub fn lm(l: usize, m: i32) -> usize {
    ((l * l + l) as i32 + m) as usize
}

#[inline]
pub fn lmmax(lmax: usize) -> usize {
    (lmax + 1) * (lmax + 1)
}

/// Angular momentum of a combined lm index.
pub fn l_by_lm(lmax: usize) -> Vec<usize> {
    let mut v = Vec::with_capacity(lmmax(lmax));

    for l in 0..=lmax {
        for _ in 0..2 * l + 1 {
            v.push(l);
        }
    }

    v
}

pub fn get_slice_up_dn<T>(v: &[T]) -> (&[T], &[T]) {
    v.split_at(v.len() / 2)
}

pub fn get_mut_slice_up_dn<T>(v: &mut [T]) -> (&mut [T], &mut [T]) {
    let n = v.len() / 2;

    v.split_at_mut(n)
}

pub fn add_and_scale(inp: &[c64], out: &mut [c64], factor: f64) {
    assert_eq!(inp.len(), out.len());

    for (x, y) in multizip((inp.iter(), out.iter_mut())) {
        *y += *x * factor;
    }
}

pub fn add_and_zscale(inp: &[c64], out: &mut [c64], factor: c64) {
    assert_eq!(inp.len(), out.len());

    for (x, y) in multizip((inp.iter(), out.iter_mut())) {
        *y += *x * factor;
    }
}

pub fn dot_product_v3i32_v3f64(g: Vector3i32, r: Vector3f64) -> f64 {
    f64::from(g.x) * r.x + f64::from(g.y) * r.y + f64::from(g.z) * r.z
}

pub fn zdot_product(u: &[c64], v: &[c64]) -> c64 {
    assert_eq!(u.len(), v.len());

    multizip((u.iter(), v.iter())).map(|(x, y)| x.conj() * (*y)).sum()
}

pub fn ddot_product(u: &[f64], v: &[f64]) -> f64 {
    assert_eq!(u.len(), v.len());

    multizip((u.iter(), v.iter())).map(|(x, y)| x * y).sum()
}

pub fn argsort<T: PartialOrd>(v: &[T]) -> Vec<usize> {
    let mut idx = (0..v.len()).collect::<Vec<_>>();

    idx.sort_by(|&i, &j| v[i].partial_cmp(&v[j]).unwrap_or(std::cmp::Ordering::Equal));

    idx
}

/// N even, 8
///
/// n : 0 1 2 3 4 5 6 7
///
/// i : 0 1 2 3 4 -3 -2 -1
///
/// N Odd, 7
///
/// n : 0 1 2 3 4 5 6
///
/// i : 0 1 2 3 -3 -2 -1
pub fn fft_left_end(n: usize) -> i32 {
    let nn = n as i32;

    if n % 2 == 0 {
        -(nn - 2) / 2
    } else {
        -(nn - 1) / 2
    }
}

pub fn fft_right_end(n: usize) -> i32 {
    let nn = n as i32;

    if n % 2 == 0 {
        nn / 2
    } else {
        (nn - 1) / 2
    }
}

pub fn fft_i2n(i: i32, ntot: usize) -> usize {
    if i < 0 {
        (i + ntot as i32) as usize
    } else {
        i as usize
    }
}

pub fn fft_n2i(n: usize, ntot: usize) -> i32 {
    if n > ntot / 2 {
        n as i32 - ntot as i32
    } else {
        n as i32
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fft_index_round_trip() {
        for &ntot in [7usize, 8].iter() {
            for n in 0..ntot {
                let i = fft_n2i(n, ntot);
                assert!(i >= fft_left_end(ntot) && i <= fft_right_end(ntot));
                assert_eq!(fft_i2n(i, ntot), n);
            }
        }
    }

    #[test]
    fn test_lm_index() {
        assert_eq!(lm(0, 0), 0);
        assert_eq!(lm(1, -1), 1);
        assert_eq!(lm(1, 1), 3);
        assert_eq!(lm(2, -2), 4);
        assert_eq!(lmmax(3), 16);
        assert_eq!(l_by_lm(2), vec![0, 1, 1, 1, 2, 2, 2, 2, 2]);
    }

    #[test]
    fn test_argsort() {
        assert_eq!(argsort(&[3.0, 1.0, 2.0]), vec![1, 2, 0]);
    }
}

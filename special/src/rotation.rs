use crate::{real_ylm_all, SphereQuadrature};
use matrix::Matrix;
use utility::{l_by_lm, lmmax};
use vector3::Vector3f64;

/// Representation of a Cartesian (proper or improper) rotation in the real spherical harmonics basis.
///
/// `f(R^-1 r) = sum_lm c'_lm R_lm(r)` with `c' = D c` for `f(r) = sum_lm c_lm R_lm(r)`.
pub fn rotation_matrix_ylm(lmax: usize, rot: &[[f64; 3]; 3]) -> Matrix<f64> {
    let n = lmmax(lmax);
    let lofs = l_by_lm(lmax);

    let quad = SphereQuadrature::new(2 * lmax);

    let mut d = Matrix::<f64>::new(n, n);

    for ip in 0..quad.len() {
        let (theta, phi, w) = quad.point(ip);

        let r = Vector3f64::new(theta.sin() * phi.cos(), theta.sin() * phi.sin(), theta.cos());

        // R^-1 r = R^T r
        let rinv = Vector3f64::new(
            rot[0][0] * r.x + rot[1][0] * r.y + rot[2][0] * r.z,
            rot[0][1] * r.x + rot[1][1] * r.y + rot[2][1] * r.z,
            rot[0][2] * r.x + rot[1][2] * r.y + rot[2][2] * r.z,
        );

        let ylm = real_ylm_all(lmax, theta, phi);
        let ylm_rot = crate::real_ylm_all_of_vector(lmax, rinv);

        for j in 0..n {
            for i in 0..n {
                if lofs[i] == lofs[j] {
                    d[[i, j]] += w * ylm[i] * ylm_rot[j];
                }
            }
        }
    }

    for v in d.as_mut_slice().iter_mut() {
        if v.abs() < 1.0E-14 {
            *v = 0.0;
        }
    }

    d
}

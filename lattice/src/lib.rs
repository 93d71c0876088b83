use dwconsts::*;
use matrix::*;
use vector3::*;

use std::fmt;

/// Three lattice vectors stored as the columns of a 3x3 matrix.
#[derive(Debug, Default, Clone)]
pub struct Lattice {
    data: Matrix<f64>,
}

impl Lattice {
    pub fn new(a: Vector3f64, b: Vector3f64, c: Vector3f64) -> Lattice {
        let mut data = Matrix::<f64>::new(3, 3);

        data.set_col(0, &a.to_array());
        data.set_col(1, &b.to_array());
        data.set_col(2, &c.to_array());

        Lattice { data }
    }

    pub fn cubic(a: f64) -> Lattice {
        Lattice::new(
            Vector3f64::new(a, 0.0, 0.0),
            Vector3f64::new(0.0, a, 0.0),
            Vector3f64::new(0.0, 0.0, a),
        )
    }

    pub fn as_matrix(&self) -> &Matrix<f64> {
        &self.data
    }

    // ( a x b ) . c
    pub fn volume(&self) -> f64 {
        let a = self.get_vector_a();
        let b = self.get_vector_b();
        let c = self.get_vector_c();

        a.cross_product(&b).dot_product(&c)
    }

    // ra = 2 x PI x (b x c) / volume
    // rb = 2 x PI x (c x a) / volume
    // rc = 2 x PI x (a x b) / volume
    pub fn reciprocal(&self) -> Lattice {
        let factor = TWOPI / self.volume();

        let a = self.get_vector_a();
        let b = self.get_vector_b();
        let c = self.get_vector_c();

        Lattice::new(
            b.cross_product(&c) * factor,
            c.cross_product(&a) * factor,
            a.cross_product(&b) * factor,
        )
    }

    pub fn get_vector_a(&self) -> Vector3f64 {
        Vector3f64::from_slice(self.data.get_col(0))
    }

    pub fn get_vector_b(&self) -> Vector3f64 {
        Vector3f64::from_slice(self.data.get_col(1))
    }

    pub fn get_vector_c(&self) -> Vector3f64 {
        Vector3f64::from_slice(self.data.get_col(2))
    }

    pub fn frac_to_cart(&self, pos_f: Vector3f64) -> Vector3f64 {
        self.get_vector_a() * pos_f.x + self.get_vector_b() * pos_f.y + self.get_vector_c() * pos_f.z
    }

    /// Cartesian vector of integer lattice coordinates.
    pub fn int_to_cart(&self, n: Vector3i32) -> Vector3f64 {
        self.frac_to_cart(n.to_f64())
    }

    pub fn cart_to_frac(&self, pos_c: Vector3f64) -> Vector3f64 {
        // rows of the inverse are the reciprocal vectors / 2pi
        let b = self.reciprocal();

        Vector3f64::new(
            b.get_vector_a().dot_product(&pos_c),
            b.get_vector_b().dot_product(&pos_c),
            b.get_vector_c().dot_product(&pos_c),
        ) / TWOPI
    }
}

impl fmt::Display for Lattice {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let a = self.get_vector_a();
        let b = self.get_vector_b();
        let c = self.get_vector_c();

        write!(
            f,
            "{}\n{:25.16}\t{:25.16}\t{:25.16}\n{:25.16}\t{:25.16}\t{:25.16}\n{:25.16}\t{:25.16}\t{:25.16}",
            "Lattice", a.x, a.y, a.z, b.x, b.y, b.z, c.x, c.y, c.z
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lattice_reciprocal() {
        let latt = Lattice::new(
            Vector3f64::new(1.0, 0.1, 0.0),
            Vector3f64::new(0.0, 1.0, 0.2),
            Vector3f64::new(0.0, 0.3, 1.0),
        );

        let blatt = latt.reciprocal();
        let prod = latt.as_matrix().transpose().dot(blatt.as_matrix());

        for i in 0..3 {
            for j in 0..3 {
                let expected = if i == j { TWOPI } else { 0.0 };
                assert!((prod[[i, j]] - expected).abs() < 1.0E-12);
            }
        }

        assert!((latt.volume() * blatt.volume() - TWOPI.powi(3)).abs() < 1.0E-10);
    }

    #[test]
    fn test_lattice_frac_cart_round_trip() {
        let latt = Lattice::new(
            Vector3f64::new(1.0, 0.1, 0.0),
            Vector3f64::new(0.0, 1.0, 0.2),
            Vector3f64::new(0.0, 0.3, 1.0),
        );

        let pos_f = Vector3f64::new(0.2, 0.3, 0.4);
        let pos_c = latt.frac_to_cart(pos_f);
        let back = latt.cart_to_frac(pos_c);

        assert!((back - pos_f).norm2() < 1.0E-12);
        assert!((latt.int_to_cart(Vector3i32::new(1, 0, 0)) - latt.get_vector_a()).norm2() < 1.0E-14);
    }
}

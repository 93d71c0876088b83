use dwconsts::*;
use lattice::Lattice;
use matrix::Matrix;
use tracing::info;
use types::c64;
use vector3::*;

/// Magnetic space-group operations as seen by the density and Hubbard code.
pub trait MagneticSymmetry: Send + Sync {
    fn num_sym_ops(&self) -> usize;

    /// Cartesian rotation, possibly improper.
    fn get_rotation(&self, isym: usize) -> &[[f64; 3]; 3];

    /// SU(2) matrix acting on spinors.
    fn get_spin_rotation(&self, isym: usize) -> &[[c64; 2]; 2];

    /// Cartesian rotation acting on magnetization vectors.
    fn get_spin_rotation_cart(&self, isym: usize) -> &[[f64; 3]; 3];

    fn is_proper(&self, isym: usize) -> bool;

    /// Atom onto which `ia` is mapped by operation `isym`.
    fn sym_table(&self, ia: usize, isym: usize) -> usize;

    fn display(&self);
}

#[derive(Debug, Clone)]
pub struct SymmetryOperation {
    rotation_frac: [[i32; 3]; 3],
    translation: [f64; 3],
    rotation: [[f64; 3]; 3],
    spin_rotation_cart: [[f64; 3]; 3],
    spin_rotation: [[c64; 2]; 2],
    proper: bool,
}

impl SymmetryOperation {
    pub fn get_rotation_frac(&self) -> &[[i32; 3]; 3] {
        &self.rotation_frac
    }

    pub fn get_translation(&self) -> &[f64; 3] {
        &self.translation
    }
}

#[derive(Debug, Clone)]
pub struct MagneticSymmetryOps {
    ops: Vec<SymmetryOperation>,
    // sym_table[ia][isym]
    sym_table: Vec<Vec<usize>>,
}

impl MagneticSymmetryOps {
    pub fn identity(natoms: usize) -> MagneticSymmetryOps {
        let one = [[1.0, 0.0, 0.0], [0.0, 1.0, 0.0], [0.0, 0.0, 1.0]];

        let op = SymmetryOperation {
            rotation_frac: [[1, 0, 0], [0, 1, 0], [0, 0, 1]],
            translation: [0.0; 3],
            rotation: one,
            spin_rotation_cart: one,
            spin_rotation: su2_from_rotation(&one),
            proper: true,
        };

        MagneticSymmetryOps {
            ops: vec![op],
            sym_table: (0..natoms).map(|ia| vec![ia]).collect(),
        }
    }

    /// Operations {R|t} in fractional coordinates.
    ///
    /// `spin_rotations` overrides the default spin part (the proper part of R),
    /// e.g. for operations combined with time reversal.
    pub fn new(
        latt: &Lattice,
        positions: &[Vector3f64],
        types: &[usize],
        rotations: &[[[i32; 3]; 3]],
        translations: &[[f64; 3]],
        spin_rotations: Option<&[[[f64; 3]; 3]]>,
        symprec: f64,
    ) -> MagneticSymmetryOps {
        assert_eq!(rotations.len(), translations.len());
        assert_eq!(positions.len(), types.len());

        let a = latt.as_matrix();
        let mut a_inv = a.clone();
        a_inv.inv();

        let mut ops = Vec::with_capacity(rotations.len());

        for (isym, (rf, t)) in rotations.iter().zip(translations.iter()).enumerate() {
            // R_cart = A R_frac A^-1
            let mut rm = Matrix::<f64>::new(3, 3);
            for i in 0..3 {
                for j in 0..3 {
                    rm[[i, j]] = rf[i][j] as f64;
                }
            }

            let mut tmp = Matrix::<f64>::new(3, 3);
            let mut rc = Matrix::<f64>::new(3, 3);
            Matrix::<f64>::gemm(1.0, a, false, &rm, false, 0.0, &mut tmp);
            Matrix::<f64>::gemm(1.0, &tmp, false, &a_inv, false, 0.0, &mut rc);

            let mut rotation = [[0.0; 3]; 3];
            for i in 0..3 {
                for j in 0..3 {
                    rotation[i][j] = rc[[i, j]];
                }
            }

            let det = det3(&rotation);
            let proper = det > 0.0;

            let spin_rotation_cart = match spin_rotations {
                Some(s) => s[isym],
                None => scale3(&rotation, det.signum()),
            };

            ops.push(SymmetryOperation {
                rotation_frac: *rf,
                translation: *t,
                rotation,
                spin_rotation_cart,
                spin_rotation: su2_from_rotation(&spin_rotation_cart),
                proper,
            });
        }

        let sym_table = (0..positions.len())
            .map(|ia| {
                ops.iter()
                    .map(|op| search_for_matching_atom(&op.rotation_frac, &op.translation, positions, types, ia, symprec))
                    .collect()
            })
            .collect();

        MagneticSymmetryOps { ops, sym_table }
    }

    pub fn get_operation(&self, isym: usize) -> &SymmetryOperation {
        &self.ops[isym]
    }
}

impl MagneticSymmetry for MagneticSymmetryOps {
    fn num_sym_ops(&self) -> usize {
        self.ops.len()
    }

    fn get_rotation(&self, isym: usize) -> &[[f64; 3]; 3] {
        &self.ops[isym].rotation
    }

    fn get_spin_rotation(&self, isym: usize) -> &[[c64; 2]; 2] {
        &self.ops[isym].spin_rotation
    }

    fn get_spin_rotation_cart(&self, isym: usize) -> &[[f64; 3]; 3] {
        &self.ops[isym].spin_rotation_cart
    }

    fn is_proper(&self, isym: usize) -> bool {
        self.ops[isym].proper
    }

    fn sym_table(&self, ia: usize, isym: usize) -> usize {
        self.sym_table[ia][isym]
    }

    fn display(&self) {
        info!("magnetic symmetry: {} operations", self.ops.len());

        for (i, op) in self.ops.iter().enumerate() {
            info!("symmetry operation {}", i);
            info!("rotations    : {:?}", op.rotation_frac);
            info!("translations : {:?}", op.translation);
            info!("proper       : {}", op.proper);
        }
    }
}

/// U = exp(-i theta/2 n.sigma) for the proper rotation R (angle theta about n).
pub fn su2_from_rotation(rot: &[[f64; 3]; 3]) -> [[c64; 2]; 2] {
    let tr = rot[0][0] + rot[1][1] + rot[2][2];
    let cos_theta = ((tr - 1.0) / 2.0).clamp(-1.0, 1.0);
    let theta = cos_theta.acos();

    let mut n = [0.0, 0.0, 1.0];

    if theta.sin() > 1.0E-6 {
        let s = 2.0 * theta.sin();
        n = [
            (rot[2][1] - rot[1][2]) / s,
            (rot[0][2] - rot[2][0]) / s,
            (rot[1][0] - rot[0][1]) / s,
        ];
    } else if theta > 1.0 {
        // theta = pi: R = 2 n n^T - 1
        let k = (0..3)
            .max_by(|&a, &b| rot[a][a].total_cmp(&rot[b][b]))
            .unwrap_or(0);

        let nk = ((rot[k][k] + 1.0) / 2.0).max(0.0).sqrt();

        for j in 0..3 {
            n[j] = if j == k { nk } else { rot[j][k] / (2.0 * nk) };
        }
    }

    let c = (theta / 2.0).cos();
    let s = (theta / 2.0).sin();

    [
        [c64::new(c, -s * n[2]), c64::new(-s * n[1], -s * n[0])],
        [c64::new(s * n[1], -s * n[0]), c64::new(c, s * n[2])],
    ]
}

fn det3(m: &[[f64; 3]; 3]) -> f64 {
    m[0][0] * (m[1][1] * m[2][2] - m[1][2] * m[2][1]) - m[0][1] * (m[1][0] * m[2][2] - m[1][2] * m[2][0])
        + m[0][2] * (m[1][0] * m[2][1] - m[1][1] * m[2][0])
}

fn scale3(m: &[[f64; 3]; 3], f: f64) -> [[f64; 3]; 3] {
    let mut out = *m;

    for row in out.iter_mut() {
        for x in row.iter_mut() {
            *x *= f;
        }
    }

    out
}

fn search_for_matching_atom(
    rotation: &[[i32; 3]; 3],
    translation: &[f64; 3],
    positions: &[Vector3f64],
    types: &[usize],
    ia: usize,
    symprec: f64,
) -> usize {
    let p = positions[ia];

    let mapped = [
        rotation[0][0] as f64 * p.x + rotation[0][1] as f64 * p.y + rotation[0][2] as f64 * p.z + translation[0],
        rotation[1][0] as f64 * p.x + rotation[1][1] as f64 * p.y + rotation[1][2] as f64 * p.z + translation[1],
        rotation[2][0] as f64 * p.x + rotation[2][1] as f64 * p.y + rotation[2][2] as f64 * p.z + translation[2],
    ];

    for (ja, target) in positions.iter().enumerate() {
        if types[ja] != types[ia] {
            continue;
        }

        let t = target.to_array();

        if (0..3).all(|d| wrap_centered(mapped[d] - t[d]).abs() < symprec) {
            return ja;
        }
    }

    ia
}

fn wrap_centered(x: f64) -> f64 {
    x - x.round()
}

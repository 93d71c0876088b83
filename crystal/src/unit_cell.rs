use crate::{AtomType, CrystalError};
use dwconsts::*;
use itertools::Itertools;
use lattice::Lattice;
use matrix::Matrix;
use tracing::info;
use types::c64;
use vector3::*;

use std::{
    fs::File,
    io::{BufRead, BufReader},
};

#[derive(Debug, Clone)]
pub struct Atom {
    type_id: usize,
    position: Vector3f64,
    vector_field: Vector3f64,
    d_mtrx: Vec<Matrix<c64>>,
}

impl Atom {
    pub fn get_type_id(&self) -> usize {
        self.type_id
    }

    /// Fractional coordinates.
    pub fn get_position(&self) -> Vector3f64 {
        self.position
    }

    /// Starting magnetic moment (x, y, z) in Bohr magnetons.
    pub fn get_vector_field(&self) -> Vector3f64 {
        self.vector_field
    }

    pub fn set_vector_field(&mut self, v: Vector3f64) {
        self.vector_field = v;
    }

    /// D matrix of channel `j`: 0 scalar, 1 z, 2 x, 3 y.
    pub fn get_d_mtrx(&self, j: usize) -> &Matrix<c64> {
        &self.d_mtrx[j]
    }

    pub fn set_d_mtrx(&mut self, j: usize, d: Matrix<c64>) {
        assert_eq!(d.nrow(), self.d_mtrx[j].nrow());
        assert_eq!(d.ncol(), self.d_mtrx[j].ncol());

        self.d_mtrx[j] = d;
    }
}

// Coordinates:
// - lattice vectors stored in Bohr
// - atomic positions stored in fractional coordinates
#[derive(Debug, Clone, Default)]
pub struct UnitCell {
    latt: Lattice,
    atom_types: Vec<AtomType>,
    atoms: Vec<Atom>,
    atoms_by_type: Vec<Vec<usize>>,
}

impl UnitCell {
    pub fn new(latt: Lattice, atom_types: Vec<AtomType>) -> UnitCell {
        let ntypes = atom_types.len();

        UnitCell {
            latt,
            atom_types,
            atoms: Vec::new(),
            atoms_by_type: vec![Vec::new(); ntypes],
        }
    }

    pub fn add_atom(&mut self, symbol: &str, position: Vector3f64, vector_field: Vector3f64) -> Result<usize, CrystalError> {
        let type_id = self
            .atom_types
            .iter()
            .position(|t| t.get_symbol() == symbol)
            .ok_or_else(|| CrystalError::UnknownAtomType(symbol.to_string()))?;

        let atype = &self.atom_types[type_id];
        let nbf = atype.nbf();

        // bare D matrix, diagonal in lm
        let mut d0 = Matrix::<c64>::new(nbf, nbf);
        for xi2 in 0..nbf {
            let b2 = atype.indexb().get(xi2);
            for xi1 in 0..nbf {
                let b1 = atype.indexb().get(xi1);
                if b1.lm == b2.lm {
                    d0[[xi1, xi2]] = c64::new(atype.get_d_ion()[[b1.idxrf, b2.idxrf]], 0.0);
                }
            }
        }

        let mut d_mtrx = vec![Matrix::<c64>::new(nbf, nbf); 4];
        d_mtrx[0] = d0;

        let ia = self.atoms.len();

        self.atoms.push(Atom {
            type_id,
            position,
            vector_field,
            d_mtrx,
        });

        self.atoms_by_type[type_id].push(ia);

        Ok(ia)
    }

    /// Read lattice and atoms; the atom types must already be known.
    ///
    /// line 1: scale_a scale_b scale_c (Angstrom)
    /// line 2-4: lattice vectors
    /// remaining lines: symbol x y z [mx my mz] with fractional positions
    pub fn read_file(inpfile: &str, atom_types: Vec<AtomType>) -> Result<UnitCell, CrystalError> {
        let file = File::open(inpfile).map_err(|source| CrystalError::Io {
            path: inpfile.to_string(),
            source,
        })?;

        let mut lines = Vec::new();
        for line in BufReader::new(file).lines() {
            lines.push(line.map_err(|source| CrystalError::Io {
                path: inpfile.to_string(),
                source,
            })?);
        }

        Self::parse(&lines, atom_types)
    }

    pub fn parse(lines: &[String], atom_types: Vec<AtomType>) -> Result<UnitCell, CrystalError> {
        let numbers = |iline: usize, s: &[&str], n: usize| -> Result<Vec<f64>, CrystalError> {
            if s.len() < n {
                return Err(CrystalError::Parse {
                    line: iline + 1,
                    msg: format!("expected {} numbers", n),
                });
            }

            s[..n]
                .iter()
                .map(|x| {
                    x.parse::<f64>().map_err(|e| CrystalError::Parse {
                        line: iline + 1,
                        msg: format!("'{}': {}", x, e),
                    })
                })
                .collect()
        };

        let mut scale = vec![1.0; 3];
        let mut vecs = [Vector3f64::zeros(); 3];
        let mut atoms = Vec::new();

        for (i, line) in lines.iter().enumerate() {
            let line = line.split('#').next().unwrap_or("");
            let s: Vec<&str> = line.split_whitespace().collect();

            match i {
                0 => {
                    scale = numbers(i, &s, 3)?;
                }

                1..=3 => {
                    let v = numbers(i, &s, 3)?;
                    let f = scale[i - 1] * ANG_TO_BOHR;
                    vecs[i - 1] = Vector3f64::new(v[0] * f, v[1] * f, v[2] * f);
                }

                _ => {
                    if s.is_empty() {
                        continue;
                    }

                    let pos = numbers(i, &s[1..], 3)?;
                    let mag = if s.len() >= 7 {
                        numbers(i, &s[4..], 3)?
                    } else {
                        vec![0.0; 3]
                    };

                    atoms.push((
                        s[0].to_string(),
                        Vector3f64::new(pos[0], pos[1], pos[2]),
                        Vector3f64::new(mag[0], mag[1], mag[2]),
                    ));
                }
            }
        }

        if lines.len() < 4 {
            return Err(CrystalError::Parse {
                line: lines.len(),
                msg: "lattice vectors are missing".to_string(),
            });
        }

        let mut cell = UnitCell::new(Lattice::new(vecs[0], vecs[1], vecs[2]), atom_types);

        for (symbol, pos, mag) in atoms.into_iter() {
            cell.add_atom(&symbol, pos, mag)?;
        }

        Ok(cell)
    }

    pub fn get_latt(&self) -> &Lattice {
        &self.latt
    }

    pub fn omega(&self) -> f64 {
        self.latt.volume()
    }

    pub fn num_atoms(&self) -> usize {
        self.atoms.len()
    }

    pub fn num_atom_types(&self) -> usize {
        self.atom_types.len()
    }

    pub fn atom(&self, ia: usize) -> &Atom {
        &self.atoms[ia]
    }

    pub fn atom_mut(&mut self, ia: usize) -> &mut Atom {
        &mut self.atoms[ia]
    }

    pub fn atom_type(&self, iat: usize) -> &AtomType {
        &self.atom_types[iat]
    }

    pub fn atom_type_of(&self, ia: usize) -> &AtomType {
        &self.atom_types[self.atoms[ia].type_id]
    }

    pub fn atom_types(&self) -> &[AtomType] {
        &self.atom_types
    }

    pub fn atoms_of_type(&self, iat: usize) -> &[usize] {
        &self.atoms_by_type[iat]
    }

    pub fn get_atom_positions(&self) -> Vec<Vector3f64> {
        self.atoms.iter().map(|a| a.position).collect()
    }

    pub fn get_atom_positions_of_type(&self, iat: usize) -> Vec<Vector3f64> {
        self.atoms_by_type[iat].iter().map(|&ia| self.atoms[ia].position).collect()
    }

    pub fn get_atom_position_cart(&self, ia: usize) -> Vector3f64 {
        self.latt.frac_to_cart(self.atoms[ia].position)
    }

    pub fn num_valence_electrons(&self) -> f64 {
        self.atoms.iter().map(|a| self.atom_types[a.type_id].get_zion()).sum()
    }

    pub fn num_core_electrons(&self) -> f64 {
        self.atoms
            .iter()
            .map(|a| {
                let t = &self.atom_types[a.type_id];
                t.get_zn() - t.get_zion()
            })
            .sum()
    }

    pub fn max_nbf(&self) -> usize {
        self.atom_types.iter().map(|t| t.nbf()).max().unwrap_or(0)
    }

    /// Any atom type carries augmentation charges.
    pub fn augment(&self) -> bool {
        self.atom_types.iter().any(|t| t.augment())
    }

    pub fn hubbard_correction(&self) -> bool {
        self.atom_types.iter().any(|t| t.hubbard_correction())
    }

    /// Atoms whose type is a PAW data set, in atom order.
    pub fn paw_atoms(&self) -> Vec<usize> {
        (0..self.atoms.len())
            .filter(|&ia| self.atom_type_of(ia).is_paw())
            .collect()
    }

    pub fn display(&self) {
        info!("{:-^88}", " unit cell ");

        for (name, v) in [
            ("a", self.latt.get_vector_a()),
            ("b", self.latt.get_vector_b()),
            ("c", self.latt.get_vector_c()),
        ]
        .iter()
        {
            info!(
                "{} = {:20.12}  {:20.12}  {:20.12}",
                name,
                v.x * BOHR_TO_ANG,
                v.y * BOHR_TO_ANG,
                v.z * BOHR_TO_ANG
            );
        }

        info!("natoms = {}  omega = {:.6} bohr^3", self.num_atoms(), self.omega());

        for (ia, atom) in self.atoms.iter().enumerate() {
            let p = atom.position;
            let v = atom.vector_field;

            info!(
                "{:<3} {:>4} : {:16.12}  {:16.12}  {:16.12}   m = ({:.3}, {:.3}, {:.3})",
                ia + 1,
                self.atom_types[atom.type_id].get_symbol(),
                p.x,
                p.y,
                p.z,
                v.x,
                v.y,
                v.z
            );
        }

        for (iat, t) in self.atom_types.iter().enumerate() {
            info!(
                "{} : [{}]",
                t.get_symbol(),
                self.atoms_by_type[iat].iter().map(|x| x + 1).join(", ")
            );
        }
    }
}

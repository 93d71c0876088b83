mod error;
pub use error::*;

mod radial_grid;
pub use radial_grid::*;

mod basis_index;
pub use basis_index::*;

mod atom_type;
pub use atom_type::*;

mod unit_cell;
pub use unit_cell::*;

#[cfg(test)]
mod tests;

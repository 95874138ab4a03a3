use std::ops::Range;

use crate::error::{MddfError, MddfResult};

/// Slot `k` of the selection (0-based position in `indices`) belongs to
/// molecule `k / natomspermol`; the coordinates a frame source provides for a
/// selection follow the same slot order.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Selection {
    pub indices: Vec<u32>,
    nmols: usize,
    natomspermol: usize,
}

impl Selection {
    pub fn new(indices: Vec<u32>, nmols: usize) -> MddfResult<Self> {
        if indices.is_empty() {
            return Err(MddfError::InvalidSelection("selection has no atoms".into()));
        }
        if nmols == 0 {
            return Err(MddfError::InvalidSelection(
                "selection must contain at least one molecule".into(),
            ));
        }
        if indices.len() % nmols != 0 {
            return Err(MddfError::InvalidSelection(format!(
                "{} atoms cannot be split into {nmols} molecules of equal size",
                indices.len()
            )));
        }
        let natomspermol = indices.len() / nmols;
        Ok(Self {
            indices,
            nmols,
            natomspermol,
        })
    }

    pub fn single_molecule(indices: Vec<u32>) -> MddfResult<Self> {
        Self::new(indices, 1)
    }

    pub fn with_atoms_per_molecule(indices: Vec<u32>, natomspermol: usize) -> MddfResult<Self> {
        if natomspermol == 0 || indices.len() % natomspermol != 0 {
            return Err(MddfError::InvalidSelection(format!(
                "{} atoms cannot be split into molecules of {natomspermol} atoms",
                indices.len()
            )));
        }
        let nmols = indices.len() / natomspermol;
        Self::new(indices, nmols)
    }

    pub fn natoms(&self) -> usize {
        self.indices.len()
    }

    pub fn nmols(&self) -> usize {
        self.nmols
    }

    pub fn natomspermol(&self) -> usize {
        self.natomspermol
    }

    pub fn molecule_range(&self, imol: usize) -> Range<usize> {
        let start = imol * self.natomspermol;
        start..start + self.natomspermol
    }

    pub fn molecule_of(&self, slot: usize) -> usize {
        slot / self.natomspermol
    }

    pub fn atom_in_molecule(&self, slot: usize) -> usize {
        slot % self.natomspermol
    }

    pub fn same_atoms(&self, other: &Selection) -> bool {
        self.nmols == other.nmols && self.indices == other.indices
    }

    pub fn max_index(&self) -> u32 {
        self.indices.iter().copied().max().unwrap_or(0)
    }
}

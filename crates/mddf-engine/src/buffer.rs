use mddf_core::error::{MddfError, MddfResult};
use mddf_core::frame::Box3;
use mddf_core::geom::Vec3;
use mddf_core::pbc::UnitCell;
use mddf_core::selection::Selection;
use mddf_io::FrameSource;
use rand::Rng;

use crate::mindist::MinimumDistance;

#[derive(Debug, Clone)]
pub struct WorkerBuffer {
    pub solute: Selection,
    pub solvent: Selection,
    pub autocorrelation: bool,
    pub cell: Option<UnitCell>,
    pub solute_coords: Vec<Vec3>,
    pub solvent_coords: Vec<Vec3>,
    /// Ideal-gas solvent configuration; the frame coordinates stay untouched.
    pub solvent_random: Vec<Vec3>,
    pub ref_solutes: Vec<usize>,
    pub md_list: Vec<MinimumDistance>,
    pub md_saved: Vec<MinimumDistance>,
    pub in_bulk: Vec<usize>,
}

impl WorkerBuffer {
    pub fn new(solute: &Selection, solvent: &Selection, n_random_samples: usize) -> Self {
        let nmols = solvent.nmols();
        Self {
            solute: solute.clone(),
            solvent: solvent.clone(),
            autocorrelation: solute.same_atoms(solvent),
            cell: None,
            solute_coords: vec![Vec3::default(); solute.natoms()],
            solvent_coords: vec![Vec3::default(); solvent.natoms()],
            solvent_random: vec![Vec3::default(); solvent.natoms()],
            ref_solutes: Vec::with_capacity(n_random_samples),
            md_list: Vec::with_capacity(nmols),
            md_saved: Vec::with_capacity(nmols),
            in_bulk: Vec::with_capacity(nmols),
        }
    }

    pub fn load_frame<S: FrameSource + ?Sized>(&mut self, source: &S) -> MddfResult<()> {
        self.load_coordinates(
            source.solute_coords(),
            source.solvent_coords(),
            source.box_dimensions(),
        )
    }

    pub fn load_coordinates(&mut self, solute: &[Vec3], solvent: &[Vec3], box_: Box3) -> MddfResult<()> {
        if solute.len() != self.solute_coords.len() || solvent.len() != self.solvent_coords.len() {
            return Err(MddfError::Mismatch(format!(
                "frame provides {} solute and {} solvent atoms, expected {} and {}",
                solute.len(),
                solvent.len(),
                self.solute_coords.len(),
                self.solvent_coords.len()
            )));
        }
        self.cell = Some(UnitCell::from_box(box_)?);
        self.solute_coords.copy_from_slice(solute);
        self.solvent_coords.copy_from_slice(solvent);
        Ok(())
    }

    pub fn cell(&self) -> MddfResult<UnitCell> {
        self.cell
            .ok_or_else(|| MddfError::Invalid("no frame loaded into worker buffer".into()))
    }

    pub fn draw_reference_solutes<R: Rng + ?Sized>(&mut self, n: usize, rng: &mut R) {
        let nmols = self.solute.nmols();
        self.ref_solutes.clear();
        self.ref_solutes
            .extend((0..n).map(|_| rng.gen_range(0..nmols)));
    }

    pub fn reference_count(&self, imol: usize) -> usize {
        self.ref_solutes.iter().filter(|&&s| s == imol).count()
    }

    /// Solvent molecule to leave out when processing solute molecule `imol`.
    pub fn excluded(&self, imol: usize) -> Option<usize> {
        self.autocorrelation.then_some(imol)
    }
}

//! Ideal-gas solvent configurations.

use mddf_core::geom::{Quaternion, Vec3};
use mddf_core::pbc::UnitCell;
use mddf_core::selection::Selection;
use rand::Rng;

/// Places a copy of molecule `src` at a random position and orientation.
pub fn random_move<R: Rng + ?Sized>(
    src: &[Vec3],
    reference_atom: usize,
    cell: &UnitCell,
    rng: &mut R,
    dst: &mut [Vec3],
) {
    let origin = src[reference_atom];
    let q = Quaternion::random(rng);
    let point = cell.random_point(rng);
    for (out, &atom) in dst.iter_mut().zip(src.iter()) {
        let local = cell.minimum_image(atom.sub(origin));
        *out = point.add(q.rotate_vec(local));
    }
}

/// Builds one complete random solvent configuration in `out`.
/// Every molecule slot receives a copy of a molecule drawn uniformly from
/// `bulk`, or from all solvent molecules when `bulk` is empty.
pub fn randomize_solvent<R: Rng + ?Sized>(
    solvent_coords: &[Vec3],
    bulk: &[usize],
    solvent: &Selection,
    reference_atom: usize,
    cell: &UnitCell,
    rng: &mut R,
    out: &mut [Vec3],
) {
    let nmols = solvent.nmols();
    for imol in 0..nmols {
        let source = if bulk.is_empty() {
            rng.gen_range(0..nmols)
        } else {
            bulk[rng.gen_range(0..bulk.len())]
        };
        random_move(
            &solvent_coords[solvent.molecule_range(source)],
            reference_atom,
            cell,
            rng,
            &mut out[solvent.molecule_range(imol)],
        );
    }
}

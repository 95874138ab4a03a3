use log::debug;
use mddf_core::error::MddfResult;
use mddf_core::neighbor::PeriodicIndex;
use mddf_core::options::Options;
use rand::Rng;

use crate::buffer::WorkerBuffer;
use crate::mindist::{inbulk, minimum_distances};
use crate::output::MddfOutput;
use crate::randomize::randomize_solvent;

/// Processes the frame currently loaded in `buffer` into `out`.
///
/// Every solute molecule is compared with all solvent molecules. Solute
/// molecules drawn as references additionally get one ideal-gas solvent
/// configuration per draw, generated from the solvent molecules found in
/// bulk around them. `index` is rebuilt over the frame solvent only for the
/// first solute molecule and after each randomization round.
pub fn mddf_frame<I: PeriodicIndex, R: Rng + ?Sized>(
    buffer: &mut WorkerBuffer,
    index: &mut I,
    out: &mut MddfOutput,
    options: &Options,
    rng: &mut R,
) -> MddfResult<()> {
    let cell = buffer.cell()?;
    let cutoff = options.effective_cutoff();
    let volume = cell.volume();
    let reference_atom = options.reference_atom;
    out.add_frame(volume);

    buffer.draw_reference_solutes(options.n_random_samples, rng);

    let n_eff = out.n_effective_solvent();
    let mut bulk_actual = 0usize;
    let mut bulk_random = 0usize;
    let mut update_index = true;
    for imol in 0..buffer.solute.nmols() {
        if update_index {
            index.rebuild(&buffer.solvent_coords, &cell, cutoff)?;
            update_index = false;
        }
        let excluded = buffer.excluded(imol);
        let solute_mol = buffer.solute.molecule_range(imol);
        minimum_distances(
            &*index,
            &buffer.solute_coords[solute_mol.clone()],
            &buffer.solvent,
            reference_atom,
            &mut buffer.md_list,
        );
        out.add_actual(&buffer.md_list, excluded);

        let nsamples = buffer.reference_count(imol);
        if nsamples == 0 {
            continue;
        }
        buffer.md_saved.clone_from(&buffer.md_list);
        buffer.in_bulk.clear();
        buffer.in_bulk.extend(
            buffer
                .md_saved
                .iter()
                .filter(|md| Some(md.solvent_mol) != excluded && inbulk(md, options))
                .map(|md| md.solvent_mol),
        );
        bulk_actual += nsamples * buffer.in_bulk.len();
        if buffer.in_bulk.is_empty() {
            debug!("no bulk solvent around solute molecule {imol}, sampling from all molecules");
        }

        for _ in 0..nsamples {
            randomize_solvent(
                &buffer.solvent_coords,
                &buffer.in_bulk,
                &buffer.solvent,
                reference_atom,
                &cell,
                rng,
                &mut buffer.solvent_random,
            );
            index.rebuild(&buffer.solvent_random, &cell, cutoff)?;
            minimum_distances(
                &*index,
                &buffer.solute_coords[solute_mol.clone()],
                &buffer.solvent,
                reference_atom,
                &mut buffer.md_list,
            );
            out.add_random(&buffer.md_list, excluded);
            bulk_random += buffer
                .md_list
                .iter()
                .filter(|md| Some(md.solvent_mol) != excluded && inbulk(md, options))
                .count();
        }
        update_index = true;
    }

    // the ideal-gas molecules are uniform in the cell, so their bulk fraction
    // is the volume fraction of the bulk region
    let n_random = options.n_random_samples as f64;
    let volume_bulk = volume * bulk_random as f64 / (n_random * n_eff as f64);
    out.add_frame_bulk(volume_bulk, bulk_actual as f64 / n_random);
    Ok(())
}

use mddf_core::geom::Vec3;
use mddf_core::neighbor::PeriodicIndex;
use mddf_core::options::Options;
use mddf_core::selection::Selection;

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct MinimumDistance {
    pub solvent_mol: usize,
    pub within_cutoff: bool,
    pub dmin: f64,
    /// Distance from the solvent reference atom to the closest solute atom.
    pub dmin_mol: f64,
    pub solute_atom: usize,
    pub solvent_atom: usize,
}

impl MinimumDistance {
    pub fn beyond_cutoff(solvent_mol: usize) -> Self {
        Self {
            solvent_mol,
            within_cutoff: false,
            dmin: f64::INFINITY,
            dmin_mol: f64::INFINITY,
            solute_atom: 0,
            solvent_atom: 0,
        }
    }
}

/// Whether a solvent molecule belongs to the bulk region.
/// With a hard cutoff the bulk is the shell between `dbulk` and `cutoff`;
/// otherwise every molecule not found within `dbulk` is bulk.
pub fn inbulk(md: &MinimumDistance, options: &Options) -> bool {
    if options.usecutoff {
        md.within_cutoff && md.dmin_mol > options.dbulk
    } else {
        !md.within_cutoff
    }
}

/// `index` must hold the solvent atoms in selection slot order.
pub fn minimum_distances<I: PeriodicIndex>(
    index: &I,
    solute_mol: &[Vec3],
    solvent: &Selection,
    reference_atom: usize,
    list: &mut Vec<MinimumDistance>,
) {
    list.clear();
    list.extend((0..solvent.nmols()).map(MinimumDistance::beyond_cutoff));
    for (solute_atom, &query) in solute_mol.iter().enumerate() {
        index.for_each_within(query, |slot, d| {
            let solvent_atom = solvent.atom_in_molecule(slot);
            let md = &mut list[solvent.molecule_of(slot)];
            if d < md.dmin {
                md.dmin = d;
                md.within_cutoff = true;
                md.solute_atom = solute_atom;
                md.solvent_atom = solvent_atom;
            }
            if solvent_atom == reference_atom && d < md.dmin_mol {
                md.dmin_mol = d;
            }
        });
    }
}

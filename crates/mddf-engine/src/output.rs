use std::f64::consts::PI;

use mddf_core::error::{MddfError, MddfResult};
use mddf_core::options::Options;
use mddf_core::selection::Selection;
use serde::{Deserialize, Serialize};

use crate::mindist::MinimumDistance;

/// 1 Å³ per molecule expressed in cm³/mol.
pub const ANGSTROM3_TO_CM3_PER_MOL: f64 = 0.602214076;

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Volume {
    pub total: f64,
    pub domain: f64,
    pub bulk: f64,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Density {
    pub solute: f64,
    pub solvent: f64,
    pub solvent_bulk: f64,
}

/// Additive per-worker sums. Merging two accumulators adds these field by
/// field; nothing derived is stored here.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct RawSums {
    pub nframes_read: usize,
    pub n_random_configurations: usize,
    pub volume_total: f64,
    pub volume_bulk: f64,
    /// Per frame: mean number of actual solvent molecules found in bulk.
    pub solvent_in_bulk: f64,
    pub md: Vec<u64>,
    pub rdf: Vec<u64>,
    pub md_random: Vec<u64>,
    pub rdf_random: Vec<u64>,
    pub solute_atom: Vec<Vec<u64>>,
    pub solvent_atom: Vec<Vec<u64>>,
}

impl RawSums {
    fn new(nbins: usize, solute_natoms: usize, solvent_natoms: usize) -> Self {
        Self {
            md: vec![0; nbins],
            rdf: vec![0; nbins],
            md_random: vec![0; nbins],
            rdf_random: vec![0; nbins],
            solute_atom: vec![vec![0; nbins]; solute_natoms],
            solvent_atom: vec![vec![0; nbins]; solvent_natoms],
            ..Self::default()
        }
    }

    fn add(&mut self, other: &RawSums) {
        self.nframes_read += other.nframes_read;
        self.n_random_configurations += other.n_random_configurations;
        self.volume_total += other.volume_total;
        self.volume_bulk += other.volume_bulk;
        self.solvent_in_bulk += other.solvent_in_bulk;
        add_bins(&mut self.md, &other.md);
        add_bins(&mut self.rdf, &other.rdf);
        add_bins(&mut self.md_random, &other.md_random);
        add_bins(&mut self.rdf_random, &other.rdf_random);
        for (a, b) in self.solute_atom.iter_mut().zip(other.solute_atom.iter()) {
            add_bins(a, b);
        }
        for (a, b) in self.solvent_atom.iter_mut().zip(other.solvent_atom.iter()) {
            add_bins(a, b);
        }
    }
}

fn add_bins(a: &mut [u64], b: &[u64]) {
    for (x, y) in a.iter_mut().zip(b.iter()) {
        *x += *y;
    }
}

fn cumulative(values: &[f64]) -> Vec<f64> {
    values
        .iter()
        .scan(0.0, |acc, &v| {
            *acc += v;
            Some(*acc)
        })
        .collect()
}

fn scaled(raw: &[u64], factor: f64) -> Vec<f64> {
    raw.iter().map(|&c| c as f64 * factor).collect()
}

fn ratio(num: &[f64], den: &[f64]) -> Vec<f64> {
    num.iter()
        .zip(den.iter())
        .map(|(&n, &d)| if d > 0.0 { n / d } else { 0.0 })
        .collect()
}

/// Workers fill [`RawSums`]; [`merge`](Self::merge) combines partial results and
/// [`finalize`](Self::finalize) derives every normalized field from the sums.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MddfOutput {
    pub binstep: f64,
    pub cutoff: f64,
    pub dbulk: f64,
    pub usecutoff: bool,
    pub autocorrelation: bool,
    pub solute_nmols: usize,
    pub solute_natomspermol: usize,
    pub solvent_nmols: usize,
    pub solvent_natomspermol: usize,
    pub raw: RawSums,

    pub d: Vec<f64>,
    pub volume: Volume,
    pub density: Density,
    pub md_count: Vec<f64>,
    pub rdf_count: Vec<f64>,
    pub md_count_random: Vec<f64>,
    pub rdf_count_random: Vec<f64>,
    pub mddf: Vec<f64>,
    pub rdf: Vec<f64>,
    /// Kirkwood-Buff integral from the MDDF (cm³/mol).
    pub kb: Vec<f64>,
    /// Kirkwood-Buff integral from the RDF (cm³/mol).
    pub kb_rdf: Vec<f64>,
    pub coordination_number: Vec<f64>,
    pub coordination_number_random: Vec<f64>,
    pub solute_atom: Vec<Vec<f64>>,
    pub solvent_atom: Vec<Vec<f64>>,
}

impl MddfOutput {
    pub fn new(solute: &Selection, solvent: &Selection, options: &Options) -> Self {
        let nbins = options.nbins();
        let binstep = options.binstep;
        Self {
            binstep,
            cutoff: options.effective_cutoff(),
            dbulk: options.dbulk,
            usecutoff: options.usecutoff,
            autocorrelation: solute.same_atoms(solvent),
            solute_nmols: solute.nmols(),
            solute_natomspermol: solute.natomspermol(),
            solvent_nmols: solvent.nmols(),
            solvent_natomspermol: solvent.natomspermol(),
            raw: RawSums::new(nbins, solute.natomspermol(), solvent.natomspermol()),
            d: (0..nbins).map(|i| (i as f64 + 0.5) * binstep).collect(),
            volume: Volume::default(),
            density: Density::default(),
            md_count: vec![0.0; nbins],
            rdf_count: vec![0.0; nbins],
            md_count_random: vec![0.0; nbins],
            rdf_count_random: vec![0.0; nbins],
            mddf: vec![0.0; nbins],
            rdf: vec![0.0; nbins],
            kb: vec![0.0; nbins],
            kb_rdf: vec![0.0; nbins],
            coordination_number: vec![0.0; nbins],
            coordination_number_random: vec![0.0; nbins],
            solute_atom: vec![vec![0.0; nbins]; solute.natomspermol()],
            solvent_atom: vec![vec![0.0; nbins]; solvent.natomspermol()],
        }
    }

    pub fn nbins(&self) -> usize {
        self.d.len()
    }

    pub fn nframes_read(&self) -> usize {
        self.raw.nframes_read
    }

    pub fn n_effective_solvent(&self) -> usize {
        self.solvent_nmols - usize::from(self.autocorrelation)
    }

    fn bin(&self, d: f64) -> Option<usize> {
        if !(d < self.cutoff) {
            return None;
        }
        Some(((d / self.binstep) as usize).min(self.nbins() - 1))
    }

    pub(crate) fn add_frame(&mut self, volume: f64) {
        self.raw.nframes_read += 1;
        self.raw.volume_total += volume;
    }

    pub(crate) fn add_frame_bulk(&mut self, volume_bulk: f64, solvent_in_bulk: f64) {
        self.raw.volume_bulk += volume_bulk;
        self.raw.solvent_in_bulk += solvent_in_bulk;
    }

    pub(crate) fn add_actual(&mut self, list: &[MinimumDistance], excluded: Option<usize>) {
        for md in list {
            if Some(md.solvent_mol) == excluded {
                continue;
            }
            if let Some(bin) = self.bin(md.dmin) {
                self.raw.md[bin] += 1;
                self.raw.solute_atom[md.solute_atom][bin] += 1;
                self.raw.solvent_atom[md.solvent_atom][bin] += 1;
            }
            if let Some(bin) = self.bin(md.dmin_mol) {
                self.raw.rdf[bin] += 1;
            }
        }
    }

    pub(crate) fn add_random(&mut self, list: &[MinimumDistance], excluded: Option<usize>) {
        self.raw.n_random_configurations += 1;
        for md in list {
            if Some(md.solvent_mol) == excluded {
                continue;
            }
            if let Some(bin) = self.bin(md.dmin) {
                self.raw.md_random[bin] += 1;
            }
            if let Some(bin) = self.bin(md.dmin_mol) {
                self.raw.rdf_random[bin] += 1;
            }
        }
    }

    fn check_compatible(&self, other: &MddfOutput) -> MddfResult<()> {
        if self.nbins() != other.nbins() || self.binstep != other.binstep || self.cutoff != other.cutoff {
            return Err(MddfError::Merge(format!(
                "histograms differ: {} bins of {} up to {} vs {} bins of {} up to {}",
                self.nbins(),
                self.binstep,
                self.cutoff,
                other.nbins(),
                other.binstep,
                other.cutoff
            )));
        }
        if (self.solute_nmols, self.solute_natomspermol, self.solvent_nmols, self.solvent_natomspermol)
            != (
                other.solute_nmols,
                other.solute_natomspermol,
                other.solvent_nmols,
                other.solvent_natomspermol,
            )
            || self.autocorrelation != other.autocorrelation
        {
            return Err(MddfError::Merge(
                "partial results were computed for different selections".into(),
            ));
        }
        if self.raw.md.len() != other.raw.md.len()
            || self.raw.solute_atom.len() != other.raw.solute_atom.len()
            || self.raw.solvent_atom.len() != other.raw.solvent_atom.len()
        {
            return Err(MddfError::Merge("raw count arrays have different sizes".into()));
        }
        Ok(())
    }

    /// Adds the raw sums of `other`. Derived fields are left alone; call
    /// [`finalize`](Self::finalize) after the last merge.
    pub fn merge(&mut self, other: &MddfOutput) -> MddfResult<()> {
        self.check_compatible(other)?;
        self.raw.add(&other.raw);
        Ok(())
    }

    pub fn finalize(&mut self) {
        let raw = &self.raw;
        let nframes = raw.nframes_read as f64;
        let nbins = self.nbins();

        let mut volume = Volume::default();
        let mut density = Density::default();
        if raw.nframes_read > 0 {
            volume.total = raw.volume_total / nframes;
            volume.bulk = raw.volume_bulk / nframes;
            volume.domain = volume.total - volume.bulk;
        }
        if volume.total > 0.0 {
            density.solute = self.solute_nmols as f64 / volume.total;
            density.solvent = self.solvent_nmols as f64 / volume.total;
        }
        if raw.volume_bulk > 0.0 {
            density.solvent_bulk = raw.solvent_in_bulk / raw.volume_bulk;
        }

        let per_solute = if raw.nframes_read > 0 {
            1.0 / (nframes * self.solute_nmols as f64)
        } else {
            0.0
        };
        let md_count = scaled(&raw.md, per_solute);
        let rdf_count = scaled(&raw.rdf, per_solute);
        let solute_atom = raw.solute_atom.iter().map(|c| scaled(c, per_solute)).collect();
        let solvent_atom = raw.solvent_atom.iter().map(|c| scaled(c, per_solute)).collect();

        // ideal-gas counts, rescaled from the random configuration density
        // to the bulk density
        let random_density = self.n_effective_solvent() as f64 / volume.total;
        let per_configuration = if raw.n_random_configurations > 0 && random_density > 0.0 {
            density.solvent_bulk / (raw.n_random_configurations as f64 * random_density)
        } else {
            0.0
        };
        let md_count_random = scaled(&raw.md_random, per_configuration);
        let rdf_count_random = scaled(&raw.rdf_random, per_configuration);

        let mddf = ratio(&md_count, &md_count_random);
        let rdf = ratio(&rdf_count, &rdf_count_random);

        let coordination_number = cumulative(&md_count);
        let coordination_number_random = cumulative(&md_count_random);

        let mut kb = vec![0.0; nbins];
        let mut kb_rdf = vec![0.0; nbins];
        if density.solvent_bulk > 0.0 {
            for i in 0..nbins {
                kb[i] = ANGSTROM3_TO_CM3_PER_MOL
                    * (coordination_number[i] - coordination_number_random[i])
                    / density.solvent_bulk;
            }
            let mut integral = 0.0;
            for i in 0..nbins {
                if rdf_count_random[i] > 0.0 {
                    let r = self.d[i];
                    integral += 4.0 * PI * r * r * (rdf[i] - 1.0) * self.binstep;
                }
                kb_rdf[i] = ANGSTROM3_TO_CM3_PER_MOL * integral;
            }
        }

        self.volume = volume;
        self.density = density;
        self.md_count = md_count;
        self.rdf_count = rdf_count;
        self.md_count_random = md_count_random;
        self.rdf_count_random = rdf_count_random;
        self.mddf = mddf;
        self.rdf = rdf;
        self.kb = kb;
        self.kb_rdf = kb_rdf;
        self.coordination_number = coordination_number;
        self.coordination_number_random = coordination_number_random;
        self.solute_atom = solute_atom;
        self.solvent_atom = solvent_atom;
    }

    pub fn to_json(&self) -> MddfResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn setup() -> (Selection, Selection, Options) {
        let solute = Selection::new((0..4).collect(), 2).unwrap();
        let solvent = Selection::new((4..10).collect(), 3).unwrap();
        let options = Options {
            binstep: 1.0,
            dbulk: 4.0,
            ..Options::default()
        };
        (solute, solvent, options)
    }

    fn record(solvent_mol: usize, dmin: f64, dmin_mol: f64, solvent_atom: usize) -> MinimumDistance {
        MinimumDistance {
            solvent_mol,
            within_cutoff: dmin < 4.0,
            dmin,
            dmin_mol,
            solute_atom: 1,
            solvent_atom,
        }
    }

    fn filled() -> MddfOutput {
        let (solute, solvent, options) = setup();
        let mut out = MddfOutput::new(&solute, &solvent, &options);
        out.add_frame(1000.0);
        out.add_actual(
            &[
                record(0, 1.5, 2.5, 0),
                record(1, 2.5, f64::INFINITY, 1),
                MinimumDistance::beyond_cutoff(2),
            ],
            None,
        );
        for _ in 0..2 {
            out.add_random(&[record(0, 3.5, 3.5, 0), record(1, 2.2, 3.1, 0)], None);
        }
        out.add_frame_bulk(900.0, 1.0);
        out
    }

    #[test]
    fn bins_and_contributions() {
        let out = filled();
        assert_eq!(out.d, vec![0.5, 1.5, 2.5, 3.5]);
        assert_eq!(out.raw.md, vec![0, 1, 1, 0]);
        assert_eq!(out.raw.rdf, vec![0, 0, 1, 0]);
        assert_eq!(out.raw.md_random, vec![0, 0, 2, 2]);
        assert_eq!(out.raw.rdf_random, vec![0, 0, 0, 4]);
        assert_eq!(out.raw.solute_atom[1], vec![0, 1, 1, 0]);
        assert_eq!(out.raw.solvent_atom[0], vec![0, 1, 0, 0]);
        assert_eq!(out.raw.solvent_atom[1], vec![0, 0, 1, 0]);
        assert_eq!(out.raw.n_random_configurations, 2);
    }

    #[test]
    fn bins_cover_half_open_range() {
        let (solute, solvent, options) = setup();
        let out = MddfOutput::new(&solute, &solvent, &options);
        assert_eq!(out.bin(0.0), Some(0));
        assert_eq!(out.bin(0.999), Some(0));
        assert_eq!(out.bin(3.5), Some(3));
        assert_eq!(out.bin(4.0), None);
        assert_eq!(out.bin(f64::INFINITY), None);
        assert_eq!(out.bin(f64::NAN), None);
    }

    #[test]
    fn excluded_molecule_is_skipped() {
        let (solute, _, options) = setup();
        let mut out = MddfOutput::new(&solute, &solute, &options);
        assert!(out.autocorrelation);
        assert_eq!(out.n_effective_solvent(), 1);
        let list = [record(0, 0.0, 0.0, 0), record(1, 1.2, 1.2, 1)];
        out.add_actual(&list, Some(0));
        assert_eq!(out.raw.md, vec![0, 1, 0, 0]);
    }

    #[test]
    fn finalize_normalizes_counts() {
        let mut out = filled();
        out.finalize();
        assert!((out.volume.total - 1000.0).abs() < 1e-12);
        assert!((out.volume.bulk - 900.0).abs() < 1e-12);
        assert!((out.volume.domain - 100.0).abs() < 1e-12);
        assert!((out.density.solute - 2.0 / 1000.0).abs() < 1e-15);
        assert!((out.density.solvent - 3.0 / 1000.0).abs() < 1e-15);
        assert!((out.density.solvent_bulk - 1.0 / 900.0).abs() < 1e-15);

        // one frame, two solute molecules
        assert_eq!(out.md_count, vec![0.0, 0.5, 0.5, 0.0]);
        assert_eq!(out.coordination_number, vec![0.0, 0.5, 1.0, 1.0]);
        let contributions: f64 = out.solvent_atom.iter().map(|c| c[1] + c[2]).sum();
        assert!((contributions - 1.0).abs() < 1e-12);

        // random density 3/1000 rescaled to 1/900 over two configurations
        let factor = (1.0 / 900.0) / (2.0 * 3.0 / 1000.0);
        assert!((out.md_count_random[2] - 2.0 * factor).abs() < 1e-12);
        assert!((out.mddf[2] - 0.5 / (2.0 * factor)).abs() < 1e-9);
        assert_eq!(out.mddf[1], 0.0);

        let kb_last = ANGSTROM3_TO_CM3_PER_MOL * (1.0 - 4.0 * factor) * 900.0;
        assert!((out.kb[3] - kb_last).abs() < 1e-9);
        // rdf has a reference only in the last bin
        let rdf_last = 4.0 * PI * 3.5 * 3.5 * (out.rdf[3] - 1.0);
        assert!((out.kb_rdf[3] - ANGSTROM3_TO_CM3_PER_MOL * rdf_last).abs() < 1e-9);
        assert_eq!(out.kb_rdf[2], 0.0);
    }

    #[test]
    fn finalize_is_idempotent() {
        let mut once = filled();
        once.finalize();
        let mut twice = once.clone();
        twice.finalize();
        assert_eq!(once, twice);
    }

    #[test]
    fn empty_accumulator_finalizes_to_zeros() {
        let (solute, solvent, options) = setup();
        let mut out = MddfOutput::new(&solute, &solvent, &options);
        out.finalize();
        assert_eq!(out.volume, Volume::default());
        assert_eq!(out.density, Density::default());
        assert!(out.mddf.iter().all(|&v| v == 0.0));
        assert!(out.kb.iter().all(|&v| v == 0.0));
    }

    #[test]
    fn merge_adds_raw_sums() {
        let mut a = filled();
        let b = filled();
        a.merge(&b).unwrap();
        assert_eq!(a.raw.nframes_read, 2);
        assert_eq!(a.raw.md, vec![0, 2, 2, 0]);
        assert_eq!(a.raw.solute_atom[1], vec![0, 2, 2, 0]);
        assert!((a.raw.volume_total - 2000.0).abs() < 1e-12);
        a.finalize();
        assert!((a.volume.total - 1000.0).abs() < 1e-12);
    }

    #[test]
    fn merge_rejects_incompatible_partials() {
        let (solute, solvent, options) = setup();
        let mut a = MddfOutput::new(&solute, &solvent, &options);
        let finer = Options {
            binstep: 0.5,
            ..options.clone()
        };
        let b = MddfOutput::new(&solute, &solvent, &finer);
        assert!(matches!(a.merge(&b), Err(MddfError::Merge(_))));

        let other_solvent = Selection::new((4..10).collect(), 2).unwrap();
        let c = MddfOutput::new(&solute, &other_solvent, &options);
        assert!(matches!(a.merge(&c), Err(MddfError::Merge(_))));
    }

    #[test]
    fn serializes_to_json() {
        let mut out = filled();
        out.finalize();
        let text = out.to_json().unwrap();
        let back: MddfOutput = serde_json::from_str(&text).unwrap();
        assert_eq!(back.raw, out.raw);
        assert_eq!(back.md_count, out.md_count);
    }
}

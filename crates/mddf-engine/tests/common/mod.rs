#![allow(dead_code)]

use mddf_core::error::MddfResult;
use mddf_core::frame::{Box3, FrameChunkBuilder};
use mddf_core::geom::Vec3;
use mddf_core::selection::Selection;
use mddf_io::{MemoryTrajectory, TrajReader, Trajectory};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// Atoms `0..n_solute` form the solute, the rest the solvent.
pub fn split_selections(
    n_solute: usize,
    solute_nmols: usize,
    n_solvent: usize,
    solvent_nmols: usize,
) -> (Selection, Selection) {
    let solute = Selection::new((0..n_solute as u32).collect(), solute_nmols).unwrap();
    let solvent = Selection::new(
        (n_solute as u32..(n_solute + n_solvent) as u32).collect(),
        solvent_nmols,
    )
    .unwrap();
    (solute, solvent)
}

pub fn cubic_source(
    frames: Vec<Vec<Vec3>>,
    side: f32,
    solute: &Selection,
    solvent: &Selection,
) -> Trajectory<MemoryTrajectory> {
    let reader = MemoryTrajectory::from_positions(frames, Box3::cubic(side)).unwrap();
    Trajectory::new(reader, solute, solvent).unwrap()
}

/// Uniform random positions in a cubic box.
pub fn random_positions(n: usize, side: f64, seed: u64) -> Vec<Vec3> {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    (0..n)
        .map(|_| {
            Vec3::new(
                rng.gen::<f64>() * side,
                rng.gen::<f64>() * side,
                rng.gen::<f64>() * side,
            )
        })
        .collect()
}

/// Random rigid molecules: `natomspermol` atoms spaced 1.0 along a random
/// axis from a uniformly placed first atom.
pub fn random_molecules(nmols: usize, natomspermol: usize, side: f64, seed: u64) -> Vec<Vec3> {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let mut out = Vec::with_capacity(nmols * natomspermol);
    for _ in 0..nmols {
        let start = Vec3::new(
            rng.gen::<f64>() * side,
            rng.gen::<f64>() * side,
            rng.gen::<f64>() * side,
        );
        let axis = Vec3::new(rng.gen::<f64>() - 0.5, rng.gen::<f64>() - 0.5, 0.5);
        let axis = axis.scale(1.0 / axis.norm());
        for k in 0..natomspermol {
            out.push(start.add(axis.scale(k as f64)));
        }
    }
    out
}

/// Reader that announces more frames than it holds.
pub struct Truncated {
    pub inner: MemoryTrajectory,
    pub claimed: usize,
}

impl TrajReader for Truncated {
    fn n_atoms(&self) -> usize {
        self.inner.n_atoms()
    }

    fn n_frames_hint(&self) -> Option<usize> {
        Some(self.claimed)
    }

    fn read_chunk(&mut self, max_frames: usize, out: &mut FrameChunkBuilder) -> MddfResult<usize> {
        self.inner.read_chunk(max_frames, out)
    }

    fn rewind(&mut self) -> MddfResult<()> {
        self.inner.rewind()
    }
}

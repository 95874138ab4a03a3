use log::debug;
use mddf_core::error::{MddfError, MddfResult};
use mddf_core::frame::{Box3, FrameChunkBuilder};
use mddf_core::geom::Vec3;
use mddf_core::selection::Selection;

use crate::{count_frames, FrameSource, TrajReader};

const COUNT_CHUNK_FRAMES: usize = 64;

/// Adapts a [`TrajReader`] into a [`FrameSource`] over a solute and a solvent
/// atom selection. The two selections may share atoms.
pub struct Trajectory<R: TrajReader> {
    reader: R,
    solute_indices: Vec<u32>,
    solvent_indices: Vec<u32>,
    n_frames: usize,
    frame: usize,
    needs_rewind: bool,
    builder: FrameChunkBuilder,
    box_: Box3,
    solute: Vec<Vec3>,
    solvent: Vec<Vec3>,
}

impl<R: TrajReader> Trajectory<R> {
    pub fn new(mut reader: R, solute: &Selection, solvent: &Selection) -> MddfResult<Self> {
        let n_atoms = reader.n_atoms();
        for (name, selection) in [("solute", solute), ("solvent", solvent)] {
            let max = selection.max_index();
            if max as usize >= n_atoms {
                return Err(MddfError::Mismatch(format!(
                    "{name} atom index {max} out of bounds for trajectory with {n_atoms} atoms"
                )));
            }
        }
        let (n_frames, needs_rewind) = match reader.n_frames_hint() {
            Some(n) => (n, false),
            None => {
                let n = count_frames(&mut reader, COUNT_CHUNK_FRAMES)?;
                debug!("counted {n} trajectory frames");
                (n, true)
            }
        };
        Ok(Self {
            reader,
            solute_indices: solute.indices.clone(),
            solvent_indices: solvent.indices.clone(),
            n_frames,
            frame: 0,
            needs_rewind,
            builder: FrameChunkBuilder::new(n_atoms, 1),
            box_: Box3::None,
            solute: vec![Vec3::default(); solute.natoms()],
            solvent: vec![Vec3::default(); solvent.natoms()],
        })
    }

    /// Frames successfully read since the last `open`.
    pub fn frames_read(&self) -> usize {
        self.frame
    }

    fn read_frame(&mut self) -> MddfResult<()> {
        let n_atoms = self.reader.n_atoms();
        self.builder.reset(n_atoms, 1);
        let read = self.reader.read_chunk(1, &mut self.builder)?;
        if read == 0 {
            return Err(MddfError::Invalid("unexpected end of trajectory".into()));
        }
        let chunk = self.builder.finish_take()?;
        let coords = chunk.frame_coords(0);
        for (dst, &idx) in self.solute.iter_mut().zip(self.solute_indices.iter()) {
            *dst = Vec3::from_coord(coords[idx as usize]);
        }
        for (dst, &idx) in self.solvent.iter_mut().zip(self.solvent_indices.iter()) {
            *dst = Vec3::from_coord(coords[idx as usize]);
        }
        self.box_ = chunk.frame_box(0);
        self.builder.reclaim(chunk);
        Ok(())
    }
}

impl<R: TrajReader> FrameSource for Trajectory<R> {
    fn open(&mut self) -> MddfResult<()> {
        if self.needs_rewind {
            self.reader.rewind()?;
        }
        self.needs_rewind = true;
        self.frame = 0;
        Ok(())
    }

    fn close(&mut self) -> MddfResult<()> {
        Ok(())
    }

    fn n_frames(&self) -> usize {
        self.n_frames
    }

    fn n_solute_atoms(&self) -> usize {
        self.solute.len()
    }

    fn n_solvent_atoms(&self) -> usize {
        self.solvent.len()
    }

    fn advance_to_next_frame(&mut self) -> MddfResult<()> {
        let frame = self.frame;
        if frame >= self.n_frames {
            return Err(MddfError::FrameRead {
                frame,
                reason: format!("trajectory has only {} frames", self.n_frames),
            });
        }
        self.read_frame().map_err(|err| MddfError::FrameRead {
            frame,
            reason: err.to_string(),
        })?;
        self.frame += 1;
        Ok(())
    }

    fn box_dimensions(&self) -> Box3 {
        self.box_
    }

    fn solute_coords(&self) -> &[Vec3] {
        &self.solute
    }

    fn solvent_coords(&self) -> &[Vec3] {
        &self.solvent
    }
}

pub mod memory;
pub mod trajectory;

use mddf_core::error::{MddfError, MddfResult};
use mddf_core::frame::{Box3, FrameChunkBuilder};
use mddf_core::geom::Vec3;

pub use memory::MemoryTrajectory;
pub use trajectory::Trajectory;

/// Sequential, chunked access to the atoms of a trajectory file.
pub trait TrajReader {
    fn n_atoms(&self) -> usize;
    fn n_frames_hint(&self) -> Option<usize>;
    fn read_chunk(&mut self, max_frames: usize, out: &mut FrameChunkBuilder) -> MddfResult<usize>;

    /// Position the reader before the first frame again.
    fn rewind(&mut self) -> MddfResult<()> {
        Err(MddfError::Unsupported(
            "trajectory reader cannot restart from the first frame".into(),
        ))
    }
}

/// Strictly sequential supplier of solute and solvent coordinates, one frame
/// at a time in file order.
///
/// `open` restarts the source before its first frame; after
/// `advance_to_next_frame` succeeds the coordinate slices and the box describe
/// the new frame. Exactly `n_frames` advances succeed after an `open`.
pub trait FrameSource {
    fn open(&mut self) -> MddfResult<()>;
    fn close(&mut self) -> MddfResult<()>;
    fn n_frames(&self) -> usize;
    fn n_solute_atoms(&self) -> usize;
    fn n_solvent_atoms(&self) -> usize;
    fn advance_to_next_frame(&mut self) -> MddfResult<()>;
    /// Box of the current frame.
    fn box_dimensions(&self) -> Box3;
    fn solute_coords(&self) -> &[Vec3];
    fn solvent_coords(&self) -> &[Vec3];
}

/// Counts frames by reading the trajectory once.
pub fn count_frames<R: TrajReader + ?Sized>(reader: &mut R, chunk_frames: usize) -> MddfResult<usize> {
    let chunk_frames = chunk_frames.max(1);
    let mut builder = FrameChunkBuilder::new(reader.n_atoms(), chunk_frames);
    let mut total = 0usize;
    loop {
        let read = reader.read_chunk(chunk_frames, &mut builder)?;
        if read == 0 {
            break;
        }
        total += read;
    }
    Ok(total)
}

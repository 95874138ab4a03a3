use mddf_core::error::{MddfError, MddfResult};
use mddf_core::frame::{Box3, FrameChunkBuilder};
use mddf_core::geom::Vec3;

use crate::TrajReader;

/// Trajectory held in memory, one coordinate block and one box per frame.
#[derive(Debug, Clone)]
pub struct MemoryTrajectory {
    n_atoms: usize,
    frames: Vec<Vec<[f32; 4]>>,
    boxes: Vec<Box3>,
    index: usize,
}

impl MemoryTrajectory {
    pub fn new(frames: Vec<Vec<[f32; 4]>>, boxes: Vec<Box3>) -> MddfResult<Self> {
        if frames.len() != boxes.len() {
            return Err(MddfError::Mismatch(format!(
                "{} frames but {} boxes",
                frames.len(),
                boxes.len()
            )));
        }
        let n_atoms = frames.first().map(|f| f.len()).unwrap_or(0);
        if let Some((frame, coords)) = frames
            .iter()
            .enumerate()
            .find(|(_, coords)| coords.len() != n_atoms)
        {
            return Err(MddfError::Mismatch(format!(
                "frame {frame} has {} atoms, expected {n_atoms}",
                coords.len()
            )));
        }
        Ok(Self {
            n_atoms,
            frames,
            boxes,
            index: 0,
        })
    }

    /// Builds frames from positions, every frame in the same box.
    pub fn from_positions(frames: Vec<Vec<Vec3>>, box_: Box3) -> MddfResult<Self> {
        let boxes = vec![box_; frames.len()];
        let frames = frames
            .into_iter()
            .map(|positions| {
                positions
                    .into_iter()
                    .map(|p| [p.x as f32, p.y as f32, p.z as f32, 1.0])
                    .collect()
            })
            .collect();
        Self::new(frames, boxes)
    }

    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }
}

impl TrajReader for MemoryTrajectory {
    fn n_atoms(&self) -> usize {
        self.n_atoms
    }

    fn n_frames_hint(&self) -> Option<usize> {
        Some(self.frames.len())
    }

    fn read_chunk(&mut self, max_frames: usize, out: &mut FrameChunkBuilder) -> MddfResult<usize> {
        let max_frames = max_frames.max(1);
        out.reset(self.n_atoms, max_frames);
        let mut frames_read = 0;
        while frames_read < max_frames && self.index < self.frames.len() {
            let coords = out.start_frame(self.boxes[self.index]);
            coords.copy_from_slice(&self.frames[self.index]);
            self.index += 1;
            frames_read += 1;
        }
        Ok(frames_read)
    }

    fn rewind(&mut self) -> MddfResult<()> {
        self.index = 0;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::count_frames;

    fn traj() -> MemoryTrajectory {
        let frames = vec![
            vec![[0.0, 0.0, 0.0, 1.0], [1.0, 2.0, 3.0, 1.0]],
            vec![[4.0, 0.0, 0.0, 1.0], [5.0, 6.0, 7.0, 1.0]],
            vec![[8.0, 0.0, 0.0, 1.0], [9.0, 9.0, 9.0, 1.0]],
        ];
        let boxes = vec![Box3::cubic(10.0), Box3::cubic(11.0), Box3::cubic(12.0)];
        MemoryTrajectory::new(frames, boxes).unwrap()
    }

    #[test]
    fn reads_in_chunks_and_rewinds() {
        let mut traj = traj();
        let mut builder = FrameChunkBuilder::new(2, 2);
        assert_eq!(traj.read_chunk(2, &mut builder).unwrap(), 2);
        let chunk = builder.finish_take().unwrap();
        assert_eq!(chunk.frame_box(1), Box3::cubic(11.0));
        assert_eq!(chunk.frame_coords(1)[1], [5.0, 6.0, 7.0, 1.0]);
        builder.reclaim(chunk);
        assert_eq!(traj.read_chunk(2, &mut builder).unwrap(), 1);
        assert_eq!(traj.read_chunk(2, &mut builder).unwrap(), 0);

        traj.rewind().unwrap();
        assert_eq!(count_frames(&mut traj, 2).unwrap(), 3);
    }

    #[test]
    fn rejects_ragged_frames() {
        let frames = vec![vec![[0.0; 4]; 2], vec![[0.0; 4]; 3]];
        let boxes = vec![Box3::None; 2];
        assert!(matches!(
            MemoryTrajectory::new(frames, boxes),
            Err(MddfError::Mismatch(_))
        ));
        assert!(MemoryTrajectory::new(vec![vec![[0.0; 4]]], vec![]).is_err());
    }
}

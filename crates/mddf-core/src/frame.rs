use crate::error::{MddfError, MddfResult};

/// Triclinic matrices are row-major with the cell vectors as rows.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Box3 {
    None,
    Orthorhombic { lx: f32, ly: f32, lz: f32 },
    Triclinic { m: [f32; 9] },
}

impl Box3 {
    pub fn cubic(side: f32) -> Self {
        Box3::Orthorhombic {
            lx: side,
            ly: side,
            lz: side,
        }
    }
}

#[derive(Debug, Clone)]
pub struct FrameChunk {
    pub n_atoms: usize,
    pub n_frames: usize,
    pub coords: Vec<[f32; 4]>,
    pub box_: Vec<Box3>,
}

impl FrameChunk {
    pub fn frame_coords(&self, frame: usize) -> &[[f32; 4]] {
        let start = frame * self.n_atoms;
        &self.coords[start..start + self.n_atoms]
    }

    pub fn frame_box(&self, frame: usize) -> Box3 {
        self.box_.get(frame).copied().unwrap_or(Box3::None)
    }
}

#[derive(Debug)]
pub struct FrameChunkBuilder {
    n_atoms: usize,
    n_frames: usize,
    coords_buf: Vec<[f32; 4]>,
    box_buf: Vec<Box3>,
}

impl FrameChunkBuilder {
    pub fn new(n_atoms: usize, max_frames: usize) -> Self {
        Self {
            n_atoms,
            n_frames: 0,
            coords_buf: Vec::with_capacity(n_atoms * max_frames),
            box_buf: Vec::with_capacity(max_frames),
        }
    }

    pub fn n_atoms(&self) -> usize {
        self.n_atoms
    }

    pub fn reset(&mut self, n_atoms: usize, max_frames: usize) {
        self.n_atoms = n_atoms;
        self.n_frames = 0;
        self.coords_buf.clear();
        self.box_buf.clear();
        self.coords_buf.reserve(n_atoms * max_frames);
        self.box_buf.reserve(max_frames);
    }

    pub fn start_frame(&mut self, box_: Box3) -> &mut [[f32; 4]] {
        let frame_index = self.n_frames;
        self.n_frames += 1;
        self.box_buf.push(box_);
        let start = frame_index * self.n_atoms;
        let end = start + self.n_atoms;
        if self.coords_buf.len() < end {
            self.coords_buf.resize(end, [0.0; 4]);
        }
        &mut self.coords_buf[start..end]
    }

    fn check(&self) -> MddfResult<()> {
        if self.coords_buf.len() != self.n_frames * self.n_atoms {
            return Err(MddfError::Mismatch("frame chunk buffer size mismatch".into()));
        }
        if self.box_buf.len() != self.n_frames {
            return Err(MddfError::Mismatch(
                "frame chunk box buffer size mismatch".into(),
            ));
        }
        Ok(())
    }

    pub fn finish_take(&mut self) -> MddfResult<FrameChunk> {
        self.check()?;
        let n_frames = self.n_frames;
        let coords = std::mem::take(&mut self.coords_buf);
        let box_ = std::mem::take(&mut self.box_buf);
        self.n_frames = 0;
        Ok(FrameChunk {
            n_atoms: self.n_atoms,
            n_frames,
            coords,
            box_,
        })
    }

    pub fn reclaim(&mut self, chunk: FrameChunk) {
        self.n_atoms = chunk.n_atoms;
        self.coords_buf = chunk.coords;
        self.box_buf = chunk.box_;
        self.n_frames = 0;
        self.coords_buf.clear();
        self.box_buf.clear();
    }
}

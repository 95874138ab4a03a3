#![forbid(unsafe_code)]

pub mod error;
pub mod frame;
pub mod geom;
pub mod neighbor;
pub mod options;
pub mod pbc;
pub mod rng;
pub mod selection;

pub use error::{MddfError, MddfResult};
pub use frame::{Box3, FrameChunk, FrameChunkBuilder};
pub use geom::{Quaternion, Vec3};
pub use neighbor::{BruteForce, CellList, Nearest, PeriodicIndex};
pub use options::Options;
pub use pbc::UnitCell;
pub use rng::{frame_rng, master_seed, reseed_for_frame};
pub use selection::Selection;

pub mod buffer;
pub mod executor;
pub mod mindist;
pub mod output;
pub mod processor;
pub mod randomize;

pub use buffer::WorkerBuffer;
pub use executor::{partition_frames, run, Executor};
pub use mindist::{inbulk, minimum_distances, MinimumDistance};
pub use output::{Density, MddfOutput, RawSums, Volume, ANGSTROM3_TO_CM3_PER_MOL};
pub use processor::mddf_frame;
pub use randomize::{random_move, randomize_solvent};

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

use crate::options::Options;

pub fn master_seed(options: &Options) -> u64 {
    if options.deterministic {
        options.seed
    } else {
        rand::thread_rng().gen()
    }
}

/// Stream keyed by the master seed and the frame index only.
pub fn frame_rng(master_seed: u64, frame_index: usize) -> ChaCha8Rng {
    let mut rng = ChaCha8Rng::seed_from_u64(master_seed);
    rng.set_stream(frame_index as u64);
    rng
}

pub fn reseed_for_frame(rng: &mut ChaCha8Rng, master_seed: u64, frame_index: usize) {
    *rng = frame_rng(master_seed, frame_index);
}

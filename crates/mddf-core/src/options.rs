use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{MddfError, MddfResult};

/// Upper bound on histogram bins per run.
pub const MAX_BINS: usize = 1 << 20;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Options {
    pub binstep: f64,
    pub dbulk: f64,
    /// Histogram range when `usecutoff` is set; ignored otherwise.
    pub cutoff: f64,
    /// Bulk is the shell `dbulk < d < cutoff` instead of everything beyond `dbulk`.
    pub usecutoff: bool,
    pub n_random_samples: usize,
    pub stride: usize,
    pub first_frame: usize,
    /// Last frame to analyze (inclusive); `None` runs to the end.
    pub last_frame: Option<usize>,
    pub seed: u64,
    pub deterministic: bool,
    /// Worker threads; 0 picks the available parallelism.
    pub nworkers: usize,
    pub reference_atom: usize,
    pub silent: bool,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            binstep: 0.02,
            dbulk: 10.0,
            cutoff: 10.0,
            usecutoff: false,
            n_random_samples: 10,
            stride: 1,
            first_frame: 0,
            last_frame: None,
            seed: 321,
            deterministic: true,
            nworkers: 0,
            reference_atom: 0,
            silent: true,
        }
    }
}

impl Options {
    pub fn from_json_str(text: &str) -> MddfResult<Self> {
        let options: Options = serde_json::from_str(text)?;
        options.validate()?;
        Ok(options)
    }

    pub fn from_json_path(path: impl AsRef<Path>) -> MddfResult<Self> {
        let text = fs::read_to_string(path)?;
        Self::from_json_str(&text)
    }

    pub fn validate(&self) -> MddfResult<()> {
        if !(self.binstep > 0.0 && self.binstep.is_finite()) {
            return Err(MddfError::Invalid("binstep must be finite and > 0".into()));
        }
        if !(self.dbulk > 0.0 && self.dbulk.is_finite()) {
            return Err(MddfError::Invalid("dbulk must be finite and > 0".into()));
        }
        if self.usecutoff {
            if !(self.cutoff > 0.0 && self.cutoff.is_finite()) {
                return Err(MddfError::Invalid("cutoff must be finite and > 0".into()));
            }
            if self.cutoff < self.dbulk {
                return Err(MddfError::Invalid(format!(
                    "cutoff ({}) must not be smaller than dbulk ({})",
                    self.cutoff, self.dbulk
                )));
            }
        }
        let bins = (self.effective_cutoff() / self.binstep).ceil();
        if bins > MAX_BINS as f64 {
            return Err(MddfError::Invalid(format!(
                "{bins} histogram bins requested, at most {MAX_BINS} supported"
            )));
        }
        if self.n_random_samples == 0 {
            return Err(MddfError::Invalid("n_random_samples must be > 0".into()));
        }
        if self.stride == 0 {
            return Err(MddfError::Invalid("stride must be > 0".into()));
        }
        if let Some(last) = self.last_frame {
            if last < self.first_frame {
                return Err(MddfError::Invalid(format!(
                    "last_frame ({last}) precedes first_frame ({})",
                    self.first_frame
                )));
            }
        }
        Ok(())
    }

    pub fn effective_cutoff(&self) -> f64 {
        if self.usecutoff {
            self.cutoff
        } else {
            self.dbulk
        }
    }

    pub fn nbins(&self) -> usize {
        ((self.effective_cutoff() / self.binstep).ceil() as usize).max(1)
    }

    pub fn frame_indices(&self, n_frames: usize) -> Vec<usize> {
        if n_frames == 0 {
            return Vec::new();
        }
        let last = self
            .last_frame
            .map(|last| last.min(n_frames - 1))
            .unwrap_or(n_frames - 1);
        if self.first_frame > last {
            return Vec::new();
        }
        (self.first_frame..=last).step_by(self.stride.max(1)).collect()
    }
}

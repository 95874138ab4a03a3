use std::num::NonZeroUsize;
use std::thread;

use indicatif::{ProgressBar, ProgressStyle};
use log::{debug, info, warn};
use mddf_core::error::{MddfError, MddfResult};
use mddf_core::neighbor::{CellList, PeriodicIndex};
use mddf_core::options::Options;
use mddf_core::rng::{frame_rng, master_seed, reseed_for_frame};
use mddf_core::selection::Selection;
use mddf_io::FrameSource;
use parking_lot::Mutex;

use crate::buffer::WorkerBuffer;
use crate::output::MddfOutput;
use crate::processor::mddf_frame;

/// Splits `n_frames` into `min(n_frames, nworkers)` contiguous chunk sizes that
/// differ by at most one, larger chunks first.
pub fn partition_frames(n_frames: usize, nworkers: usize) -> Vec<usize> {
    let nchunks = nworkers.max(1).min(n_frames);
    if nchunks == 0 {
        return Vec::new();
    }
    let base = n_frames / nchunks;
    let extra = n_frames % nchunks;
    (0..nchunks)
        .map(|i| base + usize::from(i < extra))
        .collect()
}

/// Everything the workers share. Only touched while holding the lock.
struct SharedReader<'a, S: FrameSource + ?Sized> {
    source: &'a mut S,
    selected: &'a [usize],
    next: usize,
    frames_advanced: usize,
    progress: ProgressBar,
    aborted: bool,
}

impl<S: FrameSource + ?Sized> SharedReader<'_, S> {
    fn read_next(&mut self, buffer: &mut WorkerBuffer) -> MddfResult<usize> {
        let target = *self
            .selected
            .get(self.next)
            .ok_or_else(|| MddfError::Invalid("no selected frames left to read".into()))?;
        while self.frames_advanced <= target {
            self.source.advance_to_next_frame()?;
            self.frames_advanced += 1;
        }
        self.next += 1;
        buffer.load_frame(&*self.source)?;
        self.progress.inc(1);
        Ok(target)
    }
}

fn progress_bar(n_frames: usize, silent: bool) -> ProgressBar {
    if silent {
        return ProgressBar::hidden();
    }
    let progress = ProgressBar::new(n_frames as u64);
    if let Ok(style) =
        ProgressStyle::default_bar().template("{bar:40.cyan/blue} {pos}/{len} frames ({eta})")
    {
        progress.set_style(style.progress_chars("##-"));
    }
    progress
}

pub struct Executor {
    solute: Selection,
    solvent: Selection,
    options: Options,
}

impl Executor {
    pub fn new(solute: Selection, solvent: Selection, options: Options) -> MddfResult<Self> {
        options.validate()?;
        if options.reference_atom >= solvent.natomspermol() {
            return Err(MddfError::Invalid(format!(
                "reference atom {} outside solvent molecules of {} atoms",
                options.reference_atom,
                solvent.natomspermol()
            )));
        }
        if solute.same_atoms(&solvent) && solvent.nmols() < 2 {
            return Err(MddfError::Invalid(
                "autocorrelation needs at least two molecules".into(),
            ));
        }
        Ok(Self {
            solute,
            solvent,
            options,
        })
    }

    pub fn options(&self) -> &Options {
        &self.options
    }

    pub fn solute(&self) -> &Selection {
        &self.solute
    }

    pub fn solvent(&self) -> &Selection {
        &self.solvent
    }

    pub fn is_autocorrelation(&self) -> bool {
        self.solute.same_atoms(&self.solvent)
    }

    fn worker_count(&self, n_frames: usize) -> usize {
        let requested = if self.options.nworkers == 0 {
            thread::available_parallelism()
                .map(NonZeroUsize::get)
                .unwrap_or(1)
        } else {
            self.options.nworkers
        };
        if self.options.nworkers > n_frames {
            warn!(
                "{} workers requested for {n_frames} frames, using {n_frames}",
                self.options.nworkers
            );
        }
        requested.min(n_frames).max(1)
    }

    pub fn run<S: FrameSource + Send + ?Sized>(&self, source: &mut S) -> MddfResult<MddfOutput> {
        self.run_with_index::<S, CellList>(source)
    }

    /// Processes the selected frames of `source`, each worker owning an `I`.
    pub fn run_with_index<S, I>(&self, source: &mut S) -> MddfResult<MddfOutput>
    where
        S: FrameSource + Send + ?Sized,
        I: PeriodicIndex + Default,
    {
        if source.n_solute_atoms() != self.solute.natoms()
            || source.n_solvent_atoms() != self.solvent.natoms()
        {
            return Err(MddfError::Mismatch(format!(
                "frame source provides {} solute and {} solvent atoms, selections have {} and {}",
                source.n_solute_atoms(),
                source.n_solvent_atoms(),
                self.solute.natoms(),
                self.solvent.natoms()
            )));
        }
        let selected = self.options.frame_indices(source.n_frames());
        if selected.is_empty() {
            return Err(MddfError::Invalid(format!(
                "no frames selected from a trajectory of {} frames",
                source.n_frames()
            )));
        }

        let chunks = partition_frames(selected.len(), self.worker_count(selected.len()));
        let seed = master_seed(&self.options);
        if !self.options.deterministic {
            info!("random seed for this run: {seed}");
        }
        info!(
            "computing mddf over {} frames with {} workers ({} solute, {} solvent molecules{})",
            selected.len(),
            chunks.len(),
            self.solute.nmols(),
            self.solvent.nmols(),
            if self.is_autocorrelation() {
                ", autocorrelation"
            } else {
                ""
            }
        );

        source.open()?;
        let progress = progress_bar(selected.len(), self.options.silent);
        let shared = Mutex::new(SharedReader {
            source: &mut *source,
            selected: &selected,
            next: 0,
            frames_advanced: 0,
            progress: progress.clone(),
            aborted: false,
        });

        let results: Vec<MddfResult<MddfOutput>> = thread::scope(|scope| {
            let handles: Vec<_> = chunks
                .iter()
                .enumerate()
                .map(|(worker, &quota)| {
                    let shared = &shared;
                    scope.spawn(move || self.worker::<S, I>(worker, quota, seed, shared))
                })
                .collect();
            handles
                .into_iter()
                .map(|handle| {
                    handle
                        .join()
                        .unwrap_or_else(|_| Err(MddfError::Invalid("worker thread panicked".into())))
                })
                .collect()
        });
        progress.finish_and_clear();
        drop(shared);
        source.close()?;

        let mut total = MddfOutput::new(&self.solute, &self.solvent, &self.options);
        for partial in results {
            total.merge(&partial?)?;
        }
        total.finalize();
        info!(
            "read {} frames, {} ideal-gas configurations",
            total.nframes_read(),
            total.raw.n_random_configurations
        );
        Ok(total)
    }

    fn worker<S, I>(
        &self,
        worker: usize,
        quota: usize,
        seed: u64,
        shared: &Mutex<SharedReader<'_, S>>,
    ) -> MddfResult<MddfOutput>
    where
        S: FrameSource + ?Sized,
        I: PeriodicIndex + Default,
    {
        let mut buffer = WorkerBuffer::new(&self.solute, &self.solvent, self.options.n_random_samples);
        let mut out = MddfOutput::new(&self.solute, &self.solvent, &self.options);
        let mut index = I::default();
        let mut rng = frame_rng(seed, 0);

        for _ in 0..quota {
            let frame = {
                let mut reader = shared.lock();
                if reader.aborted {
                    return Ok(out);
                }
                match reader.read_next(&mut buffer) {
                    Ok(frame) => frame,
                    Err(err) => {
                        reader.aborted = true;
                        return Err(err);
                    }
                }
            };
            reseed_for_frame(&mut rng, seed, frame);
            if let Err(err) = mddf_frame(&mut buffer, &mut index, &mut out, &self.options, &mut rng) {
                shared.lock().aborted = true;
                return Err(err);
            }
        }
        debug!("worker {worker} processed {} frames", out.nframes_read());
        Ok(out)
    }
}

/// Runs a complete MDDF computation with a cell-list index.
pub fn run<S: FrameSource + Send + ?Sized>(
    source: &mut S,
    solute: &Selection,
    solvent: &Selection,
    options: &Options,
) -> MddfResult<MddfOutput> {
    Executor::new(solute.clone(), solvent.clone(), options.clone())?.run(source)
}

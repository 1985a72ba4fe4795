//! Progress
//!
//! Thread safe work counters that a caller can poll while a tree is being built or a
//! cross-validation is running.
use std::sync::Mutex;
use std::time::Instant;

#[derive(Debug)]
struct ProgressState {
    total: usize,
    done: usize,
    start: Instant,
}

/// Counts completed units of work against an expected total.
#[derive(Debug)]
pub struct Progress {
    state: Mutex<ProgressState>,
}

impl Default for Progress {
    fn default() -> Self {
        Progress::new(0)
    }
}

impl Progress {
    pub fn new(total: usize) -> Self {
        Progress {
            state: Mutex::new(ProgressState {
                total,
                done: 0,
                start: Instant::now(),
            }),
        }
    }

    /// Start over with a new total, restarting the clock.
    pub fn reset(&self, total: usize) {
        if let Ok(mut s) = self.state.lock() {
            s.total = total;
            s.done = 0;
            s.start = Instant::now();
        }
    }

    pub fn complete_one(&self) {
        if let Ok(mut s) = self.state.lock() {
            s.done += 1;
        }
    }

    pub fn total(&self) -> usize {
        self.state.lock().map(|s| s.total).unwrap_or(0)
    }

    /// Fraction complete and seconds since the last reset.
    /// Nothing to do counts as complete.
    pub fn snapshot(&self) -> (f64, f64) {
        match self.state.lock() {
            Ok(s) => {
                let elapsed = s.start.elapsed().as_secs_f64();
                if s.total == 0 {
                    (1.0, elapsed)
                } else {
                    (s.done as f64 / s.total as f64, elapsed)
                }
            }
            Err(_) => (0.0, 0.0),
        }
    }
}

/// Progress of a cross-validation: completed folds plus the split search running
/// inside the current fold.
#[derive(Debug, Default)]
pub struct CrossValidationProgress {
    pub folds: Progress,
    pub split: Progress,
}

impl CrossValidationProgress {
    pub fn new(folds: usize) -> Self {
        CrossValidationProgress {
            folds: Progress::new(folds),
            split: Progress::default(),
        }
    }

    /// Overall fraction, counting the running split search as part of one fold.
    pub fn snapshot(&self) -> (f64, f64) {
        let (fold_fraction, elapsed) = self.folds.snapshot();
        let total = self.folds.total();
        if total == 0 {
            return (fold_fraction, elapsed);
        }
        let (split_fraction, _) = self.split.snapshot();
        let fraction = if fold_fraction >= 1.0 {
            1.0
        } else {
            fold_fraction + split_fraction / total as f64
        };
        (fraction.min(1.0), elapsed)
    }
}

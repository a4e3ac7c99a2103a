//! Fork-join execution over local threads

use crate::error::{ConnError, Result};

use parking_lot::Mutex;

#[cfg(feature = "parallel")]
use rayon::prelude::*;

/// One write-once failure slot per local thread
///
/// Workers never propagate errors across the join; they park the first
/// failure in their slot and stop. The caller drains the slots afterwards.
#[derive(Debug)]
pub(crate) struct ThreadFailures {
    slots: Vec<Mutex<Option<ConnError>>>,
}

impl ThreadFailures {
    pub(crate) fn new(num_threads: usize) -> Self {
        Self {
            slots: (0..num_threads).map(|_| Mutex::new(None)).collect(),
        }
    }

    /// Keep `err` unless thread `tid` already failed
    pub(crate) fn record(&self, tid: usize, err: ConnError) {
        match self.slots.get(tid) {
            Some(slot) => {
                let mut slot = slot.lock();
                if slot.is_none() {
                    log::debug!("Thread {} failed: {}", tid, err);
                    *slot = Some(err);
                }
            }
            None => log::warn!("Dropping failure of unknown thread {}: {}", tid, err),
        }
    }

    /// Clear all slots and report the failure of the lowest failing thread
    pub(crate) fn drain(&self) -> Result<()> {
        let mut first = None;
        for (thread, slot) in self.slots.iter().enumerate() {
            if let Some(err) = slot.lock().take() {
                if first.is_none() {
                    first = Some(ConnError::WorkerFailed {
                        thread,
                        source: Box::new(err),
                    });
                }
            }
        }
        first.map_or(Ok(()), Err)
    }
}

/// Run `work` once for every local thread index and park failures in `failures`
pub(crate) fn for_each_thread<F>(num_threads: usize, failures: &ThreadFailures, work: F)
where
    F: Fn(usize) -> Result<()> + Send + Sync,
{
    let run = |tid: usize| {
        if let Err(err) = work(tid) {
            failures.record(tid, err);
        }
    };

    #[cfg(feature = "parallel")]
    (0..num_threads).into_par_iter().for_each(run);

    #[cfg(not(feature = "parallel"))]
    (0..num_threads).for_each(run);
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn test_every_thread_runs_once() {
        let failures = ThreadFailures::new(4);
        let seen: Vec<AtomicUsize> = (0..4).map(|_| AtomicUsize::new(0)).collect();
        for_each_thread(4, &failures, |tid| {
            seen[tid].fetch_add(1, Ordering::SeqCst);
            Ok(())
        });
        assert!(seen.iter().all(|c| c.load(Ordering::SeqCst) == 1));
        assert!(failures.drain().is_ok());
    }

    #[test]
    fn test_lowest_failing_thread_reported() {
        let failures = ThreadFailures::new(4);
        for_each_thread(4, &failures, |tid| {
            if tid >= 2 {
                Err(ConnError::internal(format!("boom {}", tid)))
            } else {
                Ok(())
            }
        });
        let err = failures.drain().unwrap_err();
        assert!(matches!(err, ConnError::WorkerFailed { thread: 2, .. }));
        assert_eq!(err.root_cause(), &ConnError::internal("boom 2"));

        // slots are cleared by draining
        assert!(failures.drain().is_ok());
    }

    #[test]
    fn test_first_failure_per_thread_kept() {
        let failures = ThreadFailures::new(1);
        failures.record(0, ConnError::ParameterExhausted);
        failures.record(0, ConnError::internal("later"));
        let err = failures.drain().unwrap_err();
        assert_eq!(err.root_cause(), &ConnError::ParameterExhausted);
    }
}

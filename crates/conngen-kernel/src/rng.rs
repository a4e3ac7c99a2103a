//! Random number streams and sampling helpers
//!
//! Three families of streams are kept per kernel:
//!
//! - one **rank-synchronized** stream, producing the same sequence on every
//!   rank of a run;
//! - one **vp-synchronized** stream per local thread, producing the same
//!   sequence on every thread of every rank;
//! - one **vp-specific** stream per local thread, seeded from the thread's
//!   virtual process and therefore different everywhere.
//!
//! Streams persist for the kernel's lifetime, so consecutive connection
//! calls continue the sequences.

use crate::{
    config::KernelConfig,
    error::{KernelError, Result},
};

use parking_lot::{Mutex, MutexGuard};
use rand::{rngs::StdRng, seq::index, Rng, RngCore, SeedableRng};
use rand_distr::{Binomial, Distribution};

/// Generator type behind every kernel stream
pub type KernelRng = StdRng;

const RANK_SYNCED_STREAM: u64 = 0;
const VP_SYNCED_STREAM: u64 = 1;
const VP_SPECIFIC_STREAM_BASE: u64 = 2;

/// SplitMix64 finalizer, used to decorrelate derived seeds
fn mix(mut z: u64) -> u64 {
    z = z.wrapping_add(0x9E37_79B9_7F4A_7C15);
    z = (z ^ (z >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
    z ^ (z >> 31)
}

fn derive_seed(seed: u64, stream: u64) -> u64 {
    mix(seed ^ mix(stream))
}

/// Owner of all random streams of one kernel instance
#[derive(Debug)]
pub struct RngManager {
    rank_synced: Mutex<KernelRng>,
    vp_synced: Vec<Mutex<KernelRng>>,
    vp_specific: Vec<Mutex<KernelRng>>,
}

impl RngManager {
    /// Seed all streams from the configuration
    pub fn new(config: &KernelConfig) -> Self {
        let map = config.vp_map();
        let seed = config.rng_seed;
        let vp_synced = (0..map.num_threads())
            .map(|_| Mutex::new(KernelRng::seed_from_u64(derive_seed(seed, VP_SYNCED_STREAM))))
            .collect();
        let vp_specific = (0..map.num_threads())
            .map(|tid| {
                let vp = map.thread_to_vp(tid) as u64;
                Mutex::new(KernelRng::seed_from_u64(derive_seed(
                    seed,
                    VP_SPECIFIC_STREAM_BASE + vp,
                )))
            })
            .collect();

        Self {
            rank_synced: Mutex::new(KernelRng::seed_from_u64(derive_seed(seed, RANK_SYNCED_STREAM))),
            vp_synced,
            vp_specific,
        }
    }

    /// Number of per-thread streams in each family
    pub fn num_threads(&self) -> usize {
        self.vp_specific.len()
    }

    /// Stream shared by all ranks
    pub fn rank_synced(&self) -> MutexGuard<'_, KernelRng> {
        self.rank_synced.lock()
    }

    /// Stream of thread `tid` that matches every other thread's synced stream
    pub fn vp_synced(&self, tid: usize) -> Result<MutexGuard<'_, KernelRng>> {
        self.vp_synced
            .get(tid)
            .map(Mutex::lock)
            .ok_or(KernelError::UnknownThread {
                thread: tid,
                num_threads: self.vp_synced.len(),
            })
    }

    /// Private stream of thread `tid`
    pub fn vp_specific(&self, tid: usize) -> Result<MutexGuard<'_, KernelRng>> {
        self.vp_specific
            .get(tid)
            .map(Mutex::lock)
            .ok_or(KernelError::UnknownThread {
                thread: tid,
                num_threads: self.vp_specific.len(),
            })
    }
}

/// Sampling primitives used by the connection algorithms
pub trait RngExt: RngCore {
    /// Uniform integer in `0..n`; `n` must be positive
    fn ulrand(&mut self, n: usize) -> usize {
        self.gen_range(0..n)
    }

    /// Uniform real in `[0, 1)`
    fn drand(&mut self) -> f64 {
        self.gen::<f64>()
    }

    /// Draw from Binomial(n, p)
    fn binomial(&mut self, n: u64, p: f64) -> Result<u64> {
        let dist = Binomial::new(n, p).map_err(|e| KernelError::distribution(e.to_string()))?;
        Ok(dist.sample(self))
    }

    /// `amount` distinct indices from `0..length`, in sampling order
    fn sample_indices(&mut self, length: usize, amount: usize) -> Result<Vec<usize>> {
        if amount > length {
            return Err(KernelError::distribution(format!(
                "cannot sample {} distinct values from {}",
                amount, length
            )));
        }
        Ok(index::sample(self, length, amount).into_vec())
    }
}

impl<R: RngCore + ?Sized> RngExt for R {}

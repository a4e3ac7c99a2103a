//! Kernel configuration

use crate::{
    error::{KernelError, Result},
    vp::VirtualProcessMap,
};

#[cfg(feature = "serde")]
use std::path::Path;

/// Seed used when none is configured
pub const DEFAULT_RNG_SEED: u64 = 143_202_461;

/// Runtime layout and numerics shared by all kernel services
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct KernelConfig {
    /// Worker threads on each rank
    pub local_num_threads: usize,
    /// Number of ranks in the run
    pub num_processes: usize,
    /// Rank this kernel instance represents
    pub rank: usize,
    /// Global seed from which every RNG stream is derived
    pub rng_seed: u64,
    /// Simulation resolution in milliseconds
    pub resolution_ms: f64,
}

impl Default for KernelConfig {
    fn default() -> Self {
        Self {
            local_num_threads: 1,
            num_processes: 1,
            rank: 0,
            rng_seed: DEFAULT_RNG_SEED,
            resolution_ms: 0.1,
        }
    }
}

impl KernelConfig {
    /// Set the number of local threads
    pub fn with_threads(mut self, local_num_threads: usize) -> Self {
        self.local_num_threads = local_num_threads;
        self
    }

    /// Set the process layout and this kernel's rank
    pub fn with_processes(mut self, num_processes: usize, rank: usize) -> Self {
        self.num_processes = num_processes;
        self.rank = rank;
        self
    }

    /// Set the global RNG seed
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.rng_seed = seed;
        self
    }

    /// Set the simulation resolution
    pub fn with_resolution(mut self, resolution_ms: f64) -> Self {
        self.resolution_ms = resolution_ms;
        self
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        if self.local_num_threads == 0 {
            return Err(KernelError::invalid_config("local_num_threads must be at least 1"));
        }
        if self.num_processes == 0 {
            return Err(KernelError::invalid_config("num_processes must be at least 1"));
        }
        if self.rank >= self.num_processes {
            return Err(KernelError::invalid_config(format!(
                "rank {} out of range for {} processes",
                self.rank, self.num_processes
            )));
        }
        if self.resolution_ms <= 0.0 || !self.resolution_ms.is_finite() {
            return Err(KernelError::invalid_config("resolution_ms must be positive"));
        }
        Ok(())
    }

    /// Virtual-process mapping implied by this configuration
    pub fn vp_map(&self) -> VirtualProcessMap {
        VirtualProcessMap::new(self.local_num_threads, self.num_processes, self.rank)
    }

    /// Convert a time in milliseconds to simulation steps
    pub fn ms_to_steps(&self, ms: f64) -> i64 {
        (ms / self.resolution_ms).round() as i64
    }

    /// Parse a configuration from TOML text
    #[cfg(feature = "serde")]
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: Self = toml::from_str(content)
            .map_err(|e| KernelError::config_file(format!("Invalid config file: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from file
    ///
    /// A missing file yields the default configuration.
    #[cfg(feature = "serde")]
    pub fn load_from_file(path: &Path) -> Result<Self> {
        if path.exists() {
            let content = std::fs::read_to_string(path)
                .map_err(|e| KernelError::config_file(format!("{}: {}", path.display(), e)))?;
            Self::from_toml_str(&content)
        } else {
            log::debug!("No kernel config at {}, using defaults", path.display());
            Ok(Self::default())
        }
    }
}

//! Kernel services for distributed connectivity generation
//!
//! This crate provides the collaborators a connection builder relies on:
//! node registry and virtual-process mapping, synapse-model registry,
//! edge storage, and the random-number streams that keep parallel and
//! distributed workers in agreement. [`MemoryKernel`] implements all of
//! them in memory.

#![deny(missing_docs)]
#![warn(clippy::all)]

pub mod config;
pub mod dict;
pub mod error;
pub mod ids;
pub mod memory;
pub mod node_collection;
pub mod rng;
pub mod traits;
pub mod vp;

pub use config::{KernelConfig, DEFAULT_RNG_SEED};
pub use dict::{ParamDict, ParamScalar, DELAY, WEIGHT};
pub use error::{KernelError, Result};
pub use ids::{NodeId, SynapseModelId};
pub use memory::{builtin_synapse_models, Edge, MemoryKernel, NodeKind, SynapseModel};
pub use node_collection::NodeCollection;
pub use rng::{KernelRng, RngExt, RngManager};
pub use traits::{
    EdgeStore, EdgeValues, Kernel, ModelProperties, ModelRegistry, NodeHandle, NodeRegistry,
};
pub use vp::VirtualProcessMap;

/// Name of the synapse model used when a synapse spec names none
pub const DEFAULT_SYNAPSE_MODEL: &str = "static_synapse";

pub mod capability;
pub mod memory;

#[cfg(test)]
pub(crate) mod fake;

pub use capability::{reduce_compute_capability, ComputeCapability};
pub use memory::{aggregate_memory, MemoryInfo};

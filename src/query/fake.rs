use std::cell::Cell;

use crate::backend::{DeviceBackend, LibraryKind, MemoryReading, QueryError};

/// Synthetic backend for exercising the aggregation paths without a real
/// library. Per-device reads are counted so tests can assert that nothing
/// runs after an abort.
pub(crate) struct FakeBackend {
    pub kind: LibraryKind,
    pub count: Result<u32, QueryError>,
    pub memory: Vec<Result<MemoryReading, QueryError>>,
    pub capabilities: Vec<Result<(i32, i32), QueryError>>,
    pub memory_reads: Cell<usize>,
    pub capability_reads: Cell<usize>,
}

impl FakeBackend {
    pub fn with_memory(memory: Vec<MemoryReading>) -> Self {
        Self {
            kind: LibraryKind::Cudart,
            count: Ok(memory.len() as u32),
            memory: memory.into_iter().map(Ok).collect(),
            capabilities: Vec::new(),
            memory_reads: Cell::new(0),
            capability_reads: Cell::new(0),
        }
    }

    pub fn with_capabilities(capabilities: Vec<(i32, i32)>) -> Self {
        Self {
            kind: LibraryKind::Nvml,
            count: Ok(capabilities.len() as u32),
            memory: Vec::new(),
            capabilities: capabilities.into_iter().map(Ok).collect(),
            memory_reads: Cell::new(0),
            capability_reads: Cell::new(0),
        }
    }
}

impl DeviceBackend for FakeBackend {
    fn kind(&self) -> LibraryKind {
        self.kind
    }

    fn device_count(&self) -> Result<u32, QueryError> {
        self.count
    }

    fn memory_info(&self, index: u32) -> Result<MemoryReading, QueryError> {
        self.memory_reads.set(self.memory_reads.get() + 1);
        self.memory[index as usize]
    }

    fn compute_capability(&self, index: u32) -> Result<(i32, i32), QueryError> {
        self.capability_reads.set(self.capability_reads.get() + 1);
        self.capabilities[index as usize]
    }
}

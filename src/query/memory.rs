use crate::backend::{DeviceBackend, QueryError};

/// Memory summed across every device visible to the active backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MemoryInfo {
    pub device_count: u32,
    /// Total VRAM in bytes.
    pub total: u64,
    /// Free VRAM in bytes.
    pub free: u64,
}

/// Sum total and free memory over devices `0..count` in ascending order.
/// Any per-device failure aborts the whole pass; partial sums never escape.
pub fn aggregate_memory(backend: &dyn DeviceBackend) -> Result<MemoryInfo, QueryError> {
    let device_count = backend.device_count()?;

    let mut total: u64 = 0;
    let mut free: u64 = 0;
    for index in 0..device_count {
        let reading = backend.memory_info(index)?;
        total += reading.total;
        free += reading.free;
    }

    Ok(MemoryInfo {
        device_count,
        total,
        free,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::MemoryReading;
    use crate::query::fake::FakeBackend;

    #[test]
    fn sums_memory_across_the_fleet() {
        let backend = FakeBackend::with_memory(vec![
            MemoryReading {
                total: 8_000_000_000,
                free: 2_000_000_000,
            },
            MemoryReading {
                total: 4_000_000_000,
                free: 1_000_000_000,
            },
        ]);

        let info = aggregate_memory(&backend).unwrap();
        assert_eq!(
            info,
            MemoryInfo {
                device_count: 2,
                total: 12_000_000_000,
                free: 3_000_000_000,
            }
        );
    }

    #[test]
    fn zero_devices_sums_to_zero() {
        let backend = FakeBackend::with_memory(vec![]);
        let info = aggregate_memory(&backend).unwrap();
        assert_eq!(
            info,
            MemoryInfo {
                device_count: 0,
                total: 0,
                free: 0,
            }
        );
    }

    #[test]
    fn count_failure_skips_every_device_read() {
        let mut backend = FakeBackend::with_memory(vec![MemoryReading {
            total: 1,
            free: 1,
        }]);
        backend.count = Err(QueryError::DeviceCount { status: 3 });

        let err = aggregate_memory(&backend).unwrap_err();
        assert_eq!(err, QueryError::DeviceCount { status: 3 });
        assert_eq!(backend.memory_reads.get(), 0);
    }

    #[test]
    fn per_device_failure_discards_partial_sums() {
        let mut backend = FakeBackend::with_memory(vec![
            MemoryReading {
                total: 8_000_000_000,
                free: 2_000_000_000,
            },
            MemoryReading { total: 0, free: 0 },
        ]);
        backend.memory[1] = Err(QueryError::MemoryInfo {
            index: 1,
            status: 2,
        });

        let err = aggregate_memory(&backend).unwrap_err();
        assert_eq!(
            err,
            QueryError::MemoryInfo {
                index: 1,
                status: 2,
            }
        );
        // the first device was read before the abort, nothing after it
        assert_eq!(backend.memory_reads.get(), 2);
    }

    #[test]
    fn repeated_queries_return_identical_results() {
        let backend = FakeBackend::with_memory(vec![MemoryReading {
            total: 16_000_000_000,
            free: 9_000_000_000,
        }]);

        let first = aggregate_memory(&backend).unwrap();
        let second = aggregate_memory(&backend).unwrap();
        assert_eq!(first, second);
    }
}

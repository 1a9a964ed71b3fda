use std::fmt;

use crate::backend::{DeviceBackend, QueryError};

/// A `(major, minor)` compute-capability version pair. `(0, 0)` means no
/// device reading was recorded, which callers must treat as "no devices"
/// rather than a real capability.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ComputeCapability {
    pub major: i32,
    pub minor: i32,
}

impl ComputeCapability {
    /// Whether this version meets `min` under the usual ordering (a higher
    /// major always wins; equal majors compare minors).
    pub fn at_least(self, min: ComputeCapability) -> bool {
        self.major > min.major || (self.major == min.major && self.minor >= min.minor)
    }
}

impl fmt::Display for ComputeCapability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.major, self.minor)
    }
}

/// Reduce the fleet to its lowest compute capability; the weakest device is
/// the ceiling on what compiled code can safely target.
pub fn reduce_compute_capability(
    backend: &dyn DeviceBackend,
) -> Result<ComputeCapability, QueryError> {
    let device_count = backend.device_count()?;

    let mut lowest = ComputeCapability { major: 0, minor: 0 };
    for index in 0..device_count {
        let (major, minor) = backend.compute_capability(index)?;

        if lowest.major == 0 || lowest.major > major {
            lowest.major = major;
            lowest.minor = minor;
        } else if lowest.major == major && lowest.minor > minor {
            lowest.minor = minor;
        }
    }

    Ok(lowest)
}

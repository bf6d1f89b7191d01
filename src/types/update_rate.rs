//! Update rate control for presentation streams

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Update rate for snapshot streams
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum UpdateRate {
    /// Every published snapshot
    Native,

    /// At most this many snapshots per second, latest wins
    Max(u32),
}

impl UpdateRate {
    /// Get throttle interval if needed. `Max(0)` is treated as `Native`.
    pub fn throttle_interval(self) -> Option<Duration> {
        match self {
            UpdateRate::Native | UpdateRate::Max(0) => None,
            UpdateRate::Max(hz) => Some(Duration::from_secs_f64(1.0 / hz as f64)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn intervals() {
        assert_eq!(UpdateRate::Native.throttle_interval(), None);
        assert_eq!(UpdateRate::Max(0).throttle_interval(), None);
        assert_eq!(UpdateRate::Max(4).throttle_interval(), Some(Duration::from_millis(250)));
    }
}

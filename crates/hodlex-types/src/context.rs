//! Execution context supplied by the block executor.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// The agreed block height and timestamp. The only source of time the
/// engine ever consults.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BlockContext {
    pub height: u64,
    pub time: DateTime<Utc>,
}

impl BlockContext {
    #[must_use]
    pub fn new(height: u64, time: DateTime<Utc>) -> Self {
        Self { height, time }
    }

    /// The context of the next block, `secs` seconds later.
    #[must_use]
    pub fn advance(self, secs: i64) -> Self {
        Self {
            height: self.height + 1,
            time: self.time + chrono::Duration::seconds(secs),
        }
    }
}

impl Default for BlockContext {
    fn default() -> Self {
        Self {
            height: 1,
            time: DateTime::<Utc>::default(),
        }
    }
}
